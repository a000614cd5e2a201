use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use validator::Validate;

use super::choice::Choice;
use super::question::QuestionKind;
use super::{bson_datetime_as_chrono, id_hex, ids_hex};

/// A user's submitted answer to a question
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub user_id: ObjectId,
    pub question_id: ObjectId,
    #[serde(default)]
    pub text_answer: Vec<String>,
    #[serde(default)]
    pub choice_answer: Vec<ObjectId>,
    pub is_correct: bool,
    #[serde(rename = "submittedAt", with = "bson_datetime_as_chrono")]
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserResponseResponse {
    pub id: String,
    pub user: String,
    pub question: String,
    pub text_answer: Vec<String>,
    pub choice_answer: Vec<String>,
    pub is_correct: bool,
    pub submitted_at: DateTime<Utc>,
}

impl From<UserResponse> for UserResponseResponse {
    fn from(response: UserResponse) -> Self {
        UserResponseResponse {
            id: id_hex(&response.id),
            user: response.user_id.to_hex(),
            question: response.question_id.to_hex(),
            choice_answer: ids_hex(&response.choice_answer),
            text_answer: response.text_answer,
            is_correct: response.is_correct,
            submitted_at: response.submitted_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateUserResponseRequest {
    pub question: String,

    #[serde(default)]
    pub text_answer: Vec<String>,

    #[serde(default)]
    pub choice_answer: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateUserResponseRequest {
    pub text_answer: Option<Vec<String>>,
    pub choice_answer: Option<Vec<String>>,
}

fn normalize_answer(answer: &str) -> String {
    answer.trim().to_lowercase()
}

/// Grades an answer against the question.
///
/// Text answers must match the accepted answers in order, ignoring case and
/// surrounding whitespace. Choice answers must select exactly the correct set.
pub fn grade(kind: &QuestionKind, choices: &[Choice], text: &[String], selected: &[ObjectId]) -> bool {
    match kind {
        QuestionKind::Text { correct_answers } => {
            text.len() == correct_answers.len()
                && text
                    .iter()
                    .zip(correct_answers)
                    .all(|(given, expected)| normalize_answer(given) == normalize_answer(expected))
        }
        QuestionKind::SingleChoice | QuestionKind::MultipleChoice => {
            let correct: HashSet<ObjectId> = choices
                .iter()
                .filter(|c| c.is_correct)
                .filter_map(|c| c.id)
                .collect();
            let chosen: HashSet<ObjectId> = selected.iter().copied().collect();
            !correct.is_empty() && chosen == correct
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::choice::ChoiceType;

    fn choice(question_id: ObjectId, is_correct: bool) -> Choice {
        Choice {
            id: Some(ObjectId::new()),
            question_id,
            text: "option".to_string(),
            alt_text: String::new(),
            image: String::new(),
            order: 1,
            hidden: false,
            choice_type: ChoiceType::Text,
            is_correct,
        }
    }

    #[test]
    fn text_answers_are_ordered_and_case_insensitive() {
        let kind = QuestionKind::Text {
            correct_answers: vec!["Vec".to_string(), "push".to_string()],
        };
        let answer = |items: &[&str]| items.iter().map(|s| s.to_string()).collect::<Vec<_>>();

        assert!(grade(&kind, &[], &answer(&[" vec ", "PUSH"]), &[]));
        assert!(!grade(&kind, &[], &answer(&["push", "vec"]), &[]));
        assert!(!grade(&kind, &[], &answer(&["vec"]), &[]));
    }

    #[test]
    fn choice_answers_must_match_correct_set() {
        let q = ObjectId::new();
        let choices = vec![choice(q, true), choice(q, true), choice(q, false)];
        let ids: Vec<ObjectId> = choices.iter().filter_map(|c| c.id).collect();

        assert!(grade(&QuestionKind::MultipleChoice, &choices, &[], &[ids[1], ids[0]]));
        assert!(!grade(&QuestionKind::MultipleChoice, &choices, &[], &[ids[0]]));
        assert!(!grade(
            &QuestionKind::MultipleChoice,
            &choices,
            &[],
            &[ids[0], ids[1], ids[2]]
        ));
    }

    #[test]
    fn question_without_correct_choice_never_grades_correct() {
        let q = ObjectId::new();
        let choices = vec![choice(q, false)];
        assert!(!grade(&QuestionKind::SingleChoice, &choices, &[], &[]));
    }
}
