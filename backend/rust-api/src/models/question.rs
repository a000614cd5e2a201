use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::choice::{Choice, ChoiceResponse};
use super::{bson_datetime_as_chrono, id_hex};
use crate::services::error::{ServiceError, ServiceResult};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    SingleChoice,
    MultipleChoice,
    Text,
}

impl QuestionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionType::SingleChoice => "single_choice",
            QuestionType::MultipleChoice => "multiple_choice",
            QuestionType::Text => "text",
        }
    }
}

/// Question variant. Choice questions own documents in the "choices" collection,
/// text questions carry their accepted answers inline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QuestionKind {
    SingleChoice,
    MultipleChoice,
    Text { correct_answers: Vec<String> },
}

impl QuestionKind {
    pub fn build(question_type: QuestionType, correct_answers: Vec<String>) -> ServiceResult<Self> {
        match question_type {
            QuestionType::SingleChoice => Ok(QuestionKind::SingleChoice),
            QuestionType::MultipleChoice => Ok(QuestionKind::MultipleChoice),
            QuestionType::Text => {
                let answers: Vec<String> = correct_answers
                    .into_iter()
                    .map(|a| a.trim().to_string())
                    .filter(|a| !a.is_empty())
                    .collect();
                if answers.is_empty() {
                    return Err(ServiceError::validation(
                        "correct_answers",
                        "Text questions need at least one correct answer",
                    ));
                }
                Ok(QuestionKind::Text {
                    correct_answers: answers,
                })
            }
        }
    }

    pub fn question_type(&self) -> QuestionType {
        match self {
            QuestionKind::SingleChoice => QuestionType::SingleChoice,
            QuestionKind::MultipleChoice => QuestionType::MultipleChoice,
            QuestionKind::Text { .. } => QuestionType::Text,
        }
    }

    pub fn correct_answers(&self) -> &[String] {
        match self {
            QuestionKind::Text { correct_answers } => correct_answers,
            _ => &[],
        }
    }

    pub fn is_choice(&self) -> bool {
        !matches!(self, QuestionKind::Text { .. })
    }
}

/// Question stored in the "questions" collection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub title: String,
    pub description: String,
    pub kind: QuestionKind,
    pub image: String,
    pub video_url: String,
    pub answer_description: String,
    /// Staff record that maintains the question
    #[serde(default)]
    pub editor_id: Option<ObjectId>,
    pub is_text_input: bool,
    #[serde(rename = "createdAt", with = "bson_datetime_as_chrono")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt", with = "bson_datetime_as_chrono")]
    pub updated_at: DateTime<Utc>,
}

impl Question {
    pub fn check_content(&self) -> ServiceResult<()> {
        if self.image.trim().is_empty() && self.description.trim().is_empty() {
            return Err(ServiceError::non_field(
                "Either an image or a description is required",
            ));
        }
        Ok(())
    }
}

/// Choice questions need at least one choice; single-choice needs exactly one correct.
///
/// Only enforced when a question is updated, choices written directly are not re-checked.
pub fn check_choice_consistency(kind: &QuestionKind, choices: &[Choice]) -> ServiceResult<()> {
    if !kind.is_choice() {
        return Ok(());
    }

    if choices.is_empty() {
        return Err(ServiceError::validation(
            "choices",
            "Choice questions must have at least one choice",
        ));
    }

    if *kind == QuestionKind::SingleChoice {
        let correct = choices.iter().filter(|c| c.is_correct).count();
        if correct != 1 {
            return Err(ServiceError::validation(
                "choices",
                format!(
                    "Single choice questions must have exactly one correct choice, found {}",
                    correct
                ),
            ));
        }
    }

    Ok(())
}

#[derive(Debug, Clone, Serialize)]
pub struct QuestionResponse {
    pub id: String,
    pub title: String,
    pub description: String,
    pub question_type: QuestionType,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub correct_answers: Vec<String>,
    pub image: String,
    pub video_url: String,
    pub answer_description: String,
    pub editor: Option<String>,
    pub is_text_input: bool,
    pub choices: Vec<ChoiceResponse>,
    pub correct_choices: Vec<ChoiceResponse>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl QuestionResponse {
    pub fn new(question: Question, choices: Vec<Choice>) -> Self {
        let correct_choices = choices
            .iter()
            .filter(|c| c.is_correct)
            .cloned()
            .map(ChoiceResponse::from)
            .collect();

        QuestionResponse {
            id: id_hex(&question.id),
            question_type: question.kind.question_type(),
            correct_answers: question.kind.correct_answers().to_vec(),
            title: question.title,
            description: question.description,
            image: question.image,
            video_url: question.video_url,
            answer_description: question.answer_description,
            editor: question.editor_id.map(|id| id.to_hex()),
            is_text_input: question.is_text_input,
            choices: choices.into_iter().map(ChoiceResponse::from).collect(),
            correct_choices,
            created_at: question.created_at,
            updated_at: question.updated_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateQuestionRequest {
    #[validate(length(
        min = 1,
        max = 255,
        message = "Title must be between 1 and 255 characters"
    ))]
    pub title: String,

    #[serde(default)]
    pub description: String,

    pub question_type: QuestionType,

    #[serde(default)]
    pub correct_answers: Vec<String>,

    #[serde(default)]
    pub image: String,

    #[serde(default)]
    pub video_url: String,

    #[serde(default)]
    pub answer_description: String,

    pub editor: Option<String>,

    #[serde(default)]
    pub is_text_input: bool,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateQuestionRequest {
    #[validate(length(
        min = 1,
        max = 255,
        message = "Title must be between 1 and 255 characters"
    ))]
    pub title: Option<String>,

    pub description: Option<String>,
    pub question_type: Option<QuestionType>,
    pub correct_answers: Option<Vec<String>>,
    pub image: Option<String>,
    pub video_url: Option<String>,
    pub answer_description: Option<String>,
    pub editor: Option<String>,
    pub is_text_input: Option<bool>,
}

impl UpdateQuestionRequest {
    /// Merges the request into `question`, rebuilding the kind from the effective type.
    pub fn apply_to(&self, question: &mut Question) -> ServiceResult<()> {
        if let Some(title) = &self.title {
            question.title = title.clone();
        }
        if let Some(description) = &self.description {
            question.description = description.clone();
        }
        if let Some(image) = &self.image {
            question.image = image.clone();
        }
        if let Some(video_url) = &self.video_url {
            question.video_url = video_url.clone();
        }
        if let Some(answer_description) = &self.answer_description {
            question.answer_description = answer_description.clone();
        }
        if let Some(is_text_input) = self.is_text_input {
            question.is_text_input = is_text_input;
        }

        if self.question_type.is_some() || self.correct_answers.is_some() {
            let question_type = self
                .question_type
                .unwrap_or_else(|| question.kind.question_type());
            let answers = self
                .correct_answers
                .clone()
                .unwrap_or_else(|| question.kind.correct_answers().to_vec());
            question.kind = QuestionKind::build(question_type, answers)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::choice::ChoiceType;

    fn choice(is_correct: bool, order: i32) -> Choice {
        Choice {
            id: Some(ObjectId::new()),
            question_id: ObjectId::new(),
            text: format!("option {}", order),
            alt_text: String::new(),
            image: String::new(),
            order,
            hidden: false,
            choice_type: ChoiceType::Text,
            is_correct,
        }
    }

    fn question(kind: QuestionKind) -> Question {
        let now = Utc::now();
        Question {
            id: Some(ObjectId::new()),
            title: "Which keyword moves a value?".to_string(),
            description: "Pick one".to_string(),
            kind,
            image: String::new(),
            video_url: String::new(),
            answer_description: String::new(),
            editor_id: None,
            is_text_input: false,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn single_choice_needs_exactly_one_correct() {
        let kind = QuestionKind::SingleChoice;

        let two_correct = vec![choice(true, 1), choice(true, 2)];
        assert!(check_choice_consistency(&kind, &two_correct).is_err());

        let one_correct = vec![choice(true, 1), choice(false, 2)];
        assert!(check_choice_consistency(&kind, &one_correct).is_ok());

        let none_correct = vec![choice(false, 1)];
        assert!(check_choice_consistency(&kind, &none_correct).is_err());
    }

    #[test]
    fn choice_questions_need_choices() {
        assert!(check_choice_consistency(&QuestionKind::MultipleChoice, &[]).is_err());
        assert!(check_choice_consistency(
            &QuestionKind::MultipleChoice,
            &[choice(true, 1), choice(true, 2)]
        )
        .is_ok());
    }

    #[test]
    fn text_questions_ignore_choices() {
        let kind = QuestionKind::Text {
            correct_answers: vec!["move".to_string()],
        };
        assert!(check_choice_consistency(&kind, &[]).is_ok());
    }

    #[test]
    fn text_kind_requires_answers() {
        assert!(QuestionKind::build(QuestionType::Text, vec![]).is_err());
        assert!(QuestionKind::build(QuestionType::Text, vec!["  ".to_string()]).is_err());

        let kind = QuestionKind::build(QuestionType::Text, vec![" move ".to_string()]).unwrap();
        assert_eq!(kind.correct_answers(), ["move".to_string()]);
    }

    #[test]
    fn image_or_description_required() {
        let mut q = question(QuestionKind::SingleChoice);
        assert!(q.check_content().is_ok());

        q.description.clear();
        assert!(q.check_content().is_err());

        q.image = "https://cdn.example.com/q.png".to_string();
        assert!(q.check_content().is_ok());
    }

    #[test]
    fn update_switches_kind_using_existing_answers() {
        let mut q = question(QuestionKind::Text {
            correct_answers: vec!["let".to_string()],
        });

        let req: UpdateQuestionRequest = serde_json::from_value(serde_json::json!({
            "question_type": "multiple_choice"
        }))
        .unwrap();
        req.apply_to(&mut q).unwrap();
        assert_eq!(q.kind, QuestionKind::MultipleChoice);

        let req: UpdateQuestionRequest = serde_json::from_value(serde_json::json!({
            "question_type": "text"
        }))
        .unwrap();
        assert!(req.apply_to(&mut q).is_err());
    }

    #[test]
    fn kind_is_stored_with_type_tag() {
        let doc = mongodb::bson::to_document(&question(QuestionKind::Text {
            correct_answers: vec!["move".to_string()],
        }))
        .unwrap();
        let kind = doc.get_document("kind").unwrap();
        assert_eq!(kind.get_str("type").unwrap(), "text");
    }
}
