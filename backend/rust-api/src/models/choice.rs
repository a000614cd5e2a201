use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::id_hex;
use crate::services::error::{ServiceError, ServiceResult};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ChoiceType {
    #[default]
    Text,
    Picture,
    None,
    All,
    Other,
}

/// Answer option stored in the "choices" collection, ordered within its question
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Choice {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub question_id: ObjectId,
    pub text: String,
    pub alt_text: String,
    pub image: String,
    pub order: i32,
    pub hidden: bool,
    pub choice_type: ChoiceType,
    pub is_correct: bool,
}

impl Choice {
    pub fn check_content(&self) -> ServiceResult<()> {
        match self.choice_type {
            ChoiceType::Picture if self.image.trim().is_empty() => {
                return Err(ServiceError::validation(
                    "image",
                    "Picture choices must have an image",
                ))
            }
            ChoiceType::Text if self.text.trim().is_empty() => {
                return Err(ServiceError::validation(
                    "text",
                    "Text choices must have text",
                ))
            }
            _ => {}
        }

        if !self.image.trim().is_empty() && self.alt_text.trim().is_empty() {
            return Err(ServiceError::validation(
                "alt_text",
                "Alt text is required when an image is set",
            ));
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ChoiceResponse {
    pub id: String,
    pub question: String,
    pub text: String,
    pub alt_text: String,
    pub image: String,
    pub order: i32,
    pub hidden: bool,
    pub choice_type: ChoiceType,
    pub is_correct: bool,
}

impl From<Choice> for ChoiceResponse {
    fn from(choice: Choice) -> Self {
        ChoiceResponse {
            id: id_hex(&choice.id),
            question: choice.question_id.to_hex(),
            text: choice.text,
            alt_text: choice.alt_text,
            image: choice.image,
            order: choice.order,
            hidden: choice.hidden,
            choice_type: choice.choice_type,
            is_correct: choice.is_correct,
        }
    }
}

/// Body for both `POST /choices` (with `question`) and `POST /questions/{id}/add-choice`.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateChoiceRequest {
    pub question: Option<String>,

    #[validate(length(max = 255, message = "Text must be at most 255 characters"))]
    #[serde(default)]
    pub text: String,

    #[serde(default)]
    pub alt_text: String,

    #[serde(default)]
    pub image: String,

    #[validate(range(min = 0, message = "Order must not be negative"))]
    pub order: Option<i32>,

    #[serde(default)]
    pub hidden: bool,

    #[serde(default)]
    pub choice_type: ChoiceType,

    #[serde(default)]
    pub is_correct: bool,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateChoiceRequest {
    #[validate(length(max = 255, message = "Text must be at most 255 characters"))]
    pub text: Option<String>,

    pub alt_text: Option<String>,
    pub image: Option<String>,

    #[validate(range(min = 0, message = "Order must not be negative"))]
    pub order: Option<i32>,

    pub hidden: Option<bool>,
    pub choice_type: Option<ChoiceType>,
    pub is_correct: Option<bool>,
}

impl UpdateChoiceRequest {
    pub fn apply_to(self, choice: &mut Choice) {
        if let Some(text) = self.text {
            choice.text = text;
        }
        if let Some(alt_text) = self.alt_text {
            choice.alt_text = alt_text;
        }
        if let Some(image) = self.image {
            choice.image = image;
        }
        if let Some(order) = self.order {
            choice.order = order;
        }
        if let Some(hidden) = self.hidden {
            choice.hidden = hidden;
        }
        if let Some(choice_type) = self.choice_type {
            choice.choice_type = choice_type;
        }
        if let Some(is_correct) = self.is_correct {
            choice.is_correct = is_correct;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn choice(choice_type: ChoiceType) -> Choice {
        Choice {
            id: None,
            question_id: ObjectId::new(),
            text: String::new(),
            alt_text: String::new(),
            image: String::new(),
            order: 1,
            hidden: false,
            choice_type,
            is_correct: false,
        }
    }

    #[test]
    fn picture_choice_needs_image_and_alt_text() {
        let mut c = choice(ChoiceType::Picture);
        assert!(matches!(
            c.check_content(),
            Err(ServiceError::Validation { field: "image", .. })
        ));

        c.image = "https://cdn.example.com/a.png".to_string();
        assert!(matches!(
            c.check_content(),
            Err(ServiceError::Validation { field: "alt_text", .. })
        ));

        c.alt_text = "A crab".to_string();
        assert!(c.check_content().is_ok());
    }

    #[test]
    fn text_choice_needs_text() {
        let mut c = choice(ChoiceType::Text);
        assert!(c.check_content().is_err());

        c.text = "Box<T>".to_string();
        assert!(c.check_content().is_ok());
    }

    #[test]
    fn none_and_all_choices_may_be_blank() {
        assert!(choice(ChoiceType::None).check_content().is_ok());
        assert!(choice(ChoiceType::All).check_content().is_ok());
        assert!(choice(ChoiceType::Other).check_content().is_ok());
    }
}
