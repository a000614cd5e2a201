use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::{bson_datetime_as_chrono, id_hex};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum EditorLang {
    #[default]
    Py,
}

/// Code editor attached to slides, stored in the "editors" collection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Editor {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub initial_code: String,
    pub lang: EditorLang,
    pub executable: bool,
    #[serde(rename = "createdAt", with = "bson_datetime_as_chrono")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EditorResponse {
    pub id: String,
    pub initial_code: String,
    pub lang: EditorLang,
    pub executable: bool,
    pub created_at: DateTime<Utc>,
}

impl From<Editor> for EditorResponse {
    fn from(editor: Editor) -> Self {
        EditorResponse {
            id: id_hex(&editor.id),
            initial_code: editor.initial_code,
            lang: editor.lang,
            executable: editor.executable,
            created_at: editor.created_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateEditorRequest {
    #[serde(default)]
    pub initial_code: String,

    #[serde(default)]
    pub lang: EditorLang,

    #[serde(default)]
    pub executable: bool,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateEditorRequest {
    pub initial_code: Option<String>,
    pub lang: Option<EditorLang>,
    pub executable: Option<bool>,
}

impl UpdateEditorRequest {
    pub fn apply_to(self, editor: &mut Editor) {
        if let Some(initial_code) = self.initial_code {
            editor.initial_code = initial_code;
        }
        if let Some(lang) = self.lang {
            editor.lang = lang;
        }
        if let Some(executable) = self.executable {
            editor.executable = executable;
        }
    }
}
