use anyhow::{Context, Result};
use mongodb::bson::{doc, Document};
use mongodb::options::IndexOptions;
use mongodb::{Database, IndexModel};

/// (collection, keys, unique)
const INDEXES: &[(&str, &[&str], bool)] = &[
    ("courses", &["slug"], true),
    ("chapters", &["course_id", "order"], true),
    ("lessons", &["chapter_id", "order"], true),
    ("lessons", &["course_id"], false),
    ("slides", &["lesson_id", "order"], true),
    ("slides", &["course_id"], false),
    ("choices", &["question_id", "order"], true),
    ("users", &["email"], true),
    ("users", &["username"], true),
    ("users", &["phone_number"], true),
    ("authors", &["user_id"], true),
    ("staff", &["user_id"], true),
    ("user_courses", &["user_id", "course_id"], true),
    ("streaks", &["user_id", "type"], true),
    ("user_responses", &["user_id", "question_id"], false),
];

fn keys_document(keys: &[&str]) -> Document {
    let mut doc = Document::new();
    for key in keys {
        doc.insert(*key, 1);
    }
    doc
}

/// Creates the indexes backing uniqueness rules. Idempotent, run at startup.
pub async fn ensure_indexes(mongo: &Database) -> Result<()> {
    for (collection, keys, unique) in INDEXES {
        let model = IndexModel::builder()
            .keys(keys_document(keys))
            .options(IndexOptions::builder().unique(*unique).build())
            .build();

        mongo
            .collection::<Document>(collection)
            .create_index(model)
            .await
            .with_context(|| format!("Failed to create index {:?} on {}", keys, collection))?;
    }

    tracing::info!(count = INDEXES.len(), "MongoDB indexes ensured");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compound_keys_keep_declaration_order() {
        let keys = keys_document(&["course_id", "order"]);
        let names: Vec<&String> = keys.keys().collect();
        assert_eq!(names, ["course_id", "order"]);
        assert_eq!(keys, doc! { "course_id": 1, "order": 1 });
    }

    #[test]
    fn ordered_children_are_unique_per_parent() {
        for collection in ["chapters", "lessons", "slides", "choices"] {
            assert!(INDEXES
                .iter()
                .any(|(c, keys, unique)| *c == collection && *unique && keys.contains(&"order")));
        }
    }
}
