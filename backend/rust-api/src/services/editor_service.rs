use anyhow::Context;
use chrono::Utc;
use mongodb::bson::{doc, oid::ObjectId, Bson, Document};
use mongodb::Database;

use super::error::{ServiceError, ServiceResult};
use super::query::{self, fetch_page, ListParams, Paginated};
use crate::context::RequestContext;
use crate::models::editor::{CreateEditorRequest, Editor, EditorResponse, UpdateEditorRequest};

pub struct EditorService {
    mongo: Database,
}

impl EditorService {
    pub fn new(mongo: Database) -> Self {
        Self { mongo }
    }

    fn editors(&self) -> mongodb::Collection<Editor> {
        self.mongo.collection::<Editor>("editors")
    }

    async fn load(&self, editor_id: ObjectId) -> ServiceResult<Editor> {
        self.editors()
            .find_one(doc! { "_id": editor_id })
            .await
            .context("Failed to query editor")?
            .ok_or(ServiceError::NotFound("Editor"))
    }

    pub async fn list(&self, params: &ListParams) -> ServiceResult<Paginated<EditorResponse>> {
        let filter = query::EDITORS.build_filter(params)?;
        let sort = query::EDITORS.sort(params);
        let page = query::page(params)?;

        let editors = fetch_page(&self.editors(), filter, sort, page).await?;
        Ok(editors.map(EditorResponse::from))
    }

    pub async fn get(&self, editor_id: ObjectId) -> ServiceResult<EditorResponse> {
        Ok(self.load(editor_id).await?.into())
    }

    pub async fn create(
        &self,
        ctx: &RequestContext,
        req: CreateEditorRequest,
    ) -> ServiceResult<EditorResponse> {
        ctx.require_staff()?;

        let mut editor = Editor {
            id: None,
            initial_code: req.initial_code,
            lang: req.lang,
            executable: req.executable,
            created_at: Utc::now(),
        };
        let inserted = self
            .editors()
            .insert_one(&editor)
            .await
            .context("Failed to insert editor")?;
        editor.id = inserted.inserted_id.as_object_id();

        tracing::info!(editor_id = ?editor.id, "Editor created");
        Ok(editor.into())
    }

    pub async fn update(
        &self,
        ctx: &RequestContext,
        editor_id: ObjectId,
        req: UpdateEditorRequest,
    ) -> ServiceResult<EditorResponse> {
        ctx.require_staff()?;
        let mut editor = self.load(editor_id).await?;
        req.apply_to(&mut editor);

        self.editors()
            .replace_one(doc! { "_id": editor_id }, &editor)
            .await
            .context("Failed to update editor")?;

        tracing::info!(editor_id = %editor_id, "Editor updated");
        Ok(editor.into())
    }

    pub async fn delete(&self, ctx: &RequestContext, editor_id: ObjectId) -> ServiceResult<()> {
        ctx.require_staff()?;

        let result = self
            .editors()
            .delete_one(doc! { "_id": editor_id })
            .await
            .context("Failed to delete editor")?;
        if result.deleted_count == 0 {
            return Err(ServiceError::NotFound("Editor"));
        }

        self.mongo
            .collection::<Document>("slides")
            .update_many(
                doc! { "editor_id": editor_id },
                doc! { "$set": { "editor_id": Bson::Null } },
            )
            .await
            .context("Failed to detach editor from slides")?;

        tracing::info!(editor_id = %editor_id, "Editor deleted");
        Ok(())
    }
}
