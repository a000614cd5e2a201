use anyhow::Context;
use chrono::Utc;
use mongodb::bson::{doc, oid::ObjectId, Document};
use mongodb::Database;

use super::error::{ServiceError, ServiceResult};
use super::query::{self, fetch_page, ListParams, Paginated};
use crate::context::RequestContext;
use crate::models::category::{
    Category, CategoryResponse, CreateCategoryRequest, UpdateCategoryRequest,
};
use crate::models::course::{Course, CourseResponse};

pub struct CategoryService {
    mongo: Database,
}

impl CategoryService {
    pub fn new(mongo: Database) -> Self {
        Self { mongo }
    }

    fn categories(&self) -> mongodb::Collection<Category> {
        self.mongo.collection::<Category>("categories")
    }

    async fn load(&self, category_id: ObjectId) -> ServiceResult<Category> {
        self.categories()
            .find_one(doc! { "_id": category_id })
            .await
            .context("Failed to query category")?
            .ok_or(ServiceError::NotFound("Category"))
    }

    pub async fn list(&self, params: &ListParams) -> ServiceResult<Paginated<CategoryResponse>> {
        let filter = query::CATEGORIES.build_filter(params)?;
        let sort = query::CATEGORIES.sort(params);
        let page = query::page(params)?;

        let categories = fetch_page(&self.categories(), filter, sort, page).await?;
        Ok(categories.map(CategoryResponse::from))
    }

    pub async fn get(&self, category_id: ObjectId) -> ServiceResult<CategoryResponse> {
        Ok(self.load(category_id).await?.into())
    }

    pub async fn create(
        &self,
        ctx: &RequestContext,
        req: CreateCategoryRequest,
    ) -> ServiceResult<CategoryResponse> {
        ctx.require_staff()?;

        let mut category = Category {
            id: None,
            title: req.title,
            description: req.description,
            created_at: Utc::now(),
        };
        let inserted = self
            .categories()
            .insert_one(&category)
            .await
            .context("Failed to insert category")?;
        category.id = inserted.inserted_id.as_object_id();

        tracing::info!(category_id = ?category.id, title = %category.title, "Category created");
        Ok(category.into())
    }

    pub async fn update(
        &self,
        ctx: &RequestContext,
        category_id: ObjectId,
        req: UpdateCategoryRequest,
    ) -> ServiceResult<CategoryResponse> {
        ctx.require_staff()?;
        let mut category = self.load(category_id).await?;
        req.apply_to(&mut category);

        self.categories()
            .replace_one(doc! { "_id": category_id }, &category)
            .await
            .context("Failed to update category")?;

        tracing::info!(category_id = %category_id, "Category updated");
        Ok(category.into())
    }

    pub async fn delete(&self, ctx: &RequestContext, category_id: ObjectId) -> ServiceResult<()> {
        ctx.require_staff()?;

        let result = self
            .categories()
            .delete_one(doc! { "_id": category_id })
            .await
            .context("Failed to delete category")?;
        if result.deleted_count == 0 {
            return Err(ServiceError::NotFound("Category"));
        }

        self.mongo
            .collection::<Document>("courses")
            .update_many(
                doc! { "category_ids": category_id },
                doc! { "$pull": { "category_ids": category_id } },
            )
            .await
            .context("Failed to detach category from courses")?;

        tracing::info!(category_id = %category_id, "Category deleted");
        Ok(())
    }

    /// Published, active courses filed under the category.
    pub async fn courses(
        &self,
        category_id: ObjectId,
        params: &ListParams,
    ) -> ServiceResult<Paginated<CourseResponse>> {
        self.load(category_id).await?;

        let filter = doc! {
            "category_ids": category_id,
            "is_published": true,
            "is_active": true,
        };
        let sort = query::COURSES.sort(params);
        let page = query::page(params)?;

        let courses = fetch_page(
            &self.mongo.collection::<Course>("courses"),
            filter,
            sort,
            page,
        )
        .await?;
        Ok(courses.map(CourseResponse::from))
    }
}
