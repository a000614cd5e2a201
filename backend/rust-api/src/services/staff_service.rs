use anyhow::Context;
use mongodb::bson::{doc, oid::ObjectId, Bson, Document};
use mongodb::Database;

use super::error::{ServiceError, ServiceResult};
use super::query::{self, fetch_page, ListParams, Paginated};
use super::user_service::UserService;
use crate::context::RequestContext;
use crate::models::staff::{CreateStaffRequest, Staff, StaffResponse, UpdateStaffRequest};
use crate::models::user::{User, UserSummary};

pub struct StaffService {
    mongo: Database,
}

impl StaffService {
    pub fn new(mongo: Database) -> Self {
        Self { mongo }
    }

    fn staff(&self) -> mongodb::Collection<Staff> {
        self.mongo.collection::<Staff>("staff")
    }

    async fn load(&self, staff_id: ObjectId) -> ServiceResult<Staff> {
        self.staff()
            .find_one(doc! { "_id": staff_id })
            .await
            .context("Failed to query staff")?
            .ok_or(ServiceError::NotFound("Staff"))
    }

    async fn respond(&self, staff: Staff) -> ServiceResult<StaffResponse> {
        let user = self
            .mongo
            .collection::<User>("users")
            .find_one(doc! { "_id": staff.user_id })
            .await
            .context("Failed to query staff user")?
            .map(|u| UserSummary::from(&u));
        Ok(StaffResponse::new(staff, user))
    }

    pub async fn list(
        &self,
        ctx: &RequestContext,
        params: &ListParams,
    ) -> ServiceResult<Paginated<StaffResponse>> {
        ctx.require_staff()?;

        let filter = query::STAFF.build_filter(params)?;
        let sort = query::STAFF.sort(params);
        let page = query::page(params)?;

        let staff = fetch_page(&self.staff(), filter, sort, page).await?;

        let mut results = Vec::with_capacity(staff.results.len());
        for member in staff.results {
            results.push(self.respond(member).await?);
        }
        Ok(Paginated::new(staff.count, page, results))
    }

    pub async fn get(&self, ctx: &RequestContext, staff_id: ObjectId) -> ServiceResult<StaffResponse> {
        ctx.require_staff()?;
        let staff = self.load(staff_id).await?;
        self.respond(staff).await
    }

    /// Creates the account and its staff record together.
    pub async fn create(
        &self,
        ctx: &RequestContext,
        req: CreateStaffRequest,
    ) -> ServiceResult<StaffResponse> {
        ctx.require_staff()?;

        let user = UserService::new(self.mongo.clone())
            .create_user(req.user, true)
            .await?;
        let user_id = user
            .id
            .ok_or_else(|| anyhow::anyhow!("Inserted user has no id"))?;

        let mut staff = Staff {
            id: None,
            user_id,
            role_type: req.role_type,
        };
        let inserted = self
            .staff()
            .insert_one(&staff)
            .await
            .context("Failed to insert staff")?;
        staff.id = inserted.inserted_id.as_object_id();

        tracing::info!(
            staff_id = ?staff.id,
            user_id = %user_id,
            role = staff.role_type.as_str(),
            "Staff member created"
        );
        Ok(StaffResponse::new(staff, Some(UserSummary::from(&user))))
    }

    pub async fn update(
        &self,
        ctx: &RequestContext,
        staff_id: ObjectId,
        req: UpdateStaffRequest,
    ) -> ServiceResult<StaffResponse> {
        ctx.require_staff()?;
        let mut staff = self.load(staff_id).await?;

        if let Some(role_type) = req.role_type {
            staff.role_type = role_type;
        }

        self.staff()
            .replace_one(doc! { "_id": staff_id }, &staff)
            .await
            .context("Failed to update staff")?;

        tracing::info!(staff_id = %staff_id, role = staff.role_type.as_str(), "Staff member updated");
        self.respond(staff).await
    }

    /// Removes the staff record; the account stays but loses staff access.
    pub async fn delete(&self, ctx: &RequestContext, staff_id: ObjectId) -> ServiceResult<()> {
        ctx.require_staff()?;
        let staff = self.load(staff_id).await?;

        self.staff()
            .delete_one(doc! { "_id": staff_id })
            .await
            .context("Failed to delete staff")?;

        self.mongo
            .collection::<User>("users")
            .update_one(
                doc! { "_id": staff.user_id },
                doc! { "$set": {
                    "is_staff": false,
                    "updatedAt": mongodb::bson::DateTime::now(),
                } },
            )
            .await
            .context("Failed to clear staff flag")?;

        self.mongo
            .collection::<Document>("questions")
            .update_many(
                doc! { "editor_id": staff_id },
                doc! { "$set": { "editor_id": Bson::Null } },
            )
            .await
            .context("Failed to clear question editors")?;

        tracing::info!(staff_id = %staff_id, user_id = %staff.user_id, "Staff member deleted");
        Ok(())
    }
}
