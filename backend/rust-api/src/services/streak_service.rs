use anyhow::Context;
use chrono::{NaiveDate, Utc};
use mongodb::bson::{doc, oid::ObjectId};
use mongodb::Database;

use super::error::{ServiceError, ServiceResult};
use super::parse_object_id;
use super::query::{self, fetch_page, ListParams, Paginated};
use crate::context::RequestContext;
use crate::metrics;
use crate::models::streak::{
    CreateStreakRequest, RecordInteractionRequest, RecordOwnInteractionRequest, Streak,
    StreakResponse, StreakType, UpdateStreakRequest,
};

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

pub struct StreakService {
    mongo: Database,
}

impl StreakService {
    pub fn new(mongo: Database) -> Self {
        Self { mongo }
    }

    fn streaks(&self) -> mongodb::Collection<Streak> {
        self.mongo.collection::<Streak>("streaks")
    }

    async fn load(&self, ctx: &RequestContext, streak_id: ObjectId) -> ServiceResult<Streak> {
        ctx.require_user()?;
        let streak = self
            .streaks()
            .find_one(doc! { "_id": streak_id })
            .await
            .context("Failed to query streak")?
            .ok_or(ServiceError::NotFound("Streak"))?;

        if !ctx.is_owner_or_staff(&streak.user_id) {
            return Err(ServiceError::NotFound("Streak"));
        }
        Ok(streak)
    }

    async fn insert(&self, user_id: ObjectId, streak_type: StreakType) -> ServiceResult<Streak> {
        let mut streak = Streak::new(user_id, streak_type);
        let inserted = self
            .streaks()
            .insert_one(&streak)
            .await
            .context("Failed to insert streak")?;
        streak.id = inserted.inserted_id.as_object_id();

        tracing::info!(user_id = %user_id, streak_type = %streak_type, "Streak created");
        Ok(streak)
    }

    pub async fn list(
        &self,
        ctx: &RequestContext,
        params: &ListParams,
    ) -> ServiceResult<Paginated<StreakResponse>> {
        let mut clauses = Vec::new();
        if let Some(user_id) = ctx.owner_scope()? {
            clauses.push(doc! { "user_id": user_id });
        }

        let filter = query::STREAKS.build_filter_with(params, clauses, Vec::new())?;
        let sort = query::STREAKS.sort(params);
        let page = query::page(params)?;

        let today = today();
        let streaks = fetch_page(&self.streaks(), filter, sort, page).await?;
        Ok(streaks.map(|s| StreakResponse::new(s, today)))
    }

    pub async fn get(&self, ctx: &RequestContext, streak_id: ObjectId) -> ServiceResult<StreakResponse> {
        let streak = self.load(ctx, streak_id).await?;
        Ok(StreakResponse::new(streak, today()))
    }

    pub async fn create(
        &self,
        ctx: &RequestContext,
        req: CreateStreakRequest,
    ) -> ServiceResult<StreakResponse> {
        let caller = ctx.require_user()?;
        let user_id = match &req.user {
            Some(user) if ctx.is_staff => parse_object_id("user", user)?,
            _ => caller,
        };

        let existing = self
            .streaks()
            .count_documents(doc! { "user_id": user_id, "type": req.streak_type.days() })
            .await
            .context("Failed to check existing streak")?;
        if existing > 0 {
            return Err(ServiceError::non_field(
                "The fields user, type must make a unique set.",
            ));
        }

        let streak = self.insert(user_id, req.streak_type).await?;
        Ok(StreakResponse::new(streak, today()))
    }

    pub async fn update(
        &self,
        ctx: &RequestContext,
        streak_id: ObjectId,
        req: UpdateStreakRequest,
    ) -> ServiceResult<StreakResponse> {
        let mut streak = self.load(ctx, streak_id).await?;
        if let Some(streak_type) = req.streak_type {
            streak.streak_type = streak_type;
        }
        streak.updated_at = Utc::now();

        self.streaks()
            .replace_one(doc! { "_id": streak_id }, &streak)
            .await
            .context("Failed to update streak")?;

        tracing::info!(streak_id = %streak_id, "Streak updated");
        Ok(StreakResponse::new(streak, today()))
    }

    pub async fn delete(&self, ctx: &RequestContext, streak_id: ObjectId) -> ServiceResult<()> {
        self.load(ctx, streak_id).await?;

        self.streaks()
            .delete_one(doc! { "_id": streak_id })
            .await
            .context("Failed to delete streak")?;

        tracing::info!(streak_id = %streak_id, "Streak deleted");
        Ok(())
    }

    /// Applies one interaction and writes the streak back.
    async fn apply_interaction(
        &self,
        mut streak: Streak,
        date: Option<NaiveDate>,
    ) -> ServiceResult<StreakResponse> {
        let streak_id = streak
            .id
            .ok_or_else(|| anyhow::anyhow!("Streak has no id"))?;
        let today = today();
        let date = date.unwrap_or(today);

        let outcome = streak.record_interaction(date);
        streak.updated_at = Utc::now();

        self.streaks()
            .replace_one(doc! { "_id": streak_id }, &streak)
            .await
            .context("Failed to save streak")?;

        metrics::record_streak_outcome(outcome.as_str());
        tracing::info!(
            streak_id = %streak_id,
            outcome = outcome.as_str(),
            current = streak.current_streak,
            highest = streak.highest_streak,
            "Streak interaction recorded"
        );
        Ok(StreakResponse::new(streak, today))
    }

    pub async fn record_interaction(
        &self,
        ctx: &RequestContext,
        streak_id: ObjectId,
        req: RecordInteractionRequest,
    ) -> ServiceResult<StreakResponse> {
        let streak = self.load(ctx, streak_id).await?;
        self.apply_interaction(streak, req.interaction_date).await
    }

    /// Records an interaction on the caller's streak of the given type, creating it first if needed.
    pub async fn record_own_interaction(
        &self,
        ctx: &RequestContext,
        req: RecordOwnInteractionRequest,
    ) -> ServiceResult<StreakResponse> {
        let user_id = ctx.require_user()?;

        let existing = self
            .streaks()
            .find_one(doc! { "user_id": user_id, "type": req.streak_type.days() })
            .await
            .context("Failed to query streak")?;
        let streak = match existing {
            Some(streak) => streak,
            None => self.insert(user_id, req.streak_type).await?,
        };

        self.apply_interaction(streak, req.interaction_date).await
    }
}
