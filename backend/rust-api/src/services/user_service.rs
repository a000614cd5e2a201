use anyhow::Context;
use chrono::Utc;
use mongodb::bson::{doc, oid::ObjectId, Bson};
use mongodb::Database;

use super::auth_service::{hash_password, verify_password};
use super::error::{ServiceError, ServiceResult};
use super::query::{self, equals_ignore_case, fetch_all, fetch_page, ListParams, Paginated};
use crate::context::RequestContext;
use crate::models::author::Author;
use crate::models::staff::Staff;
use crate::models::user::{
    check_new_password, normalize_email, normalize_phone, normalize_username,
    ChangePasswordRequest, RegisterRequest, UpdateUserRequest, User, UserProfile,
};

pub struct UserService {
    mongo: Database,
}

impl UserService {
    pub fn new(mongo: Database) -> Self {
        Self { mongo }
    }

    fn users(&self) -> mongodb::Collection<User> {
        self.mongo.collection::<User>("users")
    }

    /// Public registration. Field-level format rules are checked by the caller.
    pub async fn register(&self, req: RegisterRequest) -> ServiceResult<UserProfile> {
        let user = self.create_user(req, false).await?;
        tracing::info!(user_id = ?user.id, "User registered");
        self.profile(user).await
    }

    /// Inserts a new account after the password and uniqueness rules pass.
    pub async fn create_user(&self, req: RegisterRequest, is_staff: bool) -> ServiceResult<User> {
        check_new_password(&req.password, &req.confirm_password)?;

        let email = normalize_email(&req.email);
        let username = normalize_username(&req.username);
        let phone_number = normalize_phone(&req.phone_number);
        self.ensure_unique(&email, &username, &phone_number).await?;

        let now = Utc::now();
        let mut user = User {
            id: None,
            email,
            username,
            password_hash: hash_password(&req.password)?,
            firstname: req.firstname,
            lastname: req.lastname,
            gender: req.gender,
            phone_number,
            birth_date: req.birth_date,
            user_type: req.user_type,
            level: req.level,
            is_active: true,
            is_confirmed: false,
            is_staff,
            expire_date: req.expire_date,
            created_at: now,
            updated_at: now,
            last_login_at: None,
        };

        let inserted = self
            .users()
            .insert_one(&user)
            .await
            .context("Failed to insert user")?;
        user.id = inserted.inserted_id.as_object_id();

        Ok(user)
    }

    async fn ensure_unique(&self, email: &str, username: &str, phone_number: &str) -> ServiceResult<()> {
        let users = self.users();

        let email_taken = users
            .count_documents(doc! { "email": equals_ignore_case(email) })
            .await
            .context("Failed to check existing email")?;
        if email_taken > 0 {
            return Err(ServiceError::validation(
                "email",
                "A user with that email already exists.",
            ));
        }

        let username_taken = users
            .count_documents(doc! { "username": username })
            .await
            .context("Failed to check existing username")?;
        if username_taken > 0 {
            return Err(ServiceError::validation(
                "username",
                "A user with that username already exists.",
            ));
        }

        let phone_taken = users
            .count_documents(doc! { "phone_number": phone_number })
            .await
            .context("Failed to check existing phone number")?;
        if phone_taken > 0 {
            return Err(ServiceError::validation(
                "phone_number",
                "A user with that phone number already exists.",
            ));
        }

        Ok(())
    }

    /// Staff role name, `author`, or `student`
    pub async fn resolve_role(&self, user_id: ObjectId) -> ServiceResult<String> {
        let staff = self
            .mongo
            .collection::<Staff>("staff")
            .find_one(doc! { "user_id": user_id })
            .await
            .context("Failed to query staff record")?;
        if let Some(staff) = staff {
            return Ok(staff.role_type.as_str().to_string());
        }

        let author = self
            .mongo
            .collection::<Author>("authors")
            .count_documents(doc! { "user_id": user_id })
            .await
            .context("Failed to query author profile")?;
        Ok(if author > 0 { "author" } else { "student" }.to_string())
    }

    async fn profile(&self, user: User) -> ServiceResult<UserProfile> {
        let role = match user.id {
            Some(id) => self.resolve_role(id).await?,
            None => "student".to_string(),
        };
        Ok(UserProfile::new(user, role))
    }

    pub async fn load(&self, user_id: ObjectId) -> ServiceResult<User> {
        self.users()
            .find_one(doc! { "_id": user_id })
            .await
            .context("Failed to query user")?
            .ok_or(ServiceError::NotFound("User"))
    }

    pub async fn list(
        &self,
        ctx: &RequestContext,
        params: &ListParams,
    ) -> ServiceResult<Paginated<UserProfile>> {
        let mut clauses = Vec::new();
        if let Some(user_id) = ctx.owner_scope()? {
            clauses.push(doc! { "_id": user_id });
        }

        let filter = query::USERS.build_filter_with(params, clauses, Vec::new())?;
        let sort = query::USERS.sort(params);
        let page = query::page(params)?;

        let users = fetch_page(&self.users(), filter, sort, page).await?;

        let mut results = Vec::with_capacity(users.results.len());
        for user in users.results {
            results.push(self.profile(user).await?);
        }
        Ok(Paginated::new(users.count, page, results))
    }

    pub async fn get(&self, ctx: &RequestContext, user_id: ObjectId) -> ServiceResult<UserProfile> {
        ctx.ensure_owner_or_staff(&user_id)?;
        let user = self.load(user_id).await?;
        self.profile(user).await
    }

    pub async fn update(
        &self,
        ctx: &RequestContext,
        user_id: ObjectId,
        req: UpdateUserRequest,
    ) -> ServiceResult<UserProfile> {
        ctx.ensure_owner_or_staff(&user_id)?;
        let mut user = self.load(user_id).await?;

        let old_phone = user.phone_number.clone();
        req.apply_to(&mut user);
        if user.phone_number != old_phone {
            let taken = self
                .users()
                .count_documents(doc! { "phone_number": &user.phone_number, "_id": { "$ne": user_id } })
                .await
                .context("Failed to check existing phone number")?;
            if taken > 0 {
                return Err(ServiceError::validation(
                    "phone_number",
                    "A user with that phone number already exists.",
                ));
            }
        }
        user.updated_at = Utc::now();

        self.users()
            .replace_one(doc! { "_id": user_id }, &user)
            .await
            .context("Failed to update user")?;

        tracing::info!(user_id = %user_id, "User updated");
        self.profile(user).await
    }

    /// Removes the account and everything owned by it.
    pub async fn delete(&self, ctx: &RequestContext, user_id: ObjectId) -> ServiceResult<()> {
        ctx.ensure_owner_or_staff(&user_id)?;
        self.load(user_id).await?;

        let authors = fetch_all(
            &self.mongo.collection::<Author>("authors"),
            doc! { "user_id": user_id },
        )
        .await?;
        for author in authors.iter().filter_map(|a| a.id) {
            self.mongo
                .collection::<mongodb::bson::Document>("courses")
                .update_many(
                    doc! { "author_ids": author },
                    doc! { "$pull": { "author_ids": author } },
                )
                .await
                .context("Failed to detach author from courses")?;
        }

        let staff = fetch_all(
            &self.mongo.collection::<Staff>("staff"),
            doc! { "user_id": user_id },
        )
        .await?;
        for staff_id in staff.iter().filter_map(|s| s.id) {
            self.mongo
                .collection::<mongodb::bson::Document>("questions")
                .update_many(
                    doc! { "editor_id": staff_id },
                    doc! { "$set": { "editor_id": Bson::Null } },
                )
                .await
                .context("Failed to clear question editors")?;
        }

        for collection in ["authors", "staff", "user_courses", "streaks", "user_responses"] {
            self.mongo
                .collection::<mongodb::bson::Document>(collection)
                .delete_many(doc! { "user_id": user_id })
                .await
                .with_context(|| format!("Failed to delete user's {}", collection))?;
        }

        self.users()
            .delete_one(doc! { "_id": user_id })
            .await
            .context("Failed to delete user")?;

        tracing::info!(user_id = %user_id, "User deleted");
        Ok(())
    }

    pub async fn change_password(
        &self,
        ctx: &RequestContext,
        user_id: ObjectId,
        req: ChangePasswordRequest,
    ) -> ServiceResult<()> {
        ctx.ensure_owner_or_staff(&user_id)?;
        let user = self.load(user_id).await?;

        if req.new_password != req.confirm_password {
            return Err(ServiceError::validation(
                "confirm_password",
                "New passwords don't match",
            ));
        }
        if !verify_password(&req.old_password, &user.password_hash).unwrap_or(false) {
            tracing::warn!(user_id = %user_id, "Password change rejected: wrong old password");
            return Err(ServiceError::validation("old_password", "Wrong password"));
        }
        check_new_password(&req.new_password, &req.confirm_password)?;

        self.users()
            .update_one(
                doc! { "_id": user_id },
                doc! { "$set": {
                    "password_hash": hash_password(&req.new_password)?,
                    "updatedAt": mongodb::bson::DateTime::now(),
                } },
            )
            .await
            .context("Failed to update password")?;

        tracing::info!(user_id = %user_id, "Password changed");
        Ok(())
    }

    pub async fn confirm_email(&self, ctx: &RequestContext, user_id: ObjectId) -> ServiceResult<()> {
        ctx.ensure_owner_or_staff(&user_id)?;

        let result = self
            .users()
            .update_one(
                doc! { "_id": user_id },
                doc! { "$set": {
                    "is_confirmed": true,
                    "updatedAt": mongodb::bson::DateTime::now(),
                } },
            )
            .await
            .context("Failed to confirm email")?;

        if result.matched_count == 0 {
            return Err(ServiceError::NotFound("User"));
        }

        tracing::info!(user_id = %user_id, "Email confirmed");
        Ok(())
    }
}
