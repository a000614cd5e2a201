use crate::config::Config;
use crate::models::staff::StaffRole;
use crate::models::user::{normalize_email, normalize_phone, normalize_username, User};
use anyhow::{Context, Result};
use bcrypt::{hash, DEFAULT_COST};
use chrono::Utc;
use mongodb::{
    bson::{doc, Document},
    Database,
};
use serde::Deserialize;
use std::path::Path;
use tokio::fs;

#[derive(Debug, Deserialize)]
pub struct SuperuserSeed {
    pub email: String,
    #[serde(default = "default_superuser_username")]
    pub username: String,
    #[serde(default = "default_superuser_firstname")]
    pub firstname: String,
    #[serde(default = "default_superuser_lastname")]
    pub lastname: String,
    pub phone_number: String,
    /// Plain-text password from seed file (will be hashed before storage)
    pub password: String,
}

fn default_superuser_username() -> String {
    "admin".to_string()
}

fn default_superuser_firstname() -> String {
    "Super".to_string()
}

fn default_superuser_lastname() -> String {
    "Admin".to_string()
}

impl SuperuserSeed {
    fn into_user(self, password_cost: u32) -> Result<User> {
        let password_hash =
            hash(&self.password, password_cost).context("Failed to hash superuser password")?;
        let now = Utc::now();

        Ok(User {
            id: None,
            email: normalize_email(&self.email),
            username: normalize_username(&self.username),
            password_hash,
            firstname: self.firstname,
            lastname: self.lastname,
            gender: Default::default(),
            phone_number: normalize_phone(&self.phone_number),
            birth_date: None,
            user_type: Default::default(),
            level: Default::default(),
            is_active: true,
            is_confirmed: true,
            is_staff: true,
            expire_date: None,
            created_at: now,
            updated_at: now,
            last_login_at: None,
        })
    }
}

pub async fn bootstrap(config: &Config, mongo: &Database) -> Result<()> {
    tracing::debug!(
        "Checking for superuser seed file config: {:?}",
        config.superuser_seed_file
    );

    let path = match &config.superuser_seed_file {
        Some(path) if !path.is_empty() => {
            tracing::info!("Found superuser seed file path: {}", path);
            Path::new(path)
        }
        _ => {
            tracing::debug!("No superuser seed file configured, skipping bootstrap");
            return Ok(());
        }
    };

    if !path.exists() {
        tracing::warn!(
            "Superuser seed file {} not found, skipping bootstrap",
            path.display()
        );
        return Ok(());
    }

    let contents = fs::read_to_string(path)
        .await
        .context("Failed to read superuser seed file")?;

    let seed: SuperuserSeed =
        serde_json::from_str(&contents).context("Failed to deserialize superuser seed payload")?;

    let user = seed.into_user(DEFAULT_COST)?;
    let email = user.email.clone();
    let user_doc = mongodb::bson::to_document(&user).context("Failed to encode superuser")?;
    let users = mongo.collection::<Document>("users");
    tracing::info!("Bootstrapping superuser with email {}", email);

    let update = users
        .update_one(doc! { "email": &email }, doc! { "$setOnInsert": user_doc })
        .upsert(true)
        .await
        .context("Failed to insert superuser")?;

    if update.upserted_id.is_some() {
        tracing::info!("Superuser inserted; remove seed file to prevent rerun");
    } else {
        // an existing account is promoted, its password is left alone
        users
            .update_one(
                doc! { "email": &email },
                doc! { "$set": { "is_staff": true, "is_active": true, "is_confirmed": true } },
            )
            .await
            .context("Failed to promote existing superuser")?;
        tracing::info!("Superuser already exists, staff flags ensured");
    }

    let stored = users
        .find_one(doc! { "email": &email })
        .await
        .context("Failed to read superuser")?
        .ok_or_else(|| anyhow::anyhow!("Superuser missing after upsert"))?;
    let user_id = stored
        .get_object_id("_id")
        .context("Superuser has no ObjectId")?;

    mongo
        .collection::<Document>("staff")
        .update_one(
            doc! { "user_id": user_id },
            doc! { "$setOnInsert": { "user_id": user_id, "role_type": StaffRole::Admin.as_str() } },
        )
        .upsert(true)
        .await
        .context("Failed to insert superuser staff record")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_becomes_confirmed_staff_user() {
        let seed: SuperuserSeed = serde_json::from_value(serde_json::json!({
            "email": "Root@Example.COM",
            "phone_number": "+98 912 000 0000",
            "password": "change-me-now"
        }))
        .unwrap();

        let user = seed.into_user(4).unwrap();
        assert_eq!(user.email, "Root@example.com");
        assert_eq!(user.username, "admin");
        assert_eq!(user.phone_number, "+989120000000");
        assert!(user.is_staff && user.is_active && user.is_confirmed);
        assert!(bcrypt::verify("change-me-now", &user.password_hash).unwrap());
    }
}
