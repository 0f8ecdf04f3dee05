use std::sync::Arc;

use serde_json::Value;
use uuid::Uuid;

use crate::auth::{hash_password, verify_password};
use crate::config::DirectoryConfig;
use crate::error::{DirectoryError, DirectoryResult};
use crate::models::user::{email_from_key, email_key, normalize_email};
use crate::models::{ProfileUpdate, User};
use crate::store::{child_path, DocumentStore, StoreError};

/// User documents keyed by sanitized email under the users collection
#[derive(Clone)]
pub struct UserDirectory {
    store: Arc<dyn DocumentStore>,
    users_path: String,
    rules: DirectoryConfig,
}

impl UserDirectory {
    pub fn new(store: Arc<dyn DocumentStore>, users_path: impl Into<String>, rules: DirectoryConfig) -> Self {
        Self {
            store,
            users_path: users_path.into(),
            rules,
        }
    }

    fn path(&self, email: &str) -> DirectoryResult<String> {
        child_path(&self.users_path, &email_key(email))
            .map_err(|_| DirectoryError::invalid_input(format!("Invalid email: '{}'", email)))
    }

    fn validate_email(&self, email: &str) -> DirectoryResult<()> {
        let domain = self.rules.institutional_domain.to_lowercase();
        let local = email.strip_suffix(domain.as_str()).unwrap_or("");
        if local.is_empty() || local.contains('@') {
            return Err(DirectoryError::invalid_input(format!(
                "Email must be an institutional {} address",
                self.rules.institutional_domain
            )));
        }
        Ok(())
    }

    fn validate_password(&self, password: &str) -> DirectoryResult<()> {
        if password.chars().count() < self.rules.min_password_len {
            return Err(DirectoryError::invalid_input(format!(
                "Password must be at least {} characters",
                self.rules.min_password_len
            )));
        }
        Ok(())
    }

    async fn save(&self, user: &User) -> DirectoryResult<()> {
        let path = self.path(&user.email)?;
        let doc = serde_json::to_value(user).map_err(|e| StoreError::Corrupt {
            path: path.clone(),
            message: e.to_string(),
        })?;
        self.store.set(&path, &doc).await?;
        Ok(())
    }

    /// Register a new account
    pub async fn register(
        &self,
        full_name: &str,
        email: &str,
        password: &str,
        program: &str,
    ) -> DirectoryResult<User> {
        let full_name = full_name.trim();
        let program = program.trim();
        let email = normalize_email(email);
        if full_name.is_empty() || email.is_empty() || password.is_empty() || program.is_empty() {
            return Err(DirectoryError::invalid_input("All fields are required"));
        }
        self.validate_email(&email)?;
        self.validate_password(password)?;

        let path = self.path(&email)?;
        if self.store.get(&path).await?.is_some() {
            return Err(DirectoryError::conflict(format!("{} is already registered", email)));
        }

        let user = User {
            id: Uuid::new_v4().to_string(),
            full_name: full_name.to_string(),
            email,
            password_hash: hash_password(password),
            program: program.to_string(),
            group_ids: Vec::new(),
            bio: String::new(),
        };
        self.save(&user).await?;

        tracing::info!("Registered user {}", user.email);
        Ok(user)
    }

    /// Check credentials and return the account
    pub async fn authenticate(&self, email: &str, password: &str) -> DirectoryResult<User> {
        let user = self
            .get(email)
            .await?
            .ok_or_else(|| DirectoryError::not_found(format!("User {} not found", normalize_email(email))))?;

        if !verify_password(&user.password_hash, password) {
            tracing::debug!("Rejected credentials for {}", user.email);
            return Err(DirectoryError::authorization_denied("Incorrect password"));
        }
        Ok(user)
    }

    /// Fetch a user; a document under the key that belongs to another email
    /// is not this user
    pub async fn get(&self, email: &str) -> DirectoryResult<Option<User>> {
        let email = normalize_email(email);
        let path = self.path(&email)?;
        let Some(doc) = self.store.get(&path).await? else {
            return Ok(None);
        };

        let user = decode_user(&path, doc)?;
        if normalize_email(&user.email) != email {
            tracing::warn!("User document {} belongs to {}, not {}", path, user.email, email);
            return Ok(None);
        }
        Ok(Some(user))
    }

    /// Partial profile update; empty values are ignored
    pub async fn update_profile(&self, email: &str, update: ProfileUpdate) -> DirectoryResult<User> {
        let mut user = self
            .get(email)
            .await?
            .ok_or_else(|| DirectoryError::not_found(format!("User {} not found", normalize_email(email))))?;

        fn present(value: Option<String>) -> Option<String> {
            value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
        }

        if let Some(full_name) = present(update.full_name) {
            user.full_name = full_name;
        }
        if let Some(password) = update.password.filter(|p| !p.is_empty()) {
            self.validate_password(&password)?;
            user.password_hash = hash_password(&password);
        }
        if let Some(program) = present(update.program) {
            user.program = program;
        }
        if let Some(bio) = present(update.bio) {
            user.bio = bio;
        }

        self.save(&user).await?;
        tracing::info!("Updated profile of {}", user.email);
        Ok(user)
    }

    /// Overwrite the cached group list; missing users are skipped
    pub async fn set_group_ids(&self, email: &str, group_ids: Vec<String>) -> DirectoryResult<bool> {
        let Some(mut user) = self.get(email).await? else {
            return Ok(false);
        };
        if user.group_ids == group_ids {
            return Ok(false);
        }
        user.group_ids = group_ids;
        self.save(&user).await?;
        Ok(true)
    }

    /// Read-modify-write on the cached group list; missing users are skipped
    pub async fn edit_group_ids(
        &self,
        email: &str,
        edit: impl FnOnce(&mut User) -> bool,
    ) -> DirectoryResult<bool> {
        let Some(mut user) = self.get(email).await? else {
            return Ok(false);
        };
        if !edit(&mut user) {
            return Ok(false);
        }
        self.save(&user).await?;
        Ok(true)
    }

    /// Remove the user document only; cascading lives in the coordinator
    pub async fn delete(&self, email: &str) -> DirectoryResult<()> {
        let path = self.path(email)?;
        self.store.delete(&path).await?;
        tracing::info!("Deleted user document {}", path);
        Ok(())
    }
}

/// Decode a stored user; documents without an email take it from their key
fn decode_user(path: &str, doc: Value) -> Result<User, StoreError> {
    let mut user: User = serde_json::from_value(doc).map_err(|e| StoreError::Corrupt {
        path: path.to_string(),
        message: e.to_string(),
    })?;
    if user.email.trim().is_empty() {
        let key = path.rsplit('/').next().unwrap_or_default();
        user.email = email_from_key(key).ok_or_else(|| StoreError::Corrupt {
            path: path.to_string(),
            message: "document has no email and its key is not an email key".to_string(),
        })?;
    }
    Ok(user)
}
