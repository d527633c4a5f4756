//! Per-user repository of connected-space credentials.
//!
//! Each user owns one namespaced record (`documint_spaces_<userId>`) holding
//! a JSON array of [`SpaceCredential`]s. The record is read on every search
//! and written on connect, rename, locale change, and disconnect. Every
//! operation takes the user id explicitly — there is no ambient session
//! lookup, which keeps tenant isolation visible at the call site.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::SpaceCredential;

const KEY_NAMESPACE: &str = "documint_spaces";

fn user_key(user_id: &str) -> String {
    format!("{}_{}", KEY_NAMESPACE, user_id)
}

/// A credential to be connected, before an id is assigned.
#[derive(Debug, Clone)]
pub struct NewCredential {
    pub name: String,
    pub space_id: String,
    pub access_token: String,
    pub default_locale: Option<String>,
}

/// Repository of connected-space credentials, keyed by user.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// All spaces connected by the user, in connect order.
    async fn list(&self, user_id: &str) -> Result<Vec<SpaceCredential>, StoreError>;

    /// Connect a new space. Fails with [`StoreError::Duplicate`] when the
    /// user already connected the same external space id.
    async fn add(
        &self,
        user_id: &str,
        new_credential: NewCredential,
    ) -> Result<SpaceCredential, StoreError>;

    /// Change the display name of a connected space.
    async fn rename(
        &self,
        user_id: &str,
        credential_id: &str,
        name: &str,
    ) -> Result<SpaceCredential, StoreError>;

    /// Set or clear the preferred locale used during normalization.
    async fn set_default_locale(
        &self,
        user_id: &str,
        credential_id: &str,
        locale: Option<String>,
    ) -> Result<SpaceCredential, StoreError>;

    /// Disconnect a space.
    async fn remove(&self, user_id: &str, credential_id: &str) -> Result<(), StoreError>;
}

/// SQLite-backed credential store.
pub struct SqliteCredentialStore {
    pool: SqlitePool,
}

impl SqliteCredentialStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn load(&self, user_id: &str) -> Result<Vec<SpaceCredential>, StoreError> {
        let row = sqlx::query("SELECT value FROM credentials WHERE key = ?")
            .bind(user_key(user_id))
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let value: String = row.get("value");
                Ok(serde_json::from_str(&value)?)
            }
            None => Ok(Vec::new()),
        }
    }

    async fn save(
        &self,
        user_id: &str,
        credentials: &[SpaceCredential],
    ) -> Result<(), StoreError> {
        let value = serde_json::to_string(credentials)?;
        sqlx::query(
            "INSERT INTO credentials (key, value, updated_at) VALUES (?, ?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        )
        .bind(user_key(user_id))
        .bind(value)
        .bind(Utc::now().timestamp())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl CredentialStore for SqliteCredentialStore {
    async fn list(&self, user_id: &str) -> Result<Vec<SpaceCredential>, StoreError> {
        self.load(user_id).await
    }

    async fn add(
        &self,
        user_id: &str,
        new_credential: NewCredential,
    ) -> Result<SpaceCredential, StoreError> {
        let mut credentials = self.load(user_id).await?;

        if credentials
            .iter()
            .any(|c| c.space_id == new_credential.space_id)
        {
            return Err(StoreError::Duplicate(new_credential.space_id));
        }

        let credential = SpaceCredential {
            id: Uuid::new_v4().to_string(),
            name: new_credential.name,
            space_id: new_credential.space_id,
            access_token: new_credential.access_token,
            user_id: user_id.to_string(),
            default_locale: new_credential.default_locale,
            created_at: Utc::now(),
        };

        credentials.push(credential.clone());
        self.save(user_id, &credentials).await?;
        Ok(credential)
    }

    async fn rename(
        &self,
        user_id: &str,
        credential_id: &str,
        name: &str,
    ) -> Result<SpaceCredential, StoreError> {
        let mut credentials = self.load(user_id).await?;

        let credential = credentials
            .iter_mut()
            .find(|c| c.id == credential_id)
            .ok_or_else(|| StoreError::NotFound(credential_id.to_string()))?;

        credential.name = name.to_string();
        let updated = credential.clone();
        self.save(user_id, &credentials).await?;
        Ok(updated)
    }

    async fn set_default_locale(
        &self,
        user_id: &str,
        credential_id: &str,
        locale: Option<String>,
    ) -> Result<SpaceCredential, StoreError> {
        let mut credentials = self.load(user_id).await?;

        let credential = credentials
            .iter_mut()
            .find(|c| c.id == credential_id)
            .ok_or_else(|| StoreError::NotFound(credential_id.to_string()))?;

        credential.default_locale = locale;
        let updated = credential.clone();
        self.save(user_id, &credentials).await?;
        Ok(updated)
    }

    async fn remove(&self, user_id: &str, credential_id: &str) -> Result<(), StoreError> {
        let mut credentials = self.load(user_id).await?;
        let before = credentials.len();
        credentials.retain(|c| c.id != credential_id);

        if credentials.len() == before {
            return Err(StoreError::NotFound(credential_id.to_string()));
        }

        self.save(user_id, &credentials).await
    }
}
