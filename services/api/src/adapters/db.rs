//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete
//! implementation of the store ports from the `inventory_core` crate. It
//! handles all interactions with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use inventory_core::domain::{
    Material, MaterialPatch, NewMaterial, NewUser, User, UserCredentials, UserPatch,
};
use inventory_core::ports::{
    MaterialFilter, MaterialStore, PortError, PortResult, SessionStore, UserStore,
};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `MaterialStore`, `UserStore`, and
/// `SessionStore` ports.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    /// Cheap connectivity probe for the status endpoint.
    pub async fn ping(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

fn not_found_or_unexpected(e: sqlx::Error, what: impl FnOnce() -> String) -> PortError {
    match e {
        sqlx::Error::RowNotFound => PortError::NotFound(what()),
        _ => unexpected(e),
    }
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

const MATERIAL_COLUMNS: &str =
    "id, name, price, category, stock, provider, unit, description, active, created_at, updated_at";

#[derive(FromRow)]
struct MaterialRecord {
    id: Uuid,
    name: String,
    price: f64,
    category: String,
    stock: i32,
    provider: String,
    unit: String,
    description: Option<String>,
    active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl MaterialRecord {
    fn to_domain(self) -> Material {
        Material {
            id: self.id,
            name: self.name,
            price: self.price,
            category: self.category,
            stock: self.stock,
            provider: self.provider,
            unit: self.unit,
            description: self.description,
            active: self.active,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

const USER_COLUMNS: &str =
    "id, name, document_type, document_number, role, password_hash, created_at, updated_at";

#[derive(FromRow)]
struct UserRecord {
    id: Uuid,
    name: String,
    document_type: String,
    document_number: String,
    role: String,
    password_hash: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl UserRecord {
    fn to_domain(self) -> PortResult<User> {
        // Enums are stored as their wire names; an unknown value means the
        // table was written by something newer than this binary.
        let document_type = self
            .document_type
            .parse()
            .map_err(|_| PortError::Unexpected(format!("bad document_type '{}'", self.document_type)))?;
        let role = self
            .role
            .parse()
            .map_err(|_| PortError::Unexpected(format!("bad role '{}'", self.role)))?;
        Ok(User {
            id: self.id,
            name: self.name,
            document_type,
            document_number: self.document_number,
            role,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }

    fn to_credentials(self) -> PortResult<UserCredentials> {
        let password_hash = self.password_hash.clone();
        Ok(UserCredentials {
            user: self.to_domain()?,
            password_hash,
        })
    }
}

//=========================================================================================
// `MaterialStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl MaterialStore for DbAdapter {
    async fn list(&self, filter: &MaterialFilter) -> PortResult<Vec<Material>> {
        let sql = format!(
            "SELECT {MATERIAL_COLUMNS} FROM materials \
             WHERE active = TRUE \
               AND ($1::text IS NULL OR category = $1) \
               AND ($2::text IS NULL OR provider ILIKE '%' || $2 || '%') \
               AND ($3::text IS NULL \
                    OR name ILIKE '%' || $3 || '%' \
                    OR category ILIKE '%' || $3 || '%' \
                    OR provider ILIKE '%' || $3 || '%') \
             ORDER BY created_at DESC"
        );
        let records: Vec<MaterialRecord> = sqlx::query_as(&sql)
            .bind(filter.category.as_deref())
            .bind(filter.provider.as_deref())
            .bind(filter.search.as_deref())
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn get(&self, id: Uuid) -> PortResult<Material> {
        let sql = format!("SELECT {MATERIAL_COLUMNS} FROM materials WHERE id = $1");
        let record: MaterialRecord = sqlx::query_as(&sql)
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| not_found_or_unexpected(e, || format!("Material {} not found", id)))?;
        Ok(record.to_domain())
    }

    async fn insert(&self, material: NewMaterial) -> PortResult<Material> {
        let sql = format!(
            "INSERT INTO materials (id, name, price, category, stock, provider, unit, description) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {MATERIAL_COLUMNS}"
        );
        let record: MaterialRecord = sqlx::query_as(&sql)
            .bind(Uuid::new_v4())
            .bind(material.name.trim())
            .bind(material.price)
            .bind(&material.category)
            .bind(material.stock)
            .bind(&material.provider)
            .bind(&material.unit)
            .bind(material.description.as_deref())
            .fetch_one(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn insert_many(&self, materials: Vec<NewMaterial>) -> PortResult<Vec<Material>> {
        // Inserted one at a time inside a transaction so a bad payload does
        // not leave a half-written batch behind.
        let mut tx = self.pool.begin().await.map_err(unexpected)?;
        let sql = format!(
            "INSERT INTO materials (id, name, price, category, stock, provider, unit, description) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {MATERIAL_COLUMNS}"
        );
        let mut created = Vec::with_capacity(materials.len());
        for material in &materials {
            let record: MaterialRecord = sqlx::query_as(&sql)
                .bind(Uuid::new_v4())
                .bind(material.name.trim())
                .bind(material.price)
                .bind(&material.category)
                .bind(material.stock)
                .bind(&material.provider)
                .bind(&material.unit)
                .bind(material.description.as_deref())
                .fetch_one(&mut *tx)
                .await
                .map_err(unexpected)?;
            created.push(record.to_domain());
        }
        tx.commit().await.map_err(unexpected)?;
        Ok(created)
    }

    async fn update(&self, id: Uuid, patch: &MaterialPatch) -> PortResult<Material> {
        let sql = format!(
            "UPDATE materials SET \
               name = COALESCE($2, name), \
               price = COALESCE($3, price), \
               category = COALESCE($4, category), \
               stock = COALESCE($5, stock), \
               provider = COALESCE($6, provider), \
               unit = COALESCE($7, unit), \
               description = COALESCE($8, description), \
               active = COALESCE($9, active), \
               updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {MATERIAL_COLUMNS}"
        );
        let record: MaterialRecord = sqlx::query_as(&sql)
            .bind(id)
            .bind(patch.name.as_deref())
            .bind(patch.price)
            .bind(patch.category.as_deref())
            .bind(patch.stock)
            .bind(patch.provider.as_deref())
            .bind(patch.unit.as_deref())
            .bind(patch.description.as_deref())
            .bind(patch.active)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| not_found_or_unexpected(e, || format!("Material {} not found", id)))?;
        Ok(record.to_domain())
    }

    async fn soft_delete(&self, id: Uuid) -> PortResult<Material> {
        let sql = format!(
            "UPDATE materials SET active = FALSE, updated_at = NOW() \
             WHERE id = $1 RETURNING {MATERIAL_COLUMNS}"
        );
        let record: MaterialRecord = sqlx::query_as(&sql)
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| not_found_or_unexpected(e, || format!("Material {} not found", id)))?;
        Ok(record.to_domain())
    }

    async fn hard_delete(&self, id: Uuid) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM materials WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Material {} not found", id)));
        }
        Ok(())
    }

    async fn distinct_categories(&self) -> PortResult<Vec<String>> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT DISTINCT category FROM materials WHERE active = TRUE ORDER BY category",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(rows.into_iter().map(|(c,)| c).collect())
    }

    async fn distinct_providers(&self) -> PortResult<Vec<String>> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT DISTINCT provider FROM materials WHERE active = TRUE ORDER BY provider",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(rows.into_iter().map(|(p,)| p).collect())
    }

    async fn all_active(&self) -> PortResult<Vec<Material>> {
        let sql = format!(
            "SELECT {MATERIAL_COLUMNS} FROM materials WHERE active = TRUE ORDER BY created_at"
        );
        let records: Vec<MaterialRecord> = sqlx::query_as(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }
}

//=========================================================================================
// `UserStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl UserStore for DbAdapter {
    async fn list(&self) -> PortResult<Vec<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC");
        let records: Vec<UserRecord> = sqlx::query_as(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        records.into_iter().map(|r| r.to_domain()).collect()
    }

    async fn get(&self, id: Uuid) -> PortResult<User> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let record: UserRecord = sqlx::query_as(&sql)
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| not_found_or_unexpected(e, || format!("User {} not found", id)))?;
        record.to_domain()
    }

    async fn find_by_document(&self, document_number: &str) -> PortResult<UserCredentials> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE document_number = $1");
        let record: UserRecord = sqlx::query_as(&sql)
            .bind(document_number)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                not_found_or_unexpected(e, || {
                    format!("No user with document number {}", document_number)
                })
            })?;
        record.to_credentials()
    }

    async fn insert(&self, user: NewUser, password_hash: String) -> PortResult<User> {
        let sql = format!(
            "INSERT INTO users (id, name, document_type, document_number, role, password_hash) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {USER_COLUMNS}"
        );
        let record: UserRecord = sqlx::query_as(&sql)
            .bind(Uuid::new_v4())
            .bind(user.name.trim())
            .bind(user.document_type.as_str())
            .bind(user.document_number.trim())
            .bind(user.role.as_str())
            .bind(&password_hash)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match &e {
                sqlx::Error::Database(db) if db.is_unique_violation() => PortError::Conflict(
                    format!("A user with document number {} already exists", user.document_number),
                ),
                _ => unexpected(e),
            })?;
        record.to_domain()
    }

    async fn update(&self, id: Uuid, patch: &UserPatch) -> PortResult<User> {
        let sql = format!(
            "UPDATE users SET \
               name = COALESCE($2, name), \
               document_type = COALESCE($3, document_type), \
               document_number = COALESCE($4, document_number), \
               role = COALESCE($5, role), \
               password_hash = COALESCE($6, password_hash), \
               updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {USER_COLUMNS}"
        );
        let record: UserRecord = sqlx::query_as(&sql)
            .bind(id)
            .bind(patch.name.as_deref())
            .bind(patch.document_type.map(|t| t.as_str()))
            .bind(patch.document_number.as_deref())
            .bind(patch.role.map(|r| r.as_str()))
            .bind(patch.password_hash.as_deref())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| not_found_or_unexpected(e, || format!("User {} not found", id)))?;
        record.to_domain()
    }

    async fn delete(&self, id: Uuid) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("User {} not found", id)));
        }
        Ok(())
    }
}

//=========================================================================================
// `SessionStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl SessionStore for DbAdapter {
    async fn create(
        &self,
        token: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        sqlx::query("INSERT INTO auth_sessions (token, user_id, expires_at) VALUES ($1, $2, $3)")
            .bind(token)
            .bind(user_id)
            .bind(expires_at)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn validate(&self, token: &str) -> PortResult<Uuid> {
        let row: (Uuid,) = sqlx::query_as(
            "SELECT user_id FROM auth_sessions WHERE token = $1 AND expires_at > NOW()",
        )
        .bind(token)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| not_found_or_unexpected(e, || "Session not found".to_string()))?;
        Ok(row.0)
    }

    async fn delete(&self, token: &str) -> PortResult<()> {
        sqlx::query("DELETE FROM auth_sessions WHERE token = $1")
            .bind(token)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }
}
