//! PostgreSQL implementation of the user and equipment stores.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions, Postgres};
use sqlx::QueryBuilder;
use std::time::Duration;
use uuid::Uuid;

use super::lockout::{remaining_seconds, LockoutPolicy};
use super::store::{EquipmentStore, LockoutStatus, LoginGate, StoreError, UserStore};
use crate::config::DatabaseConfig;
use crate::models::{Equipment, EquipmentFilter, EquipmentPatch, User};

/// PostgreSQL database wrapper.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Opens the pool and applies pending migrations from `migrations/`.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, anyhow::Error> {
        tracing::info!(
            max_connections = config.max_connections,
            "Connecting to PostgreSQL"
        );

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(600))
            .connect(&config.url)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!("Database migrations applied");

        Ok(Self::new(pool))
    }
}

/// Maps driver errors, keeping unique violations distinguishable.
fn map_err(e: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.is_unique_violation() {
            let constraint = db_err.constraint().unwrap_or("unique").to_string();
            return StoreError::UniqueViolation(constraint);
        }
    }
    StoreError::Backend(anyhow::anyhow!(e))
}

/// `%needle%` with LIKE wildcards in the needle escaped.
fn like_pattern(needle: &str) -> String {
    let escaped = needle
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

#[derive(sqlx::FromRow)]
struct GateRow {
    active_lock: Option<DateTime<Utc>>,
}

impl GateRow {
    fn gate(&self) -> LoginGate {
        match self.active_lock {
            Some(until) => LoginGate::Locked {
                remaining_seconds: remaining_seconds(until, Utc::now()).max(1),
            },
            None => LoginGate::Open,
        }
    }
}

#[derive(sqlx::FromRow)]
struct LockoutRow {
    failed_login_attempts: i32,
    locked_until: Option<DateTime<Utc>>,
}

#[async_trait]
impl UserStore for Database {
    async fn find_user_by_email(
        &self,
        organization_id: Uuid,
        email: &str,
    ) -> Result<Option<User>, StoreError> {
        sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE organization_id = $1 AND LOWER(email) = LOWER($2)",
        )
        .bind(organization_id)
        .bind(email.trim())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_err)
    }

    async fn find_user_by_id(&self, user_id: Uuid) -> Result<Option<User>, StoreError> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_err)
    }

    async fn create_user(&self, user: &User) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO users (id, organization_id, email, password_hash, role_id, status,
                               failed_login_attempts, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(user.id)
        .bind(user.organization_id)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role_id)
        .bind(&user.status)
        .bind(user.failed_login_attempts)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_err)?;
        Ok(())
    }

    async fn check_and_update_lockout(
        &self,
        user_id: Uuid,
        policy: &LockoutPolicy,
    ) -> Result<LockoutStatus, StoreError> {
        // One statement: the row lock taken by FOR UPDATE serialises
        // concurrent failures on the same account.
        let row = sqlx::query_as::<_, LockoutRow>(
            r#"
            WITH current AS (
                SELECT id,
                       CASE WHEN locked_until IS NOT NULL AND locked_until <= NOW()
                            THEN 0 ELSE failed_login_attempts END AS base_attempts,
                       CASE WHEN locked_until > NOW() THEN locked_until END AS active_lock
                FROM users
                WHERE id = $1
                FOR UPDATE
            )
            UPDATE users u
            SET failed_login_attempts = c.base_attempts + 1,
                last_failed_login_at = NOW(),
                locked_until = CASE
                    WHEN c.base_attempts + 1 >= $2
                        THEN COALESCE(c.active_lock, NOW() + make_interval(secs => $3::double precision))
                    ELSE c.active_lock
                END,
                status = CASE
                    WHEN c.base_attempts + 1 >= $2 OR c.active_lock IS NOT NULL THEN 'locked'
                    ELSE 'active'
                END,
                updated_at = NOW()
            FROM current c
            WHERE u.id = c.id
            RETURNING u.failed_login_attempts, u.locked_until
            "#,
        )
        .bind(user_id)
        .bind(policy.max_failed_attempts)
        .bind(policy.lockout_duration.num_seconds())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_err)?
        .ok_or(StoreError::NotFound)?;

        let remaining = row
            .locked_until
            .map(|until| remaining_seconds(until, Utc::now()))
            .unwrap_or(0);

        Ok(LockoutStatus {
            is_locked: remaining > 0,
            remaining_seconds: remaining,
            failed_attempts: row.failed_login_attempts,
        })
    }

    async fn open_login_attempt(&self, user_id: Uuid) -> Result<LoginGate, StoreError> {
        // The expired-lock reset and the lock read share one row lock.
        let row = sqlx::query_as::<_, GateRow>(
            r#"
            WITH current AS (
                SELECT id, locked_until, status
                FROM users
                WHERE id = $1
                FOR UPDATE
            ),
            reset AS (
                UPDATE users u
                SET failed_login_attempts = 0, locked_until = NULL, status = 'active',
                    updated_at = NOW()
                FROM current c
                WHERE u.id = c.id
                  AND ((c.locked_until IS NOT NULL AND c.locked_until <= NOW())
                       OR (c.locked_until IS NULL AND c.status = 'locked'))
                RETURNING u.id
            )
            SELECT CASE WHEN c.locked_until > NOW() THEN c.locked_until END AS active_lock
            FROM current c
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_err)?
        .ok_or(StoreError::NotFound)?;

        Ok(row.gate())
    }

    async fn record_login(&self, user_id: Uuid) -> Result<LoginGate, StoreError> {
        let updated = sqlx::query(
            r#"
            UPDATE users
            SET failed_login_attempts = 0, locked_until = NULL, status = 'active',
                last_login_at = NOW(), updated_at = NOW()
            WHERE id = $1 AND (locked_until IS NULL OR locked_until <= NOW())
            "#,
        )
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(map_err)?;

        if updated.rows_affected() == 1 {
            return Ok(LoginGate::Open);
        }

        // Nothing written: either the user is gone or a lock is in force.
        let row = sqlx::query_as::<_, GateRow>(
            "SELECT locked_until AS active_lock FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_err)?
        .ok_or(StoreError::NotFound)?;

        Ok(row.gate())
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Database health check failed: {}", e);
                StoreError::Backend(anyhow::anyhow!("Database health check failed: {}", e))
            })?;
        Ok(())
    }
}

#[async_trait]
impl EquipmentStore for Database {
    async fn find_equipment_by_id(&self, id: Uuid) -> Result<Option<Equipment>, StoreError> {
        sqlx::query_as::<_, Equipment>(
            "SELECT * FROM equipment WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_err)
    }

    async fn find_equipment_by_serial(
        &self,
        organization_id: Uuid,
        serial_number: &str,
    ) -> Result<Option<Equipment>, StoreError> {
        sqlx::query_as::<_, Equipment>(
            r#"
            SELECT * FROM equipment
            WHERE organization_id = $1 AND serial_number = $2 AND deleted_at IS NULL
            "#,
        )
        .bind(organization_id)
        .bind(serial_number)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_err)
    }

    async fn find_equipment_by_org(
        &self,
        organization_id: Uuid,
        filter: &EquipmentFilter,
    ) -> Result<Vec<Equipment>, StoreError> {
        let mut qb = QueryBuilder::<Postgres>::new(
            "SELECT * FROM equipment WHERE deleted_at IS NULL AND organization_id = ",
        );
        qb.push_bind(organization_id);

        if let Some(status_id) = filter.status_id {
            qb.push(" AND status_id = ").push_bind(status_id);
        }
        if let Some(location) = filter.location.as_deref().filter(|l| !l.is_empty()) {
            qb.push(" AND location ILIKE ").push_bind(like_pattern(location));
        }
        if let Some(search) = filter.search.as_deref().filter(|s| !s.is_empty()) {
            let pattern = like_pattern(search);
            qb.push(" AND (serial_number ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR make ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR model ILIKE ")
                .push_bind(pattern)
                .push(")");
        }
        qb.push(" ORDER BY created_at DESC");

        qb.build_query_as::<Equipment>()
            .fetch_all(&self.pool)
            .await
            .map_err(map_err)
    }

    async fn count_equipment_by_org(&self, organization_id: Uuid) -> Result<i64, StoreError> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM equipment WHERE organization_id = $1 AND deleted_at IS NULL",
        )
        .bind(organization_id)
        .fetch_one(&self.pool)
        .await
        .map_err(map_err)
    }

    async fn create_equipment(&self, equipment: &Equipment) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO equipment (id, organization_id, serial_number, make, model, location,
                                   status_id, owner_id, notes, purchased_date, warranty_expires,
                                   created_by, updated_by, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            "#,
        )
        .bind(equipment.id)
        .bind(equipment.organization_id)
        .bind(&equipment.serial_number)
        .bind(&equipment.make)
        .bind(&equipment.model)
        .bind(&equipment.location)
        .bind(equipment.status_id)
        .bind(equipment.owner_id)
        .bind(&equipment.notes)
        .bind(equipment.purchased_date)
        .bind(equipment.warranty_expires)
        .bind(equipment.created_by)
        .bind(equipment.updated_by)
        .bind(equipment.created_at)
        .bind(equipment.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_err)?;
        Ok(())
    }

    async fn update_equipment(
        &self,
        id: Uuid,
        patch: &EquipmentPatch,
        updated_by: Uuid,
    ) -> Result<Equipment, StoreError> {
        let mut qb =
            QueryBuilder::<Postgres>::new("UPDATE equipment SET updated_at = NOW(), updated_by = ");
        qb.push_bind(updated_by);

        if let Some(make) = &patch.make {
            qb.push(", make = ").push_bind(make.clone());
        }
        if let Some(model) = &patch.model {
            qb.push(", model = ").push_bind(model.clone());
        }
        if let Some(location) = &patch.location {
            qb.push(", location = ").push_bind(location.clone());
        }
        if let Some(status_id) = patch.status_id {
            qb.push(", status_id = ").push_bind(status_id);
        }
        if let Some(owner_id) = patch.owner_id {
            qb.push(", owner_id = ").push_bind(owner_id);
        }
        if let Some(notes) = &patch.notes {
            qb.push(", notes = ").push_bind(notes.clone());
        }
        if let Some(purchased_date) = patch.purchased_date {
            qb.push(", purchased_date = ").push_bind(purchased_date);
        }
        if let Some(warranty_expires) = patch.warranty_expires {
            qb.push(", warranty_expires = ").push_bind(warranty_expires);
        }

        qb.push(" WHERE id = ")
            .push_bind(id)
            .push(" AND deleted_at IS NULL RETURNING *");

        qb.build_query_as::<Equipment>()
            .fetch_optional(&self.pool)
            .await
            .map_err(map_err)?
            .ok_or(StoreError::NotFound)
    }

    async fn soft_delete_equipment(&self, id: Uuid, deleted_by: Uuid) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE equipment
            SET deleted_at = NOW(), updated_at = NOW(), updated_by = $2
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .bind(deleted_by)
        .execute(&self.pool)
        .await
        .map_err(map_err)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn is_enabled_status(&self, status_id: i16) -> Result<bool, StoreError> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM equipment_status_lookup WHERE id = $1 AND status = 'active')",
        )
        .bind(status_id)
        .fetch_one(&self.pool)
        .await
        .map_err(map_err)
    }

    async fn first_enabled_status(&self) -> Result<Option<i16>, StoreError> {
        sqlx::query_scalar::<_, i16>(
            "SELECT id FROM equipment_status_lookup WHERE status = 'active' ORDER BY id LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(map_err)
    }
}
