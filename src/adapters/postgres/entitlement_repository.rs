//! PostgreSQL implementation of EntitlementRepository.
//!
//! Provides persistent storage for Entitlement records using PostgreSQL.
//! Updates are conditional on the stored `version`, so a concurrent
//! duplicate webhook delivery surfaces as a conflict instead of silently
//! double-applying a transition.

use crate::domain::entitlement::{Entitlement, EntitlementStatus, PlanType};
use crate::domain::foundation::{DomainError, EntitlementId, ErrorCode, Timestamp};
use crate::ports::EntitlementRepository;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

/// PostgreSQL implementation of the EntitlementRepository port.
///
/// Uses sqlx for type-safe database operations with connection pooling.
pub struct PostgresEntitlementRepository {
    pool: PgPool,
}

impl PostgresEntitlementRepository {
    /// Creates a new repository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Database row representation of an entitlement.
#[derive(Debug, sqlx::FromRow)]
struct EntitlementRow {
    id: Uuid,
    user_email: String,
    plan: String,
    status: String,
    payment_id: Option<String>,
    subscription_id: Option<String>,
    expires_at: Option<DateTime<Utc>>,
    notified_7d: bool,
    notified_1d: bool,
    notified_expired: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    version: i32,
}

impl TryFrom<EntitlementRow> for Entitlement {
    type Error = DomainError;

    fn try_from(row: EntitlementRow) -> Result<Self, Self::Error> {
        Ok(Entitlement {
            id: EntitlementId::from_uuid(row.id),
            user_email: row.user_email,
            plan: parse_plan(&row.plan)?,
            status: parse_status(&row.status)?,
            payment_id: row.payment_id,
            subscription_id: row.subscription_id,
            expires_at: row.expires_at.map(Timestamp::from_datetime),
            notified_7d: row.notified_7d,
            notified_1d: row.notified_1d,
            notified_expired: row.notified_expired,
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
            version: row.version,
        })
    }
}

fn parse_plan(s: &str) -> Result<PlanType, DomainError> {
    match s.to_lowercase().as_str() {
        "monthly" => Ok(PlanType::Monthly),
        "annual" => Ok(PlanType::Annual),
        "lifetime" => Ok(PlanType::Lifetime),
        _ => Err(DomainError::new(
            ErrorCode::DatabaseError,
            format!("Invalid plan value: {}", s),
        )),
    }
}

fn parse_status(s: &str) -> Result<EntitlementStatus, DomainError> {
    match s.to_lowercase().as_str() {
        "pending" => Ok(EntitlementStatus::Pending),
        "completed" => Ok(EntitlementStatus::Completed),
        "expired" => Ok(EntitlementStatus::Expired),
        "failed" => Ok(EntitlementStatus::Failed),
        _ => Err(DomainError::new(
            ErrorCode::DatabaseError,
            format!("Invalid status value: {}", s),
        )),
    }
}

const SELECT_COLUMNS: &str = r#"
    SELECT id, user_email, plan, status, payment_id, subscription_id,
           expires_at, notified_7d, notified_1d, notified_expired,
           created_at, updated_at, version
    FROM entitlements
"#;

#[async_trait]
impl EntitlementRepository for PostgresEntitlementRepository {
    async fn insert(&self, entitlement: &Entitlement) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO entitlements (
                id, user_email, plan, status, payment_id, subscription_id,
                expires_at, notified_7d, notified_1d, notified_expired,
                created_at, updated_at, version
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(entitlement.id.as_uuid())
        .bind(&entitlement.user_email)
        .bind(entitlement.plan.as_str())
        .bind(entitlement.status.as_str())
        .bind(&entitlement.payment_id)
        .bind(&entitlement.subscription_id)
        .bind(entitlement.expires_at.map(|t| *t.as_datetime()))
        .bind(entitlement.notified_7d)
        .bind(entitlement.notified_1d)
        .bind(entitlement.notified_expired)
        .bind(entitlement.created_at.as_datetime())
        .bind(entitlement.updated_at.as_datetime())
        .bind(entitlement.version)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to insert entitlement: {}", e),
            )
        })?;

        Ok(())
    }

    async fn update(&self, entitlement: &Entitlement) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE entitlements SET
                status = $3,
                payment_id = $4,
                subscription_id = $5,
                expires_at = $6,
                notified_7d = $7,
                notified_1d = $8,
                notified_expired = $9,
                updated_at = $10,
                version = version + 1
            WHERE id = $1 AND version = $2
            "#,
        )
        .bind(entitlement.id.as_uuid())
        .bind(entitlement.version)
        .bind(entitlement.status.as_str())
        .bind(&entitlement.payment_id)
        .bind(&entitlement.subscription_id)
        .bind(entitlement.expires_at.map(|t| *t.as_datetime()))
        .bind(entitlement.notified_7d)
        .bind(entitlement.notified_1d)
        .bind(entitlement.notified_expired)
        .bind(entitlement.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to update entitlement: {}", e),
            )
        })?;

        if result.rows_affected() == 0 {
            // Zero rows means the record vanished or another writer bumped
            // the version first; distinguish so callers can react.
            return match self.find_by_id(&entitlement.id).await? {
                Some(_) => Err(DomainError::conflict(format!(
                    "Entitlement {} was modified concurrently",
                    entitlement.id
                ))),
                None => Err(DomainError::not_found(format!(
                    "Entitlement {} not found",
                    entitlement.id
                ))),
            };
        }

        Ok(())
    }

    async fn find_by_id(&self, id: &EntitlementId) -> Result<Option<Entitlement>, DomainError> {
        let row: Option<EntitlementRow> =
            sqlx::query_as(&format!("{} WHERE id = $1", SELECT_COLUMNS))
                .bind(id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| {
                    DomainError::new(ErrorCode::DatabaseError, format!("Query failed: {}", e))
                })?;

        row.map(Entitlement::try_from).transpose()
    }

    async fn find_completed_by_payment_id(
        &self,
        payment_id: &str,
    ) -> Result<Option<Entitlement>, DomainError> {
        let row: Option<EntitlementRow> = sqlx::query_as(&format!(
            "{} WHERE payment_id = $1 AND status = 'completed' LIMIT 1",
            SELECT_COLUMNS
        ))
        .bind(payment_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::new(ErrorCode::DatabaseError, format!("Query failed: {}", e)))?;

        row.map(Entitlement::try_from).transpose()
    }

    async fn find_newest_pending(
        &self,
        email: &str,
    ) -> Result<Option<Entitlement>, DomainError> {
        let row: Option<EntitlementRow> = sqlx::query_as(&format!(
            "{} WHERE user_email = $1 AND status = 'pending' ORDER BY created_at DESC LIMIT 1",
            SELECT_COLUMNS
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::new(ErrorCode::DatabaseError, format!("Query failed: {}", e)))?;

        row.map(Entitlement::try_from).transpose()
    }

    async fn find_newest_completed(
        &self,
        email: &str,
    ) -> Result<Option<Entitlement>, DomainError> {
        let row: Option<EntitlementRow> = sqlx::query_as(&format!(
            "{} WHERE user_email = $1 AND status = 'completed' ORDER BY created_at DESC LIMIT 1",
            SELECT_COLUMNS
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::new(ErrorCode::DatabaseError, format!("Query failed: {}", e)))?;

        row.map(Entitlement::try_from).transpose()
    }

    async fn find_expiring_candidates(
        &self,
        now: Timestamp,
        horizon_days: i64,
    ) -> Result<Vec<Entitlement>, DomainError> {
        let horizon = now.add_days(horizon_days);

        let rows: Vec<EntitlementRow> = sqlx::query_as(&format!(
            r#"{}
            WHERE status = 'completed'
              AND expires_at IS NOT NULL
              AND expires_at <= $1
              AND (notified_7d = false OR notified_1d = false OR notified_expired = false)
            ORDER BY expires_at ASC
            "#,
            SELECT_COLUMNS
        ))
        .bind(horizon.as_datetime())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::new(ErrorCode::DatabaseError, format!("Query failed: {}", e)))?;

        rows.into_iter().map(Entitlement::try_from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_plan_accepts_known_values() {
        assert_eq!(parse_plan("monthly").unwrap(), PlanType::Monthly);
        assert_eq!(parse_plan("ANNUAL").unwrap(), PlanType::Annual);
        assert_eq!(parse_plan("lifetime").unwrap(), PlanType::Lifetime);
    }

    #[test]
    fn parse_plan_rejects_unknown_values() {
        assert!(parse_plan("weekly").is_err());
    }

    #[test]
    fn parse_status_accepts_known_values() {
        assert_eq!(parse_status("pending").unwrap(), EntitlementStatus::Pending);
        assert_eq!(
            parse_status("completed").unwrap(),
            EntitlementStatus::Completed
        );
        assert_eq!(parse_status("expired").unwrap(), EntitlementStatus::Expired);
        assert_eq!(parse_status("failed").unwrap(), EntitlementStatus::Failed);
    }

    #[test]
    fn parse_status_rejects_unknown_values() {
        assert!(parse_status("active").is_err());
    }

    #[test]
    fn row_converts_to_aggregate() {
        let now = Utc::now();
        let row = EntitlementRow {
            id: Uuid::new_v4(),
            user_email: "row@example.com".to_string(),
            plan: "monthly".to_string(),
            status: "completed".to_string(),
            payment_id: Some("cs_1".to_string()),
            subscription_id: Some("sub_1".to_string()),
            expires_at: Some(now),
            notified_7d: true,
            notified_1d: false,
            notified_expired: false,
            created_at: now,
            updated_at: now,
            version: 3,
        };

        let entitlement = Entitlement::try_from(row).unwrap();
        assert_eq!(entitlement.user_email, "row@example.com");
        assert_eq!(entitlement.plan, PlanType::Monthly);
        assert_eq!(entitlement.status, EntitlementStatus::Completed);
        assert!(entitlement.notified_7d);
        assert_eq!(entitlement.version, 3);
    }
}
