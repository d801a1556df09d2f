//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `DatabaseService` port from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use debugmate_core::domain::{
    ClarifyingQuestion, CompletedSession, DebugReport, Language, Plan, QuestionAnswer,
    SessionSummary, User, WeakSpot,
};
use debugmate_core::ports::{DatabaseService, PortError, PortResult};
use sqlx::{types::Json, FromRow, PgPool};
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `DatabaseService` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
    default_sessions_limit: i32,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`. New users start with `default_sessions_limit` sessions.
    pub fn new(pool: PgPool, default_sessions_limit: i32) -> Self {
        Self {
            pool,
            default_sessions_limit,
        }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

fn parse_language(raw: &str) -> PortResult<Language> {
    raw.parse()
        .map_err(|e: String| PortError::Unexpected(format!("Corrupt language column: {}", e)))
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct UserRecord {
    id: Uuid,
    external_id: String,
    email: Option<String>,
    plan: String,
    sessions_used: i32,
    sessions_limit: i32,
    created_at: DateTime<Utc>,
}
impl UserRecord {
    fn to_domain(self) -> PortResult<User> {
        let plan: Plan = self
            .plan
            .parse()
            .map_err(|e: String| PortError::Unexpected(format!("Corrupt plan column: {}", e)))?;
        Ok(User {
            id: self.id,
            external_id: self.external_id,
            email: self.email,
            plan,
            sessions_used: self.sessions_used,
            sessions_limit: self.sessions_limit,
            created_at: self.created_at,
        })
    }
}

#[derive(FromRow)]
struct SessionRecord {
    id: Uuid,
    user_id: Uuid,
    language: String,
    code: String,
    error_message: String,
    clarifying_questions: Json<Vec<ClarifyingQuestion>>,
    user_answers: Json<Vec<QuestionAnswer>>,
    debug_report: Json<DebugReport>,
    error_category: String,
    status: String,
    created_at: DateTime<Utc>,
}
impl SessionRecord {
    fn to_domain(self) -> PortResult<CompletedSession> {
        Ok(CompletedSession {
            id: self.id,
            user_id: self.user_id,
            language: parse_language(&self.language)?,
            code: self.code,
            error_message: self.error_message,
            clarifying_questions: self.clarifying_questions.0,
            answers: self.user_answers.0,
            report: self.debug_report.0,
            error_category: self.error_category,
            status: self.status,
            created_at: self.created_at,
        })
    }
}

#[derive(FromRow)]
struct SessionSummaryRecord {
    id: Uuid,
    language: String,
    error_message: String,
    status: String,
    error_category: String,
    created_at: DateTime<Utc>,
}
impl SessionSummaryRecord {
    fn to_domain(self) -> PortResult<SessionSummary> {
        Ok(SessionSummary {
            id: self.id,
            language: parse_language(&self.language)?,
            error_message: self.error_message,
            status: self.status,
            error_category: self.error_category,
            created_at: self.created_at,
        })
    }
}

#[derive(FromRow)]
struct WeakSpotRecord {
    error_category: String,
    language: String,
    occurrence_count: i32,
    last_seen_at: DateTime<Utc>,
}
impl WeakSpotRecord {
    fn to_domain(self) -> PortResult<WeakSpot> {
        Ok(WeakSpot {
            error_category: self.error_category,
            language: parse_language(&self.language)?,
            occurrence_count: self.occurrence_count,
            last_seen_at: self.last_seen_at,
        })
    }
}

//=========================================================================================
// `DatabaseService` Trait Implementation
//=========================================================================================

#[async_trait]
impl DatabaseService for DbAdapter {
    async fn get_or_create_user(&self, external_id: &str) -> PortResult<User> {
        sqlx::query(
            "INSERT INTO users (id, external_id, plan, sessions_used, sessions_limit) \
             VALUES ($1, $2, 'free', 0, $3) ON CONFLICT (external_id) DO NOTHING",
        )
        .bind(Uuid::new_v4())
        .bind(external_id)
        .bind(self.default_sessions_limit)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;

        let record = sqlx::query_as::<_, UserRecord>(
            "SELECT id, external_id, email, plan, sessions_used, sessions_limit, created_at \
             FROM users WHERE external_id = $1",
        )
        .bind(external_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => PortError::NotFound(format!("User {} not found", external_id)),
            _ => unexpected(e),
        })?;

        record.to_domain()
    }

    async fn save_completed_session(&self, session: &CompletedSession) -> PortResult<()> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;

        sqlx::query(
            "INSERT INTO debug_sessions (id, user_id, language, code, error_message, \
             clarifying_questions, user_answers, debug_report, error_category, status, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(session.id)
        .bind(session.user_id)
        .bind(session.language.as_str())
        .bind(&session.code)
        .bind(&session.error_message)
        .bind(Json(&session.clarifying_questions))
        .bind(Json(&session.answers))
        .bind(Json(&session.report))
        .bind(&session.error_category)
        .bind(&session.status)
        .bind(session.created_at)
        .execute(&mut *tx)
        .await
        .map_err(unexpected)?;

        sqlx::query("UPDATE users SET sessions_used = sessions_used + 1 WHERE id = $1")
            .bind(session.user_id)
            .execute(&mut *tx)
            .await
            .map_err(unexpected)?;

        sqlx::query(
            "INSERT INTO weak_spots (user_id, error_category, language, occurrence_count, last_seen_at) \
             VALUES ($1, $2, $3, 1, $4) \
             ON CONFLICT (user_id, error_category) DO UPDATE \
             SET occurrence_count = weak_spots.occurrence_count + 1, \
                 language = EXCLUDED.language, \
                 last_seen_at = EXCLUDED.last_seen_at",
        )
        .bind(session.user_id)
        .bind(&session.error_category)
        .bind(session.language.as_str())
        .bind(session.created_at)
        .execute(&mut *tx)
        .await
        .map_err(unexpected)?;

        tx.commit().await.map_err(unexpected)?;
        Ok(())
    }

    async fn list_sessions(
        &self,
        user_id: Uuid,
        offset: i64,
        limit: i64,
    ) -> PortResult<(Vec<SessionSummary>, i64)> {
        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM debug_sessions WHERE user_id = $1")
                .bind(user_id)
                .fetch_one(&self.pool)
                .await
                .map_err(unexpected)?;

        let records = sqlx::query_as::<_, SessionSummaryRecord>(
            "SELECT id, language, error_message, status, error_category, created_at \
             FROM debug_sessions WHERE user_id = $1 \
             ORDER BY created_at DESC LIMIT $2 OFFSET $3",
        )
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        let summaries = records
            .into_iter()
            .map(|r| r.to_domain())
            .collect::<PortResult<Vec<_>>>()?;
        Ok((summaries, total))
    }

    async fn get_session_for_user(
        &self,
        session_id: Uuid,
        user_id: Uuid,
    ) -> PortResult<CompletedSession> {
        let record = sqlx::query_as::<_, SessionRecord>(
            "SELECT id, user_id, language, code, error_message, clarifying_questions, \
             user_answers, debug_report, error_category, status, created_at \
             FROM debug_sessions WHERE id = $1 AND user_id = $2",
        )
        .bind(session_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .ok_or_else(|| PortError::NotFound(format!("Session {} not found", session_id)))?;

        record.to_domain()
    }

    async fn delete_session_for_user(&self, session_id: Uuid, user_id: Uuid) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM debug_sessions WHERE id = $1 AND user_id = $2")
            .bind(session_id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;

        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Session {} not found", session_id)));
        }
        Ok(())
    }

    async fn list_weak_spots(&self, user_id: Uuid) -> PortResult<Vec<WeakSpot>> {
        let records = sqlx::query_as::<_, WeakSpotRecord>(
            "SELECT error_category, language, occurrence_count, last_seen_at \
             FROM weak_spots WHERE user_id = $1 \
             ORDER BY occurrence_count DESC, last_seen_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        records.into_iter().map(|r| r.to_domain()).collect()
    }
}
