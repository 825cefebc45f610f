//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `AccountStore` and `LearningStore` ports from the `core` crate. It handles
//! all interactions with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use learning_assistant_core::domain::{
    Lecture, LectureId, NewLecture, NewPlan, Plan, PlanId, User, UserCredentials,
};
use learning_assistant_core::ports::{AccountStore, LearningStore, PortError, PortResult};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the storage ports.
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
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

/// Maps a missing row to `NotFound` and everything else to `Unexpected`.
fn lookup_error(e: sqlx::Error, what: String) -> PortError {
    match e {
        sqlx::Error::RowNotFound => PortError::NotFound(what),
        _ => PortError::Unexpected(e.to_string()),
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct UserRecord {
    id: Uuid,
    username: String,
    password_hash: String,
}
impl UserRecord {
    fn to_domain(self) -> User {
        User {
            user_id: self.id,
            username: self.username,
        }
    }

    fn to_credentials(self) -> UserCredentials {
        UserCredentials {
            user_id: self.id,
            username: self.username,
            hashed_password: self.password_hash,
        }
    }
}

#[derive(FromRow)]
struct PlanRecord {
    id: i64,
    owner_id: Uuid,
    goal: String,
    content: String,
    created_at: DateTime<Utc>,
}
impl PlanRecord {
    fn to_domain(self) -> Plan {
        Plan {
            id: self.id,
            owner_id: self.owner_id,
            goal: self.goal,
            content: self.content,
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct LectureRecord {
    id: i64,
    plan_id: i64,
    section: String,
    content: String,
    completed: bool,
    created_at: DateTime<Utc>,
}
impl LectureRecord {
    fn to_domain(self) -> Lecture {
        Lecture {
            id: self.id,
            plan_id: self.plan_id,
            section: self.section,
            content: self.content,
            completed: self.completed,
            created_at: self.created_at,
        }
    }
}

//=========================================================================================
// `AccountStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl AccountStore for DbAdapter {
    async fn create_user(&self, username: &str, hashed_password: &str) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(
            "INSERT INTO users (id, username, password_hash) VALUES ($1, $2, $3) \
             RETURNING id, username, password_hash",
        )
        .bind(Uuid::new_v4())
        .bind(username)
        .bind(hashed_password)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                PortError::Conflict(format!("User {} already exists", username))
            }
            _ => unexpected(e),
        })?;
        Ok(record.to_domain())
    }

    async fn get_user_by_username(&self, username: &str) -> PortResult<UserCredentials> {
        let record = sqlx::query_as::<_, UserRecord>(
            "SELECT id, username, password_hash FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| lookup_error(e, format!("User {} not found", username)))?;
        Ok(record.to_credentials())
    }

    async fn get_user_by_id(&self, user_id: Uuid) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(
            "SELECT id, username, password_hash FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| lookup_error(e, format!("User {} not found", user_id)))?;
        Ok(record.to_domain())
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        sqlx::query("INSERT INTO auth_sessions (id, user_id, expires_at) VALUES ($1, $2, $3)")
            .bind(session_id)
            .bind(user_id)
            .bind(expires_at)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid> {
        let user_id: Option<Uuid> = sqlx::query_scalar(
            "SELECT user_id FROM auth_sessions WHERE id = $1 AND expires_at > now()",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;
        user_id.ok_or(PortError::Unauthorized)
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        sqlx::query("DELETE FROM auth_sessions WHERE id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }
}

//=========================================================================================
// `LearningStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl LearningStore for DbAdapter {
    async fn create_plan(&self, plan: NewPlan) -> PortResult<Plan> {
        let record = sqlx::query_as::<_, PlanRecord>(
            "INSERT INTO learning_plans (owner_id, goal, content) VALUES ($1, $2, $3) \
             RETURNING id, owner_id, goal, content, created_at",
        )
        .bind(plan.owner_id)
        .bind(&plan.goal)
        .bind(&plan.content)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn get_plan_by_id(&self, plan_id: PlanId) -> PortResult<Plan> {
        let record = sqlx::query_as::<_, PlanRecord>(
            "SELECT id, owner_id, goal, content, created_at FROM learning_plans WHERE id = $1",
        )
        .bind(plan_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| lookup_error(e, format!("Plan {} not found", plan_id)))?;
        Ok(record.to_domain())
    }

    async fn get_plans_by_owner(&self, owner_id: Uuid) -> PortResult<Vec<Plan>> {
        let records = sqlx::query_as::<_, PlanRecord>(
            "SELECT id, owner_id, goal, content, created_at FROM learning_plans \
             WHERE owner_id = $1 ORDER BY created_at DESC, id DESC",
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        let plans = records.into_iter().map(|r| r.to_domain()).collect();
        Ok(plans)
    }

    async fn create_lecture(&self, lecture: NewLecture) -> PortResult<Lecture> {
        let record = sqlx::query_as::<_, LectureRecord>(
            "INSERT INTO lectures (plan_id, section, content) VALUES ($1, $2, $3) \
             RETURNING id, plan_id, section, content, completed, created_at",
        )
        .bind(lecture.plan_id)
        .bind(&lecture.section)
        .bind(&lecture.content)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_foreign_key_violation() => {
                PortError::NotFound(format!("Plan {} not found", lecture.plan_id))
            }
            _ => unexpected(e),
        })?;
        Ok(record.to_domain())
    }

    async fn get_lecture_by_id(&self, lecture_id: LectureId) -> PortResult<Lecture> {
        let record = sqlx::query_as::<_, LectureRecord>(
            "SELECT id, plan_id, section, content, completed, created_at FROM lectures WHERE id = $1",
        )
        .bind(lecture_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| lookup_error(e, format!("Lecture {} not found", lecture_id)))?;
        Ok(record.to_domain())
    }

    async fn get_lectures_for_plan(&self, plan_id: PlanId) -> PortResult<Vec<Lecture>> {
        let records = sqlx::query_as::<_, LectureRecord>(
            "SELECT id, plan_id, section, content, completed, created_at FROM lectures \
             WHERE plan_id = $1 ORDER BY created_at ASC, id ASC",
        )
        .bind(plan_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        let lectures = records.into_iter().map(|r| r.to_domain()).collect();
        Ok(lectures)
    }

    async fn complete_lecture(&self, lecture_id: LectureId) -> PortResult<()> {
        let result = sqlx::query("UPDATE lectures SET completed = TRUE WHERE id = $1")
            .bind(lecture_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;

        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Lecture {} not found", lecture_id)));
        }
        Ok(())
    }
}
