//! crates/learning_assistant_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like databases or APIs.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{
    GenerationParams, GenerationResult, Lecture, LectureId, NewLecture, NewPlan, OutputMode,
    Plan, PlanId, User, UserCredentials,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
    #[error("Unauthorized")]
    Unauthorized,
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// Users and the cookie sessions that authenticate them.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Fails with `Conflict` when the username is already taken.
    async fn create_user(&self, username: &str, hashed_password: &str) -> PortResult<User>;

    async fn get_user_by_username(&self, username: &str) -> PortResult<UserCredentials>;

    async fn get_user_by_id(&self, user_id: Uuid) -> PortResult<User>;

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()>;

    /// Returns the owning user, or `Unauthorized` for unknown or expired sessions.
    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid>;

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()>;
}

/// Persistence for generated plans and lectures.
#[async_trait]
pub trait LearningStore: Send + Sync {
    async fn create_plan(&self, plan: NewPlan) -> PortResult<Plan>;

    async fn get_plan_by_id(&self, plan_id: PlanId) -> PortResult<Plan>;

    /// Plans of one owner, newest first.
    async fn get_plans_by_owner(&self, owner_id: Uuid) -> PortResult<Vec<Plan>>;

    async fn create_lecture(&self, lecture: NewLecture) -> PortResult<Lecture>;

    async fn get_lecture_by_id(&self, lecture_id: LectureId) -> PortResult<Lecture>;

    /// Lectures of one plan, oldest first.
    async fn get_lectures_for_plan(&self, plan_id: PlanId) -> PortResult<Vec<Lecture>>;

    /// Sets the completion flag. Completing a completed lecture succeeds.
    async fn complete_lecture(&self, lecture_id: LectureId) -> PortResult<()>;
}

/// One external text-generation backend.
#[async_trait]
pub trait GenerationService: Send + Sync {
    /// Sends one prompt and returns the raw completion. Implementations make a
    /// single attempt and never fail in any other way than `Failure`.
    async fn generate(&self, prompt: &str, params: &GenerationParams) -> GenerationResult;

    /// Whether this backend's output needs truncation repair.
    fn output_mode(&self) -> OutputMode;
}
