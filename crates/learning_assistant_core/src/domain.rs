//! crates/learning_assistant_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or serialization format.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Identity of a persisted learning plan, assigned by the store.
pub type PlanId = i64;

/// Identity of a persisted lecture, assigned by the store.
pub type LectureId = i64;

//=========================================================================================
// Accounts
//=========================================================================================

// Represents a user - used throughout app
#[derive(Debug, Clone)]
pub struct User {
    pub user_id: Uuid,
    pub username: String,
}

// Only used internally for login/register - contains sensitive data
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user_id: Uuid,
    pub username: String,
    pub hashed_password: String,
}

// Represents a browser login session (auth cookie)
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub id: String,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

//=========================================================================================
// Learning Profile
//=========================================================================================

/// The structured learning preferences a user submits when asking for a plan.
///
/// Only `goal` is required. Every other field falls back to a fixed default
/// when it is absent or blank; see [`crate::prompt::build_plan_prompt`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserProfile {
    pub goal: String,
    pub specific_goal: Option<String>,
    pub weekly_hours: Option<f64>,
    pub experience_level: Option<String>,
    pub learning_style: Option<String>,
    pub motivation: Option<String>,
    pub resource_preference: Option<String>,
    pub language_preference: Option<String>,
    pub pace: Option<String>,
}

impl UserProfile {
    /// Creates a profile with only the goal set.
    pub fn with_goal(goal: impl Into<String>) -> Self {
        Self {
            goal: goal.into(),
            ..Self::default()
        }
    }
}

//=========================================================================================
// Generation
//=========================================================================================

/// Model-selection parameters for one generation call site.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationParams {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl GenerationParams {
    pub const DEFAULT_MODEL: &'static str = "gpt-4o-mini";

    /// Defaults for the plan call site.
    pub fn plan_defaults() -> Self {
        Self {
            model: Self::DEFAULT_MODEL.to_string(),
            max_tokens: 1000,
            temperature: 0.7,
        }
    }

    /// Defaults for the lecture call site. Lectures are longer and a little
    /// less random than plans.
    pub fn lecture_defaults() -> Self {
        Self {
            model: Self::DEFAULT_MODEL.to_string(),
            max_tokens: 1500,
            temperature: 0.6,
        }
    }

    /// Defaults for the question answering call site.
    pub fn answer_defaults() -> Self {
        Self {
            model: Self::DEFAULT_MODEL.to_string(),
            max_tokens: 300,
            temperature: 0.7,
        }
    }
}

/// A rendered prompt together with the parameters it is sent with.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub params: GenerationParams,
}

/// The outcome of a single call to a generation backend.
///
/// `Success` text is never blank; use [`GenerationResult::from_completion`]
/// to build one from a raw backend field.
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationResult {
    Success { text: String },
    Failure { reason: String },
}

impl GenerationResult {
    pub fn failure(reason: impl Into<String>) -> Self {
        Self::Failure {
            reason: reason.into(),
        }
    }

    /// Maps an optional completion field to a result, treating a missing or
    /// blank completion as a failure.
    pub fn from_completion(completion: Option<String>) -> Self {
        match completion {
            Some(text) if !text.trim().is_empty() => Self::Success { text },
            Some(_) => Self::failure("backend returned an empty completion"),
            None => Self::failure("backend response contained no completion"),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

/// Whether a backend's raw output can end mid-sentence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Chat-completion style backends return finished prose.
    PassThrough,
    /// Length-limited text generation may stop in the middle of a sentence.
    TruncationRepair,
}

//=========================================================================================
// Plans and Lectures
//=========================================================================================

/// A generated multi-step learning outline tied to its owner.
#[derive(Debug, Clone, PartialEq)]
pub struct Plan {
    pub id: PlanId,
    pub owner_id: Uuid,
    pub goal: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// The fields of a plan that exist before the store assigns identity.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPlan {
    pub owner_id: Uuid,
    pub goal: String,
    pub content: String,
}

/// A generated deep-dive document for one section of a plan.
#[derive(Debug, Clone, PartialEq)]
pub struct Lecture {
    pub id: LectureId,
    pub plan_id: PlanId,
    pub section: String,
    pub content: String,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewLecture {
    pub plan_id: PlanId,
    pub section: String,
    pub content: String,
}
