//! crates/learning_assistant_core/src/pipeline.rs
//!
//! Orchestrates the generation flow: validate input, build the prompt, call
//! the generation backend, normalize the output, and persist the result.
//! Records are only ever written after a successful generation.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::{
    GenerationParams, GenerationRequest, GenerationResult, Lecture, LectureId, NewLecture,
    NewPlan, Plan, PlanId, UserProfile,
};
use crate::ports::{GenerationService, LearningStore, PortError};
use crate::postprocess::normalize;
use crate::prompt::{build_lecture_prompt, build_plan_prompt, build_question_prompt};

//=========================================================================================
// Error Type
//=========================================================================================

/// Everything that can go wrong while producing generated content.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    /// The request was rejected before any network call.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    /// A referenced plan or lecture does not exist.
    #[error("Not found: {0}")]
    NotFound(String),
    /// The backend failed or returned nothing usable.
    #[error("Generation failed: {0}")]
    GenerationFailure(String),
    /// An identical lecture request is already being generated.
    #[error("Generation already in progress: {0}")]
    InFlight(String),
    /// The store failed in an unexpected way.
    #[error("Store error: {0}")]
    Store(PortError),
}

impl From<PortError> for GenerationError {
    fn from(e: PortError) -> Self {
        match e {
            PortError::NotFound(what) => GenerationError::NotFound(what),
            other => GenerationError::Store(other),
        }
    }
}

//=========================================================================================
// Settings
//=========================================================================================

/// Per-call-site generation parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineSettings {
    pub plan: GenerationParams,
    pub lecture: GenerationParams,
    pub answer: GenerationParams,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            plan: GenerationParams::plan_defaults(),
            lecture: GenerationParams::lecture_defaults(),
            answer: GenerationParams::answer_defaults(),
        }
    }
}

//=========================================================================================
// The Pipeline
//=========================================================================================

pub struct LearningPipeline {
    store: Arc<dyn LearningStore>,
    generator: Arc<dyn GenerationService>,
    settings: PipelineSettings,
    lectures_in_flight: Mutex<HashSet<(PlanId, String)>>,
}

/// Releases an in-flight lecture key when dropped.
struct InFlightGuard<'a> {
    keys: &'a Mutex<HashSet<(PlanId, String)>>,
    key: (PlanId, String),
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        let mut keys = self.keys.lock().unwrap_or_else(|e| e.into_inner());
        keys.remove(&self.key);
    }
}

impl LearningPipeline {
    pub fn new(
        store: Arc<dyn LearningStore>,
        generator: Arc<dyn GenerationService>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            store,
            generator,
            settings,
            lectures_in_flight: Mutex::new(HashSet::new()),
        }
    }

    /// Calls the backend once and normalizes a successful completion.
    async fn run(&self, request: GenerationRequest) -> Result<String, GenerationError> {
        let GenerationRequest { prompt, params } = request;
        match self.generator.generate(&prompt, &params).await {
            GenerationResult::Success { text } => {
                Ok(normalize(&text, self.generator.output_mode()))
            }
            GenerationResult::Failure { reason } => {
                warn!("Generation with model {} failed: {}", params.model, reason);
                Err(GenerationError::GenerationFailure(reason))
            }
        }
    }

    /// Generates and stores a learning plan for `owner_id`.
    pub async fn generate_plan(
        &self,
        owner_id: Uuid,
        profile: &UserProfile,
    ) -> Result<Plan, GenerationError> {
        let goal = profile.goal.trim();
        if goal.is_empty() {
            return Err(GenerationError::InvalidInput(
                "goal must not be empty".to_string(),
            ));
        }
        if let Some(hours) = profile.weekly_hours {
            if !hours.is_finite() || hours <= 0.0 {
                return Err(GenerationError::InvalidInput(format!(
                    "weekly hours must be positive, got {}",
                    hours
                )));
            }
        }

        let content = self
            .run(GenerationRequest {
                prompt: build_plan_prompt(profile),
                params: self.settings.plan.clone(),
            })
            .await?;

        let plan = self
            .store
            .create_plan(NewPlan {
                owner_id,
                goal: goal.to_string(),
                content,
            })
            .await
            .map_err(GenerationError::Store)?;
        info!("Stored plan {} for user {}", plan.id, owner_id);
        Ok(plan)
    }

    /// Generates and stores a lecture for one section of an existing plan.
    ///
    /// Concurrent requests for the same `(plan_id, section)` are not run twice;
    /// the later one fails with `InFlight`.
    pub async fn generate_lecture(
        &self,
        plan_id: PlanId,
        section: &str,
    ) -> Result<Lecture, GenerationError> {
        let plan = self.store.get_plan_by_id(plan_id).await?;

        let section = section.trim();
        if section.is_empty() {
            return Err(GenerationError::InvalidInput(
                "section must not be empty".to_string(),
            ));
        }
        let prompt = build_lecture_prompt(&plan.content, section)?;

        let _guard = self.claim_lecture(plan_id, section)?;
        let content = self
            .run(GenerationRequest {
                prompt,
                params: self.settings.lecture.clone(),
            })
            .await?;

        let lecture = self
            .store
            .create_lecture(NewLecture {
                plan_id,
                section: section.to_string(),
                content,
            })
            .await
            .map_err(GenerationError::Store)?;
        info!("Stored lecture {} for plan {}", lecture.id, plan_id);
        Ok(lecture)
    }

    fn claim_lecture(
        &self,
        plan_id: PlanId,
        section: &str,
    ) -> Result<InFlightGuard<'_>, GenerationError> {
        let key = (plan_id, section.to_string());
        let mut keys = self
            .lectures_in_flight
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        if !keys.insert(key.clone()) {
            return Err(GenerationError::InFlight(format!(
                "lecture '{}' of plan {}",
                section, plan_id
            )));
        }
        Ok(InFlightGuard {
            keys: &self.lectures_in_flight,
            key,
        })
    }

    /// Marks a lecture as completed. Idempotent.
    pub async fn complete_lecture(&self, lecture_id: LectureId) -> Result<(), GenerationError> {
        self.store.complete_lecture(lecture_id).await?;
        info!("Lecture {} marked complete", lecture_id);
        Ok(())
    }

    /// Answers a free-form question. Answers are not stored.
    pub async fn answer_question(&self, question: &str) -> Result<String, GenerationError> {
        let prompt = build_question_prompt(question)?;
        self.run(GenerationRequest {
            prompt,
            params: self.settings.answer.clone(),
        })
        .await
    }
}
