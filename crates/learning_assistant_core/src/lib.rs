pub mod domain;
pub mod pipeline;
pub mod ports;
pub mod postprocess;
pub mod prompt;

pub use domain::{
    AuthSession, GenerationParams, GenerationRequest, GenerationResult, Lecture, LectureId,
    NewLecture, NewPlan, OutputMode, Plan, PlanId, User, UserCredentials, UserProfile,
};
pub use pipeline::{GenerationError, LearningPipeline, PipelineSettings};
pub use ports::{AccountStore, GenerationService, LearningStore, PortError, PortResult};
