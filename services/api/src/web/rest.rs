//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the learning plan endpoints and the master
//! definition for the OpenAPI specification.

use crate::web::auth;
use crate::web::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use chrono::{DateTime, Utc};
use learning_assistant_core::domain::{Lecture, LectureId, Plan, PlanId, UserProfile};
use learning_assistant_core::pipeline::GenerationError;
use learning_assistant_core::ports::PortError;
use serde::{Deserialize, Deserializer, Serialize};
use std::sync::Arc;
use tracing::error;
use utoipa::{OpenApi, ToSchema};
use uuid::Uuid;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::register_handler,
        auth::login_handler,
        auth::logout_handler,
        auth::check_login_handler,
        generate_plan_handler,
        learning_progress_handler,
        get_plan_handler,
        list_lectures_handler,
        generate_lecture_handler,
        complete_lecture_handler,
        ask_handler,
    ),
    components(
        schemas(
            auth::CredentialsRequest,
            auth::AuthResponse,
            GeneratePlanRequest,
            PlanResponse,
            PlanDetailResponse,
            GenerateLectureRequest,
            LectureResponse,
            AskRequest,
            AskResponse,
        )
    ),
    tags(
        (name = "AI Learning Assistant API", description = "Personalized learning plans and lectures.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

/// The learner profile as sent by the web client.
#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GeneratePlanRequest {
    /// A missing or null goal reads as empty and is rejected with 400.
    #[serde(default, deserialize_with = "deserialize_goal")]
    pub goal: String,
    #[serde(default)]
    pub specific_goal: Option<String>,
    /// Hours per week, as a number or a numeric string.
    #[serde(default, alias = "weeklyHours", deserialize_with = "deserialize_hours")]
    #[schema(value_type = Option<f64>)]
    pub weekly_time: Option<f64>,
    #[serde(default)]
    pub experience_level: Option<String>,
    #[serde(default)]
    pub learning_style: Option<String>,
    #[serde(default)]
    pub motivation: Option<String>,
    #[serde(default)]
    pub resource_preference: Option<String>,
    #[serde(default)]
    pub language_preference: Option<String>,
    #[serde(default, alias = "pace")]
    pub learning_pace: Option<String>,
}

impl From<GeneratePlanRequest> for UserProfile {
    fn from(req: GeneratePlanRequest) -> Self {
        UserProfile {
            goal: req.goal,
            specific_goal: req.specific_goal,
            weekly_hours: req.weekly_time,
            experience_level: req.experience_level,
            learning_style: req.learning_style,
            motivation: req.motivation,
            resource_preference: req.resource_preference,
            language_preference: req.language_preference,
            pace: req.learning_pace,
        }
    }
}

fn deserialize_goal<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Accepts `5`, `"5"`, `""` and `null`.
fn deserialize_hours<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Hours {
        Number(f64),
        Text(String),
    }

    match Option::<Hours>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Hours::Number(n)) => Ok(Some(n)),
        Some(Hours::Text(s)) if s.trim().is_empty() => Ok(None),
        Some(Hours::Text(s)) => s
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|_| serde::de::Error::custom(format!("invalid weekly hours: {}", s))),
    }
}

#[derive(Serialize, ToSchema)]
pub struct PlanResponse {
    pub id: PlanId,
    pub goal: String,
    pub plan: String,
    pub created_at: DateTime<Utc>,
}

impl From<Plan> for PlanResponse {
    fn from(plan: Plan) -> Self {
        Self {
            id: plan.id,
            goal: plan.goal,
            plan: plan.content,
            created_at: plan.created_at,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct PlanDetailResponse {
    #[serde(flatten)]
    pub plan: PlanResponse,
    pub lectures: Vec<LectureResponse>,
}

#[derive(Deserialize, ToSchema)]
pub struct GenerateLectureRequest {
    pub section: String,
}

#[derive(Serialize, ToSchema)]
pub struct LectureResponse {
    pub id: LectureId,
    pub plan_id: PlanId,
    pub section: String,
    pub content: String,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
}

impl From<Lecture> for LectureResponse {
    fn from(lecture: Lecture) -> Self {
        Self {
            id: lecture.id,
            plan_id: lecture.plan_id,
            section: lecture.section,
            content: lecture.content,
            completed: lecture.completed,
            created_at: lecture.created_at,
        }
    }
}

#[derive(Deserialize, ToSchema)]
pub struct AskRequest {
    pub question: String,
}

#[derive(Serialize, ToSchema)]
pub struct AskResponse {
    pub answer: String,
}

//=========================================================================================
// Error Mapping
//=========================================================================================

type HandlerError = (StatusCode, String);

fn generation_error(e: GenerationError) -> HandlerError {
    match e {
        GenerationError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
        GenerationError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
        GenerationError::InFlight(msg) => (StatusCode::CONFLICT, msg),
        GenerationError::GenerationFailure(reason) => (
            StatusCode::BAD_GATEWAY,
            format!("Failed to generate content: {}", reason),
        ),
        GenerationError::Store(e) => {
            error!("Store failure during generation: {:?}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
        }
    }
}

fn port_error(e: PortError) -> HandlerError {
    match e {
        PortError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
        other => {
            error!("Store failure: {:?}", other);
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
        }
    }
}

/// Loads a plan, hiding plans of other users behind a 404.
async fn owned_plan(state: &AppState, user_id: Uuid, plan_id: PlanId) -> Result<Plan, HandlerError> {
    let plan = state.store.get_plan_by_id(plan_id).await.map_err(port_error)?;
    if plan.owner_id != user_id {
        return Err((StatusCode::NOT_FOUND, format!("Plan {} not found", plan_id)));
    }
    Ok(plan)
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// Generate and store a personalized learning plan.
#[utoipa::path(
    post,
    path = "/generate_plan",
    request_body = GeneratePlanRequest,
    responses(
        (status = 201, description = "Plan generated", body = PlanResponse),
        (status = 400, description = "Missing learning goal or non-positive weekly hours"),
        (status = 401, description = "Not logged in"),
        (status = 502, description = "The generation backend failed")
    )
)]
pub async fn generate_plan_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Json(req): Json<GeneratePlanRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    let profile = UserProfile::from(req);
    let plan = state
        .pipeline
        .generate_plan(user_id, &profile)
        .await
        .map_err(generation_error)?;
    Ok((StatusCode::CREATED, Json(PlanResponse::from(plan))))
}

/// List the caller's plans, newest first.
#[utoipa::path(
    get,
    path = "/learning_progress",
    responses(
        (status = 200, description = "The caller's plans", body = [PlanResponse]),
        (status = 401, description = "Not logged in")
    )
)]
pub async fn learning_progress_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Result<impl IntoResponse, HandlerError> {
    let plans = state
        .store
        .get_plans_by_owner(user_id)
        .await
        .map_err(port_error)?;
    let response: Vec<PlanResponse> = plans.into_iter().map(PlanResponse::from).collect();
    Ok(Json(response))
}

/// Fetch one plan together with its lectures.
#[utoipa::path(
    get,
    path = "/plans/{id}",
    params(("id" = i64, Path, description = "Plan id")),
    responses(
        (status = 200, description = "The plan", body = PlanDetailResponse),
        (status = 404, description = "No such plan")
    )
)]
pub async fn get_plan_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(plan_id): Path<PlanId>,
) -> Result<impl IntoResponse, HandlerError> {
    let plan = owned_plan(&state, user_id, plan_id).await?;
    let lectures = state
        .store
        .get_lectures_for_plan(plan_id)
        .await
        .map_err(port_error)?;
    Ok(Json(PlanDetailResponse {
        plan: plan.into(),
        lectures: lectures.into_iter().map(LectureResponse::from).collect(),
    }))
}

/// List the lectures of a plan, oldest first.
#[utoipa::path(
    get,
    path = "/plans/{id}/lectures",
    params(("id" = i64, Path, description = "Plan id")),
    responses(
        (status = 200, description = "The plan's lectures", body = [LectureResponse]),
        (status = 404, description = "No such plan")
    )
)]
pub async fn list_lectures_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(plan_id): Path<PlanId>,
) -> Result<impl IntoResponse, HandlerError> {
    owned_plan(&state, user_id, plan_id).await?;
    let lectures = state
        .store
        .get_lectures_for_plan(plan_id)
        .await
        .map_err(port_error)?;
    let response: Vec<LectureResponse> = lectures.into_iter().map(LectureResponse::from).collect();
    Ok(Json(response))
}

/// Generate and store a lecture for one section of a plan.
#[utoipa::path(
    post,
    path = "/plans/{id}/lectures",
    params(("id" = i64, Path, description = "Plan id")),
    request_body = GenerateLectureRequest,
    responses(
        (status = 201, description = "Lecture generated", body = LectureResponse),
        (status = 400, description = "Missing section"),
        (status = 404, description = "No such plan"),
        (status = 409, description = "The same lecture is already being generated"),
        (status = 502, description = "The generation backend failed")
    )
)]
pub async fn generate_lecture_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(plan_id): Path<PlanId>,
    Json(req): Json<GenerateLectureRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    owned_plan(&state, user_id, plan_id).await?;
    let lecture = state
        .pipeline
        .generate_lecture(plan_id, &req.section)
        .await
        .map_err(generation_error)?;
    Ok((StatusCode::CREATED, Json(LectureResponse::from(lecture))))
}

/// Mark a lecture as completed. Repeating the call is harmless.
#[utoipa::path(
    post,
    path = "/lectures/{id}/complete",
    params(("id" = i64, Path, description = "Lecture id")),
    responses(
        (status = 204, description = "Lecture completed"),
        (status = 404, description = "No such lecture")
    )
)]
pub async fn complete_lecture_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(lecture_id): Path<LectureId>,
) -> Result<impl IntoResponse, HandlerError> {
    let lecture = state
        .store
        .get_lecture_by_id(lecture_id)
        .await
        .map_err(port_error)?;
    owned_plan(&state, user_id, lecture.plan_id)
        .await
        .map_err(|_| (StatusCode::NOT_FOUND, format!("Lecture {} not found", lecture_id)))?;

    state
        .pipeline
        .complete_lecture(lecture_id)
        .await
        .map_err(generation_error)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Answer a free-form question.
#[utoipa::path(
    post,
    path = "/api/ask",
    request_body = AskRequest,
    responses(
        (status = 200, description = "The answer", body = AskResponse),
        (status = 400, description = "Missing question"),
        (status = 502, description = "The generation backend failed")
    )
)]
pub async fn ask_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AskRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    let answer = state
        .pipeline
        .answer_question(&req.question)
        .await
        .map_err(generation_error)?;
    Ok(Json(AskResponse { answer }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn web_client_profile_maps_to_domain() {
        let req: GeneratePlanRequest = serde_json::from_value(serde_json::json!({
            "goal": "learn Go",
            "weeklyTime": "8",
            "experienceLevel": "中級",
            "learningPace": "穩步前進",
            "languagePreference": ""
        }))
        .unwrap();

        let profile = UserProfile::from(req);
        assert_eq!(profile.goal, "learn Go");
        assert_eq!(profile.weekly_hours, Some(8.0));
        assert_eq!(profile.experience_level.as_deref(), Some("中級"));
        assert_eq!(profile.pace.as_deref(), Some("穩步前進"));
        assert_eq!(profile.language_preference.as_deref(), Some(""));
        assert_eq!(profile.motivation, None);
    }

    #[test]
    fn weekly_hours_accept_numbers_and_blanks() {
        let parse = |value: serde_json::Value| {
            serde_json::from_value::<GeneratePlanRequest>(serde_json::json!({
                "goal": "g",
                "weeklyTime": value
            }))
        };

        assert_eq!(parse(serde_json::json!(7.5)).unwrap().weekly_time, Some(7.5));
        assert_eq!(parse(serde_json::json!("")).unwrap().weekly_time, None);
        assert_eq!(parse(serde_json::Value::Null).unwrap().weekly_time, None);
        assert!(parse(serde_json::json!("lots")).is_err());
    }

    #[test]
    fn generation_errors_map_to_status_codes() {
        let status = |e| generation_error(e).0;
        assert_eq!(status(GenerationError::InvalidInput("x".into())), StatusCode::BAD_REQUEST);
        assert_eq!(status(GenerationError::NotFound("x".into())), StatusCode::NOT_FOUND);
        assert_eq!(status(GenerationError::InFlight("x".into())), StatusCode::CONFLICT);
        assert_eq!(
            status(GenerationError::GenerationFailure("503".into())),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status(GenerationError::Store(PortError::Unexpected("db down".into()))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
