use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::Json,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

use crate::{
    errors::{ApiError, ErrorContext, GenerationError},
    generation_service::{clamp_batch_count, QuizGenerationService},
    models::*,
    repository::UserRepository,
};

// Import logging macros
use crate::{log_api_start, log_api_success};

/// Header carrying the username of the acting user
pub const USERNAME_HEADER: &str = "x-username";

const DEFAULT_BATCH_COUNT: usize = 5;
const DEFAULT_QUICK_DIFFICULTY: &str = "MEDIUM";
const DEFAULT_QUICK_QUESTION_COUNT: u32 = 10;

#[derive(Clone)]
pub struct AppState {
    pub generation_service: QuizGenerationService,
    pub users: Arc<dyn UserRepository>,
}

#[derive(Deserialize)]
pub struct BatchParams {
    pub count: Option<usize>,
}

#[derive(Deserialize)]
pub struct QuickQuizParams {
    pub topic: String,
    pub difficulty: Option<String>,
    pub questions: Option<u32>,
}

#[derive(Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
        }
    }
}

type ErrorResponse = (StatusCode, Json<ApiResponse<()>>);
type ApiResult<T> = Result<Json<ApiResponse<T>>, ErrorResponse>;

/// Find the user named by the `x-username` header
async fn resolve_creator(state: &AppState, headers: &HeaderMap, operation: &str) -> Result<User, ErrorResponse> {
    let username = match headers.get(USERNAME_HEADER).and_then(|value| value.to_str().ok()) {
        Some(username) if !username.trim().is_empty() => username.trim().to_string(),
        _ => {
            let error = ApiError::BadRequest(format!("Missing {} header", USERNAME_HEADER));
            return Err(error.to_response_with_context(ErrorContext::new(operation, "user")));
        }
    };

    match state.users.find_by_username(&username).await {
        Ok(Some(user)) => Ok(user),
        Ok(None) => {
            let error = ApiError::NotFound(format!("User '{}' not found", username));
            let context = ErrorContext::new(operation, "user")
                .with_id(&username)
                .with_user_message(&format!("User '{}' not found", username));
            Err(error.to_response_with_context(context))
        }
        Err(e) => {
            let context = ErrorContext::new(operation, "user").with_id(&username);
            Err(ApiError::DatabaseError(e).to_response_with_context(context))
        }
    }
}

fn generation_failure(operation: &str, topic: Option<&str>, err: GenerationError) -> ErrorResponse {
    let mut context = ErrorContext::new(operation, "quiz");
    if let Some(topic) = topic {
        context = context.with_id(topic);
    }
    ApiError::from(err).to_response_with_context(context)
}

pub async fn generate_custom_quiz(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<GenerationRequest>,
) -> ApiResult<Quiz> {
    let creator = resolve_creator(&state, &headers, "generate_custom_quiz").await?;
    log_api_start!("generate_custom_quiz", username = creator.username);

    let topic = request.topic.clone();
    match state.generation_service.generate_custom_quiz(request, &creator).await {
        Ok(quiz) => {
            log_api_success!("generate_custom_quiz", quiz.title);
            Ok(Json(ApiResponse::success(quiz)))
        }
        Err(e) => Err(generation_failure("generate_custom_quiz", Some(&topic), e)),
    }
}

pub async fn generate_random_quiz(State(state): State<AppState>) -> ApiResult<Quiz> {
    log_api_start!("generate_random_quiz");

    let outcome = state
        .generation_service
        .generate_random_quiz()
        .await
        .map_err(|e| GenerationError::TaskJoin(e.to_string()))
        .and_then(|result| result);

    match outcome {
        Ok(quiz) => {
            log_api_success!("generate_random_quiz", quiz.title);
            Ok(Json(ApiResponse::success(quiz)))
        }
        Err(e) => Err(generation_failure("generate_random_quiz", None, e)),
    }
}

pub async fn generate_random_batch(
    State(state): State<AppState>,
    Query(params): Query<BatchParams>,
) -> ApiResult<Vec<Quiz>> {
    let requested = params.count.unwrap_or(DEFAULT_BATCH_COUNT);
    let count = clamp_batch_count(requested);
    if count != requested {
        info!(requested = requested, count = count, "Clamped random batch size");
    }
    log_api_start!("generate_random_batch");

    let outcome = state
        .generation_service
        .generate_multiple_random_quizzes(count)
        .await
        .map_err(|e| GenerationError::TaskJoin(e.to_string()))
        .and_then(|result| result);

    match outcome {
        Ok(quizzes) => {
            log_api_success!("generate_random_batch", count = quizzes.len(), "random quizzes generated");
            Ok(Json(ApiResponse::success(quizzes)))
        }
        Err(e) => Err(generation_failure("generate_random_batch", None, e)),
    }
}

pub async fn generate_trending_quiz(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<Quiz> {
    let creator = resolve_creator(&state, &headers, "generate_trending_quiz").await?;
    log_api_start!("generate_trending_quiz", username = creator.username);

    match state.generation_service.generate_trending_topic_quiz(&creator).await {
        Ok(quiz) => {
            log_api_success!("generate_trending_quiz", quiz.title);
            Ok(Json(ApiResponse::success(quiz)))
        }
        Err(e) => Err(generation_failure("generate_trending_quiz", None, e)),
    }
}

pub async fn generate_quick_quiz(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<QuickQuizParams>,
) -> ApiResult<Quiz> {
    let creator = resolve_creator(&state, &headers, "generate_quick_quiz").await?;
    log_api_start!("generate_quick_quiz", username = creator.username);

    let difficulty = params.difficulty.as_deref().unwrap_or(DEFAULT_QUICK_DIFFICULTY);
    let question_count = params.questions.unwrap_or(DEFAULT_QUICK_QUESTION_COUNT);

    match state
        .generation_service
        .generate_quick_quiz(&params.topic, difficulty, question_count, &creator)
        .await
    {
        Ok(quiz) => {
            log_api_success!("generate_quick_quiz", quiz.title);
            Ok(Json(ApiResponse::success(quiz)))
        }
        Err(e) => Err(generation_failure("generate_quick_quiz", Some(&params.topic), e)),
    }
}

pub async fn get_popular_topics(State(state): State<AppState>) -> Json<ApiResponse<PopularTopics>> {
    debug!("Listing popular topics");
    Json(ApiResponse::success(state.generation_service.list_popular_topics()))
}

pub async fn get_suggestions(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<Vec<String>> {
    let creator = resolve_creator(&state, &headers, "get_suggestions").await?;
    let suggestions = state.generation_service.list_suggestions(&creator);
    log_api_success!("get_suggestions", count = suggestions.len(), "suggestions listed");
    Ok(Json(ApiResponse::success(suggestions)))
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Generation routes
        .route("/quiz-generator/custom", post(generate_custom_quiz))
        .route("/quiz-generator/random", post(generate_random_quiz))
        .route("/quiz-generator/random/batch", post(generate_random_batch))
        .route("/quiz-generator/trending", post(generate_trending_quiz))
        .route("/quiz-generator/quick", post(generate_quick_quiz))

        // Catalogue routes
        .route("/quiz-generator/topics/popular", get(get_popular_topics))
        .route("/quiz-generator/suggestions", get(get_suggestions))

        .with_state(state)
}
