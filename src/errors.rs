use crate::api::ApiResponse;
use axum::{http::StatusCode, response::Json};
use tracing::{error, info, warn};

/// Failure of a single or batched quiz generation
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("Invalid generation request: {0}")]
    Validation(String),

    #[error("Question generation failed for topic '{topic}': {source}")]
    Backend {
        topic: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Persistence failed for topic '{topic}': {source}")]
    Persistence {
        topic: String,
        #[source]
        source: anyhow::Error,
    },

    /// One or more quizzes of a batch failed. Quizzes that did succeed were still persisted.
    #[error("{failed} of {total} quiz generations failed; first failure: {source}")]
    AggregateBatch {
        failed: usize,
        total: usize,
        #[source]
        source: Box<GenerationError>,
    },

    #[error("Generation task aborted: {0}")]
    TaskJoin(String),
}

impl GenerationError {
    pub fn backend(topic: &str, source: anyhow::Error) -> Self {
        GenerationError::Backend {
            topic: topic.to_string(),
            source,
        }
    }

    pub fn persistence(topic: &str, source: anyhow::Error) -> Self {
        GenerationError::Persistence {
            topic: topic.to_string(),
            source,
        }
    }
}

/// Centralized error types for consistent API error handling
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(#[from] anyhow::Error),

    #[error("AI service error: {0}")]
    LLMError(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal server error: {0}")]
    InternalError(String),
}

impl From<GenerationError> for ApiError {
    fn from(err: GenerationError) -> Self {
        match err {
            GenerationError::Validation(message) => ApiError::ValidationError(message),
            GenerationError::Persistence { .. } => ApiError::DatabaseError(anyhow::Error::new(err)),
            GenerationError::Backend { .. } | GenerationError::AggregateBatch { .. } => {
                ApiError::LLMError(err.to_string())
            }
            GenerationError::TaskJoin(message) => ApiError::InternalError(message),
        }
    }
}

/// Error context for structured logging
#[derive(Debug)]
pub struct ErrorContext {
    pub operation: String,
    pub resource_id: Option<String>,
    pub resource_type: String,
    pub user_friendly_message: Option<String>,
}

impl ErrorContext {
    pub fn new(operation: &str, resource_type: &str) -> Self {
        Self {
            operation: operation.to_string(),
            resource_id: None,
            resource_type: resource_type.to_string(),
            user_friendly_message: None,
        }
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.resource_id = Some(id.to_string());
        self
    }

    pub fn with_user_message(mut self, message: &str) -> Self {
        self.user_friendly_message = Some(message.to_string());
        self
    }
}

impl ApiError {
    /// Convert API error to HTTP response with consistent structure and logging
    pub fn to_response_with_context(
        self,
        context: ErrorContext,
    ) -> (StatusCode, Json<ApiResponse<()>>) {
        match &self {
            ApiError::NotFound(_) => {
                info!(
                    operation = %context.operation,
                    resource_type = %context.resource_type,
                    resource_id = ?context.resource_id,
                    error = %self,
                    "Resource not found"
                );
                (
                    StatusCode::NOT_FOUND,
                    Json(ApiResponse::error(
                        context
                            .user_friendly_message
                            .unwrap_or_else(|| format!("{} not found", context.resource_type)),
                    )),
                )
            }
            ApiError::ValidationError(_) | ApiError::BadRequest(_) => {
                warn!(
                    operation = %context.operation,
                    resource_type = %context.resource_type,
                    resource_id = ?context.resource_id,
                    error = %self,
                    "Rejected request"
                );
                (
                    StatusCode::BAD_REQUEST,
                    Json(ApiResponse::error(self.to_string())),
                )
            }
            ApiError::LLMError(_) => {
                error!(
                    operation = %context.operation,
                    resource_type = %context.resource_type,
                    resource_id = ?context.resource_id,
                    error = %self,
                    "AI service error"
                );
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    Json(ApiResponse::error(
                        context.user_friendly_message.unwrap_or_else(|| {
                            "AI service temporarily unavailable. Please try again.".to_string()
                        }),
                    )),
                )
            }
            ApiError::DatabaseError(_) => {
                error!(
                    operation = %context.operation,
                    resource_type = %context.resource_type,
                    resource_id = ?context.resource_id,
                    error = %self,
                    "Database error"
                );
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ApiResponse::error(
                        "Database operation failed. Please try again.".to_string(),
                    )),
                )
            }
            ApiError::InternalError(_) => {
                error!(
                    operation = %context.operation,
                    resource_type = %context.resource_type,
                    resource_id = ?context.resource_id,
                    error = %self,
                    "Internal server error"
                );
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ApiResponse::error(
                        "An internal error occurred. Please try again.".to_string(),
                    )),
                )
            }
        }
    }
}
