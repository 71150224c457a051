//! Standardized logging macros so generation, persistence and startup events
//! share field names across the application.

// ============================================================================
// Generation Pipeline Logging Macros
// ============================================================================

/// Log a state transition of a single quiz generation
#[macro_export]
macro_rules! log_generation_stage {
    ($stage:expr, topic = $topic:expr) => {
        tracing::debug!(
            component = "generation",
            stage = %$stage,
            topic = %$topic,
            "Quiz generation stage"
        );
    };
    ($stage:expr, topic = $topic:expr, error = $error:expr) => {
        tracing::error!(
            component = "generation",
            stage = %$stage,
            topic = %$topic,
            error = %$error,
            "Quiz generation failed"
        );
    };
}

// ============================================================================
// API Operation Logging Macros
// ============================================================================

/// Log the start of an API operation with consistent fields
#[macro_export]
macro_rules! log_api_start {
    ($operation:expr, username = $username:expr) => {
        tracing::debug!(
            operation = $operation,
            username = %$username,
            "API operation started"
        );
    };
    ($operation:expr) => {
        tracing::debug!(
            operation = $operation,
            "API operation started"
        );
    };
}

/// Log successful completion of an API operation
#[macro_export]
macro_rules! log_api_success {
    ($operation:expr, count = $count:expr, $msg:expr) => {
        tracing::info!(
            operation = $operation,
            count = $count,
            "API operation completed: {}", $msg
        );
    };
    ($operation:expr, $msg:expr) => {
        tracing::info!(
            operation = $operation,
            "API operation completed: {}", $msg
        );
    };
}

// ============================================================================
// Service Layer Logging Macros
// ============================================================================

/// Log service operation start with context
#[macro_export]
macro_rules! log_service_start {
    ($service:expr, $operation:expr, quiz_count = $count:expr) => {
        tracing::info!(
            service = $service,
            operation = $operation,
            quiz_count = $count,
            "Service operation started"
        );
    };
    ($service:expr, $operation:expr, topic = $topic:expr, username = $username:expr) => {
        tracing::info!(
            service = $service,
            operation = $operation,
            topic = %$topic,
            username = %$username,
            "Service operation started"
        );
    };
    ($service:expr, $operation:expr) => {
        tracing::info!(
            service = $service,
            operation = $operation,
            "Service operation started"
        );
    };
}

/// Log service operation success
#[macro_export]
macro_rules! log_service_success {
    ($service:expr, $operation:expr, quiz_count = $count:expr, duration_ms = $duration:expr) => {
        tracing::info!(
            service = $service,
            operation = $operation,
            quiz_count = $count,
            duration_ms = $duration,
            "Service operation completed successfully"
        );
    };
    ($service:expr, $operation:expr, title = $title:expr, question_count = $count:expr) => {
        tracing::info!(
            service = $service,
            operation = $operation,
            title = %$title,
            question_count = $count,
            "Service operation completed successfully"
        );
    };
}

/// Log service operation errors
#[macro_export]
macro_rules! log_service_error {
    ($service:expr, $operation:expr, topic = $topic:expr, error = $error:expr) => {
        tracing::error!(
            service = $service,
            operation = $operation,
            topic = %$topic,
            error = %$error,
            "Service operation failed"
        );
    };
    ($service:expr, $operation:expr, error = $error:expr) => {
        tracing::error!(
            service = $service,
            operation = $operation,
            error = %$error,
            "Service operation failed"
        );
    };
}

// ============================================================================
// Database Operation Logging Macros
// ============================================================================

/// Log database operation performance and results
#[macro_export]
macro_rules! log_db_operation {
    (debug, $operation:expr, id = $id:expr) => {
        tracing::debug!(
            component = "database",
            operation = $operation,
            id = %$id,
            "Database operation completed"
        );
    };
    (info, $operation:expr, $msg:expr) => {
        tracing::info!(
            component = "database",
            operation = $operation,
            "Database operation: {}", $msg
        );
    };
    (error, $operation:expr, error = $error:expr) => {
        tracing::error!(
            component = "database",
            operation = $operation,
            error = %$error,
            "Database operation failed"
        );
    };
}

// ============================================================================
// LLM Service Logging Macros
// ============================================================================

/// Log LLM service operations with provider context
#[macro_export]
macro_rules! log_llm_operation {
    (start, $operation:expr, provider = $provider:expr, topic = $topic:expr, question_count = $count:expr) => {
        tracing::info!(
            component = "llm_service",
            operation = $operation,
            provider = %$provider,
            topic = %$topic,
            question_count = $count,
            "LLM operation started"
        );
    };
    (success, $operation:expr, provider = $provider:expr, question_count = $count:expr) => {
        tracing::info!(
            component = "llm_service",
            operation = $operation,
            provider = %$provider,
            question_count = $count,
            "LLM operation completed successfully"
        );
    };
    (error, $operation:expr, provider = $provider:expr, error = $error:expr) => {
        tracing::error!(
            component = "llm_service",
            operation = $operation,
            provider = %$provider,
            error = %$error,
            "LLM operation failed"
        );
    };
}

// ============================================================================
// System Event Logging Macros
// ============================================================================

/// Log system startup and shutdown events
#[macro_export]
macro_rules! log_system_event {
    (startup, component = $component:expr, $msg:expr) => {
        tracing::info!(
            event_type = "startup",
            component = $component,
            "System event: {}",
            $msg
        );
    };
    (config, $msg:expr) => {
        tracing::info!(event_type = "configuration", "System event: {}", $msg);
    };
}

// ============================================================================
// Validation Logging Macros
// ============================================================================

/// Log validation results consistently
#[macro_export]
macro_rules! log_validation {
    (success, $component:expr, $msg:expr) => {
        tracing::debug!(
            event_type = "validation",
            component = $component,
            result = "success",
            "Validation completed: {}", $msg
        );
    };
    (failure, $component:expr, error = $error:expr) => {
        tracing::warn!(
            event_type = "validation",
            component = $component,
            result = "failure",
            error = %$error,
            "Validation failed"
        );
    };
}

#[cfg(test)]
mod tests {
    use crate::generation_service::GenerationStage;

    #[test]
    fn test_logging_macros_compile() {
        let error = anyhow::anyhow!("test error");

        log_generation_stage!(GenerationStage::Normalizing, topic = "Physics");
        log_generation_stage!(GenerationStage::Failed, topic = "Physics", error = error);

        log_api_start!("generate_custom_quiz", username = "alice");
        log_api_start!("list_popular_topics");
        log_api_success!("generate_batch", count = 3, "quizzes generated");
        log_api_success!("generate_trending", "quiz generated");

        log_service_start!("quiz_generation", "generate_multiple", quiz_count = 3);
        log_service_start!("quiz_generation", "generate_custom", topic = "Physics", username = "alice");
        log_service_success!("quiz_generation", "generate_multiple", quiz_count = 3, duration_ms = 120);
        log_service_error!("quiz_generation", "generate_custom", topic = "Physics", error = error);

        log_db_operation!(debug, "save_quiz", id = "1234");
        log_db_operation!(info, "migration", "database initialized");

        log_llm_operation!(
            start,
            "generate_questions",
            provider = "Gemini",
            topic = "Physics",
            question_count = 5
        );
        log_llm_operation!(success, "generate_questions", provider = "Gemini", question_count = 5);

        log_system_event!(startup, component = "seeder", "seeding started");
        log_system_event!(config, "configuration loaded successfully");

        log_validation!(success, "generation_request", "request validated");
        log_validation!(failure, "generation_request", error = error);
    }
}
