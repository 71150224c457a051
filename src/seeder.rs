use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::config::SeedingConfig;
use crate::generation_service::{clamp_batch_count, QuizGenerationService};
use crate::log_system_event;
use crate::repository::QuizRepository;

pub const DEFAULT_SEED_THRESHOLD: u64 = 5;
pub const DEFAULT_SEED_BATCH_SIZE: usize = 3;

/// Fills an almost empty quiz library with a few random quizzes when the server starts
pub struct StartupSeeder {
    service: QuizGenerationService,
    quizzes: Arc<dyn QuizRepository>,
    threshold: u64,
    batch_size: usize,
}

impl StartupSeeder {
    pub fn new(service: QuizGenerationService) -> Self {
        let quizzes = service.quiz_repository();
        Self {
            service,
            quizzes,
            threshold: DEFAULT_SEED_THRESHOLD,
            batch_size: DEFAULT_SEED_BATCH_SIZE,
        }
    }

    pub fn from_config(service: QuizGenerationService, config: &SeedingConfig) -> Self {
        Self::new(service)
            .with_threshold(config.threshold)
            .with_batch_size(config.batch_size)
    }

    pub fn with_threshold(mut self, threshold: u64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Quizzes generated per seeding run, clamped to `MAX_BATCH_COUNT`
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = clamp_batch_count(batch_size);
        self
    }

    /// Start seeding in the background if fewer than `threshold` quizzes exist.
    ///
    /// Never fails and never waits for generation. Returns the background task
    /// when one was started; its outcome is only logged.
    pub async fn on_ready(&self) -> Option<JoinHandle<()>> {
        let existing = match self.quizzes.count().await {
            Ok(count) => count,
            Err(e) => {
                error!(error = %e, "Error during startup quiz generation");
                return None;
            }
        };

        if existing >= self.threshold {
            info!(existing_quizzes = existing, "Found existing quizzes, skipping initial generation");
            return None;
        }

        log_system_event!(startup, component = "seeder", "Generating initial sample quizzes");
        let batch = self.service.generate_multiple_random_quizzes(self.batch_size);

        Some(tokio::spawn(async move {
            match batch.await {
                Ok(Ok(quizzes)) => {
                    info!(quiz_count = quizzes.len(), "Successfully generated initial quizzes");
                    for quiz in &quizzes {
                        info!(title = %quiz.title, "Generated quiz");
                    }
                }
                Ok(Err(e)) => error!(error = %e, "Failed to generate initial quizzes"),
                Err(e) => error!(error = %e, "Initial quiz generation task aborted"),
            }
        }))
    }
}
