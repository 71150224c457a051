use chrono::Utc;

use crate::classifier::classify;
use crate::models::{GenerationRequest, Question, Quiz, User};
use crate::normalizer::{MIN_TIME_LIMIT_MINUTES, time_limit_minutes};
use crate::random::RandomSource;

pub const TITLE_PREFIXES: [&str; 5] = [
    "Master",
    "Test Your Knowledge of",
    "Challenge:",
    "Quiz on",
    "Explore",
];

/// Builds quiz records from a normalized request and the generated questions
pub struct QuizAssembler<'a> {
    random: &'a dyn RandomSource,
    model_label: &'a str,
}

impl<'a> QuizAssembler<'a> {
    pub fn new(random: &'a dyn RandomSource, model_label: &'a str) -> Self {
        Self {
            random,
            model_label,
        }
    }

    pub fn assemble(
        &self,
        request: &GenerationRequest,
        questions: Vec<Question>,
        creator: &User,
    ) -> Quiz {
        let category = request
            .category
            .unwrap_or_else(|| classify(&request.topic));
        let time_limit = request
            .time_limit_minutes
            .unwrap_or_else(|| time_limit_minutes(request.question_count, request.difficulty))
            .max(MIN_TIME_LIMIT_MINUTES);
        let total_points: u64 = questions.iter().map(|q| u64::from(q.points.unwrap_or(1))).sum();
        let now = Utc::now();

        Quiz {
            id: None,
            title: self.title(request),
            description: description(request, time_limit),
            topic: request.topic.clone(),
            category,
            difficulty: request.difficulty,
            total_questions: questions.len() as u32,
            total_points,
            questions,
            time_limit_minutes: time_limit,
            creator_id: creator.id,
            creator_username: creator.username.clone(),
            is_public: true,
            is_active: true,
            tags: request.tags.clone(),
            ai_prompt: prompt(request, &category.to_string()),
            ai_model: self.model_label.to_string(),
            ai_generated_at: now,
            total_attempts: 0,
            created_at: now,
            updated_at: now,
        }
    }

    fn title(&self, request: &GenerationRequest) -> String {
        let prefix = TITLE_PREFIXES[self.random.pick_index(TITLE_PREFIXES.len())];
        format!(
            "{} {} ({} Level)",
            prefix,
            request.topic,
            request.difficulty.label()
        )
    }
}

fn description(request: &GenerationRequest, time_limit: u32) -> String {
    format!(
        "An AI-generated {} level quiz on {} with {} questions. \
         Test your knowledge and learn something new! Time limit: {} minutes.",
        request.difficulty.label(),
        request.topic,
        request.question_count,
        time_limit
    )
}

/// Prompt recorded on the quiz for traceability. It is never parsed back.
fn prompt(request: &GenerationRequest, category: &str) -> String {
    format!(
        "Generate a comprehensive {} level quiz on '{}' with {} questions. \
         Category: {}. Make questions engaging and educational. \
         Include varied question types and ensure answers are accurate.",
        request.difficulty, request.topic, request.question_count, category
    )
}
