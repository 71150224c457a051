use anyhow::{Result, anyhow};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::llm_providers::{JsonResponseParser, LLMProvider, LLMProviderType};
use crate::models::{GenerationRequest, Question};
use crate::log_llm_operation;

/// External service that writes the questions of a quiz
#[async_trait]
pub trait QuestionGenerator: Send + Sync {
    /// Produce questions for an already-normalized request
    async fn generate(&self, request: &GenerationRequest) -> Result<Vec<Question>>;

    /// Label recorded on each quiz to identify the backend that wrote it
    fn model_label(&self) -> String;
}

#[derive(Debug, Deserialize)]
struct GeneratedQuestions {
    questions: Vec<GeneratedQuestion>,
}

#[derive(Debug, Deserialize)]
struct GeneratedQuestion {
    #[serde(alias = "question")]
    question_text: String,
    #[serde(default)]
    options: Vec<String>,
    correct_answer: String,
    #[serde(default)]
    explanation: Option<String>,
    #[serde(default)]
    points: Option<u32>,
}

/// Highest score a single generated question may carry
pub const MAX_QUESTION_POINTS: u32 = 10;

const SYSTEM_MESSAGE: &str =
    "You are an expert quiz author. Always respond with valid JSON in the requested format.";

/// `QuestionGenerator` backed by an HTTP LLM provider
#[derive(Debug, Clone)]
pub struct LLMService {
    provider: LLMProvider,
    json_parser: JsonResponseParser,
}

impl LLMService {
    pub fn new_with_provider(
        api_key: String,
        base_url: Option<String>,
        provider_type: LLMProviderType,
        model: Option<String>,
    ) -> Self {
        Self {
            provider: LLMProvider::new(provider_type, api_key, base_url, model),
            json_parser: JsonResponseParser,
        }
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.provider_name()
    }

    fn parse_questions(&self, request: &GenerationRequest, response_text: &str) -> Result<Vec<Question>> {
        let generated: GeneratedQuestions = self.json_parser.parse_json_response(response_text)?;

        let questions: Vec<Question> = generated
            .questions
            .into_iter()
            .filter(|q| !q.question_text.trim().is_empty())
            .take(request.question_count as usize)
            .map(|q| Question {
                question_text: q.question_text,
                options: q.options,
                correct_answer: q.correct_answer,
                explanation: q.explanation,
                points: q.points.filter(|points| *points >= 1).map(|points| points.min(MAX_QUESTION_POINTS)),
                difficulty: request.difficulty,
            })
            .collect();

        if questions.is_empty() {
            return Err(anyhow!("Model returned no usable questions for '{}'", request.topic));
        }
        Ok(questions)
    }
}

#[async_trait]
impl QuestionGenerator for LLMService {
    async fn generate(&self, request: &GenerationRequest) -> Result<Vec<Question>> {
        let provider = self.provider_name();
        log_llm_operation!(
            start,
            "generate_questions",
            provider = provider,
            topic = request.topic,
            question_count = request.question_count
        );

        let prompt = build_question_prompt(request);
        let response_text = match self.provider.make_request(Some(SYSTEM_MESSAGE), &prompt).await {
            Ok(text) => text,
            Err(e) => {
                log_llm_operation!(error, "generate_questions", provider = provider, error = e);
                return Err(e);
            }
        };
        debug!(topic = %request.topic, response_length = response_text.len(), "Raw LLM response for quiz generation");

        match self.parse_questions(request, &response_text) {
            Ok(questions) => {
                log_llm_operation!(
                    success,
                    "generate_questions",
                    provider = provider,
                    question_count = questions.len()
                );
                Ok(questions)
            }
            Err(e) => {
                log_llm_operation!(error, "generate_questions", provider = provider, error = e);
                Err(e)
            }
        }
    }

    fn model_label(&self) -> String {
        format!("{} {}", self.provider.provider_name(), self.provider.model_name())
    }
}

fn build_question_prompt(request: &GenerationRequest) -> String {
    let category = request
        .category
        .map(|c| c.to_string())
        .unwrap_or_else(|| "General Knowledge".to_string());

    format!(
        r#"Create {count} multiple choice quiz questions about "{topic}".
Difficulty: {difficulty}. Category: {category}.

Respond with a JSON object in exactly this format:
{{
    "questions": [
        {{
            "question_text": "Question text here",
            "options": ["Option 1", "Option 2", "Option 3", "Option 4"],
            "correct_answer": "The text of the correct option",
            "explanation": "Why the answer is correct",
            "points": 1
        }}
    ]
}}

Guidelines:
- Provide exactly {count} questions
- Each question has 4 options and exactly one correct answer
- correct_answer must repeat the text of one of the options
- Use 1 point for easy questions, 2 for medium and 3 for hard"#,
        count = request.question_count,
        topic = request.topic,
        difficulty = request.difficulty.label(),
        category = category,
    )
}
