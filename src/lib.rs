pub mod api;
pub mod assembler;
pub mod classifier;
pub mod config;
pub mod database;
pub mod errors;
pub mod generation_service;
pub mod llm_providers;
pub mod llm_service;
pub mod logging;
pub mod models;
pub mod normalizer;
pub mod random;
pub mod repository;
pub mod seeder;

pub use database::Database;
pub use errors::*;
pub use generation_service::QuizGenerationService;
pub use llm_providers::{JsonResponseParser, LLMProvider, LLMProviderType};
pub use llm_service::{LLMService, QuestionGenerator};
pub use models::*;
pub use random::{RandomSource, ScriptedRandom, ThreadRandom};
pub use repository::{InMemoryQuizRepository, InMemoryUserRepository, QuizRepository, UserRepository};
pub use seeder::StartupSeeder;
