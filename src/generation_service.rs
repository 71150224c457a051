use futures_util::future::join_all;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::assembler::QuizAssembler;
use crate::classifier::classify;
use crate::errors::GenerationError;
use crate::llm_service::QuestionGenerator;
use crate::models::{Category, Difficulty, GenerationRequest, PopularTopics, Quiz, Role, User};
use crate::normalizer::{normalize, time_limit_minutes};
use crate::random::{RandomSource, ThreadRandom};
use crate::repository::{QuizRepository, UserRepository};
use crate::{log_generation_stage, log_service_error, log_service_start, log_service_success, log_validation};

/// Largest batch a caller may request in one go
pub const MAX_BATCH_COUNT: usize = 10;

pub const SYSTEM_USERNAME: &str = "system";
const SYSTEM_EMAIL: &str = "system@quizapp.com";

/// Question counts drawn for unattended quizzes, inclusive
pub const RANDOM_QUESTION_COUNT: (u32, u32) = (5, 20);

const TRENDING_DIFFICULTY: Difficulty = Difficulty::Medium;
const TRENDING_QUESTION_COUNT: u32 = 10;
const TRENDING_CATEGORY: Category = Category::Technology;
const TRENDING_TIME_LIMIT_MINUTES: u32 = 15;

pub const POPULAR_TOPICS: [&str; 29] = [
    "JavaScript Programming",
    "Python Basics",
    "Java Fundamentals",
    "React Development",
    "Data Structures",
    "Algorithms",
    "Database Management",
    "Web Development",
    "Machine Learning",
    "Artificial Intelligence",
    "Cybersecurity",
    "Cloud Computing",
    "World History",
    "Geography",
    "Science Facts",
    "Mathematics",
    "Physics",
    "Chemistry",
    "Biology",
    "Literature",
    "Current Affairs",
    "Sports",
    "Movies and Entertainment",
    "Technology Trends",
    "Space and Astronomy",
    "Environmental Science",
    "Health and Medicine",
    "Psychology",
    "Philosophy",
];

/// How many of the popular topics are offered in quiz-builder forms
const FEATURED_TOPIC_COUNT: usize = 25;

pub const TRENDING_TOPICS: [&str; 10] = [
    "ChatGPT and AI Tools",
    "Cryptocurrency Basics",
    "Climate Change",
    "Space Exploration 2024",
    "Sustainable Technology",
    "Remote Work Culture",
    "Electric Vehicles",
    "Quantum Computing",
    "Metaverse",
    "5G Technology",
];

const SUGGESTIONS: [&str; 5] = [
    "Advanced JavaScript",
    "Data Science Fundamentals",
    "Modern Web Development",
    "Cloud Computing Basics",
    "Machine Learning Concepts",
];

const QUESTION_COUNT_CHOICES: [u32; 4] = [5, 10, 15, 20];

const SERVICE: &str = "quiz_generation";

/// Bound a caller-supplied batch size to `MAX_BATCH_COUNT`
pub fn clamp_batch_count(requested: usize) -> usize {
    requested.min(MAX_BATCH_COUNT)
}

/// Where a single generation call currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationStage {
    Pending,
    Normalizing,
    AwaitingExternalGeneration,
    Assembling,
    Persisting,
    Completed,
    Failed,
}

impl fmt::Display for GenerationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GenerationStage::Pending => "pending",
            GenerationStage::Normalizing => "normalizing",
            GenerationStage::AwaitingExternalGeneration => "awaiting_external_generation",
            GenerationStage::Assembling => "assembling",
            GenerationStage::Persisting => "persisting",
            GenerationStage::Completed => "completed",
            GenerationStage::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Drives single and batched quiz generation.
///
/// Cheap to clone; clones share the collaborators and the permit pool that
/// bounds how many external generation calls run at once.
#[derive(Clone)]
pub struct QuizGenerationService {
    generator: Arc<dyn QuestionGenerator>,
    quizzes: Arc<dyn QuizRepository>,
    users: Arc<dyn UserRepository>,
    random: Arc<dyn RandomSource>,
    permits: Arc<Semaphore>,
}

impl QuizGenerationService {
    pub fn new(
        generator: Arc<dyn QuestionGenerator>,
        quizzes: Arc<dyn QuizRepository>,
        users: Arc<dyn UserRepository>,
    ) -> Self {
        Self {
            generator,
            quizzes,
            users,
            random: Arc::new(ThreadRandom),
            permits: Arc::new(Semaphore::new(MAX_BATCH_COUNT)),
        }
    }

    pub fn with_random(mut self, random: Arc<dyn RandomSource>) -> Self {
        self.random = random;
        self
    }

    /// Cap on concurrent calls into the question generator (at least one)
    pub fn with_max_concurrent_generations(mut self, max_concurrent: usize) -> Self {
        self.permits = Arc::new(Semaphore::new(max_concurrent.max(1)));
        self
    }

    pub fn quiz_repository(&self) -> Arc<dyn QuizRepository> {
        Arc::clone(&self.quizzes)
    }

    /// Generate, assemble and persist one quiz for `creator`
    pub async fn generate_custom_quiz(
        &self,
        mut request: GenerationRequest,
        creator: &User,
    ) -> Result<Quiz, GenerationError> {
        log_service_start!(
            SERVICE,
            "generate_custom_quiz",
            topic = request.topic,
            username = creator.username
        );

        let mut stage = GenerationStage::Pending;
        match self.run_pipeline(&mut request, creator, &mut stage).await {
            Ok(quiz) => {
                log_generation_stage!(GenerationStage::Completed, topic = request.topic);
                log_service_success!(
                    SERVICE,
                    "generate_custom_quiz",
                    title = quiz.title,
                    question_count = quiz.total_questions
                );
                Ok(quiz)
            }
            Err(e) => {
                log_generation_stage!(stage, topic = request.topic, error = e);
                log_generation_stage!(GenerationStage::Failed, topic = request.topic);
                Err(e)
            }
        }
    }

    async fn run_pipeline(
        &self,
        request: &mut GenerationRequest,
        creator: &User,
        stage: &mut GenerationStage,
    ) -> Result<Quiz, GenerationError> {
        validate(request)?;

        enter(stage, GenerationStage::Normalizing, &request.topic);
        normalize(request);

        enter(stage, GenerationStage::AwaitingExternalGeneration, &request.topic);
        let questions = {
            let _permit = self
                .permits
                .acquire()
                .await
                .map_err(|e| GenerationError::TaskJoin(e.to_string()))?;
            self.generator
                .generate(request)
                .await
                .map_err(|e| GenerationError::backend(&request.topic, e))?
        };

        enter(stage, GenerationStage::Assembling, &request.topic);
        let model_label = self.generator.model_label();
        let quiz = QuizAssembler::new(self.random.as_ref(), &model_label).assemble(request, questions, creator);

        enter(stage, GenerationStage::Persisting, &request.topic);
        self.quizzes
            .save(quiz)
            .await
            .map_err(|e| GenerationError::persistence(&request.topic, e))
    }

    /// Spawn generation of one quiz with random parameters, owned by the system user
    pub fn generate_random_quiz(&self) -> JoinHandle<Result<Quiz, GenerationError>> {
        let service = self.clone();
        tokio::spawn(async move { service.random_quiz().await })
    }

    async fn random_quiz(&self) -> Result<Quiz, GenerationError> {
        let system_user = match self.get_or_create_system_user().await {
            Ok(user) => user,
            Err(e) => {
                log_service_error!(SERVICE, "generate_random_quiz", error = e);
                return Err(e);
            }
        };

        let request = self.random_request();
        let topic = request.topic.clone();
        match self.generate_custom_quiz(request, &system_user).await {
            Ok(quiz) => {
                info!(title = %quiz.title, "Auto-generated random quiz");
                Ok(quiz)
            }
            Err(e) => {
                log_service_error!(SERVICE, "generate_random_quiz", topic = topic, error = e);
                Err(e)
            }
        }
    }

    /// Parameters for an unattended quiz. Draws topic, difficulty and question count in that order.
    pub fn random_request(&self) -> GenerationRequest {
        let topic = POPULAR_TOPICS[self.random.pick_index(POPULAR_TOPICS.len())];
        let difficulty = Difficulty::ALL[self.random.pick_index(Difficulty::ALL.len())];
        let (low, high) = RANDOM_QUESTION_COUNT;
        let question_count = self.random.in_range(low, high);

        let mut request = GenerationRequest::new(topic, difficulty, question_count);
        request.category = Some(classify(topic));
        request.time_limit_minutes = Some(time_limit_minutes(question_count, difficulty));
        request
    }

    /// Spawn `count` random quizzes at once and wait for all of them.
    ///
    /// Resolves to the quizzes in launch order when every task succeeded. If any
    /// task failed the whole batch fails with `GenerationError::AggregateBatch`
    /// wrapping the first failure in launch order. The quizzes of tasks that did
    /// succeed stay persisted and are not returned.
    pub fn generate_multiple_random_quizzes(
        &self,
        count: usize,
    ) -> JoinHandle<Result<Vec<Quiz>, GenerationError>> {
        let service = self.clone();
        tokio::spawn(async move { service.random_batch(count).await })
    }

    async fn random_batch(&self, count: usize) -> Result<Vec<Quiz>, GenerationError> {
        log_service_start!(SERVICE, "generate_multiple_random_quizzes", quiz_count = count);
        let started = Instant::now();

        let handles: Vec<_> = (0..count).map(|_| self.generate_random_quiz()).collect();
        let outcomes = join_all(handles).await;

        let total = outcomes.len();
        let mut quizzes = Vec::with_capacity(total);
        let mut failed = 0;
        let mut first_error = None;

        for outcome in outcomes {
            let result = outcome
                .map_err(|e| GenerationError::TaskJoin(e.to_string()))
                .and_then(|result| result);
            match result {
                Ok(quiz) => quizzes.push(quiz),
                Err(e) => {
                    failed += 1;
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
            }
        }

        if let Some(source) = first_error {
            let err = GenerationError::AggregateBatch {
                failed,
                total,
                source: Box::new(source),
            };
            log_service_error!(SERVICE, "generate_multiple_random_quizzes", error = err);
            return Err(err);
        }

        log_service_success!(
            SERVICE,
            "generate_multiple_random_quizzes",
            quiz_count = quizzes.len(),
            duration_ms = started.elapsed().as_millis() as u64
        );
        Ok(quizzes)
    }

    /// Medium, ten-question Technology quiz on a trending topic with a fixed 15 minute limit
    pub async fn generate_trending_topic_quiz(&self, creator: &User) -> Result<Quiz, GenerationError> {
        let topic = TRENDING_TOPICS[self.random.pick_index(TRENDING_TOPICS.len())];

        let mut request = GenerationRequest::new(topic, TRENDING_DIFFICULTY, TRENDING_QUESTION_COUNT);
        request.category = Some(TRENDING_CATEGORY);
        request.time_limit_minutes = Some(TRENDING_TIME_LIMIT_MINUTES);

        self.generate_custom_quiz(request, creator).await
    }

    /// Quiz from loose parameters; the difficulty name is matched case-insensitively
    pub async fn generate_quick_quiz(
        &self,
        topic: &str,
        difficulty: &str,
        question_count: u32,
        creator: &User,
    ) -> Result<Quiz, GenerationError> {
        let difficulty = difficulty
            .parse::<Difficulty>()
            .map_err(GenerationError::Validation)?;

        self.generate_custom_quiz(GenerationRequest::new(topic, difficulty, question_count), creator)
            .await
    }

    /// Look up the system user, creating it on first use.
    ///
    /// Creation goes through `insert_if_absent`, so concurrent first callers all
    /// end up with the same stored user.
    pub async fn get_or_create_system_user(&self) -> Result<User, GenerationError> {
        let existing = self
            .users
            .find_by_username(SYSTEM_USERNAME)
            .await
            .map_err(|e| GenerationError::persistence(SYSTEM_USERNAME, e))?;
        if let Some(user) = existing {
            return Ok(user);
        }

        debug!(username = SYSTEM_USERNAME, "Creating system user");
        self.users
            .insert_if_absent(system_user())
            .await
            .map_err(|e| GenerationError::persistence(SYSTEM_USERNAME, e))
    }

    pub fn list_popular_topics(&self) -> PopularTopics {
        PopularTopics {
            topics: POPULAR_TOPICS[..FEATURED_TOPIC_COUNT]
                .iter()
                .map(|topic| topic.to_string())
                .collect(),
            categories: Category::ALL.to_vec(),
            difficulties: Difficulty::ALL.to_vec(),
            question_counts: QUESTION_COUNT_CHOICES.to_vec(),
        }
    }

    /// Fixed starter suggestions; the same for every user
    pub fn list_suggestions(&self, user: &User) -> Vec<String> {
        debug!(username = %user.username, "Listing quiz suggestions");
        SUGGESTIONS.iter().map(|s| s.to_string()).collect()
    }
}

fn enter(stage: &mut GenerationStage, next: GenerationStage, topic: &str) {
    *stage = next;
    log_generation_stage!(next, topic = topic);
}

fn validate(request: &GenerationRequest) -> Result<(), GenerationError> {
    let problem = if request.topic.trim().is_empty() {
        Some("topic must not be empty")
    } else if request.question_count == 0 {
        Some("question count must be greater than zero")
    } else {
        None
    };

    match problem {
        Some(message) => {
            log_validation!(failure, "generation_request", error = message);
            Err(GenerationError::Validation(message.to_string()))
        }
        None => {
            log_validation!(success, "generation_request", "request validated");
            Ok(())
        }
    }
}

fn system_user() -> User {
    let mut user = User::new(SYSTEM_USERNAME, SYSTEM_EMAIL);
    user.first_name = "System".to_string();
    user.last_name = "Generator".to_string();
    user.role = Role::Admin;
    user
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::ScriptedRandom;
    use crate::repository::{InMemoryQuizRepository, InMemoryUserRepository};
    use anyhow::Result;
    use async_trait::async_trait;

    struct UnusedGenerator;

    #[async_trait]
    impl QuestionGenerator for UnusedGenerator {
        async fn generate(&self, _request: &GenerationRequest) -> Result<Vec<crate::models::Question>> {
            anyhow::bail!("not expected to be called")
        }

        fn model_label(&self) -> String {
            "unused".to_string()
        }
    }

    fn service(random: ScriptedRandom) -> QuizGenerationService {
        QuizGenerationService::new(
            Arc::new(UnusedGenerator),
            Arc::new(InMemoryQuizRepository::new()),
            Arc::new(InMemoryUserRepository::new()),
        )
        .with_random(Arc::new(random))
    }

    #[test]
    fn test_clamp_batch_count() {
        assert_eq!(clamp_batch_count(50), 10);
        assert_eq!(clamp_batch_count(10), 10);
        assert_eq!(clamp_batch_count(3), 3);
        assert_eq!(clamp_batch_count(0), 0);
    }

    #[test]
    fn test_random_request_uses_scripted_draws() {
        // topic index 1, difficulty index 2, count 5 + 7 % 16
        let service = service(ScriptedRandom::new(vec![1, 2, 7]));
        let request = service.random_request();

        assert_eq!(request.topic, "Python Basics");
        assert_eq!(request.difficulty, Difficulty::Hard);
        assert_eq!(request.question_count, 12);
        assert_eq!(request.category, Some(Category::Technology));
        assert_eq!(request.time_limit_minutes, Some(18));
    }

    #[test]
    fn test_random_request_bounds() {
        let service = QuizGenerationService::new(
            Arc::new(UnusedGenerator),
            Arc::new(InMemoryQuizRepository::new()),
            Arc::new(InMemoryUserRepository::new()),
        );
        for _ in 0..200 {
            let request = service.random_request();
            assert!(POPULAR_TOPICS.contains(&request.topic.as_str()));
            assert!((5..=20).contains(&request.question_count));
            assert_eq!(request.category, Some(classify(&request.topic)));
        }
    }

    #[test]
    fn test_popular_topics_listing() {
        let topics = service(ScriptedRandom::constant(0)).list_popular_topics();
        assert_eq!(topics.topics.len(), 25);
        assert_eq!(topics.topics[0], "JavaScript Programming");
        assert_eq!(topics.topics[24], "Space and Astronomy");
        assert_eq!(topics.categories.len(), 8);
        assert_eq!(topics.difficulties, Difficulty::ALL.to_vec());
        assert_eq!(topics.question_counts, vec![5, 10, 15, 20]);
    }

    #[test]
    fn test_suggestions_are_fixed() {
        let user = User::new("alice", "alice@example.com");
        let suggestions = service(ScriptedRandom::constant(0)).list_suggestions(&user);
        assert_eq!(suggestions.len(), 5);
        assert_eq!(suggestions[0], "Advanced JavaScript");
    }

    #[test]
    fn test_stage_names() {
        assert_eq!(GenerationStage::AwaitingExternalGeneration.to_string(), "awaiting_external_generation");
        assert_eq!(GenerationStage::Failed.to_string(), "failed");
    }

    #[tokio::test]
    async fn test_validation_rejects_empty_topic_before_generation() {
        let service = service(ScriptedRandom::constant(0));
        let creator = User::new("alice", "alice@example.com");

        let result = service
            .generate_custom_quiz(GenerationRequest::new("   ", Difficulty::Easy, 5), &creator)
            .await;
        assert!(matches!(result, Err(GenerationError::Validation(_))));

        let result = service
            .generate_custom_quiz(GenerationRequest::new("Physics", Difficulty::Easy, 0), &creator)
            .await;
        assert!(matches!(result, Err(GenerationError::Validation(_))));
    }

    #[tokio::test]
    async fn test_quick_quiz_rejects_unknown_difficulty() {
        let service = service(ScriptedRandom::constant(0));
        let creator = User::new("alice", "alice@example.com");

        let result = service.generate_quick_quiz("Physics", "impossible", 10, &creator).await;
        assert!(matches!(result, Err(GenerationError::Validation(_))));
    }

    #[tokio::test]
    async fn test_system_user_attributes() {
        let service = service(ScriptedRandom::constant(0));
        let user = service.get_or_create_system_user().await.unwrap();

        assert_eq!(user.username, "system");
        assert_eq!(user.email, "system@quizapp.com");
        assert_eq!(user.first_name, "System");
        assert_eq!(user.last_name, "Generator");
        assert_eq!(user.role, Role::Admin);
        assert!(user.enabled);

        let again = service.get_or_create_system_user().await.unwrap();
        assert_eq!(again.id, user.id);
    }
}
