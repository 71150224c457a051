#![allow(dead_code)]

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;

use quiz_generator::assembler::QuizAssembler;
use quiz_generator::{
    Difficulty, GenerationRequest, InMemoryQuizRepository, InMemoryUserRepository, QuestionGenerator,
    Question, Quiz, QuizGenerationService, QuizRepository, ScriptedRandom, User, UserRepository,
};

pub const FAKE_MODEL_LABEL: &str = "Fake generator-1";

/// Question generator that records every call and can be told to stall or fail
#[derive(Default)]
pub struct FakeGenerator {
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    delays_ms: Vec<u64>,
    fail_on_calls: Vec<usize>,
    points: Option<u32>,
    requests: Mutex<Vec<GenerationRequest>>,
    completions: Mutex<Vec<usize>>,
}

impl FakeGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay for the n-th call (by call index); calls past the list use the last entry
    pub fn with_delays_ms(mut self, delays_ms: Vec<u64>) -> Self {
        self.delays_ms = delays_ms;
        self
    }

    pub fn failing_on(mut self, calls: Vec<usize>) -> Self {
        self.fail_on_calls = calls;
        self
    }

    pub fn always_failing() -> Self {
        Self::new().failing_on((0..64).collect())
    }

    pub fn with_points(mut self, points: u32) -> Self {
        self.points = Some(points);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Call indexes in the order their calls finished
    pub fn completions(&self) -> Vec<usize> {
        self.completions.lock().unwrap().clone()
    }
}

#[async_trait]
impl QuestionGenerator for FakeGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<Vec<Question>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());

        let now_in_flight = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now_in_flight, Ordering::SeqCst);

        let delay = self
            .delays_ms
            .get(call)
            .or_else(|| self.delays_ms.last())
            .copied()
            .unwrap_or(0);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.completions.lock().unwrap().push(call);

        if self.fail_on_calls.contains(&call) {
            bail!("generation backend unavailable (call {})", call);
        }

        Ok((0..request.question_count)
            .map(|i| Question {
                question_text: format!("call {} question {}", call, i + 1),
                options: vec!["A".to_string(), "B".to_string(), "C".to_string(), "D".to_string()],
                correct_answer: "A".to_string(),
                explanation: None,
                points: self.points,
                difficulty: request.difficulty,
            })
            .collect())
    }

    fn model_label(&self) -> String {
        FAKE_MODEL_LABEL.to_string()
    }
}

/// Quiz store whose every operation fails
pub struct BrokenQuizRepository;

#[async_trait]
impl QuizRepository for BrokenQuizRepository {
    async fn save(&self, _quiz: Quiz) -> Result<Quiz> {
        Err(anyhow!("disk full"))
    }

    async fn count(&self) -> Result<u64> {
        Err(anyhow!("connection refused"))
    }

    async fn find_by_id(&self, _id: Uuid) -> Result<Option<Quiz>> {
        Err(anyhow!("connection refused"))
    }
}

pub struct Harness {
    pub generator: Arc<FakeGenerator>,
    pub quizzes: Arc<InMemoryQuizRepository>,
    pub users: Arc<InMemoryUserRepository>,
    pub service: QuizGenerationService,
}

pub fn harness(generator: FakeGenerator) -> Harness {
    let generator = Arc::new(generator);
    let quizzes = Arc::new(InMemoryQuizRepository::new());
    let users = Arc::new(InMemoryUserRepository::new());
    let service = QuizGenerationService::new(generator.clone(), quizzes.clone(), users.clone());

    Harness {
        generator,
        quizzes,
        users,
        service,
    }
}

pub async fn create_user(users: &dyn UserRepository, username: &str) -> User {
    users
        .save(User::new(username, format!("{}@example.com", username)))
        .await
        .unwrap()
}

/// Assembled quiz that never went through a generator
pub fn sample_quiz(topic: &str) -> Quiz {
    let mut request = GenerationRequest::new(topic, Difficulty::Easy, 1);
    quiz_generator::normalizer::normalize(&mut request);
    let question = Question {
        question_text: format!("What is {}?", topic),
        options: vec!["A".to_string(), "B".to_string()],
        correct_answer: "A".to_string(),
        explanation: None,
        points: None,
        difficulty: Difficulty::Easy,
    };
    let creator = User::new("seed-owner", "seed-owner@example.com");
    QuizAssembler::new(&ScriptedRandom::constant(0), FAKE_MODEL_LABEL).assemble(&request, vec![question], &creator)
}
