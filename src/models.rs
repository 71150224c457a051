use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];

    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "EASY",
            Difficulty::Medium => "MEDIUM",
            Difficulty::Hard => "HARD",
        }
    }

    /// Lower-cased name used in titles and descriptions ("easy", "medium", "hard")
    pub fn label(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }

    /// Seconds a player is given per question at this difficulty
    pub fn seconds_per_question(&self) -> u32 {
        match self {
            Difficulty::Easy => 45,
            Difficulty::Medium => 60,
            Difficulty::Hard => 90,
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "EASY" => Ok(Difficulty::Easy),
            "MEDIUM" => Ok(Difficulty::Medium),
            "HARD" => Ok(Difficulty::Hard),
            other => Err(format!("Unknown difficulty '{}', expected EASY, MEDIUM or HARD", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Technology,
    History,
    Science,
    Geography,
    Mathematics,
    Sports,
    Entertainment,
    #[serde(rename = "General Knowledge")]
    GeneralKnowledge,
}

impl Category {
    pub const ALL: [Category; 8] = [
        Category::Technology,
        Category::History,
        Category::Science,
        Category::Geography,
        Category::Mathematics,
        Category::Sports,
        Category::Entertainment,
        Category::GeneralKnowledge,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Category::Technology => "Technology",
            Category::History => "History",
            Category::Science => "Science",
            Category::Geography => "Geography",
            Category::Mathematics => "Mathematics",
            Category::Sports => "Sports",
            Category::Entertainment => "Entertainment",
            Category::GeneralKnowledge => "General Knowledge",
        }
    }

    pub fn from_name(name: &str) -> Option<Category> {
        Category::ALL
            .into_iter()
            .find(|category| category.name().eq_ignore_ascii_case(name.trim()))
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Caller-facing request for a generated quiz.
///
/// `category` and `time_limit_minutes` are optional on the way in and always
/// populated once the request has gone through `normalizer::normalize`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub topic: String,
    pub difficulty: Difficulty,
    pub question_count: u32,
    #[serde(default)]
    pub category: Option<Category>,
    #[serde(default)]
    pub time_limit_minutes: Option<u32>,
    #[serde(default)]
    pub tags: BTreeSet<String>,
}

impl GenerationRequest {
    pub fn new(topic: impl Into<String>, difficulty: Difficulty, question_count: u32) -> Self {
        Self {
            topic: topic.into(),
            difficulty,
            question_count,
            category: None,
            time_limit_minutes: None,
            tags: BTreeSet::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub question_text: String,
    #[serde(default)]
    pub options: Vec<String>,
    pub correct_answer: String,
    #[serde(default)]
    pub explanation: Option<String>,
    #[serde(default)]
    pub points: Option<u32>, // None counts as 1
    pub difficulty: Difficulty,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quiz {
    pub id: Option<Uuid>, // Assigned by the quiz repository on save
    pub title: String,
    pub description: String,
    pub topic: String,
    pub category: Category,
    pub difficulty: Difficulty,
    pub questions: Vec<Question>,
    pub time_limit_minutes: u32,
    pub total_questions: u32,
    pub total_points: u64,
    pub creator_id: Uuid,
    pub creator_username: String,
    pub is_public: bool,
    pub is_active: bool,
    pub tags: BTreeSet<String>,
    pub ai_prompt: String,
    pub ai_model: String,
    pub ai_generated_at: DateTime<Utc>,
    pub total_attempts: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "USER",
            Role::Admin => "ADMIN",
        }
    }

    pub fn from_db(value: &str) -> Role {
        if value.eq_ignore_ascii_case("ADMIN") {
            Role::Admin
        } else {
            Role::User
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(username: impl Into<String>, email: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            username: username.into(),
            email: email.into(),
            first_name: String::new(),
            last_name: String::new(),
            role: Role::User,
            enabled: true,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Lists used to populate quiz-builder forms
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopularTopics {
    pub topics: Vec<String>,
    pub categories: Vec<Category>,
    pub difficulties: Vec<Difficulty>,
    pub question_counts: Vec<u32>,
}
