use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use uuid::Uuid;

use crate::log_db_operation;
use crate::models::*;
use crate::repository::{QuizRepository, UserRepository};

#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn new(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);

        // An in-memory database lives and dies with its single connection
        let pool = if database_url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(options)
                .await?
        } else {
            SqlitePoolOptions::new().max_connections(5).connect_with(options).await?
        };

        let db = Database { pool };
        if let Err(e) = db.migrate().await {
            log_db_operation!(error, "migrate", error = e);
            return Err(e);
        }
        log_db_operation!(info, "migrate", "database initialized");
        Ok(db)
    }

    async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                username TEXT NOT NULL UNIQUE,
                email TEXT NOT NULL,
                first_name TEXT NOT NULL,
                last_name TEXT NOT NULL,
                role TEXT NOT NULL DEFAULT 'USER',
                enabled INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS quizzes (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                description TEXT NOT NULL,
                topic TEXT NOT NULL,
                category TEXT NOT NULL,
                difficulty TEXT NOT NULL,
                questions TEXT NOT NULL,
                time_limit_minutes INTEGER NOT NULL,
                total_questions INTEGER NOT NULL,
                total_points INTEGER NOT NULL,
                creator_id TEXT NOT NULL,
                creator_username TEXT NOT NULL,
                is_public INTEGER NOT NULL DEFAULT 1,
                is_active INTEGER NOT NULL DEFAULT 1,
                tags TEXT NOT NULL DEFAULT '[]',
                ai_prompt TEXT NOT NULL,
                ai_model TEXT NOT NULL,
                ai_generated_at TEXT NOT NULL,
                total_attempts INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn insert_user(&self, user: &User, ignore_conflict: bool) -> Result<()> {
        let statement = if ignore_conflict {
            r#"
            INSERT INTO users (id, username, email, first_name, last_name, role, enabled, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            ON CONFLICT(username) DO NOTHING
            "#
        } else {
            r#"
            INSERT INTO users (id, username, email, first_name, last_name, role, enabled, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#
        };

        sqlx::query(statement)
            .bind(user.id.to_string())
            .bind(&user.username)
            .bind(&user.email)
            .bind(&user.first_name)
            .bind(&user.last_name)
            .bind(user.role.as_str())
            .bind(user.enabled)
            .bind(user.created_at.to_rfc3339())
            .bind(user.updated_at.to_rfc3339())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    fn row_to_user(row: &SqliteRow) -> Result<User> {
        Ok(User {
            id: Uuid::parse_str(&row.get::<String, _>("id"))?,
            username: row.get("username"),
            email: row.get("email"),
            first_name: row.get("first_name"),
            last_name: row.get("last_name"),
            role: Role::from_db(&row.get::<String, _>("role")),
            enabled: row.get("enabled"),
            created_at: parse_timestamp(&row.get::<String, _>("created_at"))?,
            updated_at: parse_timestamp(&row.get::<String, _>("updated_at"))?,
        })
    }

    fn row_to_quiz(row: &SqliteRow) -> Result<Quiz> {
        let category_name: String = row.get("category");
        let difficulty_name: String = row.get("difficulty");

        Ok(Quiz {
            id: Some(Uuid::parse_str(&row.get::<String, _>("id"))?),
            title: row.get("title"),
            description: row.get("description"),
            topic: row.get("topic"),
            category: Category::from_name(&category_name)
                .ok_or_else(|| anyhow!("Unknown category '{}' in quizzes table", category_name))?,
            difficulty: difficulty_name.parse::<Difficulty>().map_err(|e| anyhow!(e))?,
            questions: serde_json::from_str(&row.get::<String, _>("questions"))?,
            time_limit_minutes: row.get::<i64, _>("time_limit_minutes") as u32,
            total_questions: row.get::<i64, _>("total_questions") as u32,
            total_points: row.get::<i64, _>("total_points") as u64,
            creator_id: Uuid::parse_str(&row.get::<String, _>("creator_id"))?,
            creator_username: row.get("creator_username"),
            is_public: row.get("is_public"),
            is_active: row.get("is_active"),
            tags: serde_json::from_str(&row.get::<String, _>("tags"))?,
            ai_prompt: row.get("ai_prompt"),
            ai_model: row.get("ai_model"),
            ai_generated_at: parse_timestamp(&row.get::<String, _>("ai_generated_at"))?,
            total_attempts: row.get::<i64, _>("total_attempts") as u32,
            created_at: parse_timestamp(&row.get::<String, _>("created_at"))?,
            updated_at: parse_timestamp(&row.get::<String, _>("updated_at"))?,
        })
    }
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(value)?.with_timezone(&Utc))
}

#[async_trait]
impl QuizRepository for Database {
    async fn save(&self, mut quiz: Quiz) -> Result<Quiz> {
        let id = quiz.id.unwrap_or_else(Uuid::new_v4);
        quiz.id = Some(id);

        sqlx::query(
            r#"
            INSERT INTO quizzes (id, title, description, topic, category, difficulty, questions,
                                 time_limit_minutes, total_questions, total_points, creator_id,
                                 creator_username, is_public, is_active, tags, ai_prompt, ai_model,
                                 ai_generated_at, total_attempts, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21)
            "#,
        )
        .bind(id.to_string())
        .bind(&quiz.title)
        .bind(&quiz.description)
        .bind(&quiz.topic)
        .bind(quiz.category.name())
        .bind(quiz.difficulty.as_str())
        .bind(serde_json::to_string(&quiz.questions)?)
        .bind(i64::from(quiz.time_limit_minutes))
        .bind(i64::from(quiz.total_questions))
        .bind(i64::try_from(quiz.total_points)?)
        .bind(quiz.creator_id.to_string())
        .bind(&quiz.creator_username)
        .bind(quiz.is_public)
        .bind(quiz.is_active)
        .bind(serde_json::to_string(&quiz.tags)?)
        .bind(&quiz.ai_prompt)
        .bind(&quiz.ai_model)
        .bind(quiz.ai_generated_at.to_rfc3339())
        .bind(i64::from(quiz.total_attempts))
        .bind(quiz.created_at.to_rfc3339())
        .bind(quiz.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        log_db_operation!(debug, "save_quiz", id = id);
        Ok(quiz)
    }

    async fn count(&self) -> Result<u64> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM quizzes")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get::<i64, _>("count") as u64)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Quiz>> {
        let row = sqlx::query("SELECT * FROM quizzes WHERE id = ?1")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::row_to_quiz).transpose()
    }
}

#[async_trait]
impl UserRepository for Database {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        let row = sqlx::query("SELECT * FROM users WHERE username = ?1")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::row_to_user).transpose()
    }

    async fn save(&self, user: User) -> Result<User> {
        self.insert_user(&user, false).await?;
        log_db_operation!(debug, "save_user", id = user.id);
        Ok(user)
    }

    async fn insert_if_absent(&self, user: User) -> Result<User> {
        self.insert_user(&user, true).await?;
        self.find_by_username(&user.username)
            .await?
            .ok_or_else(|| anyhow!("User '{}' missing after insert", user.username))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    async fn create_test_db() -> Database {
        Database::new("sqlite::memory:").await.unwrap()
    }

    fn sample_quiz(creator: &User) -> Quiz {
        let now = Utc::now();
        Quiz {
            id: None,
            title: "Explore Physics (easy Level)".to_string(),
            description: "An AI-generated easy level quiz on Physics".to_string(),
            topic: "Physics".to_string(),
            category: Category::Science,
            difficulty: Difficulty::Easy,
            questions: vec![Question {
                question_text: "What is the unit of force?".to_string(),
                options: vec!["Newton".to_string(), "Joule".to_string()],
                correct_answer: "Newton".to_string(),
                explanation: Some("F = ma, measured in newtons".to_string()),
                points: Some(2),
                difficulty: Difficulty::Easy,
            }],
            time_limit_minutes: 5,
            total_questions: 1,
            total_points: 2,
            creator_id: creator.id,
            creator_username: creator.username.clone(),
            is_public: true,
            is_active: true,
            tags: BTreeSet::from(["physics".to_string()]),
            ai_prompt: "prompt".to_string(),
            ai_model: "Gemini gemini-1.5-flash".to_string(),
            ai_generated_at: now,
            total_attempts: 0,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_quiz_save_assigns_id_and_round_trips() {
        let db = create_test_db().await;
        let creator = User::new("alice", "alice@example.com");

        assert_eq!(QuizRepository::count(&db).await.unwrap(), 0);

        let saved = QuizRepository::save(&db, sample_quiz(&creator)).await.unwrap();
        let id = saved.id.expect("id assigned on save");
        assert_eq!(QuizRepository::count(&db).await.unwrap(), 1);

        let loaded = db.find_by_id(id).await.unwrap().expect("quiz stored");
        assert_eq!(loaded.title, saved.title);
        assert_eq!(loaded.category, Category::Science);
        assert_eq!(loaded.questions, saved.questions);
        assert_eq!(loaded.tags, saved.tags);
        assert_eq!(loaded.creator_id, creator.id);
    }

    #[tokio::test]
    async fn test_find_missing_quiz() {
        let db = create_test_db().await;
        assert!(db.find_by_id(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_username_is_unique() {
        let db = create_test_db().await;
        UserRepository::save(&db, User::new("alice", "alice@example.com")).await.unwrap();

        let duplicate = UserRepository::save(&db, User::new("alice", "again@example.com")).await;
        assert!(duplicate.is_err());
    }

    #[tokio::test]
    async fn test_insert_if_absent_keeps_first_user() {
        let db = create_test_db().await;
        let mut first = User::new("system", "system@quizapp.com");
        first.role = Role::Admin;

        let stored = db.insert_if_absent(first.clone()).await.unwrap();
        assert_eq!(stored.id, first.id);
        assert_eq!(stored.role, Role::Admin);

        let second = db
            .insert_if_absent(User::new("system", "other@quizapp.com"))
            .await
            .unwrap();
        assert_eq!(second.id, first.id);
        assert_eq!(second.email, "system@quizapp.com");
    }
}
