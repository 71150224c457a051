//! Persistence seams used by the generation core.
//!
//! `Database` implements both traits over SQLite. The in-memory stores below
//! satisfy the same contracts without any external dependencies and back the
//! tests and local runs.

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

use crate::models::{Quiz, User};

#[async_trait]
pub trait QuizRepository: Send + Sync {
    /// Store a quiz and return it with its assigned identity
    async fn save(&self, quiz: Quiz) -> Result<Quiz>;

    async fn count(&self) -> Result<u64>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Quiz>>;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>>;

    /// Insert a new user. Fails if the username is already taken.
    async fn save(&self, user: User) -> Result<User>;

    /// Insert the user unless one with the same username exists, and return the
    /// stored row either way. Must be atomic with respect to concurrent callers.
    async fn insert_if_absent(&self, user: User) -> Result<User>;
}

#[derive(Debug, Default)]
pub struct InMemoryQuizRepository {
    quizzes: Mutex<Vec<Quiz>>,
}

impl InMemoryQuizRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every stored quiz in insertion order
    pub fn all(&self) -> Vec<Quiz> {
        self.quizzes
            .lock()
            .map(|quizzes| quizzes.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl QuizRepository for InMemoryQuizRepository {
    async fn save(&self, mut quiz: Quiz) -> Result<Quiz> {
        let mut quizzes = self
            .quizzes
            .lock()
            .map_err(|_| anyhow!("quiz store lock poisoned"))?;
        quiz.id = Some(quiz.id.unwrap_or_else(Uuid::new_v4));
        quizzes.push(quiz.clone());
        Ok(quiz)
    }

    async fn count(&self) -> Result<u64> {
        let quizzes = self
            .quizzes
            .lock()
            .map_err(|_| anyhow!("quiz store lock poisoned"))?;
        Ok(quizzes.len() as u64)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Quiz>> {
        let quizzes = self
            .quizzes
            .lock()
            .map_err(|_| anyhow!("quiz store lock poisoned"))?;
        Ok(quizzes.iter().find(|quiz| quiz.id == Some(id)).cloned())
    }
}

/// Users keyed by username, which makes the username unique
#[derive(Debug, Default)]
pub struct InMemoryUserRepository {
    users: Mutex<HashMap<String, User>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.users.lock().map(|users| users.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        let users = self
            .users
            .lock()
            .map_err(|_| anyhow!("user store lock poisoned"))?;
        Ok(users.get(username).cloned())
    }

    async fn save(&self, user: User) -> Result<User> {
        let mut users = self
            .users
            .lock()
            .map_err(|_| anyhow!("user store lock poisoned"))?;
        if users.contains_key(&user.username) {
            return Err(anyhow!("User '{}' already exists", user.username));
        }
        users.insert(user.username.clone(), user.clone());
        Ok(user)
    }

    async fn insert_if_absent(&self, user: User) -> Result<User> {
        let mut users = self
            .users
            .lock()
            .map_err(|_| anyhow!("user store lock poisoned"))?;
        let stored = users.entry(user.username.clone()).or_insert(user);
        Ok(stored.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_user_save_rejects_duplicate_username() {
        let repo = InMemoryUserRepository::new();
        repo.save(User::new("alice", "alice@example.com")).await.unwrap();

        let duplicate = repo.save(User::new("alice", "other@example.com")).await;
        assert!(duplicate.is_err());
        assert_eq!(repo.len(), 1);
    }

    #[tokio::test]
    async fn test_insert_if_absent_returns_existing_row() {
        let repo = InMemoryUserRepository::new();
        let first = repo
            .insert_if_absent(User::new("system", "system@quizapp.com"))
            .await
            .unwrap();
        let second = repo
            .insert_if_absent(User::new("system", "someone-else@quizapp.com"))
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.email, "system@quizapp.com");
        assert_eq!(repo.len(), 1);
    }

    #[tokio::test]
    async fn test_find_by_username_missing() {
        let repo = InMemoryUserRepository::new();
        assert!(repo.is_empty());
        assert!(repo.find_by_username("nobody").await.unwrap().is_none());
    }
}
