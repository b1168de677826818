use serde::Serialize;
use sqlx::sqlite::SqlitePool;

use super::claim_username;

#[derive(Clone)]
pub struct AthleteStore {
    pool: SqlitePool,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Athlete {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
    pub subject_token: Option<String>,
}

/// Public athlete summary, as shown to trainers.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct AthleteSummary {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct WeightEntry {
    pub date: String,
    pub weight: i64,
}

impl AthleteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a new athlete. The username is claimed across both roles first,
    /// so a taken name fails with a unique violation. Returns the athlete ID.
    pub async fn create(&self, username: &str, password_hash: &str) -> Result<i64, sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        claim_username(&mut tx, username).await?;
        let result = sqlx::query("INSERT INTO athletes (username, password_hash) VALUES (?, ?)")
            .bind(username)
            .bind(password_hash)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(result.last_insert_rowid())
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<Athlete>, sqlx::Error> {
        sqlx::query_as(
            "SELECT id, username, password_hash, subject_token FROM athletes WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn get_by_username(&self, username: &str) -> Result<Option<Athlete>, sqlx::Error> {
        sqlx::query_as(
            "SELECT id, username, password_hash, subject_token FROM athletes WHERE username = ?",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
    }

    /// Look up the athlete currently holding this subject token.
    pub async fn get_by_subject_token(&self, token: &str) -> Result<Option<Athlete>, sqlx::Error> {
        sqlx::query_as(
            "SELECT id, username, password_hash, subject_token FROM athletes WHERE subject_token = ?",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await
    }

    /// Replace the subject token, invalidating sessions issued for the old one.
    pub async fn set_subject_token(&self, id: i64, token: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE athletes SET subject_token = ? WHERE id = ?")
            .bind(token)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn get_summary(&self, id: i64) -> Result<Option<AthleteSummary>, sqlx::Error> {
        sqlx::query_as("SELECT id, username AS name FROM athletes WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    /// Weight history, oldest first.
    pub async fn weight_progress(&self, athlete_id: i64) -> Result<Vec<WeightEntry>, sqlx::Error> {
        sqlx::query_as(
            "SELECT date, weight FROM weight_progress WHERE athlete_id = ? ORDER BY date ASC, id ASC",
        )
        .bind(athlete_id)
        .fetch_all(&self.pool)
        .await
    }

    pub async fn add_weight_progress(
        &self,
        athlete_id: i64,
        weight: i64,
        date: &str,
    ) -> Result<i64, sqlx::Error> {
        let result =
            sqlx::query("INSERT INTO weight_progress (athlete_id, weight, date) VALUES (?, ?, ?)")
                .bind(athlete_id)
                .bind(weight)
                .bind(date)
                .execute(&self.pool)
                .await?;
        Ok(result.last_insert_rowid())
    }
}
