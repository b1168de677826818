use sqlx::sqlite::SqlitePool;

use super::athlete::AthleteSummary;
use super::trainer::{SUMMARY_COLUMNS, TrainerSummary};

/// Athlete to trainer subscriptions.
#[derive(Clone)]
pub struct SubscriptionStore {
    pool: SqlitePool,
}

impl SubscriptionStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Subscribe an athlete to a trainer. Returns false if already subscribed.
    pub async fn create(&self, athlete_id: i64, trainer_id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "INSERT OR IGNORE INTO subscriptions (athlete_id, trainer_id) VALUES (?, ?)",
        )
        .bind(athlete_id)
        .bind(trainer_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn trainers_for_athlete(
        &self,
        athlete_id: i64,
    ) -> Result<Vec<TrainerSummary>, sqlx::Error> {
        let sql = format!(
            "SELECT {} FROM trainers t
             JOIN subscriptions s ON s.trainer_id = t.id
             WHERE s.athlete_id = ?
             ORDER BY s.created_at, t.id",
            SUMMARY_COLUMNS
        );
        sqlx::query_as(&sql)
            .bind(athlete_id)
            .fetch_all(&self.pool)
            .await
    }

    pub async fn athletes_for_trainer(
        &self,
        trainer_id: i64,
    ) -> Result<Vec<AthleteSummary>, sqlx::Error> {
        sqlx::query_as(
            "SELECT a.id, a.username AS name FROM athletes a
             JOIN subscriptions s ON s.athlete_id = a.id
             WHERE s.trainer_id = ?
             ORDER BY s.created_at, a.id",
        )
        .bind(trainer_id)
        .fetch_all(&self.pool)
        .await
    }
}
