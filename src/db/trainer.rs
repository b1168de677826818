use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqlitePool;

use super::claim_username;

#[derive(Clone)]
pub struct TrainerStore {
    pool: SqlitePool,
}

#[derive(Debug, Clone)]
pub struct Trainer {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
    pub subject_token: Option<String>,
    pub profile: TrainerProfile,
}

/// Public trainer profile.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TrainerProfile {
    pub name: Option<String>,
    pub description: Option<String>,
    pub tags: Option<String>,
    pub photo: Option<String>,
    pub price: Option<f64>,
    pub slots: Option<i64>,
    pub lang: Option<String>,
    pub hours: Option<String>,
    pub rating: f64,
    pub n_comments: i64,
    pub education: Option<String>,
    pub bg: Option<String>,
}

/// Profile fields a trainer may edit.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TrainerDetails {
    pub name: Option<String>,
    pub description: Option<String>,
    pub tags: Option<String>,
    pub price: Option<f64>,
    pub slots: Option<i64>,
    pub lang: Option<String>,
    pub hours: Option<String>,
    pub education: Option<String>,
    pub bg: Option<String>,
}

/// Trainer listing entry.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct TrainerSummary {
    pub id: i64,
    pub name: Option<String>,
    pub description: Option<String>,
    pub tags: Option<String>,
    pub photo: Option<String>,
    pub price: Option<f64>,
    pub slots: Option<i64>,
}

#[derive(sqlx::FromRow)]
struct TrainerRow {
    id: i64,
    username: String,
    password_hash: String,
    subject_token: Option<String>,
    name: Option<String>,
    description: Option<String>,
    tags: Option<String>,
    photo: Option<String>,
    price: Option<f64>,
    slots: Option<i64>,
    lang: Option<String>,
    hours: Option<String>,
    rating: f64,
    n_comments: i64,
    education: Option<String>,
    bg: Option<String>,
}

impl From<TrainerRow> for Trainer {
    fn from(row: TrainerRow) -> Self {
        Self {
            id: row.id,
            username: row.username,
            password_hash: row.password_hash,
            subject_token: row.subject_token,
            profile: TrainerProfile {
                name: row.name,
                description: row.description,
                tags: row.tags,
                photo: row.photo,
                price: row.price,
                slots: row.slots,
                lang: row.lang,
                hours: row.hours,
                rating: row.rating,
                n_comments: row.n_comments,
                education: row.education,
                bg: row.bg,
            },
        }
    }
}

const TRAINER_COLUMNS: &str = "id, username, password_hash, subject_token, name, description, \
     tags, photo, price, slots, lang, hours, rating, n_comments, education, bg";

pub(super) const SUMMARY_COLUMNS: &str =
    "t.id, t.name, t.description, t.tags, t.photo, t.price, t.slots";

impl TrainerStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a new trainer with an empty profile. The username is claimed
    /// across both roles first, so a taken name fails with a unique violation.
    /// Returns the trainer ID.
    pub async fn create(&self, username: &str, password_hash: &str) -> Result<i64, sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        claim_username(&mut tx, username).await?;
        let result = sqlx::query("INSERT INTO trainers (username, password_hash) VALUES (?, ?)")
            .bind(username)
            .bind(password_hash)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(result.last_insert_rowid())
    }

    async fn get_where(&self, clause: &str, value: &str) -> Result<Option<Trainer>, sqlx::Error> {
        let sql = format!("SELECT {} FROM trainers WHERE {} = ?", TRAINER_COLUMNS, clause);
        let row: Option<TrainerRow> = sqlx::query_as(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Trainer::from))
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<Trainer>, sqlx::Error> {
        let sql = format!("SELECT {} FROM trainers WHERE id = ?", TRAINER_COLUMNS);
        let row: Option<TrainerRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Trainer::from))
    }

    pub async fn get_by_username(&self, username: &str) -> Result<Option<Trainer>, sqlx::Error> {
        self.get_where("username", username).await
    }

    /// Look up the trainer currently holding this subject token.
    pub async fn get_by_subject_token(&self, token: &str) -> Result<Option<Trainer>, sqlx::Error> {
        self.get_where("subject_token", token).await
    }

    /// Replace the subject token, invalidating sessions issued for the old one.
    pub async fn set_subject_token(&self, id: i64, token: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE trainers SET subject_token = ? WHERE id = ?")
            .bind(token)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn update_details(
        &self,
        id: i64,
        details: &TrainerDetails,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE trainers SET name = ?, description = ?, tags = ?, price = ?, slots = ?,
                 lang = ?, hours = ?, education = ?, bg = ?
             WHERE id = ?",
        )
        .bind(&details.name)
        .bind(&details.description)
        .bind(&details.tags)
        .bind(details.price)
        .bind(details.slots)
        .bind(&details.lang)
        .bind(&details.hours)
        .bind(&details.education)
        .bind(&details.bg)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Record where the trainer's avatar is stored.
    pub async fn set_photo(&self, id: i64, path: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE trainers SET photo = ? WHERE id = ?")
            .bind(path)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Trainers the athlete has not subscribed to yet.
    pub async fn not_subscribed_by(
        &self,
        athlete_id: i64,
    ) -> Result<Vec<TrainerSummary>, sqlx::Error> {
        let sql = format!(
            "SELECT {} FROM trainers t
             WHERE NOT EXISTS (
                 SELECT 1 FROM subscriptions s WHERE s.trainer_id = t.id AND s.athlete_id = ?
             )
             ORDER BY t.id",
            SUMMARY_COLUMNS
        );
        sqlx::query_as(&sql)
            .bind(athlete_id)
            .fetch_all(&self.pool)
            .await
    }
}
