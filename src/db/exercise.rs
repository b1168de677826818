use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqlitePool;

#[derive(Clone)]
pub struct ExerciseStore {
    pool: SqlitePool,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Exercise {
    pub id: i64,
    pub trainer_id: i64,
    pub name: String,
    pub description: String,
    pub difficulty: Option<String>,
    pub muscle_group: Option<String>,
    pub video: Option<String>,
    pub thumbnail: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewExercise {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub difficulty: Option<String>,
    pub muscle_group: Option<String>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct CommonMistake {
    pub id: i64,
    pub exercise_id: i64,
    pub description: String,
    pub video: Option<String>,
}

impl ExerciseStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create an exercise owned by a trainer. Returns the exercise ID.
    pub async fn create(
        &self,
        trainer_id: i64,
        exercise: &NewExercise,
    ) -> Result<i64, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO exercises (trainer_id, name, description, difficulty, muscle_group)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(trainer_id)
        .bind(&exercise.name)
        .bind(&exercise.description)
        .bind(&exercise.difficulty)
        .bind(&exercise.muscle_group)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<Exercise>, sqlx::Error> {
        sqlx::query_as(
            "SELECT id, trainer_id, name, description, difficulty, muscle_group, video, thumbnail
             FROM exercises WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn list_for_trainer(&self, trainer_id: i64) -> Result<Vec<Exercise>, sqlx::Error> {
        sqlx::query_as(
            "SELECT id, trainer_id, name, description, difficulty, muscle_group, video, thumbnail
             FROM exercises WHERE trainer_id = ? ORDER BY id",
        )
        .bind(trainer_id)
        .fetch_all(&self.pool)
        .await
    }

    pub async fn set_video(&self, id: i64, path: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE exercises SET video = ? WHERE id = ?")
            .bind(path)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn set_thumbnail(&self, id: i64, path: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE exercises SET thumbnail = ? WHERE id = ?")
            .bind(path)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Attach a common mistake description to an exercise. Returns its ID.
    pub async fn create_common_mistake(
        &self,
        exercise_id: i64,
        description: &str,
    ) -> Result<i64, sqlx::Error> {
        let result =
            sqlx::query("INSERT INTO common_mistakes (exercise_id, description) VALUES (?, ?)")
                .bind(exercise_id)
                .bind(description)
                .execute(&self.pool)
                .await?;
        Ok(result.last_insert_rowid())
    }

    pub async fn get_common_mistake(&self, id: i64) -> Result<Option<CommonMistake>, sqlx::Error> {
        sqlx::query_as(
            "SELECT id, exercise_id, description, video FROM common_mistakes WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn set_common_mistake_video(&self, id: i64, path: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE common_mistakes SET video = ? WHERE id = ?")
            .bind(path)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
