mod athlete;
mod exercise;
mod subscription;
mod trainer;

use sqlx::Transaction;
use sqlx::sqlite::{Sqlite, SqlitePool, SqlitePoolOptions};

pub use athlete::{Athlete, AthleteStore, AthleteSummary, WeightEntry};
pub use exercise::{CommonMistake, Exercise, ExerciseStore, NewExercise};
pub use subscription::SubscriptionStore;
pub use trainer::{Trainer, TrainerDetails, TrainerProfile, TrainerStore, TrainerSummary};

#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open or create a database at the given path.
    /// Use ":memory:" for an in-memory database.
    pub async fn open(path: &str) -> Result<Self, sqlx::Error> {
        let url = if path == ":memory:" {
            "sqlite::memory:".to_string()
        } else {
            format!("sqlite:{}?mode=rwc", path)
        };

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&url)
            .await?;

        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    /// Get the current schema version.
    async fn get_version(&self) -> Result<i32, sqlx::Error> {
        let result: Option<(i32,)> = sqlx::query_as("SELECT version FROM schema_version LIMIT 1")
            .fetch_optional(&self.pool)
            .await?;
        Ok(result.map(|r| r.0).unwrap_or(0))
    }

    /// Set the schema version within a transaction.
    async fn set_version(
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        version: i32,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM schema_version")
            .execute(&mut **tx)
            .await?;
        sqlx::query("INSERT INTO schema_version (version) VALUES (?)")
            .bind(version)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    /// Run database migrations.
    async fn migrate(&self) -> Result<(), sqlx::Error> {
        sqlx::query("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL)")
            .execute(&self.pool)
            .await?;

        let version = self.get_version().await?;

        if version < 1 {
            self.migrate_v1().await?;
        }
        if version < 2 {
            self.migrate_v2().await?;
        }

        Ok(())
    }

    /// Execute a list of queries in a transaction, then set the version.
    async fn run_migration(
        &self,
        version: i32,
        queries: &[&'static str],
    ) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        for query in queries {
            sqlx::query(*query).execute(&mut *tx).await?;
        }
        Self::set_version(&mut tx, version).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn migrate_v1(&self) -> Result<(), sqlx::Error> {
        self.run_migration(
            1,
            &[
                "CREATE TABLE athletes (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    username TEXT UNIQUE NOT NULL COLLATE NOCASE,
                    password_hash TEXT NOT NULL,
                    subject_token TEXT UNIQUE,
                    created_at TEXT NOT NULL DEFAULT (datetime('now'))
                )",
                "CREATE INDEX idx_athletes_subject_token ON athletes(subject_token)",
                "CREATE TABLE trainers (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    username TEXT UNIQUE NOT NULL COLLATE NOCASE,
                    password_hash TEXT NOT NULL,
                    subject_token TEXT UNIQUE,
                    name TEXT,
                    description TEXT,
                    tags TEXT,
                    photo TEXT,
                    price REAL,
                    slots INTEGER,
                    lang TEXT,
                    hours TEXT,
                    rating REAL NOT NULL DEFAULT 0,
                    n_comments INTEGER NOT NULL DEFAULT 0,
                    education TEXT,
                    bg TEXT,
                    created_at TEXT NOT NULL DEFAULT (datetime('now'))
                )",
                "CREATE INDEX idx_trainers_subject_token ON trainers(subject_token)",
                "CREATE TABLE subscriptions (
                    athlete_id INTEGER NOT NULL REFERENCES athletes(id) ON DELETE CASCADE,
                    trainer_id INTEGER NOT NULL REFERENCES trainers(id) ON DELETE CASCADE,
                    created_at TEXT NOT NULL DEFAULT (datetime('now')),
                    PRIMARY KEY (athlete_id, trainer_id)
                )",
                "CREATE INDEX idx_subscriptions_trainer ON subscriptions(trainer_id)",
                "CREATE TABLE weight_progress (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    athlete_id INTEGER NOT NULL REFERENCES athletes(id) ON DELETE CASCADE,
                    weight INTEGER NOT NULL,
                    date TEXT NOT NULL
                )",
                "CREATE INDEX idx_weight_progress_athlete ON weight_progress(athlete_id)",
                "CREATE TABLE exercises (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    trainer_id INTEGER NOT NULL REFERENCES trainers(id) ON DELETE CASCADE,
                    name TEXT NOT NULL,
                    description TEXT NOT NULL DEFAULT '',
                    difficulty TEXT,
                    muscle_group TEXT,
                    video TEXT,
                    thumbnail TEXT,
                    created_at TEXT NOT NULL DEFAULT (datetime('now'))
                )",
                "CREATE INDEX idx_exercises_trainer ON exercises(trainer_id)",
                "CREATE TABLE common_mistakes (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    exercise_id INTEGER NOT NULL REFERENCES exercises(id) ON DELETE CASCADE,
                    description TEXT NOT NULL,
                    video TEXT,
                    created_at TEXT NOT NULL DEFAULT (datetime('now'))
                )",
                "CREATE INDEX idx_common_mistakes_exercise ON common_mistakes(exercise_id)",
            ],
        )
        .await
    }

    /// Get the athlete store.
    pub fn athletes(&self) -> AthleteStore {
        AthleteStore::new(self.pool.clone())
    }

    /// Get the trainer store.
    pub fn trainers(&self) -> TrainerStore {
        TrainerStore::new(self.pool.clone())
    }

    /// Get the subscription store.
    pub fn subscriptions(&self) -> SubscriptionStore {
        SubscriptionStore::new(self.pool.clone())
    }

    /// Get the exercise store (exercises and their common mistakes).
    pub fn exercises(&self) -> ExerciseStore {
        ExerciseStore::new(self.pool.clone())
    }


    /// Usernames shared by both account tables, so a name is unique across roles.
    async fn migrate_v2(&self) -> Result<(), sqlx::Error> {
        self.run_migration(
            2,
            &[
                "CREATE TABLE usernames (
                    username TEXT PRIMARY KEY NOT NULL COLLATE NOCASE
                )",
                "INSERT OR IGNORE INTO usernames (username) SELECT username FROM athletes",
                "INSERT OR IGNORE INTO usernames (username) SELECT username FROM trainers",
            ],
        )
        .await
    }

    /// True if neither an athlete nor a trainer uses this username.
    pub async fn is_username_available(&self, username: &str) -> Result<bool, sqlx::Error> {
        let (taken,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM usernames WHERE username = ?")
            .bind(username)
            .fetch_one(&self.pool)
            .await?;
        Ok(taken == 0)
    }
}

/// Reserve `username` for a new account inside `tx`.
///
/// The insert takes the database write lock, so two registrations of the same
/// name are serialized and the loser fails with a unique violation.
async fn claim_username(
    tx: &mut Transaction<'_, Sqlite>,
    username: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO usernames (username) VALUES (?)")
        .bind(username)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

/// True if the error is a UNIQUE or PRIMARY KEY constraint failure.
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(e) if e.is_unique_violation())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_and_get_athlete() {
        let db = Database::open(":memory:").await.unwrap();

        let id = db.athletes().create("alice", "hash").await.unwrap();

        let athlete = db.athletes().get_by_username("alice").await.unwrap().unwrap();
        assert_eq!(athlete.id, id);
        assert_eq!(athlete.username, "alice");
        assert_eq!(athlete.password_hash, "hash");
        assert!(athlete.subject_token.is_none());

        let athlete = db.athletes().get_by_id(id).await.unwrap().unwrap();
        assert_eq!(athlete.id, id);
    }

    #[tokio::test]
    async fn test_subject_token_rotation() {
        let db = Database::open(":memory:").await.unwrap();

        let id = db.athletes().create("alice", "hash").await.unwrap();
        assert!(db.athletes().set_subject_token(id, "first").await.unwrap());
        assert_eq!(
            db.athletes()
                .get_by_subject_token("first")
                .await
                .unwrap()
                .unwrap()
                .id,
            id
        );

        db.athletes().set_subject_token(id, "second").await.unwrap();
        assert!(
            db.athletes()
                .get_by_subject_token("first")
                .await
                .unwrap()
                .is_none()
        );
        assert!(
            db.athletes()
                .get_by_subject_token("second")
                .await
                .unwrap()
                .is_some()
        );
    }

    #[tokio::test]
    async fn test_trainer_subject_tokens_are_separate() {
        let db = Database::open(":memory:").await.unwrap();

        let athlete = db.athletes().create("alice", "hash").await.unwrap();
        let trainer = db.trainers().create("bob", "hash").await.unwrap();
        db.athletes().set_subject_token(athlete, "shared").await.unwrap();

        assert!(
            db.trainers()
                .get_by_subject_token("shared")
                .await
                .unwrap()
                .is_none()
        );

        db.trainers().set_subject_token(trainer, "bobs").await.unwrap();
        assert!(
            db.athletes()
                .get_by_subject_token("bobs")
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_duplicate_username_fails() {
        let db = Database::open(":memory:").await.unwrap();

        db.athletes().create("alice", "hash").await.unwrap();
        let err = db.athletes().create("ALICE", "hash").await.unwrap_err();
        assert!(is_unique_violation(&err));
    }

    #[tokio::test]
    async fn test_username_is_unique_across_roles() {
        let db = Database::open(":memory:").await.unwrap();

        db.athletes().create("alice", "hash").await.unwrap();
        let err = db.trainers().create("Alice", "hash").await.unwrap_err();
        assert!(is_unique_violation(&err));
        assert!(db.trainers().get_by_username("alice").await.unwrap().is_none());

        db.trainers().create("bob", "hash").await.unwrap();
        let err = db.athletes().create("BOB", "hash").await.unwrap_err();
        assert!(is_unique_violation(&err));
        assert!(db.athletes().get_by_username("bob").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_concurrent_claims_admit_one_account() {
        let db = Database::open(":memory:").await.unwrap();

        let athletes = db.athletes();
        let trainers = db.trainers();
        let (athlete, trainer) = tokio::join!(
            athletes.create("alice", "hash"),
            trainers.create("alice", "hash"),
        );
        assert_eq!(athlete.is_ok() as u8 + trainer.is_ok() as u8, 1);
        assert!(!db.is_username_available("ALICE").await.unwrap());
    }

    #[tokio::test]
    async fn test_username_availability_spans_both_roles() {
        let db = Database::open(":memory:").await.unwrap();

        assert!(db.is_username_available("alice").await.unwrap());
        assert!(db.is_username_available("bob").await.unwrap());

        db.athletes().create("alice", "hash").await.unwrap();
        db.trainers().create("bob", "hash").await.unwrap();

        assert!(!db.is_username_available("alice").await.unwrap());
        assert!(!db.is_username_available("Bob").await.unwrap());
        assert!(db.is_username_available("carol").await.unwrap());
    }

    #[tokio::test]
    async fn test_subscriptions() {
        let db = Database::open(":memory:").await.unwrap();

        let alice = db.athletes().create("alice", "hash").await.unwrap();
        let bob = db.trainers().create("bob", "hash").await.unwrap();
        let carol = db.trainers().create("carol", "hash").await.unwrap();

        assert!(db.subscriptions().create(alice, bob).await.unwrap());
        // Subscribing twice is a no-op
        assert!(!db.subscriptions().create(alice, bob).await.unwrap());

        let trainers = db.subscriptions().trainers_for_athlete(alice).await.unwrap();
        assert_eq!(trainers.len(), 1);
        assert_eq!(trainers[0].id, bob);

        let athletes = db.subscriptions().athletes_for_trainer(bob).await.unwrap();
        assert_eq!(athletes.len(), 1);
        assert_eq!(athletes[0].name, "alice");
        assert!(
            db.subscriptions()
                .athletes_for_trainer(carol)
                .await
                .unwrap()
                .is_empty()
        );

        let new = db.trainers().not_subscribed_by(alice).await.unwrap();
        assert_eq!(new.len(), 1);
        assert_eq!(new[0].id, carol);
    }

    #[tokio::test]
    async fn test_exercise_media_paths() {
        let db = Database::open(":memory:").await.unwrap();

        let bob = db.trainers().create("bob", "hash").await.unwrap();
        let exercise = NewExercise {
            name: "Squat".to_string(),
            description: "Back squat".to_string(),
            difficulty: Some("medium".to_string()),
            muscle_group: None,
        };
        let id = db.exercises().create(bob, &exercise).await.unwrap();

        assert!(db.exercises().set_video(id, "videos/exercise_1.mp4").await.unwrap());
        assert!(
            db.exercises()
                .set_thumbnail(id, "thumbnails/exercise_1.png")
                .await
                .unwrap()
        );

        let stored = db.exercises().get_by_id(id).await.unwrap().unwrap();
        assert_eq!(stored.trainer_id, bob);
        assert_eq!(stored.video.as_deref(), Some("videos/exercise_1.mp4"));
        assert_eq!(stored.thumbnail.as_deref(), Some("thumbnails/exercise_1.png"));

        let mistake = db
            .exercises()
            .create_common_mistake(id, "Knees caving in")
            .await
            .unwrap();
        db.exercises()
            .set_common_mistake_video(mistake, "videos/common_mistakes/mistake_1.mp4")
            .await
            .unwrap();
        let stored = db
            .exercises()
            .get_common_mistake(mistake)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.exercise_id, id);
        assert_eq!(
            stored.video.as_deref(),
            Some("videos/common_mistakes/mistake_1.mp4")
        );

        // Unknown rows are reported, not silently accepted
        assert!(!db.exercises().set_video(9999, "x").await.unwrap());
    }
}
