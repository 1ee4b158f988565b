//! SQLite-based persistence store

use crate::core::{
    validate_environment_name, Build, BuildStatus, Deployment, Environment, Pipeline,
    PipelineSource, PipelineStatus, Stage,
};
use crate::persistence::{PersistError, PipelineStore, PipelineSummary, StoreError, StoreTransaction};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, Sqlite, SqlitePool, Transaction};
use std::str::FromStr;
use tracing::debug;

const IN_MEMORY: &str = ":memory:";

/// SQLite pipeline store
pub struct SqlitePipelineStore {
    pool: SqlitePool,
}

impl SqlitePipelineStore {
    /// Open (or create) a store at `db_path`; `:memory:` keeps everything in RAM
    pub async fn new(db_path: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", db_path))?
            .create_if_missing(true)
            .foreign_keys(true);

        // An in-memory database lives and dies with its connection
        let pool = if db_path == IN_MEMORY {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(options)
                .await?
        } else {
            SqlitePoolOptions::new().connect_with(options).await?
        };

        let store = Self { pool };
        store.init().await?;

        Ok(store)
    }

    /// Create store with default path
    pub async fn with_default_path() -> Result<Self> {
        let db_path = Self::default_path()?;
        let db_path = db_path
            .to_str()
            .context("Database path is not valid UTF-8")?;
        Self::new(db_path)
            .await
            .context("Failed to open pipeline database")
    }

    /// `<data dir>/pipeline-chain/pipelines.db`
    pub fn default_path() -> Result<std::path::PathBuf> {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| std::path::PathBuf::from("."));
        let db_dir = data_dir.join("pipeline-chain");
        std::fs::create_dir_all(&db_dir)
            .with_context(|| format!("Failed to create {}", db_dir.display()))?;
        Ok(db_dir.join("pipelines.db"))
    }

    /// Initialize database schema
    async fn init(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS pipelines (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                project_id INTEGER NOT NULL,
                ref TEXT NOT NULL,
                sha TEXT,
                tag INTEGER NOT NULL DEFAULT 0,
                source TEXT NOT NULL,
                status TEXT NOT NULL,
                user_id INTEGER,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS stages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                pipeline_id INTEGER NOT NULL REFERENCES pipelines(id) ON DELETE CASCADE,
                project_id INTEGER NOT NULL,
                name TEXT NOT NULL,
                position INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS builds (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                pipeline_id INTEGER NOT NULL REFERENCES pipelines(id) ON DELETE CASCADE,
                stage_id INTEGER NOT NULL REFERENCES stages(id) ON DELETE CASCADE,
                name TEXT NOT NULL,
                environment TEXT,
                status TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS environments (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                project_id INTEGER NOT NULL,
                name TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS deployments (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                project_id INTEGER NOT NULL,
                environment_id INTEGER NOT NULL REFERENCES environments(id),
                build_id INTEGER NOT NULL REFERENCES builds(id),
                ref TEXT NOT NULL,
                sha TEXT,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_pipelines_project ON pipelines(project_id);
            CREATE UNIQUE INDEX IF NOT EXISTS idx_stages_position ON stages(pipeline_id, position);
            CREATE UNIQUE INDEX IF NOT EXISTS idx_environments_name ON environments(project_id, name);
            CREATE UNIQUE INDEX IF NOT EXISTS idx_deployments_build ON deployments(build_id);
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

/// Convert DateTime<Utc> to NaiveDateTime for SQLite
fn to_naive(dt: DateTime<Utc>) -> NaiveDateTime {
    dt.naive_utc()
}

/// Convert NaiveDateTime to DateTime<Utc>
fn from_naive(dt: NaiveDateTime) -> DateTime<Utc> {
    DateTime::from_naive_utc_and_offset(dt, Utc)
}

fn corrupt(column: &str, value: &str) -> StoreError {
    StoreError::Integrity(format!("unknown {} '{}'", column, value))
}

fn pipeline_from_row(row: &SqliteRow) -> Result<Pipeline, StoreError> {
    let source: String = row.try_get("source")?;
    let status: String = row.try_get("status")?;

    Ok(Pipeline {
        id: Some(row.try_get("id")?),
        project_id: row.try_get("project_id")?,
        ref_name: Some(row.try_get("ref")?),
        sha: row.try_get("sha")?,
        tag: row.try_get("tag")?,
        source: PipelineSource::parse(&source).ok_or_else(|| corrupt("source", &source))?,
        status: PipelineStatus::parse(&status).ok_or_else(|| corrupt("status", &status))?,
        user_id: row.try_get("user_id")?,
        stages: Vec::new(),
        created_at: Some(from_naive(row.try_get("created_at")?)),
    })
}

fn environment_from_row(row: &SqliteRow) -> Result<Environment, StoreError> {
    Ok(Environment {
        id: row.try_get("id")?,
        project_id: row.try_get("project_id")?,
        name: row.try_get("name")?,
        created_at: from_naive(row.try_get("created_at")?),
    })
}

fn deployment_from_row(row: &SqliteRow) -> Result<Deployment, StoreError> {
    Ok(Deployment {
        id: row.try_get("id")?,
        project_id: row.try_get("project_id")?,
        environment_id: row.try_get("environment_id")?,
        build_id: row.try_get("build_id")?,
        ref_name: row.try_get("ref")?,
        sha: row.try_get("sha")?,
        created_at: from_naive(row.try_get("created_at")?),
    })
}

#[async_trait]
impl PipelineStore for SqlitePipelineStore {
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>, StoreError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(SqliteTransaction { tx }))
    }

    async fn load_pipeline(&self, id: i64) -> Result<Option<Pipeline>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, project_id, ref, sha, tag, source, status, user_id, created_at
            FROM pipelines
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let mut pipeline = pipeline_from_row(&row)?;

        let stage_rows = sqlx::query(
            "SELECT id, project_id, name, position FROM stages WHERE pipeline_id = ?1 ORDER BY position ASC",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        for stage_row in &stage_rows {
            let stage_id: i64 = stage_row.try_get("id")?;
            let build_rows = sqlx::query(
                "SELECT id, name, environment, status FROM builds WHERE stage_id = ?1 ORDER BY id ASC",
            )
            .bind(stage_id)
            .fetch_all(&self.pool)
            .await?;

            let builds = build_rows
                .iter()
                .map(|row| -> Result<Build, StoreError> {
                    let status: String = row.try_get("status")?;
                    Ok(Build {
                        id: Some(row.try_get("id")?),
                        name: row.try_get("name")?,
                        environment: row.try_get("environment")?,
                        status: BuildStatus::parse(&status)
                            .ok_or_else(|| corrupt("build status", &status))?,
                    })
                })
                .collect::<Result<Vec<_>, StoreError>>()?;

            pipeline.stages.push(Stage {
                id: Some(stage_id),
                name: stage_row.try_get("name")?,
                position: stage_row.try_get("position")?,
                project_id: stage_row.try_get("project_id")?,
                builds,
            });
        }

        Ok(Some(pipeline))
    }

    async fn list_pipelines(&self, project_id: i64) -> Result<Vec<PipelineSummary>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT p.id, p.project_id, p.ref, p.sha, p.status, p.created_at,
                   (SELECT COUNT(*) FROM stages s WHERE s.pipeline_id = p.id) AS stage_count,
                   (SELECT COUNT(*) FROM builds b WHERE b.pipeline_id = p.id) AS build_count
            FROM pipelines p
            WHERE p.project_id = ?1
            ORDER BY p.id DESC
            "#,
        )
        .bind(project_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| -> Result<PipelineSummary, StoreError> {
                let status: String = row.try_get("status")?;
                Ok(PipelineSummary {
                    id: row.try_get("id")?,
                    project_id: row.try_get("project_id")?,
                    ref_name: row.try_get("ref")?,
                    sha: row.try_get("sha")?,
                    status: PipelineStatus::parse(&status)
                        .ok_or_else(|| corrupt("status", &status))?,
                    stage_count: row.try_get::<i64, _>("stage_count")? as usize,
                    build_count: row.try_get::<i64, _>("build_count")? as usize,
                    created_at: from_naive(row.try_get("created_at")?),
                })
            })
            .collect()
    }

    async fn environments(&self, project_id: i64) -> Result<Vec<Environment>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, project_id, name, created_at FROM environments WHERE project_id = ?1 ORDER BY name ASC",
        )
        .bind(project_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(environment_from_row).collect()
    }

    async fn deployments(&self, environment_id: i64) -> Result<Vec<Deployment>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, project_id, environment_id, build_id, ref, sha, created_at
            FROM deployments
            WHERE environment_id = ?1
            ORDER BY id ASC
            "#,
        )
        .bind(environment_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(deployment_from_row).collect()
    }
}

/// Wraps a sqlx transaction; dropping it without commit rolls back
struct SqliteTransaction {
    tx: Transaction<'static, Sqlite>,
}

impl SqliteTransaction {
    async fn find_environment(
        &mut self,
        project_id: i64,
        name: &str,
    ) -> Result<Option<Environment>, StoreError> {
        let row = sqlx::query(
            "SELECT id, project_id, name, created_at FROM environments WHERE project_id = ?1 AND name = ?2",
        )
        .bind(project_id)
        .bind(name)
        .fetch_optional(&mut *self.tx)
        .await?;

        row.as_ref().map(environment_from_row).transpose()
    }
}

#[async_trait]
impl StoreTransaction for SqliteTransaction {
    async fn save_with_children(&mut self, pipeline: &Pipeline) -> Result<Pipeline, PersistError> {
        pipeline.validate()?;

        let mut saved = pipeline.clone();
        let created_at = Utc::now();

        let pipeline_id = sqlx::query(
            r#"
            INSERT INTO pipelines (project_id, ref, sha, tag, source, status, user_id, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(saved.project_id)
        .bind(saved.ref_name.as_deref().unwrap_or_default())
        .bind(saved.sha.as_deref())
        .bind(saved.tag)
        .bind(saved.source.as_str())
        .bind(saved.status.as_str())
        .bind(saved.user_id)
        .bind(to_naive(created_at))
        .execute(&mut *self.tx)
        .await
        .map_err(StoreError::from)?
        .last_insert_rowid();

        saved.id = Some(pipeline_id);
        saved.created_at = Some(created_at);
        saved.stages.sort_by_key(|s| s.position);

        for stage in &mut saved.stages {
            let stage_id = sqlx::query(
                "INSERT INTO stages (pipeline_id, project_id, name, position) VALUES (?1, ?2, ?3, ?4)",
            )
            .bind(pipeline_id)
            .bind(stage.project_id)
            .bind(&stage.name)
            .bind(stage.position)
            .execute(&mut *self.tx)
            .await
            .map_err(StoreError::from)?
            .last_insert_rowid();
            stage.id = Some(stage_id);

            for build in &mut stage.builds {
                let build_id = sqlx::query(
                    r#"
                    INSERT INTO builds (pipeline_id, stage_id, name, environment, status)
                    VALUES (?1, ?2, ?3, ?4, ?5)
                    "#,
                )
                .bind(pipeline_id)
                .bind(stage_id)
                .bind(&build.name)
                .bind(build.environment.as_deref())
                .bind(build.status.as_str())
                .execute(&mut *self.tx)
                .await
                .map_err(StoreError::from)?
                .last_insert_rowid();
                build.id = Some(build_id);
            }
        }

        debug!(pipeline_id, stages = saved.stages.len(), "Inserted pipeline graph");
        Ok(saved)
    }

    async fn find_or_create_environment(
        &mut self,
        project_id: i64,
        name: &str,
    ) -> Result<Environment, PersistError> {
        if let Some(existing) = self.find_environment(project_id, name).await? {
            return Ok(existing);
        }

        validate_environment_name(name)?;

        sqlx::query(
            r#"
            INSERT INTO environments (project_id, name, created_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(project_id, name) DO NOTHING
            "#,
        )
        .bind(project_id)
        .bind(name)
        .bind(to_naive(Utc::now()))
        .execute(&mut *self.tx)
        .await
        .map_err(StoreError::from)?;

        self.find_environment(project_id, name)
            .await?
            .ok_or_else(|| {
                StoreError::Integrity(format!("environment {} vanished after insert", name)).into()
            })
    }

    async fn create_deployment(
        &mut self,
        pipeline: &Pipeline,
        build: &Build,
        environment: &Environment,
    ) -> Result<Deployment, PersistError> {
        let build_id = build.id.ok_or_else(|| {
            StoreError::Integrity(format!("build {} has not been saved", build.name))
        })?;
        let ref_name = pipeline.ref_name.clone().unwrap_or_default();
        let created_at = Utc::now();

        let id = sqlx::query(
            r#"
            INSERT INTO deployments (project_id, environment_id, build_id, ref, sha, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(pipeline.project_id)
        .bind(environment.id)
        .bind(build_id)
        .bind(&ref_name)
        .bind(pipeline.sha.as_deref())
        .bind(to_naive(created_at))
        .execute(&mut *self.tx)
        .await
        .map_err(StoreError::from)?
        .last_insert_rowid();

        Ok(Deployment {
            id,
            project_id: pipeline.project_id,
            environment_id: environment.id,
            build_id,
            ref_name,
            sha: pipeline.sha.clone(),
            created_at,
        })
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.rollback().await?;
        Ok(())
    }
}
