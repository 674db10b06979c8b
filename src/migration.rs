//! File-based migrations: `NNNN_name.up.sql` / `NNNN_name.down.sql`, applied versions tracked in
//! `gateway_schema_migrations`.

use crate::error::AppError;
use async_trait::async_trait;
use regex::Regex;
use sqlx::{Executor, PgConnection, PgPool};
use std::collections::{BTreeMap, HashSet};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::str::FromStr;

type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send + 'static>>;

pub const MIGRATIONS_TABLE: &str = "gateway_schema_migrations";

const FILE_PATTERN: &str = r"^(\d+)_([A-Za-z0-9_\-]+)\.(up|down)\.sql$";

/// `up`, `up N`, `down`, `down N`, `status`. No count means all.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MigrationCommand {
    Up(Option<usize>),
    Down(Option<usize>),
    Status,
}

impl FromStr for MigrationCommand {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split_whitespace();
        let verb = parts.next().unwrap_or("");
        let count = match parts.next() {
            None => None,
            Some(n) => Some(
                n.parse::<usize>()
                    .map_err(|_| AppError::Validation(format!("invalid migration count '{}'", n)))?,
            ),
        };
        if parts.next().is_some() {
            return Err(AppError::Validation(format!("invalid migration command '{}'", s)));
        }
        match (verb, count) {
            ("up", n) => Ok(MigrationCommand::Up(n)),
            ("down", n) => Ok(MigrationCommand::Down(n)),
            ("status", None) => Ok(MigrationCommand::Status),
            _ => Err(AppError::Validation(format!("invalid migration command '{}'", s))),
        }
    }
}

/// Ids that ran (or, for `status`, one line per known migration), and the error that stopped the run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MigrationOutcome {
    pub executed: Vec<String>,
    pub error: Option<String>,
}

impl MigrationOutcome {
    fn failed(mut self, error: impl ToString) -> Self {
        self.error = Some(error.to_string());
        self
    }
}

#[async_trait]
pub trait MigrationRunner: Send + Sync {
    /// Blocks until the command finishes. Never returns early on partial failure.
    async fn run(&self, command: MigrationCommand) -> MigrationOutcome;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MigrationFile {
    pub version: i64,
    pub name: String,
    pub up: Option<PathBuf>,
    pub down: Option<PathBuf>,
}

impl MigrationFile {
    pub fn id(&self) -> String {
        format!("{:04}_{}", self.version, self.name)
    }
}

/// Migrations in `dir`, ascending by version. A missing directory yields none.
pub fn discover(dir: &Path) -> Result<Vec<MigrationFile>, AppError> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let re = Regex::new(FILE_PATTERN).map_err(|e| AppError::Internal(e.to_string()))?;
    let entries = std::fs::read_dir(dir)
        .map_err(|e| AppError::Internal(format!("read {}: {}", dir.display(), e)))?;
    let mut found: BTreeMap<i64, MigrationFile> = BTreeMap::new();
    for entry in entries {
        let entry = entry.map_err(|e| AppError::Internal(e.to_string()))?;
        let file_name = entry.file_name().to_string_lossy().into_owned();
        let Some(caps) = re.captures(&file_name) else {
            continue;
        };
        let version: i64 = caps[1]
            .parse()
            .map_err(|_| AppError::Internal(format!("bad migration version in {}", file_name)))?;
        let file = found.entry(version).or_insert_with(|| MigrationFile {
            version,
            name: caps[2].to_string(),
            up: None,
            down: None,
        });
        if file.name != caps[2] {
            return Err(AppError::Internal(format!(
                "migration version {} used by both {} and {}",
                version, file.name, &caps[2]
            )));
        }
        match &caps[3] {
            "up" => file.up = Some(entry.path()),
            _ => file.down = Some(entry.path()),
        }
    }
    Ok(found.into_values().collect())
}

/// Apply every pending migration. Upserts need the `gateway_upsert` function these install, so
/// servers call this before accepting requests.
pub async fn apply_pending(runner: &dyn MigrationRunner) -> Result<Vec<String>, AppError> {
    let outcome = runner.run(MigrationCommand::Up(None)).await;
    match outcome.error {
        None => Ok(outcome.executed),
        Some(err) => Err(AppError::Internal(format!(
            "pending migrations failed after [{}]: {}",
            outcome.executed.join(", "),
            err
        ))),
    }
}

pub struct PgMigrator {
    pool: PgPool,
    dir: PathBuf,
}

impl PgMigrator {
    pub fn new(pool: PgPool, dir: impl Into<PathBuf>) -> Self {
        PgMigrator { pool, dir: dir.into() }
    }

    async fn ensure_table(&self) -> Result<(), sqlx::Error> {
        sqlx::query(&format!(
            "CREATE TABLE IF NOT EXISTS {} (version BIGINT PRIMARY KEY, name TEXT NOT NULL, applied_at TIMESTAMPTZ NOT NULL DEFAULT now())",
            MIGRATIONS_TABLE
        ))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn applied(&self) -> Result<HashSet<i64>, sqlx::Error> {
        let rows: Vec<i64> = sqlx::query_scalar(&format!("SELECT version FROM {}", MIGRATIONS_TABLE))
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().collect())
    }

    /// Script and bookkeeping commit together. Takes owned inputs so the future stays `Send`.
    fn apply(pool: PgPool, file: MigrationFile, script: PathBuf, up: bool) -> BoxFuture<Result<(), String>> {
        Box::pin(async move {
            let sql = tokio::fs::read_to_string(&script)
                .await
                .map_err(|e| format!("read {}: {}", script.display(), e))?;
            let mut tx = pool.begin().await.map_err(|e| e.to_string())?;
            let conn: &mut PgConnection = &mut *tx;
            (&mut *conn)
                .execute(sqlx::raw_sql(&sql))
                .await
                .map_err(|e| format!("{}: {}", file.id(), e))?;
            let bookkeeping = if up {
                format!("INSERT INTO {} (version, name) VALUES ($1, $2)", MIGRATIONS_TABLE)
            } else {
                format!("DELETE FROM {} WHERE version = $1", MIGRATIONS_TABLE)
            };
            let mut query = sqlx::query(&bookkeeping).bind(file.version);
            if up {
                query = query.bind(file.name.clone());
            }
            query.execute(&mut *conn).await.map_err(|e| e.to_string())?;
            tx.commit().await.map_err(|e| e.to_string())
        })
    }

    async fn run_inner(&self, command: MigrationCommand) -> MigrationOutcome {
        let outcome = MigrationOutcome::default();
        let files = match discover(&self.dir) {
            Ok(f) => f,
            Err(e) => return outcome.failed(e),
        };
        if let Err(e) = self.ensure_table().await {
            return outcome.failed(e);
        }
        let applied = match self.applied().await {
            Ok(a) => a,
            Err(e) => return outcome.failed(e),
        };
        match command {
            MigrationCommand::Status => {
                let executed = files
                    .iter()
                    .map(|f| {
                        let state = if applied.contains(&f.version) { "applied" } else { "pending" };
                        format!("{} {}", f.id(), state)
                    })
                    .collect();
                MigrationOutcome { executed, error: None }
            }
            MigrationCommand::Up(limit) => {
                let pending = files
                    .into_iter()
                    .filter(|f| !applied.contains(&f.version))
                    .take(limit.unwrap_or(usize::MAX))
                    .collect();
                self.step(pending, true).await
            }
            MigrationCommand::Down(limit) => {
                let reverting = files
                    .into_iter()
                    .rev()
                    .filter(|f| applied.contains(&f.version))
                    .take(limit.unwrap_or(usize::MAX))
                    .collect();
                self.step(reverting, false).await
            }
        }
    }

    async fn step(&self, files: Vec<MigrationFile>, up: bool) -> MigrationOutcome {
        let mut outcome = MigrationOutcome::default();
        for file in files {
            let id = file.id();
            let script = if up { file.up.clone() } else { file.down.clone() };
            let Some(script) = script else {
                let direction = if up { "up" } else { "down" };
                return outcome.failed(format!("{}: no {} script", id, direction));
            };
            if let Err(e) = Self::apply(self.pool.clone(), file, script, up).await {
                return outcome.failed(e);
            }
            tracing::info!(migration = %id, up, "migration applied");
            outcome.executed.push(id);
        }
        outcome
    }
}

#[async_trait]
impl MigrationRunner for PgMigrator {
    async fn run(&self, command: MigrationCommand) -> MigrationOutcome {
        let outcome = self.run_inner(command).await;
        if let Some(err) = &outcome.error {
            tracing::error!(?command, executed = outcome.executed.len(), error = %err, "migration failed");
        }
        outcome
    }
}
