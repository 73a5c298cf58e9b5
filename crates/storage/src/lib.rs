use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use dashboard_core::ProcessStore;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow},
    Pool, Row, Sqlite,
};
use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use shared::{
    domain::{ProcessId, ProcessRecord, ProcessStatus},
    protocol::ProcessoFields,
};

#[derive(Clone)]
pub struct Storage {
    pool: Pool<Sqlite>,
}

impl Storage {
    pub async fn new(database_url: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(connect_options)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    pub async fn health_check(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }

    pub async fn list_processos(&self) -> Result<Vec<ProcessRecord>> {
        let rows = sqlx::query(
            "SELECT id, numero, responsavel, status, data_entrada, anexo_url FROM processos",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(record_from_row).collect())
    }

    pub async fn get_processo(&self, id: ProcessId) -> Result<Option<ProcessRecord>> {
        let row = sqlx::query(
            "SELECT id, numero, responsavel, status, data_entrada, anexo_url
             FROM processos
             WHERE id = ?",
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(record_from_row))
    }

    /// Inserts a new processo. The entry date is assigned here, once, from
    /// the UTC clock; a missing attachment reference is stored as ''.
    pub async fn create_processo(&self, fields: &ProcessoFields) -> Result<ProcessId> {
        let data_entrada = Utc::now().date_naive();
        let rec = sqlx::query(
            "INSERT INTO processos (numero, responsavel, status, data_entrada, anexo_url)
             VALUES (?, ?, ?, ?, ?)
             RETURNING id",
        )
        .bind(&fields.numero)
        .bind(&fields.responsavel)
        .bind(fields.status.as_str())
        .bind(data_entrada)
        .bind(fields.anexo_url.as_deref().unwrap_or_default())
        .fetch_one(&self.pool)
        .await?;
        Ok(ProcessId(rec.get::<i64, _>(0)))
    }

    /// Rewrites the form-owned fields of an existing processo. The entry
    /// date is never touched; an absent attachment reference leaves the
    /// stored one as it is.
    pub async fn update_processo(&self, id: ProcessId, fields: &ProcessoFields) -> Result<bool> {
        let updated = sqlx::query(
            "UPDATE processos
             SET numero = ?, responsavel = ?, status = ?, anexo_url = COALESCE(?, anexo_url)
             WHERE id = ?",
        )
        .bind(&fields.numero)
        .bind(&fields.responsavel)
        .bind(fields.status.as_str())
        .bind(fields.anexo_url.as_deref())
        .bind(id.0)
        .execute(&self.pool)
        .await?
        .rows_affected();
        Ok(updated > 0)
    }
}

fn record_from_row(row: SqliteRow) -> ProcessRecord {
    // A malformed stored date degrades to "undated" instead of failing the
    // whole fetch; the aggregator sorts undated records last.
    let data_entrada = row
        .get::<Option<String>, _>(4)
        .and_then(|raw| raw.parse::<NaiveDate>().ok());
    let anexo_url = row
        .get::<Option<String>, _>(5)
        .filter(|url| !url.is_empty());

    ProcessRecord {
        id: Some(ProcessId(row.get::<i64, _>(0))),
        numero: row.get::<String, _>(1),
        responsavel: row.get::<String, _>(2),
        status: ProcessStatus::from(row.get::<String, _>(3)),
        data_entrada,
        anexo_url,
    }
}

fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if database_url == "sqlite::memory:" || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[async_trait]
impl ProcessStore for Storage {
    async fn fetch_all(&self) -> Result<Vec<ProcessRecord>> {
        self.list_processos().await
    }

    async fn create(&self, fields: ProcessoFields) -> Result<ProcessId> {
        self.create_processo(&fields).await
    }

    async fn update(&self, id: ProcessId, fields: ProcessoFields) -> Result<bool> {
        self.update_processo(id, &fields).await
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
