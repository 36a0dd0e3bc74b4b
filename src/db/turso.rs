use crate::db::traits::PresentationStore;
use crate::types::{
    AppError, CreatePresentationRequest, Presentation, PresentationOutline, Result,
};
use crate::utils::toml_config::DatabaseConfig;
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use libsql::params::Params;
use libsql::{Builder, Connection, Database, Row, Value};
use std::path::Path;
use tracing::info;
use uuid::Uuid;

const SELECT_PRESENTATION: &str = "SELECT id, content, n_slides, language, tone, verbosity,
        instructions, include_title_slide, include_table_of_contents, web_search,
        file_paths, outlines, title, created_at, updated_at
     FROM presentations WHERE id = ?";

/// libsql-backed presentation store.
///
/// A single connection is kept for the client's lifetime so an in-memory
/// database stays the same database across calls.
pub struct TursoClient {
    _db: Database,
    conn: Connection,
}

impl TursoClient {
    async fn open(db: Database) -> Result<Self> {
        let conn = db
            .connect()
            .map_err(|e| AppError::Database(format!("Failed to get connection: {}", e)))?;

        let client = Self { _db: db, conn };
        client.initialize_schema().await?;

        Ok(client)
    }

    /// Ephemeral database, lost when the client is dropped
    pub async fn new_memory() -> Result<Self> {
        let db = Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| AppError::Database(format!("Failed to open in-memory database: {}", e)))?;

        Self::open(db).await
    }

    pub async fn new_local(path: &str) -> Result<Self> {
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.map_err(|e| {
                    AppError::Database(format!("Failed to create database directory: {}", e))
                })?;
            }
        }

        let db = Builder::new_local(path)
            .build()
            .await
            .map_err(|e| AppError::Database(format!("Failed to open {}: {}", path, e)))?;

        Self::open(db).await
    }

    #[cfg(feature = "turso")]
    pub async fn new_remote(url: String, auth_token: String) -> Result<Self> {
        let db = Builder::new_remote(url, auth_token)
            .build()
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Turso: {}", e)))?;

        Self::open(db).await
    }

    /// Remote Turso when both env vars named in the config are set (and the
    /// `turso` feature is on), otherwise the local path or `:memory:`.
    pub async fn from_config(config: &DatabaseConfig) -> Result<Self> {
        #[cfg(feature = "turso")]
        {
            if let (Some(url_env), Some(token_env)) =
                (&config.turso_url_env, &config.turso_token_env)
            {
                if let (Ok(url), Ok(token)) = (std::env::var(url_env), std::env::var(token_env)) {
                    if !url.is_empty() && !token.is_empty() {
                        info!("Using remote Turso database");
                        return Self::new_remote(url, token).await;
                    }
                }
            }
        }

        if config.url == ":memory:" {
            info!("Using in-memory database");
            Self::new_memory().await
        } else {
            info!(path = %config.url, "Using local database");
            Self::new_local(&config.url).await
        }
    }

    async fn initialize_schema(&self) -> Result<()> {
        self.conn
            .execute(
                "CREATE TABLE IF NOT EXISTS presentations (
                    id TEXT PRIMARY KEY,
                    content TEXT NOT NULL,
                    n_slides INTEGER NOT NULL,
                    language TEXT NOT NULL,
                    tone TEXT,
                    verbosity TEXT,
                    instructions TEXT,
                    include_title_slide INTEGER NOT NULL,
                    include_table_of_contents INTEGER NOT NULL,
                    web_search INTEGER NOT NULL,
                    file_paths TEXT NOT NULL,
                    outlines TEXT,
                    title TEXT,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                )",
                (),
            )
            .await
            .map_err(|e| {
                AppError::Database(format!("Failed to create presentations table: {}", e))
            })?;

        Ok(())
    }
}

#[async_trait]
impl PresentationStore for TursoClient {
    async fn create_presentation(&self, request: &CreatePresentationRequest) -> Result<Presentation> {
        let now = Utc::now();
        let presentation = Presentation {
            id: Uuid::new_v4(),
            content: request.content.clone(),
            n_slides: request.n_slides,
            language: request.language.clone(),
            tone: request.tone.clone(),
            verbosity: request.verbosity.clone(),
            instructions: request.instructions.clone(),
            include_title_slide: request.include_title_slide,
            include_table_of_contents: request.include_table_of_contents,
            web_search: request.web_search,
            file_paths: request.file_paths.clone(),
            outlines: None,
            title: None,
            created_at: now,
            updated_at: now,
        };

        let file_paths = serde_json::to_string(&presentation.file_paths)
            .map_err(|e| AppError::Internal(format!("Failed to encode file paths: {}", e)))?;

        let params = Params::Positional(vec![
            Value::Text(presentation.id.to_string()),
            Value::Text(presentation.content.clone()),
            Value::Integer(i64::from(presentation.n_slides)),
            Value::Text(presentation.language.clone()),
            optional_text(&presentation.tone),
            optional_text(&presentation.verbosity),
            optional_text(&presentation.instructions),
            Value::Integer(i64::from(presentation.include_title_slide)),
            Value::Integer(i64::from(presentation.include_table_of_contents)),
            Value::Integer(i64::from(presentation.web_search)),
            Value::Text(file_paths),
            Value::Text(timestamp(&now)),
            Value::Text(timestamp(&now)),
        ]);

        self.conn
            .execute(
                "INSERT INTO presentations (id, content, n_slides, language, tone, verbosity,
                    instructions, include_title_slide, include_table_of_contents, web_search,
                    file_paths, created_at, updated_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                params,
            )
            .await
            .map_err(|e| AppError::Database(format!("Failed to create presentation: {}", e)))?;

        Ok(presentation)
    }

    async fn get_presentation(&self, id: Uuid) -> Result<Option<Presentation>> {
        let mut rows = self
            .conn
            .query(SELECT_PRESENTATION, [id.to_string()])
            .await
            .map_err(|e| AppError::Database(format!("Failed to query presentation: {}", e)))?;

        match rows
            .next()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
        {
            Some(row) => Ok(Some(presentation_from_row(&row)?)),
            None => Ok(None),
        }
    }

    async fn save_outline(
        &self,
        id: Uuid,
        outline: &PresentationOutline,
        title: &str,
    ) -> Result<Presentation> {
        let outlines = serde_json::to_string(outline)
            .map_err(|e| AppError::Internal(format!("Failed to encode outline: {}", e)))?;

        let updated = self
            .conn
            .execute(
                "UPDATE presentations SET outlines = ?, title = ?, updated_at = ? WHERE id = ?",
                Params::Positional(vec![
                    Value::Text(outlines),
                    Value::Text(title.to_string()),
                    Value::Text(timestamp(&Utc::now())),
                    Value::Text(id.to_string()),
                ]),
            )
            .await
            .map_err(|e| AppError::Database(format!("Failed to save outline: {}", e)))?;

        if updated == 0 {
            return Err(AppError::NotFound(format!("Presentation {} not found", id)));
        }

        self.get_presentation(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Presentation {} not found", id)))
    }
}

fn optional_text(value: &Option<String>) -> Value {
    match value {
        Some(text) => Value::Text(text.clone()),
        None => Value::Null,
    }
}

fn timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn db_err(e: libsql::Error) -> AppError {
    AppError::Database(e.to_string())
}

fn text_column(row: &Row, index: i32) -> Result<String> {
    match row.get_value(index).map_err(db_err)? {
        Value::Text(text) => Ok(text),
        other => Err(AppError::Database(format!(
            "Expected text in column {}, found {:?}",
            index, other
        ))),
    }
}

fn optional_text_column(row: &Row, index: i32) -> Result<Option<String>> {
    match row.get_value(index).map_err(db_err)? {
        Value::Null => Ok(None),
        Value::Text(text) => Ok(Some(text)),
        other => Err(AppError::Database(format!(
            "Expected text in column {}, found {:?}",
            index, other
        ))),
    }
}

fn integer_column(row: &Row, index: i32) -> Result<i64> {
    match row.get_value(index).map_err(db_err)? {
        Value::Integer(value) => Ok(value),
        other => Err(AppError::Database(format!(
            "Expected integer in column {}, found {:?}",
            index, other
        ))),
    }
}

fn timestamp_column(row: &Row, index: i32) -> Result<DateTime<Utc>> {
    let text = text_column(row, index)?;
    DateTime::parse_from_rfc3339(&text)
        .map(|at| at.with_timezone(&Utc))
        .map_err(|e| AppError::Database(format!("Invalid timestamp {}: {}", text, e)))
}

fn presentation_from_row(row: &Row) -> Result<Presentation> {
    let id = text_column(row, 0)?;
    let file_paths = text_column(row, 10)?;
    let outlines = optional_text_column(row, 11)?
        .map(|json| serde_json::from_str::<PresentationOutline>(&json))
        .transpose()
        .map_err(|e| AppError::Database(format!("Corrupt outline for {}: {}", id, e)))?;

    Ok(Presentation {
        id: Uuid::parse_str(&id)
            .map_err(|e| AppError::Database(format!("Invalid presentation id {}: {}", id, e)))?,
        content: text_column(row, 1)?,
        n_slides: u32::try_from(integer_column(row, 2)?)
            .map_err(|e| AppError::Database(format!("Invalid slide count: {}", e)))?,
        language: text_column(row, 3)?,
        tone: optional_text_column(row, 4)?,
        verbosity: optional_text_column(row, 5)?,
        instructions: optional_text_column(row, 6)?,
        include_title_slide: integer_column(row, 7)? != 0,
        include_table_of_contents: integer_column(row, 8)? != 0,
        web_search: integer_column(row, 9)? != 0,
        file_paths: serde_json::from_str(&file_paths)
            .map_err(|e| AppError::Database(format!("Corrupt file paths for {}: {}", id, e)))?,
        outlines,
        title: optional_text_column(row, 12)?,
        created_at: timestamp_column(row, 13)?,
        updated_at: timestamp_column(row, 14)?,
    })
}
