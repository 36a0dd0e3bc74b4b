use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============= Presentation Types =============

/// Persisted presentation record.
///
/// The outline stream reads this once at stream start and writes `outlines`
/// and `title` back exactly once, right before the terminal event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Presentation {
    pub id: Uuid,
    pub content: String,
    pub n_slides: u32,
    pub language: String,
    pub tone: Option<String>,
    pub verbosity: Option<String>,
    pub instructions: Option<String>,
    pub include_title_slide: bool,
    pub include_table_of_contents: bool,
    pub web_search: bool,
    #[serde(default)]
    pub file_paths: Vec<String>,
    pub outlines: Option<PresentationOutline>,
    pub title: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePresentationRequest {
    pub content: String,
    #[serde(default = "default_n_slides")]
    pub n_slides: u32,
    #[serde(default = "default_language")]
    pub language: String,
    pub tone: Option<String>,
    pub verbosity: Option<String>,
    pub instructions: Option<String>,
    #[serde(default = "default_true")]
    pub include_title_slide: bool,
    #[serde(default)]
    pub include_table_of_contents: bool,
    #[serde(default)]
    pub web_search: bool,
    #[serde(default)]
    pub file_paths: Vec<String>,
}

fn default_n_slides() -> u32 {
    8
}

fn default_language() -> String {
    "English".to_string()
}

fn default_true() -> bool {
    true
}

/// Read-only snapshot of the presentation configuration taken when a stream starts.
#[derive(Debug, Clone, PartialEq)]
pub struct OutlineGenerationRequest {
    pub presentation_id: Uuid,
    pub content: String,
    pub n_slides: u32,
    pub language: String,
    pub tone: Option<String>,
    pub verbosity: Option<String>,
    pub instructions: Option<String>,
    pub include_title_slide: bool,
    pub include_table_of_contents: bool,
    pub web_search: bool,
    pub file_paths: Vec<String>,
}

impl From<&Presentation> for OutlineGenerationRequest {
    fn from(p: &Presentation) -> Self {
        Self {
            presentation_id: p.id,
            content: p.content.clone(),
            n_slides: p.n_slides,
            language: p.language.clone(),
            tone: p.tone.clone(),
            verbosity: p.verbosity.clone(),
            instructions: p.instructions.clone(),
            include_title_slide: p.include_title_slide,
            include_table_of_contents: p.include_table_of_contents,
            web_search: p.web_search,
            file_paths: p.file_paths.clone(),
        }
    }
}

// ============= Outline Types =============

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PresentationOutline {
    #[serde(default)]
    pub slides: Vec<SlideOutline>,
}

/// A single slide in the outline. Generators are not always consistent about
/// shape, so a bare string or a `title`/`body` pair is accepted too.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(from = "RawSlide")]
pub struct SlideOutline {
    pub content: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawSlide {
    Text(String),
    Content {
        content: String,
    },
    Titled {
        title: String,
        #[serde(default)]
        body: Option<String>,
    },
}

impl From<RawSlide> for SlideOutline {
    fn from(raw: RawSlide) -> Self {
        let content = match raw {
            RawSlide::Text(content) | RawSlide::Content { content } => content,
            RawSlide::Titled { title, body: None } => format!("# {}", title),
            RawSlide::Titled {
                title,
                body: Some(body),
            } => format!("# {}\n{}", title, body),
        };
        Self { content }
    }
}

// ============= Research Types =============

/// One record returned by a research source. Identity is the `url`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResearchItem {
    pub title: String,
    pub content: String,
    pub url: String,
}

impl ResearchItem {
    pub fn new(
        title: impl Into<String>,
        content: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            url: url.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SourceRef {
    pub title: String,
    pub url: String,
}

/// Merged output of one research run.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResearchBundle {
    pub summary: String,
    pub sources: Vec<SourceRef>,
}

impl ResearchBundle {
    pub fn is_empty(&self) -> bool {
        self.summary.trim().is_empty()
    }
}

// ============= Stream Events =============

/// A discrete unit pushed to the client over the outline stream.
///
/// `Error` and `Complete` are terminal: the stream closes right after either.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    Status(String),
    Chunk(String),
    Error(String),
    Complete {
        key: String,
        value: serde_json::Value,
    },
}

impl StreamEvent {
    pub fn status(message: impl Into<String>) -> Self {
        Self::Status(message.into())
    }

    pub fn error(detail: impl Into<String>) -> Self {
        Self::Error(detail.into())
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Error(_) | Self::Complete { .. })
    }

    /// JSON payload carried in the `data:` field of the SSE frame.
    pub fn payload(&self) -> serde_json::Value {
        match self {
            Self::Status(status) => serde_json::json!({ "type": "status", "status": status }),
            Self::Chunk(chunk) => serde_json::json!({ "type": "chunk", "chunk": chunk }),
            Self::Error(detail) => serde_json::json!({ "type": "error", "detail": detail }),
            Self::Complete { key, value } => {
                let mut map = serde_json::Map::new();
                map.insert("type".to_string(), serde_json::json!("complete"));
                map.insert(key.clone(), value.clone());
                serde_json::Value::Object(map)
            }
        }
    }
}

// ============= Error Types =============

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("LLM error: {0}")]
    LLM(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Document error: {0}")]
    Document(String),

    #[error("Research error: {0}")]
    Research(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            AppError::Database(msg) => (axum::http::StatusCode::INTERNAL_SERVER_ERROR, msg),
            AppError::LLM(msg) => (axum::http::StatusCode::INTERNAL_SERVER_ERROR, msg),
            AppError::NotFound(msg) => (axum::http::StatusCode::NOT_FOUND, msg),
            AppError::InvalidInput(msg) => (axum::http::StatusCode::BAD_REQUEST, msg),
            AppError::Document(msg) => (axum::http::StatusCode::UNPROCESSABLE_ENTITY, msg),
            AppError::Research(msg) => (axum::http::StatusCode::BAD_GATEWAY, msg),
            AppError::Internal(msg) => (axum::http::StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = serde_json::json!({
            "error": message
        });

        (status, axum::Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
