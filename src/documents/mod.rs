//! Attachment loading for outline generation.
//!
//! Each stream stages its attachments into its own temporary directory before
//! extracting text, so concurrent streams never share files. Only files that
//! resolve inside the upload root are read.

use crate::types::{AppError, Result};
use scraper::{Html, Node};
use std::path::{Path, PathBuf};
use tracing::debug;

const TEXT_EXTENSIONS: &[&str] = &["txt", "md", "markdown", "csv", "json"];
const HTML_EXTENSIONS: &[&str] = &["html", "htm"];
const SKIPPED_ELEMENTS: &[&str] = &["script", "style", "noscript", "template"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DocumentKind {
    Text,
    Html,
}

#[derive(Debug, Clone)]
pub struct DocumentsLoader {
    upload_root: PathBuf,
}

impl DocumentsLoader {
    /// Loader confined to `upload_root`. Relative attachment paths are
    /// resolved against it.
    pub fn new(upload_root: impl Into<PathBuf>) -> Self {
        Self {
            upload_root: upload_root.into(),
        }
    }

    pub fn upload_root(&self) -> &Path {
        &self.upload_root
    }

    /// Canonical location of `file_path`, rejected unless it lies under the upload root.
    /// Symlinks are followed before the check.
    async fn resolve(&self, file_path: &str) -> Result<PathBuf> {
        let root = tokio::fs::canonicalize(&self.upload_root).await.map_err(|e| {
            AppError::Document(format!(
                "Upload directory {} is unavailable: {}",
                self.upload_root.display(),
                e
            ))
        })?;

        let resolved = tokio::fs::canonicalize(root.join(file_path))
            .await
            .map_err(|e| AppError::Document(format!("Failed to load {}: {}", file_path, e)))?;

        if !resolved.starts_with(&root) {
            return Err(AppError::Document(format!(
                "{} is outside the upload directory",
                file_path
            )));
        }

        Ok(resolved)
    }

    /// Stage every file into `temp_dir` and return its text, in input order.
    ///
    /// Any unreadable or unsupported file fails the whole load.
    pub async fn load_documents(&self, file_paths: &[String], temp_dir: &Path) -> Result<Vec<String>> {
        let mut documents = Vec::with_capacity(file_paths.len());

        for (index, file_path) in file_paths.iter().enumerate() {
            let kind = document_kind(Path::new(file_path))?;
            let source = self.resolve(file_path).await?;
            let staged = stage(&source, temp_dir, index).await?;

            let bytes = tokio::fs::read(&staged).await.map_err(|e| {
                AppError::Document(format!("Failed to read {}: {}", file_path, e))
            })?;
            let text = String::from_utf8(bytes).map_err(|_| {
                AppError::Document(format!("{} is not valid UTF-8 text", file_path))
            })?;

            let extracted = match kind {
                DocumentKind::Text => text,
                DocumentKind::Html => html_text(&text),
            };

            debug!(
                file = %file_path,
                chars = extracted.chars().count(),
                "Loaded attachment"
            );
            documents.push(extracted);
        }

        Ok(documents)
    }
}

fn document_kind(path: &Path) -> Result<DocumentKind> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    if TEXT_EXTENSIONS.contains(&extension.as_str()) {
        Ok(DocumentKind::Text)
    } else if HTML_EXTENSIONS.contains(&extension.as_str()) {
        Ok(DocumentKind::Html)
    } else {
        Err(AppError::Document(format!(
            "Unsupported document type: {}",
            path.display()
        )))
    }
}

async fn stage(source: &Path, temp_dir: &Path, index: usize) -> Result<PathBuf> {
    let name = source
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("document");
    let target = temp_dir.join(format!("{:03}-{}", index, name));

    tokio::fs::copy(source, &target).await.map_err(|e| {
        AppError::Document(format!("Failed to load {}: {}", source.display(), e))
    })?;

    Ok(target)
}

/// Visible text of an HTML document, one line per text node
pub fn html_text(source: &str) -> String {
    let document = Html::parse_document(source);

    document
        .tree
        .root()
        .descendants()
        .filter_map(|node| match node.value() {
            Node::Text(text) => {
                let hidden = node.ancestors().any(|ancestor| {
                    matches!(ancestor.value(), Node::Element(e) if SKIPPED_ELEMENTS.contains(&e.name()))
                });
                let trimmed = text.trim();
                (!hidden && !trimmed.is_empty()).then(|| trimmed.to_string())
            }
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, content: &[u8]) -> String {
        let path = dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        path.to_string_lossy().to_string()
    }

    #[tokio::test]
    async fn test_loads_text_documents_in_order_and_stages_them() {
        let uploads = TempDir::new().unwrap();
        let staging = TempDir::new().unwrap();
        let notes = write(&uploads, "notes.md", b"# Notes\n- one");
        let data = write(&uploads, "data.CSV", b"a,b\n1,2");

        let documents = DocumentsLoader::new(uploads.path())
            .load_documents(&[notes, data], staging.path())
            .await
            .unwrap();

        assert_eq!(documents, vec!["# Notes\n- one", "a,b\n1,2"]);
        assert!(staging.path().join("000-notes.md").exists());
        assert!(staging.path().join("001-data.CSV").exists());
    }

    #[tokio::test]
    async fn test_html_is_reduced_to_visible_text() {
        let uploads = TempDir::new().unwrap();
        let staging = TempDir::new().unwrap();
        let page = write(
            &uploads,
            "page.html",
            b"<html><head><style>p { color: red; }</style><script>track()</script></head>\
              <body><h1>Solar Power</h1><p>Cheap and clean.</p></body></html>",
        );

        let documents = DocumentsLoader::new(uploads.path())
            .load_documents(&[page], staging.path())
            .await
            .unwrap();

        assert_eq!(documents, vec!["Solar Power\nCheap and clean."]);
    }

    #[tokio::test]
    async fn test_unsupported_type_is_an_error() {
        let uploads = TempDir::new().unwrap();
        let staging = TempDir::new().unwrap();
        let binary = write(&uploads, "slides.pptx", b"PK\x03\x04");

        let result = DocumentsLoader::new(uploads.path())
            .load_documents(&[binary], staging.path())
            .await;
        assert!(matches!(result, Err(AppError::Document(_))));
    }

    #[tokio::test]
    async fn test_missing_file_is_an_error() {
        let staging = TempDir::new().unwrap();
        let result = DocumentsLoader::new(staging.path())
            .load_documents(&["/nonexistent/brief.txt".to_string()], staging.path())
            .await;
        assert!(matches!(result, Err(AppError::Document(_))));
    }

    #[tokio::test]
    async fn test_invalid_utf8_is_an_error() {
        let uploads = TempDir::new().unwrap();
        let staging = TempDir::new().unwrap();
        let broken = write(&uploads, "broken.txt", &[0xff, 0xfe, 0x00]);

        let result = DocumentsLoader::new(uploads.path())
            .load_documents(&[broken], staging.path())
            .await;
        assert!(matches!(result, Err(AppError::Document(_))));
    }

    #[tokio::test]
    async fn test_no_attachments_is_empty() {
        let staging = TempDir::new().unwrap();
        let documents = DocumentsLoader::new(staging.path())
            .load_documents(&[], staging.path())
            .await
            .unwrap();
        assert!(documents.is_empty());
    }

    #[tokio::test]
    async fn test_relative_paths_resolve_under_upload_root() {
        let uploads = TempDir::new().unwrap();
        let staging = TempDir::new().unwrap();
        write(&uploads, "brief.txt", b"Tidal energy");

        let documents = DocumentsLoader::new(uploads.path())
            .load_documents(&["brief.txt".to_string()], staging.path())
            .await
            .unwrap();
        assert_eq!(documents, vec!["Tidal energy"]);
    }

    #[tokio::test]
    async fn test_paths_outside_upload_root_are_rejected() {
        let outside = TempDir::new().unwrap();
        let uploads = TempDir::new().unwrap();
        let staging = TempDir::new().unwrap();
        let secret = write(&outside, "secret.txt", b"do not read");
        let escaping = format!(
            "../{}/secret.txt",
            outside.path().file_name().unwrap().to_string_lossy()
        );

        for path in [secret, escaping] {
            let result = DocumentsLoader::new(uploads.path())
                .load_documents(&[path.clone()], staging.path())
                .await;
            match result {
                Err(AppError::Document(msg)) => {
                    assert!(msg.contains("outside the upload directory"), "{}", msg)
                }
                other => panic!("expected rejection for {}, got {:?}", path, other),
            }
        }
        assert!(std::fs::read_dir(staging.path()).unwrap().next().is_none());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_symlink_escaping_upload_root_is_rejected() {
        let outside = TempDir::new().unwrap();
        let uploads = TempDir::new().unwrap();
        let staging = TempDir::new().unwrap();
        let secret = write(&outside, "secret.md", b"# Private");
        std::os::unix::fs::symlink(&secret, uploads.path().join("link.md")).unwrap();

        let result = DocumentsLoader::new(uploads.path())
            .load_documents(&["link.md".to_string()], staging.path())
            .await;
        assert!(matches!(result, Err(AppError::Document(_))));
    }
}
