use std::path::{Path, PathBuf};
use std::sync::Arc;

use engine_logging::{engine_debug, engine_warn};
use serde::{Deserialize, Serialize};

use crate::decode::decode_text;
use crate::extract::extract_title;
use crate::metadata::PersistedRecord;
use crate::naming::{sha256_hex, title_from_base_name};
use crate::persist::{ensure_output_dir, AtomicFileWriter, PersistError};
use crate::readable::ReadableTextExtractor;
use crate::FetchResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Pdf,
    Markdown,
    Rst,
    Html,
}

impl ContentKind {
    pub fn extension(self) -> &'static str {
        match self {
            ContentKind::Pdf => "pdf",
            ContentKind::Markdown => "md",
            ContentKind::Rst => "rst",
            ContentKind::Html => "html",
        }
    }
}

/// Storage format for a response, first match wins:
/// pdf (header or `.pdf`), markdown (`.md` or `text/markdown`), rst (`.rst`), html.
pub fn classify(served_from: &str, content_type: Option<&str>) -> ContentKind {
    let media_type = content_type
        .and_then(|ct| ct.split(';').next())
        .map(|ct| ct.trim().to_ascii_lowercase())
        .unwrap_or_default();
    let path = url_path(served_from);

    if media_type == "application/pdf" || path.ends_with(".pdf") {
        ContentKind::Pdf
    } else if path.ends_with(".md") || media_type.contains("text/markdown") {
        ContentKind::Markdown
    } else if path.ends_with(".rst") {
        ContentKind::Rst
    } else {
        ContentKind::Html
    }
}

/// Lowercased path of `url` without query or fragment; the raw string when unparseable.
fn url_path(url: &str) -> String {
    match url::Url::parse(url) {
        Ok(parsed) => parsed.path().to_ascii_lowercase(),
        Err(_) => url.to_ascii_lowercase(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputLayout {
    pub html_dir: PathBuf,
    pub md_dir: PathBuf,
    pub pdf_dir: PathBuf,
    pub metadata_path: PathBuf,
}

impl Default for OutputLayout {
    fn default() -> Self {
        Self::under(Path::new("data"))
    }
}

impl OutputLayout {
    /// `html/`, `md/`, `pdf/` and `metadata.jsonl` below `root`.
    pub fn under(root: &Path) -> Self {
        Self {
            html_dir: root.join("html"),
            md_dir: root.join("md"),
            pdf_dir: root.join("pdf"),
            metadata_path: root.join("metadata.jsonl"),
        }
    }

    pub fn ensure_dirs(&self) -> Result<(), PersistError> {
        ensure_output_dir(&self.html_dir)?;
        ensure_output_dir(&self.md_dir)?;
        ensure_output_dir(&self.pdf_dir)
    }

    pub fn pdf_path(&self, base_name: &str) -> PathBuf {
        self.pdf_dir.join(format!("{base_name}.pdf"))
    }
}

pub type Clock = Arc<dyn Fn() -> String + Send + Sync>;

/// `2024-01-31T12:00:00Z` style UTC timestamp.
pub fn utc_timestamp() -> String {
    chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dispatched {
    pub record: PersistedRecord,
    /// Markdown derived from an HTML page, when extraction produced any text.
    pub companion: Option<PathBuf>,
}

/// Routes a fetched response to its artifact and builds the metadata record.
#[derive(Clone)]
pub struct Dispatcher {
    layout: OutputLayout,
    extractor: ReadableTextExtractor,
    tags: Vec<String>,
    clock: Clock,
}

impl Dispatcher {
    pub fn new(
        layout: OutputLayout,
        extractor: ReadableTextExtractor,
        tags: Vec<String>,
        clock: Clock,
    ) -> Self {
        Self {
            layout,
            extractor,
            tags,
            clock,
        }
    }

    pub fn layout(&self) -> &OutputLayout {
        &self.layout
    }

    /// Persist `result` for the item `original_url`, named after `base_name`.
    pub fn dispatch(
        &self,
        original_url: &str,
        base_name: &str,
        result: &FetchResult,
    ) -> Result<Dispatched, PersistError> {
        let kind = classify(&result.served_from, result.content_type.as_deref());
        engine_debug!("{} classified as {:?}", result.served_from, kind);
        let filename = format!("{base_name}.{}", kind.extension());

        let (saved, title, companion) = match kind {
            ContentKind::Pdf => {
                let writer = AtomicFileWriter::new(self.layout.pdf_dir.clone());
                (writer.write_bytes(&filename, &result.bytes)?, String::new(), None)
            }
            ContentKind::Markdown | ContentKind::Rst => {
                // Bytes stay in the response's own charset.
                let writer = AtomicFileWriter::new(self.layout.md_dir.clone());
                let saved = writer.write_bytes(&filename, &result.bytes)?;
                (saved, title_from_base_name(base_name), None)
            }
            ContentKind::Html => {
                let writer = AtomicFileWriter::new(self.layout.html_dir.clone());
                let saved = writer.write_bytes(&filename, &result.bytes)?;
                let title = self
                    .html_title(result)
                    .unwrap_or_else(|| title_from_base_name(base_name));
                let companion = self.write_companion(base_name, result);
                (saved, title, companion)
            }
        };

        let record = PersistedRecord {
            original_url: original_url.to_string(),
            served_from: result.served_from.clone(),
            saved_path: saved.display().to_string(),
            kind,
            title,
            sha256: sha256_hex(&result.bytes),
            saved_at: (self.clock)(),
            tags: self.tags.clone(),
        };
        Ok(Dispatched { record, companion })
    }

    fn html_title(&self, result: &FetchResult) -> Option<String> {
        let html = decode_text(&result.bytes, result.encoding.as_deref()).text;
        extract_title(&html)
    }

    fn write_companion(&self, base_name: &str, result: &FetchResult) -> Option<PathBuf> {
        let text = self
            .extractor
            .to_readable_text(&result.bytes, result.encoding.as_deref());
        if text.is_empty() {
            return None;
        }
        let writer = AtomicFileWriter::new(self.layout.md_dir.clone());
        match writer.write(&format!("{base_name}.md"), &text) {
            Ok(path) => Some(path),
            Err(err) => {
                engine_warn!("Markdown companion for {} not written: {}", base_name, err);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pdf_header_beats_suffix() {
        assert_eq!(
            classify("https://example.com/guide.rst", Some("application/pdf")),
            ContentKind::Pdf
        );
        assert_eq!(classify("https://example.com/Guide.PDF?dl=1", None), ContentKind::Pdf);
    }

    #[test]
    fn markdown_by_suffix_or_header() {
        assert_eq!(
            classify("https://raw.example.com/files/index.md", Some("text/plain")),
            ContentKind::Markdown
        );
        assert_eq!(
            classify("https://example.com/readme", Some("text/markdown; charset=utf-8")),
            ContentKind::Markdown
        );
    }

    #[test]
    fn rst_and_default_html() {
        assert_eq!(
            classify("https://raw.example.com/user_guide/10min.rst", Some("text/plain")),
            ContentKind::Rst
        );
        assert_eq!(
            classify("https://docs.example.com/tutorial/", Some("text/html")),
            ContentKind::Html
        );
        assert_eq!(classify("https://docs.example.com/", None), ContentKind::Html);
    }

    #[test]
    fn layout_under_root() {
        let layout = OutputLayout::under(Path::new("out"));
        assert_eq!(layout.metadata_path, Path::new("out").join("metadata.jsonl"));
        assert_eq!(layout.pdf_path("a-b"), Path::new("out").join("pdf").join("a-b.pdf"));
    }
}
