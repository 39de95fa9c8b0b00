use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use corpus_engine::{ContentKind, PipelineEvent, ProgressSink};

/// Prints one line per item as events arrive.
///
/// With PDF rendering on, the line for an HTML page is held back until the
/// renderer reports, so the PDF outcome lands on the same line.
pub struct ConsoleSink {
    render_pdf: bool,
    pending: Mutex<HashMap<String, String>>,
}

impl ConsoleSink {
    pub fn new(render_pdf: bool) -> Self {
        Self {
            render_pdf,
            pending: Mutex::new(HashMap::new()),
        }
    }

    fn hold(&self, url: String, line: String) {
        self.pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(url, line);
    }

    fn release(&self, url: &str, suffix: &str) {
        let line = self
            .pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(url);
        if let Some(line) = line {
            println!("{line}{suffix}");
        }
    }
}

impl ProgressSink for ConsoleSink {
    fn emit(&self, event: PipelineEvent) {
        match event {
            PipelineEvent::FallbackUsed { url, served_from } => {
                println!("Fallback ✓  {url}  →  {served_from}");
            }
            PipelineEvent::Saved {
                url,
                kind,
                path,
                companion,
            } => {
                let line = saved_line(&url, kind, &path, companion.is_some());
                if self.render_pdf && kind == ContentKind::Html {
                    self.hold(url, line);
                } else {
                    println!("{line}");
                }
            }
            PipelineEvent::PdfRendered { url, .. } => self.release(&url, "  +  pdf"),
            PipelineEvent::PdfSkipped { url, reason } => {
                self.release(&url, &format!("  (pdf skipped: {reason})"));
            }
            PipelineEvent::Failed { url, error } => eprintln!("{}", failure_line(&url, &error)),
            PipelineEvent::Skipped { url } => eprintln!("SKIP  ·  {url}"),
        }
    }
}

fn saved_line(url: &str, kind: ContentKind, path: &Path, with_markdown: bool) -> String {
    let label = match kind {
        ContentKind::Pdf => "PDF ",
        ContentKind::Markdown => "MD ",
        ContentKind::Rst => "RST ",
        ContentKind::Html => "HTML",
    };
    let mut line = format!("{label} ✓  {url}  →  {}", path.display());
    if with_markdown {
        line.push_str("  +  md");
    }
    line
}

fn failure_line(url: &str, error: &str) -> String {
    format!("ERR  ×  {url}  →  {error}")
}
