//! HTML to readable Markdown-like text with a tiered fallback chain.
//!
//! 1. isolate the main content and run the Markdown converter over it
//! 2. walk the isolated fragment and emit headings, paragraphs, list items
//! 3. clean the whole page of scripts and styles, convert or flatten it
//!
//! Every tier swallows its own failures; the caller only ever sees text,
//! possibly empty.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use engine_logging::{engine_debug, engine_trace};
use scraper::{Html, Selector};

use crate::convert::{Converter, Html2MdConverter};
use crate::decode::decode_text;
use crate::extract::{collapse_whitespace, ContentIsolator, DensityIsolator};

const FRAGMENT_BLOCKS: &str = "h1, h2, h3, h4, h5, h6, p, li";
const PAGE_BLOCKS: &str = "h1, h2, h3, p, li";
const SCRIPT_TAGS: &str = "script, style, noscript";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Converted,
    Structural,
    FullPage,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadableText {
    pub text: String,
    /// Tier that produced `text`; `None` when every tier came up empty.
    pub tier: Option<Tier>,
}

#[derive(Clone)]
pub struct ReadableTextExtractor {
    isolator: Arc<dyn ContentIsolator>,
    converter: Option<Arc<dyn Converter>>,
}

impl Default for ReadableTextExtractor {
    fn default() -> Self {
        Self::new(Arc::new(DensityIsolator::default()), Some(Arc::new(Html2MdConverter)))
    }
}

impl ReadableTextExtractor {
    pub fn new(isolator: Arc<dyn ContentIsolator>, converter: Option<Arc<dyn Converter>>) -> Self {
        Self {
            isolator,
            converter,
        }
    }

    /// Extractor with no Markdown converter: tier 2 and the flattening half of tier 3 only.
    pub fn structural_only() -> Self {
        Self::new(Arc::new(DensityIsolator::default()), None)
    }

    pub fn to_readable_text(&self, html_bytes: &[u8], encoding_hint: Option<&str>) -> String {
        self.extract(html_bytes, encoding_hint).text
    }

    pub fn extract(&self, html_bytes: &[u8], encoding_hint: Option<&str>) -> ReadableText {
        let html = decode_text(html_bytes, encoding_hint).text;

        match guarded(|| self.isolator.isolate(&html)).flatten() {
            Some(fragment) => {
                if let Some(text) = self.convert(&fragment) {
                    return found(text, Tier::Converted);
                }
                engine_trace!("converter produced nothing, walking isolated fragment");
                if let Some(text) = guarded(|| structural_text(&fragment, FRAGMENT_BLOCKS, false))
                    .filter(|t| !t.is_empty())
                {
                    return found(text, Tier::Structural);
                }
            }
            None => engine_debug!("no main content isolated, using full page"),
        }

        match guarded(|| self.full_page(&html)).filter(|t| !t.is_empty()) {
            Some(text) => found(text, Tier::FullPage),
            None => ReadableText {
                text: String::new(),
                tier: None,
            },
        }
    }

    fn convert(&self, html: &str) -> Option<String> {
        let converter = self.converter.as_ref()?;
        guarded(|| converter.to_markdown(html).trim().to_string()).filter(|t| !t.is_empty())
    }

    fn full_page(&self, html: &str) -> String {
        let cleaned = strip_scripts(html);
        if let Some(text) = self.convert(&cleaned) {
            return text;
        }
        structural_text(&cleaned, PAGE_BLOCKS, true)
    }
}

fn found(text: String, tier: Tier) -> ReadableText {
    ReadableText {
        text,
        tier: Some(tier),
    }
}

/// Runs one extraction step, turning a panic inside a parser or converter into `None`.
fn guarded<T>(step: impl FnOnce() -> T) -> Option<T> {
    panic::catch_unwind(AssertUnwindSafe(step)).ok()
}

/// `#`-prefixed headings and flattened paragraph/list text, blank-line separated.
fn structural_text(html: &str, blocks: &str, whole_document: bool) -> String {
    let doc = if whole_document {
        Html::parse_document(html)
    } else {
        Html::parse_fragment(html)
    };
    let Ok(selector) = Selector::parse(blocks) else {
        return String::new();
    };

    let mut lines = Vec::new();
    for el in doc.select(&selector) {
        let text = collapse_whitespace(&el.text().collect::<Vec<_>>().join(" "));
        if text.is_empty() {
            continue;
        }
        let name = el.value().name();
        match heading_level(name) {
            Some(level) => lines.push(format!("{} {text}", "#".repeat(level))),
            None => lines.push(text),
        }
    }
    lines.join("\n\n").trim().to_string()
}

fn heading_level(name: &str) -> Option<usize> {
    let level = name.strip_prefix('h')?.parse::<usize>().ok()?;
    (1..=6).contains(&level).then_some(level)
}

/// Full document HTML with script, style and noscript elements removed.
fn strip_scripts(html: &str) -> String {
    let mut doc = Html::parse_document(html);
    if let Ok(selector) = Selector::parse(SCRIPT_TAGS) {
        let ids: Vec<_> = doc.select(&selector).map(|el| el.id()).collect();
        for id in ids {
            if let Some(mut node) = doc.tree.get_mut(id) {
                node.detach();
            }
        }
    }
    doc.root_element().html()
}
