use std::collections::{HashMap, HashSet};

use ego_tree::{NodeId, NodeRef};
use scraper::node::Node;
use scraper::{ElementRef, Html, Selector};

/// Tags that never carry article content.
const STRIP_TAGS: &[&str] = &[
    "script", "style", "noscript", "template", "iframe", "nav", "header", "footer", "aside",
    "form", "button", "svg",
];

/// Class/id words marking navigation and page chrome.
const BOILERPLATE_WORDS: &[&str] = &[
    "nav",
    "navbar",
    "navigation",
    "sidebar",
    "sphinxsidebar",
    "footer",
    "menu",
    "breadcrumb",
    "breadcrumbs",
    "cookie",
    "banner",
    "advert",
    "social",
    "share",
    "toc",
];

/// Containers kept even when their class names look like chrome.
const PROTECTED_TAGS: &[&str] = &["html", "body", "main", "article"];

/// Share of the page text above which a chrome-looking wrapper is kept.
const WRAPPER_SHARE: f64 = 0.5;

/// Text inside links counts for this fraction of its length.
const LINK_TEXT_WEIGHT: f64 = 0.5;

/// `<title>` text, trimmed, if present and non-empty.
pub fn extract_title(html: &str) -> Option<String> {
    let doc = Html::parse_document(html);
    let title_sel = Selector::parse("title").ok()?;
    doc.select(&title_sel)
        .next()
        .map(|t| collapse_whitespace(&t.text().collect::<String>()))
        .filter(|t| !t.is_empty())
}

/// Isolates the main article HTML of a page.
pub trait ContentIsolator: Send + Sync {
    /// The main content fragment, or `None` when the page has no readable text.
    fn isolate(&self, html: &str) -> Option<String>;
}

/// Readability-style isolation by text density.
///
/// Page chrome (navigation, sidebars, footers, scripts) is removed first. The
/// walk then starts at `<body>` and descends into the child holding at least
/// `dominance` of the remaining text, stopping before it would leave a
/// top-level heading behind in a sibling.
#[derive(Debug, Clone, Copy)]
pub struct DensityIsolator {
    pub dominance: f64,
}

impl Default for DensityIsolator {
    fn default() -> Self {
        Self { dominance: 0.8 }
    }
}

impl ContentIsolator for DensityIsolator {
    fn isolate(&self, html: &str) -> Option<String> {
        let mut doc = Html::parse_document(html);
        let body_sel = Selector::parse("body").ok()?;
        let body_id = doc.select(&body_sel).next()?.id();

        strip_chrome(&mut doc, body_id);

        let body = doc.tree.get(body_id)?;
        let (scores, with_h1) = score_subtree(body);
        let total = scores.get(&body_id).copied().unwrap_or(0.0);
        if total <= 0.0 {
            return None;
        }

        let mut current = body;
        loop {
            let best = current
                .children()
                .filter(|child| child.value().is_element())
                .max_by(|a, b| {
                    let sa = scores.get(&a.id()).copied().unwrap_or(0.0);
                    let sb = scores.get(&b.id()).copied().unwrap_or(0.0);
                    sa.total_cmp(&sb)
                });
            let Some(best) = best else { break };
            let best_score = scores.get(&best.id()).copied().unwrap_or(0.0);
            let heading_left_behind = current
                .children()
                .any(|sibling| sibling.id() != best.id() && with_h1.contains(&sibling.id()));
            if best_score < self.dominance * total || heading_left_behind {
                break;
            }
            current = best;
        }

        ElementRef::wrap(current).map(|el| el.html())
    }
}

fn strip_chrome(doc: &mut Html, body_id: NodeId) {
    let Some(body) = doc.tree.get(body_id) else {
        return;
    };
    let page_text = text_len(body) as f64;

    let doomed: Vec<NodeId> = body
        .descendants()
        .filter(|node| {
            let Node::Element(el) = node.value() else {
                return false;
            };
            let name = el.name();
            if STRIP_TAGS.contains(&name) {
                return true;
            }
            if PROTECTED_TAGS.contains(&name) || !looks_like_chrome(el) {
                return false;
            }
            (text_len(*node) as f64) < page_text * WRAPPER_SHARE
        })
        .map(|node| node.id())
        .collect();

    for id in doomed {
        if let Some(mut node) = doc.tree.get_mut(id) {
            node.detach();
        }
    }
}

fn looks_like_chrome(el: &scraper::node::Element) -> bool {
    let role = el.attr("role").unwrap_or_default();
    if matches!(role, "navigation" | "banner" | "contentinfo" | "complementary") {
        return true;
    }
    el.classes()
        .chain(el.id())
        .flat_map(|token| token.split(['-', '_']))
        .any(|word| {
            let word = word.to_ascii_lowercase();
            BOILERPLATE_WORDS.contains(&word.as_str())
        })
}

/// Weighted text length per element, plus the set of elements containing an `<h1>`.
fn score_subtree(root: NodeRef<'_, Node>) -> (HashMap<NodeId, f64>, HashSet<NodeId>) {
    let mut scores: HashMap<NodeId, f64> = HashMap::new();
    let mut with_h1: HashSet<NodeId> = HashSet::new();

    for node in root.descendants() {
        match node.value() {
            Node::Text(text) => {
                let len = text.trim().chars().count() as f64;
                if len == 0.0 {
                    continue;
                }
                let in_link = node
                    .ancestors()
                    .take_while(|a| a.id() != root.id())
                    .any(|a| matches!(a.value(), Node::Element(el) if el.name() == "a"));
                let weight = if in_link { len * LINK_TEXT_WEIGHT } else { len };
                for ancestor in node.ancestors() {
                    *scores.entry(ancestor.id()).or_insert(0.0) += weight;
                    if ancestor.id() == root.id() {
                        break;
                    }
                }
            }
            Node::Element(el) if el.name() == "h1" => {
                with_h1.insert(node.id());
                for ancestor in node.ancestors() {
                    with_h1.insert(ancestor.id());
                    if ancestor.id() == root.id() {
                        break;
                    }
                }
            }
            _ => {}
        }
    }
    (scores, with_h1)
}

fn text_len(node: NodeRef<'_, Node>) -> usize {
    node.descendants()
        .filter_map(|n| match n.value() {
            Node::Text(text) => Some(text.trim().chars().count()),
            _ => None,
        })
        .sum()
}

pub(crate) fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
