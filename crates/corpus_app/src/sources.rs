//! Source list: the built-in documentation set or user supplied URLs.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use corpus_engine::SourceItem;

pub const DEFAULT_URLS: &[&str] = &[
    // Python
    "https://docs.python.org/3/tutorial/datastructures.html",
    "https://docs.python.org/3/howto/logging.html",
    "https://docs.python.org/3/howto/argparse.html",
    "https://peps.python.org/pep-0008/",
    "https://docs.python.org/3/reference/datamodel.html",
    // pandas / NumPy
    "https://pandas.pydata.org/docs/user_guide/10min.html",
    "https://pandas.pydata.org/docs/user_guide/merging.html",
    "https://pandas.pydata.org/docs/user_guide/groupby.html",
    "https://numpy.org/doc/stable/user/absolute_beginners.html",
    "https://numpy.org/doc/stable/user/basics.indexing.html",
    // Web
    "https://developer.mozilla.org/en-US/docs/Web/JavaScript/Reference/Global_Objects/Promise",
    "https://developer.mozilla.org/en-US/docs/Web/API/Fetch_API",
    "https://developer.mozilla.org/en-US/docs/Web/JavaScript/Reference/Global_Objects/Array/map",
    "https://developer.mozilla.org/en-US/docs/Web/JavaScript/Reference/Global_Objects/Map",
    "https://www.typescriptlang.org/docs/handbook/2/generics.html",
    "https://nodejs.org/api/fs.html",
    // Tooling
    "https://docs.docker.com/reference/dockerfile/",
    "https://kubernetes.io/docs/concepts/workloads/controllers/deployment/",
    "https://docs.github.com/actions/reference/workflow-syntax-for-github-actions",
    "https://git-scm.com/book/en/v2",
];

/// URLs given on the command line win over `urls_file`; with neither, the built-in list.
pub fn load_sources(urls: &[String], urls_file: Option<&Path>) -> Result<Vec<SourceItem>> {
    if !urls.is_empty() {
        return Ok(urls.iter().map(|u| SourceItem::new(u.trim())).collect());
    }
    if let Some(path) = urls_file {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read url list {}", path.display()))?;
        let items = parse_url_list(&text);
        if items.is_empty() {
            bail!("url list {} contains no urls", path.display());
        }
        return Ok(items);
    }
    Ok(DEFAULT_URLS.iter().copied().map(SourceItem::from).collect())
}

/// One URL per line; blank lines and `#` comments are ignored.
fn parse_url_list(text: &str) -> Vec<SourceItem> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(SourceItem::from)
        .collect()
}
