//! Alternate URLs to try when a documentation page cannot be fetched directly.
//!
//! Rules are plain data so they can be listed in a config file and checked
//! without any network access.

use serde::{Deserialize, Serialize};
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FallbackRule {
    /// Same origin, with a leading path prefix swapped for each replacement in turn.
    PathPrefix {
        host: String,
        prefix: String,
        replacements: Vec<String>,
    },
    /// The page's file name with `from_ext` swapped for `to_ext`, placed under `mirror`.
    SourceFile {
        host: String,
        from_ext: String,
        to_ext: String,
        mirror: String,
    },
    /// Segments after `marker`, lowercased with periods as hyphens, under `mirror`,
    /// ending in `index_file`.
    RawMirror {
        host: String,
        marker: String,
        mirror: String,
        index_file: String,
    },
}

impl FallbackRule {
    fn host(&self) -> &str {
        match self {
            FallbackRule::PathPrefix { host, .. }
            | FallbackRule::SourceFile { host, .. }
            | FallbackRule::RawMirror { host, .. } => host,
        }
    }

    fn matches(&self, url: &Url) -> bool {
        let Some(host) = url.host_str() else {
            return false;
        };
        let rule_host = self.host();
        host.eq_ignore_ascii_case(rule_host)
            || host
                .to_ascii_lowercase()
                .ends_with(&format!(".{}", rule_host.to_ascii_lowercase()))
    }

    fn candidates(&self, url: &Url) -> Vec<String> {
        match self {
            FallbackRule::PathPrefix {
                prefix,
                replacements,
                ..
            } => {
                let Some(tail) = url.path().strip_prefix(prefix.as_str()) else {
                    return Vec::new();
                };
                replacements
                    .iter()
                    .map(|replacement| {
                        let mut alt = url.clone();
                        alt.set_path(&format!("{replacement}{tail}"));
                        alt.set_query(None);
                        alt.set_fragment(None);
                        alt.to_string()
                    })
                    .collect()
            }
            FallbackRule::SourceFile {
                from_ext,
                to_ext,
                mirror,
                ..
            } => {
                let file = url.path().trim_end_matches('/').rsplit('/').next();
                match file.and_then(|f| f.strip_suffix(from_ext.as_str())) {
                    Some(stem) if !stem.is_empty() => {
                        vec![format!("{}/{stem}{to_ext}", mirror.trim_end_matches('/'))]
                    }
                    _ => Vec::new(),
                }
            }
            FallbackRule::RawMirror {
                marker,
                mirror,
                index_file,
                ..
            } => {
                let parts: Vec<&str> = url.path().split('/').filter(|p| !p.is_empty()).collect();
                let Some(pos) = parts.iter().position(|p| p == marker) else {
                    return Vec::new();
                };
                let mut path: Vec<String> = parts[pos + 1..]
                    .iter()
                    .map(|p| p.to_lowercase().replace('.', "-"))
                    .collect();
                path.push(index_file.clone());
                vec![format!("{}/{}", mirror.trim_end_matches('/'), path.join("/"))]
            }
        }
    }
}

/// Built-in rules for the documentation sites in the default source list.
pub fn default_rules() -> Vec<FallbackRule> {
    vec![
        FallbackRule::PathPrefix {
            host: "pandas.pydata.org".into(),
            prefix: "/docs/user_guide/".into(),
            replacements: vec![
                "/pandas-docs/version/stable/user_guide/".into(),
                "/pandas-docs/stable/user_guide/".into(),
            ],
        },
        FallbackRule::SourceFile {
            host: "pandas.pydata.org".into(),
            from_ext: ".html".into(),
            to_ext: ".rst".into(),
            mirror: "https://raw.githubusercontent.com/pandas-dev/pandas/main/doc/source/user_guide"
                .into(),
        },
        FallbackRule::RawMirror {
            host: "developer.mozilla.org".into(),
            marker: "docs".into(),
            mirror: "https://raw.githubusercontent.com/mdn/content/main/files".into(),
            index_file: "index.md".into(),
        },
    ]
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackResolver {
    rules: Vec<FallbackRule>,
}

impl FallbackResolver {
    pub fn new(rules: Vec<FallbackRule>) -> Self {
        Self { rules }
    }

    /// Ordered candidates for `url`; the first is always `url` itself.
    pub fn resolve(&self, url: &str) -> Vec<String> {
        let mut candidates = vec![url.to_string()];
        let Ok(parsed) = Url::parse(url) else {
            return candidates;
        };
        for rule in self.rules.iter().filter(|rule| rule.matches(&parsed)) {
            for candidate in rule.candidates(&parsed) {
                if !candidates.contains(&candidate) {
                    candidates.push(candidate);
                }
            }
        }
        candidates
    }
}

impl Default for FallbackResolver {
    fn default() -> Self {
        Self::new(default_rules())
    }
}
