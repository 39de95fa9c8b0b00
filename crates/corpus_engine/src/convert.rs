pub trait Converter: Send + Sync {
    fn to_markdown(&self, html: &str) -> String;
}

/// `html2md` with setext headings rewritten to ATX (`#`, `##`).
#[derive(Debug, Default, Clone, Copy)]
pub struct Html2MdConverter;

impl Converter for Html2MdConverter {
    fn to_markdown(&self, html: &str) -> String {
        atx_headings(&html2md::parse_html(html))
    }
}

/// Rewrite `Title\n=====` and `Title\n-----` heading pairs as `# Title` / `## Title`.
pub fn atx_headings(markdown: &str) -> String {
    let lines: Vec<&str> = markdown.lines().collect();
    let mut out = Vec::with_capacity(lines.len());
    let mut i = 0;
    while i < lines.len() {
        let line = lines[i];
        if let Some(next) = lines.get(i + 1) {
            if let Some(level) = setext_level(line, next) {
                out.push(format!("{} {}", "#".repeat(level), line.trim()));
                i += 2;
                continue;
            }
        }
        out.push(line.to_string());
        i += 1;
    }
    out.join("\n")
}

fn setext_level(text: &str, underline: &str) -> Option<usize> {
    let text = text.trim();
    let underline = underline.trim();
    if text.is_empty() || text.starts_with('#') || underline.is_empty() {
        return None;
    }
    if underline.chars().all(|c| c == '=') {
        return Some(1);
    }
    if underline.len() >= 2 && underline.chars().all(|c| c == '-') {
        return Some(2);
    }
    None
}
