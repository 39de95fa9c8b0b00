use std::sync::Arc;

use corpus_engine::{
    decode_text, extract_title, ContentIsolator, Converter, DensityIsolator, Html2MdConverter,
    ReadableTextExtractor, Tier,
};
use pretty_assertions::assert_eq;

/// Finds no main content, forcing the full-page tier.
struct NoContent;

impl ContentIsolator for NoContent {
    fn isolate(&self, _html: &str) -> Option<String> {
        None
    }
}

/// Fails the way a parser bug would.
struct Exploding;

impl ContentIsolator for Exploding {
    fn isolate(&self, _html: &str) -> Option<String> {
        panic!("isolator bug")
    }
}

const SCRIPTED_PAGE: &[u8] = b"<html><head><title>T</title><script>trackVisitor()</script>\
<style>.hidden{display:none}</style></head><body>\
<noscript>Please enable JavaScript</noscript>\
<h1>Top</h1><h2>Sub</h2><h3>Small</h3><p>Paragraph text.</p><ul><li>List item</li></ul>\
<script>moreTracking()</script></body></html>";

fn assert_clean_full_page(text: &str) {
    for kept in ["Top", "Sub", "Small", "Paragraph text.", "List item"] {
        assert!(text.contains(kept), "missing {kept:?} in {text:?}");
    }
    for dropped in ["trackVisitor", "moreTracking", "display:none", "enable JavaScript"] {
        assert!(!text.contains(dropped), "kept {dropped:?} in {text:?}");
    }
}

fn non_empty_lines(text: &str) -> Vec<&str> {
    text.lines().map(str::trim).filter(|l| !l.is_empty()).collect()
}

#[test]
fn heading_and_paragraph_become_markdown_lines() {
    let text = ReadableTextExtractor::default()
        .to_readable_text(b"<h1>title</h1><p>body text</p>", None);
    assert_eq!(non_empty_lines(&text), vec!["# title", "body text"]);
}

#[test]
fn empty_and_script_only_pages_give_empty_text() {
    let extractor = ReadableTextExtractor::default();
    for html in ["", "<html><body></body></html>", "<script>track()</script>"] {
        let result = extractor.extract(html.as_bytes(), None);
        assert_eq!(result.text, "", "input: {html:?}");
        assert_eq!(result.tier, None);
    }
}

#[test]
fn malformed_markup_does_not_fail() {
    let extractor = ReadableTextExtractor::default();
    let text = extractor.to_readable_text(b"<div><p>unclosed <b>bold<li>item</div></span>", None);
    assert!(text.contains("unclosed"));
    assert!(text.contains("item"));
}

#[test]
fn navigation_and_footer_are_dropped() {
    let html = br#"<html><head><title>Guide</title></head><body>
        <nav><a href="/">Home</a> <a href="/about">About</a></nav>
        <main>
          <h1>Installing</h1>
          <p>Download the archive and unpack it into a directory of your choice.</p>
        </main>
        <footer>Copyright notice</footer>
    </body></html>"#;

    let result = ReadableTextExtractor::default().extract(html, None);
    assert_eq!(result.tier, Some(Tier::Converted));
    assert!(result.text.contains("# Installing"));
    assert!(result.text.contains("Download the archive"));
    assert!(!result.text.contains("Home"));
    assert!(!result.text.contains("Copyright"));
}

#[test]
fn density_isolation_skips_sidebar() {
    let html = r#"<html><body>
        <div class="sphinxsidebar"><p>Table of contents</p></div>
        <div class="document">
          <div class="body">
            <h1>Data structures</h1>
            <p>This chapter describes some things you have learned about already in more detail,
               and adds some new things as well.</p>
            <p>The list data type has some more methods.</p>
          </div>
        </div>
    </body></html>"#;

    let fragment = DensityIsolator::default().isolate(html).expect("main content");
    assert!(fragment.contains("Data structures"));
    assert!(!fragment.contains("Table of contents"));
}

#[test]
fn structural_tier_without_converter() {
    let html = b"<html><body><div><h2>Install</h2><p>Run   it.</p><ul><li>fast</li></ul></div></body></html>";
    let result = ReadableTextExtractor::structural_only().extract(html, None);
    assert_eq!(result.tier, Some(Tier::Structural));
    assert_eq!(result.text, "## Install\n\nRun it.\n\nfast");
}

#[test]
fn converter_emits_atx_headings() {
    let md = Html2MdConverter.to_markdown("<h1>Hello</h1><h2>Sub</h2><p>world</p>");
    let lines = non_empty_lines(&md);
    assert_eq!(lines, vec!["# Hello", "## Sub", "world"]);
}

#[test]
fn title_is_trimmed_and_collapsed() {
    assert_eq!(
        extract_title("<html><head><title>  My \n  Page </title></head></html>").as_deref(),
        Some("My Page")
    );
    assert_eq!(extract_title("<html><head><title> </title></head></html>"), None);
    assert_eq!(extract_title("<p>no title</p>"), None);
}

#[test]
fn decode_respects_charset_hint() {
    let decoded = decode_text(b"caf\xe9", Some("ISO-8859-1"));
    assert_eq!(decoded.text, "café");
    assert_eq!(decoded.encoding_label, "windows-1252");
}

#[test]
fn decode_strips_utf8_bom() {
    let decoded = decode_text(b"\xEF\xBB\xBFhello", Some("text/html"));
    assert_eq!(decoded.text, "hello");
    assert_eq!(decoded.encoding_label, "UTF-8");
}

#[test]
fn latin1_page_reads_through_extractor() {
    let text = ReadableTextExtractor::default()
        .to_readable_text(b"<html><body><p>Cr\xe8me br\xfbl\xe9e</p></body></html>", Some("iso-8859-1"));
    assert_eq!(text, "Crème brûlée");
}

#[test]
fn full_page_tier_converts_when_nothing_is_isolated() {
    let extractor = ReadableTextExtractor::new(Arc::new(NoContent), Some(Arc::new(Html2MdConverter)));
    let result = extractor.extract(SCRIPTED_PAGE, None);
    assert_eq!(result.tier, Some(Tier::FullPage));
    assert_clean_full_page(&result.text);
}

#[test]
fn full_page_tier_flattens_without_converter() {
    let extractor = ReadableTextExtractor::new(Arc::new(NoContent), None);
    let result = extractor.extract(SCRIPTED_PAGE, None);
    assert_eq!(result.tier, Some(Tier::FullPage));
    assert_eq!(
        result.text,
        "# Top\n\n## Sub\n\n### Small\n\nParagraph text.\n\nList item"
    );
}

#[test]
fn panicking_isolator_falls_back_to_full_page() {
    let extractor = ReadableTextExtractor::new(Arc::new(Exploding), Some(Arc::new(Html2MdConverter)));
    let result = extractor.extract(SCRIPTED_PAGE, None);
    assert_eq!(result.tier, Some(Tier::FullPage));
    assert_clean_full_page(&result.text);
}
