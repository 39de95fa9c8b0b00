use corpus_engine::{derive_base_name, sha256_hex, title_from_base_name, MAX_BASE_NAME_LEN};
use pretty_assertions::assert_eq;

#[test]
fn host_and_last_segment_form_the_name() {
    assert_eq!(
        derive_base_name("https://docs.python.org/3/tutorial/datastructures.html"),
        "docs-python-org-datastructures-html"
    );
    assert_eq!(
        derive_base_name("https://docs.docker.com/reference/dockerfile/"),
        "docs-docker-com-dockerfile"
    );
}

#[test]
fn leading_www_is_dropped() {
    assert_eq!(
        derive_base_name("https://www.typescriptlang.org/docs/handbook/2/generics.html"),
        "typescriptlang-org-generics-html"
    );
}

#[test]
fn root_path_uses_index_segment() {
    assert_eq!(derive_base_name("https://git-scm.com/"), "git-scm-com-index");
    assert_eq!(derive_base_name("https://git-scm.com"), "git-scm-com-index");
}

#[test]
fn name_is_deterministic_and_safe() {
    let urls = [
        "https://developer.mozilla.org/en-US/docs/Web/JavaScript/Reference/Global_Objects/Promise",
        "https://pandas.pydata.org/docs/user_guide/10min.html",
        "https://example.com/Ünïcödé/Päge?q=1#frag",
        "not a url at all",
        "",
    ];
    for url in urls {
        let first = derive_base_name(url);
        assert_eq!(first, derive_base_name(url));
        assert!(!first.is_empty());
        assert!(first.len() <= MAX_BASE_NAME_LEN);
        assert!(first
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'));
        assert!(!first.starts_with('-') && !first.ends_with('-'));
    }
}

#[test]
fn long_segments_are_truncated() {
    let url = format!("https://example.com/{}", "segment".repeat(40));
    let name = derive_base_name(&url);
    assert_eq!(name.len(), MAX_BASE_NAME_LEN);
    assert!(name.starts_with("example-com-segment"));
}

#[test]
fn title_replaces_hyphens() {
    assert_eq!(
        title_from_base_name("nodejs-org-fs-html"),
        "nodejs org fs html"
    );
}

#[test]
fn digest_is_hex_sha256() {
    let digest = sha256_hex(b"abc");
    assert_eq!(
        digest,
        "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
    );
}
