//! Page metadata extraction from HTML sources.

use std::sync::LazyLock;

use regex::Regex;

use crate::PageSource;

static TITLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<title[^>]*>(.*?)</title\s*>").unwrap());

static META_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?is)<meta\b[^>]*>").unwrap());

static ATTR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)\b(name|content)\s*=\s*(?:"([^"]*)"|'([^']*)')"#).unwrap()
});

static BODY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<body[^>]*>(.*?)(?:</body\s*>|\z)").unwrap());

static SCRIPT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<script[^>]*>.*?</script\s*>").unwrap());

static STYLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<style[^>]*>.*?</style\s*>").unwrap());

static COMMENT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").unwrap());

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").unwrap());

/// Extract title, keywords and plain-text body from an HTML document.
///
/// Documents without a `<body>` element are treated as a bare fragment.
#[must_use]
pub fn extract_page_source(html: &str) -> PageSource {
    let title = TITLE_RE
        .captures(html)
        .map(|caps| collapse_whitespace(&decode_entities(&caps[1])))
        .filter(|title| !title.is_empty());

    let keywords = META_RE
        .find_iter(html)
        .find_map(|tag| keywords_content(tag.as_str()));

    let body = BODY_RE
        .captures(html)
        .and_then(|caps| caps.get(1))
        .map_or(html, |m| m.as_str());

    PageSource {
        title,
        keywords,
        body_text: strip_tags(body),
    }
}

/// `content` attribute of a `<meta name="keywords">` tag.
fn keywords_content(tag: &str) -> Option<String> {
    let mut is_keywords = false;
    let mut content = None;
    for caps in ATTR_RE.captures_iter(tag) {
        let value = caps.get(2).or_else(|| caps.get(3)).map_or("", |m| m.as_str());
        if caps[1].eq_ignore_ascii_case("name") {
            is_keywords = value.trim().eq_ignore_ascii_case("keywords");
        } else {
            content = Some(decode_entities(value));
        }
    }
    if is_keywords { content } else { None }
}

/// Remove scripts, styles, comments and tags, then collapse whitespace.
fn strip_tags(html: &str) -> String {
    let text = SCRIPT_RE.replace_all(html, " ");
    let text = STYLE_RE.replace_all(&text, " ");
    let text = COMMENT_RE.replace_all(&text, " ");
    let text = TAG_RE.replace_all(&text, " ");
    collapse_whitespace(&decode_entities(&text))
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_owned();
    }
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
