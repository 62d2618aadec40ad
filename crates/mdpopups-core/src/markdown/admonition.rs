use std::borrow::Cow;

use html_escape::encode_text;
use once_cell::sync::Lazy;
use pulldown_cmark::BlockQuoteKind;
use regex::Regex;

static OPENER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^!!!\s+([\w-]+)(?:\s+"(.*)")?\s*$"#).expect("admonition pattern is valid")
});

/// Rewrites `!!! type "Title"` blocks into raw HTML wrappers around their
/// dedented body so the body is still parsed as Markdown.
pub fn expand_admonitions(markup: &str) -> Cow<'_, str> {
    if !markup.contains("!!!") {
        return Cow::Borrowed(markup);
    }

    let lines: Vec<&str> = markup.lines().collect();
    let mut out = String::with_capacity(markup.len() + 64);
    let mut index = 0;
    while index < lines.len() {
        let Some(caps) = OPENER.captures(lines[index]) else {
            out.push_str(lines[index]);
            out.push('\n');
            index += 1;
            continue;
        };
        let kind = caps[1].to_ascii_lowercase();
        let title = match caps.get(2) {
            Some(explicit) => explicit.as_str().to_string(),
            None => capitalize(&kind),
        };
        index += 1;

        let mut body = Vec::new();
        while index < lines.len() {
            let line = lines[index];
            if let Some(rest) = dedent(line) {
                body.push(rest);
                index += 1;
            } else if line.trim().is_empty() && continues_body(&lines[index + 1..]) {
                body.push("");
                index += 1;
            } else {
                break;
            }
        }

        out.push_str(&open_tag(&kind, &title));
        out.push_str("\n\n");
        for line in body {
            out.push_str(line);
            out.push('\n');
        }
        out.push_str("\n</div>\n\n");
    }
    Cow::Owned(out)
}

/// Opening markup shared by `!!!` blocks and GFM alerts.
pub fn open_tag(kind: &str, title: &str) -> String {
    let mut out = format!("<div class=\"admonition {}\">", encode_text(kind));
    if !title.is_empty() {
        out.push_str("<p class=\"admonition-title\">");
        out.push_str(&encode_text(title));
        out.push_str("</p>");
    }
    out
}

pub fn alert_kind(kind: BlockQuoteKind) -> &'static str {
    match kind {
        BlockQuoteKind::Note => "note",
        BlockQuoteKind::Tip => "tip",
        BlockQuoteKind::Important => "important",
        BlockQuoteKind::Warning => "warning",
        BlockQuoteKind::Caution => "caution",
    }
}

pub fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn dedent(line: &str) -> Option<&str> {
    line.strip_prefix("    ").or_else(|| line.strip_prefix('\t'))
}

fn continues_body(rest: &[&str]) -> bool {
    rest.iter()
        .find(|line| !line.trim().is_empty())
        .is_some_and(|line| dedent(line).is_some())
}
