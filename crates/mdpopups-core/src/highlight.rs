use html_escape::encode_text;

use crate::error::HighlightError;

pub const BLOCK_CLASS: &str = "highlight";
pub const INLINE_CLASS: &str = "inline-highlight";

/// Turns source code into colorized markup.
///
/// The result must not contain raw newlines: block output separates lines
/// with `<br>` and keeps indentation with `&nbsp;`.
pub trait Highlighter {
    fn highlight(
        &self,
        src: &str,
        language: Option<&str>,
        inline: bool,
    ) -> Result<String, HighlightError>;
}

pub fn wrap_block(css_class: &str, inner: &str) -> String {
    format!("<div class=\"{}\"><pre>{}</pre></div>", css_class, inner)
}

pub fn wrap_inline(css_class: &str, inner: &str) -> String {
    format!("<code class=\"{}\">{}</code>", css_class, inner)
}

/// Escaped, unhighlighted code in the same shape highlighters produce.
pub fn plain_code(src: &str, inline: bool) -> String {
    let escaped = encode_text(src.trim_end_matches('\n'));
    if inline {
        escaped.into_owned()
    } else {
        preserve_whitespace(&escaped.replace('\n', "<br>"))
    }
}

/// Replaces spaces and tabs outside of tags with `&nbsp;`.
pub fn preserve_whitespace(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut in_tag = false;
    for ch in html.chars() {
        match ch {
            '<' => {
                in_tag = true;
                out.push(ch);
            }
            '>' => {
                in_tag = false;
                out.push(ch);
            }
            ' ' if !in_tag => out.push_str("&nbsp;"),
            '\t' if !in_tag => out.push_str("&nbsp;&nbsp;&nbsp;&nbsp;"),
            _ => out.push(ch),
        }
    }
    out
}
