use std::borrow::Cow;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static ENTITY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"&(#\d+|\w+);").expect("entity pattern is valid"));

/// Entities the popup HTML subset understands and that must stay escaped.
const KEPT: [&str; 4] = ["amp", "lt", "gt", "nbsp"];

/// Decodes every character entity except `&amp;`, `&lt;`, `&gt;` and `&nbsp;`.
pub fn remove_entities(html: &str) -> Cow<'_, str> {
    ENTITY.replace_all(html, |caps: &Captures<'_>| {
        let whole = &caps[0];
        if KEPT.contains(&&caps[1]) {
            whole.to_string()
        } else {
            html_escape::decode_html_entities(whole).into_owned()
        }
    })
}
