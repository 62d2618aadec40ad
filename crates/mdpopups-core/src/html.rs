use crate::sanitize::remove_entities;

/// Document shown when rendering fails outright.
pub const FALLBACK_HTML: &str = "<style>html {background-color: #333; color: red}</style>\
<div><p>¯\\_(ツ)_/¯</p></div>";

/// Wraps a stylesheet and an HTML body into one popup/phantom document.
pub fn assemble(style: &str, body: &str) -> String {
    let body = remove_entities(body);
    let mut out = String::with_capacity(style.len() + body.len() + 15);
    out.push_str("<style>");
    out.push_str(style);
    out.push_str("</style>");
    out.push_str(&body);
    out
}
