use once_cell::sync::Lazy;
use regex::Regex;

static COMMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)/\*.*?\*/").expect("comment pattern is valid"));

/// Strips comments and blank lines and trims every remaining line.
pub fn clean_css(css: &str) -> String {
    let stripped = COMMENT.replace_all(css, "");
    let mut out = String::with_capacity(stripped.len());
    for line in stripped.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        out.push_str(line);
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::clean_css;

    #[test]
    fn removes_comments_and_blank_lines() {
        let css = "/* header\n comment */\nhtml {\n    color: red; /* inline */\n}\n\n\n";
        assert_eq!(clean_css(css), "html {\ncolor: red;\n}\n");
    }

    #[test]
    fn template_tags_survive() {
        let css = "{% if var.is_popup %}\n  html { margin: 0; }\n{% endif %}";
        assert_eq!(
            clean_css(css),
            "{% if var.is_popup %}\nhtml { margin: 0; }\n{% endif %}\n"
        );
    }
}
