use mdpopups_core::{HighlightError, Highlighter, preserve_whitespace};
use once_cell::sync::Lazy;
use syntect::easy::HighlightLines;
use syntect::highlighting::Theme;
use syntect::html::{
    ClassStyle, ClassedHTMLGenerator, IncludeBackground, styled_line_to_highlighted_html,
};
use syntect::parsing::{SyntaxReference, SyntaxSet};
use syntect::util::LinesWithEndings;

pub(crate) static SYNTAX_SET: Lazy<SyntaxSet> = Lazy::new(SyntaxSet::load_defaults_newlines);

/// Class prefix shared by the classed highlighter and the scheme CSS.
pub const CLASS_PREFIX: &str = "syntax-";

pub(crate) fn class_style() -> ClassStyle {
    ClassStyle::SpacedPrefixed {
        prefix: CLASS_PREFIX,
    }
}

fn find_syntax(language: Option<&str>) -> &'static SyntaxReference {
    language
        .and_then(|token| SYNTAX_SET.find_syntax_by_token(token))
        .unwrap_or_else(|| SYNTAX_SET.find_syntax_plain_text())
}

/// Highlighter that emits `syntax-*` classes; colors come from the scheme CSS.
#[derive(Clone, Copy, Debug, Default)]
pub struct ClassedHighlighter;

impl Highlighter for ClassedHighlighter {
    fn highlight(
        &self,
        src: &str,
        language: Option<&str>,
        inline: bool,
    ) -> Result<String, HighlightError> {
        let syntax = find_syntax(language);
        let mut generator =
            ClassedHTMLGenerator::new_with_class_style(syntax, &SYNTAX_SET, class_style());
        let source = with_trailing_newline(src);
        for line in LinesWithEndings::from(&source) {
            generator
                .parse_html_for_line_which_includes_newline(line)
                .map_err(|err| HighlightError::Backend(err.to_string()))?;
        }
        Ok(finish(generator.finalize(), inline))
    }
}

/// Highlighter that inlines colors from one syntect theme.
#[derive(Clone, Debug)]
pub struct ThemedHighlighter {
    theme: Theme,
}

impl ThemedHighlighter {
    pub fn new(theme: Theme) -> Self {
        Self { theme }
    }
}

impl Highlighter for ThemedHighlighter {
    fn highlight(
        &self,
        src: &str,
        language: Option<&str>,
        inline: bool,
    ) -> Result<String, HighlightError> {
        let syntax = find_syntax(language);
        let mut lines = HighlightLines::new(syntax, &self.theme);
        let source = with_trailing_newline(src);
        let mut html = String::with_capacity(source.len() * 4);
        for line in LinesWithEndings::from(&source) {
            let ranges = lines
                .highlight_line(line, &SYNTAX_SET)
                .map_err(|err| HighlightError::Backend(err.to_string()))?;
            let styled = styled_line_to_highlighted_html(&ranges, IncludeBackground::No)
                .map_err(|err| HighlightError::Backend(err.to_string()))?;
            html.push_str(&styled);
        }
        Ok(finish(html, inline))
    }
}

fn with_trailing_newline(src: &str) -> String {
    let mut source = src.trim_end_matches('\n').to_string();
    source.push('\n');
    source
}

/// Drops the final newline, then turns the rest into `<br>` (blocks) or
/// spaces (inline). Block whitespace becomes `&nbsp;`.
fn finish(mut html: String, inline: bool) -> String {
    if let Some(last) = html.rfind('\n') {
        html.remove(last);
    }
    if inline {
        html.replace('\n', " ")
    } else {
        preserve_whitespace(&html.replace('\n', "<br>"))
    }
}
