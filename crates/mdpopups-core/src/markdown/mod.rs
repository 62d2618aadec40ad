mod admonition;
mod extension;

use once_cell::sync::Lazy;
use pulldown_cmark::{CodeBlockKind, CowStr, Event, LinkType, Parser, Tag, TagEnd, html};
use regex::Regex;
use tracing::error;

use crate::cache::log_chain;
use crate::highlight::{Highlighter, plain_code, wrap_block, wrap_inline};
use crate::settings::DebugLevel;

pub use admonition::expand_admonitions;
pub use extension::{
    CodeHiliteConfig, Extension, ExtensionSpec, InlineHiliteConfig, MagicLinkConfig,
    PipelineConfig, default_extensions,
};

static BARE_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:(?:https?|ftp)://|www\.)[^\s<>]*[^\s<>.,:;!?'\x22)\]]")
        .expect("url pattern is valid")
});

/// Markdown to single-line HTML with a fixed extension set.
pub struct MarkdownPipeline {
    config: PipelineConfig,
    debug: DebugLevel,
}

impl MarkdownPipeline {
    /// Loads every extension it can; failures are logged and skipped.
    pub fn new(specs: &[ExtensionSpec], debug: DebugLevel) -> Self {
        let mut config = PipelineConfig::default();
        for spec in specs {
            match Extension::load(spec) {
                Ok(extension) => extension.extend(&mut config),
                Err(err) => {
                    error!(extension = %spec.name, "failed to load markdown extension");
                    log_chain(debug, &err);
                }
            }
        }
        Self { config, debug }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn render(&self, markup: &str, highlighter: &dyn Highlighter) -> String {
        let source = if self.config.admonition {
            expand_admonitions(markup)
        } else {
            markup.into()
        };

        let parser = Parser::new_ext(&source, self.config.options);
        let events = Rewriter::new(&self.config, highlighter, self.debug).rewrite(parser);

        let mut out = String::with_capacity(source.len() * 3 / 2);
        html::push_html(&mut out, events.into_iter());
        out.replace("&quot;", "\"").replace('\n', "")
    }
}

struct PendingCode {
    language: Option<String>,
    text: String,
}

struct Rewriter<'a> {
    config: &'a PipelineConfig,
    highlighter: &'a dyn Highlighter,
    debug: DebugLevel,
    code: Option<PendingCode>,
    link_depth: usize,
}

impl<'a> Rewriter<'a> {
    fn new(
        config: &'a PipelineConfig,
        highlighter: &'a dyn Highlighter,
        debug: DebugLevel,
    ) -> Self {
        Self {
            config,
            highlighter,
            debug,
            code: None,
            link_depth: 0,
        }
    }

    fn rewrite<'s>(mut self, parser: Parser<'s>) -> Vec<Event<'s>> {
        let mut out = Vec::new();
        for event in merge_text(parser) {
            if let Some(pending) = self.code.as_mut() {
                match event {
                    Event::Text(text) => pending.text.push_str(&text),
                    Event::End(TagEnd::CodeBlock) => {
                        if let Some(pending) = self.code.take() {
                            let language = pending.language.as_deref();
                            let inner = self.highlight(&pending.text, language, false);
                            let block = wrap_block(self.config.block_class(), &inner);
                            out.push(Event::Html(block.into()));
                        }
                    }
                    _ => {}
                }
                continue;
            }

            match event {
                Event::Start(Tag::CodeBlock(kind)) if self.highlights(&kind) => {
                    self.code = Some(PendingCode {
                        language: code_language(&kind),
                        text: String::new(),
                    });
                }
                Event::Code(code) => out.push(self.inline_code(code)),
                Event::Text(text) if self.link_depth == 0 && self.config.magic_link.is_some() => {
                    self.magic_link(text, &mut out)
                }
                Event::SoftBreak if self.config.nl2br => out.push(Event::HardBreak),
                Event::Start(Tag::BlockQuote(Some(kind))) if self.config.admonition => {
                    let kind = admonition::alert_kind(kind);
                    let title = admonition::capitalize(kind);
                    out.push(Event::Html(admonition::open_tag(kind, &title).into()));
                }
                Event::End(TagEnd::BlockQuote(Some(_))) if self.config.admonition => {
                    out.push(Event::Html("</div>".into()));
                }
                Event::Start(Tag::Link { .. }) => {
                    self.link_depth += 1;
                    out.push(event);
                }
                Event::End(TagEnd::Link) => {
                    self.link_depth = self.link_depth.saturating_sub(1);
                    out.push(event);
                }
                other => out.push(other),
            }
        }
        out
    }

    fn highlights(&self, kind: &CodeBlockKind<'_>) -> bool {
        match kind {
            CodeBlockKind::Fenced(_) => self.config.highlight_fenced,
            CodeBlockKind::Indented => self.config.highlight_indented,
        }
    }

    fn highlight(&self, src: &str, language: Option<&str>, inline: bool) -> String {
        match self.highlighter.highlight(src, language, inline) {
            Ok(html) => html,
            Err(err) => {
                error!(language, "failed to highlight code");
                log_chain(self.debug, &err);
                plain_code(src, inline)
            }
        }
    }

    fn inline_code<'s>(&self, code: CowStr<'s>) -> Event<'s> {
        let Some(inline) = self.config.inline_hilite.as_ref() else {
            return Event::Code(code);
        };
        let (language, src) = match code.strip_prefix("#!") {
            Some(rest) => match rest.split_once(' ') {
                Some((language, src)) if !language.is_empty() => (Some(language), src),
                _ => (None, &*code),
            },
            None if inline.style_plain_text => (None, &*code),
            None => return Event::Code(code),
        };
        let inner = self.highlight(src, language, true);
        Event::InlineHtml(wrap_inline(&inline.css_class, &inner).into())
    }

    fn magic_link<'s>(&self, text: CowStr<'s>, out: &mut Vec<Event<'s>>) {
        if !BARE_URL.is_match(&text) {
            out.push(Event::Text(text));
            return;
        }
        let hide_protocol = self
            .config
            .magic_link
            .as_ref()
            .is_some_and(|magic| magic.hide_protocol);

        let mut last = 0;
        for found in BARE_URL.find_iter(&text) {
            if found.start() > last {
                out.push(Event::Text(text[last..found.start()].to_string().into()));
            }
            let url = found.as_str();
            let href = if url.starts_with("www.") {
                format!("http://{}", url)
            } else {
                url.to_string()
            };
            let label = if hide_protocol {
                url.split_once("://").map_or(url, |(_, rest)| rest)
            } else {
                url
            };
            out.push(Event::Start(Tag::Link {
                link_type: LinkType::Autolink,
                dest_url: href.into(),
                title: "".into(),
                id: "".into(),
            }));
            out.push(Event::Text(label.to_string().into()));
            out.push(Event::End(TagEnd::Link));
            last = found.end();
        }
        if last < text.len() {
            out.push(Event::Text(text[last..].to_string().into()));
        }
    }
}

/// Joins adjacent text events so URLs are not split at inline delimiters.
fn merge_text<'s>(events: impl Iterator<Item = Event<'s>>) -> Vec<Event<'s>> {
    let mut out: Vec<Event<'s>> = Vec::new();
    for event in events {
        if let Event::Text(text) = &event {
            if let Some(Event::Text(previous)) = out.last_mut() {
                let mut joined = previous.to_string();
                joined.push_str(text);
                *previous = joined.into();
                continue;
            }
        }
        out.push(event);
    }
    out
}

fn code_language(kind: &CodeBlockKind<'_>) -> Option<String> {
    match kind {
        CodeBlockKind::Fenced(info) => info
            .split_whitespace()
            .next()
            .map(|token| token.trim_start_matches('.').to_string())
            .filter(|token| !token.is_empty()),
        CodeBlockKind::Indented => None,
    }
}

#[cfg(test)]
mod tests {
    use super::{ExtensionSpec, MarkdownPipeline, default_extensions};
    use crate::error::HighlightError;
    use crate::highlight::{Highlighter, plain_code};
    use crate::settings::DebugLevel;
    use serde_json::json;

    struct Tagging;

    impl Highlighter for Tagging {
        fn highlight(
            &self,
            src: &str,
            language: Option<&str>,
            inline: bool,
        ) -> Result<String, HighlightError> {
            Ok(format!(
                "<span data-lang=\"{}\">{}</span>",
                language.unwrap_or("text"),
                plain_code(src, inline)
            ))
        }
    }

    struct Broken;

    impl Highlighter for Broken {
        fn highlight(&self, _: &str, _: Option<&str>, _: bool) -> Result<String, HighlightError> {
            Err(HighlightError::Backend("no syntaxes".to_string()))
        }
    }

    fn render(markup: &str, line_breaks: bool) -> String {
        MarkdownPipeline::new(&default_extensions(line_breaks), DebugLevel::Off)
            .render(markup, &Tagging)
    }

    #[test]
    fn output_is_single_line() {
        let html = render("# Title\n\nSome *text*\n\n- a\n- b\n", false);
        assert!(!html.contains('\n'));
        assert!(html.contains("<h1>Title</h1>"));
        assert!(html.contains("<em>text</em>"));
    }

    #[test]
    fn fenced_code_goes_through_highlighter() {
        let html = render("```python\nx = 1\nif x:\n    pass\n```\n", false);
        assert!(html.starts_with("<div class=\"highlight\"><pre><span data-lang=\"python\">"));
        assert!(html.contains("x&nbsp;=&nbsp;1<br>if&nbsp;x:"));
    }

    #[test]
    fn inline_code_with_language_marker() {
        let html = render("Run `#!rust let x = 1;` and `plain`.", false);
        assert!(html.contains("<code class=\"inline-highlight\"><span data-lang=\"rust\">let x = 1;</span></code>"));
        assert!(html.contains("<code class=\"inline-highlight\"><span data-lang=\"text\">plain</span></code>"));
    }

    #[test]
    fn line_break_mode_converts_soft_breaks() {
        assert!(render("one\ntwo", true).contains("one<br />two"));
        assert!(!render("one\ntwo", false).contains("<br"));
    }

    #[test]
    fn bare_urls_become_links() {
        let html = render("See https://example.com/docs. Or [x](https://a.b).", false);
        assert!(html.contains("<a href=\"https://example.com/docs\">https://example.com/docs</a>."));
        assert_eq!(html.matches("<a ").count(), 2);
    }

    #[test]
    fn admonition_blocks_render() {
        let html = render("!!! note\n    Careful *now*.\n", false);
        assert!(html.contains("<div class=\"admonition note\"><p class=\"admonition-title\">Note</p>"));
        assert!(html.contains("<p>Careful <em>now</em>.</p>"));

        let alert = render("> [!WARNING]\n> Hot\n", false);
        assert!(alert.contains("<div class=\"admonition warning\">"));
        assert!(!alert.contains("<blockquote"));
    }

    #[test]
    fn definition_lists_render() {
        let html = render("Term\n: Definition\n", false);
        assert!(html.contains("<dl>"));
        assert!(html.contains("<dt>Term</dt>"));
    }

    #[test]
    fn emphasis_ignores_intraword_underscores() {
        let html = render("a snake_case_name and __bold__ and ~~kept~~", false);
        assert!(html.contains("snake_case_name"));
        assert!(html.contains("<strong>bold</strong>"));
        assert!(html.contains("~~kept~~"));
        assert!(!html.contains("<del>"));
    }

    #[test]
    fn quote_entities_are_restored() {
        assert_eq!(render("say \"hi\"", false), "<p>say \"hi\"</p>");
    }

    #[test]
    fn broken_extension_is_skipped() {
        let specs = vec![
            ExtensionSpec::new("superfences"),
            ExtensionSpec::with_config("codehilite", json!({ "css_class": ["not", "a", "string"] })),
            ExtensionSpec::new("no.such.extension"),
        ];
        let pipeline = MarkdownPipeline::new(&specs, DebugLevel::Off);
        assert!(pipeline.config().highlight_fenced);
        assert!(!pipeline.config().highlight_indented);

        let html = pipeline.render("**bold**\n\n```js\nf()\n```\n", &Tagging);
        assert!(html.contains("<strong>bold</strong>"));
        assert!(html.contains("<div class=\"highlight\"><pre><span data-lang=\"js\">f()</span></pre></div>"));
    }

    #[test]
    fn highlighter_failure_falls_back_to_plain_code() {
        let pipeline = MarkdownPipeline::new(&default_extensions(false), DebugLevel::Off);
        let html = pipeline.render("```c\na < b\n```\n", &Broken);
        assert_eq!(html, "<div class=\"highlight\"><pre>a&nbsp;&lt;&nbsp;b</pre></div>");
    }
}
