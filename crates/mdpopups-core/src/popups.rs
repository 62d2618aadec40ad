use std::any::Any;
use std::cell::RefCell;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

use tracing::{debug, error, info, warn};

use crate::cache::{CachePolicy, CachedScheme, HighlighterCache, SchemeCache, log_chain};
use crate::clock::{Clock, SystemClock};
use crate::css::clean_css;
use crate::error::{RenderError, SchemeError};
use crate::guard::can_show;
use crate::highlight::{
    BLOCK_CLASS, Highlighter, INLINE_CLASS, plain_code, wrap_block, wrap_inline,
};
use crate::html::{FALLBACK_HTML, assemble};
use crate::lang::language_for_syntax;
use crate::markdown::{ExtensionSpec, MarkdownPipeline, default_extensions};
use crate::resource::ResourceLoader;
use crate::scheme::{ContextKind, SchemeLoader, ScopeStyle};
use crate::settings::{DebugLevel, Settings, SettingsSource};
use crate::view::{Layout, NavigateCallback, PhantomId, PopupPlacement, Region, View};

pub const BASE_CSS: &str = "Packages/mdpopups/css/base.css";
pub const DEFAULT_CSS: &str = "Packages/mdpopups/css/default.css";
pub const DEFAULT_FONT_SIZE: f32 = 12.0;

const VERSION: (u32, u32, u32) = (1, 8, 1);

pub fn version() -> (u32, u32, u32) {
    VERSION
}

#[derive(Clone, Debug)]
pub struct RenderOptions {
    /// Treat content as Markdown; otherwise it is inserted as HTML.
    pub markdown: bool,
    /// Extra CSS placed after the scheme CSS and before the user CSS.
    pub css: Option<String>,
    /// Convert single newlines into line breaks.
    pub line_breaks: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            markdown: true,
            css: None,
            line_breaks: true,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct PopupOptions {
    pub render: RenderOptions,
    pub placement: PopupPlacement,
}

/// One render request.
pub struct RenderContext<'a> {
    pub view: &'a dyn View,
    pub content: &'a str,
    pub markdown: bool,
    pub css: Option<&'a str>,
    pub kind: ContextKind,
    pub line_breaks: bool,
}

impl<'a> RenderContext<'a> {
    pub fn new(
        view: &'a dyn View,
        content: &'a str,
        options: &'a RenderOptions,
        kind: ContextKind,
    ) -> Self {
        Self {
            view,
            content,
            markdown: options.markdown,
            css: options.css.as_deref(),
            kind,
            line_breaks: options.line_breaks,
        }
    }
}

/// Popup and phantom renderer.
///
/// Owns the host collaborators, the scheme and highlighter caches and the
/// base stylesheet memo. Construct one per process and share it by reference.
pub struct MdPopups {
    settings: Box<dyn SettingsSource>,
    resources: Box<dyn ResourceLoader>,
    schemes: Box<dyn SchemeLoader>,
    builtin: Box<dyn Highlighter>,
    clock: Box<dyn Clock>,
    scheme_cache: RefCell<SchemeCache>,
    highlighter_cache: RefCell<HighlighterCache>,
    base_css: RefCell<Option<Rc<str>>>,
}

impl MdPopups {
    pub fn new(
        settings: Box<dyn SettingsSource>,
        resources: Box<dyn ResourceLoader>,
        schemes: Box<dyn SchemeLoader>,
        builtin: Box<dyn Highlighter>,
    ) -> Self {
        Self {
            settings,
            resources,
            schemes,
            builtin,
            clock: Box::new(SystemClock),
            scheme_cache: RefCell::new(SchemeCache::new()),
            highlighter_cache: RefCell::new(HighlighterCache::new()),
            base_css: RefCell::new(None),
        }
    }

    pub fn with_clock(mut self, clock: Box<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn settings(&self) -> Settings<'_> {
        Settings::new(self.settings.as_ref())
    }

    fn debug_level(&self) -> DebugLevel {
        self.settings().debug_level()
    }

    /// Drops every cached theme, highlighter and the base stylesheet.
    pub fn clear_cache(&self) {
        *self.base_css.borrow_mut() = None;
        self.scheme_cache.borrow_mut().clear();
        self.highlighter_cache.borrow_mut().clear();
    }

    /// Scheme ids currently cached, oldest first.
    pub fn cached_schemes(&self) -> Vec<String> {
        self.scheme_cache.borrow().keys()
    }

    pub fn cached_highlighters(&self) -> usize {
        self.highlighter_cache.borrow().len()
    }

    // Theme resolution

    /// Full stylesheet for `view`: base, scheme, `extra_css` and user CSS,
    /// expanded for `kind`. Empty when the scheme is unavailable.
    pub fn resolve_theme(
        &self,
        view: &dyn View,
        extra_css: Option<&str>,
        kind: ContextKind,
    ) -> String {
        let base = self.base_css();
        let Some(scheme) = self.scheme(view) else {
            return String::new();
        };
        let theme_css = scheme.theme.css();
        let extra = extra_css.unwrap_or("");

        let mut css = String::with_capacity(
            base.len() + theme_css.len() + extra.len() + scheme.user_css.len(),
        );
        css.push_str(&base);
        css.push_str(theme_css);
        css.push_str(extra);
        css.push_str(&scheme.user_css);

        let font_size = view.font_size().unwrap_or(DEFAULT_FONT_SIZE);
        match scheme.theme.apply_template(&css, kind, font_size) {
            Ok(expanded) => expanded,
            Err(err) => {
                error!("failed to retrieve scheme CSS");
                log_chain(self.debug_level(), &err);
                String::new()
            }
        }
    }

    fn base_css(&self) -> Rc<str> {
        if let Some(css) = self.base_css.borrow().as_ref() {
            return Rc::clone(css);
        }
        match self.resources.load_text(BASE_CSS) {
            Ok(css) => {
                let css: Rc<str> = clean_css(&css).into();
                *self.base_css.borrow_mut() = Some(Rc::clone(&css));
                css
            }
            Err(err) => {
                error!(path = BASE_CSS, "failed to load base stylesheet");
                log_chain(self.debug_level(), &err);
                Rc::from("")
            }
        }
    }

    fn user_css(&self) -> String {
        let path = self.settings().user_css();
        let css = self.resources.load_text(&path).or_else(|err| {
            debug!(path = %path, error = %err, "user stylesheet unavailable, using default");
            self.resources.load_text(DEFAULT_CSS)
        });
        match css {
            Ok(css) => clean_css(&css),
            Err(err) => {
                debug!(error = %err, "default stylesheet unavailable");
                String::new()
            }
        }
    }

    fn scheme(&self, view: &dyn View) -> Option<CachedScheme> {
        let id = view.color_scheme()?;
        let settings = self.settings();
        let policy = CachePolicy::from_settings(&settings);
        let use_builtin = !settings.use_sublime_highlighter();
        let now = self.clock.now();
        self.scheme_cache
            .borrow_mut()
            .get_or_build(&id, now, &policy, use_builtin, || {
                let theme = self.schemes.load_scheme(&id, use_builtin, self.resources.as_ref())?;
                let user_css = self.user_css();
                Ok::<_, SchemeError>(CachedScheme {
                    theme,
                    user_css: user_css.into(),
                })
            })
    }

    fn scheme_highlighter(&self, view: &dyn View) -> Option<Rc<dyn Highlighter>> {
        let id = view.color_scheme()?;
        let policy = CachePolicy::from_settings(&self.settings());
        let now = self.clock.now();
        self.highlighter_cache
            .borrow_mut()
            .get_or_build(&id, now, &policy, || {
                self.schemes.load_highlighter(&id, self.resources.as_ref())
            })
    }

    /// Runs `f` with the highlighter selected by the current settings: the
    /// scheme highlighter when enabled and available, the built-in otherwise.
    fn with_highlighter<T>(&self, view: &dyn View, f: impl FnOnce(&dyn Highlighter) -> T) -> T {
        let scheme_highlighter = if self.settings().use_sublime_highlighter() {
            self.scheme_highlighter(view)
        } else {
            None
        };
        match scheme_highlighter {
            Some(highlighter) => f(highlighter.as_ref()),
            None => f(self.builtin.as_ref()),
        }
    }

    // Markdown

    pub fn md2html(&self, view: &dyn View, markup: &str, line_breaks: bool) -> String {
        self.md2html_with_extensions(view, markup, &default_extensions(line_breaks))
    }

    pub fn md2html_with_extensions(
        &self,
        view: &dyn View,
        markup: &str,
        extensions: &[ExtensionSpec],
    ) -> String {
        let pipeline = MarkdownPipeline::new(extensions, self.debug_level());
        self.with_highlighter(view, |highlighter| pipeline.render(markup, highlighter))
    }

    /// Highlights `src` as a standalone block or inline fragment.
    pub fn syntax_highlight(
        &self,
        view: &dyn View,
        src: &str,
        language: Option<&str>,
        inline: bool,
    ) -> String {
        let inner = self.with_highlighter(view, |highlighter| {
            highlighter.highlight(src, language, inline)
        });
        let inner = inner.unwrap_or_else(|err| {
            error!("failed to highlight code");
            log_chain(self.debug_level(), &err);
            plain_code(src, inline)
        });
        if inline {
            wrap_inline(INLINE_CLASS, &inner)
        } else {
            wrap_block(BLOCK_CLASS, &inner)
        }
    }

    // Rendering

    /// Renders a complete popup/phantom document. Never fails: a panic
    /// anywhere in the pipeline yields [`FALLBACK_HTML`] and clears the caches.
    pub fn render_html(&self, ctx: &RenderContext<'_>) -> String {
        match self.try_render_html(ctx) {
            Ok(html) => html,
            Err(err) => {
                error!(error = %err, "failed to render content");
                self.clear_cache();
                FALLBACK_HTML.to_string()
            }
        }
    }

    pub fn try_render_html(&self, ctx: &RenderContext<'_>) -> Result<String, RenderError> {
        panic::catch_unwind(AssertUnwindSafe(|| self.create_html(ctx)))
            .map_err(|payload| RenderError::Panicked(panic_message(payload.as_ref())))
    }

    fn create_html(&self, ctx: &RenderContext<'_>) -> String {
        let verbose = self.debug_level() >= DebugLevel::Info;
        if verbose {
            info!("=====Content=====\n{}", ctx.content);
        }

        let style = self.resolve_theme(ctx.view, ctx.css, ctx.kind);
        if verbose {
            info!("=====CSS=====\n{}", style);
        }

        let body = if ctx.markdown {
            self.md2html(ctx.view, ctx.content, ctx.line_breaks)
        } else {
            ctx.content.to_string()
        };
        if verbose {
            info!("=====HTML OUTPUT=====\n{}", body);
        }

        assemble(&style, &body)
    }

    fn disabled(&self, what: &str) -> bool {
        let settings = self.settings();
        if !settings.disabled() {
            return false;
        }
        if settings.debug_level() >= DebugLevel::Warning {
            warn!("{} disabled", what);
        }
        true
    }

    // Popups

    pub fn show_popup(&self, view: &dyn View, content: &str, options: &PopupOptions) {
        if self.disabled("popups") {
            return;
        }
        if !can_show(view, options.placement.location) {
            return;
        }
        let ctx = RenderContext::new(view, content, &options.render, ContextKind::Popup);
        let html = self.render_html(&ctx);
        view.show_popup(&html, &options.placement);
    }

    pub fn update_popup(&self, view: &dyn View, content: &str, options: &RenderOptions) {
        if self.disabled("popups") {
            return;
        }
        let ctx = RenderContext::new(view, content, options, ContextKind::Popup);
        let html = self.render_html(&ctx);
        view.update_popup(&html);
    }

    pub fn hide_popup(&self, view: &dyn View) {
        view.hide_popup();
    }

    pub fn is_popup_visible(&self, view: &dyn View) -> bool {
        view.is_popup_visible()
    }

    // Phantoms

    /// Renders and adds a phantom. `None` when phantoms are disabled.
    #[allow(clippy::too_many_arguments)]
    pub fn add_phantom(
        &self,
        view: &dyn View,
        key: &str,
        region: Region,
        content: &str,
        layout: Layout,
        options: &RenderOptions,
        on_navigate: Option<NavigateCallback>,
    ) -> Option<PhantomId> {
        if self.disabled("phantoms") {
            return None;
        }
        let ctx = RenderContext::new(view, content, options, ContextKind::Phantom);
        let html = self.render_html(&ctx);
        Some(view.add_phantom(key, region, &html, layout, on_navigate))
    }

    pub fn erase_phantoms(&self, view: &dyn View, key: &str) {
        view.erase_phantoms(key);
    }

    pub fn erase_phantom_by_id(&self, view: &dyn View, id: PhantomId) {
        view.erase_phantom_by_id(id);
    }

    pub fn query_phantom(&self, view: &dyn View, id: PhantomId) -> Region {
        view.query_phantom(id)
    }

    pub fn query_phantoms(&self, view: &dyn View, ids: &[PhantomId]) -> Vec<Region> {
        view.query_phantoms(ids)
    }

    // Scheme queries

    pub fn scope2style(
        &self,
        view: &dyn View,
        scope: &str,
        selected: bool,
        explicit_background: bool,
    ) -> Option<ScopeStyle> {
        let scheme = self.scheme(view)?;
        scheme.theme.guess_style(scope, selected, explicit_background)
    }

    /// Language key for the view's syntax, using the user language map first.
    pub fn language_from_view(&self, view: &dyn View) -> Option<String> {
        let syntax = view.syntax()?;
        language_for_syntax(&syntax, &self.settings().user_lang_map())
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
