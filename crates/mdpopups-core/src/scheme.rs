use std::rc::Rc;

use crate::error::{SchemeError, TemplateError};
use crate::highlight::Highlighter;
use crate::resource::ResourceLoader;

/// Rendering target; selects which CSS template branch applies.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ContextKind {
    Popup,
    Phantom,
}

/// Resolved colors and font style for a scope selector.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ScopeStyle {
    pub color: Option<String>,
    pub background: Option<String>,
    /// Space separated subset of `bold`, `italic`, `underline`.
    pub style: String,
}

/// CSS derived from a color scheme.
pub trait SchemeTheme {
    /// Scheme-derived stylesheet, before template expansion.
    fn css(&self) -> &str;

    /// Whether the CSS was generated for the built-in (class based)
    /// highlighter rather than the scheme highlighter.
    fn uses_builtin_highlighter(&self) -> bool;

    /// Expands template markup in `css` for the given target and font size.
    fn apply_template(
        &self,
        css: &str,
        kind: ContextKind,
        font_size: f32,
    ) -> Result<String, TemplateError>;

    fn guess_style(&self, scope: &str, selected: bool, explicit_background: bool)
    -> Option<ScopeStyle>;
}

/// Builds scheme themes and scheme highlighters from a scheme identifier.
pub trait SchemeLoader {
    fn load_scheme(
        &self,
        scheme: &str,
        use_builtin_highlighter: bool,
        resources: &dyn ResourceLoader,
    ) -> Result<Rc<dyn SchemeTheme>, SchemeError>;

    fn load_highlighter(
        &self,
        scheme: &str,
        resources: &dyn ResourceLoader,
    ) -> Result<Rc<dyn Highlighter>, SchemeError>;
}
