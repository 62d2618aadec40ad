mod cache;
mod clock;
mod css;
mod error;
mod guard;
mod highlight;
mod html;
mod lang;
mod markdown;
mod phantom;
mod popups;
mod resource;
mod sanitize;
mod scheme;
mod settings;
mod view;

pub mod keys {
    pub use crate::settings::{
        CACHE_LIMIT, CACHE_REFRESH_TIME, DEBUG, DISABLE, USE_SUBLIME_HIGHLIGHTER, USER_CSS,
        USER_LANG_MAP,
    };
}

pub use cache::{CachePolicy, CachedScheme, ExpiringCache, HighlighterCache, SchemeCache};
pub use clock::{Clock, ManualClock, SystemClock};
pub use css::clean_css;
pub use error::{
    ExtensionError, HighlightError, RenderError, ResourceError, SchemeError, TemplateError,
};
pub use guard::can_show;
pub use highlight::{
    BLOCK_CLASS, Highlighter, INLINE_CLASS, plain_code, preserve_whitespace, wrap_block,
    wrap_inline,
};
pub use html::{FALLBACK_HTML, assemble};
pub use lang::language_for_syntax;
pub use markdown::{
    CodeHiliteConfig, Extension, ExtensionSpec, InlineHiliteConfig, MagicLinkConfig,
    MarkdownPipeline, PipelineConfig, default_extensions, expand_admonitions,
};
pub use phantom::{Phantom, PhantomKey, PhantomSet, PlainPhantom};
pub use popups::{
    BASE_CSS, DEFAULT_CSS, DEFAULT_FONT_SIZE, MdPopups, PopupOptions, RenderContext,
    RenderOptions, version,
};
pub use resource::ResourceLoader;
pub use sanitize::remove_entities;
pub use scheme::{ContextKind, SchemeLoader, SchemeTheme, ScopeStyle};
pub use settings::{
    DEFAULT_CACHE_LIMIT, DEFAULT_REFRESH_MINUTES, DEFAULT_USER_CSS, DebugLevel, JsonSettings,
    LangAliases, Settings, SettingsSource,
};
pub use view::{
    HideCallback, Layout, NavigateCallback, PhantomId, PopupPlacement, Region, View,
};
