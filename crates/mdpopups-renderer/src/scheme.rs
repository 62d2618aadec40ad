use std::io::Cursor;
use std::rc::Rc;
use std::str::FromStr;

use mdpopups_core::{
    ContextKind, Highlighter, ResourceLoader, SchemeError, SchemeLoader, SchemeTheme, ScopeStyle,
    TemplateError,
};
use once_cell::sync::Lazy;
use syntect::highlighting::{
    Color, FontStyle, Highlighter as StyleResolver, Theme, ThemeSet,
};
use syntect::html::css_for_theme_with_class_style;
use syntect::parsing::ScopeStack;
use tracing::debug;

use crate::highlight::{ThemedHighlighter, class_style};
use crate::template::{self, Variables};

static DEFAULT_THEMES: Lazy<ThemeSet> = Lazy::new(ThemeSet::load_defaults);

/// Resolves scheme ids to syntect themes.
///
/// Ids ending in `.tmTheme` are loaded through the resource loader. Anything
/// else is looked up by name, then by file stem, among syntect's bundled
/// themes (`base16-ocean.dark`, `InspiredGitHub`, ...).
#[derive(Clone, Copy, Debug, Default)]
pub struct SyntectSchemeLoader;

impl SyntectSchemeLoader {
    pub fn load_theme(
        &self,
        scheme: &str,
        resources: &dyn ResourceLoader,
    ) -> Result<Theme, SchemeError> {
        if scheme.ends_with(".tmTheme") {
            let bytes = resources.load_binary(scheme)?;
            return ThemeSet::load_from_reader(&mut Cursor::new(bytes)).map_err(|err| {
                SchemeError::Parse {
                    scheme: scheme.to_string(),
                    message: err.to_string(),
                }
            });
        }
        let stem = scheme
            .rsplit('/')
            .next()
            .map(|name| name.rsplit_once('.').map_or(name, |(stem, _)| stem))
            .unwrap_or(scheme);
        DEFAULT_THEMES
            .themes
            .get(scheme)
            .or_else(|| DEFAULT_THEMES.themes.get(stem))
            .cloned()
            .ok_or_else(|| SchemeError::NotFound {
                scheme: scheme.to_string(),
            })
    }
}

impl SchemeLoader for SyntectSchemeLoader {
    fn load_scheme(
        &self,
        scheme: &str,
        use_builtin_highlighter: bool,
        resources: &dyn ResourceLoader,
    ) -> Result<Rc<dyn SchemeTheme>, SchemeError> {
        let theme = self.load_theme(scheme, resources)?;
        let css = SchemeCss::new(scheme, theme, use_builtin_highlighter)?;
        debug!(scheme, builtin = use_builtin_highlighter, "generated scheme css");
        Ok(Rc::new(css))
    }

    fn load_highlighter(
        &self,
        scheme: &str,
        resources: &dyn ResourceLoader,
    ) -> Result<Rc<dyn Highlighter>, SchemeError> {
        let theme = self.load_theme(scheme, resources)?;
        Ok(Rc::new(ThemedHighlighter::new(theme)))
    }
}

/// CSS and template variables derived from one syntect theme.
#[derive(Debug)]
pub struct SchemeCss {
    theme: Theme,
    css: String,
    builtin: bool,
    foreground: Color,
    background: Color,
}

impl SchemeCss {
    pub fn new(scheme: &str, theme: Theme, builtin: bool) -> Result<Self, SchemeError> {
        let foreground = theme.settings.foreground.unwrap_or(Color::BLACK);
        let background = theme.settings.background.unwrap_or(Color::WHITE);
        let foreground = blend(foreground, background);

        let mut css = String::new();
        css.push_str(&format!(
            "html {{ color: {}; background-color: {}; }}\n",
            hex(foreground),
            hex(background)
        ));
        if let Some(link) = theme.settings.accent.or(theme.settings.caret) {
            css.push_str(&format!("a {{ color: {}; }}\n", hex(blend(link, background))));
        }
        if let Some(popup_css) = &theme.settings.popup_css {
            css.push_str("{% if var.is_popup %}\n");
            css.push_str(popup_css);
            css.push_str("\n{% endif %}\n");
        }
        if let Some(phantom_css) = &theme.settings.phantom_css {
            css.push_str("{% if var.is_phantom %}\n");
            css.push_str(phantom_css);
            css.push_str("\n{% endif %}\n");
        }
        if builtin {
            let classes = css_for_theme_with_class_style(&theme, class_style()).map_err(|err| {
                SchemeError::Css {
                    scheme: scheme.to_string(),
                    message: err.to_string(),
                }
            })?;
            css.push_str(&classes);
        }

        Ok(Self {
            theme,
            css,
            builtin,
            foreground,
            background,
        })
    }

    pub fn is_dark(&self) -> bool {
        luminance(self.background) < 0.5
    }

    fn variables(&self, kind: ContextKind, font_size: f32) -> Variables {
        let mut vars = Variables::new();
        vars.set_text("font_size", format!("{}", font_size))
            .set_text("foreground", hex(self.foreground))
            .set_text("background", hex(self.background))
            .set_bool("is_popup", kind == ContextKind::Popup)
            .set_bool("is_phantom", kind == ContextKind::Phantom)
            .set_bool("is_dark", self.is_dark())
            .set_bool("is_light", !self.is_dark())
            .set_bool("use_pygments", self.builtin);
        vars
    }
}

impl SchemeTheme for SchemeCss {
    fn css(&self) -> &str {
        &self.css
    }

    fn uses_builtin_highlighter(&self) -> bool {
        self.builtin
    }

    fn apply_template(
        &self,
        css: &str,
        kind: ContextKind,
        font_size: f32,
    ) -> Result<String, TemplateError> {
        template::render(css, &self.variables(kind, font_size))
    }

    fn guess_style(
        &self,
        scope: &str,
        selected: bool,
        explicit_background: bool,
    ) -> Option<ScopeStyle> {
        let stack = ScopeStack::from_str(scope).ok()?;
        let style = StyleResolver::new(&self.theme).style_for_stack(stack.as_slice());

        let mut background = style.background;
        let mut foreground = style.foreground;
        if selected {
            if let Some(selection) = self.theme.settings.selection {
                background = selection;
            }
            if let Some(selection_fg) = self.theme.settings.selection_foreground {
                foreground = selection_fg;
            }
        }
        let background = blend(background, self.background);
        let has_own_background = background != self.background;

        let mut words = Vec::new();
        if style.font_style.contains(FontStyle::BOLD) {
            words.push("bold");
        }
        if style.font_style.contains(FontStyle::ITALIC) {
            words.push("italic");
        }
        if style.font_style.contains(FontStyle::UNDERLINE) {
            words.push("underline");
        }

        Some(ScopeStyle {
            color: Some(hex(blend(foreground, background))),
            background: (!explicit_background || has_own_background).then(|| hex(background)),
            style: words.join(" "),
        })
    }
}

/// Composites a translucent color over an opaque background.
fn blend(color: Color, background: Color) -> Color {
    if color.a == 0xff {
        return color;
    }
    let alpha = f32::from(color.a) / 255.0;
    let mix = |fg: u8, bg: u8| (f32::from(fg) * alpha + f32::from(bg) * (1.0 - alpha)).round() as u8;
    Color {
        r: mix(color.r, background.r),
        g: mix(color.g, background.g),
        b: mix(color.b, background.b),
        a: 0xff,
    }
}

fn hex(color: Color) -> String {
    format!("#{:02x}{:02x}{:02x}", color.r, color.g, color.b)
}

fn luminance(color: Color) -> f32 {
    (0.299 * f32::from(color.r) + 0.587 * f32::from(color.g) + 0.114 * f32::from(color.b)) / 255.0
}

#[cfg(test)]
mod tests {
    use super::{SchemeCss, SyntectSchemeLoader, blend, hex};
    use mdpopups_core::{ContextKind, ResourceError, ResourceLoader, SchemeError, SchemeTheme};
    use syntect::highlighting::Color;

    struct NoResources;

    impl ResourceLoader for NoResources {
        fn load_binary(&self, path: &str) -> Result<Vec<u8>, ResourceError> {
            Err(ResourceError::NotFound {
                path: path.to_string(),
            })
        }
    }

    fn ocean(builtin: bool) -> SchemeCss {
        let theme = SyntectSchemeLoader
            .load_theme("base16-ocean.dark", &NoResources)
            .expect("bundled theme");
        SchemeCss::new("base16-ocean.dark", theme, builtin).expect("css")
    }

    #[test]
    fn bundled_themes_resolve_by_name_or_stem() {
        assert!(SyntectSchemeLoader.load_theme("InspiredGitHub", &NoResources).is_ok());
        assert!(
            SyntectSchemeLoader
                .load_theme("Packages/Themes/base16-ocean.dark.sublime-color-scheme", &NoResources)
                .is_ok()
        );
        assert!(matches!(
            SyntectSchemeLoader.load_theme("Nope", &NoResources),
            Err(SchemeError::NotFound { .. })
        ));
        assert!(matches!(
            SyntectSchemeLoader.load_theme("Packages/X/Missing.tmTheme", &NoResources),
            Err(SchemeError::Resource(ResourceError::NotFound { .. }))
        ));
    }

    #[test]
    fn class_css_only_for_builtin_highlighter() {
        assert!(ocean(true).css().contains(".syntax-"));
        assert!(!ocean(false).css().contains(".syntax-"));
        assert!(ocean(true).css().starts_with("html { color: #"));
    }

    #[test]
    fn template_sees_context_and_scheme_variables() {
        let scheme = ocean(true);
        let css = scheme
            .apply_template(
                "{% if var.is_phantom %}p{% endif %}{% if var.is_dark %}d{% endif %}\
                 {% if var.use_pygments %}y{% endif %}{{var.font_size}}",
                ContextKind::Phantom,
                14.5,
            )
            .expect("template");
        assert_eq!(css, "pdy14.5");
    }

    #[test]
    fn guesses_comment_style() {
        let scheme = ocean(true);
        let style = scheme
            .guess_style("source.rust comment.line.double-slash", false, false)
            .expect("style");
        assert!(style.color.is_some_and(|color| color.starts_with('#')));
        assert!(style.background.is_some());

        let explicit = scheme
            .guess_style("source.rust comment.line.double-slash", false, true)
            .expect("style");
        assert_eq!(explicit.background, None);
    }

    #[test]
    fn translucent_colors_blend_over_background() {
        let half = Color {
            r: 255,
            g: 255,
            b: 255,
            a: 128,
        };
        assert_eq!(hex(blend(half, Color::BLACK)), "#808080");
    }
}
