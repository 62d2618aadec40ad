use pulldown_cmark::Options;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::ExtensionError;
use crate::highlight::{BLOCK_CLASS, INLINE_CLASS};

/// An extension requested by name, with a JSON object of options.
#[derive(Clone, Debug, PartialEq)]
pub struct ExtensionSpec {
    pub name: String,
    pub config: Value,
}

impl ExtensionSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            config: Value::Null,
        }
    }

    pub fn with_config(name: impl Into<String>, config: Value) -> Self {
        Self {
            name: name.into(),
            config,
        }
    }
}

/// Parser options and event rewrites selected by the loaded extensions.
#[derive(Clone, Debug)]
pub struct PipelineConfig {
    pub options: Options,
    pub block_class: Option<String>,
    pub highlight_indented: bool,
    pub highlight_fenced: bool,
    pub inline_hilite: Option<InlineHiliteConfig>,
    pub magic_link: Option<MagicLinkConfig>,
    pub admonition: bool,
    pub nl2br: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            options: Options::empty(),
            block_class: None,
            highlight_indented: false,
            highlight_fenced: false,
            inline_hilite: None,
            magic_link: None,
            admonition: false,
            nl2br: false,
        }
    }
}

impl PipelineConfig {
    pub fn block_class(&self) -> &str {
        self.block_class.as_deref().unwrap_or(BLOCK_CLASS)
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct CodeHiliteConfig {
    #[serde(default = "default_block_class")]
    pub css_class: String,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct InlineHiliteConfig {
    #[serde(default = "default_inline_class")]
    pub css_class: String,
    #[serde(default = "default_true")]
    pub style_plain_text: bool,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct MagicLinkConfig {
    #[serde(default)]
    pub hide_protocol: bool,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
struct NoConfig {}

fn default_block_class() -> String {
    BLOCK_CLASS.to_string()
}

fn default_inline_class() -> String {
    INLINE_CLASS.to_string()
}

fn default_true() -> bool {
    true
}

/// The closed set of supported Markdown extensions.
#[derive(Clone, Debug, PartialEq)]
pub enum Extension {
    AttrList,
    CodeHilite(CodeHiliteConfig),
    SuperFences,
    InlineHilite(InlineHiliteConfig),
    BetterEm,
    MagicLink(MagicLinkConfig),
    Admonition,
    DefList,
    Nl2Br,
}

impl Extension {
    /// Resolves a spec. Dotted names (`markdown.extensions.attr_list`) are
    /// matched on their last segment.
    pub fn load(spec: &ExtensionSpec) -> Result<Self, ExtensionError> {
        let short = spec.name.rsplit('.').next().unwrap_or(&spec.name);
        let config = &spec.config;
        let extension = match short {
            "attr_list" => {
                parse_config::<NoConfig>(&spec.name, config)?;
                Extension::AttrList
            }
            "codehilite" => Extension::CodeHilite(parse_config(&spec.name, config)?),
            "superfences" => {
                parse_config::<NoConfig>(&spec.name, config)?;
                Extension::SuperFences
            }
            "inlinehilite" => Extension::InlineHilite(parse_config(&spec.name, config)?),
            "betterem" => {
                parse_config::<NoConfig>(&spec.name, config)?;
                Extension::BetterEm
            }
            "magiclink" => Extension::MagicLink(parse_config(&spec.name, config)?),
            "admonition" => {
                parse_config::<NoConfig>(&spec.name, config)?;
                Extension::Admonition
            }
            "def_list" => {
                parse_config::<NoConfig>(&spec.name, config)?;
                Extension::DefList
            }
            "nl2br" => {
                parse_config::<NoConfig>(&spec.name, config)?;
                Extension::Nl2Br
            }
            _ => return Err(ExtensionError::Unknown(spec.name.clone())),
        };
        Ok(extension)
    }

    pub fn extend(&self, config: &mut PipelineConfig) {
        match self {
            Extension::AttrList => config.options |= Options::ENABLE_HEADING_ATTRIBUTES,
            Extension::CodeHilite(codehilite) => {
                config.block_class = Some(codehilite.css_class.clone());
                config.highlight_indented = true;
            }
            Extension::SuperFences => config.highlight_fenced = true,
            Extension::InlineHilite(inline) => config.inline_hilite = Some(inline.clone()),
            // CommonMark flanking rules already keep `snake_case` words intact.
            Extension::BetterEm => {}
            Extension::MagicLink(magic) => config.magic_link = Some(magic.clone()),
            Extension::Admonition => {
                config.options |= Options::ENABLE_GFM;
                config.admonition = true;
            }
            Extension::DefList => config.options |= Options::ENABLE_DEFINITION_LIST,
            Extension::Nl2Br => config.nl2br = true,
        }
    }
}

fn parse_config<T: DeserializeOwned>(name: &str, config: &Value) -> Result<T, ExtensionError> {
    let value = match config {
        Value::Null => Value::Object(Default::default()),
        other => other.clone(),
    };
    serde_json::from_value(value).map_err(|source| ExtensionError::InvalidConfig {
        extension: name.to_string(),
        source,
    })
}

/// The extension set used for popups and phantoms.
pub fn default_extensions(line_breaks: bool) -> Vec<ExtensionSpec> {
    let mut specs = vec![
        ExtensionSpec::new("markdown.extensions.attr_list"),
        ExtensionSpec::with_config(
            "markdown.extensions.codehilite",
            serde_json::json!({ "css_class": BLOCK_CLASS }),
        ),
        ExtensionSpec::new("mdpopups.mdx.superfences"),
        ExtensionSpec::new("mdpopups.mdx.betterem"),
        ExtensionSpec::new("mdpopups.mdx.magiclink"),
        ExtensionSpec::with_config(
            "mdpopups.mdx.inlinehilite",
            serde_json::json!({ "style_plain_text": true, "css_class": INLINE_CLASS }),
        ),
        ExtensionSpec::new("markdown.extensions.admonition"),
        ExtensionSpec::new("markdown.extensions.def_list"),
    ];
    if line_breaks {
        specs.push(ExtensionSpec::new("markdown.extensions.nl2br"));
    }
    specs
}
