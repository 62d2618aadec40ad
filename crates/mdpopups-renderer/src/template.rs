use std::collections::BTreeMap;

use mdpopups_core::TemplateError;
use minijinja::{Environment, ErrorKind, UndefinedBehavior, context};
use once_cell::sync::Lazy;
use serde::Serialize;

static ENV: Lazy<Environment<'static>> = Lazy::new(|| {
    let mut env = Environment::new();
    env.set_undefined_behavior(UndefinedBehavior::Strict);
    env.set_keep_trailing_newline(true);
    env
});

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TemplateValue {
    Bool(bool),
    Text(String),
}

/// Variables visible to a template as `var.<name>`.
#[derive(Clone, Debug, Default)]
pub struct Variables {
    values: BTreeMap<String, TemplateValue>,
}

impl Variables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_bool(&mut self, name: &str, value: bool) -> &mut Self {
        self.values.insert(name.to_string(), TemplateValue::Bool(value));
        self
    }

    pub fn set_text(&mut self, name: &str, value: impl Into<String>) -> &mut Self {
        self.values
            .insert(name.to_string(), TemplateValue::Text(value.into()));
        self
    }

    pub fn get(&self, name: &str) -> Option<&TemplateValue> {
        self.values.get(name)
    }
}

/// Renders a CSS template with `vars` bound to `var`.
///
/// Undefined names are errors, so a misspelled variable fails instead of
/// expanding to nothing.
pub fn render(source: &str, vars: &Variables) -> Result<String, TemplateError> {
    ENV.render_str(source, context! { var => &vars.values })
        .map_err(template_error)
}

fn template_error(err: minijinja::Error) -> TemplateError {
    match err.kind() {
        ErrorKind::UndefinedError => TemplateError::UnknownVariable(err.to_string()),
        ErrorKind::SyntaxError => TemplateError::Syntax {
            line: err.line().unwrap_or(0),
            detail: err.detail().unwrap_or("malformed template").to_string(),
        },
        _ => TemplateError::Render(err.to_string()),
    }
}
