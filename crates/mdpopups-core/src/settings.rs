use std::cell::RefCell;
use std::collections::BTreeMap;

use serde_json::{Map, Value};

pub const DEBUG: &str = "mdpopups.debug";
pub const CACHE_REFRESH_TIME: &str = "mdpopups.cache_refresh_time";
pub const CACHE_LIMIT: &str = "mdpopups.cache_limit";
pub const USE_SUBLIME_HIGHLIGHTER: &str = "mdpopups.use_sublime_highlighter";
pub const DISABLE: &str = "mdpopups.disable";
pub const USER_CSS: &str = "mdpopups.user_css";
pub const USER_LANG_MAP: &str = "mdpopups.sublime_user_lang_map";

pub const DEFAULT_USER_CSS: &str = "Packages/User/mdpopups.css";
pub const DEFAULT_REFRESH_MINUTES: u64 = 30;
pub const DEFAULT_CACHE_LIMIT: usize = 10;

/// String-keyed settings store owned by the host editor.
pub trait SettingsSource {
    fn get(&self, key: &str) -> Option<Value>;
}

/// Settings backed by a JSON object.
#[derive(Debug, Default)]
pub struct JsonSettings {
    values: RefCell<Map<String, Value>>,
}

impl JsonSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        let values: Map<String, Value> = serde_json::from_str(json)?;
        Ok(Self {
            values: RefCell::new(values),
        })
    }

    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) {
        self.values.borrow_mut().insert(key.into(), value.into());
    }

    pub fn remove(&self, key: &str) {
        self.values.borrow_mut().remove(key);
    }
}

impl SettingsSource for JsonSettings {
    fn get(&self, key: &str) -> Option<Value> {
        self.values.borrow().get(key).cloned()
    }
}

impl<S: SettingsSource + ?Sized> SettingsSource for std::rc::Rc<S> {
    fn get(&self, key: &str) -> Option<Value> {
        (**self).get(key)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd)]
pub enum DebugLevel {
    Off = 0,
    Error = 1,
    Warning = 2,
    Info = 3,
}

/// Language map entry: (extension aliases, syntax aliases).
pub type LangAliases = (Vec<String>, Vec<String>);

/// Typed, normalized view over a [`SettingsSource`].
///
/// Every accessor reads the source again, so changes made by the host between
/// calls are observed. Malformed values never surface as errors; they fall
/// back to the documented default.
pub struct Settings<'a> {
    source: &'a dyn SettingsSource,
}

impl<'a> Settings<'a> {
    pub fn new(source: &'a dyn SettingsSource) -> Self {
        Self { source }
    }

    pub fn debug_level(&self) -> DebugLevel {
        match self.source.get(DEBUG).and_then(|value| value.as_i64()) {
            Some(level) if level >= 3 => DebugLevel::Info,
            Some(2) => DebugLevel::Warning,
            Some(1) => DebugLevel::Error,
            _ => DebugLevel::Off,
        }
    }

    /// Cache time-to-live in minutes. `0` means entries are always expired.
    pub fn cache_refresh_minutes(&self) -> u64 {
        self.source
            .get(CACHE_REFRESH_TIME)
            .and_then(|value| value.as_u64())
            .unwrap_or(DEFAULT_REFRESH_MINUTES)
    }

    pub fn cache_limit(&self) -> usize {
        match self.source.get(CACHE_LIMIT).and_then(|value| value.as_u64()) {
            Some(limit) if limit > 0 => usize::try_from(limit).unwrap_or(DEFAULT_CACHE_LIMIT),
            _ => DEFAULT_CACHE_LIMIT,
        }
    }

    pub fn use_sublime_highlighter(&self) -> bool {
        self.flag(USE_SUBLIME_HIGHLIGHTER)
    }

    pub fn disabled(&self) -> bool {
        self.flag(DISABLE)
    }

    pub fn user_css(&self) -> String {
        self.source
            .get(USER_CSS)
            .and_then(|value| value.as_str().map(str::to_string))
            .unwrap_or_else(|| DEFAULT_USER_CSS.to_string())
    }

    /// User language map. Entries that do not have the
    /// `[[extensions...], [syntaxes...]]` shape are ignored.
    pub fn user_lang_map(&self) -> BTreeMap<String, LangAliases> {
        let mut out = BTreeMap::new();
        let Some(Value::Object(entries)) = self.source.get(USER_LANG_MAP) else {
            return out;
        };
        for (key, value) in entries {
            if let Some(aliases) = lang_aliases(&value) {
                out.insert(key, aliases);
            }
        }
        out
    }

    fn flag(&self, key: &str) -> bool {
        self.source
            .get(key)
            .and_then(|value| value.as_bool())
            .unwrap_or(false)
    }
}

fn lang_aliases(value: &Value) -> Option<LangAliases> {
    let pair = value.as_array()?;
    if pair.len() != 2 {
        return None;
    }
    Some((string_list(&pair[0])?, string_list(&pair[1])?))
}

fn string_list(value: &Value) -> Option<Vec<String>> {
    value
        .as_array()?
        .iter()
        .map(|item| item.as_str().map(str::to_string))
        .collect()
}
