#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;

use mdpopups_core::{
    ContextKind, HighlightError, Highlighter, JsonSettings, Layout, ManualClock, MdPopups,
    NavigateCallback, PhantomId, PopupPlacement, Region, ResourceError, ResourceLoader,
    SchemeError, SchemeLoader, SchemeTheme, ScopeStyle, TemplateError, View,
};

pub const BASE: &str = "/* base */\nhtml { margin: 0; }\n";

/// Popup shown through [`View::show_popup`].
#[derive(Clone, Debug)]
pub struct ShownPopup {
    pub html: String,
    pub location: i64,
}

#[derive(Clone, Debug)]
pub struct AddedPhantom {
    pub key: String,
    pub region: Region,
    pub html: String,
    pub layout: Layout,
}

/// In-memory view that records every call made against it.
pub struct MockView {
    pub scheme: RefCell<Option<String>>,
    pub visible: Cell<Region>,
    pub selections: RefCell<Vec<Region>>,
    pub syntax: RefCell<Option<String>>,
    pub popups: RefCell<Vec<ShownPopup>>,
    pub updates: RefCell<Vec<String>>,
    pub popup_visible: Cell<bool>,
    pub phantoms: RefCell<BTreeMap<u64, AddedPhantom>>,
    pub erased: RefCell<Vec<PhantomId>>,
    /// When set, how many more `add_phantom` calls succeed before one panics.
    pub adds_before_panic: Cell<Option<u32>>,
    next_id: Cell<u64>,
}

impl MockView {
    pub fn new(scheme: &str) -> Self {
        Self {
            scheme: RefCell::new(Some(scheme.to_string())),
            visible: Cell::new(Region::new(0, 1000)),
            selections: RefCell::new(vec![Region::point(5)]),
            syntax: RefCell::new(None),
            popups: RefCell::new(Vec::new()),
            updates: RefCell::new(Vec::new()),
            popup_visible: Cell::new(false),
            phantoms: RefCell::new(BTreeMap::new()),
            erased: RefCell::new(Vec::new()),
            adds_before_panic: Cell::new(None),
            next_id: Cell::new(1),
        }
    }

    pub fn set_scheme(&self, scheme: &str) {
        *self.scheme.borrow_mut() = Some(scheme.to_string());
    }

    /// Simulates deleting the text a phantom was attached to.
    pub fn delete_text_under(&self, id: PhantomId) {
        self.phantoms.borrow_mut().remove(&id.0);
    }

    pub fn live_phantoms(&self) -> usize {
        self.phantoms.borrow().len()
    }

    pub fn added_count(&self) -> u64 {
        self.next_id.get() - 1
    }
}

impl View for MockView {
    fn color_scheme(&self) -> Option<String> {
        self.scheme.borrow().clone()
    }

    fn font_size(&self) -> Option<f32> {
        Some(14.0)
    }

    fn visible_region(&self) -> Region {
        self.visible.get()
    }

    fn selections(&self) -> Vec<Region> {
        self.selections.borrow().clone()
    }

    fn syntax(&self) -> Option<String> {
        self.syntax.borrow().clone()
    }

    fn show_popup(&self, html: &str, placement: &PopupPlacement) {
        self.popups.borrow_mut().push(ShownPopup {
            html: html.to_string(),
            location: placement.location,
        });
        self.popup_visible.set(true);
    }

    fn update_popup(&self, html: &str) {
        self.updates.borrow_mut().push(html.to_string());
    }

    fn hide_popup(&self) {
        self.popup_visible.set(false);
    }

    fn is_popup_visible(&self) -> bool {
        self.popup_visible.get()
    }

    fn add_phantom(
        &self,
        key: &str,
        region: Region,
        html: &str,
        layout: Layout,
        _on_navigate: Option<NavigateCallback>,
    ) -> PhantomId {
        match self.adds_before_panic.get() {
            Some(0) => panic!("view rejected phantom in {}", key),
            Some(left) => self.adds_before_panic.set(Some(left - 1)),
            None => {}
        }
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        self.phantoms.borrow_mut().insert(
            id,
            AddedPhantom {
                key: key.to_string(),
                region,
                html: html.to_string(),
                layout,
            },
        );
        PhantomId(id)
    }

    fn erase_phantoms(&self, key: &str) {
        self.phantoms.borrow_mut().retain(|_, phantom| phantom.key != key);
    }

    fn erase_phantom_by_id(&self, id: PhantomId) {
        self.erased.borrow_mut().push(id);
        self.phantoms.borrow_mut().remove(&id.0);
    }

    fn query_phantom(&self, id: PhantomId) -> Region {
        self.phantoms
            .borrow()
            .get(&id.0)
            .map(|phantom| phantom.region)
            .unwrap_or(Region::DELETED)
    }
}

/// Resources served from a map, keyed by package path.
#[derive(Default)]
pub struct MapResources {
    files: BTreeMap<String, String>,
}

impl MapResources {
    pub fn new() -> Self {
        let mut resources = Self::default();
        resources.insert(mdpopups_core::BASE_CSS, BASE);
        resources.insert(mdpopups_core::DEFAULT_CSS, ".mdpopups { color: {{var.foreground}}; }\n");
        resources
    }

    pub fn insert(&mut self, path: &str, text: &str) {
        self.files.insert(path.to_string(), text.to_string());
    }
}

impl ResourceLoader for MapResources {
    fn load_binary(&self, path: &str) -> Result<Vec<u8>, ResourceError> {
        self.files
            .get(path)
            .map(|text| text.clone().into_bytes())
            .ok_or_else(|| ResourceError::NotFound {
                path: path.to_string(),
            })
    }
}

pub struct StubTheme {
    css: String,
    builtin: bool,
}

impl SchemeTheme for StubTheme {
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
        let target = match kind {
            ContextKind::Popup => "popup",
            ContextKind::Phantom => "phantom",
        };
        Ok(css
            .replace("{{var.foreground}}", "#ffffff")
            .replace("{{var.target}}", target)
            .replace("{{var.font_size}}", &format!("{}px", font_size)))
    }

    fn guess_style(
        &self,
        scope: &str,
        _selected: bool,
        _explicit_background: bool,
    ) -> Option<ScopeStyle> {
        scope.starts_with("comment").then(|| ScopeStyle {
            color: Some("#808080".to_string()),
            background: None,
            style: "italic".to_string(),
        })
    }
}

/// Counts builds per scheme. Schemes whose id starts with `broken` fail.
#[derive(Default)]
pub struct CountingLoader {
    pub scheme_builds: Rc<Cell<usize>>,
    pub highlighter_builds: Rc<Cell<usize>>,
}

impl SchemeLoader for CountingLoader {
    fn load_scheme(
        &self,
        scheme: &str,
        use_builtin_highlighter: bool,
        _resources: &dyn ResourceLoader,
    ) -> Result<Rc<dyn SchemeTheme>, SchemeError> {
        if scheme.starts_with("broken") {
            return Err(SchemeError::NotFound {
                scheme: scheme.to_string(),
            });
        }
        self.scheme_builds.set(self.scheme_builds.get() + 1);
        Ok(Rc::new(StubTheme {
            css: format!(".scheme {{ name: {}; }}\n", scheme),
            builtin: use_builtin_highlighter,
        }))
    }

    fn load_highlighter(
        &self,
        scheme: &str,
        _resources: &dyn ResourceLoader,
    ) -> Result<Rc<dyn Highlighter>, SchemeError> {
        if scheme.starts_with("broken") {
            return Err(SchemeError::NotFound {
                scheme: scheme.to_string(),
            });
        }
        self.highlighter_builds.set(self.highlighter_builds.get() + 1);
        Ok(Rc::new(Tagging("scheme")))
    }
}

/// Wraps code in a span naming the highlighter that produced it.
pub struct Tagging(pub &'static str);

impl Highlighter for Tagging {
    fn highlight(
        &self,
        src: &str,
        language: Option<&str>,
        _inline: bool,
    ) -> Result<String, HighlightError> {
        if src.contains("PANIC") {
            panic!("highlighter exploded");
        }
        Ok(format!(
            "<span class=\"{}\" data-lang=\"{}\">{}</span>",
            self.0,
            language.unwrap_or(""),
            mdpopups_core::plain_code(src, true)
        ))
    }
}

pub struct Harness {
    pub popups: MdPopups,
    pub settings: Rc<JsonSettings>,
    pub clock: Rc<ManualClock>,
    pub scheme_builds: Rc<Cell<usize>>,
    pub highlighter_builds: Rc<Cell<usize>>,
}

pub fn harness() -> Harness {
    harness_with(MapResources::new())
}

pub fn harness_with(resources: MapResources) -> Harness {
    let settings = Rc::new(JsonSettings::new());
    let clock = Rc::new(ManualClock::new());
    let loader = CountingLoader::default();
    let scheme_builds = Rc::clone(&loader.scheme_builds);
    let highlighter_builds = Rc::clone(&loader.highlighter_builds);
    let popups = MdPopups::new(
        Box::new(Rc::clone(&settings)),
        Box::new(resources),
        Box::new(loader),
        Box::new(Tagging("builtin")),
    )
    .with_clock(Box::new(Rc::clone(&clock)));
    Harness {
        popups,
        settings,
        clock,
        scheme_builds,
        highlighter_builds,
    }
}
