use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

/// A document range. `a` is the anchor, `b` the active end.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct Region {
    pub a: i64,
    pub b: i64,
}

impl Region {
    /// Region reported for a phantom whose text has been deleted.
    pub const DELETED: Region = Region { a: -1, b: -1 };

    pub fn new(a: i64, b: i64) -> Self {
        Self { a, b }
    }

    pub fn point(pt: i64) -> Self {
        Self { a: pt, b: pt }
    }

    pub fn begin(&self) -> i64 {
        self.a.min(self.b)
    }

    pub fn end(&self) -> i64 {
        self.a.max(self.b)
    }

    pub fn contains(&self, pt: i64) -> bool {
        self.begin() <= pt && pt <= self.end()
    }
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Layout {
    Inline,
    Below,
    Block,
}

/// Opaque phantom handle assigned by the view.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct PhantomId(pub u64);

/// Link navigation handler. Two callbacks are equal only when they are the
/// same allocation.
#[derive(Clone)]
pub struct NavigateCallback(Rc<dyn Fn(&str)>);

impl NavigateCallback {
    pub fn new(callback: impl Fn(&str) + 'static) -> Self {
        Self(Rc::new(callback))
    }

    pub fn call(&self, href: &str) {
        (self.0)(href)
    }

    fn addr(&self) -> *const () {
        Rc::as_ptr(&self.0) as *const ()
    }
}

impl PartialEq for NavigateCallback {
    fn eq(&self, other: &Self) -> bool {
        self.addr() == other.addr()
    }
}

impl Eq for NavigateCallback {}

impl Hash for NavigateCallback {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.addr().hash(state);
    }
}

impl fmt::Debug for NavigateCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NavigateCallback({:p})", self.addr())
    }
}

#[derive(Clone)]
pub struct HideCallback(Rc<dyn Fn()>);

impl HideCallback {
    pub fn new(callback: impl Fn() + 'static) -> Self {
        Self(Rc::new(callback))
    }

    pub fn call(&self) {
        (self.0)()
    }
}

impl fmt::Debug for HideCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("HideCallback")
    }
}

/// Display parameters handed to [`View::show_popup`].
#[derive(Clone, Debug)]
pub struct PopupPlacement {
    pub flags: u32,
    /// Document point to anchor at, or `-1` for the caret.
    pub location: i64,
    pub max_width: u32,
    pub max_height: u32,
    pub on_navigate: Option<NavigateCallback>,
    pub on_hide: Option<HideCallback>,
}

impl Default for PopupPlacement {
    fn default() -> Self {
        Self {
            flags: 0,
            location: -1,
            max_width: 320,
            max_height: 240,
            on_navigate: None,
            on_hide: None,
        }
    }
}

/// The slice of the host editor's view API this crate consumes.
pub trait View {
    fn color_scheme(&self) -> Option<String>;

    fn font_size(&self) -> Option<f32>;

    fn visible_region(&self) -> Region;

    fn selections(&self) -> Vec<Region>;

    /// Path of the syntax definition, e.g. `Packages/Python/Python.sublime-syntax`.
    fn syntax(&self) -> Option<String>;

    fn show_popup(&self, html: &str, placement: &PopupPlacement);

    fn update_popup(&self, html: &str);

    fn hide_popup(&self);

    fn is_popup_visible(&self) -> bool;

    fn add_phantom(
        &self,
        key: &str,
        region: Region,
        html: &str,
        layout: Layout,
        on_navigate: Option<NavigateCallback>,
    ) -> PhantomId;

    fn erase_phantoms(&self, key: &str);

    fn erase_phantom_by_id(&self, id: PhantomId);

    /// Current region of a phantom, or [`Region::DELETED`] if its text is gone.
    fn query_phantom(&self, id: PhantomId) -> Region;

    fn query_phantoms(&self, ids: &[PhantomId]) -> Vec<Region> {
        ids.iter().map(|id| self.query_phantom(*id)).collect()
    }
}
