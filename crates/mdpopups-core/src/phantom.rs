use std::collections::{HashMap, VecDeque};

use crate::popups::{MdPopups, RenderOptions};
use crate::view::{Layout, NavigateCallback, PhantomId, Region, View};

/// A phantom as the host describes it, without rendering flags.
#[derive(Clone, Debug)]
pub struct PlainPhantom {
    pub region: Region,
    pub content: String,
    pub layout: Layout,
    pub on_navigate: Option<NavigateCallback>,
}

impl PlainPhantom {
    pub fn new(region: Region, content: impl Into<String>, layout: Layout) -> Self {
        Self {
            region,
            content: content.into(),
            layout,
            on_navigate: None,
        }
    }
}

/// A phantom with rendering flags and, once shown, the id the view assigned.
///
/// Equality ignores `id`.
#[derive(Clone, Debug)]
pub struct Phantom {
    pub region: Region,
    pub content: String,
    pub layout: Layout,
    pub markdown: bool,
    pub css: Option<String>,
    pub on_navigate: Option<NavigateCallback>,
    pub line_breaks: bool,
    pub id: Option<PhantomId>,
}

impl Phantom {
    pub fn new(region: Region, content: impl Into<String>, layout: Layout) -> Self {
        Self {
            region,
            content: content.into(),
            layout,
            markdown: true,
            css: None,
            on_navigate: None,
            line_breaks: true,
            id: None,
        }
    }

    pub fn with_css(mut self, css: impl Into<String>) -> Self {
        self.css = Some(css.into());
        self
    }

    pub fn with_markdown(mut self, markdown: bool) -> Self {
        self.markdown = markdown;
        self
    }

    pub fn with_line_breaks(mut self, line_breaks: bool) -> Self {
        self.line_breaks = line_breaks;
        self
    }

    pub fn with_navigate(mut self, on_navigate: NavigateCallback) -> Self {
        self.on_navigate = Some(on_navigate);
        self
    }

    /// Identity used to match phantoms across updates.
    pub fn key(&self) -> PhantomKey<'_> {
        PhantomKey {
            region: self.region,
            content: &self.content,
            layout: self.layout,
            markdown: self.markdown,
            css: self.css.as_deref(),
            on_navigate: self.on_navigate.as_ref(),
            line_breaks: self.line_breaks,
        }
    }

    fn render_options(&self) -> RenderOptions {
        RenderOptions {
            markdown: self.markdown,
            css: self.css.clone(),
            line_breaks: self.line_breaks,
        }
    }
}

impl PartialEq for Phantom {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl From<PlainPhantom> for Phantom {
    fn from(plain: PlainPhantom) -> Self {
        Self {
            region: plain.region,
            content: plain.content,
            layout: plain.layout,
            markdown: false,
            css: None,
            on_navigate: plain.on_navigate,
            line_breaks: false,
            id: None,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct PhantomKey<'a> {
    region: Region,
    content: &'a str,
    layout: Layout,
    markdown: bool,
    css: Option<&'a str>,
    on_navigate: Option<&'a NavigateCallback>,
    line_breaks: bool,
}

/// A group of phantoms in one view, kept in sync with [`PhantomSet::update`].
///
/// Dropping the set erases every phantom it still owns.
pub struct PhantomSet<'a> {
    popups: &'a MdPopups,
    view: &'a dyn View,
    key: String,
    phantoms: Vec<Phantom>,
    // Ids added by an `update` that has not finished yet.
    pending: Vec<PhantomId>,
}

impl<'a> PhantomSet<'a> {
    pub fn new(popups: &'a MdPopups, view: &'a dyn View, key: impl Into<String>) -> Self {
        Self {
            popups,
            view,
            key: key.into(),
            phantoms: Vec::new(),
            pending: Vec::new(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn phantoms(&self) -> &[Phantom] {
        &self.phantoms
    }

    /// Replaces the set's phantoms with `new_phantoms`.
    ///
    /// Phantoms equal to one already shown keep its id; the rest are rendered
    /// and added. Old phantoms left unmatched are erased unless their text was
    /// already deleted. If the view panics partway, dropping the set still
    /// erases both the old phantoms and any added so far.
    pub fn update<I, P>(&mut self, new_phantoms: I)
    where
        I: IntoIterator<Item = P>,
        P: Into<Phantom>,
    {
        self.refresh_regions();

        let mut desired: Vec<Phantom> = new_phantoms.into_iter().map(Into::into).collect();
        let matches = match_old(&self.phantoms, &desired);

        let mut claimed = vec![false; self.phantoms.len()];
        for (phantom, matched) in desired.iter_mut().zip(matches) {
            match matched {
                Some(index) => {
                    claimed[index] = true;
                    phantom.id = self.phantoms[index].id;
                }
                None => {
                    phantom.id = self.add(phantom);
                    self.pending.extend(phantom.id);
                }
            }
        }

        for (phantom, claimed) in self.phantoms.iter().zip(&claimed) {
            if *claimed || phantom.region == Region::DELETED {
                continue;
            }
            if let Some(id) = phantom.id {
                self.view.erase_phantom_by_id(id);
            }
        }

        self.phantoms = desired;
        self.pending.clear();
    }

    /// Writes the view's current regions back onto the held phantoms.
    fn refresh_regions(&mut self) {
        let ids: Vec<PhantomId> = self.phantoms.iter().filter_map(|phantom| phantom.id).collect();
        if ids.is_empty() {
            return;
        }
        let mut regions = self.view.query_phantoms(&ids).into_iter();
        for phantom in self.phantoms.iter_mut().filter(|phantom| phantom.id.is_some()) {
            match regions.next() {
                Some(region) => phantom.region = region,
                None => break,
            }
        }
    }

    fn add(&self, phantom: &Phantom) -> Option<PhantomId> {
        self.popups.add_phantom(
            self.view,
            &self.key,
            phantom.region,
            &phantom.content,
            phantom.layout,
            &phantom.render_options(),
            phantom.on_navigate.clone(),
        )
    }
}

/// For each desired phantom, the index of an equal old phantom it can take
/// over. Each old phantom is handed out at most once, oldest first.
fn match_old(old: &[Phantom], desired: &[Phantom]) -> Vec<Option<usize>> {
    let mut unclaimed: HashMap<PhantomKey<'_>, VecDeque<usize>> = HashMap::new();
    for (index, phantom) in old.iter().enumerate() {
        unclaimed.entry(phantom.key()).or_default().push_back(index);
    }
    desired
        .iter()
        .map(|phantom| unclaimed.get_mut(&phantom.key()).and_then(VecDeque::pop_front))
        .collect()
}

impl Drop for PhantomSet<'_> {
    fn drop(&mut self) {
        let held = self.phantoms.iter().filter_map(|phantom| phantom.id);
        for id in held.chain(self.pending.drain(..)) {
            self.view.erase_phantom_by_id(id);
        }
    }
}
