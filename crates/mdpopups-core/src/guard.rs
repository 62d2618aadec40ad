use crate::view::View;

/// Whether a popup anchored at `location` (or at the first caret when
/// `location < 0`) would land inside the visible viewport.
///
/// Positioning a popup off screen can destabilize the host editor, so popups
/// outside the viewport are not attempted at all.
pub fn can_show(view: &dyn View, location: i64) -> bool {
    if location >= 0 {
        return view.visible_region().contains(location);
    }
    match view.selections().first() {
        Some(selection) => view.visible_region().contains(selection.b),
        None => false,
    }
}
