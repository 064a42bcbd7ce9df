use std::rc::Rc;

use crate::model::{Cursor, Inventory};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageArrow {
    Previous,
    Next,
}

/// Pointer input reported by the overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayAction {
    /// A click on cell `index` of the visible page.
    Select(usize),
    PreviousPage,
    NextPage,
}

/// The full-screen grid surface.
pub trait Overlay {
    /// Shows the overlay if needed and draws the page holding `cursor`.
    fn present(&self, inventory: &Inventory, cursor: Cursor);

    /// Press feedback for the page arrows; `None` clears it.
    fn set_pressed_arrow(&self, arrow: Option<PageArrow>);

    /// Hides the overlay and drops everything it drew from.
    fn dismiss(&self);
}

pub type OverlayRef = Rc<dyn Overlay>;
