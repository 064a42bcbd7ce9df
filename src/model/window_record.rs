use std::fmt;
use std::rc::Rc;

use image::RgbaImage;
use serde::{Deserialize, Serialize};

use super::geometry::Rect;

pub type Pid = i32;

/// A window-server window number. `0` means no identifier could be resolved.
#[derive(Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Clone, Copy, Default)]
#[serde(transparent)]
pub struct WindowServerId(pub u32);

impl WindowServerId {
    pub const UNRESOLVED: WindowServerId = WindowServerId(0);

    #[inline]
    pub fn new(id: u32) -> Self { Self(id) }

    #[inline]
    pub fn as_u32(self) -> u32 { self.0 }

    #[inline]
    pub fn is_resolved(self) -> bool { self.0 != 0 }
}

impl fmt::Display for WindowServerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ThumbnailKind {
    Live,
    Placeholder,
}

/// A preview bitmap, always exactly the configured target size.
#[derive(Clone, PartialEq)]
pub struct Thumbnail {
    pub image: RgbaImage,
    pub kind: ThumbnailKind,
}

impl Thumbnail {
    pub fn is_placeholder(&self) -> bool { self.kind == ThumbnailKind::Placeholder }

    pub fn width(&self) -> u32 { self.image.width() }

    pub fn height(&self) -> u32 { self.image.height() }
}

impl fmt::Debug for Thumbnail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Thumbnail")
            .field("kind", &self.kind)
            .field("size", &(self.image.width(), self.image.height()))
            .finish()
    }
}

/// One user-visible window as seen when the inventory was built.
#[derive(Debug, Clone, Serialize)]
pub struct WindowRecord {
    pub window_server_id: WindowServerId,
    pub owner_pid: Pid,
    pub owner_name: String,
    pub ax_title: String,
    pub display_title: String,
    #[serde(skip)]
    pub thumbnail: Thumbnail,
    #[serde(skip)]
    pub icon: Option<Rc<RgbaImage>>,
    pub bounds: Rect,
    pub is_minimized: bool,
}

pub const MINIMIZED_INDICATOR: &str = "\u{2193} ";

pub fn display_title(owner_name: &str, ax_title: &str, is_minimized: bool) -> String {
    let indicator = if is_minimized { MINIMIZED_INDICATOR } else { "" };
    format!("{indicator}{owner_name} - {ax_title}")
}

impl WindowRecord {
    pub fn activation_target(&self) -> ActivationTarget {
        ActivationTarget {
            window_server_id: self.window_server_id,
            owner_pid: self.owner_pid,
            owner_name: self.owner_name.clone(),
            ax_title: self.ax_title.clone(),
            is_minimized: self.is_minimized,
        }
    }
}

/// The identity of a committed selection, detached from the inventory so it
/// outlives the session that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivationTarget {
    pub window_server_id: WindowServerId,
    pub owner_pid: Pid,
    pub owner_name: String,
    pub ax_title: String,
    pub is_minimized: bool,
}
