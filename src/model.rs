pub mod cursor;
pub mod geometry;
pub mod inventory;
pub mod window_record;

pub use cursor::{Cursor, Paging, SwitcherState};
pub use geometry::{Point, Rect, Size};
pub use inventory::{Inventory, PAGE_CAPACITY};
pub use window_record::{
    ActivationTarget, MINIMIZED_INDICATOR, Pid, Thumbnail, ThumbnailKind, WindowRecord,
    WindowServerId, display_title,
};
