//! The platform-independent switching engine.

pub mod activator;
pub mod controller;
pub mod input;
pub mod inventory;
pub mod overlay;
pub mod schedule;
pub mod sources;
#[cfg(test)]
pub mod testing;
pub mod thumbnail;
pub mod title_match;

pub use activator::WindowActivator;
pub use controller::{Surfaces, SwitcherController};
pub use input::{Command, Disposition, InputEvent, InputSource, Interpreter};
pub use inventory::{IconCache, InventoryBuilder};
pub use overlay::{Overlay, OverlayAction, PageArrow};
pub use schedule::Scheduler;
pub use sources::Sources;
pub use thumbnail::ThumbnailCapturer;
