//! The OS data sources the switcher reconciles, as injectable capabilities.
//!
//! The macOS implementations live in `crate::sys`; tests use the fakes in
//! `switcher::testing`.

use std::fmt;
use std::rc::Rc;

use image::RgbaImage;

use crate::model::{Pid, Rect, WindowServerId};

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum AxError {
    #[error("accessibility call failed with error {0}")]
    Ax(i32),
    #[error("attribute {0} is missing")]
    Missing(&'static str),
    #[error("attribute {0} has an unexpected type")]
    WrongType(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunningApp {
    pub pid: Pid,
    pub name: String,
    /// Dock-visible activation policy; agents and background apps are not.
    pub is_regular: bool,
    pub is_frontmost: bool,
}

pub trait RunningAppsSource {
    fn running_apps(&self) -> Vec<RunningApp>;

    /// The application icon, rasterised.
    fn icon(&self, pid: Pid) -> Option<RgbaImage>;

    /// Brings the application forward. Returns false if the OS refused.
    fn activate(&self, pid: Pid) -> bool;

    fn frontmost(&self) -> Option<Pid>;
}

/// One window element from an application's accessibility tree.
pub trait AxWindowElement: fmt::Debug {
    fn title(&self) -> Result<String, AxError>;
    fn is_minimized(&self) -> Result<bool, AxError>;
    fn frame(&self) -> Result<Rect, AxError>;

    /// The window-server number when the platform can report it directly.
    fn window_server_id(&self) -> Option<WindowServerId> { None }

    fn set_minimized(&self, minimized: bool) -> Result<(), AxError>;
    fn set_main(&self) -> Result<(), AxError>;
    fn raise(&self) -> Result<(), AxError>;
    fn set_focused(&self) -> Result<(), AxError>;
}

pub type AxWindowRef = Rc<dyn AxWindowElement>;

pub trait AccessibilitySource {
    /// The windows of `pid` in the order the accessibility API reports them.
    fn windows(&self, pid: Pid) -> Result<Vec<AxWindowRef>, AxError>;

    fn focused_window(&self, pid: Pid) -> Result<Option<AxWindowRef>, AxError>;
}

/// One entry of the window server's window list.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerWindow {
    pub id: WindowServerId,
    pub pid: Pid,
    pub title: String,
    pub layer: i32,
    pub frame: Rect,
}

pub trait WindowServerSource {
    /// All normal-layer windows, including minimized and off-screen ones.
    fn snapshot(&self) -> Vec<ServerWindow>;
}

pub trait ScreenCapture {
    /// Full-resolution pixels of one window; minimized windows included.
    fn capture(&self, id: WindowServerId) -> Option<RgbaImage>;
}

/// The collaborators shared by the inventory builder and the activator.
#[derive(Clone)]
pub struct Sources {
    pub apps: Rc<dyn RunningAppsSource>,
    pub accessibility: Rc<dyn AccessibilitySource>,
    pub window_server: Rc<dyn WindowServerSource>,
    pub capture: Rc<dyn ScreenCapture>,
}
