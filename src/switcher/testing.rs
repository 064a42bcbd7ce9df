//! In-memory stand-ins for the OS capabilities, sharing one call log so tests
//! can assert on the order of side effects.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;

use image::{Rgba, RgbaImage};

use crate::common::collections::HashMap;
use crate::model::{Cursor, Inventory, Pid, Rect, WindowServerId};
use crate::switcher::input::{Disposition, InputEvent, InputHandler, InputSource};
use crate::switcher::overlay::{Overlay, PageArrow};
use crate::switcher::schedule::{Scheduler, Task};
use crate::switcher::sources::{
    AccessibilitySource, AxError, AxWindowElement, AxWindowRef, RunningApp, RunningAppsSource,
    ScreenCapture, ServerWindow, Sources, WindowServerSource,
};

#[derive(Debug, Clone, Default)]
pub struct CallLog(Rc<RefCell<Vec<String>>>);

impl CallLog {
    pub fn push(&self, entry: impl Into<String>) { self.0.borrow_mut().push(entry.into()) }

    pub fn entries(&self) -> Vec<String> { self.0.borrow().clone() }

    pub fn position(&self, entry: &str) -> Option<usize> {
        self.0.borrow().iter().position(|e| e == entry)
    }
}

pub struct FakeApps {
    log: CallLog,
    apps: RefCell<Vec<RunningApp>>,
    icons: RefCell<HashMap<Pid, RgbaImage>>,
    pub icon_loads: Cell<usize>,
}

impl FakeApps {
    pub fn new(log: CallLog) -> Self {
        Self {
            log,
            apps: RefCell::default(),
            icons: RefCell::default(),
            icon_loads: Cell::new(0),
        }
    }

    pub fn add(&self, app: RunningApp) { self.apps.borrow_mut().push(app) }

    pub fn set_icon(&self, pid: Pid, icon: RgbaImage) { self.icons.borrow_mut().insert(pid, icon); }

    pub fn set_frontmost(&self, pid: Pid) {
        for app in self.apps.borrow_mut().iter_mut() {
            app.is_frontmost = app.pid == pid;
        }
    }
}

impl RunningAppsSource for FakeApps {
    fn running_apps(&self) -> Vec<RunningApp> { self.apps.borrow().clone() }

    fn icon(&self, pid: Pid) -> Option<RgbaImage> {
        self.icon_loads.set(self.icon_loads.get() + 1);
        self.icons.borrow().get(&pid).cloned()
    }

    fn activate(&self, pid: Pid) -> bool {
        self.log.push(format!("activate {pid}"));
        self.set_frontmost(pid);
        true
    }

    fn frontmost(&self) -> Option<Pid> {
        self.apps.borrow().iter().find(|a| a.is_frontmost).map(|a| a.pid)
    }
}

#[derive(Debug)]
pub struct FakeWindow {
    log: CallLog,
    pub title: RefCell<String>,
    pub minimized: Cell<bool>,
    pub frame: Rect,
    pub direct_id: Option<WindowServerId>,
    /// Ignores requests to unminimize, as a hung application would.
    pub stuck_minimized: Cell<bool>,
}

impl FakeWindow {
    pub fn new(log: CallLog, title: &str, frame: Rect) -> Self {
        Self {
            log,
            title: RefCell::new(title.to_string()),
            minimized: Cell::new(false),
            frame,
            direct_id: None,
            stuck_minimized: Cell::new(false),
        }
    }

    fn record(&self, action: &str) { self.log.push(format!("{action} {}", self.title.borrow())) }
}

impl AxWindowElement for FakeWindow {
    fn title(&self) -> Result<String, AxError> { Ok(self.title.borrow().clone()) }

    fn is_minimized(&self) -> Result<bool, AxError> { Ok(self.minimized.get()) }

    fn frame(&self) -> Result<Rect, AxError> { Ok(self.frame) }

    fn window_server_id(&self) -> Option<WindowServerId> { self.direct_id }

    fn set_minimized(&self, minimized: bool) -> Result<(), AxError> {
        self.record(if minimized { "minimize" } else { "unminimize" });
        if minimized || !self.stuck_minimized.get() {
            self.minimized.set(minimized);
        }
        Ok(())
    }

    fn set_main(&self) -> Result<(), AxError> {
        self.record("main");
        Ok(())
    }

    fn raise(&self) -> Result<(), AxError> {
        self.record("raise");
        Ok(())
    }

    fn set_focused(&self) -> Result<(), AxError> {
        self.record("focus");
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeAccessibility {
    windows: RefCell<HashMap<Pid, Vec<Rc<FakeWindow>>>>,
    focused: RefCell<HashMap<Pid, Rc<FakeWindow>>>,
    failing: RefCell<Vec<Pid>>,
}

impl FakeAccessibility {
    pub fn add(&self, pid: Pid, window: Rc<FakeWindow>) {
        self.windows.borrow_mut().entry(pid).or_default().push(window);
    }

    pub fn set_focused(&self, pid: Pid, window: Rc<FakeWindow>) {
        self.focused.borrow_mut().insert(pid, window);
    }

    pub fn fail_for(&self, pid: Pid) { self.failing.borrow_mut().push(pid) }
}

impl AccessibilitySource for FakeAccessibility {
    fn windows(&self, pid: Pid) -> Result<Vec<AxWindowRef>, AxError> {
        if self.failing.borrow().contains(&pid) {
            return Err(AxError::Ax(-25204));
        }
        Ok(self
            .windows
            .borrow()
            .get(&pid)
            .map(|ws| ws.iter().map(|w| w.clone() as AxWindowRef).collect())
            .unwrap_or_default())
    }

    fn focused_window(&self, pid: Pid) -> Result<Option<AxWindowRef>, AxError> {
        Ok(self.focused.borrow().get(&pid).map(|w| w.clone() as AxWindowRef))
    }
}

#[derive(Default)]
pub struct FakeWindowServer {
    windows: RefCell<Vec<ServerWindow>>,
    pub snapshots: Cell<usize>,
}

impl FakeWindowServer {
    pub fn add(&self, id: u32, pid: Pid, title: &str, frame: Rect) {
        self.windows.borrow_mut().push(ServerWindow {
            id: WindowServerId::new(id),
            pid,
            title: title.to_string(),
            layer: 0,
            frame,
        });
    }
}

impl WindowServerSource for FakeWindowServer {
    fn snapshot(&self) -> Vec<ServerWindow> {
        self.snapshots.set(self.snapshots.get() + 1);
        self.windows.borrow().clone()
    }
}

#[derive(Clone, Default)]
pub struct FakeCapture {
    images: Rc<RefCell<HashMap<u32, RgbaImage>>>,
    requests: Rc<RefCell<Vec<WindowServerId>>>,
}

impl FakeCapture {
    pub fn insert(&self, id: u32, image: RgbaImage) { self.images.borrow_mut().insert(id, image); }

    pub fn requests(&self) -> Vec<WindowServerId> { self.requests.borrow().clone() }
}

impl ScreenCapture for FakeCapture {
    fn capture(&self, id: WindowServerId) -> Option<RgbaImage> {
        self.requests.borrow_mut().push(id);
        self.images.borrow().get(&id.as_u32()).cloned()
    }
}

pub struct FakeInput {
    name: &'static str,
    log: CallLog,
    handler: RefCell<Option<InputHandler>>,
    running: Cell<bool>,
    /// Makes `start` fail, as a tap creation refused by the system would.
    pub refuse_start: Cell<bool>,
}

impl FakeInput {
    pub fn new(name: &'static str, log: CallLog) -> Self {
        Self {
            name,
            log,
            handler: RefCell::new(None),
            running: Cell::new(false),
            refuse_start: Cell::new(false),
        }
    }

    /// Delivers `event` to the installed handler. `None` when not running.
    pub fn feed(&self, event: InputEvent) -> Option<Disposition> {
        if !self.running.get() {
            return None;
        }
        let mut handler = self.handler.borrow_mut().take()?;
        let disposition = handler(&event);
        if self.running.get() && self.handler.borrow().is_none() {
            *self.handler.borrow_mut() = Some(handler);
        }
        Some(disposition)
    }
}

impl InputSource for FakeInput {
    fn start(&self, handler: InputHandler) -> bool {
        if self.refuse_start.get() {
            self.log.push(format!("{} start failed", self.name));
            return false;
        }
        self.log.push(format!("{} start", self.name));
        *self.handler.borrow_mut() = Some(handler);
        self.running.set(true);
        true
    }

    fn stop(&self) {
        if self.running.replace(false) {
            self.log.push(format!("{} stop", self.name));
        }
        self.handler.borrow_mut().take();
    }

    fn is_running(&self) -> bool { self.running.get() }
}

pub struct FakeOverlay {
    log: CallLog,
    pub presented: RefCell<Vec<(Cursor, usize)>>,
    pub arrow: Cell<Option<PageArrow>>,
    pub visible: Cell<bool>,
}

impl FakeOverlay {
    pub fn new(log: CallLog) -> Self {
        Self {
            log,
            presented: RefCell::default(),
            arrow: Cell::new(None),
            visible: Cell::new(false),
        }
    }

    pub fn last_cursor(&self) -> Option<Cursor> { self.presented.borrow().last().map(|(c, _)| *c) }
}

impl Overlay for FakeOverlay {
    fn present(&self, inventory: &Inventory, cursor: Cursor) {
        if !self.visible.replace(true) {
            self.log.push("overlay show");
        }
        self.presented.borrow_mut().push((cursor, inventory.len()));
    }

    fn set_pressed_arrow(&self, arrow: Option<PageArrow>) { self.arrow.set(arrow) }

    fn dismiss(&self) {
        if self.visible.replace(false) {
            self.log.push("overlay hide");
        }
    }
}

/// Holds deferred tasks until the test runs them.
#[derive(Clone, Default)]
pub struct ManualScheduler {
    queue: Rc<RefCell<VecDeque<(Duration, Task)>>>,
    pub delays: Rc<RefCell<Vec<Duration>>>,
}

impl ManualScheduler {
    pub fn pending(&self) -> usize { self.queue.borrow().len() }

    pub fn run_next(&self) -> bool {
        let next = self.queue.borrow_mut().pop_front();
        match next {
            Some((_, task)) => {
                task();
                true
            }
            None => false,
        }
    }

    pub fn run_all(&self) {
        let mut budget = 10_000;
        while self.run_next() {
            budget -= 1;
            assert!(budget > 0, "scheduled tasks keep rescheduling themselves");
        }
    }
}

impl Scheduler for ManualScheduler {
    fn after(&self, delay: Duration, task: Task) {
        self.delays.borrow_mut().push(delay);
        self.queue.borrow_mut().push_back((delay, task));
    }
}

/// A small desktop assembled from the fakes above.
pub struct Fixture {
    pub log: CallLog,
    pub apps: Rc<FakeApps>,
    pub ax: Rc<FakeAccessibility>,
    pub server: Rc<FakeWindowServer>,
    pub capture: FakeCapture,
    pub scheduler: ManualScheduler,
}

impl Fixture {
    pub fn new() -> Self {
        let log = CallLog::default();
        Self {
            apps: Rc::new(FakeApps::new(log.clone())),
            ax: Rc::default(),
            server: Rc::default(),
            capture: FakeCapture::default(),
            scheduler: ManualScheduler::default(),
            log,
        }
    }

    pub fn sources(&self) -> Sources {
        Sources {
            apps: self.apps.clone(),
            accessibility: self.ax.clone(),
            window_server: self.server.clone(),
            capture: Rc::new(self.capture.clone()),
        }
    }

    pub fn app(&self, pid: Pid, name: &str) {
        self.apps.add(RunningApp {
            pid,
            name: name.to_string(),
            is_regular: true,
            is_frontmost: false,
        });
        self.apps.set_icon(pid, RgbaImage::from_pixel(32, 32, Rgba([pid as u8, 0, 0, 255])));
    }

    /// Adds a window known to both the accessibility tree and the window
    /// server under the same title, with a capturable surface.
    pub fn window(&self, pid: Pid, id: u32, title: &str, width: f64, height: f64) -> Rc<FakeWindow> {
        let frame = Rect::new(0.0, 0.0, width, height);
        let window = Rc::new(FakeWindow::new(self.log.clone(), title, frame));
        self.ax.add(pid, window.clone());
        self.server.add(id, pid, title, frame);
        self.capture
            .insert(id, RgbaImage::from_pixel(width as u32, height as u32, Rgba([9, 9, 9, 255])));
        window
    }
}
