//! The show/navigate/commit cycle.
//!
//! Everything that belongs to one cycle (the inventory with its thumbnails,
//! the icon cache, the session key capture) lives in [`Session`] and is
//! dropped when the overlay hides. Only the committed activation target
//! outlives it.

use std::time::Duration;

use tracing::{debug, info, instrument, warn};

use crate::common::config::{Config, TimingSettings};
use crate::model::{Cursor, Inventory, Paging, SwitcherState};
use crate::switcher::activator::WindowActivator;
use crate::switcher::input::{Command, CommandSink, InputSourceRef, Interpreter};
use crate::switcher::inventory::{IconCache, InventoryBuilder};
use crate::switcher::overlay::{OverlayAction, OverlayRef, PageArrow};
use crate::switcher::schedule::SchedulerRef;
use crate::switcher::sources::Sources;
use crate::switcher::thumbnail::{TargetSize, ThumbnailCapturer};

/// How long a pressed page arrow stays highlighted.
pub const ARROW_FEEDBACK: Duration = Duration::from_millis(150);

struct Session {
    inventory: Inventory,
    icons: IconCache,
}

/// Platform surfaces the controller drives.
pub struct Surfaces {
    pub overlay: OverlayRef,
    pub session_input: InputSourceRef,
    pub scheduler: SchedulerRef,
    /// Receives commands decoded from the session key capture.
    pub commands: CommandSink,
}

pub struct SwitcherController {
    builder: InventoryBuilder,
    activator: WindowActivator,
    surfaces: Surfaces,
    interpreter: Interpreter,
    timing: TimingSettings,
    state: SwitcherState,
    session: Option<Session>,
}

impl SwitcherController {
    pub fn new(sources: Sources, surfaces: Surfaces, config: &Config) -> Self {
        let capturer = ThumbnailCapturer::new(
            sources.capture.clone(),
            TargetSize::new(config.thumbnail.width, config.thumbnail.height),
        );
        let activator =
            WindowActivator::new(sources.clone(), surfaces.scheduler.clone(), config.timing);
        Self {
            builder: InventoryBuilder::new(sources, capturer),
            activator,
            surfaces,
            interpreter: Interpreter::new(config.trigger, config.minimize),
            timing: config.timing,
            state: SwitcherState::Hidden,
            session: None,
        }
    }

    pub fn state(&self) -> SwitcherState { self.state }

    pub fn is_showing(&self) -> bool { self.state.is_showing() }

    pub fn cursor(&self) -> Option<Cursor> { self.state.cursor() }

    pub fn inventory(&self) -> Option<&Inventory> { self.session.as_ref().map(|s| &s.inventory) }

    pub fn interpreter(&self) -> Interpreter { self.interpreter }

    pub fn cached_icon_count(&self) -> usize { self.session.as_ref().map_or(0, |s| s.icons.len()) }

    pub fn set_live_capture(&self, enabled: bool) {
        self.builder.capturer().set_live_enabled(enabled);
    }

    pub fn apply_config(&mut self, config: &Config) {
        if self.is_showing() {
            info!("configuration changed while showing, closing switcher");
            self.cancel();
        }
        self.interpreter = Interpreter::new(config.trigger, config.minimize);
        self.timing = config.timing;
        self.builder
            .capturer()
            .set_target(TargetSize::new(config.thumbnail.width, config.thumbnail.height));
        self.activator.set_timing(config.timing);
    }

    pub fn handle_command(&mut self, command: Command) {
        match command {
            Command::ShowOrNext => self.show(),
            Command::Next => self.select_next(),
            Command::Previous => self.select_previous(),
            Command::NextPage => self.go_to_next_page(),
            Command::PreviousPage => self.go_to_previous_page(),
            Command::Commit => self.hide(),
            Command::Cancel => self.cancel(),
            Command::MinimizeFrontmost => {
                if !self.is_showing() {
                    self.activator.minimize_frontmost();
                }
            }
        }
    }

    pub fn handle_overlay_action(&mut self, action: OverlayAction) {
        match action {
            OverlayAction::Select(index) => self.select_by_click(index),
            OverlayAction::PreviousPage => {
                self.go_to_previous_page();
                self.flash_arrow(PageArrow::Previous);
            }
            OverlayAction::NextPage => {
                self.go_to_next_page();
                self.flash_arrow(PageArrow::Next);
            }
        }
    }

    #[instrument(skip(self))]
    pub fn show(&mut self) {
        if self.is_showing() {
            self.select_next();
            return;
        }
        let mut icons = IconCache::default();
        let inventory = self.builder.build(&mut icons);
        if inventory.len() < 2 {
            debug!(windows = inventory.len(), "nothing to switch to");
            return;
        }
        let cursor = Cursor::initial(inventory.paging());
        self.state = SwitcherState::Showing(cursor);
        self.surfaces.overlay.present(&inventory, cursor);
        self.session = Some(Session { inventory, icons });
        self.start_session_input();
    }

    pub fn select_next(&mut self) { self.move_cursor(Cursor::next) }

    pub fn select_previous(&mut self) { self.move_cursor(Cursor::previous) }

    pub fn go_to_page(&mut self, page: usize) {
        self.move_cursor(|cursor, paging| cursor.go_to_page(page, paging))
    }

    pub fn go_to_next_page(&mut self) { self.move_cursor(Cursor::next_page) }

    pub fn go_to_previous_page(&mut self) { self.move_cursor(Cursor::previous_page) }

    /// Selects a cell of the visible page and commits it.
    pub fn select_by_click(&mut self, index: usize) {
        let (Some(cursor), Some(paging)) = (self.cursor(), self.paging()) else {
            return;
        };
        let Some(selected) = cursor.select(index, paging) else {
            debug!(index, "click outside the page");
            return;
        };
        self.state = SwitcherState::Showing(selected);
        self.hide();
    }

    /// Closes the overlay and activates the selected window once it is gone.
    #[instrument(skip(self))]
    pub fn hide(&mut self) {
        let Some(cursor) = self.cursor() else {
            return;
        };
        let target = self
            .inventory()
            .and_then(|inventory| inventory.get(cursor))
            .map(|record| record.activation_target());
        self.teardown();
        match target {
            Some(target) => {
                debug!(title = %target.ax_title, "committing");
                let activator = self.activator.clone();
                self.surfaces
                    .scheduler
                    .after(self.timing.commit_delay(), Box::new(move || activator.activate(target)));
            }
            None => warn!(?cursor, "cursor does not point at a window"),
        }
    }

    /// Closes the overlay without activating anything.
    #[instrument(skip(self))]
    pub fn cancel(&mut self) {
        if self.is_showing() {
            self.teardown();
        }
    }

    fn teardown(&mut self) {
        self.surfaces.session_input.stop();
        self.surfaces.overlay.dismiss();
        self.session = None;
        self.state = SwitcherState::Hidden;
    }

    fn paging(&self) -> Option<Paging> { self.inventory().map(Inventory::paging) }

    fn move_cursor(&mut self, step: impl FnOnce(Cursor, Paging) -> Cursor) {
        let (Some(cursor), Some(session)) = (self.cursor(), self.session.as_ref()) else {
            return;
        };
        let next = step(cursor, session.inventory.paging());
        if next != cursor {
            self.state = SwitcherState::Showing(next);
            self.surfaces.overlay.present(&session.inventory, next);
        }
    }

    fn flash_arrow(&self, arrow: PageArrow) {
        if !self.is_showing() {
            return;
        }
        self.surfaces.overlay.set_pressed_arrow(Some(arrow));
        let overlay = self.surfaces.overlay.clone();
        self.surfaces
            .scheduler
            .after(ARROW_FEEDBACK, Box::new(move || overlay.set_pressed_arrow(None)));
    }

    fn start_session_input(&self) {
        let interpreter = self.interpreter;
        let commands = self.surfaces.commands.clone();
        let started = self.surfaces.session_input.start(Box::new(move |event| {
            let (command, disposition) = interpreter.session(event);
            if let Some(command) = command {
                commands(command);
            }
            disposition
        }));
        if !started {
            warn!("session key capture unavailable");
        }
    }
}
