//! Owns the switcher controller on the main thread.
//!
//! Key events arrive from the global listener and the session capture as
//! [`Command`]s, pointer input from the overlay as [`OverlayAction`]s; both go
//! through this actor's channel so the controller is only ever touched from
//! [`SwitcherActor::handle_event`].

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use tracing::{debug, info, instrument, warn};

use crate::actor::{self, permissions::Permissions};
use crate::common::config::Config;
use crate::switcher::input::{Command, InputSourceRef, Interpreter};
use crate::switcher::overlay::{OverlayAction, OverlayRef};
use crate::switcher::schedule::SchedulerRef;
use crate::switcher::{Sources, Surfaces, SwitcherController};

#[derive(Debug)]
pub enum Event {
    Command(Command),
    Overlay(OverlayAction),
    PermissionsChanged(Permissions),
    UpdateConfig(Box<Config>),
    /// Another attempt at installing the global key listener.
    RetryListener,
}

pub type Sender = actor::Sender<Event>;
pub type Receiver = actor::Receiver<Event>;

/// The main-thread surfaces the actor wires together.
pub struct Platform {
    pub overlay: OverlayRef,
    pub global_input: InputSourceRef,
    pub session_input: InputSourceRef,
    pub scheduler: SchedulerRef,
}

pub struct SwitcherActor {
    controller: SwitcherController,
    global_input: InputSourceRef,
    scheduler: SchedulerRef,
    listener_retry: Duration,
    /// Read by the global listener to interpret events synchronously.
    showing: Rc<Cell<bool>>,
    interpreter: Rc<Cell<Interpreter>>,
    permissions: Permissions,
    tx: Sender,
    rx: Receiver,
}

impl SwitcherActor {
    pub fn new(config: &Config, sources: Sources, platform: Platform, tx: Sender, rx: Receiver) -> Self {
        let command_tx = tx.clone();
        let scheduler = platform.scheduler.clone();
        let surfaces = Surfaces {
            overlay: platform.overlay,
            session_input: platform.session_input,
            scheduler: platform.scheduler,
            commands: Rc::new(move |command| command_tx.send(Event::Command(command))),
        };
        let controller = SwitcherController::new(sources, surfaces, config);
        let interpreter = Rc::new(Cell::new(controller.interpreter()));
        Self {
            controller,
            global_input: platform.global_input,
            scheduler,
            listener_retry: config.timing.permission_probe_interval(),
            showing: Rc::new(Cell::new(false)),
            interpreter,
            permissions: Permissions::default(),
            tx,
            rx,
        }
    }

    pub fn sender(&self) -> Sender { self.tx.clone() }

    pub async fn run(mut self) {
        while let Some((span, event)) = self.rx.recv().await {
            let _guard = span.enter();
            self.handle_event(event);
        }
        self.global_input.stop();
    }

    #[instrument(skip(self))]
    pub fn handle_event(&mut self, event: Event) {
        match event {
            Event::Command(command) => {
                if self.permissions.accessibility {
                    self.controller.handle_command(command);
                } else {
                    debug!(?command, "ignored until accessibility is granted");
                }
            }
            Event::Overlay(action) => self.controller.handle_overlay_action(action),
            Event::PermissionsChanged(permissions) => self.apply_permissions(permissions),
            Event::UpdateConfig(config) => {
                info!("applying new configuration");
                self.controller.apply_config(&config);
                self.interpreter.set(self.controller.interpreter());
                self.listener_retry = config.timing.permission_probe_interval();
            }
            Event::RetryListener => {
                if self.permissions.accessibility && !self.global_input.is_running() {
                    self.install_global_listener();
                }
            }
        }
        self.showing.set(self.controller.is_showing());
    }

    fn apply_permissions(&mut self, permissions: Permissions) {
        self.permissions = permissions;
        self.controller.set_live_capture(permissions.screen_recording);
        if permissions.accessibility {
            if !self.global_input.is_running() {
                self.install_global_listener();
            }
        } else if self.global_input.is_running() {
            warn!("accessibility revoked, removing key listener");
            self.controller.cancel();
            self.global_input.stop();
        }
    }

    fn install_global_listener(&self) {
        let showing = self.showing.clone();
        let interpreter = self.interpreter.clone();
        let tx = self.tx.clone();
        let installed = self.global_input.start(Box::new(move |event| {
            let (command, disposition) = interpreter.get().global(event, showing.get());
            match command {
                // Track the intent right away: the modifier may be released
                // before the actor has handled the show.
                Some(Command::ShowOrNext) => showing.set(true),
                Some(Command::Commit) => showing.set(false),
                _ => {}
            }
            if let Some(command) = command {
                tx.send(Event::Command(command));
            }
            disposition
        }));
        if installed {
            info!("key listener installed");
        } else {
            warn!(retry_in = ?self.listener_retry, "could not install key listener");
            let tx = self.tx.clone();
            self.scheduler
                .after(self.listener_retry, Box::new(move || tx.send(Event::RetryListener)));
        }
    }
}
