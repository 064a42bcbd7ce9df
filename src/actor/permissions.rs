//! Waits for the accessibility and screen-recording grants.
//!
//! Nothing that reads other applications' windows may run before
//! accessibility is granted, so the gate re-probes on a timer and tells the
//! switcher actor whenever the picture changes.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use serde::Serialize;
use tracing::{info, warn};

use crate::actor::switcher::{self, Event};
use crate::switcher::schedule::SchedulerRef;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Permissions {
    pub accessibility: bool,
    pub screen_recording: bool,
}

impl Permissions {
    pub fn all_granted(&self) -> bool { self.accessibility && self.screen_recording }
}

pub trait PermissionProbe {
    fn accessibility(&self) -> bool;
    fn screen_recording(&self) -> bool;
    /// Shows the system prompt for accessibility access.
    fn request_accessibility(&self);
    /// Shows the system prompt for screen-recording access.
    fn request_screen_recording(&self);
}

#[derive(Clone)]
pub struct PermissionGate {
    inner: Rc<Inner>,
}

struct Inner {
    probe: Rc<dyn PermissionProbe>,
    scheduler: SchedulerRef,
    interval: Duration,
    switcher_tx: switcher::Sender,
    last: Cell<Option<Permissions>>,
    prompted: Cell<bool>,
}

impl PermissionGate {
    pub fn new(
        probe: Rc<dyn PermissionProbe>,
        scheduler: SchedulerRef,
        interval: Duration,
        switcher_tx: switcher::Sender,
    ) -> Self {
        Self {
            inner: Rc::new(Inner {
                probe,
                scheduler,
                interval,
                switcher_tx,
                last: Cell::new(None),
                prompted: Cell::new(false),
            }),
        }
    }

    pub fn current(&self) -> Option<Permissions> { self.inner.last.get() }

    /// Probes now and keeps probing until everything is granted.
    pub fn start(&self) { self.check() }

    fn check(&self) {
        let inner = &self.inner;
        let now = Permissions {
            accessibility: inner.probe.accessibility(),
            screen_recording: inner.probe.screen_recording(),
        };

        if !inner.prompted.replace(true) {
            if !now.accessibility {
                warn!("accessibility access is required; waiting for it to be granted");
                inner.probe.request_accessibility();
            }
            if !now.screen_recording {
                warn!("screen recording is not granted; previews will show app icons only");
                inner.probe.request_screen_recording();
            }
        }

        if inner.last.get() != Some(now) {
            info!(?now, "permissions changed");
            inner.last.set(Some(now));
            inner.switcher_tx.send(Event::PermissionsChanged(now));
        }

        if !now.all_granted() {
            let this = self.clone();
            inner.scheduler.after(inner.interval, Box::new(move || this.check()));
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use test_log::test;

    use super::*;
    use crate::actor;
    use crate::switcher::testing::ManualScheduler;

    #[derive(Default)]
    struct FakeProbe {
        accessibility: Cell<bool>,
        screen_recording: Cell<bool>,
        prompts: Cell<usize>,
    }

    impl PermissionProbe for FakeProbe {
        fn accessibility(&self) -> bool { self.accessibility.get() }

        fn screen_recording(&self) -> bool { self.screen_recording.get() }

        fn request_accessibility(&self) { self.prompts.set(self.prompts.get() + 1) }

        fn request_screen_recording(&self) { self.prompts.set(self.prompts.get() + 1) }
    }

    fn drain(rx: &mut switcher::Receiver) -> Vec<Permissions> {
        let mut seen = Vec::new();
        while let Ok((_, event)) = rx.try_recv() {
            if let Event::PermissionsChanged(p) = event {
                seen.push(p);
            }
        }
        seen
    }

    #[test]
    fn reprobes_until_granted() {
        let probe = Rc::new(FakeProbe::default());
        let scheduler = ManualScheduler::default();
        let (tx, mut rx) = actor::channel();
        let gate = PermissionGate::new(
            probe.clone(),
            Rc::new(scheduler.clone()),
            Duration::from_secs(2),
            tx,
        );

        gate.start();
        assert_eq!(drain(&mut rx), vec![Permissions::default()]);
        assert_eq!(probe.prompts.get(), 2);
        assert_eq!(scheduler.pending(), 1);

        // Unchanged state is not re-announced.
        scheduler.run_next();
        assert_eq!(drain(&mut rx), vec![]);

        probe.accessibility.set(true);
        scheduler.run_next();
        assert_eq!(
            drain(&mut rx),
            vec![Permissions { accessibility: true, screen_recording: false }]
        );

        probe.screen_recording.set(true);
        scheduler.run_next();
        assert_eq!(drain(&mut rx), vec![Permissions { accessibility: true, screen_recording: true }]);
        assert_eq!(scheduler.pending(), 0);
        assert_eq!(probe.prompts.get(), 2);
    }

    #[test]
    fn granted_from_the_start_probes_once() {
        let probe = Rc::new(FakeProbe::default());
        probe.accessibility.set(true);
        probe.screen_recording.set(true);
        let scheduler = ManualScheduler::default();
        let (tx, mut rx) = actor::channel();
        let gate =
            PermissionGate::new(probe.clone(), Rc::new(scheduler.clone()), Duration::from_secs(2), tx);

        gate.start();
        assert_eq!(drain(&mut rx).len(), 1);
        assert_eq!(scheduler.pending(), 0);
        assert_eq!(probe.prompts.get(), 0);
        assert_eq!(gate.current().map(|p| p.all_granted()), Some(true));
    }
}
