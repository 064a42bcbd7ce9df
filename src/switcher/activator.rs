//! Raises and focuses the window picked in the switcher.
//!
//! Activation works from the identity captured at commit time; the inventory
//! is gone by then. Minimized windows are restored before their application is
//! activated, since activating first lets the app bring a different window
//! forward. Each wait between steps is a deferred callback on the scheduler.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use tracing::{debug, info, instrument, warn};

use crate::common::collections::HashMap;
use crate::common::config::{SettleMode, TimingSettings};
use crate::model::{ActivationTarget, Pid, WindowServerId};
use crate::switcher::schedule::SchedulerRef;
use crate::switcher::sources::{AxWindowRef, Sources};
use crate::switcher::title_match::{TitleMatcher, title_contains_either};

#[derive(Clone)]
pub struct WindowActivator {
    inner: Rc<Inner>,
}

struct Inner {
    sources: Sources,
    scheduler: SchedulerRef,
    timing: Cell<TimingSettings>,
}

/// A wait between two activation steps.
struct Settle {
    what: &'static str,
    fixed: Duration,
    done: Box<dyn Fn() -> bool>,
    then: Box<dyn FnOnce()>,
}

impl WindowActivator {
    pub fn new(sources: Sources, scheduler: SchedulerRef, timing: TimingSettings) -> Self {
        Self {
            inner: Rc::new(Inner {
                sources,
                scheduler,
                timing: Cell::new(timing),
            }),
        }
    }

    pub fn set_timing(&self, timing: TimingSettings) { self.inner.timing.set(timing) }

    #[instrument(skip_all, fields(pid = target.owner_pid, title = %target.ax_title))]
    pub fn activate(&self, target: ActivationTarget) {
        let Some(window) = self.locate(&target) else {
            warn!(id = %target.window_server_id, "selected window is gone");
            return;
        };
        let apps = self.inner.sources.apps.clone();
        let pid = target.owner_pid;

        if !target.is_minimized {
            focus_window(&window);
            if !apps.activate(pid) {
                debug!("application refused activation");
            }
            return;
        }

        if let Err(err) = window.set_minimized(false) {
            warn!(%err, "could not unminimize");
        }
        let timing = self.inner.timing.get();
        let this = self.clone();
        let restored = window.clone();
        self.settle(Settle {
            what: "unminimize",
            fixed: timing.unminimize_settle(),
            done: Box::new(move || matches!(restored.is_minimized(), Ok(false))),
            then: Box::new(move || {
                if !apps.activate(pid) {
                    debug!("application refused activation");
                }
                let frontmost = apps.clone();
                this.settle(Settle {
                    what: "activate",
                    fixed: timing.activate_settle(),
                    done: Box::new(move || frontmost.frontmost() == Some(pid)),
                    then: Box::new(move || focus_window(&window)),
                });
            }),
        });
    }

    /// Minimizes the focused window of the frontmost application.
    #[instrument(skip(self))]
    pub fn minimize_frontmost(&self) {
        let Some(pid) = self.inner.sources.apps.frontmost() else {
            debug!("no frontmost application");
            return;
        };
        match self.inner.sources.accessibility.focused_window(pid) {
            Ok(Some(window)) => {
                if let Err(err) = window.set_minimized(true) {
                    warn!(pid, %err, "could not minimize");
                }
            }
            Ok(None) => debug!(pid, "frontmost application has no focused window"),
            Err(err) => debug!(pid, %err, "focused window unavailable"),
        }
    }

    fn settle(&self, settle: Settle) {
        let timing = self.inner.timing.get();
        match timing.settle {
            SettleMode::Fixed => {
                let then = settle.then;
                self.inner.scheduler.after(settle.fixed, then);
            }
            SettleMode::Poll => {
                let interval = timing.poll_interval().max(Duration::from_millis(1));
                let attempts = (timing.poll_timeout().as_millis() / interval.as_millis()).max(1);
                self.poll(settle, interval, 1, attempts as u32);
            }
        }
    }

    fn poll(&self, settle: Settle, interval: Duration, attempt: u32, attempts: u32) {
        let this = self.clone();
        self.inner.scheduler.after(
            interval,
            Box::new(move || {
                if (settle.done)() {
                    debug!(what = settle.what, attempt, "settled");
                    (settle.then)();
                } else if attempt >= attempts {
                    info!(what = settle.what, attempts, "gave up waiting, continuing");
                    (settle.then)();
                } else {
                    this.poll(settle, interval, attempt + 1, attempts);
                }
            }),
        );
    }

    /// Finds the live accessibility handle for `target`: by window-server id
    /// through a fresh snapshot, then by title.
    fn locate(&self, target: &ActivationTarget) -> Option<AxWindowRef> {
        let sources = &self.inner.sources;
        let windows = match sources.accessibility.windows(target.owner_pid) {
            Ok(windows) => windows,
            Err(err) => {
                debug!(%err, "accessibility windows unavailable");
                return None;
            }
        };
        let titled: Vec<(String, AxWindowRef)> = windows
            .into_iter()
            .filter_map(|w| w.title().ok().map(|t| (t, w)))
            .collect();

        if target.window_server_id.is_resolved() {
            let by_id = id_map(sources, target.owner_pid, &titled);
            if let Some(window) = by_id.get(&target.window_server_id) {
                return Some(window.clone());
            }
        }

        titled
            .iter()
            .find(|(title, _)| *title == target.ax_title)
            .or_else(|| {
                titled.iter().find(|(title, _)| title_contains_either(title, &target.ax_title))
            })
            .map(|(_, window)| window.clone())
    }
}

fn id_map(
    sources: &Sources,
    pid: Pid,
    titled: &[(String, AxWindowRef)],
) -> HashMap<WindowServerId, AxWindowRef> {
    let snapshot: Vec<_> =
        sources.window_server.snapshot().into_iter().filter(|w| w.pid == pid).collect();
    let mut matcher = TitleMatcher::new(&snapshot);
    let mut map = HashMap::default();
    for (_, window) in titled {
        if let Some(id) = window.window_server_id().filter(|id| id.is_resolved()) {
            matcher.claim(id);
            map.insert(id, window.clone());
        }
    }
    for (title, window) in titled {
        if window.window_server_id().is_some_and(|id| id.is_resolved()) {
            continue;
        }
        let id = matcher.resolve(title);
        if id.is_resolved() {
            map.insert(id, window.clone());
        }
    }
    map
}

fn focus_window(window: &AxWindowRef) {
    if let Err(err) = window.set_main() {
        debug!(%err, "could not make window main");
    }
    if let Err(err) = window.raise() {
        debug!(%err, "could not raise window");
    }
    if let Err(err) = window.set_focused() {
        debug!(%err, "could not focus window");
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use test_log::test;

    use super::*;
    use crate::model::Rect;
    use crate::switcher::testing::{FakeWindow, Fixture};

    fn activator(fx: &Fixture, settle: SettleMode) -> WindowActivator {
        let timing = TimingSettings { settle, ..TimingSettings::default() };
        WindowActivator::new(fx.sources(), Rc::new(fx.scheduler.clone()), timing)
    }

    fn target(id: u32, pid: Pid, title: &str, is_minimized: bool) -> ActivationTarget {
        ActivationTarget {
            window_server_id: WindowServerId::new(id),
            owner_pid: pid,
            owner_name: "App".into(),
            ax_title: title.into(),
            is_minimized,
        }
    }

    #[test]
    fn normal_window_is_raised_immediately() {
        let fx = Fixture::new();
        fx.app(1, "Notes");
        fx.window(1, 10, "Groceries", 600.0, 400.0);
        activator(&fx, SettleMode::Poll).activate(target(10, 1, "Groceries", false));
        assert_eq!(
            fx.log.entries(),
            vec!["main Groceries", "raise Groceries", "focus Groceries", "activate 1"]
        );
        assert_eq!(fx.scheduler.pending(), 0);
    }

    #[test]
    fn minimized_window_is_restored_before_app_activation() {
        let fx = Fixture::new();
        fx.app(1, "Notes");
        fx.window(1, 10, "Todo", 600.0, 400.0);
        let window = fx.window(1, 11, "Groceries", 600.0, 400.0);
        window.minimized.set(true);

        activator(&fx, SettleMode::Poll).activate(target(11, 1, "Groceries", true));
        assert_eq!(fx.log.entries(), vec!["unminimize Groceries"]);
        fx.scheduler.run_all();
        assert_eq!(
            fx.log.entries(),
            vec![
                "unminimize Groceries",
                "activate 1",
                "main Groceries",
                "raise Groceries",
                "focus Groceries",
            ]
        );
    }

    #[test]
    fn fixed_settle_waits_configured_times() {
        let fx = Fixture::new();
        fx.app(1, "Notes");
        fx.window(1, 10, "Groceries", 600.0, 400.0).minimized.set(true);

        activator(&fx, SettleMode::Fixed).activate(target(10, 1, "Groceries", true));
        fx.scheduler.run_all();
        let timing = TimingSettings::default();
        assert_eq!(
            *fx.scheduler.delays.borrow(),
            vec![timing.unminimize_settle(), timing.activate_settle()]
        );
        assert_eq!(fx.log.position("focus Groceries"), Some(4));
    }

    #[test]
    fn polling_gives_up_after_timeout_and_continues() {
        let fx = Fixture::new();
        fx.app(1, "Notes");
        let window = fx.window(1, 10, "Groceries", 600.0, 400.0);
        window.minimized.set(true);
        window.stuck_minimized.set(true);

        activator(&fx, SettleMode::Poll).activate(target(10, 1, "Groceries", true));
        fx.scheduler.run_all();

        let timing = TimingSettings::default();
        let max_polls = (timing.poll_timeout_ms / timing.poll_interval_ms) as usize;
        // Every unminimize poll fails; the activation poll succeeds at once.
        assert_eq!(fx.scheduler.delays.borrow().len(), max_polls + 1);
        assert!(fx.log.position("activate 1") < fx.log.position("focus Groceries"));
    }

    #[test]
    fn locates_by_title_when_id_is_unresolved() {
        let fx = Fixture::new();
        fx.app(1, "Browser");
        let frame = Rect::new(0.0, 0.0, 600.0, 400.0);
        fx.ax.add(1, Rc::new(FakeWindow::new(fx.log.clone(), "Docs - Project - Browser", frame)));

        activator(&fx, SettleMode::Poll).activate(target(0, 1, "Docs - Project", false));
        assert_eq!(fx.log.position("raise Docs - Project - Browser"), Some(1));
    }

    #[test]
    fn id_match_picks_the_right_duplicate() {
        let fx = Fixture::new();
        fx.app(1, "Terminal");
        let first = fx.window(1, 10, "zsh", 600.0, 400.0);
        let second = fx.window(1, 11, "zsh", 600.0, 400.0);
        first.minimized.set(true);
        second.minimized.set(true);

        activator(&fx, SettleMode::Poll).activate(target(11, 1, "zsh", true));
        fx.scheduler.run_all();
        assert!(first.minimized.get());
        assert!(!second.minimized.get());
    }

    #[test]
    fn missing_window_aborts_silently() {
        let fx = Fixture::new();
        fx.app(1, "Notes");
        fx.window(1, 10, "Groceries", 600.0, 400.0);
        activator(&fx, SettleMode::Poll).activate(target(99, 1, "Closed", true));
        fx.scheduler.run_all();
        assert!(fx.log.entries().is_empty());
    }

    #[test]
    fn minimize_frontmost_uses_focused_window() {
        let fx = Fixture::new();
        fx.app(1, "Notes");
        let window = fx.window(1, 10, "Groceries", 600.0, 400.0);
        let activator = activator(&fx, SettleMode::Poll);

        activator.minimize_frontmost();
        assert!(fx.log.entries().is_empty());

        fx.apps.set_frontmost(1);
        fx.ax.set_focused(1, window.clone());
        activator.minimize_frontmost();
        assert_eq!(fx.log.entries(), vec!["minimize Groceries"]);
        assert!(window.minimized.get());
    }
}
