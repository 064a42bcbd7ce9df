//! Builds the ordered window list for one show-cycle.
//!
//! Three sources are reconciled: running applications decide which processes
//! count and in what order, the accessibility tree supplies each process's
//! windows with titles and geometry, and one window-server snapshot supplies
//! the ids that screen capture and activation need.

use std::rc::Rc;

use image::RgbaImage;
use tracing::{debug, instrument, trace};

use crate::common::collections::HashMap;
use crate::model::{Inventory, Pid, Rect, WindowRecord, WindowServerId, display_title};
use crate::switcher::sources::{AxWindowRef, RunningApp, ServerWindow, Sources};
use crate::switcher::thumbnail::ThumbnailCapturer;
use crate::switcher::title_match::TitleMatcher;

/// Windows at or below either edge are toolbars, palettes and the like.
pub const MIN_WINDOW_WIDTH: f64 = 100.0;
pub const MIN_WINDOW_HEIGHT: f64 = 50.0;

pub fn is_too_small(frame: Rect) -> bool {
    frame.size.width <= MIN_WINDOW_WIDTH || frame.size.height <= MIN_WINDOW_HEIGHT
}

/// Application icons loaded during one show-cycle, one load per process.
#[derive(Default)]
pub struct IconCache {
    icons: HashMap<Pid, Option<Rc<RgbaImage>>>,
}

impl IconCache {
    pub fn get_or_load(
        &mut self,
        pid: Pid,
        load: impl FnOnce() -> Option<RgbaImage>,
    ) -> Option<Rc<RgbaImage>> {
        self.icons.entry(pid).or_insert_with(|| load().map(Rc::new)).clone()
    }

    pub fn len(&self) -> usize { self.icons.len() }

    pub fn is_empty(&self) -> bool { self.icons.is_empty() }

    pub fn clear(&mut self) { self.icons.clear() }
}

/// Frontmost application first, the rest by name.
pub fn order_apps(apps: &mut [RunningApp]) {
    apps.sort_by(|a, b| {
        b.is_frontmost
            .cmp(&a.is_frontmost)
            .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
            .then_with(|| a.name.cmp(&b.name))
            .then_with(|| a.pid.cmp(&b.pid))
    });
}

struct Candidate {
    title: String,
    is_minimized: bool,
    frame: Rect,
    direct_id: Option<WindowServerId>,
}

pub struct InventoryBuilder {
    sources: Sources,
    capturer: ThumbnailCapturer,
}

impl InventoryBuilder {
    pub fn new(sources: Sources, capturer: ThumbnailCapturer) -> Self {
        Self { sources, capturer }
    }

    pub fn capturer(&self) -> &ThumbnailCapturer { &self.capturer }

    #[instrument(skip_all)]
    pub fn build(&self, icons: &mut IconCache) -> Inventory {
        let mut apps: Vec<RunningApp> =
            self.sources.apps.running_apps().into_iter().filter(|app| app.is_regular).collect();
        order_apps(&mut apps);

        let mut by_pid: HashMap<Pid, Vec<ServerWindow>> = HashMap::default();
        for window in self.sources.window_server.snapshot() {
            by_pid.entry(window.pid).or_default().push(window);
        }

        let mut records = Vec::new();
        for app in &apps {
            let server_windows = by_pid.get(&app.pid).map(Vec::as_slice).unwrap_or_default();
            self.collect_app(app, server_windows, icons, &mut records);
        }
        debug!(apps = apps.len(), windows = records.len(), "built inventory");
        Inventory::new(records)
    }

    fn collect_app(
        &self,
        app: &RunningApp,
        server_windows: &[ServerWindow],
        icons: &mut IconCache,
        records: &mut Vec<WindowRecord>,
    ) {
        let windows = match self.sources.accessibility.windows(app.pid) {
            Ok(windows) => windows,
            Err(err) => {
                debug!(pid = app.pid, name = %app.name, %err, "no accessibility windows");
                return;
            }
        };
        let candidates: Vec<Candidate> = windows.iter().filter_map(read_candidate).collect();
        if candidates.is_empty() {
            return;
        }

        let mut matcher = TitleMatcher::new(server_windows);
        for id in candidates.iter().filter_map(|c| c.direct_id) {
            matcher.claim(id);
        }

        let icon = icons.get_or_load(app.pid, || self.sources.apps.icon(app.pid));
        for candidate in candidates {
            let id = match candidate.direct_id {
                Some(id) => id,
                None => matcher.resolve(&candidate.title),
            };
            if !id.is_resolved() {
                debug!(pid = app.pid, title = %candidate.title, "no window server match");
            }
            let thumbnail =
                self.capturer.capture(id, candidate.frame, candidate.is_minimized, icon.as_deref());
            records.push(WindowRecord {
                window_server_id: id,
                owner_pid: app.pid,
                owner_name: app.name.clone(),
                display_title: display_title(&app.name, &candidate.title, candidate.is_minimized),
                ax_title: candidate.title,
                thumbnail,
                icon: icon.clone(),
                bounds: candidate.frame,
                is_minimized: candidate.is_minimized,
            });
        }
    }
}

fn read_candidate(window: &AxWindowRef) -> Option<Candidate> {
    let title = match window.title() {
        Ok(title) if !title.is_empty() => title,
        Ok(_) => return None,
        Err(err) => {
            trace!(?window, %err, "unreadable title");
            return None;
        }
    };
    let frame = match window.frame() {
        Ok(frame) => frame,
        Err(err) => {
            trace!(%title, %err, "unreadable frame");
            return None;
        }
    };
    if is_too_small(frame) {
        trace!(%title, ?frame, "window below minimum size");
        return None;
    }
    Some(Candidate {
        is_minimized: window.is_minimized().unwrap_or(false),
        direct_id: window.window_server_id().filter(|id| id.is_resolved()),
        title,
        frame,
    })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use test_log::test;

    use super::*;
    use crate::switcher::sources::RunningAppsSource;
    use crate::switcher::testing::{FakeWindow, Fixture};
    use crate::switcher::thumbnail::{TargetSize, render_placeholder};

    fn builder(fx: &Fixture) -> InventoryBuilder {
        let sources = fx.sources();
        let capturer = ThumbnailCapturer::new(sources.capture.clone(), TargetSize::new(160, 100));
        InventoryBuilder::new(sources, capturer)
    }

    fn titles(inventory: &Inventory) -> Vec<&str> {
        inventory.records().iter().map(|r| r.display_title.as_str()).collect()
    }

    #[test]
    fn three_apps_frontmost_first() {
        let fx = Fixture::new();
        fx.app(1, "Zed");
        fx.app(2, "Mail");
        fx.app(3, "Safari");
        fx.window(1, 101, "main.rs", 800.0, 600.0);
        fx.window(2, 201, "Inbox", 150.0, 100.0);
        fx.window(3, 301, "Start Page", 1200.0, 800.0);
        fx.apps.set_frontmost(3);

        let inventory = builder(&fx).build(&mut IconCache::default());
        assert_eq!(
            titles(&inventory),
            vec!["Safari - Start Page", "Mail - Inbox", "Zed - main.rs"]
        );
        assert_eq!(fx.server.snapshots.get(), 1);
        assert!(inventory.records().iter().all(|r| r.window_server_id.is_resolved()));
    }

    #[test]
    fn small_windows_are_excluded() {
        let fx = Fixture::new();
        fx.app(1, "Finder");
        fx.window(1, 10, "Palette", 80.0, 40.0);
        fx.window(1, 11, "Wide strip", 400.0, 50.0);
        fx.window(1, 12, "Documents", 600.0, 400.0);

        let inventory = builder(&fx).build(&mut IconCache::default());
        assert_eq!(titles(&inventory), vec!["Finder - Documents"]);
    }

    #[test]
    fn untitled_windows_and_background_apps_are_skipped() {
        let fx = Fixture::new();
        fx.app(1, "Notes");
        fx.window(1, 10, "", 600.0, 400.0);
        fx.window(1, 11, "Groceries", 600.0, 400.0);
        fx.apps.add(RunningApp {
            pid: 9,
            name: "Agent".into(),
            is_regular: false,
            is_frontmost: false,
        });
        fx.window(9, 90, "Helper", 600.0, 400.0);

        let inventory = builder(&fx).build(&mut IconCache::default());
        assert_eq!(titles(&inventory), vec!["Notes - Groceries"]);
    }

    #[test]
    fn windows_keep_accessibility_order_within_an_app() {
        let fx = Fixture::new();
        fx.app(1, "Terminal");
        fx.window(1, 12, "zsh", 600.0, 400.0);
        fx.window(1, 11, "htop", 600.0, 400.0);
        fx.window(1, 13, "vim", 600.0, 400.0);

        let inventory = builder(&fx).build(&mut IconCache::default());
        let ids: Vec<u32> =
            inventory.records().iter().map(|r| r.window_server_id.as_u32()).collect();
        assert_eq!(ids, vec![12, 11, 13]);
    }

    #[test]
    fn unmatched_window_keeps_sentinel_and_gets_placeholder() {
        let fx = Fixture::new();
        fx.app(4, "Preview");
        let frame = Rect::new(0.0, 0.0, 600.0, 400.0);
        fx.ax.add(4, Rc::new(FakeWindow::new(fx.log.clone(), "Untitled", frame)));
        fx.server.add(40, 4, "Report.pdf", frame);

        let builder = builder(&fx);
        let mut icons = IconCache::default();
        let inventory = builder.build(&mut icons);
        let record = &inventory.records()[0];
        assert_eq!(record.window_server_id, WindowServerId::UNRESOLVED);
        let icon = fx.apps.icon(4);
        assert_eq!(
            record.thumbnail,
            render_placeholder(builder.capturer().target(), icon.as_ref())
        );
    }

    #[test]
    fn prefix_titles_resolve_and_capture_live() {
        let fx = Fixture::new();
        fx.app(4, "Preview");
        let frame = Rect::new(0.0, 0.0, 600.0, 400.0);
        fx.ax.add(4, Rc::new(FakeWindow::new(fx.log.clone(), "Report.pdf - Preview", frame)));
        fx.server.add(40, 4, "Report.pdf", frame);
        fx.capture.insert(40, RgbaImage::new(1200, 800));

        let inventory = builder(&fx).build(&mut IconCache::default());
        let record = &inventory.records()[0];
        assert_eq!(record.window_server_id, WindowServerId::new(40));
        assert!(!record.thumbnail.is_placeholder());
    }

    #[test]
    fn titles_only_match_windows_of_the_same_process() {
        let fx = Fixture::new();
        fx.app(1, "Editor");
        fx.app(2, "Viewer");
        let frame = Rect::new(0.0, 0.0, 600.0, 400.0);
        fx.ax.add(1, Rc::new(FakeWindow::new(fx.log.clone(), "notes.txt", frame)));
        fx.server.add(20, 2, "notes.txt", frame);

        let inventory = builder(&fx).build(&mut IconCache::default());
        assert_eq!(inventory.records()[0].window_server_id, WindowServerId::UNRESOLVED);
    }

    #[test]
    fn direct_ids_win_over_title_matching() {
        let fx = Fixture::new();
        fx.app(1, "Browser");
        let frame = Rect::new(0.0, 0.0, 600.0, 400.0);
        fx.server.add(10, 1, "New Tab", frame);
        fx.server.add(11, 1, "New Tab", frame);
        let first = FakeWindow::new(fx.log.clone(), "New Tab", frame);
        let mut second = FakeWindow::new(fx.log.clone(), "New Tab", frame);
        second.direct_id = Some(WindowServerId::new(10));
        fx.ax.add(1, Rc::new(first));
        fx.ax.add(1, Rc::new(second));

        let inventory = builder(&fx).build(&mut IconCache::default());
        let ids: Vec<u32> =
            inventory.records().iter().map(|r| r.window_server_id.as_u32()).collect();
        assert_eq!(ids, vec![11, 10]);
    }

    #[test]
    fn minimized_windows_are_marked() {
        let fx = Fixture::new();
        fx.app(1, "Notes");
        let window = fx.window(1, 10, "Groceries", 600.0, 400.0);
        window.minimized.set(true);

        let inventory = builder(&fx).build(&mut IconCache::default());
        let record = &inventory.records()[0];
        assert!(record.is_minimized);
        assert!(record.display_title.starts_with(crate::model::MINIMIZED_INDICATOR));
    }

    #[test]
    fn icons_load_once_per_app() {
        let fx = Fixture::new();
        fx.app(1, "Terminal");
        fx.app(2, "Notes");
        for i in 0..5 {
            fx.window(1, 10 + i, &format!("tty{i}"), 600.0, 400.0);
        }
        fx.window(2, 20, "Groceries", 600.0, 400.0);

        let mut icons = IconCache::default();
        let inventory = builder(&fx).build(&mut icons);
        assert_eq!(inventory.len(), 6);
        assert_eq!(fx.apps.icon_loads.get(), 2);
        assert_eq!(icons.len(), 2);
        let first = inventory.records()[1].icon.as_ref().map(Rc::as_ptr);
        let second = inventory.records()[2].icon.as_ref().map(Rc::as_ptr);
        assert_eq!(first, second);
    }

    #[test]
    fn failing_apps_contribute_nothing() {
        let fx = Fixture::new();
        fx.app(1, "Hung");
        fx.app(2, "Notes");
        fx.window(1, 10, "Spinner", 600.0, 400.0);
        fx.window(2, 20, "Groceries", 600.0, 400.0);
        fx.ax.fail_for(1);

        let inventory = builder(&fx).build(&mut IconCache::default());
        assert_eq!(titles(&inventory), vec!["Notes - Groceries"]);
    }

    #[test]
    fn apps_sort_by_name_ignoring_case() {
        let mut apps: Vec<RunningApp> = ["beta", "Alpha", "Gamma"]
            .iter()
            .enumerate()
            .map(|(i, name)| RunningApp {
                pid: i as Pid,
                name: name.to_string(),
                is_regular: true,
                is_frontmost: *name == "Gamma",
            })
            .collect();
        order_apps(&mut apps);
        let names: Vec<&str> = apps.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["Gamma", "Alpha", "beta"]);
    }
}
