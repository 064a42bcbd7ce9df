use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use notify::{Config as NotifyConfig, Event, EventKind, PollWatcher, RecursiveMode, Watcher};
use tracing::{debug, info, warn};

use crate::actor::switcher::{self, Event as SwitcherEvent};
use crate::common::config::Config;

pub struct ConfigWatcher {
    file: PathBuf,
    switcher_tx: switcher::Sender,
}

impl ConfigWatcher {
    pub fn spawn(file: PathBuf, switcher_tx: switcher::Sender) {
        let spawned = thread::Builder::new().name("config-watcher".to_string()).spawn(move || {
            let watcher = ConfigWatcher { file, switcher_tx };
            if let Err(e) = watcher.run() {
                warn!("config-watcher: error: {e:?}");
            }
        });
        if let Err(e) = spawned {
            warn!("failed to spawn config-watcher thread: {e}");
        }
    }

    fn run(self) -> notify::Result<()> {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<notify::Result<Event>>();

        let mut watcher = PollWatcher::new(
            move |res| {
                let _ = tx.send(res);
            },
            NotifyConfig::default().with_poll_interval(Duration::from_secs(1)),
        )?;

        // The file itself may not exist yet; its directory always does.
        let dir = self.watched_dir();
        watcher.watch(&dir, RecursiveMode::NonRecursive)?;

        info!("watching {:?} in {:?}", self.file.file_name(), dir);

        loop {
            match rx.blocking_recv() {
                Some(Ok(event)) => {
                    if self.is_relevant(&event) {
                        debug!("change detected: {:?}", event.kind);
                        self.reload();
                    } else {
                        debug!("ignoring unrelated event: {:?}", event.kind);
                    }
                }
                Some(Err(e)) => {
                    warn!("watch error: {e:?}");
                }
                None => {
                    warn!("channel closed, exiting");
                    break;
                }
            }
        }

        Ok(())
    }

    fn watched_dir(&self) -> PathBuf {
        match self.file.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }

    fn is_relevant(&self, event: &Event) -> bool {
        match event.kind {
            EventKind::Modify(_) | EventKind::Create(_) | EventKind::Remove(_) => event
                .paths
                .iter()
                .any(|p| p == &self.file || p.file_name() == self.file.file_name()),
            _ => false,
        }
    }

    fn reload(&self) {
        match Config::load_or_default(&self.file) {
            Ok(mut config) => {
                let fixes = config.auto_fix_values();
                if fixes > 0 {
                    warn!("reset {fixes} invalid config value(s) to defaults");
                }
                info!("config reloaded");
                self.switcher_tx.send(SwitcherEvent::UpdateConfig(Box::new(config)));
            }
            Err(e) => warn!("keeping previous config, reload failed: {e:#}"),
        }
    }
}
