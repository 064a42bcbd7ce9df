#[cfg(not(target_os = "macos"))]
fn main() -> std::process::ExitCode {
    eprintln!("tabwise drives macOS windows and cannot run on this platform");
    std::process::ExitCode::FAILURE
}

#[cfg(target_os = "macos")]
fn main() -> std::process::ExitCode { mac::main() }

#[cfg(target_os = "macos")]
mod mac {
    use std::path::{Path, PathBuf};
    use std::process::ExitCode;
    use std::rc::Rc;

    use clap::Parser;
    use objc2::MainThreadMarker;
    use objc2_app_kit::{NSApplication, NSApplicationActivationPolicy};
    use tabwise::actor::config_watcher::ConfigWatcher;
    use tabwise::actor::permissions::PermissionGate;
    use tabwise::actor::switcher::{Event, Platform, SwitcherActor};
    use tabwise::common::config::{Config, config_file};
    use tabwise::common::log;
    use tabwise::switcher::thumbnail::TargetSize;
    use tabwise::switcher::{IconCache, InventoryBuilder, Sources, ThumbnailCapturer};
    use tabwise::sys::accessibility::SystemPermissions;
    use tabwise::sys::app::WorkspaceApps;
    use tabwise::sys::axuielement::AxAccessibility;
    use tabwise::sys::dispatch::MainQueueScheduler;
    use tabwise::sys::event_tap::KeyboardTap;
    use tabwise::sys::executor::Executor;
    use tabwise::sys::window_server::{CgWindowServer, WindowCapture};
    use tabwise::ui::overlay::SwitcherOverlay;
    use tracing::{error, info, warn};

    #[derive(Parser)]
    #[command(version, about = "Switch between individual windows with Alt+Tab")]
    struct Cli {
        /// Read the configuration from PATH instead of ~/.tabwise.toml.
        #[arg(long, value_name = "PATH")]
        config: Option<PathBuf>,

        /// Check the configuration file, print any issues and exit.
        #[arg(long)]
        validate: bool,

        /// Print the windows the switcher would show as JSON and exit.
        ///
        /// Accessibility access is needed for titles and minimized windows.
        #[arg(long)]
        list_windows: bool,
    }

    pub fn main() -> ExitCode {
        let opt: Cli = Parser::parse();

        if std::env::var_os("RUST_BACKTRACE").is_none() {
            // SAFETY: We are single threaded at this point.
            unsafe { std::env::set_var("RUST_BACKTRACE", "1") };
        }
        log::init_logging();
        install_panic_hook();

        let path = opt.config.clone().unwrap_or_else(config_file);

        if opt.validate {
            return validate(&path);
        }

        let mut config = match Config::load_or_default(&path) {
            Ok(config) => config,
            Err(e) => {
                error!("could not load {}: {e:#}", path.display());
                warn!("continuing with the default configuration");
                Config::default()
            }
        };
        let fixes = config.auto_fix_values();
        if fixes > 0 {
            warn!(fixes, "replaced invalid configuration values with defaults");
        }

        if opt.list_windows {
            return list_windows(&config);
        }

        run(config, path)
    }

    fn validate(path: &Path) -> ExitCode {
        let config = match Config::load_or_default(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("{}: {e:#}", path.display());
                return ExitCode::FAILURE;
            }
        };
        let issues = config.validate();
        if issues.is_empty() {
            println!("{}: ok", path.display());
            return ExitCode::SUCCESS;
        }
        for issue in &issues {
            println!("{}: {issue}", path.display());
        }
        ExitCode::FAILURE
    }

    fn sources() -> Sources {
        Sources {
            apps: Rc::new(WorkspaceApps),
            accessibility: Rc::new(AxAccessibility),
            window_server: Rc::new(CgWindowServer),
            capture: Rc::new(WindowCapture),
        }
    }

    fn list_windows(config: &Config) -> ExitCode {
        let sources = sources();
        let capturer = ThumbnailCapturer::new(
            sources.capture.clone(),
            TargetSize::new(config.thumbnail.width, config.thumbnail.height),
        );
        // Pixels are not part of the listing.
        capturer.set_live_enabled(false);
        let inventory = InventoryBuilder::new(sources, capturer).build(&mut IconCache::default());

        match serde_json::to_string_pretty(inventory.records()) {
            Ok(json) => {
                println!("{json}");
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("could not serialize the window list: {e}");
                ExitCode::FAILURE
            }
        }
    }

    fn run(config: Config, path: PathBuf) -> ExitCode {
        let Some(mtm) = MainThreadMarker::new() else {
            error!("tabwise must be started on the main thread");
            return ExitCode::FAILURE;
        };
        {
            let app = NSApplication::sharedApplication(mtm);
            let _ = app.setActivationPolicy(NSApplicationActivationPolicy::Accessory);
            unsafe {
                let _: () = objc2::msg_send![&*app, finishLaunching];
            }
        }

        let (tx, rx) = tabwise::actor::channel();
        let overlay_tx = tx.clone();
        let overlay = SwitcherOverlay::new(
            mtm,
            Rc::new(move |action| overlay_tx.send(Event::Overlay(action))),
        );
        let scheduler = Rc::new(MainQueueScheduler);
        let platform = Platform {
            overlay: Rc::new(overlay),
            global_input: Rc::new(KeyboardTap::listener()),
            session_input: Rc::new(KeyboardTap::capture()),
            scheduler: scheduler.clone(),
        };
        let actor = SwitcherActor::new(&config, sources(), platform, tx, rx);

        PermissionGate::new(
            Rc::new(SystemPermissions),
            scheduler,
            config.timing.permission_probe_interval(),
            actor.sender(),
        )
        .start();
        ConfigWatcher::spawn(path, actor.sender());

        info!("tabwise running");
        Executor::run_main(mtm, actor.run());
        ExitCode::SUCCESS
    }

    #[cfg(panic = "unwind")]
    fn install_panic_hook() {
        // Abort on panic instead of unwinding through the AppKit run loop.
        let original_hook = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            original_hook(info);
            std::process::abort();
        }));
    }

    #[cfg(not(panic = "unwind"))]
    fn install_panic_hook() {}
}
