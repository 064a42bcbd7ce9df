use image::RgbaImage;
use objc2::rc::Retained;
use objc2::{class, msg_send};
use objc2_app_kit::{
    NSApplicationActivationOptions, NSApplicationActivationPolicy, NSRunningApplication,
    NSWorkspace,
};
use objc2_core_graphics::CGImage;
use objc2_foundation::{NSPoint, NSRect, NSSize, NSString};
use tracing::debug;

use super::bitmap::{CGImageRef, rasterize};
use crate::model::Pid;
use crate::switcher::sources::{RunningApp, RunningAppsSource};

pub trait NSRunningApplicationExt {
    fn with_process_id(pid: Pid) -> Option<Retained<Self>>;
    fn pid(&self) -> Pid;
    fn localized_name(&self) -> Option<Retained<NSString>>;
}

impl NSRunningApplicationExt for NSRunningApplication {
    fn with_process_id(pid: Pid) -> Option<Retained<Self>> {
        unsafe {
            // For some reason this binding isn't generated in icrate.
            msg_send![class!(NSRunningApplication), runningApplicationWithProcessIdentifier:pid]
        }
    }

    fn pid(&self) -> Pid { unsafe { msg_send![self, processIdentifier] } }

    fn localized_name(&self) -> Option<Retained<NSString>> { self.localizedName() }
}

/// Icons are rendered at this edge, in pixels.
const ICON_EDGE: f64 = 64.0;

/// Running applications as `NSWorkspace` reports them.
#[derive(Default)]
pub struct WorkspaceApps;

impl RunningAppsSource for WorkspaceApps {
    fn running_apps(&self) -> Vec<RunningApp> {
        let frontmost = self.frontmost();
        NSWorkspace::sharedWorkspace()
            .runningApplications()
            .into_iter()
            .map(|app| {
                let pid = app.pid();
                RunningApp {
                    pid,
                    name: app.localized_name().map(|n| n.to_string()).unwrap_or_default(),
                    is_regular: app.activationPolicy() == NSApplicationActivationPolicy::Regular,
                    is_frontmost: frontmost == Some(pid),
                }
            })
            .collect()
    }

    fn icon(&self, pid: Pid) -> Option<RgbaImage> {
        let app = NSRunningApplication::with_process_id(pid)?;
        let image = app.icon()?;
        let edge = ICON_EDGE as usize;
        let mut proposed = NSRect::new(NSPoint::new(0.0, 0.0), NSSize::new(ICON_EDGE, ICON_EDGE));
        // AppKit picks the representation closest to the proposed size.
        let Some(cg_image) =
            (unsafe { image.CGImageForProposedRect_context_hints(&mut proposed, None, None) })
        else {
            debug!(pid, "application icon has no bitmap representation");
            return None;
        };
        let raw: CGImageRef = (&*cg_image as *const CGImage).cast();
        unsafe { rasterize(raw, edge, edge) }
    }

    #[allow(deprecated)]
    fn activate(&self, pid: Pid) -> bool {
        let Some(app) = NSRunningApplication::with_process_id(pid) else {
            debug!(pid, "activate: no such application");
            return false;
        };
        app.activateWithOptions(NSApplicationActivationOptions::ActivateIgnoringOtherApps)
    }

    fn frontmost(&self) -> Option<Pid> {
        NSWorkspace::sharedWorkspace().frontmostApplication().map(|app| app.pid())
    }
}
