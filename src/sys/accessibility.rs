use std::ffi::c_void;
use std::ptr;

use objc2::rc::autoreleasepool;
use objc2::runtime::AnyObject;
use objc2::{class, msg_send};
use tracing::info;

use crate::actor::permissions::PermissionProbe;

#[link(name = "ApplicationServices", kind = "framework")]
unsafe extern "C" {
    fn AXIsProcessTrustedWithOptions(options: *const c_void) -> bool;

    static kAXTrustedCheckOptionPrompt: *const c_void;
}

#[link(name = "CoreFoundation", kind = "framework")]
unsafe extern "C" {
    static kCFBooleanTrue: *const c_void;
}

#[link(name = "CoreGraphics", kind = "framework")]
unsafe extern "C" {
    fn CGPreflightScreenCaptureAccess() -> bool;
    fn CGRequestScreenCaptureAccess() -> bool;
}

#[inline]
fn ax_is_trusted() -> bool { unsafe { AXIsProcessTrustedWithOptions(ptr::null()) } }

#[allow(unsafe_op_in_unsafe_fn)]
unsafe fn prompt_ax_trust_dialog() {
    autoreleasepool(|_| {
        let keys: [*mut AnyObject; 1] = [kAXTrustedCheckOptionPrompt as *mut AnyObject];
        let vals: [*mut AnyObject; 1] = [kCFBooleanTrue as *mut AnyObject];

        let dict: *mut AnyObject = msg_send![
            class!(NSDictionary),
            dictionaryWithObjects: vals.as_ptr(),
            forKeys:              keys.as_ptr(),
            count:                1usize
        ];

        let _ = AXIsProcessTrustedWithOptions(dict.cast());
    });
}

/// The TCC grants as the running process sees them.
#[derive(Default)]
pub struct SystemPermissions;

impl PermissionProbe for SystemPermissions {
    fn accessibility(&self) -> bool { ax_is_trusted() }

    fn screen_recording(&self) -> bool { unsafe { CGPreflightScreenCaptureAccess() } }

    fn request_accessibility(&self) {
        info!("prompting for accessibility access");
        unsafe { prompt_ax_trust_dialog() };
    }

    fn request_screen_recording(&self) {
        info!("prompting for screen recording access");
        // The grant only takes effect after a relaunch; the gate keeps probing.
        let _ = unsafe { CGRequestScreenCaptureAccess() };
    }
}
