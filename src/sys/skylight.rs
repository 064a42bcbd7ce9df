// credits
// https://github.com/koekeishiya/yabai/blob/d55a647913ab72d8d8b348bee2d3e59e52ce4a5d/src/misc/extern.h.
// https://github.com/lwouis/alt-tab-macos/blob/master/src/api-wrappers/private-apis/SkyLight.framework.swift

use std::ffi::c_int;

use accessibility_sys::{AXError, AXUIElementRef};
use bitflags::bitflags;
use core_foundation::array::CFArrayRef;
use core_graphics::display::CGWindowID;
use once_cell::sync::Lazy;

pub static G_CONNECTION: Lazy<cid_t> = Lazy::new(|| unsafe { SLSMainConnectionID() });

#[allow(non_camel_case_types)]
pub type cid_t = i32;

bitflags! {
    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    #[repr(transparent)]
    pub struct CaptureOptions: u32 {
        const BEST_RESOLUTION          = 1 << 8;
        const IGNORE_GLOBAL_CLIP_SHAPE = 1 << 11;
        const FULL_SIZE                = 1 << 19;
    }
}

unsafe extern "C" {
    pub fn _AXUIElementGetWindow(elem: AXUIElementRef, wid: *mut CGWindowID) -> AXError;

    pub fn SLSMainConnectionID() -> cid_t;

    /// Returns a +1 array of `CGImageRef`, one per window that could be
    /// captured. Works for minimized and off-space windows.
    pub fn SLSHWCaptureWindowList(
        cid: cid_t,
        window_list: *const CGWindowID,
        count: c_int,
        options: CaptureOptions,
    ) -> CFArrayRef;
}
