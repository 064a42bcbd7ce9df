use core_foundation::array::CFArray;
use core_foundation::base::{CFRelease, CFType, CFTypeRef, ItemRef, TCFType};
use core_foundation::dictionary::CFDictionary;
use core_foundation::number::CFNumber;
use core_foundation::string::{CFString, CFStringRef};
use core_graphics::display::{CGWindowID, CGWindowListCopyWindowInfo, kCGNullWindowID};
use core_graphics::geometry::{CGPoint, CGRect, CGSize};
use core_graphics::window::{
    kCGWindowBounds, kCGWindowLayer, kCGWindowListExcludeDesktopElements,
    kCGWindowListOptionAll, kCGWindowName, kCGWindowNumber, kCGWindowOwnerPID,
};
use image::RgbaImage;
use tracing::{debug, trace};

use super::bitmap::{CGImageRef, rasterize_native};
use super::skylight::{CaptureOptions, G_CONNECTION, SLSHWCaptureWindowList};
use crate::model::{Rect, WindowServerId};
use crate::switcher::sources::{ScreenCapture, ServerWindow, WindowServerSource};

/// Layer of ordinary application windows.
const NORMAL_LAYER: i32 = 0;

const kCGWindowListOptionIncludingWindow: u32 = 1 << 3;
const kCGWindowImageBoundsIgnoreFraming: u32 = 1 << 0;
const kCGWindowImageBestResolution: u32 = 1 << 3;

#[link(name = "CoreGraphics", kind = "framework")]
unsafe extern "C" {
    fn CGWindowListCreateImage(
        screen_bounds: CGRect,
        list_option: u32,
        window_id: CGWindowID,
        image_option: u32,
    ) -> CGImageRef;
}

/// The window list as the window server reports it.
#[derive(Default)]
pub struct CgWindowServer;

impl WindowServerSource for CgWindowServer {
    fn snapshot(&self) -> Vec<ServerWindow> {
        // SAFETY: copy rule; the array is released when `list` drops.
        let list: CFArray<CFDictionary<CFString, CFType>> = unsafe {
            let raw = CGWindowListCopyWindowInfo(
                kCGWindowListOptionAll | kCGWindowListExcludeDesktopElements,
                kCGNullWindowID,
            );
            if raw.is_null() {
                debug!("window list unavailable");
                return Vec::new();
            }
            CFArray::wrap_under_create_rule(raw)
        };
        let windows: Vec<ServerWindow> = list
            .iter()
            .filter_map(make_window)
            .filter(|w| w.layer == NORMAL_LAYER)
            .collect();
        trace!(count = windows.len(), "window server snapshot");
        windows
    }
}

fn make_window(win: ItemRef<CFDictionary<CFString, CFType>>) -> Option<ServerWindow> {
    let layer = get_num(&win, unsafe { kCGWindowLayer })?.try_into().ok()?;
    let id = get_num(&win, unsafe { kCGWindowNumber })?;
    let pid = get_num(&win, unsafe { kCGWindowOwnerPID })?;
    let bounds: CFDictionary = win.find(unsafe { kCGWindowBounds })?.downcast()?;
    let frame = CGRect::from_dict_representation(&bounds)?;
    let title = win
        .find(unsafe { kCGWindowName })
        .and_then(|name| name.downcast::<CFString>())
        .map(|name| name.to_string())
        .unwrap_or_default();

    Some(ServerWindow {
        id: WindowServerId::new(id.try_into().ok()?),
        pid: pid.try_into().ok()?,
        title,
        layer,
        frame: Rect::new(frame.origin.x, frame.origin.y, frame.size.width, frame.size.height),
    })
}

fn get_num(dict: &CFDictionary<CFString, CFType>, key: CFStringRef) -> Option<i64> {
    let item: CFNumber = dict.find(key)?.downcast()?;
    item.to_i64()
}

/// Window pixels via SkyLight, falling back to the public CoreGraphics call
/// when the private one yields nothing.
#[derive(Default)]
pub struct WindowCapture;

impl ScreenCapture for WindowCapture {
    fn capture(&self, id: WindowServerId) -> Option<RgbaImage> {
        capture_hardware(id).or_else(|| {
            trace!(%id, "hardware capture failed, trying CGWindowListCreateImage");
            capture_window_list(id)
        })
    }
}

fn capture_hardware(id: WindowServerId) -> Option<RgbaImage> {
    let ids = [id.as_u32()];
    let options = CaptureOptions::IGNORE_GLOBAL_CLIP_SHAPE
        | CaptureOptions::BEST_RESOLUTION
        | CaptureOptions::FULL_SIZE;
    let raw = unsafe { SLSHWCaptureWindowList(*G_CONNECTION, ids.as_ptr(), 1, options) };
    if raw.is_null() {
        return None;
    }
    // SAFETY: the call follows the create rule.
    let images: CFArray<CFType> = unsafe { CFArray::wrap_under_create_rule(raw) };
    let image = images.get(0)?;
    unsafe { rasterize_native(image.as_CFTypeRef() as CGImageRef) }
}

fn capture_window_list(id: WindowServerId) -> Option<RgbaImage> {
    let null_rect = CGRect::new(
        &CGPoint::new(f64::INFINITY, f64::INFINITY),
        &CGSize::new(0.0, 0.0),
    );
    let image = unsafe {
        CGWindowListCreateImage(
            null_rect,
            kCGWindowListOptionIncludingWindow,
            id.as_u32(),
            kCGWindowImageBoundsIgnoreFraming | kCGWindowImageBestResolution,
        )
    };
    if image.is_null() {
        return None;
    }
    let pixels = unsafe { rasterize_native(image) };
    unsafe { CFRelease(image as CFTypeRef) };
    pixels
}
