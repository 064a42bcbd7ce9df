use std::cell::RefCell;
use std::ffi::c_void;
use std::ptr::{self, NonNull};

use objc2_core_foundation::{
    CFMachPort, CFRetained, CFRunLoop, CFRunLoopSource, kCFRunLoopCommonModes,
};
use objc2_core_graphics as ocg;
use ocg::{
    CGEvent, CGEventField, CGEventFlags, CGEventMask, CGEventTapLocation as CGTapLoc,
    CGEventTapOptions as CGTapOpt, CGEventTapPlacement as CGTapPlace, CGEventType,
};
use tracing::{debug, warn};

use crate::common::hotkey::{KeyCode, Modifiers};
use crate::switcher::input::{Disposition, InputEvent, InputHandler, InputSource};

pub type TapCallback = Option<
    unsafe extern "C-unwind" fn(
        ocg::CGEventTapProxy,
        ocg::CGEventType,
        NonNull<ocg::CGEvent>,
        *mut c_void,
    ) -> *mut ocg::CGEvent,
>;

pub struct EventTap {
    port: CFRetained<CFMachPort>,
    source: CFRetained<CFRunLoopSource>,
    user_info: *mut c_void,
    drop_ctx: Option<unsafe fn(*mut c_void)>,
}

impl EventTap {
    /// Installs an active tap: the callback may swallow events by returning
    /// null. `drop_ctx` is called with `user_info` when the tap is dropped.
    pub unsafe fn new(
        placement: CGTapPlace,
        mask: CGEventMask,
        callback: TapCallback,
        user_info: *mut c_void,
        drop_ctx: Option<unsafe fn(*mut c_void)>,
    ) -> Option<Self> {
        let port = unsafe {
            ocg::CGEvent::tap_create(
                CGTapLoc::SessionEventTap,
                placement,
                CGTapOpt::Default,
                mask,
                callback,
                user_info,
            )?
        };

        let source = CFMachPort::new_run_loop_source(None, Some(&port), 0)?;
        if let Some(rl) = CFRunLoop::current() {
            unsafe { rl.add_source(Some(&source), kCFRunLoopCommonModes) };
        }
        unsafe { ocg::CGEvent::tap_enable(&port, true) };

        Some(Self { port, source, user_info, drop_ctx })
    }
}

impl Drop for EventTap {
    fn drop(&mut self) {
        unsafe { ocg::CGEvent::tap_enable(&self.port, false) };
        if let Some(rl) = CFRunLoop::current() {
            unsafe { rl.remove_source(Some(&self.source), kCFRunLoopCommonModes) };
        }
        if let Some(dropper) = self.drop_ctx {
            unsafe { dropper(self.user_info) };
        }
    }
}

pub fn modifiers_from_flags(flags: CGEventFlags) -> Modifiers {
    let mut mods = Modifiers::empty();
    if flags.contains(CGEventFlags::MaskControl) {
        mods.insert(Modifiers::CONTROL);
    }
    if flags.contains(CGEventFlags::MaskAlternate) {
        mods.insert(Modifiers::ALT);
    }
    if flags.contains(CGEventFlags::MaskCommand) {
        mods.insert(Modifiers::META);
    }
    if flags.contains(CGEventFlags::MaskShift) {
        mods.insert(Modifiers::SHIFT);
    }
    mods
}

fn translate(event_type: CGEventType, event: &CGEvent) -> Option<InputEvent> {
    let modifiers = modifiers_from_flags(CGEvent::flags(Some(event)));
    match event_type {
        CGEventType::KeyDown => {
            let raw = CGEvent::integer_value_field(Some(event), CGEventField::KeyboardEventKeycode);
            let key = KeyCode::from_mac_keycode(u16::try_from(raw).ok()?)?;
            let is_repeat =
                CGEvent::integer_value_field(Some(event), CGEventField::KeyboardEventAutorepeat)
                    != 0;
            Some(InputEvent::KeyDown { key, modifiers, is_repeat })
        }
        CGEventType::FlagsChanged => Some(InputEvent::FlagsChanged { modifiers }),
        _ => None,
    }
}

struct TapCtx {
    handler: RefCell<InputHandler>,
    /// Filled in once the tap exists so the callback can re-enable it.
    port: RefCell<Option<CFRetained<CFMachPort>>>,
}

unsafe extern "C-unwind" fn key_callback(
    _proxy: ocg::CGEventTapProxy,
    event_type: CGEventType,
    event: NonNull<CGEvent>,
    user_info: *mut c_void,
) -> *mut CGEvent {
    let ctx = unsafe { &*(user_info as *const TapCtx) };

    if event_type == CGEventType::TapDisabledByTimeout
        || event_type == CGEventType::TapDisabledByUserInput
    {
        warn!(?event_type, "key tap disabled by the system, re-enabling");
        if let Some(port) = ctx.port.borrow().as_deref() {
            unsafe { ocg::CGEvent::tap_enable(port, true) };
        }
        return event.as_ptr();
    }

    let Some(input) = translate(event_type, unsafe { event.as_ref() }) else {
        return event.as_ptr();
    };
    let disposition = match ctx.handler.try_borrow_mut() {
        Ok(mut handler) => handler(&input),
        Err(_) => Disposition::PassThrough,
    };
    match disposition {
        Disposition::Consume => ptr::null_mut(),
        Disposition::PassThrough => event.as_ptr(),
    }
}

unsafe fn drop_tap_ctx(ptr: *mut c_void) {
    unsafe { drop(Box::from_raw(ptr as *mut TapCtx)) };
}

/// A keyboard hook over a `CGEventTap` that may consume what it sees.
///
/// Two instances back the switcher: the always-on listener and the capture
/// installed while the overlay is visible. The capture is placed at the head
/// so it sees keys first.
pub struct KeyboardTap {
    name: &'static str,
    placement: CGTapPlace,
    tap: RefCell<Option<EventTap>>,
}

impl KeyboardTap {
    pub fn listener() -> Self {
        Self {
            name: "listener",
            placement: CGTapPlace::TailAppendEventTap,
            tap: RefCell::new(None),
        }
    }

    pub fn capture() -> Self {
        Self {
            name: "capture",
            placement: CGTapPlace::HeadInsertEventTap,
            tap: RefCell::new(None),
        }
    }
}

impl InputSource for KeyboardTap {
    fn start(&self, handler: InputHandler) -> bool {
        self.stop();

        let mask: CGEventMask = [CGEventType::KeyDown, CGEventType::FlagsChanged]
            .iter()
            .fold(0u64, |m, ty| m | 1u64 << (ty.0 as u64));
        let ctx = Box::new(TapCtx {
            handler: RefCell::new(handler),
            port: RefCell::new(None),
        });
        let ctx_ptr = Box::into_raw(ctx);

        let tap = unsafe {
            EventTap::new(
                self.placement,
                mask,
                Some(key_callback),
                ctx_ptr as *mut c_void,
                Some(drop_tap_ctx),
            )
        };
        match tap {
            Some(tap) => {
                unsafe { (*ctx_ptr).port.replace(Some(tap.port.clone())) };
                *self.tap.borrow_mut() = Some(tap);
                debug!(name = self.name, "key tap installed");
                true
            }
            None => {
                unsafe { drop(Box::from_raw(ctx_ptr)) };
                warn!(name = self.name, "CGEventTapCreate failed");
                false
            }
        }
    }

    fn stop(&self) {
        if self.tap.borrow_mut().take().is_some() {
            debug!(name = self.name, "key tap removed");
        }
    }

    fn is_running(&self) -> bool { self.tap.borrow().is_some() }
}
