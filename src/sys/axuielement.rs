//! Owned accessibility elements and the [`AccessibilitySource`] built on them.

use std::ffi::c_void;
use std::ptr;
use std::rc::Rc;

use accessibility_sys::{
    AXUIElementCopyAttributeValue, AXUIElementCreateApplication, AXUIElementPerformAction,
    AXUIElementRef, AXUIElementSetAttributeValue, AXUIElementSetMessagingTimeout, AXValueGetType,
    AXValueGetTypeID, AXValueGetValue, AXValueRef, AXValueType, kAXErrorNoValue, kAXErrorSuccess,
    kAXFocusedAttribute, kAXFocusedWindowAttribute, kAXMainAttribute, kAXMinimizedAttribute,
    kAXPositionAttribute, kAXRaiseAction, kAXSizeAttribute, kAXTitleAttribute,
    kAXValueTypeCGPoint, kAXValueTypeCGSize, kAXWindowsAttribute,
};
use core_foundation::array::{CFArray, CFArrayRef};
use core_foundation::base::{CFType, CFTypeRef, TCFType};
use core_foundation::boolean::CFBoolean;
use core_foundation::string::CFString;
use objc2_core_foundation::{CGPoint, CGSize};
use tracing::trace;

use super::skylight::_AXUIElementGetWindow;
use crate::model::{Pid, Rect, WindowServerId};
use crate::switcher::sources::{AccessibilitySource, AxError, AxWindowElement, AxWindowRef};

/// Seconds one AX request may block the main thread before it fails.
const MESSAGING_TIMEOUT: f32 = 1.0;

#[derive(Debug, Clone)]
pub struct AxElement(CFType);

impl AxElement {
    pub fn application(pid: Pid) -> Option<Self> {
        // SAFETY: create rule, we own the returned reference.
        let raw = unsafe { AXUIElementCreateApplication(pid) };
        if raw.is_null() {
            return None;
        }
        let element = AxElement(unsafe { CFType::wrap_under_create_rule(raw as CFTypeRef) });
        unsafe { AXUIElementSetMessagingTimeout(element.as_raw(), MESSAGING_TIMEOUT) };
        Some(element)
    }

    fn as_raw(&self) -> AXUIElementRef { self.0.as_CFTypeRef() as AXUIElementRef }

    fn copy_attribute(&self, name: &'static str) -> Result<CFType, AxError> {
        let attr = CFString::from_static_string(name);
        let mut value: CFTypeRef = ptr::null();
        let err = unsafe {
            AXUIElementCopyAttributeValue(self.as_raw(), attr.as_concrete_TypeRef(), &mut value)
        };
        match err {
            kAXErrorSuccess if !value.is_null() => {
                // SAFETY: copy rule, +1 on success.
                Ok(unsafe { CFType::wrap_under_create_rule(value) })
            }
            kAXErrorSuccess | kAXErrorNoValue => Err(AxError::Missing(name)),
            code => Err(AxError::Ax(code)),
        }
    }

    fn string(&self, name: &'static str) -> Result<String, AxError> {
        self.copy_attribute(name)?
            .downcast::<CFString>()
            .map(|s| s.to_string())
            .ok_or(AxError::WrongType(name))
    }

    fn boolean(&self, name: &'static str) -> Result<bool, AxError> {
        self.copy_attribute(name)?
            .downcast::<CFBoolean>()
            .map(bool::from)
            .ok_or(AxError::WrongType(name))
    }

    fn element(&self, name: &'static str) -> Result<AxElement, AxError> {
        self.copy_attribute(name).map(AxElement)
    }

    fn elements(&self, name: &'static str) -> Result<Vec<AxElement>, AxError> {
        let value = self.copy_attribute(name)?;
        if value.type_of() != CFArray::<CFType>::type_id() {
            return Err(AxError::WrongType(name));
        }
        // SAFETY: type checked above; `value` keeps the array alive.
        let array: CFArray<CFType> =
            unsafe { CFArray::wrap_under_get_rule(value.as_CFTypeRef() as CFArrayRef) };
        Ok(array.iter().map(|item| AxElement((*item).clone())).collect())
    }

    fn ax_value<T: Default>(&self, name: &'static str, kind: AXValueType) -> Result<T, AxError> {
        let value = self.copy_attribute(name)?;
        if value.type_of() != unsafe { AXValueGetTypeID() } {
            return Err(AxError::WrongType(name));
        }
        let raw = value.as_CFTypeRef() as AXValueRef;
        let mut out = T::default();
        let ok = unsafe {
            AXValueGetType(raw) == kind
                && AXValueGetValue(raw, kind, &mut out as *mut T as *mut c_void)
        };
        if ok { Ok(out) } else { Err(AxError::WrongType(name)) }
    }

    fn set_boolean(&self, name: &'static str, value: bool) -> Result<(), AxError> {
        let attr = CFString::from_static_string(name);
        let value = CFBoolean::from(value);
        let err = unsafe {
            AXUIElementSetAttributeValue(
                self.as_raw(),
                attr.as_concrete_TypeRef(),
                value.as_CFTypeRef(),
            )
        };
        check(err)
    }

    fn perform(&self, action: &'static str) -> Result<(), AxError> {
        let action = CFString::from_static_string(action);
        check(unsafe { AXUIElementPerformAction(self.as_raw(), action.as_concrete_TypeRef()) })
    }
}

fn check(err: i32) -> Result<(), AxError> {
    if err == kAXErrorSuccess { Ok(()) } else { Err(AxError::Ax(err)) }
}

impl AxWindowElement for AxElement {
    fn title(&self) -> Result<String, AxError> { self.string(kAXTitleAttribute) }

    fn is_minimized(&self) -> Result<bool, AxError> { self.boolean(kAXMinimizedAttribute) }

    fn frame(&self) -> Result<Rect, AxError> {
        let origin: CGPoint = self.ax_value(kAXPositionAttribute, kAXValueTypeCGPoint)?;
        let size: CGSize = self.ax_value(kAXSizeAttribute, kAXValueTypeCGSize)?;
        Ok(Rect::new(origin.x, origin.y, size.width, size.height))
    }

    fn window_server_id(&self) -> Option<WindowServerId> {
        let mut id = 0;
        let err = unsafe { _AXUIElementGetWindow(self.as_raw(), &mut id) };
        (err == kAXErrorSuccess && id != 0).then(|| WindowServerId::new(id))
    }

    fn set_minimized(&self, minimized: bool) -> Result<(), AxError> {
        self.set_boolean(kAXMinimizedAttribute, minimized)
    }

    fn set_main(&self) -> Result<(), AxError> { self.set_boolean(kAXMainAttribute, true) }

    fn raise(&self) -> Result<(), AxError> { self.perform(kAXRaiseAction) }

    fn set_focused(&self) -> Result<(), AxError> { self.set_boolean(kAXFocusedAttribute, true) }
}

/// Reads application window lists through the accessibility API.
#[derive(Default)]
pub struct AxAccessibility;

impl AccessibilitySource for AxAccessibility {
    fn windows(&self, pid: Pid) -> Result<Vec<AxWindowRef>, AxError> {
        let app = AxElement::application(pid).ok_or(AxError::Missing("application"))?;
        let windows = app.elements(kAXWindowsAttribute)?;
        trace!(pid, count = windows.len(), "ax windows");
        Ok(windows.into_iter().map(|w| Rc::new(w) as AxWindowRef).collect())
    }

    fn focused_window(&self, pid: Pid) -> Result<Option<AxWindowRef>, AxError> {
        let app = AxElement::application(pid).ok_or(AxError::Missing("application"))?;
        match app.element(kAXFocusedWindowAttribute) {
            Ok(window) => Ok(Some(Rc::new(window))),
            Err(AxError::Missing(_)) => Ok(None),
            Err(err) => Err(err),
        }
    }
}
