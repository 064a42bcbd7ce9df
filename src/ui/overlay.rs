//! The switcher panel as a borderless, screen-sized AppKit window.
//!
//! Geometry comes from [`GridLayout`]; this module only turns it into
//! drawing calls and turns clicks back into [`OverlayAction`]s.

use std::cell::RefCell;
use std::rc::Rc;

use image::RgbaImage;
use objc2::rc::{Retained, autoreleasepool};
use objc2::runtime::{AnyObject, ProtocolObject};
use objc2::{AnyThread, DefinedClass, MainThreadOnly, Message, define_class, msg_send};
use objc2_app_kit::{
    NSBackingStoreType, NSBezierPath, NSColor, NSEvent, NSFont, NSImage, NSScreen, NSView,
    NSWindow, NSWindowCollectionBehavior, NSWindowLevel, NSWindowStyleMask,
};
use objc2_foundation::{
    MainThreadMarker, NSAttributedStringKey, NSData, NSDictionary, NSMutableDictionary, NSPoint,
    NSRect, NSSize, NSString,
};
use tracing::trace;

use crate::common::collections::HashMap;
use crate::common::raster::encode_tiff;
use crate::model::{Cursor, Inventory, Point, Rect, Size, WindowRecord};
use crate::switcher::overlay::{Overlay, OverlayAction, PageArrow};
use crate::ui::layout::{GridLayout, HitTarget, TITLE_LINES, page_indicator, wrap_title};

const NSPopUpMenuWindowLevel: NSWindowLevel = 101;

const PANEL_RADIUS: f64 = 14.0;
const CELL_RADIUS: f64 = 8.0;
const TITLE_FONT_SIZE: f64 = 12.0;
const INDICATOR_FONT_SIZE: f64 = 13.0;

/// Decoded AppKit images for one inventory record.
struct Tile {
    thumbnail: Option<Retained<NSImage>>,
    icon: Option<Retained<NSImage>>,
}

impl Tile {
    fn new(record: &WindowRecord) -> Self {
        Tile {
            thumbnail: ns_image(&record.thumbnail.image),
            icon: record.icon.as_deref().and_then(ns_image),
        }
    }
}

fn ns_image(image: &RgbaImage) -> Option<Retained<NSImage>> {
    let bytes = encode_tiff(image)?;
    let data = NSData::with_bytes(&bytes);
    NSImage::initWithData(NSImage::alloc(), &data)
}

struct Scene {
    layout: GridLayout,
    tiles: Rc<Vec<Tile>>,
    titles: Vec<String>,
    selected: usize,
    indicator: String,
    pressed: Option<PageArrow>,
}

#[derive(Default)]
struct ViewState {
    scene: Option<Scene>,
    on_action: Option<Rc<dyn Fn(OverlayAction)>>,
}

define_class!(
    #[unsafe(super(NSView))]
    #[thread_kind = MainThreadOnly]
    #[name = "TabwiseSwitcherView"]
    #[ivars = RefCell<ViewState>]
    struct SwitcherView;

    impl SwitcherView {
        #[unsafe(method(isFlipped))]
        fn is_flipped(&self) -> bool { true }

        #[unsafe(method(acceptsFirstMouse:))]
        fn accepts_first_mouse(&self, _event: Option<&NSEvent>) -> bool { true }

        #[unsafe(method(drawRect:))]
        fn draw_rect(&self, _dirty: NSRect) {
            let state = self.ivars().borrow();
            let Some(scene) = state.scene.as_ref() else { return };
            autoreleasepool(|_| self.draw_scene(scene));
        }

        #[unsafe(method(mouseDown:))]
        fn mouse_down(&self, event: &NSEvent) {
            let local = self.convertPoint_fromView(event.locationInWindow(), None);
            let (target, handler) = {
                let state = self.ivars().borrow();
                let Some(scene) = state.scene.as_ref() else { return };
                (scene.layout.hit_test(Point::new(local.x, local.y)), state.on_action.clone())
            };
            let action = match target {
                Some(HitTarget::Cell(index)) => OverlayAction::Select(index),
                Some(HitTarget::Arrow(PageArrow::Previous)) => OverlayAction::PreviousPage,
                Some(HitTarget::Arrow(PageArrow::Next)) => OverlayAction::NextPage,
                None => return,
            };
            trace!(?action, "overlay click");
            if let Some(handler) = handler {
                handler(action);
            }
        }
    }
);

impl SwitcherView {
    fn new(mtm: MainThreadMarker, frame: NSRect) -> Retained<Self> {
        let view = mtm.alloc().set_ivars(RefCell::new(ViewState::default()));
        unsafe { msg_send![super(view), initWithFrame: frame] }
    }

    fn draw_scene(&self, scene: &Scene) {
        let layout = &scene.layout;
        let title_attrs = text_attrs(&NSFont::systemFontOfSize(TITLE_FONT_SIZE));
        let indicator_attrs = text_attrs(&NSFont::boldSystemFontOfSize(INDICATOR_FONT_SIZE));

        unsafe {
            NSColor::colorWithCalibratedWhite_alpha(0.0, 0.25).setFill();
            NSBezierPath::fillRect(self.bounds());

            let panel = NSBezierPath::bezierPathWithRoundedRect_xRadius_yRadius(
                layout.panel.into(),
                PANEL_RADIUS,
                PANEL_RADIUS,
            );
            NSColor::colorWithCalibratedWhite_alpha(0.12, 0.92).setFill();
            panel.fill();
        }

        for (index, cell) in layout.cells.iter().enumerate() {
            if index == scene.selected {
                unsafe {
                    let highlight = NSBezierPath::bezierPathWithRoundedRect_xRadius_yRadius(
                        cell.frame.into(),
                        CELL_RADIUS,
                        CELL_RADIUS,
                    );
                    NSColor::colorWithCalibratedRed_green_blue_alpha(0.2, 0.45, 1.0, 0.55)
                        .setFill();
                    highlight.fill();
                }
            }
            if let Some(tile) = scene.tiles.get(index) {
                if let Some(image) = &tile.thumbnail {
                    unsafe { image.drawInRect(cell.thumbnail.into()) };
                }
                if let Some(icon) = &tile.icon {
                    unsafe { icon.drawInRect(cell.icon.into()) };
                }
            }
            if let Some(title) = scene.titles.get(index) {
                let line_height = cell.title.size.height / TITLE_LINES as f64;
                for (line_no, line) in
                    wrap_title(title, layout.title_chars, TITLE_LINES).iter().enumerate()
                {
                    let origin = NSPoint::new(
                        cell.title.origin.x,
                        cell.title.origin.y + line_no as f64 * line_height,
                    );
                    draw_text(line, origin, &title_attrs);
                }
            }
        }

        let size = text_size(&scene.indicator, &indicator_attrs);
        let origin = NSPoint::new(
            layout.indicator.origin.x + (layout.indicator.size.width - size.width) / 2.0,
            layout.indicator.origin.y + (layout.indicator.size.height - size.height) / 2.0,
        );
        draw_text(&scene.indicator, origin, &indicator_attrs);

        for (arrow, rect) in [
            (PageArrow::Previous, layout.previous_arrow),
            (PageArrow::Next, layout.next_arrow),
        ] {
            if let Some(rect) = rect {
                draw_arrow(arrow, rect, scene.pressed == Some(arrow));
            }
        }
    }
}

fn as_any_object<T: Message>(obj: &T) -> &AnyObject {
    unsafe { &*(obj as *const T as *const AnyObject) }
}

fn text_attrs(font: &NSFont) -> Retained<NSDictionary<NSAttributedStringKey, AnyObject>> {
    let color = NSColor::colorWithCalibratedWhite_alpha(1.0, 0.95);
    let dict = NSMutableDictionary::<NSAttributedStringKey, AnyObject>::new();
    unsafe {
        dict.setObject_forKeyedSubscript(
            Some(as_any_object(font)),
            ProtocolObject::from_ref(objc2_app_kit::NSFontAttributeName),
        );
        dict.setObject_forKeyedSubscript(
            Some(as_any_object(&*color)),
            ProtocolObject::from_ref(objc2_app_kit::NSForegroundColorAttributeName),
        );
    }
    Retained::into_super(dict)
}

fn draw_text(text: &str, origin: NSPoint, attrs: &NSDictionary<NSAttributedStringKey, AnyObject>) {
    let text = NSString::from_str(text);
    unsafe {
        let _: () = msg_send![&*text, drawAtPoint: origin, withAttributes: attrs];
    }
}

fn text_size(text: &str, attrs: &NSDictionary<NSAttributedStringKey, AnyObject>) -> NSSize {
    let text = NSString::from_str(text);
    unsafe { msg_send![&*text, sizeWithAttributes: attrs] }
}

fn draw_arrow(arrow: PageArrow, rect: Rect, pressed: bool) {
    let inset = rect.inset(rect.size.width * 0.3, rect.size.height * 0.25);
    let mid_y = inset.origin.y + inset.size.height / 2.0;
    let (tip, back) = match arrow {
        PageArrow::Previous => (inset.origin.x, inset.max_x()),
        PageArrow::Next => (inset.max_x(), inset.origin.x),
    };
    unsafe {
        let path = NSBezierPath::bezierPath();
        path.moveToPoint(NSPoint::new(back, inset.origin.y));
        path.lineToPoint(NSPoint::new(tip, mid_y));
        path.lineToPoint(NSPoint::new(back, inset.max_y()));
        path.closePath();
        let alpha = if pressed { 1.0 } else { 0.6 };
        NSColor::colorWithCalibratedWhite_alpha(1.0, alpha).setFill();
        path.fill();
    }
}

/// The AppKit implementation of [`Overlay`].
pub struct SwitcherOverlay {
    window: Retained<NSWindow>,
    view: Retained<SwitcherView>,
    mtm: MainThreadMarker,
    /// Decoded images per page of the current session.
    tiles: RefCell<HashMap<usize, Rc<Vec<Tile>>>>,
}

impl SwitcherOverlay {
    pub fn new(mtm: MainThreadMarker, on_action: Rc<dyn Fn(OverlayAction)>) -> Self {
        let frame = NSScreen::mainScreen(mtm)
            .map(|screen| screen.frame())
            .unwrap_or(NSRect::new(NSPoint::new(0.0, 0.0), NSSize::new(0.0, 0.0)));
        let view = SwitcherView::new(mtm, frame);
        view.ivars().borrow_mut().on_action = Some(on_action);

        let window: Retained<NSWindow> = unsafe {
            let obj = NSWindow::alloc(mtm);
            msg_send![
                obj,
                initWithContentRect: frame,
                styleMask: NSWindowStyleMask::Borderless,
                backing: NSBackingStoreType::Buffered,
                defer: false
            ]
        };
        unsafe { window.setReleasedWhenClosed(false) };
        window.setOpaque(false);
        window.setHasShadow(false);
        window.setIgnoresMouseEvents(false);
        window.setBackgroundColor(Some(&NSColor::clearColor()));
        window.setLevel(NSPopUpMenuWindowLevel);
        window.setCollectionBehavior(
            NSWindowCollectionBehavior::CanJoinAllSpaces
                | NSWindowCollectionBehavior::FullScreenAuxiliary
                | NSWindowCollectionBehavior::Stationary,
        );
        window.setContentView(Some(&**view));

        Self {
            window,
            view,
            mtm,
            tiles: RefCell::new(HashMap::default()),
        }
    }

    fn tiles_for(&self, inventory: &Inventory, page: usize) -> Rc<Vec<Tile>> {
        self.tiles
            .borrow_mut()
            .entry(page)
            .or_insert_with(|| Rc::new(inventory.page(page).iter().map(Tile::new).collect()))
            .clone()
    }

    fn fit_to_screen(&self) -> Size {
        let frame = NSScreen::mainScreen(self.mtm)
            .map(|screen| screen.frame())
            .unwrap_or_else(|| self.window.frame());
        if self.window.frame() != frame {
            self.window.setFrame_display(frame, false);
        }
        Size::new(frame.size.width, frame.size.height)
    }
}

impl Overlay for SwitcherOverlay {
    fn present(&self, inventory: &Inventory, cursor: Cursor) {
        let screen = self.fit_to_screen();
        let records = inventory.page(cursor.page);
        let thumbnail = records
            .first()
            .map(|r| Size::new(r.thumbnail.width() as f64, r.thumbnail.height() as f64))
            .unwrap_or_default();
        let pages = inventory.page_count();
        let scene = Scene {
            layout: GridLayout::new(screen, records.len(), pages, thumbnail),
            tiles: self.tiles_for(inventory, cursor.page),
            titles: records.iter().map(|r| r.display_title.clone()).collect(),
            selected: cursor.index,
            indicator: page_indicator(cursor.page, pages),
            pressed: None,
        };
        self.view.ivars().borrow_mut().scene = Some(scene);
        self.view.setNeedsDisplay(true);
        self.window.orderFrontRegardless();
    }

    fn set_pressed_arrow(&self, arrow: Option<PageArrow>) {
        if let Some(scene) = self.view.ivars().borrow_mut().scene.as_mut() {
            scene.pressed = arrow;
        }
        self.view.setNeedsDisplay(true);
    }

    fn dismiss(&self) {
        self.window.orderOut(None);
        self.view.ivars().borrow_mut().scene = None;
        self.tiles.borrow_mut().clear();
    }
}
