//! Window previews at a fixed target size.
//!
//! Live captures are scaled to fit and centered on a transparent canvas; the
//! full-resolution buffer is consumed by the resize and dropped before the
//! next window is captured. Anything that cannot be captured gets the icon
//! placeholder, which is a pure function of the target size and the icon.

use std::cell::Cell;
use std::rc::Rc;

use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};
use tracing::debug;

use crate::model::{Rect, Thumbnail, ThumbnailKind, WindowServerId};
use crate::switcher::sources::ScreenCapture;

/// Captures with an edge shorter than this are treated as failed.
pub const MIN_CAPTURE_EDGE: u32 = 4;

const GRADIENT_TOP: [u8; 3] = [72, 78, 96];
const GRADIENT_BOTTOM: [u8; 3] = [28, 30, 40];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetSize {
    pub width: u32,
    pub height: u32,
}

impl TargetSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width: width.max(1), height: height.max(1) }
    }
}

/// Largest size with the source's aspect ratio that fits inside `box_`.
pub fn aspect_fit(width: u32, height: u32, box_: TargetSize) -> (u32, u32) {
    if width == 0 || height == 0 {
        return (0, 0);
    }
    let scale = f64::min(
        box_.width as f64 / width as f64,
        box_.height as f64 / height as f64,
    );
    let fit = |edge: u32, limit: u32| ((edge as f64 * scale).round() as u32).clamp(1, limit);
    (fit(width, box_.width), fit(height, box_.height))
}

/// Scales `source` into a transparent canvas of exactly `target`.
pub fn fit_into(source: RgbaImage, target: TargetSize) -> RgbaImage {
    let (w, h) = aspect_fit(source.width(), source.height(), target);
    let scaled = imageops::resize(&source, w, h, FilterType::Triangle);
    drop(source);
    let mut canvas = RgbaImage::new(target.width, target.height);
    let x = (target.width - w) / 2;
    let y = (target.height - h) / 2;
    imageops::overlay(&mut canvas, &scaled, x as i64, y as i64);
    canvas
}

fn lerp(a: u8, b: u8, t: f64) -> u8 { (a as f64 + (b as f64 - a as f64) * t).round() as u8 }

/// Gradient background with the application icon centered on it.
pub fn render_placeholder(target: TargetSize, icon: Option<&RgbaImage>) -> Thumbnail {
    let span = target.height.saturating_sub(1).max(1) as f64;
    let mut image = RgbaImage::from_fn(target.width, target.height, |_, y| {
        let t = y as f64 / span;
        Rgba([
            lerp(GRADIENT_TOP[0], GRADIENT_BOTTOM[0], t),
            lerp(GRADIENT_TOP[1], GRADIENT_BOTTOM[1], t),
            lerp(GRADIENT_TOP[2], GRADIENT_BOTTOM[2], t),
            255,
        ])
    });
    if let Some(icon) = icon.filter(|i| i.width() > 0 && i.height() > 0) {
        let edge = (target.width.min(target.height) / 2).max(1);
        let (w, h) = aspect_fit(icon.width(), icon.height(), TargetSize::new(edge, edge));
        let scaled = imageops::resize(icon, w, h, FilterType::Triangle);
        let x = (target.width.saturating_sub(w)) / 2;
        let y = (target.height.saturating_sub(h)) / 2;
        imageops::overlay(&mut image, &scaled, x as i64, y as i64);
    }
    Thumbnail { image, kind: ThumbnailKind::Placeholder }
}

pub struct ThumbnailCapturer {
    capture: Rc<dyn ScreenCapture>,
    target: Cell<TargetSize>,
    live_enabled: Cell<bool>,
}

impl ThumbnailCapturer {
    pub fn new(capture: Rc<dyn ScreenCapture>, target: TargetSize) -> Self {
        Self {
            capture,
            target: Cell::new(target),
            live_enabled: Cell::new(true),
        }
    }

    pub fn target(&self) -> TargetSize { self.target.get() }

    pub fn set_target(&self, target: TargetSize) { self.target.set(target) }

    /// Without screen-recording access every thumbnail is a placeholder.
    pub fn set_live_enabled(&self, enabled: bool) { self.live_enabled.set(enabled) }

    pub fn live_enabled(&self) -> bool { self.live_enabled.get() }

    pub fn capture(
        &self,
        id: WindowServerId,
        bounds: Rect,
        is_minimized: bool,
        icon: Option<&RgbaImage>,
    ) -> Thumbnail {
        let target = self.target.get();
        if !id.is_resolved() || !self.live_enabled.get() {
            return render_placeholder(target, icon);
        }
        match self.capture.capture(id) {
            Some(raw) if raw.width() >= MIN_CAPTURE_EDGE && raw.height() >= MIN_CAPTURE_EDGE => {
                Thumbnail {
                    image: fit_into(raw, target),
                    kind: ThumbnailKind::Live,
                }
            }
            Some(raw) => {
                debug!(%id, width = raw.width(), height = raw.height(), "degenerate capture");
                render_placeholder(target, icon)
            }
            None => {
                debug!(%id, ?bounds, is_minimized, "capture failed");
                render_placeholder(target, icon)
            }
        }
    }
}
