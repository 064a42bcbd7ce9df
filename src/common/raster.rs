//! Handing bitmaps to AppKit as TIFF, a format `NSImage` accepts through
//! `initWithData:`.

use std::io::Cursor;

use image::{ImageFormat, RgbaImage};
use tracing::debug;

pub fn encode_tiff(image: &RgbaImage) -> Option<Vec<u8>> {
    let mut out = Cursor::new(Vec::new());
    match image.write_to(&mut out, ImageFormat::Tiff) {
        Ok(()) => Some(out.into_inner()),
        Err(err) => {
            debug!(%err, "tiff encode failed");
            None
        }
    }
}
