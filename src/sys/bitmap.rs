//! Drawing `CGImage`s into RGBA buffers we own.

use std::ffi::c_void;

use core_graphics::geometry::{CGPoint, CGRect, CGSize};
use image::RgbaImage;

pub type CGImageRef = *const c_void;
type CGContextRef = *const c_void;
type CGColorSpaceRef = *const c_void;

const kCGImageAlphaPremultipliedLast: u32 = 1;
const kCGBitmapByteOrder32Big: u32 = 4 << 12;

#[link(name = "CoreGraphics", kind = "framework")]
unsafe extern "C" {
    fn CGImageGetWidth(image: CGImageRef) -> usize;
    fn CGImageGetHeight(image: CGImageRef) -> usize;
    fn CGColorSpaceCreateDeviceRGB() -> CGColorSpaceRef;
    fn CGColorSpaceRelease(space: CGColorSpaceRef);
    fn CGBitmapContextCreate(
        data: *mut c_void,
        width: usize,
        height: usize,
        bits_per_component: usize,
        bytes_per_row: usize,
        space: CGColorSpaceRef,
        bitmap_info: u32,
    ) -> CGContextRef;
    fn CGContextDrawImage(context: CGContextRef, rect: CGRect, image: CGImageRef);
    fn CGContextRelease(context: CGContextRef);
}

/// Pixel size of `image`.
unsafe fn image_size(image: CGImageRef) -> (usize, usize) {
    unsafe { (CGImageGetWidth(image), CGImageGetHeight(image)) }
}

/// Draws `image` scaled to `width` x `height`.
pub unsafe fn rasterize(image: CGImageRef, width: usize, height: usize) -> Option<RgbaImage> {
    if image.is_null() || width == 0 || height == 0 {
        return None;
    }
    let mut buffer = vec![0u8; width * height * 4];
    unsafe {
        let space = CGColorSpaceCreateDeviceRGB();
        let context = CGBitmapContextCreate(
            buffer.as_mut_ptr().cast(),
            width,
            height,
            8,
            width * 4,
            space,
            kCGImageAlphaPremultipliedLast | kCGBitmapByteOrder32Big,
        );
        CGColorSpaceRelease(space);
        if context.is_null() {
            return None;
        }
        let rect = CGRect::new(
            &CGPoint::new(0.0, 0.0),
            &CGSize::new(width as f64, height as f64),
        );
        CGContextDrawImage(context, rect, image);
        CGContextRelease(context);
    }
    unpremultiply(&mut buffer);
    RgbaImage::from_raw(u32::try_from(width).ok()?, u32::try_from(height).ok()?, buffer)
}

/// Draws `image` at its own pixel size.
pub unsafe fn rasterize_native(image: CGImageRef) -> Option<RgbaImage> {
    if image.is_null() {
        return None;
    }
    let (width, height) = unsafe { image_size(image) };
    unsafe { rasterize(image, width, height) }
}

fn unpremultiply(buffer: &mut [u8]) {
    for px in buffer.chunks_exact_mut(4) {
        let alpha = px[3] as u32;
        if alpha == 0 || alpha == 255 {
            continue;
        }
        for channel in &mut px[..3] {
            *channel = ((*channel as u32 * 255 + alpha / 2) / alpha).min(255) as u8;
        }
    }
}
