//! Image resizing with pixel-centre alignment.
//!
//! # Filters
//!
//! - [`ResizeFilter::Nearest`] - no interpolation (blocky)
//! - [`ResizeFilter::Bilinear`] - 2×2 tap linear interpolation
//!
//! Both directions are allowed: [`fit_dimensions`] scales up as well as down
//! so a small image fills the preview box.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{LutoolsError, LutoolsResult};
use crate::image::PixelBuffer;

/// Resampling filter for resize operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResizeFilter {
    /// Nearest-neighbour sampling.
    Nearest,
    /// Bilinear interpolation.
    #[default]
    Bilinear,
}

/// Resize `src` to exactly `width × height`.
pub fn resize(
    src: &PixelBuffer,
    width: u32,
    height: u32,
    filter: ResizeFilter,
) -> LutoolsResult<PixelBuffer> {
    if width == 0 || height == 0 {
        return Err(LutoolsError::InvalidDimensions(format!(
            "target size must be at least 1x1, got {width}x{height}"
        )));
    }
    if src.dimensions() == (width, height) {
        return Ok(src.clone());
    }

    let out = match filter {
        ResizeFilter::Nearest => resize_nearest(src, width, height),
        ResizeFilter::Bilinear => resize_bilinear(src, width, height),
    };
    Ok(out)
}

/// Scale `src` to the largest size that fits inside `max_width × max_height`
/// while keeping its aspect ratio. See [`fit_dimensions`].
pub fn fit_within(
    src: &PixelBuffer,
    max_width: u32,
    max_height: u32,
    filter: ResizeFilter,
) -> LutoolsResult<PixelBuffer> {
    let (width, height) = fit_dimensions(src.width(), src.height(), max_width, max_height)?;
    resize(src, width, height, filter)
}

/// Calculates the aspect-preserving dimensions for a bounding box.
///
/// `scale = min(max_w / w, max_h / h)`; each side becomes
/// `max(1, round(side × scale))`, never exceeding the box.
///
/// ```
/// use lutools_core::resample::fit_dimensions;
///
/// assert_eq!(fit_dimensions(1920, 1080, 640, 480).unwrap(), (640, 360));
/// assert_eq!(fit_dimensions(100, 50, 400, 400).unwrap(), (400, 200));
/// ```
pub fn fit_dimensions(
    width: u32,
    height: u32,
    max_width: u32,
    max_height: u32,
) -> LutoolsResult<(u32, u32)> {
    if width == 0 || height == 0 || max_width == 0 || max_height == 0 {
        return Err(LutoolsError::InvalidDimensions(format!(
            "cannot fit {width}x{height} into {max_width}x{max_height}"
        )));
    }

    let scale_w = max_width as f64 / width as f64;
    let scale_h = max_height as f64 / height as f64;
    let scale = scale_w.min(scale_h);

    let new_w = ((width as f64 * scale).round() as u32).clamp(1, max_width);
    let new_h = ((height as f64 * scale).round() as u32).clamp(1, max_height);
    Ok((new_w, new_h))
}

fn resize_nearest(src: &PixelBuffer, width: u32, height: u32) -> PixelBuffer {
    let xs: Vec<usize> = (0..width)
        .map(|x| nearest_index(x, src.width(), width))
        .collect();
    let pixels = src.pixels();
    let src_w = src.width() as usize;
    let mut out = PixelBuffer::zeroed(width, height);
    let stride = out.stride();

    out.as_bytes_mut()
        .par_chunks_mut(stride)
        .enumerate()
        .for_each(|(y, row)| {
            let sy = nearest_index(y as u32, src.height(), height);
            let src_row = &pixels[sy * src_w..(sy + 1) * src_w];
            for (dst, &sx) in row.chunks_exact_mut(3).zip(&xs) {
                dst.copy_from_slice(&src_row[sx]);
            }
        });
    out
}

fn resize_bilinear(src: &PixelBuffer, width: u32, height: u32) -> PixelBuffer {
    let xs: Vec<Tap> = (0..width).map(|x| Tap::new(x, src.width(), width)).collect();
    let pixels = src.pixels();
    let src_w = src.width() as usize;
    let mut out = PixelBuffer::zeroed(width, height);
    let stride = out.stride();

    out.as_bytes_mut()
        .par_chunks_mut(stride)
        .enumerate()
        .for_each(|(y, row)| {
            let ty = Tap::new(y as u32, src.height(), height);
            let row0 = &pixels[ty.lo * src_w..(ty.lo + 1) * src_w];
            let row1 = &pixels[ty.hi * src_w..(ty.hi + 1) * src_w];
            for (dst, tx) in row.chunks_exact_mut(3).zip(&xs) {
                for c in 0..3 {
                    let top = lerp(row0[tx.lo][c], row0[tx.hi][c], tx.t);
                    let bottom = lerp(row1[tx.lo][c], row1[tx.hi][c], tx.t);
                    let v = top + (bottom - top) * ty.t;
                    dst[c] = v.round().clamp(0.0, 255.0) as u8;
                }
            }
        });
    out
}

/// Source sample index for an output coordinate, centre aligned.
fn nearest_index(dst: u32, src_len: u32, dst_len: u32) -> usize {
    let scale = src_len as f32 / dst_len as f32;
    let pos = (dst as f32 + 0.5) * scale;
    (pos.floor() as usize).min(src_len as usize - 1)
}

/// Two source indices and the weight of the second.
struct Tap {
    lo: usize,
    hi: usize,
    t: f32,
}

impl Tap {
    fn new(dst: u32, src_len: u32, dst_len: u32) -> Self {
        let scale = src_len as f32 / dst_len as f32;
        let max = (src_len - 1) as f32;
        let center = ((dst as f32 + 0.5) * scale - 0.5).clamp(0.0, max);
        let lo = center.floor() as usize;
        let hi = (lo + 1).min(src_len as usize - 1);
        Self {
            lo,
            hi,
            t: center - lo as f32,
        }
    }
}

#[inline]
fn lerp(a: u8, b: u8, t: f32) -> f32 {
    a as f32 + (b as f32 - a as f32) * t
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn checker(width: u32, height: u32) -> PixelBuffer {
        let mut data = Vec::new();
        for y in 0..height {
            for x in 0..width {
                let v = if (x + y) % 2 == 0 { 255 } else { 0 };
                data.extend_from_slice(&[v, v / 2, 255 - v]);
            }
        }
        PixelBuffer::from_raw(width, height, 3, data).unwrap()
    }

    #[test]
    fn test_resize_returns_exact_target() {
        let src = checker(13, 7);
        for (w, h) in [(1, 1), (26, 14), (5, 9), (100, 3)] {
            for filter in [ResizeFilter::Nearest, ResizeFilter::Bilinear] {
                let out = resize(&src, w, h, filter).unwrap();
                assert_eq!(out.dimensions(), (w, h));
                assert_eq!(out.as_bytes().len(), (w * h * 3) as usize);
            }
        }
    }

    #[test]
    fn test_resize_same_size_is_identity() {
        let src = checker(6, 4);
        assert_eq!(resize(&src, 6, 4, ResizeFilter::Bilinear).unwrap(), src);
    }

    #[test]
    fn test_uniform_image_stays_uniform() {
        let src = PixelBuffer::filled(9, 5, [12, 200, 77]).unwrap();
        let out = resize(&src, 4, 17, ResizeFilter::Bilinear).unwrap();
        assert!(out.pixels().iter().all(|p| *p == [12, 200, 77]));
    }

    #[test]
    fn test_bilinear_halving_averages_pairs() {
        let src = PixelBuffer::from_raw(2, 1, 3, vec![0, 0, 0, 200, 100, 50]).unwrap();
        let out = resize(&src, 1, 1, ResizeFilter::Bilinear).unwrap();
        assert_eq!(out.pixel(0, 0), [100, 50, 25]);
    }

    #[test]
    fn test_nearest_doubling_replicates_pixels() {
        let src = checker(2, 2);
        let out = resize(&src, 4, 4, ResizeFilter::Nearest).unwrap();
        assert_eq!(out.pixel(0, 0), src.pixel(0, 0));
        assert_eq!(out.pixel(1, 1), src.pixel(0, 0));
        assert_eq!(out.pixel(2, 0), src.pixel(1, 0));
        assert_eq!(out.pixel(3, 3), src.pixel(1, 1));
    }

    #[test]
    fn test_zero_target_rejected() {
        let src = checker(2, 2);
        let err = resize(&src, 0, 4, ResizeFilter::Nearest).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidDimensions);
    }

    #[test]
    fn test_fit_dimensions_downscale() {
        assert_eq!(fit_dimensions(1920, 1080, 640, 480).unwrap(), (640, 360));
        assert_eq!(fit_dimensions(1080, 1920, 512, 512).unwrap(), (288, 512));
    }

    #[test]
    fn test_fit_dimensions_upscales() {
        assert_eq!(fit_dimensions(4, 4, 512, 512).unwrap(), (512, 512));
    }

    #[test]
    fn test_fit_dimensions_never_below_one() {
        assert_eq!(fit_dimensions(10_000, 1, 100, 100).unwrap(), (100, 1));
    }

    #[test]
    fn test_fit_preserves_aspect_within_a_pixel() {
        for (w, h) in [(1000, 750), (333, 777), (4096, 17), (3, 5)] {
            let (fw, fh) = fit_dimensions(w, h, 500, 300).unwrap();
            assert!(fw <= 500 && fh <= 300);
            let (w, h, fw, fh) = (w as f64, h as f64, fw as f64, fh as f64);
            let height_ok = (fh - fw * h / w).abs() <= 1.0;
            let width_ok = (fw - fh * w / h).abs() <= 1.0;
            assert!(height_ok || width_ok, "{w}x{h} -> {fw}x{fh}");
        }
    }

    #[test]
    fn test_fit_zero_box_rejected() {
        let err = fit_dimensions(10, 10, 0, 10).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidDimensions);
    }

    #[test]
    fn test_fit_within_resizes() {
        let src = checker(40, 20);
        let out = fit_within(&src, 10, 10, ResizeFilter::Bilinear).unwrap();
        assert_eq!(out.dimensions(), (10, 5));
    }
}
