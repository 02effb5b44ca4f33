//! Owned 8-bit RGB pixel buffers and raster file I/O.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use ::image::codecs::jpeg::JpegEncoder;
use ::image::RgbImage;

use crate::error::{LutoolsError, LutoolsResult};

/// Samples per pixel. Every buffer in the engine is packed RGB.
pub const CHANNELS: u32 = 3;

/// An 8-bit RGB image, row-major, no padding.
///
/// Output buffers are handed to the caller by value. Dropping the buffer or
/// calling [`PixelBuffer::release`] frees it; the move makes a second release
/// or a use after release a compile error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// Wrap raw samples. `channels` must be 3 and `data` must hold exactly
    /// `width × height × channels` bytes.
    pub fn from_raw(width: u32, height: u32, channels: u32, data: Vec<u8>) -> LutoolsResult<Self> {
        if width == 0 || height == 0 {
            return Err(LutoolsError::InvalidDimensions(format!(
                "image must be at least 1x1, got {width}x{height}"
            )));
        }
        if channels != CHANNELS {
            return Err(LutoolsError::InvalidDimensions(format!(
                "expected {CHANNELS} channels, got {channels}"
            )));
        }
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|n| n.checked_mul(CHANNELS as usize))
            .ok_or_else(|| LutoolsError::InvalidDimensions("image dimensions overflow".into()))?;
        if data.len() != expected {
            return Err(LutoolsError::InvalidDimensions(format!(
                "expected {expected} bytes for {width}x{height} RGB, got {}",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// A buffer where every pixel has the same color.
    pub fn filled(width: u32, height: u32, rgb: [u8; 3]) -> LutoolsResult<Self> {
        let count = width as usize * height as usize;
        let data = rgb.iter().copied().cycle().take(count * 3).collect();
        Self::from_raw(width, height, CHANNELS, data)
    }

    /// Allocate a zeroed buffer of the given size. Callers fill it in place.
    pub(crate) fn zeroed(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0; width as usize * height as usize * CHANNELS as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u32 {
        CHANNELS
    }

    /// `(width, height)`.
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Number of bytes in one row.
    pub fn stride(&self) -> usize {
        self.width as usize * CHANNELS as usize
    }

    /// Flat sample view.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub(crate) fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Per-pixel view.
    pub fn pixels(&self) -> &[[u8; 3]] {
        bytemuck::cast_slice(&self.data)
    }

    /// The pixel at `(x, y)`.
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 3] {
        self.pixels()[y as usize * self.width as usize + x as usize]
    }

    /// Give up the buffer and return the raw samples.
    pub fn into_raw(self) -> Vec<u8> {
        self.data
    }

    /// Release the buffer. Equivalent to dropping it.
    pub fn release(self) {}

    /// Decode a raster file (PNG, JPEG, TIFF, BMP) into 8-bit RGB.
    pub fn load(path: &Path) -> LutoolsResult<Self> {
        let img = ::image::open(path).map_err(|e| LutoolsError::image(path, e))?;
        let rgb = img.to_rgb8();
        let (width, height) = rgb.dimensions();
        Self::from_raw(width, height, CHANNELS, rgb.into_raw())
    }

    /// Encode to `path`. `.jpg`/`.jpeg` use `jpeg_quality`; other extensions
    /// use the format the extension implies.
    pub fn save(&self, path: &Path, jpeg_quality: u8) -> LutoolsResult<()> {
        let img = RgbImage::from_raw(self.width, self.height, self.data.clone()).ok_or_else(|| {
            LutoolsError::InvalidDimensions("buffer does not match its dimensions".into())
        })?;

        let is_jpeg = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("jpg") || e.eq_ignore_ascii_case("jpeg"));

        if is_jpeg {
            let file = File::create(path).map_err(|e| LutoolsError::io(path, e))?;
            let mut writer = BufWriter::new(file);
            let encoder = JpegEncoder::new_with_quality(&mut writer, jpeg_quality);
            img.write_with_encoder(encoder)
                .map_err(|e| LutoolsError::image(path, e))?;
            writer.flush().map_err(|e| LutoolsError::io(path, e))
        } else {
            img.save(path).map_err(|e| LutoolsError::image(path, e))
        }
    }
}
