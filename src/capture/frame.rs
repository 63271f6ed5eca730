//! Frame type representing a sampled image with metadata.

use std::time::Instant;

/// Pixel layout of a frame's byte buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// One byte per pixel, luminance only.
    Luma8,
    /// Three bytes per pixel, interleaved R, G, B.
    Rgb8,
}

impl PixelFormat {
    /// Bytes used by a single pixel.
    #[inline]
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Luma8 => 1,
            PixelFormat::Rgb8 => 3,
        }
    }
}

/// A single frame sampled from an active camera session.
///
/// Frames are immutable snapshots. The scan loop produces one per tick
/// and drops it once the decode attempt returns.
#[derive(Clone)]
pub struct Frame {
    pixels: Vec<u8>,
    width: u32,
    height: u32,
    format: PixelFormat,
    timestamp: Instant,
    /// Monotonic sequence number within one camera session.
    sequence: u64,
}

impl Frame {
    /// Creates a new grayscale frame.
    pub fn new(pixels: Vec<u8>, width: u32, height: u32, sequence: u64) -> Self {
        Self::with_format(pixels, width, height, PixelFormat::Luma8, sequence)
    }

    /// Creates a new frame with an explicit pixel format.
    pub fn with_format(
        pixels: Vec<u8>,
        width: u32,
        height: u32,
        format: PixelFormat,
        sequence: u64,
    ) -> Self {
        Self {
            pixels,
            width,
            height,
            format,
            timestamp: Instant::now(),
            sequence,
        }
    }

    /// Returns a reference to the raw pixel data.
    #[inline]
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// Returns the sampling timestamp.
    #[inline]
    pub fn timestamp(&self) -> Instant {
        self.timestamp
    }

    /// Returns the sequence number.
    #[inline]
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Returns the total number of pixels (width * height).
    #[inline]
    pub fn pixel_count(&self) -> usize {
        (self.width as usize) * (self.height as usize)
    }

    /// Validates that the pixel buffer size matches dimensions and format.
    pub fn is_valid(&self) -> bool {
        self.pixels.len() == self.pixel_count() * self.format.bytes_per_pixel()
    }

    /// Returns the luminance plane, converting RGB with integer BT.601 weights.
    pub fn luma(&self) -> Vec<u8> {
        match self.format {
            PixelFormat::Luma8 => self.pixels.clone(),
            PixelFormat::Rgb8 => self
                .pixels
                .chunks_exact(3)
                .map(|px| {
                    let y = 299 * px[0] as u32 + 587 * px[1] as u32 + 114 * px[2] as u32;
                    (y / 1000) as u8
                })
                .collect(),
        }
    }

    /// Returns a grayscale copy with every pixel inverted.
    ///
    /// Used for decoding light-on-dark symbols. `self` is left untouched.
    pub fn inverted(&self) -> Frame {
        let pixels = self.luma().into_iter().map(|v| 255 - v).collect();
        Frame {
            pixels,
            width: self.width,
            height: self.height,
            format: PixelFormat::Luma8,
            timestamp: self.timestamp,
            sequence: self.sequence,
        }
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("format", &self.format)
            .field("sequence", &self.sequence)
            .field("pixel_bytes", &self.pixels.len())
            .finish()
    }
}
