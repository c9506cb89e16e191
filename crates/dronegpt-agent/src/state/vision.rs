//! Latest camera frame, encoded as JPEG.

use std::sync::{Arc, PoisonError, RwLock};

use dronegpt_sdk::{FrameFormat, RawFrame};
use image::codecs::jpeg::JpegEncoder;
use image::{ImageBuffer, RgbImage};

use crate::error::VisionError;

/// Holds only the newest encoded frame. Older frames are discarded.
#[derive(Debug)]
pub struct VisionFeed {
    latest: RwLock<Option<Arc<[u8]>>>,
    quality: u8,
}

impl VisionFeed {
    pub fn new(quality: u8) -> Self {
        Self {
            latest: RwLock::new(None),
            quality,
        }
    }

    /// Encode `frame` and make it the current image. On failure the previous
    /// image stays in place.
    pub fn update_frame(&self, frame: &RawFrame) -> Result<(), VisionError> {
        let jpeg = encode_jpeg(frame, self.quality)?;
        *self.latest.write().unwrap_or_else(PoisonError::into_inner) = Some(jpeg.into());
        Ok(())
    }

    /// Most recent JPEG, or `None` before the first frame.
    pub fn snapshot(&self) -> Option<Arc<[u8]>> {
        self.latest
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Convert a raw frame to RGB and compress it.
pub fn encode_jpeg(frame: &RawFrame, quality: u8) -> Result<Vec<u8>, VisionError> {
    let expected = frame.format.frame_len(frame.width, frame.height);
    if !matches!(frame.format, FrameFormat::Nv21 | FrameFormat::Rgba8888) {
        return Err(VisionError::UnsupportedFormat(frame.format));
    }
    if frame.data.len() != expected {
        return Err(VisionError::BadLength {
            width: frame.width,
            height: frame.height,
            expected,
            actual: frame.data.len(),
        });
    }

    let rgb = match frame.format {
        FrameFormat::Nv21 => nv21_to_rgb(&frame.data, frame.width, frame.height),
        _ => rgba_to_rgb(&frame.data),
    };
    let image: RgbImage = ImageBuffer::from_raw(frame.width, frame.height, rgb).ok_or(
        VisionError::BadLength {
            width: frame.width,
            height: frame.height,
            expected,
            actual: frame.data.len(),
        },
    )?;

    let mut jpeg = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut jpeg, quality);
    encoder.encode_image(&image)?;
    Ok(jpeg)
}

fn rgba_to_rgb(data: &[u8]) -> Vec<u8> {
    data.chunks_exact(4)
        .flat_map(|pixel| [pixel[0], pixel[1], pixel[2]])
        .collect()
}

/// Full-range BT.601. NV21 stores V before U in the interleaved chroma plane.
fn nv21_to_rgb(data: &[u8], width: u32, height: u32) -> Vec<u8> {
    let width = width as usize;
    let height = height as usize;
    let chroma = &data[width * height..];
    let chroma_stride = width.div_ceil(2) * 2;

    let mut rgb = Vec::with_capacity(width * height * 3);
    for y in 0..height {
        for x in 0..width {
            let luma = data[y * width + x] as f32;
            let offset = (y / 2) * chroma_stride + (x / 2) * 2;
            let v = chroma[offset] as f32 - 128.0;
            let u = chroma[offset + 1] as f32 - 128.0;

            rgb.push(clamp_channel(luma + 1.402 * v));
            rgb.push(clamp_channel(luma - 0.344_136 * u - 0.714_136 * v));
            rgb.push(clamp_channel(luma + 1.772 * u));
        }
    }
    rgb
}

fn clamp_channel(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_jpeg(bytes: &[u8]) -> bool {
        bytes.starts_with(&[0xFF, 0xD8]) && bytes.ends_with(&[0xFF, 0xD9])
    }

    #[test]
    fn test_snapshot_empty_before_first_frame() {
        assert!(VisionFeed::new(90).snapshot().is_none());
    }

    #[test]
    fn test_rgba_frame_encodes() {
        let feed = VisionFeed::new(90);
        let frame = RawFrame::new(vec![200u8; 8 * 8 * 4], FrameFormat::Rgba8888, 8, 8);
        feed.update_frame(&frame).unwrap();
        assert!(is_jpeg(&feed.snapshot().unwrap()));
    }

    #[test]
    fn test_nv21_frame_encodes() {
        let frame = RawFrame::new(
            vec![128u8; FrameFormat::Nv21.frame_len(6, 4)],
            FrameFormat::Nv21,
            6,
            4,
        );
        assert!(is_jpeg(&encode_jpeg(&frame, 100).unwrap()));
    }

    #[test]
    fn test_nv21_grey_stays_grey() {
        let data = [
            100, 100, 100, 100, // luma
            128, 128, // V, U
        ];
        assert_eq!(nv21_to_rgb(&data, 2, 2), vec![100; 12]);
    }

    #[test]
    fn test_nv21_red_chroma() {
        let data = [76, 255, 85];
        let rgb = nv21_to_rgb(&data, 1, 1);
        assert!(rgb[0] > 250, "red channel {}", rgb[0]);
        assert!(rgb[1] < 5, "green channel {}", rgb[1]);
    }

    #[test]
    fn test_bad_frame_keeps_previous_image() {
        let feed = VisionFeed::new(90);
        let good = RawFrame::new(vec![0u8; 4 * 4 * 4], FrameFormat::Rgba8888, 4, 4);
        feed.update_frame(&good).unwrap();
        let before = feed.snapshot().unwrap();

        let short = RawFrame::new(vec![0u8; 10], FrameFormat::Rgba8888, 4, 4);
        assert!(matches!(
            feed.update_frame(&short),
            Err(VisionError::BadLength { expected: 64, actual: 10, .. })
        ));

        let yuv = RawFrame::new(
            vec![0u8; FrameFormat::Yuv420.frame_len(4, 4)],
            FrameFormat::Yuv420,
            4,
            4,
        );
        assert!(matches!(
            feed.update_frame(&yuv),
            Err(VisionError::UnsupportedFormat(FrameFormat::Yuv420))
        ));

        assert_eq!(feed.snapshot().unwrap(), before);
    }
}
