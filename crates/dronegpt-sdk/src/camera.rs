//! Camera stream surface.

use std::sync::Arc;

use tokio::sync::watch;

/// Pixel layout of a raw camera frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameFormat {
    /// Y plane followed by interleaved V/U at quarter resolution.
    Nv21,
    /// 4 bytes per pixel, R G B A.
    Rgba8888,
    /// Planar Y, U, V at quarter resolution.
    Yuv420,
}

impl FrameFormat {
    /// Bytes a `width` x `height` frame occupies in this format.
    pub fn frame_len(&self, width: u32, height: u32) -> usize {
        let pixels = width as usize * height as usize;
        match self {
            Self::Nv21 | Self::Yuv420 => {
                let chroma = (width as usize).div_ceil(2) * (height as usize).div_ceil(2);
                pixels + 2 * chroma
            }
            Self::Rgba8888 => pixels * 4,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RawFrame {
    pub data: Arc<[u8]>,
    pub format: FrameFormat,
    pub width: u32,
    pub height: u32,
}

impl RawFrame {
    pub fn new(data: impl Into<Arc<[u8]>>, format: FrameFormat, width: u32, height: u32) -> Self {
        Self {
            data: data.into(),
            format,
            width,
            height,
        }
    }
}

/// Source of camera frames. Only the newest frame is kept; a receiver that
/// falls behind sees the latest frame, never a backlog.
pub trait CameraStream: Send + Sync {
    fn frames(&self) -> watch::Receiver<Option<RawFrame>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_len() {
        assert_eq!(FrameFormat::Rgba8888.frame_len(4, 2), 32);
        assert_eq!(FrameFormat::Nv21.frame_len(4, 2), 12);
        assert_eq!(FrameFormat::Nv21.frame_len(3, 3), 9 + 8);
    }
}
