use serde::{Deserialize, Serialize};

use crate::error::SinkError;

/// Smallest/largest negotiable frame edge, in pixels.
pub const DIM_MIN: u32 = 16;
pub const DIM_MAX: u32 = 4096;

/// Pixel format tag carried by a negotiation request.
///
/// The sink itself only accepts [`PixelFormat::I420`]; the other tags exist
/// so a negotiation request can be *expressed* and rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PixelFormat {
    /// I420 / YUV420P (YUV 4:2:0 planar, with Y, U, V as separate planes).
    I420,
    /// NV12 (YUV 4:2:0 semi-planar).
    Nv12,
    /// RGBA 8-bit per channel.
    Rgba,
}

/// Pixel aspect ratio of the source stream (non-square source pixels).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Par {
    pub num: u32,
    pub den: u32,
}

impl Par {
    pub const SQUARE: Par = Par { num: 1, den: 1 };
}

/// A format negotiation request from the upstream pipeline.
///
/// `par` is optional because upstream caps may omit it; the sink rejects
/// such requests rather than guessing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoFormat {
    pub format: PixelFormat,
    pub width: u32,
    pub height: u32,
    pub par: Option<Par>,
}

impl VideoFormat {
    pub fn i420(width: u32, height: u32, par_num: u32, par_den: u32) -> Self {
        Self {
            format: PixelFormat::I420,
            width,
            height,
            par: Some(Par {
                num: par_num,
                den: par_den,
            }),
        }
    }
}

/// Byte layout of one planar I420 frame at a negotiated geometry.
///
/// Chroma planes are half resolution in each axis, rounded down. Offsets are
/// relative to the start of the contiguous frame buffer: Y, then U, then V.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameLayout {
    pub width: u32,
    pub height: u32,
    pub chroma_width: u32,
    pub chroma_height: u32,
}

impl FrameLayout {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            chroma_width: width / 2,
            chroma_height: height / 2,
        }
    }

    pub fn luma_len(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn chroma_len(&self) -> usize {
        self.chroma_width as usize * self.chroma_height as usize
    }

    /// Total buffer length the upload path consumes.
    pub fn total_len(&self) -> usize {
        self.luma_len() + 2 * self.chroma_len()
    }

    pub fn y_offset(&self) -> usize {
        0
    }

    pub fn u_offset(&self) -> usize {
        self.luma_len()
    }

    pub fn v_offset(&self) -> usize {
        self.luma_len() + self.chroma_len()
    }

    /// Checks a frame buffer against this layout.
    pub fn check(&self, buf: &[u8]) -> Result<(), SinkError> {
        if buf.len() != self.total_len() {
            return Err(SinkError::InvalidFrame {
                expected: self.total_len(),
                actual: buf.len(),
            });
        }
        Ok(())
    }
}

/// Negotiated display geometry: encoded size plus the PAR-corrected size the
/// scale pass letterboxes into the window.
///
/// The display's own pixel aspect ratio is not discoverable here, so square
/// display pixels are assumed: only the width is corrected, the height is
/// left unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayGeometry {
    pub video_width: u32,
    pub video_height: u32,
    pub par: Par,
    pub display_width: u32,
    pub display_height: u32,
}

impl DisplayGeometry {
    /// Validates a negotiation request and computes display geometry.
    ///
    /// Accepts only planar I420 within the negotiable size range, and only
    /// when PAR metadata is present.
    pub fn negotiate(format: &VideoFormat) -> Result<Self, SinkError> {
        if format.format != PixelFormat::I420 {
            return Err(SinkError::Negotiation(format!(
                "unsupported pixel format {:?}, only I420 is accepted",
                format.format
            )));
        }

        let Some(par) = format.par else {
            return Err(SinkError::Negotiation(
                "request carries no pixel-aspect-ratio".into(),
            ));
        };
        if par.num == 0 || par.den == 0 {
            return Err(SinkError::Negotiation(format!(
                "degenerate pixel-aspect-ratio {}/{}",
                par.num, par.den
            )));
        }

        for (name, dim) in [("width", format.width), ("height", format.height)] {
            if !(DIM_MIN..=DIM_MAX).contains(&dim) {
                return Err(SinkError::Negotiation(format!(
                    "{name} {dim} outside negotiable range [{DIM_MIN}, {DIM_MAX}]"
                )));
            }
        }

        // Scale the width by PAR against assumed square display pixels,
        // rounding to nearest.
        let num = par.num as u64;
        let den = par.den as u64;
        let display_width = ((format.width as u64 * num + den / 2) / den) as u32;

        Ok(Self {
            video_width: format.width,
            video_height: format.height,
            par,
            display_width,
            display_height: format.height,
        })
    }

    pub fn layout(&self) -> FrameLayout {
        FrameLayout::new(self.video_width, self.video_height)
    }
}

/// A borrowed view of one I420 frame buffer plus its negotiated layout.
///
/// The view is only valid for the duration of one render call; nothing may
/// retain it past the render-complete signal.
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    pub layout: FrameLayout,
    pub data: &'a [u8],
}

impl<'a> Frame<'a> {
    pub fn new(layout: FrameLayout, data: &'a [u8]) -> Result<Self, SinkError> {
        layout.check(data)?;
        Ok(Self { layout, data })
    }

    pub fn y_plane(&self) -> &'a [u8] {
        &self.data[..self.layout.luma_len()]
    }

    pub fn u_plane(&self) -> &'a [u8] {
        &self.data[self.layout.u_offset()..self.layout.v_offset()]
    }

    pub fn v_plane(&self) -> &'a [u8] {
        &self.data[self.layout.v_offset()..self.layout.total_len()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_lengths_match_i420_arithmetic() {
        for (w, h) in [(16u32, 16u32), (720, 576), (1920, 1080), (4096, 4096)] {
            let l = FrameLayout::new(w, h);
            assert_eq!(l.luma_len(), (w * h) as usize);
            assert_eq!(l.chroma_len(), ((w / 2) * (h / 2)) as usize);
            assert_eq!(
                l.total_len(),
                (w * h + 2 * ((w / 2) * (h / 2))) as usize
            );
            assert_eq!(l.u_offset(), l.luma_len());
            assert_eq!(l.v_offset(), l.luma_len() + l.chroma_len());
        }
    }

    #[test]
    fn layout_check_rejects_short_and_long_buffers() {
        let l = FrameLayout::new(720, 576);
        assert!(l.check(&vec![0u8; l.total_len()]).is_ok());
        assert!(l.check(&vec![0u8; l.total_len() - 1]).is_err());
        assert!(l.check(&vec![0u8; l.total_len() + 1]).is_err());
    }

    #[test]
    fn negotiate_accepts_i420_with_par() {
        let g = DisplayGeometry::negotiate(&VideoFormat::i420(720, 576, 1, 1)).unwrap();
        assert_eq!(g.display_width, 720);
        assert_eq!(g.display_height, 576);
    }

    #[test]
    fn negotiate_corrects_width_only() {
        // 720x576 @ 16:15 PAR is the classic PAL 4:3 case.
        let g = DisplayGeometry::negotiate(&VideoFormat::i420(720, 576, 16, 15)).unwrap();
        assert_eq!(g.display_width, 768);
        assert_eq!(g.display_height, 576);
    }

    #[test]
    fn negotiate_rejects_non_i420() {
        for format in [PixelFormat::Nv12, PixelFormat::Rgba] {
            let req = VideoFormat {
                format,
                width: 720,
                height: 576,
                par: Some(Par::SQUARE),
            };
            assert!(matches!(
                DisplayGeometry::negotiate(&req),
                Err(SinkError::Negotiation(_))
            ));
        }
    }

    #[test]
    fn negotiate_rejects_missing_par() {
        let req = VideoFormat {
            format: PixelFormat::I420,
            width: 720,
            height: 576,
            par: None,
        };
        assert!(matches!(
            DisplayGeometry::negotiate(&req),
            Err(SinkError::Negotiation(_))
        ));
    }

    #[test]
    fn negotiate_rejects_out_of_range_dimensions() {
        for (w, h) in [(8u32, 576u32), (720, 8), (5000, 576), (720, 5000)] {
            assert!(DisplayGeometry::negotiate(&VideoFormat::i420(w, h, 1, 1)).is_err());
        }
    }
}
