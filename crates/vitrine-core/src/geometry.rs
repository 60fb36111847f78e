use serde::{Deserialize, Serialize};

/// An axis-aligned pixel rectangle, origin bottom-left (GL viewport space).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

/// Scales `(src_w, src_h)` to fit inside `(dst_w, dst_h)` preserving aspect
/// ratio, centered: the classic letterbox/center-rect computation used by
/// the on-screen scale pass.
///
/// Pure integer math, nearest rounding on the scaled edge. Degenerate inputs
/// are clamped to 1 so a zero-sized window or source cannot produce a zero
/// viewport.
pub fn center_rect(src_w: u32, src_h: u32, dst_w: u32, dst_h: u32) -> Rect {
    let src_w = src_w.max(1) as u64;
    let src_h = src_h.max(1) as u64;
    let dst_w = dst_w.max(1) as u64;
    let dst_h = dst_h.max(1) as u64;

    // Compare aspect ratios without division: dst wider than src means the
    // height is the binding edge.
    let (w, h) = if dst_w * src_h > dst_h * src_w {
        let w = (dst_h * src_w + src_h / 2) / src_h;
        (w.max(1), dst_h)
    } else {
        let h = (dst_w * src_h + src_w / 2) / src_w;
        (dst_w, h.max(1))
    };

    Rect {
        x: ((dst_w - w) / 2) as i32,
        y: ((dst_h - h) / 2) as i32,
        width: w as i32,
        height: h as i32,
    }
}

/// Edge crop magnitudes, in source pixels.
///
/// Crop shrinks the rectangle the scale pass samples from the intermediate
/// texture; it does not change the negotiated geometry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropInsets {
    #[serde(default)]
    pub top: u32,
    #[serde(default)]
    pub bottom: u32,
    #[serde(default)]
    pub left: u32,
    #[serde(default)]
    pub right: u32,
}

impl CropInsets {
    pub fn is_zero(&self) -> bool {
        *self == CropInsets::default()
    }

    /// Normalized sample rectangle `(u0, v0, u1, v1)` for a `w`×`h` source.
    ///
    /// Insets that would cross over are clamped so `u0 < u1` and `v0 < v1`
    /// always hold.
    pub fn uv_rect(&self, w: u32, h: u32) -> (f32, f32, f32, f32) {
        let w = w.max(1) as f32;
        let h = h.max(1) as f32;

        let mut u0 = self.left as f32 / w;
        let mut u1 = 1.0 - self.right as f32 / w;
        let mut v0 = self.top as f32 / h;
        let mut v1 = 1.0 - self.bottom as f32 / h;

        if u0 >= u1 {
            u0 = 0.0;
            u1 = 1.0;
        }
        if v0 >= v1 {
            v0 = 0.0;
            v1 = 1.0;
        }
        (u0, v0, u1, v1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn center_rect_is_idempotent_for_identical_inputs() {
        let a = center_rect(720, 576, 1280, 720);
        let b = center_rect(720, 576, 1280, 720);
        assert_eq!(a, b);
    }

    #[test]
    fn wider_destination_pins_height() {
        // dst aspect (16:9) wider than src (5:4): height binds.
        let r = center_rect(720, 576, 1280, 720);
        assert_eq!(r.height, 720);
        assert_eq!(r.width, (720u64 * 720 / 576) as i32);
        assert_eq!(r.x, (1280 - r.width) / 2);
        assert_eq!(r.y, 0);
    }

    #[test]
    fn taller_destination_pins_width() {
        let r = center_rect(1280, 720, 720, 1280);
        assert_eq!(r.width, 720);
        assert_eq!(r.height, (720u64 * 720 / 1280) as i32);
        assert_eq!(r.x, 0);
        assert_eq!(r.y, (1280 - r.height) / 2);
    }

    #[test]
    fn exact_fit_fills_destination() {
        let r = center_rect(720, 576, 1440, 1152);
        assert_eq!(
            r,
            Rect {
                x: 0,
                y: 0,
                width: 1440,
                height: 1152
            }
        );
    }

    #[test]
    fn degenerate_inputs_stay_positive() {
        let r = center_rect(0, 0, 0, 0);
        assert!(r.width >= 1 && r.height >= 1);
    }

    #[test]
    fn crop_uv_rect_shrinks_and_clamps() {
        let crop = CropInsets {
            top: 8,
            bottom: 8,
            left: 16,
            right: 16,
        };
        let (u0, v0, u1, v1) = crop.uv_rect(720, 576);
        assert!(u0 > 0.0 && u1 < 1.0 && v0 > 0.0 && v1 < 1.0);
        assert!(u0 < u1 && v0 < v1);

        // Overlapping insets fall back to the full rectangle.
        let bad = CropInsets {
            left: 400,
            right: 400,
            ..Default::default()
        };
        let (u0, _, u1, _) = bad.uv_rect(720, 576);
        assert_eq!((u0, u1), (0.0, 1.0));
    }
}
