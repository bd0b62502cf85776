//! Luminance to glyph mapping.
//!
//! Every pixel is reduced to a perceptual luminance in `[0, 1]` and then
//! mapped onto a fixed 12 step ramp, from the lightest visual weight
//! (space) to the heaviest (`%`).

/// Glyph ramp ordered from lightest to heaviest visual weight.
pub const GLYPH_RAMP: &[u8; 12] = b" .-+*wGHM#&%";

/// Perceptual luminance of an RGB sample, in `[0, 1]`.
///
/// Computed in `f32`, where pure white comes out as exactly `1.0`.
pub fn luminance(r: u8, g: u8, b: u8) -> f32 {
    let l = (r as f32 * 0.2126 + g as f32 * 0.7152 + b as f32 * 0.0722) / 255.0;
    l.clamp(0.0, 1.0)
}

/// Ramp index selected for an RGB sample.
pub fn glyph_index(r: u8, g: u8, b: u8) -> usize {
    let last = GLYPH_RAMP.len() - 1;
    let idx = (last as f32 * luminance(r, g, b)) as usize;
    idx.min(last)
}

/// Map an RGB sample to its glyph.
///
/// # Example
///
/// ```
/// use cascii_play::compute_glyph;
///
/// assert_eq!(compute_glyph(255, 255, 255), '%');
/// assert_eq!(compute_glyph(0, 0, 0), ' ');
/// ```
pub fn compute_glyph(r: u8, g: u8, b: u8) -> char {
    GLYPH_RAMP[glyph_index(r, g, b)] as char
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_white_maps_to_heaviest_glyph() {
        assert_eq!(luminance(255, 255, 255), 1.0);
        assert_eq!(compute_glyph(255, 255, 255), '%');
    }

    #[test]
    fn test_black_maps_to_space() {
        assert_eq!(luminance(0, 0, 0), 0.0);
        assert_eq!(compute_glyph(0, 0, 0), ' ');
    }

    #[test]
    fn test_mid_gray() {
        // 128/255 * 11 = 5.52
        assert_eq!(glyph_index(128, 128, 128), 5);
        assert_eq!(compute_glyph(128, 128, 128), 'w');
        // Just below white never reaches the last glyph
        assert_eq!(compute_glyph(254, 254, 254), '&');
    }

    #[test]
    fn test_green_weighs_more_than_red_and_blue() {
        let red = glyph_index(255, 0, 0);
        let green = glyph_index(0, 255, 0);
        let blue = glyph_index(0, 0, 255);
        assert!(green > red);
        assert!(red > blue);
    }

    #[test]
    fn test_grayscale_is_monotonic() {
        let mut prev = 0;
        for v in 0..=255u8 {
            let idx = glyph_index(v, v, v);
            assert!(idx >= prev, "index dropped at {}: {} < {}", v, idx, prev);
            prev = idx;
        }
        assert_eq!(prev, GLYPH_RAMP.len() - 1);
    }

    #[test]
    fn test_always_a_ramp_glyph() {
        for r in (0..=255u16).step_by(15) {
            for g in (0..=255u16).step_by(15) {
                for b in (0..=255u16).step_by(15) {
                    let (r, g, b) = (r as u8, g as u8, b as u8);
                    let ch = compute_glyph(r, g, b);
                    assert!(GLYPH_RAMP.contains(&(ch as u8)));
                    assert_eq!(ch, compute_glyph(r, g, b));
                }
            }
        }
    }
}
