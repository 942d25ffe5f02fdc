//! Derived per-frame statistics.
//!
//! Diffraction frames are browsed with auto-scaled contrast, so every loaded
//! image needs its minimum, maximum, and mean intensity. All three come out
//! of a single pass over the pixel buffer; the record layer computes them
//! once per file and keeps them for the lifetime of the record.

/// Intensity statistics of one decoded frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameStats {
    pub min: f32,
    pub max: f32,
    pub mean: f32,
}

impl FrameStats {
    /// Single pass over the buffer. The sum runs in `f64` so the mean of a
    /// multi-megapixel detector frame doesn't drown in `f32` rounding.
    pub fn compute(pixels: &[f32]) -> Self {
        if pixels.is_empty() {
            return Self {
                min: 0.0,
                max: 0.0,
                mean: 0.0,
            };
        }
        let mut min = f32::INFINITY;
        let mut max = f32::NEG_INFINITY;
        let mut sum = 0.0f64;
        for &v in pixels {
            sum += v as f64;
            if v < min {
                min = v;
            }
            if v > max {
                max = v;
            }
        }
        Self {
            min,
            max,
            mean: (sum / pixels.len() as f64) as f32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_buffer() {
        let s = FrameStats::compute(&[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(s.min, 1.0);
        assert_eq!(s.max, 4.0);
        assert_eq!(s.mean, 2.5);
    }

    #[test]
    fn single_pixel() {
        let s = FrameStats::compute(&[7.5]);
        assert_eq!(s.min, 7.5);
        assert_eq!(s.max, 7.5);
        assert_eq!(s.mean, 7.5);
    }

    #[test]
    fn all_negative_values() {
        let s = FrameStats::compute(&[-3.0, -1.0, -2.0]);
        assert_eq!(s.min, -3.0);
        assert_eq!(s.max, -1.0);
        assert_eq!(s.mean, -2.0);
    }

    #[test]
    fn empty_buffer_is_all_zero() {
        let s = FrameStats::compute(&[]);
        assert_eq!(s.min, 0.0);
        assert_eq!(s.max, 0.0);
        assert_eq!(s.mean, 0.0);
    }

    #[test]
    fn mean_of_large_uniform_buffer_is_exact() {
        // 4M pixels of 0.1 would visibly drift with an f32 accumulator.
        let pixels = vec![0.1f32; 1 << 22];
        let s = FrameStats::compute(&pixels);
        assert!((s.mean - 0.1).abs() < 1e-6);
    }
}
