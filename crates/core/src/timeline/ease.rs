use serde::{Deserialize, Serialize};

/// Easing curve applied to a track's cycle progress.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Ease {
    #[default]
    Linear,
    /// Quadratic ease in and out.
    Power1InOut,
    /// Cubic ease in.
    Power2In,
    /// Cubic ease out.
    Power2Out,
    /// Overshoots the end value before settling on it.
    BackOut { overshoot: f32 },
}

impl Ease {
    /// Maps linear progress in `[0, 1]` onto the curve.
    pub fn apply(self, progress: f32) -> f32 {
        let p = progress.clamp(0.0, 1.0);
        match self {
            Ease::Linear => p,
            Ease::Power1InOut => {
                if p < 0.5 {
                    2.0 * p * p
                } else {
                    1.0 - (-2.0 * p + 2.0).powi(2) / 2.0
                }
            }
            Ease::Power2In => p * p * p,
            Ease::Power2Out => 1.0 - (1.0 - p).powi(3),
            Ease::BackOut { overshoot } => {
                let q = p - 1.0;
                1.0 + (overshoot + 1.0) * q.powi(3) + overshoot * q.powi(2)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CURVES: [Ease; 5] = [
        Ease::Linear,
        Ease::Power1InOut,
        Ease::Power2In,
        Ease::Power2Out,
        Ease::BackOut { overshoot: 1.7 },
    ];

    #[test]
    fn curves_pin_their_endpoints() {
        for ease in CURVES {
            assert!(ease.apply(0.0).abs() < 1e-6, "{ease:?}");
            assert!((ease.apply(1.0) - 1.0).abs() < 1e-6, "{ease:?}");
        }
    }

    #[test]
    fn in_out_is_symmetric_around_midpoint() {
        let ease = Ease::Power1InOut;
        assert!((ease.apply(0.5) - 0.5).abs() < 1e-6);
        assert!((ease.apply(0.25) + ease.apply(0.75) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn back_out_overshoots() {
        let ease = Ease::BackOut { overshoot: 1.7 };
        assert!((0..100).any(|step| ease.apply(step as f32 / 100.0) > 1.0));
    }
}
