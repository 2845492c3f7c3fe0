use serde::{Deserialize, Serialize};

/// A scalar function of `t` in `0..=1`, configured from JSON.
///
/// ```json
/// { "type": "keyframes", "points": [{ "t": 0.0, "value": 2.0 }, { "t": 1.0, "value": 0.5 }] }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponseCurve {
    Constant { value: f32 },
    Linear { start: f32, end: f32 },
    /// Piecewise linear; clamps to the first/last key outside their range.
    Keyframes { points: Vec<CurveKey> },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurveKey {
    pub t: f32,
    pub value: f32,
}

impl Default for ResponseCurve {
    fn default() -> Self {
        ResponseCurve::Constant { value: 1.0 }
    }
}

impl ResponseCurve {
    pub fn evaluate(&self, t: f32) -> f32 {
        match self {
            ResponseCurve::Constant { value } => *value,
            ResponseCurve::Linear { start, end } => start + (end - start) * t.clamp(0.0, 1.0),
            ResponseCurve::Keyframes { points } => evaluate_keys(points, t),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        match self {
            ResponseCurve::Constant { value } => check_finite("value", *value),
            ResponseCurve::Linear { start, end } => {
                check_finite("start", *start)?;
                check_finite("end", *end)
            }
            ResponseCurve::Keyframes { points } => {
                if points.is_empty() {
                    return Err("keyframe curve needs at least one point".to_string());
                }
                for (i, key) in points.iter().enumerate() {
                    check_finite("t", key.t)?;
                    check_finite("value", key.value)?;
                    if i > 0 && key.t <= points[i - 1].t {
                        return Err(format!(
                            "keyframe {i} at t={} is not after previous t={}",
                            key.t,
                            points[i - 1].t
                        ));
                    }
                }
                Ok(())
            }
        }
    }
}

fn check_finite(name: &str, v: f32) -> Result<(), String> {
    if v.is_finite() {
        Ok(())
    } else {
        Err(format!("curve {name} must be finite, got {v}"))
    }
}

fn evaluate_keys(points: &[CurveKey], t: f32) -> f32 {
    let (Some(first), Some(last)) = (points.first(), points.last()) else {
        return 0.0;
    };
    if t <= first.t {
        return first.value;
    }
    if t >= last.t {
        return last.value;
    }
    for pair in points.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        if t <= b.t {
            let span = b.t - a.t;
            if span <= f32::EPSILON {
                return b.value;
            }
            return a.value + (b.value - a.value) * ((t - a.t) / span);
        }
    }
    last.value
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_flat_one() {
        let curve = ResponseCurve::default();
        assert_eq!(curve.evaluate(0.0), 1.0);
        assert_eq!(curve.evaluate(0.7), 1.0);
    }

    #[test]
    fn linear_clamps_outside_unit_range() {
        let curve = ResponseCurve::Linear { start: 2.0, end: 0.0 };
        assert_eq!(curve.evaluate(0.5), 1.0);
        assert_eq!(curve.evaluate(-1.0), 2.0);
        assert_eq!(curve.evaluate(3.0), 0.0);
    }

    #[test]
    fn keyframes_interpolate_between_points() {
        let curve = ResponseCurve::Keyframes {
            points: vec![
                CurveKey { t: 0.0, value: 4.0 },
                CurveKey { t: 0.5, value: 2.0 },
                CurveKey { t: 1.0, value: 1.0 },
            ],
        };
        assert!((curve.evaluate(0.25) - 3.0).abs() < 1e-6);
        assert!((curve.evaluate(0.75) - 1.5).abs() < 1e-6);
        assert_eq!(curve.evaluate(1.5), 1.0);
    }

    #[test]
    fn parses_tagged_json() {
        let curve: ResponseCurve =
            serde_json::from_str(r#"{"type":"linear","start":1.0,"end":0.25}"#)
                .expect("curve json should parse");
        assert_eq!(curve, ResponseCurve::Linear { start: 1.0, end: 0.25 });
    }

    #[test]
    fn rejects_unordered_keyframes() {
        let curve = ResponseCurve::Keyframes {
            points: vec![CurveKey { t: 0.5, value: 1.0 }, CurveKey { t: 0.2, value: 1.0 }],
        };
        let err = curve.validate().expect_err("unordered keys should fail");
        assert!(err.contains("not after"));
        assert!(ResponseCurve::Keyframes { points: vec![] }.validate().is_err());
    }
}
