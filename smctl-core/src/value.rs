//! Numeric values produced and consumed by the expression engine.
//!
//! A value is either an integer (`Long`), a real (`Float`) or `NaN`. Binary
//! arithmetic promotes to `Float` when either side is a `Float`; `NaN` is
//! contagious and a zero divisor yields `NaN` instead of failing.

use serde::{Serialize, Serializer};
use serde_json::Value;
use std::fmt;
use std::ops::{Add, Div, Mul, Neg, Sub};

/// A numeric value.
///
/// The derived `PartialEq` is structural identity (same variant, same
/// payload). DSL comparison semantics, where `NaN` never compares equal or
/// unequal to anything, live in [`Numeric::compare`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Numeric {
    Long(i64),
    Float(f64),
    NaN,
}

/// Ordered comparison operators of the condition language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Gt,
    Gte,
    Lt,
    Lte,
    Eq,
    Ne,
}

impl Default for Numeric {
    fn default() -> Self {
        Numeric::Long(0)
    }
}

impl Numeric {
    /// Returns true for the `NaN` variant and for a `Float` holding an IEEE
    /// NaN, which native callbacks can construct directly.
    pub fn is_nan(&self) -> bool {
        match *self {
            Numeric::NaN => true,
            Numeric::Float(f) => f.is_nan(),
            Numeric::Long(_) => false,
        }
    }

    /// Collapses a `Float` NaN into the `NaN` variant.
    pub fn normalize(self) -> Numeric {
        if self.is_nan() {
            Numeric::NaN
        } else {
            self
        }
    }

    /// Returns true for the `Float` variant.
    pub fn is_float(&self) -> bool {
        matches!(self.normalize(), Numeric::Float(_))
    }

    /// Integer representation.
    ///
    /// Floats are rounded half away from zero. A float outside the `i64`
    /// range (or infinite) collapses to `i64::MIN`, which is what device
    /// firmware observes on such a conversion. `NaN` reads as 0.
    pub fn as_i64(&self) -> i64 {
        match self.normalize() {
            Numeric::Long(v) => v,
            Numeric::Float(f) => float_to_long(f),
            Numeric::NaN => 0,
        }
    }

    /// Real representation. `NaN` reads as `f64::NAN`.
    pub fn as_f64(&self) -> f64 {
        match *self {
            Numeric::Long(v) => v as f64,
            Numeric::Float(f) => f,
            Numeric::NaN => f64::NAN,
        }
    }

    /// C-style truthiness: non-zero is true, `NaN` is false.
    pub fn is_truthy(&self) -> bool {
        match *self {
            Numeric::Long(v) => v != 0,
            Numeric::Float(f) => f != 0.0 && !f.is_nan(),
            Numeric::NaN => false,
        }
    }

    /// Returns true when the value is numerically zero.
    pub fn is_zero(&self) -> bool {
        match *self {
            Numeric::Long(v) => v == 0,
            Numeric::Float(f) => f == 0.0,
            Numeric::NaN => false,
        }
    }

    /// Builds a float value, mapping an IEEE NaN result to `NaN`.
    pub fn float(f: f64) -> Self {
        if f.is_nan() {
            Numeric::NaN
        } else {
            Numeric::Float(f)
        }
    }

    /// Converts a JSON scalar. Non-numeric nodes yield `None`.
    pub fn from_json(node: &Value) -> Option<Self> {
        match node {
            Value::Bool(b) => Some(Numeric::from(*b)),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Some(Numeric::Long(i))
                } else {
                    n.as_f64().map(Numeric::float)
                }
            }
            _ => None,
        }
    }

    /// Compares two values after promotion. Any comparison involving `NaN`
    /// is false, for every operator.
    pub fn compare(self, op: Comparison, other: Numeric) -> bool {
        if self.is_nan() || other.is_nan() {
            return false;
        }
        match (self, other) {
            (Numeric::Long(a), Numeric::Long(b)) => match op {
                Comparison::Gt => a > b,
                Comparison::Gte => a >= b,
                Comparison::Lt => a < b,
                Comparison::Lte => a <= b,
                Comparison::Eq => a == b,
                Comparison::Ne => a != b,
            },
            (a, b) => {
                let (a, b) = (a.as_f64(), b.as_f64());
                match op {
                    Comparison::Gt => a > b,
                    Comparison::Gte => a >= b,
                    Comparison::Lt => a < b,
                    Comparison::Lte => a <= b,
                    Comparison::Eq => a == b,
                    Comparison::Ne => a != b,
                }
            }
        }
    }

    /// Raises `self` to `exp`. Two longs stay a long while the exponent is
    /// non-negative and the result fits; otherwise the result is a float.
    pub fn pow(self, exp: Numeric) -> Numeric {
        if self.is_nan() || exp.is_nan() {
            return Numeric::NaN;
        }
        match (self, exp) {
            (Numeric::Long(base), Numeric::Long(e)) => u32::try_from(e)
                .ok()
                .and_then(|e| base.checked_pow(e))
                .map(Numeric::Long)
                .unwrap_or_else(|| Numeric::float((base as f64).powf(e as f64))),
            (base, e) => Numeric::float(base.as_f64().powf(e.as_f64())),
        }
    }

    /// Absolute value, keeping the variant.
    pub fn abs(self) -> Numeric {
        match self.normalize() {
            Numeric::Long(v) => Numeric::Long(v.wrapping_abs()),
            Numeric::Float(f) => Numeric::Float(f.abs()),
            Numeric::NaN => Numeric::NaN,
        }
    }

    /// The smaller of two values. `NaN` is contagious.
    pub fn min(self, other: Numeric) -> Numeric {
        if self.is_nan() || other.is_nan() {
            Numeric::NaN
        } else if other.compare(Comparison::Lt, self) {
            other
        } else {
            self
        }
    }

    /// The larger of two values. `NaN` is contagious.
    pub fn max(self, other: Numeric) -> Numeric {
        if self.is_nan() || other.is_nan() {
            Numeric::NaN
        } else if other.compare(Comparison::Gt, self) {
            other
        } else {
            self
        }
    }

    fn promote(
        self,
        rhs: Numeric,
        long: impl FnOnce(i64, i64) -> i64,
        float: impl FnOnce(f64, f64) -> f64,
    ) -> Numeric {
        if self.is_nan() || rhs.is_nan() {
            return Numeric::NaN;
        }
        match (self, rhs) {
            (Numeric::Long(a), Numeric::Long(b)) => Numeric::Long(long(a, b)),
            (a, b) => Numeric::float(float(a.as_f64(), b.as_f64())),
        }
    }
}

fn float_to_long(f: f64) -> i64 {
    // i64::MAX as f64 rounds up to 2^63, hence the strict upper bound.
    let r = f.round();
    if r.is_finite() && r >= i64::MIN as f64 && r < i64::MAX as f64 {
        r as i64
    } else {
        i64::MIN
    }
}

impl Add for Numeric {
    type Output = Numeric;

    fn add(self, rhs: Numeric) -> Numeric {
        self.promote(rhs, i64::wrapping_add, |a, b| a + b)
    }
}

impl Sub for Numeric {
    type Output = Numeric;

    fn sub(self, rhs: Numeric) -> Numeric {
        self.promote(rhs, i64::wrapping_sub, |a, b| a - b)
    }
}

impl Mul for Numeric {
    type Output = Numeric;

    fn mul(self, rhs: Numeric) -> Numeric {
        self.promote(rhs, i64::wrapping_mul, |a, b| a * b)
    }
}

impl Div for Numeric {
    type Output = Numeric;

    fn div(self, rhs: Numeric) -> Numeric {
        if rhs.is_zero() {
            return Numeric::NaN;
        }
        self.promote(rhs, i64::wrapping_div, |a, b| a / b)
    }
}

impl Neg for Numeric {
    type Output = Numeric;

    fn neg(self) -> Numeric {
        match self.normalize() {
            Numeric::Long(v) => Numeric::Long(v.wrapping_neg()),
            Numeric::Float(f) => Numeric::Float(-f),
            Numeric::NaN => Numeric::NaN,
        }
    }
}

impl From<bool> for Numeric {
    fn from(b: bool) -> Self {
        Numeric::Long(i64::from(b))
    }
}

impl From<i32> for Numeric {
    fn from(v: i32) -> Self {
        Numeric::Long(i64::from(v))
    }
}

impl From<i64> for Numeric {
    fn from(v: i64) -> Self {
        Numeric::Long(v)
    }
}

impl From<u32> for Numeric {
    fn from(v: u32) -> Self {
        Numeric::Long(i64::from(v))
    }
}

impl From<f32> for Numeric {
    fn from(v: f32) -> Self {
        Numeric::float(f64::from(v))
    }
}

impl From<f64> for Numeric {
    fn from(v: f64) -> Self {
        Numeric::float(v)
    }
}

impl fmt::Display for Numeric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Numeric::Long(v) => write!(f, "{}", v),
            Numeric::Float(v) => write!(f, "{:?}", v),
            Numeric::NaN => f.write_str("NaN"),
        }
    }
}

/// Serializes as a JSON number; `NaN` becomes `null`.
impl Serialize for Numeric {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Numeric::Long(v) => serializer.serialize_i64(*v),
            Numeric::Float(v) => serializer.serialize_f64(*v),
            Numeric::NaN => serializer.serialize_none(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_promotion() {
        assert_eq!(Numeric::Long(2) + Numeric::Long(3), Numeric::Long(5));
        assert_eq!(Numeric::Long(2) + Numeric::Float(0.5), Numeric::Float(2.5));
        assert_eq!(Numeric::Float(1.5) * Numeric::Long(2), Numeric::Float(3.0));
        assert_eq!(Numeric::Long(7) / Numeric::Long(2), Numeric::Long(3));
        assert_eq!(Numeric::Long(7) / Numeric::Float(2.0), Numeric::Float(3.5));
    }

    #[test]
    fn test_division_by_zero_is_nan() {
        assert!((Numeric::Long(1) / Numeric::Long(0)).is_nan());
        assert!((Numeric::Float(0.0) / Numeric::Float(0.0)).is_nan());
        assert!((Numeric::Long(5) / Numeric::Float(0.0)).is_nan());
    }

    #[test]
    fn test_nan_is_contagious() {
        assert!((Numeric::NaN + Numeric::Long(1)).is_nan());
        assert!((Numeric::Float(1.0) - Numeric::NaN).is_nan());
        assert!((-Numeric::NaN).is_nan());
        assert!(Numeric::NaN.pow(Numeric::Long(2)).is_nan());
        assert!(Numeric::Long(3).min(Numeric::NaN).is_nan());
    }

    #[test]
    fn test_nan_compares_false() {
        let ops = [
            Comparison::Gt,
            Comparison::Gte,
            Comparison::Lt,
            Comparison::Lte,
            Comparison::Eq,
            Comparison::Ne,
        ];
        for op in ops {
            assert!(!Numeric::NaN.compare(op, Numeric::NaN));
            assert!(!Numeric::NaN.compare(op, Numeric::Long(1)));
            assert!(!Numeric::Float(1.0).compare(op, Numeric::NaN));
        }
    }

    #[test]
    fn test_float_nan_behaves_as_nan() {
        let raw = Numeric::Float(f64::NAN);
        assert!(raw.is_nan());
        assert!(!raw.is_float());
        assert!(!raw.is_truthy());
        assert_eq!(raw.as_i64(), 0);
        assert_eq!(raw.normalize(), Numeric::NaN);
        assert_eq!(-raw, Numeric::NaN);
        assert_eq!(raw.abs(), Numeric::NaN);
        assert_eq!(raw + Numeric::Long(1), Numeric::NaN);
        assert_eq!(raw.max(Numeric::Long(1)), Numeric::NaN);
        assert_eq!(Numeric::Long(2).pow(raw), Numeric::NaN);

        for op in [Comparison::Eq, Comparison::Ne, Comparison::Gt, Comparison::Lte] {
            assert!(!raw.compare(op, raw));
            assert!(!raw.compare(op, Numeric::Long(1)));
            assert!(!Numeric::Float(1.0).compare(op, raw));
        }
    }

    #[test]
    fn test_mixed_comparison() {
        assert!(Numeric::Long(42).compare(Comparison::Eq, Numeric::Float(42.0)));
        assert!(Numeric::Float(42.5).compare(Comparison::Gt, Numeric::Long(42)));
        assert!(Numeric::Long(1).compare(Comparison::Ne, Numeric::Long(2)));
        assert!(Numeric::Long(2).compare(Comparison::Lte, Numeric::Long(2)));
    }

    #[test]
    fn test_float_integer_representation() {
        assert_eq!(Numeric::Float(42.1).as_i64(), 42);
        assert_eq!(Numeric::Float(42.5).as_i64(), 43);
        assert_eq!(Numeric::Float(-2.5).as_i64(), -3);
        assert_eq!(Numeric::Float(1e30).as_i64(), i64::MIN);
        assert_eq!(Numeric::Float(-1e30).as_i64(), i64::MIN);
        assert_eq!(Numeric::Long(7).as_f64(), 7.0);
        assert_eq!(Numeric::NaN.as_i64(), 0);
    }

    #[test]
    fn test_pow() {
        assert_eq!(Numeric::Long(2).pow(Numeric::Long(10)), Numeric::Long(1024));
        assert_eq!(Numeric::Long(2).pow(Numeric::Long(-1)), Numeric::Float(0.5));
        assert!((Numeric::Float(4.0).pow(Numeric::Float(0.5)).as_f64() - 2.0).abs() < 1e-12);
        assert!(Numeric::Long(2).pow(Numeric::Long(100)).is_float());
        assert!(Numeric::Float(-8.0).pow(Numeric::Float(0.5)).is_nan());
    }

    #[test]
    fn test_abs_and_neg() {
        assert_eq!(Numeric::Long(-4).abs(), Numeric::Long(4));
        assert_eq!(Numeric::Float(-0.5).abs(), Numeric::Float(0.5));
        assert_eq!(-Numeric::Long(4), Numeric::Long(-4));
        assert_eq!(-Numeric::Float(0.5), Numeric::Float(-0.5));
    }

    #[test]
    fn test_from_json() {
        assert_eq!(Numeric::from_json(&json!(true)), Some(Numeric::Long(1)));
        assert_eq!(Numeric::from_json(&json!(42)), Some(Numeric::Long(42)));
        assert_eq!(Numeric::from_json(&json!(4.25)), Some(Numeric::Float(4.25)));
        assert_eq!(
            Numeric::from_json(&json!(u64::MAX)),
            Some(Numeric::Float(u64::MAX as f64))
        );
        assert_eq!(Numeric::from_json(&json!("x")), None);
        assert_eq!(Numeric::from_json(&json!(null)), None);
    }

    #[test]
    fn test_default_and_truthiness() {
        assert_eq!(Numeric::default(), Numeric::Long(0));
        assert!(!Numeric::default().is_truthy());
        assert!(Numeric::Float(0.1).is_truthy());
        assert!(!Numeric::NaN.is_truthy());
    }

    #[test]
    fn test_display() {
        assert_eq!(Numeric::Long(42).to_string(), "42");
        assert_eq!(Numeric::Float(4.0).to_string(), "4.0");
        assert_eq!(Numeric::NaN.to_string(), "NaN");
    }

    #[test]
    fn test_serialize() {
        assert_eq!(serde_json::to_value(Numeric::Long(3)).unwrap(), json!(3));
        assert_eq!(serde_json::to_value(Numeric::Float(2.5)).unwrap(), json!(2.5));
        assert_eq!(serde_json::to_value(Numeric::NaN).unwrap(), json!(null));
    }
}
