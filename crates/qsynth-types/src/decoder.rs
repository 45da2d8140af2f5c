//! Decoding measured bit patterns into typed values.
//!
//! A variable's qubits are read least significant first: qubit `i` holds bit
//! `i` of the raw pattern.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{TypeError, TypeResult};

/// Characters a [`Decoder::Char`] variable can hold, indexed by code.
pub const CHAR_ALPHABET: [char; 32] = [
    'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'i', 'j', 'k', 'l', 'm', 'n', 'o', 'p', 'q', 'r', 's',
    't', 'u', 'v', 'w', 'x', 'y', 'z', ' ', '.', ',', '!', '?', '\'',
];

/// Width of a character variable.
pub const CHAR_WIDTH: usize = 5;

/// Widest integer or fixed-point variable.
pub const MAX_NUMERIC_WIDTH: usize = 63;

/// How a variable's bit pattern is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Decoder {
    /// Binary integer; two's complement when signed.
    Integer {
        /// Whether the top bit is a sign bit.
        signed: bool,
    },
    /// Fixed-point number: the integer reading times `2^exponent`.
    Fixed {
        /// Power of two of the least significant bit.
        exponent: i32,
        /// Whether the top bit is a sign bit.
        signed: bool,
    },
    /// Single-qubit truth value.
    Boolean,
    /// One of the 32 symbols of [`CHAR_ALPHABET`].
    Char,
    /// The raw pattern, most significant bit first.
    Bitstring,
}

impl Decoder {
    /// Short name used in errors.
    pub fn name(&self) -> &'static str {
        match self {
            Decoder::Integer { .. } => "integer",
            Decoder::Fixed { .. } => "fixed",
            Decoder::Boolean => "boolean",
            Decoder::Char => "char",
            Decoder::Bitstring => "bitstring",
        }
    }

    /// Check that `width` qubits can carry this decoding.
    pub fn validate_width(&self, width: usize) -> TypeResult<()> {
        let ok = match self {
            Decoder::Integer { .. } | Decoder::Fixed { .. } => {
                (1..=MAX_NUMERIC_WIDTH).contains(&width)
            }
            Decoder::Boolean => width == 1,
            Decoder::Char => width == CHAR_WIDTH,
            Decoder::Bitstring => (1..=64).contains(&width),
        };
        if ok {
            Ok(())
        } else {
            Err(TypeError::InvalidWidth {
                decoder: self.name(),
                width,
            })
        }
    }

    /// Decode a raw pattern of `width` bits.
    pub fn decode(&self, raw: u64, width: usize) -> Value {
        match *self {
            Decoder::Integer { signed } => Value::Int(read_int(raw, width, signed)),
            Decoder::Fixed { exponent, signed } => {
                Value::Float(read_int(raw, width, signed) as f64 * 2f64.powi(exponent))
            }
            Decoder::Boolean => Value::Bool(raw & 1 == 1),
            Decoder::Char => Value::Char(CHAR_ALPHABET[(raw & 0x1f) as usize]),
            Decoder::Bitstring => Value::Bits(
                (0..width)
                    .rev()
                    .map(|i| if (raw >> i) & 1 == 1 { '1' } else { '0' })
                    .collect(),
            ),
        }
    }

    /// Encode `value` as a raw pattern of `width` bits.
    pub fn encode(&self, value: &Value, width: usize) -> TypeResult<u64> {
        self.validate_width(width)?;
        match (*self, value) {
            (Decoder::Integer { signed }, Value::Int(v)) => {
                write_int(*v, width, signed).ok_or_else(|| self.overflow(value, width))
            }
            (Decoder::Fixed { exponent, signed }, Value::Float(v)) => {
                self.encode_fixed(*v, exponent, signed, width)
            }
            (Decoder::Fixed { exponent, signed }, Value::Int(v)) => {
                self.encode_fixed(*v as f64, exponent, signed, width)
            }
            (Decoder::Boolean, Value::Bool(b)) => Ok(u64::from(*b)),
            (Decoder::Char, Value::Char(c)) => CHAR_ALPHABET
                .iter()
                .position(|a| a == c)
                .map(|i| i as u64)
                .ok_or(TypeError::UnknownSymbol(*c)),
            (Decoder::Bitstring, Value::Bits(bits)) => {
                if bits.len() != width {
                    return Err(self.overflow(value, width));
                }
                bits.chars().try_fold(0u64, |acc, c| match c {
                    '0' => Ok(acc << 1),
                    '1' => Ok((acc << 1) | 1),
                    _ => Err(TypeError::ValueMismatch {
                        decoder: self.name(),
                        value: bits.clone(),
                    }),
                })
            }
            _ => Err(TypeError::ValueMismatch {
                decoder: self.name(),
                value: value.to_string(),
            }),
        }
    }

    fn encode_fixed(&self, v: f64, exponent: i32, signed: bool, width: usize) -> TypeResult<u64> {
        let scaled = v * 2f64.powi(-exponent);
        if !scaled.is_finite() || scaled.fract() != 0.0 {
            return Err(TypeError::Inexact { value: v, exponent });
        }
        if scaled.abs() >= 2f64.powi(MAX_NUMERIC_WIDTH as i32) {
            return Err(self.overflow(&Value::Float(v), width));
        }
        write_int(scaled as i64, width, signed).ok_or_else(|| self.overflow(&Value::Float(v), width))
    }

    fn overflow(&self, value: &Value, width: usize) -> TypeError {
        TypeError::Overflow {
            decoder: self.name(),
            value: value.to_string(),
            width,
        }
    }
}

fn read_int(raw: u64, width: usize, signed: bool) -> i64 {
    let mask = (1u64 << width) - 1;
    let raw = raw & mask;
    if signed && (raw >> (width - 1)) & 1 == 1 {
        raw as i64 - (1i64 << width)
    } else {
        raw as i64
    }
}

fn write_int(value: i64, width: usize, signed: bool) -> Option<u64> {
    let mask = (1u64 << width) - 1;
    let (min, max) = if signed {
        (-(1i64 << (width - 1)), (1i64 << (width - 1)) - 1)
    } else {
        (0, mask as i64)
    };
    (min..=max)
        .contains(&value)
        .then_some(value as u64 & mask)
}

/// A decoded classical value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// Integer reading.
    Int(i64),
    /// Fixed-point reading.
    Float(f64),
    /// Boolean reading.
    Bool(bool),
    /// Character reading.
    Char(char),
    /// Raw bits, most significant first.
    Bits(String),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::Char(c) => write!(f, "{c:?}"),
            Value::Bits(b) => write!(f, "0b{b}"),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<char> for Value {
    fn from(c: char) -> Self {
        Value::Char(c)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signed_integer_twos_complement() {
        let d = Decoder::Integer { signed: true };
        assert_eq!(d.decode(0b1111, 4), Value::Int(-1));
        assert_eq!(d.decode(0b0111, 4), Value::Int(7));
        assert_eq!(d.encode(&Value::Int(-8), 4).unwrap(), 0b1000);
        assert!(d.encode(&Value::Int(8), 4).is_err());
    }

    #[test]
    fn test_unsigned_range() {
        let d = Decoder::Integer { signed: false };
        assert_eq!(d.encode(&Value::Int(15), 4).unwrap(), 15);
        assert!(matches!(
            d.encode(&Value::Int(16), 4),
            Err(TypeError::Overflow { .. })
        ));
        assert!(d.encode(&Value::Int(-1), 4).is_err());
    }

    #[test]
    fn test_fixed_point() {
        let d = Decoder::Fixed {
            exponent: -2,
            signed: false,
        };
        assert_eq!(d.decode(0b0110, 4), Value::Float(1.5));
        assert_eq!(d.encode(&Value::Float(2.75), 4).unwrap(), 11);
        assert!(matches!(
            d.encode(&Value::Float(0.1), 4),
            Err(TypeError::Inexact { exponent: -2, .. })
        ));
    }

    #[test]
    fn test_char_alphabet() {
        assert_eq!(Decoder::Char.decode(7, CHAR_WIDTH), Value::Char('h'));
        assert_eq!(Decoder::Char.encode(&Value::Char(' '), CHAR_WIDTH).unwrap(), 26);
        assert!(matches!(
            Decoder::Char.encode(&Value::Char('Q'), CHAR_WIDTH),
            Err(TypeError::UnknownSymbol('Q'))
        ));
    }

    #[test]
    fn test_bitstring_msb_first() {
        assert_eq!(
            Decoder::Bitstring.decode(0b0011, 4),
            Value::Bits("0011".into())
        );
        assert_eq!(
            Decoder::Bitstring
                .encode(&Value::Bits("1000".into()), 4)
                .unwrap(),
            8
        );
    }

    #[test]
    fn test_width_validation() {
        assert!(Decoder::Boolean.validate_width(2).is_err());
        assert!(Decoder::Char.validate_width(4).is_err());
        assert!(Decoder::Integer { signed: false }.validate_width(0).is_err());
        assert!(Decoder::Bitstring.validate_width(64).is_ok());
    }

    #[test]
    fn test_kind_mismatch() {
        assert!(matches!(
            Decoder::Boolean.encode(&Value::Int(1), 1),
            Err(TypeError::ValueMismatch { decoder: "boolean", .. })
        ));
    }
}
