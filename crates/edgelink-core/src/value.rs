//! Typed device values.
//!
//! Every reading produced by a driver and every parameter written to one is
//! a [`DeviceValue`]. The variant set mirrors the property types a device
//! profile may declare; [`PropertyType`] is the schema-side tag.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};

use crate::error::SdkError;

/// Schema-side value type declared by a device resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum PropertyType {
    Bool,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Int8,
    Int16,
    Int32,
    Int64,
    Float32,
    Float64,
    #[default]
    String,
    Binary,
}

impl PropertyType {
    /// Parse a profile type string, case-insensitively.
    pub fn parse(s: &str) -> Result<Self, SdkError> {
        match s.to_ascii_lowercase().as_str() {
            "bool" => Ok(Self::Bool),
            "uint8" => Ok(Self::Uint8),
            "uint16" => Ok(Self::Uint16),
            "uint32" => Ok(Self::Uint32),
            "uint64" => Ok(Self::Uint64),
            "int8" => Ok(Self::Int8),
            "int16" => Ok(Self::Int16),
            "int32" => Ok(Self::Int32),
            "int64" => Ok(Self::Int64),
            "float32" => Ok(Self::Float32),
            "float64" => Ok(Self::Float64),
            "string" => Ok(Self::String),
            "binary" => Ok(Self::Binary),
            other => Err(SdkError::BadConfig(format!(
                "unknown property type '{other}'"
            ))),
        }
    }

    /// True for the eight integer variants.
    pub fn is_integral(&self) -> bool {
        matches!(
            self,
            Self::Uint8
                | Self::Uint16
                | Self::Uint32
                | Self::Uint64
                | Self::Int8
                | Self::Int16
                | Self::Int32
                | Self::Int64
        )
    }

    /// True for any numeric variant, integral or floating.
    pub fn is_numeric(&self) -> bool {
        self.is_integral() || matches!(self, Self::Float32 | Self::Float64)
    }

    pub fn is_signed(&self) -> bool {
        matches!(self, Self::Int8 | Self::Int16 | Self::Int32 | Self::Int64)
    }
}

impl std::fmt::Display for PropertyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// A single typed value read from or written to a device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DeviceValue {
    Bool(bool),
    Uint8(u8),
    Uint16(u16),
    Uint32(u32),
    Uint64(u64),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Float32(f32),
    Float64(f64),
    String(String),
    /// Owned byte buffer; rendered as base64 on the wire.
    Binary(Vec<u8>),
}

impl DeviceValue {
    pub fn value_type(&self) -> PropertyType {
        match self {
            Self::Bool(_) => PropertyType::Bool,
            Self::Uint8(_) => PropertyType::Uint8,
            Self::Uint16(_) => PropertyType::Uint16,
            Self::Uint32(_) => PropertyType::Uint32,
            Self::Uint64(_) => PropertyType::Uint64,
            Self::Int8(_) => PropertyType::Int8,
            Self::Int16(_) => PropertyType::Int16,
            Self::Int32(_) => PropertyType::Int32,
            Self::Int64(_) => PropertyType::Int64,
            Self::Float32(_) => PropertyType::Float32,
            Self::Float64(_) => PropertyType::Float64,
            Self::String(_) => PropertyType::String,
            Self::Binary(_) => PropertyType::Binary,
        }
    }

    /// Numeric view for range checks and transforms. `None` for
    /// Bool/String/Binary.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Uint8(v) => Some(*v as f64),
            Self::Uint16(v) => Some(*v as f64),
            Self::Uint32(v) => Some(*v as f64),
            Self::Uint64(v) => Some(*v as f64),
            Self::Int8(v) => Some(*v as f64),
            Self::Int16(v) => Some(*v as f64),
            Self::Int32(v) => Some(*v as f64),
            Self::Int64(v) => Some(*v as f64),
            Self::Float32(v) => Some(*v as f64),
            Self::Float64(v) => Some(*v),
            _ => None,
        }
    }

    /// Integer view used by mask/shift transforms. `None` for non-integral
    /// variants.
    pub fn as_i128(&self) -> Option<i128> {
        match self {
            Self::Uint8(v) => Some(*v as i128),
            Self::Uint16(v) => Some(*v as i128),
            Self::Uint32(v) => Some(*v as i128),
            Self::Uint64(v) => Some(*v as i128),
            Self::Int8(v) => Some(*v as i128),
            Self::Int16(v) => Some(*v as i128),
            Self::Int32(v) => Some(*v as i128),
            Self::Int64(v) => Some(*v as i128),
            _ => None,
        }
    }

    /// Rebuild a value of the same integral variant from a wide integer,
    /// saturating at the variant's bounds.
    pub fn with_i128_saturating(&self, v: i128) -> DeviceValue {
        match self {
            Self::Uint8(_) => Self::Uint8(v.clamp(0, u8::MAX as i128) as u8),
            Self::Uint16(_) => Self::Uint16(v.clamp(0, u16::MAX as i128) as u16),
            Self::Uint32(_) => Self::Uint32(v.clamp(0, u32::MAX as i128) as u32),
            Self::Uint64(_) => Self::Uint64(v.clamp(0, u64::MAX as i128) as u64),
            Self::Int8(_) => Self::Int8(v.clamp(i8::MIN as i128, i8::MAX as i128) as i8),
            Self::Int16(_) => Self::Int16(v.clamp(i16::MIN as i128, i16::MAX as i128) as i16),
            Self::Int32(_) => Self::Int32(v.clamp(i32::MIN as i128, i32::MAX as i128) as i32),
            Self::Int64(_) => Self::Int64(v.clamp(i64::MIN as i128, i64::MAX as i128) as i64),
            other => other.clone(),
        }
    }

    /// Rebuild a value of the same variant from a float, saturating
    /// integral variants at their bounds (NaN becomes zero).
    pub fn with_f64_saturating(&self, v: f64) -> DeviceValue {
        let i = if v.is_nan() { 0i128 } else { v as i128 };
        match self {
            Self::Float32(_) => Self::Float32(v as f32),
            Self::Float64(_) => Self::Float64(v),
            other => other.with_i128_saturating(i),
        }
    }

    /// Wire form of the value. Floats keep a decimal point so that a
    /// transformed integer reading is distinguishable from an untransformed
    /// one; binary payloads are base64.
    pub fn to_wire_string(&self) -> String {
        match self {
            Self::Bool(v) => v.to_string(),
            Self::Uint8(v) => v.to_string(),
            Self::Uint16(v) => v.to_string(),
            Self::Uint32(v) => v.to_string(),
            Self::Uint64(v) => v.to_string(),
            Self::Int8(v) => v.to_string(),
            Self::Int16(v) => v.to_string(),
            Self::Int32(v) => v.to_string(),
            Self::Int64(v) => v.to_string(),
            Self::Float32(v) => format!("{:?}", v),
            Self::Float64(v) => format!("{:?}", v),
            Self::String(v) => v.clone(),
            Self::Binary(v) => STANDARD.encode(v),
        }
    }

    /// Coerce a wire string into a value of the given type.
    pub fn parse(value_type: PropertyType, s: &str) -> Result<DeviceValue, SdkError> {
        let s = s.trim();
        let invalid =
            |ty: PropertyType| SdkError::InvalidArg(format!("'{s}' is not a valid {ty}"));
        match value_type {
            PropertyType::Bool => match s.to_ascii_lowercase().as_str() {
                "true" | "1" => Ok(Self::Bool(true)),
                "false" | "0" => Ok(Self::Bool(false)),
                _ => Err(invalid(value_type)),
            },
            PropertyType::Uint8 => s.parse().map(Self::Uint8).map_err(|_| invalid(value_type)),
            PropertyType::Uint16 => s.parse().map(Self::Uint16).map_err(|_| invalid(value_type)),
            PropertyType::Uint32 => s.parse().map(Self::Uint32).map_err(|_| invalid(value_type)),
            PropertyType::Uint64 => s.parse().map(Self::Uint64).map_err(|_| invalid(value_type)),
            PropertyType::Int8 => s.parse().map(Self::Int8).map_err(|_| invalid(value_type)),
            PropertyType::Int16 => s.parse().map(Self::Int16).map_err(|_| invalid(value_type)),
            PropertyType::Int32 => s.parse().map(Self::Int32).map_err(|_| invalid(value_type)),
            PropertyType::Int64 => s.parse().map(Self::Int64).map_err(|_| invalid(value_type)),
            PropertyType::Float32 => s.parse().map(Self::Float32).map_err(|_| invalid(value_type)),
            PropertyType::Float64 => s.parse().map(Self::Float64).map_err(|_| invalid(value_type)),
            PropertyType::String => Ok(Self::String(s.to_string())),
            PropertyType::Binary => STANDARD
                .decode(s)
                .map(Self::Binary)
                .map_err(|_| invalid(value_type)),
        }
    }
}

impl std::fmt::Display for DeviceValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_wire_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_round_trip() {
        let v = DeviceValue::parse(PropertyType::Int16, "500").unwrap();
        assert_eq!(v, DeviceValue::Int16(500));
        assert_eq!(v.to_wire_string(), "500");

        let v = DeviceValue::parse(PropertyType::Bool, "true").unwrap();
        assert_eq!(v, DeviceValue::Bool(true));

        let v = DeviceValue::parse(PropertyType::Float64, "3.5").unwrap();
        assert_eq!(v.to_wire_string(), "3.5");
    }

    #[test]
    fn float_wire_form_keeps_decimal_point() {
        assert_eq!(DeviceValue::Float64(50.0).to_wire_string(), "50.0");
        assert_eq!(DeviceValue::Float32(2.5).to_wire_string(), "2.5");
    }

    #[test]
    fn binary_is_base64() {
        let v = DeviceValue::Binary(vec![0xde, 0xad, 0xbe, 0xef]);
        let s = v.to_wire_string();
        assert_eq!(DeviceValue::parse(PropertyType::Binary, &s).unwrap(), v);
    }

    #[test]
    fn parse_rejects_out_of_range() {
        assert!(DeviceValue::parse(PropertyType::Uint8, "300").is_err());
        assert!(DeviceValue::parse(PropertyType::Int8, "-200").is_err());
        assert!(DeviceValue::parse(PropertyType::Bool, "maybe").is_err());
    }

    #[test]
    fn saturating_rebuild() {
        let v = DeviceValue::Int16(0);
        assert_eq!(v.with_i128_saturating(100_000), DeviceValue::Int16(i16::MAX));
        assert_eq!(v.with_i128_saturating(-100_000), DeviceValue::Int16(i16::MIN));
        assert_eq!(
            DeviceValue::Uint8(0).with_f64_saturating(-4.0),
            DeviceValue::Uint8(0)
        );
        assert_eq!(
            DeviceValue::Float64(0.0).with_f64_saturating(1.25),
            DeviceValue::Float64(1.25)
        );
    }

    #[test]
    fn property_type_parse_is_case_insensitive() {
        assert_eq!(PropertyType::parse("int16").unwrap(), PropertyType::Int16);
        assert_eq!(PropertyType::parse("Float32").unwrap(), PropertyType::Float32);
        assert!(PropertyType::parse("quaternion").is_err());
    }
}
