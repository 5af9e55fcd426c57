//! Numeric value transformations.
//!
//! Readings flowing device -> platform pass through mask, shift, base,
//! scale and offset in that order; writes flowing platform -> device apply
//! the inverses in reverse order. Mask and shift operate on the raw bit
//! pattern and only exist for integral types; base/scale/offset run in the
//! f64 domain. Integer results saturate at the bounds of their type.
//!
//! An integral reading touched by a float-domain operation is promoted to
//! `Float64` so that fractional results survive serialization. Writes are
//! never promoted: the driver receives the resource's declared type.

use std::collections::HashMap;

use edgelink_core::models::PropertyValue;
use edgelink_core::{DeviceValue, SdkError};

/// Apply the outgoing transform chain to a reading.
pub fn outgoing(value: DeviceValue, props: &PropertyValue) -> DeviceValue {
    let mut value = value;
    if value.as_f64().is_none() || matches!(value, DeviceValue::Bool(_)) {
        return value;
    }
    if let Some(mask) = props.mask {
        value = apply_mask(&value, mask);
    }
    if let Some(shift) = props.shift {
        value = shift_right(&value, shift);
    }
    float_chain(value, props, Direction::Outgoing)
}

/// Apply the inverse transform chain to a value about to be written.
pub fn incoming(value: DeviceValue, props: &PropertyValue) -> DeviceValue {
    let mut value = value;
    if value.as_f64().is_none() || matches!(value, DeviceValue::Bool(_)) {
        return value;
    }
    value = float_chain(value, props, Direction::Incoming);
    if let Some(shift) = props.shift {
        value = shift_left(&value, shift);
    }
    if let Some(mask) = props.mask {
        value = apply_mask(&value, mask);
    }
    value
}

/// Check a reading's wire form against the resource assertion. A mismatch
/// fails the whole command and disables the device at the call site.
pub fn check_assertion(wire: &str, props: &PropertyValue) -> Result<(), SdkError> {
    match &props.assertion {
        Some(expected) if !expected.is_empty() && wire != expected => Err(
            SdkError::AssertionFailed(format!("value {wire} != asserted {expected}")),
        ),
        _ => Ok(()),
    }
}

/// Enumeration remap for outgoing readings: replace the wire form when the
/// operation defines a mapping for it.
pub fn map_outgoing(wire: String, mappings: &HashMap<String, String>) -> String {
    match mappings.get(&wire) {
        Some(mapped) => mapped.clone(),
        None => wire,
    }
}

/// Inverse remap for incoming writes: a value matching a mapped form is
/// replaced by its key.
pub fn map_incoming(wire: String, mappings: &HashMap<String, String>) -> String {
    for (key, mapped) in mappings {
        if *mapped == wire {
            return key.clone();
        }
    }
    wire
}

enum Direction {
    Outgoing,
    Incoming,
}

/// base/scale/offset (or their inverses), computed in f64.
fn float_chain(value: DeviceValue, props: &PropertyValue, dir: Direction) -> DeviceValue {
    let base = props.base.filter(|b| *b != 0.0);
    let scale = props.scale.filter(|s| *s != 1.0);
    let offset = props.offset.filter(|o| *o != 0.0);
    if base.is_none() && scale.is_none() && offset.is_none() {
        return value;
    }
    let mut v = match value.as_f64() {
        Some(v) => v,
        None => return value,
    };
    match dir {
        Direction::Outgoing => {
            if let Some(b) = base {
                v = b.powf(v);
            }
            if let Some(s) = scale {
                v *= s;
            }
            if let Some(o) = offset {
                v += o;
            }
            match value {
                DeviceValue::Float32(_) => DeviceValue::Float32(v as f32),
                DeviceValue::Float64(_) => DeviceValue::Float64(v),
                // fractional results must survive; promote
                _ => DeviceValue::Float64(v),
            }
        }
        Direction::Incoming => {
            if let Some(o) = offset {
                v -= o;
            }
            if let Some(s) = scale {
                if s != 0.0 {
                    v /= s;
                }
            }
            if let Some(b) = base {
                if b > 0.0 && b != 1.0 && v > 0.0 {
                    v = v.ln() / b.ln();
                }
            }
            value.with_f64_saturating(v)
        }
    }
}

/// AND the raw bit pattern of an integral value with `mask`.
fn apply_mask(value: &DeviceValue, mask: u64) -> DeviceValue {
    match value {
        DeviceValue::Uint8(v) => DeviceValue::Uint8(v & mask as u8),
        DeviceValue::Uint16(v) => DeviceValue::Uint16(v & mask as u16),
        DeviceValue::Uint32(v) => DeviceValue::Uint32(v & mask as u32),
        DeviceValue::Uint64(v) => DeviceValue::Uint64(v & mask),
        DeviceValue::Int8(v) => DeviceValue::Int8(((*v as u8) & mask as u8) as i8),
        DeviceValue::Int16(v) => DeviceValue::Int16(((*v as u16) & mask as u16) as i16),
        DeviceValue::Int32(v) => DeviceValue::Int32(((*v as u32) & mask as u32) as i32),
        DeviceValue::Int64(v) => DeviceValue::Int64(((*v as u64) & mask) as i64),
        other => other.clone(),
    }
}

/// Right shift: arithmetic for signed variants, logical for unsigned.
/// Shifting past the width drains to the sign fill.
fn shift_right(value: &DeviceValue, shift: u32) -> DeviceValue {
    match value {
        DeviceValue::Uint8(v) => DeviceValue::Uint8(v.checked_shr(shift).unwrap_or(0)),
        DeviceValue::Uint16(v) => DeviceValue::Uint16(v.checked_shr(shift).unwrap_or(0)),
        DeviceValue::Uint32(v) => DeviceValue::Uint32(v.checked_shr(shift).unwrap_or(0)),
        DeviceValue::Uint64(v) => DeviceValue::Uint64(v.checked_shr(shift).unwrap_or(0)),
        DeviceValue::Int8(v) => DeviceValue::Int8(v >> shift.min(7)),
        DeviceValue::Int16(v) => DeviceValue::Int16(v >> shift.min(15)),
        DeviceValue::Int32(v) => DeviceValue::Int32(v >> shift.min(31)),
        DeviceValue::Int64(v) => DeviceValue::Int64(v >> shift.min(63)),
        other => other.clone(),
    }
}

/// Left shift on the raw bit pattern; bits shifted past the width are lost.
fn shift_left(value: &DeviceValue, shift: u32) -> DeviceValue {
    match value {
        DeviceValue::Uint8(v) => DeviceValue::Uint8(v.checked_shl(shift).unwrap_or(0)),
        DeviceValue::Uint16(v) => DeviceValue::Uint16(v.checked_shl(shift).unwrap_or(0)),
        DeviceValue::Uint32(v) => DeviceValue::Uint32(v.checked_shl(shift).unwrap_or(0)),
        DeviceValue::Uint64(v) => DeviceValue::Uint64(v.checked_shl(shift).unwrap_or(0)),
        DeviceValue::Int8(v) => {
            DeviceValue::Int8((*v as u8).checked_shl(shift).unwrap_or(0) as i8)
        }
        DeviceValue::Int16(v) => {
            DeviceValue::Int16((*v as u16).checked_shl(shift).unwrap_or(0) as i16)
        }
        DeviceValue::Int32(v) => {
            DeviceValue::Int32((*v as u32).checked_shl(shift).unwrap_or(0) as i32)
        }
        DeviceValue::Int64(v) => {
            DeviceValue::Int64((*v as u64).checked_shl(shift).unwrap_or(0) as i64)
        }
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn props() -> PropertyValue {
        PropertyValue::default()
    }

    #[test]
    fn scale_promotes_integer_reading() {
        let p = PropertyValue {
            scale: Some(0.1),
            ..props()
        };
        let out = outgoing(DeviceValue::Int16(500), &p);
        assert_eq!(out, DeviceValue::Float64(50.0));
        assert_eq!(out.to_wire_string(), "50.0");
    }

    #[test]
    fn no_params_is_identity() {
        let out = outgoing(DeviceValue::Int16(500), &props());
        assert_eq!(out, DeviceValue::Int16(500));
        assert_eq!(out.to_wire_string(), "500");
    }

    #[test]
    fn mask_and_shift_extract_a_field() {
        let p = PropertyValue {
            mask: Some(0x00f0),
            shift: Some(4),
            ..props()
        };
        let out = outgoing(DeviceValue::Uint16(0x12a5), &p);
        assert_eq!(out, DeviceValue::Uint16(0x000a));
    }

    #[test]
    fn signed_shift_is_arithmetic() {
        let p = PropertyValue {
            shift: Some(2),
            ..props()
        };
        assert_eq!(outgoing(DeviceValue::Int16(-8), &p), DeviceValue::Int16(-2));
    }

    #[test]
    fn mask_and_shift_ignore_floats() {
        let p = PropertyValue {
            mask: Some(0xff),
            shift: Some(4),
            ..props()
        };
        assert_eq!(
            outgoing(DeviceValue::Float64(12.5), &p),
            DeviceValue::Float64(12.5)
        );
        assert_eq!(
            incoming(DeviceValue::Float32(1.5), &p),
            DeviceValue::Float32(1.5)
        );
    }

    #[test]
    fn bool_string_binary_untouched() {
        let p = PropertyValue {
            scale: Some(2.0),
            mask: Some(1),
            ..props()
        };
        assert_eq!(outgoing(DeviceValue::Bool(true), &p), DeviceValue::Bool(true));
        assert_eq!(
            outgoing(DeviceValue::String("on".into()), &p),
            DeviceValue::String("on".into())
        );
        assert_eq!(
            incoming(DeviceValue::Binary(vec![1]), &p),
            DeviceValue::Binary(vec![1])
        );
    }

    #[test]
    fn round_trip_recovers_value() {
        let p = PropertyValue {
            scale: Some(0.125),
            offset: Some(-40.0),
            ..props()
        };
        for v in [-1000.0f64, -1.5, 0.0, 3.25, 8000.0] {
            let out = outgoing(DeviceValue::Float64(v), &p);
            let back = incoming(out, &p);
            let recovered = back.as_f64().unwrap();
            assert!(
                (v - recovered).abs() < 1e-9 * v.abs().max(1.0),
                "{v} -> {recovered}"
            );
        }
    }

    #[test]
    fn base_round_trip() {
        let p = PropertyValue {
            base: Some(2.0),
            ..props()
        };
        let out = outgoing(DeviceValue::Float64(10.0), &p);
        assert_eq!(out, DeviceValue::Float64(1024.0));
        let back = incoming(out, &p);
        assert!((back.as_f64().unwrap() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn incoming_saturates_integral_types() {
        let p = PropertyValue {
            scale: Some(0.001),
            ..props()
        };
        // 100 / 0.001 = 100000, out of i16 range
        let back = incoming(DeviceValue::Int16(100), &p);
        assert_eq!(back, DeviceValue::Int16(i16::MAX));
    }

    #[test]
    fn assertion_matches_and_fails() {
        let p = PropertyValue {
            assertion: Some("42".to_string()),
            ..props()
        };
        assert!(check_assertion("42", &p).is_ok());
        assert!(matches!(
            check_assertion("41", &p),
            Err(SdkError::AssertionFailed(_))
        ));
        assert!(check_assertion("anything", &props()).is_ok());
    }

    #[test]
    fn mappings_remap_both_directions() {
        let mappings: HashMap<String, String> =
            [("1".to_string(), "open".to_string())].into_iter().collect();
        assert_eq!(map_outgoing("1".to_string(), &mappings), "open");
        assert_eq!(map_outgoing("2".to_string(), &mappings), "2");
        assert_eq!(map_incoming("open".to_string(), &mappings), "1");
        assert_eq!(map_incoming("shut".to_string(), &mappings), "shut");
    }
}
