//! # Tolerant Field Extraction
//!
//! Telemetry producers disagree on field names (`lat` vs `latitude`,
//! `vel_n` vs `velN`) and occasionally on types (numbers serialized as
//! strings). The helpers here resolve both forms of schema drift without
//! ever returning an error: a missing or unparseable field resolves to a
//! caller-supplied default.

use serde_json::Value;

/// Alias lists for the PVT record fields, in lookup order.
///
/// First entry is the name the reference UDP decoder emits; the rest are
/// common alternates seen from other producers.
pub mod aliases {
    pub const SOLUTION_STATUS: &[&str] = &["solution_status", "solutionStatus"];
    pub const SATELLITES: &[&str] = &["valid_sats", "validSats", "num_sats", "sats"];
    pub const AGE: &[&str] = &["age", "pvt_age", "age_s"];
    pub const HEADING: &[&str] = &["heading", "track", "course", "cog"];
    pub const SPEED: &[&str] = &["ground_speed", "speed", "speed_mps", "sog"];
    pub const LATITUDE: &[&str] = &["lat", "latitude"];
    pub const LONGITUDE: &[&str] = &["lon", "longitude"];
    pub const ALTITUDE: &[&str] = &["height", "alt", "altitude"];
    pub const VEL_EAST: &[&str] = &["vel_e", "velE", "velocity_e", "vel_e_mps"];
    pub const VEL_NORTH: &[&str] = &["vel_n", "velN", "velocity_n", "vel_n_mps"];
    pub const VEL_UP: &[&str] = &["vel_u", "velU", "velocity_u", "vel_u_mps"];
}

/// Return the first present, non-null value among `keys`
///
/// # Arguments
///
/// * `record` - Semi-structured telemetry record
/// * `keys` - Candidate field names, in priority order
///
/// # Returns
///
/// * `Option<&Value>` - First matching value, or `None` if every candidate
///   is absent or JSON null
pub fn pick_first<'a>(record: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    let map = record.as_object()?;
    for key in keys {
        match map.get(*key) {
            Some(Value::Null) | None => continue,
            Some(v) => return Some(v),
        }
    }
    None
}

/// Coerce a JSON value to a finite float, falling back to `default`
///
/// Accepts integer and float JSON numbers as well as numeric strings.
/// NaN, infinities, and non-numeric values all resolve to `default`.
/// This function is total: it never fails.
pub fn to_finite_float(value: Option<&Value>, default: f64) -> f64 {
    let parsed = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    match parsed {
        Some(v) if v.is_finite() => v,
        _ => default,
    }
}

/// Coerce a JSON value to an integer, falling back to `default`
///
/// Float values are truncated toward zero, matching the reference
/// decoder's handling of quality codes and satellite counts.
pub fn to_int(value: Option<&Value>, default: i64) -> i64 {
    match value {
        Some(Value::Number(n)) => {
            if let Some(i) = n.as_i64() {
                i
            } else {
                n.as_f64().filter(|v| v.is_finite()).map(|v| v as i64).unwrap_or(default)
            }
        }
        Some(Value::String(s)) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().filter(|v| v.is_finite()).map(|v| v as i64))
                .unwrap_or(default)
        }
        _ => default,
    }
}

/// Resolve an aliased field straight to a finite float
///
/// Convenience wrapper combining [`pick_first`] and [`to_finite_float`].
pub fn float_field(record: &Value, keys: &[&str], default: f64) -> f64 {
    to_finite_float(pick_first(record, keys), default)
}

/// Resolve an aliased field straight to an integer
pub fn int_field(record: &Value, keys: &[&str], default: i64) -> i64 {
    to_int(pick_first(record, keys), default)
}
