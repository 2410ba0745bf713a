//! Payload mapping: domain records <-> payload fragments.
//!
//! A fragment is a comma-separated list of `"key":value` pairs without the
//! outer braces. Decoding is key-addressed through [`extract`], so field order
//! only matters for readability.
//!
//! Partial replies are accepted: a field absent from the fragment leaves the
//! record attribute at its zero value. A field that is present but does not
//! parse as a number fails the decode with `MalformedNumber`.

use std::str::FromStr;

use super::field::{extract, split_list};
use crate::error::{BridgeError, Result};
use crate::msgs::{LidarScan, Pose2D, Twist2D};

/// Ordered `(key, wire value)` pairs.
pub type WireFields = Vec<(&'static str, String)>;

/// A domain record that can travel in an envelope payload.
pub trait PayloadRecord: Sized + Default {
    fn to_wire_fields(&self) -> WireFields;
    fn from_wire_fields(payload: &str) -> Result<Self>;
}

/// Join wire fields into a payload fragment.
pub fn fields_to_fragment(fields: &[(&str, String)]) -> String {
    fields
        .iter()
        .map(|(k, v)| format!("\"{k}\":{v}"))
        .collect::<Vec<_>>()
        .join(",")
}

/// Payload fragment for a record.
pub fn to_fragment<R: PayloadRecord>(record: &R) -> String {
    fields_to_fragment(&record.to_wire_fields())
}

/// Identity decoder for channels whose payload is plain text (e.g. hostname).
pub fn decode_text(payload: &str) -> Result<String> {
    Ok(payload.to_owned())
}

/// Decoder for list payloads, e.g. the bridge's channel list.
pub fn decode_text_list(payload: &str) -> Result<Vec<String>> {
    split_list(payload)
        .ok_or_else(|| BridgeError::Protocol(format!("expected a list payload, got {payload:?}")))
}

// --------------------
// Field readers
// --------------------

pub fn read_f32(payload: &str, key: &str) -> Result<Option<f32>> {
    read_scalar(payload, key)
}

pub fn read_i64(payload: &str, key: &str) -> Result<Option<i64>> {
    read_scalar(payload, key)
}

/// Read a bracketed numeric sequence (`[v0,v1,...]`, `[]` for empty).
pub fn read_f32_seq(payload: &str, key: &str) -> Result<Option<Vec<f32>>> {
    let Some(field) = extract(payload, key) else {
        return Ok(None);
    };
    let token = field.text();
    let inner = token
        .trim()
        .strip_prefix('[')
        .and_then(|t| t.strip_suffix(']'))
        .ok_or_else(|| malformed(key, &token))?
        .trim();

    if inner.is_empty() {
        return Ok(Some(Vec::new()));
    }
    inner
        .split(',')
        .map(|t| parse_token(key, t.trim()))
        .collect::<Result<Vec<f32>>>()
        .map(Some)
}

/// Format a numeric sequence as `[v0,v1,...]`.
pub fn format_f32_seq(vals: &[f32]) -> String {
    let body = vals
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(",");
    format!("[{body}]")
}

fn read_scalar<T: FromStr>(payload: &str, key: &str) -> Result<Option<T>> {
    match extract(payload, key) {
        Some(field) => parse_token(key, field.text().trim()).map(Some),
        None => Ok(None),
    }
}

fn parse_token<T: FromStr>(key: &str, token: &str) -> Result<T> {
    token.parse::<T>().map_err(|_| malformed(key, token))
}

fn malformed(key: &str, token: &str) -> BridgeError {
    BridgeError::MalformedNumber {
        key: key.to_owned(),
        token: token.to_owned(),
    }
}

// --------------------
// Record mappings
// --------------------

impl PayloadRecord for Pose2D {
    fn to_wire_fields(&self) -> WireFields {
        let mut fields = vec![
            ("x", self.x.to_string()),
            ("y", self.y.to_string()),
            ("theta", self.theta.to_string()),
        ];
        if let Some(utime) = self.utime {
            fields.push(("utime", utime.to_string()));
        }
        fields
    }

    fn from_wire_fields(payload: &str) -> Result<Self> {
        Ok(Self {
            x: read_f32(payload, "x")?.unwrap_or_default(),
            y: read_f32(payload, "y")?.unwrap_or_default(),
            theta: read_f32(payload, "theta")?.unwrap_or_default(),
            utime: read_i64(payload, "utime")?,
        })
    }
}

impl PayloadRecord for Twist2D {
    fn to_wire_fields(&self) -> WireFields {
        vec![
            ("vx", self.vx.to_string()),
            ("vy", self.vy.to_string()),
            ("wz", self.wz.to_string()),
        ]
    }

    fn from_wire_fields(payload: &str) -> Result<Self> {
        Ok(Self {
            vx: read_f32(payload, "vx")?.unwrap_or_default(),
            vy: read_f32(payload, "vy")?.unwrap_or_default(),
            wz: read_f32(payload, "wz")?.unwrap_or_default(),
        })
    }
}

impl PayloadRecord for LidarScan {
    fn to_wire_fields(&self) -> WireFields {
        vec![
            ("ranges", format_f32_seq(&self.ranges)),
            ("thetas", format_f32_seq(&self.thetas)),
        ]
    }

    fn from_wire_fields(payload: &str) -> Result<Self> {
        let ranges = read_f32_seq(payload, "ranges")?;
        let thetas = read_f32_seq(payload, "thetas")?;

        if let (Some(r), Some(t)) = (&ranges, &thetas) {
            if r.len() != t.len() {
                return Err(BridgeError::Protocol(format!(
                    "lidar ranges/thetas length mismatch: {} vs {}",
                    r.len(),
                    t.len()
                )));
            }
        }

        Ok(Self {
            ranges: ranges.unwrap_or_default(),
            thetas: thetas.unwrap_or_default(),
        })
    }
}
