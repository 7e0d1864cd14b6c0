//! Report Hashing - Traceable Verdicts
//!
//! Two digests identify a report:
//! - the request hash covers the entered measurements and the engine version
//! - the result hash covers the request hash, every axis verdict and every
//!   diagram hash
//!
//! Neither includes the report id or the generation time, so regenerating a
//! report from the same measurements reproduces both.

use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fmt::Write as _;

use crate::report::FieldReport;
use crate::tolerance::AxisCheck;

/// Lowercase hex SHA-256 of `data`
pub fn sha256_hex(data: &[u8]) -> String {
    Sha256::digest(data)
        .iter()
        .fold(String::with_capacity(64), |mut out, b| {
            let _ = write!(out, "{:02x}", b);
            out
        })
}

/// Compact JSON with object keys in sorted order.
///
/// `serde_json::Map` is ordered by key, so going through `Value` is enough.
pub fn canonical_json<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string(&serde_json::to_value(value)?)
}

#[derive(Serialize)]
struct RequestDigest<'a, T: Serialize> {
    engine_version: &'a str,
    request: &'a T,
}

pub fn compute_request_hash(
    request: &impl Serialize,
    engine_version: &str,
) -> Result<String, serde_json::Error> {
    let digest = RequestDigest { engine_version, request };
    Ok(sha256_hex(canonical_json(&digest)?.as_bytes()))
}

#[derive(Serialize)]
struct FieldDigest<'a> {
    label: &'a str,
    overall_pass: bool,
    checks: &'a [AxisCheck],
    diagram_hash: &'a str,
}

#[derive(Serialize)]
struct ResultDigest<'a> {
    request_hash: &'a str,
    fields: Vec<FieldDigest<'a>>,
}

/// Hash of what a report concludes, in report order.
pub fn compute_result_hash(
    request_hash: &str,
    fields: &[FieldReport],
) -> Result<String, serde_json::Error> {
    let digest = ResultDigest {
        request_hash,
        fields: fields
            .iter()
            .map(|f| FieldDigest {
                label: &f.label,
                overall_pass: f.result.overall_pass,
                checks: &f.result.checks,
                diagram_hash: &f.diagram.hash,
            })
            .collect(),
    };
    Ok(sha256_hex(canonical_json(&digest)?.as_bytes()))
}
