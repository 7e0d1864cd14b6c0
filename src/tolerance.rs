//! Tolerance Evaluation - Per-Axis Pass/Fail
//!
//! Each axis (or edge) is compared against its own nominal value.
//! The overall verdict is the AND of every axis check.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::geometry::{check_pair, FieldError, FieldGeometry, ShapeKind};
use crate::TOLERANCE_CM;

/// Resolution at which deviations are compared, in centimeters.
/// Keeps decimal inputs like 10.2 vs 10 exactly on the inclusive boundary.
const COMPARISON_RESOLUTION_CM: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AxisCheck {
    pub axis: String,
    pub expected: f64,
    pub measured: f64,
    pub deviation: f64,
    pub pass: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToleranceResult {
    pub kind: ShapeKind,
    pub tolerance_cm: f64,
    pub checks: Vec<AxisCheck>,
    pub overall_pass: bool,
}

impl ToleranceResult {
    fn from_checks(kind: ShapeKind, checks: Vec<AxisCheck>) -> Self {
        let overall_pass = checks.iter().all(|c| c.pass);
        Self {
            kind,
            tolerance_cm: TOLERANCE_CM,
            checks,
            overall_pass,
        }
    }

    /// Pass flag for one axis label, if that axis was checked
    pub fn passed(&self, axis: &str) -> Option<bool> {
        self.checks.iter().find(|c| c.axis == axis).map(|c| c.pass)
    }

    pub fn failed_axes(&self) -> Vec<&str> {
        self.checks
            .iter()
            .filter(|c| !c.pass)
            .map(|c| c.axis.as_str())
            .collect()
    }
}

/// Compares measured geometry against expected geometry with the fixed ±2 mm band.
#[derive(Debug, Clone, Copy, Default)]
pub struct ToleranceEvaluator;

impl ToleranceEvaluator {
    pub fn new() -> Self {
        Self
    }

    pub fn evaluate(
        &self,
        expected: &FieldGeometry,
        measured: &FieldGeometry,
    ) -> Result<ToleranceResult, FieldError> {
        check_pair(expected, measured)?;

        let checks: Vec<AxisCheck> = expected
            .components()
            .into_iter()
            .zip(measured.components())
            .map(|((axis, nominal), (_, actual))| axis_check(axis, nominal, actual))
            .collect();

        let result = ToleranceResult::from_checks(expected.kind(), checks);
        debug!(
            kind = %result.kind,
            overall_pass = result.overall_pass,
            failed = ?result.failed_axes(),
            "evaluated field tolerance"
        );
        Ok(result)
    }
}

fn axis_check(axis: &str, expected: f64, measured: f64) -> AxisCheck {
    let deviation = measured - expected;
    AxisCheck {
        axis: axis.to_string(),
        expected,
        measured,
        deviation,
        pass: within_tolerance(deviation),
    }
}

/// Inclusive on both sides: exactly TOL away still passes.
fn within_tolerance(deviation: f64) -> bool {
    let steps = (deviation.abs() / COMPARISON_RESOLUTION_CM).round();
    let limit = (TOLERANCE_CM / COMPARISON_RESOLUTION_CM).round();
    steps <= limit
}
