//! Field Geometry - The Shared Data Model
//!
//! A field is either a nominal square (symmetric) or a rectangle given by
//! four independent edges (asymmetric). Width and height are always derived.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors raised by the core components for a single field.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FieldError {
    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("Shape mismatch: expected is {expected}, measured is {measured}")]
    ShapeMismatch {
        expected: ShapeKind,
        measured: ShapeKind,
    },

    #[error("Diagram encoding error: {0}")]
    Encode(String),

    #[error("Font error: {0}")]
    Font(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeKind {
    Symmetric,
    Asymmetric,
}

impl fmt::Display for ShapeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShapeKind::Symmetric => f.write_str("symmetric"),
            ShapeKind::Asymmetric => f.write_str("asymmetric"),
        }
    }
}

/// One rectangular field, in centimeters.
///
/// An expected symmetric field is built with [`FieldGeometry::square`]. A
/// measured symmetric field keeps its two extents separately since the
/// operator measures X and Y independently.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum FieldGeometry {
    Symmetric { x: f64, y: f64 },
    Asymmetric { x1: f64, x2: f64, y1: f64, y2: f64 },
}

impl FieldGeometry {
    /// Nominal square field of side `size`
    pub fn square(size: f64) -> Self {
        Self::Symmetric { x: size, y: size }
    }

    pub fn asymmetric(x1: f64, x2: f64, y1: f64, y2: f64) -> Self {
        Self::Asymmetric { x1, x2, y1, y2 }
    }

    pub fn kind(&self) -> ShapeKind {
        match self {
            Self::Symmetric { .. } => ShapeKind::Symmetric,
            Self::Asymmetric { .. } => ShapeKind::Asymmetric,
        }
    }

    pub fn width(&self) -> f64 {
        match *self {
            Self::Symmetric { x, .. } => x,
            Self::Asymmetric { x1, x2, .. } => x2 - x1,
        }
    }

    pub fn height(&self) -> f64 {
        match *self {
            Self::Symmetric { y, .. } => y,
            Self::Asymmetric { y1, y2, .. } => y2 - y1,
        }
    }

    /// Labelled components in comparison order.
    pub fn components(&self) -> Vec<(&'static str, f64)> {
        match *self {
            Self::Symmetric { x, y } => vec![("x", x), ("y", y)],
            Self::Asymmetric { x1, x2, y1, y2 } => {
                vec![("x1", x1), ("x2", x2), ("y1", y1), ("y2", y2)]
            }
        }
    }

    /// Rejects non-finite values, negative symmetric extents and inverted edges.
    pub fn validate(&self) -> Result<(), FieldError> {
        for (axis, value) in self.components() {
            if !value.is_finite() {
                return Err(FieldError::InvalidGeometry(format!(
                    "{} must be finite, got {}",
                    axis, value
                )));
            }
        }

        match *self {
            Self::Symmetric { x, y } => {
                if x < 0.0 || y < 0.0 {
                    return Err(FieldError::InvalidGeometry(format!(
                        "symmetric extents must not be negative, got {}x{}",
                        x, y
                    )));
                }
            }
            Self::Asymmetric { x1, x2, y1, y2 } => {
                if x2 < x1 {
                    return Err(FieldError::InvalidGeometry(format!(
                        "x2 ({}) is less than x1 ({})",
                        x2, x1
                    )));
                }
                if y2 < y1 {
                    return Err(FieldError::InvalidGeometry(format!(
                        "y2 ({}) is less than y1 ({})",
                        y2, y1
                    )));
                }
            }
        }

        Ok(())
    }

    /// Validation for the nominal side of a pair: a symmetric field must be a
    /// square of positive size.
    pub fn validate_expected(&self) -> Result<(), FieldError> {
        self.validate()?;
        if let Self::Symmetric { x, y } = *self {
            if x <= 0.0 || y <= 0.0 {
                return Err(FieldError::InvalidGeometry(format!(
                    "nominal field size must be positive, got {}x{}",
                    x, y
                )));
            }
            if x != y {
                return Err(FieldError::InvalidGeometry(format!(
                    "nominal symmetric field must be square, got {}x{}",
                    x, y
                )));
            }
        }
        Ok(())
    }
}

/// Expected and measured geometry for one field entry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MeasurementPair {
    pub expected: FieldGeometry,
    pub measured: FieldGeometry,
}

impl MeasurementPair {
    pub fn new(expected: FieldGeometry, measured: FieldGeometry) -> Result<Self, FieldError> {
        check_pair(&expected, &measured)?;
        Ok(Self { expected, measured })
    }

    pub fn kind(&self) -> ShapeKind {
        self.expected.kind()
    }
}

/// Shared precondition of the evaluator and the renderer.
pub(crate) fn check_pair(expected: &FieldGeometry, measured: &FieldGeometry) -> Result<(), FieldError> {
    if expected.kind() != measured.kind() {
        return Err(FieldError::ShapeMismatch {
            expected: expected.kind(),
            measured: measured.kind(),
        });
    }
    expected.validate_expected()?;
    measured.validate()
}
