//! Field Size QA Core - Mechanical Field-Size Checks
//!
//! # Ground Rules
//! 1. Tolerance Is Fixed (±0.2 cm on every axis, inclusive)
//! 2. Position Matters (asymmetric edges are checked one by one)
//! 3. Diagrams Compare Shape (every rectangle is drawn centered)
//! 4. No Partial Reports (one bad field aborts the report)
//! 5. Deterministic Output (same inputs, same verdicts and images)

pub mod geometry;
pub mod tolerance;
pub mod diagram;
pub mod hashing;
pub mod report;
pub mod layout;
pub mod bundle;

pub use geometry::{FieldError, FieldGeometry, MeasurementPair, ShapeKind};
pub use tolerance::{AxisCheck, ToleranceEvaluator, ToleranceResult};
pub use diagram::{DiagramArtifact, DiagramLayout, FieldDiagramRenderer, PlotRect};
pub use hashing::{canonical_json, compute_request_hash, compute_result_hash};
pub use report::{FieldQaReport, FieldReport, ReportError, ReportGenerator, ReportRequest};
pub use layout::{paginate, render_text, Page, ReportStyle};
pub use bundle::{write_bundle, BundleError, BundleSummary};

pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Acceptable deviation per axis or edge, in centimeters (±2 mm).
pub const TOLERANCE_CM: f64 = 0.2;

/// Visual zoom applied to centimeter values in diagrams.
pub const DISPLAY_SCALE: f64 = 0.1;

/// Extra plot-space margin around the largest diagram shape.
pub const VIEW_MARGIN: f64 = 0.5;

/// Diagram raster side length in pixels.
pub const DIAGRAM_SIZE_PX: u32 = 500;

/// Nominal symmetric field sizes, in centimeters, in report order.
pub const STANDARD_FIELD_SIZES: [f64; 5] = [5.0, 10.0, 15.0, 20.0, 25.0];
