//! Report Generation - Single Entry Point
//!
//! Every field in a request is evaluated and drawn. A failure on any field
//! aborts the whole report; no default verdict is ever substituted.

use base64::Engine as _;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::diagram::{DiagramArtifact, FieldDiagramRenderer};
use crate::geometry::{FieldError, FieldGeometry, MeasurementPair, ShapeKind};
use crate::hashing::{compute_request_hash, compute_result_hash, sha256_hex};
use crate::tolerance::{ToleranceEvaluator, ToleranceResult};
use crate::{ENGINE_VERSION, STANDARD_FIELD_SIZES};

pub const ASYMMETRIC_LABEL: &str = "Asymmetric";

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Report request contains no fields")]
    EmptyRequest,

    #[error("Unknown field size: {0} cm is not a standard field")]
    UnknownFieldSize(f64),

    #[error("Duplicate field: {0}")]
    DuplicateField(String),

    #[error("Field {label}: {source}")]
    Field {
        label: String,
        #[source]
        source: FieldError,
    },

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// Measured X/Y of one standard square field.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SymmetricInput {
    pub size: f64,
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AsymmetricInput {
    pub expected: EdgeValues,
    pub measured: EdgeValues,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EdgeValues {
    pub x1: f64,
    pub x2: f64,
    pub y1: f64,
    pub y2: f64,
}

impl From<EdgeValues> for FieldGeometry {
    fn from(e: EdgeValues) -> Self {
        FieldGeometry::asymmetric(e.x1, e.x2, e.y1, e.y2)
    }
}

/// The values collected by the measurement form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRequest {
    #[serde(default)]
    pub symmetric: Vec<SymmetricInput>,
    #[serde(default)]
    pub asymmetric: Option<AsymmetricInput>,
}

impl ReportRequest {
    /// Form defaults: every field measured exactly at nominal.
    pub fn standard() -> Self {
        let edges = EdgeValues { x1: 0.0, x2: 10.0, y1: 0.0, y2: 10.0 };
        Self {
            symmetric: STANDARD_FIELD_SIZES
                .iter()
                .map(|&size| SymmetricInput { size, x: size, y: size })
                .collect(),
            asymmetric: Some(AsymmetricInput {
                expected: edges,
                measured: edges,
            }),
        }
    }

    /// Field entries in report order: symmetric ascending, then asymmetric.
    pub fn entries(&self) -> Result<Vec<FieldEntry>, ReportError> {
        if self.symmetric.is_empty() && self.asymmetric.is_none() {
            return Err(ReportError::EmptyRequest);
        }

        let mut symmetric = self.symmetric.clone();
        for input in &symmetric {
            if !STANDARD_FIELD_SIZES.contains(&input.size) {
                return Err(ReportError::UnknownFieldSize(input.size));
            }
        }
        symmetric.sort_by(|a, b| a.size.total_cmp(&b.size));
        if let Some(dup) = symmetric.windows(2).find(|w| w[0].size == w[1].size) {
            return Err(ReportError::DuplicateField(symmetric_label(dup[0].size)));
        }

        let mut entries = Vec::with_capacity(symmetric.len() + 1);
        for input in symmetric {
            let label = symmetric_label(input.size);
            let pair = MeasurementPair::new(
                FieldGeometry::square(input.size),
                FieldGeometry::Symmetric { x: input.x, y: input.y },
            )
            .map_err(|source| ReportError::Field { label: label.clone(), source })?;
            entries.push(FieldEntry { label, pair });
        }

        if let Some(asym) = self.asymmetric {
            let pair = MeasurementPair::new(asym.expected.into(), asym.measured.into())
                .map_err(|source| ReportError::Field {
                    label: ASYMMETRIC_LABEL.to_string(),
                    source,
                })?;
            entries.push(FieldEntry {
                label: ASYMMETRIC_LABEL.to_string(),
                pair,
            });
        }

        Ok(entries)
    }
}

pub fn symmetric_label(size: f64) -> String {
    format!("{}x{} cm", size, size)
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldEntry {
    pub label: String,
    pub pair: MeasurementPair,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldReport {
    pub label: String,
    pub kind: ShapeKind,
    pub expected: FieldGeometry,
    pub measured: FieldGeometry,
    pub result: ToleranceResult,
    pub diagram: ExportedDiagram,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportedDiagram {
    pub filename: String,
    pub format: String,
    pub size: [u32; 2],
    pub data_base64: String,
    pub hash: String,
}

impl ExportedDiagram {
    pub fn from_artifact(label: &str, artifact: &DiagramArtifact) -> Self {
        Self {
            filename: format!("{}.png", diagram_stem(label)),
            format: "png".to_string(),
            size: [artifact.width, artifact.height],
            data_base64: base64::engine::general_purpose::STANDARD.encode(&artifact.png),
            hash: sha256_hex(&artifact.png),
        }
    }
}

/// "5x5 cm" -> "field_5x5_cm", "Asymmetric" -> "field_asymmetric"
fn diagram_stem(label: &str) -> String {
    let cleaned: String = label
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect();
    format!("field_{}", cleaned.trim_matches('_'))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldQaReport {
    pub id: String,
    pub engine_version: String,
    pub created_at: DateTime<Utc>,
    pub request_hash: String,
    /// Reproducible from the same measurements; excludes id and timestamp
    pub result_hash: String,
    pub all_within_tolerance: bool,
    pub fields: Vec<FieldReport>,
}

impl FieldQaReport {
    /// Labels of fields outside tolerance, in report order
    pub fn failures(&self) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|f| !f.result.overall_pass)
            .map(|f| f.label.as_str())
            .collect()
    }
}

/// Runs the evaluator and renderer over every field of a request.
#[derive(Debug, Clone, Default)]
pub struct ReportGenerator {
    evaluator: ToleranceEvaluator,
    renderer: FieldDiagramRenderer,
}

impl ReportGenerator {
    pub fn new() -> Self {
        Self {
            evaluator: ToleranceEvaluator::new(),
            renderer: FieldDiagramRenderer::new(),
        }
    }

    /// Uses `renderer` for diagrams, e.g. one carrying a label font.
    pub fn with_renderer(renderer: FieldDiagramRenderer) -> Self {
        Self {
            evaluator: ToleranceEvaluator::new(),
            renderer,
        }
    }

    pub fn evaluate_field(&self, entry: &FieldEntry) -> Result<FieldReport, ReportError> {
        let field_err = |source| ReportError::Field {
            label: entry.label.clone(),
            source,
        };
        let MeasurementPair { expected, measured } = entry.pair;

        let result = self.evaluator.evaluate(&expected, &measured).map_err(field_err)?;
        let artifact = self.renderer.render(&expected, &measured).map_err(field_err)?;

        if !result.overall_pass {
            warn!(
                field = %entry.label,
                failed = ?result.failed_axes(),
                "field outside tolerance"
            );
        }

        Ok(FieldReport {
            label: entry.label.clone(),
            kind: entry.pair.kind(),
            expected,
            measured,
            result,
            diagram: ExportedDiagram::from_artifact(&entry.label, &artifact),
        })
    }

    pub fn generate(&self, request: &ReportRequest) -> Result<FieldQaReport, ReportError> {
        let entries = request.entries()?;

        let fields = entries
            .iter()
            .map(|entry| self.evaluate_field(entry))
            .collect::<Result<Vec<_>, _>>()?;

        let request_hash = compute_request_hash(request, ENGINE_VERSION)?;
        let result_hash = compute_result_hash(&request_hash, &fields)?;
        let all_within_tolerance = fields.iter().all(|f| f.result.overall_pass);

        let report = FieldQaReport {
            id: Uuid::new_v4().to_string(),
            engine_version: ENGINE_VERSION.to_string(),
            created_at: Utc::now(),
            request_hash,
            result_hash,
            all_within_tolerance,
            fields,
        };

        info!(
            report_id = %report.id,
            fields = report.fields.len(),
            failures = report.failures().len(),
            "generated field size report"
        );

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_request_order() {
        let entries = ReportRequest::standard().entries().unwrap();
        let labels: Vec<_> = entries.iter().map(|e| e.label.as_str()).collect();
        assert_eq!(
            labels,
            vec!["5x5 cm", "10x10 cm", "15x15 cm", "20x20 cm", "25x25 cm", "Asymmetric"]
        );
    }

    #[test]
    fn test_unsorted_input_is_ordered() {
        let request = ReportRequest {
            symmetric: vec![
                SymmetricInput { size: 20.0, x: 20.0, y: 20.0 },
                SymmetricInput { size: 5.0, x: 5.0, y: 5.0 },
            ],
            asymmetric: None,
        };
        let entries = request.entries().unwrap();
        assert_eq!(entries[0].label, "5x5 cm");
        assert_eq!(entries[1].label, "20x20 cm");
    }

    #[test]
    fn test_unknown_size_rejected() {
        let request = ReportRequest {
            symmetric: vec![SymmetricInput { size: 12.0, x: 12.0, y: 12.0 }],
            asymmetric: None,
        };
        assert!(matches!(request.entries(), Err(ReportError::UnknownFieldSize(s)) if s == 12.0));
    }

    #[test]
    fn test_duplicate_rejected() {
        let request = ReportRequest {
            symmetric: vec![
                SymmetricInput { size: 10.0, x: 10.0, y: 10.0 },
                SymmetricInput { size: 10.0, x: 10.1, y: 10.0 },
            ],
            asymmetric: None,
        };
        assert!(matches!(request.entries(), Err(ReportError::DuplicateField(l)) if l == "10x10 cm"));
    }

    #[test]
    fn test_empty_rejected() {
        let request = ReportRequest { symmetric: vec![], asymmetric: None };
        assert!(matches!(request.entries(), Err(ReportError::EmptyRequest)));
    }

    #[test]
    fn test_diagram_stem() {
        assert_eq!(diagram_stem("5x5 cm"), "field_5x5_cm");
        assert_eq!(diagram_stem(ASYMMETRIC_LABEL), "field_asymmetric");
    }

    #[test]
    fn test_invalid_field_aborts_report() {
        let request = ReportRequest {
            symmetric: vec![SymmetricInput { size: 5.0, x: f64::NAN, y: 5.0 }],
            asymmetric: None,
        };
        let err = ReportGenerator::new().generate(&request).unwrap_err();
        assert!(matches!(
            err,
            ReportError::Field { ref label, source: FieldError::InvalidGeometry(_) } if label == "5x5 cm"
        ));
    }
}
