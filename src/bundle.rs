//! Report Bundle - On-Disk Output
//!
//! Layout of a bundle directory:
//! - `report.json`: the full report, diagrams embedded as base64
//! - `layout.json`: the paginated page plan
//! - `report.txt`: plain-text rendering of the page plan
//! - `diagrams/*.png`: one diagram per field

use base64::Engine as _;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

use crate::layout::{render_text, Page};
use crate::report::FieldQaReport;

#[derive(Debug, Error)]
pub enum BundleError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Diagram {filename} is not valid base64: {message}")]
    Decode { filename: String, message: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct BundleSummary {
    pub directory: PathBuf,
    pub report: PathBuf,
    pub layout: PathBuf,
    pub text: PathBuf,
    pub diagrams: Vec<PathBuf>,
}

pub fn write_bundle(
    report: &FieldQaReport,
    pages: &[Page],
    dir: &Path,
) -> Result<BundleSummary, BundleError> {
    let diagram_dir = dir.join("diagrams");
    fs::create_dir_all(&diagram_dir)?;

    let report_path = dir.join("report.json");
    fs::write(&report_path, serde_json::to_string_pretty(report)?)?;

    let layout_path = dir.join("layout.json");
    fs::write(&layout_path, serde_json::to_string_pretty(pages)?)?;

    let text_path = dir.join("report.txt");
    fs::write(&text_path, render_text(pages))?;

    let mut diagrams = Vec::with_capacity(report.fields.len());
    for field in &report.fields {
        let png = base64::engine::general_purpose::STANDARD
            .decode(&field.diagram.data_base64)
            .map_err(|e| BundleError::Decode {
                filename: field.diagram.filename.clone(),
                message: e.to_string(),
            })?;
        let path = diagram_dir.join(&field.diagram.filename);
        fs::write(&path, png)?;
        diagrams.push(path);
    }

    info!(
        directory = %dir.display(),
        diagrams = diagrams.len(),
        "wrote report bundle"
    );

    Ok(BundleSummary {
        directory: dir.to_path_buf(),
        report: report_path,
        layout: layout_path,
        text: text_path,
        diagrams,
    })
}
