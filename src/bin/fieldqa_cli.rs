//! Field Size QA CLI - Bridge interface for the measurement form
//!
//! Commands: fields, evaluate, diagram, report
//! Outputs JSON to stdout, logs to stderr
//! Returns 2 when a field is outside tolerance

use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use fieldqa_core::{
    paginate, write_bundle, FieldDiagramRenderer, MeasurementPair, ReportGenerator,
    ReportRequest, ReportStyle, ToleranceEvaluator, DIAGRAM_SIZE_PX, DISPLAY_SCALE,
    STANDARD_FIELD_SIZES, TOLERANCE_CM,
};

#[derive(Parser)]
#[command(name = "fieldqa-cli")]
#[command(about = "Field Size QA CLI - tolerance checks and field diagrams")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to a JSON report style file
    #[arg(short, long)]
    style: Option<PathBuf>,

    /// TTF/OTF font for diagram labels (defaults to a system font if found)
    #[arg(long, global = true)]
    font: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// List the standard field set and tolerance constants
    Fields,

    /// Evaluate one field
    Evaluate {
        /// JSON payload (MeasurementPair), or @path to read it from a file
        #[arg(short, long)]
        payload: String,
    },

    /// Render one field diagram as PNG
    Diagram {
        /// JSON payload (MeasurementPair), or @path
        #[arg(short, long)]
        payload: String,

        /// Output PNG path
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Generate the full report bundle
    Report {
        /// JSON payload (ReportRequest), or @path
        #[arg(short, long, required_unless_present = "standard")]
        payload: Option<String>,

        /// Use the form defaults (every field at nominal)
        #[arg(long)]
        standard: bool,

        /// Output directory for the bundle
        #[arg(short, long)]
        output: PathBuf,
    },
}

fn init_tracing() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn read_payload(payload: &str) -> Result<String, String> {
    match payload.strip_prefix('@') {
        Some(path) => fs::read_to_string(path)
            .map_err(|e| format!("Failed to read payload file {}: {}", path, e)),
        None => Ok(payload.to_string()),
    }
}

fn parse_payload<T: serde::de::DeserializeOwned>(payload: &str) -> Result<T, String> {
    let raw = read_payload(payload)?;
    serde_json::from_str(&raw).map_err(|e| format!("Invalid payload: {}", e))
}

fn load_style(path: Option<&Path>) -> Result<ReportStyle, String> {
    let style = match path {
        Some(path) => {
            let content = fs::read_to_string(path)
                .map_err(|e| format!("Failed to read style {}: {}", path.display(), e))?;
            serde_json::from_str(&content).map_err(|e| format!("Invalid style: {}", e))?
        }
        None => ReportStyle::default(),
    };
    style.validate()?;
    Ok(style)
}

fn load_renderer(font: Option<&Path>) -> Result<FieldDiagramRenderer, String> {
    match font {
        Some(path) => FieldDiagramRenderer::with_font_path(path).map_err(|e| e.to_string()),
        None => Ok(FieldDiagramRenderer::with_system_font()),
    }
}

fn print_error(error: &str) -> ExitCode {
    let output = serde_json::json!({
        "success": false,
        "error": error,
    });
    println!("{}", output);
    ExitCode::FAILURE
}

fn print_json(value: &serde_json::Value) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{}", s),
        Err(e) => println!(r#"{{"success": false, "error": "{}"}}"#, e),
    }
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Fields => {
            print_json(&serde_json::json!({
                "standard_sizes_cm": STANDARD_FIELD_SIZES,
                "tolerance_cm": TOLERANCE_CM,
                "display_scale": DISPLAY_SCALE,
                "diagram_size_px": DIAGRAM_SIZE_PX,
            }));
            ExitCode::SUCCESS
        }

        Commands::Evaluate { payload } => {
            let pair: MeasurementPair = match parse_payload(&payload) {
                Ok(p) => p,
                Err(e) => return print_error(&e),
            };

            match ToleranceEvaluator::new().evaluate(&pair.expected, &pair.measured) {
                Ok(result) => {
                    print_json(&serde_json::json!({
                        "success": true,
                        "result": result,
                    }));
                    if result.overall_pass {
                        ExitCode::SUCCESS
                    } else {
                        ExitCode::from(2)  // Outside tolerance
                    }
                }
                Err(e) => print_error(&e.to_string()),
            }
        }

        Commands::Diagram { payload, output } => {
            let pair: MeasurementPair = match parse_payload(&payload) {
                Ok(p) => p,
                Err(e) => return print_error(&e),
            };

            let renderer = match load_renderer(cli.font.as_deref()) {
                Ok(r) => r,
                Err(e) => return print_error(&e),
            };

            let artifact = match renderer.render(&pair.expected, &pair.measured) {
                Ok(a) => a,
                Err(e) => return print_error(&e.to_string()),
            };

            if let Err(e) = fs::write(&output, &artifact.png) {
                return print_error(&format!("Failed to write {}: {}", output.display(), e));
            }

            print_json(&serde_json::json!({
                "success": true,
                "output": output,
                "size": [artifact.width, artifact.height],
                "bytes": artifact.png.len(),
            }));
            ExitCode::SUCCESS
        }

        Commands::Report { payload, standard, output } => {
            let style = match load_style(cli.style.as_deref()) {
                Ok(s) => s,
                Err(e) => return print_error(&e),
            };

            let request: ReportRequest = match (standard, payload) {
                (true, _) => ReportRequest::standard(),
                (false, Some(payload)) => match parse_payload(&payload) {
                    Ok(r) => r,
                    Err(e) => return print_error(&e),
                },
                (false, None) => return print_error("Either --payload or --standard is required"),
            };

            let renderer = match load_renderer(cli.font.as_deref()) {
                Ok(r) => r,
                Err(e) => return print_error(&e),
            };

            let report = match ReportGenerator::with_renderer(renderer).generate(&request) {
                Ok(r) => r,
                Err(e) => return print_error(&e.to_string()),
            };

            let pages = match paginate(&report, &style) {
                Ok(p) => p,
                Err(e) => return print_error(e),
            };
            let bundle = match write_bundle(&report, &pages, &output) {
                Ok(b) => b,
                Err(e) => return print_error(&e.to_string()),
            };

            print_json(&serde_json::json!({
                "success": true,
                "report_id": report.id,
                "request_hash": report.request_hash,
                "result_hash": report.result_hash,
                "all_within_tolerance": report.all_within_tolerance,
                "failures": report.failures(),
                "pages": pages.len(),
                "bundle": bundle,
            }));

            if report.all_within_tolerance {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(2)  // At least one field outside tolerance
            }
        }
    }
}
