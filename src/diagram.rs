//! Field Diagram Rendering
//!
//! Draws the reference field, the measured field and the dashed tolerance
//! envelope as concentric rectangles, then encodes the figure as PNG.
//!
//! Every rectangle is centered on the origin. For asymmetric fields this
//! discards the absolute edge positions: the diagram compares size and
//! shape only, while [`crate::tolerance::ToleranceEvaluator`] still checks
//! each edge against its own nominal position.
//!
//! Text (title, axis labels, colour key labels) is drawn only when the
//! renderer has a font; without one the figure is lines only.

use ab_glyph::FontVec;
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder, Rgb, RgbImage};
use imageproc::drawing::{draw_line_segment_mut, draw_text_mut, text_size};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

use crate::geometry::{check_pair, FieldError, FieldGeometry};
use crate::{DIAGRAM_SIZE_PX, DISPLAY_SCALE, TOLERANCE_CM, VIEW_MARGIN};

const BACKGROUND_COLOR: Rgb<u8> = Rgb([255, 255, 255]);
const GRID_COLOR: Rgb<u8> = Rgb([225, 225, 225]);
const AXIS_COLOR: Rgb<u8> = Rgb([150, 150, 150]);
const FRAME_COLOR: Rgb<u8> = Rgb([0, 0, 0]);
const TEXT_COLOR: Rgb<u8> = Rgb([0, 0, 0]);
const REFERENCE_COLOR: Rgb<u8> = Rgb([0, 0, 255]);
const MEASURED_COLOR: Rgb<u8> = Rgb([255, 0, 0]);
const ENVELOPE_COLOR: Rgb<u8> = Rgb([0, 128, 0]);

/// Blank border around the plot area, in pixels.
const PLOT_MARGIN_PX: u32 = 30;
const LINE_THICKNESS_PX: i32 = 2;
const DASH_PX: f32 = 8.0;
const GAP_PX: f32 = 5.0;
/// Grid step mantissas, scaled by a power of ten to fit the view.
const NICE_STEPS: [f64; 4] = [1.0, 2.0, 2.5, 5.0];
const MAX_GRID_LINES_PER_SIDE: f64 = 6.0;
const TITLE_SCALE: f32 = 18.0;
const LABEL_SCALE: f32 = 14.0;
const LEGEND_SCALE: f32 = 12.0;
const LEGEND_ROW_PX: f32 = 16.0;

const SYSTEM_FONT_PATHS: [&str; 4] = [
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

/// Axis-aligned rectangle centered on the plot origin, in plot units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlotRect {
    pub width: f64,
    pub height: f64,
}

impl PlotRect {
    pub fn left(&self) -> f64 {
        -self.width / 2.0
    }

    pub fn right(&self) -> f64 {
        self.width / 2.0
    }

    pub fn bottom(&self) -> f64 {
        -self.height / 2.0
    }

    pub fn top(&self) -> f64 {
        self.height / 2.0
    }

    /// True when `other` lies strictly inside this rectangle on every side.
    pub fn strictly_contains(&self, other: &PlotRect) -> bool {
        self.left() < other.left()
            && self.right() > other.right()
            && self.bottom() < other.bottom()
            && self.top() > other.top()
    }
}

/// Plot-space geometry of one diagram.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DiagramLayout {
    pub reference: PlotRect,
    pub measured: PlotRect,
    pub envelope: PlotRect,
    /// The view spans `[-half_extent, half_extent]` on both axes.
    pub half_extent: f64,
}

/// Encoded diagram image owned by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagramArtifact {
    pub width: u32,
    pub height: u32,
    pub png: Vec<u8>,
}

/// Diagram title: "Symmetric field 5x5 cm" or "Asymmetric field".
pub fn diagram_title(expected: &FieldGeometry) -> String {
    match *expected {
        FieldGeometry::Symmetric { x, y } => format!("Symmetric field {}x{} cm", x, y),
        FieldGeometry::Asymmetric { .. } => "Asymmetric field".to_string(),
    }
}

#[derive(Clone, Default)]
pub struct FieldDiagramRenderer {
    font: Option<Arc<FontVec>>,
}

impl fmt::Debug for FieldDiagramRenderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDiagramRenderer")
            .field("font", &self.font.is_some())
            .finish()
    }
}

impl FieldDiagramRenderer {
    /// Renderer without a font: diagrams carry no text.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_font(font: FontVec) -> Self {
        Self {
            font: Some(Arc::new(font)),
        }
    }

    pub fn with_font_path(font_path: &Path) -> Result<Self, FieldError> {
        let data = std::fs::read(font_path)
            .map_err(|e| FieldError::Font(format!("{}: {}", font_path.display(), e)))?;
        let font = FontVec::try_from_vec(data).map_err(|_| {
            FieldError::Font(format!("failed to parse font file: {}", font_path.display()))
        })?;
        Ok(Self::with_font(font))
    }

    /// Tries a few common system font locations, falling back to no font.
    pub fn with_system_font() -> Self {
        for path in SYSTEM_FONT_PATHS {
            if let Ok(renderer) = Self::with_font_path(Path::new(path)) {
                info!("Loaded diagram font: {}", path);
                return renderer;
            }
        }
        debug!("No system font found, diagram text will be skipped");
        Self::default()
    }

    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    pub fn layout(
        &self,
        expected: &FieldGeometry,
        measured: &FieldGeometry,
    ) -> Result<DiagramLayout, FieldError> {
        check_pair(expected, measured)?;

        let reference = PlotRect {
            width: expected.width() * DISPLAY_SCALE,
            height: expected.height() * DISPLAY_SCALE,
        };
        let measured = PlotRect {
            width: measured.width() * DISPLAY_SCALE,
            height: measured.height() * DISPLAY_SCALE,
        };
        let band = TOLERANCE_CM * DISPLAY_SCALE;
        let envelope = PlotRect {
            width: reference.width + 2.0 * band,
            height: reference.height + 2.0 * band,
        };

        let largest = reference
            .width
            .max(measured.width)
            .max(reference.height)
            .max(measured.height);
        let half_extent = largest / 2.0 + band + VIEW_MARGIN;

        Ok(DiagramLayout {
            reference,
            measured,
            envelope,
            half_extent,
        })
    }

    pub fn render(
        &self,
        expected: &FieldGeometry,
        measured: &FieldGeometry,
    ) -> Result<DiagramArtifact, FieldError> {
        let layout = self.layout(expected, measured)?;

        // The figure is dropped at the end of this block on every path.
        let png = {
            let mut figure = Figure::new(layout.half_extent, self.font.as_deref());
            figure.draw_grid();
            figure.draw_axes();
            figure.draw_dashed_rect(&layout.envelope, ENVELOPE_COLOR);
            figure.draw_rect(&layout.reference, REFERENCE_COLOR);
            figure.draw_rect(&layout.measured, MEASURED_COLOR);
            figure.draw_legend();
            figure.draw_frame();
            figure.draw_labels(&diagram_title(expected));
            figure.encode_png()?
        };

        debug!(
            width = DIAGRAM_SIZE_PX,
            height = DIAGRAM_SIZE_PX,
            bytes = png.len(),
            "rendered field diagram"
        );

        Ok(DiagramArtifact {
            width: DIAGRAM_SIZE_PX,
            height: DIAGRAM_SIZE_PX,
            png,
        })
    }
}

/// Drawing surface for a single diagram.
struct Figure<'a> {
    canvas: RgbImage,
    half_extent: f64,
    font: Option<&'a FontVec>,
}

impl<'a> Figure<'a> {
    fn new(half_extent: f64, font: Option<&'a FontVec>) -> Self {
        Self {
            canvas: RgbImage::from_pixel(DIAGRAM_SIZE_PX, DIAGRAM_SIZE_PX, BACKGROUND_COLOR),
            half_extent,
            font,
        }
    }

    fn plot_side_px(&self) -> f64 {
        f64::from(DIAGRAM_SIZE_PX - 2 * PLOT_MARGIN_PX)
    }

    /// Plot coordinates to pixel coordinates (y grows downwards in pixels).
    fn to_px(&self, x: f64, y: f64) -> (f32, f32) {
        let span = 2.0 * self.half_extent;
        let side = self.plot_side_px();
        let margin = f64::from(PLOT_MARGIN_PX);
        let px = margin + (x + self.half_extent) / span * side;
        let py = margin + (self.half_extent - y) / span * side;
        (px as f32, py as f32)
    }

    /// Smallest nice step (1, 2, 2.5 or 5 times a power of ten) that keeps
    /// at most `MAX_GRID_LINES_PER_SIDE` lines on each side of the origin.
    fn grid_step(&self) -> f64 {
        let raw = self.half_extent / MAX_GRID_LINES_PER_SIDE;
        let magnitude = 10f64.powf(raw.log10().floor());
        NICE_STEPS
            .iter()
            .map(|m| m * magnitude)
            .find(|step| self.half_extent / step <= MAX_GRID_LINES_PER_SIDE)
            .unwrap_or(10.0 * magnitude)
    }

    fn draw_grid(&mut self) {
        let step = self.grid_step();
        let h = self.half_extent;
        let count = ((h / step).floor() as i64).min(MAX_GRID_LINES_PER_SIDE as i64);
        for k in -count..=count {
            let v = k as f64 * step;
            let (a, b) = (self.to_px(v, -h), self.to_px(v, h));
            draw_line_segment_mut(&mut self.canvas, a, b, GRID_COLOR);
            let (a, b) = (self.to_px(-h, v), self.to_px(h, v));
            draw_line_segment_mut(&mut self.canvas, a, b, GRID_COLOR);
        }
    }

    fn draw_axes(&mut self) {
        let h = self.half_extent;
        let (a, b) = (self.to_px(0.0, -h), self.to_px(0.0, h));
        draw_line_segment_mut(&mut self.canvas, a, b, AXIS_COLOR);
        let (a, b) = (self.to_px(-h, 0.0), self.to_px(h, 0.0));
        draw_line_segment_mut(&mut self.canvas, a, b, AXIS_COLOR);
    }

    fn corners(&self, rect: &PlotRect) -> [(f32, f32); 4] {
        [
            self.to_px(rect.left(), rect.top()),
            self.to_px(rect.right(), rect.top()),
            self.to_px(rect.right(), rect.bottom()),
            self.to_px(rect.left(), rect.bottom()),
        ]
    }

    /// Edges as line segments, so zero-width fields still draw as a line.
    fn draw_rect(&mut self, rect: &PlotRect, color: Rgb<u8>) {
        let corners = self.corners(rect);
        for offset in 0..LINE_THICKNESS_PX {
            let d = offset as f32;
            let grown = [
                (corners[0].0 - d, corners[0].1 - d),
                (corners[1].0 + d, corners[1].1 - d),
                (corners[2].0 + d, corners[2].1 + d),
                (corners[3].0 - d, corners[3].1 + d),
            ];
            for i in 0..4 {
                draw_line_segment_mut(&mut self.canvas, grown[i], grown[(i + 1) % 4], color);
            }
        }
    }

    fn draw_dashed_rect(&mut self, rect: &PlotRect, color: Rgb<u8>) {
        let corners = self.corners(rect);
        for i in 0..4 {
            self.draw_dashed_line(corners[i], corners[(i + 1) % 4], color);
        }
    }

    fn draw_dashed_line(&mut self, start: (f32, f32), end: (f32, f32), color: Rgb<u8>) {
        let (dx, dy) = (end.0 - start.0, end.1 - start.1);
        let length = (dx * dx + dy * dy).sqrt();
        if length == 0.0 {
            return;
        }
        let (ux, uy) = (dx / length, dy / length);
        let mut pos = 0.0;
        while pos < length {
            let stop = (pos + DASH_PX).min(length);
            let a = (start.0 + ux * pos, start.1 + uy * pos);
            let b = (start.0 + ux * stop, start.1 + uy * stop);
            draw_line_segment_mut(&mut self.canvas, a, b, color);
            // second pass one pixel across the line for thickness
            draw_line_segment_mut(
                &mut self.canvas,
                (a.0 + uy, a.1 - ux),
                (b.0 + uy, b.1 - ux),
                color,
            );
            pos += DASH_PX + GAP_PX;
        }
    }

    /// Colour key in the upper-left corner: reference, measured, envelope.
    fn draw_legend(&mut self) {
        let x0 = (PLOT_MARGIN_PX + 10) as f32;
        let x1 = x0 + 30.0;
        let mut y = (PLOT_MARGIN_PX + 12) as f32;
        for (color, label) in [(REFERENCE_COLOR, "Expected"), (MEASURED_COLOR, "Measured")] {
            for d in 0..LINE_THICKNESS_PX {
                let yy = y + d as f32;
                draw_line_segment_mut(&mut self.canvas, (x0, yy), (x1, yy), color);
            }
            self.draw_text(label, x1 + 12.0, y - LEGEND_SCALE / 2.0, LEGEND_SCALE);
            y += LEGEND_ROW_PX;
        }
        self.draw_dashed_line((x0, y), (x1 + 5.0, y), ENVELOPE_COLOR);
        self.draw_text("Tolerance (±2 mm)", x1 + 12.0, y - LEGEND_SCALE / 2.0, LEGEND_SCALE);
    }

    /// Title above the plot, axis labels below and beside it.
    fn draw_labels(&mut self, title: &str) {
        let side = DIAGRAM_SIZE_PX as f32;
        let title_w = self.text_width(title, TITLE_SCALE);
        self.draw_text(title, (side - title_w) / 2.0, 6.0, TITLE_SCALE);

        let x_label = "X (cm)";
        let x_w = self.text_width(x_label, LABEL_SCALE);
        let bottom = (DIAGRAM_SIZE_PX - PLOT_MARGIN_PX) as f32;
        self.draw_text(x_label, (side - x_w) / 2.0, bottom + 8.0, LABEL_SCALE);
        self.draw_text("Y (cm)", 4.0, 10.0, LABEL_SCALE);
    }

    fn text_width(&self, text: &str, scale: f32) -> f32 {
        match self.font {
            Some(font) => text_size(scale, font, text).0 as f32,
            None => 0.0,
        }
    }

    fn draw_text(&mut self, text: &str, x: f32, y: f32, scale: f32) {
        let Some(font) = self.font else { return };
        draw_text_mut(&mut self.canvas, TEXT_COLOR, x as i32, y as i32, scale, font, text);
    }

    fn draw_frame(&mut self) {
        let lo = PLOT_MARGIN_PX as f32;
        let hi = (DIAGRAM_SIZE_PX - PLOT_MARGIN_PX) as f32;
        let corners = [(lo, lo), (hi, lo), (hi, hi), (lo, hi)];
        for i in 0..4 {
            draw_line_segment_mut(&mut self.canvas, corners[i], corners[(i + 1) % 4], FRAME_COLOR);
        }
    }

    fn encode_png(&self) -> Result<Vec<u8>, FieldError> {
        let mut png = Vec::new();
        PngEncoder::new(&mut png)
            .write_image(
                self.canvas.as_raw(),
                self.canvas.width(),
                self.canvas.height(),
                ExtendedColorType::Rgb8,
            )
            .map_err(|e| FieldError::Encode(e.to_string()))?;
        Ok(png)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-12;

    #[test]
    fn test_layout_scaled_and_envelope() {
        let layout = FieldDiagramRenderer::new()
            .layout(
                &FieldGeometry::square(10.0),
                &FieldGeometry::Symmetric { x: 10.0, y: 10.0 },
            )
            .unwrap();
        assert!((layout.reference.width - 1.0).abs() < EPS);
        assert_eq!(layout.reference, layout.measured);
        assert!((layout.envelope.width - 1.04).abs() < EPS);
        assert!(layout.envelope.strictly_contains(&layout.reference));
        // 1.0 / 2 + 0.02 + 0.5
        assert!((layout.half_extent - 1.02).abs() < EPS);
    }

    #[test]
    fn test_layout_view_fits_largest() {
        let layout = FieldDiagramRenderer::new()
            .layout(
                &FieldGeometry::square(5.0),
                &FieldGeometry::Symmetric { x: 5.0, y: 20.0 },
            )
            .unwrap();
        assert!(layout.half_extent > layout.measured.top());
        assert!((layout.half_extent - (1.0 + 0.02 + 0.5)).abs() < EPS);
    }

    #[test]
    fn test_asymmetric_position_discarded() {
        let renderer = FieldDiagramRenderer::new();
        let a = renderer
            .layout(
                &FieldGeometry::asymmetric(0.0, 10.0, 0.0, 6.0),
                &FieldGeometry::asymmetric(0.0, 10.0, 0.0, 6.0),
            )
            .unwrap();
        let b = renderer
            .layout(
                &FieldGeometry::asymmetric(-8.0, 2.0, 3.0, 9.0),
                &FieldGeometry::asymmetric(-8.0, 2.0, 3.0, 9.0),
            )
            .unwrap();
        assert_eq!(a, b);
        assert!((a.reference.left() + a.reference.right()).abs() < EPS);
    }

    #[test]
    fn test_render_rejects_nan() {
        let err = FieldDiagramRenderer::new()
            .render(
                &FieldGeometry::square(10.0),
                &FieldGeometry::Symmetric { x: f64::INFINITY, y: 10.0 },
            )
            .unwrap_err();
        assert!(matches!(err, FieldError::InvalidGeometry(_)));
    }

    #[test]
    fn test_render_degenerate_field() {
        let artifact = FieldDiagramRenderer::new()
            .render(
                &FieldGeometry::asymmetric(0.0, 10.0, 0.0, 10.0),
                &FieldGeometry::asymmetric(4.0, 4.0, 0.0, 10.0),
            )
            .unwrap();
        assert_eq!(artifact.width, DIAGRAM_SIZE_PX);
        assert!(!artifact.png.is_empty());
    }

    #[test]
    fn test_grid_step_bounded() {
        for half_extent in [0.52, 1.02, 3.02, 250.0, 7.3e4, 5.0e10, 1.0e300] {
            let figure = Figure::new(half_extent, None);
            let step = figure.grid_step();
            assert!(step > 0.0);
            assert!(
                half_extent / step <= MAX_GRID_LINES_PER_SIDE,
                "{} lines per side for half extent {}",
                half_extent / step,
                half_extent
            );
        }
        assert_eq!(Figure::new(3.02, None).grid_step(), 0.5);
    }

    #[test]
    fn test_render_huge_finite_measurement() {
        let artifact = FieldDiagramRenderer::new()
            .render(
                &FieldGeometry::square(10.0),
                &FieldGeometry::Symmetric { x: 1e12, y: 10.0 },
            )
            .unwrap();
        assert_eq!(artifact.width, DIAGRAM_SIZE_PX);
        assert!(!artifact.png.is_empty());
    }

    #[test]
    fn test_diagram_title() {
        assert_eq!(diagram_title(&FieldGeometry::square(5.0)), "Symmetric field 5x5 cm");
        assert_eq!(
            diagram_title(&FieldGeometry::asymmetric(0.0, 10.0, 0.0, 10.0)),
            "Asymmetric field"
        );
    }

    #[test]
    fn test_missing_font_file() {
        let err = FieldDiagramRenderer::with_font_path(Path::new("/nonexistent/font.ttf")).unwrap_err();
        assert!(matches!(err, FieldError::Font(_)));
    }

    #[test]
    fn test_font_adds_text() {
        let renderer = FieldDiagramRenderer::with_system_font();
        if !renderer.has_font() {
            return;
        }
        let expected = FieldGeometry::square(5.0);
        let actual = FieldGeometry::Symmetric { x: 5.1, y: 5.0 };
        let plain = FieldDiagramRenderer::new().render(&expected, &actual).unwrap();
        let labelled = renderer.render(&expected, &actual).unwrap();
        assert_ne!(plain.png, labelled.png);
        assert_eq!(labelled, renderer.render(&expected, &actual).unwrap());
    }
}
