//! Report Layout - Paginated Document Plan
//!
//! Turns a generated report into pages of positioned elements. Coordinates
//! are in points with the origin at the bottom-left of the page.

use serde::{Deserialize, Serialize};

use crate::geometry::FieldGeometry;
use crate::report::{FieldQaReport, FieldReport};

/// Page styling, passed explicitly to [`paginate`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportStyle {
    pub page_width: f64,
    pub page_height: f64,
    pub margin_left: f64,
    pub margin_right: f64,
    pub top_margin: f64,
    /// Distance from the page top to the first section on page 1
    pub section_start: f64,
    pub bottom_margin: f64,
    pub line_height: f64,
    pub verdict_x: f64,
    pub image_size: f64,
    pub image_gap: f64,
    pub field_block_height: f64,
    pub title: String,
    pub title_size: f64,
    pub heading_size: f64,
    pub body_size: f64,
    pub footer_size: f64,
    pub footer_text: String,
    pub footer_y: f64,
}

impl Default for ReportStyle {
    fn default() -> Self {
        // US Letter
        Self {
            page_width: 612.0,
            page_height: 792.0,
            margin_left: 60.0,
            margin_right: 60.0,
            top_margin: 60.0,
            section_start: 120.0,
            bottom_margin: 60.0,
            line_height: 20.0,
            verdict_x: 300.0,
            image_size: 200.0,
            image_gap: 10.0,
            field_block_height: 220.0,
            title: "Field Size Test Report".to_string(),
            title_size: 20.0,
            heading_size: 14.0,
            body_size: 12.0,
            footer_size: 10.0,
            footer_text: "Generated by fieldqa - Field Size Tests".to_string(),
            footer_y: 40.0,
        }
    }
}

impl ReportStyle {
    /// Tallest block the layout ever keeps together: heading, two lines, diagram.
    fn largest_block(&self) -> f64 {
        3.0 * self.line_height + self.field_block_height
    }

    pub fn validate(&self) -> Result<(), &'static str> {
        let dims = [
            self.page_width,
            self.page_height,
            self.line_height,
            self.image_size,
            self.field_block_height,
            self.title_size,
            self.heading_size,
            self.body_size,
            self.footer_size,
        ];
        if dims.iter().any(|d| !d.is_finite() || *d <= 0.0) {
            return Err("Page dimensions, sizes and line height must be positive");
        }
        let margins = [
            self.margin_left,
            self.margin_right,
            self.top_margin,
            self.section_start,
            self.bottom_margin,
            self.image_gap,
            self.footer_y,
        ];
        if margins.iter().any(|m| !m.is_finite() || *m < 0.0) {
            return Err("Margins and offsets must not be negative");
        }
        if self.image_size + self.image_gap > self.field_block_height {
            return Err("Field block must fit the diagram");
        }
        if self.margin_left + self.image_size > self.page_width - self.margin_right {
            return Err("Diagram does not fit between the page margins");
        }
        if self.footer_y >= self.bottom_margin {
            return Err("Footer must sit inside the bottom margin");
        }
        let usable = self.page_height - self.section_start.max(self.top_margin) - self.bottom_margin;
        if usable < self.largest_block() {
            return Err("Page too short for a single field block");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextColor {
    Black,
    DarkBlue,
    Green,
    Red,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Element {
    Text {
        x: f64,
        y: f64,
        size: f64,
        bold: bool,
        color: TextColor,
        text: String,
    },
    Rule {
        x1: f64,
        x2: f64,
        y: f64,
    },
    Image {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        filename: String,
    },
}

impl Element {
    /// Lowest y the element occupies
    pub fn bottom(&self) -> f64 {
        match self {
            Element::Text { y, .. } | Element::Rule { y, .. } | Element::Image { y, .. } => *y,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub number: u32,
    pub elements: Vec<Element>,
}

pub fn verdict_text(field: &FieldReport) -> String {
    if field.result.overall_pass {
        "Within tolerance (±2 mm)".to_string()
    } else {
        format!(
            "Out of tolerance (±2 mm): {}",
            field.result.failed_axes().join(", ")
        )
    }
}

fn verdict_color(field: &FieldReport) -> TextColor {
    if field.result.overall_pass {
        TextColor::Green
    } else {
        TextColor::Red
    }
}

fn edges_text(prefix: &str, geometry: &FieldGeometry) -> String {
    match *geometry {
        FieldGeometry::Asymmetric { x1, x2, y1, y2 } => format!(
            "{}: X1={}, X2={}, Y1={}, Y2={} cm",
            prefix, x1, x2, y1, y2
        ),
        FieldGeometry::Symmetric { x, y } => format!("{}: X = {} cm, Y = {} cm", prefix, x, y),
    }
}

/// Places elements top-down and opens a new page when a block would
/// cross the bottom margin.
struct Pager<'a> {
    style: &'a ReportStyle,
    pages: Vec<Page>,
    y: f64,
}

impl<'a> Pager<'a> {
    fn new(style: &'a ReportStyle) -> Self {
        Self {
            style,
            pages: vec![Page { number: 1, elements: vec![] }],
            y: style.page_height - style.section_start,
        }
    }

    fn push(&mut self, element: Element) {
        if let Some(page) = self.pages.last_mut() {
            page.elements.push(element);
        }
    }

    fn ensure(&mut self, block_height: f64) {
        if self.y - block_height < self.style.bottom_margin {
            let number = self.pages.len() as u32 + 1;
            self.pages.push(Page { number, elements: vec![] });
            self.y = self.style.page_height - self.style.top_margin;
        }
    }

    fn text(&mut self, x: f64, size: f64, bold: bool, color: TextColor, text: String) {
        let y = self.y;
        self.push(Element::Text { x, y, size, bold, color, text });
    }

    fn heading(&mut self, text: &str) {
        let (x, size) = (self.style.margin_left, self.style.heading_size);
        self.text(x, size, true, TextColor::Black, text.to_string());
        self.y -= self.style.line_height;
    }

    fn body(&mut self, text: String) {
        let (x, size) = (self.style.margin_left, self.style.body_size);
        self.text(x, size, false, TextColor::Black, text);
    }

    /// Verdict on the current line, then the diagram below it.
    fn verdict_and_diagram(&mut self, field: &FieldReport) {
        let (x, size) = (self.style.verdict_x, self.style.body_size);
        self.text(x, size, false, verdict_color(field), verdict_text(field));

        let image_y = self.y - self.style.image_gap - self.style.image_size;
        self.push(Element::Image {
            x: self.style.margin_left,
            y: image_y,
            width: self.style.image_size,
            height: self.style.image_size,
            filename: field.diagram.filename.clone(),
        });
        self.y -= self.style.field_block_height;
    }

    fn finish(mut self) -> Vec<Page> {
        let total = self.pages.len();
        let style = self.style;
        for page in &mut self.pages {
            page.elements.push(Element::Text {
                x: style.margin_left,
                y: style.footer_y,
                size: style.footer_size,
                bold: false,
                color: TextColor::Black,
                text: style.footer_text.clone(),
            });
            page.elements.push(Element::Text {
                x: style.page_width - style.margin_right - 40.0,
                y: style.footer_y,
                size: style.footer_size,
                bold: false,
                color: TextColor::Black,
                text: format!("Page {} of {}", page.number, total),
            });
        }
        self.pages
    }
}

/// Lays out `report` on pages. Fails when `style` cannot fit a field block.
pub fn paginate(report: &FieldQaReport, style: &ReportStyle) -> Result<Vec<Page>, &'static str> {
    style.validate()?;
    let mut pager = Pager::new(style);
    let top = style.page_height;

    pager.push(Element::Text {
        x: style.margin_left,
        y: top - 50.0,
        size: style.title_size,
        bold: true,
        color: TextColor::DarkBlue,
        text: style.title.clone(),
    });
    pager.push(Element::Text {
        x: style.margin_left,
        y: top - 70.0,
        size: style.body_size,
        bold: false,
        color: TextColor::Black,
        text: format!(
            "Generated at: {}",
            report.created_at.format("%d/%m/%Y %H:%M:%S UTC")
        ),
    });
    pager.push(Element::Rule {
        x1: style.margin_left,
        x2: style.page_width - style.margin_right,
        y: top - 80.0,
    });

    let (symmetric, asymmetric): (Vec<&FieldReport>, Vec<&FieldReport>) = report
        .fields
        .iter()
        .partition(|f| matches!(f.expected, FieldGeometry::Symmetric { .. }));

    for (i, field) in symmetric.iter().enumerate() {
        if i == 0 {
            // keep the heading with the first field
            pager.ensure(style.line_height + style.field_block_height);
            pager.heading("Symmetric Tests");
        } else {
            pager.ensure(style.field_block_height);
        }
        let line = match field.measured {
            FieldGeometry::Symmetric { x, y } => {
                format!("Field {}: X = {} cm, Y = {} cm", field.label, x, y)
            }
            FieldGeometry::Asymmetric { .. } => format!("Field {}", field.label),
        };
        pager.body(line);
        pager.verdict_and_diagram(field);
    }

    for (i, field) in asymmetric.iter().enumerate() {
        if i == 0 {
            pager.ensure(style.largest_block());
            pager.heading("Asymmetric Tests");
        } else {
            pager.ensure(2.0 * style.line_height + style.field_block_height);
        }
        pager.body(edges_text("Expected", &field.expected));
        pager.y -= style.line_height;
        pager.body(edges_text("Measured", &field.measured));
        pager.verdict_and_diagram(field);
    }

    Ok(pager.finish())
}

/// Plain-text rendering of a page plan, one output line per text row.
pub fn render_text(pages: &[Page]) -> String {
    let mut out = String::new();
    for page in pages {
        out.push_str(&format!("=== Page {} ===\n", page.number));

        let mut rows: Vec<(f64, f64, String)> = page
            .elements
            .iter()
            .map(|e| match e {
                Element::Text { x, y, text, .. } => (*y, *x, text.clone()),
                Element::Rule { x1, y, .. } => (*y, *x1, "-".repeat(60)),
                Element::Image { x, y, filename, .. } => (*y, *x, format!("[diagram: {}]", filename)),
            })
            .collect();
        rows.sort_by(|a, b| b.0.total_cmp(&a.0).then(a.1.total_cmp(&b.1)));

        let mut current: Option<f64> = None;
        for (y, _, text) in rows {
            if current == Some(y) {
                out.push_str("  ");
            } else {
                if current.is_some() {
                    out.push('\n');
                }
                current = Some(y);
            }
            out.push_str(&text);
        }
        out.push_str("\n\n");
    }
    out
}
