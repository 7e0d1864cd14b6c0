//! QA Invariant Tests
//!
//! These tests verify the tolerance and diagram guarantees a report relies on.

use fieldqa_core::{
    FieldDiagramRenderer, FieldError, FieldGeometry, ReportGenerator, ReportRequest,
    ToleranceEvaluator,
    report::SymmetricInput,
};
use proptest::prelude::*;

fn measured(x: f64, y: f64) -> FieldGeometry {
    FieldGeometry::Symmetric { x, y }
}

#[test]
fn invariant_boundary_is_inclusive() {
    let eval = ToleranceEvaluator::new();

    let at_limit = eval.evaluate(&FieldGeometry::square(10.0), &measured(10.2, 10.2)).unwrap();
    assert!(at_limit.overall_pass);

    let just_over = eval.evaluate(&FieldGeometry::square(10.0), &measured(10.2001, 10.0)).unwrap();
    assert_eq!(just_over.passed("x"), Some(false));
    assert!(!just_over.overall_pass);
}

#[test]
fn invariant_asymmetric_edge_failure() {
    let result = ToleranceEvaluator::new()
        .evaluate(
            &FieldGeometry::asymmetric(0.0, 10.0, 0.0, 10.0),
            &FieldGeometry::asymmetric(0.3, 10.0, 0.0, 10.0),
        )
        .unwrap();

    assert_eq!(result.passed("x1"), Some(false));
    assert_eq!(result.passed("x2"), Some(true));
    assert_eq!(result.passed("y1"), Some(true));
    assert_eq!(result.passed("y2"), Some(true));
    assert!(!result.overall_pass);
}

#[test]
fn invariant_all_standard_fields_at_nominal_pass() {
    let report = ReportGenerator::new()
        .generate(&ReportRequest {
            symmetric: [5.0, 10.0, 15.0, 20.0, 25.0]
                .iter()
                .map(|&size| SymmetricInput { size, x: size, y: size })
                .collect(),
            asymmetric: None,
        })
        .unwrap();

    assert_eq!(report.fields.len(), 5);
    assert!(report.all_within_tolerance);
    assert!(report.failures().is_empty());
}

#[test]
fn invariant_single_axis_out_of_tolerance() {
    let report = ReportGenerator::new()
        .generate(&ReportRequest {
            symmetric: vec![SymmetricInput { size: 5.0, x: 5.5, y: 5.0 }],
            asymmetric: None,
        })
        .unwrap();

    let field = &report.fields[0];
    assert_eq!(field.result.passed("x"), Some(false));
    assert_eq!(field.result.passed("y"), Some(true));
    assert!(!field.result.overall_pass);
    assert_eq!(report.failures(), vec!["5x5 cm"]);
}

#[test]
fn invariant_diagram_reference_matches_measured_at_nominal() {
    let layout = FieldDiagramRenderer::new()
        .layout(&FieldGeometry::square(10.0), &measured(10.0, 10.0))
        .unwrap();

    assert_eq!(layout.reference, layout.measured);
    assert!(layout.envelope.strictly_contains(&layout.reference));
    assert!(layout.envelope.strictly_contains(&layout.measured));
}

#[test]
fn invariant_diagram_is_png_of_fixed_size() {
    let artifact = FieldDiagramRenderer::new()
        .render(&FieldGeometry::square(10.0), &measured(10.1, 9.9))
        .unwrap();

    let img = image::load_from_memory(&artifact.png).unwrap().to_rgb8();
    assert_eq!((img.width(), img.height()), (artifact.width, artifact.height));
    assert!(img.pixels().any(|p| p.0 == [0, 0, 255]));
    assert!(img.pixels().any(|p| p.0 == [255, 0, 0]));
}

#[test]
fn invariant_render_is_idempotent() {
    let renderer = FieldDiagramRenderer::new();
    let expected = FieldGeometry::asymmetric(-3.0, 7.0, -2.0, 8.0);
    let actual = FieldGeometry::asymmetric(-3.1, 7.2, -2.0, 8.3);

    let a = renderer.render(&expected, &actual).unwrap();
    let b = renderer.render(&expected, &actual).unwrap();
    assert_eq!(a, b);
}

#[test]
fn invariant_mismatched_shapes_rejected() {
    let expected = FieldGeometry::square(10.0);
    let actual = FieldGeometry::asymmetric(0.0, 10.0, 0.0, 10.0);

    assert!(matches!(
        ToleranceEvaluator::new().evaluate(&expected, &actual),
        Err(FieldError::ShapeMismatch { .. })
    ));
    assert!(matches!(
        FieldDiagramRenderer::new().render(&expected, &actual),
        Err(FieldError::ShapeMismatch { .. })
    ));
}

#[test]
fn invariant_huge_measurement_renders() {
    let artifact = FieldDiagramRenderer::new()
        .render(&FieldGeometry::square(10.0), &measured(1e12, 10.0))
        .unwrap();

    let img = image::load_from_memory(&artifact.png).unwrap().to_rgb8();
    assert_eq!((img.width(), img.height()), (500, 500));
}

#[test]
fn invariant_oblong_nominal_rejected() {
    let oblong = measured(5.0, 10.0);
    assert!(matches!(
        ToleranceEvaluator::new().evaluate(&oblong, &oblong),
        Err(FieldError::InvalidGeometry(_))
    ));
}

#[test]
fn invariant_non_finite_rejected() {
    let result = ToleranceEvaluator::new().evaluate(&FieldGeometry::square(10.0), &measured(f64::NAN, 10.0));
    assert!(matches!(result, Err(FieldError::InvalidGeometry(_))));
}

proptest! {
    #[test]
    fn exact_measurement_always_passes(size in 0.1f64..40.0) {
        let result = ToleranceEvaluator::new()
            .evaluate(&FieldGeometry::square(size), &measured(size, size))
            .unwrap();
        prop_assert!(result.overall_pass);
    }

    #[test]
    fn deviation_beyond_tolerance_fails(
        size in 6.0f64..30.0,
        d in 0.2001f64..5.0,
        negative in any::<bool>(),
    ) {
        let d = if negative { -d } else { d };
        let result = ToleranceEvaluator::new()
            .evaluate(&FieldGeometry::square(size), &measured(size + d, size + d))
            .unwrap();
        prop_assert!(!result.overall_pass);
    }

    #[test]
    fn evaluate_is_idempotent(
        x1 in -20.0f64..0.0,
        w in 1.0f64..20.0,
        dx in -0.5f64..0.5,
    ) {
        let expected = FieldGeometry::asymmetric(x1, x1 + w, x1, x1 + w);
        let actual = FieldGeometry::asymmetric(x1 + dx, x1 + w, x1, x1 + w);
        let eval = ToleranceEvaluator::new();
        prop_assert_eq!(eval.evaluate(&expected, &actual).unwrap(), eval.evaluate(&expected, &actual).unwrap());
    }

    #[test]
    fn envelope_encloses_reference(size in 0.1f64..40.0) {
        let layout = FieldDiagramRenderer::new()
            .layout(&FieldGeometry::square(size), &measured(size, size))
            .unwrap();
        prop_assert!(layout.envelope.strictly_contains(&layout.reference));
        prop_assert!(layout.half_extent > layout.envelope.right());
    }
}
