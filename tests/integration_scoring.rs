use quill::config::Config;
use quill::edm::ExpertDistributionModel;
use quill::session::Comparison;
use quill::{Aligner, CoverageScorer, SamplePoint, Stroke, Trace};

fn trace(strokes: &[&[(f64, f64)]]) -> Trace {
    Trace::new(
        strokes
            .iter()
            .map(|s| Stroke::from_coords(s).unwrap())
            .collect(),
    )
}

// Student draws the first half of the expert's line: half the reference is covered.
#[test]
fn calibration_half_line_scores_fifty() {
    let student = trace(&[&[(0.0, 2.0), (10.0, 2.0)]]);
    let expert = trace(&[&[(0.0, 2.0), (20.0, 2.0)]]);
    let mut scorer = CoverageScorer::new(2.0);
    assert_eq!(scorer.accuracy(&student, &expert, 1, 0).unwrap(), 50);
    assert_eq!(scorer.final_accuracy(&student, &expert).unwrap(), 50);
}

#[test]
fn sectioned_scoring_matches_single_pass_at_the_end() {
    let coords: Vec<(f64, f64)> = (0..40).map(|i| (i as f64 * 3.0, (i as f64 / 4.0).sin() * 6.0)).collect();
    let expert = trace(&[&coords]);
    let wobbly: Vec<(f64, f64)> = coords.iter().map(|&(x, y)| (x + 1.0, y - 1.5)).collect();
    let student = trace(&[&wobbly]);

    let mut single = CoverageScorer::new(2.0);
    let whole = single.final_accuracy(&student, &expert).unwrap();

    let sections = student.split(5);
    let mut sectioned = CoverageScorer::new(2.0).parallel(true);
    let mut last = 0;
    for (i, s) in sections.iter().enumerate() {
        last = sectioned.accuracy(s, &expert, sections.len(), i).unwrap();
    }
    assert_eq!(last, whole);
    assert_eq!(sectioned.accuracy(&student, &expert, 5, 7).unwrap(), whole);
}

#[test]
fn comparison_report_for_offset_attempt() {
    let expert: Vec<(f64, f64)> = (0..30).map(|i| (i as f64 * 4.0, 0.0)).collect();
    let student: Vec<(f64, f64)> = (0..30).map(|i| (i as f64 * 4.0, 3.0)).collect();
    let cmp = Comparison::new(trace(&[&expert]), Config::default());
    let report = cmp.report(&trace(&[&student])).unwrap();

    assert_eq!(report.accuracy, 100);
    let dev = report.deviation.unwrap();
    assert!((dev.mean - 3.0).abs() < 1e-9);
    assert!((report.dtw_cost.unwrap() - 90.0).abs() < 1e-9);
    assert_eq!(report.expert_points, 30);
}

#[test]
fn model_transfer_over_several_experts() {
    let expert = |dy: f64, p: f64| {
        Trace::new(vec![Stroke::new(
            (0..12)
                .map(|i| SamplePoint::new(i as f64 * 5.0, dy).with_pressure(p))
                .collect(),
        )
        .unwrap()])
    };
    let model = ExpertDistributionModel::build(
        &expert(0.0, 0.5),
        &[expert(1.0, 0.3), expert(-1.0, 0.7)],
        Aligner::with_window(3),
    )
    .unwrap();
    assert_eq!(model.expert_count(), 3);

    let student = trace(&[&[(0.0, 0.0), (30.0, 0.5), (55.0, 0.0)]]);
    let pressure = model.transfer(&student, "pressure").unwrap();
    for stat in pressure {
        let stat = stat.unwrap();
        assert!((stat.mean - 0.5).abs() < 1e-9);
        assert_eq!(stat.samples, 3);
    }
    assert!(model.transfer(&student, "curvature").is_err());
}
