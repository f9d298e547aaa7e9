use std::sync::Arc;
use std::thread;

use quill::config::Config;
use quill::feedback::{ratio, saturate, FeedbackService, Thresholds};
use quill::{Point, SamplePoint, Stroke, Trace, TraceIndex};

fn expert() -> Trace {
    let pts = (0..200)
        .map(|i| {
            let x = i as f64 * 2.0;
            SamplePoint::new(x, (x / 40.0).sin() * 30.0).with_pressure(0.6)
        })
        .collect();
    Trace::new(vec![Stroke::new(pts).unwrap()])
}

// Two renderers (e.g. UI thread and a background thread) share one index.
#[test]
fn feedback_threads_share_one_index() {
    let config = Config::default();
    let index = Arc::new(TraceIndex::from_config(expert(), &config).with_segment_size(25));
    let service = Arc::new(FeedbackService::new(Arc::clone(&index), &config));

    let student: Vec<SamplePoint> = (0..150)
        .map(|i| {
            let x = i as f64 * 2.5;
            SamplePoint::new(x, (x / 40.0).sin() * 30.0 + 4.0).with_pressure(0.55)
        })
        .collect();

    let workers: Vec<_> = (0..3)
        .map(|_| {
            let service = Arc::clone(&service);
            let batch = student.clone();
            thread::spawn(move || service.evaluate_batch(&batch))
        })
        .collect();
    let results: Vec<_> = workers.into_iter().map(|w| w.join().unwrap()).collect();

    assert!(results.windows(2).all(|w| w[0] == w[1]));
    let first = &results[0];
    assert!(first.iter().all(Option::is_some));
    for fb in first.iter().flatten() {
        assert!(fb.distance < 4.5);
        // inside the default 5px tolerance
        assert_eq!(fb.distance_ratio, 0.0);
        assert_eq!(fb.pressure_ratio, 0.0);
    }
}

#[test]
fn distance_ratio_grows_past_tolerance() {
    let service = FeedbackService::new(Arc::new(TraceIndex::new(expert())), &Config::default());
    let near = service.evaluate(&SamplePoint::new(100.0, (2.5f64).sin() * 30.0)).unwrap();
    let far = service
        .evaluate(&SamplePoint::new(200.0, (5.0f64).sin() * 30.0 + 40.0))
        .unwrap();
    assert_eq!(near.distance_ratio, 0.0);
    assert!(far.distance_ratio > 1.0);
    assert_eq!(saturate(far.distance_ratio), 1.0);
}

#[test]
fn out_of_range_sample_has_no_feedback() {
    let index = Arc::new(TraceIndex::new(expert()));
    let service = FeedbackService::new(Arc::clone(&index), &Config::default());
    assert!(service.evaluate(&SamplePoint::new(200.0, 500.0)).is_none());
    assert!(!index.closest_point(Point::new(200.0, 500.0)).is_in_range());
}

#[test]
fn ratio_boundary_is_continuous() {
    let t = Thresholds {
        low_start: 0.5,
        low_cutoff: 2.0,
        high_start: 1.5,
        high_cutoff: 4.0,
    };
    let expert = 10.0;
    assert_eq!(ratio(expert + t.high_start, expert, &t), 0.0);
    assert!(ratio(expert + t.high_start + 1e-9, expert, &t) > 0.0);
    assert!(ratio(expert + t.high_cutoff, expert, &t) >= 1.0);
    assert_eq!(ratio(expert - t.low_start, expert, &t), 0.0);
}

#[test]
fn tracing_a_sparse_expert_line_stays_in_range() {
    let expert = Trace::new(vec![Stroke::from_coords(&[(0.0, 10.0), (300.0, 10.0)]).unwrap()]);
    let service = FeedbackService::new(Arc::new(TraceIndex::new(expert)), &Config::default());
    let student: Vec<SamplePoint> = (0..=30).map(|i| SamplePoint::new(i as f64 * 10.0, 10.0)).collect();
    for fb in service.evaluate_batch(&student) {
        let fb = fb.unwrap();
        assert!(fb.distance < 1e-9);
        assert_eq!(fb.distance_ratio, 0.0);
    }
}
