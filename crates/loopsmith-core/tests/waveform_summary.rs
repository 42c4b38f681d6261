use loopsmith_core::{
    ReducerConfig, SampleBuffer,
    fixtures::{demo_engine, ramp},
    waveform::{default_point_count, reduce, reduce_to},
};

#[test]
fn long_buffer_reduces_to_default_point_count() {
    let samples: Vec<f32> = (0..1_000_000).map(|index| ((index % 441) as f32 / 441.0) - 0.5).collect();
    let buffer = SampleBuffer::from_mono(samples, 44_100).expect("buffer should build");
    assert!((buffer.duration_seconds() - 22.675).abs() < 1e-3);
    assert_eq!(default_point_count(buffer.duration_seconds()), 2_000);

    let summary = reduce(&buffer);
    assert_eq!(summary.len(), 2_000);
    assert!(summary.points().windows(2).all(|pair| pair[0].x < pair[1].x));
    assert!(summary.iter().all(|point| point.y >= 0.0));
}

#[test]
fn long_durations_scale_past_minimum() {
    assert_eq!(default_point_count(100.0), 5_000);
    assert_eq!(default_point_count(0.0), 2_000);
}

#[test]
fn tiny_buffer_yields_one_point_per_frame() {
    let buffer = ramp(10, 100).expect("ramp should build");
    let summary = reduce(&buffer);
    assert_eq!(summary.len(), 10);
}

#[test]
fn empty_buffer_yields_empty_summary() {
    let buffer = SampleBuffer::silent(2, 0, 44_100).expect("empty buffer should build");
    assert!(reduce(&buffer).is_empty());
}

#[test]
fn silence_reduces_to_zero_amplitude() {
    let buffer = SampleBuffer::silent(1, 48_000, 48_000).expect("silent buffer should build");
    let summary = reduce_to(&buffer, 100, &ReducerConfig::default());
    assert_eq!(summary.len(), 100);
    assert!(summary.iter().all(|point| point.y == 0.0));
}

#[test]
fn reversing_the_engine_mirrors_its_summary() {
    let mut engine = demo_engine().expect("demo engine should build");
    let before = engine.summary().as_ref().clone();
    engine.reverse().expect("reverse should succeed");
    let after = engine.summary();

    assert_eq!(after.len(), before.len());
    let duration = before.duration_seconds();
    for (mirrored, original) in after.iter().zip(before.iter().rev()) {
        assert!((mirrored.x - (duration - original.x)).abs() < 1e-9);
        assert!((mirrored.y - original.y).abs() < f32::EPSILON);
    }
}

#[test]
fn window_returns_points_in_range() {
    let engine = demo_engine().expect("demo engine should build");
    let window = engine.summary().window(1.0, 2.0);
    assert!(!window.is_empty());
    assert!(window.iter().all(|point| (1.0..2.0).contains(&point.x)));
}
