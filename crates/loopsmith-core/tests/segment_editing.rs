use std::sync::Arc;

use loopsmith_core::{
    EditKind, Engine, EngineConfig, EngineError, SampleBuffer,
    editor::{copy_range, delete_range, paste_at},
    fixtures::ramp,
};
use proptest::prelude::*;

fn ten_second_engine() -> Engine {
    let buffer = ramp(10_000, 1_000).expect("ramp should build");
    Engine::with_seed(buffer, EngineConfig::default(), 9).expect("engine should build")
}

#[test]
fn delete_then_paste_restores_duration() {
    let mut engine = ten_second_engine();
    engine.delete(2.0, 3.0).expect("delete should succeed");
    assert!((engine.duration() - 9.0).abs() < 1e-9);

    engine.copy(0.0, 1.0).expect("copy should succeed");
    engine.paste(9.0).expect("paste at the end should succeed");
    assert!((engine.duration() - 10.0).abs() < 1e-9);
    assert_eq!(engine.buffer().frames(), 10_000);
}

#[test]
fn cut_and_paste_back_restores_samples() {
    let original = ramp(1_000, 100).expect("ramp should build");
    let clip = copy_range(&original, 2.0, 4.0).expect("copy should succeed");
    let removed = delete_range(&original, 2.0, 4.0).expect("delete should succeed");
    let restored = paste_at(&removed, 2.0, &clip).expect("paste should succeed");
    assert_eq!(restored, original);
}

#[test]
fn undo_and_redo_walk_the_history() {
    let mut engine = ten_second_engine();
    let original = Arc::clone(engine.buffer());

    engine.cut(1.0, 2.0).expect("cut should succeed");
    engine.paste(0.0).expect("paste should succeed");
    engine.reverse().expect("reverse should succeed");
    let edited = Arc::clone(engine.buffer());

    assert_eq!(engine.undo(), Some(EditKind::Reverse));
    assert_eq!(engine.undo(), Some(EditKind::Paste));
    assert_eq!(engine.undo(), Some(EditKind::Cut));
    assert_eq!(engine.undo(), None);
    assert_eq!(engine.buffer().as_ref(), original.as_ref());

    assert_eq!(engine.redo(), Some(EditKind::Cut));
    assert_eq!(engine.redo(), Some(EditKind::Paste));
    assert_eq!(engine.redo(), Some(EditKind::Reverse));
    assert_eq!(engine.redo(), None);
    assert_eq!(engine.buffer().as_ref(), edited.as_ref());
}

#[test]
fn copy_is_journaled_but_not_undone() {
    let mut engine = ten_second_engine();
    engine.delete(0.0, 1.0).expect("delete should succeed");
    engine.copy(0.0, 1.0).expect("copy should succeed");

    let kinds: Vec<_> = engine.history().entries().iter().map(|entry| entry.kind).collect();
    assert_eq!(kinds, vec![EditKind::Delete, EditKind::Copy]);
    assert_eq!(engine.undo(), Some(EditKind::Delete));
    assert!((engine.duration() - 10.0).abs() < 1e-9);
}

#[test]
fn new_edit_after_undo_drops_redo_tail() {
    let mut engine = ten_second_engine();
    engine.delete(0.0, 1.0).expect("delete should succeed");
    engine.undo().expect("undo should succeed");
    engine.delete(5.0, 6.0).expect("delete should succeed");

    assert!(!engine.history().can_redo());
    assert_eq!(engine.history().entries().len(), 1);
}

#[test]
fn selection_commands_require_a_selection() {
    let mut engine = ten_second_engine();
    assert!(matches!(engine.delete_selection(), Err(EngineError::NoSelection)));
    assert!(matches!(engine.reverse_selection(), Err(EngineError::NoSelection)));

    engine.set_selection(1.0, 2.0).expect("selection should be valid");
    let before = engine.buffer().channel(0).expect("mono")[1_000];
    engine.reverse_selection().expect("reverse selection should succeed");
    let channel = engine.buffer().channel(0).expect("mono");
    assert!((channel[1_999] - before).abs() < f32::EPSILON);
    assert!((channel[0] - 0.0).abs() < f32::EPSILON);
}

#[test]
fn out_of_range_edits_fail_cleanly() {
    let mut engine = ten_second_engine();
    assert!(matches!(engine.delete(9.0, 11.0), Err(EngineError::InvalidRange { .. })));
    assert!(matches!(engine.copy(-1.0, 1.0), Err(EngineError::InvalidRange { .. })));
    assert!(engine.clipboard().is_none());
    assert!(engine.history().entries().is_empty());
}

#[test]
fn paste_rejects_sample_rate_mismatch() {
    let buffer = ramp(100, 100).expect("ramp should build");
    let other = ramp(100, 200).expect("ramp should build");
    let clip = copy_range(&other, 0.0, 0.1).expect("copy should succeed");
    assert!(matches!(
        paste_at(&buffer, 0.0, &clip),
        Err(EngineError::SampleRateMismatch { buffer: 100, clip: 200 })
    ));
}

#[test]
fn mono_clip_fills_every_stereo_channel() {
    let stereo = SampleBuffer::silent(2, 100, 100).expect("silent stereo should build");
    let mono = ramp(100, 100).expect("ramp should build");
    let clip = copy_range(&mono, 0.5, 0.6).expect("copy should succeed");

    let pasted = paste_at(&stereo, 0.0, &clip).expect("paste should succeed");
    assert_eq!(pasted.frames(), 110);
    assert_eq!(pasted.channel(0), pasted.channel(1));
}

#[test]
fn selection_can_reach_the_end_of_off_grid_audio() {
    let buffer = ramp(3_330, 1_000).expect("ramp should build");
    let mut engine = Engine::with_seed(buffer, EngineConfig::default(), 9).expect("engine should build");
    assert!(engine.snap_enabled());

    let duration = engine.duration();
    let selection = engine
        .set_selection(3.0, duration)
        .expect("selection up to the end should be valid");
    assert!((selection.start - 3.0).abs() < 1e-9);
    assert!((selection.end - duration).abs() < 1e-9);
    engine.reverse_selection().expect("reverse should succeed");
}

#[test]
fn explicit_reverse_range_ignores_snapping() {
    let mut engine = ten_second_engine();
    assert!(engine.snap_enabled());

    engine.reverse_range(1.03, 1.07).expect("reverse should succeed");
    let channel = engine.buffer().channel(0).expect("mono channel");
    let original = ramp(10_000, 1_000).expect("ramp should build");
    let before = original.channel(0).expect("mono channel");

    assert_eq!(channel[1_029], before[1_029]);
    assert_eq!(channel[1_030], before[1_069]);
    assert_eq!(channel[1_069], before[1_030]);
    assert_eq!(channel[1_070], before[1_070]);
    assert!(engine.selection().is_none());
}

#[test]
fn reversing_an_empty_buffer_fails() {
    let buffer = SampleBuffer::silent(1, 0, 44_100).expect("empty buffer should build");
    let mut engine = Engine::new(buffer, EngineConfig::default()).expect("engine should build");
    assert!(matches!(engine.reverse(), Err(EngineError::EmptyBuffer)));
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 64,
        .. ProptestConfig::default()
    })]

    #[test]
    fn delete_then_paste_is_identity(start in 0usize..900, len in 1usize..100) {
        let original = ramp(1_000, 1_000).expect("ramp should build");
        let start_s = start as f64 / 1_000.0;
        let end_s = (start + len) as f64 / 1_000.0;

        let clip = copy_range(&original, start_s, end_s).expect("copy should succeed");
        let removed = delete_range(&original, start_s, end_s).expect("delete should succeed");
        prop_assert_eq!(removed.frames(), 1_000 - len);
        let restored = paste_at(&removed, start_s, &clip).expect("paste should succeed");
        prop_assert_eq!(restored, original);
    }
}
