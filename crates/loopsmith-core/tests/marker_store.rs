use loopsmith_core::{
    EngineError, Grid, MarkerStore, Notice, ProjectState,
    fixtures::demo_engine,
    model::{BAR_TRACKER_CATEGORY, DEFAULT_MARKER_CATEGORY, REGION_COLORS},
};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    AddMarker(f64),
    AddPosition(usize, f64),
    RemovePosition(usize, f64),
    Retime(usize, f64),
    Remove(usize),
    Tracker(f64),
}

fn op() -> impl Strategy<Value = Op> {
    let time = 0.0f64..8.0;
    prop_oneof![
        time.clone().prop_map(Op::AddMarker),
        (any::<usize>(), time.clone()).prop_map(|(index, time)| Op::AddPosition(index, time)),
        (any::<usize>(), time.clone()).prop_map(|(index, time)| Op::RemovePosition(index, time)),
        (any::<usize>(), time.clone()).prop_map(|(index, time)| Op::Retime(index, time)),
        any::<usize>().prop_map(Op::Remove),
        time.prop_map(Op::Tracker),
    ]
}

#[test]
fn duplicate_position_is_a_notice_not_an_error() {
    let mut store = MarkerStore::new();
    let marker = store.add_marker(1.0, None, None).expect("marker should add");

    let notice = store.add_position(marker.id, 1.0).expect("duplicate should not fail");
    assert_eq!(notice, Some(Notice::DuplicatePosition { marker_id: marker.id, time: 1.0 }));
    assert_eq!(store.marker(marker.id).expect("marker exists").positions(), &[1.0]);
}

#[test]
fn last_position_cannot_be_removed() {
    let mut store = MarkerStore::new();
    let marker = store.add_marker(2.0, None, None).expect("marker should add");
    assert!(!store.remove_position(marker.id, 2.0).expect("marker exists"));

    store.add_position(marker.id, 0.5).expect("position should add");
    assert!(store.remove_position(marker.id, 2.0).expect("marker exists"));
    let marker = store.marker(marker.id).expect("marker exists");
    assert_eq!(marker.positions(), &[0.5]);
    assert!((marker.time() - 0.5).abs() < f64::EPSILON);
}

#[test]
fn reserved_category_is_rejected_everywhere() {
    let mut store = MarkerStore::new();
    assert!(matches!(
        store.add_marker(0.0, None, Some(BAR_TRACKER_CATEGORY.to_string())),
        Err(EngineError::ReservedCategory(_))
    ));
    assert!(matches!(
        store.add_custom_category(BAR_TRACKER_CATEGORY),
        Err(EngineError::ReservedCategory(_))
    ));

    let marker = store.add_marker(0.0, None, None).expect("marker should add");
    assert!(matches!(
        store.recategorize(marker.id, BAR_TRACKER_CATEGORY),
        Err(EngineError::ReservedCategory(_))
    ));
}

#[test]
fn removing_custom_category_reassigns_markers() {
    let mut store = MarkerStore::new();
    assert!(store.add_custom_category("Bass").expect("category should add"));
    assert!(!store.add_custom_category("Bass").expect("repeat add is not an error"));
    let marker = store
        .add_marker(1.0, Some("Drop".to_string()), Some("Bass".to_string()))
        .expect("marker should add");
    assert!(store.categories().contains(&"Bass".to_string()));

    assert_eq!(store.remove_custom_category("Bass"), 1);
    assert_eq!(
        store.marker(marker.id).expect("marker exists").category,
        DEFAULT_MARKER_CATEGORY
    );
}

#[test]
fn region_colors_cycle_and_selection_toggles() {
    let mut store = MarkerStore::new();
    let regions: Vec<_> = (0..REGION_COLORS.len() + 1)
        .map(|index| {
            let start = index as f64;
            store.add_region(start, start + 0.5, None).expect("region should add")
        })
        .collect();
    assert_eq!(regions[0].color, regions[REGION_COLORS.len()].color);
    assert_ne!(regions[0].color, regions[1].color);

    assert!(store.toggle_region_selection(regions[2].id).expect("region exists"));
    assert_eq!(store.selected_regions().count(), 1);
    store.clear_region_selection();
    assert_eq!(store.selected_regions().count(), 0);

    assert!(matches!(store.add_region(2.0, 1.0, None), Err(EngineError::InvalidRange { .. })));
}

#[test]
fn engine_region_from_selection() {
    let mut engine = demo_engine().expect("demo engine should build");
    assert!(matches!(engine.add_region_from_selection(None), Err(EngineError::NoSelection)));

    engine.set_selection(0.5, 1.5).expect("selection should be valid");
    let region = engine
        .add_region_from_selection(Some("Fill".to_string()))
        .expect("region should add");
    assert_eq!(region.name, "Fill");
    assert!((region.duration() - 1.0).abs() < 1e-9);
}

#[test]
fn project_state_round_trips_through_json() {
    let mut engine = demo_engine().expect("demo engine should build");
    engine.add_marker(1.0, None, Some("Snare".to_string())).expect("marker should add");
    engine.set_grid(140.0, 8).expect("grid should be valid");

    let json = serde_json::to_string(&engine.project_state()).expect("state should serialize");
    let mut restored = demo_engine().expect("demo engine should build");
    restored
        .restore_project_state(serde_json::from_str(&json).expect("state should deserialize"))
        .expect("state should restore");

    assert_eq!(restored.project_state(), engine.project_state());
}

#[test]
fn corrupted_project_state_is_refused() {
    let mut engine = demo_engine().expect("demo engine should build");
    engine.add_marker(1.0, None, None).expect("marker should add");
    engine.add_region(0.5, 1.5, None).expect("region should add");
    let clean = serde_json::to_value(engine.project_state()).expect("state should serialize");

    let mut emptied = clean.clone();
    emptied["markers"]["markers"][0]["positions"] = serde_json::json!([]);
    assert!(serde_json::from_value::<ProjectState>(emptied).is_err());

    let mut target = demo_engine().expect("demo engine should build");
    let before = target.project_state();

    let mut reserved = clean.clone();
    reserved["markers"]["markers"][0]["category"] = serde_json::json!(BAR_TRACKER_CATEGORY);
    let state = serde_json::from_value(reserved).expect("reserved category still parses");
    assert!(matches!(
        target.restore_project_state(state),
        Err(EngineError::ReservedCategory(_))
    ));

    let mut inverted = clean;
    inverted["markers"]["regions"][0]["end_time"] = serde_json::json!(0.25);
    let state = serde_json::from_value(inverted).expect("inverted region still parses");
    assert!(matches!(
        target.restore_project_state(state),
        Err(EngineError::InvalidRange { .. })
    ));

    assert_eq!(target.project_state(), before);
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 96,
        .. ProptestConfig::default()
    })]

    #[test]
    fn store_invariants_hold_under_random_edits(ops in prop::collection::vec(op(), 1..40)) {
        let grid = Grid::new(120.0, 16).expect("grid should be valid");
        let mut store = MarkerStore::new();

        for op in ops {
            let ids: Vec<_> = store.markers().iter().map(|marker| marker.id).collect();
            let pick = |index: usize| ids.get(index % ids.len().max(1)).copied();
            match op {
                Op::AddMarker(time) => {
                    store.add_marker(time, None, None).expect("valid time should add");
                }
                Op::AddPosition(index, time) => {
                    if let Some(id) = pick(index) {
                        store.add_position(id, time).expect("marker exists");
                    }
                }
                Op::RemovePosition(index, time) => {
                    if let Some(id) = pick(index) {
                        store.remove_position(id, time).expect("marker exists");
                    }
                }
                Op::Retime(index, time) => {
                    if let Some(id) = pick(index) {
                        store.retime_marker(id, time).expect("marker exists");
                    }
                }
                Op::Remove(index) => {
                    if let Some(id) = pick(index) {
                        store.remove_marker(id).expect("marker exists");
                    }
                }
                Op::Tracker(playhead) => {
                    store.update_bar_tracker(playhead, 8.0, &grid);
                }
            }

            for marker in store.markers() {
                let positions = marker.positions();
                prop_assert!(!positions.is_empty());
                prop_assert!(positions.windows(2).all(|pair| pair[0] < pair[1]));
                prop_assert!((marker.time() - positions[0]).abs() < f64::EPSILON);
                prop_assert_ne!(marker.category.as_str(), BAR_TRACKER_CATEGORY);
            }
            prop_assert!(store.validate().is_ok());
            if let Some(tracker) = store.bar_tracker() {
                prop_assert_eq!(tracker.category.as_str(), BAR_TRACKER_CATEGORY);
                prop_assert!(tracker.name.starts_with("Bar "));
            }
        }
    }
}
