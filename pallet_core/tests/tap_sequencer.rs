use pallet_core::tap::Expiry;
use pallet_core::{TapCfg, TapOutcome, TapSequencer, TapState};
use rstest::rstest;

fn seq() -> TapSequencer {
    TapSequencer::new(TapCfg::default())
}

#[rstest]
#[case::first_tap_ever(None, 10_000, TapState::LoadReady)]
#[case::long_after_previous(Some(0), 10_000, TapState::LoadReady)]
#[case::right_after_previous(Some(8_000), 10_000, TapState::UnloadReady)]
#[case::at_window_edge(Some(7_000), 10_000, TapState::LoadReady)]
#[case::just_inside_window(Some(7_001), 10_000, TapState::UnloadReady)]
fn idle_tap_opens_by_time_since_previous_tap(
    #[case] previous: Option<u64>,
    #[case] now: u64,
    #[case] expected: TapState,
) {
    let mut s = seq();
    if let Some(at) = previous {
        // a cancelled session leaves the machine idle with a recent tap
        s.on_tap("11", "Other", at.saturating_sub(1_000), 0);
        assert!(matches!(
            s.on_tap("22", "Another", at, 0),
            TapOutcome::Cancelled { .. }
        ));
        assert_eq!(s.state(), TapState::Idle);
    }
    s.on_tap("AA", "Lorry", now, 2);
    assert_eq!(s.state(), expected);
    assert_eq!(s.session().start_unit_count, 2);
}

#[test]
fn different_tag_cancels_either_ready_state() {
    for double in [false, true] {
        let mut s = seq();
        if double {
            s.on_tap("CC", "Lorry 3", 0, 4);
            s.on_tap("AA", "Lorry 1", 500, 4);
            s.on_tap("AA", "Lorry 1", 1_000, 4);
            assert_eq!(s.state(), TapState::UnloadReady);
        } else {
            s.on_tap("AA", "Lorry 1", 0, 4);
        }
        let out = s.on_tap("BB", "Lorry 2", 2_000, 4);
        assert_eq!(
            out,
            TapOutcome::Cancelled {
                pending: "AA".into(),
                entity: Some("Lorry 1".into())
            }
        );
        assert_eq!(s.state(), TapState::Idle);
    }
}

#[test]
fn taps_during_dwell_are_ignored_but_arm_the_double_tap() {
    let mut s = seq();
    s.on_tap("AA", "Lorry", 0, 3);
    s.on_tap("AA", "Lorry", 5_000, 1);
    assert_eq!(s.on_tap("AA", "Lorry", 7_000, 1), TapOutcome::Ignored);
    assert_eq!(s.tick(8_000), Some(Expiry::DwellElapsed));
    // previous tap at 7000 is still inside the window
    assert_eq!(
        s.on_tap("AA", "Lorry", 9_000, 1),
        TapOutcome::UnloadStarted { double_tap: true }
    );
}

#[test]
fn ready_session_expires() {
    let mut s = seq();
    s.on_tap("AA", "Lorry", 1_000, 0);
    assert_eq!(s.tick(300_999), None);
    match s.tick(301_000) {
        Some(Expiry::ReadyExpired { state, tag, .. }) => {
            assert_eq!(state, TapState::LoadReady);
            assert_eq!(tag, "AA");
        }
        other => panic!("expected expiry, got {other:?}"),
    }
    assert_eq!(s.state(), TapState::Idle);
}

#[test]
fn load_delta_can_be_negative_when_items_were_added() {
    let mut s = seq();
    s.on_tap("AA", "Lorry", 0, 1);
    assert_eq!(
        s.on_tap("AA", "Lorry", 10_000, 3),
        TapOutcome::LoadComplete { delta: -2 }
    );
}
