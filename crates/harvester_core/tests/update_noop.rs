use std::time::Instant;

use harvester_core::{update, HarvestLimits, HarvestState, Msg, Phase};

#[test]
fn tick_before_seeding_is_noop() {
    let state = HarvestState::new(HarvestLimits::default());
    let (next, effects) = update(state, Msg::Tick { at: Instant::now() });

    assert_eq!(next.phase(), &Phase::Seeding);
    assert_eq!(next.steps(), 0);
    assert!(effects.is_empty());
}
