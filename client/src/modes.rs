use leptos::prelude::*;

use crate::app::MapState;
use crate::draw;
use crate::hover;

/// The four interaction modes. Exactly one is active; Browse is the default
/// and the fallback owner of any click not claimed by another mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InteractionMode {
    #[default]
    Browse,
    Measure,
    Draw,
    BulkSelect,
}

impl InteractionMode {
    pub const fn label(self) -> &'static str {
        match self {
            InteractionMode::Browse => "Browse",
            InteractionMode::Measure => "Measure",
            InteractionMode::Draw => "Draw",
            InteractionMode::BulkSelect => "Select",
        }
    }

    /// Pointer affordance while this mode is active.
    pub const fn cursor(self) -> &'static str {
        match self {
            InteractionMode::Browse => "grab",
            InteractionMode::Measure | InteractionMode::Draw | InteractionMode::BulkSelect => {
                "crosshair"
            }
        }
    }
}

/// A side effect a mode transition must perform. Exit effects run before
/// enter effects so no transition can observe the previous mode's residue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeEffect {
    /// Exit Measure: drop transient points/line and their rendering.
    ClearMeasurement,
    /// Exit Measure/Draw: hide the result banner.
    HideBanner,
    /// Exit BulkSelect: empty the selection set and its highlight.
    ClearSelection,
    /// Exit Draw: detach the external draw tool's callbacks.
    DeactivateDraw,
    /// Enter Measure: start from an empty session.
    ResetMeasurement,
    /// Enter Draw: attach the external draw tool's callbacks.
    ActivateDraw,
}

fn exit_effects(mode: InteractionMode) -> &'static [ModeEffect] {
    match mode {
        InteractionMode::Browse => &[],
        InteractionMode::Measure => &[ModeEffect::ClearMeasurement, ModeEffect::HideBanner],
        InteractionMode::Draw => &[ModeEffect::DeactivateDraw, ModeEffect::HideBanner],
        InteractionMode::BulkSelect => &[ModeEffect::ClearSelection],
    }
}

fn enter_effects(mode: InteractionMode) -> &'static [ModeEffect] {
    match mode {
        InteractionMode::Browse | InteractionMode::BulkSelect => &[],
        InteractionMode::Measure => &[ModeEffect::ResetMeasurement],
        InteractionMode::Draw => &[ModeEffect::ActivateDraw],
    }
}

/// Resolve a user toggle into the next mode plus the ordered side effects
/// the transition must run. Toggling the active mode returns to Browse.
/// Transitions happen only through this function, so cleanup cannot be
/// skipped by any path.
pub fn transition(
    current: InteractionMode,
    requested: InteractionMode,
) -> (InteractionMode, Vec<ModeEffect>) {
    let next = if requested == current {
        InteractionMode::Browse
    } else {
        requested
    };
    if next == current {
        return (current, Vec::new());
    }

    let mut effects = Vec::new();
    effects.extend_from_slice(exit_effects(current));
    effects.extend_from_slice(enter_effects(next));
    (next, effects)
}

/// Apply a user mode toggle to the application state.
pub fn toggle_mode(state: MapState, requested: InteractionMode) {
    let current = state.mode.get_untracked();
    let (next, effects) = transition(current, requested);
    if next == current {
        return;
    }

    for effect in effects {
        apply_effect(state, effect);
    }
    // Leaving Browse also drops any live hover emphasis so the departing
    // mode's popup cannot linger.
    let hovered = state.hovered.get_untracked();
    if hovered.is_some() {
        state.store.update(|store| {
            hover::transition(store, hovered, None);
        });
        state.hovered.set(None);
    }
    state.mode.set(next);
}

fn apply_effect(state: MapState, effect: ModeEffect) {
    match effect {
        ModeEffect::ClearMeasurement | ModeEffect::ResetMeasurement => {
            state.measure.update(|session| session.clear());
        }
        ModeEffect::HideBanner => state.banner.set(None),
        ModeEffect::ClearSelection => {
            state.selection.update(|selection| selection.clear());
            state.bulk_message.set(None);
        }
        ModeEffect::DeactivateDraw => {
            draw::deactivate();
            state.draw_generation.update(|g| *g = g.wrapping_add(1));
        }
        ModeEffect::ActivateDraw => {
            draw::activate(state);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggling_the_active_mode_returns_to_browse() {
        let (next, effects) = transition(InteractionMode::Measure, InteractionMode::Measure);
        assert_eq!(next, InteractionMode::Browse);
        assert_eq!(
            effects,
            vec![ModeEffect::ClearMeasurement, ModeEffect::HideBanner]
        );
    }

    #[test]
    fn entering_measure_clears_prior_session() {
        let (next, effects) = transition(InteractionMode::Browse, InteractionMode::Measure);
        assert_eq!(next, InteractionMode::Measure);
        assert_eq!(effects, vec![ModeEffect::ResetMeasurement]);
    }

    #[test]
    fn cross_transition_runs_exit_before_enter() {
        // Entering Measure while BulkSelect is active must leave the
        // selection empty before the measure session starts.
        let (next, effects) = transition(InteractionMode::BulkSelect, InteractionMode::Measure);
        assert_eq!(next, InteractionMode::Measure);
        assert_eq!(
            effects,
            vec![ModeEffect::ClearSelection, ModeEffect::ResetMeasurement]
        );
    }

    #[test]
    fn leaving_draw_detaches_the_tool_and_banner() {
        let (next, effects) = transition(InteractionMode::Draw, InteractionMode::BulkSelect);
        assert_eq!(next, InteractionMode::BulkSelect);
        assert_eq!(
            effects,
            vec![ModeEffect::DeactivateDraw, ModeEffect::HideBanner]
        );
    }

    #[test]
    fn browse_to_browse_is_a_no_op() {
        let (next, effects) = transition(InteractionMode::Browse, InteractionMode::Browse);
        assert_eq!(next, InteractionMode::Browse);
        assert!(effects.is_empty());
    }

    #[test]
    fn exactly_one_mode_is_ever_active() {
        // The transition function is total over mode pairs and always
        // produces a single successor state.
        let all = [
            InteractionMode::Browse,
            InteractionMode::Measure,
            InteractionMode::Draw,
            InteractionMode::BulkSelect,
        ];
        for current in all {
            for requested in all {
                let (next, _) = transition(current, requested);
                assert!(all.contains(&next));
            }
        }
    }
}
