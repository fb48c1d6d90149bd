//! # Overflow Decisions
//!
//! Every box flows in one of three modes. `Split` boxes break across
//! columns and pages, `Clip` boxes cap their height and hide the rest, and
//! `Grow` boxes (explicit-layout frames, positioned content, anything
//! nested in a non-splitting box) take whatever height their content needs.

use crate::style::OverflowAction;

/// Slack for floating-point comparisons of heights.
pub const EPSILON: f64 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowMode {
    Split,
    Clip,
    Grow,
}

impl FlowMode {
    /// Only splitting boxes are bounded by the space left on the page.
    pub fn is_bounded(self) -> bool {
        self == FlowMode::Split
    }
}

/// Mode of a box, given its overflow action and the mode of its parent.
///
/// An explicit-layout box always grows. A box can only split if its parent
/// can; inside a clipping or growing parent it grows.
pub fn flow_mode(overflow: OverflowAction, explicit_layout: bool, parent: FlowMode) -> FlowMode {
    if explicit_layout {
        return FlowMode::Grow;
    }
    match overflow {
        OverflowAction::Clip => FlowMode::Clip,
        OverflowAction::Grow => FlowMode::Grow,
        OverflowAction::NextPage if parent == FlowMode::Split => FlowMode::Split,
        OverflowAction::NextPage => FlowMode::Grow,
    }
}

/// What to do with an item of a given height.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakDecision {
    /// It fits where the cursor is.
    Place,
    /// Move on to the next column or page first.
    Advance,
    /// It doesn't fit, but nothing precedes it in this column, so moving it
    /// would not help. Place it and let it overflow.
    Overflow,
}

/// Decide how to place an item needing `needed` height when `remaining`
/// is left. `fresh` means nothing has been placed in the current column
/// on this page by any enclosing box.
pub fn decide_break(needed: f64, remaining: f64, fresh: bool, mode: FlowMode) -> BreakDecision {
    if !mode.is_bounded() || needed <= remaining + EPSILON {
        return BreakDecision::Place;
    }
    if fresh {
        return BreakDecision::Overflow;
    }
    BreakDecision::Advance
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fits() {
        assert_eq!(
            decide_break(30.0, 100.0, false, FlowMode::Split),
            BreakDecision::Place
        );
    }

    #[test]
    fn test_exact_fit_within_epsilon() {
        assert_eq!(
            decide_break(100.005, 100.0, false, FlowMode::Split),
            BreakDecision::Place
        );
    }

    #[test]
    fn test_advance_when_not_fresh() {
        assert_eq!(
            decide_break(120.0, 100.0, false, FlowMode::Split),
            BreakDecision::Advance
        );
    }

    #[test]
    fn test_overflow_on_fresh_column() {
        assert_eq!(
            decide_break(120.0, 100.0, true, FlowMode::Split),
            BreakDecision::Overflow
        );
    }

    #[test]
    fn test_unbounded_modes_always_place() {
        for mode in [FlowMode::Clip, FlowMode::Grow] {
            assert_eq!(decide_break(1e9, 0.0, false, mode), BreakDecision::Place);
        }
    }

    #[test]
    fn test_flow_mode_inheritance() {
        assert_eq!(
            flow_mode(OverflowAction::NextPage, false, FlowMode::Split),
            FlowMode::Split
        );
        assert_eq!(
            flow_mode(OverflowAction::NextPage, false, FlowMode::Clip),
            FlowMode::Grow
        );
        assert_eq!(
            flow_mode(OverflowAction::Clip, false, FlowMode::Split),
            FlowMode::Clip
        );
        assert_eq!(
            flow_mode(OverflowAction::Clip, true, FlowMode::Split),
            FlowMode::Grow
        );
    }
}
