//! Per-entry execution phases
//!
//! ```text
//! Pending -> Probing -> Importing -> Succeeded
//!                    \-> Updating  -> Failed
//! ```
//!
//! Any phase before a terminal one may move to `Failed`. Terminal phases
//! have no way out.

use serde::{Deserialize, Serialize};

/// Phase of one plan entry during execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryPhase {
    /// Not started
    Pending,
    /// Existence check in flight
    Probing,
    /// Creating at the target
    Importing,
    /// Replacing at the target
    Updating,
    /// Write accepted
    Succeeded,
    /// Write rejected or never attempted
    Failed,
}

impl EntryPhase {
    /// No further transitions possible
    #[inline]
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, EntryPhase::Succeeded | EntryPhase::Failed)
    }
}

/// Rejected phase change
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("illegal entry transition {from:?} -> {to:?}")]
pub struct IllegalTransition {
    /// Current phase
    pub from: EntryPhase,
    /// Requested phase
    pub to: EntryPhase,
}

/// Phases reachable from `from` in one step
#[must_use]
pub fn allowed_transitions(from: EntryPhase) -> &'static [EntryPhase] {
    use EntryPhase::*;
    match from {
        Pending => &[Probing, Failed],
        Probing => &[Importing, Updating, Failed],
        Importing | Updating => &[Succeeded, Failed],
        Succeeded | Failed => &[],
    }
}

/// Validate a phase change
///
/// With the `strict-debug` feature an illegal transition panics instead.
///
/// # Errors
/// `IllegalTransition` if `to` is not reachable from `from`
pub fn validate_transition(from: EntryPhase, to: EntryPhase) -> Result<(), IllegalTransition> {
    if allowed_transitions(from).contains(&to) {
        Ok(())
    } else {
        #[cfg(feature = "strict-debug")]
        panic!("Illegal entry transition attempted: {from:?} -> {to:?}");

        #[cfg(not(feature = "strict-debug"))]
        Err(IllegalTransition { from, to })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const ALL: [EntryPhase; 6] = [
        EntryPhase::Pending,
        EntryPhase::Probing,
        EntryPhase::Importing,
        EntryPhase::Updating,
        EntryPhase::Succeeded,
        EntryPhase::Failed,
    ];

    #[test]
    fn happy_paths_are_allowed() {
        for path in [
            [EntryPhase::Pending, EntryPhase::Probing, EntryPhase::Importing, EntryPhase::Succeeded],
            [EntryPhase::Pending, EntryPhase::Probing, EntryPhase::Updating, EntryPhase::Failed],
        ] {
            for step in path.windows(2) {
                assert!(validate_transition(step[0], step[1]).is_ok(), "{step:?}");
            }
        }
    }

    #[test]
    fn cannot_skip_the_probe() {
        assert_eq!(
            validate_transition(EntryPhase::Pending, EntryPhase::Importing),
            Err(IllegalTransition {
                from: EntryPhase::Pending,
                to: EntryPhase::Importing
            })
        );
    }

    proptest! {
        #[test]
        fn terminal_phases_are_absorbing(from in 0usize..6, to in 0usize..6) {
            let (from, to) = (ALL[from], ALL[to]);
            if from.is_terminal() {
                prop_assert!(validate_transition(from, to).is_err());
            }
        }

        #[test]
        fn every_live_phase_can_fail(from in 0usize..6) {
            let from = ALL[from];
            if !from.is_terminal() {
                prop_assert!(validate_transition(from, EntryPhase::Failed).is_ok());
            }
        }
    }
}
