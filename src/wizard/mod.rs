//! Giveaway creation wizard.
//!
//! A six-step conversation (title, prizes, winner count, conditions,
//! channels, end date) followed by a confirmation. Each chat has its own
//! session holding the current [`WizardState`] and the [`Draft`]; the
//! draft only reaches the store when the creator confirms.

mod machine;
pub mod messages;
mod state;

pub use machine::{CreationWizard, WizardAction, WizardInput};
pub use state::{
    Draft, EndDateError, WizardState, normalize_channel, parse_end_date, parse_winner_count,
};
