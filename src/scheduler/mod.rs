//! Giveaway completion scheduler module.
//!
//! Periodically closes giveaways whose end time has passed, draws the
//! winners and announces them in the giveaway's first channel.

mod completion;
mod runner;

pub use completion::{
    CompletionError, CompletionOutcome, CompletionProcess, format_results, select_winners,
};
pub use runner::{CompletionScheduler, SchedulerMessage};
