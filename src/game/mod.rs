pub mod clock;
pub mod history;
pub mod reducer;
pub mod rules;

pub use clock::{remaining, timeout_action, ClockSnapshot};
pub use history::HistoryCursor;
pub use reducer::{apply, Reducer};
pub use rules::{AppliedMove, RulesEngine, StandardRules, TerminalConditions};
