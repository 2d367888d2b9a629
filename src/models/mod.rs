pub mod alert;
pub mod condition;
pub mod history;
pub mod snapshot;
pub mod template;

pub use alert::{Alert, AlertInput, AlertState, PostTriggerAction};
pub use condition::{Condition, ConditionField, ConditionGroup, Logic, Operator, Reference};
pub use history::TriggerHistory;
pub use snapshot::{Bar, BarPeriod, MarketSnapshot, Quote};
pub use template::{builtin_templates, AlertTemplate};
