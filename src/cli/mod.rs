pub mod app;
pub mod check;
pub mod commands;
pub mod context;
pub mod dispatch;
pub mod env;
pub mod output;
pub mod records;
pub mod runtime;
pub mod serve;
pub mod validate;

pub use app::run;
pub use check::{cmd_check, CheckArgs};
pub use records::{cmd_mappings, cmd_rules, ListArgs};
pub use serve::{cmd_serve, ServeArgs};
