pub mod commands;
pub mod ui;
pub mod util;

pub use util::{CommandContext, RecordArgs, parse_message, parse_param, requested_params};
