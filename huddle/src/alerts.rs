//! Prompts shown to the user when a flow cannot complete.

use huddle_interface::interface::Alerts;
use huddle_rest::{FieldErrors, Reply};
use tracing::warn;

pub const INVALID_CREDENTIALS: &str = "Invalid credentials";
pub const SOMETHING_WENT_WRONG: &str = "Something went wrong";
pub const ONLY_ADMIN_CAN_UNBLOCK: &str = "Only admin can unblock users";
pub const ONLY_ADMIN: &str = "Only the group admin can do this";

/// Message for a rejected update: the first field error the server sent,
/// or the generic failure.
pub fn rejection_message(reply: &Reply) -> String {
    reply
        .decode::<FieldErrors>()
        .ok()
        .and_then(|errors| errors.first_message().map(str::to_owned))
        .unwrap_or_else(|| SOMETHING_WENT_WRONG.to_owned())
}

/// Writes prompts to the terminal.
#[derive(Debug, Default)]
pub struct ConsoleAlerts;

impl Alerts for ConsoleAlerts {
    fn alert(&self, message: &str) {
        warn!("Alert: {message}");
        eprintln!("! {message}");
    }
}
