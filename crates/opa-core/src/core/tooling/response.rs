use serde_json::{json, Value};

use crate::core::config::context::CommandInfo;
use crate::outcome::{CommandStatus, ExecutionOutcome};

#[must_use]
pub fn status_label(status: CommandStatus) -> &'static str {
    match status {
        CommandStatus::Ok => "ok",
        CommandStatus::Warning => "warning",
        CommandStatus::UserError => "user-error",
        CommandStatus::Failure => "error",
    }
}

#[must_use]
pub fn to_json_response(info: CommandInfo, outcome: &ExecutionOutcome) -> Value {
    let details = match &outcome.details {
        Value::Object(_) => outcome.details.clone(),
        Value::Null => json!({}),
        other => json!({ "value": other }),
    };
    json!({
        "status": status_label(outcome.status),
        "message": format_status_message(info, &outcome.message),
        "details": details,
    })
}

#[must_use]
pub fn format_status_message(info: CommandInfo, message: &str) -> String {
    let group_name = info.group.to_string();
    let prefix = if group_name == info.name {
        format!("opa {}", info.name)
    } else {
        format!("opa {} {}", group_name, info.name)
    };
    if message.is_empty() {
        prefix
    } else if message.starts_with(&prefix) {
        message.to_string()
    } else {
        format!("{prefix}: {message}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::context::CommandGroup;

    #[test]
    fn prefixes_message_with_command() {
        let info = CommandInfo::new(CommandGroup::Install, "install");
        assert_eq!(
            format_status_message(info, "installed demo"),
            "opa install: installed demo"
        );
        assert_eq!(format_status_message(info, ""), "opa install");
        assert_eq!(
            format_status_message(info, "opa install: already prefixed"),
            "opa install: already prefixed"
        );
    }

    #[test]
    fn json_response_carries_status_and_details() {
        let info = CommandInfo::new(CommandGroup::Remove, "remove");
        let outcome = ExecutionOutcome::warning("demo not found", json!({ "appid": "demo" }));
        let response = to_json_response(info, &outcome);
        assert_eq!(response["status"], "warning");
        assert_eq!(response["message"], "opa remove: demo not found");
        assert_eq!(response["details"]["appid"], "demo");

        let bare = ExecutionOutcome::success("listed", Value::Null);
        assert_eq!(to_json_response(info, &bare)["details"], json!({}));
    }
}
