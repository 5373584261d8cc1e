use std::io::Write;

use atty::Stream;
use color_eyre::Result;
use opa_core::{diag_commands, CommandGroup, CommandInfo, CommandStatus, ExecutionOutcome};
use serde_json::Value;

use crate::style::Style;

#[derive(Clone, Copy, Debug)]
pub struct OutputOptions {
    pub quiet: bool,
    pub json: bool,
    pub no_color: bool,
}

/// Prints the outcome and returns the process exit code. Successful output
/// goes to stdout; warnings and errors go to stderr.
pub fn emit_output(
    opts: &OutputOptions,
    info: CommandInfo,
    outcome: &ExecutionOutcome,
) -> Result<i32> {
    let code = outcome.exit_code();

    if opts.json {
        let payload = opa_core::to_json_response(info, outcome);
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(code);
    }

    match outcome.status {
        CommandStatus::Ok => {
            if opts.quiet || is_passthrough(&outcome.details) {
                return Ok(code);
            }
            let style = Style::new(opts.no_color, atty::is(Stream::Stdout));
            if let Some(table) = render_app_table(&style, info, &outcome.details) {
                println!("{table}");
            } else {
                let message = opa_core::format_status_message(info, &outcome.message);
                println!("{}", style.status(outcome.status, &message));
            }
        }
        CommandStatus::Warning => {
            if opts.quiet {
                return Ok(code);
            }
            let style = Style::new(opts.no_color, atty::is(Stream::Stderr));
            let message = opa_core::format_status_message(info, &outcome.message);
            let mut stderr = std::io::stderr().lock();
            writeln!(stderr, "{}", style.status(outcome.status, &message))?;
            if let Some(hint) = hint_from_details(&outcome.details) {
                writeln!(stderr, "{}", style.info(&format!("Tip: {hint}")))?;
            }
        }
        CommandStatus::UserError | CommandStatus::Failure => {
            let style = Style::new(opts.no_color, atty::is(Stream::Stderr));
            let mut stderr = std::io::stderr().lock();
            write_error(&mut stderr, &style, info, outcome)?;
        }
    }

    Ok(code)
}

fn write_error(
    out: &mut impl Write,
    style: &Style,
    info: CommandInfo,
    outcome: &ExecutionOutcome,
) -> std::io::Result<()> {
    let header = format!(
        "{}  {}",
        error_code(&outcome.details),
        opa_core::format_status_message(info, &outcome.message)
    );
    writeln!(out, "{}", style.error_header(&header))?;
    writeln!(out)?;
    writeln!(out, "Why:")?;
    for reason in collect_why_bullets(&outcome.details, &outcome.message) {
        writeln!(out, "  • {reason}")?;
    }
    let fixes = collect_fix_bullets(&outcome.details);
    if !fixes.is_empty() {
        writeln!(out)?;
        writeln!(out, "Fix:")?;
        for fix in fixes {
            writeln!(out, "{}", style.fix_bullet(&format!("  • {fix}")))?;
        }
    }
    Ok(())
}

fn hint_from_details(details: &Value) -> Option<&str> {
    details
        .as_object()
        .and_then(|map| map.get("hint"))
        .and_then(Value::as_str)
}

fn is_passthrough(details: &Value) -> bool {
    details
        .as_object()
        .and_then(|map| map.get("passthrough"))
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

fn render_app_table(style: &Style, info: CommandInfo, details: &Value) -> Option<String> {
    if info.group != CommandGroup::List {
        return None;
    }
    let apps = details.get("apps")?.as_array()?;
    if apps.is_empty() {
        return None;
    }

    let mut rows = Vec::new();
    for app in apps {
        let obj = app.as_object()?;
        rows.push(AppRow {
            appid: obj.get("appid")?.as_str()?.to_string(),
            appname: obj.get("appname")?.as_str()?.to_string(),
            appversion: obj.get("appversion")?.as_str()?.to_string(),
            installed: obj.get("installed").and_then(Value::as_bool).unwrap_or(true),
        });
    }

    Some(format_app_table(style, &rows))
}

struct AppRow {
    appid: String,
    appname: String,
    appversion: String,
    installed: bool,
}

fn format_app_table(style: &Style, rows: &[AppRow]) -> String {
    let headers = ["App ID", "Name", "Version"];
    let mut widths = [headers[0].len(), headers[1].len(), headers[2].len()];
    for row in rows {
        widths[0] = widths[0].max(row.appid.chars().count());
        widths[1] = widths[1].max(row.appname.chars().count());
        widths[2] = widths[2].max(row.appversion.chars().count());
    }

    let header_line = format!(
        "{:<width0$}  {:<width1$}  {:<width2$}",
        headers[0],
        headers[1],
        headers[2],
        width0 = widths[0],
        width1 = widths[1],
        width2 = widths[2],
    );

    let mut lines = Vec::new();
    lines.push(style.table_header(header_line.trim_end()));
    lines.push(format!(
        "{:-<width0$}  {:-<width1$}  {:-<width2$}",
        "",
        "",
        "",
        width0 = widths[0],
        width1 = widths[1],
        width2 = widths[2],
    ));
    for row in rows {
        let line = format!(
            "{:<width0$}  {:<width1$}  {:<width2$}",
            row.appid,
            row.appname,
            row.appversion,
            width0 = widths[0],
            width1 = widths[1],
            width2 = widths[2],
        );
        let line = line.trim_end().to_string();
        if row.installed {
            lines.push(line);
        } else {
            lines.push(format!("{line}  {}", style.dimmed("(install tree missing)")));
        }
    }

    lines.join("\n")
}

fn error_code(details: &Value) -> &str {
    details
        .get("code")
        .and_then(Value::as_str)
        .unwrap_or(diag_commands::GENERIC)
}

fn collect_why_bullets(details: &Value, fallback: &str) -> Vec<String> {
    let mut bullets = Vec::new();
    if let Some(reason) = details.get("reason").and_then(Value::as_str) {
        push_unique(
            &mut bullets,
            reason_display(reason).unwrap_or(reason).to_string(),
        );
    }
    if let Some(stage) = details.get("stage").and_then(Value::as_str) {
        push_unique(&mut bullets, format!("Stopped before stage: {stage}"));
    }
    if let (Some(required), Some(current)) = (
        details.get("required").and_then(Value::as_str),
        details.get("current").and_then(Value::as_str),
    ) {
        push_unique(
            &mut bullets,
            format!("Package requires OS {required}; this host reports {current}"),
        );
    }
    if let Some(declared) = details.get("declared").and_then(Value::as_array) {
        let names: Vec<&str> = declared.iter().filter_map(Value::as_str).collect();
        push_unique(
            &mut bullets,
            format!("Declared platforms: {}", names.join(", ")),
        );
    }
    if let Some(issues) = details.get("issues").and_then(Value::as_array) {
        for entry in issues {
            if let Value::String(message) = entry {
                push_unique(&mut bullets, message.to_string());
            }
        }
    }
    if details.get("partial").and_then(Value::as_bool) == Some(true) {
        for (key, label) in [
            ("install_dir", "Partial install left at"),
            ("scratch_dir", "Extracted files left at"),
        ] {
            if let Some(path) = details.get(key).and_then(Value::as_str) {
                push_unique(&mut bullets, format!("{label} {path}"));
            }
        }
    }
    if bullets.is_empty() {
        bullets.push(fallback.to_string());
    }
    bullets
}

fn collect_fix_bullets(details: &Value) -> Vec<String> {
    let mut fixes = Vec::new();
    if let Some(hint) = hint_from_details(details) {
        push_unique(&mut fixes, hint.to_string());
    }
    if details.get("partial").and_then(Value::as_bool) == Some(true) {
        push_unique(
            &mut fixes,
            "Remove the leftover paths or re-run the install once the cause is fixed",
        );
    }
    if fixes.is_empty() {
        fixes.push("Re-run with --help for usage or inspect the output above.".to_string());
    }
    fixes
}

fn push_unique(vec: &mut Vec<String>, text: impl Into<String>) {
    let entry = text.into();
    if entry.trim().is_empty() {
        return;
    }
    if !vec.iter().any(|existing| existing == &entry) {
        vec.push(entry);
    }
}

fn reason_display(code: &str) -> Option<&'static str> {
    match code {
        "manifest_not_found" => Some("The package has no Manifest.xml at its root."),
        "manifest_malformed" => Some("Manifest.xml is missing required fields or is not valid XML."),
        "os_version_too_low" => Some("The package needs a newer OS version."),
        "no_suitable_architecture" => {
            Some("None of the declared platforms ships a binary in this package.")
        }
        "extraction_failed" => Some("The archive could not be unpacked."),
        "filesystem_error" => Some("A file operation under the apps directory failed."),
        "registry_io_error" => Some("The installed-apps registry could not be read or written."),
        "app_not_found" => Some("No app with that identifier is installed."),
        "configuration_error" => Some("The apps directory could not be located."),
        _ => None,
    }
}
