//! `opa-start <appid>`: launch an installed app without the full `opa` CLI.

use std::sync::Arc;

use clap::{ArgAction, Parser};
use color_eyre::Result;
use opa_core::{
    CommandContext, CommandGroup, CommandInfo, SharedEffects, StartRequest, SystemEffects,
};

mod logging;
mod output;
mod style;

use output::{emit_output, OutputOptions};

#[derive(Parser, Debug)]
#[command(name = "opa-start", version, about = "Run an installed app")]
struct StartCli {
    #[arg(short, long, help = "Suppress human output (errors still print to stderr)")]
    quiet: bool,
    #[arg(short, long, action = ArgAction::Count, help = "Increase logging (-vv reaches trace)")]
    verbose: u8,
    #[arg(long, help = "Emit a {status,message,details} JSON envelope")]
    json: bool,
    #[arg(long, help = "Disable colored human output")]
    no_color: bool,
    #[arg(value_name = "APPID")]
    appid: String,
    #[arg(value_name = "ARG", trailing_var_arg = true, allow_hyphen_values = true)]
    args: Vec<String>,
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = StartCli::parse();
    logging::init_tracing(false, cli.verbose, cli.quiet);

    let opts = OutputOptions {
        quiet: cli.quiet,
        json: cli.json,
        no_color: cli.no_color,
    };
    let info = CommandInfo::new(CommandGroup::Start, "start");
    let request = StartRequest {
        appid: cli.appid.clone(),
        args: cli.args.clone(),
    };

    let effects: SharedEffects = Arc::new(SystemEffects::new());
    let outcome = match CommandContext::new(effects) {
        Ok(ctx) => match opa_core::start_app(&ctx, &request) {
            Ok(outcome) => outcome,
            Err(err) => opa_core::ExecutionOutcome::failure(
                err.to_string(),
                serde_json::json!({
                    "code": opa_core::diag_commands::GENERIC,
                    "reason": "internal_error",
                    "issues": err.chain().map(ToString::to_string).collect::<Vec<_>>(),
                }),
            ),
        },
        Err(err) => opa_core::failure_outcome(&err),
    };
    let code = emit_output(&opts, info, &outcome)?;

    if code == 0 {
        Ok(())
    } else {
        std::process::exit(code);
    }
}
