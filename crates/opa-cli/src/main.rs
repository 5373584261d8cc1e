use std::sync::Arc;

use clap::Parser;
use color_eyre::Result;
use opa_core::{CommandContext, SharedEffects, SystemEffects};

mod cli;
mod dispatch;
mod logging;
mod output;
mod style;

use cli::OpaCli;
use output::{emit_output, OutputOptions};

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = OpaCli::parse();
    logging::init_tracing(cli.trace, cli.verbose, cli.quiet);

    let opts = OutputOptions {
        quiet: cli.quiet,
        json: cli.json,
        no_color: cli.no_color,
    };

    let effects: SharedEffects = Arc::new(SystemEffects::new());
    let (info, outcome) = match CommandContext::new(effects) {
        Ok(ctx) => dispatch::dispatch_command(&ctx, &cli.command)?,
        Err(err) => (
            dispatch::command_info(&cli.command),
            opa_core::failure_outcome(&err),
        ),
    };
    let code = emit_output(&opts, info, &outcome)?;

    if code == 0 {
        Ok(())
    } else {
        std::process::exit(code);
    }
}
