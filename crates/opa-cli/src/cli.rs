use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};

pub const OPA_HELP_TEMPLATE: &str =
    "{before-help}\nUsage:\n    {usage}\n\nGlobal options:\n{options}\n";

pub const OPA_BEFORE_HELP: &str = concat!(
    "opa ",
    env!("CARGO_PKG_VERSION"),
    " – Self-contained application installer\n\n",
    "\x1b[1;36mCommands\x1b[0m\n",
    "  install          Unpack a package archive into ~/Applications and register it.\n",
    "  remove           Delete an installed app and drop its registry entry.\n",
    "  start            Launch an installed app's bin/main.\n",
    "  list             Show registered apps.\n",
);

#[derive(Parser, Debug)]
#[command(
    name = "opa",
    author,
    version,
    propagate_version = false,
    disable_help_subcommand = true,
    before_help = OPA_BEFORE_HELP,
    help_template = OPA_HELP_TEMPLATE
)]
#[allow(clippy::struct_excessive_bools)]
pub struct OpaCli {
    #[arg(
        short,
        long,
        help = "Suppress human output (errors still print to stderr)",
        global = true
    )]
    pub quiet: bool,
    #[arg(short, long, action = ArgAction::Count, help = "Increase logging (-vv reaches trace)", global = true)]
    pub verbose: u8,
    #[arg(long, help = "Force trace logging regardless of -v/-q", global = true)]
    pub trace: bool,
    #[arg(
        long,
        help = "Emit {status,message,details} JSON envelopes",
        global = true
    )]
    pub json: bool,
    #[arg(long, help = "Disable colored human output", global = true)]
    pub no_color: bool,
    #[command(subcommand)]
    pub command: CommandGroupCli,
}

#[derive(Subcommand, Debug)]
pub enum CommandGroupCli {
    #[command(
        about = "Install a package archive: validate, pick the binary for this host, register.",
        override_usage = "opa install <ARCHIVE>"
    )]
    Install(InstallArgs),
    #[command(
        about = "Remove an installed app and its registry entry.",
        override_usage = "opa remove <APPID>"
    )]
    Remove(RemoveArgs),
    #[command(
        about = "Run an installed app, relaying its output and exit code.",
        override_usage = "opa start <APPID> [-- ARGS...]"
    )]
    Start(StartArgs),
    #[command(about = "List registered apps.")]
    List,
}

#[derive(Args, Debug)]
pub struct InstallArgs {
    #[arg(value_name = "ARCHIVE", help = "Path to the package archive")]
    pub archive: PathBuf,
}

#[derive(Args, Debug)]
pub struct RemoveArgs {
    #[arg(value_name = "APPID", help = "Identifier of the installed app")]
    pub appid: String,
}

#[derive(Args, Debug)]
pub struct StartArgs {
    #[arg(value_name = "APPID", help = "Identifier of the installed app")]
    pub appid: String,
    #[arg(
        value_name = "ARG",
        last = true,
        allow_hyphen_values = true,
        help = "Arguments passed to the app"
    )]
    pub args: Vec<String>,
}
