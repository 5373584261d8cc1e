use color_eyre::Result;
use opa_core::{
    CommandContext, CommandGroup, CommandInfo, InstallRequest, RemoveRequest, StartRequest,
};

use crate::cli::CommandGroupCli;

pub fn command_info(group: &CommandGroupCli) -> CommandInfo {
    match group {
        CommandGroupCli::Install(_) => CommandInfo::new(CommandGroup::Install, "install"),
        CommandGroupCli::Remove(_) => CommandInfo::new(CommandGroup::Remove, "remove"),
        CommandGroupCli::Start(_) => CommandInfo::new(CommandGroup::Start, "start"),
        CommandGroupCli::List => CommandInfo::new(CommandGroup::List, "list"),
    }
}

pub fn dispatch_command(
    ctx: &CommandContext,
    group: &CommandGroupCli,
) -> Result<(CommandInfo, opa_core::ExecutionOutcome)> {
    let info = command_info(group);
    match group {
        CommandGroupCli::Install(args) => {
            let request = InstallRequest {
                archive: args.archive.clone(),
            };
            core_call(info, || opa_core::install_app(ctx, &request))
        }
        CommandGroupCli::Remove(args) => {
            let request = RemoveRequest {
                appid: args.appid.clone(),
            };
            core_call(info, || opa_core::remove_app(ctx, &request))
        }
        CommandGroupCli::Start(args) => {
            let request = StartRequest {
                appid: args.appid.clone(),
                args: args.args.clone(),
            };
            core_call(info, || opa_core::start_app(ctx, &request))
        }
        CommandGroupCli::List => core_call(info, || opa_core::list_apps(ctx)),
    }
}

pub fn core_call<F>(info: CommandInfo, action: F) -> Result<(CommandInfo, opa_core::ExecutionOutcome)>
where
    F: FnOnce() -> anyhow::Result<opa_core::ExecutionOutcome>,
{
    match action() {
        Ok(outcome) => Ok((info, outcome)),
        Err(err) => {
            if let Some(known) = err.downcast_ref::<opa_core::OpaError>() {
                return Ok((info, opa_core::failure_outcome(known)));
            }
            tracing::debug!(error = ?err, "unexpected failure");
            let issues: Vec<String> = err.chain().map(std::string::ToString::to_string).collect();
            Ok((
                info,
                opa_core::ExecutionOutcome::failure(
                    err.to_string(),
                    serde_json::json!({
                        "code": opa_core::diag_commands::GENERIC,
                        "reason": "internal_error",
                        "error": err.to_string(),
                        "issues": issues,
                        "hint": "Re-run with `--trace` for more detail, or open an issue if this persists.",
                    }),
                ),
            ))
        }
    }
}
