use anyhow::Result;
use opa_domain::INSTALLED_BINARY_PATH;
use serde_json::json;
use tracing::{debug, info};

use crate::core::tooling::failure::{failure_outcome, OpaError};
use crate::{CommandContext, ExecutionOutcome};

#[derive(Clone, Debug)]
pub struct StartRequest {
    pub appid: String,
    pub args: Vec<String>,
}

/// Launches `<apps-dir>/<appid>/bin/main` with inherited stdio; the outcome
/// carries the child's exit code.
///
/// # Errors
/// Returns an error only for failures outside the launcher.
pub fn start_app(ctx: &CommandContext, request: &StartRequest) -> Result<ExecutionOutcome> {
    let appid = request.appid.as_str();
    let not_found = || {
        failure_outcome(&OpaError::AppNotFound {
            appid: appid.to_string(),
        })
    };
    let Some(app_dir) = ctx.layout().app_dir(appid) else {
        return Ok(not_found());
    };
    let binary = app_dir.join(INSTALLED_BINARY_PATH);
    if !ctx.fs().is_file(&binary) {
        return Ok(not_found());
    }
    if let Err(err) = ctx.fs().set_executable(&binary) {
        return Ok(failure_outcome(&OpaError::filesystem(
            "mark executable",
            &binary,
            err,
        )));
    }

    debug!(%appid, binary = %binary.display(), args = request.args.len(), "launching");
    let code = match ctx.launcher().run_passthrough(&binary, &request.args, &app_dir) {
        Ok(code) => code,
        Err(err) => return Ok(failure_outcome(&OpaError::filesystem("launch", &binary, err))),
    };
    info!(%appid, code, "application exited");
    Ok(ExecutionOutcome::success(
        format!("{appid} exited with code {code}"),
        json!({
            "appid": appid,
            "binary": binary.display().to_string(),
            "exit_code": code,
            "passthrough": true,
        }),
    )
    .with_exit_code(code))
}
