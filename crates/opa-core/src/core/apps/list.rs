use anyhow::Result;
use opa_domain::ArchitectureId;
use serde_json::{json, Value};

use crate::core::registry_store::RegistryStore;
use crate::core::tooling::failure::failure_outcome;
use crate::{CommandContext, ExecutionOutcome};

/// Lists registered applications in registry order.
///
/// # Errors
/// Returns an error only for failures outside the registry.
pub fn list_apps(ctx: &CommandContext) -> Result<ExecutionOutcome> {
    let layout = ctx.layout();
    let store = RegistryStore::new(ctx.fs(), &layout);
    let entries = match store.entries() {
        Ok(entries) => entries,
        Err(err) => return Ok(failure_outcome(&err)),
    };
    let registry = store.path().display().to_string();
    let host = ArchitectureId::host().to_string();

    let mut lines = Vec::new();
    let apps: Vec<Value> = entries
        .iter()
        .map(|entry| {
            let installed = layout
                .app_dir(&entry.appid)
                .is_some_and(|dir| ctx.fs().is_dir(&dir));
            let mut line = format!("{}  {}  {}", entry.appid, entry.appname, entry.appversion);
            if !installed {
                line.push_str("  (install tree missing)");
            }
            lines.push(line);
            json!({
                "appid": entry.appid,
                "appname": entry.appname,
                "appversion": entry.appversion,
                "installed": installed,
            })
        })
        .collect();

    let message = if lines.is_empty() {
        "no apps installed".to_string()
    } else {
        lines.join("\n")
    };
    Ok(ExecutionOutcome::success(
        message,
        json!({
            "apps": apps,
            "registry": registry,
            "apps_dir": layout.root().display().to_string(),
            "apps_dir_source": ctx.config().apps().source.as_str(),
            "host_architecture": host,
        }),
    ))
}
