use std::fmt;

use crate::core::apps::AppsLayout;
use crate::core::config::Config;
use crate::core::effects::{self, Effects, SharedEffects};
use crate::core::tooling::failure::OpaError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommandGroup {
    Install,
    Remove,
    Start,
    List,
}

impl fmt::Display for CommandGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CommandGroup::Install => "install",
            CommandGroup::Remove => "remove",
            CommandGroup::Start => "start",
            CommandGroup::List => "list",
        };
        f.write_str(name)
    }
}

#[derive(Clone, Copy, Debug)]
pub struct CommandInfo {
    pub group: CommandGroup,
    pub name: &'static str,
}

impl CommandInfo {
    #[must_use]
    pub const fn new(group: CommandGroup, name: &'static str) -> Self {
        Self { group, name }
    }
}

pub struct CommandContext {
    config: Config,
    effects: SharedEffects,
}

impl CommandContext {
    /// Creates a command context, resolving configuration through the
    /// provided effects.
    ///
    /// # Errors
    /// Returns an error if the apps directory cannot be resolved.
    pub fn new(effects: SharedEffects) -> Result<Self, OpaError> {
        let config = Config::from_env(effects.env())?;
        Ok(Self { config, effects })
    }

    pub fn effects(&self) -> &dyn Effects {
        self.effects.as_ref()
    }

    pub fn fs(&self) -> &dyn effects::FileSystem {
        self.effects.fs()
    }

    pub fn env(&self) -> &dyn effects::EnvironmentResolver {
        self.effects.env()
    }

    pub fn launcher(&self) -> &dyn effects::ProcessLauncher {
        self.effects.launcher()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn layout(&self) -> AppsLayout {
        AppsLayout::new(self.config.apps().root.clone())
    }
}
