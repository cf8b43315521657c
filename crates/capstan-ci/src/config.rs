//! Engine configuration.

use std::path::PathBuf;

use crate::sync::GitCommands;

/// Hard ceiling applied to every external command, in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 3600;

/// Configuration for a Capstan instance.
#[derive(Debug, Clone)]
pub struct CapstanConfig {
    /// Directory under which per-project working copies are created.
    pub base_build_dir: PathBuf,

    /// Path to the git binary.
    pub git_path: String,

    /// Timeout for every external command (git and build script alike).
    pub command_timeout_secs: u64,

    /// Overridable git command templates.
    pub git_commands: GitCommands,
}

impl CapstanConfig {
    pub fn new(base_build_dir: impl Into<PathBuf>) -> Self {
        CapstanConfig {
            base_build_dir: base_build_dir.into(),
            git_path: "git".to_string(),
            command_timeout_secs: DEFAULT_TIMEOUT_SECS,
            git_commands: GitCommands::default(),
        }
    }

    pub fn with_git_path(mut self, git_path: impl Into<String>) -> Self {
        self.git_path = git_path.into();
        self
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.command_timeout_secs = secs;
        self
    }

    pub fn with_git_commands(mut self, commands: GitCommands) -> Self {
        self.git_commands = commands;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CapstanConfig::new("/var/lib/capstan");
        assert_eq!(config.git_path, "git");
        assert_eq!(config.command_timeout_secs, DEFAULT_TIMEOUT_SECS);
    }

    #[test]
    fn test_builders() {
        let config = CapstanConfig::new("/tmp/builds")
            .with_git_path("/usr/local/bin/git")
            .with_timeout_secs(30);
        assert_eq!(config.git_path, "/usr/local/bin/git");
        assert_eq!(config.command_timeout_secs, 30);
    }
}
