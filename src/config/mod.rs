// Configuration management
// Loads config.toml and the user secret store from the application directory

pub mod interactive;
pub mod settings;


pub use interactive::{run_interactive_config, show_config};
pub use settings::{
    Config, ConfigError, HostedConfig, LocalConfig, RetrievalConfig, Secrets, TOKEN_SETTING,
};

/// Get the configuration directory path
#[inline]
pub fn get_config_dir() -> Result<std::path::PathBuf, ConfigError> {
    Config::config_dir()
}
