use anyhow::Context;
use clap::{Parser, Subcommand};
use rag_console::Result;
use rag_console::clients::Variant;
use rag_console::commands::{run_menu, run_sample};
use rag_console::config::{Config, get_config_dir, run_interactive_config, show_config};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "rag-console")]
#[command(about = "Retrieval-augmented generation samples over a hosted or local model backend")]
#[command(version)]
struct Cli {
    /// Directory holding config.toml and secrets.toml
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the interactive sample menu (the default)
    Menu,
    /// Run one sample without the menu
    Run {
        /// Backend to run the sample against
        #[arg(value_enum)]
        variant: Variant,
    },
    /// Configure endpoints, models and the API token
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config_dir = match cli.config_dir {
        Some(dir) => dir,
        None => get_config_dir()?,
    };

    match cli.command.unwrap_or(Commands::Menu) {
        Commands::Config { show } => {
            if show {
                show_config(&config_dir)?;
            } else {
                run_interactive_config(&config_dir)?;
            }
        }
        Commands::Menu => {
            let config = load_config(&config_dir)?;
            run_menu(&config).await?;
        }
        Commands::Run { variant } => {
            let config = load_config(&config_dir)?;
            run_sample(&config, variant).await?;
        }
    }

    Ok(())
}

fn load_config(config_dir: &std::path::Path) -> Result<Config> {
    let config = Config::load(config_dir).context("Failed to load configuration")?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    #[test]
    fn no_subcommand_opens_menu() {
        let cli = Cli::try_parse_from(["rag-console"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            assert!(parsed.command.is_none());
            assert!(parsed.config_dir.is_none());
        }
    }

    #[test]
    fn menu_command() {
        let cli = Cli::try_parse_from(["rag-console", "menu"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            assert!(matches!(parsed.command, Some(Commands::Menu)));
        }
    }

    #[test]
    fn run_command_with_variant() {
        for (arg, expected) in [("hosted", Variant::Hosted), ("local", Variant::Local)] {
            let cli = Cli::try_parse_from(["rag-console", "run", arg]);
            assert!(cli.is_ok());

            if let Ok(parsed) = cli {
                if let Some(Commands::Run { variant }) = parsed.command {
                    assert_eq!(variant, expected);
                } else {
                    panic!("expected run command");
                }
            }
        }
    }

    #[test]
    fn run_command_rejects_unknown_variant() {
        let cli = Cli::try_parse_from(["rag-console", "run", "remote"]);
        assert!(cli.is_err());

        if let Err(err) = cli {
            assert_eq!(err.kind(), ErrorKind::InvalidValue);
        }
    }

    #[test]
    fn config_dir_is_global() {
        let cli = Cli::try_parse_from(["rag-console", "run", "local", "--config-dir", "/tmp/rag"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            assert_eq!(parsed.config_dir, Some(PathBuf::from("/tmp/rag")));
        }
    }

    #[test]
    fn config_show_flag() {
        let cli = Cli::try_parse_from(["rag-console", "config", "--show"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Some(Commands::Config { show }) = parsed.command {
                assert!(show);
            }
        }
    }

    #[test]
    fn invalid_command() {
        let cli = Cli::try_parse_from(["rag-console", "invalid"]);
        assert!(cli.is_err());

        if let Err(err) = cli {
            assert_eq!(err.kind(), ErrorKind::InvalidSubcommand);
        }
    }

    #[test]
    fn help_message() {
        let cli = Cli::try_parse_from(["rag-console", "--help"]);
        assert!(cli.is_err());

        if let Err(err) = cli {
            assert_eq!(err.kind(), ErrorKind::DisplayHelp);
        }
    }
}
