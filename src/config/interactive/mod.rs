
use anyhow::{Context, Result};
use console::style;
use dialoguer::{Confirm, Input, Password, Select};
use std::path::Path;

use super::{Config, ConfigError, HostedConfig, LocalConfig, Secrets, TOKEN_SETTING};

#[inline]
pub fn run_interactive_config(config_dir: &Path) -> Result<()> {
    eprintln!("{}", style("🔧 RAG Console Configuration Setup").bold().cyan());
    eprintln!();

    let mut config = load_existing_config(config_dir);
    let mut secrets = Secrets::load(config_dir).context("Failed to load secret store")?;

    eprintln!("{}", style("Hosted API").bold().yellow());
    eprintln!("Configure the OpenAI-compatible endpoint used by the hosted sample.");
    eprintln!();
    configure_hosted(&mut config.hosted)?;
    configure_token(&mut secrets)?;

    eprintln!();
    eprintln!("{}", style("Local Ollama").bold().yellow());
    eprintln!("Configure the local Ollama instance used by the Ollama sample.");
    eprintln!();
    configure_local(&mut config.local)?;

    eprintln!();
    eprintln!("{}", style("Testing configuration...").yellow());

    if test_ollama_connection(&config.local) {
        eprintln!("{}", style("✓ Ollama connection successful!").green());
    } else {
        eprintln!(
            "{}",
            style("⚠ Warning: Could not connect to Ollama").yellow()
        );
        eprintln!("You can continue, but make sure Ollama is running before the local sample.");
    }

    eprintln!();
    if Confirm::new()
        .with_prompt("Save configuration?")
        .default(true)
        .interact()?
    {
        config.save().context("Failed to save configuration")?;
        secrets
            .save(config_dir)
            .context("Failed to save secret store")?;
        eprintln!("{}", style("✓ Configuration saved successfully!").green());
        eprintln!(
            "Configuration saved to: {}",
            style(config.config_file_path().display()).cyan()
        );
    } else {
        eprintln!("Configuration not saved.");
    }

    Ok(())
}

#[inline]
pub fn show_config(config_dir: &Path) -> Result<()> {
    let config = Config::load(config_dir).context("Failed to load configuration")?;

    eprintln!("{}", style("📋 Current Configuration").bold().cyan());
    eprintln!();

    eprintln!("{}", style("Hosted Settings:").bold().yellow());
    eprintln!("  Endpoint: {}", style(&config.hosted.endpoint).cyan());
    eprintln!("  Chat Model: {}", style(&config.hosted.chat_model).cyan());
    eprintln!(
        "  Embedding Model: {} ({} dimensions)",
        style(&config.hosted.embedding_model).cyan(),
        config.hosted.embedding_dimension
    );
    let token_state = match config.github_token() {
        Ok(_) => style("set".to_string()).green(),
        Err(ConfigError::MissingToken(_)) => style("missing".to_string()).red(),
        Err(e) => style(format!("unreadable ({e})")).red(),
    };
    eprintln!("  {}: {}", TOKEN_SETTING, token_state);

    eprintln!();
    eprintln!("{}", style("Ollama Settings:").bold().yellow());
    match config.local.ollama_url() {
        Ok(url) => eprintln!("  Ollama URL: {}", style(url).cyan()),
        Err(e) => eprintln!("  Ollama URL: {} ({})", style("Invalid").red(), e),
    }
    eprintln!("  Chat Model: {}", style(&config.local.chat_model).cyan());
    eprintln!(
        "  Embedding Model: {} ({} dimensions)",
        style(&config.local.embedding_model).cyan(),
        config.local.embedding_dimension
    );

    eprintln!();
    eprintln!("{}", style("Retrieval Settings:").bold().yellow());
    eprintln!("  Collection: {}", style(&config.retrieval.collection).cyan());
    eprintln!("  Top K: {}", style(config.retrieval.top_k).cyan());

    eprintln!();
    eprintln!(
        "Config file: {}",
        style(config.config_file_path().display()).dim()
    );

    Ok(())
}

fn load_existing_config(config_dir: &Path) -> Config {
    Config::load(config_dir).unwrap_or_else(|_| {
        eprintln!(
            "{}",
            style("No usable configuration found. Using defaults.").yellow()
        );
        Config {
            base_dir: config_dir.to_path_buf(),
            ..Config::default()
        }
    })
}

fn configure_hosted(hosted: &mut HostedConfig) -> Result<()> {
    let endpoint: String = Input::new()
        .with_prompt("Hosted endpoint")
        .default(hosted.endpoint.clone())
        .validate_with(|input: &String| -> Result<(), ConfigError> {
            let temp_config = HostedConfig {
                endpoint: input.clone(),
                ..HostedConfig::default()
            };
            temp_config.endpoint_url()?;
            Ok(())
        })
        .interact_text()?;

    hosted.set_endpoint(endpoint)?;
    Ok(())
}

fn configure_token(secrets: &mut Secrets) -> Result<()> {
    let prompt = if secrets.github_token().is_some() {
        format!("{} (leave empty to keep the stored value)", TOKEN_SETTING)
    } else {
        TOKEN_SETTING.to_string()
    };

    let token = Password::new()
        .with_prompt(prompt)
        .allow_empty_password(true)
        .interact()?;

    if !token.trim().is_empty() {
        secrets.set_github_token(token.trim().to_string());
    }
    Ok(())
}

fn configure_local(local: &mut LocalConfig) -> Result<()> {
    let protocols = &["http", "https"];
    let default_index = protocols
        .iter()
        .position(|&p| p == local.protocol)
        .unwrap_or(0);

    let protocol_index = Select::new()
        .with_prompt("Ollama protocol")
        .default(default_index)
        .items(protocols)
        .interact()?;

    let protocol = protocols[protocol_index].to_string();

    let host: String = Input::new()
        .with_prompt("Ollama host")
        .default(local.host.clone())
        .validate_with(|input: &String| -> Result<(), ConfigError> {
            let temp_config = LocalConfig {
                protocol: protocol.clone(),
                host: input.clone(),
                ..LocalConfig::default()
            };
            temp_config.validate()?;
            Ok(())
        })
        .interact_text()?;

    let port: u16 = Input::new()
        .with_prompt("Ollama port")
        .default(local.port)
        .validate_with(|input: &u16| -> Result<(), &str> {
            if *input == 0 {
                Err("Port must be greater than 0")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    let chat_model: String = Input::new()
        .with_prompt("Chat model")
        .default(local.chat_model.clone())
        .validate_with(|input: &String| -> Result<(), &str> {
            if input.trim().is_empty() {
                Err("Model name cannot be empty")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    let embedding_model: String = Input::new()
        .with_prompt("Embedding model")
        .default(local.embedding_model.clone())
        .validate_with(|input: &String| -> Result<(), &str> {
            if input.trim().is_empty() {
                Err("Model name cannot be empty")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    let embedding_dimension: u32 = Input::new()
        .with_prompt("Embedding dimension")
        .default(local.embedding_dimension)
        .validate_with(|input: &u32| -> Result<(), &str> {
            if (64..=4096).contains(input) {
                Ok(())
            } else {
                Err("Dimension must be between 64 and 4096")
            }
        })
        .interact_text()?;

    local.set_protocol(protocol)?;
    local.set_host(host)?;
    local.set_port(port)?;
    local.set_chat_model(chat_model)?;
    local.set_embedding_model(embedding_model)?;
    local.set_embedding_dimension(embedding_dimension)?;

    Ok(())
}

fn test_ollama_connection(local: &LocalConfig) -> bool {
    let Ok(url) = local.ollama_url().and_then(|base| {
        base.join("api/version")
            .map_err(|_| ConfigError::InvalidUrl(base.to_string()))
    }) else {
        return false;
    };

    let agent: ureq::Agent = ureq::Agent::config_builder()
        .timeout_global(Some(std::time::Duration::from_secs(5)))
        .build()
        .into();

    match agent.get(url.as_str()).call() {
        Ok(_) => true,
        Err(ureq::Error::StatusCode(code)) => (400..500).contains(&code),
        Err(_) => false,
    }
}
