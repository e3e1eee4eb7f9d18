use anyhow::Context;
use console::style;
use dialoguer::Select;
use tracing::{error, info};

use crate::Result;
use crate::clients::{ClientFactory, HttpClientFactory, Variant};
use crate::config::Config;
use crate::pipeline::{Sample, run_pipeline};

const MENU_ITEMS: [&str; 2] = ["Choose sample", "Quit"];

/// Interactive sample menu, looping until the user quits.
///
/// A failed run is reported and the menu shown again, unless the failure is a
/// configuration fault, which is returned to the caller.
#[inline]
pub async fn run_menu(config: &Config) -> Result<()> {
    run_menu_with(config, &HttpClientFactory).await
}

/// Run the sample for `variant` once and print the answer
#[inline]
pub async fn run_sample(config: &Config, variant: Variant) -> Result<()> {
    run_sample_with(config, variant, &HttpClientFactory).await
}

async fn run_menu_with(config: &Config, factory: &dyn ClientFactory) -> Result<()> {
    loop {
        let choice = Select::new()
            .with_prompt("What would you like to do?")
            .items(&MENU_ITEMS)
            .default(0)
            .interact_opt()
            .context("Failed to read menu choice")?;

        if choice != Some(0) {
            info!("Leaving sample menu");
            return Ok(());
        }

        let Some(variant) = choose_sample()? else {
            continue;
        };

        match run_sample_with(config, variant, factory).await {
            Ok(()) => {}
            Err(e) if e.is_config() => return Err(e),
            Err(e) => {
                error!("Sample '{}' failed: {}", variant, e);
                eprintln!("{}", style(format!("✗ {e}")).red());
                eprintln!();
            }
        }
    }
}

fn choose_sample() -> Result<Option<Variant>> {
    let names: Vec<&str> = Variant::ALL.iter().map(|v| v.sample_name()).collect();

    let index = Select::new()
        .with_prompt("Choose sample")
        .items(&names)
        .default(0)
        .interact_opt()
        .context("Failed to read sample choice")?;

    Ok(index.and_then(|i| Variant::ALL.get(i).copied()))
}

async fn run_sample_with(
    config: &Config,
    variant: Variant,
    factory: &dyn ClientFactory,
) -> Result<()> {
    eprintln!("{}", style(format!("▶ {variant}")).bold().cyan());

    let sample = Sample::for_variant(variant);
    let output = run_pipeline(config, variant, &sample, factory).await?;

    println!("{}", output.answer);
    println!();
    Ok(())
}
