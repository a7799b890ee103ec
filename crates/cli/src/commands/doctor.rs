//! `promptgate doctor`: check config and backend reachability.

use promptgate_config::AppConfig;
use promptgate_query::ContextBudget;

use super::{GlobalOpts, default_provider, load_config};

pub async fn run(opts: &GlobalOpts) -> Result<(), Box<dyn std::error::Error>> {
    println!("promptgate doctor");
    println!("=================\n");

    let mut issues = 0;

    let config_path = AppConfig::config_dir().join("config.toml");
    if config_path.exists() {
        println!("  ok    config file at {}", config_path.display());
    } else {
        println!("  note  no config file, using defaults (run `promptgate config` for a template)");
    }

    let config = match load_config(opts) {
        Ok(config) => {
            println!("  ok    config valid");
            config
        }
        Err(e) => {
            println!("  FAIL  config invalid: {e}");
            println!("\n  1 issue found.");
            return Ok(());
        }
    };

    let budget = ContextBudget::from_config(&config.compression);
    println!(
        "  ok    context budget: {} usable tokens of {} (compression {})",
        budget.usable_tokens(),
        budget.window_tokens,
        if config.compression.enabled { "on" } else { "off" }
    );

    match default_provider(&config) {
        Ok(provider) => {
            match provider.health_check().await {
                Ok(true) => println!("  ok    provider '{}' reachable", provider.name()),
                Ok(false) => {
                    println!("  FAIL  provider '{}' unhealthy", provider.name());
                    issues += 1;
                }
                Err(e) => {
                    println!("  FAIL  provider '{}' unreachable: {e}", provider.name());
                    issues += 1;
                }
            }

            let model = config
                .provider(&config.default_provider)
                .and_then(|p| p.default_model.clone())
                .unwrap_or_else(|| config.default_model.clone());
            match provider.list_models().await {
                Ok(models) if models.is_empty() => {
                    println!("  note  provider does not list models; using '{model}'");
                }
                Ok(models) if models.iter().any(|m| m == &model) => {
                    println!("  ok    model '{model}' available");
                }
                Ok(_) => {
                    println!("  FAIL  model '{model}' not offered by '{}'", provider.name());
                    issues += 1;
                }
                Err(e) => {
                    println!("  FAIL  cannot list models: {e}");
                    issues += 1;
                }
            }
        }
        Err(e) => {
            println!("  FAIL  {e}");
            issues += 1;
        }
    }

    println!();
    if issues == 0 {
        println!("  All checks passed.");
    } else {
        println!("  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}
