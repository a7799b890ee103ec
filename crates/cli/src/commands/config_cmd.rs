//! `promptgate config`: print a template or validate the current config.

use promptgate_config::AppConfig;
use promptgate_query::ContextBudget;

use super::{GlobalOpts, load_config};

pub fn template() {
    print!("{}", AppConfig::default_toml());
}

pub fn validate(opts: &GlobalOpts) -> Result<(), Box<dyn std::error::Error>> {
    println!("Validating configuration...");

    match load_config(opts) {
        Ok(config) => {
            println!("   Config parsed successfully\n");

            let mut warnings = Vec::new();
            if config.api_key.is_none() && config.default_provider != "ollama" {
                warnings.push(format!(
                    "No API key set for '{}' (set PROMPTGATE_API_KEY or OPENAI_API_KEY)",
                    config.default_provider
                ));
            }
            if !config.compression.enabled {
                warnings.push("Compression disabled; oversized context is sent as-is".to_string());
            }
            for w in &warnings {
                println!("   warning: {w}");
            }
            if !warnings.is_empty() {
                println!();
            }

            let budget = ContextBudget::from_config(&config.compression);
            println!("   Provider:     {}", config.default_provider);
            println!("   Model:        {}", config.default_model);
            println!("   Temperature:  {}", config.default_temperature);
            println!(
                "   Budget:       {} of {} tokens",
                budget.usable_tokens(),
                budget.window_tokens
            );
            println!(
                "   Compression:  {} (chunk {} tokens, up to {} rounds)",
                if config.compression.enabled { "on" } else { "off" },
                config.compression.chunk_tokens,
                config.compression.max_rounds
            );
            println!(
                "   Audit:        {} (stage '{}')",
                if config.audit.enabled { "on" } else { "off" },
                config.audit.default_stage
            );
            Ok(())
        }
        Err(e) => {
            println!("   Config error: {e}");
            Err(e)
        }
    }
}
