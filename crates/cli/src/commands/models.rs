//! `promptgate models`: list configured providers and the default backend's models.

use promptgate_providers::build_from_config;

use super::{GlobalOpts, load_config};

pub async fn run(opts: &GlobalOpts) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(opts)?;
    let router = build_from_config(&config);

    println!("Providers:");
    for name in router.list() {
        let marker = if name == router.default_name() { "*" } else { " " };
        println!("  {marker} {name}");
    }

    let Some(provider) = router.default() else {
        return Err(format!("provider '{}' is not configured", config.default_provider).into());
    };

    let models = provider.list_models().await?;
    println!("\nModels on '{}':", provider.name());
    if models.is_empty() {
        println!("  (provider does not list models)");
    }
    for model in models {
        let marker = if model == config.default_model { "*" } else { " " };
        println!("  {marker} {model}");
    }
    Ok(())
}
