pub mod config_cmd;
pub mod doctor;
pub mod models;
pub mod query;

use std::path::PathBuf;
use std::sync::Arc;

use promptgate_config::AppConfig;
use promptgate_core::Provider;
use promptgate_providers::build_from_config;
use promptgate_query::{LlmContextCompressor, QueryOrchestrator};
use promptgate_telemetry::{CallMetrics, ContextTracker};
use tracing::{debug, info};

/// Options shared by every subcommand.
#[derive(Debug, Clone, Default)]
pub struct GlobalOpts {
    pub provider: Option<String>,
    pub model: Option<String>,
    pub audit_out: Option<PathBuf>,
    pub stage: Option<String>,
}

/// Load config and apply command-line overrides.
pub fn load_config(opts: &GlobalOpts) -> Result<AppConfig, Box<dyn std::error::Error>> {
    let mut config = AppConfig::load()?;
    if let Some(provider) = &opts.provider {
        config.default_provider = provider.clone();
    }
    if let Some(model) = &opts.model {
        config.default_model = model.clone();
    }
    Ok(config)
}

/// The configured default provider.
pub fn default_provider(config: &AppConfig) -> Result<Arc<dyn Provider>, Box<dyn std::error::Error>> {
    build_from_config(config)
        .default()
        .ok_or_else(|| format!("provider '{}' is not configured", config.default_provider).into())
}

/// Everything a query command needs, wired from config.
pub struct Session {
    pub orchestrator: QueryOrchestrator,
    pub tracker: Arc<ContextTracker>,
    pub metrics: Arc<CallMetrics>,
    audit_out: Option<PathBuf>,
}

impl Session {
    pub fn open(opts: &GlobalOpts) -> Result<Self, Box<dyn std::error::Error>> {
        let config = load_config(opts)?;
        let provider = default_provider(&config)?;
        Ok(Self::with_provider(&config, provider, opts))
    }

    /// Wire a session around an already-built provider.
    pub fn with_provider(config: &AppConfig, provider: Arc<dyn Provider>, opts: &GlobalOpts) -> Self {
        let tracker = Arc::new(ContextTracker::with_default_stage(&config.audit.default_stage));
        if let Some(stage) = &opts.stage {
            tracker.start_stage(stage);
        }
        let metrics = Arc::new(CallMetrics::new());

        let mut orchestrator = QueryOrchestrator::from_config(config, provider.clone()).with_metrics(metrics.clone());
        if config.audit.enabled {
            let compressor = LlmContextCompressor::new(provider, orchestrator.model(), &config.compression)
                .with_audit_sink(tracker.clone());
            orchestrator = orchestrator
                .with_compressor(Arc::new(compressor))
                .with_audit_sink(tracker.clone());
        }

        info!(
            provider = %config.default_provider,
            model = orchestrator.model(),
            compression = orchestrator.compression_enabled(),
            "Session ready"
        );

        Self {
            audit_out: opts.audit_out.clone().or_else(|| config.audit.export_path.clone()),
            orchestrator,
            tracker,
            metrics,
        }
    }

    /// Export the audit trail if requested and log the call summary.
    pub fn finish(&self) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(path) = &self.audit_out {
            self.tracker.export_to_file(path)?;
        }
        debug!("\n{}", self.metrics.display_summary());
        Ok(())
    }
}
