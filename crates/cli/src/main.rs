//! promptgate CLI: the main entry point.
//!
//! Commands:
//! - `choice`  pick one option for a question, given optional context
//! - `open`    free-form answer to a prompt, given optional context
//! - `models`  list providers and the default backend's models
//! - `doctor`  check config and backend reachability
//! - `config`  print a config template, or validate the current one

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

mod commands;

use commands::GlobalOpts;
use commands::query::{ChoiceArgs, ContextSource, OpenArgs};

#[derive(Parser, Debug)]
#[command(
    name = "promptgate",
    about = "promptgate: context-bounded choice and open queries against LLM backends",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    /// Override the configured provider
    #[arg(long, global = true, env = "PROMPTGATE_PROVIDER")]
    provider: Option<String>,

    /// Override the configured model
    #[arg(long, global = true, env = "PROMPTGATE_MODEL")]
    model: Option<String>,

    /// Write the audit trail as JSON to this path after the query
    #[arg(long, global = true)]
    audit_out: Option<PathBuf>,

    /// Record the query under this audit stage
    #[arg(long, global = true)]
    stage: Option<String>,
}

#[derive(Args, Debug)]
struct ContextArgs {
    /// Context text to send with the query
    #[arg(short, long, conflicts_with = "context_file")]
    context: Option<String>,

    /// Read context from a file
    #[arg(long)]
    context_file: Option<PathBuf>,

    /// Send the context as-is, even if it exceeds the budget
    #[arg(long)]
    no_compress: bool,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,
}

impl ContextArgs {
    fn source(&self) -> ContextSource {
        ContextSource {
            text: self.context.clone(),
            file: self.context_file.clone(),
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Ask the model to pick one of several options
    Choice {
        /// The question to answer
        #[arg(short, long)]
        question: String,

        /// A candidate answer (repeat for each option)
        #[arg(short = 'o', long = "option", required = true)]
        options: Vec<String>,

        /// Audit label for this query
        #[arg(long, default_value = "choice")]
        label: String,

        #[command(flatten)]
        context: ContextArgs,
    },

    /// Ask the model an open-ended question
    Open {
        /// The prompt to send
        #[arg(short, long)]
        prompt: String,

        /// Audit label for this query
        #[arg(long, default_value = "open")]
        label: String,

        #[command(flatten)]
        context: ContextArgs,
    },

    /// List providers and models
    Models,

    /// Diagnose config and backend health
    Doctor,

    /// Print a config template, or validate the current config
    Config {
        /// Validate the current config instead of printing a template
        #[arg(long)]
        validate: bool,
    },
}

fn init_tracing(verbose: bool, json: bool) {
    let filter = if verbose { "debug" } else { "info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_json);

    let opts = GlobalOpts {
        provider: cli.provider,
        model: cli.model,
        audit_out: cli.audit_out,
        stage: cli.stage,
    };

    match cli.command {
        Commands::Choice {
            question,
            options,
            label,
            context,
        } => {
            let args = ChoiceArgs {
                question,
                options,
                context: context.source(),
                label,
                no_compress: context.no_compress,
                json: context.json,
            };
            commands::query::choice(args, &opts).await?
        }
        Commands::Open {
            prompt,
            label,
            context,
        } => {
            let args = OpenArgs {
                prompt,
                context: context.source(),
                label,
                no_compress: context.no_compress,
                json: context.json,
            };
            commands::query::open(args, &opts).await?
        }
        Commands::Models => commands::models::run(&opts).await?,
        Commands::Doctor => commands::doctor::run(&opts).await?,
        Commands::Config { validate } => {
            if validate {
                commands::config_cmd::validate(&opts)?
            } else {
                commands::config_cmd::template()
            }
        }
    }

    Ok(())
}
