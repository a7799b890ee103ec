//! `promptgate choice` and `promptgate open`.

use std::path::PathBuf;

use promptgate_query::{ChoiceQuery, ChoiceResult, OpenQuery, OpenResult};

use super::{GlobalOpts, Session};

/// Where the context for a query comes from.
#[derive(Debug, Clone, Default)]
pub struct ContextSource {
    pub text: Option<String>,
    pub file: Option<PathBuf>,
}

impl ContextSource {
    pub fn read(&self) -> Result<String, Box<dyn std::error::Error>> {
        match (&self.text, &self.file) {
            (Some(text), _) => Ok(text.clone()),
            (None, Some(path)) => std::fs::read_to_string(path)
                .map_err(|e| format!("cannot read context file {}: {e}", path.display()).into()),
            (None, None) => Ok(String::new()),
        }
    }
}

pub struct ChoiceArgs {
    pub question: String,
    pub options: Vec<String>,
    pub context: ContextSource,
    pub label: String,
    pub no_compress: bool,
    pub json: bool,
}

pub struct OpenArgs {
    pub prompt: String,
    pub context: ContextSource,
    pub label: String,
    pub no_compress: bool,
    pub json: bool,
}

pub async fn choice(args: ChoiceArgs, opts: &GlobalOpts) -> Result<(), Box<dyn std::error::Error>> {
    let session = Session::open(opts)?;
    let query = ChoiceQuery::new(args.question, args.options)
        .with_context(args.context.read()?)
        .with_label(args.label)
        .with_auto_compress(!args.no_compress);

    let result = session.orchestrator.choice(query).await?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("{}", render_choice(&result));
    }

    session.finish()
}

pub async fn open(args: OpenArgs, opts: &GlobalOpts) -> Result<(), Box<dyn std::error::Error>> {
    let session = Session::open(opts)?;
    let query = OpenQuery::new(args.prompt)
        .with_context(args.context.read()?)
        .with_label(args.label)
        .with_auto_compress(!args.no_compress);

    let result = session.orchestrator.open(query).await?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("{}", render_open(&result));
    }

    session.finish()
}

pub fn render_choice(result: &ChoiceResult) -> String {
    let mut out = match result.index() {
        Some(i) => format!(
            "{} (option {}, confidence {:.2})",
            result.value,
            i + 1,
            result.confidence
        ),
        None => format!(
            "{} (no option recognised in {:?}; defaulted to the first option)",
            result.value, result.raw
        ),
    };
    if result.context_compressed {
        out.push_str(&format!(
            "\n[context compressed, {} round(s)]",
            result.compression_rounds
        ));
    }
    out
}

pub fn render_open(result: &OpenResult) -> String {
    if result.context_compressed {
        format!(
            "{}\n\n[context compressed, {} round(s)]",
            result.content, result.compression_rounds
        )
    } else {
        result.content.clone()
    }
}
