//! Query requests.
//!
//! Both requests default to no context, their kind as the audit label, and
//! automatic compression on.

/// A multiple-choice question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChoiceQuery {
    pub question: String,
    /// Candidate answers, presented to the model numbered from 1.
    pub options: Vec<String>,
    pub context: String,
    /// Prefix for audit keys and the request's `context_name`.
    pub label: String,
    pub auto_compress: bool,
}

impl ChoiceQuery {
    pub fn new<I, S>(question: impl Into<String>, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            question: question.into(),
            options: options.into_iter().map(Into::into).collect(),
            context: String::new(),
            label: "choice".into(),
            auto_compress: true,
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = context.into();
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_auto_compress(mut self, auto_compress: bool) -> Self {
        self.auto_compress = auto_compress;
        self
    }
}

/// An open-ended prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenQuery {
    pub prompt: String,
    pub context: String,
    pub label: String,
    pub auto_compress: bool,
}

impl OpenQuery {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            context: String::new(),
            label: "open".into(),
            auto_compress: true,
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = context.into();
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_auto_compress(mut self, auto_compress: bool) -> Self {
        self.auto_compress = auto_compress;
        self
    }
}
