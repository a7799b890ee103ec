//! Prompt assembly for choice and open queries.
//!
//! The choice layout is what [`DefaultResponseParser`](crate::DefaultResponseParser)
//! expects: options numbered from 1, in the order given, followed by an
//! instruction asking for the bare number.

/// Closing instruction of every choice prompt.
pub const CHOICE_INSTRUCTION: &str = "Respond with ONLY the number (1, 2, 3, etc) of your choice:";

/// Build a multiple-choice prompt.
///
/// ```text
/// Context: {context}      <- only when context is non-empty
///
/// {question}
///
/// Options:
/// 1. {first}
/// 2. {second}
///
/// Respond with ONLY the number (1, 2, 3, etc) of your choice:
/// ```
pub fn build_choice_prompt(question: &str, options: &[String], context: &str) -> String {
    let mut parts: Vec<String> = Vec::with_capacity(options.len() + 4);

    if !context.is_empty() {
        parts.push(format!("Context: {context}\n"));
    }

    parts.push(question.to_string());
    parts.push("\nOptions:".to_string());
    parts.extend(
        options
            .iter()
            .enumerate()
            .map(|(i, option)| format!("{}. {option}", i + 1)),
    );
    parts.push(format!("\n{CHOICE_INSTRUCTION}"));

    parts.join("\n")
}

/// Build an open prompt: `"{context}\n\n{prompt}"`, or `prompt` alone when
/// there is no context.
pub fn build_open_prompt(prompt: &str, context: &str) -> String {
    if context.is_empty() {
        prompt.to_string()
    } else {
        format!("{context}\n\n{prompt}")
    }
}

/// First `max_chars` characters of `text`, for log lines and call names.
pub(crate) fn preview(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}
