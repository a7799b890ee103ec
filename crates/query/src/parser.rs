//! Default response parser: numeral extraction and prose cleanup.
//!
//! Choice responses are matched against a fixed ladder; the first rule that
//! produces an in-range option wins:
//!
//! | Rule | Example (3 options) | Confidence |
//! |------|---------------------|-----------:|
//! | whole response is the number | `2`, `2.` | 1.0 |
//! | response starts with the number | `2 - because...` | 0.9 |
//! | first in-range number anywhere | `I pick option 2` | 0.7 |
//! | no in-range number | `B`, `two`, `7` | 0.0 |
//!
//! Only numerals count. Option text and spelled-out numbers never select an
//! option, so a response without an in-range numeral is always unparseable.

use std::sync::LazyLock;

use promptgate_core::{ParsedChoice, ResponseParser};
use regex_lite::Regex;
use tracing::{debug, warn};

struct Patterns {
    number: Regex,
    think: Regex,
    fence: Regex,
    label: Regex,
    blank_runs: Regex,
}

impl Patterns {
    fn compile() -> Option<Self> {
        Some(Self {
            number: Regex::new(r"\d+").ok()?,
            think: Regex::new(r"(?is)<think>.*?</think>").ok()?,
            fence: Regex::new(r"(?s)^```[A-Za-z0-9_+-]*[ \t]*\n(.*?)\n?```$").ok()?,
            label: Regex::new(r"(?i)^(answer|response)\s*:\s*").ok()?,
            blank_runs: Regex::new(r"\n{3,}").ok()?,
        })
    }
}

static PATTERNS: LazyLock<Option<Patterns>> = LazyLock::new(Patterns::compile);

/// Rule-based [`ResponseParser`] for small local models.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultResponseParser;

impl DefaultResponseParser {
    pub fn new() -> Self {
        Self
    }
}

fn in_range(k: usize, n: usize) -> Option<usize> {
    (1..=n).contains(&k).then(|| k - 1)
}

impl ResponseParser for DefaultResponseParser {
    fn parse_choice(&self, raw: &str, options: &[String]) -> ParsedChoice {
        let Some(p) = PATTERNS.as_ref() else {
            warn!("Response patterns unavailable; treating choice as unparseable");
            return ParsedChoice::unparseable(0.0);
        };
        let n = options.len();
        let text = self.clean(raw);

        // Bare number, optionally followed by "." or ")"
        let bare = text.trim_end_matches(['.', ')']).trim();
        if let Some(i) = bare.parse::<usize>().ok().and_then(|k| in_range(k, n)) {
            return ParsedChoice::selected(i, 1.0);
        }

        let numbers: Vec<_> = p
            .number
            .find_iter(&text)
            .filter_map(|m| m.as_str().parse::<usize>().ok().map(|k| (m.start(), k)))
            .collect();

        if let Some(i) = numbers
            .first()
            .filter(|(start, _)| *start == 0)
            .and_then(|&(_, k)| in_range(k, n))
        {
            return ParsedChoice::selected(i, 0.9);
        }

        if let Some(i) = numbers.iter().find_map(|&(_, k)| in_range(k, n)) {
            return ParsedChoice::selected(i, 0.7);
        }

        debug!(response = %text, options = n, "No option recognised in response");
        ParsedChoice::unparseable(0.0)
    }

    fn clean(&self, raw: &str) -> String {
        let Some(p) = PATTERNS.as_ref() else {
            return raw.trim().to_string();
        };

        let without_think = p.think.replace_all(raw, "");
        let mut text = without_think.trim().to_string();

        if let Some(inner) = p.fence.captures(&text).and_then(|c| c.get(1)) {
            text = inner.as_str().trim().to_string();
        }

        let text = p.label.replace(&text, "");
        let text = p.blank_runs.replace_all(&text, "\n\n");
        text.trim().to_string()
    }
}
