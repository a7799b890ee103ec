//! ResponseParser trait: turns raw model output into a structured answer.

use serde::{Deserialize, Serialize};

/// Which option the model picked, if any could be recognised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "index", rename_all = "snake_case")]
pub enum Selection {
    /// Zero-based index into the option list.
    Selected(usize),
    /// No valid in-range choice could be extracted.
    Unparseable,
}

impl Selection {
    /// The selected index, if any.
    pub fn index(self) -> Option<usize> {
        match self {
            Self::Selected(i) => Some(i),
            Self::Unparseable => None,
        }
    }
}

/// A parser's verdict on a choice response.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParsedChoice {
    pub selection: Selection,
    /// Certainty in [0, 1]. Parser-defined for the unparseable case.
    pub confidence: f32,
}

impl ParsedChoice {
    pub fn selected(index: usize, confidence: f32) -> Self {
        Self {
            selection: Selection::Selected(index),
            confidence: confidence.clamp(0.0, 1.0),
        }
    }

    pub fn unparseable(confidence: f32) -> Self {
        Self {
            selection: Selection::Unparseable,
            confidence: confidence.clamp(0.0, 1.0),
        }
    }
}

/// Extracts a selection or cleaned prose from raw model output.
///
/// Implementations must be pure: the same input always yields the same output.
pub trait ResponseParser: Send + Sync {
    /// Map `raw` onto one of `options`.
    ///
    /// Options are presented to the model numbered from 1 in the given order;
    /// a returned `Selected(i)` must satisfy `i < options.len()`.
    fn parse_choice(&self, raw: &str, options: &[String]) -> ParsedChoice;

    /// Strip formatting noise from a free-form response.
    fn clean(&self, raw: &str) -> String;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confidence_is_clamped() {
        assert_eq!(ParsedChoice::selected(0, 1.7).confidence, 1.0);
        assert_eq!(ParsedChoice::unparseable(-0.2).confidence, 0.0);
    }

    #[test]
    fn selection_serializes_tagged() {
        let json = serde_json::to_value(Selection::Selected(2)).unwrap();
        assert_eq!(json, serde_json::json!({"status": "selected", "index": 2}));
        let json = serde_json::to_value(Selection::Unparseable).unwrap();
        assert_eq!(json, serde_json::json!({"status": "unparseable"}));
        assert_eq!(Selection::Unparseable.index(), None);
    }
}
