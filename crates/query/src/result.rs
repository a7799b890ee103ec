//! Results returned to query callers.

use promptgate_core::Selection;
use serde::{Deserialize, Serialize};

/// Index reported by [`ChoiceResult::raw_index`] when no option could be parsed.
pub const UNPARSEABLE_INDEX: i64 = -1;

/// Outcome of a multiple-choice query.
///
/// `value` is always one of the offered options: the selected one, or the
/// first option when the response could not be parsed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChoiceResult {
    pub selection: Selection,
    pub value: String,
    /// Parser certainty in [0, 1].
    pub confidence: f32,
    /// Model output, whitespace-trimmed.
    pub raw: String,
    pub context_compressed: bool,
    /// 0 unless the context was compressed.
    pub compression_rounds: u32,
}

impl ChoiceResult {
    /// Zero-based index of the selected option.
    pub fn index(&self) -> Option<usize> {
        self.selection.index()
    }

    /// Index as a signed integer, [`UNPARSEABLE_INDEX`] when nothing was selected.
    pub fn raw_index(&self) -> i64 {
        self.index().map_or(UNPARSEABLE_INDEX, |i| i as i64)
    }

    pub fn is_selected(&self) -> bool {
        matches!(self.selection, Selection::Selected(_))
    }
}

/// Outcome of an open-ended query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenResult {
    /// `raw` after the parser's cleaning pass.
    pub content: String,
    /// Model output, whitespace-trimmed.
    pub raw: String,
    pub context_compressed: bool,
    pub compression_rounds: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn choice(selection: Selection) -> ChoiceResult {
        ChoiceResult {
            selection,
            value: "A".into(),
            confidence: 0.0,
            raw: String::new(),
            context_compressed: false,
            compression_rounds: 0,
        }
    }

    #[test]
    fn raw_index_uses_sentinel() {
        assert_eq!(choice(Selection::Selected(2)).raw_index(), 2);
        assert_eq!(choice(Selection::Unparseable).raw_index(), UNPARSEABLE_INDEX);
        assert!(!choice(Selection::Unparseable).is_selected());
        assert_eq!(choice(Selection::Selected(0)).index(), Some(0));
    }

    #[test]
    fn choice_result_serializes_selection_tagged() {
        let json = serde_json::to_value(choice(Selection::Selected(1))).unwrap();
        assert_eq!(json["selection"]["status"], "selected");
        assert_eq!(json["selection"]["index"], 1);
        assert_eq!(json["compression_rounds"], 0);
    }
}
