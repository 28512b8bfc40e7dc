//! Turns ranked search results into generation context.

use crate::config::DEFAULT_RELEVANCE_FLOOR;
use crate::document::SearchResult;

/// The context text together with the results it was built from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssembledContext {
    /// Labelled blocks separated by blank lines; empty when nothing cleared the floor.
    pub text: String,
    /// The results that cleared the floor, in rank order.
    pub included: Vec<SearchResult>,
}

impl AssembledContext {
    /// Whether no result cleared the relevance floor.
    pub fn is_empty(&self) -> bool {
        self.included.is_empty()
    }
}

/// Applies a relevance floor and formats the surviving results.
#[derive(Debug, Clone, Copy)]
pub struct ContextAssembler {
    relevance_floor: f32,
}

impl Default for ContextAssembler {
    fn default() -> Self {
        Self::new(DEFAULT_RELEVANCE_FLOOR)
    }
}

impl ContextAssembler {
    /// Create an assembler that keeps results scoring strictly above `relevance_floor`.
    pub fn new(relevance_floor: f32) -> Self {
        Self { relevance_floor }
    }

    /// The configured floor.
    pub fn relevance_floor(&self) -> f32 {
        self.relevance_floor
    }

    /// Build the context from `results`, preserving their order.
    ///
    /// Each included result becomes a block:
    ///
    /// ```text
    /// [From guide.md (confidence: 87.34%)]
    /// <chunk text>
    /// ```
    pub fn assemble(&self, results: &[SearchResult]) -> AssembledContext {
        let included: Vec<SearchResult> =
            results.iter().filter(|r| r.score > self.relevance_floor).cloned().collect();

        let text = included
            .iter()
            .map(|r| format!("[From {} (confidence: {:.2}%)]\n{}", r.file_name, r.confidence_percent(), r.text))
            .collect::<Vec<_>>()
            .join("\n\n");

        AssembledContext { text, included }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn floor_is_exclusive_and_order_is_kept() {
        let results = vec![
            SearchResult::new("top", "a.md", 0.9),
            SearchResult::new("edge", "b.md", 0.1),
            SearchResult::new("mid", "c.md", 0.35),
            SearchResult::new("low", "d.md", -0.4),
        ];
        let context = ContextAssembler::default().assemble(&results);
        let files: Vec<&str> = context.included.iter().map(|r| r.file_name.as_str()).collect();
        assert_eq!(files, vec!["a.md", "c.md"]);
        assert_eq!(
            context.text,
            "[From a.md (confidence: 90.00%)]\ntop\n\n[From c.md (confidence: 35.00%)]\nmid"
        );
    }

    #[test]
    fn nothing_above_floor_gives_empty_context() {
        let context = ContextAssembler::new(0.5).assemble(&[SearchResult::new("x", "a.md", 0.2)]);
        assert!(context.is_empty());
        assert_eq!(context.text, "");
    }
}
