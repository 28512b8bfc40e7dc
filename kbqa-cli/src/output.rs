//! Plain-text rendering of answers and search results.

use kbqa_rag::{AnswerResult, SearchResult};

const PREVIEW_CHARS: usize = 100;

/// One `- **file** (confidence: 87.34%)` line per source.
pub fn format_sources(results: &[SearchResult]) -> String {
    results
        .iter()
        .map(|r| format!("- **{}** (confidence: {:.2}%)", r.file_name, r.confidence_percent()))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn format_answer(result: &AnswerResult) -> String {
    let mut out = result.answer.trim_end().to_string();
    if !result.search_results.is_empty() {
        out.push_str("\n\nSources:\n");
        out.push_str(&format_sources(&result.search_results));
    }
    out
}

/// Numbered ranking with a short preview of each source's best chunk.
pub fn format_search_results(results: &[SearchResult]) -> String {
    if results.is_empty() {
        return "No matching sources.".to_string();
    }
    let mut out = String::new();
    for (rank, result) in results.iter().enumerate() {
        if rank > 0 {
            out.push('\n');
        }
        out.push_str(&format!(
            "{}. {} (score: {:.4})\n   {}",
            rank + 1,
            result.file_name,
            result.score,
            result.preview(PREVIEW_CHARS).replace('\n', " ")
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sources_render_confidence_with_two_decimals() {
        let results = vec![SearchResult::new("a", "guide.md", 0.87341), SearchResult::new("b", "x.md", 0.5)];
        assert_eq!(
            format_sources(&results),
            "- **guide.md** (confidence: 87.34%)\n- **x.md** (confidence: 50.00%)"
        );
    }

    #[test]
    fn empty_search_has_a_message() {
        assert_eq!(format_search_results(&[]), "No matching sources.");
    }

    #[test]
    fn search_lines_are_numbered_and_flattened() {
        let results = vec![SearchResult::new("line one\nline two", "guide.md", 0.5)];
        assert_eq!(format_search_results(&results), "1. guide.md (score: 0.5000)\n   line one line two");
    }
}
