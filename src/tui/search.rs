//! Fuzzy ranking for the field picker's `/` filter.
//!
//! Whitespace-separated terms must all match one field; the best weighted
//! field decides an item's score.

use nucleo::{
    pattern::{CaseMatching, Normalization, Pattern},
    Config, Matcher, Utf32Str,
};

pub struct FuzzySearch {
    matcher: Matcher,
}

impl Default for FuzzySearch {
    fn default() -> Self {
        Self::new()
    }
}

impl FuzzySearch {
    pub fn new() -> Self {
        Self {
            matcher: Matcher::new(Config::DEFAULT),
        }
    }

    fn match_term(&mut self, term: &str, haystack: &str) -> Option<u32> {
        if term.is_empty() || haystack.is_empty() {
            return if term.is_empty() { Some(0) } else { None };
        }

        let pattern = Pattern::parse(term, CaseMatching::Ignore, Normalization::Smart);
        let mut haystack_buf = Vec::new();
        let haystack_utf32 = Utf32Str::new(haystack, &mut haystack_buf);

        pattern.score(haystack_utf32, &mut self.matcher)
    }

    /// Sum of per-term scores, `None` if any term misses.
    pub fn multi_term_match(&mut self, query: &str, haystack: &str) -> Option<u32> {
        let mut total_score = 0u32;
        for term in query.split_whitespace() {
            total_score = total_score.saturating_add(self.match_term(term, haystack)?);
        }
        Some(total_score)
    }

    /// Best weighted score across `(text, weight)` fields.
    pub fn best_field_score(&mut self, query: &str, fields: &[(&str, u32)]) -> Option<u32> {
        fields
            .iter()
            .filter_map(|(text, weight)| {
                self.multi_term_match(query, text)
                    .map(|score| score.saturating_mul(*weight))
            })
            .max()
    }

    /// Indices of `items` matching `query`, best score first, ties in input order.
    pub fn rank<T>(
        &mut self,
        query: &str,
        items: &[T],
        fields: impl Fn(&T) -> Vec<(&str, u32)>,
    ) -> Vec<usize> {
        if query.trim().is_empty() {
            return (0..items.len()).collect();
        }
        let mut scored: Vec<(usize, u32)> = items
            .iter()
            .enumerate()
            .filter_map(|(idx, item)| {
                self.best_field_score(query, &fields(item))
                    .map(|score| (idx, score))
            })
            .collect();
        scored.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        scored.into_iter().map(|(idx, _)| idx).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multi_term_requires_all_terms() {
        let mut search = FuzzySearch::new();
        assert!(search.multi_term_match("story pts", "Story Points").is_some());
        assert!(search.multi_term_match("story sprint", "Story Points").is_none());
        assert_eq!(search.multi_term_match("", "anything"), Some(0));
    }

    #[test]
    fn test_rank_filters_and_keeps_everything_for_empty_query() {
        let mut search = FuzzySearch::new();
        let items = vec!["Sprint", "Story Points", "Team"];
        assert_eq!(search.rank("", &items, |s| vec![(*s, 1)]), vec![0, 1, 2]);
        let ranked = search.rank("team", &items, |s| vec![(*s, 1)]);
        assert_eq!(ranked, vec![2]);
    }
}
