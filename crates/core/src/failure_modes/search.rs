//! In-memory search over a loaded record set
//!
//! Order of operations: category equality, then case-insensitive substring
//! match on `mode` or any tag, then a stable sort by `(category, mode)`, then
//! the `[offset, offset + limit)` window. Strings compare byte-wise.

use std::collections::BTreeSet;

use amfe_domain::{FailureMode, FailureModeSearchParams};

/// Filter, sort and page `records` according to `params`
pub fn apply_search_params(
    records: Vec<FailureMode>,
    params: &FailureModeSearchParams,
) -> Vec<FailureMode> {
    let category = params.category_filter();
    let needle = params.search_text().map(str::to_lowercase);

    let mut results: Vec<FailureMode> = records
        .into_iter()
        .filter(|fm| category.map_or(true, |c| fm.category == c))
        .filter(|fm| needle.as_deref().map_or(true, |n| fm.matches_text(n)))
        .collect();

    results.sort_by(|a, b| a.category.cmp(&b.category).then_with(|| a.mode.cmp(&b.mode)));

    let start = params.page_offset().unwrap_or(0);
    match params.page_limit() {
        Some(limit) => results.into_iter().skip(start).take(limit).collect(),
        None => results.into_iter().skip(start).collect(),
    }
}

/// Sorted distinct categories
pub fn distinct_sorted_categories<'a>(categories: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    categories.into_iter().collect::<BTreeSet<_>>().into_iter().map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    fn fm(id: &str, category: &str, mode: &str, tags: &[&str]) -> FailureMode {
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        FailureMode {
            id: id.to_string(),
            category: category.to_string(),
            mode: mode.to_string(),
            common_causes: vec![],
            severity_default: 5,
            tags: tags.iter().map(|t| t.to_string()).collect(),
            created_at: ts,
            updated_at: ts,
        }
    }

    fn library() -> Vec<FailureMode> {
        vec![
            fm("1", "Mechanical", "Wear", &["Friction"]),
            fm("2", "Electrical", "Short circuit", &["Wiring"]),
            fm("3", "Mechanical", "Fatigue", &["Cyclic load"]),
            fm("4", "Electrical", "Open circuit", &["Connector"]),
            fm("5", "Software", "Deadlock", &["Concurrency"]),
        ]
    }

    fn ids(records: &[FailureMode]) -> Vec<&str> {
        records.iter().map(|r| r.id.as_str()).collect()
    }

    #[test]
    fn test_no_params_returns_everything_sorted() {
        let results = apply_search_params(library(), &FailureModeSearchParams::default());
        assert_eq!(ids(&results), vec!["4", "2", "3", "1", "5"]);
    }

    #[test]
    fn test_category_then_text_filter() {
        let params = FailureModeSearchParams::default()
            .with_category("Electrical")
            .with_search("CIRCUIT");
        let results = apply_search_params(library(), &params);
        assert_eq!(ids(&results), vec!["4", "2"]);
    }

    #[test]
    fn test_text_matches_tags() {
        let params = FailureModeSearchParams::default().with_search("concurr");
        assert_eq!(ids(&apply_search_params(library(), &params)), vec!["5"]);
    }

    #[test]
    fn test_pagination_window() {
        let params = FailureModeSearchParams::default().with_offset(1).with_limit(2);
        assert_eq!(ids(&apply_search_params(library(), &params)), vec!["2", "3"]);

        let offset_only = FailureModeSearchParams::default().with_offset(3);
        assert_eq!(ids(&apply_search_params(library(), &offset_only)), vec!["1", "5"]);

        let past_end = FailureModeSearchParams::default().with_offset(10).with_limit(5);
        assert!(apply_search_params(library(), &past_end).is_empty());
    }

    #[test]
    fn test_limit_is_upper_bound() {
        for limit in 1..=7 {
            let params = FailureModeSearchParams::default().with_limit(limit);
            assert!(apply_search_params(library(), &params).len() <= limit);
        }
    }

    #[test]
    fn test_sort_is_stable_for_equal_keys() {
        let records = vec![
            fm("a", "X", "Same", &[]),
            fm("b", "X", "Same", &[]),
            fm("c", "X", "Same", &[]),
        ];
        let results = apply_search_params(records, &FailureModeSearchParams::default());
        assert_eq!(ids(&results), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_distinct_sorted_categories() {
        let categories = distinct_sorted_categories(["b", "a", "b", "c", "a"]);
        assert_eq!(categories, vec!["a", "b", "c"]);
    }
}
