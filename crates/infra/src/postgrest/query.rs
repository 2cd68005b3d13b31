//! Translation of [`FailureModeQuery`] into PostgREST query parameters

use amfe_core::{FailureModeOrder, FailureModeQuery};

/// Query string pairs for a `select=*` read of `query`
///
/// Filter values are passed through as typed; characters that PostgREST
/// reserves inside `or=(...)` (commas, parentheses) are not escaped.
pub fn select_params(query: &FailureModeQuery) -> Vec<(&'static str, String)> {
    let mut params = vec![("select", "*".to_string())];

    if let Some(category) = &query.category {
        params.push(("category", format!("eq.{category}")));
    }

    let pattern_filter = query.pattern.as_ref().map(|pattern| pattern_filter(pattern));
    let tags_filter = (!query.any_tags.is_empty()).then(|| any_tags_filter(&query.any_tags));
    match (pattern_filter, tags_filter) {
        (Some(pattern), Some(tags)) => {
            params.push(("and", format!("(or{pattern},or{tags})")));
        }
        (Some(filter), None) | (None, Some(filter)) => params.push(("or", filter)),
        (None, None) => {}
    }

    params.push(("order", order_clause(query.order).to_string()));

    if let Some(limit) = query.limit {
        params.push(("limit", limit.to_string()));
    }
    if let Some(offset) = query.offset {
        params.push(("offset", offset.to_string()));
    }

    params
}

/// `mode` contains `pattern` case-insensitively, or `tags` contains it
fn pattern_filter(pattern: &str) -> String {
    format!("(mode.ilike.*{pattern}*,tags.cs.{{{pattern}}})")
}

fn any_tags_filter(tags: &[String]) -> String {
    let clauses: Vec<String> = tags.iter().map(|tag| format!("tags.cs.{{{tag}}}")).collect();
    format!("({})", clauses.join(","))
}

fn order_clause(order: FailureModeOrder) -> &'static str {
    match order {
        FailureModeOrder::CategoryThenMode => "category.asc,mode.asc",
        FailureModeOrder::Mode => "mode.asc",
    }
}
