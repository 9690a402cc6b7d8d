pub mod extract;
pub mod extractors;
pub mod health;
pub mod url_configurations;
pub mod url_mappings;

use crate::api::errors::ApiError;
use crate::error::CoreError;

/// Shared request validation for list endpoints: `limit ∈ [1,1000]`,
/// `skip ≥ 0`, `sort_order ∈ {asc,desc}`.
pub(crate) fn validate_listing(
    limit: Option<i64>,
    skip: Option<i64>,
    sort_order: Option<&str>,
) -> Result<(), ApiError> {
    if let Some(limit) = limit {
        if !(1..=1000).contains(&limit) {
            return Err(CoreError::Validation("limit must be between 1 and 1000".to_string()).into());
        }
    }
    if let Some(skip) = skip {
        if skip < 0 {
            return Err(CoreError::Validation("skip must be >= 0".to_string()).into());
        }
    }
    if let Some(sort_order) = sort_order {
        if sort_order != "asc" && sort_order != "desc" {
            return Err(
                CoreError::Validation("sort_order must be 'asc' or 'desc'".to_string()).into(),
            );
        }
    }
    Ok(())
}

/// The stores' own `list`/`search` queries are always `ORDER BY ... DESC`;
/// `sort_order = "asc"` reverses that order here rather than threading a
/// second query variant through every store method. Default (`None` or
/// `"desc"`) is a no-op.
pub(crate) fn apply_sort_order<T>(mut items: Vec<T>, sort_order: Option<&str>) -> Vec<T> {
    if sort_order == Some("asc") {
        items.reverse();
    }
    items
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn asc_reverses_the_default_descending_order() {
        assert_eq!(apply_sort_order(vec![3, 2, 1], Some("asc")), vec![1, 2, 3]);
    }

    #[test]
    fn desc_and_unspecified_are_no_ops() {
        assert_eq!(apply_sort_order(vec![3, 2, 1], Some("desc")), vec![3, 2, 1]);
        assert_eq!(apply_sort_order(vec![3, 2, 1], None), vec![3, 2, 1]);
    }
}
