use arrow::array::{Float64Array, StringArray};

use crate::process::utils;

/// Estimate text → f64; anything unparseable becomes null.
pub fn to_estimates(values: &StringArray) -> Float64Array {
    values
        .iter()
        .map(|opt| opt.and_then(utils::parse_estimate))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::Array;

    #[test]
    fn placeholders_become_null() {
        let raw = StringArray::from(vec![Some("100"), Some("."), None, Some(" 7 ")]);
        let out = to_estimates(&raw);
        assert_eq!(out.len(), 4);
        assert_eq!(out.value(0), 100.0);
        assert!(out.is_null(1));
        assert!(out.is_null(2));
        assert_eq!(out.value(3), 7.0);
    }
}
