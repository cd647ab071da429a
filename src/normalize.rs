//! Address normalization for geocoding queries.

/// Placeholder that spreadsheet exports emit for missing cells.
const EMPTY_MARKER: &str = "nan";

/// Build the canonical address string from the raw region fields.
///
/// Fields are trimmed, empty or placeholder values are dropped, and the
/// survivors are joined with single spaces in fixed order
/// province → county → sub-district. Returns an empty string when every
/// field is empty; callers must treat that as "cannot geocode" and skip
/// the record.
pub fn build_address(province: &str, county: &str, sub_district: &str) -> String {
    [province, county, sub_district]
        .iter()
        .map(|part| part.trim())
        .filter(|part| !part.is_empty() && !part.eq_ignore_ascii_case(EMPTY_MARKER))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_joins_fields_in_fixed_order() {
        assert_eq!(
            build_address("서울특별시", "종로구", "청운효자동"),
            "서울특별시 종로구 청운효자동"
        );
    }

    #[test]
    fn test_trims_whitespace() {
        assert_eq!(
            build_address("  경기도 ", " 수원시 ", " 장안구\t"),
            "경기도 수원시 장안구"
        );
    }

    #[test]
    fn test_skips_empty_and_placeholder_fields() {
        assert_eq!(build_address("부산광역시", "", "중앙동"), "부산광역시 중앙동");
        assert_eq!(build_address("부산광역시", "nan", "중앙동"), "부산광역시 중앙동");
        assert_eq!(build_address("", "NaN", "  "), "");
    }

    #[test]
    fn test_single_surviving_field() {
        assert_eq!(build_address("nan", "제주시", "nan"), "제주시");
    }
}
