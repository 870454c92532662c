//! Pure-schema assembly: cut the embedded regions out of a composite
//! source.

use gqlx_types::Span;

/// Remove every span of `regions` from `source`.
///
/// `regions` must be sorted by start and non-overlapping. Offsets past the
/// end of `source` are clamped; an empty list returns `source` unchanged.
pub fn excise(source: &str, regions: &[Span]) -> String {
    let len = source.len();
    let mut out = String::with_capacity(len);
    let mut cursor = 0;

    for region in regions {
        let start = region.start.min(len);
        if start > cursor {
            out.push_str(source.get(cursor..start).unwrap_or_default());
        }
        cursor = cursor.max(region.end.min(len));
    }

    out.push_str(source.get(cursor..).unwrap_or_default());
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEXT: &str = "abcdefgh";

    #[test]
    fn test_no_regions() {
        assert_eq!(excise(TEXT, &[]), TEXT);
    }

    #[test]
    fn test_single_region() {
        assert_eq!(excise(TEXT, &[Span::new(2, 4)]), "abefgh");
    }

    #[test]
    fn test_two_regions_in_order() {
        assert_eq!(excise(TEXT, &[Span::new(2, 4), Span::new(6, 8)]), "abef");
    }

    #[test]
    fn test_end_is_clamped() {
        assert_eq!(excise(TEXT, &[Span::new(2, 10)]), "ab");
        assert_eq!(excise(TEXT, &[Span::new(12, 20)]), TEXT);
    }

    #[test]
    fn test_region_text_is_gone_from_schema() {
        let src = "type Query { a: Int { get('x') } }";
        let open = src.find("{ get").unwrap();
        let close = src.find(") }").unwrap() + 3;
        assert_eq!(excise(src, &[Span::new(open, close)]), "type Query { a: Int  }");
    }
}
