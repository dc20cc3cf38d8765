//! Line-oriented parser for `key: value  # comment` parameter files.

use super::{ParamValue, ParameterSet};
use regex::Regex;
use std::sync::OnceLock;

fn inline_comment() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+#").unwrap_or_else(|e| unreachable!("static regex: {e}")))
}

/// Splits one line into a key and its coerced value.
///
/// Returns `None` for lines that carry no parameter: no `:` at all, or a
/// first non-blank character of `#`.
pub fn parse_line(line: &str) -> Option<(String, ParamValue)> {
    if !line.contains(':') || line.trim().starts_with('#') {
        return None;
    }

    let (key, value) = line.split_once(':')?;
    let value = value.trim();
    let value = inline_comment().split(value).next().unwrap_or(value);

    Some((key.trim().to_string(), ParamValue::coerce(value)))
}

/// Parses a whole parameter file body.
pub fn parse_text(text: &str) -> ParameterSet {
    let mut params = ParameterSet::new();
    for (key, value) in text.lines().filter_map(parse_line) {
        params.insert(key, value);
    }
    params
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inline_comment_stripped_before_coercion() {
        let (key, value) = parse_line("num_events: 500  # five hundred").unwrap();
        assert_eq!(key, "num_events");
        assert_eq!(value, ParamValue::Int(500));
    }

    #[test]
    fn test_hash_without_leading_space_is_kept() {
        let (_, value) = parse_line("foil_material: W#2").unwrap();
        assert_eq!(value, ParamValue::from("W#2"));
    }

    #[test]
    fn test_value_starting_with_hash_is_not_a_comment() {
        // The value is trimmed first, so no whitespace precedes the '#'.
        let (_, value) = parse_line("label:   #tag").unwrap();
        assert_eq!(value, ParamValue::from("#tag"));
    }

    #[test]
    fn test_comment_and_colonless_lines_skipped() {
        assert!(parse_line("   # energy_max: 90").is_none());
        assert!(parse_line("just some words").is_none());
        assert!(parse_line("").is_none());
    }

    #[test]
    fn test_splits_on_first_colon_only() {
        let (key, value) = parse_line("output_dir: C:/sim/out").unwrap();
        assert_eq!(key, "output_dir");
        assert_eq!(value, ParamValue::from("C:/sim/out"));
    }

    #[test]
    fn test_empty_value_is_empty_string() {
        let (_, value) = parse_line("physics_list:").unwrap();
        assert_eq!(value, ParamValue::from(""));
    }

    #[test]
    fn test_parse_text_keeps_order() {
        let params = parse_text("b: 1\n# a: 2\nnot a param\na: 2.5\n");
        let keys: Vec<&str> = params.keys().collect();
        assert_eq!(keys, vec!["b", "a"]);
        assert_eq!(params.get("a"), Some(&ParamValue::Float(2.5)));
    }
}
