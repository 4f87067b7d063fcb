/// Truncate a string to at most `max_bytes` bytes at a character boundary.
pub fn truncate_to_char_boundary(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while !s.is_char_boundary(end) && end > 0 {
        end -= 1;
    }
    &s[..end]
}

/// Strip markdown code fences from a response.
pub fn strip_code_blocks(response: &str) -> &str {
    response
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim()
}

/// Extract the first balanced JSON object from a string that may carry
/// leading or trailing prose. Brace counting is string-aware so braces
/// inside JSON string values don't confuse the scan. Returns `None` when
/// no complete object is present.
pub fn extract_json_object(s: &str) -> Option<&str> {
    let start = s.find('{')?;
    let bytes = s.as_bytes();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate().skip(start) {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&s[start..=i]);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_respects_char_boundaries() {
        let text = "Hello 世界";
        let truncated = truncate_to_char_boundary(text, 8);
        assert!(truncated.len() <= 8);
        assert!(text.starts_with(truncated));
        assert_eq!(truncate_to_char_boundary("Hello", 100), "Hello");
    }

    #[test]
    fn strips_code_fences() {
        assert_eq!(strip_code_blocks("```json\n{}\n```"), "{}");
        assert_eq!(strip_code_blocks("```\n{}\n```"), "{}");
        assert_eq!(strip_code_blocks("{}"), "{}");
    }

    #[test]
    fn extracts_object_with_surrounding_prose() {
        let s = r#"sure! here you go: {"score": 80, "note": "a {brace} inside"} thanks"#;
        assert_eq!(
            extract_json_object(s),
            Some(r#"{"score": 80, "note": "a {brace} inside"}"#)
        );
    }

    #[test]
    fn unterminated_object_yields_none() {
        assert_eq!(extract_json_object(r#"sure! here you go: {score: 77"#), None);
        assert_eq!(extract_json_object("no json at all"), None);
    }

    #[test]
    fn nested_objects_scan_to_outer_close() {
        let s = r#"{"a": {"b": 1}, "c": 2} trailing"#;
        assert_eq!(extract_json_object(s), Some(r#"{"a": {"b": 1}, "c": 2}"#));
    }

    #[test]
    fn escaped_quote_inside_string_does_not_end_it() {
        let s = r#"{"reason": "client said \"urgent\""}"#;
        assert_eq!(extract_json_object(s), Some(s));
    }
}
