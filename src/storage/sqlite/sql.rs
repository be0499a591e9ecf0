//! SQL helper functions for `SQLite` backends.

/// Escapes SQL LIKE wildcards in a string to make them literal.
///
/// SQL LIKE uses `%` (match any characters) and `_` (match single character)
/// as wildcards. The backslash is the escape character, so it is escaped too.
/// Statements using the result must declare `ESCAPE '\'`.
///
/// # Examples
///
/// ```
/// use taxi_service::storage::sqlite::escape_like_wildcards;
///
/// assert_eq!(escape_like_wildcards("100%"), "100\\%");
/// assert_eq!(escape_like_wildcards("user_name"), "user\\_name");
/// assert_eq!(escape_like_wildcards("path\\file"), "path\\\\file");
/// ```
#[must_use]
pub fn escape_like_wildcards(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '%' | '_' | '\\' => {
                result.push('\\');
                result.push(c);
            },
            _ => result.push(c),
        }
    }
    result
}

/// Builds a LIKE pattern matching any value that contains `needle` literally.
///
/// ```
/// use taxi_service::storage::sqlite::contains_pattern;
///
/// assert_eq!(contains_pattern("Driver"), "%Driver%");
/// assert_eq!(contains_pattern("50%"), "%50\\%%");
/// ```
#[must_use]
pub fn contains_pattern(needle: &str) -> String {
    format!("%{}%", escape_like_wildcards(needle))
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("plain", "plain" ; "no wildcards")]
    #[test_case("a%b", "a\\%b" ; "percent")]
    #[test_case("a_b", "a\\_b" ; "underscore")]
    #[test_case("a\\b", "a\\\\b" ; "backslash")]
    #[test_case("%_\\", "\\%\\_\\\\" ; "all metacharacters")]
    #[test_case("", "" ; "empty")]
    fn test_escape_like_wildcards(input: &str, expected: &str) {
        assert_eq!(escape_like_wildcards(input), expected);
    }

    #[test]
    fn test_contains_pattern_escapes_before_wrapping() {
        assert_eq!(contains_pattern("_x"), "%\\_x%");
        assert_eq!(contains_pattern(""), "%%");
    }
}
