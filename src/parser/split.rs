//! Comma-splitting that respects quoted strings and balanced parentheses.
//!
//! Used for `CREATE TABLE` column lists, `VALUES` tuples, explicit `INSERT`
//! column lists, and `SET` assignment lists — anywhere a flat `str::split(',')`
//! would break on a comma inside a string literal or a `VARCHAR(100)` size.

/// Splits `text` on top-level commas, skipping commas inside single/double
/// quoted runs or nested parentheses. Each returned piece is trimmed; empty
/// trailing pieces are dropped.
pub fn split_top_level(text: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut quote_char: Option<char> = None;
    let mut paren_depth: i32 = 0;

    for ch in text.chars() {
        match quote_char {
            Some(q) => {
                current.push(ch);
                if ch == q {
                    quote_char = None;
                }
            }
            None => match ch {
                '\'' | '"' => {
                    quote_char = Some(ch);
                    current.push(ch);
                }
                '(' => {
                    paren_depth += 1;
                    current.push(ch);
                }
                ')' => {
                    paren_depth -= 1;
                    current.push(ch);
                }
                ',' if paren_depth == 0 => {
                    parts.push(current.trim().to_string());
                    current = String::new();
                }
                _ => current.push(ch),
            },
        }
    }
    if !current.trim().is_empty() {
        parts.push(current.trim().to_string());
    }
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_plain_values() {
        assert_eq!(split_top_level("1, 'a', 2"), vec!["1", "'a'", "2"]);
    }

    #[test]
    fn respects_comma_inside_quotes() {
        assert_eq!(
            split_top_level("'a, b', 2"),
            vec!["'a, b'".to_string(), "2".to_string()]
        );
    }

    #[test]
    fn respects_nested_parens() {
        assert_eq!(
            split_top_level("id INT PRIMARY KEY, name VARCHAR(100, 2)"),
            vec![
                "id INT PRIMARY KEY".to_string(),
                "name VARCHAR(100, 2)".to_string()
            ]
        );
    }

    #[test]
    fn ignores_trailing_empty_segment() {
        assert_eq!(split_top_level("a, b,"), vec!["a".to_string(), "b".to_string()]);
    }
}
