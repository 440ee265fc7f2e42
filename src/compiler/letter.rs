//! LIKE escaping and first-letter buckets

use super::ast::{CharClass, Column, Expr};

/// Escapes the LIKE metacharacters `\`, `%` and `_`
pub fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Turns user input into a LIKE pattern.
///
/// Metacharacters are escaped, `*` becomes `%`, and the result is anchored
/// as a prefix (`v%`) or left open on both sides (`%v%`).
pub(crate) fn user_pattern(raw: &str, substring: bool) -> String {
    let mut pattern = String::with_capacity(raw.len() + 2);
    if substring {
        pattern.push('%');
    }
    for c in raw.chars() {
        match c {
            '*' => pattern.push('%'),
            '\\' | '%' | '_' => {
                pattern.push('\\');
                pattern.push(c);
            }
            _ => pattern.push(c),
        }
    }
    if !pattern.ends_with('%') || pattern.ends_with("\\%") {
        pattern.push('%');
    }
    pattern
}

/// A first-letter search bucket
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LetterBucket {
    /// No restriction (`*`, `all`, empty)
    Any,
    /// Leading character is not a letter (`.` or `#`)
    NonLetter,
    /// Leading character is a digit
    Digit,
    /// Leading characters equal the given prefix
    Prefix(String),
}

impl LetterBucket {
    /// Parses a bucket as sent by an index bar
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed == "*" || trimmed.eq_ignore_ascii_case("all") {
            return LetterBucket::Any;
        }
        match trimmed {
            "." | "#" => LetterBucket::NonLetter,
            _ if trimmed.chars().count() == 1 && trimmed.chars().all(|c| c.is_ascii_digit()) => {
                LetterBucket::Digit
            }
            _ => LetterBucket::Prefix(trimmed.to_string()),
        }
    }

    /// Predicate term restricting `column` to this bucket
    pub fn to_expr(&self, column: Column) -> Option<Expr> {
        match self {
            LetterBucket::Any => None,
            LetterBucket::NonLetter => Some(Expr::StartsWith {
                column,
                class: CharClass::Letter,
                negated: true,
            }),
            LetterBucket::Digit => Some(Expr::StartsWith {
                column,
                class: CharClass::Digit,
                negated: false,
            }),
            LetterBucket::Prefix(prefix) => Some(Expr::Like {
                column,
                pattern: format!("{}%", escape_like(prefix)),
                fold_case: false,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::FieldId;

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("100%_a\\b"), "100\\%\\_a\\\\b");
        assert_eq!(escape_like("plain"), "plain");
    }

    #[test]
    fn test_user_pattern() {
        assert_eq!(user_pattern("doe", true), "%doe%");
        assert_eq!(user_pattern("doe", false), "doe%");
        assert_eq!(user_pattern("d*e", false), "d%e%");
        assert_eq!(user_pattern("doe*", false), "doe%");
        assert_eq!(user_pattern("50%", false), "50\\%%");
    }

    #[test]
    fn test_parse_buckets() {
        assert_eq!(LetterBucket::parse("*"), LetterBucket::Any);
        assert_eq!(LetterBucket::parse("ALL"), LetterBucket::Any);
        assert_eq!(LetterBucket::parse(""), LetterBucket::Any);
        assert_eq!(LetterBucket::parse("#"), LetterBucket::NonLetter);
        assert_eq!(LetterBucket::parse("."), LetterBucket::NonLetter);
        assert_eq!(LetterBucket::parse("7"), LetterBucket::Digit);
        assert_eq!(LetterBucket::parse("M"), LetterBucket::Prefix("M".into()));
    }

    #[test]
    fn test_bucket_terms() {
        let column = Column {
            field: FieldId::SUR_NAME,
            name: "field02",
        };
        assert_eq!(LetterBucket::Any.to_expr(column), None);
        assert!(matches!(
            LetterBucket::NonLetter.to_expr(column),
            Some(Expr::StartsWith { negated: true, class: CharClass::Letter, .. })
        ));
        assert!(matches!(
            LetterBucket::parse("_").to_expr(column),
            Some(Expr::Like { pattern, .. }) if pattern == "\\_%"
        ));
    }
}
