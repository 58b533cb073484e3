//! Class name escaping.
//!
//! Modifiers coming from theme keys (`1/2`, `sm:hover`, `2xl`, `0.5`) are not
//! valid CSS identifiers. `escape_class_name` turns any string into an
//! identifier token that, once the selector is parsed, names exactly the
//! original class.

use std::fmt::Write;

pub fn escape_class_name(class: &str) -> String {
    let mut escaped = String::with_capacity(class.len() * 2);

    for ch in class.chars() {
        match ch {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_' => escaped.push(ch),
            _ if !ch.is_ascii() => escaped.push(ch),
            _ if ch.is_ascii_control() => {
                let _ = write!(escaped, "\\{:X} ", u32::from(ch));
            }
            _ => {
                escaped.push('\\');
                escaped.push(ch);
            }
        }
    }

    let mut chars = class.chars();
    match (chars.next(), chars.next()) {
        (Some(first), _) if first.is_ascii_digit() => {
            format!("\\3{} {}", first, &escaped[1..])
        }
        (Some('-'), Some(second)) if second.is_ascii_digit() => {
            format!("\\{}", escaped)
        }
        (Some('-'), None) => "\\-".to_string(),
        _ => escaped,
    }
}

/// Resolves CSS escape sequences back to the characters they stand for.
pub fn unescape_identifier(escaped: &str) -> String {
    let mut out = String::with_capacity(escaped.len());
    let mut chars = escaped.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }

        let Some(&next) = chars.peek() else {
            out.push(char::REPLACEMENT_CHARACTER);
            break;
        };

        if !next.is_ascii_hexdigit() {
            out.push(next);
            chars.next();
            continue;
        }

        let mut code = 0u32;
        let mut digits = 0;
        while digits < 6 {
            match chars.peek().and_then(|c| c.to_digit(16)) {
                Some(value) => {
                    code = code * 16 + value;
                    digits += 1;
                    chars.next();
                }
                None => break,
            }
        }
        if chars.peek().is_some_and(|c| c.is_whitespace()) {
            chars.next();
        }
        let decoded = match code {
            0 => char::REPLACEMENT_CHARACTER,
            _ => char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER),
        };
        out.push(decoded);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::{escape_class_name, unescape_identifier};
    use crate::selector::{SimpleKind, parse_complex};
    use proptest::prelude::*;

    #[test]
    fn leaves_plain_identifiers_alone() {
        assert_eq!(escape_class_name("bg-red-500"), "bg-red-500");
        assert_eq!(escape_class_name("tracking_wide"), "tracking_wide");
    }

    #[test]
    fn escapes_punctuation() {
        assert_eq!(escape_class_name("w-1/2"), "w-1\\/2");
        assert_eq!(escape_class_name("hover:bg-red"), "hover\\:bg-red");
        assert_eq!(escape_class_name("p-0.5"), "p-0\\.5");
        assert_eq!(escape_class_name("a b"), "a\\ b");
        assert_eq!(escape_class_name("a\\b"), "a\\\\b");
    }

    #[test]
    fn escapes_leading_digits() {
        assert_eq!(escape_class_name("2xl"), "\\32 xl");
        assert_eq!(escape_class_name("1/2"), "\\31 \\/2");
    }

    #[test]
    fn escapes_leading_hyphen_digit() {
        assert_eq!(escape_class_name("-1"), "\\-1");
        assert_eq!(escape_class_name("-"), "\\-");
        assert_eq!(escape_class_name("-mt-2"), "-mt-2");
    }

    #[test]
    fn hex_escapes_control_characters() {
        assert_eq!(escape_class_name("a\nb"), "a\\A b");
    }

    #[test]
    fn keeps_non_ascii() {
        assert_eq!(escape_class_name("größe"), "größe");
    }

    #[test]
    fn unescapes_hex_and_literal_escapes() {
        assert_eq!(unescape_identifier("\\32 xl"), "2xl");
        assert_eq!(unescape_identifier("w-1\\/2"), "w-1/2");
        assert_eq!(unescape_identifier("\\0 x"), "\u{FFFD}x");
    }

    proptest! {
        #[test]
        fn escaped_class_selects_the_original_class(raw in "[ -~\u{e9}\u{4e2d}]{1,12}") {
            let escaped = escape_class_name(&raw);
            let selector = format!(".{}", escaped);
            let compounds = parse_complex(&selector).expect("escaped class should parse");
            prop_assert_eq!(compounds.len(), 1);
            prop_assert_eq!(compounds[0].simples.len(), 1);
            let class = &compounds[0].simples[0];
            prop_assert_eq!(class.kind, SimpleKind::Class);
            prop_assert_eq!(unescape_identifier(class.name), raw);
        }

        #[test]
        fn escaping_is_stable_for_identifier_safe_input(raw in "[a-z_][a-z0-9_-]{0,10}") {
            prop_assert_eq!(escape_class_name(&raw), raw);
        }
    }
}
