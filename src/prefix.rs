use crate::error::Result;
use crate::escape::escape_class_name;
use crate::selector::{SimpleKind, map_selector_list, parse_complex};
use std::collections::BTreeSet;

/// Namespaces every selector of `selector_list` with `prefix`.
///
/// The prefix lands on the first class of each selector's leading compound.
/// Classes inside pseudo-class arguments and compounds without a class are
/// left untouched. Every call prefixes; see [`Prefixer`] for the variant
/// that never prefixes its own output twice.
pub fn prefix_selector(prefix: &str, selector_list: &str) -> Result<String> {
    if prefix.is_empty() {
        return Ok(selector_list.to_string());
    }

    let escaped_prefix = escape_class_name(prefix);
    map_selector_list(selector_list, |selector| {
        prefix_complex(&escaped_prefix, selector)
    })
}

/// Prefixes selectors and remembers the entries it produced.
///
/// An entry that came out of this prefixer is returned as it is, so
/// prefixing is idempotent without guessing from class names: with the
/// prefix `s`, `.shadow` still becomes `.sshadow`.
#[derive(Debug, Clone, Default)]
pub struct Prefixer {
    produced: BTreeSet<(String, String)>,
}

impl Prefixer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, prefix: &str, selector_list: &str) -> Result<String> {
        if prefix.is_empty() {
            return Ok(selector_list.to_string());
        }

        let escaped_prefix = escape_class_name(prefix);
        map_selector_list(selector_list, |selector| {
            let key = (prefix.to_string(), selector.to_string());
            if self.produced.contains(&key) {
                return Ok(key.1);
            }
            let prefixed = prefix_complex(&escaped_prefix, selector)?;
            self.produced.insert((key.0, prefixed.clone()));
            Ok(prefixed)
        })
    }
}

fn prefix_complex(escaped_prefix: &str, selector: &str) -> Result<String> {
    let compounds = parse_complex(selector)?;
    let leading = &compounds[0];
    let Some(class) = leading
        .simples
        .iter()
        .find(|simple| simple.kind == SimpleKind::Class)
    else {
        return Ok(selector.to_string());
    };

    let name_start = class.span.start + 1;
    Ok(format!(
        "{}{}{}",
        &selector[..name_start],
        escaped_prefix,
        &selector[name_start..]
    ))
}

#[cfg(test)]
mod tests {
    use super::{Prefixer, prefix_selector};
    use proptest::prelude::*;

    fn prefixed(prefix: &str, selector: &str) -> String {
        prefix_selector(prefix, selector).expect("selector should prefix")
    }

    #[test]
    fn prefixes_simple_class() {
        assert_eq!(prefixed("tw-", ".bg-red"), ".tw-bg-red");
    }

    #[test]
    fn empty_prefix_is_a_no_op() {
        assert_eq!(prefixed("", ".a > .b, :not(.c)"), ".a > .b, :not(.c)");
    }

    #[test]
    fn prefixer_does_not_double_prefix_its_output() {
        let mut prefixer = Prefixer::new();
        let once = prefixer.apply("tw", ".btn").expect("selector should prefix");
        assert_eq!(once, ".twbtn");
        assert_eq!(prefixer.apply("tw", &once).expect("selector should prefix"), once);
    }

    #[test]
    fn classes_sharing_the_prefix_text_are_still_prefixed() {
        let mut prefixer = Prefixer::new();
        assert_eq!(prefixer.apply("s", ".shadow").expect("prefix"), ".sshadow");
        assert_eq!(prefixer.apply("s", ".block").expect("prefix"), ".sblock");
        assert_eq!(prefixed("tw-", ".tw-table"), ".tw-tw-table");
    }

    #[test]
    fn prefixer_tracks_entries_of_a_list() {
        let mut prefixer = Prefixer::new();
        let once = prefixer.apply("tw-", ".a, .b").expect("prefix");
        assert_eq!(once, ".tw-a, .tw-b");
        assert_eq!(
            prefixer.apply("tw-", ".tw-a, .c").expect("prefix"),
            ".tw-a, .tw-c"
        );
        assert_eq!(prefixer.apply("x-", &once).expect("prefix"), ".x-tw-a, .x-tw-b");
    }

    #[test]
    fn prefixes_each_selector_of_a_list() {
        assert_eq!(
            prefixed("tw-", ".btn:hover, .btn:focus"),
            ".tw-btn:hover, .tw-btn:focus"
        );
    }

    #[test]
    fn only_touches_the_leading_compound() {
        assert_eq!(prefixed("tw-", ".group:hover .item"), ".tw-group:hover .item");
        assert_eq!(
            prefixed("tw-", "a.link:not(.active)"),
            "a.tw-link:not(.active)"
        );
    }

    #[test]
    fn keeps_leading_combinators() {
        assert_eq!(prefixed("tw-", "> .child"), "> .tw-child");
    }

    #[test]
    fn skips_compounds_without_a_class() {
        assert_eq!(prefixed("tw-", "h1"), "h1");
        assert_eq!(prefixed("tw-", ":not(.a) .b"), ":not(.a) .b");
        assert_eq!(prefixed("tw-", "[data-open]"), "[data-open]");
    }

    #[test]
    fn escapes_prefix_characters() {
        assert_eq!(prefixed("tw:", ".p-4"), ".tw\\:p-4");
    }

    #[test]
    fn keeps_escaped_class_names_intact() {
        assert_eq!(prefixed("tw-", ".w-1\\/2"), ".tw-w-1\\/2");
        assert_eq!(prefixed("tw-", ".\\32 xl\\:p-4"), ".tw-\\32 xl\\:p-4");
    }

    #[test]
    fn fails_on_unresolvable_selectors() {
        assert!(prefix_selector("tw-", ".a:not(.b").is_err());
        assert!(prefix_selector("tw-", ".a >").is_err());
    }

    proptest! {
        #[test]
        fn prefixing_is_idempotent(
            prefix in "[a-z]{1,4}-?",
            class in "[a-z][a-z0-9-]{0,8}",
            pseudo in prop::option::of("(hover|focus|first-child)"),
        ) {
            let selector = match pseudo {
                Some(pseudo) => format!(".{}:{}", class, pseudo),
                None => format!(".{}", class),
            };
            let mut prefixer = Prefixer::new();
            let once = prefixer.apply(&prefix, &selector).expect("selector should prefix");
            let twice = prefixer.apply(&prefix, &once).expect("selector should prefix");
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn empty_prefix_returns_input(selector in "[ -~]{0,24}") {
            prop_assert_eq!(prefix_selector("", &selector).expect("no-op never fails"), selector);
        }
    }
}
