//! Selector specificity and the `important: "<selector>"` strategy.

use crate::error::{EngineError, Result};
use crate::selector::{SimpleKind, map_selector_list, parse_complex, split_selector_list};
use std::ops::Add;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Specificity {
    pub ids: u32,
    pub classes: u32,
    pub types: u32,
}

impl Specificity {
    pub const fn new(ids: u32, classes: u32, types: u32) -> Self {
        Self { ids, classes, types }
    }
}

impl Add for Specificity {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            ids: self.ids + rhs.ids,
            classes: self.classes + rhs.classes,
            types: self.types + rhs.types,
        }
    }
}

/// Specificity of a selector. For a list, the most specific entry wins.
pub fn specificity(selector_list: &str) -> Result<Specificity> {
    let mut highest = Specificity::default();
    for span in split_selector_list(selector_list)? {
        highest = highest.max(complex_specificity(&selector_list[span])?);
    }
    Ok(highest)
}

fn complex_specificity(selector: &str) -> Result<Specificity> {
    let mut total = Specificity::default();
    for compound in parse_complex(selector)? {
        for simple in &compound.simples {
            total = total
                + match simple.kind {
                    SimpleKind::Id => Specificity::new(1, 0, 0),
                    SimpleKind::Class | SimpleKind::Attribute => Specificity::new(0, 1, 0),
                    SimpleKind::Type | SimpleKind::PseudoElement => Specificity::new(0, 0, 1),
                    SimpleKind::Universal | SimpleKind::Nesting => Specificity::default(),
                    SimpleKind::PseudoClass => {
                        pseudo_class_specificity(simple.name, simple.argument)?
                    }
                };
        }
    }
    Ok(total)
}

fn pseudo_class_specificity(name: &str, argument: Option<&str>) -> Result<Specificity> {
    let name = name.to_ascii_lowercase();
    match (name.as_str(), argument) {
        ("where", _) => Ok(Specificity::default()),
        ("is" | "not" | "has" | "matches" | "-webkit-any" | "-moz-any", Some(argument)) => {
            specificity(argument)
        }
        _ => Ok(Specificity::new(0, 1, 0)),
    }
}

/// Raises the specificity of every selector in `selector_list` by joining
/// `anchor` into its leading compound.
///
/// `.foo` under the anchor `#app` becomes `:is(#app, #app *).foo`: it still
/// matches the same elements inside `#app`, and outranks `#app .foo`.
/// Selectors that already start with the anchor are returned as they are.
pub fn increase_specificity(anchor: &str, selector_list: &str) -> Result<String> {
    let anchor = anchor.trim();
    if anchor.is_empty() {
        return Err(EngineError::selector(anchor, "empty important selector"));
    }

    let anchors: Vec<&str> = split_selector_list(anchor)?
        .into_iter()
        .map(|span| &anchor[span])
        .collect();
    for entry in &anchors {
        parse_complex(entry)?;
    }
    let scoped: Vec<String> = anchors
        .iter()
        .map(|entry| entry.to_string())
        .chain(anchors.iter().map(|entry| format!("{} *", entry)))
        .collect();
    let marker = format!(":is({})", scoped.join(", "));

    map_selector_list(selector_list, |selector| {
        escalate_complex(anchor, &marker, selector)
    })
}

fn escalate_complex(anchor: &str, marker: &str, selector: &str) -> Result<String> {
    if starts_with_anchor(selector, anchor) {
        return Ok(selector.to_string());
    }

    let compounds = parse_complex(selector)?;
    let leading = &compounds[0];
    if selector[leading.span.clone()].contains(marker) {
        return Ok(selector.to_string());
    }

    let first = &leading.simples[0];
    let insert_at = match first.kind {
        SimpleKind::Type | SimpleKind::Universal => first.span.end,
        _ => first.span.start,
    };
    Ok(format!(
        "{}{}{}",
        &selector[..insert_at],
        marker,
        &selector[insert_at..]
    ))
}

fn starts_with_anchor(selector: &str, anchor: &str) -> bool {
    let Some(rest) = selector.strip_prefix(anchor) else {
        return false;
    };
    match rest.chars().next() {
        None => true,
        Some(ch) => !(ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' || ch == '\\'),
    }
}

#[cfg(test)]
mod tests {
    use super::{Specificity, increase_specificity, specificity};
    use proptest::prelude::*;

    fn spec(selector: &str) -> Specificity {
        specificity(selector).expect("selector should parse")
    }

    fn escalate(anchor: &str, selector: &str) -> String {
        increase_specificity(anchor, selector).expect("selector should escalate")
    }

    #[test]
    fn counts_simple_selectors() {
        assert_eq!(spec("#app .foo"), Specificity::new(1, 1, 0));
        assert_eq!(spec("a.btn:hover::before"), Specificity::new(0, 2, 2));
        assert_eq!(spec("*"), Specificity::default());
        assert_eq!(spec("[data-open] > li:before"), Specificity::new(0, 1, 2));
    }

    #[test]
    fn functional_pseudo_classes_take_their_argument() {
        assert_eq!(spec(".a:not(#b, .c)"), Specificity::new(1, 1, 0));
        assert_eq!(spec(".a:where(#b)"), Specificity::new(0, 1, 0));
        assert_eq!(spec("li:nth-child(2n+1)"), Specificity::new(0, 1, 1));
    }

    #[test]
    fn list_specificity_is_the_maximum() {
        assert_eq!(spec(".a, #b, p"), Specificity::new(1, 0, 0));
    }

    #[test]
    fn joins_anchor_into_leading_compound() {
        assert_eq!(escalate("#app", ".foo"), ":is(#app, #app *).foo");
        assert_eq!(
            escalate("#app", ".foo:hover .bar"),
            ":is(#app, #app *).foo:hover .bar"
        );
    }

    #[test]
    fn keeps_type_selectors_first() {
        assert_eq!(escalate("#app", "a.link"), "a:is(#app, #app *).link");
        assert_eq!(escalate("#app", "*"), "*:is(#app, #app *)");
    }

    #[test]
    fn escalates_every_selector_of_a_list() {
        assert_eq!(
            escalate("#app", ".a, .b"),
            ":is(#app, #app *).a, :is(#app, #app *).b"
        );
    }

    #[test]
    fn outranks_the_descendant_form() {
        let escalated = escalate("#app", ".foo");
        assert!(spec(&escalated) >= spec("#app .foo"));
        assert!(!escalated.contains("!important"));
    }

    #[test]
    fn is_idempotent() {
        let once = escalate("#app", ".foo");
        assert_eq!(escalate("#app", &once), once);
        assert_eq!(escalate("#app", "#app .foo"), "#app .foo");
        let typed = escalate("#app", "a.link");
        assert_eq!(escalate("#app", &typed), typed);
    }

    #[test]
    fn anchor_prefix_must_end_at_a_token_boundary() {
        assert_eq!(escalate("#app", "#apple"), ":is(#app, #app *)#apple");
    }

    #[test]
    fn rejects_unresolvable_input() {
        assert!(increase_specificity("#app", ".foo >").is_err());
        assert!(increase_specificity("#app(", ".foo").is_err());
        assert!(increase_specificity("  ", ".foo").is_err());
    }

    proptest! {
        #[test]
        fn escalated_selector_outranks_descendant_form(
            id in "[a-z][a-z0-9]{0,6}",
            class in "[a-z][a-z0-9-]{0,8}",
        ) {
            let anchor = format!("#{}", id);
            let selector = format!(".{}", class);
            let escalated =
                increase_specificity(&anchor, &selector).expect("selector should escalate");
            let descendant = format!("{} {}", anchor, selector);
            let escalated = specificity(&escalated).expect("escalated parses");
            let descendant = specificity(&descendant).expect("descendant parses");
            prop_assert!(escalated >= descendant);
        }
    }
}
