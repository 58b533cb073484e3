//! Selector scanning shared by the prefixer, the specificity escalator and
//! variant generators.
//!
//! The scanner only understands what rewriting needs: selector lists, complex
//! selectors split into compounds, and the simple selectors of each compound.
//! Pseudo-class arguments are kept as raw text and only parsed on demand.

use crate::error::{EngineError, Result};
use crate::escape::unescape_identifier;
use std::ops::Range;

const LEGACY_PSEUDO_ELEMENTS: [&str; 4] = ["before", "after", "first-line", "first-letter"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimpleKind {
    Type,
    Universal,
    Nesting,
    Class,
    Id,
    Attribute,
    PseudoClass,
    PseudoElement,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimpleSelector<'a> {
    pub kind: SimpleKind,
    /// Byte range inside the complex selector, sigils included.
    pub span: Range<usize>,
    /// Raw (still escaped) name without its sigil. Attribute selectors carry
    /// the text between the brackets.
    pub name: &'a str,
    /// Raw text between the parentheses of a functional pseudo selector.
    pub argument: Option<&'a str>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    Descendant,
    Child,
    NextSibling,
    SubsequentSibling,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Compound<'a> {
    /// Combinator in front of this compound. Only the first compound of a
    /// relative selector (`> .child`) can have one without a predecessor.
    pub combinator: Option<Combinator>,
    pub span: Range<usize>,
    pub simples: Vec<SimpleSelector<'a>>,
}

/// Splits a comma separated selector list into the byte ranges of its
/// trimmed entries.
pub fn split_selector_list(list: &str) -> Result<Vec<Range<usize>>> {
    let mut entries = Vec::new();
    let mut start = 0usize;
    let mut paren_depth = 0usize;
    let mut bracket_depth = 0usize;
    let mut quote: Option<char> = None;
    let mut chars = list.char_indices();

    while let Some((idx, ch)) = chars.next() {
        if ch == '\\' {
            if chars.next().is_none() {
                return Err(EngineError::selector(list, "dangling escape"));
            }
            continue;
        }
        if let Some(open) = quote {
            if ch == open {
                quote = None;
            }
            continue;
        }
        match ch {
            '"' | '\'' => quote = Some(ch),
            '(' => paren_depth += 1,
            ')' => {
                paren_depth = paren_depth
                    .checked_sub(1)
                    .ok_or_else(|| EngineError::selector(list, "unbalanced `)`"))?;
            }
            '[' => bracket_depth += 1,
            ']' => {
                bracket_depth = bracket_depth
                    .checked_sub(1)
                    .ok_or_else(|| EngineError::selector(list, "unbalanced `]`"))?;
            }
            ',' if paren_depth == 0 && bracket_depth == 0 => {
                entries.push(trimmed_span(list, start..idx)?);
                start = idx + 1;
            }
            _ => {}
        }
    }

    if quote.is_some() {
        return Err(EngineError::selector(list, "unterminated string"));
    }
    if paren_depth != 0 || bracket_depth != 0 {
        return Err(EngineError::selector(list, "unbalanced brackets"));
    }
    entries.push(trimmed_span(list, start..list.len())?);
    Ok(entries)
}

/// Rewrites every entry of a selector list, keeping the original separators.
pub fn map_selector_list<F>(list: &str, mut rewrite: F) -> Result<String>
where
    F: FnMut(&str) -> Result<String>,
{
    let spans = split_selector_list(list)?;
    let mut out = String::with_capacity(list.len());
    let mut cursor = 0usize;
    for span in spans {
        out.push_str(&list[cursor..span.start]);
        out.push_str(&rewrite(&list[span.clone()])?);
        cursor = span.end;
    }
    out.push_str(&list[cursor..]);
    Ok(out)
}

/// Splits one complex selector (no top-level commas) into compounds.
pub fn parse_complex(selector: &str) -> Result<Vec<Compound<'_>>> {
    let mut compounds: Vec<Compound<'_>> = Vec::new();
    let mut pending: Option<Combinator> = None;
    let mut pos = 0usize;

    while let Some(ch) = char_at(selector, pos) {
        if ch.is_whitespace() {
            pos += ch.len_utf8();
            continue;
        }
        if let Some(combinator) = explicit_combinator(ch) {
            if pending.is_some() {
                return Err(EngineError::selector(selector, "consecutive combinators"));
            }
            pending = Some(combinator);
            pos += 1;
            continue;
        }
        if ch == ',' {
            return Err(EngineError::selector(selector, "unexpected `,`"));
        }

        let combinator = match pending.take() {
            Some(combinator) => Some(combinator),
            None if !compounds.is_empty() => Some(Combinator::Descendant),
            None => None,
        };
        let compound = parse_compound(selector, pos, combinator)?;
        pos = compound.span.end;
        compounds.push(compound);
    }

    if pending.is_some() {
        return Err(EngineError::selector(selector, "dangling combinator"));
    }
    if compounds.is_empty() {
        return Err(EngineError::selector(selector, "empty selector"));
    }
    Ok(compounds)
}

/// Unescaped name of the last class in a complex selector, ignoring classes
/// nested inside pseudo-class arguments.
pub fn last_class_name(selector: &str) -> Result<Option<String>> {
    let compounds = parse_complex(selector)?;
    Ok(compounds
        .iter()
        .flat_map(|compound| compound.simples.iter())
        .filter(|simple| simple.kind == SimpleKind::Class)
        .last()
        .map(|simple| unescape_identifier(simple.name)))
}

fn parse_compound(
    selector: &str,
    start: usize,
    combinator: Option<Combinator>,
) -> Result<Compound<'_>> {
    let mut simples: Vec<SimpleSelector<'_>> = Vec::new();
    let mut pos = start;

    while let Some(ch) = char_at(selector, pos) {
        if ch.is_whitespace() || explicit_combinator(ch).is_some() {
            break;
        }
        let simple = match ch {
            '.' => named(selector, SimpleKind::Class, pos, pos + 1)?,
            '#' => named(selector, SimpleKind::Id, pos, pos + 1)?,
            '[' => {
                let close = find_closing(selector, pos, '[', ']')?;
                SimpleSelector {
                    kind: SimpleKind::Attribute,
                    span: pos..close + 1,
                    name: &selector[pos + 1..close],
                    argument: None,
                }
            }
            ':' => parse_pseudo(selector, pos)?,
            '*' if simples.is_empty() => SimpleSelector {
                kind: SimpleKind::Universal,
                span: pos..pos + 1,
                name: "*",
                argument: None,
            },
            '&' => SimpleSelector {
                kind: SimpleKind::Nesting,
                span: pos..pos + 1,
                name: "&",
                argument: None,
            },
            _ if simples.is_empty() && is_identifier_start(ch) => {
                named(selector, SimpleKind::Type, pos, pos)?
            }
            _ => {
                return Err(EngineError::selector(
                    selector,
                    format!("unexpected `{}`", ch),
                ));
            }
        };
        pos = simple.span.end;
        simples.push(simple);
    }

    Ok(Compound {
        combinator,
        span: start..pos,
        simples,
    })
}

fn named(
    selector: &str,
    kind: SimpleKind,
    start: usize,
    name_start: usize,
) -> Result<SimpleSelector<'_>> {
    let end = read_identifier(selector, name_start)?;
    Ok(SimpleSelector {
        kind,
        span: start..end,
        name: &selector[name_start..end],
        argument: None,
    })
}

fn parse_pseudo(selector: &str, start: usize) -> Result<SimpleSelector<'_>> {
    let double = char_at(selector, start + 1) == Some(':');
    let name_start = if double { start + 2 } else { start + 1 };
    let name_end = read_identifier(selector, name_start)?;
    let name = &selector[name_start..name_end];

    let (end, argument) = if char_at(selector, name_end) == Some('(') {
        let close = find_closing(selector, name_end, '(', ')')?;
        (close + 1, Some(&selector[name_end + 1..close]))
    } else {
        (name_end, None)
    };

    let legacy_element = LEGACY_PSEUDO_ELEMENTS
        .iter()
        .any(|legacy| legacy.eq_ignore_ascii_case(name));
    let kind = if double || legacy_element {
        SimpleKind::PseudoElement
    } else {
        SimpleKind::PseudoClass
    };

    Ok(SimpleSelector {
        kind,
        span: start..end,
        name,
        argument,
    })
}

fn read_identifier(selector: &str, start: usize) -> Result<usize> {
    let mut pos = start;
    while let Some(ch) = char_at(selector, pos) {
        if ch == '\\' {
            pos = skip_escape(selector, pos)?;
        } else if is_name_char(ch) {
            pos += ch.len_utf8();
        } else {
            break;
        }
    }
    if pos == start {
        return Err(EngineError::selector(
            selector,
            format!("expected a name at offset {}", start),
        ));
    }
    Ok(pos)
}

/// Returns the offset just past the escape sequence starting at `backslash`.
fn skip_escape(selector: &str, backslash: usize) -> Result<usize> {
    let mut pos = backslash + 1;
    let Some(first) = char_at(selector, pos) else {
        return Err(EngineError::selector(selector, "dangling escape"));
    };
    if first == '\n' {
        return Err(EngineError::selector(selector, "escaped newline"));
    }
    if !first.is_ascii_hexdigit() {
        return Ok(pos + first.len_utf8());
    }

    let mut digits = 0;
    while digits < 6 && char_at(selector, pos).is_some_and(|ch| ch.is_ascii_hexdigit()) {
        pos += 1;
        digits += 1;
    }
    if let Some(ws) = char_at(selector, pos).filter(|ch| ch.is_whitespace()) {
        pos += ws.len_utf8();
    }
    Ok(pos)
}

fn find_closing(selector: &str, open_idx: usize, open: char, close: char) -> Result<usize> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut pos = open_idx;

    while let Some(ch) = char_at(selector, pos) {
        if ch == '\\' {
            pos = skip_escape(selector, pos)?;
            continue;
        }
        if let Some(q) = quote {
            if ch == q {
                quote = None;
            }
        } else if ch == '"' || ch == '\'' {
            quote = Some(ch);
        } else if ch == open {
            depth += 1;
        } else if ch == close {
            depth -= 1;
            if depth == 0 {
                return Ok(pos);
            }
        }
        pos += ch.len_utf8();
    }

    Err(EngineError::selector(
        selector,
        format!("missing closing `{}`", close),
    ))
}

fn trimmed_span(list: &str, span: Range<usize>) -> Result<Range<usize>> {
    let raw = &list[span.clone()];
    let start = span.start + (raw.len() - raw.trim_start().len());
    let mut end = span.start + raw.trim_end().len();
    // `\ ` escapes the space itself, so trimming must not split it.
    if end > start && ends_with_open_escape(&list[start..end]) {
        if let Some(ch) = list[end..span.end].chars().next() {
            end += ch.len_utf8();
        }
    }
    if start >= end {
        return Err(EngineError::selector(list, "empty selector in list"));
    }
    Ok(start..end)
}

fn ends_with_open_escape(text: &str) -> bool {
    text.chars().rev().take_while(|ch| *ch == '\\').count() % 2 == 1
}

fn explicit_combinator(ch: char) -> Option<Combinator> {
    match ch {
        '>' => Some(Combinator::Child),
        '+' => Some(Combinator::NextSibling),
        '~' => Some(Combinator::SubsequentSibling),
        _ => None,
    }
}

fn is_name_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' || !ch.is_ascii()
}

fn is_identifier_start(ch: char) -> bool {
    ch.is_ascii_alphabetic() || ch == '_' || ch == '-' || ch == '\\' || !ch.is_ascii()
}

fn char_at(text: &str, pos: usize) -> Option<char> {
    text.get(pos..).and_then(|rest| rest.chars().next())
}
