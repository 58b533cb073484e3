//! The style tree: a small CSS AST and the parser that builds it from
//! declarative nested objects.
//!
//! ```text
//! { ".btn": { "padding": "1rem", "&:hover": { "color": "red" } } }
//! ```
//!
//! parses into two flat rules, `.btn` and `.btn:hover`. Nested selectors are
//! resolved against their parents and nested at-rules bubble to the top,
//! wrapping a copy of the rule they were written in.

use crate::error::{EngineError, Result};
use crate::selector::split_selector_list;
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StyleNode {
    Root {
        nodes: Vec<StyleNode>,
    },
    Rule {
        selector: String,
        nodes: Vec<StyleNode>,
    },
    AtRule {
        name: String,
        params: String,
        nodes: Vec<StyleNode>,
    },
    Declaration(Declaration),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub property: String,
    pub value: String,
    pub important: bool,
}

impl Declaration {
    pub fn new(property: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            value: value.into(),
            important: false,
        }
    }
}

impl StyleNode {
    pub fn root(nodes: Vec<StyleNode>) -> Self {
        Self::Root { nodes }
    }

    pub fn rule(selector: impl Into<String>, nodes: Vec<StyleNode>) -> Self {
        Self::Rule {
            selector: selector.into(),
            nodes,
        }
    }

    pub fn at_rule(
        name: impl Into<String>,
        params: impl Into<String>,
        nodes: Vec<StyleNode>,
    ) -> Self {
        Self::AtRule {
            name: name.into(),
            params: params.into(),
            nodes,
        }
    }

    pub fn declaration(property: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Declaration(Declaration::new(property, value))
    }

    /// Children of a container node; declarations have none.
    pub fn nodes(&self) -> &[StyleNode] {
        match self {
            Self::Root { nodes } | Self::Rule { nodes, .. } | Self::AtRule { nodes, .. } => nodes,
            Self::Declaration(_) => &[],
        }
    }

    pub fn nodes_mut(&mut self) -> Option<&mut Vec<StyleNode>> {
        match self {
            Self::Root { nodes } | Self::Rule { nodes, .. } | Self::AtRule { nodes, .. } => {
                Some(nodes)
            }
            Self::Declaration(_) => None,
        }
    }

    pub fn into_nodes(self) -> Vec<StyleNode> {
        match self {
            Self::Root { nodes } | Self::Rule { nodes, .. } | Self::AtRule { nodes, .. } => nodes,
            Self::Declaration(_) => Vec::new(),
        }
    }

    pub fn selector(&self) -> Option<&str> {
        match self {
            Self::Rule { selector, .. } => Some(selector),
            _ => None,
        }
    }

    /// Calls `visit` with the selector of every rule in this subtree,
    /// outermost first. Keyframe blocks are not entered: `from` and `50%`
    /// are offsets, not selectors.
    pub fn walk_rules_mut<F>(&mut self, visit: &mut F) -> Result<()>
    where
        F: FnMut(&mut String) -> Result<()>,
    {
        match self {
            Self::Rule { selector, .. } => visit(selector)?,
            Self::AtRule { name, .. } if is_keyframes(name) => return Ok(()),
            _ => {}
        }
        if let Some(nodes) = self.nodes_mut() {
            for node in nodes {
                node.walk_rules_mut(visit)?;
            }
        }
        Ok(())
    }

    pub fn walk_declarations_mut<F>(&mut self, visit: &mut F)
    where
        F: FnMut(&mut Declaration),
    {
        match self {
            Self::Declaration(declaration) => visit(declaration),
            _ => {
                if let Some(nodes) = self.nodes_mut() {
                    for node in nodes {
                        node.walk_declarations_mut(visit);
                    }
                }
            }
        }
    }

    pub fn declarations(&self) -> Vec<&Declaration> {
        let mut found = Vec::new();
        self.collect_declarations(&mut found);
        found
    }

    fn collect_declarations<'a>(&'a self, found: &mut Vec<&'a Declaration>) {
        match self {
            Self::Declaration(declaration) => found.push(declaration),
            _ => {
                for node in self.nodes() {
                    node.collect_declarations(found);
                }
            }
        }
    }
}

/// Input accepted by the `add_*` capabilities: declarative objects or nodes
/// a plugin built by hand.
#[derive(Debug, Clone, PartialEq)]
pub enum Styles {
    Tree(Value),
    Nodes(Vec<StyleNode>),
}

impl Styles {
    pub fn into_nodes(self) -> Result<Vec<StyleNode>> {
        match self {
            Self::Tree(value) => parse_styles(&value),
            Self::Nodes(nodes) => Ok(nodes
                .into_iter()
                .flat_map(|node| match node {
                    StyleNode::Root { nodes } => nodes,
                    other => vec![other],
                })
                .collect()),
        }
    }
}

impl From<Value> for Styles {
    fn from(value: Value) -> Self {
        Self::Tree(value)
    }
}

impl From<Map<String, Value>> for Styles {
    fn from(value: Map<String, Value>) -> Self {
        Self::Tree(Value::Object(value))
    }
}

impl From<StyleNode> for Styles {
    fn from(node: StyleNode) -> Self {
        Self::Nodes(vec![node])
    }
}

impl From<Vec<StyleNode>> for Styles {
    fn from(nodes: Vec<StyleNode>) -> Self {
        Self::Nodes(nodes)
    }
}

/// Parses one style object, or a sequence of them, into top-level nodes.
pub fn parse_styles(styles: &Value) -> Result<Vec<StyleNode>> {
    match styles {
        Value::Object(object) => parse_object_styles(object),
        Value::Array(items) => {
            let mut nodes = Vec::new();
            for (idx, item) in items.iter().enumerate() {
                let Value::Object(object) = item else {
                    return Err(EngineError::malformed(
                        format!("[{}]", idx),
                        format!("expected a style object, found {}", describe(item)),
                    ));
                };
                nodes.extend(parse_object_styles(object)?);
            }
            Ok(nodes)
        }
        other => Err(EngineError::malformed(
            "",
            format!("expected a style object, found {}", describe(other)),
        )),
    }
}

pub fn parse_object_styles(object: &Map<String, Value>) -> Result<Vec<StyleNode>> {
    let mut nodes = Vec::new();
    for (key, value) in object {
        if let Some(at_rule) = key.strip_prefix('@') {
            nodes.push(parse_top_level_at_rule(at_rule, value, key)?);
            continue;
        }
        for body in rule_bodies(value, key)? {
            nodes.extend(emit_rule(key.trim().to_string(), body, key)?);
        }
    }
    Ok(nodes)
}

fn parse_top_level_at_rule(at_rule: &str, value: &Value, path: &str) -> Result<StyleNode> {
    let (name, params) = split_at_rule(at_rule, path)?;
    match value {
        Value::Object(body) => Ok(StyleNode::at_rule(
            name,
            params,
            parse_at_rule_body(body, path)?,
        )),
        Value::String(_) | Value::Number(_) if params.is_empty() => {
            Ok(StyleNode::at_rule(name, scalar_text(value), Vec::new()))
        }
        other => Err(EngineError::malformed(
            path,
            format!("{} cannot be an at-rule body", describe(other)),
        )),
    }
}

/// Scalar entries of an at-rule body are its own declarations (`@font-face`,
/// `@page`); objects are rules, keyframe blocks or further at-rules.
fn parse_at_rule_body(body: &Map<String, Value>, path: &str) -> Result<Vec<StyleNode>> {
    let mut nodes = Vec::new();
    for (key, value) in body {
        let child_path = format!("{} → {}", path, key);
        if let Some(at_rule) = key.strip_prefix('@') {
            nodes.push(parse_top_level_at_rule(at_rule, value, &child_path)?);
            continue;
        }
        if is_rule_body(value) {
            for inner in rule_bodies(value, &child_path)? {
                nodes.extend(emit_rule(key.trim().to_string(), inner, &child_path)?);
            }
        } else {
            nodes.extend(parse_declarations(key, value, &child_path)?);
        }
    }
    Ok(nodes)
}

fn is_rule_body(value: &Value) -> bool {
    match value {
        Value::Object(_) => true,
        Value::Array(items) => !items.is_empty() && items.iter().all(Value::is_object),
        _ => false,
    }
}

/// Emits `selector { body }` followed by every rule and at-rule nested in
/// `body`, in source order. A rule left with nothing but nested children is
/// dropped.
fn emit_rule(selector: String, body: &Map<String, Value>, path: &str) -> Result<Vec<StyleNode>> {
    let mut own = Vec::new();
    let mut nested = Vec::new();
    let mut has_nested = false;

    for (key, value) in body {
        let child_path = format!("{} → {}", path, key);

        if let Some(at_rule) = key.strip_prefix('@') {
            let (name, params) = split_at_rule(at_rule, &child_path)?;
            match value {
                Value::Object(inner) => {
                    has_nested = true;
                    let wrapped = emit_rule(selector.clone(), inner, &child_path)?;
                    nested.push(StyleNode::at_rule(name, params, wrapped));
                }
                Value::String(_) | Value::Number(_) => {
                    let params = join_params(&params, &scalar_text(value));
                    own.push(StyleNode::at_rule(name, params, Vec::new()));
                }
                other => {
                    return Err(EngineError::malformed(
                        child_path,
                        format!("{} cannot be an at-rule body", describe(other)),
                    ));
                }
            }
            continue;
        }

        if is_rule_body(value) {
            has_nested = true;
            let resolved = resolve_nested_selector(&selector, key)?;
            for inner in rule_bodies(value, &child_path)? {
                nested.extend(emit_rule(resolved.clone(), inner, &child_path)?);
            }
        } else {
            own.extend(parse_declarations(key, value, &child_path)?);
        }
    }

    let mut nodes = Vec::with_capacity(nested.len() + 1);
    if !own.is_empty() || !has_nested {
        nodes.push(StyleNode::rule(selector, own));
    }
    nodes.extend(nested);
    Ok(nodes)
}

fn rule_bodies<'a>(value: &'a Value, path: &str) -> Result<Vec<&'a Map<String, Value>>> {
    match value {
        Value::Object(body) => Ok(vec![body]),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::Object(body) => Ok(body),
                other => Err(EngineError::malformed(
                    path,
                    format!("expected a rule body, found {}", describe(other)),
                )),
            })
            .collect(),
        other => Err(EngineError::malformed(
            path,
            format!("declarations need a selector, found {} at the top level", describe(other)),
        )),
    }
}

fn parse_declarations(key: &str, value: &Value, path: &str) -> Result<Vec<StyleNode>> {
    let property = dashify(key);
    let values: Vec<&Value> = match value {
        Value::Array(items) => items.iter().collect(),
        single => vec![single],
    };

    let mut declarations = Vec::with_capacity(values.len());
    for value in values {
        match value {
            Value::Null | Value::Bool(false) => {}
            Value::String(text) => {
                let (text, important) = strip_important(text);
                declarations.push(StyleNode::Declaration(Declaration {
                    property: property.clone(),
                    value: text.to_string(),
                    important,
                }));
            }
            Value::Number(number) => {
                declarations.push(StyleNode::declaration(
                    property.clone(),
                    number_text(&property, number),
                ));
            }
            other => {
                return Err(EngineError::malformed(
                    path,
                    format!("{} is not a declaration value", describe(other)),
                ));
            }
        }
    }
    Ok(declarations)
}

/// Resolves a nested selector list against its parent list. `&` stands for
/// the parent; without one the child is a descendant.
fn resolve_nested_selector(parent: &str, child: &str) -> Result<String> {
    let parents = split_selector_list(parent)?;
    let children = split_selector_list(child)?;
    let mut resolved = Vec::with_capacity(parents.len() * children.len());

    for parent_span in &parents {
        let parent = &parent[parent_span.clone()];
        for child_span in &children {
            let child = &child[child_span.clone()];
            resolved.push(match replace_nesting(child, parent) {
                Some(replaced) => replaced,
                None => format!("{} {}", parent, child),
            });
        }
    }
    Ok(resolved.join(", "))
}

fn replace_nesting(child: &str, parent: &str) -> Option<String> {
    let mut out = String::with_capacity(child.len() + parent.len());
    let mut replaced = false;
    let mut chars = child.chars();
    while let Some(ch) = chars.next() {
        match ch {
            '\\' => {
                out.push(ch);
                if let Some(escaped) = chars.next() {
                    out.push(escaped);
                }
            }
            '&' => {
                out.push_str(parent);
                replaced = true;
            }
            _ => out.push(ch),
        }
    }
    replaced.then_some(out)
}

fn split_at_rule(at_rule: &str, path: &str) -> Result<(String, String)> {
    let at_rule = at_rule.trim();
    let (name, params) = match at_rule.split_once(char::is_whitespace) {
        Some((name, params)) => (name, params.trim()),
        None => (at_rule, ""),
    };
    if name.is_empty() {
        return Err(EngineError::malformed(path, "at-rule without a name"));
    }
    Ok((name.to_string(), params.to_string()))
}

fn join_params(params: &str, value: &str) -> String {
    match (params.is_empty(), value.is_empty()) {
        (true, _) => value.to_string(),
        (_, true) => params.to_string(),
        _ => format!("{} {}", params, value),
    }
}

/// `backgroundColor` → `background-color`, `WebkitBoxShadow` →
/// `-webkit-box-shadow`, `msFlex` → `-ms-flex`. Custom properties keep
/// their spelling.
fn dashify(property: &str) -> String {
    if property.starts_with("--") {
        return property.to_string();
    }
    let mut out = String::with_capacity(property.len() + 4);
    for ch in property.chars() {
        if ch.is_ascii_uppercase() {
            out.push('-');
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(ch);
        }
    }
    if out.starts_with("ms-") {
        out.insert(0, '-');
    }
    if out == "css-float" {
        return "float".to_string();
    }
    out
}

/// Properties whose numeric values carry no unit.
const UNITLESS: &[&str] = &[
    "box-flex",
    "box-flex-group",
    "column-count",
    "fill-opacity",
    "flex",
    "flex-grow",
    "flex-negative",
    "flex-positive",
    "flex-shrink",
    "font-weight",
    "line-clamp",
    "line-height",
    "opacity",
    "order",
    "orphans",
    "stroke-dashoffset",
    "stroke-opacity",
    "stroke-width",
    "tab-size",
    "widows",
    "z-index",
    "zoom",
];

/// Numbers are lengths in pixels unless they are zero, the property is
/// unitless, or the property is custom.
fn number_text(property: &str, number: &serde_json::Number) -> String {
    let text = number.to_string();
    let is_zero = number.as_f64().is_some_and(|value| value == 0.0);
    if is_zero || property.starts_with("--") || UNITLESS.contains(&property) {
        text
    } else {
        format!("{}px", text)
    }
}

fn strip_important(value: &str) -> (&str, bool) {
    const IMPORTANT: &str = "!important";
    let trimmed = value.trim_end();
    let split = trimmed.len().saturating_sub(IMPORTANT.len());
    match (trimmed.get(..split), trimmed.get(split..)) {
        (Some(rest), Some(suffix)) if suffix.eq_ignore_ascii_case(IMPORTANT) => {
            (rest.trim_end(), true)
        }
        _ => (value, false),
    }
}

/// `@keyframes` and its vendor-prefixed spellings.
pub fn is_keyframes(name: &str) -> bool {
    let name = name.to_ascii_lowercase();
    name == "keyframes" || (name.starts_with('-') && name.ends_with("-keyframes"))
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a sequence",
        Value::Object(_) => "an object",
    }
}
