//! Variant bundles and the registry of variant generators.

use crate::error::{EngineError, Result};
use crate::selector::{last_class_name, map_selector_list};
use crate::style::StyleNode;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

/// Utility nodes together with the variants they were requested under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantBundle {
    pub nodes: Vec<StyleNode>,
    pub variants: Vec<String>,
}

impl VariantBundle {
    /// The bundle's nodes as a root container, the shape generators expect.
    pub fn container(&self) -> StyleNode {
        StyleNode::root(self.nodes.clone())
    }
}

pub fn wrap_with_variants(nodes: Vec<StyleNode>, variants: Vec<String>) -> VariantBundle {
    VariantBundle { nodes, variants }
}

/// One selector handed to a `modify_selectors` callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectorTarget<'a> {
    /// Unescaped name of the last class in `selector`.
    pub class_name: &'a str,
    pub selector: &'a str,
}

/// What a variant generator works on: its own copy of the container.
#[derive(Debug)]
pub struct VariantContext {
    container: StyleNode,
    separator: String,
}

impl VariantContext {
    pub fn container(&self) -> &StyleNode {
        &self.container
    }

    pub fn container_mut(&mut self) -> &mut StyleNode {
        &mut self.container
    }

    pub fn separator(&self) -> &str {
        &self.separator
    }

    /// Rewrites every selector of every rule through `modifier`.
    pub fn modify_selectors<F>(&mut self, mut modifier: F) -> Result<()>
    where
        F: FnMut(SelectorTarget<'_>) -> String,
    {
        self.container.walk_rules_mut(&mut |selector: &mut String| {
            let rewritten = map_selector_list(selector, |entry| {
                let class_name = last_class_name(entry)?.ok_or_else(|| {
                    EngineError::selector(entry, "no class to build a variant from")
                })?;
                Ok(modifier(SelectorTarget {
                    class_name: &class_name,
                    selector: entry,
                }))
            })?;
            *selector = rewritten;
            Ok(())
        })
    }

    /// Moves the container's children into a single `@name params` block.
    pub fn wrap_in_at_rule(&mut self, name: &str, params: &str) {
        if let Some(nodes) = self.container.nodes_mut() {
            let children = std::mem::take(nodes);
            nodes.push(StyleNode::at_rule(name, params, children));
        }
    }

    pub fn into_container(self) -> StyleNode {
        self.container
    }
}

pub type GeneratorFn = dyn Fn(&mut VariantContext) -> Result<()>;

/// A registered variant, adapted so every application starts from an
/// untouched copy of the source container.
#[derive(Clone)]
pub struct VariantGenerator {
    generator: Rc<GeneratorFn>,
}

impl VariantGenerator {
    pub fn new<F>(generator: F) -> Self
    where
        F: Fn(&mut VariantContext) -> Result<()> + 'static,
    {
        Self {
            generator: Rc::new(generator),
        }
    }

    pub fn apply(&self, container: &StyleNode, separator: &str) -> Result<StyleNode> {
        let mut context = VariantContext {
            container: container.clone(),
            separator: separator.to_string(),
        };
        (self.generator)(&mut context)?;
        Ok(context.into_container())
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.generator, &other.generator)
    }
}

impl fmt::Debug for VariantGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("VariantGenerator(..)")
    }
}

#[derive(Debug, Clone, Default)]
pub struct VariantRegistry {
    generators: BTreeMap<String, VariantGenerator>,
}

impl VariantRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `generator` under `name`, returning the one it replaced.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        generator: VariantGenerator,
    ) -> Option<VariantGenerator> {
        self.generators.insert(name.into(), generator)
    }

    pub fn get(&self, name: &str) -> Option<&VariantGenerator> {
        self.generators.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.generators.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.generators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.generators.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.generators.keys().map(String::as_str)
    }

    /// Applies the named generator to `bundle`.
    pub fn expand(&self, name: &str, bundle: &VariantBundle, separator: &str) -> Result<StyleNode> {
        let generator = self
            .get(name)
            .ok_or_else(|| EngineError::UnknownVariant(name.to_string()))?;
        generator.apply(&bundle.container(), separator)
    }
}
