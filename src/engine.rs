//! The plugin engine.
//!
//! `process` runs every plugin once, in order, handing each a [`PluginApi`]
//! that borrows the configuration and a per-run [`BuildContext`]. Plugins
//! never see what earlier plugins emitted; only the configuration and the
//! name-keyed registries are shared between them.

use crate::config::{Configuration, Important};
use crate::error::{EngineError, Result};
use crate::escape::escape_class_name;
use crate::prefix::Prefixer;
use crate::specificity::increase_specificity;
use crate::style::{StyleNode, Styles};
use crate::variants::{
    VariantBundle, VariantContext, VariantGenerator, VariantRegistry, wrap_with_variants,
};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;
use tracing::{debug, trace};

pub type PluginFn = dyn Fn(&mut PluginApi<'_>) -> Result<()>;
pub type FunctionFn = dyn Fn(&[String]) -> Result<String>;

#[derive(Clone)]
pub enum Plugin {
    Function(Rc<PluginFn>),
    Object(PluginObject),
}

/// The object form of a plugin. Without a handler it contributes nothing.
#[derive(Clone, Default)]
pub struct PluginObject {
    pub name: Option<String>,
    pub handler: Option<Rc<PluginFn>>,
}

impl Plugin {
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(&mut PluginApi<'_>) -> Result<()> + 'static,
    {
        Self::Function(Rc::new(handler))
    }

    pub fn with_handler<F>(name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&mut PluginApi<'_>) -> Result<()> + 'static,
    {
        Self::Object(PluginObject {
            name: Some(name.into()),
            handler: Some(Rc::new(handler)),
        })
    }

    pub fn inert() -> Self {
        Self::Object(PluginObject::default())
    }

    fn handler(&self) -> Option<&PluginFn> {
        match self {
            Self::Function(handler) => Some(handler.as_ref()),
            Self::Object(object) => object.handler.as_deref(),
        }
    }

    fn label(&self) -> &str {
        match self {
            Self::Object(PluginObject {
                name: Some(name), ..
            }) => name,
            _ => "<anonymous>",
        }
    }
}

impl fmt::Debug for Plugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Function(_) => f.write_str("Plugin::Function(..)"),
            Self::Object(object) => f
                .debug_struct("Plugin::Object")
                .field("name", &object.name)
                .field("has_handler", &object.handler.is_some())
                .finish(),
        }
    }
}

/// A value function plugins expose to custom CSS value syntax.
#[derive(Clone)]
pub struct CssFunction(Rc<FunctionFn>);

impl CssFunction {
    pub fn new<F>(executor: F) -> Self
    where
        F: Fn(&[String]) -> Result<String> + 'static,
    {
        Self(Rc::new(executor))
    }

    pub fn call(&self, args: &[String]) -> Result<String> {
        (self.0)(args)
    }
}

impl fmt::Debug for CssFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CssFunction(..)")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UtilityOptions {
    pub variants: Vec<String>,
    pub respect_prefix: bool,
    pub respect_important: bool,
}

impl Default for UtilityOptions {
    fn default() -> Self {
        Self {
            variants: Vec::new(),
            respect_prefix: true,
            respect_important: true,
        }
    }
}

impl UtilityOptions {
    pub fn with_variants<I, S>(variants: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            variants: variants.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn respect_prefix(mut self, respect: bool) -> Self {
        self.respect_prefix = respect;
        self
    }

    pub fn respect_important(mut self, respect: bool) -> Self {
        self.respect_important = respect;
        self
    }
}

impl From<Vec<String>> for UtilityOptions {
    fn from(variants: Vec<String>) -> Self {
        Self::with_variants(variants)
    }
}

impl From<Vec<&str>> for UtilityOptions {
    fn from(variants: Vec<&str>) -> Self {
        Self::with_variants(variants)
    }
}

impl<const N: usize> From<[&str; N]> for UtilityOptions {
    fn from(variants: [&str; N]) -> Self {
        Self::with_variants(variants)
    }
}

impl From<&[&str]> for UtilityOptions {
    fn from(variants: &[&str]) -> Self {
        Self::with_variants(variants.iter().copied())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComponentOptions {
    pub respect_prefix: bool,
}

impl Default for ComponentOptions {
    fn default() -> Self {
        Self {
            respect_prefix: true,
        }
    }
}

/// Everything plugins contribute during one run.
#[derive(Debug, Default)]
pub struct BuildContext {
    base: Vec<StyleNode>,
    components: Vec<StyleNode>,
    utilities: Vec<VariantBundle>,
    variant_generators: VariantRegistry,
    functions: BTreeMap<String, CssFunction>,
    prefixer: Prefixer,
}

impl BuildContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn base(&self) -> &[StyleNode] {
        &self.base
    }

    pub fn components(&self) -> &[StyleNode] {
        &self.components
    }

    pub fn utilities(&self) -> &[VariantBundle] {
        &self.utilities
    }

    pub fn variant_generators(&self) -> &VariantRegistry {
        &self.variant_generators
    }

    pub fn functions(&self) -> &BTreeMap<String, CssFunction> {
        &self.functions
    }

    pub fn into_output(self) -> EngineOutput {
        EngineOutput {
            base: self.base,
            components: self.components,
            utilities: self.utilities,
            variant_generators: self.variant_generators,
            functions: self.functions,
        }
    }
}

/// The aggregate of a finished run, handed to a serializer.
#[derive(Debug, Clone)]
pub struct EngineOutput {
    base: Vec<StyleNode>,
    components: Vec<StyleNode>,
    utilities: Vec<VariantBundle>,
    variant_generators: VariantRegistry,
    functions: BTreeMap<String, CssFunction>,
}

impl EngineOutput {
    pub fn base(&self) -> &[StyleNode] {
        &self.base
    }

    pub fn components(&self) -> &[StyleNode] {
        &self.components
    }

    pub fn utilities(&self) -> &[VariantBundle] {
        &self.utilities
    }

    pub fn variant_generators(&self) -> &VariantRegistry {
        &self.variant_generators
    }

    pub fn functions(&self) -> &BTreeMap<String, CssFunction> {
        &self.functions
    }

    /// Utility nodes in emission order: each bundle verbatim, then the
    /// bundle once per requested variant, expanded by its generator.
    pub fn expand_utilities(&self, config: &Configuration) -> Result<Vec<StyleNode>> {
        let mut expanded = Vec::new();
        for bundle in &self.utilities {
            expanded.extend(bundle.nodes.iter().cloned());
            for variant in &bundle.variants {
                let container = self
                    .variant_generators
                    .expand(variant, bundle, config.separator())?;
                expanded.extend(container.into_nodes());
            }
        }
        Ok(expanded)
    }
}

/// The capabilities a plugin is invoked with.
pub struct PluginApi<'a> {
    config: &'a Configuration,
    context: &'a mut BuildContext,
}

impl<'a> PluginApi<'a> {
    pub fn new(config: &'a Configuration, context: &'a mut BuildContext) -> Self {
        Self { config, context }
    }

    pub fn config(&self, path: &str, default: Value) -> Value {
        self.config.value(path, default)
    }

    pub fn theme(&self, path: &str, default: Value) -> Value {
        self.config.theme(path, default)
    }

    pub fn variants(&self, path: &str, default: &[&str]) -> Vec<String> {
        self.config.variants(path, default)
    }

    pub fn e(&self, class: &str) -> String {
        escape_class_name(class)
    }

    /// Prefixes `selector`. Selectors produced here pass through the
    /// add-time prefixing of this run unchanged.
    pub fn prefix(&mut self, selector: &str) -> Result<String> {
        self.context.prefixer.apply(self.config.prefix(), selector)
    }

    pub fn add_base(&mut self, styles: impl Into<Styles>) -> Result<()> {
        let nodes = styles.into().into_nodes()?;
        trace!(count = nodes.len(), "adding base styles");
        self.context.base.extend(nodes);
        Ok(())
    }

    pub fn add_components(
        &mut self,
        components: impl Into<Styles>,
        options: ComponentOptions,
    ) -> Result<()> {
        let mut root = StyleNode::root(components.into().into_nodes()?);
        if options.respect_prefix {
            self.apply_prefix(&mut root)?;
        }
        let nodes = root.into_nodes();
        trace!(count = nodes.len(), "adding components");
        self.context.components.extend(nodes);
        Ok(())
    }

    pub fn add_utilities(
        &mut self,
        utilities: impl Into<Styles>,
        options: impl Into<UtilityOptions>,
    ) -> Result<()> {
        let options = options.into();
        let mut root = StyleNode::root(utilities.into().into_nodes()?);

        if options.respect_prefix {
            self.apply_prefix(&mut root)?;
        }

        if options.respect_important {
            match self.config.important() {
                Important::Disabled => {}
                Important::Flag => {
                    root.walk_declarations_mut(&mut |declaration| declaration.important = true);
                }
                Important::Selector(anchor) => {
                    root.walk_rules_mut(&mut |selector: &mut String| {
                        *selector = increase_specificity(anchor, selector)?;
                        Ok(())
                    })?;
                }
            }
        }

        let bundle = wrap_with_variants(root.into_nodes(), options.variants);
        trace!(
            count = bundle.nodes.len(),
            variants = ?bundle.variants,
            "adding utilities"
        );
        self.context.utilities.push(bundle);
        Ok(())
    }

    pub fn add_variant<F>(&mut self, name: impl Into<String>, generator: F)
    where
        F: Fn(&mut VariantContext) -> Result<()> + 'static,
    {
        let name = name.into();
        let replaced = self
            .context
            .variant_generators
            .register(name.clone(), VariantGenerator::new(generator));
        if replaced.is_some() {
            debug!(variant = %name, "variant generator replaced");
        }
    }

    pub fn add_function<F>(&mut self, name: impl Into<String>, executor: F)
    where
        F: Fn(&[String]) -> Result<String> + 'static,
    {
        let name = name.into();
        if self
            .context
            .functions
            .insert(name.clone(), CssFunction::new(executor))
            .is_some()
        {
            debug!(function = %name, "css function replaced");
        }
    }

    fn apply_prefix(&mut self, root: &mut StyleNode) -> Result<()> {
        let prefix = self.config.prefix();
        if prefix.is_empty() {
            return Ok(());
        }
        let prefixer = &mut self.context.prefixer;
        root.walk_rules_mut(&mut |selector: &mut String| {
            *selector = prefixer.apply(prefix, selector)?;
            Ok(())
        })
    }
}

pub fn process(plugins: &[Plugin], config: &Configuration) -> Result<EngineOutput> {
    let mut context = BuildContext::new();
    process_into(plugins, config, &mut context)?;
    Ok(context.into_output())
}

/// Runs `plugins` against a caller-owned context. On failure the context
/// keeps everything contributed before the failing call.
pub fn process_into(
    plugins: &[Plugin],
    config: &Configuration,
    context: &mut BuildContext,
) -> Result<()> {
    for (idx, plugin) in plugins.iter().enumerate() {
        let Some(handler) = plugin.handler() else {
            trace!(index = idx, "skipping plugin without a handler");
            continue;
        };
        debug!(index = idx, plugin = plugin.label(), "running plugin");
        let mut api = PluginApi::new(config, context);
        handler(&mut api)?;
    }
    Ok(())
}
