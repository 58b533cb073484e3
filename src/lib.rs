//! Plugin engine for a utility-first CSS framework.
//!
//! Plugins receive a [`PluginApi`] and contribute base styles, components,
//! utilities, variant generators and value functions. [`process`] runs them
//! in order and returns an [`EngineOutput`] for a serializer to print.

pub mod config;
pub mod engine;
pub mod error;
pub mod escape;
pub mod prefix;
pub mod selector;
pub mod specificity;
pub mod style;
pub mod variants;

pub use config::{ConfigError, Configuration, Important, load};
pub use engine::{
    BuildContext, ComponentOptions, CssFunction, EngineOutput, Plugin, PluginApi, PluginObject,
    UtilityOptions, process, process_into,
};
pub use error::{EngineError, Result};
pub use escape::{escape_class_name, unescape_identifier};
pub use prefix::{Prefixer, prefix_selector};
pub use specificity::{Specificity, increase_specificity, specificity};
pub use style::{Declaration, StyleNode, Styles, is_keyframes, parse_styles};
pub use variants::{
    SelectorTarget, VariantBundle, VariantContext, VariantGenerator, VariantRegistry,
    wrap_with_variants,
};
