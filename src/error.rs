use thiserror::Error;

/// Fatal conditions raised while running plugins.
///
/// Lookup misses are never errors; they resolve to the caller's default.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// A style object had a shape the style tree parser cannot interpret.
    #[error("malformed style tree at `{path}`: {message}")]
    MalformedStyles { path: String, message: String },

    /// A selector could not be tokenized safely for rewriting.
    #[error("cannot resolve selector `{selector}`: {message}")]
    UnresolvableSelector { selector: String, message: String },

    /// A utility bundle asked for a variant nobody registered.
    #[error("unknown variant `{0}`")]
    UnknownVariant(String),

    /// A plugin body reported a failure of its own.
    #[error("plugin failed: {0}")]
    Plugin(String),

    /// A registered CSS value function rejected its arguments.
    #[error("function `{name}` failed: {message}")]
    Function { name: String, message: String },
}

pub type Result<T> = std::result::Result<T, EngineError>;

impl EngineError {
    pub fn malformed(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MalformedStyles {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn selector(selector: impl Into<String>, message: impl Into<String>) -> Self {
        Self::UnresolvableSelector {
            selector: selector.into(),
            message: message.into(),
        }
    }

    pub fn plugin(message: impl Into<String>) -> Self {
        Self::Plugin(message.into())
    }

    pub fn function(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Function {
            name: name.into(),
            message: message.into(),
        }
    }
}
