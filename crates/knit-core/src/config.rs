//! Rewriter configuration
//!
//! [`RewriteConfig`] is the in-memory form, built with `with_*` methods on
//! top of [`Default`]. [`Settings`] is the file form read from `knit.toml`
//! and converted into a `RewriteConfig`.

use crate::error::{Result, RewriteError};
use knit_document::{CodeBlockSelector, Node, Selector};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// Attribute naming a fragment's group
pub const GROUP_ATTR: &str = "group";
/// Attribute toggling a fragment's output block
pub const OUTPUT_ATTR: &str = "output";
/// Attribute toggling a fragment's result block
pub const RESULT_ATTR: &str = "result";

/// Group used when the naming function yields nothing
pub const DEFAULT_GROUP: &str = "main";

/// Derives a group name from a fragment node
///
/// Returning `None` selects the configured default group.
pub type GroupNaming = Arc<dyn Fn(&Node) -> Option<String> + Send + Sync>;

/// Rewriter configuration
#[derive(Clone)]
pub struct RewriteConfig {
    /// Which nodes are fragments
    pub selector: Arc<dyn Selector>,
    /// Group name per fragment node
    pub group_naming: GroupNaming,
    /// Emit a `warn!` event per failed fragment
    pub warn_on_error: bool,
    /// Group for fragments the naming function leaves unnamed
    pub default_group: String,
    /// Render output blocks unless a fragment says otherwise
    pub show_output: bool,
    /// Render result blocks unless a fragment says otherwise
    pub show_result: bool,
}

impl RewriteConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With fragment selector
    #[inline]
    #[must_use]
    pub fn with_selector(mut self, selector: impl Selector + 'static) -> Self {
        self.selector = Arc::new(selector);
        self
    }

    /// With group naming function
    #[inline]
    #[must_use]
    pub fn with_group_naming<F>(mut self, naming: F) -> Self
    where
        F: Fn(&Node) -> Option<String> + Send + Sync + 'static,
    {
        self.group_naming = Arc::new(naming);
        self
    }

    /// With warning emission on failed fragments
    #[inline]
    #[must_use]
    pub fn with_warn_on_error(mut self, warn: bool) -> Self {
        self.warn_on_error = warn;
        self
    }

    /// With default group name
    #[inline]
    #[must_use]
    pub fn with_default_group(mut self, group: impl Into<String>) -> Self {
        self.default_group = group.into();
        self
    }

    /// With output block default
    #[inline]
    #[must_use]
    pub fn with_show_output(mut self, show: bool) -> Self {
        self.show_output = show;
        self
    }

    /// With result block default
    #[inline]
    #[must_use]
    pub fn with_show_result(mut self, show: bool) -> Self {
        self.show_result = show;
        self
    }

    /// Check configuration before use
    ///
    /// # Errors
    /// - `RewriteError::Configuration` if the default group is empty
    pub fn validate(&self) -> Result<()> {
        if self.default_group.trim().is_empty() {
            return Err(RewriteError::configuration("default group name is empty"));
        }
        Ok(())
    }

    /// Group name for a fragment node
    pub(crate) fn group_name(&self, node: &Node) -> Result<String> {
        match (self.group_naming)(node) {
            Some(name) if name.trim().is_empty() => Err(RewriteError::configuration(
                "group naming produced an empty group name",
            )),
            Some(name) => Ok(name),
            None => Ok(self.default_group.clone()),
        }
    }
}

impl Default for RewriteConfig {
    fn default() -> Self {
        Self {
            selector: Arc::new(CodeBlockSelector::new()),
            group_naming: Arc::new(|node: &Node| node.attr(GROUP_ATTR).map(str::to_string)),
            warn_on_error: true,
            default_group: DEFAULT_GROUP.to_string(),
            show_output: true,
            show_result: true,
        }
    }
}

impl fmt::Debug for RewriteConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RewriteConfig")
            .field("warn_on_error", &self.warn_on_error)
            .field("default_group", &self.default_group)
            .field("show_output", &self.show_output)
            .field("show_result", &self.show_result)
            .finish_non_exhaustive()
    }
}

/// Rendering options of one fragment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FragmentOptions {
    /// Render the output block
    pub show_output: bool,
    /// Render the result block
    pub show_result: bool,
}

impl FragmentOptions {
    /// Read options from a fragment node, falling back to configured defaults
    pub(crate) fn read(
        config: &RewriteConfig,
        node: &Node,
        document: &Path,
        index: usize,
    ) -> Result<Self> {
        let flag = |option: &str, default: bool| match node.attr(option) {
            None => Ok(default),
            Some(value) => parse_flag(value).ok_or_else(|| RewriteError::InvalidOption {
                document: document.to_path_buf(),
                index,
                option: option.to_string(),
                value: value.to_string(),
            }),
        };
        Ok(Self {
            show_output: flag(OUTPUT_ATTR, config.show_output)?,
            show_result: flag(RESULT_ATTR, config.show_result)?,
        })
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "1" => Some(true),
        "false" | "no" | "0" => Some(false),
        _ => None,
    }
}

/// File form of the configuration
///
/// ```toml
/// default_group = "main"
/// warn_on_error = true
/// show_output = true
/// show_result = true
/// language = "calc"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Group for fragments without a `group` attribute
    pub default_group: String,
    /// Emit a `warn!` event per failed fragment
    pub warn_on_error: bool,
    /// Output block default
    pub show_output: bool,
    /// Result block default
    pub show_result: bool,
    /// Only run code blocks of this language
    pub language: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_group: DEFAULT_GROUP.to_string(),
            warn_on_error: true,
            show_output: true,
            show_result: true,
            language: None,
        }
    }
}

impl Settings {
    /// Parse settings from TOML text
    ///
    /// # Errors
    /// - `RewriteError::Settings` on malformed TOML or unknown keys
    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Read settings from a file
    ///
    /// # Errors
    /// - `RewriteError::Io` if the file cannot be read
    /// - `RewriteError::Settings` on malformed TOML or unknown keys
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| RewriteError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }

    /// Convert into a rewriter configuration
    ///
    /// # Errors
    /// - `RewriteError::Configuration` if `default_group` or `language` is empty
    pub fn into_config(self) -> Result<RewriteConfig> {
        let selector = match self.language {
            Some(language) if language.trim().is_empty() => {
                return Err(RewriteError::configuration("language filter is empty"));
            }
            Some(language) => CodeBlockSelector::language(language),
            None => CodeBlockSelector::new(),
        };
        let config = RewriteConfig::new()
            .with_selector(selector)
            .with_default_group(self.default_group)
            .with_warn_on_error(self.warn_on_error)
            .with_show_output(self.show_output)
            .with_show_result(self.show_result);
        config.validate()?;
        Ok(config)
    }
}
