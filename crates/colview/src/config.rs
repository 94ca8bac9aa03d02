//! Rendering configuration.
//!
//! [`FormatConfig`] holds the knobs the pipeline consults. Every field has
//! a default, so a YAML file only needs the keys it changes:
//!
//! ```yaml
//! enumeration_limit: 8
//! use_ellipsis: false
//! group_label_color: cyan
//! ```

use std::path::Path;

use colview_markup::Color;
use serde::{Deserialize, Serialize};

use crate::error::{FormatError, Result};

/// Pipeline configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormatConfig {
    /// Values shown for a multi-valued cell before `...`; `0` shows all.
    pub enumeration_limit: usize,
    /// Width used when the terminal width is unknown.
    pub default_width: usize,
    /// Mark truncated cells with an ellipsis.
    pub use_ellipsis: bool,
    /// Emit the header and underline at the top of each table group.
    pub show_table_header: bool,
    /// Character used to underline table headers.
    pub table_separator: char,
    /// Generated views use a table up to this many properties, a list above.
    pub auto_table_max_properties: usize,
    /// Color of inline error placeholders.
    pub error_color: Color,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_label_color: Option<Color>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table_header_color: Option<Color>,
}

impl Default for FormatConfig {
    fn default() -> Self {
        Self {
            enumeration_limit: 4,
            default_width: 120,
            use_ellipsis: true,
            show_table_header: true,
            table_separator: '-',
            auto_table_max_properties: 4,
            error_color: Color::Red,
            group_label_color: None,
            table_header_color: None,
        }
    }
}

impl FormatConfig {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: FormatConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        log::debug!("loading format config from {}", path.display());
        Self::from_yaml(&std::fs::read_to_string(path)?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.default_width == 0 {
            return Err(FormatError::Configuration(
                "default_width must be positive".into(),
            ));
        }
        if self.table_separator.is_control() {
            return Err(FormatError::Configuration(
                "table_separator must be a printable character".into(),
            ));
        }
        Ok(())
    }
}
