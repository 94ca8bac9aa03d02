//! Sources of view definitions that can be re-read on demand.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{FormatError, Result};
use crate::view::ViewDefinition;

/// Handle identifying a [`ViewSource`] added to a registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceId(pub(crate) u64);

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "source#{}", self.0)
    }
}

/// Views registered under one type name or template pattern.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ViewSet {
    #[serde(rename = "type")]
    pub type_name: String,
    pub views: Vec<ViewDefinition>,
}

/// Something that produces view registrations and can produce them again.
pub trait ViewSource: Send {
    /// Name used in log messages.
    fn name(&self) -> String;

    /// Produces the current set of registrations.
    fn load(&mut self) -> Result<Vec<ViewSet>>;

    /// Whether [`ViewRegistry::reload`](super::ViewRegistry::reload) re-reads this source.
    fn is_reloadable(&self) -> bool {
        true
    }
}

#[derive(Debug, Deserialize)]
struct ViewFile {
    #[serde(default)]
    views: Vec<ViewSet>,
}

#[derive(Debug, Clone)]
enum YamlOrigin {
    Inline(String),
    File(PathBuf),
}

/// View definitions read from YAML.
///
/// ```yaml
/// views:
///   - type: Thread
///     views:
///       - kind: table
///         columns:
///           - property: Id
///             width: 6
///   - type: "List<*>"
///     views:
///       - kind: custom
///         expression: "record.Count ~ ' items'"
/// ```
///
/// A file-backed source re-reads its file on every load, so a registry
/// reload picks up edits.
#[derive(Debug, Clone)]
pub struct YamlViewSource {
    origin: YamlOrigin,
}

impl YamlViewSource {
    pub fn inline(yaml: impl Into<String>) -> Self {
        Self {
            origin: YamlOrigin::Inline(yaml.into()),
        }
    }

    pub fn from_path(path: impl AsRef<Path>) -> Self {
        Self {
            origin: YamlOrigin::File(path.as_ref().to_path_buf()),
        }
    }

    fn parse(text: &str) -> Result<Vec<ViewSet>> {
        let file: ViewFile = serde_yaml::from_str(text)?;
        if let Some(set) = file.views.iter().find(|s| s.views.is_empty()) {
            return Err(FormatError::Configuration(format!(
                "no views given for '{}'",
                set.type_name
            )));
        }
        Ok(file.views)
    }
}

impl ViewSource for YamlViewSource {
    fn name(&self) -> String {
        match &self.origin {
            YamlOrigin::Inline(_) => "<inline yaml>".to_string(),
            YamlOrigin::File(path) => path.display().to_string(),
        }
    }

    fn load(&mut self) -> Result<Vec<ViewSet>> {
        match &self.origin {
            YamlOrigin::Inline(text) => Self::parse(text),
            YamlOrigin::File(path) => Self::parse(&std::fs::read_to_string(path)?),
        }
    }

    fn is_reloadable(&self) -> bool {
        matches!(self.origin, YamlOrigin::File(_))
    }
}
