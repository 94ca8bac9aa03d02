//! The rendering pipeline.
//!
//! A [`Pipeline`] binds a [`ViewRegistry`], an [`ExpressionEvaluator`], a
//! [`FormatConfig`] and a [`WidthProvider`]. Each run gets its own
//! [`RenderSession`], which drives records through:
//!
//! ```text
//! Start ──► (blank line) ──► group header ──► row* ──► ... ──► footer ──► End
//!              └─ skipped before the first group
//! ```
//!
//! Per record the session resolves a view, computes the group key and
//! compares it with the previous one (see [`values_differ`]), emits a group
//! header on change and then the row. Failing cells and headers are
//! replaced by an inline `<Error: ...>` placeholder and recorded as
//! [`Diagnostic`]s; they never abort the row or the stream.
//!
//! # Example
//!
//! ```rust
//! use colview::pipeline::{BufferSink, FixedWidth, Pipeline};
//! use colview::{eval::MiniJinjaEvaluator, Record, ViewRegistry};
//!
//! let registry = ViewRegistry::new();
//! let evaluator = MiniJinjaEvaluator::new();
//! let pipeline = Pipeline::new(&registry, &evaluator).with_width(FixedWidth(40));
//!
//! let records = vec![
//!     Record::new(["Thread"]).with_property("Id", 1u32).with_property("State", "Running"),
//!     Record::new(["Thread"]).with_property("Id", 2u32).with_property("State", "Stopped"),
//! ];
//! let mut sink = BufferSink::new();
//! let summary = pipeline.run(records, &mut sink).unwrap();
//!
//! assert_eq!(summary.rows, 2);
//! assert!(sink.lines()[2].contains("Running"));
//! ```

mod cancel;
mod session;
mod sink;

pub use cancel::CancellationToken;
pub use session::RenderSession;
pub use sink::{BufferSink, FixedWidth, OutputSink, TerminalSink, TerminalWidth, WidthProvider};

use std::fmt;
use std::sync::Arc;

use crate::config::FormatConfig;
use crate::error::Result;
use crate::eval::ExpressionEvaluator;
use crate::record::Record;
use crate::registry::ViewRegistry;
use crate::value::Value;
use crate::view::{ViewDefinition, ViewKind};

/// An explicit list of properties to show.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    properties: Vec<String>,
}

impl Selection {
    pub fn new<I, S>(properties: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            properties: properties.into_iter().map(Into::into).collect(),
        }
    }

    pub fn properties(&self) -> &[String] {
        &self.properties
    }
}

/// What the caller asked for.
#[derive(Debug, Clone, Default)]
pub struct FormatRequest {
    /// Use this view for every record, skipping registry lookup.
    pub view: Option<Arc<ViewDefinition>>,
    /// Only views of this kind qualify.
    pub desired_kind: Option<ViewKind>,
    /// Show only these properties.
    pub selection: Option<Selection>,
    /// Regenerate from the selection even when a registered view matches.
    pub force_regenerate: bool,
    /// Emit each value of a multi-valued list item on its own line instead
    /// of `{a, b, ...}`.
    pub dont_group_multiple: bool,
}

impl FormatRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_view(mut self, view: impl Into<Arc<ViewDefinition>>) -> Self {
        self.view = Some(view.into());
        self
    }

    pub fn with_kind(mut self, kind: ViewKind) -> Self {
        self.desired_kind = Some(kind);
        self
    }

    pub fn with_selection(mut self, selection: Selection) -> Self {
        self.selection = Some(selection);
        self
    }

    pub fn force_regenerate(mut self) -> Self {
        self.force_regenerate = true;
        self
    }

    pub fn dont_group_multiple(mut self) -> Self {
        self.dont_group_multiple = true;
        self
    }
}

/// Where a contained failure happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiagnosticSite {
    Cell { column: String },
    GroupHeader,
    Row,
    Footer,
    /// Raised by an expression through `warn(...)`.
    Warning,
}

impl fmt::Display for DiagnosticSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticSite::Cell { column } => write!(f, "cell '{}'", column),
            DiagnosticSite::GroupHeader => f.write_str("group header"),
            DiagnosticSite::Row => f.write_str("row"),
            DiagnosticSite::Footer => f.write_str("footer"),
            DiagnosticSite::Warning => f.write_str("warning"),
        }
    }
}

/// A failure that was absorbed into the output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Zero-based index of the record being rendered.
    pub record: usize,
    pub site: DiagnosticSite,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "record {}, {}: {}", self.record, self.site, self.message)
    }
}

/// The outcome of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderSummary {
    /// Records rendered.
    pub rows: usize,
    /// Group headers emitted.
    pub groups: usize,
    pub diagnostics: Vec<Diagnostic>,
    pub cancelled: bool,
}

/// Group-change predicate.
///
/// Two nulls are the same group; records compare by identity; text
/// compares ignoring case; everything else by value.
pub fn values_differ(previous: &Value, current: &Value) -> bool {
    match (previous, current) {
        (Value::Null, Value::Null) => false,
        (Value::Null, _) | (_, Value::Null) => true,
        (Value::Record(a), Value::Record(b)) => !Arc::ptr_eq(a, b),
        (a, b) if a.is_textual() && b.is_textual() => {
            let a = a.to_markup();
            let b = b.to_markup();
            a.render(false).to_lowercase() != b.render(false).to_lowercase()
        }
        (a, b) => a != b,
    }
}

/// Renders record streams.
pub struct Pipeline<'a> {
    registry: &'a ViewRegistry,
    evaluator: &'a dyn ExpressionEvaluator,
    config: FormatConfig,
    width: Box<dyn WidthProvider + 'a>,
    cancel: CancellationToken,
    request: FormatRequest,
}

impl<'a> Pipeline<'a> {
    /// A pipeline with default config, terminal width and an empty request.
    pub fn new(registry: &'a ViewRegistry, evaluator: &'a dyn ExpressionEvaluator) -> Self {
        Self {
            registry,
            evaluator,
            config: FormatConfig::default(),
            width: Box::new(TerminalWidth),
            cancel: CancellationToken::new(),
            request: FormatRequest::default(),
        }
    }

    pub fn with_config(mut self, config: FormatConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_width(mut self, provider: impl WidthProvider + 'a) -> Self {
        self.width = Box::new(provider);
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn with_request(mut self, request: FormatRequest) -> Self {
        self.request = request;
        self
    }

    pub fn config(&self) -> &FormatConfig {
        &self.config
    }

    pub fn request(&self) -> &FormatRequest {
        &self.request
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    pub(crate) fn registry(&self) -> &ViewRegistry {
        self.registry
    }

    pub(crate) fn evaluator(&self) -> &dyn ExpressionEvaluator {
        self.evaluator
    }

    /// Current output width, falling back to the configured default.
    pub fn width(&self) -> usize {
        self.width
            .width()
            .filter(|w| *w > 0)
            .unwrap_or(self.config.default_width)
    }

    /// Starts a session writing to `sink`.
    pub fn begin<'s>(&'s self, sink: &'s mut dyn OutputSink) -> RenderSession<'s> {
        RenderSession::new(self, sink)
    }

    /// Renders every record, then the footer.
    pub fn run<I, R>(&self, records: I, sink: &mut dyn OutputSink) -> Result<RenderSummary>
    where
        I: IntoIterator<Item = R>,
        R: Into<Arc<Record>>,
    {
        let mut session = self.begin(sink);
        for record in records {
            if session.is_cancelled() {
                break;
            }
            session.process(&record.into())?;
        }
        session.finish()
    }
}

impl fmt::Debug for Pipeline<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("config", &self.config)
            .field("request", &self.request)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_values_differ() {
        assert!(!values_differ(&Value::Null, &Value::Null));
        assert!(values_differ(&Value::Null, &Value::I32(0)));
        assert!(!values_differ(&Value::from("Alpha"), &Value::from("ALPHA")));
        assert!(values_differ(&Value::from("Alpha"), &Value::from("Beta")));
        assert!(!values_differ(&Value::I32(1), &Value::I64(1)));
        assert!(values_differ(&Value::I32(1), &Value::I32(2)));

        let a = Arc::new(Record::new(["T"]));
        let b = Arc::new(Record::new(["T"]));
        assert!(!values_differ(&Value::Record(a.clone()), &Value::Record(a.clone())));
        assert!(values_differ(&Value::Record(a), &Value::Record(b)));
    }

    #[test]
    fn test_request_builder() {
        let request = FormatRequest::new()
            .with_kind(ViewKind::List)
            .with_selection(Selection::new(["Id"]))
            .force_regenerate();
        assert_eq!(request.desired_kind, Some(ViewKind::List));
        assert_eq!(request.selection.unwrap().properties(), &["Id".to_string()]);
        assert!(request.force_regenerate);
    }

    #[test]
    fn test_width_falls_back_to_default() {
        struct Unknown;
        impl WidthProvider for Unknown {
            fn width(&self) -> Option<usize> {
                None
            }
        }
        let registry = ViewRegistry::new();
        let evaluator = crate::eval::MiniJinjaEvaluator::new();
        let pipeline = Pipeline::new(&registry, &evaluator).with_width(Unknown);
        assert_eq!(pipeline.width(), 120);
        let pipeline = pipeline.with_width(FixedWidth(0));
        assert_eq!(pipeline.width(), 120);
    }
}
