//! # Colview - View-driven rendering of structured record streams
//!
//! `colview` renders a stream of structured records as colorized,
//! column-aligned terminal text. For each record it picks a *view* (table,
//! list, single line or custom) from the record's type-name chain, lays
//! table columns out for the current terminal width, renders every cell
//! with zero-width color directives that survive truncation and padding,
//! and emits group headers and footers as the stream is partitioned.
//!
//! ## Core Concepts
//!
//! - [`Record`]: type-name chain plus a bag of lazily evaluated properties
//! - [`ViewDefinition`]: how a record renders ([`ViewKind`] Table, List,
//!   Custom or SingleLine)
//! - [`ViewRegistry`]: type name or template pattern to views, with
//!   per-kind in-place replacement
//! - [`layout::compute_layout`]: column widths for a terminal width
//! - [`Pipeline`]: the per-record driver writing to an
//!   [`OutputSink`](pipeline::OutputSink)
//! - [`MarkupText`]: text with color scopes, from `colview-markup`
//!
//! ## Quick Start
//!
//! ```rust
//! use colview::pipeline::{BufferSink, FixedWidth};
//! use colview::prelude::*;
//!
//! let mut registry = ViewRegistry::new();
//! registry.register("Module", vec![
//!     ViewDefinition::table(vec![
//!         Column::property("Name").with_width(8),
//!         Column::script("Size", "record.Size // 1024 ~ ' KB'"),
//!     ]),
//! ], None).unwrap();
//!
//! let evaluator = MiniJinjaEvaluator::new();
//! let pipeline = Pipeline::new(&registry, &evaluator).with_width(FixedWidth(30));
//!
//! let mut sink = BufferSink::new();
//! pipeline.run(vec![
//!     Record::new(["Module"]).with_property("Name", "ntdll").with_property("Size", 2048u64),
//! ], &mut sink).unwrap();
//!
//! assert_eq!(sink.lines()[2].trim_end(), "   ntdll 2 KB");
//! ```
//!
//! ## Errors
//!
//! Failures while evaluating a single cell or group header are contained:
//! the cell shows `<Error: ...>` and a [`Diagnostic`](pipeline::Diagnostic)
//! is recorded. Configuration and layout errors propagate as
//! [`FormatError`].

pub mod collections;
pub mod config;
mod error;
pub mod eval;
pub mod layout;
pub mod pipeline;
pub mod prelude;
mod record;
pub mod registry;
mod template_name;
mod value;
pub mod view;

pub use collections::{MapKey, OrderedMap, OrderedMultiMap};
pub use colview_markup::{width, Align, Color, FrozenMutationError, MarkupText, TruncateAt};
pub use config::FormatConfig;
pub use error::{EvalError, FormatError, LayoutError, Result};
pub use pipeline::{FormatRequest, Pipeline, RenderSummary, Selection};
pub use record::{Accessor, Property, PropertyBag, Record};
pub use registry::{RegistryEvent, ViewRegistry, YamlViewSource};
pub use template_name::{looks_like_template, ArgPattern, TemplateName};
pub use value::Value;
pub use view::{Column, ColumnSource, GroupBy, ListItem, ViewDefinition, ViewKind};
