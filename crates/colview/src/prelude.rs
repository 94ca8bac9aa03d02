//! Common imports.
//!
//! ```rust
//! use colview::prelude::*;
//!
//! let registry = ViewRegistry::new();
//! let evaluator = MiniJinjaEvaluator::new();
//! let _pipeline = Pipeline::new(&registry, &evaluator);
//! ```

pub use crate::config::FormatConfig;
pub use crate::error::{FormatError, Result};
pub use crate::eval::{EvalContext, ExpressionEvaluator, MiniJinjaEvaluator};
pub use crate::pipeline::{FormatRequest, Pipeline, RenderSummary, Selection};
pub use crate::record::Record;
pub use crate::registry::ViewRegistry;
pub use crate::value::Value;
pub use crate::view::{Column, GroupBy, ListItem, ViewDefinition, ViewKind};
pub use colview_markup::{Align, Color, MarkupText, TruncateAt};
