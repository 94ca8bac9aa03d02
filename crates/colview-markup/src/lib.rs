//! # Colview Markup - Color-directive text for terminal rendering
//!
//! `colview-markup` provides [`MarkupText`], a string-like value that keeps
//! color scopes as structured push/pop directives and tracks its *apparent
//! length* (visible columns) separately from its byte length.
//!
//! It also provides the ANSI-aware helpers used to lay text out in columns:
//! [`width::display_width`], [`width::truncate`] and
//! [`width::make_fixed_width`].
//!
//! ## Example
//!
//! ```rust
//! use colview_markup::{Align, Color, MarkupText, TruncateAt};
//!
//! let mut cell = MarkupText::new();
//! cell.append_fg(Color::Yellow, "0x7ff6a2c41000").unwrap();
//!
//! let fitted = cell.fixed_width(10, true, Align::Left, TruncateAt::End);
//! assert_eq!(fitted.render(false), "0x7ff6a2c…");
//! assert_eq!(fitted.length(), 10);
//! ```
//!
//! ## Freezing
//!
//! Frozen markup is immutable: every mutating call returns
//! [`FrozenMutationError`] while reads keep working.
//!
//! ```rust
//! use colview_markup::MarkupText;
//!
//! let mut sep = MarkupText::plain(" | ").frozen();
//! assert!(sep.append("x").is_err());
//! assert_eq!(sep.render(false), " | ");
//! ```

mod color;
mod error;
mod markup;
pub mod width;

pub use color::Color;
pub use error::FrozenMutationError;
pub use markup::{ControlCode, DeferredElement, DeferredEvaluator, Element, MarkupText};
pub use width::{Align, TruncateAt, ELLIPSIS};
