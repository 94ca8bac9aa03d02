//! Table column layout.
//!
//! [`compute_layout`] turns a list of [`Column`]s (fixed width, or `0` for
//! auto-size) into concrete widths and alignments for a buffer width:
//!
//! 1. `W = buffer_width - 1`; `remaining = W - Σ fixed - (n - 1)`, the
//!    `n - 1` being the single-space separators between columns.
//! 2. Fail with [`LayoutError`] if `remaining < 4 × auto_count`.
//! 3. An auto column backed by a property whose sample value has a known
//!    width (see [`Value::width_hint`](crate::Value::width_hint)) takes that
//!    width; the rest take `floor(remaining / auto_count)`, the remainder
//!    going one unit at a time to the earliest of them. Each auto column is
//!    then widened to its label if needed.
//! 4. If widening overflowed `W`, the widest auto columns give back one
//!    column at a time until `Σ widths + (n - 1) ≤ W` holds.
//!
//! Unless set explicitly, the first column aligns right, the last left,
//! and the rest center. A single column counts as first.
//!
//! ```rust
//! use colview::layout::compute_layout;
//! use colview::Column;
//!
//! let columns = vec![
//!     Column::property("A").with_width(5),
//!     Column::property("B").with_width(5),
//!     Column::property("C"),
//! ];
//! let layout = compute_layout(&columns, 40, None).unwrap();
//! assert_eq!(layout.widths(), vec![5, 5, 27]);
//! ```

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use colview_markup::Align;
use unicode_width::UnicodeWidthStr;

use crate::error::LayoutError;
use crate::record::Record;
use crate::view::Column;

/// Minimum columns each auto-sized column must be able to get.
pub const MIN_AUTO_WIDTH: usize = 4;

/// Width and alignment of one column after layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedColumn {
    pub width: usize,
    pub align: Align,
}

/// The outcome of [`compute_layout`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedLayout {
    pub columns: Vec<ResolvedColumn>,
    pub buffer_width: usize,
}

impl ResolvedLayout {
    pub fn widths(&self) -> Vec<usize> {
        self.columns.iter().map(|c| c.width).collect()
    }

    /// Widths plus separators.
    pub fn total_width(&self) -> usize {
        let sum: usize = self.columns.iter().map(|c| c.width).sum();
        sum + self.columns.len().saturating_sub(1)
    }
}

fn default_align(index: usize, count: usize) -> Align {
    if index == 0 {
        Align::Right
    } else if index + 1 == count {
        Align::Left
    } else {
        Align::Center
    }
}

fn sample_hint(column: &Column, sample: Option<&Record>) -> Option<usize> {
    let name = column.source.property_name()?;
    sample?.property(name).ok()?.width_hint()
}

/// Computes column widths and alignments for `buffer_width`.
pub fn compute_layout(
    columns: &[Column],
    buffer_width: usize,
    sample: Option<&Record>,
) -> Result<ResolvedLayout, LayoutError> {
    let count = columns.len();
    let usable = buffer_width.saturating_sub(1) as isize;
    let fixed: usize = columns.iter().map(|c| c.width).sum();
    let separators = count.saturating_sub(1);
    let remaining = usable - fixed as isize - separators as isize;

    let auto_count = columns.iter().filter(|c| c.is_auto()).count();
    let needed = MIN_AUTO_WIDTH * auto_count;
    if remaining < needed as isize {
        return Err(LayoutError {
            auto_columns: auto_count,
            remaining,
            needed,
        });
    }

    let (share, mut extra) = if auto_count == 0 {
        (0, 0)
    } else {
        let remaining = remaining as usize;
        (remaining / auto_count, remaining % auto_count)
    };

    let mut resolved: Vec<ResolvedColumn> = Vec::with_capacity(count);
    for (i, column) in columns.iter().enumerate() {
        let width = if column.is_auto() {
            let base = sample_hint(column, sample).unwrap_or_else(|| {
                let bonus = usize::from(extra > 0);
                extra -= bonus;
                share + bonus
            });
            base.max(column.label().width())
        } else {
            column.width
        };
        resolved.push(ResolvedColumn {
            width,
            align: column.align.unwrap_or_else(|| default_align(i, count)),
        });
    }

    let limit = usable as usize;
    let mut total = resolved.iter().map(|c| c.width).sum::<usize>() + separators;
    while total > limit {
        let widest = columns
            .iter()
            .zip(&resolved)
            .enumerate()
            .filter(|(_, (column, r))| column.is_auto() && r.width > 1)
            .max_by(|(ia, (_, a)), (ib, (_, b))| a.width.cmp(&b.width).then(ib.cmp(ia)))
            .map(|(i, _)| i);
        let Some(i) = widest else { break };
        resolved[i].width -= 1;
        total -= 1;
    }

    log::debug!(
        "layout for width {}: {:?}",
        buffer_width,
        resolved.iter().map(|c| c.width).collect::<Vec<_>>()
    );
    Ok(ResolvedLayout {
        columns: resolved,
        buffer_width,
    })
}

/// Layouts memoized per buffer width.
#[derive(Debug, Clone, Default)]
pub struct LayoutCache {
    entries: HashMap<usize, ResolvedLayout>,
}

impl LayoutCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_compute(
        &mut self,
        columns: &[Column],
        buffer_width: usize,
        sample: Option<&Record>,
    ) -> Result<&ResolvedLayout, LayoutError> {
        match self.entries.entry(buffer_width) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => Ok(entry.insert(compute_layout(columns, buffer_width, sample)?)),
        }
    }

    pub fn invalidate(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A table's columns together with their memoized layouts.
#[derive(Debug, Clone)]
pub struct TableLayout {
    columns: Vec<Column>,
    cache: LayoutCache,
}

impl TableLayout {
    pub fn new(columns: Vec<Column>) -> Self {
        Self {
            columns,
            cache: LayoutCache::new(),
        }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Changes one column's width, discarding memoized layouts.
    pub fn set_column_width(&mut self, index: usize, width: usize) -> bool {
        match self.columns.get_mut(index) {
            Some(column) => {
                column.width = width;
                self.cache.invalidate();
                true
            }
            None => false,
        }
    }

    pub fn resolve(
        &mut self,
        buffer_width: usize,
        sample: Option<&Record>,
    ) -> Result<&ResolvedLayout, LayoutError> {
        self.cache
            .get_or_compute(&self.columns, buffer_width, sample)
    }

    /// Discards memoized layouts.
    pub fn invalidate(&mut self) {
        self.cache.invalidate();
    }

    pub fn cached_widths(&self) -> usize {
        self.cache.len()
    }
}

/// Short placeholder for a failed cell too narrow for the full error text.
///
/// Returns `None` for width 0 (the error propagates) and for widths of 4
/// and up (the full placeholder is used).
pub fn error_token(width: usize) -> Option<&'static str> {
    match width {
        1 => Some("X"),
        2 => Some("ER"),
        3 => Some("ERR"),
        _ => None,
    }
}
