//! Views generated from a record's properties.

use super::{Column, ListItem, ViewDefinition, ViewKind};
use crate::record::Record;

/// Builds a minimal view from a record's visible properties, or from an
/// explicit property selection.
///
/// Up to `max_table_properties` properties render as an auto-sized table;
/// more render as a list.
pub fn generate_view(
    record: &Record,
    selection: Option<&[String]>,
    max_table_properties: usize,
) -> ViewDefinition {
    let names = property_names(record, selection);
    log::debug!(
        "generating view for '{}' from {} propert(ies)",
        record.type_name(),
        names.len()
    );

    let kind = if names.len() <= max_table_properties {
        ViewKind::Table
    } else {
        ViewKind::List
    };
    build(names, kind)
}

/// Like [`generate_view`], but always produces a view of `kind`.
pub fn generate_view_as(record: &Record, selection: Option<&[String]>, kind: ViewKind) -> ViewDefinition {
    build(property_names(record, selection), kind)
}

fn property_names(record: &Record, selection: Option<&[String]>) -> Vec<String> {
    match selection {
        Some(names) => names.to_vec(),
        None => record
            .properties()
            .visible_names()
            .into_iter()
            .map(String::from)
            .collect(),
    }
}

fn build(names: Vec<String>, kind: ViewKind) -> ViewDefinition {
    match kind {
        ViewKind::Table => ViewDefinition::table(names.into_iter().map(Column::property).collect()),
        ViewKind::List => ViewDefinition::list(names.into_iter().map(ListItem::property).collect()),
        ViewKind::SingleLine => ViewDefinition::single_line(None),
        ViewKind::Custom => ViewDefinition::custom("record"),
    }
}

/// Merges a regenerated view with an existing one of the same kind: any
/// generated column or item that looks like an existing one is replaced by
/// the existing one, keeping its hand-tuned layout.
pub fn reconcile_with(generated: ViewDefinition, existing: &ViewDefinition) -> ViewDefinition {
    match (generated, existing) {
        (ViewDefinition::Table(mut table), ViewDefinition::Table(old)) => {
            for column in &mut table.columns {
                if let Some(kept) = old.columns.iter().find(|c| c.looks_like(column)) {
                    *column = kept.clone();
                }
            }
            table.options = old.options.clone();
            ViewDefinition::Table(table)
        }
        (ViewDefinition::List(mut list), ViewDefinition::List(old)) => {
            for item in &mut list.items {
                if let Some(kept) = old.items.iter().find(|i| i.looks_like(item)) {
                    *item = kept.clone();
                }
            }
            list.options = old.options.clone();
            ViewDefinition::List(list)
        }
        (generated, _) => generated,
    }
}
