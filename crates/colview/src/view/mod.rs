//! Declarative view definitions.
//!
//! A [`ViewDefinition`] describes how a record is rendered: as a row of a
//! table, as a `Label: value` list, as a single line, or by a custom
//! expression. Definitions are immutable once constructed; the registry
//! replaces them wholesale.
//!
//! All definition types implement serde so they can be loaded from YAML:
//!
//! ```yaml
//! kind: table
//! group_by:
//!   property: Process
//! columns:
//!   - property: Id
//!     width: 6
//!   - script: "record.Name | upper"
//!     label: Name
//! footer: "'end of threads'"
//! ```

mod generate;

pub use generate::{generate_view, generate_view_as, reconcile_with};

use std::fmt;

use colview_markup::{Align, TruncateAt};
use serde::{Deserialize, Serialize};

/// The four concrete view kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewKind {
    Table,
    List,
    Custom,
    SingleLine,
}

impl fmt::Display for ViewKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ViewKind::Table => "table",
            ViewKind::List => "list",
            ViewKind::Custom => "custom",
            ViewKind::SingleLine => "single_line",
        })
    }
}

/// Where a group key comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GroupKey {
    Property { property: String },
    Script { script: String },
}

/// Partitioning of the record stream into contiguous groups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupBy {
    #[serde(flatten)]
    pub key: GroupKey,
    /// Label for the default `Label: value` header.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Custom header expression, replacing the default header.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header: Option<String>,
}

impl GroupBy {
    pub fn property(name: impl Into<String>) -> Self {
        Self {
            key: GroupKey::Property {
                property: name.into(),
            },
            label: None,
            header: None,
        }
    }

    pub fn script(expression: impl Into<String>) -> Self {
        Self {
            key: GroupKey::Script {
                script: expression.into(),
            },
            label: None,
            header: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_header(mut self, expression: impl Into<String>) -> Self {
        self.header = Some(expression.into());
        self
    }

    /// Label used by the default header: explicit label, else the key itself.
    pub fn display_label(&self) -> &str {
        match (&self.label, &self.key) {
            (Some(label), _) => label,
            (None, GroupKey::Property { property }) => property,
            (None, GroupKey::Script { script }) => script,
        }
    }
}

/// Options shared by every view kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_by: Option<GroupBy>,
    /// Keep variables set by the group header visible to rows.
    pub preserve_header_context: bool,
    /// Keep variables set by one row visible to the next row and the footer.
    pub preserve_row_context: bool,
}

/// Where a column or list item gets its value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColumnSource {
    Property {
        property: String,
        /// Expression applied to the property value, bound as `value`.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        format: Option<String>,
    },
    Script {
        script: String,
    },
}

impl ColumnSource {
    pub fn property(name: impl Into<String>) -> Self {
        ColumnSource::Property {
            property: name.into(),
            format: None,
        }
    }

    pub fn script(expression: impl Into<String>) -> Self {
        ColumnSource::Script {
            script: expression.into(),
        }
    }

    /// The property name, for property-backed sources.
    pub fn property_name(&self) -> Option<&str> {
        match self {
            ColumnSource::Property { property, .. } => Some(property),
            ColumnSource::Script { .. } => None,
        }
    }

    fn default_label(&self) -> &str {
        match self {
            ColumnSource::Property { property, .. } => property,
            ColumnSource::Script { script } => script,
        }
    }

    /// Heuristic similarity: property name (ignoring case) and format, or
    /// script text. Labels are compared by the callers.
    fn looks_like(&self, other: &ColumnSource) -> bool {
        match (self, other) {
            (
                ColumnSource::Property {
                    property: a,
                    format: fa,
                },
                ColumnSource::Property {
                    property: b,
                    format: fb,
                },
            ) => a.eq_ignore_ascii_case(b) && fa == fb,
            (ColumnSource::Script { script: a }, ColumnSource::Script { script: b }) => a == b,
            _ => false,
        }
    }
}

fn is_zero(n: &usize) -> bool {
    *n == 0
}

/// A table column. `width == 0` means auto-size.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    #[serde(flatten)]
    pub source: ColumnSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub align: Option<Align>,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub width: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(default)]
    pub trim: TruncateAt,
}

impl Column {
    pub fn property(name: impl Into<String>) -> Self {
        Self::from_source(ColumnSource::property(name))
    }

    pub fn script(label: impl Into<String>, expression: impl Into<String>) -> Self {
        Self::from_source(ColumnSource::script(expression)).with_label(label)
    }

    fn from_source(source: ColumnSource) -> Self {
        Self {
            source,
            label: None,
            align: None,
            width: 0,
            tag: None,
            trim: TruncateAt::End,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_width(mut self, width: usize) -> Self {
        self.width = width;
        self
    }

    pub fn with_align(mut self, align: Align) -> Self {
        self.align = Some(align);
        self
    }

    pub fn with_format(mut self, expression: impl Into<String>) -> Self {
        if let ColumnSource::Property { format, .. } = &mut self.source {
            *format = Some(expression.into());
        }
        self
    }

    pub fn with_trim(mut self, at: TruncateAt) -> Self {
        self.trim = at;
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn is_auto(&self) -> bool {
        self.width == 0
    }

    /// Header text: explicit label, else the property name or script.
    pub fn label(&self) -> &str {
        self.label
            .as_deref()
            .unwrap_or_else(|| self.source.default_label())
    }

    /// Heuristic similarity used to avoid clobbering a hand-written view
    /// when regenerating from a property selection. Not full equality:
    /// width, alignment, tag and trim are ignored.
    pub fn looks_like(&self, other: &Column) -> bool {
        self.source.looks_like(&other.source) && self.label == other.label
    }
}

/// One `Label: value` line of a list view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListItem {
    #[serde(flatten)]
    pub source: ColumnSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl ListItem {
    pub fn property(name: impl Into<String>) -> Self {
        Self {
            source: ColumnSource::property(name),
            label: None,
        }
    }

    pub fn script(label: impl Into<String>, expression: impl Into<String>) -> Self {
        Self {
            source: ColumnSource::script(expression),
            label: Some(label.into()),
        }
    }

    pub fn label(&self) -> &str {
        self.label
            .as_deref()
            .unwrap_or_else(|| self.source.default_label())
    }

    pub fn looks_like(&self, other: &ListItem) -> bool {
        self.source.looks_like(&other.source) && self.label == other.label
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableView {
    pub columns: Vec<Column>,
    /// Rendered once after the last row.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub footer: Option<String>,
    #[serde(flatten)]
    pub options: ViewOptions,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListView {
    pub items: Vec<ListItem>,
    #[serde(flatten)]
    pub options: ViewOptions,
}

/// Rendered by an expression; each result value becomes output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomView {
    pub expression: String,
    /// Rendered once after the last record.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trailer: Option<String>,
    #[serde(flatten)]
    pub options: ViewOptions,
}

/// One line per record. Without an expression, visible properties are
/// rendered as `Name: value` pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SingleLineView {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expression: Option<String>,
    #[serde(flatten)]
    pub options: ViewOptions,
}

/// A view definition, tagged by kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ViewDefinition {
    Table(TableView),
    List(ListView),
    Custom(CustomView),
    SingleLine(SingleLineView),
}

impl ViewDefinition {
    pub fn table(columns: Vec<Column>) -> Self {
        ViewDefinition::Table(TableView {
            columns,
            ..TableView::default()
        })
    }

    pub fn list(items: Vec<ListItem>) -> Self {
        ViewDefinition::List(ListView {
            items,
            ..ListView::default()
        })
    }

    pub fn custom(expression: impl Into<String>) -> Self {
        ViewDefinition::Custom(CustomView {
            expression: expression.into(),
            ..CustomView::default()
        })
    }

    pub fn single_line(expression: Option<String>) -> Self {
        ViewDefinition::SingleLine(SingleLineView {
            expression,
            ..SingleLineView::default()
        })
    }

    pub fn kind(&self) -> ViewKind {
        match self {
            ViewDefinition::Table(_) => ViewKind::Table,
            ViewDefinition::List(_) => ViewKind::List,
            ViewDefinition::Custom(_) => ViewKind::Custom,
            ViewDefinition::SingleLine(_) => ViewKind::SingleLine,
        }
    }

    pub fn options(&self) -> &ViewOptions {
        match self {
            ViewDefinition::Table(v) => &v.options,
            ViewDefinition::List(v) => &v.options,
            ViewDefinition::Custom(v) => &v.options,
            ViewDefinition::SingleLine(v) => &v.options,
        }
    }

    pub fn options_mut(&mut self) -> &mut ViewOptions {
        match self {
            ViewDefinition::Table(v) => &mut v.options,
            ViewDefinition::List(v) => &mut v.options,
            ViewDefinition::Custom(v) => &mut v.options,
            ViewDefinition::SingleLine(v) => &mut v.options,
        }
    }

    pub fn with_group_by(mut self, group_by: GroupBy) -> Self {
        self.options_mut().group_by = Some(group_by);
        self
    }

    pub fn with_footer(mut self, expression: impl Into<String>) -> Self {
        match &mut self {
            ViewDefinition::Table(v) => v.footer = Some(expression.into()),
            ViewDefinition::Custom(v) => v.trailer = Some(expression.into()),
            _ => {}
        }
        self
    }

    pub fn group_by(&self) -> Option<&GroupBy> {
        self.options().group_by.as_ref()
    }

    /// Every column or item of `self` has a look-alike in `other`.
    pub fn looks_like(&self, other: &ViewDefinition) -> bool {
        match (self, other) {
            (ViewDefinition::Table(a), ViewDefinition::Table(b)) => a
                .columns
                .iter()
                .all(|c| b.columns.iter().any(|o| c.looks_like(o))),
            (ViewDefinition::List(a), ViewDefinition::List(b)) => a
                .items
                .iter()
                .all(|i| b.items.iter().any(|o| i.looks_like(o))),
            (ViewDefinition::Custom(a), ViewDefinition::Custom(b)) => a.expression == b.expression,
            (ViewDefinition::SingleLine(a), ViewDefinition::SingleLine(b)) => {
                a.expression == b.expression
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_label_fallbacks() {
        assert_eq!(Column::property("Id").label(), "Id");
        assert_eq!(Column::property("Id").with_label("#").label(), "#");
        assert_eq!(Column::script("Name", "record.Name").label(), "Name");
    }

    #[test]
    fn test_column_looks_like_ignores_layout_fields() {
        let a = Column::property("Id").with_width(5);
        let b = Column::property("id").with_align(Align::Center);
        assert!(a.looks_like(&b));
        assert!(!a.looks_like(&Column::property("Id").with_label("ID")));
        assert!(!a.looks_like(&Column::property("Id").with_format("value * 2")));
        assert!(!a.looks_like(&Column::script("Id", "record.Id")));
    }

    #[test]
    fn test_view_kind_and_options() {
        let view = ViewDefinition::table(vec![Column::property("Id")])
            .with_group_by(GroupBy::property("Process").with_label("Proc"));
        assert_eq!(view.kind(), ViewKind::Table);
        assert_eq!(view.group_by().unwrap().display_label(), "Proc");
        assert!(!view.options().preserve_row_context);
    }

    #[test]
    fn test_yaml_round_trip_shape() {
        let yaml = r#"
kind: table
group_by:
  property: Process
  header: "'Process ' ~ record.Process"
preserve_row_context: true
columns:
  - property: Id
    width: 6
    align: right
  - script: "record.Name"
    label: Name
    trim: middle
footer: "'done'"
"#;
        let view: ViewDefinition = serde_yaml::from_str(yaml).unwrap();
        let ViewDefinition::Table(table) = &view else {
            panic!("expected table, got {:?}", view.kind());
        };
        assert_eq!(table.columns.len(), 2);
        assert_eq!(table.columns[0].width, 6);
        assert_eq!(table.columns[0].align, Some(Align::Right));
        assert_eq!(table.columns[1].source, ColumnSource::script("record.Name"));
        assert_eq!(table.columns[1].trim, TruncateAt::Middle);
        assert_eq!(table.footer.as_deref(), Some("'done'"));
        assert!(table.options.preserve_row_context);
        assert_eq!(
            view.group_by().unwrap().key,
            GroupKey::Property {
                property: "Process".into()
            }
        );
    }

    #[test]
    fn test_yaml_other_kinds() {
        let list: ViewDefinition =
            serde_yaml::from_str("kind: list\nitems:\n  - property: Name\n").unwrap();
        assert_eq!(list.kind(), ViewKind::List);

        let single: ViewDefinition = serde_yaml::from_str("kind: single_line\n").unwrap();
        assert_eq!(single, ViewDefinition::single_line(None));
    }

    #[test]
    fn test_view_looks_like() {
        let hand = ViewDefinition::table(vec![Column::property("Id").with_width(4)]);
        let generated = ViewDefinition::table(vec![Column::property("Id"), Column::property("Name")]);
        assert!(hand.looks_like(&generated));
        assert!(!generated.looks_like(&hand));
        assert!(!hand.looks_like(&ViewDefinition::list(vec![ListItem::property("Id")])));
    }
}
