//! Records: the unit flowing through the rendering pipeline.
//!
//! A [`Record`] carries its type-name chain (most derived first), a
//! [`PropertyBag`] of named, lazily evaluated and possibly failing
//! properties, an optional attached view override, and optionally a
//! pre-colored form of itself (the "supports color rendering" capability).
//!
//! ```rust
//! use colview::{Record, Value};
//!
//! let thread = Record::new(["Thread", "Object"])
//!     .with_property("Id", 7u32)
//!     .with_lazy_property("State", || Ok(Value::from("Stopped")));
//!
//! assert_eq!(thread.type_names()[0], "Thread");
//! assert_eq!(thread.property("state").unwrap(), Value::from("Stopped"));
//! assert!(thread.property("Missing").is_err());
//! ```

use std::fmt;
use std::sync::Arc;

use colview_markup::MarkupText;

use crate::error::{EvalError, FormatError, Result};
use crate::value::Value;
use crate::view::ViewDefinition;

/// A failure-capable property getter.
pub type Accessor = Arc<dyn Fn() -> std::result::Result<Value, EvalError> + Send + Sync>;

#[derive(Clone)]
enum PropertySource {
    Stored(Value),
    Lazy(Accessor),
}

/// One named property.
#[derive(Clone)]
pub struct Property {
    name: String,
    source: PropertySource,
    hidden: bool,
}

impl Property {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Hidden properties are addressable but left out of generated views.
    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    /// Evaluates the property.
    pub fn value(&self) -> std::result::Result<Value, EvalError> {
        match &self.source {
            PropertySource::Stored(v) => Ok(v.clone()),
            PropertySource::Lazy(accessor) => accessor(),
        }
    }
}

impl fmt::Debug for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Property");
        s.field("name", &self.name);
        match &self.source {
            PropertySource::Stored(v) => s.field("value", v),
            PropertySource::Lazy(_) => s.field("value", &"<lazy>"),
        };
        s.field("hidden", &self.hidden).finish()
    }
}

/// Ordered mapping from property name to accessor.
///
/// Names are matched case-insensitively; on duplicate names the later
/// definition replaces the earlier one in place.
#[derive(Debug, Clone, Default)]
pub struct PropertyBag {
    properties: Vec<Property>,
}

impl PropertyBag {
    pub fn new() -> Self {
        Self::default()
    }

    fn set(&mut self, property: Property) {
        match self
            .properties
            .iter_mut()
            .find(|p| p.name.eq_ignore_ascii_case(&property.name))
        {
            Some(existing) => *existing = property,
            None => self.properties.push(property),
        }
    }

    /// Stores a ready value.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.set(Property {
            name: name.into(),
            source: PropertySource::Stored(value.into()),
            hidden: false,
        });
    }

    /// Stores a getter evaluated on every read.
    pub fn insert_lazy<F>(&mut self, name: impl Into<String>, accessor: F)
    where
        F: Fn() -> std::result::Result<Value, EvalError> + Send + Sync + 'static,
    {
        self.set(Property {
            name: name.into(),
            source: PropertySource::Lazy(Arc::new(accessor)),
            hidden: false,
        });
    }

    /// Stores a value that generated views skip.
    pub fn insert_hidden(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.set(Property {
            name: name.into(),
            source: PropertySource::Stored(value.into()),
            hidden: true,
        });
    }

    pub fn find(&self, name: &str) -> Option<&Property> {
        self.properties
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
    }

    /// Reads a property; absent names are a [`FormatError::LookupMiss`].
    pub fn get(&self, name: &str) -> Result<Value> {
        let property = self.find(name).ok_or_else(|| FormatError::LookupMiss {
            property: name.to_string(),
        })?;
        Ok(property.value()?)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Property> {
        self.properties.iter()
    }

    /// Names of the properties generated views show, in order.
    pub fn visible_names(&self) -> Vec<&str> {
        self.properties
            .iter()
            .filter(|p| !p.hidden)
            .map(|p| p.name.as_str())
            .collect()
    }
}

/// A structured record to render.
#[derive(Debug, Clone)]
pub struct Record {
    type_names: Vec<String>,
    properties: PropertyBag,
    view_override: Option<Arc<ViewDefinition>>,
    color_form: Option<MarkupText>,
}

impl Record {
    /// Creates a record with its type-name chain, most derived first.
    pub fn new<I, S>(type_names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            type_names: type_names.into_iter().map(Into::into).collect(),
            properties: PropertyBag::new(),
            view_override: None,
            color_form: None,
        }
    }

    /// Builds a record from a JSON object, one property per field.
    pub fn from_json<I, S>(type_names: I, json: &serde_json::Value) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let serde_json::Value::Object(fields) = json else {
            return Err(FormatError::Configuration(format!(
                "record JSON must be an object, got {}",
                json
            )));
        };
        let mut record = Record::new(type_names);
        for (name, value) in fields {
            record.properties.insert(name.clone(), Value::from_json(value));
        }
        Ok(record)
    }

    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(name, value);
        self
    }

    pub fn with_lazy_property<F>(mut self, name: impl Into<String>, accessor: F) -> Self
    where
        F: Fn() -> std::result::Result<Value, EvalError> + Send + Sync + 'static,
    {
        self.properties.insert_lazy(name, accessor);
        self
    }

    pub fn with_hidden_property(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert_hidden(name, value);
        self
    }

    /// Attaches a view that takes precedence over type-based lookup.
    pub fn with_view(mut self, view: impl Into<Arc<ViewDefinition>>) -> Self {
        self.view_override = Some(view.into());
        self
    }

    /// Marks the record as able to render itself in color.
    pub fn with_color_form(mut self, markup: MarkupText) -> Self {
        self.color_form = Some(markup);
        self
    }

    pub fn type_names(&self) -> &[String] {
        &self.type_names
    }

    /// The most derived type name, or `""` for an untyped record.
    pub fn type_name(&self) -> &str {
        self.type_names.first().map(String::as_str).unwrap_or("")
    }

    pub fn properties(&self) -> &PropertyBag {
        &self.properties
    }

    pub fn properties_mut(&mut self) -> &mut PropertyBag {
        &mut self.properties
    }

    pub fn property(&self, name: &str) -> Result<Value> {
        self.properties.get(name)
    }

    pub fn view_override(&self) -> Option<&Arc<ViewDefinition>> {
        self.view_override.as_ref()
    }

    pub fn supports_color(&self) -> bool {
        self.color_form.is_some()
    }

    pub fn color_form(&self) -> Option<&MarkupText> {
        self.color_form.as_ref()
    }

    /// How the record shows up inside a cell: its color form, else its type name.
    pub fn display_markup(&self) -> MarkupText {
        match &self.color_form {
            Some(markup) => markup.to_unfrozen(),
            None => MarkupText::plain(self.type_name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use colview_markup::Color;
    use serde_json::json;

    #[test]
    fn test_property_lookup_is_case_insensitive() {
        let record = Record::new(["T"]).with_property("Name", "x");
        assert_eq!(record.property("NAME").unwrap(), Value::from("x"));
    }

    #[test]
    fn test_missing_property_is_lookup_miss() {
        let record = Record::new(["T"]);
        assert!(matches!(
            record.property("nope"),
            Err(FormatError::LookupMiss { .. })
        ));
    }

    #[test]
    fn test_failing_accessor_is_evaluation_error() {
        let record = Record::new(["T"]).with_lazy_property("Bad", || Err(EvalError::new("boom")));
        let err = record.property("Bad").unwrap_err();
        assert!(matches!(err, FormatError::Evaluation(_)));
        assert!(err.to_string().contains("boom"));
    }

    #[test]
    fn test_redefinition_replaces_in_place() {
        let record = Record::new(["T"])
            .with_property("A", 1i32)
            .with_property("B", 2i32)
            .with_property("a", 3i32);
        assert_eq!(record.properties().visible_names(), vec!["a", "B"]);
        assert_eq!(record.property("A").unwrap(), Value::I32(3));
    }

    #[test]
    fn test_hidden_properties_not_visible() {
        let record = Record::new(["T"])
            .with_property("Shown", 1i32)
            .with_hidden_property("Secret", 2i32);
        assert_eq!(record.properties().visible_names(), vec!["Shown"]);
        assert_eq!(record.property("Secret").unwrap(), Value::I32(2));
    }

    #[test]
    fn test_from_json() {
        let record = Record::from_json(["Module"], &json!({"Name": "ntdll", "Base": 4096})).unwrap();
        assert_eq!(record.type_name(), "Module");
        assert_eq!(record.property("Base").unwrap(), Value::I64(4096));
        assert!(Record::from_json(["X"], &json!([1, 2])).is_err());
    }

    #[test]
    fn test_display_markup() {
        let plain = Record::new(["Frame"]);
        assert_eq!(plain.display_markup().render(false), "Frame");
        assert!(!plain.supports_color());

        let colored = Record::new(["Frame"]).with_color_form(MarkupText::colored(Color::Green, "#0"));
        assert!(colored.supports_color());
        assert_eq!(colored.display_markup().render(true), "\x1b[32m#0\x1b[0m");
    }
}
