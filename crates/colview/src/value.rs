//! Runtime values produced by properties and expressions.
//!
//! [`Value`] is the currency between records, the expression evaluator and
//! the renderer. Integers keep their width so the layout engine can guess a
//! column width from the sample record (see [`Value::width_hint`]).

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use colview_markup::MarkupText;
use uuid::Uuid;

use crate::collections::OrderedMultiMap;
use crate::record::Record;

/// A dynamically typed value.
#[derive(Debug, Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    F64(f64),
    String(String),
    Guid(Uuid),
    /// Text that already carries color directives.
    Markup(MarkupText),
    List(Vec<Value>),
    /// A map-like value (dictionary, multimap) in insertion order.
    Map(Arc<OrderedMultiMap<Value, Value>>),
    /// A nested record, compared by identity.
    Record(Arc<Record>),
}

impl Value {
    /// Short name of the runtime kind, used in diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::I8(_) => "i8",
            Value::I16(_) => "i16",
            Value::I32(_) => "i32",
            Value::I64(_) => "i64",
            Value::U8(_) => "u8",
            Value::U16(_) => "u16",
            Value::U32(_) => "u32",
            Value::U64(_) => "u64",
            Value::F64(_) => "f64",
            Value::String(_) => "string",
            Value::Guid(_) => "guid",
            Value::Markup(_) => "markup",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Record(_) => "record",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// True for values whose natural form is text.
    pub fn is_textual(&self) -> bool {
        matches!(self, Value::String(_) | Value::Markup(_))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Arc<Record>> {
        match self {
            Value::Record(r) => Some(r),
            _ => None,
        }
    }

    /// Integer value widened to `i128`, for any integer variant.
    pub fn as_integer(&self) -> Option<i128> {
        match *self {
            Value::I8(n) => Some(n.into()),
            Value::I16(n) => Some(n.into()),
            Value::I32(n) => Some(n.into()),
            Value::I64(n) => Some(n.into()),
            Value::U8(n) => Some(n.into()),
            Value::U16(n) => Some(n.into()),
            Value::U32(n) => Some(n.into()),
            Value::U64(n) => Some(n.into()),
            _ => None,
        }
    }

    /// Column width guess for auto-sized columns, from the runtime kind.
    ///
    /// Covers small, medium and large signed/unsigned integers (widest
    /// decimal rendering, sign included) and GUIDs. Everything else has no
    /// fixed-width rendering and returns `None`.
    pub fn width_hint(&self) -> Option<usize> {
        match self {
            Value::I8(_) | Value::I16(_) => Some(6),
            Value::U8(_) | Value::U16(_) => Some(5),
            Value::I32(_) => Some(11),
            Value::U32(_) => Some(10),
            Value::I64(_) | Value::U64(_) => Some(20),
            Value::Guid(_) => Some(36),
            _ => None,
        }
    }

    /// Renders the value as cell text.
    ///
    /// Strings are not quoted; lists and maps are fully enumerated (the
    /// pipeline applies the enumeration limit itself).
    pub fn to_markup(&self) -> MarkupText {
        match self {
            Value::Markup(m) => m.to_unfrozen(),
            Value::Record(r) => r.display_markup(),
            Value::List(items) => {
                let mut out = MarkupText::plain("{");
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        push_plain(&mut out, ", ");
                    }
                    push_markup(&mut out, &item.to_markup());
                }
                push_plain(&mut out, "}");
                out
            }
            other => MarkupText::plain(other.scalar_text()),
        }
    }

    /// Renders the value on one line, quoting strings.
    pub fn to_single_line(&self) -> String {
        match self {
            Value::String(s) => format!("\"{}\"", s),
            Value::Markup(m) => format!("\"{}\"", m.render(false)),
            Value::List(items) => {
                let parts: Vec<String> = items.iter().map(Value::to_single_line).collect();
                format!("{{{}}}", parts.join(", "))
            }
            Value::Map(map) => {
                let parts: Vec<String> = map
                    .iter()
                    .map(|(k, v)| format!("{}: {}", k.to_single_line(), v.to_single_line()))
                    .collect();
                format!("{{{}}}", parts.join(", "))
            }
            Value::Record(r) => r.display_markup().render(false).to_string(),
            other => other.scalar_text(),
        }
    }

    fn scalar_text(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Bool(b) => b.to_string(),
            Value::I8(n) => n.to_string(),
            Value::I16(n) => n.to_string(),
            Value::I32(n) => n.to_string(),
            Value::I64(n) => n.to_string(),
            Value::U8(n) => n.to_string(),
            Value::U16(n) => n.to_string(),
            Value::U32(n) => n.to_string(),
            Value::U64(n) => n.to_string(),
            Value::F64(n) => n.to_string(),
            Value::String(s) => s.clone(),
            Value::Guid(g) => g.hyphenated().to_string(),
            Value::Map(_) => self.to_single_line(),
            Value::Markup(m) => m.render(false).to_string(),
            Value::List(_) | Value::Record(_) => self.to_markup().render(false).to_string(),
        }
    }

    /// Converts a JSON value; objects become maps with string keys.
    pub fn from_json(json: &serde_json::Value) -> Value {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::I64(i)
                } else if let Some(u) = n.as_u64() {
                    Value::U64(u)
                } else {
                    Value::F64(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            serde_json::Value::String(s) => Value::String(s.clone()),
            serde_json::Value::Array(items) => Value::List(items.iter().map(Value::from_json).collect()),
            serde_json::Value::Object(map) => {
                let mut out = OrderedMultiMap::new();
                for (k, v) in map {
                    // A fresh map is never frozen.
                    let _ = out.insert(Value::String(k.clone()), Value::from_json(v));
                }
                Value::Map(Arc::new(out))
            }
        }
    }
}

fn push_plain(out: &mut MarkupText, text: &str) {
    // Locally built, never frozen.
    let _ = out.append(text);
}

fn push_markup(out: &mut MarkupText, other: &MarkupText) {
    let _ = out.append_markup(other);
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        if let (Some(a), Some(b)) = (self.as_integer(), other.as_integer()) {
            return a == b;
        }
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::F64(a), Value::F64(b)) => a.to_bits() == b.to_bits(),
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Guid(a), Value::Guid(b)) => a == b,
            (Value::Markup(a), Value::Markup(b)) => a.render(false) == b.render(false),
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => Arc::ptr_eq(a, b) || a.iter().eq(b.iter()),
            (Value::Record(a), Value::Record(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        if let Some(n) = self.as_integer() {
            0u8.hash(state);
            n.hash(state);
            return;
        }
        match self {
            Value::Null => 1u8.hash(state),
            Value::Bool(b) => (2u8, b).hash(state),
            Value::F64(f) => (3u8, f.to_bits()).hash(state),
            Value::String(s) => (4u8, s).hash(state),
            Value::Guid(g) => (5u8, g).hash(state),
            Value::Markup(m) => (6u8, m.render(false)).hash(state),
            Value::List(items) => (7u8, items).hash(state),
            Value::Map(map) => {
                8u8.hash(state);
                for (k, v) in map.iter() {
                    k.hash(state);
                    v.hash(state);
                }
            }
            Value::Record(r) => (9u8, Arc::as_ptr(r) as usize).hash(state),
            _ => unreachable!("integers handled above"),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_markup().render(false))
    }
}

macro_rules! impl_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(v)
                }
            }
        )*
    };
}

impl_from! {
    bool => Bool,
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    f64 => F64,
    String => String,
    Uuid => Guid,
    MarkupText => Markup,
    Vec<Value> => List,
    Arc<Record> => Record,
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<Record> for Value {
    fn from(v: Record) -> Self {
        Value::Record(Arc::new(v))
    }
}

impl From<OrderedMultiMap<Value, Value>> for Value {
    fn from(v: OrderedMultiMap<Value, Value>) -> Self {
        Value::Map(Arc::new(v))
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use colview_markup::Color;
    use serde_json::json;

    #[test]
    fn test_integers_compare_across_widths() {
        assert_eq!(Value::I8(5), Value::U64(5));
        assert_ne!(Value::I32(-1), Value::U32(u32::MAX));
        assert_ne!(Value::I64(1), Value::F64(1.0));
    }

    #[test]
    fn test_width_hints() {
        assert_eq!(Value::U8(1).width_hint(), Some(5));
        assert_eq!(Value::I32(1).width_hint(), Some(11));
        assert_eq!(Value::U64(1).width_hint(), Some(20));
        assert_eq!(Value::Guid(Uuid::nil()).width_hint(), Some(36));
        assert_eq!(Value::from("x").width_hint(), None);
        assert_eq!(Value::F64(1.5).width_hint(), None);
    }

    #[test]
    fn test_to_markup_list() {
        let list = Value::List(vec![1i32.into(), "two".into(), Value::Null]);
        assert_eq!(list.to_markup().render(false), "{1, two, }");
    }

    #[test]
    fn test_to_markup_keeps_colors() {
        let v = Value::Markup(MarkupText::colored(Color::Red, "bad"));
        assert_eq!(v.to_markup().render(true), "\x1b[31mbad\x1b[0m");
    }

    #[test]
    fn test_single_line_quotes_strings() {
        assert_eq!(Value::from("abc").to_single_line(), "\"abc\"");
        assert_eq!(Value::I16(-3).to_single_line(), "-3");
        let list = Value::List(vec!["a".into(), 2u8.into()]);
        assert_eq!(list.to_single_line(), "{\"a\", 2}");
    }

    #[test]
    fn test_from_json() {
        let v = Value::from_json(&json!({"a": 1, "b": [true, null], "c": "x"}));
        let Value::Map(map) = &v else {
            panic!("expected map");
        };
        assert_eq!(map.len(), 3);
        assert_eq!(map.get_first(&Value::from("a")), Some(&Value::I64(1)));
        assert_eq!(
            map.get_first(&Value::from("b")),
            Some(&Value::List(vec![Value::Bool(true), Value::Null]))
        );
        assert_eq!(Value::from_json(&json!(1.5)), Value::F64(1.5));
        assert_eq!(Value::from_json(&json!(u64::MAX)), Value::U64(u64::MAX));
    }

    #[test]
    fn test_records_compare_by_identity() {
        let a = Arc::new(Record::new(["T"]));
        let b = Arc::new(Record::new(["T"]));
        assert_eq!(Value::Record(a.clone()), Value::Record(a.clone()));
        assert_ne!(Value::Record(a), Value::Record(b));
    }

    #[test]
    fn test_option_conversion() {
        assert_eq!(Value::from(None::<i32>), Value::Null);
        assert_eq!(Value::from(Some("x")), Value::from("x"));
    }
}
