//! [`ExpressionEvaluator`] backed by minijinja expressions.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use colview_markup::{Color, MarkupText};
use minijinja::value::{Enumerator, Object, ObjectRepr, Rest, ValueKind};
use minijinja::{Environment, ErrorKind, UndefinedBehavior, Value as JinjaValue};

use super::{EvalContext, ExpressionEvaluator, HostFunction};
use crate::collections::OrderedMultiMap;
use crate::error::EvalError;
use crate::record::Record;
use crate::value::Value;

/// Minijinja-based expression evaluator.
///
/// Expressions use Jinja syntax without delimiters: `record.Name | upper`,
/// `record.Id * 2`, `fg('red', record.State)`. Undefined values are strict:
/// naming a property the record does not have is an error.
///
/// Records, maps and markup pass through the evaluator unchanged, so an
/// expression returning `record` yields the same record and one returning
/// `fg(...)` yields colored markup.
///
/// ```rust
/// use colview::eval::{EvalContext, ExpressionEvaluator, MiniJinjaEvaluator};
/// use colview::{Record, Value};
/// use std::sync::Arc;
///
/// let evaluator = MiniJinjaEvaluator::new();
/// let record = Arc::new(Record::new(["T"]).with_property("Id", 20i32));
/// let context = EvalContext::for_record(&record);
///
/// assert_eq!(evaluator.invoke("record.Id + 1", &context).unwrap(), vec![Value::I64(21)]);
/// assert!(evaluator.invoke("none", &context).unwrap().is_empty());
/// ```
pub struct MiniJinjaEvaluator {
    env: Environment<'static>,
}

impl MiniJinjaEvaluator {
    /// Creates an evaluator with the color helpers registered.
    pub fn new() -> Self {
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        register_functions(&mut env);
        Self { env }
    }

    /// The underlying environment, for registering extra filters or functions.
    pub fn environment_mut(&mut self) -> &mut Environment<'static> {
        &mut self.env
    }
}

impl Default for MiniJinjaEvaluator {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MiniJinjaEvaluator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MiniJinjaEvaluator").finish_non_exhaustive()
    }
}

impl ExpressionEvaluator for MiniJinjaEvaluator {
    fn invoke(&self, expression: &str, context: &EvalContext) -> Result<Vec<Value>, EvalError> {
        let bridge = Bridge::default();
        let mut vars: BTreeMap<String, JinjaValue> = BTreeMap::new();
        for (name, value) in context.variables() {
            vars.insert(name.clone(), bridge.to_jinja(value));
        }
        for (name, function) in context.functions() {
            vars.insert(name.clone(), bridge.function(function));
        }

        let compiled = self.env.compile_expression(expression)?;
        let result = compiled.eval(JinjaValue::from_iter(vars));
        // A failing or missing property surfaces as undefined inside the
        // expression; report the lookup's own error instead.
        if let Some(failure) = bridge.take_failure() {
            return Err(failure);
        }
        Ok(expand(result?))
    }
}

fn register_functions(env: &mut Environment<'static>) {
    env.add_function(
        "fg",
        |color: String, text: JinjaValue| -> Result<JinjaValue, minijinja::Error> {
            colorize(&color, &text, true)
        },
    );
    env.add_function(
        "bg",
        |color: String, text: JinjaValue| -> Result<JinjaValue, minijinja::Error> {
            colorize(&color, &text, false)
        },
    );
}

fn colorize(color: &str, text: &JinjaValue, foreground: bool) -> Result<JinjaValue, minijinja::Error> {
    let color = Color::parse(color)
        .map_err(|msg| minijinja::Error::new(ErrorKind::InvalidOperation, msg))?;
    let (fg, bg) = if foreground {
        (Some(color), None)
    } else {
        (None, Some(color))
    };
    let mut markup = MarkupText::new();
    markup
        .push_colors(fg, bg)
        .and_then(|m| m.append_markup(&from_jinja(text).to_markup()))
        .and_then(|m| m.pop())
        .map_err(|e| minijinja::Error::new(ErrorKind::InvalidOperation, e.to_string()))?;
    Ok(JinjaValue::from_object(MarkupObject(markup)))
}

/// Turns an expression result into zero or more values.
fn expand(result: JinjaValue) -> Vec<Value> {
    match result.kind() {
        ValueKind::Undefined | ValueKind::None => Vec::new(),
        ValueKind::Seq | ValueKind::Iterable if !is_bridged(&result) => match result.try_iter() {
            Ok(items) => items.map(|item| from_jinja(&item)).collect(),
            Err(_) => vec![from_jinja(&result)],
        },
        _ => vec![from_jinja(&result)],
    }
}

fn is_bridged(value: &JinjaValue) -> bool {
    value.downcast_object_ref::<RecordObject>().is_some()
        || value.downcast_object_ref::<MarkupObject>().is_some()
        || value.downcast_object_ref::<MapObject>().is_some()
}

/// Converts a minijinja value back, recovering bridged objects.
fn from_jinja(value: &JinjaValue) -> Value {
    if let Some(record) = value.downcast_object_ref::<RecordObject>() {
        return Value::Record(Arc::clone(&record.record));
    }
    if let Some(markup) = value.downcast_object_ref::<MarkupObject>() {
        return Value::Markup(markup.0.to_unfrozen());
    }
    if let Some(map) = value.downcast_object_ref::<MapObject>() {
        return Value::Map(Arc::clone(&map.map));
    }

    match value.kind() {
        ValueKind::Undefined | ValueKind::None => Value::Null,
        ValueKind::Bool => Value::Bool(value.is_true()),
        ValueKind::Number => {
            if let Ok(n) = i64::try_from(value.clone()) {
                Value::I64(n)
            } else if let Ok(n) = u64::try_from(value.clone()) {
                Value::U64(n)
            } else {
                f64::try_from(value.clone())
                    .map(Value::F64)
                    .unwrap_or_else(|_| Value::String(value.to_string()))
            }
        }
        ValueKind::String => Value::String(value.as_str().unwrap_or_default().to_string()),
        ValueKind::Seq | ValueKind::Iterable => match value.try_iter() {
            Ok(items) => Value::List(items.map(|item| from_jinja(&item)).collect()),
            Err(_) => Value::String(value.to_string()),
        },
        ValueKind::Map => {
            let mut map = OrderedMultiMap::new();
            if let Ok(keys) = value.try_iter() {
                for key in keys {
                    let item = value.get_item(&key).unwrap_or_default();
                    // Freshly created, never frozen.
                    let _ = map.insert(from_jinja(&key), from_jinja(&item));
                }
            }
            Value::Map(Arc::new(map))
        }
        _ => Value::String(value.to_string()),
    }
}

/// Per-invocation conversion state: collects the first failing getter.
#[derive(Debug, Clone, Default)]
struct Bridge {
    failure: Arc<Mutex<Option<EvalError>>>,
}

impl Bridge {
    fn record_failure(&self, err: EvalError) {
        let mut slot = self.failure.lock().unwrap_or_else(|e| e.into_inner());
        slot.get_or_insert(err);
    }

    fn take_failure(&self) -> Option<EvalError> {
        self.failure.lock().unwrap_or_else(|e| e.into_inner()).take()
    }

    fn to_jinja(&self, value: &Value) -> JinjaValue {
        match value {
            Value::Null => JinjaValue::from(()),
            Value::Bool(b) => JinjaValue::from(*b),
            Value::I8(n) => JinjaValue::from(*n),
            Value::I16(n) => JinjaValue::from(*n),
            Value::I32(n) => JinjaValue::from(*n),
            Value::I64(n) => JinjaValue::from(*n),
            Value::U8(n) => JinjaValue::from(*n),
            Value::U16(n) => JinjaValue::from(*n),
            Value::U32(n) => JinjaValue::from(*n),
            Value::U64(n) => JinjaValue::from(*n),
            Value::F64(n) => JinjaValue::from(*n),
            Value::String(s) => JinjaValue::from(s.as_str()),
            Value::Guid(g) => JinjaValue::from(g.hyphenated().to_string()),
            Value::Markup(m) => JinjaValue::from_object(MarkupObject(m.to_unfrozen())),
            Value::List(items) => {
                JinjaValue::from(items.iter().map(|v| self.to_jinja(v)).collect::<Vec<_>>())
            }
            Value::Map(map) => JinjaValue::from_object(MapObject {
                map: Arc::clone(map),
                bridge: self.clone(),
            }),
            Value::Record(record) => JinjaValue::from_object(RecordObject {
                record: Arc::clone(record),
                bridge: self.clone(),
            }),
        }
    }

    fn function(&self, function: &HostFunction) -> JinjaValue {
        let function = Arc::clone(function);
        let bridge = self.clone();
        JinjaValue::from_function(
            move |args: Rest<JinjaValue>| -> Result<JinjaValue, minijinja::Error> {
                let args: Vec<Value> = args.iter().map(from_jinja).collect();
                match function(&args) {
                    Ok(value) => Ok(bridge.to_jinja(&value)),
                    Err(err) => Err(minijinja::Error::new(ErrorKind::InvalidOperation, err.message)),
                }
            },
        )
    }
}

/// A record seen from inside an expression: properties as attributes.
#[derive(Debug)]
struct RecordObject {
    record: Arc<Record>,
    bridge: Bridge,
}

impl Object for RecordObject {
    fn get_value(self: &Arc<Self>, key: &JinjaValue) -> Option<JinjaValue> {
        let name = key.as_str()?;
        let Some(property) = self.record.properties().find(name) else {
            self.bridge
                .record_failure(EvalError::new(format!("property '{}' not found", name)));
            return None;
        };
        match property.value() {
            Ok(value) => Some(self.bridge.to_jinja(&value)),
            Err(err) => {
                self.bridge.record_failure(err);
                Some(JinjaValue::UNDEFINED)
            }
        }
    }

    fn enumerate(self: &Arc<Self>) -> Enumerator {
        Enumerator::Values(
            self.record
                .properties()
                .visible_names()
                .into_iter()
                .map(JinjaValue::from)
                .collect(),
        )
    }

    fn render(self: &Arc<Self>, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.record.display_markup().render(false))
    }
}

#[derive(Debug)]
struct MarkupObject(MarkupText);

impl Object for MarkupObject {
    fn repr(self: &Arc<Self>) -> ObjectRepr {
        ObjectRepr::Plain
    }

    fn render(self: &Arc<Self>, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.render(false))
    }
}

/// A map value; keys are looked up by their derived string key.
#[derive(Debug)]
struct MapObject {
    map: Arc<OrderedMultiMap<Value, Value>>,
    bridge: Bridge,
}

impl Object for MapObject {
    fn get_value(self: &Arc<Self>, key: &JinjaValue) -> Option<JinjaValue> {
        let key = from_jinja(key);
        let value = match self.map.get_first(&key) {
            Some(value) => value,
            None => self.map.get_by_string_key(key.as_str()?).first()?.1,
        };
        Some(self.bridge.to_jinja(value))
    }

    fn enumerate(self: &Arc<Self>) -> Enumerator {
        Enumerator::Values(self.map.keys().map(|k| self.bridge.to_jinja(k)).collect())
    }
}
