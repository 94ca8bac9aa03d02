//! Expression evaluation.
//!
//! Views refer to expressions (script columns, format expressions, group
//! keys and headers, custom views, footers). The pipeline treats the
//! evaluator as an opaque callable behind [`ExpressionEvaluator`]:
//!
//! ```text
//! invoke(expression, context) -> zero or more values
//! ```
//!
//! The context binds named variables (`record` and `_` for the current
//! record) and named host functions. [`MiniJinjaEvaluator`] is the default
//! implementation.

mod engine;

pub use engine::MiniJinjaEvaluator;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use colview_markup::{DeferredEvaluator, MarkupText};

use crate::error::EvalError;
use crate::record::Record;
use crate::value::Value;

/// A function the host exposes to expressions.
pub type HostFunction = Arc<dyn Fn(&[Value]) -> Result<Value, EvalError> + Send + Sync>;

/// Evaluates expressions against a context.
///
/// Implementations are borrowed for the duration of one call; nothing is
/// retained between calls except what the implementation caches itself.
pub trait ExpressionEvaluator: Send + Sync {
    /// Evaluates `expression`. A sequence result yields one value per item;
    /// a none/undefined result yields no values.
    fn invoke(&self, expression: &str, context: &EvalContext) -> Result<Vec<Value>, EvalError>;

    /// Evaluates and expects at most one value; none becomes [`Value::Null`].
    fn invoke_single(&self, expression: &str, context: &EvalContext) -> Result<Value, EvalError> {
        let mut values = self.invoke(expression, context)?;
        match values.len() {
            0 => Ok(Value::Null),
            1 => Ok(values.remove(0)),
            _ => Ok(Value::List(values)),
        }
    }
}

/// Named variables and host functions visible to an expression.
#[derive(Clone, Default)]
pub struct EvalContext {
    variables: BTreeMap<String, Value>,
    functions: BTreeMap<String, HostFunction>,
}

impl EvalContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Context with `record` and `_` bound to `record`.
    pub fn for_record(record: &Arc<Record>) -> Self {
        let mut context = Self::new();
        context.bind_record(record);
        context
    }

    pub fn bind_record(&mut self, record: &Arc<Record>) {
        let value = Value::Record(Arc::clone(record));
        self.variables.insert("_".to_string(), value.clone());
        self.variables.insert("record".to_string(), value);
    }

    pub fn with_variable(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set_variable(name, value);
        self
    }

    pub fn set_variable(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.variables.insert(name.into(), value.into());
    }

    pub fn variable(&self, name: &str) -> Option<&Value> {
        self.variables.get(name)
    }

    pub fn variables(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.variables.iter()
    }

    pub fn with_function<F>(mut self, name: impl Into<String>, function: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value, EvalError> + Send + Sync + 'static,
    {
        self.set_function(name, Arc::new(function));
        self
    }

    pub fn set_function(&mut self, name: impl Into<String>, function: HostFunction) {
        self.functions.insert(name.into(), function);
    }

    pub fn functions(&self) -> impl Iterator<Item = (&String, &HostFunction)> {
        self.functions.iter()
    }
}

impl fmt::Debug for EvalContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EvalContext")
            .field("variables", &self.variables)
            .field("functions", &self.functions.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Concatenates values into cell text, separated by `", "`.
pub fn join_values(values: &[Value]) -> MarkupText {
    let mut out = MarkupText::new();
    for (i, value) in values.iter().enumerate() {
        // `out` is never frozen.
        if i > 0 {
            let _ = out.append(", ");
        }
        let _ = out.append_markup(&value.to_markup());
    }
    out
}

/// Resolves deferred markup elements through an [`ExpressionEvaluator`].
///
/// The element's arguments are bound as the list variable `args`.
pub struct DeferredExpression {
    evaluator: Arc<dyn ExpressionEvaluator>,
    context: EvalContext,
}

impl DeferredExpression {
    pub fn new(evaluator: Arc<dyn ExpressionEvaluator>, context: EvalContext) -> Self {
        Self { evaluator, context }
    }
}

impl DeferredEvaluator for DeferredExpression {
    fn evaluate(&self, expression: &str, args: &[String]) -> Result<MarkupText, String> {
        let mut context = self.context.clone();
        context.set_variable(
            "args",
            Value::List(args.iter().map(|a| Value::from(a.as_str())).collect()),
        );
        let values = self
            .evaluator
            .invoke(expression, &context)
            .map_err(|e| e.message)?;
        Ok(join_values(&values))
    }
}
