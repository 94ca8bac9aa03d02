//! Per-run rendering state.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use colview_markup::width::pad_right;
use colview_markup::MarkupText;
use unicode_width::UnicodeWidthStr;

use super::{Diagnostic, DiagnosticSite, OutputSink, Pipeline, RenderSummary};
use crate::error::{EvalError, FormatError, Result};
use crate::eval::{join_values, EvalContext, HostFunction};
use crate::layout::{error_token, TableLayout};
use crate::record::Record;
use crate::value::Value;
use crate::view::{
    generate_view, generate_view_as, reconcile_with, ColumnSource, GroupBy, GroupKey, ViewDefinition,
};

type Scope = BTreeMap<String, Value>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

/// State of the view currently rendering.
struct ActiveView {
    view: Arc<ViewDefinition>,
    table: Option<TableLayout>,
    started: bool,
    group_key: Value,
    rows: usize,
    rows_in_group: usize,
}

impl ActiveView {
    fn new(view: Arc<ViewDefinition>) -> Self {
        let table = match view.as_ref() {
            ViewDefinition::Table(t) => Some(TableLayout::new(t.columns.clone())),
            _ => None,
        };
        Self {
            view,
            table,
            started: false,
            group_key: Value::Null,
            rows: 0,
            rows_in_group: 0,
        }
    }
}

/// One pipeline run.
///
/// Created by [`Pipeline::begin`]; feed records with
/// [`process`](Self::process) and end with [`finish`](Self::finish), which
/// emits the footer and returns the [`RenderSummary`].
pub struct RenderSession<'s> {
    pipeline: &'s Pipeline<'s>,
    sink: &'s mut dyn OutputSink,
    functions: Vec<(String, HostFunction)>,
    scope: Arc<Mutex<Scope>>,
    header_scope: Scope,
    diagnostics: Arc<Mutex<Vec<Diagnostic>>>,
    current_record: Arc<AtomicUsize>,
    generated: HashMap<String, Arc<ViewDefinition>>,
    active: Option<ActiveView>,
    last_record: Option<Arc<Record>>,
    record_index: usize,
    rows: usize,
    groups: usize,
    lines_written: usize,
    cancelled: bool,
}

impl<'s> RenderSession<'s> {
    pub(super) fn new(pipeline: &'s Pipeline<'s>, sink: &'s mut dyn OutputSink) -> Self {
        let scope = Arc::new(Mutex::new(Scope::new()));
        let diagnostics = Arc::new(Mutex::new(Vec::new()));
        let current_record = Arc::new(AtomicUsize::new(0));
        let functions = host_functions(&scope, &diagnostics, &current_record);
        Self {
            pipeline,
            sink,
            functions,
            scope,
            header_scope: Scope::new(),
            diagnostics,
            current_record,
            generated: HashMap::new(),
            active: None,
            last_record: None,
            record_index: 0,
            rows: 0,
            groups: 0,
            lines_written: 0,
            cancelled: false,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled || self.pipeline.cancellation().is_cancelled()
    }

    /// Diagnostics recorded so far.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        lock(&self.diagnostics).clone()
    }

    /// Renders one record: view resolution, group detection, header, row.
    pub fn process(&mut self, record: &Arc<Record>) -> Result<()> {
        if self.check_cancelled() {
            return Ok(());
        }
        self.current_record
            .store(self.record_index, Ordering::SeqCst);

        let view = self.resolve_view(record);
        let mut active = match self.active.take() {
            Some(active) if Arc::ptr_eq(&active.view, &view) => active,
            Some(previous) => {
                log::debug!(
                    "view changed to {} at record {}",
                    view.kind(),
                    self.record_index
                );
                self.finish_view(previous)?;
                ActiveView::new(view)
            }
            None => ActiveView::new(view),
        };

        let outcome = self.render_record(&mut active, record);
        self.active = Some(active);
        self.last_record = Some(Arc::clone(record));
        self.record_index += 1;
        outcome
    }

    /// Emits the footer (unless nothing was rendered or the run was
    /// cancelled) and returns the summary.
    pub fn finish(mut self) -> Result<RenderSummary> {
        if let Some(active) = self.active.take() {
            self.finish_view(active)?;
        }
        let cancelled = self.is_cancelled();
        let diagnostics = std::mem::take(&mut *lock(&self.diagnostics));
        log::debug!(
            "render finished: {} row(s), {} group(s), {} diagnostic(s){}",
            self.rows,
            self.groups,
            diagnostics.len(),
            if cancelled { ", cancelled" } else { "" }
        );
        Ok(RenderSummary {
            rows: self.rows,
            groups: self.groups,
            diagnostics,
            cancelled,
        })
    }

    fn check_cancelled(&mut self) -> bool {
        if !self.cancelled && self.pipeline.cancellation().is_cancelled() {
            log::debug!("render cancelled at record {}", self.record_index);
            self.cancelled = true;
        }
        self.cancelled
    }

    fn resolve_view(&mut self, record: &Arc<Record>) -> Arc<ViewDefinition> {
        let pipeline = self.pipeline;
        let request = pipeline.request();
        if let Some(view) = &request.view {
            return Arc::clone(view);
        }
        let selection = request.selection.as_ref().map(|s| s.properties());
        let chosen = pipeline
            .registry()
            .choose_view_for(record, request.desired_kind);
        match (chosen, selection) {
            (Some(view), Some(selection)) if request.force_regenerate => {
                self.generated_view(record, Some(selection), Some(&view))
            }
            (Some(view), _) => view,
            (None, selection) => self.generated_view(record, selection, None),
        }
    }

    /// Generated views are cached per type name so consecutive records of
    /// one type share a view.
    fn generated_view(
        &mut self,
        record: &Record,
        selection: Option<&[String]>,
        existing: Option<&Arc<ViewDefinition>>,
    ) -> Arc<ViewDefinition> {
        let key = record.type_name().to_ascii_lowercase();
        if let Some(view) = self.generated.get(&key) {
            return Arc::clone(view);
        }
        let pipeline = self.pipeline;
        let mut view = match pipeline.request().desired_kind {
            Some(kind) => generate_view_as(record, selection, kind),
            None => generate_view(record, selection, pipeline.config().auto_table_max_properties),
        };
        if let Some(existing) = existing {
            if existing.kind() == view.kind() {
                view = reconcile_with(view, existing);
            }
        }
        let view = Arc::new(view);
        self.generated.insert(key, Arc::clone(&view));
        view
    }

    fn render_record(&mut self, active: &mut ActiveView, record: &Arc<Record>) -> Result<()> {
        let view = Arc::clone(&active.view);
        let group_by = view.group_by();
        let key = match group_by {
            Some(group_by) => self.group_key(group_by, record),
            None => Value::Null,
        };

        let new_group = !active.started
            || (group_by.is_some() && super::values_differ(&active.group_key, &key));
        if new_group {
            if self.check_cancelled() {
                return Ok(());
            }
            if self.lines_written > 0 {
                self.write(&MarkupText::new())?;
            }
            lock(&self.scope).clear();
            if let Some(table) = active.table.as_mut() {
                table.invalidate();
            }
            active.rows_in_group = 0;
            active.started = true;
            active.group_key = key.clone();

            if let Some(group_by) = group_by {
                self.render_group_header(group_by, record, &key)?;
                self.groups += 1;
            }
            self.header_scope = if view.options().preserve_header_context {
                lock(&self.scope).clone()
            } else {
                Scope::new()
            };
            if let Some(table) = active.table.as_mut() {
                if self.pipeline.config().show_table_header {
                    self.render_table_header(table, record)?;
                }
            }
        }

        if active.rows_in_group == 0 || !view.options().preserve_row_context {
            *lock(&self.scope) = self.header_scope.clone();
        }

        let rendered = match view.as_ref() {
            ViewDefinition::Table(_) => match active.table.as_mut() {
                Some(table) => self.render_table_row(table, record)?,
                None => false,
            },
            ViewDefinition::List(list) => {
                if active.rows_in_group > 0 {
                    self.write(&MarkupText::new())?;
                }
                self.render_list_row(&list.items, record)?
            }
            ViewDefinition::Custom(custom) => self.render_custom_row(&custom.expression, record)?,
            ViewDefinition::SingleLine(single) => {
                self.render_single_line(single.expression.as_deref(), record)?
            }
        };
        if rendered {
            active.rows += 1;
            active.rows_in_group += 1;
            self.rows += 1;
        }
        Ok(())
    }

    fn group_key(&mut self, group_by: &GroupBy, record: &Arc<Record>) -> Value {
        let result = match &group_by.key {
            GroupKey::Property { property } => record.property(property),
            GroupKey::Script { script } => self
                .pipeline
                .evaluator()
                .invoke_single(script, &self.context(Some(record)))
                .map_err(FormatError::from),
        };
        match result {
            Ok(value) => value,
            Err(err) => Value::Markup(self.contain(err, DiagnosticSite::GroupHeader)),
        }
    }

    fn render_group_header(&mut self, group_by: &GroupBy, record: &Arc<Record>, key: &Value) -> Result<()> {
        let header = match &group_by.header {
            Some(expression) => {
                let mut context = self.context(Some(record));
                context.set_variable("key", key.clone());
                match self.pipeline.evaluator().invoke(expression, &context) {
                    Ok(values) => join_values(&values),
                    Err(err) => self.contain(err.into(), DiagnosticSite::GroupHeader),
                }
            }
            None => {
                let label = format!("{}: ", group_by.display_label());
                let mut header = match self.pipeline.config().group_label_color {
                    Some(color) => MarkupText::colored(color, label),
                    None => MarkupText::plain(label),
                };
                header.append_markup(&key.to_markup())?;
                header
            }
        };
        self.write_lines(&header)
    }

    fn render_table_header(&mut self, table: &mut TableLayout, sample: &Arc<Record>) -> Result<()> {
        let pipeline = self.pipeline;
        let config = pipeline.config();
        let layout = table.resolve(pipeline.width(), Some(sample))?.clone();
        let mut labels = MarkupText::new();
        let mut underline = String::new();
        for (i, (column, resolved)) in table.columns().iter().zip(&layout.columns).enumerate() {
            if i > 0 {
                labels.append(" ")?;
                underline.push(' ');
            }
            let label = match config.table_header_color {
                Some(color) => MarkupText::colored(color, column.label()),
                None => MarkupText::plain(column.label()),
            };
            labels.append_markup(&label.fixed_width(
                resolved.width,
                config.use_ellipsis,
                resolved.align,
                column.trim,
            ))?;
            underline.extend(std::iter::repeat(config.table_separator).take(resolved.width));
        }
        self.write(&labels)?;
        self.write(&MarkupText::plain(underline))
    }

    /// Returns false if cancellation stopped the row.
    fn render_table_row(&mut self, table: &mut TableLayout, record: &Arc<Record>) -> Result<bool> {
        let pipeline = self.pipeline;
        let config = pipeline.config();
        let layout = table.resolve(pipeline.width(), Some(record))?.clone();
        let mut line = MarkupText::new();
        for (i, (column, resolved)) in table.columns().iter().zip(&layout.columns).enumerate() {
            if self.check_cancelled() {
                return Ok(false);
            }
            let cell = match self.source_values(&column.source, record) {
                Ok(values) => self.cell_markup(&values)?,
                Err(err) if err.is_recoverable() => {
                    let site = DiagnosticSite::Cell {
                        column: column.label().to_string(),
                    };
                    match error_token(resolved.width) {
                        Some(token) => {
                            self.contain(err, site);
                            MarkupText::colored(config.error_color, token)
                        }
                        None if resolved.width == 0 => return Err(err),
                        None => self.contain(err, site),
                    }
                }
                Err(err) => return Err(err),
            };
            // Cells are one line; keep the first.
            let cell = if cell.render(true).contains('\n') {
                cell.lines(true).into_iter().next().unwrap_or_default()
            } else {
                cell
            };
            if i > 0 {
                line.append(" ")?;
            }
            line.append_markup(&cell.fixed_width(
                resolved.width,
                config.use_ellipsis,
                resolved.align,
                column.trim,
            ))?;
        }
        self.write(&line)?;
        Ok(true)
    }

    fn render_list_row(&mut self, items: &[crate::view::ListItem], record: &Arc<Record>) -> Result<bool> {
        let label_width = items.iter().map(|i| i.label().width()).max().unwrap_or(0);
        let indent = " ".repeat(label_width + 2);
        let one_per_line = self.pipeline.request().dont_group_multiple;

        let mut lines = Vec::new();
        for item in items {
            if self.check_cancelled() {
                return Ok(false);
            }
            let values = match self.source_values(&item.source, record) {
                Ok(values) => values,
                Err(err) if err.is_recoverable() => {
                    let site = DiagnosticSite::Cell {
                        column: item.label().to_string(),
                    };
                    vec![Value::Markup(self.contain(err, site))]
                }
                Err(err) => return Err(err),
            };
            let flat: &[Value] = match values.as_slice() {
                [Value::List(items)] => items,
                other => other,
            };
            let parts: Vec<MarkupText> = if one_per_line && flat.len() > 1 {
                flat.iter().map(Value::to_markup).collect()
            } else {
                vec![self.cell_markup(&values)?]
            };

            let mut first = true;
            for part in parts {
                for text in part.lines(true) {
                    let mut line = MarkupText::plain(if first {
                        format!("{}: ", pad_right(item.label(), label_width))
                    } else {
                        indent.clone()
                    });
                    line.append_markup(&text)?;
                    lines.push(line);
                    first = false;
                }
            }
        }
        for line in &lines {
            self.write(line)?;
        }
        Ok(true)
    }

    fn render_custom_row(&mut self, expression: &str, record: &Arc<Record>) -> Result<bool> {
        if self.check_cancelled() {
            return Ok(false);
        }
        let output = match self
            .pipeline
            .evaluator()
            .invoke(expression, &self.context(Some(record)))
        {
            Ok(values) => values.iter().map(Value::to_markup).collect(),
            Err(err) => vec![self.contain(err.into(), DiagnosticSite::Row)],
        };
        for markup in &output {
            self.write_lines(markup)?;
        }
        Ok(true)
    }

    fn render_single_line(&mut self, expression: Option<&str>, record: &Arc<Record>) -> Result<bool> {
        if self.check_cancelled() {
            return Ok(false);
        }
        let line = match expression {
            Some(expression) => match self
                .pipeline
                .evaluator()
                .invoke(expression, &self.context(Some(record)))
            {
                Ok(values) => join_values(&values),
                Err(err) => self.contain(err.into(), DiagnosticSite::Row),
            },
            None => {
                let mut line = MarkupText::new();
                for (i, property) in record
                    .properties()
                    .iter()
                    .filter(|p| !p.is_hidden())
                    .enumerate()
                {
                    if i > 0 {
                        line.append(", ")?;
                    }
                    line.append(format!("{}: ", property.name()))?;
                    match property.value() {
                        Ok(value) => line.append(value.to_single_line())?,
                        Err(err) => {
                            let site = DiagnosticSite::Cell {
                                column: property.name().to_string(),
                            };
                            let placeholder = self.contain(err.into(), site);
                            line.append_markup(&placeholder)?
                        }
                    };
                }
                line
            }
        };
        let line = line.lines(true).into_iter().next().unwrap_or_default();
        self.write(&line)?;
        Ok(true)
    }

    /// Emits the footer or trailer of a finished view.
    fn finish_view(&mut self, active: ActiveView) -> Result<()> {
        let expression = match active.view.as_ref() {
            ViewDefinition::Table(table) => table.footer.as_deref(),
            ViewDefinition::Custom(custom) => custom.trailer.as_deref(),
            _ => None,
        };
        let Some(expression) = expression else {
            return Ok(());
        };
        if active.rows == 0 || self.check_cancelled() {
            log::debug!("footer suppressed");
            return Ok(());
        }
        if !active.view.options().preserve_row_context {
            *lock(&self.scope) = self.header_scope.clone();
        }
        let record = self.last_record.clone();
        let footer = match self
            .pipeline
            .evaluator()
            .invoke(expression, &self.context(record.as_ref()))
        {
            Ok(values) => join_values(&values),
            Err(err) => self.contain(err.into(), DiagnosticSite::Footer),
        };
        self.write_lines(&footer)
    }

    fn source_values(&self, source: &ColumnSource, record: &Arc<Record>) -> Result<Vec<Value>> {
        let evaluator = self.pipeline.evaluator();
        match source {
            ColumnSource::Property { property, format } => {
                let value = record.property(property)?;
                match format {
                    None => Ok(vec![value]),
                    Some(format) => {
                        let mut context = self.context(Some(record));
                        context.set_variable("value", value);
                        Ok(evaluator.invoke(format, &context)?)
                    }
                }
            }
            ColumnSource::Script { script } => {
                Ok(evaluator.invoke(script, &self.context(Some(record)))?)
            }
        }
    }

    /// Cell text for zero or more values; collections render as
    /// `{a, b, ...}` up to the enumeration limit.
    fn cell_markup(&self, values: &[Value]) -> Result<MarkupText> {
        let limit = self.pipeline.config().enumeration_limit;
        match values {
            [] => Ok(MarkupText::new()),
            [Value::List(items)] => enumerate_values(items, limit),
            [single] => Ok(single.to_markup()),
            many => enumerate_values(many, limit),
        }
    }

    /// Records a contained failure and returns its inline placeholder.
    fn contain(&mut self, err: FormatError, site: DiagnosticSite) -> MarkupText {
        let message = match &err {
            FormatError::Evaluation(EvalError { message }) => message.clone(),
            other => other.to_string(),
        };
        log::warn!("record {}, {}: {}", self.record_index, site, message);
        let placeholder = MarkupText::colored(
            self.pipeline.config().error_color,
            format!("<Error: {}>", message),
        );
        lock(&self.diagnostics).push(Diagnostic {
            record: self.record_index,
            site,
            message,
        });
        placeholder
    }

    fn context(&self, record: Option<&Arc<Record>>) -> EvalContext {
        let mut context = EvalContext::new();
        if let Some(record) = record {
            context.bind_record(record);
        }
        for (name, function) in &self.functions {
            context.set_function(name.clone(), Arc::clone(function));
        }
        context
    }

    fn write(&mut self, line: &MarkupText) -> Result<()> {
        self.sink.write_line(line)?;
        self.lines_written += 1;
        Ok(())
    }

    fn write_lines(&mut self, markup: &MarkupText) -> Result<()> {
        for line in markup.lines(true) {
            self.write(&line)?;
        }
        Ok(())
    }
}

fn enumerate_values(values: &[Value], limit: usize) -> Result<MarkupText> {
    let shown = if limit == 0 {
        values.len()
    } else {
        limit.min(values.len())
    };
    let mut out = MarkupText::plain("{");
    for (i, value) in values[..shown].iter().enumerate() {
        if i > 0 {
            out.append(", ")?;
        }
        out.append_markup(&value.to_markup())?;
    }
    if shown < values.len() {
        out.append("...")?;
    }
    out.append("}")?;
    Ok(out)
}

/// `set(name, value)`, `get(name[, default])` and `warn(message)`, backed
/// by the session's variable scope and diagnostics.
fn host_functions(
    scope: &Arc<Mutex<Scope>>,
    diagnostics: &Arc<Mutex<Vec<Diagnostic>>>,
    current_record: &Arc<AtomicUsize>,
) -> Vec<(String, HostFunction)> {
    fn name_arg(args: &[Value], function: &str) -> std::result::Result<String, EvalError> {
        match args.first() {
            Some(Value::String(name)) => Ok(name.clone()),
            _ => Err(EvalError::new(format!("{}() needs a variable name", function))),
        }
    }

    let set_scope = Arc::clone(scope);
    let set: HostFunction = Arc::new(move |args: &[Value]| -> std::result::Result<Value, EvalError> {
        let name = name_arg(args, "set")?;
        let value = args.get(1).cloned().unwrap_or_default();
        lock(&set_scope).insert(name, value);
        Ok(Value::Null)
    });

    let get_scope = Arc::clone(scope);
    let get: HostFunction = Arc::new(move |args: &[Value]| -> std::result::Result<Value, EvalError> {
        let name = name_arg(args, "get")?;
        Ok(lock(&get_scope)
            .get(&name)
            .cloned()
            .or_else(|| args.get(1).cloned())
            .unwrap_or_default())
    });

    let sink = Arc::clone(diagnostics);
    let record = Arc::clone(current_record);
    let warn: HostFunction = Arc::new(move |args: &[Value]| -> std::result::Result<Value, EvalError> {
        let message = args
            .iter()
            .map(|a| a.to_markup().render(false).to_string())
            .collect::<Vec<_>>()
            .join(" ");
        let index = record.load(Ordering::SeqCst);
        log::warn!("record {}: {}", index, message);
        lock(&sink).push(Diagnostic {
            record: index,
            site: DiagnosticSite::Warning,
            message,
        });
        Ok(Value::Null)
    });

    vec![
        ("set".to_string(), set),
        ("get".to_string(), get),
        ("warn".to_string(), warn),
    ]
}
