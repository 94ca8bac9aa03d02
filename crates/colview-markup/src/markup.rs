//! Structured text with embedded zero-width color directives.
//!
//! A [`MarkupText`] keeps its color state as a list of [`Element`]s and only
//! flattens to a string (with or without escape sequences) at the render
//! boundary. The *apparent length* is the display width of the content
//! alone; control elements never count.
//!
//! ```rust
//! use colview_markup::{Color, MarkupText};
//!
//! let mut text = MarkupText::new();
//! text.append("status: ").unwrap()
//!     .append_fg(Color::Green, "ok").unwrap();
//!
//! assert_eq!(text.length(), 10);
//! assert_eq!(text.render(false), "status: ok");
//! assert_eq!(text.render(true), "status: \x1b[32mok\x1b[0m");
//! ```

use once_cell::sync::OnceCell;
use std::fmt;
use std::sync::Arc;

use crate::color::Color;
use crate::error::FrozenMutationError;
use crate::width::{self, display_width, Align, Segment, TruncateAt};

const RESET: &str = "\x1b[0m";
const FROZEN: &str = "markup text";

/// Resolves deferred elements at render time.
///
/// Implemented by whatever hosts the expression language; the markup crate
/// only knows that an expression plus arguments turns into markup or fails.
pub trait DeferredEvaluator: Send + Sync {
    fn evaluate(&self, expression: &str, args: &[String]) -> Result<MarkupText, String>;
}

/// A color scope change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlCode {
    /// Opens a scope; `None` inherits the enclosing color.
    Push {
        fg: Option<Color>,
        bg: Option<Color>,
    },
    /// Closes the innermost scope.
    Pop,
    /// A verbatim escape sequence recovered from a flattened string.
    Raw(String),
}

/// An expression evaluated lazily when the text is rendered.
#[derive(Clone)]
pub struct DeferredElement {
    pub expression: String,
    pub args: Vec<String>,
    evaluator: Arc<dyn DeferredEvaluator>,
}

impl DeferredElement {
    fn resolve(&self) -> MarkupText {
        match self.evaluator.evaluate(&self.expression, &self.args) {
            Ok(markup) => markup,
            Err(message) => MarkupText::error(&message),
        }
    }
}

impl fmt::Debug for DeferredElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeferredElement")
            .field("expression", &self.expression)
            .field("args", &self.args)
            .finish_non_exhaustive()
    }
}

impl PartialEq for DeferredElement {
    fn eq(&self, other: &Self) -> bool {
        self.expression == other.expression
            && self.args == other.args
            && Arc::ptr_eq(&self.evaluator, &other.evaluator)
    }
}

/// One piece of markup text.
#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    Content(String),
    Control(ControlCode),
    Deferred(DeferredElement),
}

#[derive(Debug, Clone, Default)]
struct RenderCache {
    colored: OnceCell<String>,
    plain: OnceCell<String>,
    length: OnceCell<usize>,
}

/// String-like value with embedded color directives and a tracked apparent length.
#[derive(Debug, Clone, Default)]
pub struct MarkupText {
    elements: Vec<Element>,
    frozen: bool,
    cache: RenderCache,
}

impl MarkupText {
    /// Creates empty markup text.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates markup holding a single content element.
    pub fn plain(text: impl Into<String>) -> Self {
        let text = text.into();
        let mut markup = Self::new();
        if !text.is_empty() {
            markup.elements.push(Element::Content(text));
        }
        markup
    }

    /// Creates markup with `text` wrapped in a foreground color scope.
    pub fn colored(color: Color, text: impl Into<String>) -> Self {
        let mut markup = Self::new();
        markup.push_element(Element::Control(ControlCode::Push {
            fg: Some(color),
            bg: None,
        }));
        markup.push_element(Element::Content(text.into()));
        markup.push_element(Element::Control(ControlCode::Pop));
        markup
    }

    /// The inline placeholder used for contained failures: `<Error: …>` in red.
    pub fn error(message: &str) -> Self {
        Self::colored(Color::Red, format!("<Error: {}>", message))
    }

    /// Re-parses a flattened string, keeping escape sequences as raw controls.
    pub fn from_ansi(s: &str) -> Self {
        let mut markup = Self::new();
        let mut content = String::new();
        for seg in width::segments(s) {
            match seg {
                Segment::Char(c, _) => content.push(c),
                Segment::Escape(esc) => {
                    if !content.is_empty() {
                        markup.push_element(Element::Content(std::mem::take(&mut content)));
                    }
                    markup.push_element(Element::Control(ControlCode::Raw(esc.to_string())));
                }
            }
        }
        if !content.is_empty() {
            markup.push_element(Element::Content(content));
        }
        markup
    }

    /// Returns the element list.
    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    /// True if no element contributes content.
    pub fn is_empty(&self) -> bool {
        self.length() == 0
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Freezes this value; every later mutation fails.
    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    /// Consuming form of [`freeze`](Self::freeze), handy for constants.
    pub fn frozen(mut self) -> Self {
        self.freeze();
        self
    }

    /// Returns an unfrozen copy that can be mutated.
    pub fn to_unfrozen(&self) -> Self {
        Self {
            elements: self.elements.clone(),
            frozen: false,
            cache: self.cache.clone(),
        }
    }

    fn check_mutable(&self) -> Result<(), FrozenMutationError> {
        if self.frozen {
            Err(FrozenMutationError::new(FROZEN))
        } else {
            Ok(())
        }
    }

    fn push_element(&mut self, element: Element) {
        self.elements.push(element);
        self.cache = RenderCache::default();
    }

    fn mutate(&mut self, element: Element) -> Result<&mut Self, FrozenMutationError> {
        self.check_mutable()?;
        self.push_element(element);
        Ok(self)
    }

    /// Appends plain content.
    pub fn append(&mut self, text: impl Into<String>) -> Result<&mut Self, FrozenMutationError> {
        let text = text.into();
        self.check_mutable()?;
        if text.is_empty() {
            return Ok(self);
        }
        self.mutate(Element::Content(text))
    }

    /// Opens a foreground color scope.
    pub fn push_fg(&mut self, color: Color) -> Result<&mut Self, FrozenMutationError> {
        self.push_colors(Some(color), None)
    }

    /// Opens a background color scope.
    pub fn push_bg(&mut self, color: Color) -> Result<&mut Self, FrozenMutationError> {
        self.push_colors(None, Some(color))
    }

    /// Opens a scope setting either or both colors.
    pub fn push_colors(
        &mut self,
        fg: Option<Color>,
        bg: Option<Color>,
    ) -> Result<&mut Self, FrozenMutationError> {
        self.mutate(Element::Control(ControlCode::Push { fg, bg }))
    }

    /// Closes the innermost color scope.
    pub fn pop(&mut self) -> Result<&mut Self, FrozenMutationError> {
        self.mutate(Element::Control(ControlCode::Pop))
    }

    /// Push, content, pop in one call.
    pub fn append_colored(
        &mut self,
        fg: Option<Color>,
        bg: Option<Color>,
        text: impl Into<String>,
    ) -> Result<&mut Self, FrozenMutationError> {
        self.push_colors(fg, bg)?.append(text)?.pop()
    }

    /// Foreground-only form of [`append_colored`](Self::append_colored).
    pub fn append_fg(
        &mut self,
        color: Color,
        text: impl Into<String>,
    ) -> Result<&mut Self, FrozenMutationError> {
        self.append_colored(Some(color), None, text)
    }

    /// Appends an expression that is evaluated when this text is rendered.
    pub fn append_deferred(
        &mut self,
        expression: impl Into<String>,
        args: Vec<String>,
        evaluator: Arc<dyn DeferredEvaluator>,
    ) -> Result<&mut Self, FrozenMutationError> {
        self.mutate(Element::Deferred(DeferredElement {
            expression: expression.into(),
            args,
            evaluator,
        }))
    }

    /// Appends all elements of another markup text.
    pub fn append_markup(&mut self, other: &MarkupText) -> Result<&mut Self, FrozenMutationError> {
        self.check_mutable()?;
        if other.elements.is_empty() {
            return Ok(self);
        }
        self.elements.extend(other.elements.iter().cloned());
        self.cache = RenderCache::default();
        Ok(self)
    }

    /// Flattens to a string, with or without escape sequences.
    ///
    /// The result is cached per flag until the next mutation.
    pub fn render(&self, with_color: bool) -> &str {
        if with_color {
            self.cache.colored.get_or_init(|| self.flatten(true))
        } else {
            self.cache.plain.get_or_init(|| self.flatten(false))
        }
    }

    /// Apparent length: display columns of content, control elements excluded.
    pub fn length(&self) -> usize {
        *self
            .cache
            .length
            .get_or_init(|| display_width(self.render(false)))
    }

    /// Splits rendered output on newlines, one markup text per line.
    pub fn lines(&self, with_color: bool) -> Vec<MarkupText> {
        self.render(with_color)
            .split('\n')
            .map(|line| MarkupText::from_ansi(line.trim_end_matches('\r')))
            .collect()
    }

    /// Truncates the colorized flattening to `max_width` visible columns.
    pub fn truncate(&self, max_width: usize, use_ellipsis: bool, at: TruncateAt) -> MarkupText {
        if self.length() <= max_width {
            return self.to_unfrozen();
        }
        MarkupText::from_ansi(&width::truncate(self.render(true), max_width, use_ellipsis, at))
    }

    /// Pads or truncates to exactly `width` visible columns.
    pub fn fixed_width(
        &self,
        width: usize,
        use_ellipsis: bool,
        align: Align,
        at: TruncateAt,
    ) -> MarkupText {
        if self.length() == width {
            return self.to_unfrozen();
        }
        MarkupText::from_ansi(&width::make_fixed_width(
            self.render(true),
            width,
            use_ellipsis,
            align,
            at,
        ))
    }

    fn flatten(&self, with_color: bool) -> String {
        let mut out = String::new();
        let mut scopes: Vec<(Option<Color>, Option<Color>)> = Vec::new();
        self.flatten_into(&mut out, &mut scopes, with_color);
        if with_color && !scopes.is_empty() {
            out.push_str(RESET);
        }
        out
    }

    fn flatten_into(
        &self,
        out: &mut String,
        scopes: &mut Vec<(Option<Color>, Option<Color>)>,
        with_color: bool,
    ) {
        for element in &self.elements {
            match element {
                Element::Content(text) => out.push_str(text),
                Element::Deferred(deferred) => {
                    deferred.resolve().flatten_into(out, scopes, with_color)
                }
                Element::Control(code) => {
                    match code {
                        ControlCode::Push { fg, bg } => scopes.push((*fg, *bg)),
                        ControlCode::Pop => {
                            scopes.pop();
                        }
                        ControlCode::Raw(_) => {}
                    }
                    if with_color {
                        write_control(out, code, scopes);
                    }
                }
            }
        }
    }
}

/// Emits the escape sequences for one control code; `scopes` is the stack
/// after the code took effect.
fn write_control(out: &mut String, code: &ControlCode, scopes: &[(Option<Color>, Option<Color>)]) {
    match code {
        ControlCode::Push { fg, bg } => write_sgr(out, *fg, *bg),
        ControlCode::Pop => {
            out.push_str(RESET);
            for (fg, bg) in scopes {
                write_sgr(out, *fg, *bg);
            }
        }
        ControlCode::Raw(esc) => out.push_str(esc),
    }
}

fn write_sgr(out: &mut String, fg: Option<Color>, bg: Option<Color>) {
    let params: Vec<String> = fg
        .map(Color::fg_params)
        .into_iter()
        .chain(bg.map(Color::bg_params))
        .collect();
    if !params.is_empty() {
        out.push_str("\x1b[");
        out.push_str(&params.join(";"));
        out.push('m');
    }
}

impl PartialEq for MarkupText {
    fn eq(&self, other: &Self) -> bool {
        self.elements == other.elements
    }
}

impl From<&str> for MarkupText {
    fn from(text: &str) -> Self {
        MarkupText::plain(text)
    }
}

impl From<String> for MarkupText {
    fn from(text: String) -> Self {
        MarkupText::plain(text)
    }
}

impl fmt::Display for MarkupText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.render(console::colors_enabled()))
    }
}
