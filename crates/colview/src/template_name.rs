//! Parsing and matching of template (generic) type names.
//!
//! Type names such as `Vector<Int32>` or `Map<String, List<*>>` are
//! *template names*: a base name plus an ordered list of argument patterns.
//! Views may be registered against a template pattern whose arguments are
//! wildcards (`*` or empty), and a concrete instantiated name is matched
//! against it argument by argument.
//!
//! # Matching rule
//!
//! A concrete name matches a stored pattern when:
//!
//! 1. the base names are equal, ignoring ASCII case,
//! 2. both have the same number of arguments (no variadic or partial-arity
//!    matching), and
//! 3. at each position the pattern argument is a wildcard, or is literally
//!    equal to the concrete argument (whitespace around separators ignored,
//!    ASCII case ignored), or is a nested pattern that matches the concrete
//!    argument recursively.
//!
//! ```rust
//! use colview::TemplateName;
//!
//! let pattern = TemplateName::parse("Vector<*>").unwrap();
//! let concrete = TemplateName::parse("vector<Int32>").unwrap();
//! assert!(pattern.matches(&concrete));
//!
//! let pair = TemplateName::parse("Pair<Int32, *>").unwrap();
//! assert!(!pair.matches(&concrete));
//! ```

use std::fmt;

/// One argument position of a template name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgPattern {
    /// `*` or an empty argument; matches anything.
    Wildcard,
    /// A concrete argument in canonical form.
    Literal(String),
    /// A template argument with a wildcard somewhere inside it.
    Nested(TemplateName),
}

impl ArgPattern {
    fn parse(raw: &str) -> ArgPattern {
        let raw = raw.trim();
        if raw.is_empty() || raw == "*" {
            return ArgPattern::Wildcard;
        }
        match TemplateName::parse(raw) {
            Some(nested) if nested.has_wildcard() => ArgPattern::Nested(nested),
            Some(nested) => ArgPattern::Literal(nested.to_string()),
            None => ArgPattern::Literal(raw.to_string()),
        }
    }

    fn has_wildcard(&self) -> bool {
        match self {
            ArgPattern::Wildcard => true,
            ArgPattern::Literal(_) => false,
            ArgPattern::Nested(t) => t.has_wildcard(),
        }
    }

    fn matches(&self, concrete: &ArgPattern) -> bool {
        match self {
            ArgPattern::Wildcard => true,
            ArgPattern::Literal(expected) => match concrete {
                ArgPattern::Literal(actual) => expected.eq_ignore_ascii_case(actual),
                _ => false,
            },
            ArgPattern::Nested(pattern) => match concrete {
                ArgPattern::Literal(actual) => TemplateName::parse(actual)
                    .map(|t| pattern.matches(&t))
                    .unwrap_or(false),
                ArgPattern::Nested(other) => pattern.matches(other),
                ArgPattern::Wildcard => false,
            },
        }
    }
}

impl fmt::Display for ArgPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgPattern::Wildcard => f.write_str("*"),
            ArgPattern::Literal(s) => f.write_str(s),
            ArgPattern::Nested(t) => write!(f, "{}", t),
        }
    }
}

/// A cracked template name: base name plus argument patterns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateName {
    name: String,
    args: Vec<ArgPattern>,
}

impl TemplateName {
    /// Cracks `Name<Arg1, Arg2, ...>`.
    ///
    /// Returns `None` for anything that is not a well-formed template name:
    /// no brackets, an empty base name, unbalanced brackets, or trailing
    /// text after the closing bracket.
    pub fn parse(s: &str) -> Option<TemplateName> {
        let s = s.trim();
        let open = s.find('<')?;
        let name = s[..open].trim();
        if name.is_empty() || name.contains(['>', ',']) || !s.ends_with('>') {
            return None;
        }
        let inner = &s[open + 1..s.len() - 1];

        let mut args = Vec::new();
        let mut depth = 0usize;
        let mut start = 0;
        for (i, c) in inner.char_indices() {
            match c {
                '<' => depth += 1,
                '>' => depth = depth.checked_sub(1)?,
                ',' if depth == 0 => {
                    args.push(ArgPattern::parse(&inner[start..i]));
                    start = i + 1;
                }
                _ => {}
            }
        }
        if depth != 0 {
            return None;
        }
        args.push(ArgPattern::parse(&inner[start..]));

        Some(TemplateName {
            name: name.to_string(),
            args,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn args(&self) -> &[ArgPattern] {
        &self.args
    }

    pub fn arity(&self) -> usize {
        self.args.len()
    }

    /// True if any argument, at any depth, is a wildcard.
    pub fn has_wildcard(&self) -> bool {
        self.args.iter().any(ArgPattern::has_wildcard)
    }

    /// Matches a concrete name against this pattern.
    pub fn matches(&self, concrete: &TemplateName) -> bool {
        self.name.eq_ignore_ascii_case(&concrete.name)
            && self.args.len() == concrete.args.len()
            && self
                .args
                .iter()
                .zip(&concrete.args)
                .all(|(pattern, actual)| pattern.matches(actual))
    }

    /// Case-folded canonical form, used to detect an exact pattern match.
    pub fn key(&self) -> String {
        self.to_string().to_ascii_lowercase()
    }
}

impl fmt::Display for TemplateName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}<", self.name)?;
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", arg)?;
        }
        f.write_str(">")
    }
}

/// True if `s` parses as a template name.
pub fn looks_like_template(s: &str) -> bool {
    TemplateName::parse(s).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(s: &str) -> TemplateName {
        TemplateName::parse(s).unwrap()
    }

    #[test]
    fn test_parse_simple() {
        let name = t("List<Int32>");
        assert_eq!(name.name(), "List");
        assert_eq!(name.args(), &[ArgPattern::Literal("Int32".into())]);
    }

    #[test]
    fn test_parse_wildcards() {
        let name = t("Map<*, >");
        assert_eq!(name.args(), &[ArgPattern::Wildcard, ArgPattern::Wildcard]);
        assert!(name.has_wildcard());
    }

    #[test]
    fn test_parse_nested() {
        let name = t("Map<String, List<*>>");
        assert_eq!(name.arity(), 2);
        assert!(matches!(name.args()[1], ArgPattern::Nested(_)));

        let concrete = t("Map<String,List<Int32>>");
        assert_eq!(concrete.args()[1], ArgPattern::Literal("List<Int32>".into()));
    }

    #[test]
    fn test_parse_rejects_non_templates() {
        assert!(TemplateName::parse("Thread").is_none());
        assert!(TemplateName::parse("<Int32>").is_none());
        assert!(TemplateName::parse("List<Int32").is_none());
        assert!(TemplateName::parse("List<Int32>>").is_none());
        assert!(TemplateName::parse("List<Int32> extra").is_none());
        assert!(!looks_like_template("a > b"));
    }

    #[test]
    fn test_matches_case_insensitive_name() {
        assert!(t("LIST<*>").matches(&t("list<Int32>")));
    }

    #[test]
    fn test_matches_requires_same_arity() {
        assert!(!t("Pair<*>").matches(&t("Pair<A, B>")));
        assert!(!t("Pair<*, *, *>").matches(&t("Pair<A, B>")));
    }

    #[test]
    fn test_matches_literal_and_wildcard() {
        let pattern = t("Pair<Int32, *>");
        assert!(pattern.matches(&t("Pair<Int32, String>")));
        assert!(pattern.matches(&t("Pair< int32 ,Foo<Bar>>")));
        assert!(!pattern.matches(&t("Pair<Int64, String>")));
    }

    #[test]
    fn test_matches_nested_pattern() {
        let pattern = t("Map<String, List<*>>");
        assert!(pattern.matches(&t("Map<String, List<Int32>>")));
        assert!(!pattern.matches(&t("Map<String, Set<Int32>>")));
        assert!(!pattern.matches(&t("Map<String, Int32>")));
    }

    #[test]
    fn test_display_is_canonical() {
        assert_eq!(t("Map< String ,List<*>>").to_string(), "Map<String, List<*>>");
        assert_eq!(t("Map<String,List<*>>").key(), t("map<string, list<*>>").key());
    }
}
