//! Registry mapping type names and template patterns to view definitions.
//!
//! A [`ViewRegistry`] is an explicit context object owned by whoever hosts
//! rendering; there is no global instance. Each registered name maps to an
//! ordered list of views holding at most one view per [`ViewKind`].
//!
//! # Registration
//!
//! [`ViewRegistry::register`] routes the name to the literal map, or to the
//! template map when it is a template pattern with wildcards. When the name
//! already has views, each new view replaces an existing view of the same
//! kind in place, or is appended if its kind is new:
//!
//! ```rust
//! use colview::{Column, ListItem, ViewDefinition, ViewKind, ViewRegistry};
//!
//! let mut registry = ViewRegistry::new();
//! registry.register("Foo", vec![
//!     ViewDefinition::table(vec![Column::property("A")]),
//!     ViewDefinition::list(vec![ListItem::property("A")]),
//! ], None).unwrap();
//! registry.register("Foo", vec![ViewDefinition::table(vec![Column::property("B")])], None).unwrap();
//!
//! let views = registry.views_for("foo");
//! assert_eq!(views[0].kind(), ViewKind::Table);
//! assert_eq!(views[1].kind(), ViewKind::List);
//! ```
//!
//! # Lookup
//!
//! [`ViewRegistry::choose_view`] walks the type-name chain from most to
//! least derived. For each name the literal map is tried first, then the
//! template patterns sharing its base name in registration order. Without a
//! desired kind, single-line views are never chosen; with one, only that
//! exact kind qualifies.
//!
//! # Sharing
//!
//! The registry is plain data behind `&mut self`. Hosts that share one
//! registry between threads wrap it in a lock; a registration made between
//! two records of an in-flight render takes effect for the next lookup
//! (last write wins, no snapshot isolation).

mod source;

pub use source::{SourceId, ViewSet, ViewSource, YamlViewSource};

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use once_cell::sync::Lazy;

use crate::error::{FormatError, Result};
use crate::record::Record;
use crate::template_name::TemplateName;
use crate::view::{ViewDefinition, ViewKind};

/// The built-in view for records that render themselves in color.
static IDENTITY_VIEW: Lazy<Arc<ViewDefinition>> =
    Lazy::new(|| Arc::new(ViewDefinition::custom("record")));

/// The identity custom view: renders `record` as-is.
pub fn identity_view() -> Arc<ViewDefinition> {
    Arc::clone(&IDENTITY_VIEW)
}

/// A change notification delivered to subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryEvent {
    Registered { name: String, kinds: Vec<ViewKind> },
    Removed { name: String },
    Reloaded { source: SourceId },
    Cleared,
}

/// What a [`ViewRegistry::register`] call changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegisterOutcome {
    /// Kinds new to the name.
    pub added: Vec<ViewKind>,
    /// Kinds whose existing view was replaced in place.
    pub replaced: Vec<ViewKind>,
}

/// Handle returned by [`ViewRegistry::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionId(u64);

/// One registered view, as reported by enumeration.
#[derive(Debug, Clone)]
pub struct RegisteredView {
    pub name: String,
    pub view: Arc<ViewDefinition>,
    pub source: Option<SourceId>,
}

#[derive(Debug, Clone)]
struct Registration {
    view: Arc<ViewDefinition>,
    source: Option<SourceId>,
}

#[derive(Debug, Clone)]
struct Entry {
    name: String,
    views: Vec<Registration>,
}

impl Entry {
    fn new(name: String) -> Self {
        Self {
            name,
            views: Vec::new(),
        }
    }

    /// Views already stored are replaced in place by a new view of the same
    /// kind; everything else is appended in list order. A view loaded from
    /// a source never replaces an ad hoc one.
    fn merge(&mut self, views: Vec<ViewDefinition>, source: Option<SourceId>, outcome: &mut RegisterOutcome) {
        let prior = self.views.len();
        for view in views {
            let kind = view.kind();
            let registration = Registration {
                view: Arc::new(view),
                source,
            };
            let slot = self.views[..prior]
                .iter_mut()
                .find(|r| r.view.kind() == kind && (source.is_none() || r.source.is_some()));
            match slot {
                Some(existing) => {
                    *existing = registration;
                    outcome.replaced.push(kind);
                }
                None => {
                    self.views.push(registration);
                    outcome.added.push(kind);
                }
            }
        }
    }

    fn pick(&self, desired: Option<ViewKind>) -> Option<&Arc<ViewDefinition>> {
        self.views
            .iter()
            .map(|r| &r.view)
            .find(|v| match desired {
                Some(kind) => v.kind() == kind,
                None => v.kind() != ViewKind::SingleLine,
            })
    }
}

#[derive(Debug, Clone)]
struct TemplateEntry {
    pattern: TemplateName,
    entry: Entry,
}

/// How a registration name is stored.
enum NameKey {
    Literal(String),
    Template(TemplateName),
}

fn classify(name: &str) -> Result<NameKey> {
    let name = name.trim();
    if name.is_empty() {
        return Err(FormatError::Configuration(
            "type name must not be empty".into(),
        ));
    }
    match TemplateName::parse(name) {
        Some(template) if template.has_wildcard() => Ok(NameKey::Template(template)),
        Some(concrete) => Ok(NameKey::Literal(concrete.key())),
        None if name.contains(['<', '>']) => Err(FormatError::Configuration(format!(
            "malformed template name '{}'",
            name
        ))),
        None => Ok(NameKey::Literal(name.to_ascii_lowercase())),
    }
}

/// Lookup key of a concrete name; canonicalizes template-shaped names.
fn literal_key(name: &str) -> String {
    match TemplateName::parse(name) {
        Some(t) => t.key(),
        None => name.trim().to_ascii_lowercase(),
    }
}

type Subscriber = Box<dyn FnMut(&RegistryEvent) + Send>;

/// Type name → views registry.
#[derive(Default)]
pub struct ViewRegistry {
    literals: BTreeMap<String, Entry>,
    /// Keyed by lowercased base name, in registration order.
    templates: HashMap<String, Vec<TemplateEntry>>,
    sources: BTreeMap<SourceId, Box<dyn ViewSource>>,
    next_source: u64,
    subscribers: Vec<(SubscriptionId, Subscriber)>,
    next_subscription: u64,
}

impl ViewRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers views for a literal type name or a template pattern.
    ///
    /// `source` ties the views to a [`ViewSource`] so a reload can replace
    /// them; `None` marks an ad hoc registration that reloads never touch.
    pub fn register(
        &mut self,
        name: &str,
        views: Vec<ViewDefinition>,
        source: Option<SourceId>,
    ) -> Result<RegisterOutcome> {
        let key = classify(name)?;
        if views.is_empty() {
            return Err(FormatError::Configuration(format!(
                "no views given for '{}'",
                name.trim()
            )));
        }

        let mut outcome = RegisterOutcome::default();
        match key {
            NameKey::Literal(key) => {
                self.literals
                    .entry(key)
                    .or_insert_with(|| Entry::new(name.trim().to_string()))
                    .merge(views, source, &mut outcome);
            }
            NameKey::Template(pattern) => {
                let pattern_key = pattern.key();
                let bucket = self
                    .templates
                    .entry(pattern.name().to_ascii_lowercase())
                    .or_default();
                let index = match bucket.iter().position(|t| t.pattern.key() == pattern_key) {
                    Some(index) => index,
                    None => {
                        bucket.push(TemplateEntry {
                            entry: Entry::new(pattern.to_string()),
                            pattern,
                        });
                        bucket.len() - 1
                    }
                };
                bucket[index].entry.merge(views, source, &mut outcome);
            }
        }

        log::debug!(
            "registered views for '{}': added {:?}, replaced {:?}",
            name.trim(),
            outcome.added,
            outcome.replaced
        );
        let kinds = outcome
            .added
            .iter()
            .chain(&outcome.replaced)
            .copied()
            .collect();
        self.notify(&RegistryEvent::Registered {
            name: name.trim().to_string(),
            kinds,
        });
        Ok(outcome)
    }

    /// Registered views for one exact name or pattern, in list order.
    pub fn views_for(&self, name: &str) -> Vec<Arc<ViewDefinition>> {
        let entry = match classify(name) {
            Ok(NameKey::Literal(key)) => self.literals.get(&key),
            Ok(NameKey::Template(pattern)) => self.find_template(&pattern).map(|t| &t.entry),
            Err(_) => None,
        };
        entry
            .map(|e| e.views.iter().map(|r| Arc::clone(&r.view)).collect())
            .unwrap_or_default()
    }

    fn find_template(&self, pattern: &TemplateName) -> Option<&TemplateEntry> {
        let key = pattern.key();
        self.templates
            .get(&pattern.name().to_ascii_lowercase())?
            .iter()
            .find(|t| t.pattern.key() == key)
    }

    /// Chooses a view for a type-name chain, most derived name first.
    pub fn choose_view<S: AsRef<str>>(
        &self,
        type_names: &[S],
        desired: Option<ViewKind>,
    ) -> Option<Arc<ViewDefinition>> {
        for name in type_names {
            let name = name.as_ref();
            if let Some(view) = self
                .literals
                .get(&literal_key(name))
                .and_then(|e| e.pick(desired))
            {
                log::debug!("view for '{}': {} (literal)", name, view.kind());
                return Some(Arc::clone(view));
            }

            let Some(concrete) = TemplateName::parse(name) else {
                continue;
            };
            let Some(bucket) = self.templates.get(&concrete.name().to_ascii_lowercase()) else {
                continue;
            };
            let hit = bucket
                .iter()
                .filter(|t| t.pattern.matches(&concrete))
                .find_map(|t| t.entry.pick(desired));
            if let Some(view) = hit {
                log::debug!("view for '{}': {} (template)", name, view.kind());
                return Some(Arc::clone(view));
            }
        }
        None
    }

    /// Chooses a view for a record.
    ///
    /// The record's attached view wins unless a different kind was asked
    /// for. When nothing is registered and the record renders itself in
    /// color, the identity custom view is used.
    pub fn choose_view_for(
        &self,
        record: &Record,
        desired: Option<ViewKind>,
    ) -> Option<Arc<ViewDefinition>> {
        if let Some(view) = record.view_override() {
            if desired.map_or(true, |kind| kind == view.kind()) {
                return Some(Arc::clone(view));
            }
        }
        if let Some(view) = self.choose_view(record.type_names(), desired) {
            return Some(view);
        }
        let wants_custom = matches!(desired, None | Some(ViewKind::Custom));
        if wants_custom && record.supports_color() {
            return Some(identity_view());
        }
        None
    }

    /// Removes every view registered under `name`. Returns whether anything
    /// was removed.
    pub fn remove(&mut self, name: &str) -> bool {
        let removed = match classify(name) {
            Ok(NameKey::Literal(key)) => self.literals.remove(&key).is_some(),
            Ok(NameKey::Template(pattern)) => {
                let key = pattern.key();
                let base = pattern.name().to_ascii_lowercase();
                let mut removed = false;
                if let Some(bucket) = self.templates.get_mut(&base) {
                    let before = bucket.len();
                    bucket.retain(|t| t.pattern.key() != key);
                    removed = bucket.len() != before;
                    if bucket.is_empty() {
                        self.templates.remove(&base);
                    }
                }
                removed
            }
            Err(_) => false,
        };
        if removed {
            log::debug!("removed views for '{}'", name.trim());
            self.notify(&RegistryEvent::Removed {
                name: name.trim().to_string(),
            });
        }
        removed
    }

    fn entries(&self) -> impl Iterator<Item = &Entry> {
        let mut templates: Vec<&Vec<TemplateEntry>> = Vec::new();
        let mut bases: Vec<&String> = self.templates.keys().collect();
        bases.sort();
        for base in bases {
            if let Some(bucket) = self.templates.get(base) {
                templates.push(bucket);
            }
        }
        self.literals
            .values()
            .chain(templates.into_iter().flatten().map(|t| &t.entry))
    }

    /// Every registered view: literal names sorted, then template patterns.
    pub fn enumerate(&self) -> Vec<RegisteredView> {
        self.entries()
            .flat_map(|entry| {
                entry.views.iter().map(move |r| RegisteredView {
                    name: entry.name.clone(),
                    view: Arc::clone(&r.view),
                    source: r.source,
                })
            })
            .collect()
    }

    pub fn enumerate_of_kind(&self, kind: ViewKind) -> Vec<RegisteredView> {
        self.enumerate()
            .into_iter()
            .filter(|r| r.view.kind() == kind)
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.literals.is_empty() && self.templates.is_empty()
    }

    /// Drops every registration and source.
    pub fn clear(&mut self) {
        self.literals.clear();
        self.templates.clear();
        self.sources.clear();
        log::debug!("registry cleared");
        self.notify(&RegistryEvent::Cleared);
    }

    /// Adds a source and registers what it produces.
    pub fn add_source(&mut self, source: impl ViewSource + 'static) -> Result<SourceId> {
        let id = SourceId(self.next_source);
        self.next_source += 1;
        let mut source: Box<dyn ViewSource> = Box::new(source);
        if let Err(err) = self.load_source(id, source.as_mut()) {
            self.unregister_source(id);
            return Err(err);
        }
        log::debug!("added view source {} ({})", id, source.name());
        self.sources.insert(id, source);
        Ok(id)
    }

    fn load_source(&mut self, id: SourceId, source: &mut dyn ViewSource) -> Result<()> {
        for set in source.load()? {
            self.register(&set.type_name, set.views, Some(id))?;
        }
        Ok(())
    }

    /// Unregisters everything tied to the given sources and re-invokes the
    /// reloadable ones. Unknown handles are ignored; ad hoc registrations
    /// are never touched.
    pub fn reload(&mut self, ids: &[SourceId]) -> Result<()> {
        for &id in ids {
            let Some(mut source) = self.sources.remove(&id) else {
                log::debug!("reload: unknown {}", id);
                continue;
            };
            if !source.is_reloadable() {
                self.sources.insert(id, source);
                continue;
            }
            self.unregister_source(id);
            let loaded = self.load_source(id, source.as_mut());
            self.sources.insert(id, source);
            loaded?;
            log::debug!("reloaded {}", id);
            self.notify(&RegistryEvent::Reloaded { source: id });
        }
        Ok(())
    }

    /// Handles of all sources currently held.
    pub fn source_ids(&self) -> Vec<SourceId> {
        self.sources.keys().copied().collect()
    }

    fn unregister_source(&mut self, id: SourceId) {
        let keep = |r: &Registration| r.source != Some(id);
        for entry in self.literals.values_mut() {
            entry.views.retain(keep);
        }
        self.literals.retain(|_, e| !e.views.is_empty());
        for bucket in self.templates.values_mut() {
            for t in bucket.iter_mut() {
                t.entry.views.retain(keep);
            }
            bucket.retain(|t| !t.entry.views.is_empty());
        }
        self.templates.retain(|_, b| !b.is_empty());
    }

    /// Drops sources that no longer back any registered view. Returns how
    /// many were dropped.
    pub fn scrub_unreferenced_sources(&mut self) -> usize {
        let live: Vec<SourceId> = self
            .entries()
            .flat_map(|e| e.views.iter().filter_map(|r| r.source))
            .collect();
        let before = self.sources.len();
        self.sources.retain(|id, _| live.contains(id));
        let scrubbed = before - self.sources.len();
        if scrubbed > 0 {
            log::debug!("scrubbed {} unreferenced view source(s)", scrubbed);
        }
        scrubbed
    }

    /// Registers a callback invoked synchronously after every change.
    pub fn subscribe<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: FnMut(&RegistryEvent) + Send + 'static,
    {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.subscribers.push((id, Box::new(callback)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(s, _)| *s != id);
        before != self.subscribers.len()
    }

    fn notify(&mut self, event: &RegistryEvent) {
        for (_, callback) in &mut self.subscribers {
            callback(event);
        }
    }
}

impl std::fmt::Debug for ViewRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewRegistry")
            .field("literals", &self.literals.len())
            .field("templates", &self.templates.len())
            .field("sources", &self.source_ids())
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::{Column, ListItem};
    use colview_markup::MarkupText;
    use std::sync::Mutex;

    fn table(prop: &str) -> ViewDefinition {
        ViewDefinition::table(vec![Column::property(prop)])
    }

    fn list(prop: &str) -> ViewDefinition {
        ViewDefinition::list(vec![ListItem::property(prop)])
    }

    #[test]
    fn test_register_rejects_bad_input() {
        let mut registry = ViewRegistry::new();
        assert!(matches!(
            registry.register("  ", vec![table("A")], None),
            Err(FormatError::Configuration(_))
        ));
        assert!(matches!(
            registry.register("Foo", vec![], None),
            Err(FormatError::Configuration(_))
        ));
        assert!(matches!(
            registry.register("List<*", vec![table("A")], None),
            Err(FormatError::Configuration(_))
        ));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_same_kind_replaced_in_place() {
        let mut registry = ViewRegistry::new();
        registry
            .register("Foo", vec![table("A"), list("A")], None)
            .unwrap();
        let outcome = registry.register("FOO", vec![table("B")], None).unwrap();
        assert_eq!(outcome.replaced, vec![ViewKind::Table]);
        assert!(outcome.added.is_empty());

        let views = registry.views_for("Foo");
        assert_eq!(views.len(), 2);
        assert_eq!(*views[0], table("B"));
        assert_eq!(*views[1], list("A"));
    }

    #[test]
    fn test_new_kind_appended() {
        let mut registry = ViewRegistry::new();
        registry.register("Foo", vec![list("A")], None).unwrap();
        let outcome = registry
            .register("Foo", vec![ViewDefinition::custom("record")], None)
            .unwrap();
        assert_eq!(outcome.added, vec![ViewKind::Custom]);
        assert_eq!(registry.views_for("foo")[1].kind(), ViewKind::Custom);
    }

    #[test]
    fn test_first_registration_stored_verbatim() {
        let mut registry = ViewRegistry::new();
        let outcome = registry
            .register("Foo", vec![table("A"), table("B")], None)
            .unwrap();
        assert_eq!(outcome.added, vec![ViewKind::Table, ViewKind::Table]);
        assert_eq!(registry.views_for("Foo").len(), 2);
        assert_eq!(
            *registry.choose_view(&["Foo"], Some(ViewKind::Table)).unwrap(),
            table("A")
        );

        // A later table replaces the first stored one only.
        registry.register("Foo", vec![table("C")], None).unwrap();
        let views = registry.views_for("Foo");
        assert_eq!(*views[0], table("C"));
        assert_eq!(*views[1], table("B"));
    }

    #[test]
    fn test_choose_view_skips_single_line_by_default() {
        let mut registry = ViewRegistry::new();
        registry
            .register(
                "Foo",
                vec![ViewDefinition::single_line(None), list("A")],
                None,
            )
            .unwrap();
        assert_eq!(
            registry.choose_view(&["Foo"], None).unwrap().kind(),
            ViewKind::List
        );
        assert_eq!(
            registry
                .choose_view(&["Foo"], Some(ViewKind::SingleLine))
                .unwrap()
                .kind(),
            ViewKind::SingleLine
        );
        assert!(registry.choose_view(&["Foo"], Some(ViewKind::Table)).is_none());
    }

    #[test]
    fn test_choose_view_walks_chain() {
        let mut registry = ViewRegistry::new();
        registry.register("Base", vec![table("B")], None).unwrap();
        registry.register("Derived", vec![list("D")], None).unwrap();

        let view = registry.choose_view(&["Derived", "Base"], None).unwrap();
        assert_eq!(view.kind(), ViewKind::List);
        let view = registry
            .choose_view(&["Derived", "Base"], Some(ViewKind::Table))
            .unwrap();
        assert_eq!(*view, table("B"));
        assert!(registry.choose_view(&["Other"], None).is_none());
    }

    #[test]
    fn test_template_lookup_and_literal_preference() {
        let mut registry = ViewRegistry::new();
        registry.register("List<*>", vec![table("T")], None).unwrap();
        assert_eq!(
            *registry.choose_view(&["List<Int32>"], None).unwrap(),
            table("T")
        );

        registry
            .register("List< Int32 >", vec![table("L")], None)
            .unwrap();
        assert_eq!(
            *registry.choose_view(&["list<int32>"], None).unwrap(),
            table("L")
        );
        assert_eq!(
            *registry.choose_view(&["List<String>"], None).unwrap(),
            table("T")
        );
    }

    #[test]
    fn test_template_first_match_in_registration_order() {
        let mut registry = ViewRegistry::new();
        registry.register("Pair<*, *>", vec![table("Any")], None).unwrap();
        registry
            .register("Pair<Int32, *>", vec![table("Int")], None)
            .unwrap();
        assert_eq!(
            *registry.choose_view(&["Pair<Int32, String>"], None).unwrap(),
            table("Any")
        );
        // Exact-pattern re-registration updates the right sub-list.
        registry
            .register("pair<int32,*>", vec![list("Int")], None)
            .unwrap();
        assert_eq!(registry.views_for("Pair<Int32, *>").len(), 2);
        assert_eq!(registry.views_for("Pair<*, *>").len(), 1);
    }

    #[test]
    fn test_choose_view_for_override_and_identity() {
        let mut registry = ViewRegistry::new();
        registry.register("Foo", vec![table("A")], None).unwrap();

        let attached = Record::new(["Foo"]).with_view(list("X"));
        assert_eq!(*registry.choose_view_for(&attached, None).unwrap(), list("X"));
        assert_eq!(
            *registry
                .choose_view_for(&attached, Some(ViewKind::Table))
                .unwrap(),
            table("A")
        );

        let colored = Record::new(["Unknown"]).with_color_form(MarkupText::plain("x"));
        let view = registry.choose_view_for(&colored, None).unwrap();
        assert!(Arc::ptr_eq(&view, &identity_view()));
        assert!(registry
            .choose_view_for(&colored, Some(ViewKind::Table))
            .is_none());
        assert!(registry
            .choose_view_for(&Record::new(["Unknown"]), None)
            .is_none());
    }

    #[test]
    fn test_remove_and_enumerate() {
        let mut registry = ViewRegistry::new();
        registry.register("B", vec![table("x"), list("x")], None).unwrap();
        registry.register("A", vec![list("y")], None).unwrap();
        registry.register("T<*>", vec![table("t")], None).unwrap();

        let names: Vec<String> = registry.enumerate().into_iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["A", "B", "B", "T<*>"]);
        assert_eq!(registry.enumerate_of_kind(ViewKind::Table).len(), 2);

        assert!(registry.remove("b"));
        assert!(!registry.remove("b"));
        assert!(registry.remove("T<*>"));
        assert_eq!(registry.enumerate().len(), 1);
    }

    #[test]
    fn test_subscribers_notified_synchronously() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let mut registry = ViewRegistry::new();
        let sink = Arc::clone(&events);
        let id = registry.subscribe(move |e| sink.lock().unwrap().push(e.clone()));

        registry.register("Foo", vec![table("A")], None).unwrap();
        registry.remove("Foo");
        registry.clear();
        assert!(registry.unsubscribe(id));
        registry.register("Bar", vec![table("A")], None).unwrap();

        let events = events.lock().unwrap();
        assert_eq!(
            *events,
            vec![
                RegistryEvent::Registered {
                    name: "Foo".into(),
                    kinds: vec![ViewKind::Table]
                },
                RegistryEvent::Removed { name: "Foo".into() },
                RegistryEvent::Cleared,
            ]
        );
    }

    struct Counting {
        loads: Arc<Mutex<usize>>,
        kind_table: bool,
    }

    impl ViewSource for Counting {
        fn name(&self) -> String {
            "counting".into()
        }

        fn load(&mut self) -> Result<Vec<ViewSet>> {
            *self.loads.lock().unwrap() += 1;
            let view = if self.kind_table { table("S") } else { list("S") };
            self.kind_table = !self.kind_table;
            Ok(vec![ViewSet {
                type_name: "Foo".into(),
                views: vec![view],
            }])
        }
    }

    #[test]
    fn test_reload_keeps_ad_hoc_view_of_same_kind() {
        let loads = Arc::new(Mutex::new(0));
        let mut registry = ViewRegistry::new();
        let id = registry
            .add_source(Counting {
                loads: Arc::clone(&loads),
                kind_table: true,
            })
            .unwrap();
        registry.register("Foo", vec![table("Mine")], None).unwrap();
        assert_eq!(registry.views_for("Foo"), vec![Arc::new(table("Mine"))]);

        // Reload twice so the source yields a table again.
        registry.reload(&[id]).unwrap();
        registry.reload(&[id]).unwrap();
        assert_eq!(*loads.lock().unwrap(), 3);

        let chosen = registry.choose_view(&["Foo"], Some(ViewKind::Table)).unwrap();
        assert_eq!(*chosen, table("Mine"));
        let sources: Vec<Option<SourceId>> = registry
            .enumerate()
            .into_iter()
            .map(|r| r.source)
            .collect();
        assert_eq!(sources, vec![None, Some(id)]);
    }

    #[test]
    fn test_reload_replaces_source_views_only() {
        let loads = Arc::new(Mutex::new(0));
        let mut registry = ViewRegistry::new();
        let id = registry
            .add_source(Counting {
                loads: Arc::clone(&loads),
                kind_table: true,
            })
            .unwrap();
        registry
            .register("Foo", vec![ViewDefinition::custom("record")], None)
            .unwrap();
        assert_eq!(registry.views_for("Foo").len(), 2);

        registry.reload(&[id]).unwrap();
        assert_eq!(*loads.lock().unwrap(), 2);
        let kinds: Vec<ViewKind> = registry.views_for("Foo").iter().map(|v| v.kind()).collect();
        assert_eq!(kinds, vec![ViewKind::Custom, ViewKind::List]);
    }

    #[test]
    fn test_scrub_unreferenced_sources() {
        let mut registry = ViewRegistry::new();
        let yaml = "views:\n  - type: Foo\n    views:\n      - kind: single_line\n";
        registry.add_source(YamlViewSource::inline(yaml)).unwrap();
        assert_eq!(registry.scrub_unreferenced_sources(), 0);

        registry.remove("Foo");
        assert_eq!(registry.scrub_unreferenced_sources(), 1);
        assert!(registry.source_ids().is_empty());
    }
}
