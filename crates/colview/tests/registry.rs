//! Registry behavior observed through rendering.

use std::io::Write;
use std::sync::{Arc, Mutex};

use colview::pipeline::{BufferSink, FixedWidth};
use colview::prelude::*;
use colview::registry::{RegistryEvent, YamlViewSource};

fn render(registry: &ViewRegistry, records: Vec<Record>) -> Vec<String> {
    let evaluator = MiniJinjaEvaluator::new();
    let pipeline = Pipeline::new(registry, &evaluator).with_width(FixedWidth(40));
    let mut sink = BufferSink::new();
    pipeline.run(records, &mut sink).unwrap();
    sink.lines()
}

fn thread(id: i32) -> Record {
    Record::new(["Thread", "Object"]).with_property("Id", id)
}

#[test]
fn test_reregistering_replaces_only_that_kind() {
    let mut registry = ViewRegistry::new();
    let table = ViewDefinition::table(vec![Column::property("Id")]);
    let list = ViewDefinition::list(vec![ListItem::property("Id")]);
    let outcome = registry
        .register("Thread", vec![table, list.clone()], None)
        .unwrap();
    assert_eq!(outcome.added, vec![ViewKind::Table, ViewKind::List]);

    let replacement = ViewDefinition::table(vec![Column::property("Id").with_width(6)]);
    let outcome = registry
        .register("Thread", vec![replacement.clone()], None)
        .unwrap();
    assert_eq!(outcome.replaced, vec![ViewKind::Table]);

    let views = registry.views_for("thread");
    assert_eq!(views.len(), 2);
    assert_eq!(*views[0], replacement);
    assert_eq!(*views[1], list);
}

#[test]
fn test_chain_and_literal_preference() {
    let mut registry = ViewRegistry::new();
    registry
        .register("Object", vec![ViewDefinition::custom("'object'")], None)
        .unwrap();
    registry
        .register("List<*>", vec![ViewDefinition::custom("'any list'")], None)
        .unwrap();
    registry
        .register("List<Int32>", vec![ViewDefinition::custom("'int list'")], None)
        .unwrap();

    let lines = render(
        &registry,
        vec![
            thread(1),
            Record::new(["List<Int32>"]),
            Record::new(["List<String>"]),
        ],
    );
    assert_eq!(lines, vec!["object", "", "int list", "", "any list"]);

    // Repeated lookups give the same view.
    let first = registry.choose_view(&["List<String>"], None).unwrap();
    let second = registry.choose_view(&["List<String>"], None).unwrap();
    assert!(Arc::ptr_eq(&first, &second));
}

#[test]
fn test_desired_kind_falls_back_along_chain() {
    let mut registry = ViewRegistry::new();
    registry
        .register("Thread", vec![ViewDefinition::custom("'thread'")], None)
        .unwrap();
    registry
        .register("Object", vec![ViewDefinition::single_line(None)], None)
        .unwrap();

    let evaluator = MiniJinjaEvaluator::new();
    let pipeline = Pipeline::new(&registry, &evaluator)
        .with_request(FormatRequest::new().with_kind(ViewKind::SingleLine));
    let mut sink = BufferSink::new();
    pipeline.run(vec![thread(4)], &mut sink).unwrap();
    assert_eq!(sink.lines(), vec!["Id: 4"]);
}

const VIEWS: &str = r#"
views:
  - type: Thread
    views:
      - kind: custom
        expression: "'tid ' ~ record.Id"
"#;

#[test]
fn test_file_source_reload_updates_output() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(VIEWS.as_bytes()).unwrap();

    let mut registry = ViewRegistry::new();
    let events = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&events);
    registry.subscribe(move |event| seen.lock().unwrap().push(event.clone()));

    let id = registry
        .add_source(YamlViewSource::from_path(file.path()))
        .unwrap();
    registry
        .register("Object", vec![ViewDefinition::custom("'ad hoc'")], None)
        .unwrap();
    assert_eq!(render(&registry, vec![thread(7)]), vec!["tid 7"]);

    std::fs::write(
        file.path(),
        "views:\n  - type: Process\n    views:\n      - kind: single_line\n",
    )
    .unwrap();
    registry.reload(&[id]).unwrap();

    // The Thread view is gone; the ad hoc Object view survives.
    assert_eq!(render(&registry, vec![thread(7)]), vec!["ad hoc"]);
    assert_eq!(registry.views_for("Process").len(), 1);
    assert!(events
        .lock()
        .unwrap()
        .contains(&RegistryEvent::Reloaded { source: id }));
}

#[test]
fn test_reload_keeps_later_ad_hoc_view() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(VIEWS.as_bytes()).unwrap();

    let mut registry = ViewRegistry::new();
    let id = registry
        .add_source(YamlViewSource::from_path(file.path()))
        .unwrap();
    registry
        .register("Thread", vec![ViewDefinition::custom("'mine ' ~ record.Id")], None)
        .unwrap();
    assert_eq!(render(&registry, vec![thread(3)]), vec!["mine 3"]);

    registry.reload(&[id]).unwrap();
    assert_eq!(render(&registry, vec![thread(3)]), vec!["mine 3"]);
    assert_eq!(registry.views_for("Thread").len(), 2);
}

#[test]
fn test_broken_source_is_rejected() {
    let mut registry = ViewRegistry::new();
    let result = registry.add_source(YamlViewSource::inline("views:\n  - type: A\n    views: []\n"));
    assert!(matches!(result, Err(FormatError::Configuration(_))));
    assert!(registry.is_empty());
    assert!(registry.source_ids().is_empty());
}
