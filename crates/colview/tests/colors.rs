//! Colored output. Tests touching the global console color switch run
//! serially.

use colview::pipeline::{BufferSink, FixedWidth};
use colview::prelude::*;
use colview::EvalError;
use serial_test::serial;

fn run(registry: &ViewRegistry, config: FormatConfig, records: Vec<Record>) -> BufferSink {
    let evaluator = MiniJinjaEvaluator::new();
    let pipeline = Pipeline::new(registry, &evaluator)
        .with_config(config)
        .with_width(FixedWidth(40));
    let mut sink = BufferSink::new();
    pipeline.run(records, &mut sink).unwrap();
    sink
}

#[test]
fn test_error_placeholder_is_colored() {
    let mut registry = ViewRegistry::new();
    registry
        .register(
            "Item",
            vec![ViewDefinition::table(vec![
                Column::property("Id").with_width(4),
                Column::property("Bad"),
            ])],
            None,
        )
        .unwrap();
    let record = Record::new(["Item"])
        .with_property("Id", 1)
        .with_lazy_property("Bad", || Err(EvalError::new("boom")));

    let sink = run(&registry, FormatConfig::default(), vec![record]);
    let colored = &sink.colored_lines()[2];
    assert!(colored.contains("\x1b[31m<Error: boom>\x1b[0m"));
    assert_eq!(sink.lines()[2].trim_end(), "   1 <Error: boom>");
}

#[test]
fn test_group_label_color_from_config() {
    let mut registry = ViewRegistry::new();
    registry
        .register(
            "Item",
            vec![ViewDefinition::list(vec![ListItem::property("Id")])
                .with_group_by(GroupBy::property("Kind").with_label("Kind of"))],
            None,
        )
        .unwrap();
    let config = FormatConfig::from_yaml("group_label_color: cyan\n").unwrap();
    let record = Record::new(["Item"])
        .with_property("Id", 1)
        .with_property("Kind", "x");

    let sink = run(&registry, config, vec![record]);
    assert_eq!(sink.lines()[0], "Kind of: x");
    assert!(sink.colored_lines()[0].starts_with("\x1b[36mKind of: "));
}

#[test]
fn test_record_color_form_survives_table_padding() {
    let mut registry = ViewRegistry::new();
    registry
        .register(
            "Holder",
            vec![ViewDefinition::table(vec![
                Column::property("Inner").with_width(10).with_align(Align::Left),
            ])],
            None,
        )
        .unwrap();
    let inner = Record::new(["Inner"]).with_color_form(MarkupText::colored(Color::Green, "ok"));
    let holder = Record::new(["Holder"]).with_property("Inner", inner);

    let sink = run(&registry, FormatConfig::default(), vec![holder]);
    assert_eq!(sink.lines()[2], "ok        ");
    assert!(sink.colored_lines()[2].contains("\x1b[32mok\x1b[0m"));
}

#[test]
#[serial]
fn test_display_follows_console_switch() {
    let markup = MarkupText::colored(Color::Red, "hot");

    console::set_colors_enabled(false);
    assert_eq!(markup.to_string(), "hot");

    console::set_colors_enabled(true);
    assert!(markup.to_string().contains("\x1b[31m"));

    console::set_colors_enabled(false);
}

#[test]
#[serial]
fn test_values_display_without_color() {
    console::set_colors_enabled(true);
    let value = Value::from(MarkupText::colored(Color::Blue, "plain"));
    assert_eq!(value.to_string(), "plain");
    console::set_colors_enabled(false);
}
