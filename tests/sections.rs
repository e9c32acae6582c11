//! Section, inverted-section and nested-section behavior beyond the literal
//! scenario table.

mod common;

use common::{render, render_wrapped, Json};
use mustach_core::WrapFlags;

#[test]
fn truthy_scalar_section_renders_once() {
    let data = Json::map(&[("ok", Json::Bool(true))]);
    assert_eq!(render("{{#ok}}yes{{/ok}}", &data).unwrap(), "yes");
}

#[test]
fn falsy_scalar_section_renders_nothing() {
    let data = Json::map(&[("ok", Json::Bool(false))]);
    assert_eq!(render("{{#ok}}yes{{/ok}}", &data).unwrap(), "");
}

#[test]
fn missing_section_key_renders_nothing() {
    let data = Json::map(&[]);
    assert_eq!(render("{{#xs}}yes{{/xs}}", &data).unwrap(), "");
}

#[test]
fn inverted_section_skips_when_truthy() {
    let data = Json::map(&[("xs", Json::List(vec![Json::s("a")]))]);
    assert_eq!(render("{{^xs}}none{{/xs}}", &data).unwrap(), "");
}

#[test]
fn nested_sections_resolve_against_enclosing_scope() {
    let data = Json::map(&[(
        "users",
        Json::List(vec![
            Json::map(&[("name", Json::s("ann")), ("admin", Json::Bool(true))]),
            Json::map(&[("name", Json::s("bob")), ("admin", Json::Bool(false))]),
        ]),
    )]);
    let template = "{{#users}}{{name}}{{#admin}}(admin){{/admin}};{{/users}}";
    assert_eq!(render(template, &data).unwrap(), "ann(admin);bob;");
}

#[test]
fn inner_scope_shadows_outer_key_of_the_same_name() {
    let data = Json::map(&[
        ("name", Json::s("outer")),
        ("inner", Json::map(&[("name", Json::s("inner"))])),
    ]);
    assert_eq!(render("{{#inner}}{{name}}{{/inner}}", &data).unwrap(), "inner");
}

#[test]
fn wrap_layer_resolves_dotted_paths() {
    let data = Json::map(&[("a", Json::map(&[("b", Json::s("deep"))]))]);
    assert_eq!(render_wrapped("{{a.b}}", WrapFlags::default(), &data).unwrap(), "deep");
}

#[test]
fn wrap_layer_equality_filter_selects_matching_section() {
    let data = Json::map(&[("role", Json::s("admin"))]);
    assert_eq!(
        render_wrapped("{{#role=admin}}yes{{/role=admin}}", WrapFlags::default(), &data).unwrap(),
        "yes"
    );
    assert_eq!(
        render_wrapped("{{#role=guest}}yes{{/role=guest}}", WrapFlags::default(), &data).unwrap(),
        ""
    );
}

#[test]
fn wrap_layer_single_dot_selects_current_item() {
    let data = Json::map(&[("xs", Json::List(vec![Json::s("x"), Json::s("y")]))]);
    assert_eq!(
        render_wrapped("{{#xs}}{{.}}{{/xs}}", WrapFlags::default(), &data).unwrap(),
        "xy"
    );
}

#[test]
fn wrap_layer_object_iteration_visits_every_value() {
    let data = Json::map(&[("obj", Json::map(&[("a", Json::s("1")), ("b", Json::s("2"))]))]);
    let out = render_wrapped("{{#obj.*}}{{.}}|{{/obj.*}}", WrapFlags::default(), &data).unwrap();
    assert_eq!(out, "1|2|");
}
