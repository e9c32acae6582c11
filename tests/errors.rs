//! Compile-time and apply-time error taxonomy.

mod common;

use common::Json;
use mustach_core::{compile, BuildFlags, Error, Limits};

fn compile_err(source: &str) -> Error {
    compile(source, BuildFlags::empty(), None, &Limits::DEFAULT).unwrap_err()
}

#[test]
fn unterminated_tag_is_unexpected_end() {
    assert!(matches!(compile_err("{{name"), Error::UnexpectedEnd { .. }));
}

#[test]
fn empty_tag_name_is_rejected_by_default() {
    assert!(matches!(compile_err("{{}}"), Error::EmptyTag { .. }));
}

#[test]
fn empty_tag_name_is_accepted_with_the_flag() {
    let tmpl = compile("{{}}", BuildFlags::WITH_EMPTY_TAG, None, &Limits::DEFAULT);
    assert!(tmpl.is_ok());
}

#[test]
fn mismatched_close_tag_is_a_closing_error() {
    assert!(matches!(compile_err("{{#a}}x{{/b}}"), Error::Closing { .. }));
}

#[test]
fn unmatched_close_tag_is_a_closing_error() {
    assert!(matches!(compile_err("{{/a}}"), Error::Closing { .. }));
}

#[test]
fn unterminated_section_is_unexpected_end() {
    assert!(matches!(compile_err("{{#a}}x"), Error::UnexpectedEnd { .. }));
}

#[test]
fn malformed_delimiter_change_is_a_bad_delimiter_error() {
    assert!(matches!(compile_err("{{=x=}}"), Error::BadDelimiter { .. }));
}

#[test]
fn sections_nested_past_the_depth_limit_fail_to_compile() {
    let limits = Limits { max_depth: 2, ..Limits::DEFAULT };
    let source = "{{#a}}{{#b}}{{#c}}x{{/c}}{{/b}}{{/a}}";
    let err = compile(source, BuildFlags::empty(), None, &limits).unwrap_err();
    assert!(matches!(err, Error::TooDeep));
}

#[test]
fn error_code_mapping_matches_the_documented_table() {
    assert_eq!(compile_err("{{name").code(), -2);
    assert_eq!(compile_err("{{}}").code(), -3);
    assert_eq!(compile_err("{{#a}}x{{/b}}").code(), -7);
    assert_eq!(Error::NotFound("p".to_string()).code(), -11);
    assert_eq!(Error::TooMuchNesting.code(), -13);
}

#[test]
fn user_error_codes_land_in_the_reserved_negative_range() {
    assert_eq!(Error::User(1).code(), -101);
    assert_eq!(Error::User(-1).code(), -101);
}

#[test]
fn wrap_layer_strict_mode_turns_undefined_tags_fatal() {
    let data = Json::map(&[]);
    let flags = mustach_core::WrapFlags::default() | mustach_core::WrapFlags::ERROR_UNDEFINED;
    let err = common::render_wrapped("{{missing}}", flags, &data).unwrap_err();
    assert!(matches!(err, Error::UndefinedTag(name) if name == "missing"));
}
