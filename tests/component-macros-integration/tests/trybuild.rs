//! trybuild compile-time tests for component_macros

#[test]
fn trybuild_derive_macros() {
    let t = trybuild::TestCases::new();
    t.pass("tests/trybuild/bindable_ok.rs");
    t.pass("tests/trybuild/bean_ok.rs");
}
