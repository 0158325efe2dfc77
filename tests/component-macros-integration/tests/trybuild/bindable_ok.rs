use component_macros::Bindable;
use config_impl::{Binder, Properties};

#[derive(Debug, Default, Bindable)]
struct Inner {
    #[value("${kind:=plain}")]
    r#type: String,
}

#[derive(Debug, Default, Bindable)]
struct Wrapper<T: Default + config_impl::Bindable> {
    #[value("${value}")]
    value: T,
    #[embed]
    inner: Inner,
}

#[derive(Debug, Default, Bindable)]
struct Empty;

fn main() {
    let mut props = Properties::new();
    props.set("w.value", 7);
    let mut w: Wrapper<u8> = Wrapper::default();
    Binder::new(&props).bind(&mut w, "${w}").unwrap();
    assert_eq!(w.value, 7);
    assert_eq!(w.inner.r#type, "plain");

    let mut e = Empty;
    Binder::new(&props).bind(&mut e, "${empty}").unwrap();
}
