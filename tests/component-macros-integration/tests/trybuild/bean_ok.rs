use component_macros::Bean;
use di_impl::Container;
use std::sync::Arc;

#[derive(Default, Bean)]
struct Clock;

#[derive(Default, Bean)]
struct Scheduler {
    #[value("${threads:=2}")]
    threads: usize,
    #[inject("?")]
    clock: Option<Arc<Clock>>,
    #[autowire("[]?")]
    clocks: Vec<Arc<Clock>>,
}

fn main() {
    let mut container = Container::new();
    container.register_bean(Scheduler::default()).unwrap();
    container.auto_wire_beans().unwrap();

    let scheduler = container.get_bean::<Scheduler>("").unwrap();
    assert_eq!(scheduler.threads, 2);
    assert!(scheduler.clock.is_none());
    assert!(scheduler.clocks.is_empty());
}
