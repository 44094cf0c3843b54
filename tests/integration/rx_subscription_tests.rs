use std::convert::Infallible;
use std::sync::atomic::{AtomicI32, AtomicUsize, Ordering};
use std::sync::Arc;

use mockall::predicate::eq;

use super::{mount, sink_observer, MockValueSink};
use oxide_rx::{
    deps, use_rx_subscription, use_rx_subscription_with, use_rx_value, BehaviorSubject,
    Observable, RenderContext, Subject,
};

#[test]
fn given_a_source_should_deliver_its_events_to_the_observer() {
    let subject = Subject::<i32, Infallible>::new();
    let mut sink = MockValueSink::new();
    sink.expect_on_value().with(eq(1)).times(1).return_const(());
    sink.expect_on_value().with(eq(2)).times(1).return_const(());
    sink.expect_on_complete().times(1).return_const(());
    let sink = Arc::new(sink);

    let source = subject.clone();
    let observed = sink.clone();
    let (_driver, _renders) = mount(move |cx: &mut RenderContext| {
        let source = source.clone();
        let observed = observed.clone();
        use_rx_subscription_with(cx, move || source, deps![], move || sink_observer(observed), deps![]);
    });

    subject.next(1);
    subject.next(2);
    subject.complete();

    assert_eq!(subject.subscriber_count(), 0);
}

#[test]
fn given_unchanged_deps_should_not_resubscribe_on_rerender() {
    let subject = Subject::<i32, Infallible>::new();
    let subscribes = Arc::new(AtomicUsize::new(0));
    let source = subject.clone();
    let counter = subscribes.clone();
    let (mut driver, _renders) = mount(move |cx: &mut RenderContext| {
        let source = source.clone();
        let counter = counter.clone();
        use_rx_subscription(
            cx,
            move || {
                counter.fetch_add(1, Ordering::SeqCst);
                source
            },
            deps![],
        );
    });

    driver.emitter().invalidate();
    driver.emitter().invalidate();
    driver.process_events();

    assert_eq!(subscribes.load(Ordering::SeqCst), 1);
    assert_eq!(subject.subscriber_count(), 1);
}

#[test]
fn given_changed_deps_should_switch_sources() {
    let sources = [
        Subject::<i32, Infallible>::new(),
        Subject::<i32, Infallible>::new(),
    ];
    let selected = Arc::new(AtomicI32::new(0));
    let read = selected.clone();
    let available = sources.clone();
    let (mut driver, _renders) = mount(move |cx: &mut RenderContext| {
        let index = read.load(Ordering::SeqCst);
        let source = available[index as usize].clone();
        use_rx_subscription(cx, move || source, deps![index]);
    });

    selected.store(1, Ordering::SeqCst);
    driver.emitter().invalidate();
    driver.process_events();

    assert_eq!(sources[0].subscriber_count(), 0);
    assert_eq!(sources[1].subscriber_count(), 1);
}

#[test]
fn given_unmount_should_dispose_the_subscription() {
    let subject = Subject::<i32, Infallible>::new();
    let source = subject.clone();
    let (mut driver, _renders) = mount(move |cx: &mut RenderContext| {
        let source = source.clone();
        use_rx_subscription(cx, move || source, deps![]);
    });

    driver.unmount();

    assert_eq!(subject.subscriber_count(), 0);
}

#[test]
fn given_a_behavior_subject_use_rx_value_should_render_its_value_immediately() {
    let subject = BehaviorSubject::<i32, Infallible>::new(5);
    let source = subject.clone();
    let (mut driver, renders) = mount(move |cx: &mut RenderContext| {
        let source = source.clone();
        use_rx_value(cx, move || source, deps![])
    });

    subject.next(6);
    driver.process_events();

    renders.with_renders(|renders| {
        assert_eq!(renders, &vec![Some(5), Some(6)]);
    });
}

#[test]
fn given_a_completing_source_use_rx_value_should_keep_the_last_value() {
    let (mut driver, renders) = mount(|cx: &mut RenderContext| {
        use_rx_value(cx, || Observable::<i32, Infallible>::of(vec![1, 2, 3]), deps![])
    });

    driver.emitter().invalidate();
    driver.process_events();

    renders.with_renders(|renders| {
        assert_eq!(renders, &vec![Some(3), Some(3)]);
    });
}
