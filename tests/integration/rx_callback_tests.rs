use std::convert::Infallible;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::executor::block_on;
use futures::FutureExt;

use super::mount;
use oxide_rx::{
    deps, use_rx_callback, use_rx_callback_with, CanceledError, Observable, Policy,
    RenderContext, Rejection, RxCallback, Subject, VirtualTimer,
};

type DefaultCallback = RxCallback<(), i32, Option<i32>, Infallible>;

fn latest<Props: Clone>(renders: &oxide_rx::TestRenderer<Props>) -> Props {
    renders.with_renders(|renders| renders[renders.len() - 1].clone())
}

#[test]
fn given_a_rerender_with_the_same_deps_should_keep_the_callback() {
    let (mut driver, renders) = mount(|cx: &mut RenderContext| -> DefaultCallback {
        use_rx_callback(cx, |_: ()| Observable::<i32, Infallible>::of(vec![1]), deps![])
    });

    driver.emitter().invalidate();
    driver.process_events();

    renders.with_renders(|renders| {
        assert!(renders[0] == renders[1]);
    });
}

#[test]
fn given_a_rerender_with_changed_deps_should_replace_the_callback() {
    let multiplier = Arc::new(AtomicI32::new(1));
    let read = multiplier.clone();
    let (mut driver, renders) = mount(move |cx: &mut RenderContext| -> DefaultCallback {
        let by = read.load(Ordering::SeqCst);
        use_rx_callback(cx, move |_: ()| Observable::<i32, Infallible>::of(vec![by]), deps![by])
    });

    multiplier.store(7, Ordering::SeqCst);
    driver.emitter().invalidate();
    driver.process_events();

    let (first, second) = renders.with_renders(|renders| (renders[0].clone(), renders[1].clone()));
    assert!(first != second);
    assert_eq!(block_on(second.call(())), Ok(Some(7)));
}

#[test]
fn given_an_empty_source_with_the_default_policy_should_resolve_none() {
    let (_driver, renders) = mount(|cx: &mut RenderContext| -> DefaultCallback {
        use_rx_callback(cx, |_: ()| Observable::<i32, Infallible>::empty(), deps![])
    });

    let callback = latest(&renders);

    assert_eq!(block_on(callback.call(())), Ok(None));
}

#[test]
fn given_a_pending_call_when_unmounted_should_reject_with_canceled() {
    let (mut driver, renders) = mount(|cx: &mut RenderContext| -> DefaultCallback {
        use_rx_callback(cx, |_: ()| Observable::<i32, Infallible>::never(), deps![])
    });
    let pending = latest(&renders).call(());

    driver.unmount();

    assert!(pending.subscription().is_closed());
    assert_eq!(block_on(pending), Err(Rejection::Canceled(CanceledError)));
}

#[test]
fn given_a_second_call_with_the_default_policy_should_supersede_the_first() {
    let subject = Subject::<i32, Infallible>::new();
    let source = subject.clone();
    let (_driver, renders) = mount(move |cx: &mut RenderContext| -> DefaultCallback {
        let source = source.clone();
        use_rx_callback(cx, move |_: ()| source.clone(), deps![])
    });
    let callback = latest(&renders);

    let first = callback.call(());
    let second = callback.call(());
    subject.next(3);
    subject.complete();

    assert!(first.subscription().is_closed());
    assert_eq!(block_on(first), Err(Rejection::Canceled(CanceledError)));
    assert_eq!(block_on(second), Ok(Some(3)));
}

#[test]
fn given_a_delayed_source_with_the_first_policy_should_resolve_once_the_timer_fires() {
    let timer = VirtualTimer::new();
    let delay_timer = timer.clone();
    let (_driver, renders) = mount(move |cx: &mut RenderContext| {
        let delay_timer = delay_timer.clone();
        use_rx_callback_with(
            cx,
            move |value: i32| {
                Observable::<i32, Infallible>::of(vec![value])
                    .delay(delay_timer.clone(), Duration::from_millis(100))
            },
            deps![],
            Policy::first,
        )
    });
    let mut result = latest(&renders).call(5);

    assert_eq!((&mut result).now_or_never(), None);
    timer.advance(Duration::from_millis(100));

    assert_eq!(block_on(result), Ok(5));
    assert_eq!(timer.pending(), 0);
}

#[test]
fn given_a_source_error_should_reject_with_it() {
    let (_driver, renders) = mount(|cx: &mut RenderContext| {
        use_rx_callback_with(
            cx,
            |_: ()| Observable::<i32, &'static str>::throw_error("boom"),
            deps![],
            Policy::last,
        )
    });

    let outcome = block_on(latest(&renders).call(()));

    assert_eq!(outcome, Err(Rejection::Source("boom")));
}
