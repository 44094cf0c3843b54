use std::convert::Infallible;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use super::{mount, state_component};
use oxide_rx::{
    deps, use_rx_event_store, use_rx_event_store_with, use_rx_store, use_rx_store_value,
    BehaviorSubject, RenderContext, RxStore, SetState, StoreInput,
};

#[test]
fn given_an_initial_value_should_render_it() {
    let (_driver, renders) = mount(state_component(|| StoreInput::Value(3)));

    assert_eq!(renders.count(), 1);
    renders.with_renders(|renders| {
        assert_eq!(renders[0].value, 3);
    });
}

#[test]
fn given_an_initial_value_when_unmounted_should_complete_the_created_store() {
    let (mut driver, renders) = mount(state_component(|| StoreInput::Value(0)));
    let store = renders.with_renders(|renders| renders[0].store.clone());

    driver.unmount();

    assert!(store.is_completed());
}

#[test]
fn given_an_external_store_when_unmounted_should_leave_it_live() {
    let external: RxStore<i32> = RxStore::new(1);
    let input = external.clone();
    let (mut driver, renders) = mount(state_component(move || StoreInput::from(input.clone())));

    driver.unmount();

    assert!(!external.is_completed());
    renders.with_renders(|renders| {
        assert!(renders[0].store == external);
    });
}

#[test]
fn given_an_external_subject_when_unmounted_should_complete_it() {
    let subject = BehaviorSubject::<i32, Infallible>::new(4);
    let input = subject.clone();
    let (mut driver, renders) = mount(state_component(move || StoreInput::from(input.clone())));

    driver.unmount();

    assert!(subject.is_stopped());
    assert!(!subject.has_error());
    renders.with_renders(|renders| {
        assert_eq!(renders[0].value, 4);
    });
}

#[test]
fn given_a_terminated_subject_should_render_from_a_fresh_store_and_complete_it_at_unmount() {
    let subject = BehaviorSubject::<i32, Infallible>::new(9);
    subject.complete();
    let input = subject.clone();
    let (mut driver, renders) = mount(state_component(move || StoreInput::from(input.clone())));
    let store = renders.with_renders(|renders| renders[0].store.clone());

    store.next(10);
    driver.process_events();

    renders.with_renders(|renders| {
        assert_eq!(renders[0].value, 9);
        assert_eq!(renders[1].value, 10);
    });
    driver.unmount();
    assert!(store.is_completed());
}

#[test]
fn given_an_errored_subject_should_render_from_a_fresh_store() {
    let errored = BehaviorSubject::<i32, &'static str>::new(2);
    errored.error("failed");
    let source = errored.clone();
    let (mut driver, renders) = mount(move |cx: &mut RenderContext| {
        let store = use_rx_store(cx, StoreInput::from(source.clone()));
        (use_rx_store_value(cx, &store), store)
    });
    let store = renders.with_renders(|renders| renders[0].1.clone());

    store.next(3);
    driver.process_events();

    assert!(!store.subject().ptr_eq(&errored));
    renders.with_renders(|renders| {
        assert_eq!(renders[0].0, 2);
        assert_eq!(renders[1].0, 3);
    });
    driver.unmount();
    assert!(store.is_completed());
}

#[test]
fn given_rerenders_should_produce_the_initial_value_once_and_keep_the_store() {
    let produced = Arc::new(AtomicUsize::new(0));
    let counter = produced.clone();
    let (mut driver, renders) = mount(state_component(move || {
        let counter = counter.clone();
        StoreInput::lazy(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            1
        })
    }));

    driver.emitter().invalidate();
    driver.process_events();

    assert_eq!(produced.load(Ordering::SeqCst), 1);
    renders.with_renders(|renders| {
        assert_eq!(renders.len(), 2);
        assert!(renders[0].store == renders[1].store);
        assert!(renders[0].dispatcher == renders[1].dispatcher);
    });
}

#[test]
fn given_dispatches_when_processed_should_render_once_with_the_latest_value() {
    let (mut driver, renders) = mount(state_component(|| StoreInput::Value(1)));

    renders.with_renders(|renders| {
        renders[0].dispatcher.dispatch(5);
        renders[0].dispatcher.dispatch(SetState::modify(|current| current + 1));
    });
    driver.process_events();

    assert_eq!(renders.count(), 2);
    renders.with_renders(|renders| {
        assert_eq!(renders[1].value, 6);
    });
}

#[test]
fn given_an_event_store_when_events_fire_should_hold_the_latest_event() {
    let (_driver, renders) = mount(|cx: &mut RenderContext| {
        use_rx_event_store(cx, StoreInput::<&'static str>::Value("idle"))
    });

    renders.with_renders(|renders| {
        let (store, on_event) = &renders[0];
        on_event("clicked");
        assert_eq!(store.get_value(), "clicked");
    });
}

#[test]
fn given_an_event_store_with_a_projection_should_store_projected_events() {
    let (mut driver, renders) = mount(|cx: &mut RenderContext| {
        use_rx_event_store_with(
            cx,
            StoreInput::<usize>::Value(0),
            |text: String| text.len(),
            deps![],
        )
    });

    renders.with_renders(|renders| {
        let (_, on_event) = &renders[0];
        on_event(String::from("three"));
    });
    driver.process_events();

    renders.with_renders(|renders| {
        let (store, _) = &renders[0];
        assert_eq!(store.get_value(), 5);
    });
}
