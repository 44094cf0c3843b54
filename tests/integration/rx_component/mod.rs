use std::convert::Infallible;
use std::sync::Arc;

use oxide_rx::{use_rx_state, Dispatcher, PartialObserver, RenderContext, RxStore, StoreInput};

#[derive(Clone)]
pub(crate) struct StateProps {
    pub(crate) value: i32,
    pub(crate) dispatcher: Dispatcher<i32>,
    pub(crate) store: RxStore<i32>,
}

/// Component holding one `use_rx_state`, fed from `input` on every render.
pub(crate) fn state_component(
    input: impl Fn() -> StoreInput<i32> + 'static,
) -> impl Fn(&mut RenderContext) -> StateProps {
    move |cx: &mut RenderContext| {
        let (value, dispatcher, store) = use_rx_state(cx, input());
        StateProps {
            value,
            dispatcher,
            store,
        }
    }
}

#[cfg_attr(test, mockall::automock)]
pub(crate) trait ValueSink {
    fn on_value(&self, value: i32);
    fn on_complete(&self);
}

pub(crate) fn sink_observer<P>(sink: Arc<P>) -> PartialObserver<i32, Infallible>
where
    P: ValueSink + Send + Sync + 'static,
{
    let on_complete = sink.clone();
    PartialObserver::new()
        .on_next(move |value| sink.on_value(value))
        .on_complete(move || on_complete.on_complete())
}
