mod rx_component;

use oxide_rx::{Component, TestHost, TestHostDriver, TestRenderer};
pub(crate) use rx_component::*;

mod rx_callback_tests;
mod rx_subscription_tests;
mod store_lifecycle_tests;

/// Mount `component` on a test host, returning its driver and the captured renders.
pub(crate) fn mount<Props, C>(
    component: C,
) -> (
    TestHostDriver<Props, C, TestRenderer<Props>>,
    TestRenderer<Props>,
)
where
    C: Component<Props>,
{
    let renderer = TestRenderer::new();
    let driver = TestHost::new(component, renderer.clone()).run();

    (driver, renderer)
}
