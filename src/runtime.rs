//! The host that mounts a component and drives its render loop.

use core::marker::PhantomData;

use flume::Receiver;

use crate::{Component, Emitter, HostEvent, RenderContext, Renderer};

/// Mounts one [`Component`] and re-renders it whenever its hooks request it.
///
/// The host:
/// 1. Renders the component once on mount and hands the Props to the [`Renderer`]
/// 2. Waits for [`HostEvent`]s queued through its [`Emitter`]
/// 3. Renders once per batch of queued invalidations
/// 4. On [`HostEvent::Unmount`] (or drop) runs every hook cleanup and stops
///
/// Events may be queued from any thread but are always processed sequentially on the
/// task awaiting [`Host::run`].
///
/// For tests with manual control, use [`TestHost`] with a [`crate::TestRenderer`].
///
/// # Type Parameters
///
/// * `Props` - The props type produced by the component
/// * `C` - The component implementation type (implements [`Component`])
/// * `R` - The renderer implementation type (implements [`Renderer`])
pub struct Host<Props, C, R>
where
    C: Component<Props>,
    R: Renderer<Props>,
{
    component: C,
    renderer: R,
    context: RenderContext,
    receiver: Receiver<HostEvent>,
    emitter: Emitter,
    mounted: bool,
    _props: PhantomData<fn() -> Props>,
}

impl<Props, C, R> Host<Props, C, R>
where
    C: Component<Props>,
    R: Renderer<Props>,
{
    /// Create a new host. Nothing renders until [`Host::run`] is awaited.
    pub fn new(component: C, renderer: R) -> Self {
        let (sender, receiver) = flume::unbounded();
        let emitter = Emitter::new(sender);

        Host {
            component,
            renderer,
            context: RenderContext::new(emitter.clone()),
            receiver,
            emitter,
            mounted: false,
            _props: PhantomData,
        }
    }

    /// Emitter for requesting renders or unmounting from outside the component.
    pub fn emitter(&self) -> Emitter {
        self.emitter.clone()
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    /// Mount the component and process events until it is unmounted.
    pub async fn run(&mut self) {
        self.mount();

        while self.mounted {
            match self.receiver.recv_async().await {
                Ok(event) => self.step(event),
                Err(_) => break,
            }
        }
    }

    fn mount(&mut self) {
        if self.mounted {
            return;
        }
        log::debug!("mounting component");
        self.mounted = true;
        self.render_pass();
    }

    /// Handle `first` plus everything already queued behind it, rendering at most once.
    fn step(&mut self, first: HostEvent) {
        let mut dirty = false;
        let mut next = Some(first);
        while let Some(event) = next {
            match event {
                HostEvent::Invalidate => dirty = true,
                HostEvent::Unmount => {
                    self.unmount();
                    return;
                }
            }
            next = self.receiver.try_recv().ok();
        }

        if dirty && self.mounted {
            self.render_pass();
        }
    }

    fn render_pass(&mut self) {
        log::trace!("rendering component");
        self.context.begin();
        let props = self.component.render(&mut self.context);
        self.context.finish();
        self.renderer.render(props);
    }

    /// Run every hook cleanup. Later events are ignored.
    pub fn unmount(&mut self) {
        if !self.mounted {
            return;
        }
        self.mounted = false;
        self.context.teardown();
        log::debug!("component unmounted");
    }
}

impl<Props, C, R> Drop for Host<Props, C, R>
where
    C: Component<Props>,
    R: Renderer<Props>,
{
    fn drop(&mut self) {
        self.unmount();
    }
}

#[cfg(any(test, feature = "testing"))]
/// Test driver for manual event processing control.
///
/// Only available with the `testing` feature or during tests.
///
/// Returned by [`TestHost::run`]. Dropping the driver unmounts the component.
pub struct TestHostDriver<Props, C, R>
where
    C: Component<Props>,
    R: Renderer<Props>,
{
    host: Host<Props, C, R>,
}

#[cfg(any(test, feature = "testing"))]
impl<Props, C, R> TestHostDriver<Props, C, R>
where
    C: Component<Props>,
    R: Renderer<Props>,
{
    /// Process all queued events.
    ///
    /// Call this after changing stores or invoking callbacks to drive the render loop.
    pub fn process_events(&mut self) {
        while let Ok(event) = self.host.receiver.try_recv() {
            self.host.step(event);
        }
    }

    pub fn emitter(&self) -> Emitter {
        self.host.emitter()
    }

    pub fn is_mounted(&self) -> bool {
        self.host.is_mounted()
    }

    /// Unmount the component immediately, running every hook cleanup.
    pub fn unmount(&mut self) {
        self.host.unmount();
    }
}

#[cfg(any(test, feature = "testing"))]
/// Test host with manual event processing control.
///
/// Only available with the `testing` feature or during tests.
///
/// Unlike [`Host`], nothing is processed automatically: tests call
/// [`process_events`](TestHostDriver::process_events) on the returned driver.
///
/// ```rust
/// use oxide_rx::{RenderContext, RxStore, TestHost, TestRenderer};
///
/// let store: RxStore<i32> = RxStore::new(0);
/// let renderer = TestRenderer::new();
/// let component = {
///     let store = store.clone();
///     move |cx: &mut RenderContext| cx.use_sync_external_store(&store)
/// };
///
/// let mut driver = TestHost::new(component, renderer.clone()).run();
/// store.next(1);
/// store.next(2);
/// driver.process_events();
///
/// renderer.with_renders(|renders| assert_eq!(renders, &vec![0, 2]));
/// ```
pub struct TestHost<Props, C, R>
where
    C: Component<Props>,
    R: Renderer<Props>,
{
    host: Host<Props, C, R>,
}

#[cfg(any(test, feature = "testing"))]
impl<Props, C, R> TestHost<Props, C, R>
where
    C: Component<Props>,
    R: Renderer<Props>,
{
    pub fn new(component: C, renderer: R) -> Self {
        TestHost {
            host: Host::new(component, renderer),
        }
    }

    /// Mount and render the component, returning a driver for manual event processing.
    pub fn run(mut self) -> TestHostDriver<Props, C, R> {
        self.host.mount();
        TestHostDriver { host: self.host }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Cleanup, TestRenderer};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn given_queued_invalidations_should_render_once() {
        let renderer = TestRenderer::new();
        let mut driver = TestHost::new(|_cx: &mut RenderContext| (), renderer.clone()).run();

        let emitter = driver.emitter();
        emitter.invalidate();
        emitter.invalidate();
        emitter.invalidate();
        driver.process_events();

        assert_eq!(renderer.count(), 2);
    }

    #[test]
    fn given_an_unmount_event_should_run_cleanups_and_ignore_later_invalidations() {
        let renderer = TestRenderer::new();
        let cleanups = Arc::new(AtomicUsize::new(0));
        let counted = cleanups.clone();
        let component = move |cx: &mut RenderContext| {
            let counted = counted.clone();
            cx.use_render_effect(crate::deps![], move || {
                Some(Cleanup::new(move || {
                    counted.fetch_add(1, Ordering::SeqCst);
                }))
            });
        };
        let mut driver = TestHost::new(component, renderer.clone()).run();

        let emitter = driver.emitter();
        emitter.unmount();
        emitter.invalidate();
        driver.process_events();

        assert!(!driver.is_mounted());
        assert_eq!(cleanups.load(Ordering::SeqCst), 1);
        assert_eq!(renderer.count(), 1);
    }

    #[test]
    fn given_a_running_host_when_unmount_is_queued_should_skip_pending_renders_and_return() {
        let renderer = TestRenderer::new();
        let mut host = Host::new(|_cx: &mut RenderContext| 1, renderer.clone());
        let emitter = host.emitter();
        emitter.invalidate();
        emitter.unmount();

        futures::executor::block_on(host.run());

        assert!(!host.is_mounted());
        assert_eq!(renderer.count(), 1);
    }
}
