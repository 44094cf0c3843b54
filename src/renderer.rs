//! Renderer abstraction for rendering Props.

#[cfg(any(test, feature = "testing"))]
use std::sync::Arc;

#[cfg(any(test, feature = "testing"))]
use spin::Mutex;

/// Renderer abstraction for rendering Props.
///
/// Implement this trait to hand the Props a [`Component`](crate::Component) produces to
/// your rendering system (UI framework, terminal, embedded display, etc.).
///
/// The [`render`](Self::render) method is called after every render pass of the host.
///
/// # Example
///
/// ```rust
/// use oxide_rx::Renderer;
///
/// struct Props {
///     message: &'static str,
/// }
///
/// struct ConsoleRenderer;
///
/// impl Renderer<Props> for ConsoleRenderer {
///     fn render(&mut self, props: Props) {
///         println!("{}", props.message);
///     }
/// }
/// ```
pub trait Renderer<Props> {
    /// Render the given props.
    fn render(&mut self, props: Props);
}

#[cfg(any(test, feature = "testing"))]
/// Test renderer that captures all rendered Props for assertions.
///
/// Only available with the `testing` feature.
///
/// Clones share the same capture storage, so hand one clone to the host and keep
/// another for assertions.
///
/// # Example
///
/// ```rust
/// use oxide_rx::{RenderContext, TestHost, TestRenderer};
///
/// let renderer = TestRenderer::new();
/// let _driver = TestHost::new(|cx: &mut RenderContext| cx.use_const(|| 42), renderer.clone()).run();
///
/// renderer.with_renders(|renders| assert_eq!(renders, &vec![42]));
/// ```
pub struct TestRenderer<Props> {
    renders: Arc<Mutex<Vec<Props>>>,
}

#[cfg(any(test, feature = "testing"))]
impl<Props> Clone for TestRenderer<Props> {
    fn clone(&self) -> Self {
        Self {
            renders: self.renders.clone(),
        }
    }
}

#[cfg(any(test, feature = "testing"))]
impl<Props> Renderer<Props> for TestRenderer<Props> {
    fn render(&mut self, props: Props) {
        self.renders.lock().push(props);
    }
}

#[cfg(any(test, feature = "testing"))]
impl<Props> Default for TestRenderer<Props> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(any(test, feature = "testing"))]
impl<Props> TestRenderer<Props> {
    pub fn new() -> Self {
        Self {
            renders: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Get the number of renders that have occurred.
    pub fn count(&self) -> usize {
        self.renders.lock().len()
    }

    /// Access the captured renders with a closure.
    ///
    /// The closure receives a reference to the Vec of all captured Props, which
    /// allows assertions on Props or invoking callbacks they carry.
    pub fn with_renders<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&Vec<Props>) -> R,
    {
        let renders = self.renders.lock();
        f(&renders)
    }

    /// Access the most recent render, if any.
    pub fn with_latest<F, R>(&self, f: F) -> Option<R>
    where
        F: FnOnce(&Props) -> R,
    {
        let renders = self.renders.lock();
        renders.last().map(f)
    }
}
