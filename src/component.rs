//! Component trait rendered by a [`Host`](crate::Host).

use crate::RenderContext;

/// A component: derives Props from its hook state on every render.
///
/// Implementations call hooks on the provided [`RenderContext`] in the same order on
/// every render, then return the Props to hand to the [`Renderer`](crate::Renderer).
/// Closures taking a `&mut RenderContext` implement this trait.
///
/// # Example
///
/// ```rust
/// use oxide_rx::{use_rx_state, Component, Dispatcher, RenderContext, StoreInput};
/// use std::convert::Infallible;
///
/// struct Props {
///     count: i32,
///     set_count: Dispatcher<i32>,
/// }
///
/// struct Counter;
///
/// impl Component<Props> for Counter {
///     fn render(&self, cx: &mut RenderContext) -> Props {
///         let (count, set_count, _store) =
///             use_rx_state::<i32, Infallible>(cx, StoreInput::Value(0));
///         Props { count, set_count }
///     }
/// }
/// ```
pub trait Component<Props> {
    /// Render the component.
    ///
    /// # Arguments
    ///
    /// * `cx` - Hook storage for this component instance
    ///
    /// # Returns
    ///
    /// Props derived from the current hook state.
    fn render(&self, cx: &mut RenderContext) -> Props;
}

impl<Props, F> Component<Props> for F
where
    F: Fn(&mut RenderContext) -> Props,
{
    fn render(&self, cx: &mut RenderContext) -> Props {
        self(cx)
    }
}
