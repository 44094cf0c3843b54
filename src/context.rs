//! Per-component hook storage and the generic render-scope hooks.

use core::any::Any;
use std::sync::Arc;

use spin::Mutex;

use crate::{Cleanup, Deps, DepsTracker, Emitter, ExternalStore};

/// Storage for one hook position.
pub(crate) trait HookSlot: Any + Send {
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Release whatever the slot holds. Called once, at unmount.
    fn teardown(&mut self) {}
}

struct ConstSlot<T>(T);

impl<T: Send + 'static> HookSlot for ConstSlot<T> {
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

struct MemoSlot<T> {
    deps: DepsTracker,
    value: Option<T>,
}

impl<T: Send + 'static> HookSlot for MemoSlot<T> {
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

struct EffectSlot {
    deps: DepsTracker,
    cleanup: Option<Cleanup>,
}

impl HookSlot for EffectSlot {
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn teardown(&mut self) {
        if let Some(cleanup) = self.cleanup.take() {
            cleanup.run();
        }
    }
}

/// Setter returned by [`RenderContext::use_state`].
///
/// Stores the value and requests a render. Clones share the same state.
pub struct StateSetter<T> {
    value: Arc<Mutex<T>>,
    emitter: Emitter,
}

impl<T> Clone for StateSetter<T> {
    fn clone(&self) -> Self {
        Self {
            value: self.value.clone(),
            emitter: self.emitter.clone(),
        }
    }
}

impl<T> StateSetter<T> {
    pub fn set(&self, value: T) {
        *self.value.lock() = value;
        self.emitter.invalidate();
    }
}

/// Hook storage of one mounted component instance.
///
/// Hooks are identified by call position, so a component must call the same hooks in
/// the same order on every render. Violations are programming errors and panic with a
/// `DeveloperError:` message.
pub struct RenderContext {
    slots: Vec<Box<dyn HookSlot>>,
    cursor: usize,
    mounted: bool,
    emitter: Emitter,
}

impl RenderContext {
    pub(crate) fn new(emitter: Emitter) -> Self {
        Self {
            slots: Vec::new(),
            cursor: 0,
            mounted: false,
            emitter,
        }
    }

    pub(crate) fn begin(&mut self) {
        self.cursor = 0;
    }

    pub(crate) fn finish(&mut self) {
        if self.mounted && self.cursor != self.slots.len() {
            panic!(
                "DeveloperError: rendered {} hooks, previous render had {}",
                self.cursor,
                self.slots.len()
            );
        }
        self.mounted = true;
    }

    /// Run every slot's teardown in call order and drop all hook state.
    pub(crate) fn teardown(&mut self) {
        for mut slot in self.slots.drain(..) {
            slot.teardown();
        }
        self.cursor = 0;
        self.mounted = false;
    }

    pub(crate) fn slot<S: HookSlot>(&mut self, init: impl FnOnce() -> S) -> &mut S {
        let index = self.cursor;
        self.cursor += 1;
        if index == self.slots.len() {
            if self.mounted {
                panic!("DeveloperError: hook at position {index} was not called on the previous render");
            }
            self.slots.push(Box::new(init()));
        }

        match self.slots[index].as_any_mut().downcast_mut::<S>() {
            Some(slot) => slot,
            None => panic!("DeveloperError: hook at position {index} changed type between renders"),
        }
    }

    /// Emitter of the host rendering this component.
    pub fn emitter(&self) -> &Emitter {
        &self.emitter
    }

    /// Value created by `init` on the first render, returned unchanged afterwards.
    pub fn use_const<T: Clone + Send + 'static>(&mut self, init: impl FnOnce() -> T) -> T {
        self.slot(|| ConstSlot(init())).0.clone()
    }

    /// Value recomputed by `compute` whenever `deps` differ from the previous render.
    pub fn use_memo<T: Clone + Send + 'static>(&mut self, deps: Deps, compute: impl FnOnce() -> T) -> T {
        let slot = self.slot(|| MemoSlot::<T> {
            deps: DepsTracker::new(),
            value: None,
        });
        if !slot.deps.changed(deps) {
            if let Some(value) = &slot.value {
                return value.clone();
            }
        }

        let value = compute();
        slot.value = Some(value.clone());
        value
    }

    /// Run `effect` during this render when `deps` changed, including the first render.
    ///
    /// The cleanup returned by the previous run is executed before `effect` runs
    /// again, and once more when the component unmounts.
    pub fn use_render_effect(&mut self, deps: Deps, effect: impl FnOnce() -> Option<Cleanup>) {
        let slot = self.slot(|| EffectSlot {
            deps: DepsTracker::new(),
            cleanup: None,
        });
        if !slot.deps.changed(deps) {
            return;
        }

        if let Some(cleanup) = slot.cleanup.take() {
            cleanup.run();
        }
        slot.cleanup = effect();
    }

    /// Read `store`, rendering again whenever it reports a change.
    ///
    /// The change subscription is established before the value is read, so a render
    /// never misses an update made between the two. Switching to a different store
    /// disposes the previous subscription.
    pub fn use_sync_external_store<T, S>(&mut self, store: &S) -> T
    where
        S: ExternalStore<T> + PartialEq + Clone + 'static,
    {
        let emitter = self.emitter.clone();
        let subscribed = store.clone();
        self.use_render_effect(Deps::new().with(store.clone()), move || {
            let subscription = subscribed.subscribe_changes(Box::new(move || emitter.invalidate()));
            Some(Cleanup::unsubscribe(subscription))
        });
        store.get_value()
    }

    /// Component-local state. The setter stores a new value and requests a render.
    pub fn use_state<T: Clone + Send + 'static>(&mut self, init: impl FnOnce() -> T) -> (T, StateSetter<T>) {
        let emitter = self.emitter.clone();
        let setter = self.use_const(move || StateSetter {
            value: Arc::new(Mutex::new(init())),
            emitter,
        });
        let value = setter.value.lock().clone();
        (value, setter)
    }
}
