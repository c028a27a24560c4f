use std::fmt;

use proto_common::{Key, KeyOrder};

/// Extracts the key an item is indexed under.
///
/// The key of an item must not change while the item is in a keyed queue. Keys are computed
/// once on insertion and cached by the queue.
pub trait KeyProvider<T: ?Sized> {
    fn key(&self, item: &T) -> Key;

    /// The ordering policy keys are compared under.
    fn order(&self) -> KeyOrder {
        KeyOrder::default()
    }
}

/// A [`KeyProvider`] backed by a closure.
pub struct KeyFn<F> {
    f: F,
    order: KeyOrder,
}

impl<F> KeyFn<F> {
    pub const fn new(f: F) -> Self {
        Self { f, order: KeyOrder::unsigned() }
    }

    /// Sets the ordering policy.
    pub fn with_order(self, order: KeyOrder) -> Self {
        Self { f: self.f, order }
    }
}

impl<T: ?Sized, F: Fn(&T) -> Key> KeyProvider<T> for KeyFn<F> {
    #[inline]
    fn key(&self, item: &T) -> Key {
        (self.f)(item)
    }

    fn order(&self) -> KeyOrder {
        self.order
    }
}

impl<F> fmt::Debug for KeyFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyFn").field("order", &self.order).finish_non_exhaustive()
    }
}
