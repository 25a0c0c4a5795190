//! Lifecycle capabilities
//!
//! Singletons opt into these by declaring them at registration time
//! ([`Constructor::initializable`](crate::Constructor::initializable),
//! [`Constructor::cleanable`](crate::Constructor::cleanable)) or on an
//! existing [`Instance`](crate::Instance) via
//! [`Instance::with_view`](crate::Instance::with_view).

use crate::BoxError;
use std::sync::Arc;

/// A singleton that needs a hook once the whole graph exists.
///
/// Called once during [`AutoWirer::wire`](crate::AutoWirer::wire), in
/// construction order, after every registered singleton was built.
pub trait Initializable: Send + Sync {
    /// Finish setting up; every dependency is available at this point
    fn initialize(&self) -> Result<(), BoxError>;
}

/// A singleton that releases resources on teardown.
///
/// Called once during [`AutoWirer::cleanup`](crate::AutoWirer::cleanup),
/// in reverse construction order.
pub trait Cleanable: Send + Sync {
    /// Release whatever the singleton holds
    fn cleanup(&self) -> Result<(), BoxError>;
}

#[inline]
pub(crate) fn as_initializable<T: Initializable + 'static>(value: Arc<T>) -> Arc<dyn Initializable> {
    value
}

#[inline]
pub(crate) fn as_cleanable<T: Cleanable + 'static>(value: Arc<T>) -> Arc<dyn Cleanable> {
    value
}
