//! Type identity and type-erased instances
//!
//! A [`TypeKey`] names anything that can be requested from the wirer, both
//! concrete types and `dyn Trait` interfaces. An [`Instance`] is a built
//! singleton together with every key it can be requested as.

use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Marker trait for types that can be wired.
///
/// This is automatically implemented for all types that are `Send + Sync + 'static`.
/// You never need to implement this manually.
pub trait Injectable: Send + Sync + 'static {}

// Blanket implementation - everything that's Send + Sync + 'static is Injectable
impl<T: Send + Sync + 'static> Injectable for T {}

/// Identifier of a registrable type.
///
/// Two keys are equal when they refer to the same `TypeId`; the name is
/// carried along for error messages and logs.
///
/// ```rust
/// use autowirer::TypeKey;
///
/// trait Store: Send + Sync {}
///
/// assert_eq!(TypeKey::of::<u32>(), TypeKey::of::<u32>());
/// assert_ne!(TypeKey::of::<u32>(), TypeKey::of::<dyn Store>());
/// ```
#[derive(Clone, Copy)]
pub struct TypeKey {
    id: TypeId,
    name: &'static str,
}

impl TypeKey {
    /// Key of `T`, which may be unsized (e.g. `dyn Trait`)
    #[inline]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// The underlying `TypeId`
    #[inline]
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Human-readable type name
    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for TypeKey {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeKey {}

impl Hash for TypeKey {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// One way of looking at an instance. `handle` stores an `Arc<U>` for the
/// view's key `U`, boxed once more so unsized `U` fits behind `dyn Any`.
struct View {
    key: TypeKey,
    handle: Arc<dyn Any + Send + Sync>,
}

/// A built singleton, type-erased.
///
/// Cloning is cheap and yields the same underlying value.
///
/// ```rust
/// use autowirer::Instance;
/// use std::sync::Arc;
///
/// trait Greeter: Send + Sync {
///     fn greet(&self) -> String;
/// }
///
/// struct English;
///
/// impl Greeter for English {
///     fn greet(&self) -> String { "hello".into() }
/// }
///
/// let instance = Instance::new(Arc::new(English))
///     .with_view(|e: Arc<English>| -> Arc<dyn Greeter> { e });
///
/// assert!(instance.get::<English>().is_some());
/// assert_eq!(instance.get::<dyn Greeter>().unwrap().greet(), "hello");
/// ```
#[derive(Clone)]
pub struct Instance {
    concrete: TypeKey,
    views: Arc<[View]>,
}

impl Instance {
    /// Wrap a value that can only be requested as its own type
    pub fn new<T: Injectable>(value: Arc<T>) -> Self {
        Self {
            concrete: TypeKey::of::<T>(),
            views: Arc::from(vec![View {
                key: TypeKey::of::<T>(),
                handle: Arc::new(value),
            }]),
        }
    }

    /// Add a view of this instance under another key.
    ///
    /// `T` must be the concrete type the instance was created with; a
    /// mismatch leaves the instance unchanged.
    pub fn with_view<T, U>(self, cast: impl FnOnce(Arc<T>) -> Arc<U>) -> Self
    where
        T: Injectable,
        U: ?Sized + Send + Sync + 'static,
    {
        let Some(concrete) = self.get::<T>() else {
            return self;
        };
        if self.is_instance(TypeKey::of::<U>()) {
            return self;
        }

        let mut views: Vec<View> = self
            .views
            .iter()
            .map(|v| View {
                key: v.key,
                handle: Arc::clone(&v.handle),
            })
            .collect();
        views.push(View {
            key: TypeKey::of::<U>(),
            handle: Arc::new(cast(concrete)),
        });

        Self {
            concrete: self.concrete,
            views: Arc::from(views),
        }
    }

    /// Key of the concrete type this instance was built as
    #[inline]
    pub fn concrete_key(&self) -> TypeKey {
        self.concrete
    }

    /// Name of the concrete type
    #[inline]
    pub fn type_name(&self) -> &'static str {
        self.concrete.name()
    }

    /// Whether this instance can be requested as `key`
    #[inline]
    pub fn is_instance(&self, key: TypeKey) -> bool {
        self.views.iter().any(|v| v.key == key)
    }

    /// Every key this instance can be requested as, concrete key first
    pub fn keys(&self) -> impl Iterator<Item = TypeKey> + '_ {
        self.views.iter().map(|v| v.key)
    }

    /// Get the instance as `U`, if it has a view for it
    pub fn get<U: ?Sized + Send + Sync + 'static>(&self) -> Option<Arc<U>> {
        let key = TypeKey::of::<U>();
        self.views
            .iter()
            .find(|v| v.key == key)
            .and_then(|v| v.handle.downcast_ref::<Arc<U>>())
            .map(Arc::clone)
    }

    /// Whether both instances share the same views (i.e. the same value)
    #[inline]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.views, &other.views)
    }
}

impl<T: Injectable> From<Arc<T>> for Instance {
    fn from(value: Arc<T>) -> Self {
        Self::new(value)
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("type", &self.concrete)
            .field("views", &self.keys().collect::<Vec<_>>())
            .finish()
    }
}
