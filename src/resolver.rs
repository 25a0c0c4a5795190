//! Depth-first resolution of a key into an instance
//!
//! 1. Singleton requests reuse the unique existing instance, if any.
//! 2. The key is marked under construction (cycle guard).
//! 3. The unique registered constructor providing the key is looked up.
//! 4. Dependencies are resolved as singletons, left to right, fail-fast.
//! 5. The factory runs, then instantiation listeners fire.
//! 6. Singleton results are appended to the construction-ordered record list.

use crate::factory::Arguments;
use crate::storage::Registry;
use crate::{DiError, Instance, Result, TypeKey};

#[cfg(feature = "logging")]
use tracing::{debug, trace};

impl Registry {
    /// Resolve `key`, constructing it (and its dependencies) if needed.
    pub(crate) fn resolve(
        &self,
        key: TypeKey,
        parent: Option<TypeKey>,
        as_singleton: bool,
    ) -> Result<Instance> {
        if as_singleton {
            if let Some(existing) = self.find_instance(key)? {
                #[cfg(feature = "logging")]
                trace!(
                    target: "autowirer",
                    service = key.name(),
                    concrete = existing.type_name(),
                    "Resolved existing singleton"
                );
                return Ok(existing);
            }
        }

        self.enter(key, parent)?;
        let result = self.construct(key, as_singleton);
        self.leave(key);

        #[cfg(feature = "logging")]
        if let Err(err) = &result {
            debug!(
                target: "autowirer",
                service = key.name(),
                parent = parent.map(|p| p.name()),
                error = %err,
                "Resolution failed"
            );
        }

        result
    }

    fn construct(&self, key: TypeKey, as_singleton: bool) -> Result<Instance> {
        let info = self
            .find_constructor(key)?
            .ok_or_else(|| DiError::unknown(key.name()))?;

        #[cfg(feature = "logging")]
        trace!(
            target: "autowirer",
            service = key.name(),
            concrete = info.produces().name(),
            dependencies = info.dependencies().len(),
            "Constructing service"
        );

        let mut values = Vec::with_capacity(info.dependencies().len());
        for dependency in info.dependencies() {
            values.push(self.resolve(*dependency, Some(key), true)?);
        }

        let instance = info
            .create(&Arguments::new(values))
            .map_err(|source| DiError::factory_failed(info.produces().name(), source))?;

        #[cfg(feature = "logging")]
        debug!(
            target: "autowirer",
            service = instance.type_name(),
            singleton = as_singleton,
            "Service instantiated"
        );

        self.dispatch(&instance)?;

        if as_singleton {
            self.push_singleton(instance.clone(), Some(info));
        }

        Ok(instance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BoxError, Constructor};
    use parking_lot::Mutex;
    use std::sync::Arc;

    struct Config;

    struct Engine {
        config: Arc<Config>,
    }

    struct Left;
    struct Right;

    fn registry() -> Registry {
        Registry::new(0, false)
    }

    #[test]
    fn test_dependencies_built_first() {
        let registry = registry();
        let order = Arc::new(Mutex::new(Vec::new()));

        let log = Arc::clone(&order);
        registry.insert_constructor(
            Constructor::new(move |args| {
                log.lock().push("engine");
                Ok(Engine {
                    config: args.get(0)?,
                })
            })
            .depends_on::<Config>()
            .into_info(),
        );
        let log = Arc::clone(&order);
        registry.insert_constructor(
            Constructor::new(move |_| {
                log.lock().push("config");
                Ok(Config)
            })
            .into_info(),
        );

        let engine = registry.resolve(TypeKey::of::<Engine>(), None, true).unwrap();
        let config = registry.find_instance(TypeKey::of::<Config>()).unwrap().unwrap();

        assert_eq!(*order.lock(), vec!["config", "engine"]);
        assert!(Arc::ptr_eq(
            &engine.get::<Engine>().unwrap().config,
            &config.get::<Config>().unwrap()
        ));
        assert_eq!(registry.singleton_count(), 2);
    }

    #[test]
    fn test_singleton_reused() {
        let registry = registry();
        registry.insert_constructor(Constructor::new(|_| Ok(Config)).into_info());

        let a = registry.resolve(TypeKey::of::<Config>(), None, true).unwrap();
        let b = registry.resolve(TypeKey::of::<Config>(), None, true).unwrap();
        assert!(a.ptr_eq(&b));
        assert_eq!(registry.singleton_count(), 1);
    }

    #[test]
    fn test_non_singleton_not_recorded() {
        let registry = registry();
        registry.insert_constructor(Constructor::new(|_| Ok(Config)).into_info());

        let a = registry.resolve(TypeKey::of::<Config>(), None, false).unwrap();
        let b = registry.resolve(TypeKey::of::<Config>(), None, false).unwrap();
        assert!(!a.ptr_eq(&b));
        assert_eq!(registry.singleton_count(), 0);
    }

    #[test]
    fn test_unknown_dependency() {
        let registry = registry();
        registry.insert_constructor(
            Constructor::new(|args| Ok(Engine { config: args.get(0)? }))
                .depends_on::<Config>()
                .into_info(),
        );

        let err = registry.resolve(TypeKey::of::<Engine>(), None, true).unwrap_err();
        assert!(matches!(err, DiError::UnknownDependency { .. }));
        assert_eq!(registry.singleton_count(), 0);
    }

    #[test]
    fn test_cycle_detected() {
        let registry = registry();
        registry.insert_constructor(Constructor::new(|_| Ok(Left)).depends_on::<Right>().into_info());
        registry.insert_constructor(Constructor::new(|_| Ok(Right)).depends_on::<Left>().into_info());

        let err = registry.resolve(TypeKey::of::<Left>(), None, true).unwrap_err();
        match err {
            DiError::CircularDependency { type_name, parent } => {
                assert!(type_name.ends_with("Left"));
                assert!(parent.unwrap().ends_with("Right"));
            }
            other => panic!("expected cycle, got {other:?}"),
        }
        assert_eq!(registry.singleton_count(), 0);

        // the guard was released on the way out
        let err = registry.resolve(TypeKey::of::<Right>(), None, true).unwrap_err();
        assert!(matches!(err, DiError::CircularDependency { .. }));
    }

    #[test]
    fn test_factory_failure_wrapped() {
        let registry = registry();
        registry.insert_constructor(
            Constructor::<Config>::new(|_| Err(BoxError::from("disk full"))).into_info(),
        );

        match registry.resolve(TypeKey::of::<Config>(), None, true) {
            Err(DiError::FactoryFailed { type_name, source }) => {
                assert!(type_name.ends_with("Config"));
                assert_eq!(source.to_string(), "disk full");
            }
            other => panic!("expected factory failure, got {other:?}"),
        }
    }
}
