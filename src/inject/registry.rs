//! Build-time registry of trait implementations.
//!
//! Implementations register themselves with [`register_implementation!`], which
//! places an [`Implementation`] entry into a `linkme` distributed slice. The engine
//! consults an [`ImplementationRegistry`] when an unregistered `dyn Trait` member has
//! to be satisfied.
//!
//! ```
//! use autoinject::{register_implementation, ImplementationRegistry, Injectable, ServiceKey};
//!
//! pub trait Repository: Send + Sync {}
//!
//! #[derive(Default, Injectable)]
//! pub struct MemoryRepository;
//! impl Repository for MemoryRepository {}
//!
//! register_implementation!(dyn Repository => MemoryRepository);
//!
//! let registry = ImplementationRegistry::linked();
//! let key = ServiceKey::of_trait::<dyn Repository>();
//! assert_eq!(registry.candidates(&key, &[]).count(), 1);
//! ```

use crate::di::{downcast, erase, Construct, Instance, ServiceKey, ServiceProvider};
use crate::error::Result;
use crate::inject::factory::Factory;
use crate::inject::interceptor::AutoInjectInterceptor;
use crate::inject::marker::{Injectable, TypeDescriptor};
use linkme::distributed_slice;
use std::any::TypeId;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// One `interface => concrete` pair.
#[derive(Clone, Copy)]
pub struct Implementation {
    pub interface: fn() -> ServiceKey,
    pub concrete: fn() -> TypeDescriptor,
    /// Module path of the registration; the "assembly" the denylist applies to.
    pub origin: &'static str,
    /// Construction through the host container, when the type implements `Construct`.
    pub construct: Option<fn(&dyn ServiceProvider) -> Result<Instance>>,
    /// Bare `Default` construction followed by the engine's injection pass.
    pub instantiate: fn(&Factory) -> Result<Instance>,
    /// `Default` construction followed by `ProcessIfMarked`, erased as the concrete type.
    pub create_concrete: fn(&Factory) -> Result<Instance>,
    /// Cast an erased concrete instance to the interface.
    pub upcast: fn(&Instance) -> Option<Instance>,
}

impl Implementation {
    pub fn interface_key(&self) -> ServiceKey {
        (self.interface)()
    }

    pub fn concrete_descriptor(&self) -> TypeDescriptor {
        (self.concrete)()
    }
}

impl fmt::Debug for Implementation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Implementation")
            .field("interface", &self.interface_key().type_name())
            .field("concrete", &self.concrete_descriptor().info.name)
            .field("origin", &self.origin)
            .field("construct", &self.construct.is_some())
            .finish()
    }
}

#[distributed_slice]
pub static IMPLEMENTATIONS: [Implementation] = [..];

/// Whether `origin` belongs to one of the `excluded` crate prefixes.
pub fn is_excluded(origin: &str, excluded: &[String]) -> bool {
    excluded.iter().any(|prefix| {
        origin == prefix
            || origin
                .strip_prefix(prefix.as_str())
                .is_some_and(|rest| rest.starts_with("::"))
    })
}

/// Ordered table of implementations; the first matching entry wins.
#[derive(Debug, Clone, Default)]
pub struct ImplementationRegistry {
    entries: Vec<Implementation>,
}

impl ImplementationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every entry registered with `register_implementation!` in the final binary,
    /// grouped by origin module, link order within a module.
    pub fn linked() -> Self {
        let mut entries: Vec<Implementation> = IMPLEMENTATIONS.iter().copied().collect();
        entries.sort_by(|a, b| a.origin.cmp(b.origin));
        Self { entries }
    }

    pub fn with(mut self, implementation: Implementation) -> Self {
        self.entries.push(implementation);
        self
    }

    pub fn register(&mut self, implementation: Implementation) -> &mut Self {
        self.entries.push(implementation);
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Implementation> {
        self.entries.iter()
    }

    /// Non-excluded implementations of `interface`, in registry order.
    pub fn candidates<'a>(
        &'a self,
        interface: &ServiceKey,
        excluded: &'a [String],
    ) -> impl Iterator<Item = &'a Implementation> {
        let id = interface.type_id();
        self.entries.iter().filter(move |entry| {
            entry.interface_key().type_id() == id && !is_excluded(entry.origin, excluded)
        })
    }

    /// Distinct interfaces, in order of first registration.
    pub fn interfaces(&self, excluded: &[String]) -> Vec<ServiceKey> {
        let mut seen = HashSet::new();
        self.entries
            .iter()
            .filter(|entry| !is_excluded(entry.origin, excluded))
            .map(Implementation::interface_key)
            .filter(|key| seen.insert(key.type_id()))
            .collect()
    }

    /// Every entry whose concrete type is `concrete`.
    pub fn implementations_of(&self, concrete: TypeId) -> impl Iterator<Item = &Implementation> {
        self.entries
            .iter()
            .filter(move |entry| entry.concrete_descriptor().info.id == concrete)
    }

    /// One entry per distinct concrete type carrying `#[auto_inject]`.
    pub fn auto_inject_classes(&self, excluded: &[String]) -> Vec<&Implementation> {
        let mut seen = HashSet::new();
        self.entries
            .iter()
            .filter(|entry| !is_excluded(entry.origin, excluded))
            .filter(|entry| {
                let descriptor = entry.concrete_descriptor();
                descriptor.auto_inject && seen.insert(descriptor.info.id)
            })
            .collect()
    }
}

#[doc(hidden)]
pub fn construct_as<I, C>(
    provider: &dyn ServiceProvider,
    cast: fn(Arc<C>) -> Arc<I>,
) -> Result<Instance>
where
    I: ?Sized + Send + Sync + 'static,
    C: Construct,
{
    C::construct(provider).map(|concrete| erase(cast(Arc::new(concrete))))
}

#[doc(hidden)]
pub fn instantiate_as<I, C>(factory: &Factory, cast: fn(Arc<C>) -> Arc<I>) -> Result<Instance>
where
    I: ?Sized + Send + Sync + 'static,
    C: Injectable + Default,
{
    factory
        .instantiate_bare::<C>()
        .map(|concrete| erase(cast(concrete)))
}

#[doc(hidden)]
pub fn create_marked<C: Injectable + Default>(factory: &Factory) -> Result<Instance> {
    let mut concrete = C::default();
    AutoInjectInterceptor::new(factory).process_if_marked(Some(&mut concrete))?;
    Ok(erase(Arc::new(concrete)))
}

#[doc(hidden)]
pub fn upcast_as<I, C>(instance: &Instance, cast: fn(Arc<C>) -> Arc<I>) -> Option<Instance>
where
    I: ?Sized + Send + Sync + 'static,
    C: Send + Sync + 'static,
{
    downcast::<C>(instance).map(|concrete| erase(cast(concrete)))
}

/// Build an [`Implementation`] entry for `dyn Trait => Concrete`.
///
/// Append `, construct` when the concrete type implements [`Construct`], so the
/// engine can build it through the host container first.
#[macro_export]
macro_rules! implementation {
    ($interface:ty => $concrete:ty, construct) => {
        $crate::inject::registry::Implementation {
            construct: ::core::option::Option::Some(
                |provider: &dyn $crate::di::ServiceProvider| {
                    $crate::inject::registry::construct_as::<$interface, $concrete>(
                        provider,
                        |concrete: ::std::sync::Arc<$concrete>| -> ::std::sync::Arc<$interface> {
                            concrete
                        },
                    )
                },
            ),
            ..$crate::implementation!($interface => $concrete)
        }
    };
    ($interface:ty => $concrete:ty) => {
        $crate::inject::registry::Implementation {
            interface: $crate::di::ServiceKey::of_trait::<$interface>,
            concrete: <$concrete as $crate::inject::marker::Injectable>::describe,
            origin: ::core::module_path!(),
            construct: ::core::option::Option::None,
            instantiate: |factory: &$crate::inject::factory::Factory| {
                $crate::inject::registry::instantiate_as::<$interface, $concrete>(
                    factory,
                    |concrete: ::std::sync::Arc<$concrete>| -> ::std::sync::Arc<$interface> {
                        concrete
                    },
                )
            },
            create_concrete: $crate::inject::registry::create_marked::<$concrete>,
            upcast: |instance: &$crate::di::Instance| {
                $crate::inject::registry::upcast_as::<$interface, $concrete>(
                    instance,
                    |concrete: ::std::sync::Arc<$concrete>| -> ::std::sync::Arc<$interface> {
                        concrete
                    },
                )
            },
        }
    };
}

/// Register `dyn Trait => Concrete` in the linked implementation registry.
#[macro_export]
macro_rules! register_implementation {
    ($($entry:tt)+) => {
        const _: () = {
            #[$crate::__private::linkme::distributed_slice($crate::inject::registry::IMPLEMENTATIONS)]
            #[linkme(crate = $crate::__private::linkme)]
            static IMPLEMENTATION: $crate::inject::registry::Implementation =
                $crate::implementation!($($entry)+);
        };
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_denylist_matches_whole_crate_segments() {
        let excluded = vec!["std".to_string(), "tokio".to_string()];
        assert!(is_excluded("std", &excluded));
        assert!(is_excluded("tokio::runtime", &excluded));
        assert!(!is_excluded("stdx::io", &excluded));
        assert!(!is_excluded("app::repo", &excluded));
    }
}
