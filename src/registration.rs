//! Container registration driven by the implementation registry.

use crate::di::{
    Container, ContainerBuilder, Instance, KeyKind, Lifetime, ServiceDescriptor, ServiceKey,
    ServiceProvider,
};
use crate::error::{InjectError, Result};
use crate::inject::{Factory, Implementation};
use std::sync::Arc;

impl ContainerBuilder {
    /// Register every `#[auto_inject]` type from the factory's registry.
    ///
    /// Each type is registered under its own key with `lifetime`, built by
    /// `Default` and then injected, and under every interface it is registered to
    /// implement, resolving through the concrete key. Keys that already have a
    /// registration are left alone.
    pub fn add_auto_inject_classes(mut self, factory: &Arc<Factory>, lifetime: Lifetime) -> Self {
        let excluded = &factory.options().excluded_prefixes;
        for implementation in factory.registry().auto_inject_classes(excluded) {
            let info = implementation.concrete_descriptor().info;
            let concrete_key = ServiceKey::new(info, KeyKind::Concrete);
            if !self.container.contains_key(&concrete_key) {
                let factory = factory.clone();
                let create = implementation.create_concrete;
                self.container.add_descriptor(ServiceDescriptor::new(
                    concrete_key,
                    lifetime,
                    move |provider| {
                        ensure_configured(&factory, provider);
                        create(&factory)
                    },
                ));
            }

            for entry in factory.registry().implementations_of(info.id) {
                if is_excluded(entry, excluded) {
                    continue;
                }
                let interface_key = entry.interface_key();
                if self.container.contains_key(&interface_key) {
                    continue;
                }
                let upcast = entry.upcast;
                self.container.add_descriptor(ServiceDescriptor::new(
                    interface_key,
                    lifetime,
                    move |provider| forward(provider, &concrete_key, &interface_key, upcast),
                ));
            }
        }
        self
    }

    /// Register the first implementation of every interface under `module_prefix`
    /// as a scoped service.
    ///
    /// Interfaces whose first implementation is `#[auto_inject]` are skipped; they
    /// belong to [`ContainerBuilder::add_auto_inject_classes`].
    pub fn add_scoped_injection(mut self, factory: &Arc<Factory>, module_prefix: &str) -> Self {
        let excluded = &factory.options().excluded_prefixes;
        for interface_key in factory.registry().interfaces(excluded) {
            if !interface_key.module_path().starts_with(module_prefix) {
                continue;
            }
            let Some(implementation) = factory
                .registry()
                .candidates(&interface_key, excluded)
                .next()
                .copied()
            else {
                continue;
            };
            if implementation.concrete_descriptor().auto_inject {
                continue;
            }
            let factory = factory.clone();
            self.container.add_descriptor(ServiceDescriptor::new(
                interface_key,
                Lifetime::Scoped,
                move |provider| {
                    ensure_configured(&factory, provider);
                    match implementation.construct {
                        Some(construct) => construct(provider),
                        None => (implementation.instantiate)(&factory),
                    }
                },
            ));
        }
        self
    }

    /// Build the container and make it the factory's provider.
    pub fn build_and_configure(self, factory: &Factory) -> Container {
        let container = self.build();
        factory.configure(Some(container.clone().into_provider()));
        container
    }
}

fn is_excluded(implementation: &Implementation, excluded: &[String]) -> bool {
    crate::inject::registry::is_excluded(implementation.origin, excluded)
}

/// Configure the factory from the resolving provider on first use.
fn ensure_configured(factory: &Factory, provider: &dyn ServiceProvider) {
    if !factory.is_configured() {
        factory.configure(Some(provider.root()));
    }
}

fn forward(
    provider: &dyn ServiceProvider,
    concrete_key: &ServiceKey,
    interface_key: &ServiceKey,
    upcast: fn(&Instance) -> Option<Instance>,
) -> Result<Instance> {
    let concrete = provider
        .get_service(concrete_key)?
        .ok_or_else(|| InjectError::DependencyNotFound {
            type_name: concrete_key.type_name().to_string(),
        })?;
    upcast(&concrete).ok_or_else(|| InjectError::DowncastFailed {
        type_name: interface_key.type_name().to_string(),
    })
}
