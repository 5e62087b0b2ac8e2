//! Host container: registrations, lifetimes, scopes and the provider seam the
//! injection engine resolves through.

mod builder;
mod construct;
mod container;
mod extractor;
mod key;
mod provider;
mod scope;

pub use builder::ContainerBuilder;
pub use construct::Construct;
pub use container::{Container, Dispose, DisposeFn, FactoryFn, Lifetime, ServiceDescriptor};
pub use extractor::{HasFactory, Inject};
pub use key::{downcast, erase, Instance, KeyKind, ServiceKey, TypeInfo};
pub use provider::{ServiceProvider, ServiceScope};
pub use scope::ContainerScope;
