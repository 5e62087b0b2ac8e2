//! The injection engine.
//!
//! [`Factory`] populates `#[injectable]` members of [`Injectable`] instances from a
//! configured host provider. Every member is resolved through a fixed chain: the
//! root provider, then the current request's scope when the root refuses a scoped
//! service, then auto-discovery of a registered implementation for trait members.

pub mod base;
pub mod factory;
pub mod interceptor;
pub mod marker;
pub mod registry;
pub mod request;
pub mod strategy;

pub use base::InjectBase;
pub use factory::{Factory, FactoryStats};
pub use interceptor::AutoInjectInterceptor;
pub use marker::{Injectable, Member, MemberKind, Slot, TypeDescriptor};
pub use registry::{Implementation, ImplementationRegistry, IMPLEMENTATIONS};
pub use request::{RequestContext, RequestId, RequestIdSource};
pub use strategy::{Attempt, Strategy, RESOLUTION_CHAIN};
