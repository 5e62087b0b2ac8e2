//! # autoinject
//!
//! Member injection on top of a host service container.
//!
//! Types opt in with `#[derive(Injectable)]` and mark members with
//! `#[injectable]`. The [`Factory`] fills those members from a configured
//! [`ServiceProvider`], falling back to a per-request scope for scoped services and
//! to auto-discovered implementations for trait members nobody registered.
//!
//! ## Quick Start
//!
//! ```rust
//! use autoinject::{register_implementation, ContainerBuilder, Factory, Injectable};
//! use std::sync::Arc;
//!
//! pub trait Clock: Send + Sync {
//!     fn now(&self) -> u64;
//! }
//!
//! #[derive(Default, Injectable)]
//! pub struct FixedClock;
//!
//! impl Clock for FixedClock {
//!     fn now(&self) -> u64 {
//!         42
//!     }
//! }
//!
//! // discovered when nothing in the container provides `dyn Clock`
//! register_implementation!(dyn Clock => FixedClock);
//!
//! #[derive(Default, Injectable)]
//! #[auto_inject]
//! pub struct Scheduler {
//!     #[injectable]
//!     clock: Option<Arc<dyn Clock>>,
//! }
//!
//! let factory = Factory::default();
//! ContainerBuilder::new().add_logging().build_and_configure(&factory);
//!
//! let mut scheduler = Scheduler::default();
//! factory.inject_dependencies(&mut scheduler).unwrap();
//! assert_eq!(scheduler.clock.unwrap().now(), 42);
//! ```

extern crate self as autoinject;

pub mod config;
pub mod di;
pub mod error;
pub mod inject;
pub mod lifecycle;
pub mod logging;
pub mod middleware;
mod registration;

// Re-export core types
pub use config::{AmbiguityPolicy, ConfigService, FactoryOptions};
pub use di::{
    Construct, Container, ContainerBuilder, ContainerScope, Dispose, HasFactory, Inject,
    Instance, Lifetime, ServiceDescriptor, ServiceKey, ServiceProvider, ServiceScope, TypeInfo,
};
pub use error::{InjectError, Result};
pub use inject::{
    AutoInjectInterceptor, Factory, FactoryStats, Implementation, ImplementationRegistry,
    InjectBase, Injectable, Member, MemberKind, RequestContext, RequestId, TypeDescriptor,
};
pub use logging::{Logger, LoggerFactory, TypedLogger};
pub use middleware::RequestScopeLayer;

// Re-export macros
pub use autoinject_macro::{Construct, Injectable};

// Re-export commonly used types from dependencies
pub use async_trait::async_trait;
pub use axum;

#[doc(hidden)]
pub mod __private {
    pub use linkme;
}

/// Prelude module for convenient imports
///
/// ```
/// use autoinject::prelude::*;
/// ```
pub mod prelude {
    pub use crate::di::{
        Construct, Container, ContainerBuilder, Dispose, HasFactory, Inject, Lifetime,
        ServiceProvider,
    };
    pub use crate::error::{InjectError, Result};
    pub use crate::inject::{AutoInjectInterceptor, Factory, InjectBase, Injectable};
    pub use crate::lifecycle::{OnApplicationShutdown, ScopeSweeper, shutdown_signal};
    pub use crate::logging::{Logger, TypedLogger};
    pub use crate::middleware::RequestScopeLayer;
    pub use crate::{implementation, register_implementation};
    pub use async_trait::async_trait;
    pub use std::sync::Arc;
}
