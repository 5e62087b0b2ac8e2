//! Shutdown handling for the injection engine.
//!
//! Request scopes normally end with their request. Anything still open when the
//! process stops (background jobs, requests cut off mid-flight) is released by a
//! [`ScopeSweeper`] once a shutdown signal arrives.
//!
//! ```text
//! 1. Container built, Factory configured
//!    ↓
//! [Serving requests: one scope per request]
//!    ↓
//! 2. Shutdown Signal (SIGTERM/SIGINT)
//!    ↓
//! 3. OnApplicationShutdown hooks        ← registration order
//!    ↓
//! 4. Factory::dispose_all_scopes()
//! ```

mod shutdown;

pub use shutdown::{shutdown_signal, ScopeSweeper};

use crate::error::Result;
use crate::inject::Factory;
use async_trait::async_trait;

/// Called when the application receives a shutdown signal
///
/// # Example
///
/// ```rust
/// use autoinject::lifecycle::OnApplicationShutdown;
/// use autoinject::{async_trait, Result};
///
/// struct MetricsFlusher;
///
/// #[async_trait]
/// impl OnApplicationShutdown for MetricsFlusher {
///     async fn on_application_shutdown(&self) -> Result<()> {
///         tracing::info!("flushing metrics");
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait OnApplicationShutdown: Send + Sync {
    async fn on_application_shutdown(&self) -> Result<()>;
}

#[async_trait]
impl OnApplicationShutdown for Factory {
    async fn on_application_shutdown(&self) -> Result<()> {
        self.dispose_all_scopes();
        Ok(())
    }
}
