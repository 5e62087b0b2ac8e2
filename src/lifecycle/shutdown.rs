//! Graceful Shutdown Handler

use super::OnApplicationShutdown;
use crate::inject::Factory;
use std::future::Future;
use std::sync::Arc;
use tokio::signal;

/// Disposes every open request scope once shutdown begins
///
/// # Example
///
/// ```rust,no_run
/// use autoinject::Factory;
/// use autoinject::lifecycle::ScopeSweeper;
///
/// # async fn run() {
/// let sweeper = ScopeSweeper::new(Factory::global());
/// tokio::spawn(sweeper.run());
/// # }
/// ```
pub struct ScopeSweeper {
    factory: Arc<Factory>,
    hooks: Vec<Arc<dyn OnApplicationShutdown>>,
}

impl ScopeSweeper {
    pub fn new(factory: Arc<Factory>) -> Self {
        Self {
            factory,
            hooks: Vec::new(),
        }
    }

    /// Run `hook` before the scopes are swept.
    pub fn with_hook(mut self, hook: Arc<dyn OnApplicationShutdown>) -> Self {
        self.hooks.push(hook);
        self
    }

    /// Wait for Ctrl+C or SIGTERM, then sweep.
    pub async fn run(self) {
        self.run_until(shutdown_signal()).await;
    }

    /// Wait for `signal`, then sweep.
    pub async fn run_until<F: Future<Output = ()>>(self, signal: F) {
        signal.await;
        tracing::info!("Starting graceful shutdown...");

        for hook in &self.hooks {
            if let Err(e) = hook.on_application_shutdown().await {
                tracing::error!("Error during application shutdown: {}", e);
            }
        }

        let open = self.factory.stats().active_scopes;
        if let Err(e) = self.factory.on_application_shutdown().await {
            tracing::error!("Error while disposing request scopes: {}", e);
        }
        tracing::info!(disposed = open, "Graceful shutdown complete");
    }
}

/// Create a future that completes when a shutdown signal is received
///
/// A signal handler that cannot be installed is logged and never fires.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM signal");
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FactoryOptions;
    use crate::di::ContainerBuilder;
    use crate::error::Result;
    use crate::inject::{ImplementationRegistry, RequestContext};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct Session;

    struct Flag(AtomicBool);

    #[async_trait]
    impl OnApplicationShutdown for Flag {
        async fn on_application_shutdown(&self) -> Result<()> {
            self.0.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_sweeper_disposes_open_scopes_after_signal() {
        let factory = Arc::new(Factory::new(
            ImplementationRegistry::new(),
            FactoryOptions::default(),
        ));
        ContainerBuilder::new()
            .add_scoped(|_| Ok(Session))
            .build_and_configure(&factory);

        for trace_id in ["a", "b"] {
            RequestContext::sync_scope(trace_id, || factory.resolve::<Session>().unwrap());
        }
        assert_eq!(factory.stats().active_scopes, 2);

        let flag = Arc::new(Flag(AtomicBool::new(false)));
        ScopeSweeper::new(factory.clone())
            .with_hook(flag.clone())
            .run_until(async {})
            .await;

        assert!(flag.0.load(Ordering::SeqCst));
        assert_eq!(factory.stats().active_scopes, 0);
    }
}
