use crate::di::provider::ServiceProvider;
use crate::error::Result;

/// Constructor injection from a host provider
///
/// This trait is typically implemented automatically via `#[derive(Construct)]`,
/// which resolves every `Arc<T>` / `Arc<dyn Trait>` field as a required dependency.
/// The auto-discovery path prefers it over `Default` so that a discovered
/// implementation can receive its own dependencies from the container.
///
/// # Example
/// ```
/// use autoinject::{Construct, ContainerBuilder};
/// use std::sync::Arc;
///
/// struct Database;
///
/// #[derive(Construct)]
/// pub struct UserRepository {
///     database: Arc<Database>,
/// }
///
/// let container = ContainerBuilder::new().register(Database).build().into_provider();
/// let repository = UserRepository::construct(container.as_ref()).unwrap();
/// ```
pub trait Construct: Sized + Send + Sync + 'static {
    /// Create an instance by resolving dependencies from the provider
    ///
    /// # Errors
    /// Returns an error if any required dependency is not found in the provider.
    fn construct(provider: &dyn ServiceProvider) -> Result<Self>;
}
