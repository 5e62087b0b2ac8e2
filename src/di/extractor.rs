use crate::inject::Factory;
use axum::{
    extract::FromRequestParts,
    http::{StatusCode as HttpStatusCode, request::Parts},
};
use std::sync::Arc;

/// Axum extractor for engine-resolved services
///
/// Resolves `T` through the injection engine's full chain, so scoped services come
/// from the scope of the request being served and unregistered traits fall back to
/// auto-discovery.
///
/// # Example
/// ```
/// use autoinject::{Factory, HasFactory, Inject};
/// use axum::{Router, routing::get};
/// use std::sync::Arc;
///
/// pub trait Greeter: Send + Sync {
///     fn greet(&self) -> String;
/// }
///
/// #[derive(Clone)]
/// struct AppState {
///     factory: Arc<Factory>,
/// }
///
/// impl HasFactory for AppState {
///     fn factory(&self) -> &Factory {
///         &self.factory
///     }
/// }
///
/// async fn hello(Inject(greeter): Inject<dyn Greeter>) -> String {
///     greeter.greet()
/// }
///
/// let state = AppState { factory: Arc::new(Factory::default()) };
/// let app: Router = Router::new().route("/", get(hello)).with_state(state);
/// ```
pub struct Inject<T: ?Sized>(pub Arc<T>);

/// Trait that AppState must implement to provide the injection engine
pub trait HasFactory {
    fn factory(&self) -> &Factory;
}

impl<S, T> FromRequestParts<S> for Inject<T>
where
    S: Send + Sync + HasFactory,
    T: ?Sized + 'static + Send + Sync,
{
    type Rejection = (HttpStatusCode, String);

    async fn from_request_parts(_parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match state.factory().resolve::<T>() {
            Ok(Some(service)) => Ok(Inject(service)),
            Ok(None) => Err((
                HttpStatusCode::INTERNAL_SERVER_ERROR,
                format!(
                    "Dependency injection failed: {} is not registered",
                    std::any::type_name::<T>()
                ),
            )),
            Err(e) => Err((
                HttpStatusCode::INTERNAL_SERVER_ERROR,
                format!("Dependency injection failed: {}", e),
            )),
        }
    }
}

/// Deref implementation for convenient access to the inner service
impl<T: ?Sized> std::ops::Deref for Inject<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<T: ?Sized> Clone for Inject<T> {
    fn clone(&self) -> Self {
        Inject(Arc::clone(&self.0))
    }
}
