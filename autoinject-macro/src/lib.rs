use proc_macro::TokenStream;

mod construct;
mod injectable;

/// Derive macro describing a struct's injectable members
///
/// Every field of type `Option<Arc<T>>` or `Option<Arc<dyn Trait>>` is a member
/// candidate; the engine fills the ones marked `#[injectable]`.
///
/// - `#[auto_inject]` on the struct: container-created instances are injected
/// - `#[injectable]`: inject this field
/// - `#[injectable(property)]` / `#[injectable(property, readonly)]`: a property,
///   processed before fields; read-only properties are never written
/// - `#[inject_base]` on an `InjectBase` field: the construction hook's state
///
/// # Example
/// ```ignore
/// use autoinject::Injectable;
///
/// #[derive(Default, Injectable)]
/// #[auto_inject]
/// pub struct UserService {
///     #[injectable]
///     repository: Option<Arc<dyn UserRepository>>,
/// }
/// ```
#[proc_macro_derive(Injectable, attributes(auto_inject, injectable, inject_base))]
pub fn derive_injectable(input: TokenStream) -> TokenStream {
    injectable::derive_injectable(input)
}

/// Derive macro for constructor injection from a host provider
///
/// Every `Arc<T>` / `Arc<dyn Trait>` field is resolved as a required dependency;
/// other fields use `Default`.
///
/// # Example
/// ```ignore
/// use autoinject::Construct;
///
/// #[derive(Construct)]
/// pub struct UserRepository {
///     database: Arc<Database>,
/// }
/// ```
#[proc_macro_derive(Construct)]
pub fn derive_construct(input: TokenStream) -> TokenStream {
    construct::derive_construct(input)
}
