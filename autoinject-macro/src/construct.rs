use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{parse_macro_input, Data, DeriveInput, Fields, Type};

pub fn derive_construct(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    generate_construct_impl(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

fn generate_construct_impl(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let struct_name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let body = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => {
                let field_injections = fields.named.iter().map(|field| {
                    let field_name = &field.ident;
                    let value = resolve_expr(&field.ty);
                    quote!(#field_name: #value)
                });
                quote!(Self { #(#field_injections),* })
            }
            Fields::Unit => quote!(Self),
            Fields::Unnamed(_) => {
                return Err(syn::Error::new_spanned(
                    struct_name,
                    "#[derive(Construct)] only supports structs with named fields",
                ))
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                struct_name,
                "#[derive(Construct)] can only be applied to structs",
            ))
        }
    };

    Ok(quote! {
        impl #impl_generics ::autoinject::Construct for #struct_name #ty_generics #where_clause {
            fn construct(
                provider: &dyn ::autoinject::ServiceProvider
            ) -> ::autoinject::Result<Self> {
                ::core::result::Result::Ok(#body)
            }
        }
    })
}

/// `Arc<T>` fields are required dependencies; anything else is `Default`.
fn resolve_expr(ty: &Type) -> TokenStream2 {
    match arc_inner(ty) {
        Some(inner) => quote!(provider.resolve_required::<#inner>()?),
        None => quote!(::core::default::Default::default()),
    }
}

/// Extract the inner type from Arc<T> or Arc<dyn Trait>
fn arc_inner(ty: &Type) -> Option<&Type> {
    let Type::Path(type_path) = ty else {
        return None;
    };
    let segment = type_path.path.segments.last()?;
    if segment.ident != "Arc" {
        return None;
    }
    let syn::PathArguments::AngleBracketed(args) = &segment.arguments else {
        return None;
    };
    match args.args.first()? {
        syn::GenericArgument::Type(inner) => Some(inner),
        _ => None,
    }
}
