use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{
    parse_macro_input, Attribute, Data, DeriveInput, Field, Fields, GenericArgument, Ident,
    PathArguments, Type,
};

pub fn derive_injectable(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    generate_injectable_impl(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

/// How a member is exposed to the engine.
struct MemberSpec<'a> {
    ident: &'a Ident,
    service: Type,
    injectable: bool,
    property: bool,
    readonly: bool,
}

fn generate_injectable_impl(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let struct_name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let fields: Vec<&Field> = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => fields.named.iter().collect(),
            Fields::Unit => Vec::new(),
            Fields::Unnamed(_) => {
                return Err(syn::Error::new_spanned(
                    struct_name,
                    "#[derive(Injectable)] only supports structs with named fields",
                ))
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                struct_name,
                "#[derive(Injectable)] can only be applied to structs",
            ))
        }
    };

    let auto_inject = has_attr(&input.attrs, "auto_inject");

    let mut members = Vec::new();
    let mut base_field = None;
    for field in &fields {
        let Some(ident) = field.ident.as_ref() else {
            continue;
        };

        if has_attr(&field.attrs, "inject_base") {
            if base_field.replace(ident).is_some() {
                return Err(syn::Error::new_spanned(
                    field,
                    "only one field may carry #[inject_base]",
                ));
            }
            continue;
        }

        let options = injectable_options(&field.attrs)?;
        let service = option_arc_inner(&field.ty);
        match (service, options) {
            (Some(service), Some((property, readonly))) => members.push(MemberSpec {
                ident,
                service,
                injectable: true,
                property,
                readonly,
            }),
            (Some(service), None) => members.push(MemberSpec {
                ident,
                service,
                injectable: false,
                property: false,
                readonly: false,
            }),
            (None, Some(_)) => {
                return Err(syn::Error::new_spanned(
                    &field.ty,
                    "#[injectable] members must be of type Option<Arc<T>>",
                ))
            }
            (None, None) => {}
        }
    }

    // properties are visited before fields
    members.sort_by_key(|member| !member.property);

    let member_exprs = members.iter().map(member_expr);
    let inject_base = base_field.map(|ident| {
        quote! {
            fn inject_base(&mut self) -> ::core::option::Option<&mut ::autoinject::InjectBase> {
                ::core::option::Option::Some(&mut self.#ident)
            }
        }
    });
    let has_base = base_field.is_some();

    Ok(quote! {
        impl #impl_generics ::autoinject::Injectable for #struct_name #ty_generics #where_clause {
            fn describe() -> ::autoinject::TypeDescriptor {
                ::autoinject::TypeDescriptor::of::<Self>(#auto_inject, #has_base)
            }

            fn descriptor(&self) -> ::autoinject::TypeDescriptor {
                <Self as ::autoinject::Injectable>::describe()
            }

            fn members(&mut self) -> ::std::vec::Vec<::autoinject::Member<'_>> {
                ::std::vec![#(#member_exprs),*]
            }

            #inject_base
        }
    })
}

fn member_expr(member: &MemberSpec<'_>) -> TokenStream2 {
    let ident = member.ident;
    let name = ident.to_string();
    let injectable = member.injectable;
    let key = service_key(&member.service);

    if member.property {
        let writable = !member.readonly;
        quote! {
            ::autoinject::Member::property(#name, #key, #injectable, #writable, &mut self.#ident)
        }
    } else {
        quote! {
            ::autoinject::Member::field(#name, #key, #injectable, &mut self.#ident)
        }
    }
}

fn service_key(service: &Type) -> TokenStream2 {
    match service {
        Type::TraitObject(_) => quote!(::autoinject::ServiceKey::of_trait::<#service>()),
        _ => quote!(::autoinject::ServiceKey::of::<#service>()),
    }
}

fn has_attr(attrs: &[Attribute], name: &str) -> bool {
    attrs.iter().any(|attr| attr.path().is_ident(name))
}

/// `Some((property, readonly))` when the field carries `#[injectable]`.
fn injectable_options(attrs: &[Attribute]) -> syn::Result<Option<(bool, bool)>> {
    let Some(attr) = attrs.iter().find(|attr| attr.path().is_ident("injectable")) else {
        return Ok(None);
    };

    let mut property = false;
    let mut readonly = false;
    if matches!(attr.meta, syn::Meta::List(_)) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("property") {
                property = true;
                Ok(())
            } else if meta.path.is_ident("readonly") {
                readonly = true;
                Ok(())
            } else {
                Err(meta.error("expected `property` or `readonly`"))
            }
        })?;
    }

    if readonly && !property {
        return Err(syn::Error::new_spanned(
            attr,
            "`readonly` only applies to properties: use #[injectable(property, readonly)]",
        ));
    }
    Ok(Some((property, readonly)))
}

/// Extract `T` from `Option<Arc<T>>`
fn option_arc_inner(ty: &Type) -> Option<Type> {
    let option = single_generic_arg(ty, "Option")?;
    single_generic_arg(option, "Arc").cloned()
}

fn single_generic_arg<'a>(ty: &'a Type, wrapper: &str) -> Option<&'a Type> {
    let Type::Path(type_path) = ty else {
        return None;
    };
    let segment = type_path.path.segments.last()?;
    if segment.ident != wrapper {
        return None;
    }
    let PathArguments::AngleBracketed(args) = &segment.arguments else {
        return None;
    };
    match args.args.first()? {
        GenericArgument::Type(inner) => Some(inner),
        _ => None,
    }
}
