//! Derive macro for autowirer
//!
//! `#[derive(Autowire)]` generates the single constructor a type is wired
//! through, read off the struct definition:
//!
//! - every `Arc<X>` field is a dependency on `X`, in field order
//!   (`X` may be a `dyn Trait`)
//! - `#[autowire(default)]` fields are filled with `Default::default()`
//! - struct-level `#[autowire(initializable)]`, `#[autowire(cleanable)]` and
//!   `#[autowire(exposes(dyn A, dyn B))]` expose the matching views
//!
//! # Example
//!
//! ```rust,ignore
//! use autowirer::{AutoWirer, Autowire, Cleanable, BoxError};
//! use std::sync::Arc;
//!
//! #[derive(Autowire)]
//! struct Config;
//!
//! #[derive(Autowire)]
//! #[autowire(cleanable)]
//! struct Database {
//!     config: Arc<Config>,
//!     #[autowire(default)]
//!     queries: std::sync::atomic::AtomicU64,
//! }
//!
//! impl Cleanable for Database {
//!     fn cleanup(&self) -> Result<(), BoxError> { Ok(()) }
//! }
//!
//! let wirer = AutoWirer::new();
//! wirer.add_singleton::<Database>()?.add_singleton::<Config>()?.wire();
//! ```

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::parse::Parse;
use syn::punctuated::Punctuated;
use syn::{Attribute, Data, DeriveInput, Fields, Token, Type, parse_macro_input};

/// Generate `impl autowirer::Autowire` with a single constructor.
///
/// # Attributes
///
/// - `#[autowire(default)]` on a field - not injected, uses `Default::default()`
/// - `#[autowire(initializable)]` on the struct - run `Initializable::initialize` after wiring
/// - `#[autowire(cleanable)]` on the struct - run `Cleanable::cleanup` on teardown
/// - `#[autowire(exposes(dyn A, ...))]` on the struct - resolvable as each listed interface
///
/// Every other field must have type `Arc<T>`.
#[proc_macro_derive(Autowire, attributes(autowire))]
pub fn derive_autowire(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

fn expand(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let options = StructOptions::parse(&input.attrs)?;
    let (body, dependencies) = constructor_body(input)?;

    let initializable = options
        .initializable
        .then(|| quote! { .initializable() });
    let cleanable = options.cleanable.then(|| quote! { .cleanable() });
    let exposes = options.exposes.iter().map(|interface| {
        quote! {
            .exposes::<#interface>(
                |__value: ::std::sync::Arc<Self>| -> ::std::sync::Arc<#interface> { __value }
            )
        }
    });

    Ok(quote! {
        impl #impl_generics ::autowirer::Autowire for #name #ty_generics #where_clause {
            fn constructors() -> ::std::vec::Vec<::autowirer::Constructor<Self>> {
                ::std::vec![
                    ::autowirer::Constructor::new(|__args: &::autowirer::Arguments| {
                        ::std::result::Result::Ok(#body)
                    })
                    #(.depends_on::<#dependencies>())*
                    #initializable
                    #cleanable
                    #(#exposes)*
                ]
            }
        }
    })
}

/// The struct expression built from `__args`, and the dependency types in
/// argument order.
fn constructor_body(input: &DeriveInput) -> syn::Result<(TokenStream2, Vec<&Type>)> {
    let Data::Struct(data) = &input.data else {
        return Err(syn::Error::new_spanned(
            input,
            "Autowire can only be derived for structs",
        ));
    };

    let fields = match &data.fields {
        Fields::Unit => return Ok((quote! { Self }, Vec::new())),
        Fields::Named(fields) => &fields.named,
        Fields::Unnamed(_) => {
            return Err(syn::Error::new_spanned(
                input,
                "Autowire can only be derived for structs with named fields",
            ));
        }
    };

    let mut dependencies = Vec::new();
    let mut inits = Vec::with_capacity(fields.len());

    for field in fields {
        let Some(field_name) = field.ident.as_ref() else {
            continue;
        };

        if is_default_field(&field.attrs)? {
            inits.push(quote! { #field_name: ::std::default::Default::default() });
            continue;
        }

        let inner = arc_inner_type(&field.ty).ok_or_else(|| {
            syn::Error::new_spanned(
                &field.ty,
                "Autowire fields must have type Arc<T> or be marked #[autowire(default)]",
            )
        })?;

        let index = dependencies.len();
        inits.push(quote! { #field_name: __args.get::<#inner>(#index)? });
        dependencies.push(inner);
    }

    Ok((quote! { Self { #(#inits),* } }, dependencies))
}

#[derive(Default)]
struct StructOptions {
    initializable: bool,
    cleanable: bool,
    exposes: Vec<Type>,
}

impl StructOptions {
    fn parse(attrs: &[Attribute]) -> syn::Result<Self> {
        let mut options = Self::default();

        for attr in attrs.iter().filter(|a| a.path().is_ident("autowire")) {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("initializable") {
                    options.initializable = true;
                    Ok(())
                } else if meta.path.is_ident("cleanable") {
                    options.cleanable = true;
                    Ok(())
                } else if meta.path.is_ident("exposes") {
                    let content;
                    syn::parenthesized!(content in meta.input);
                    let types: Punctuated<Type, Token![,]> =
                        content.parse_terminated(Type::parse, Token![,])?;
                    options.exposes.extend(types);
                    Ok(())
                } else {
                    Err(meta.error("expected `initializable`, `cleanable` or `exposes(..)`"))
                }
            })?;
        }

        Ok(options)
    }
}

fn is_default_field(attrs: &[Attribute]) -> syn::Result<bool> {
    let mut default = false;
    for attr in attrs.iter().filter(|a| a.path().is_ident("autowire")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("default") {
                default = true;
                Ok(())
            } else {
                Err(meta.error("expected `default`"))
            }
        })?;
    }
    Ok(default)
}

/// Extract T from Arc<T>
fn arc_inner_type(ty: &Type) -> Option<&Type> {
    let Type::Path(type_path) = ty else {
        return None;
    };
    let segment = type_path.path.segments.last()?;
    if segment.ident != "Arc" {
        return None;
    }
    match &segment.arguments {
        syn::PathArguments::AngleBracketed(args) => match args.args.first()? {
            syn::GenericArgument::Type(inner) => Some(inner),
            _ => None,
        },
        _ => None,
    }
}
