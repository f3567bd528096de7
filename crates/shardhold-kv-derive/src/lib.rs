//! `#[derive(Storer)]` — generates a [`shardhold_kv::meta::Storer`] impl from
//! field attributes, the idiomatic-Rust replacement for the source system's
//! runtime struct-tag reflection.
//!
//! ```ignore
//! #[derive(Storer)]
//! struct Widget {
//!     #[key]
//!     id: u64,
//!     #[index]
//!     category: String,
//!     #[index(unique)]
//!     sku: String,
//!     #[index(name = "CustomName")]
//!     tag: String,
//! }
//! ```
//!
//! Each field's logical query name is its identifier converted to
//! `UpperCamelCase` (`category` → `Category`), satisfying the rule that
//! query field names must begin with an uppercase letter. At most one
//! `#[key]` field is allowed; nested/dotted index paths are rejected at
//! macro-expansion time, matching the fatal-fault-at-resolve-time contract.

use proc_macro::TokenStream;
use quote::quote;
use syn::{Data, DeriveInput, Fields, parse_macro_input};

#[proc_macro_derive(Storer, attributes(key, index, unique))]
pub fn derive_storer(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

struct FieldSpec {
    ident: syn::Ident,
    logical_name: String,
    is_key: bool,
    index_name: Option<String>,
    unique: bool,
}

fn expand(input: &DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let struct_name = &input.ident;
    let type_name = struct_name.to_string();

    let Data::Struct(data) = &input.data else {
        return Err(syn::Error::new_spanned(
            input,
            "Storer can only be derived for structs (unnamed type or non-struct target rejected)",
        ));
    };
    let Fields::Named(fields) = &data.fields else {
        return Err(syn::Error::new_spanned(
            input,
            "Storer requires named fields",
        ));
    };

    let mut specs = Vec::new();
    for field in &fields.named {
        let ident = field.ident.clone().expect("named field has an ident");
        let logical_name = to_upper_camel(&ident.to_string());
        let mut is_key = false;
        let mut index_name = None;
        let mut unique = false;

        for attr in &field.attrs {
            if attr.path().is_ident("key") {
                is_key = true;
            } else if attr.path().is_ident("unique") {
                unique = true;
                if index_name.is_none() {
                    index_name = Some(logical_name.clone());
                }
            } else if attr.path().is_ident("index") {
                if let syn::Meta::List(list) = &attr.meta {
                    list.parse_nested_meta(|meta| {
                        if meta.path.is_ident("name") {
                            let value: syn::LitStr = meta.value()?.parse()?;
                            let name = value.value();
                            if name.contains('.') {
                                return Err(meta.error(
                                    "nested/dotted index paths are not supported",
                                ));
                            }
                            index_name = Some(name);
                        } else if meta.path.is_ident("unique") {
                            unique = true;
                        }
                        Ok(())
                    })?;
                }
                if index_name.is_none() {
                    index_name = Some(logical_name.clone());
                }
            }
        }

        specs.push(FieldSpec {
            ident,
            logical_name,
            is_key,
            index_name,
            unique,
        });
    }

    let key_count = specs.iter().filter(|f| f.is_key).count();
    if key_count > 1 {
        return Err(syn::Error::new_spanned(
            input,
            "at most one field may be marked #[key]",
        ));
    }

    let key_field_name = specs
        .iter()
        .find(|f| f.is_key)
        .map(|f| f.logical_name.clone());
    let key_field_expr = match &key_field_name {
        Some(name) => quote! { ::core::option::Option::Some(#name) },
        None => quote! { ::core::option::Option::None },
    };

    let index_descriptors = specs.iter().filter(|f| f.index_name.is_some()).map(|f| {
        let name = f.index_name.clone().unwrap();
        let field = f.logical_name.clone();
        let unique = f.unique;
        quote! {
            shardhold_kv::meta::IndexDescriptor {
                name: #name,
                field: #field,
                unique: #unique,
            }
        }
    });

    let field_value_arms = specs.iter().map(|f| {
        let ident = &f.ident;
        let name = &f.logical_name;
        quote! {
            #name => ::core::option::Option::Some(shardhold_kv::meta::FieldValue::from(&self.#ident)),
        }
    });

    let key_value_body = match &specs.iter().find(|f| f.is_key) {
        Some(f) => {
            let name = &f.logical_name;
            quote! { self.field_value(#name) }
        }
        None => quote! { ::core::option::Option::None },
    };

    let set_key_value_body = match specs.iter().find(|f| f.is_key) {
        Some(f) => {
            let ident = &f.ident;
            quote! {
                self.#ident = ::core::convert::TryFrom::try_from(value)
                    .unwrap_or_else(|_| ::core::panic!("key value type mismatch for field {:?}", stringify!(#ident)));
            }
        }
        None => quote! {
            let _ = value;
        },
    };

    let expanded = quote! {
        impl shardhold_kv::meta::Storer for #struct_name {
            fn type_name() -> &'static str {
                #type_name
            }

            fn meta() -> &'static shardhold_kv::meta::TypeMeta {
                static META: ::std::sync::OnceLock<shardhold_kv::meta::TypeMeta> = ::std::sync::OnceLock::new();
                META.get_or_init(|| shardhold_kv::meta::TypeMeta {
                    name: #type_name,
                    key_field: #key_field_expr,
                    indexes: ::std::vec![#(#index_descriptors),*],
                })
            }

            fn field_value(&self, field: &str) -> ::core::option::Option<shardhold_kv::meta::FieldValue> {
                match field {
                    #(#field_value_arms)*
                    _ => ::core::option::Option::None,
                }
            }

            fn key_value(&self) -> ::core::option::Option<shardhold_kv::meta::FieldValue> {
                #key_value_body
            }

            fn set_key_value(&mut self, value: shardhold_kv::meta::FieldValue) {
                #set_key_value_body
            }
        }
    };

    Ok(expanded)
}

/// `category_name` → `CategoryName`; already-capitalized names pass through.
fn to_upper_camel(ident: &str) -> String {
    ident
        .split('_')
        .filter(|segment| !segment.is_empty())
        .map(|segment| {
            let mut chars = segment.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::to_upper_camel;

    #[test]
    fn converts_snake_case_to_upper_camel() {
        assert_eq!(to_upper_camel("id"), "Id");
        assert_eq!(to_upper_camel("category_name"), "CategoryName");
        assert_eq!(to_upper_camel("sku"), "Sku");
    }
}
