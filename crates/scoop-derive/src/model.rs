//! Model derive macro implementation
//!
//! ## Module Structure
//!
//! - `attrs`: Struct and field attribute parsing
//!
//! Conventions applied on top of the attributes:
//!
//! - a field named `id` is the primary key, auto-increment when it is an integer
//! - `created_at` / `updated_at` are auto-managed when their type is an integer,
//!   `DateTime<Utc>` or `NaiveDateTime`
//! - `deleted_at` is the soft-delete column when it is an integer
//! - `Option<T>` fields are nullable; `Json<T>` fields are stored as JSON text

mod attrs;

use crate::common::syn_types::{
    TimestampType, detect_timestamp_type, is_integer, json_inner, option_inner,
};
use attrs::{FieldAttr, TimeMarker, get_field_attr, get_table_name};

use proc_macro2::TokenStream;
use quote::quote;
use syn::ext::IdentExt;
use syn::{Data, DeriveInput, Fields, Result};

/// How a field's value crosses the database boundary.
enum Codec {
    Plain,
    /// `#[orm(json)]` on an arbitrary serde type.
    Json,
    /// A `Json<T>` wrapper field.
    JsonWrapper,
}

struct ModelField {
    ident: syn::Ident,
    name: String,
    column: String,
    primary_key: bool,
    auto_increment: bool,
    ignore: bool,
    auto_create_time: bool,
    auto_update_time: bool,
    soft_delete: bool,
    nullable: bool,
    timestamp: TokenStream,
    codec: Codec,
}

/// `scoop::TimestampKind` variant for a managed field.
fn timestamp_kind(
    field: &syn::Field,
    marker: TimeMarker,
    what: &str,
) -> Result<TokenStream> {
    let Some(ty) = detect_timestamp_type(&field.ty) else {
        return Err(syn::Error::new_spanned(
            &field.ty,
            format!("{what} requires an integer, DateTime<Utc> or NaiveDateTime field"),
        ));
    };
    let kind = match (ty, marker) {
        (TimestampType::Integer, TimeMarker::Millis) => quote!(UnixMilli),
        (TimestampType::Integer, _) => quote!(Unix),
        (TimestampType::DateTimeUtc, _) => quote!(Rfc3339),
        (TimestampType::NaiveDateTime, _) => quote!(Naive),
    };
    Ok(quote!(scoop::TimestampKind::#kind))
}

fn resolve_field(field: &syn::Field, attr: FieldAttr, has_explicit_id: bool) -> Result<ModelField> {
    let ident = field
        .ident
        .clone()
        .ok_or_else(|| syn::Error::new_spanned(field, "Model fields must be named"))?;
    let name = ident.unraw().to_string();
    let column = attr.column.clone().unwrap_or_else(|| name.clone());
    let nullable = option_inner(&field.ty).is_some();

    let codec = if json_inner(&field.ty).is_some() {
        Codec::JsonWrapper
    } else if attr.json {
        Codec::Json
    } else {
        Codec::Plain
    };

    let mut out = ModelField {
        ident,
        name: name.clone(),
        column,
        primary_key: false,
        auto_increment: false,
        ignore: attr.ignore,
        auto_create_time: false,
        auto_update_time: false,
        soft_delete: false,
        nullable,
        timestamp: quote!(scoop::TimestampKind::Unix),
        codec,
    };
    if attr.ignore {
        return Ok(out);
    }

    out.primary_key = attr.primary_key || (!has_explicit_id && name == "id");
    if out.primary_key {
        out.auto_increment = attr.auto_increment.unwrap_or_else(|| is_integer(&field.ty));
    } else if attr.auto_increment.is_some() {
        return Err(syn::Error::new_spanned(
            field,
            "auto_increment is only valid on the primary key",
        ));
    }

    let timestamp_ok = detect_timestamp_type(&field.ty).is_some();
    if attr.auto_create_time.is_set() || (name == "created_at" && timestamp_ok) {
        out.auto_create_time = true;
        out.timestamp = timestamp_kind(field, attr.auto_create_time, "auto_create_time")?;
    } else if attr.auto_update_time.is_set() || (name == "updated_at" && timestamp_ok) {
        out.auto_update_time = true;
        out.timestamp = timestamp_kind(field, attr.auto_update_time, "auto_update_time")?;
    } else if attr.soft_delete.is_set() || (name == "deleted_at" && is_integer(&field.ty)) {
        if !is_integer(&field.ty) {
            return Err(syn::Error::new_spanned(
                &field.ty,
                "soft_delete requires an integer field (0 means not deleted)",
            ));
        }
        out.soft_delete = true;
        if attr.soft_delete == TimeMarker::Millis {
            out.timestamp = quote!(scoop::TimestampKind::UnixMilli);
        }
    }
    Ok(out)
}

impl ModelField {
    fn info(&self) -> TokenStream {
        let name = &self.name;
        let column = &self.column;
        let mut info = quote!(scoop::FieldInfo::new(#name, #column));
        if self.ignore {
            return quote!(#info.ignore());
        }
        if self.primary_key {
            let auto = self.auto_increment;
            info = quote!(#info.primary_key(#auto));
        }
        let ts = &self.timestamp;
        if self.auto_create_time {
            info = quote!(#info.auto_create_time(#ts));
        }
        if self.auto_update_time {
            info = quote!(#info.auto_update_time(#ts));
        }
        if self.soft_delete {
            info = quote!(#info.soft_delete(#ts));
        }
        if self.nullable {
            info = quote!(#info.nullable());
        }
        info
    }

    fn value(&self) -> TokenStream {
        let ident = &self.ident;
        if self.ignore {
            return quote!(scoop::Value::Null);
        }
        match self.codec {
            Codec::Plain => quote!(scoop::Encode::encode(&self.#ident)),
            Codec::Json => quote!(scoop::encode_json(&self.#ident)?),
            Codec::JsonWrapper => quote!(scoop::encode_json(&self.#ident.0)?),
        }
    }

    fn decode(&self, index: usize) -> Option<TokenStream> {
        if self.ignore {
            return None;
        }
        let ident = &self.ident;
        let column = &self.column;
        let expr = match self.codec {
            Codec::Plain => quote!(scoop::decode_column(#column, raw)?),
            Codec::Json => quote!(scoop::decode_json_column(#column, raw)?),
            Codec::JsonWrapper => quote!(scoop::Json(scoop::decode_json_column(#column, raw)?)),
        };
        Some(quote!(#index => self.#ident = #expr,))
    }
}

pub fn expand(input: DeriveInput) -> Result<TokenStream> {
    let name = &input.ident;
    let table_name = get_table_name(&input)?;

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    &input,
                    "Model can only be derived for structs with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                &input,
                "Model can only be derived for structs",
            ));
        }
    };

    let mut attrs = Vec::with_capacity(fields.len());
    for field in fields {
        attrs.push(get_field_attr(field)?);
    }
    let explicit_ids = attrs.iter().filter(|a| a.primary_key).count();
    if explicit_ids > 1 {
        return Err(syn::Error::new_spanned(
            &input,
            "Model supports a single primary key field",
        ));
    }

    let mut model_fields = Vec::with_capacity(fields.len());
    for (field, attr) in fields.iter().zip(attrs) {
        model_fields.push(resolve_field(field, attr, explicit_ids == 1)?);
    }
    if model_fields.iter().all(|f| f.ignore) {
        return Err(syn::Error::new_spanned(
            &input,
            "Model needs at least one persisted field",
        ));
    }

    let infos = model_fields.iter().map(ModelField::info);
    let values = model_fields.iter().map(ModelField::value);
    let decodes = model_fields
        .iter()
        .enumerate()
        .filter_map(|(i, f)| f.decode(i));

    let table_fn = table_name.map(|table| {
        quote! {
            fn table_name() -> ::std::option::Option<&'static str> {
                ::std::option::Option::Some(#table)
            }
        }
    });

    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    Ok(quote! {
        impl #impl_generics scoop::Model for #name #ty_generics #where_clause {
            fn fields() -> &'static [scoop::FieldInfo] {
                const FIELDS: &[scoop::FieldInfo] = &[#(#infos),*];
                FIELDS
            }

            #table_fn

            fn values(&self) -> scoop::OrmResult<::std::vec::Vec<scoop::Value>> {
                ::std::result::Result::Ok(::std::vec![#(#values),*])
            }

            fn decode_field(
                &mut self,
                index: usize,
                raw: ::std::option::Option<&[u8]>,
            ) -> scoop::OrmResult<()> {
                match index {
                    #(#decodes)*
                    _ => {}
                }
                ::std::result::Result::Ok(())
            }
        }
    })
}
