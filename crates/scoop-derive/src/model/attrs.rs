//! Attribute parsing for Model derive macro.
//!
//! Handles parsing of struct-level and field-level `#[orm(...)]` attributes.

use crate::sql_ident::{parse_sql_ident, parse_table_name};
use syn::{DeriveInput, Result};

/// Resolution of an `auto_*_time` / `soft_delete` marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(super) enum TimeMarker {
    /// Not given.
    #[default]
    Absent,
    /// Given without a value: seconds for integer fields.
    Seconds,
    /// Given as `= "milli"`.
    Millis,
}

impl TimeMarker {
    pub fn is_set(self) -> bool {
        self != TimeMarker::Absent
    }
}

/// Parsed field-level `#[orm(...)]` attributes.
#[derive(Debug, Default)]
pub(super) struct FieldAttr {
    pub column: Option<String>,
    pub primary_key: bool,
    pub auto_increment: Option<bool>,
    pub ignore: bool,
    pub auto_create_time: TimeMarker,
    pub auto_update_time: TimeMarker,
    pub soft_delete: TimeMarker,
    pub json: bool,
}

impl FieldAttr {
    fn merge(&mut self, other: FieldAttr) {
        if other.column.is_some() {
            self.column = other.column;
        }
        if other.auto_increment.is_some() {
            self.auto_increment = other.auto_increment;
        }
        self.primary_key |= other.primary_key;
        self.ignore |= other.ignore;
        self.json |= other.json;
        if other.auto_create_time.is_set() {
            self.auto_create_time = other.auto_create_time;
        }
        if other.auto_update_time.is_set() {
            self.auto_update_time = other.auto_update_time;
        }
        if other.soft_delete.is_set() {
            self.soft_delete = other.soft_delete;
        }
    }
}

fn parse_time_marker(input: syn::parse::ParseStream, ident: &syn::Ident) -> Result<TimeMarker> {
    if !input.peek(syn::Token![=]) {
        return Ok(TimeMarker::Seconds);
    }
    let _: syn::Token![=] = input.parse()?;
    let value: syn::LitStr = input.parse()?;
    match value.value().as_str() {
        "milli" | "millis" => Ok(TimeMarker::Millis),
        "sec" | "secs" | "seconds" => Ok(TimeMarker::Seconds),
        other => Err(syn::Error::new(
            value.span(),
            format!("unknown precision {other:?} for `{ident}` (expected \"milli\")"),
        )),
    }
}

impl syn::parse::Parse for FieldAttr {
    fn parse(input: syn::parse::ParseStream) -> Result<Self> {
        let mut attr = FieldAttr::default();

        // Comma-separated flags and key = value pairs.
        while !input.is_empty() {
            let ident: syn::Ident = input.parse()?;
            match ident.to_string().as_str() {
                "id" | "primary_key" => attr.primary_key = true,
                "ignore" | "skip" => attr.ignore = true,
                "json" => attr.json = true,
                "auto_increment" => {
                    attr.auto_increment = Some(if input.peek(syn::Token![=]) {
                        let _: syn::Token![=] = input.parse()?;
                        input.parse::<syn::LitBool>()?.value
                    } else {
                        true
                    });
                }
                "auto_create_time" => attr.auto_create_time = parse_time_marker(input, &ident)?,
                "auto_update_time" => attr.auto_update_time = parse_time_marker(input, &ident)?,
                "soft_delete" => attr.soft_delete = parse_time_marker(input, &ident)?,
                "column" => {
                    let _: syn::Token![=] = input.parse()?;
                    let value: syn::LitStr = input.parse()?;
                    attr.column = Some(parse_sql_ident(&value, "column")?);
                }
                other => {
                    return Err(syn::Error::new(
                        ident.span(),
                        format!("unknown scoop field attribute `{other}`"),
                    ));
                }
            }

            if input.peek(syn::Token![,]) {
                let _: syn::Token![,] = input.parse()?;
            } else {
                break;
            }
        }

        if !input.is_empty() {
            return Err(input.error("expected `,` between scoop field attributes"));
        }
        Ok(attr)
    }
}

/// Collect every `#[orm(...)]` on a field.
pub(super) fn get_field_attr(field: &syn::Field) -> Result<FieldAttr> {
    let mut out = FieldAttr::default();
    for attr in &field.attrs {
        if attr.path().is_ident("orm") {
            out.merge(attr.parse_args::<FieldAttr>()?);
        }
    }
    Ok(out)
}

/// Table name from struct-level `#[orm(table = "...")]`, if present.
pub(super) fn get_table_name(input: &DeriveInput) -> Result<Option<String>> {
    let mut table = None;
    for attr in &input.attrs {
        if !attr.path().is_ident("orm") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("table") {
                let lit: syn::LitStr = meta.value()?.parse()?;
                table = Some(parse_table_name(&lit)?);
                Ok(())
            } else {
                Err(meta.error("unknown scoop struct attribute (expected `table = \"...\"`)"))
            }
        })?;
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    #[test]
    fn parses_flags_and_values() {
        let field: syn::Field = parse_quote! {
            #[orm(column = "mail", auto_update_time = "milli")]
            email_updated: i64
        };
        let attr = get_field_attr(&field).unwrap();
        assert_eq!(attr.column.as_deref(), Some("mail"));
        assert_eq!(attr.auto_update_time, TimeMarker::Millis);
        assert!(!attr.primary_key);
    }

    #[test]
    fn merges_repeated_attributes() {
        let field: syn::Field = parse_quote! {
            #[orm(id)]
            #[orm(auto_increment = false)]
            code: i32
        };
        let attr = get_field_attr(&field).unwrap();
        assert!(attr.primary_key);
        assert_eq!(attr.auto_increment, Some(false));
    }

    #[test]
    fn rejects_unknown_attribute() {
        let field: syn::Field = parse_quote! {
            #[orm(primary)]
            id: i64
        };
        assert!(get_field_attr(&field).is_err());
    }

    #[test]
    fn rejects_invalid_column() {
        let field: syn::Field = parse_quote! {
            #[orm(column = "e-mail")]
            email: String
        };
        assert!(get_field_attr(&field).is_err());
    }

    #[test]
    fn table_attribute() {
        let input: DeriveInput = parse_quote! {
            #[orm(table = "app.people")]
            struct Person { id: i64 }
        };
        assert_eq!(get_table_name(&input).unwrap().as_deref(), Some("app.people"));

        let input: DeriveInput = parse_quote! {
            struct Person { id: i64 }
        };
        assert_eq!(get_table_name(&input).unwrap(), None);
    }
}
