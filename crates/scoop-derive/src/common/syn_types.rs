//! Type helper utilities for syn type analysis.

/// Extract the inner type T from Option<T>, or return None if not an Option type.
///
/// Recognizes `Option<T>`, `std::option::Option<T>`, and `core::option::Option<T>`.
pub fn option_inner(ty: &syn::Type) -> Option<&syn::Type> {
    single_generic(ty, "Option")
}

/// Extract the inner type T from `Json<T>` (scoop's JSON wrapper).
pub fn json_inner(ty: &syn::Type) -> Option<&syn::Type> {
    single_generic(ty, "Json")
}

fn single_generic<'a>(ty: &'a syn::Type, name: &str) -> Option<&'a syn::Type> {
    let syn::Type::Path(type_path) = ty else {
        return None;
    };
    let seg = type_path.path.segments.last()?;
    if seg.ident != name {
        return None;
    }
    let syn::PathArguments::AngleBracketed(args) = &seg.arguments else {
        return None;
    };
    if args.args.len() != 1 {
        return None;
    }
    let syn::GenericArgument::Type(inner) = args.args.first()? else {
        return None;
    };
    Some(inner)
}

fn last_ident(ty: &syn::Type) -> Option<String> {
    let syn::Type::Path(type_path) = ty else {
        return None;
    };
    Some(type_path.path.segments.last()?.ident.to_string())
}

/// Whether the type (or the `T` of `Option<T>`) is a primitive integer.
pub fn is_integer(ty: &syn::Type) -> bool {
    let ty = option_inner(ty).unwrap_or(ty);
    matches!(
        last_ident(ty).as_deref(),
        Some(
            "i8" | "i16" | "i32" | "i64" | "isize" | "u8" | "u16" | "u32" | "u64" | "usize"
        )
    )
}

/// How a timestamp-typed field is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampType {
    /// Integer epoch seconds (or milliseconds).
    Integer,
    /// `DateTime<Utc>`
    DateTimeUtc,
    /// `NaiveDateTime`
    NaiveDateTime,
}

/// Classify a field type usable as an auto-managed timestamp, looking through `Option`.
pub fn detect_timestamp_type(ty: &syn::Type) -> Option<TimestampType> {
    if is_integer(ty) {
        return Some(TimestampType::Integer);
    }
    let inner = option_inner(ty).unwrap_or(ty);
    let syn::Type::Path(type_path) = inner else {
        return None;
    };
    let seg = type_path.path.segments.last()?;

    match seg.ident.to_string().as_str() {
        "DateTime" => {
            // Only DateTime<Utc>
            let syn::PathArguments::AngleBracketed(args) = &seg.arguments else {
                return None;
            };
            let Some(syn::GenericArgument::Type(tz)) = args.args.first() else {
                return None;
            };
            (last_ident(tz).as_deref() == Some("Utc")).then_some(TimestampType::DateTimeUtc)
        }
        "NaiveDateTime" => Some(TimestampType::NaiveDateTime),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    #[test]
    fn test_option_inner() {
        let ty: syn::Type = parse_quote!(Option<String>);
        assert!(option_inner(&ty).is_some());

        let ty: syn::Type = parse_quote!(std::option::Option<i32>);
        assert!(option_inner(&ty).is_some());

        let ty: syn::Type = parse_quote!(String);
        assert!(option_inner(&ty).is_none());

        let ty: syn::Type = parse_quote!(Vec<String>);
        assert!(option_inner(&ty).is_none());
    }

    #[test]
    fn test_json_inner() {
        let ty: syn::Type = parse_quote!(Json<Vec<String>>);
        assert!(json_inner(&ty).is_some());

        let ty: syn::Type = parse_quote!(scoop::Json<Settings>);
        assert!(json_inner(&ty).is_some());

        let ty: syn::Type = parse_quote!(serde_json::Value);
        assert!(json_inner(&ty).is_none());
    }

    #[test]
    fn test_is_integer() {
        let ty: syn::Type = parse_quote!(i64);
        assert!(is_integer(&ty));

        let ty: syn::Type = parse_quote!(Option<u32>);
        assert!(is_integer(&ty));

        let ty: syn::Type = parse_quote!(String);
        assert!(!is_integer(&ty));

        let ty: syn::Type = parse_quote!(f64);
        assert!(!is_integer(&ty));
    }

    #[test]
    fn test_detect_timestamp_type() {
        let ty: syn::Type = parse_quote!(i64);
        assert_eq!(detect_timestamp_type(&ty), Some(TimestampType::Integer));

        let ty: syn::Type = parse_quote!(Option<chrono::DateTime<chrono::Utc>>);
        assert_eq!(detect_timestamp_type(&ty), Some(TimestampType::DateTimeUtc));

        let ty: syn::Type = parse_quote!(DateTime<Utc>);
        assert_eq!(detect_timestamp_type(&ty), Some(TimestampType::DateTimeUtc));

        let ty: syn::Type = parse_quote!(NaiveDateTime);
        assert_eq!(detect_timestamp_type(&ty), Some(TimestampType::NaiveDateTime));

        let ty: syn::Type = parse_quote!(DateTime<FixedOffset>);
        assert_eq!(detect_timestamp_type(&ty), None);

        let ty: syn::Type = parse_quote!(String);
        assert_eq!(detect_timestamp_type(&ty), None);
    }
}
