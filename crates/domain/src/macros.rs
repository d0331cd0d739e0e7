//! Macro for implementing Display and FromStr for wire-named enums
//!
//! Several domain enums have a canonical string form (HTTP method names,
//! error kinds, dispatch states). This macro generates both directions from a
//! single variant table so the two can never drift apart.
//!
//! # Example
//!
//! ```rust
//! use mobilerest_domain::impl_wire_name_conversions;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! pub enum Verb {
//!     Get,
//!     Post,
//! }
//!
//! impl_wire_name_conversions!(Verb {
//!     Get => "GET",
//!     Post => "POST",
//! });
//!
//! assert_eq!(Verb::Get.to_string(), "GET");
//! assert_eq!("post".parse::<Verb>().unwrap(), Verb::Post);
//! ```

/// Implements Display and FromStr traits for enums with a canonical name
///
/// This macro generates:
/// - Display trait: writes the variant's canonical name verbatim
/// - FromStr trait: parses names case-insensitively
///
/// # Arguments
///
/// * `$enum_name` - The name of the enum type
/// * `$variant => $str` - Mapping of enum variants to their canonical names
#[macro_export]
macro_rules! impl_wire_name_conversions {
    ($enum_name:ident { $($variant:ident => $str:expr),+ $(,)? }) => {
        impl $enum_name {
            /// Canonical string form of this value.
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $str,)+
                }
            }
        }

        impl std::fmt::Display for $enum_name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $enum_name {
            type Err = String;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                $(
                    if s.eq_ignore_ascii_case($str) {
                        return Ok(Self::$variant);
                    }
                )+
                Err(format!("Invalid {}: {}", stringify!($enum_name), s))
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum TestVerb {
        Get,
        Patch,
        Delete,
    }

    impl_wire_name_conversions!(TestVerb {
        Get => "GET",
        Patch => "PATCH",
        Delete => "DELETE",
    });

    #[test]
    fn test_display_uses_canonical_name() {
        assert_eq!(TestVerb::Get.to_string(), "GET");
        assert_eq!(TestVerb::Patch.to_string(), "PATCH");
        assert_eq!(TestVerb::Delete.as_str(), "DELETE");
    }

    #[test]
    fn test_fromstr_is_case_insensitive() {
        assert_eq!(TestVerb::from_str("get").unwrap(), TestVerb::Get);
        assert_eq!(TestVerb::from_str("PATCH").unwrap(), TestVerb::Patch);
        assert_eq!(TestVerb::from_str("DeLeTe").unwrap(), TestVerb::Delete);
    }

    #[test]
    fn test_fromstr_invalid() {
        let result = TestVerb::from_str("TRACE");
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("Invalid TestVerb: TRACE"));
    }

    #[test]
    fn test_fromstr_empty() {
        assert!(TestVerb::from_str("").is_err());
    }
}
