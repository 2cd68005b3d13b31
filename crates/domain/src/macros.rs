//! Macro for implementing Display and FromStr for small domain enums
//!
//! # Example
//!
//! ```rust
//! use amfe_domain::impl_domain_status_conversions;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! pub enum Direction {
//!     Asc,
//!     Desc,
//! }
//!
//! impl_domain_status_conversions!(Direction {
//!     Asc => "asc",
//!     Desc => "desc",
//! });
//!
//! assert_eq!(Direction::Asc.to_string(), "asc");
//! assert_eq!("DESC".parse::<Direction>().unwrap(), Direction::Desc);
//! ```

/// Implements Display and FromStr for enums with fixed string forms
///
/// Parsing is case-insensitive; display uses the given representation.
#[macro_export]
macro_rules! impl_domain_status_conversions {
    ($enum_name:ident { $($variant:ident => $str:literal),+ $(,)? }) => {
        impl std::fmt::Display for $enum_name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(Self::$variant => write!(f, $str),)+
                }
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
