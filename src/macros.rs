/// Declares a string newtype for one of the DataONE simple types.
///
/// Identifiers, node references, subjects and format identifiers are all
/// plain strings on the wire, but mixing them up is a classic source of
/// misrouted calls. Each gets its own type with the same surface:
/// `new`, `as_str`, `into_inner`, `Display`, `FromStr`, `From<&str>`,
/// `From<String>` and `AsRef<str>`. On the wire they serialize as the bare
/// string, which is the element text in XML documents.
///
/// # Arguments
///
/// * `$name` - The name of the newtype, optionally preceded by attributes
///   and doc comments.
#[macro_export]
macro_rules! d1_string_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug,
            Clone,
            PartialEq,
            Eq,
            PartialOrd,
            Ord,
            Hash,
            ::serde::Serialize,
            ::serde::Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl ::std::str::FromStr for $name {
            type Err = ::std::convert::Infallible;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(s.to_owned()))
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_owned())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}
