//! Newtype wrappers around [`uuid::Uuid`] for entity identifiers.
//!
//! Using distinct types prevents accidentally passing one resource's id
//! where another's is expected. Every id converts into a
//! [`FieldValue::Uuid`](crate::types::FieldValue::Uuid) so it can key
//! storage lookups directly. Crates invoking [`define_id!`] must depend on
//! `serde` and `uuid`.

/// Define a newtype ID wrapper around `Uuid`.
#[macro_export]
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord,
            ::serde::Serialize, ::serde::Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub ::uuid::Uuid);

        impl $name {
            /// Create a new time-ordered identifier.
            pub fn new() -> Self {
                Self(::uuid::Uuid::now_v7())
            }

            /// Create an identifier from an existing UUID.
            pub fn from_uuid(uuid: ::uuid::Uuid) -> Self {
                Self(uuid)
            }

            /// Return the inner UUID value.
            pub fn into_uuid(self) -> ::uuid::Uuid {
                self.0
            }

            /// Return a reference to the inner UUID.
            pub fn as_uuid(&self) -> &::uuid::Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl ::std::str::FromStr for $name {
            type Err = ::uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                ::uuid::Uuid::parse_str(s).map(Self)
            }
        }

        impl From<::uuid::Uuid> for $name {
            fn from(uuid: ::uuid::Uuid) -> Self {
                Self(uuid)
            }
        }

        impl From<$name> for ::uuid::Uuid {
            fn from(id: $name) -> ::uuid::Uuid {
                id.0
            }
        }

        impl From<$name> for $crate::types::FieldValue {
            fn from(id: $name) -> Self {
                $crate::types::FieldValue::Uuid(id.0)
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use crate::types::FieldValue;

    crate::define_id!(
        /// Identifier used only by these tests.
        WidgetId
    );

    #[test]
    fn test_roundtrip_through_str() {
        let id = WidgetId::new();
        let parsed: WidgetId = id.to_string().parse().expect("parse");
        assert_eq!(id, parsed);
        assert_eq!(FieldValue::from(id), FieldValue::Uuid(id.into_uuid()));
    }
}
