use serde::{Deserialize, Serialize};

macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            /// Wraps a raw identifier.
            pub const fn new(id: u64) -> Self {
                Self(id)
            }

            /// Returns the raw identifier.
            pub const fn get(&self) -> u64 {
                self.0
            }

            /// Returns the identifier as a signed integer for `BIGINT` columns.
            pub fn as_i64(&self) -> i64 {
                self.0 as i64
            }

            /// Builds an identifier from a `BIGINT` column value.
            pub fn from_i64(id: i64) -> Self {
                Self(id as u64)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u64> for $name {
            fn from(id: u64) -> Self {
                Self(id)
            }
        }

        impl From<$name> for u64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl std::str::FromStr for $name {
            type Err = std::num::ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.parse().map(Self)
            }
        }
    };
}

numeric_id!(
    /// Identifier of a book in the inventory.
    BookId
);

numeric_id!(
    /// Identifier of a receipt (loan record) in the ledger.
    ReceiptId
);

numeric_id!(
    /// Identifier of an end user. Users are owned by the placement service.
    UserId
);

numeric_id!(
    /// Identifier of a book category. Categories are not owned by this core.
    CategoryId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_serialize_as_bare_integers() {
        let json = serde_json::to_string(&BookId::new(42)).unwrap();
        assert_eq!(json, "42");

        let id: ReceiptId = serde_json::from_str("7").unwrap();
        assert_eq!(id.get(), 7);
    }

    #[test]
    fn id_parses_from_path_segment() {
        let id: UserId = "19".parse().unwrap();
        assert_eq!(id, UserId::new(19));
        assert!("abc".parse::<UserId>().is_err());
    }

    #[test]
    fn id_i64_conversion_preserves_value() {
        let id = BookId::new(123);
        assert_eq!(BookId::from_i64(id.as_i64()), id);
    }
}
