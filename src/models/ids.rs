//! Newtype wrappers for entity identifiers and version tokens.
//!
//! These prevent accidentally mixing up IDs of different entity types
//! at compile time.

use serde::{Deserialize, Serialize};

/// Macro to define a newtype ID wrapping a `String` inner type.
macro_rules! define_string_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier from the given string.
            #[inline]
            #[must_use]
            pub const fn new(value: String) -> Self {
                Self(value)
            }

            /// Returns a reference to the inner string.
            #[inline]
            #[must_use]
            pub fn as_inner(&self) -> &str {
                &self.0
            }

            /// Consumes the wrapper and returns the inner string.
            #[inline]
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl core::fmt::Display for $name {
            #[inline]
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<String> for $name {
            #[inline]
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl From<&str> for $name {
            #[inline]
            fn from(value: &str) -> Self {
                Self(value.to_owned())
            }
        }
    };
}

define_string_id! {
    /// Unique identifier for a user.
    UserId
}

define_string_id! {
    /// Unique identifier for an account.
    AccountId
}

define_string_id! {
    /// Unique identifier for a category.
    CategoryId
}

define_string_id! {
    /// Unique identifier for a transaction.
    TransactionId
}

define_string_id! {
    /// Unique identifier for a savings goal.
    GoalId
}

define_string_id! {
    /// Unique identifier for a monthly budget.
    BudgetId
}

define_string_id! {
    /// Identifier shared by every installment generated from one amount.
    InstallmentGroupId
}

define_string_id! {
    /// Opaque content hash returned by the store on read (`sha` on the
    /// wire), used as an optimistic-concurrency precondition on write.
    VersionToken
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn account_id_serde_roundtrip() {
        let id = AccountId::new("c1".to_owned());
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, r#""c1""#);
        let deserialized: AccountId = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, id);
    }

    #[test]
    fn version_token_is_transparent() {
        let token: VersionToken = serde_json::from_str(r#""abc123""#).unwrap();
        assert_eq!(token.as_inner(), "abc123");
    }

    #[test]
    fn string_id_display() {
        let id = CategoryId::from("cd1");
        assert_eq!(id.to_string(), "cd1");
    }

    #[test]
    fn id_into_inner() {
        let id = TransactionId::from("p-20240101000000-0a1b2c3d");
        assert_eq!(id.into_inner(), "p-20240101000000-0a1b2c3d");
    }
}
