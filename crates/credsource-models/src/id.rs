//! Numeric identifiers assigned by the controller.
//!
//! Every object the controller stores carries a stable integer primary key.
//! Names are mutable and not unique over time, so everything past the
//! resource locator speaks in these identifiers only.

use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            /// Wrap a raw primary key.
            pub const fn new(id: u64) -> Self {
                Self(id)
            }

            /// Return the raw primary key.
            pub const fn get(self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u64> for $name {
            fn from(id: u64) -> Self {
                Self(id)
            }
        }

        impl FromStr for $name {
            type Err = ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim().parse().map(Self)
            }
        }
    };
}

define_id!(
    /// Primary key of a credential.
    ///
    /// # Examples
    ///
    /// ```
    /// use credsource_models::CredentialId;
    ///
    /// let id: CredentialId = "42".parse().unwrap();
    /// assert_eq!(id, CredentialId::new(42));
    /// assert_eq!(id.to_string(), "42");
    /// ```
    CredentialId
);

define_id!(
    /// Primary key of a credential type.
    CredentialTypeId
);

define_id!(
    /// Primary key of an organization.
    OrganizationId
);

define_id!(
    /// Primary key of a credential input source.
    InputSourceId
);
