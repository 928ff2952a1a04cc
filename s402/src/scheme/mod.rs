//! Payment scheme system.
//!
//! A scheme is a named payment method. Each chain family implements it
//! through three adapters:
//!
//! - [`SchemeClient`] builds and signs a [`PaymentPayload`](s402_proto::PaymentPayload)
//!   from advertised requirements
//! - [`SchemeFacilitator`] verifies a payload by simulation and settles it
//! - [`SchemeServer`] turns prices into base-unit amounts and decorates
//!   requirements before they are advertised
//!
//! [`FacilitatorRegistry`] routes verify/settle calls to the facilitator
//! adapter registered for a `(scheme, network)` pair.

mod client;
mod facilitator;
mod registry;
mod server;

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::str::FromStr;

pub use client::*;
pub use facilitator::*;
pub use registry::*;
pub use server::*;

/// A boxed, sendable future used by the object-safe adapter traits.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The closed set of payment schemes this stack understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Scheme {
    /// Pay exactly (at least) the advertised amount.
    Exact,
}

impl Scheme {
    /// Returns the wire name of the scheme.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Exact => "exact",
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a scheme name is not recognized.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown payment scheme {0:?}")]
pub struct UnknownSchemeError(String);

impl FromStr for Scheme {
    type Err = UnknownSchemeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "exact" => Ok(Self::Exact),
            other => Err(UnknownSchemeError(other.to_owned())),
        }
    }
}

impl serde::Serialize for Scheme {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> serde::Deserialize<'de> for Scheme {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Identifies the scheme and chain family an adapter serves.
pub trait SchemeId {
    /// Returns the chain family (e.g., `"sui"`).
    fn namespace(&self) -> &str;

    /// Returns the payment scheme.
    fn scheme(&self) -> Scheme;

    /// Returns the family pattern used to group signers in discovery
    /// responses (e.g., `"sui:*"`).
    fn caip_family(&self) -> String {
        format!("{}:*", self.namespace())
    }

    /// Returns the full adapter identifier (e.g., `"sui-exact"`).
    fn id(&self) -> String {
        format!("{}-{}", self.namespace(), self.scheme())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct SuiExactId;

    impl SchemeId for SuiExactId {
        fn namespace(&self) -> &str {
            "sui"
        }

        fn scheme(&self) -> Scheme {
            Scheme::Exact
        }
    }

    #[test]
    fn test_scheme_round_trip() {
        assert_eq!("exact".parse::<Scheme>().unwrap(), Scheme::Exact);
        assert!("upto".parse::<Scheme>().is_err());
        assert_eq!(serde_json::to_value(Scheme::Exact).unwrap(), "exact");
    }

    #[test]
    fn test_scheme_id_defaults() {
        assert_eq!(SuiExactId.caip_family(), "sui:*");
        assert_eq!(SuiExactId.id(), "sui-exact");
    }
}
