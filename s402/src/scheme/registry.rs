//! Facilitator routing table.
//!
//! [`FacilitatorRegistry`] maps `(scheme, network)` to the facilitator
//! adapter that handles it. The table is fixed at construction; lookups take
//! `&self` only, so the registry can be shared across tasks without locking.

use std::collections::HashMap;
use std::fmt::{self, Debug, Display, Formatter};
use std::sync::Arc;

use s402_proto::{
    PaymentPayload, PaymentRequirements, SettleResponse, SupportedKind, SupportedResponse,
    VerifyResponse, X402_VERSION,
};

use super::{Scheme, SchemeFacilitator};
use crate::error::{ErrorReason, PaymentProblem};
use crate::network::NetworkId;

/// Routing key: a scheme on a specific network.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct SchemeSlug {
    /// The payment scheme.
    pub scheme: Scheme,
    /// The network the adapter settles on.
    pub network: NetworkId,
}

impl SchemeSlug {
    /// Creates a new slug.
    #[must_use]
    pub const fn new(scheme: Scheme, network: NetworkId) -> Self {
        Self { scheme, network }
    }

    /// Derives the slug named by payment requirements.
    ///
    /// # Errors
    ///
    /// Returns an `unsupported_scheme` problem if the scheme is unknown or
    /// the network is not a `family:chain` identifier.
    pub fn from_requirements(requirements: &PaymentRequirements) -> Result<Self, PaymentProblem> {
        let unsupported = || {
            PaymentProblem::new(
                ErrorReason::UnsupportedScheme,
                format!(
                    "no facilitator registered for {}:{}",
                    requirements.scheme, requirements.network
                ),
            )
        };
        let scheme = requirements.scheme.parse().map_err(|_| unsupported())?;
        let network = requirements.network.parse().map_err(|_| unsupported())?;
        Ok(Self::new(scheme, network))
    }
}

impl Display for SchemeSlug {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.scheme, self.network)
    }
}

/// Immutable `(scheme, network)` routing table over facilitator adapters.
pub struct FacilitatorRegistry {
    routes: HashMap<SchemeSlug, Arc<dyn SchemeFacilitator>>,
    registrations: Vec<(NetworkId, Arc<dyn SchemeFacilitator>)>,
    networks: Vec<NetworkId>,
    extensions: Vec<String>,
}

impl Debug for FacilitatorRegistry {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let mut slugs: Vec<String> = self.routes.keys().map(ToString::to_string).collect();
        slugs.sort_unstable();
        f.debug_struct("FacilitatorRegistry")
            .field("routes", &slugs)
            .field("extensions", &self.extensions)
            .finish()
    }
}

impl FacilitatorRegistry {
    /// Builds the routing table from `(network, adapter)` pairs.
    ///
    /// Each adapter is keyed by its own scheme. When two pairs resolve to
    /// the same key, the first one is kept.
    pub fn new<I>(registrations: I) -> Self
    where
        I: IntoIterator<Item = (NetworkId, Arc<dyn SchemeFacilitator>)>,
    {
        let mut routes = HashMap::new();
        let mut kept = Vec::new();
        let mut networks: Vec<NetworkId> = Vec::new();

        for (network, facilitator) in registrations {
            let slug = SchemeSlug::new(facilitator.scheme(), network.clone());
            if routes.contains_key(&slug) {
                #[cfg(feature = "telemetry")]
                tracing::warn!(%slug, "Duplicate facilitator registration ignored");
                continue;
            }
            #[cfg(feature = "telemetry")]
            tracing::debug!(%slug, adapter = %facilitator.id(), "Registered facilitator");
            routes.insert(slug, Arc::clone(&facilitator));
            if !networks.contains(&network) {
                networks.push(network.clone());
            }
            kept.push((network, facilitator));
        }

        Self {
            routes,
            registrations: kept,
            networks,
            extensions: Vec::new(),
        }
    }

    /// Adds extension keys advertised in discovery responses.
    #[must_use]
    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for extension in extensions {
            let extension = extension.into();
            if !self.extensions.contains(&extension) {
                self.extensions.push(extension);
            }
        }
        self
    }

    /// Returns every network with at least one registration, in
    /// registration order and without duplicates.
    #[must_use]
    pub fn networks(&self) -> &[NetworkId] {
        &self.networks
    }

    /// Returns the adapter registered for `slug`, if any.
    #[must_use]
    pub fn get(&self, slug: &SchemeSlug) -> Option<&dyn SchemeFacilitator> {
        self.routes.get(slug).map(AsRef::as_ref)
    }

    fn route(
        &self,
        requirements: &PaymentRequirements,
    ) -> Result<&dyn SchemeFacilitator, PaymentProblem> {
        let slug = SchemeSlug::from_requirements(requirements)?;
        self.get(&slug).ok_or_else(|| {
            PaymentProblem::new(
                ErrorReason::UnsupportedScheme,
                format!("no facilitator registered for {slug}"),
            )
        })
    }

    /// Verifies `payload` with the adapter registered for the requirements'
    /// scheme and network.
    ///
    /// Unknown pairs yield an `unsupported_scheme` response without touching
    /// any adapter.
    pub async fn verify(
        &self,
        payload: &PaymentPayload,
        requirements: &PaymentRequirements,
    ) -> VerifyResponse {
        match self.route(requirements) {
            Ok(facilitator) => facilitator.verify(payload, requirements).await,
            Err(problem) => problem.into_verify_response(),
        }
    }

    /// Settles `payload` with the adapter registered for the requirements'
    /// scheme and network.
    ///
    /// Unknown pairs yield an `unsupported_scheme` response with an empty
    /// transaction digest without touching any adapter.
    pub async fn settle(
        &self,
        payload: &PaymentPayload,
        requirements: &PaymentRequirements,
    ) -> SettleResponse {
        match self.route(requirements) {
            Ok(facilitator) => facilitator.settle(payload, requirements).await,
            Err(problem) => problem.into_settle_response(requirements.network.clone()),
        }
    }

    /// Aggregates supported kinds and signers across all registrations.
    ///
    /// Signers are grouped by chain family (`sui:*`) and deduplicated.
    #[must_use]
    pub fn get_supported(&self) -> SupportedResponse {
        let mut kinds = Vec::with_capacity(self.registrations.len());
        let mut signers = HashMap::<String, Vec<String>>::new();

        for (network, facilitator) in &self.registrations {
            kinds.push(SupportedKind {
                x402_version: X402_VERSION,
                scheme: facilitator.scheme().to_string(),
                network: network.to_string(),
                extra: facilitator.get_extra(network),
            });

            let entry = signers.entry(facilitator.caip_family()).or_default();
            for signer in facilitator.get_signers(network) {
                if !entry.contains(&signer) {
                    entry.push(signer);
                }
            }
        }

        SupportedResponse::new(kinds, self.extensions.clone(), signers)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde_json::{Value, json};

    use super::*;
    use crate::scheme::{BoxFuture, SchemeId};

    #[derive(Default)]
    struct SpyFacilitator {
        signer: String,
        verify_calls: AtomicUsize,
        settle_calls: AtomicUsize,
    }

    impl SpyFacilitator {
        fn with_signer(signer: &str) -> Arc<Self> {
            Arc::new(Self {
                signer: signer.to_owned(),
                ..Self::default()
            })
        }
    }

    impl SchemeId for SpyFacilitator {
        fn namespace(&self) -> &str {
            "sui"
        }

        fn scheme(&self) -> Scheme {
            Scheme::Exact
        }
    }

    impl SchemeFacilitator for SpyFacilitator {
        fn verify<'a>(
            &'a self,
            _payload: &'a PaymentPayload,
            _requirements: &'a PaymentRequirements,
        ) -> BoxFuture<'a, VerifyResponse> {
            self.verify_calls.fetch_add(1, Ordering::SeqCst);
            Box::pin(async move { VerifyResponse::valid(Some(self.signer.clone())) })
        }

        fn settle<'a>(
            &'a self,
            _payload: &'a PaymentPayload,
            requirements: &'a PaymentRequirements,
        ) -> BoxFuture<'a, SettleResponse> {
            self.settle_calls.fetch_add(1, Ordering::SeqCst);
            Box::pin(async move { SettleResponse::success("Digest", &requirements.network, None) })
        }

        fn get_signers(&self, _network: &NetworkId) -> Vec<String> {
            vec![self.signer.clone()]
        }

        fn get_extra(&self, network: &NetworkId) -> Option<Value> {
            Some(json!({ "facilitator": self.signer, "network": network.to_string() }))
        }
    }

    fn requirements(scheme: &str, network: &str) -> PaymentRequirements {
        PaymentRequirements {
            scheme: scheme.into(),
            network: network.into(),
            asset: "0x2::sui::SUI".into(),
            amount: "100".into(),
            pay_to: "0xaa".into(),
            max_timeout_seconds: 300,
            extra: json!({}),
        }
    }

    fn testnet() -> NetworkId {
        NetworkId::new("sui", "testnet")
    }

    #[tokio::test]
    async fn test_unknown_pair_never_reaches_adapter() {
        let spy = SpyFacilitator::with_signer("0xf1");
        let registry =
            FacilitatorRegistry::new([(testnet(), spy.clone() as Arc<dyn SchemeFacilitator>)]);

        for (scheme, network) in [
            ("upto", "sui:testnet"),
            ("exact", "sui:mainnet"),
            ("exact", "not-a-network"),
        ] {
            let req = requirements(scheme, network);
            let payload = PaymentPayload::new(2, json!({}), req.clone());

            let verify = registry.verify(&payload, &req).await;
            assert!(!verify.is_valid);
            assert_eq!(verify.invalid_reason.as_deref(), Some("unsupported_scheme"));

            let settle = registry.settle(&payload, &req).await;
            assert!(!settle.success);
            assert_eq!(settle.error_reason.as_deref(), Some("unsupported_scheme"));
            assert_eq!(settle.transaction, "");
            assert_eq!(settle.network, network);
        }

        assert_eq!(spy.verify_calls.load(Ordering::SeqCst), 0);
        assert_eq!(spy.settle_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_routes_to_registered_adapter() {
        let spy = SpyFacilitator::with_signer("0xf1");
        let registry =
            FacilitatorRegistry::new([(testnet(), spy.clone() as Arc<dyn SchemeFacilitator>)]);
        let req = requirements("exact", "sui:testnet");
        let payload = PaymentPayload::new(2, json!({}), req.clone());

        let verify = registry.verify(&payload, &req).await;
        assert!(verify.is_valid);
        let settle = registry.settle(&payload, &req).await;
        assert!(settle.success);
        assert_eq!(settle.transaction, "Digest");

        assert_eq!(spy.verify_calls.load(Ordering::SeqCst), 1);
        assert_eq!(spy.settle_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_get_supported_merges_signers() {
        let shared = SpyFacilitator::with_signer("0xf1");
        let other = SpyFacilitator::with_signer("0xf2");
        let registry = FacilitatorRegistry::new([
            (testnet(), shared.clone() as Arc<dyn SchemeFacilitator>),
            (NetworkId::new("sui", "mainnet"), shared as Arc<dyn SchemeFacilitator>),
            (NetworkId::new("sui", "devnet"), other as Arc<dyn SchemeFacilitator>),
        ])
        .with_extensions(["bazaar", "bazaar"]);

        let supported = registry.get_supported();
        assert_eq!(supported.kinds.len(), 3);
        assert!(supported.kinds.iter().all(|k| k.x402_version == 2 && k.scheme == "exact"));
        assert_eq!(
            supported.kind_for("exact", "sui:mainnet").and_then(|k| k.extra.clone()),
            Some(json!({ "facilitator": "0xf1", "network": "sui:mainnet" }))
        );
        assert_eq!(supported.signers.len(), 1);
        assert_eq!(supported.signers["sui:*"], vec!["0xf1", "0xf2"]);
        assert_eq!(supported.extensions, vec!["bazaar"]);
    }

    #[test]
    fn test_duplicate_registration_keeps_first() {
        let first = SpyFacilitator::with_signer("0xf1");
        let second = SpyFacilitator::with_signer("0xf2");
        let registry = FacilitatorRegistry::new([
            (testnet(), first as Arc<dyn SchemeFacilitator>),
            (testnet(), second as Arc<dyn SchemeFacilitator>),
        ]);

        assert_eq!(registry.networks(), &[testnet()]);
        let supported = registry.get_supported();
        assert_eq!(supported.kinds.len(), 1);
        assert_eq!(supported.signers["sui:*"], vec!["0xf1"]);
        assert!(
            registry
                .get(&SchemeSlug::new(Scheme::Exact, testnet()))
                .is_some()
        );
    }

    #[test]
    fn test_slug_display() {
        let slug = SchemeSlug::new(Scheme::Exact, testnet());
        assert_eq!(slug.to_string(), "exact:sui:testnet");
    }
}
