//! Builds the facilitator routing table from configuration.

use std::sync::Arc;

use s402::network::NetworkId;
use s402::scheme::{FacilitatorRegistry, SchemeFacilitator};
use s402_sui::exact::{ExactSuiFacilitator, ExactSuiFacilitatorConfig};
use s402_sui::networks::{SUI_NAMESPACE, default_rpc_url};
use s402_sui::{SuiRpcClient, SuiSigner};
use url::Url;

use crate::config::{ConfigError, FacilitatorConfig, NetworkConfig};

/// Registers one `exact` adapter per usable `[networks]` table.
///
/// Tables with a malformed or non-Sui network id, or with a key that is
/// still an unexpanded `$VAR`, are skipped with a warning.
///
/// # Errors
///
/// Returns [`ConfigError`] when a resolved key does not load, or when a
/// network has no `rpc_url` and no public endpoint.
pub fn build_registry(config: &FacilitatorConfig) -> Result<FacilitatorRegistry, ConfigError> {
    let mut registrations: Vec<(NetworkId, Arc<dyn SchemeFacilitator>)> = Vec::new();

    for (name, network_config) in &config.networks {
        let network: NetworkId = match name.parse() {
            Ok(network) => network,
            Err(e) => {
                tracing::warn!(network = %name, error = %e, "Skipping network: invalid identifier");
                continue;
            }
        };
        if network.family() != SUI_NAMESPACE {
            tracing::warn!(network = %name, "Skipping network: not a sui network");
            continue;
        }
        let Some(key) = network_config.resolved_key() else {
            tracing::warn!(
                network = %name,
                "Skipping network: signer_private_key not resolved (missing env var?)"
            );
            continue;
        };

        let signer = SuiSigner::from_key_material(key).map_err(|source| {
            ConfigError::InvalidSigner {
                network: name.clone(),
                source,
            }
        })?;
        let rpc_url = rpc_url_for(&network, network_config)?;
        tracing::info!(
            network = %network,
            signer = %signer.address(),
            rpc = %rpc_url,
            verify_before_settle = network_config.verify_before_settle,
            "Registered sui exact scheme"
        );

        let facilitator = ExactSuiFacilitator::new(SuiRpcClient::new(rpc_url)?, Arc::new(signer))
            .with_config(ExactSuiFacilitatorConfig {
                verify_before_settle: network_config.verify_before_settle,
            });
        registrations.push((network, Arc::new(facilitator)));
    }

    Ok(FacilitatorRegistry::new(registrations))
}

fn rpc_url_for(network: &NetworkId, config: &NetworkConfig) -> Result<Url, ConfigError> {
    if let Some(url) = &config.rpc_url {
        return Ok(url.clone());
    }
    default_rpc_url(network)
        .and_then(|url| Url::parse(url).ok())
        .ok_or_else(|| ConfigError::MissingRpcUrl(network.to_string()))
}
