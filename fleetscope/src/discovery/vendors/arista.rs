//! Arista EOS.
//!
//! EOS renders every show command as JSON with `| json`, which is far more
//! robust than scraping the text table, so no text fallback is registered.
//! EOS does not speak CDP.

use std::time::Duration;

use crate::discovery::chain::DiscoveryChain;
use crate::discovery::spec::{CommandSpec, DiscoveryProtocol};
use crate::parser::ids;

/// Create the Arista EOS discovery chain.
pub fn chain() -> DiscoveryChain {
    DiscoveryChain::new("arista_eos")
        .with_alias("eos")
        .with_alias("arista")
        .with_spec(
            CommandSpec::new(
                "lldp-json",
                "show lldp neighbors detail | json",
                ids::EOS_LLDP_JSON,
                DiscoveryProtocol::Lldp,
            )
            .with_timeout(Duration::from_secs(15)),
        )
}
