//! Runtime configuration resolved from the command line

use mariadb_common::{Error, Result};
use mariadb_grant::PollConfig;

/// Settings shared by every controller
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OperatorConfig {
    /// Namespace to restrict controllers and watches to; `None` watches all
    pub namespace: Option<String>,
    /// User existence poll used by Grant finalization
    pub poll: PollConfig,
    /// Whether CRDs are applied on startup
    pub install_crds: bool,
}

impl OperatorConfig {
    /// Validate raw values and build the config.
    ///
    /// An empty namespace means all namespaces. The poll interval must be
    /// positive and the timeout must leave room for at least one interval.
    pub fn new(
        namespace: Option<String>,
        poll_interval_ms: u64,
        poll_timeout_ms: u64,
        install_crds: bool,
    ) -> Result<Self> {
        if poll_interval_ms == 0 {
            return Err(Error::validation_for(
                "operator",
                "user poll interval must be greater than zero",
            ));
        }
        if poll_timeout_ms < poll_interval_ms {
            return Err(Error::validation_for(
                "operator",
                format!(
                    "user poll timeout ({poll_timeout_ms}ms) is shorter than the interval ({poll_interval_ms}ms)"
                ),
            ));
        }
        Ok(Self {
            namespace: namespace.filter(|ns| !ns.is_empty()),
            poll: PollConfig::from_millis(poll_interval_ms, poll_timeout_ms),
            install_crds,
        })
    }
}
