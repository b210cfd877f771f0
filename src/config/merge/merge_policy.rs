//! Built-in defaults every layered load starts from.

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError};

/// A builder seeded with defaults that later sources override key by key.
///
/// Numeric-looking ids may come back from the environment layer without their
/// leading zeros; `FetchRequest` pads them again.
pub fn builder_with_defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Config::builder()
        .set_default("remote.org_id", "00001")?
        .set_default("remote.max_depth", "9999")?
        .set_default("remote.chart_path", "fi/ahjo-proxy/org-chart")?
        .set_default("storage.scope", "org_section")
}
