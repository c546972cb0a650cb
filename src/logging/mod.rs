use env_logger::{Builder, Env};

use crate::{config, config_error, core::ApiResult};

/// Installs `env_logger` as the `log` backend.
///
/// The configured level is the default; `RUST_LOG` overrides it.
pub fn init_logger(config: &config::Log) -> ApiResult<()> {
    Builder::new()
        .filter_level(config.level_filter())
        .parse_env(Env::default())
        .try_init()
        .map_err(|e| config_error!("Unable to install logger: {}", e))
}
