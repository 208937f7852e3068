use std::time::Duration;

use indy_api_types::errors::prelude::*;
use serde_json::Value;

#[cfg(target_os = "macos")]
pub const DEFAULT_LIBRARY_NAME: &str = "libindy.dylib";
#[cfg(windows)]
pub const DEFAULT_LIBRARY_NAME: &str = "indy.dll";
#[cfg(not(any(target_os = "macos", windows)))]
pub const DEFAULT_LIBRARY_NAME: &str = "libindy.so";

/// Bridge configuration.
///
/// {
///   "library_path": optional<string>, path or name of the libindy shared library.
///                   Defaults to the platform library name (libindy.so, libindy.dylib, indy.dll).
///   "command_timeout_secs": optional<int>, how long API calls wait for a completion before
///                   giving up. Waits forever if omitted.
///   "runtime_config": optional<object>, passed as is to indy_set_runtime_config after loading.
///   "forward_native_logs": optional<bool>, route native log records into the `log` facade.
///                   Defaults to false.
/// }
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BridgeConfig {
    pub library_path: Option<String>,
    pub command_timeout_secs: Option<u64>,
    pub runtime_config: Option<Value>,
    #[serde(default)]
    pub forward_native_logs: bool,
}

impl BridgeConfig {
    pub fn from_json(config: &str) -> IndyResult<BridgeConfig> {
        serde_json::from_str(config).map_err(|err| {
            err_msg(
                IndyErrorKind::InvalidConfiguration,
                format!("Failed to deserialize bridge config {config:?}, err: {err:?}"),
            )
        })
    }

    pub fn library_path(&self) -> &str {
        self.library_path.as_deref().unwrap_or(DEFAULT_LIBRARY_NAME)
    }

    pub fn command_timeout(&self) -> Option<Duration> {
        self.command_timeout_secs.map(Duration::from_secs)
    }
}
