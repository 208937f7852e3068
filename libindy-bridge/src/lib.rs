#[macro_use]
extern crate log;

#[macro_use]
extern crate serde_derive;

#[macro_use]
extern crate lazy_static;

pub use indy_api_types as types;

#[macro_use]
mod utils;

pub mod api;
pub mod commands;
pub mod config;
pub mod library;
pub mod logger;

use std::{
    sync::{Arc, PoisonError, RwLock},
    time::Duration,
};

pub use indy_api_types::{
    errors::{ErrorDetails, IndyError, IndyErrorKind, IndyResult},
    CommandHandle, ErrorCode, RawErrorCode, INVALID_COMMAND_HANDLE,
};

use crate::{
    commands::CommandExecutor,
    config::BridgeConfig,
    library::{DynamicLibrary, NativeLibrary},
};

// Global (lazy inited) instance of Locator
lazy_static! {
    static ref LOCATOR: Locator = Locator::new();
}

#[derive(Debug)]
pub struct Locator {
    pub executor: CommandExecutor,
    config: RwLock<BridgeConfig>,
}

impl Locator {
    pub fn instance() -> &'static Locator {
        &LOCATOR
    }

    fn new() -> Locator {
        info!("new >");

        let res = Locator {
            executor: CommandExecutor::new(),
            config: RwLock::new(BridgeConfig::default()),
        };

        info!("new <");
        res
    }

    pub fn config(&self) -> BridgeConfig {
        self.config
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn command_timeout(&self) -> Option<Duration> {
        self.config
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .command_timeout()
    }

    fn set_config(&self, config: BridgeConfig) {
        *self.config.write().unwrap_or_else(PoisonError::into_inner) = config;
    }
}

impl Drop for Locator {
    fn drop(&mut self) {
        info!(target: "Locator", "drop <>");
    }
}

/// Loads libindy and prepares the bridge.
///
/// #Params
/// config_json: bridge config, see [`BridgeConfig`].
///
/// #Errors
/// InvalidConfiguration, LibraryLoading, CommandRejected (runtime config or logger refused)
pub fn init(config_json: &str) -> IndyResult<()> {
    debug!("init > config_json: {config_json}");

    let config = BridgeConfig::from_json(config_json)?;
    let library = DynamicLibrary::load(config.library_path())?;

    let res = init_with_library(Arc::new(library), config);

    debug!("init < {res:?}");
    res
}

/// Same as [`init`] for a library that is already loaded.
pub fn init_with_library(library: Arc<dyn NativeLibrary>, config: BridgeConfig) -> IndyResult<()> {
    trace!("init_with_library > library: {library:?}, config: {config:?}");

    if let Some(runtime_config) = config.runtime_config.as_ref() {
        api::runtime::set_runtime_config(&*library, &runtime_config.to_string())?;
    }

    if config.forward_native_logs {
        logger::forward_native_logs(&*library)?;
    }

    let locator = Locator::instance();
    locator.executor.set_library(library);
    locator.set_config(config);

    trace!("init_with_library <");
    Ok(())
}
