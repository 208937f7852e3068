#![allow(dead_code)]

pub mod fake_native;

use std::sync::Arc;

use indy_bridge::{config::BridgeConfig, logger, IndyResult};

/// Installs the test logger and points the bridge at the in-process fake libindy.
pub fn setup(config: BridgeConfig) -> IndyResult<()> {
    // every test in a binary calls this, only the first logger wins
    let _ = logger::init_default_logger(Some("indy_bridge=trace".to_string()));

    indy_bridge::init_with_library(Arc::new(fake_native::FakeLibindy::new()), config)
}

pub fn setup_default() {
    setup(BridgeConfig::default()).unwrap()
}
