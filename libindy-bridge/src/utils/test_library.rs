use std::{collections::HashMap, ffi::c_void};

use indy_api_types::errors::prelude::*;

use crate::library::NativeLibrary;

/// Symbol table backed by in-process functions.
#[derive(Debug, Default)]
pub(crate) struct StaticLibrary {
    symbols: HashMap<&'static str, usize>,
}

impl StaticLibrary {
    pub(crate) fn with_symbol(mut self, name: &'static str, address: usize) -> Self {
        self.symbols.insert(name, address);
        self
    }
}

impl NativeLibrary for StaticLibrary {
    fn symbol(&self, name: &str) -> IndyResult<*const c_void> {
        self.symbols
            .get(name)
            .map(|address| *address as *const c_void)
            .ok_or_else(|| err_msg(IndyErrorKind::LibraryLoading, format!("no {name}")))
    }
}
