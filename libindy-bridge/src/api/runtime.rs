use indy_api_types::{errors::prelude::*, ErrorCode, RawErrorCode};
use libc::c_char;

pub use crate::library::get_current_error;
use crate::{
    library::{entry_point, NativeLibrary},
    utils::ctypes,
};

type SetRuntimeConfigFn = unsafe extern "C" fn(config: *const c_char) -> RawErrorCode;

/// Set libindy runtime configuration. Can be optionally called to change current params.
///
/// #Params
/// config: {
///     "crypto_thread_pool_size": Optional<int> - size of thread pool for the most expensive
///                                 crypto operations. (4 by default)
///     "collect_backtrace": Optional<bool> - whether errors backtrace should be collected.
/// }
///
/// #Errors
/// CommandRejected carrying the native status, LibraryLoading if the entry point is missing.
pub fn set_runtime_config(library: &dyn NativeLibrary, config: &str) -> IndyResult<()> {
    debug!("set_runtime_config > config: {config}");

    let set_runtime_config: SetRuntimeConfigFn =
        unsafe { entry_point(library, "indy_set_runtime_config")? };

    let config = ctypes::string_to_cstring(config)?;
    let err = unsafe { set_runtime_config(config.as_ptr()) };

    if !ErrorCode::is_success(err) {
        return Err(IndyError::from_native(
            IndyErrorKind::CommandRejected,
            err,
            format!("indy_set_runtime_config refused the config with error {err}"),
        )
        .with_details(get_current_error(library)));
    }

    debug!("set_runtime_config <");
    Ok(())
}
