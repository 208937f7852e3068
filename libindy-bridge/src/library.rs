use std::{ffi::c_void, fmt, mem, ptr};

use indy_api_types::errors::prelude::*;
use libc::c_char;

use crate::utils::ctypes;

/// Source of native entry points. Implemented by [`DynamicLibrary`] for a real libindy and by
/// in-process fakes in tests.
pub trait NativeLibrary: Send + Sync + fmt::Debug {
    /// Address of the exported symbol `name`.
    fn symbol(&self, name: &str) -> IndyResult<*const c_void>;
}

/// libindy loaded at runtime with `libloading`.
pub struct DynamicLibrary {
    path: String,
    library: libloading::Library,
}

impl DynamicLibrary {
    pub fn load(path: &str) -> IndyResult<DynamicLibrary> {
        debug!("DynamicLibrary::load > path: {path}");

        let library = load_lib(path).to_indy(
            IndyErrorKind::LibraryLoading,
            format!("Native library {path} failed to load"),
        )?;

        debug!("DynamicLibrary::load < loaded {path}");
        Ok(DynamicLibrary {
            path: path.to_string(),
            library,
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

#[cfg(unix)]
fn load_lib(library: &str) -> Result<libloading::Library, libloading::Error> {
    // RTLD_NODELETE: native worker threads may still call back into us after unload
    unsafe {
        libloading::os::unix::Library::open(Some(library), libc::RTLD_NOW | libc::RTLD_NODELETE)
            .map(libloading::Library::from)
    }
}

#[cfg(not(unix))]
fn load_lib(library: &str) -> Result<libloading::Library, libloading::Error> {
    unsafe { libloading::Library::new(library) }
}

impl NativeLibrary for DynamicLibrary {
    fn symbol(&self, name: &str) -> IndyResult<*const c_void> {
        let symbol = unsafe { self.library.get::<*const c_void>(name.as_bytes()) }.to_indy(
            IndyErrorKind::LibraryLoading,
            format!("Symbol {name} not found in {}", self.path),
        )?;

        Ok(*symbol)
    }
}

impl fmt::Debug for DynamicLibrary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynamicLibrary")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

/// Resolves `name` as a function pointer of type `F`.
///
/// # Safety
/// `F` must be an `extern "C"` function pointer type matching the real signature of the
/// exported symbol.
pub unsafe fn entry_point<F: Copy>(library: &dyn NativeLibrary, name: &str) -> IndyResult<F> {
    if mem::size_of::<F>() != mem::size_of::<*const c_void>() {
        return Err(err_msg(
            IndyErrorKind::InvalidState,
            format!("Entry point type for {name} is not a function pointer"),
        ));
    }

    let symbol = library.symbol(name)?;

    if symbol.is_null() {
        return Err(err_msg(
            IndyErrorKind::LibraryLoading,
            format!("Symbol {name} resolved to null"),
        ));
    }

    Ok(mem::transmute_copy::<*const c_void, F>(&symbol))
}

type GetCurrentErrorFn = unsafe extern "C" fn(error_json_p: *mut *const c_char);

/// Reads the error details the native library keeps for the calling thread.
///
/// Must run on the thread that observed the failure: the submitting thread for a rejection,
/// the callback thread for a failed completion.
pub fn get_current_error(library: &dyn NativeLibrary) -> Option<ErrorDetails> {
    let get_current_error: GetCurrentErrorFn =
        match unsafe { entry_point(library, "indy_get_current_error") } {
            Ok(entry) => entry,
            Err(err) => {
                trace!("get_current_error: unavailable: {err}");
                return None;
            }
        };

    let mut error_json: *const c_char = ptr::null();
    unsafe { get_current_error(&mut error_json) };

    let error_json = match unsafe { ctypes::c_str_to_string(error_json) } {
        Ok(Some(error_json)) => error_json,
        Ok(None) => return None,
        Err(err) => {
            warn!("get_current_error: undecodable error details: {err}");
            return None;
        }
    };

    serde_json::from_str::<ErrorDetails>(&error_json)
        .map_err(|err| warn!("get_current_error: malformed error details {error_json}: {err}"))
        .ok()
}
