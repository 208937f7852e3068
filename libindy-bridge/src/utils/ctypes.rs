use std::{
    ffi::{CStr, CString},
    slice,
};

use indy_api_types::errors::prelude::*;
use libc::c_char;

/// Copies a native C string. `Ok(None)` for a null pointer.
///
/// # Safety
/// `cstr` must be null or point to a NUL-terminated string that stays valid for the call.
pub unsafe fn c_str_to_string(cstr: *const c_char) -> IndyResult<Option<String>> {
    if cstr.is_null() {
        return Ok(None);
    }

    let value = CStr::from_ptr(cstr).to_str()?;
    Ok(Some(value.to_string()))
}

/// Like [`c_str_to_string`] but a null pointer is a malformed result.
///
/// # Safety
/// Same contract as [`c_str_to_string`].
pub unsafe fn c_str_to_required_string(cstr: *const c_char, field: &str) -> IndyResult<String> {
    c_str_to_string(cstr)?.ok_or_else(|| {
        err_msg(
            IndyErrorKind::InvalidStructure,
            format!("Native callback passed null for {field}"),
        )
    })
}

/// # Safety
/// `data` must be null (only with `len == 0`) or point to `len` readable bytes.
pub unsafe fn c_bytes_to_vec(data: *const u8, len: u32) -> IndyResult<Vec<u8>> {
    if data.is_null() {
        return if len == 0 {
            Ok(Vec::new())
        } else {
            Err(err_msg(
                IndyErrorKind::InvalidStructure,
                format!("Native callback passed null buffer with length {len}"),
            ))
        };
    }

    Ok(slice::from_raw_parts(data, len as usize).to_vec())
}

pub fn string_to_cstring(s: &str) -> IndyResult<CString> {
    Ok(CString::new(s)?)
}
