use std::panic::{self, AssertUnwindSafe};

use indy_api_types::{errors::prelude::*, CommandHandle, ErrorCode, RawErrorCode};
use libc::c_char;

use crate::{utils::ctypes, Locator};

/// Layout of a native completion callback: `(command_handle, err, result fields...)`.
///
/// Every implementation owns one `extern "C"` trampoline that decodes the result fields and
/// hands the outcome to the process-wide adapter for the layout. The native callback carries
/// no context pointer, so the trampoline has to find the pending table through [`Locator`].
pub trait CallbackSignature: Send + Sync + 'static {
    type Output: Send + 'static;
    type Callback: Copy + Send + Sync + 'static;

    const DESCRIPTION: &'static str;

    fn native_callback() -> Self::Callback;
}

pub type EmptyCB = extern "C" fn(command_handle: CommandHandle, err: RawErrorCode);

pub type StringCB =
    extern "C" fn(command_handle: CommandHandle, err: RawErrorCode, value: *const c_char);

pub type BoolCB = extern "C" fn(command_handle: CommandHandle, err: RawErrorCode, value: bool);

pub type HandleCB = extern "C" fn(command_handle: CommandHandle, err: RawErrorCode, handle: i32);

pub type StringStringCB = extern "C" fn(
    command_handle: CommandHandle,
    err: RawErrorCode,
    first: *const c_char,
    second: *const c_char,
);

pub type SliceCB =
    extern "C" fn(command_handle: CommandHandle, err: RawErrorCode, data: *const u8, len: u32);

#[derive(Debug, Clone, Copy)]
pub struct EmptyCallback;

#[derive(Debug, Clone, Copy)]
pub struct StringCallback;

#[derive(Debug, Clone, Copy)]
pub struct BoolCallback;

#[derive(Debug, Clone, Copy)]
pub struct HandleCallback;

#[derive(Debug, Clone, Copy)]
pub struct StringStringCallback;

#[derive(Debug, Clone, Copy)]
pub struct SliceCallback;

impl CallbackSignature for EmptyCallback {
    type Output = ();
    type Callback = EmptyCB;

    const DESCRIPTION: &'static str = "fn(command_handle, err)";

    fn native_callback() -> EmptyCB {
        empty_callback
    }
}

impl CallbackSignature for StringCallback {
    type Output = String;
    type Callback = StringCB;

    const DESCRIPTION: &'static str = "fn(command_handle, err, *const c_char)";

    fn native_callback() -> StringCB {
        string_callback
    }
}

impl CallbackSignature for BoolCallback {
    type Output = bool;
    type Callback = BoolCB;

    const DESCRIPTION: &'static str = "fn(command_handle, err, bool)";

    fn native_callback() -> BoolCB {
        bool_callback
    }
}

impl CallbackSignature for HandleCallback {
    type Output = i32;
    type Callback = HandleCB;

    const DESCRIPTION: &'static str = "fn(command_handle, err, i32)";

    fn native_callback() -> HandleCB {
        handle_callback
    }
}

impl CallbackSignature for StringStringCallback {
    type Output = (String, String);
    type Callback = StringStringCB;

    const DESCRIPTION: &'static str = "fn(command_handle, err, *const c_char, *const c_char)";

    fn native_callback() -> StringStringCB {
        string_string_callback
    }
}

impl CallbackSignature for SliceCallback {
    type Output = Vec<u8>;
    type Callback = SliceCB;

    const DESCRIPTION: &'static str = "fn(command_handle, err, *const u8, u32)";

    fn native_callback() -> SliceCB {
        slice_callback
    }
}

extern "C" fn empty_callback(command_handle: CommandHandle, err: RawErrorCode) {
    complete::<EmptyCallback, _>(command_handle, err, || Ok(()));
}

extern "C" fn string_callback(
    command_handle: CommandHandle,
    err: RawErrorCode,
    value: *const c_char,
) {
    complete::<StringCallback, _>(command_handle, err, || unsafe {
        ctypes::c_str_to_required_string(value, "value")
    });
}

extern "C" fn bool_callback(command_handle: CommandHandle, err: RawErrorCode, value: bool) {
    complete::<BoolCallback, _>(command_handle, err, || Ok(value));
}

extern "C" fn handle_callback(command_handle: CommandHandle, err: RawErrorCode, handle: i32) {
    complete::<HandleCallback, _>(command_handle, err, || Ok(handle));
}

extern "C" fn string_string_callback(
    command_handle: CommandHandle,
    err: RawErrorCode,
    first: *const c_char,
    second: *const c_char,
) {
    complete::<StringStringCallback, _>(command_handle, err, || unsafe {
        Ok((
            ctypes::c_str_to_required_string(first, "first")?,
            ctypes::c_str_to_required_string(second, "second")?,
        ))
    });
}

extern "C" fn slice_callback(
    command_handle: CommandHandle,
    err: RawErrorCode,
    data: *const u8,
    len: u32,
) {
    complete::<SliceCallback, _>(command_handle, err, || unsafe {
        ctypes::c_bytes_to_vec(data, len)
    });
}

fn complete<S, F>(command_handle: CommandHandle, err: RawErrorCode, decode: F)
where
    S: CallbackSignature,
    F: FnOnce() -> IndyResult<S::Output>,
{
    trace!(
        "complete > command_handle: {command_handle}, err: {err}, signature: {}",
        S::DESCRIPTION
    );

    // unwinding into the native caller is undefined behaviour
    let res = panic::catch_unwind(AssertUnwindSafe(|| {
        let executor = &Locator::instance().executor;

        let result = if ErrorCode::is_success(err) {
            decode()
        } else {
            Err(IndyError::from_native(
                IndyErrorKind::CommandFailed,
                err,
                format!("Command {command_handle} completed with error {err}"),
            )
            .with_details(executor.current_error_details()))
        };

        executor.adapter::<S>().complete(command_handle, result)
    }));

    match res {
        Ok(delivered) => {
            trace!("complete < command_handle: {command_handle}, delivered: {delivered}")
        }
        Err(_) => error!("complete: panic while completing command {command_handle}"),
    }
}
