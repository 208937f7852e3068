//! In-process stand-in for libindy. Entry points accept the command synchronously and, like
//! the real library, complete it later from a worker thread.

use std::{
    cell::RefCell,
    collections::HashMap,
    ffi::{c_void, CStr, CString},
    ptr,
    sync::{
        atomic::{AtomicBool, Ordering},
        Mutex,
    },
    thread,
    time::Duration,
};

use indy_bridge::{
    commands::callbacks::{EmptyCB, HandleCB, StringCB},
    library::NativeLibrary,
    logger::{EnabledCB, FlushCB, LogCB},
    CommandHandle, ErrorCode, IndyError, IndyErrorKind, IndyResult, RawErrorCode,
};
use lazy_static::lazy_static;
use libc::c_char;
use serde_json::json;

pub const DEFAULT_METRICS: &str = r#"{"threadpool_active":3}"#;

pub type EchoFn = unsafe extern "C" fn(
    command_handle: CommandHandle,
    value: i32,
    delay_ms: u32,
    reject_with: RawErrorCode,
    cb: Option<HandleCB>,
) -> RawErrorCode;

pub type FailFn = unsafe extern "C" fn(
    command_handle: CommandHandle,
    err: RawErrorCode,
    message: *const c_char,
    cb: Option<EmptyCB>,
) -> RawErrorCode;

/// What the next `indy_collect_metrics` call on this thread does.
#[derive(Clone, Debug)]
pub enum MetricsReply {
    Payload(&'static str),
    Fail { err: ErrorCode, message: &'static str },
    Reject(ErrorCode),
    Never,
}

thread_local! {
    static CURRENT_ERROR: RefCell<Option<CString>> = RefCell::new(None);
    static METRICS_REPLY: RefCell<Option<MetricsReply>> = RefCell::new(None);
}

lazy_static! {
    static ref RUNTIME_CONFIG: Mutex<Option<String>> = Mutex::new(None);
    static ref ABANDONED: Mutex<Vec<CommandHandle>> = Mutex::new(Vec::new());
}

static LOGGER_INSTALLED: AtomicBool = AtomicBool::new(false);

#[derive(Debug)]
pub struct FakeLibindy {
    symbols: HashMap<&'static str, usize>,
}

impl FakeLibindy {
    pub fn new() -> FakeLibindy {
        let mut symbols: HashMap<&'static str, usize> = HashMap::new();
        symbols.insert("indy_collect_metrics", indy_collect_metrics as usize);
        symbols.insert("indy_get_current_error", indy_get_current_error as usize);
        symbols.insert("indy_set_runtime_config", indy_set_runtime_config as usize);
        symbols.insert("indy_set_logger", indy_set_logger as usize);
        symbols.insert("fake_echo", fake_echo as usize);
        symbols.insert("fake_fail", fake_fail as usize);

        FakeLibindy { symbols }
    }
}

impl NativeLibrary for FakeLibindy {
    fn symbol(&self, name: &str) -> IndyResult<*const c_void> {
        self.symbols
            .get(name)
            .map(|address| *address as *const c_void)
            .ok_or_else(|| {
                IndyError::from_msg(
                    IndyErrorKind::LibraryLoading,
                    format!("fake libindy has no {name}"),
                )
            })
    }
}

pub fn script_metrics(reply: MetricsReply) {
    METRICS_REPLY.with(|next| *next.borrow_mut() = Some(reply));
}

pub fn runtime_config() -> Option<String> {
    RUNTIME_CONFIG.lock().unwrap().clone()
}

/// Handles accepted by `MetricsReply::Never` calls, oldest first.
pub fn abandoned_handles() -> Vec<CommandHandle> {
    ABANDONED.lock().unwrap().clone()
}

pub fn logger_installed() -> bool {
    LOGGER_INSTALLED.load(Ordering::SeqCst)
}

fn set_current_error(message: &str) {
    let error_json = json!({
        "message": message,
        "backtrace": "fake_native.rs"
    })
    .to_string();

    CURRENT_ERROR.with(|error| *error.borrow_mut() = Some(CString::new(error_json).unwrap()));
}

extern "C" fn indy_get_current_error(error_json_p: *mut *const c_char) {
    CURRENT_ERROR.with(|error| {
        let error_json = error.borrow().as_ref().map_or(ptr::null(), |error| error.as_ptr());
        unsafe { *error_json_p = error_json };
    });
}

extern "C" fn indy_set_runtime_config(config: *const c_char) -> RawErrorCode {
    if config.is_null() {
        return ErrorCode::CommonInvalidParam1.into();
    }

    let config = unsafe { CStr::from_ptr(config) }.to_string_lossy().into_owned();
    if serde_json::from_str::<serde_json::Value>(&config).is_err() {
        set_current_error("runtime config is not JSON");
        return ErrorCode::CommonInvalidStructure.into();
    }

    *RUNTIME_CONFIG.lock().unwrap() = Some(config);
    ErrorCode::Success.into()
}

extern "C" fn indy_set_logger(
    context: *const c_void,
    enabled: Option<EnabledCB>,
    log: Option<LogCB>,
    flush: Option<FlushCB>,
) -> RawErrorCode {
    let Some(log) = log else {
        return ErrorCode::CommonInvalidParam3.into();
    };

    let target = CString::new("indy::fake_native").unwrap();
    let message = CString::new("logger attached").unwrap();
    let file = CString::new("fake_native.rs").unwrap();

    if enabled.map_or(true, |enabled| enabled(context, 3, target.as_ptr())) {
        log(
            context,
            3,
            target.as_ptr(),
            message.as_ptr(),
            target.as_ptr(),
            file.as_ptr(),
            1,
        );
    }
    if let Some(flush) = flush {
        flush(context);
    }

    LOGGER_INSTALLED.store(true, Ordering::SeqCst);
    ErrorCode::Success.into()
}

extern "C" fn indy_collect_metrics(
    command_handle: CommandHandle,
    cb: Option<StringCB>,
) -> RawErrorCode {
    let Some(cb) = cb else {
        return ErrorCode::CommonInvalidParam2.into();
    };

    let reply = METRICS_REPLY
        .with(|next| next.borrow_mut().take())
        .unwrap_or(MetricsReply::Payload(DEFAULT_METRICS));

    match reply {
        MetricsReply::Reject(err) => {
            set_current_error("metrics collection refused");
            return err.into();
        }
        MetricsReply::Never => ABANDONED.lock().unwrap().push(command_handle),
        MetricsReply::Payload(payload) => {
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(5));
                let payload = CString::new(payload).unwrap();
                cb(command_handle, ErrorCode::Success.into(), payload.as_ptr());
            });
        }
        MetricsReply::Fail { err, message } => {
            thread::spawn(move || {
                set_current_error(message);
                cb(command_handle, err.into(), ptr::null());
            });
        }
    }

    ErrorCode::Success.into()
}

extern "C" fn fake_echo(
    command_handle: CommandHandle,
    value: i32,
    delay_ms: u32,
    reject_with: RawErrorCode,
    cb: Option<HandleCB>,
) -> RawErrorCode {
    let Some(cb) = cb else {
        return ErrorCode::CommonInvalidParam5.into();
    };

    if reject_with != 0 {
        return reject_with;
    }

    thread::spawn(move || {
        thread::sleep(Duration::from_millis(u64::from(delay_ms)));
        cb(command_handle, ErrorCode::Success.into(), value);
    });

    ErrorCode::Success.into()
}

extern "C" fn fake_fail(
    command_handle: CommandHandle,
    err: RawErrorCode,
    message: *const c_char,
    cb: Option<EmptyCB>,
) -> RawErrorCode {
    let Some(cb) = cb else {
        return ErrorCode::CommonInvalidParam4.into();
    };

    let message = unsafe { CStr::from_ptr(message) }.to_string_lossy().into_owned();

    thread::spawn(move || {
        set_current_error(&message);
        cb(command_handle, err);
    });

    ErrorCode::Success.into()
}
