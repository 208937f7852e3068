use std::{
    env,
    ffi::c_void,
    io::Write,
    panic::{self, AssertUnwindSafe},
    ptr,
};

use env_logger::Builder as EnvLoggerBuilder;
use indy_api_types::{errors::prelude::*, ErrorCode, RawErrorCode};
use libc::c_char;
use log::{Level, LevelFilter, Log, Metadata, Record};

use crate::{
    library::{entry_point, NativeLibrary},
    utils::ctypes,
};

pub type EnabledCB =
    extern "C" fn(context: *const c_void, level: u32, target: *const c_char) -> bool;

pub type LogCB = extern "C" fn(
    context: *const c_void,
    level: u32,
    target: *const c_char,
    message: *const c_char,
    module_path: *const c_char,
    file: *const c_char,
    line: u32,
);

pub type FlushCB = extern "C" fn(context: *const c_void);

type SetLoggerFn = unsafe extern "C" fn(
    context: *const c_void,
    enabled: Option<EnabledCB>,
    log: Option<LogCB>,
    flush: Option<FlushCB>,
) -> RawErrorCode;

type SetLogMaxLvlFn = unsafe extern "C" fn(max_lvl: u32) -> RawErrorCode;

/// Installs `env_logger` as the process logger.
///
/// `pattern` follows the `RUST_LOG` syntax and falls back to the `RUST_LOG` environment
/// variable. Fails if a logger is already installed.
pub fn init_default_logger(pattern: Option<String>) -> IndyResult<()> {
    let pattern = pattern.or_else(|| env::var("RUST_LOG").ok());

    EnvLoggerBuilder::new()
        .format(|buf, record| {
            writeln!(
                buf,
                "{:>5}|{:<30}|{:>35}:{:<4}| {}",
                record.level(),
                record.target(),
                record.file().unwrap_or(""),
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .filter(None, LevelFilter::Off)
        .parse_filters(pattern.as_deref().unwrap_or(""))
        .try_init()?;

    Ok(())
}

/// Routes log records emitted inside the native library into the `log` facade.
pub fn forward_native_logs(library: &dyn NativeLibrary) -> IndyResult<()> {
    trace!("forward_native_logs >");

    let set_logger: SetLoggerFn = unsafe { entry_point(library, "indy_set_logger")? };

    let err = unsafe {
        set_logger(
            ptr::null(),
            Some(native_enabled),
            Some(native_log),
            Some(native_flush),
        )
    };

    check_native_status(err, "indy_set_logger")?;

    trace!("forward_native_logs <");
    Ok(())
}

/// Caps the level of records the native library produces.
pub fn set_native_max_level(library: &dyn NativeLibrary, max_level: LevelFilter) -> IndyResult<()> {
    let set_log_max_lvl: SetLogMaxLvlFn = unsafe { entry_point(library, "indy_set_log_max_lvl")? };

    let err = unsafe { set_log_max_lvl(max_level as u32) };
    check_native_status(err, "indy_set_log_max_lvl")
}

fn check_native_status(err: RawErrorCode, entry: &str) -> IndyResult<()> {
    if ErrorCode::is_success(err) {
        Ok(())
    } else {
        Err(IndyError::from_native(
            IndyErrorKind::CommandRejected,
            err,
            format!("{entry} returned {err}"),
        ))
    }
}

fn get_level(level: u32) -> Option<Level> {
    match level {
        1 => Some(Level::Error),
        2 => Some(Level::Warn),
        3 => Some(Level::Info),
        4 => Some(Level::Debug),
        5 => Some(Level::Trace),
        _ => None,
    }
}

/// Runs a log trampoline body. A panic inside the installed logger must not unwind into the
/// native caller, and there is no logger left to report it through.
fn guarded<T>(default: T, body: impl FnOnce() -> T) -> T {
    panic::catch_unwind(AssertUnwindSafe(body)).unwrap_or(default)
}

extern "C" fn native_enabled(_context: *const c_void, level: u32, target: *const c_char) -> bool {
    unsafe { enabled_with(log::logger(), level, target) }
}

extern "C" fn native_log(
    _context: *const c_void,
    level: u32,
    target: *const c_char,
    message: *const c_char,
    module_path: *const c_char,
    file: *const c_char,
    line: u32,
) {
    unsafe { log_with(log::logger(), level, target, message, module_path, file, line) }
}

extern "C" fn native_flush(_context: *const c_void) {
    flush_with(log::logger())
}

unsafe fn enabled_with(logger: &dyn Log, level: u32, target: *const c_char) -> bool {
    guarded(false, || {
        let (Some(level), Ok(Some(target))) = (get_level(level), ctypes::c_str_to_string(target))
        else {
            return false;
        };

        let metadata: Metadata<'_> = Metadata::builder().level(level).target(&target).build();

        logger.enabled(&metadata)
    })
}

unsafe fn log_with(
    logger: &dyn Log,
    level: u32,
    target: *const c_char,
    message: *const c_char,
    module_path: *const c_char,
    file: *const c_char,
    line: u32,
) {
    guarded((), || {
        let Some(level) = get_level(level) else {
            return;
        };

        let target = ctypes::c_str_to_string(target)
            .ok()
            .flatten()
            .unwrap_or_default();
        let message = ctypes::c_str_to_string(message)
            .ok()
            .flatten()
            .unwrap_or_default();
        let module_path = ctypes::c_str_to_string(module_path).ok().flatten();
        let file = ctypes::c_str_to_string(file).ok().flatten();

        logger.log(
            &Record::builder()
                .args(format_args!("{message}"))
                .level(level)
                .target(&target)
                .module_path(module_path.as_deref())
                .file(file.as_deref())
                .line(Some(line))
                .build(),
        );
    })
}

fn flush_with(logger: &dyn Log) {
    guarded((), || logger.flush())
}

#[cfg(test)]
mod tests {
    use std::{
        ffi::CString,
        sync::{
            atomic::{AtomicBool, Ordering},
            Mutex,
        },
    };

    use super::*;
    use crate::utils::test_library::StaticLibrary;

    static LOGGER_INSTALLED: AtomicBool = AtomicBool::new(false);

    lazy_static! {
        static ref MAX_LEVEL: Mutex<Option<u32>> = Mutex::new(None);
    }

    struct PanickingLogger;

    impl Log for PanickingLogger {
        fn enabled(&self, _metadata: &Metadata<'_>) -> bool {
            panic!("enabled")
        }

        fn log(&self, _record: &Record<'_>) {
            panic!("log")
        }

        fn flush(&self) {
            panic!("flush")
        }
    }

    extern "C" fn fake_set_logger(
        context: *const c_void,
        enabled: Option<EnabledCB>,
        log: Option<LogCB>,
        flush: Option<FlushCB>,
    ) -> RawErrorCode {
        if log.is_none() {
            return ErrorCode::CommonInvalidParam3.into();
        }
        LOGGER_INSTALLED.store(
            context.is_null() && enabled.is_some() && flush.is_some(),
            Ordering::SeqCst,
        );
        ErrorCode::Success.into()
    }

    extern "C" fn fake_set_log_max_lvl(max_lvl: u32) -> RawErrorCode {
        if max_lvl > 5 {
            return ErrorCode::CommonInvalidParam1.into();
        }
        *MAX_LEVEL.lock().unwrap() = Some(max_lvl);
        ErrorCode::Success.into()
    }

    #[test]
    fn test_get_level() {
        assert_eq!(get_level(1), Some(Level::Error));
        assert_eq!(get_level(5), Some(Level::Trace));
        assert_eq!(get_level(0), None);
        assert_eq!(get_level(6), None);
    }

    #[test]
    fn test_forward_native_logs_installs_trampolines() {
        let library =
            StaticLibrary::default().with_symbol("indy_set_logger", fake_set_logger as usize);

        forward_native_logs(&library).unwrap();
        assert!(LOGGER_INSTALLED.load(Ordering::SeqCst));
    }

    #[test]
    fn test_forward_native_logs_requires_symbol() {
        let err = forward_native_logs(&StaticLibrary::default()).unwrap_err();
        assert_eq!(err.kind(), IndyErrorKind::LibraryLoading);
    }

    #[test]
    fn test_set_native_max_level() {
        let library = StaticLibrary::default()
            .with_symbol("indy_set_log_max_lvl", fake_set_log_max_lvl as usize);

        set_native_max_level(&library, LevelFilter::Debug).unwrap();
        assert_eq!(*MAX_LEVEL.lock().unwrap(), Some(4));
    }

    #[test]
    fn test_native_log_tolerates_bad_input() {
        native_log(ptr::null(), 9, ptr::null(), ptr::null(), ptr::null(), ptr::null(), 0);
        native_log(ptr::null(), 3, ptr::null(), ptr::null(), ptr::null(), ptr::null(), 0);
        assert!(!native_enabled(ptr::null(), 2, ptr::null()));
        native_flush(ptr::null());
    }

    #[test]
    fn test_panicking_logger_does_not_unwind_into_native_caller() {
        let target = CString::new("indy::wallet").unwrap();
        let message = CString::new("opened").unwrap();

        unsafe {
            assert!(!enabled_with(&PanickingLogger, 2, target.as_ptr()));
            log_with(
                &PanickingLogger,
                3,
                target.as_ptr(),
                message.as_ptr(),
                ptr::null(),
                ptr::null(),
                7,
            );
        }
        flush_with(&PanickingLogger);
    }
}
