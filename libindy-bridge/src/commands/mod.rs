pub mod adapters;
pub mod callbacks;
pub mod pending;
pub mod slot;
pub mod timeout;

use std::sync::{Arc, PoisonError, RwLock};

use indy_api_types::{errors::prelude::*, CommandHandle, ErrorCode, RawErrorCode};

pub use self::{
    adapters::{AdapterCache, CallbackAdapter},
    callbacks::{
        BoolCallback, CallbackSignature, EmptyCallback, HandleCallback, SliceCallback,
        StringCallback, StringStringCallback,
    },
    pending::{PendingCommand, PendingCommands, ResolutionFailure},
    slot::{CommandFuture, CompletionSlot},
};
use crate::library::{self, NativeLibrary};

/// Submits commands to callback-based native entry points and hands back futures for their
/// completion.
///
/// The native trampolines resolve into the executor held by [`crate::Locator`], so that is the
/// only instance allowed to hand callbacks to native code. Other instances exist for tests.
pub struct CommandExecutor {
    pending_commands: Arc<PendingCommands>,
    adapters: AdapterCache,
    library: RwLock<Option<Arc<dyn NativeLibrary>>>,
}

impl CommandExecutor {
    pub(crate) fn new() -> CommandExecutor {
        let pending_commands = Arc::new(PendingCommands::new());

        CommandExecutor {
            adapters: AdapterCache::new(pending_commands.clone()),
            pending_commands,
            library: RwLock::new(None),
        }
    }

    pub fn pending_commands(&self) -> &Arc<PendingCommands> {
        &self.pending_commands
    }

    pub fn adapters(&self) -> &AdapterCache {
        &self.adapters
    }

    pub fn adapter<S: CallbackSignature>(&self) -> &'static CallbackAdapter<S> {
        self.adapters.get_or_create::<S>()
    }

    pub fn set_library(&self, library: Arc<dyn NativeLibrary>) {
        debug!("CommandExecutor::set_library: {library:?}");
        *self.library.write().unwrap_or_else(PoisonError::into_inner) = Some(library);
    }

    pub fn library(&self) -> IndyResult<Arc<dyn NativeLibrary>> {
        self.library
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or_else(|| {
                err_msg(
                    IndyErrorKind::InvalidState,
                    "Native library is not loaded, call init first",
                )
            })
    }

    /// Error details the native library recorded for the current thread, if any.
    pub fn current_error_details(&self) -> Option<ErrorDetails> {
        self.library()
            .ok()
            .and_then(|library| library::get_current_error(&*library))
    }

    /// Registers a slot, then calls `call` with the new handle and the adapter's native
    /// callback. `call` must invoke exactly one native entry point and return its status.
    ///
    /// A non-zero status means the native side will never complete the handle, so the slot
    /// is resolved here with that status and no entry is left behind.
    pub fn submit<S, F>(&self, adapter: &CallbackAdapter<S>, call: F) -> CommandFuture<S::Output>
    where
        S: CallbackSignature,
        F: FnOnce(CommandHandle, S::Callback) -> RawErrorCode,
    {
        let pending_commands = adapter.pending_commands();
        let (command_handle, future) = pending_commands.register::<S::Output>(S::DESCRIPTION);

        if !Arc::ptr_eq(pending_commands, &self.pending_commands) {
            error!(
                "submit: adapter for '{}' resolves into another table, command {command_handle} \
                 not sent",
                S::DESCRIPTION
            );
            pending_commands.resolve::<S::Output>(
                command_handle,
                Err(err_msg(
                    IndyErrorKind::InvalidState,
                    format!("Adapter for '{}' is not bound to this executor", S::DESCRIPTION),
                )),
            );
            return future;
        }

        trace!("submit > command_handle: {command_handle}, callback: {}", S::DESCRIPTION);

        let err = call(command_handle, adapter.native_callback());

        if !ErrorCode::is_success(err) {
            debug!("submit: command {command_handle} rejected with {err}");

            let rejection = IndyError::from_native(
                IndyErrorKind::CommandRejected,
                err,
                format!("Command {command_handle} rejected at submission with error {err}"),
            )
            .with_details(self.current_error_details());

            if !pending_commands.resolve::<S::Output>(command_handle, Err(rejection)) {
                warn!(
                    "submit: command {command_handle} was completed by the native library \
                     although it was rejected"
                );
            }
        }

        trace!("submit < command_handle: {command_handle}, err: {err}");
        future
    }

    /// [`CommandExecutor::submit`] through this executor's own adapter for `S`.
    pub fn execute<S, F>(&self, call: F) -> CommandFuture<S::Output>
    where
        S: CallbackSignature,
        F: FnOnce(CommandHandle, S::Callback) -> RawErrorCode,
    {
        self.submit(self.adapter::<S>(), call)
    }
}

impl std::fmt::Debug for CommandExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandExecutor")
            .field("pending_commands", &self.pending_commands.len())
            .field("adapters", &self.adapters)
            .finish_non_exhaustive()
    }
}
