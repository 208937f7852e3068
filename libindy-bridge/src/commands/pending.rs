use std::{
    any::{Any, TypeId},
    collections::{hash_map::Entry, HashMap},
    fmt,
    sync::{
        atomic::{AtomicI32, AtomicUsize, Ordering},
        Mutex,
    },
};

use indy_api_types::{errors::prelude::*, CommandHandle};
use thiserror::Error as ThisError;

use super::slot::{completion_slot, CommandFuture, CompletionSlot};

/// Why a completion could not be delivered.
#[derive(Copy, Clone, Eq, PartialEq, Debug, ThisError)]
pub enum ResolutionFailure {
    #[error("no pending command with handle {0} (never registered or already completed)")]
    UnknownHandle(CommandHandle),
    #[error(
        "command {handle} was registered for '{expected}' but completed through another callback"
    )]
    SignatureMismatch {
        handle: CommandHandle,
        expected: &'static str,
    },
}

trait ErasedSlot: Send {
    fn fail(self: Box<Self>, err: IndyError);

    fn into_any(self: Box<Self>) -> Box<dyn Any + Send>;
}

impl<T: Send + 'static> ErasedSlot for CompletionSlot<T> {
    fn fail(self: Box<Self>, err: IndyError) {
        self.resolve(Err(err));
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any + Send> {
        self
    }
}

/// Table entry: a completion slot whose payload type is only known to the adapter that will
/// resolve it.
pub struct PendingCommand {
    signature: &'static str,
    output: TypeId,
    slot: Box<dyn ErasedSlot>,
}

impl PendingCommand {
    pub fn new<T: Send + 'static>(signature: &'static str, slot: CompletionSlot<T>) -> Self {
        PendingCommand {
            signature,
            output: TypeId::of::<T>(),
            slot: Box::new(slot),
        }
    }

    pub fn signature(&self) -> &'static str {
        self.signature
    }

    pub fn fail(self, err: IndyError) {
        self.slot.fail(err)
    }

    fn into_slot<T: Send + 'static>(self) -> Result<CompletionSlot<T>, PendingCommand> {
        if self.output != TypeId::of::<T>() {
            return Err(self);
        }

        let signature = self.signature;
        let output = self.output;

        match self.slot.into_any().downcast::<CompletionSlot<T>>() {
            Ok(slot) => Ok(*slot),
            // the type id check above makes this unreachable, but stay total
            Err(_) => Err(PendingCommand {
                signature,
                output,
                slot: Box::new(OrphanSlot),
            }),
        }
    }
}

struct OrphanSlot;

impl ErasedSlot for OrphanSlot {
    fn fail(self: Box<Self>, err: IndyError) {
        error!("OrphanSlot::fail: dropping error without a waiting caller: {err}");
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any + Send> {
        self
    }
}

impl fmt::Debug for PendingCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingCommand")
            .field("signature", &self.signature)
            .finish_non_exhaustive()
    }
}

/// Process-wide registry of commands submitted to the native library and not yet completed.
///
/// Insertion happens on the submitting thread, resolution on whatever thread the native
/// library completes on, so every mutation goes through the inner mutex. The table owns the
/// handle counter too, which keeps handle issuance and registration consistent.
#[derive(Debug)]
pub struct PendingCommands {
    next_handle: AtomicI32,
    commands: Mutex<HashMap<CommandHandle, PendingCommand>>,
    protocol_violations: AtomicUsize,
}

impl Default for PendingCommands {
    fn default() -> Self {
        PendingCommands::new()
    }
}

impl PendingCommands {
    pub fn new() -> PendingCommands {
        PendingCommands::with_first_handle(1)
    }

    pub(crate) fn with_first_handle(first: CommandHandle) -> PendingCommands {
        PendingCommands {
            next_handle: AtomicI32::new(first.max(1)),
            commands: Mutex::new(HashMap::new()),
            protocol_violations: AtomicUsize::new(0),
        }
    }

    /// Issues the next correlation handle. Handles are always positive and wrap back to 1.
    pub fn next_handle(&self) -> CommandHandle {
        let res = self
            .next_handle
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |handle| {
                Some(if handle >= CommandHandle::MAX {
                    1
                } else {
                    handle + 1
                })
            });

        match res {
            Ok(handle) | Err(handle) => handle,
        }
    }

    /// Allocates a handle that is not currently pending and registers a fresh slot for it.
    pub fn register<T: Send + 'static>(
        &self,
        signature: &'static str,
    ) -> (CommandHandle, CommandFuture<T>) {
        loop {
            let command_handle = self.next_handle();
            let mut commands = lock!(self.commands);

            if let Entry::Vacant(entry) = commands.entry(command_handle) {
                let (slot, future) = completion_slot::<T>(command_handle);
                entry.insert(PendingCommand::new(signature, slot));
                trace!("register < command_handle: {command_handle}, signature: {signature}");
                return (command_handle, future);
            }

            warn!("register: handle {command_handle} is still pending after wrap, skipping");
        }
    }

    pub fn insert(&self, command_handle: CommandHandle, command: PendingCommand) -> IndyResult<()> {
        match lock!(self.commands).entry(command_handle) {
            Entry::Occupied(_) => Err(err_msg(
                IndyErrorKind::InvalidState,
                format!("Command handle {command_handle} is already pending"),
            )),
            Entry::Vacant(entry) => {
                entry.insert(command);
                Ok(())
            }
        }
    }

    /// Removes the entry for `command_handle` whatever its payload type.
    pub fn take(&self, command_handle: CommandHandle) -> Option<PendingCommand> {
        lock!(self.commands).remove(&command_handle)
    }

    /// Resolves and removes the entry for `command_handle`.
    ///
    /// Returns `false` on a protocol violation. An unknown or already completed handle
    /// touches nothing. A handle registered for another payload type is removed and its
    /// caller is failed instead of being left to wait forever.
    pub fn resolve<T: Send + 'static>(
        &self,
        command_handle: CommandHandle,
        result: IndyResult<T>,
    ) -> bool {
        match self.take_slot::<T>(command_handle) {
            Ok(slot) => {
                slot.resolve(result);
                true
            }
            Err(failure) => {
                self.report_violation(failure);
                false
            }
        }
    }

    fn take_slot<T: Send + 'static>(
        &self,
        command_handle: CommandHandle,
    ) -> Result<CompletionSlot<T>, ResolutionFailure> {
        let command = self
            .take(command_handle)
            .ok_or(ResolutionFailure::UnknownHandle(command_handle))?;

        command.into_slot::<T>().map_err(|command| {
            let failure = ResolutionFailure::SignatureMismatch {
                handle: command_handle,
                expected: command.signature(),
            };
            command.fail(err_msg(IndyErrorKind::ProtocolViolation, failure.to_string()));
            failure
        })
    }

    fn report_violation(&self, failure: ResolutionFailure) {
        let total = self.protocol_violations.fetch_add(1, Ordering::SeqCst) + 1;
        error!("Callback protocol violation: {failure} (violations so far: {total})");
    }

    pub fn contains(&self, command_handle: CommandHandle) -> bool {
        lock!(self.commands).contains_key(&command_handle)
    }

    pub fn len(&self) -> usize {
        lock!(self.commands).len()
    }

    pub fn is_empty(&self) -> bool {
        lock!(self.commands).is_empty()
    }

    pub fn protocol_violations(&self) -> usize {
        self.protocol_violations.load(Ordering::SeqCst)
    }
}
