use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};

use futures::channel::oneshot;
use indy_api_types::{errors::prelude::*, CommandHandle};

/// Producer half of a command completion. Consumed on resolution, so a slot can only ever be
/// resolved once.
#[derive(Debug)]
pub struct CompletionSlot<T> {
    command_handle: CommandHandle,
    sender: oneshot::Sender<IndyResult<T>>,
}

/// Consumer half: resolves to the result delivered to the matching [`CompletionSlot`].
///
/// Dropping it only means the caller stopped waiting. The pending entry stays registered
/// until the native completion arrives.
#[derive(Debug)]
#[must_use = "a command future does nothing unless awaited"]
pub struct CommandFuture<T> {
    command_handle: CommandHandle,
    receiver: oneshot::Receiver<IndyResult<T>>,
}

pub fn completion_slot<T>(command_handle: CommandHandle) -> (CompletionSlot<T>, CommandFuture<T>) {
    let (sender, receiver) = oneshot::channel();
    (
        CompletionSlot {
            command_handle,
            sender,
        },
        CommandFuture {
            command_handle,
            receiver,
        },
    )
}

impl<T> CompletionSlot<T> {
    pub fn command_handle(&self) -> CommandHandle {
        self.command_handle
    }

    /// Returns `false` if the caller already stopped waiting. The slot is resolved either way.
    pub fn resolve(self, result: IndyResult<T>) -> bool {
        let delivered = self.sender.send(result).is_ok();

        if !delivered {
            debug!(
                "CompletionSlot::resolve: caller of command {} is no longer waiting",
                self.command_handle
            );
        }

        delivered
    }
}

impl<T> CommandFuture<T> {
    pub fn command_handle(&self) -> CommandHandle {
        self.command_handle
    }
}

impl<T> Future for CommandFuture<T> {
    type Output = IndyResult<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let command_handle = self.command_handle;

        Pin::new(&mut self.receiver).poll(cx).map(|res| {
            res.map_err(IndyError::from)
                .map_err(|err| err.extend(format!("Command handle: {command_handle}")))
                .and_then(|res| res)
        })
    }
}

#[cfg(test)]
mod tests {
    use futures::{executor::block_on, FutureExt};

    use super::*;

    #[test]
    fn test_future_waits_for_resolution() {
        let (slot, mut future) = completion_slot::<String>(7);

        assert!((&mut future).now_or_never().is_none());
        assert!(slot.resolve(Ok("done".to_string())));

        assert_eq!(block_on(future).unwrap(), "done");
    }

    #[test]
    fn test_failure_is_delivered() {
        let (slot, future) = completion_slot::<()>(8);
        slot.resolve(Err(IndyError::from_native(
            IndyErrorKind::CommandFailed,
            113,
            "native failure",
        )));

        let err = block_on(future).unwrap_err();
        assert_eq!(err.kind(), IndyErrorKind::CommandFailed);
        assert_eq!(err.error_code(), 113);
    }

    #[test]
    fn test_resolve_after_caller_gave_up() {
        let (slot, future) = completion_slot::<bool>(9);
        drop(future);
        assert!(!slot.resolve(Ok(true)));
    }

    #[test]
    fn test_dropped_slot_fails_future() {
        let (slot, future) = completion_slot::<bool>(10);
        assert_eq!(future.command_handle(), 10);
        drop(slot);

        let err = block_on(future).unwrap_err();
        assert_eq!(err.kind(), IndyErrorKind::InvalidState);
    }
}
