use std::time::Duration;

use indy_api_types::errors::prelude::*;

use super::slot::CommandFuture;

impl<T> CommandFuture<T> {
    /// Stops waiting after `timeout`. The pending entry is left alone: the native library has
    /// no way to cancel, and its completion must still find the entry when it arrives.
    ///
    /// Must be awaited inside a tokio runtime with the time driver enabled.
    pub async fn with_timeout(self, timeout: Duration) -> IndyResult<T> {
        let command_handle = self.command_handle();

        match tokio::time::timeout(timeout, self).await {
            Ok(res) => res,
            Err(_) => {
                warn!("with_timeout: command {command_handle} did not complete within {timeout:?}");
                Err(err_msg(
                    IndyErrorKind::Timeout,
                    format!("Command {command_handle} did not complete within {timeout:?}"),
                ))
            }
        }
    }

    pub async fn with_optional_timeout(self, timeout: Option<Duration>) -> IndyResult<T> {
        match timeout {
            Some(timeout) => self.with_timeout(timeout).await,
            None => self.await,
        }
    }
}
