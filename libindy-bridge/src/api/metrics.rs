use indy_api_types::{errors::prelude::*, CommandHandle, RawErrorCode};

use crate::{
    commands::callbacks::{StringCB, StringCallback},
    library::entry_point,
    Locator,
};

type CollectMetricsFn =
    unsafe extern "C" fn(command_handle: CommandHandle, cb: Option<StringCB>) -> RawErrorCode;

/// Collect metrics.
///
/// #Returns
/// Map in the JSON format. Where keys are names of metrics. Returned as libindy produced it.
///
/// #Errors
/// CommandRejected, CommandFailed, Timeout (when `command_timeout_secs` is configured)
///
/// With `command_timeout_secs` configured the returned future must be awaited inside a tokio
/// runtime with the time driver enabled, otherwise awaiting it panics.
pub async fn collect_metrics() -> IndyResult<String> {
    debug!("collect_metrics >");

    let locator = Locator::instance();
    let library = locator.executor.library()?;

    let collect_metrics: CollectMetricsFn =
        unsafe { entry_point(&*library, "indy_collect_metrics")? };

    let res = locator
        .executor
        .execute::<StringCallback, _>(|command_handle, cb| {
            trace!("collect_metrics: command_handle: {command_handle}");
            unsafe { collect_metrics(command_handle, Some(cb)) }
        })
        .with_optional_timeout(locator.command_timeout())
        .await;

    debug!("collect_metrics < ok: {}", res.is_ok());
    res
}
