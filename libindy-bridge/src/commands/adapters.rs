use std::{
    any::{Any, TypeId},
    collections::HashMap,
    fmt,
    marker::PhantomData,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

use indy_api_types::{errors::prelude::*, CommandHandle};

use super::{callbacks::CallbackSignature, pending::PendingCommands};

/// Native-callable completion target for one callback layout.
///
/// The function pointer handed to native code is `S::native_callback()`. Native completions
/// through it always reach the adapter cached by the executor in [`crate::Locator`], so only
/// that executor's adapters are ever given to native code.
pub struct CallbackAdapter<S: CallbackSignature> {
    pending_commands: Arc<PendingCommands>,
    invocations: AtomicUsize,
    unmatched: AtomicUsize,
    _signature: PhantomData<fn() -> S>,
}

impl<S: CallbackSignature> CallbackAdapter<S> {
    fn new(pending_commands: Arc<PendingCommands>) -> Self {
        CallbackAdapter {
            pending_commands,
            invocations: AtomicUsize::new(0),
            unmatched: AtomicUsize::new(0),
            _signature: PhantomData,
        }
    }

    pub fn native_callback(&self) -> S::Callback {
        S::native_callback()
    }

    pub fn description(&self) -> &'static str {
        S::DESCRIPTION
    }

    pub fn pending_commands(&self) -> &Arc<PendingCommands> {
        &self.pending_commands
    }

    /// Delivers a decoded completion to the caller waiting on `command_handle`.
    pub fn complete(&self, command_handle: CommandHandle, result: IndyResult<S::Output>) -> bool {
        self.invocations.fetch_add(1, Ordering::SeqCst);

        let delivered = self
            .pending_commands
            .resolve::<S::Output>(command_handle, result);

        if !delivered {
            self.unmatched.fetch_add(1, Ordering::SeqCst);
            error!(
                "CallbackAdapter::complete: completion for handle {command_handle} through '{}' \
                 matched no waiting caller",
                S::DESCRIPTION
            );
        }

        delivered
    }

    pub fn invocations(&self) -> usize {
        self.invocations.load(Ordering::SeqCst)
    }

    pub fn unmatched(&self) -> usize {
        self.unmatched.load(Ordering::SeqCst)
    }
}

impl<S: CallbackSignature> fmt::Debug for CallbackAdapter<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackAdapter")
            .field("signature", &S::DESCRIPTION)
            .field("invocations", &self.invocations())
            .field("unmatched", &self.unmatched())
            .finish()
    }
}

/// One adapter per callback layout, created on first use and never evicted.
///
/// Adapters are leaked into `'static` storage: native code may complete a command through
/// them at any point until the process exits, and the C API has no way to unregister.
pub struct AdapterCache {
    pending_commands: Arc<PendingCommands>,
    adapters: Mutex<HashMap<TypeId, &'static (dyn Any + Send + Sync)>>,
}

impl AdapterCache {
    pub(crate) fn new(pending_commands: Arc<PendingCommands>) -> AdapterCache {
        AdapterCache {
            pending_commands,
            adapters: Mutex::new(HashMap::new()),
        }
    }

    pub fn get_or_create<S: CallbackSignature>(&self) -> &'static CallbackAdapter<S> {
        let mut adapters = lock!(self.adapters);

        let cached = adapters
            .get(&TypeId::of::<S>())
            .copied()
            .and_then(|adapter| adapter.downcast_ref::<CallbackAdapter<S>>());

        if let Some(adapter) = cached {
            return adapter;
        }

        debug!("AdapterCache: creating adapter for '{}'", S::DESCRIPTION);

        let adapter: &'static CallbackAdapter<S> =
            Box::leak(Box::new(CallbackAdapter::new(self.pending_commands.clone())));
        adapters.insert(TypeId::of::<S>(), adapter);
        adapter
    }

    pub fn len(&self) -> usize {
        lock!(self.adapters).len()
    }

    pub fn is_empty(&self) -> bool {
        lock!(self.adapters).is_empty()
    }
}

impl fmt::Debug for AdapterCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdapterCache")
            .field("adapters", &self.len())
            .finish_non_exhaustive()
    }
}
