pub mod ctypes;

#[cfg(test)]
pub(crate) mod test_library;

/// Locks a std mutex, recovering the guard if a previous holder panicked.
macro_rules! lock {
    ($mutex:expr) => {
        $mutex
            .lock()
            .unwrap_or_else(::std::sync::PoisonError::into_inner)
    };
}
