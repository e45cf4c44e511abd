use thiserror::Error;

/// A value offered for storage had no disposal capability.
///
/// Returned by [`DisposableMap::set`](crate::DisposableMap::set),
/// [`DisposableMap::add`](crate::DisposableMap::add) and
/// [`DisposableMap::try_from_entries`](crate::DisposableMap::try_from_entries)
/// before any mutation happens.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Error)]
#[error("value must have a dispose() method")]
pub struct InvalidValueError;
