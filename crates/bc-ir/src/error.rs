//! Model construction errors.

/// Errors returned by the builder API.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    /// The owning file was already marked loaded
    #[error("cannot modify {0} after it has been loaded")]
    AlreadyLoaded(&'static str),
    /// An instrument index passed to the builder does not exist
    #[error("no instrument at index {0}")]
    NoSuchInstrument(usize),
}
