use thiserror::Error;

/// Failure taxonomy shared by every layer of the crate.
///
/// The codec layers surface these unchanged; the only bounded recovery
/// happens in [`crate::manager::BootEntryManager::read_order`], which maps a
/// missing ordering variable to an empty list.
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed binary input, bad text grammar, or a bad argument value.
    #[error("invalid data: {0}")]
    Invalid(String),

    /// Device path text parsed, but only by degrading an unrecognised typed
    /// node into a file-path node. Almost always user error.
    #[error("implausible device path text: {0:?} looks like an unrecognised typed node")]
    Implausible(String),

    /// The firmware variable does not exist.
    #[error("variable {0} not found")]
    NotFound(String),

    /// All 65536 indices of the requested entry class are in use.
    #[error("no free entry index left")]
    NoSpace,

    /// Privilege acquisition failed, or the firmware refused the write.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// The backend cannot access firmware variables at all.
    #[error("unsupported: {0}")]
    Unsupported(&'static str),

    /// Any other backend transport failure.
    #[error("I/O error")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Error::Invalid(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
