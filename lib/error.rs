//! Error taxonomy of the virtual filesystem.

use onelake_api::OneLakeError;
use thiserror::Error;

/// Every way a filesystem operation can fail.
#[derive(Debug, Error)]
pub enum FsError {
    /// The URI is not a OneLake address, or names a reserved dot-segment.
    #[error("invalid OneLake address '{0}'")]
    InvalidAddress(String),

    /// Nothing exists at this URI.
    #[error("'{0}' not found")]
    NotFound(String),

    /// The remote client is not authenticated yet.
    #[error("OneLake connection is not ready")]
    NotReady,

    /// Every mutation ends here.
    #[error("'{0}' is read-only")]
    ReadOnlyViolation(String),

    /// The operation is meaningless for this kind of node.
    #[error("operation not supported on '{0}'")]
    UnsupportedOperation(String),

    /// The remote call failed.
    #[error("remote API error")]
    Remote(#[from] OneLakeError),
}

impl FsError {
    /// Whether this error means "does not exist" to the host.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::InvalidAddress(_) | Self::NotFound(_) => true,
            Self::Remote(e) => e.is_not_found(),
            Self::NotReady
            | Self::ReadOnlyViolation(_)
            | Self::UnsupportedOperation(_) => false,
        }
    }
}

impl From<&FsError> for i32 {
    fn from(e: &FsError) -> Self {
        match e {
            FsError::InvalidAddress(_) | FsError::NotFound(_) => libc::ENOENT,
            FsError::NotReady => libc::EAGAIN,
            FsError::ReadOnlyViolation(_) => libc::EROFS,
            FsError::UnsupportedOperation(_) => libc::EISDIR,
            FsError::Remote(OneLakeError::NotInitialized) => libc::EAGAIN,
            FsError::Remote(remote) => match remote.status() {
                Some(404) => libc::ENOENT,
                Some(401 | 403) => libc::EACCES,
                _ => libc::EIO,
            },
        }
    }
}

impl From<FsError> for i32 {
    fn from(e: FsError) -> Self {
        Self::from(&e)
    }
}

impl From<FsError> for std::io::Error {
    fn from(e: FsError) -> Self {
        let errno = i32::from(&e);
        Self::new(Self::from_raw_os_error(errno).kind(), e)
    }
}
