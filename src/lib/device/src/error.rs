use core::fmt;

use oreboot_fdt::FdtError;

/// Driver model error kind, shared by the core, uclasses and drivers
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    /// No driver matches the node; nothing was bound
    NoMatch,
    /// The driver's operations table lacks the requested capability
    NotImplemented,
    /// The hardware description breaks a structural expectation
    InvalidConfig,
    /// A caller-supplied value is out of range
    InvalidArgument,
    /// Storage for a device or its private data could not be allocated
    OutOfMemory,
    /// Another device in the uclass already claims this identity
    DuplicateIdentity,
    /// Probing a device transitively requires probing itself
    CircularDependency,
    /// The device is in use
    Busy,
    /// The operation is refused for this device
    PermissionDenied,
    /// A hardware polling loop ran out of time
    HardwareTimeout,
    /// The hardware is not ready yet; retry
    TryAgain,
    /// The requested device does not exist
    NotFound,
    /// The device still has children
    HasChildren,
    /// The device still has activated children
    HasActiveChildren,
    /// The device is not in a state that allows the operation
    InvalidState,
    /// No uclass descriptor is registered for this id
    UnknownUclass,
    /// A driver's operations table belongs to a different uclass
    OpsMismatch,
    /// A pin name is not known to the pin controller
    UnknownPin,
    /// A pin group name is not known to the pin controller
    UnknownGroup,
}

impl ErrorKind {
    /// Errors a best-effort disable may ignore
    pub fn is_benign_disable(&self) -> bool {
        matches!(
            self,
            Self::NotImplemented | Self::PermissionDenied | Self::Busy
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoMatch => write!(f, "no matching driver"),
            Self::NotImplemented => write!(f, "the function is unimplemented"),
            Self::InvalidConfig => write!(f, "invalid hardware description"),
            Self::InvalidArgument => write!(f, "invalid argument"),
            Self::OutOfMemory => write!(f, "out of memory"),
            Self::DuplicateIdentity => write!(f, "duplicate device identity"),
            Self::CircularDependency => write!(f, "circular probe dependency"),
            Self::Busy => write!(f, "device busy"),
            Self::PermissionDenied => write!(f, "permission denied"),
            Self::HardwareTimeout => write!(f, "hardware timeout"),
            Self::TryAgain => write!(f, "try again"),
            Self::NotFound => write!(f, "no such device"),
            Self::HasChildren => write!(f, "device has children"),
            Self::HasActiveChildren => write!(f, "device has active children"),
            Self::InvalidState => write!(f, "invalid device state"),
            Self::UnknownUclass => write!(f, "unknown uclass"),
            Self::OpsMismatch => write!(f, "operations table does not match uclass"),
            Self::UnknownPin => write!(f, "unknown pin"),
            Self::UnknownGroup => write!(f, "unknown pin group"),
        }
    }
}

impl From<FdtError> for ErrorKind {
    fn from(_: FdtError) -> Self {
        Self::InvalidConfig
    }
}

pub type Result<T> = core::result::Result<T, ErrorKind>;
