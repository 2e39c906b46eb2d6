use core::fmt;

/// Errors raised while importing or decoding a hardware description
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FdtError {
    /// The flattened blob could not be parsed
    BadBlob,
    /// The blob has no root node
    MissingRoot,
}

impl fmt::Display for FdtError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadBlob => write!(f, "malformed devicetree blob"),
            Self::MissingRoot => write!(f, "devicetree has no root node"),
        }
    }
}
