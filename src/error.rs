use std::fmt;

/// Why a tree operation was rejected. The tree is unchanged in every case.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Error {
    /// A node could not be allocated.
    Alloc,
    /// A value was supplied to a tree built without a value descriptor.
    MissingValueType,
}

impl Error {
    /// Numeric status: always `-1`.
    #[inline]
    pub fn code(self) -> i32 {
        -1
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Alloc => f.write_str("node allocation failed"),
            Error::MissingValueType => {
                f.write_str("value supplied but the tree has no value descriptor")
            }
        }
    }
}

impl std::error::Error for Error {}
