use std::error::Error;
use std::fmt::{self, Display, Formatter};

/// Top-level error of the encoding engine. Invariant violations inside the
/// core are programmer errors and panic instead; only input validation and
/// startup configuration surface as values.
#[derive(Debug, Clone, PartialEq)]
pub enum CsxError {
    Config(ConfigError),
    Input(InputError),
}

impl Error for CsxError {}

impl Display for CsxError {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "{e}"),
            Self::Input(e) => write!(f, "{e}"),
        }
    }
}

impl From<ConfigError> for CsxError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<InputError> for CsxError {
    fn from(e: InputError) -> Self {
        Self::Input(e)
    }
}

/// Unusable startup configuration; fatal before any work is done.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidInteger(&'static str, String),
    InvalidFloat(&'static str, String),
    UnknownOrderId(usize),
    MalformedDeltaList(String),
    EmptyCpuList,
}

impl Error for ConfigError {}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Self::InvalidInteger(var, s) => write!(f, "{var}: '{s}' is not a number"),
            Self::InvalidFloat(var, s) => write!(f, "{var}: '{s}' is not a float"),
            Self::UnknownOrderId(id) => write!(f, "unknown iteration order id: {id}"),
            Self::MalformedDeltaList(s) => write!(f, "malformed delta list: '{s}'"),
            Self::EmptyCpuList => write!(f, "empty CPU list"),
        }
    }
}

/// Malformed matrix input at the CSR boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputError {
    RowPtrLength { expected: usize, found: usize },
    RowPtrNotMonotone { row: usize },
    BadIndexBase { expected: usize, found: usize },
    NonzeroCountMismatch { expected: usize, found: usize },
    ColumnOutOfBounds { row: usize, col: usize },
}

impl Error for InputError {}

impl Display for InputError {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Self::RowPtrLength { expected, found } => {
                write!(f, "row pointer length {found}, expected {expected}")
            }
            Self::RowPtrNotMonotone { row } => {
                write!(f, "row pointers decrease at row {row}")
            }
            Self::BadIndexBase { expected, found } => {
                write!(f, "row pointers start at {found}, expected {expected}")
            }
            Self::NonzeroCountMismatch { expected, found } => {
                write!(f, "nonzero count {found}, expected {expected}")
            }
            Self::ColumnOutOfBounds { row, col } => {
                write!(f, "column {col} out of bounds in row {row}")
            }
        }
    }
}
