/// Error reported by an [`ExternalModel`](crate::neighbors::ExternalModel)
/// collaborator. This is forwarded to the caller unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalModelError {
    /// Status code returned by the external model
    pub code: i32,
    /// Human readable description of the error
    pub message: String,
}

impl std::fmt::Display for ExternalModelError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (code {})", self.message, self.code)
    }
}

impl std::error::Error for ExternalModelError {}

#[non_exhaustive]
#[derive(Debug)]
pub enum Error {
    /// Got an invalid parameter value in a function
    InvalidParameter(String),
    /// Error while serializing/deserializing data
    Json(serde_json::Error),
    /// A query was attempted on a neighbor list that must be rebuilt first
    StaleList(String),
    /// The output buffers given to a query are too small to hold all the
    /// neighbors of the particle
    CapacityExceeded {
        /// number of entries the query needed to write
        required: usize,
        /// number of entries still available in the buffers
        capacity: usize,
    },
    /// The periodic cell has zero (or negative) volume
    DegenerateCell(String),
    /// The external model failed
    ExternalModel(ExternalModelError),
    /// Internal inconsistency in this library
    Internal(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::InvalidParameter(e) => write!(f, "invalid parameter: {}", e),
            Error::Json(e) => write!(f, "json error: {}", e),
            Error::StaleList(e) => write!(f, "stale neighbor list: {}", e),
            Error::CapacityExceeded { required, capacity } => write!(f,
                "neighbor buffers are too small: need {} entries, but only {} are available",
                required, capacity
            ),
            Error::DegenerateCell(e) => write!(f, "degenerate cell: {}", e),
            Error::ExternalModel(e) => write!(f, "external model error: {}", e),
            Error::Internal(e) => write!(f, "internal error: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::InvalidParameter(_) |
            Error::StaleList(_) |
            Error::CapacityExceeded { .. } |
            Error::DegenerateCell(_) |
            Error::Internal(_) => None,
            Error::Json(e) => Some(e),
            Error::ExternalModel(e) => Some(e),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Error {
        Error::Json(error)
    }
}

impl From<ExternalModelError> for Error {
    fn from(error: ExternalModelError) -> Error {
        Error::ExternalModel(error)
    }
}
