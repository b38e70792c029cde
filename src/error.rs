use thiserror::Error;

/// Rejected input: a seed list, a configuration, or a parameter update.
///
/// Returned before any state is touched, so the engine keeps whatever it
/// held before the call.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("node `{id}` has a negative magnitude ({magnitude})")]
    NegativeMagnitude { id: String, magnitude: f64 },

    #[error("node `{id}` has a non-finite magnitude")]
    NonFiniteMagnitude { id: String },

    #[error("duplicate node id `{0}`")]
    DuplicateId(String),

    #[error("node ids must not be empty")]
    EmptyId,

    #[error("invalid radius range [{min}, {max}]")]
    InvalidRadiusRange { min: f64, max: f64 },

    #[error("invalid value for `{name}`: {value}")]
    InvalidParameter { name: &'static str, value: f64 },
}

/// A well-formed request that does not apply to the current node set or
/// drag state.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InvalidOperation {
    #[error("no node with id `{0}` in the current simulation")]
    UnknownNode(String),

    #[error("already dragging `{active}`, cannot start dragging `{requested}`")]
    AlreadyDragging { active: String, requested: String },

    #[error("node `{0}` is not being dragged by this controller")]
    NotDragging(String),

    #[error("non-finite point for node `{0}`")]
    NonFinitePoint(String),

    #[error("drag of `{0}` started before the node set was replaced")]
    StaleDrag(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    InvalidOperation(#[from] InvalidOperation),
}

pub type SimResult<T> = Result<T, SimError>;
