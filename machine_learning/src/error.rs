use std::{
    error::Error,
    fmt::{self, Display},
};

/// The result type used in the entire machine learning module.
pub type Result<T> = std::result::Result<T, MlErr>;

/// The machine learning module's error type.
#[derive(Debug)]
pub enum MlErr {
    SizeMismatch {
        what: &'static str,
        got: usize,
        expected: usize,
    },
    InvalidInput(String),
    StateMismatch {
        expected: &'static str,
        got: &'static str,
    },
    MissingForwardPass,
}

impl Display for MlErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MlErr::SizeMismatch {
                what,
                got,
                expected,
            } => format!("There's a size mismatch in {what}, got {got} and expected {expected}"),
            MlErr::InvalidInput(detail) => format!("Invalid input: {detail}"),
            MlErr::StateMismatch { expected, got } => {
                format!("Tried to load a {got} state into a {expected} optimizer")
            }
            MlErr::MissingForwardPass => {
                "Tried to backpropagate without a cached forward pass, is the model in train mode?"
                    .to_string()
            }
        };

        write!(f, "{s}")
    }
}

impl Error for MlErr {}
