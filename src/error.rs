use std::fmt::Display;

#[derive(Debug)]
pub enum Error {
    /// A mapped method declaration is invalid (duplicate roles, empty
    /// indices, duplicate registration). Raised at build/registration
    /// time, never mid-call.
    Config(String),
    /// The runtime argument list does not match the method's parameter
    /// metadata.
    ArgumentMismatch { method: String, position: usize },
    Serialize(String),
    /// A strategy could not build a query expression from the condition.
    QueryBuild(String),
    /// A capability payload on the condition object is malformed.
    Augmentation {
        capability: &'static str,
        condition: &'static str,
        reason: String,
    },
    Transport(String),
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Config(msg) => write!(f, "Configuration error: {}", msg),
            Error::ArgumentMismatch { method, position } => {
                write!(
                    f,
                    "Argument mismatch: method `{}` has no matching argument at position {}",
                    method, position
                )
            }
            Error::Serialize(msg) => write!(f, "Serialization error: {}", msg),
            Error::QueryBuild(msg) => write!(f, "Query build error: {}", msg),
            Error::Augmentation {
                capability,
                condition,
                reason,
            } => write!(
                f,
                "Augmentation error in `{}` of condition `{}`: {}",
                capability, condition, reason
            ),
            Error::Transport(msg) => write!(f, "Transport error: {}", msg),
        }
    }
}

impl std::error::Error for Error {}
