use std::fmt::Display;
use std::fmt::Formatter;

/// The command verb of one backchannel request. Anything the library does
/// not implement parses as Unsupported and fails the request with the
/// functions-not-supported flag rather than an opaque error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Query,
    Ident,
    Enable,
    Disable,
    Remove,
    Unsupported(String),
}

impl From<&str> for Command {
    fn from(s: &str) -> Self {
        match s {
            "query" => Self::Query,
            "ident" => Self::Ident,
            "enable" => Self::Enable,
            "disable" => Self::Disable,
            "remove" => Self::Remove,
            other => Self::Unsupported(other.to_string()),
        }
    }
}

impl Display for Command {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Query => write!(f, "query"),
            Self::Ident => write!(f, "ident"),
            Self::Enable => write!(f, "enable"),
            Self::Disable => write!(f, "disable"),
            Self::Remove => write!(f, "remove"),
            Self::Unsupported(other) => write!(f, "{}", other),
        }
    }
}
