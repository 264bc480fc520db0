use std::fmt;
use thiserror::Error as ThisError;

/// Why a property path could not be resolved to a unique location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NavigationErrorKind {
    PathNotFound,
    NotACollection,
    NotASingleton,
    IndexOutOfRange,
}

impl fmt::Display for NavigationErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            NavigationErrorKind::PathNotFound => "PathNotFound",
            NavigationErrorKind::NotACollection => "NotACollection",
            NavigationErrorKind::NotASingleton => "NotASingleton",
            NavigationErrorKind::IndexOutOfRange => "IndexOutOfRange",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    PathSyntax,
    Navigation(NavigationErrorKind),
    TypeMismatch,
    ConstraintSyntax,
    UnknownProperty,
    DuplicateIdentifier,
    RecordNotFound,
    InvalidPagingParameter,
    InvalidArgument,
    InvalidState,
    Document,
    Config,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ErrorKind::Navigation(nav) => write!(f, "Navigation({})", nav),
            other => write!(f, "{:?}", other),
        }
    }
}

#[derive(Debug, Clone, ThisError)]
#[error("{kind}: {context}")]
pub struct Error {
    pub kind: ErrorKind,
    pub context: String,
}

impl Error {
    pub fn new(kind: ErrorKind, context: String) -> Self {
        Error { kind, context }
    }

    pub fn navigation(kind: NavigationErrorKind, context: String) -> Self {
        Error::new(ErrorKind::Navigation(kind), context)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// True when the error is a navigation failure of the given kind.
    pub fn is_navigation(&self, kind: NavigationErrorKind) -> bool {
        self.kind == ErrorKind::Navigation(kind)
    }

    /// Prefix the context with the action or record the error happened in.
    pub fn within(mut self, scope: &str) -> Self {
        self.context = format!("{}: {}", scope, self.context);
        self
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error {
            kind: ErrorKind::Document,
            context: err.to_string(),
        }
    }
}

impl From<::config::ConfigError> for Error {
    fn from(err: ::config::ConfigError) -> Self {
        Error {
            kind: ErrorKind::Config,
            context: err.to_string(),
        }
    }
}

impl From<regex::Error> for Error {
    fn from(err: regex::Error) -> Self {
        Error {
            kind: ErrorKind::ConstraintSyntax,
            context: format!("Invalid pattern: {}", err),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
