use std::{error, fmt, io};

/// Everything that can go wrong between a terminfo file and expanded bytes.
#[derive(Debug)]
pub enum Error {
    /// Malformed binary entry: bad magic, short read, impossible table sizes
    Format(&'static str),
    /// Malformed capability source: unbalanced conditionals, bad escapes
    Parse(&'static str),
    /// Stack underflow during execution
    Runtime(&'static str),
    /// Stack value of the wrong kind for a typed operation
    Type(&'static str),
    /// Too few parameters for the highest index the program references
    Range { needed: usize, got: usize },
    /// Entry name unknown to the database
    NotFound(String),
    /// No default terminal available
    Config(&'static str),
    Io(io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Format(msg) => write!(f, "malformed terminfo entry: {msg}"),
            Self::Parse(msg) => write!(f, "malformed capability string: {msg}"),
            Self::Runtime(msg) => write!(f, "execution failed: {msg}"),
            Self::Type(msg) => write!(f, "type mismatch: {msg}"),
            Self::Range { needed, got } => {
                write!(f, "program uses {needed} parameters, {got} given")
            }
            Self::NotFound(name) => write!(f, "no terminfo entry for `{name}`"),
            Self::Config(msg) => write!(f, "{msg}"),
            Self::Io(err) => err.fmt(f),
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Self::Io(err)
    }
}
