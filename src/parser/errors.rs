// src/parser/errors.rs

use thiserror::Error;

/// Errors raised while building the argument tree or parsing a command line.
///
/// Build-time variants (`IdAlreadyRegistered`, `InvalidId`) signal programmer
/// mistakes in the tree definition; the remaining variants describe user
/// input and are meant to be printed as-is.
#[derive(Error, Debug)]
pub enum ArgumentParserError {
    #[error("Id \"{id}\" is already registered in \"{owner}\"")]
    IdAlreadyRegistered { id: String, owner: String },
    #[error("Invalid character '.' in argument id \"{0}\"")]
    InvalidId(String),
    #[error("\"{option}\" cannot be used together with {conflict}")]
    ConflictingArguments { option: String, conflict: String },
    #[error("Missing value for named argument \"{0}\"")]
    MissingValue(String),
    #[error("Unexpected value for named argument \"{0}\"")]
    ValueNotExpected(String),
    #[error("Too few values for positional argument \"{id}\" in command \"{command}\"")]
    FewValues { id: String, command: String },
    #[error("Unknown argument \"{argument}\" for command \"{command}\"")]
    UnknownArgument { argument: String, command: String },
    #[error("Missing command for \"{0}\"")]
    MissingCommand(String),
    #[error("\"{0}\" not found")]
    NotFound(String),
    #[error("Root command is not set")]
    RootCommandNotSet,
}

pub type ParserResult<T> = Result<T, ArgumentParserError>;
