use std::{convert::From, fmt};

/// Simple custom Error for the assembler. Problems inside individual source lines are
/// reported through [`LineError`] instead; this type covers everything around a run.
pub struct Error {
    pub kind: ErrorKind,
    pub msg: String,
}

#[derive(Debug, PartialEq)]
pub enum ErrorKind {
    /// the source assembled, but one or more lines contain errors
    Syntax,
    /// underlying io error
    IO,
    /// catch-all for other errors
    General,
}

impl Error {
    pub fn new(kind: ErrorKind, message: &str) -> Error {
        Error {
            kind,
            msg: String::from(message),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self { Error::new(ErrorKind::IO, e.to_string().as_str()) }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result { write!(f, "{}: {}", red!("asm::Error"), self.msg) }
}
impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result { write!(f, "{}", self.msg) }
}
impl std::error::Error for Error {}

/// Every message written into the listing in place of a broken line starts with this.
pub const ERROR_MARKER: &str = "ERROR";

/// The field of an instruction line that an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Param {
    Mnemonic,
    Source,
    Destination,
}
impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            Param::Mnemonic => "mnemonic",
            Param::Source => "source",
            Param::Destination => "destination",
        })
    }
}

/// What a symbol was declared as; only used to word duplicate-definition errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    Label,
    Constant,
}

/// A problem confined to a single source line. The line is replaced in the listing by the
/// rendered message and the run carries on with the next line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineError {
    DuplicateSymbol(String, SymbolKind),
    InvalidLabelPosition(String),
    InvalidLabelCharacter(String),
    ReservedWordAsLabel(String),
    MissingOperand(Param),
    MalformedOpcode(String),
    ByteOperation(String),
    UnknownInstruction(String),
    InvalidOperandSyntax(Param),
    ValueOutOfRange(String),
    JumpOutOfRange(String),
    UnresolvedSymbol(String),
    UnrecognizedSyntax,
}

impl fmt::Display for LineError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} - ", ERROR_MARKER)?;
        match self {
            LineError::DuplicateSymbol(name, SymbolKind::Label) => {
                write!(f, "duplicate definition of label '{}'.", name)
            }
            LineError::DuplicateSymbol(name, SymbolKind::Constant) => {
                write!(f, "duplicate definition of constant '{}'.", name)
            }
            LineError::InvalidLabelPosition(name) => write!(f, "label '{}' does not begin in column 1.", name),
            LineError::InvalidLabelCharacter(name) => {
                if name.starts_with(|c: char| c.is_ascii_alphabetic()) {
                    write!(f, "label '{}' contains invalid characters.", name)
                } else {
                    write!(f, "label '{}' must begin with a letter.", name)
                }
            }
            LineError::ReservedWordAsLabel(name) => write!(f, "reserved word '{}' used as a label.", name),
            LineError::MissingOperand(Param::Mnemonic) => write!(f, "missing mnemonic."),
            LineError::MissingOperand(param) => write!(f, "missing {} parameter.", param),
            LineError::MalformedOpcode(op) => write!(f, "malformed operator '{}'.", op),
            LineError::ByteOperation(op) => write!(f, "byte operation not supported by '{}'.", op),
            LineError::UnknownInstruction(op) => write!(f, "unknown instruction '{}'.", op),
            LineError::InvalidOperandSyntax(param) => write!(f, "Invalid {} parameter syntax.", param),
            LineError::ValueOutOfRange(text) => write!(f, "value '{}' out of range.", text),
            LineError::JumpOutOfRange(target) => write!(f, "jump to '{}' out of range.", target),
            LineError::UnresolvedSymbol(name) => write!(f, "undefined label '{}'.", name),
            LineError::UnrecognizedSyntax => write!(f, "unrecognized syntax."),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn messages() {
        assert_eq!(
            LineError::DuplicateSymbol("X".to_string(), SymbolKind::Label).to_string(),
            "ERROR - duplicate definition of label 'X'."
        );
        assert_eq!(
            LineError::InvalidOperandSyntax(Param::Destination).to_string(),
            "ERROR - Invalid destination parameter syntax."
        );
        assert_eq!(
            LineError::InvalidLabelCharacter("1ABC".to_string()).to_string(),
            "ERROR - label '1ABC' must begin with a letter."
        );
        assert_eq!(
            LineError::InvalidLabelCharacter("AB$C".to_string()).to_string(),
            "ERROR - label 'AB$C' contains invalid characters."
        );
        assert_eq!(
            LineError::MissingOperand(Param::Source).to_string(),
            "ERROR - missing source parameter."
        );
        assert!(LineError::UnrecognizedSyntax.to_string().starts_with(ERROR_MARKER));
    }
}
