//! Line classification. Each source line is offered to an ordered list of recognizers;
//! the first one that claims the line decides what it is.
use super::instructions;
use super::*;

/// Storage directives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directive {
    /// DB
    Byte,
    /// DS
    Space,
    /// DW
    Word,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement<'a> {
    Blank,
    /// comment only, or END
    Comment,
    Constant {
        name: &'a str,
        value: &'a str,
    },
    Data {
        label: Option<&'a str>,
        directive: Directive,
        data: &'a str,
    },
    Origin {
        label: Option<&'a str>,
        addr: &'a str,
    },
    Label(&'a str),
    Double {
        label: Option<&'a str>,
        operator: &'a str,
        src: &'a str,
        dst: &'a str,
    },
    Single {
        label: Option<&'a str>,
        operator: &'a str,
        operand: Option<&'a str>,
    },
}

/// A source line split into its label and the remainder.
struct Line<'a> {
    text: &'a str,
    /// the line without its comment
    code: &'a str,
    /// the first word, if it starts in column 1 (any trailing ':' removed)
    label: Option<&'a str>,
    /// everything after the label
    body: &'a str,
}
impl<'a> Line<'a> {
    fn new(text: &'a str) -> Self {
        let code = strip_comment(text).trim_end();
        if code.starts_with(|c: char| !c.is_whitespace()) {
            let (first, rest) = split_word(code);
            Line {
                text,
                code,
                label: Some(first.strip_suffix(':').unwrap_or(first)),
                body: rest,
            }
        } else {
            Line {
                text,
                code,
                label: None,
                body: code.trim(),
            }
        }
    }
    fn indented(&self) -> bool { self.label.is_none() }
    /// The operator and whatever follows it.
    fn operation(&self) -> (&'a str, &'a str) { split_word(self.body) }
}

/// Split off the first whitespace delimited word; the rest is trimmed.
fn split_word(text: &str) -> (&str, &str) {
    let text = text.trim_start();
    match text.find(char::is_whitespace) {
        Some(i) => (&text[..i], text[i..].trim()),
        None => (text, ""),
    }
}

/// Remove a trailing `;` comment, ignoring semicolons inside quotes.
pub fn strip_comment(text: &str) -> &str {
    let mut quote = None;
    for (i, c) in text.char_indices() {
        match (quote, c) {
            (None, ';') => return &text[..i],
            (None, '\'' | '"') => quote = Some(c),
            (Some(q), _) if q == c => quote = None,
            _ => {}
        }
    }
    text
}

/// Split a list on commas that aren't inside quotes or parentheses. Parts are trimmed.
pub fn split_list(text: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut quote = None;
    let mut depth = 0;
    let mut start = 0;
    for (i, c) in text.char_indices() {
        match (quote, c) {
            (Some(q), _) if q == c => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(c),
            (None, '(') => depth += 1,
            (None, ')') => depth -= 1,
            (None, ',') if depth == 0 => {
                parts.push(text[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(text[start..].trim());
    parts
}

/// Check a name written in the label position.
pub fn validate_label(name: &str) -> Result<(), LineError> {
    if instructions::is_reserved(name) {
        Err(LineError::ReservedWordAsLabel(name.to_string()))
    } else if !parse::is_label(name) {
        Err(LineError::InvalidLabelCharacter(name.to_string()))
    } else {
        Ok(())
    }
}

type Recognizer = for<'a> fn(&Line<'a>) -> Option<Result<Statement<'a>, LineError>>;

/// Recognizers in priority order.
const RECOGNIZERS: &[Recognizer] = &[
    blank,
    comment,
    invalid_label,
    constant,
    data,
    origin,
    label_only,
    double,
    single,
];

/// Classify one line of source.
pub fn classify(text: &str) -> Result<Statement, LineError> {
    let line = Line::new(text);
    RECOGNIZERS
        .iter()
        .find_map(|recognize| recognize(&line))
        .unwrap_or(Err(LineError::UnrecognizedSyntax))
}

fn blank<'a>(line: &Line<'a>) -> Option<Result<Statement<'a>, LineError>> {
    line.text.trim().is_empty().then_some(Ok(Statement::Blank))
}

fn comment<'a>(line: &Line<'a>) -> Option<Result<Statement<'a>, LineError>> {
    let first = split_word(line.code).0;
    (line.code.trim().is_empty() || first.eq_ignore_ascii_case("END")).then_some(Ok(Statement::Comment))
}

fn invalid_label<'a>(line: &Line<'a>) -> Option<Result<Statement<'a>, LineError>> {
    validate_label(line.label?).err().map(Err)
}

fn constant<'a>(line: &Line<'a>) -> Option<Result<Statement<'a>, LineError>> {
    let (name, rest) = match line.label {
        Some(name) => (name, line.body),
        None => split_word(line.body),
    };
    let (op, value) = split_word(rest);
    if !op.eq_ignore_ascii_case("EQU") {
        return None;
    }
    Some(if line.indented() {
        Err(LineError::InvalidLabelPosition(name.to_string()))
    } else if value.is_empty() {
        Err(LineError::MissingOperand(Param::Source))
    } else {
        Ok(Statement::Constant { name, value })
    })
}

fn data<'a>(line: &Line<'a>) -> Option<Result<Statement<'a>, LineError>> {
    let (op, data) = line.operation();
    let directive = match op.to_ascii_uppercase().as_str() {
        "DB" => Directive::Byte,
        "DS" => Directive::Space,
        "DW" => Directive::Word,
        _ => return None,
    };
    Some(if data.is_empty() {
        Err(LineError::MissingOperand(Param::Source))
    } else {
        Ok(Statement::Data {
            label: line.label,
            directive,
            data,
        })
    })
}

fn origin<'a>(line: &Line<'a>) -> Option<Result<Statement<'a>, LineError>> {
    let (op, addr) = line.operation();
    if !op.eq_ignore_ascii_case("ORG") {
        return None;
    }
    Some(if addr.is_empty() {
        Err(LineError::MissingOperand(Param::Source))
    } else {
        Ok(Statement::Origin { label: line.label, addr })
    })
}

fn label_only<'a>(line: &Line<'a>) -> Option<Result<Statement<'a>, LineError>> {
    line.label.filter(|_| line.body.is_empty()).map(|name| Ok(Statement::Label(name)))
}

/// The operator of an instruction line, rejecting labels that were indented.
fn operator<'a>(line: &Line<'a>) -> Result<(&'a str, &'a str), LineError> {
    let (op, rest) = line.operation();
    if line.indented() {
        if let Some(name) = op.strip_suffix(':') {
            return Err(LineError::InvalidLabelPosition(name.to_string()));
        }
        let next = split_word(rest).0;
        if !instructions::is_reserved(op) && instructions::is_reserved(next) {
            return Err(LineError::InvalidLabelPosition(op.to_string()));
        }
    }
    if !op.starts_with(|c: char| c.is_ascii_alphabetic()) {
        return Err(LineError::MissingOperand(Param::Mnemonic));
    }
    Ok((op, rest))
}

fn double<'a>(line: &Line<'a>) -> Option<Result<Statement<'a>, LineError>> {
    let (operator, rest) = match operator(line) {
        Ok(op) => op,
        Err(e) => return Some(Err(e)),
    };
    match split_list(rest)[..] {
        [_] => None,
        [src, dst] => Some(if src.is_empty() {
            Err(LineError::MissingOperand(Param::Source))
        } else if dst.is_empty() {
            Err(LineError::MissingOperand(Param::Destination))
        } else {
            Ok(Statement::Double {
                label: line.label,
                operator,
                src,
                dst,
            })
        }),
        _ => Some(Err(LineError::UnrecognizedSyntax)),
    }
}

fn single<'a>(line: &Line<'a>) -> Option<Result<Statement<'a>, LineError>> {
    let (operator, rest) = match operator(line) {
        Ok(op) => op,
        Err(e) => return Some(Err(e)),
    };
    Some(Ok(Statement::Single {
        label: line.label,
        operator,
        operand: (!rest.is_empty()).then_some(rest),
    }))
}
