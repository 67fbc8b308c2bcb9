//! Operand and value parsing.
//!
//! Every numeric field in the source (immediates, offsets, EQU values, data, jump targets)
//! is an expression of `+`/`-` joined terms:
//! ```text
//!  expr   = ["+" | "-"] term [("+" | "-") term]*
//!  term   = number | char | label | "$"
//!  number = /0x[0-9a-f]{1,4}/ | /%[01]{1,16}/ | /\d{1,5}/
//!  char   = /'.'/
//!  label  = /[a-zA-Z][_a-zA-Z0-9]*/
//! ```
//! `$` is the address of the line being assembled. Labels that aren't defined yet don't
//! stop parsing; they are kept in a [`Reference`] and resolved once the symbol table is
//! complete. Reserved peripheral names are treated the same way, so that a program label
//! of the same name wins even when it is defined after its first use.
use super::instructions::{PC, SR};
use super::*;

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref RE_REGISTER: Regex = Regex::new(r"(?i)^(?:R(\d{1,2})|(PC|SP|SR|CG))$").unwrap();
    static ref RE_INDEXED: Regex = Regex::new(r"(?i)^([^()]+)\(\s*(R\d{1,2}|PC|SP|SR|CG)\s*\)$").unwrap();
    static ref RE_INDIRECT: Regex = Regex::new(r"(?i)^@(R\d{1,2}|PC|SP|SR|CG)(\+)?$").unwrap();
    static ref RE_LABEL: Regex = Regex::new(r"^[A-Za-z][_A-Za-z0-9]*$").unwrap();
}

/// Peripheral registers and constants that resolve even when the program doesn't define them.
const RESERVED_NAMES: &[(&str, u16)] = &[
    ("P1IN", 0x0020),
    ("P1OUT", 0x0021),
    ("P1DIR", 0x0022),
    ("P1REN", 0x0027),
    ("P2IN", 0x0028),
    ("P2OUT", 0x0029),
    ("P2DIR", 0x002A),
    ("WDTCTL", 0x0120),
    ("WDTPW", 0x5A00),
    ("WDTHOLD", 0x0080),
];

pub trait LabelResolver {
    fn resolve(&self, label: &str) -> Option<u16>;
}

/// Resolve a name through the program's labels first, then the reserved names. Only used
/// once every label in the program has been seen.
pub fn lookup(lr: &dyn LabelResolver, name: &str) -> Option<u16> {
    lr.resolve(name).or_else(|| {
        RESERVED_NAMES
            .iter()
            .find(|(reserved, _)| reserved.eq_ignore_ascii_case(name))
            .map(|&(_, v)| v)
    })
}

/// An expression that mentions at least one label which isn't defined yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    /// sum of all terms that were already known
    pub offset: i32,
    /// the outstanding labels; true if the label is subtracted
    pub labels: Vec<(String, bool)>,
}
impl Reference {
    /// On failure, returns the first label that still can't be resolved.
    pub fn resolve(&self, lr: &dyn LabelResolver) -> Result<u16, String> {
        let mut total = self.offset;
        for (label, negate) in &self.labels {
            let v = lookup(lr, label).ok_or_else(|| label.clone())? as i32;
            total += if *negate { -v } else { v };
        }
        Ok(wrap(total))
    }
}

/// A 16-bit value, or the deferred computation of one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Known(u16),
    Pending(Reference),
}
impl Value {
    pub fn known(&self) -> Option<u16> {
        match self {
            Value::Known(v) => Some(*v),
            Value::Pending(_) => None,
        }
    }
    pub fn is_pending(&self) -> bool { self.known().is_none() }
    /// Resolve a pending value in place.
    pub fn settle(&mut self, lr: &dyn LabelResolver) -> Result<u16, LineError> {
        let v = match self {
            Value::Known(v) => *v,
            Value::Pending(r) => r.resolve(lr).map_err(LineError::UnresolvedSymbol)?,
        };
        *self = Value::Known(v);
        Ok(v)
    }
}
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Known(v) => write!(f, "{:04X}", v),
            Value::Pending(_) => write!(f, "????"),
        }
    }
}

fn wrap(v: i32) -> u16 { v.rem_euclid(0x1_0000) as u16 }

/// Parse a hex (`0x`), binary (`%`) or decimal literal that fits in 16 bits.
pub fn parse_number(text: &str) -> Option<u16> {
    let t = text.trim();
    if let Some(hex) = t.strip_prefix("0x").or_else(|| t.strip_prefix("0X")) {
        u16::from_str_radix(hex, 16).ok()
    } else if let Some(bin) = t.strip_prefix('%') {
        u16::from_str_radix(bin, 2).ok()
    } else if t.starts_with(|c: char| c.is_ascii_digit()) {
        t.parse::<u16>().ok()
    } else {
        None
    }
}

/// `'c'` for a single ASCII character.
pub fn char_literal(text: &str) -> Option<u8> {
    match text.as_bytes() {
        [b'\'', c, b'\''] if c.is_ascii() => Some(*c),
        _ => None,
    }
}

pub fn is_label(text: &str) -> bool { RE_LABEL.is_match(text) }

/// Evaluate an expression (see module docs). `here` supplies the value of `$`.
/// Returns None if the text isn't a well-formed expression.
pub fn eval_expr(text: &str, here: Option<u16>, lr: &dyn LabelResolver) -> Option<Value> {
    let mut offset = 0i32;
    let mut labels = Vec::new();
    let mut rest = text.trim();
    let mut negate = false;
    if let Some(r) = rest.strip_prefix('-') {
        negate = true;
        rest = r;
    } else if let Some(r) = rest.strip_prefix('+') {
        rest = r;
    }
    loop {
        // a quoted character may itself be '+' or '-'
        let lead = rest.len() - rest.trim_start().len();
        let from = if rest[lead..].starts_with('\'') {
            rest[lead..].char_indices().nth(3).map_or(rest.len(), |(i, _)| lead + i)
        } else {
            lead
        };
        let end = rest[from..]
            .find(|c: char| c == '+' || c == '-')
            .map_or(rest.len(), |i| from + i);
        let term = rest[..end].trim();
        let value = if term == "$" {
            Some(i32::from(here?))
        } else if let Some(c) = char_literal(term) {
            Some(c as i32)
        } else if term.starts_with(|c: char| c.is_ascii_digit() || c == '%') {
            Some(i32::from(parse_number(term)?))
        } else if is_label(term) {
            // reserved names wait for pass 2 in case the program defines the name later
            lr.resolve(term).map(i32::from)
        } else {
            return None;
        };
        match value {
            Some(v) => offset += if negate { -v } else { v },
            None => labels.push((term.to_string(), negate)),
        }
        if end == rest.len() {
            break;
        }
        negate = rest[end..].starts_with('-');
        rest = &rest[end + 1..];
    }
    if labels.is_empty() {
        Some(Value::Known(wrap(offset)))
    } else {
        Some(Value::Pending(Reference { offset, labels }))
    }
}

/// Register number for `R0`..`R15` or one of the aliases PC, SP, SR and CG.
pub fn register_number(text: &str) -> Option<u8> {
    let c = RE_REGISTER.captures(text.trim())?;
    if let Some(n) = c.get(1) {
        return n.as_str().parse::<u8>().ok().filter(|&n| n < 16);
    }
    match c.get(2)?.as_str().to_ascii_uppercase().as_str() {
        "PC" => Some(0),
        "SP" => Some(1),
        "SR" => Some(2),
        _ => Some(3),
    }
}

/// A resolved operand: the addressing mode plus whatever value it carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    /// Rn
    Register(u8),
    /// X(Rn)
    Indexed(Value, u8),
    /// LABEL (addressed through PC)
    Symbolic(Value),
    /// &LABEL (addressed through SR)
    Absolute(Value),
    /// @Rn
    IndirectRegister(u8),
    /// @Rn+
    IndirectAutoIncrement(u8),
    /// #N (taken from @PC+)
    Immediate(Value),
}
impl Operand {
    /// The register field of the instruction word.
    pub fn register(&self) -> u8 {
        match self {
            Operand::Register(r)
            | Operand::Indexed(_, r)
            | Operand::IndirectRegister(r)
            | Operand::IndirectAutoIncrement(r) => *r,
            Operand::Symbolic(_) | Operand::Immediate(_) => PC,
            Operand::Absolute(_) => SR,
        }
    }
    /// As bits when used as a source.
    pub fn source_mode(&self) -> u8 {
        match self {
            Operand::Register(_) => 0,
            Operand::Indexed(..) | Operand::Symbolic(_) | Operand::Absolute(_) => 1,
            Operand::IndirectRegister(_) => 2,
            Operand::IndirectAutoIncrement(_) | Operand::Immediate(_) => 3,
        }
    }
    /// Ad bit when used as a destination; None for source-only modes.
    pub fn destination_mode(&self) -> Option<u8> {
        match self {
            Operand::Register(_) => Some(0),
            Operand::Indexed(..) | Operand::Symbolic(_) | Operand::Absolute(_) => Some(1),
            _ => None,
        }
    }
    /// The extension word that follows the instruction word, if any.
    pub fn extension(&self) -> Option<Value> {
        match self {
            Operand::Indexed(v, _) | Operand::Symbolic(v) | Operand::Absolute(v) | Operand::Immediate(v) => {
                Some(v.clone())
            }
            _ => None,
        }
    }
}

/// Identify the addressing mode of an operand. `addr` is the address of the line (for `$`).
pub fn parse_operand(text: &str, addr: u16, lr: &dyn LabelResolver) -> Option<Operand> {
    let text = text.trim();
    if let Some(reg) = register_number(text) {
        return Some(Operand::Register(reg));
    }
    if let Some(c) = RE_INDEXED.captures(text) {
        let offset = eval_expr(&c[1], Some(addr), lr)?;
        return Some(Operand::Indexed(offset, register_number(&c[2])?));
    }
    if let Some(c) = RE_INDIRECT.captures(text) {
        let reg = register_number(&c[1])?;
        return Some(if c.get(2).is_some() {
            Operand::IndirectAutoIncrement(reg)
        } else {
            Operand::IndirectRegister(reg)
        });
    }
    if let Some(rest) = text.strip_prefix('&') {
        return eval_expr(rest, Some(addr), lr).map(Operand::Absolute);
    }
    if let Some(rest) = text.strip_prefix('#') {
        return eval_expr(rest, Some(addr), lr).map(Operand::Immediate);
    }
    if is_label(text) {
        return eval_expr(text, Some(addr), lr).map(Operand::Symbolic);
    }
    None
}

pub fn resolve_source(text: &str, addr: u16, lr: &dyn LabelResolver) -> Result<Operand, LineError> {
    parse_operand(text, addr, lr).ok_or(LineError::InvalidOperandSyntax(Param::Source))
}

pub fn resolve_destination(text: &str, addr: u16, lr: &dyn LabelResolver) -> Result<Operand, LineError> {
    parse_operand(text, addr, lr)
        .filter(|op| op.destination_mode().is_some())
        .ok_or(LineError::InvalidOperandSyntax(Param::Destination))
}
