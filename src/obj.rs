//! The instruction encoder. An instruction line becomes a short list of [`Field`]s: the
//! instruction word followed by its extension words, any of which may still be waiting
//! on a forward reference.
use super::instructions::{self, Format, Implied, PC, SP};
use super::parse::{self, LabelResolver, Operand, Reference, Value};
use super::*;

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref RE_OPERATOR: Regex = Regex::new(r"^([A-Za-z]{2,4})(?:\.([BbWw]))?$").unwrap();
}

/// One unit of object code produced by a line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Field {
    /// a 16-bit word (instruction, extension or DW)
    Word(Value),
    /// a single byte (DB)
    Byte(Value),
    /// a jump whose target wasn't known when the line was assembled
    Jump {
        cond: u8,
        from: u16,
        target: Reference,
        text: String,
    },
    /// DS: uninitialized space
    Reserve(u16),
}
impl Field {
    pub fn size(&self) -> u16 {
        match self {
            Field::Word(_) | Field::Jump { .. } => 2,
            Field::Byte(_) => 1,
            Field::Reserve(n) => *n,
        }
    }
    pub fn is_pending(&self) -> bool {
        match self {
            Field::Word(v) | Field::Byte(v) => v.is_pending(),
            Field::Jump { .. } => true,
            Field::Reserve(_) => false,
        }
    }
    /// Replace any pending reference with its final value.
    pub fn resolve(&mut self, lr: &dyn LabelResolver) -> Result<(), LineError> {
        match self {
            Field::Word(v) => {
                v.settle(lr)?;
            }
            Field::Byte(v) => {
                let b = v.settle(lr)?;
                if b > 0xFF {
                    return Err(LineError::ValueOutOfRange(format!("{:04X}", b)));
                }
            }
            Field::Jump { cond, from, target, text } => {
                let to = target.resolve(lr).map_err(LineError::UnresolvedSymbol)?;
                let word = jump_word(*cond, *from, to).ok_or_else(|| LineError::JumpOutOfRange(text.clone()))?;
                *self = Field::Word(Value::Known(word));
            }
            Field::Reserve(_) => {}
        }
        Ok(())
    }
    /// The value this field adds to the object checksum.
    pub fn checksum_value(&self) -> u16 {
        match self {
            Field::Word(v) | Field::Byte(v) => v.known().unwrap_or(0),
            _ => 0,
        }
    }
    /// Bytes in memory order (low byte first).
    pub fn bytes(&self) -> Vec<u8> {
        match self {
            Field::Word(Value::Known(w)) => w.to_le_bytes().to_vec(),
            Field::Byte(Value::Known(b)) => vec![*b as u8],
            Field::Reserve(n) => vec![0; *n as usize],
            _ => Vec::new(),
        }
    }
}
impl fmt::Display for Field {
    /// Fields are listed in memory byte order, so 0x4035 shows up as `3540`.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Field::Word(Value::Known(w)) => write!(f, "{:04X}", swap_bytes(*w)),
            Field::Byte(Value::Known(b)) => write!(f, "{:02X}", b),
            Field::Word(_) | Field::Jump { .. } => write!(f, "????"),
            Field::Byte(_) => write!(f, "??"),
            Field::Reserve(_) => Ok(()),
        }
    }
}

pub fn swap_bytes(w: u16) -> u16 { w.rotate_left(8) }

/// The operand text following an operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operands<'a> {
    None,
    One(&'a str),
    Two(&'a str, &'a str),
}

/// Register, As bits and extension word of a source operand.
struct Slot {
    reg: u8,
    mode: u8,
    ext: Option<Value>,
}
impl From<&Operand> for Slot {
    fn from(op: &Operand) -> Self {
        Slot {
            reg: op.register(),
            mode: op.source_mode(),
            ext: op.extension(),
        }
    }
}

/// Encode an instruction at `addr`. `operator` may carry a `.B`/`.W` suffix.
pub fn assemble(operator: &str, operands: Operands, addr: u16, lr: &dyn LabelResolver) -> Result<Vec<Field>, LineError> {
    let caps = RE_OPERATOR
        .captures(operator)
        .ok_or_else(|| LineError::MalformedOpcode(operator.to_string()))?;
    let desc = instructions::op_to_descriptor(&caps[1]).ok_or_else(|| LineError::UnknownInstruction(caps[1].to_string()))?;
    let byte = caps.get(2).map_or(false, |s| s.as_str().eq_ignore_ascii_case("b"));
    if byte && !desc.byte_op {
        return Err(LineError::ByteOperation(operator.to_string()));
    }
    let bw = byte as u8;
    match desc.format {
        Format::Fixed(word) => Ok(vec![Field::Word(Value::Known(word))]),
        Format::Double(op) => {
            let (s, d) = match operands {
                Operands::Two(s, d) => (s, d),
                Operands::One(_) => return Err(LineError::MissingOperand(Param::Destination)),
                Operands::None => return Err(LineError::MissingOperand(Param::Source)),
            };
            let src = parse::resolve_source(s, addr, lr)?;
            let dst = parse::resolve_destination(d, addr, lr)?;
            Ok(format_one(op, bw, Slot::from(&src), &dst))
        }
        Format::Emulated(op, implied) => {
            let dst = parse::resolve_destination(one(operands, Param::Destination)?, addr, lr)?;
            let src = match implied {
                Implied::Constant(reg, mode) => Slot { reg, mode, ext: None },
                Implied::Destination => Slot::from(&dst),
                Implied::PopStack => Slot {
                    reg: SP,
                    mode: 3,
                    ext: None,
                },
            };
            Ok(format_one(op, bw, src, &dst))
        }
        Format::Branch => {
            let src = parse::resolve_source(one(operands, Param::Source)?, addr, lr)?;
            Ok(format_one(0x4, 0, Slot::from(&src), &Operand::Register(PC)))
        }
        Format::Single(base) => {
            let src = parse::resolve_source(one(operands, Param::Source)?, addr, lr)?;
            Ok(format_two(base, bw, Slot::from(&src)))
        }
        Format::Jump(cond) => {
            let text = one(operands, Param::Source)?.trim();
            match parse::eval_expr(text, Some(addr), lr) {
                Some(Value::Known(to)) => jump_word(cond, addr, to)
                    .map(|w| vec![Field::Word(Value::Known(w))])
                    .ok_or_else(|| LineError::JumpOutOfRange(text.to_string())),
                Some(Value::Pending(target)) => Ok(vec![Field::Jump {
                    cond,
                    from: addr,
                    target,
                    text: text.to_string(),
                }]),
                None => Err(LineError::InvalidOperandSyntax(Param::Source)),
            }
        }
        Format::Directive => Err(LineError::UnrecognizedSyntax),
    }
}

fn one<'a>(operands: Operands<'a>, missing: Param) -> Result<&'a str, LineError> {
    match operands {
        Operands::One(text) => Ok(text),
        Operands::None => Err(LineError::MissingOperand(missing)),
        Operands::Two(..) => Err(LineError::InvalidOperandSyntax(Param::Source)),
    }
}

/// Format I: `oooo ssss AbAs dddd`, then the source and destination extension words.
fn format_one(op: u8, bw: u8, src: Slot, dst: &Operand) -> Vec<Field> {
    let ad = dst.destination_mode().unwrap_or(0);
    let nibble = ad * 8 + bw * 4 + src.mode;
    let word = u16::from(op) << 12 | u16::from(src.reg) << 8 | u16::from(nibble) << 4 | u16::from(dst.register());
    let mut fields = vec![Field::Word(Value::Known(word))];
    fields.extend(src.ext.into_iter().chain(dst.extension()).map(Field::Word));
    fields
}

/// Format II: `0001 00oo oBAs ssss` with an optional extension word.
fn format_two(base: u16, bw: u8, src: Slot) -> Vec<Field> {
    let word = base | u16::from(bw) << 6 | u16::from(src.mode) << 4 | u16::from(src.reg);
    let mut fields = vec![Field::Word(Value::Known(word))];
    fields.extend(src.ext.map(Field::Word));
    fields
}

/// Format III: `001c ccoo oooo oooo`, offset in words from the following instruction.
pub fn jump_word(cond: u8, from: u16, to: u16) -> Option<u16> {
    let delta = to.wrapping_sub(from.wrapping_add(2)) as i16;
    if delta % 2 != 0 {
        return None;
    }
    let offset = delta / 2;
    if !(-512..=511).contains(&offset) {
        return None;
    }
    Some(0x2000 | u16::from(cond) << 10 | (offset as u16 & 0x03FF))
}
