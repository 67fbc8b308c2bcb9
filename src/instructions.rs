//! The instruction registry: every mnemonic and directive the assembler understands,
//! together with how its machine code is put together.
use lazy_static::lazy_static;
use std::collections::HashMap;

pub const PC: u8 = 0;
pub const SP: u8 = 1;
pub const SR: u8 = 2;
pub const CG: u8 = 3;

/// How an instruction turns its operand text into machine code.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Format {
    /// Format I: opcode nibble, source and destination operand
    Double(u8),
    /// Format II: base opcode word, a single (source) operand
    Single(u16),
    /// Format III: 3-bit condition, PC-relative target
    Jump(u8),
    /// emulated by a Format I opcode with an implied source; the operand is the destination
    Emulated(u8, Implied),
    /// emulated branch: the operand is moved into PC
    Branch,
    /// a complete instruction word which takes no operand
    Fixed(u16),
    /// assembler directive; never encoded as an instruction
    Directive,
}

/// The source operand supplied by an emulated instruction.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Implied {
    /// constant generator register and its As bits
    Constant(u8, u8),
    /// the destination operand read as a source
    Destination,
    /// @SP+
    PopStack,
}

// constant generator encodings (register, As)
const ZERO: Implied = Implied::Constant(CG, 0);
const ONE: Implied = Implied::Constant(CG, 1);
const TWO: Implied = Implied::Constant(CG, 2);
const ALL_ONES: Implied = Implied::Constant(CG, 3);

#[derive(Debug)]
pub struct Descriptor {
    /// the operator text as written in source (matched case-insensitively)
    pub op: &'static str,
    /// how the instruction is encoded
    pub format: Format,
    /// true if the instruction has a byte (.B) form
    pub byte_op: bool,
}

lazy_static! {
    static ref DESC_BY_OP: HashMap<&'static str, &'static Descriptor> =
        DESCRIPTORS.iter().map(|desc| (desc.op, desc)).collect();
}

/// Look up the descriptor for an operator (without any .B/.W suffix).
pub fn op_to_descriptor(op: &str) -> Option<&'static Descriptor> {
    DESC_BY_OP.get(op.to_ascii_uppercase().as_str()).copied()
}

/// True if `word` is a mnemonic or directive, with or without a size suffix.
pub fn is_reserved(word: &str) -> bool {
    let base = word.split_once('.').map_or(word, |(base, _)| base);
    op_to_descriptor(base).is_some()
}

use Format::*;
//
// instruction table
//
#[rustfmt::skip]
pub const DESCRIPTORS: &[Descriptor] = &[
 Descriptor{op:"DB",   format:Directive,                  byte_op:false},
 Descriptor{op:"DS",   format:Directive,                  byte_op:false},
 Descriptor{op:"DW",   format:Directive,                  byte_op:false},
 Descriptor{op:"ORG",  format:Directive,                  byte_op:false},
 Descriptor{op:"EQU",  format:Directive,                  byte_op:false},
 Descriptor{op:"END",  format:Directive,                  byte_op:false},
 Descriptor{op:"ADC",  format:Emulated(0x6, ZERO),        byte_op:true},
 Descriptor{op:"ADD",  format:Double(0x5),                byte_op:true},
 Descriptor{op:"ADDC", format:Double(0x6),                byte_op:true},
 Descriptor{op:"AND",  format:Double(0xF),                byte_op:true},
 Descriptor{op:"BIC",  format:Double(0xC),                byte_op:true},
 Descriptor{op:"BIS",  format:Double(0xD),                byte_op:true},
 Descriptor{op:"BIT",  format:Double(0xB),                byte_op:true},
 Descriptor{op:"BR",   format:Branch,                     byte_op:false},
 Descriptor{op:"CALL", format:Single(0x1280),             byte_op:false},
 Descriptor{op:"CLR",  format:Emulated(0x4, ZERO),        byte_op:true},
 Descriptor{op:"CLRC", format:Fixed(0xC312),              byte_op:false},
 Descriptor{op:"CLRN", format:Fixed(0xC222),              byte_op:false},
 Descriptor{op:"CLRZ", format:Fixed(0xC322),              byte_op:false},
 Descriptor{op:"CMP",  format:Double(0x9),                byte_op:true},
 Descriptor{op:"DADC", format:Emulated(0xA, ZERO),        byte_op:true},
 Descriptor{op:"DADD", format:Double(0xA),                byte_op:true},
 Descriptor{op:"DEC",  format:Emulated(0x8, ONE),         byte_op:true},
 Descriptor{op:"DECD", format:Emulated(0x8, TWO),         byte_op:true},
 Descriptor{op:"DINT", format:Fixed(0xC232),              byte_op:false},
 Descriptor{op:"EINT", format:Fixed(0xD232),              byte_op:false},
 Descriptor{op:"INC",  format:Emulated(0x5, ONE),         byte_op:true},
 Descriptor{op:"INCD", format:Emulated(0x5, TWO),         byte_op:true},
 Descriptor{op:"INV",  format:Emulated(0xE, ALL_ONES),    byte_op:true},
 Descriptor{op:"JC",   format:Jump(3),                    byte_op:false},
 Descriptor{op:"JHS",  format:Jump(3),                    byte_op:false},
 Descriptor{op:"JEQ",  format:Jump(1),                    byte_op:false},
 Descriptor{op:"JZ",   format:Jump(1),                    byte_op:false},
 Descriptor{op:"JGE",  format:Jump(5),                    byte_op:false},
 Descriptor{op:"JL",   format:Jump(6),                    byte_op:false},
 Descriptor{op:"JMP",  format:Jump(7),                    byte_op:false},
 Descriptor{op:"JN",   format:Jump(4),                    byte_op:false},
 Descriptor{op:"JNC",  format:Jump(2),                    byte_op:false},
 Descriptor{op:"JLO",  format:Jump(2),                    byte_op:false},
 Descriptor{op:"JNE",  format:Jump(0),                    byte_op:false},
 Descriptor{op:"JNZ",  format:Jump(0),                    byte_op:false},
 Descriptor{op:"MOV",  format:Double(0x4),                byte_op:true},
 Descriptor{op:"NOP",  format:Fixed(0x4303),              byte_op:false},
 Descriptor{op:"POP",  format:Emulated(0x4, Implied::PopStack), byte_op:true},
 Descriptor{op:"PUSH", format:Single(0x1200),             byte_op:true},
 Descriptor{op:"RET",  format:Fixed(0x4130),              byte_op:false},
 Descriptor{op:"RETI", format:Fixed(0x1300),              byte_op:false},
 Descriptor{op:"RLA",  format:Emulated(0x5, Implied::Destination), byte_op:true},
 Descriptor{op:"RLC",  format:Emulated(0x6, Implied::Destination), byte_op:true},
 Descriptor{op:"RRA",  format:Single(0x1100),             byte_op:true},
 Descriptor{op:"RRC",  format:Single(0x1000),             byte_op:true},
 Descriptor{op:"SBC",  format:Emulated(0x7, ZERO),        byte_op:true},
 Descriptor{op:"SETC", format:Fixed(0xD312),              byte_op:false},
 Descriptor{op:"SETN", format:Fixed(0xD222),              byte_op:false},
 Descriptor{op:"SETZ", format:Fixed(0xD322),              byte_op:false},
 Descriptor{op:"SUB",  format:Double(0x8),                byte_op:true},
 Descriptor{op:"SUBC", format:Double(0x7),                byte_op:true},
 Descriptor{op:"SWPB", format:Single(0x1080),             byte_op:false},
 Descriptor{op:"SXT",  format:Single(0x1180),             byte_op:false},
 Descriptor{op:"TST",  format:Emulated(0x9, ZERO),        byte_op:true},
 Descriptor{op:"XOR",  format:Double(0xE),                byte_op:true},
];

#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn lookup_ignores_case() {
        let desc = op_to_descriptor("mov").unwrap();
        assert_eq!(desc.op, "MOV");
        assert_eq!(desc.format, Format::Double(0x4));
        assert!(desc.byte_op);
        assert_eq!(op_to_descriptor("Br").unwrap().format, Format::Branch);
        assert!(op_to_descriptor("BRANCH").is_none());
        assert!(op_to_descriptor("FOO").is_none());
    }
    #[test]
    fn reserved_words() {
        assert!(is_reserved("DEC"));
        assert!(is_reserved("mov.b"));
        assert!(is_reserved("org"));
        assert!(is_reserved("EQU"));
        assert!(!is_reserved("LOOP"));
        assert!(!is_reserved("R5"));
    }
    #[test]
    fn operators_are_unique() {
        assert_eq!(DESC_BY_OP.len(), DESCRIPTORS.len());
        assert_eq!(op_to_descriptor("DW").unwrap().format, Format::Directive);
        assert!(DESCRIPTORS.iter().all(|d| d.op.len() >= 2 && d.op.len() <= 4));
    }
}
