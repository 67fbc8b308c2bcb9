//! Assembling an MSP430 program takes two passes over the source:
//!
//!  1. Classify every line, define its label (if any) at the current location, encode
//!     it as far as the symbols seen so far allow and advance the location counter.
//!     References to symbols that aren't defined yet are kept as pending values.
//!  2. Settle constants that were defined in terms of later symbols, then resolve every
//!     pending value. Anything still undefined becomes an error on its line.
//!
//! Instruction sizes never depend on symbol values, so two passes are always enough.
//! Errors are confined to the line they occur on; the listing is always complete, but
//! the object stream is only produced for an error free program.
use super::obj::{self, Field, Operands};
use super::parse::{self, Value};
use super::statement::{self, Directive, Statement};
use super::*;

use std::fs::File;
use std::io::{BufRead, BufReader};

/// Location counter value at the start of a run unless configured otherwise.
pub const DEFAULT_ORIGIN: u16 = 0x0200;

pub struct Assembler {
    origin: u16,
}

impl Default for Assembler {
    fn default() -> Self { Assembler::new() }
}

/// State for a single run. A new one is created for every program assembled.
struct Context {
    addr: u16,
    symbols: SymbolTable,
}

impl Assembler {
    pub fn new() -> Self { Assembler { origin: DEFAULT_ORIGIN } }
    /// Start the location counter somewhere other than [`DEFAULT_ORIGIN`].
    pub fn with_origin(mut self, origin: u16) -> Self {
        self.origin = origin;
        self
    }

    /// Load and assemble the source file at `path`.
    pub fn assemble_from_file(&self, path: &str) -> Result<Program, Error> {
        let file = File::open(path)?;
        let src = BufReader::new(file).lines().collect::<Result<Vec<String>, _>>()?;
        verbose_println!("read {} lines from {}", src.len(), path);
        Ok(self.assemble(src))
    }

    /// Assemble a program from its source lines.
    pub fn assemble<I, S>(&self, src: I) -> Program
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut ctx = Context {
            addr: self.origin,
            symbols: SymbolTable::new(),
        };
        let mut lines: Vec<ProgramLine> = src
            .into_iter()
            .enumerate()
            .map(|(i, text)| ctx.first_pass(i + 1, text.as_ref()))
            .collect();
        verbose_println!(
            "pass 1: {} lines, {} symbols, location counter at {:04X}",
            lines.len(),
            ctx.symbols.len(),
            ctx.addr
        );
        ctx.second_pass(&mut lines);
        let program = Program::new(lines, ctx.symbols);
        verbose_println!("pass 2: {}", program);
        if let Some(obj) = program.object.as_ref() {
            verbose_println!("object: {} segment(s), checksum {:04X}", obj.segments().len(), obj.checksum());
        }
        program
    }
}

impl Context {
    fn first_pass(&mut self, num: usize, text: &str) -> ProgramLine {
        let content = statement::classify(text)
            .and_then(|stmt| self.process(num, stmt))
            .unwrap_or_else(Content::Error);
        let addr = match content {
            Content::Origin(org) => org,
            _ => self.addr,
        };
        self.addr = addr.wrapping_add(content.size());
        ProgramLine {
            num,
            addr,
            src: text.to_string(),
            content,
        }
    }

    fn process(&mut self, num: usize, stmt: Statement) -> Result<Content, LineError> {
        match stmt {
            Statement::Blank => Ok(Content::Blank),
            Statement::Comment => Ok(Content::Text),
            Statement::Label(name) => {
                self.define_label(Some(name), num)?;
                Ok(Content::Text)
            }
            Statement::Constant { name, value } => {
                let value = self.eval(value)?;
                self.symbols.define(name, value.known(), num, SymbolKind::Constant)?;
                Ok(Content::Constant {
                    name: name.to_string(),
                    value,
                })
            }
            Statement::Origin { label, addr } => {
                let org = self.eval(addr)?.settle(&self.symbols)?;
                self.addr = org;
                self.define_label(label, num)?;
                Ok(Content::Origin(org))
            }
            Statement::Data { label, directive, data } => {
                self.define_label(label, num)?;
                self.data_fields(directive, data).map(Content::Code)
            }
            Statement::Double {
                label,
                operator,
                src,
                dst,
            } => {
                self.define_label(label, num)?;
                obj::assemble(operator, Operands::Two(src, dst), self.addr, &self.symbols).map(Content::Code)
            }
            Statement::Single { label, operator, operand } => {
                self.define_label(label, num)?;
                let operands = operand.map_or(Operands::None, Operands::One);
                obj::assemble(operator, operands, self.addr, &self.symbols).map(Content::Code)
            }
        }
    }

    fn define_label(&mut self, label: Option<&str>, num: usize) -> Result<(), LineError> {
        match label {
            Some(name) => self.symbols.define(name, Some(self.addr), num, SymbolKind::Label),
            None => Ok(()),
        }
    }

    fn eval(&self, text: &str) -> Result<Value, LineError> {
        parse::eval_expr(text, Some(self.addr), &self.symbols).ok_or(LineError::InvalidOperandSyntax(Param::Source))
    }

    fn data_fields(&self, directive: Directive, data: &str) -> Result<Vec<Field>, LineError> {
        match directive {
            Directive::Space => Ok(vec![Field::Reserve(self.eval(data)?.settle(&self.symbols)?)]),
            Directive::Word => statement::split_list(data)
                .into_iter()
                .map(|item| self.eval(item).map(Field::Word))
                .collect(),
            Directive::Byte => {
                let mut fields = Vec::new();
                for item in statement::split_list(data) {
                    if let Some(text) = item.strip_prefix('"').and_then(|s| s.strip_suffix('"')) {
                        fields.extend(text.bytes().map(|b| Field::Byte(Value::Known(b.into()))));
                        continue;
                    }
                    let value = self.eval(item)?;
                    if value.known().map_or(false, |b| b > 0xFF) {
                        return Err(LineError::ValueOutOfRange(item.to_string()));
                    }
                    fields.push(Field::Byte(value));
                }
                Ok(fields)
            }
        }
    }

    fn second_pass(&mut self, lines: &mut [ProgramLine]) {
        // constants may depend on each other, so keep going while any can be settled
        loop {
            let mut progress = false;
            for line in lines.iter_mut() {
                if let Content::Constant { name, value } = &mut line.content {
                    if value.is_pending() {
                        if let Ok(v) = value.settle(&self.symbols) {
                            self.symbols.settle(name, v);
                            progress = true;
                        }
                    }
                }
            }
            if !progress {
                break;
            }
        }
        for sym in self.symbols.unsettled() {
            verbose_println!("constant {} (line {}) could not be settled", sym.name, sym.line);
        }
        for line in lines.iter_mut() {
            let result = match &mut line.content {
                Content::Constant { value, .. } => value.settle(&self.symbols).map(|_| ()),
                Content::Code(fields) => fields
                    .iter_mut()
                    .filter(|f| f.is_pending())
                    .try_for_each(|f| f.resolve(&self.symbols)),
                _ => Ok(()),
            };
            if let Err(e) = result {
                line.content = Content::Error(e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objstream::Segment;

    fn assemble(src: &[&str]) -> Program { Assembler::new().assemble(src) }
    fn listing(program: &Program) -> Vec<String> { program.lines.iter().map(|l| l.to_string()).collect() }
    fn words(program: &Program, line: usize) -> Vec<String> {
        match &program.lines[line].content {
            Content::Code(fields) => fields.iter().map(|f| f.to_string()).collect(),
            other => panic!("line {} is not code: {:?}", line, other),
        }
    }

    #[test]
    fn immediate_to_register() {
        let program = assemble(&["      MOV #0x10,R5", "      NOP"]);
        assert_eq!(words(&program, 0), vec!["3540", "1000"]);
        assert_eq!(program.lines[1].addr, 0x0204);
        assert_eq!(program.lines[0].to_string(), "   1  0200 35401000           MOV #0x10,R5");
    }
    #[test]
    fn label_and_emulated_instruction() {
        let program = assemble(&["LOOP: DEC R4", "      JNZ LOOP"]);
        assert_eq!(program.symbols.value("loop"), Some(0x0200));
        assert_eq!(words(&program, 0), vec!["1483"]);
        assert_eq!(words(&program, 1), vec!["FE23"]);
        assert_eq!(program.lines[1].addr, 0x0202);
    }
    #[test]
    fn constants_defined_before_and_after_use() {
        let before = assemble(&["CONST EQU 0x5A00", "      MOV #CONST,R5"]);
        let after = assemble(&["      MOV #CONST,R5", "CONST EQU 0x5A00"]);
        assert_eq!(words(&before, 1), vec!["3540", "005A"]);
        assert_eq!(words(&after, 0), vec!["3540", "005A"]);
        assert_eq!(before.object.map(|o| o.checksum()), Some(0x9A35));
        assert_eq!(after.object.map(|o| o.checksum()), Some(0x9A35));
    }
    #[test]
    fn deferred_location_constants() {
        let program = assemble(&[
            "SIZE    EQU   FINISH - START",
            "START:  MOV   #SIZE,R5",
            "        DEC   R5",
            "FINISH: RET",
            "HERE    EQU   $ - START",
            "BACK    EQU   $ - LAST",
            "        NOP",
            "LAST:   NOP",
            "        MOV   #BACK,R6",
        ]);
        assert_eq!(program.error_count(), 0);
        assert_eq!(program.symbols.value("SIZE"), Some(6));
        assert_eq!(program.symbols.value("HERE"), Some(8));
        // $ is the address of the EQU line (0x0208), LAST is 0x020A
        assert_eq!(program.symbols.value("BACK"), Some(0xFFFE));
        assert_eq!(words(&program, 1), vec!["3540", "0600"]);
        assert_eq!(words(&program, 8), vec!["3640", "FEFF"]);
        assert!(program.lines[0].to_string().starts_with("   1  0006 "));
        assert!(program.lines[5].to_string().starts_with("   6  FFFE "));
    }
    #[test]
    fn program_labels_shadow_reserved_names() {
        let defined_first = assemble(&["P1OUT: DW 0", "       MOV R5,&P1OUT"]);
        let defined_later = assemble(&["       MOV R5,&P1OUT", "P1OUT: DW 0"]);
        let not_defined = assemble(&["       MOV R5,&P1OUT"]);
        assert_eq!(words(&defined_first, 1), vec!["8245", "0002"]);
        assert_eq!(words(&defined_later, 0), vec!["8245", "0402"]);
        assert_eq!(words(&not_defined, 0), vec!["8245", "2100"]);
        assert_eq!(defined_later.error_count(), 0);

        let program = assemble(&[
            "BITS    EQU   WDTPW+WDTHOLD",
            "        MOV   #BITS,&WDTCTL",
            "        JMP   P1IN",
        ]);
        assert_eq!(program.symbols.value("BITS"), Some(0x5A80));
        assert_eq!(words(&program, 1), vec!["B240", "805A", "2001"]);
        // 0x0020 is 244 words back from 0x0208
        assert_eq!(words(&program, 2), vec!["0C3F"]);
    }
    #[test]
    fn quoted_operator_characters() {
        let program = assemble(&["      DB '-'", "      DB '+', '-'+1", "      MOV.B #'+',R5"]);
        assert_eq!(program.error_count(), 0);
        assert_eq!(words(&program, 0), vec!["2D"]);
        assert_eq!(words(&program, 1), vec!["2B", "2E"]);
        assert_eq!(words(&program, 2), vec!["7540", "2B00"]);
    }
    #[test]
    fn forward_jumps_and_calls() {
        let program = assemble(&["      JMP SKIP", "      NOP", "SKIP: CALL #SUBR", "SUBR: RET"]);
        assert_eq!(words(&program, 0), vec!["013C"]);
        assert_eq!(words(&program, 2), vec!["B012", "0802"]);
    }
    #[test]
    fn undefined_symbols() {
        let program = assemble(&["      MOV #NOWHERE,R5", "      JMP NOWHERE", "      NOP"]);
        assert_eq!(program.error_count(), 2);
        assert!(program.object.is_none());
        assert_eq!(listing(&program)[0], "   1  ERROR - undefined label 'NOWHERE'.");
        assert_eq!(program.lines[2].addr, 0x0206);
    }
    #[test]
    fn duplicate_label() {
        let program = assemble(&["X: NOP", "X: NOP", "   NOP"]);
        assert_eq!(listing(&program)[1], "   2  ERROR - duplicate definition of label 'X'.");
        assert_eq!(program.lines[2].addr, 0x0202);
        assert_eq!(program.error_count(), 1);
        assert!(program.object.is_none());
    }
    #[test]
    fn data_directives() {
        let program = assemble(&[
            "MSG:  DB \"Hi\"",
            "      DB 'c'",
            "      DB 5",
            "BUF:  DS 3",
            "      DW MSG",
            "      DB 300",
            "END_: NOP",
        ]);
        let addrs: Vec<u16> = program.lines.iter().map(|l| l.addr).collect();
        assert_eq!(addrs, vec![0x0200, 0x0202, 0x0203, 0x0204, 0x0207, 0x0209, 0x0209]);
        assert_eq!(words(&program, 0), vec!["48", "69"]);
        assert_eq!(words(&program, 4), vec!["0002"]);
        assert_eq!(
            program.lines[5].content,
            Content::Error(LineError::ValueOutOfRange("300".to_string()))
        );
    }
    #[test]
    fn origin_opens_segments() {
        let program = assemble(&[
            "        MOV #0x10,R5",
            "LOOP:   DEC R4",
            "        JNZ LOOP",
            "        ORG 0x0300",
            "        DW LOOP",
        ]);
        let obj = program.object.unwrap();
        assert_eq!(
            obj.segments(),
            &[
                Segment {
                    addr: 0x0200,
                    data: vec![0x35, 0x40, 0x10, 0x00, 0x14, 0x83, 0xFE, 0x23]
                },
                Segment {
                    addr: 0x0300,
                    data: vec![0x04, 0x02]
                },
            ]
        );
        assert_eq!(obj.checksum(), 0xE95B);
        assert_eq!(program.lines[3].addr, 0x0300);
    }
    #[test]
    fn runs_are_isolated() {
        let src = ["START: MOV #START,R5", "       JMP START"];
        let asm = Assembler::new().with_origin(0xF800);
        let first = asm.assemble(src);
        let second = asm.assemble(src);
        assert_eq!(listing(&first), listing(&second));
        assert_eq!(first.object, second.object);
        assert_eq!(first.symbols.value("START"), Some(0xF800));
    }
    #[test]
    fn errors_do_not_stop_the_run() {
        let program = assemble(&[
            "   FOO R4",
            "   MOV @R4,@R5",
            "   LOOP DEC R4",
            "NOP",
            "OK: MOV.B R4,R5",
        ]);
        let out = listing(&program);
        assert_eq!(out[0], "   1  ERROR - unknown instruction 'FOO'.");
        assert_eq!(out[1], "   2  ERROR - Invalid destination parameter syntax.");
        assert_eq!(out[2], "   3  ERROR - label 'LOOP' does not begin in column 1.");
        assert_eq!(out[3], "   4  ERROR - reserved word 'NOP' used as a label.");
        assert_eq!(words(&program, 4), vec!["4544"]);
        assert_eq!(program.symbols.value("OK"), Some(0x0200));
    }
}
