use super::obj::Field;
use super::objstream::ObjectStream;
use super::parse::{self, LabelResolver, Value};
use super::*;

use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub name: String,       // name as first written
    pub value: Option<u16>, // None until a deferred constant is settled
    pub line: usize,        // line on which the symbol is defined
}

/// Labels and constants, keyed case-insensitively and kept in name order.
#[derive(Debug, Default)]
pub struct SymbolTable {
    map: BTreeMap<String, Symbol>,
}
impl LabelResolver for SymbolTable {
    fn resolve(&self, label: &str) -> Option<u16> { self.value(label) }
}
impl SymbolTable {
    pub fn new() -> Self { SymbolTable { map: BTreeMap::new() } }
    /// Add a symbol. A name can only be defined once per run.
    pub fn define(&mut self, name: &str, value: Option<u16>, line: usize, kind: SymbolKind) -> Result<(), LineError> {
        if !parse::is_label(name) {
            return Err(LineError::InvalidLabelCharacter(name.to_string()));
        }
        let key = name.to_ascii_uppercase();
        if self.map.contains_key(&key) {
            return Err(LineError::DuplicateSymbol(name.to_string(), kind));
        }
        self.map.insert(
            key,
            Symbol {
                name: name.to_string(),
                value,
                line,
            },
        );
        Ok(())
    }
    /// Give a deferred symbol its value.
    pub fn settle(&mut self, name: &str, value: u16) {
        if let Some(sym) = self.map.get_mut(&name.to_ascii_uppercase()) {
            sym.value = Some(value);
        }
    }
    pub fn get(&self, name: &str) -> Option<&Symbol> { self.map.get(&name.to_ascii_uppercase()) }
    /// The symbol's value; None if it isn't defined or hasn't settled.
    pub fn value(&self, name: &str) -> Option<u16> { self.get(name).and_then(|s| s.value) }
    pub fn len(&self) -> usize { self.map.len() }
    pub fn is_empty(&self) -> bool { self.map.is_empty() }
    pub fn unsettled(&self) -> impl Iterator<Item = &Symbol> { self.map.values().filter(|s| s.value.is_none()) }
    pub fn write_table(&self, f: &mut dyn io::Write) -> Result<(), io::Error> {
        let width = self.map.values().map(|s| s.name.len()).max().unwrap_or(0) + 4;
        for sym in self.map.values() {
            match sym.value {
                Some(v) => writeln!(f, "{:<width$}     {:04X}", sym.name, v)?,
                None => writeln!(f, "{:<width$}     ????", sym.name)?,
            }
        }
        Ok(())
    }
}

/// What a source line turned into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    Blank,
    /// comments, END and bare labels
    Text,
    Constant {
        name: String,
        value: Value,
    },
    Code(Vec<Field>),
    /// new location counter value
    Origin(u16),
    Error(LineError),
}
impl Content {
    /// Number of bytes the line occupies.
    pub fn size(&self) -> u16 {
        match self {
            Content::Code(fields) => fields.iter().fold(0u16, |n, f| n.wrapping_add(f.size())),
            _ => 0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProgramLine {
    pub num: usize,       // line number in source (from 1)
    pub addr: u16,        // location counter at the start of the line
    pub src: String,      // verbatim source text
    pub content: Content, // what the line assembled to
}
impl ProgramLine {
    pub fn is_error(&self) -> bool { matches!(self.content, Content::Error(_)) }
}
impl fmt::Display for ProgramLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.content {
            Content::Blank => write!(f, "{:4}  {:04X}", self.num, self.addr),
            Content::Error(e) => write!(f, "{:4}  {}", self.num, e),
            Content::Constant { value, .. } => write!(f, "{:4}  {} {:13}{}", self.num, value, "", self.src),
            Content::Code(fields) => {
                let bytes: String = fields.iter().map(|field| field.to_string()).collect();
                write!(f, "{:4}  {:04X} {:<13}{}", self.num, self.addr, bytes, self.src)
            }
            Content::Text | Content::Origin(_) => write!(f, "{:4}  {:04X} {:13}{}", self.num, self.addr, "", self.src),
        }
    }
}

/// The result of one assembly run.
#[derive(Debug)]
pub struct Program {
    pub lines: Vec<ProgramLine>,       // one per source line
    pub symbols: SymbolTable,          // every label and constant
    pub object: Option<ObjectStream>, // only present when there were no errors
}
impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Program: {} lines, {} symbols, {} errors",
            self.lines.len(),
            self.symbols.len(),
            self.error_count()
        )
    }
}
impl Program {
    pub fn new(lines: Vec<ProgramLine>, symbols: SymbolTable) -> Self {
        let object = if lines.iter().any(ProgramLine::is_error) {
            None
        } else {
            Some(ObjectStream::build(&lines))
        };
        Program { lines, symbols, object }
    }
    pub fn error_count(&self) -> usize { self.lines.iter().filter(|l| l.is_error()).count() }
    /// The listing: one record per source line followed by the symbol table.
    pub fn write_listing(&self, f: &mut dyn io::Write) -> Result<(), io::Error> {
        for line in &self.lines {
            writeln!(f, "{}", line)?;
        }
        if !self.symbols.is_empty() {
            writeln!(f)?;
            self.symbols.write_table(f)?;
        }
        Ok(())
    }
    /// Write `<name>.lst` beside the source file, plus `<name>.obj` if the run was error free.
    pub fn write_output_files(&self, parent_filename: &str) -> Result<(), Error> {
        let mut pb = Path::new(parent_filename).to_path_buf();
        pb.set_extension("lst");
        let mut file = File::create(&pb)?;
        self.write_listing(&mut file)?;
        info!("wrote listing file: {}", pb.display());
        if let Some(obj) = self.object.as_ref() {
            pb.set_extension("obj");
            file = File::create(&pb)?;
            obj.write_to(&mut file)?;
            info!("wrote object file: {}", pb.display());
        }
        Ok(())
    }
}
