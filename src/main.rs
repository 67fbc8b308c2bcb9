//! # A two-pass MSP430 assembler written in Rust.
//!
//! ## Getting Started
//! To assemble a program and see the listing:
//! ```
//! cargo run -- -l /path/to/program.s43
//! ```
//! ...or if you've already built the binary then just...
//! ```
//! msp430-asm -l /path/to/program.s43
//! ```
//! Use `-w` to write `program.lst` (and `program.obj` when there are no errors) next to
//! the source file.
//! ## Options
//! Help for command line options is available using -h or --help.
#[macro_use]
mod macros;
mod assembler;
mod config;
mod error;
mod instructions;
mod obj;
mod objstream;
mod parse;
mod program;
mod statement;
use crate::assembler::Assembler;
use std::ffi::OsStr;
use std::path::Path;
use std::result::Result;
use std::{fmt, io};
pub(crate) use {crate::error::*, program::*};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    config::init();
    let mut failed = 0;
    // each file is its own assembly run
    for filename in &config::ARGS.files {
        if let Err(e) = process_file(filename) {
            println!("{}", e);
            failed += 1;
        }
    }
    if failed > 0 {
        return Err(Box::new(general_err!(format!("{} file(s) failed to assemble", failed))));
    }
    Ok(())
}

/// process_file assembles one source file and produces whatever output was asked for
fn process_file(filename: &str) -> Result<(), Error> {
    let path = Path::new(filename);
    let ext = path.extension().and_then(OsStr::to_str).unwrap_or("");
    if !matches!(ext.to_ascii_lowercase().as_str(), "s43" | "asm" | "s") {
        return Err(general_err!("unrecognized file type"));
    }
    info!("Assembling {}", filename);
    let program = Assembler::new().with_origin(config::ARGS.origin).assemble_from_file(filename)?;
    if config::ARGS.list {
        program.write_listing(&mut io::stdout())?;
    } else if config::ARGS.symbols {
        program.symbols.write_table(&mut io::stdout())?;
    }
    if config::ARGS.write_files {
        program.write_output_files(filename)?;
    }
    match program.error_count() {
        0 => {
            info!("{} assembled without errors", filename);
            Ok(())
        }
        n => {
            warn!("{} contains {} error(s)", filename, n);
            for line in program.lines.iter().filter(|l| l.is_error()) {
                println!("{}", line);
            }
            Err(syntax_err!(format!("{} failed to assemble", filename)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn source_files(dir: &str) -> Result<Vec<String>, Error> {
        let mut entries = fs::read_dir(dir)?
            .map(|res| res.map(|e| e.path()))
            .collect::<Result<Vec<_>, io::Error>>()?;
        entries.sort();
        Ok(entries
            .into_iter()
            .filter(|pb| pb.is_file() && pb.extension().map_or(false, |ext| ext.eq_ignore_ascii_case("s43")))
            .filter_map(|pb| pb.to_str().map(String::from))
            .collect())
    }
    #[test]
    fn various_programs() -> Result<(), Error> {
        // every .s43 file in ./test should assemble without errors
        const TEST_PATH: &str = "test";
        println!("Attempting to assemble all .s43 files in {}", TEST_PATH);
        let files = source_files(TEST_PATH)?;
        assert!(!files.is_empty());
        for file in files {
            process_file(&file)?;
            let program = Assembler::new().assemble_from_file(&file)?;
            assert!(program.object.is_some(), "{} produced no object stream", file);
        }
        Ok(())
    }
    #[test]
    fn syntax_errors() -> Result<(), Error> {
        // every .s43 file in ./test/errors should come back with ErrorKind::Syntax
        const TEST_PATH: &str = "test/errors";
        println!("Attempting to assemble all .s43 files in {}", TEST_PATH);
        for file in source_files(TEST_PATH)? {
            if let Some(msg) = match process_file(&file) {
                Err(e) if e.kind == ErrorKind::Syntax => None,
                Err(e) => Some(e.to_string()),
                Ok(()) => Some("Ok()".to_string()),
            } {
                panic!("Expected ErrorKind::Syntax when assembling {} but got {}", file, msg)
            }
        }
        Ok(())
    }
    #[test]
    fn unsupported_file_type() {
        let e = process_file("program.hex").unwrap_err();
        assert_eq!(e.kind, ErrorKind::General);
    }
    #[test]
    fn blink_listing() -> Result<(), Error> {
        let program = Assembler::new().assemble_from_file("test/blink.s43")?;
        let mut out = Vec::new();
        program.write_listing(&mut out)?;
        let listing = String::from_utf8(out).map_err(|e| general_err!(e))?;
        assert!(listing.contains("B240805A2001"));
        assert!(listing.lines().all(|l| !l.contains(ERROR_MARKER)));
        let mut obj = Vec::new();
        if let Some(stream) = program.object.as_ref() {
            stream.write_to(&mut obj)?;
        }
        let obj = String::from_utf8(obj).map_err(|e| general_err!(e))?;
        assert!(obj.starts_with(objstream::PREAMBLE));
        assert_eq!(obj.lines().filter(|l| l.starts_with(objstream::SEGMENT_MARKER)).count(), 2);
        Ok(())
    }
}
