use crate::assembler::DEFAULT_ORIGIN;
use clap::Parser;
use clap_num::maybe_hex;
use lazy_static::lazy_static;

#[derive(Parser, Debug)]
#[command(author,version,about,long_about=None)]
pub struct Args {
    /// Assembly source files (.s43, .asm, .s); each one is assembled independently
    #[arg(required = true)]
    pub files: Vec<String>,

    /// If there is a program listing then dump it to stdout
    #[arg(short, long)]
    pub list: bool,

    /// Initial value of the location counter (hex ok with '0x')
    #[arg(long,value_parser=maybe_hex::<u16>, default_value_t=DEFAULT_ORIGIN)]
    pub origin: u16,

    /// Dump the symbol table to stdout
    #[arg(short, long)]
    pub symbols: bool,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Write output files after assembly (.lst, .obj)
    #[arg(short, long)]
    pub write_files: bool,
}

lazy_static! {
    pub static ref ARGS: Args = if cfg!(test) {
        // manually set parameters for running tests
        Args::parse_from(["test", "test.s43"])
    } else {
        Args::parse()
    };
}

pub fn init() { lazy_static::initialize(&ARGS); }
