//! The object file: a text stream of origin segments followed by a checksum.
//! ```text
//! MSP430 OBJECT V1
//! FFFF0000 0200 6 3540100014831C00
//! FFFF0000 FFFE 2 0002
//! FFFFFFFF 0159
//! ```
//! Each segment line holds the start address, the decimal byte count and the bytes in
//! memory order. The checksum is the 16-bit wrapping sum of every word and byte value emitted.
use super::obj::Field;
use super::program::{Content, ProgramLine};
use super::*;

pub const PREAMBLE: &str = "MSP430 OBJECT V1";
pub const SEGMENT_MARKER: &str = "FFFF0000";
pub const TERMINATOR: &str = "FFFFFFFF";

/// A run of contiguous bytes starting at an origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub addr: u16,
    pub data: Vec<u8>,
}
impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} {:04X} {} ", SEGMENT_MARKER, self.addr, self.data.len())?;
        self.data.iter().try_for_each(|b| write!(f, "{:02X}", b))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectStream {
    segments: Vec<Segment>,
    open: Segment,
    checksum: u16,
}
impl ObjectStream {
    pub fn new(origin: u16) -> Self {
        ObjectStream {
            segments: Vec::new(),
            open: Segment {
                addr: origin,
                data: Vec::new(),
            },
            checksum: 0,
        }
    }
    /// Build the stream for a fully resolved program.
    pub fn build(lines: &[ProgramLine]) -> Self {
        let origin = lines.first().map_or(0, |l| l.addr);
        let mut stream = ObjectStream::new(origin);
        for line in lines {
            match &line.content {
                Content::Origin(addr) => stream.org(*addr),
                Content::Code(fields) => fields.iter().for_each(|f| stream.emit(f)),
                _ => {}
            }
        }
        stream.org(0);
        stream
    }
    /// Close the open segment (if anything was emitted into it) and start a new one.
    pub fn org(&mut self, addr: u16) {
        let seg = std::mem::replace(
            &mut self.open,
            Segment {
                addr,
                data: Vec::new(),
            },
        );
        if !seg.data.is_empty() {
            self.segments.push(seg);
        }
    }
    pub fn emit(&mut self, field: &Field) {
        self.open.data.extend(field.bytes());
        self.checksum = self.checksum.wrapping_add(field.checksum_value());
    }
    pub fn segments(&self) -> &[Segment] { &self.segments }
    pub fn checksum(&self) -> u16 { self.checksum }
    pub fn write_to(&self, f: &mut dyn io::Write) -> Result<(), io::Error> {
        writeln!(f, "{}", PREAMBLE)?;
        for seg in &self.segments {
            writeln!(f, "{}", seg)?;
        }
        writeln!(f, "{} {:04X}", TERMINATOR, self.checksum)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::Value;

    #[test]
    fn org_flushes_segments() {
        let mut stream = ObjectStream::new(0x0200);
        stream.emit(&Field::Word(Value::Known(0x4303)));
        stream.org(0x0300);
        stream.org(0x0400);
        stream.emit(&Field::Byte(Value::Known(0x41)));
        stream.emit(&Field::Reserve(2));
        stream.org(0);
        assert_eq!(
            stream.segments(),
            &[
                Segment {
                    addr: 0x0200,
                    data: vec![0x03, 0x43]
                },
                Segment {
                    addr: 0x0400,
                    data: vec![0x41, 0, 0]
                },
            ]
        );
        assert_eq!(stream.checksum(), 0x4344);
    }
    #[test]
    fn checksum_wraps() {
        let mut stream = ObjectStream::new(0x0200);
        stream.emit(&Field::Word(Value::Known(0xFFFF)));
        stream.emit(&Field::Word(Value::Known(0x0002)));
        assert_eq!(stream.checksum(), 0x0001);
    }
    #[test]
    fn text_format() {
        let mut stream = ObjectStream::new(0x0200);
        stream.emit(&Field::Word(Value::Known(0x4035)));
        stream.emit(&Field::Word(Value::Known(0x0010)));
        stream.org(0);
        let mut out = Vec::new();
        stream.write_to(&mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "MSP430 OBJECT V1\nFFFF0000 0200 4 35401000\nFFFFFFFF 4045\n"
        );
    }
}
