use std::fmt::Display;
use std::fmt::Formatter;

/// Transaction information flags, reported to the client in every reply as
/// a hex bitset. Values are fixed by the SQRL wire protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum TifFlag {
    CurrentIdMatch = 0x01,
    PreviousIdMatch = 0x02,
    IpsMatched = 0x04,
    SqrlDisabled = 0x08,
    FunctionsNotSupported = 0x10,
    TransientError = 0x20,
    CommandFailed = 0x40,
    ClientFailure = 0x80,
    BadIdAssociation = 0x100,
}

/// Accumulates TIF flags during request processing. Additive only; once
/// [`TifBuilder::build`] freezes the set the result is immutable.
#[derive(Debug, Default, Clone)]
pub struct TifBuilder {
    bits: u16,
}

impl TifBuilder {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn add(&mut self, flag: TifFlag) -> &mut Self {
        self.bits |= flag as u16;
        self
    }
    /// Discards every accumulated flag. Used when an unrecoverable error
    /// supersedes partial progress; the caller adds CommandFailed after.
    pub fn clear_all(&mut self) -> &mut Self {
        self.bits = 0;
        self
    }
    pub fn contains(&self, flag: TifFlag) -> bool {
        self.bits & flag as u16 != 0
    }
    pub fn build(&self) -> Tif {
        Tif { bits: self.bits }
    }
}

/// Frozen flag set, rendered as uppercase hex for the wire reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tif {
    bits: u16,
}

impl Tif {
    pub fn contains(&self, flag: TifFlag) -> bool {
        self.bits & flag as u16 != 0
    }
    pub fn bits(&self) -> u16 {
        self.bits
    }
}

impl Display for Tif {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:X}", self.bits)
    }
}
