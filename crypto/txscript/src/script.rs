use crate::caches::Cache;
use crate::opcodes::{OP_1_NEGATE_VAL, OP_DATA_MAX_VAL, OP_SMALL_INT_MAX_VAL, OP_SMALL_INT_MIN_VAL, codes, opcode_to_string};
use crate::varint::{encode_varint, read_varint};
use crate::{EngineFlags, SigCacheKey, TxScriptEngine};
use kestrel_hashes::{Hash160, hash160};
use kestrel_txscript_errors::TxScriptError;
use log::debug;
use num_bigint::BigUint;
use std::fmt::{self, Display, Formatter};
use std::hash::{Hash, Hasher};
use std::io::{ErrorKind, Read};
use std::ops::Add;

/// How the length of a data push is written on the wire.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum PushEncoding {
    /// A single length byte in `1..=75`, which doubles as the opcode
    Direct,
    /// `OP_PUSHDATA1` followed by a one byte length
    PushData1,
    /// `OP_PUSHDATA2` followed by a two byte little-endian length
    PushData2,
}

impl PushEncoding {
    pub fn shortest(len: usize) -> Result<Self, TxScriptError> {
        match len {
            0..=0x4b => Ok(PushEncoding::Direct),
            0x4c..=0xff => Ok(PushEncoding::PushData1),
            0x100..=0xffff => Ok(PushEncoding::PushData2),
            _ => Err(TxScriptError::PushTooLong(len)),
        }
    }

    pub fn max_len(&self) -> usize {
        match self {
            PushEncoding::Direct => OP_DATA_MAX_VAL as usize,
            PushEncoding::PushData1 => u8::MAX as usize,
            PushEncoding::PushData2 => u16::MAX as usize,
        }
    }

    fn header_len(&self) -> usize {
        match self {
            PushEncoding::Direct => 1,
            PushEncoding::PushData1 => 2,
            PushEncoding::PushData2 => 3,
        }
    }
}

/// Bytes pushed by a script, along with the encoding they were read with so that
/// serialization reproduces the original bytes.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct DataPush {
    data: Vec<u8>,
    encoding: PushEncoding,
}

impl DataPush {
    /// Uses the shortest encoding able to hold `data`.
    pub fn new(data: Vec<u8>) -> Result<Self, TxScriptError> {
        let encoding = PushEncoding::shortest(data.len())?;
        Ok(Self { data, encoding })
    }

    pub fn with_encoding(data: Vec<u8>, encoding: PushEncoding) -> Result<Self, TxScriptError> {
        if data.len() > encoding.max_len() {
            return Err(TxScriptError::PushTooLong(data.len()));
        }
        Ok(Self { data, encoding })
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    pub fn encoding(&self) -> PushEncoding {
        self.encoding
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// False when a shorter encoding, or a dedicated opcode (`OP_0`, `OP_1`..`OP_16`,
    /// `OP_1NEGATE`), would push the same bytes.
    pub fn is_minimal(&self) -> bool {
        match self.data.as_slice() {
            // Written as a zero length byte, which is the OP_0 opcode
            [] => self.encoding == PushEncoding::Direct,
            [b] if (OP_SMALL_INT_MIN_VAL..=OP_SMALL_INT_MAX_VAL).contains(b) || *b == OP_1_NEGATE_VAL => false,
            data => PushEncoding::shortest(data.len()).is_ok_and(|shortest| shortest == self.encoding),
        }
    }

    pub fn serialized_len(&self) -> usize {
        self.encoding.header_len() + self.data.len()
    }

    fn serialize_into(&self, out: &mut Vec<u8>) {
        // Lengths are bounded by the encoding at construction
        match self.encoding {
            PushEncoding::Direct => out.push(self.data.len() as u8),
            PushEncoding::PushData1 => out.extend([codes::OpPushData1, self.data.len() as u8]),
            PushEncoding::PushData2 => {
                out.push(codes::OpPushData2);
                out.extend((self.data.len() as u16).to_le_bytes());
            }
        }
        out.extend_from_slice(&self.data);
    }
}

#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum ScriptCommand {
    Op(u8),
    Data(DataPush),
}

impl ScriptCommand {
    /// A data command with the shortest encoding.
    pub fn data(data: impl Into<Vec<u8>>) -> Result<Self, TxScriptError> {
        DataPush::new(data.into()).map(ScriptCommand::Data)
    }

    pub fn as_data(&self) -> Option<&[u8]> {
        match self {
            ScriptCommand::Data(push) => Some(push.data()),
            ScriptCommand::Op(_) => None,
        }
    }

    pub fn is_op(&self, opcode: u8) -> bool {
        matches!(self, ScriptCommand::Op(op) if *op == opcode)
    }

    pub fn serialized_len(&self) -> usize {
        match self {
            ScriptCommand::Op(_) => 1,
            ScriptCommand::Data(push) => push.serialized_len(),
        }
    }
}

impl From<u8> for ScriptCommand {
    fn from(opcode: u8) -> Self {
        ScriptCommand::Op(opcode)
    }
}

impl From<DataPush> for ScriptCommand {
    fn from(push: DataPush) -> Self {
        ScriptCommand::Data(push)
    }
}

impl Display for ScriptCommand {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ScriptCommand::Op(opcode) => f.write_str(&opcode_to_string(*opcode)),
            ScriptCommand::Data(push) => f.write_str(&hex::encode(push.data())),
        }
    }
}

/// An ordered list of script commands.
///
/// A script built with `+` remembers where each operand starts, so the engine can
/// apply per-script limits to every part of a combined spend. Equality and hashing
/// only look at the commands.
#[derive(Clone, Debug, Default)]
pub struct Script {
    cmds: Vec<ScriptCommand>,
    segment_starts: Vec<usize>,
}

impl PartialEq for Script {
    fn eq(&self, other: &Self) -> bool {
        self.cmds == other.cmds
    }
}

impl Eq for Script {}

impl Hash for Script {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.cmds.hash(state);
    }
}

impl Script {
    pub fn new(cmds: Vec<ScriptCommand>) -> Self {
        Self { cmds, segment_starts: vec![] }
    }

    /// Command indices at which a concatenated operand begins, excluding the first.
    pub fn segment_starts(&self) -> &[usize] {
        &self.segment_starts
    }

    pub fn cmds(&self) -> &[ScriptCommand] {
        &self.cmds
    }

    pub fn into_cmds(self) -> Vec<ScriptCommand> {
        self.cmds
    }

    pub fn len(&self) -> usize {
        self.cmds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cmds.is_empty()
    }

    /// Reads a varint length prefixed script.
    pub fn parse<R: Read + ?Sized>(reader: &mut R) -> Result<Self, TxScriptError> {
        let length = read_varint(reader).map_err(|err| match err.kind() {
            ErrorKind::UnexpectedEof => TxScriptError::TruncatedLength,
            _ => TxScriptError::ReadError(err.to_string()),
        })?;
        let mut bytes = Vec::new();
        match (&mut *reader).take(length).read_to_end(&mut bytes) {
            Ok(_) => {}
            Err(err) if err.kind() == ErrorKind::UnexpectedEof => {}
            Err(err) => return Err(TxScriptError::ReadError(err.to_string())),
        }
        if (bytes.len() as u64) < length {
            return Err(TxScriptError::TruncatedScript(bytes.len(), length.try_into().unwrap_or(usize::MAX)));
        }
        Self::from_raw_bytes(&bytes)
    }

    /// Decodes command bytes that carry no length prefix.
    pub fn from_raw_bytes(bytes: &[u8]) -> Result<Self, TxScriptError> {
        let mut cmds = Vec::new();
        let mut rest = bytes;
        while let Some((&opcode, tail)) = rest.split_first() {
            let (len, encoding, tail) = match opcode {
                1..=OP_DATA_MAX_VAL => (opcode as usize, PushEncoding::Direct, tail),
                codes::OpPushData1 => match tail.split_first() {
                    Some((&len, tail)) => (len as usize, PushEncoding::PushData1, tail),
                    None => return Err(TxScriptError::MalformedPushSize(vec![opcode])),
                },
                codes::OpPushData2 => match tail.split_first_chunk::<2>() {
                    Some((len, tail)) => (u16::from_le_bytes(*len) as usize, PushEncoding::PushData2, tail),
                    None => return Err(TxScriptError::MalformedPushSize([&[opcode][..], tail].concat())),
                },
                _ => {
                    cmds.push(ScriptCommand::Op(opcode));
                    rest = tail;
                    continue;
                }
            };
            if tail.len() < len {
                return Err(TxScriptError::MalformedPush(len, tail.len()));
            }
            let (data, tail) = tail.split_at(len);
            cmds.push(ScriptCommand::Data(DataPush { data: data.to_vec(), encoding }));
            rest = tail;
        }
        Ok(Self::new(cmds))
    }

    /// The command bytes without the length prefix.
    pub fn raw_serialize(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.raw_len());
        for cmd in &self.cmds {
            match cmd {
                ScriptCommand::Op(opcode) => out.push(*opcode),
                ScriptCommand::Data(push) => push.serialize_into(&mut out),
            }
        }
        out
    }

    pub fn serialize(&self) -> Vec<u8> {
        let raw = self.raw_serialize();
        let mut out = encode_varint(raw.len() as u64);
        out.extend(raw);
        out
    }

    pub fn raw_len(&self) -> usize {
        self.cmds.iter().map(ScriptCommand::serialized_len).sum()
    }

    /// HASH160 of the raw bytes, as committed to by a pay-to-script-hash output.
    pub fn hash160(&self) -> Hash160 {
        hash160(&self.raw_serialize())
    }

    /// Runs the script against digest `z` with default engine flags. Any failure,
    /// whatever its cause, makes the script invalid.
    pub fn evaluate(&self, z: &BigUint) -> bool {
        let sig_cache = Cache::new(0);
        match self.evaluate_with(z, &sig_cache, EngineFlags::default()) {
            Ok(()) => true,
            Err(e) => {
                debug!("Script {self} failed: {e}");
                false
            }
        }
    }

    pub fn evaluate_with(&self, z: &BigUint, sig_cache: &Cache<SigCacheKey, bool>, flags: EngineFlags) -> Result<(), TxScriptError> {
        TxScriptEngine::from_script(self, z.clone(), sig_cache, flags).execute()
    }
}

impl Add<&Script> for &Script {
    type Output = Script;

    fn add(self, rhs: &Script) -> Script {
        self.clone() + rhs.clone()
    }
}

impl Add for Script {
    type Output = Script;

    fn add(mut self, rhs: Script) -> Script {
        let offset = self.cmds.len();
        if offset > 0 && !rhs.cmds.is_empty() {
            self.segment_starts.push(offset);
        }
        self.segment_starts.extend(rhs.segment_starts.iter().map(|start| start + offset));
        self.cmds.extend(rhs.cmds);
        self
    }
}

impl From<Vec<ScriptCommand>> for Script {
    fn from(cmds: Vec<ScriptCommand>) -> Self {
        Self::new(cmds)
    }
}

/// Single line assembly: opcode names and hex data separated by spaces.
impl Display for Script {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for (i, cmd) in self.cmds.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{cmd}")?;
        }
        Ok(())
    }
}
