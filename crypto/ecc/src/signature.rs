use crate::EccError;
use num_bigint::BigUint;
use num_traits::Zero;
use std::fmt::{self, Display, Formatter};

const SEQUENCE_TAG: u8 = 0x30;
const INTEGER_TAG: u8 = 0x02;

/// An ECDSA signature `(r, s)`.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct Signature {
    r: BigUint,
    s: BigUint,
}

impl Signature {
    /// Does not check the components against a group order, see [`Signature::check_range`].
    /// Zero components encode to DER that [`Signature::from_der`] rejects.
    pub fn new(r: BigUint, s: BigUint) -> Self {
        Self { r, s }
    }

    pub fn r(&self) -> &BigUint {
        &self.r
    }

    pub fn s(&self) -> &BigUint {
        &self.s
    }

    /// Checks that both components lie in `[1, order)`.
    pub fn check_range(&self, order: &BigUint) -> Result<(), EccError> {
        if self.r.is_zero() || self.s.is_zero() || self.r >= *order || self.s >= *order {
            return Err(EccError::ScalarOutOfRange(order.to_string()));
        }
        Ok(())
    }

    pub fn to_der(&self) -> Vec<u8> {
        let r = der_integer(&self.r);
        let s = der_integer(&self.s);
        let mut body = Vec::with_capacity(8 + r.len() + s.len());
        for int in [r, s] {
            body.push(INTEGER_TAG);
            push_der_length(&mut body, int.len());
            body.extend(int);
        }
        let mut out = Vec::with_capacity(4 + body.len());
        out.push(SEQUENCE_TAG);
        push_der_length(&mut out, body.len());
        out.extend(body);
        out
    }

    /// Parses a strictly encoded DER signature: `30 len 02 rlen r 02 slen s` with
    /// minimal positive integers and no trailing bytes.
    pub fn from_der(bytes: &[u8]) -> Result<Self, EccError> {
        if bytes.len() < 8 {
            return Err(EccError::InvalidDer("too short"));
        }
        // Two 33 byte integers plus their headers
        if bytes.len() > 72 {
            return Err(EccError::InvalidDer("too long"));
        }
        if bytes[0] != SEQUENCE_TAG {
            return Err(EccError::InvalidDer("missing sequence tag"));
        }
        if bytes[1] as usize != bytes.len() - 2 {
            return Err(EccError::InvalidDer("sequence length mismatch"));
        }
        let (r, rest) = read_der_integer(&bytes[2..])?;
        let (s, rest) = read_der_integer(rest)?;
        if !rest.is_empty() {
            return Err(EccError::InvalidDer("trailing bytes"));
        }
        Ok(Self { r, s })
    }
}

impl Display for Signature {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({:x}, {:x})", self.r, self.s)
    }
}

/// Short form below 128, long form with the minimal number of length bytes above.
fn push_der_length(out: &mut Vec<u8>, len: usize) {
    if len < 0x80 {
        out.push(len as u8);
        return;
    }
    let bytes = len.to_be_bytes();
    let skip = bytes.iter().take_while(|&&b| b == 0).count();
    out.push(0x80 | (bytes.len() - skip) as u8);
    out.extend_from_slice(&bytes[skip..]);
}

fn der_integer(value: &BigUint) -> Vec<u8> {
    let bytes = value.to_bytes_be();
    if bytes[0] & 0x80 != 0 {
        let mut padded = Vec::with_capacity(bytes.len() + 1);
        padded.push(0);
        padded.extend(bytes);
        return padded;
    }
    bytes
}

fn read_der_integer(bytes: &[u8]) -> Result<(BigUint, &[u8]), EccError> {
    if bytes.len() < 2 {
        return Err(EccError::InvalidDer("truncated integer header"));
    }
    if bytes[0] != INTEGER_TAG {
        return Err(EccError::InvalidDer("missing integer tag"));
    }
    let len = bytes[1] as usize;
    if len == 0 {
        return Err(EccError::InvalidDer("empty integer"));
    }
    let Some(int) = bytes.get(2..2 + len) else {
        return Err(EccError::InvalidDer("integer overruns the signature"));
    };
    if int[0] & 0x80 != 0 {
        return Err(EccError::InvalidDer("negative integer"));
    }
    if len > 1 && int[0] == 0 && int[1] & 0x80 == 0 {
        return Err(EccError::InvalidDer("integer is not minimally encoded"));
    }
    let value = BigUint::from_bytes_be(int);
    if value.is_zero() {
        return Err(EccError::InvalidDer("zero integer"));
    }
    Ok((value, &bytes[2 + len..]))
}
