use crate::opcodes::{codes, to_small_int};
use crate::{MAX_PUB_KEYS_PER_MULTISIG, Script, ScriptCommand};
use kestrel_hashes::HASH160_SIZE;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, PartialEq, Eq, Debug, Clone)]
pub enum Error {
    #[error("invalid script class {0}")]
    InvalidScriptClass(String),
}

/// Standard classes of script public keys.
#[derive(PartialEq, Eq, Debug, Clone, Copy, Hash)]
pub enum ScriptClass {
    /// None of the recognized forms
    NonStandard,
    /// Pay to pubkey
    PubKey,
    /// Pay to pubkey hash
    PubKeyHash,
    /// Pay to script hash
    ScriptHash,
    /// Bare m of n multisig
    MultiSig,
}

const NON_STANDARD: &str = "nonstandard";
const PUB_KEY: &str = "pubkey";
const PUB_KEY_HASH: &str = "pubkeyhash";
const SCRIPT_HASH: &str = "scripthash";
const MULTI_SIG: &str = "multisig";

impl ScriptClass {
    pub fn from_script(script: &Script) -> Self {
        if Self::is_pay_to_pubkey(script) {
            ScriptClass::PubKey
        } else if Self::is_pay_to_pubkey_hash(script) {
            ScriptClass::PubKeyHash
        } else if Self::is_pay_to_script_hash(script) {
            ScriptClass::ScriptHash
        } else if multisig_params(script).is_some() {
            ScriptClass::MultiSig
        } else {
            ScriptClass::NonStandard
        }
    }

    // <pubkey> OP_CHECKSIG
    #[inline(always)]
    pub fn is_pay_to_pubkey(script: &Script) -> bool {
        matches!(script.cmds(), [ScriptCommand::Data(key), ScriptCommand::Op(codes::OpCheckSig)] if is_sec_shaped(key.data()))
    }

    // OP_DUP OP_HASH160 <20 bytes> OP_EQUALVERIFY OP_CHECKSIG
    #[inline(always)]
    pub fn is_pay_to_pubkey_hash(script: &Script) -> bool {
        matches!(
            script.cmds(),
            [
                ScriptCommand::Op(codes::OpDup),
                ScriptCommand::Op(codes::OpHash160),
                ScriptCommand::Data(hash),
                ScriptCommand::Op(codes::OpEqualVerify),
                ScriptCommand::Op(codes::OpCheckSig),
            ] if hash.len() == HASH160_SIZE
        )
    }

    // OP_HASH160 <20 bytes> OP_EQUAL
    #[inline(always)]
    pub fn is_pay_to_script_hash(script: &Script) -> bool {
        matches!(
            script.cmds(),
            [ScriptCommand::Op(codes::OpHash160), ScriptCommand::Data(hash), ScriptCommand::Op(codes::OpEqual)]
                if hash.len() == HASH160_SIZE
        )
    }

    fn as_str(&self) -> &'static str {
        match self {
            ScriptClass::NonStandard => NON_STANDARD,
            ScriptClass::PubKey => PUB_KEY,
            ScriptClass::PubKeyHash => PUB_KEY_HASH,
            ScriptClass::ScriptHash => SCRIPT_HASH,
            ScriptClass::MultiSig => MULTI_SIG,
        }
    }
}

impl Display for ScriptClass {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScriptClass {
    type Err = Error;

    fn from_str(script_class: &str) -> Result<Self, Self::Err> {
        match script_class {
            NON_STANDARD => Ok(ScriptClass::NonStandard),
            PUB_KEY => Ok(ScriptClass::PubKey),
            PUB_KEY_HASH => Ok(ScriptClass::PubKeyHash),
            SCRIPT_HASH => Ok(ScriptClass::ScriptHash),
            MULTI_SIG => Ok(ScriptClass::MultiSig),
            _ => Err(Error::InvalidScriptClass(script_class.to_string())),
        }
    }
}

impl TryFrom<&str> for ScriptClass {
    type Error = Error;

    fn try_from(script_class: &str) -> Result<Self, Self::Error> {
        script_class.parse()
    }
}

/// Length and prefix of a SEC public key. The point itself is not decoded.
fn is_sec_shaped(data: &[u8]) -> bool {
    matches!((data.len(), data.first()), (33, Some(0x02 | 0x03)) | (65, Some(0x04)))
}

/// Returns `(m, n)` when `script` has the form
/// `OP_m <pubkey_1> ... <pubkey_n> OP_n OP_CHECKMULTISIG` with `1 <= m <= n`.
pub fn multisig_params(script: &Script) -> Option<(usize, usize)> {
    let [ScriptCommand::Op(required), keys @ .., ScriptCommand::Op(count), ScriptCommand::Op(codes::OpCheckMultiSig)] = script.cmds()
    else {
        return None;
    };
    let required = to_small_int(*required)? as usize;
    let count = to_small_int(*count)? as usize;
    let keys_ok = keys.iter().all(|cmd| cmd.as_data().is_some_and(is_sec_shaped));
    (keys_ok && keys.len() == count && (1..=count).contains(&required) && count <= MAX_PUB_KEYS_PER_MULTISIG as usize)
        .then_some((required, count))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script_builder::ScriptBuilder;

    fn build(f: impl FnOnce(&mut ScriptBuilder)) -> Script {
        let mut builder = ScriptBuilder::new();
        f(&mut builder);
        builder.drain()
    }

    #[test]
    fn test_from_script() {
        struct Test {
            name: &'static str,
            script: Script,
            class: ScriptClass,
        }

        let compressed = [&[0x02][..], &[0x11; 32]].concat();
        let uncompressed = [&[0x04][..], &[0x11; 64]].concat();
        let (compressed, uncompressed) = (compressed.as_slice(), uncompressed.as_slice());
        let multisig = |m: i64, keys: &[&[u8]], n: i64| {
            build(|b| {
                b.add_i64(m).unwrap();
                keys.iter().for_each(|key| {
                    b.add_data(key).unwrap();
                });
                b.add_i64(n).unwrap().add_op(codes::OpCheckMultiSig).unwrap();
            })
        };

        let tests = vec![
            Test {
                name: "compressed p2pk",
                script: build(|b| {
                    b.add_data(compressed).unwrap().add_op(codes::OpCheckSig).unwrap();
                }),
                class: ScriptClass::PubKey,
            },
            Test {
                name: "uncompressed p2pk",
                script: build(|b| {
                    b.add_data(uncompressed).unwrap().add_op(codes::OpCheckSig).unwrap();
                }),
                class: ScriptClass::PubKey,
            },
            Test {
                name: "p2pk with a bad prefix",
                script: build(|b| {
                    b.add_data(&[0x04; 33]).unwrap().add_op(codes::OpCheckSig).unwrap();
                }),
                class: ScriptClass::NonStandard,
            },
            Test {
                name: "p2pkh",
                script: build(|b| {
                    b.add_ops(&[codes::OpDup, codes::OpHash160]).unwrap();
                    b.add_data(&[0x22; 20]).unwrap().add_ops(&[codes::OpEqualVerify, codes::OpCheckSig]).unwrap();
                }),
                class: ScriptClass::PubKeyHash,
            },
            Test {
                name: "p2pkh with a short hash",
                script: build(|b| {
                    b.add_ops(&[codes::OpDup, codes::OpHash160]).unwrap();
                    b.add_data(&[0x22; 19]).unwrap().add_ops(&[codes::OpEqualVerify, codes::OpCheckSig]).unwrap();
                }),
                class: ScriptClass::NonStandard,
            },
            Test {
                name: "p2sh",
                script: build(|b| {
                    b.add_op(codes::OpHash160).unwrap().add_data(&[0x33; 20]).unwrap().add_op(codes::OpEqual).unwrap();
                }),
                class: ScriptClass::ScriptHash,
            },
            Test { name: "1 of 2 multisig", script: multisig(1, &[compressed, uncompressed], 2), class: ScriptClass::MultiSig },
            Test { name: "0 of 1 multisig", script: multisig(0, &[compressed], 1), class: ScriptClass::NonStandard },
            Test { name: "2 of 1 multisig", script: multisig(2, &[compressed], 1), class: ScriptClass::NonStandard },
            Test { name: "count mismatch", script: multisig(1, &[compressed], 2), class: ScriptClass::NonStandard },
            Test { name: "empty", script: Script::default(), class: ScriptClass::NonStandard },
        ];

        for test in tests {
            assert_eq!(ScriptClass::from_script(&test.script), test.class, "test '{}' failed", test.name);
        }

        assert_eq!(multisig_params(&multisig(2, &[compressed, compressed, uncompressed], 3)), Some((2, 3)));
    }

    #[test]
    fn test_names() {
        for class in
            [ScriptClass::NonStandard, ScriptClass::PubKey, ScriptClass::PubKeyHash, ScriptClass::ScriptHash, ScriptClass::MultiSig]
        {
            assert_eq!(class.to_string().parse::<ScriptClass>(), Ok(class));
        }
        assert_eq!(ScriptClass::PubKeyHash.to_string(), "pubkeyhash");
        assert_eq!(ScriptClass::try_from("witness"), Err(Error::InvalidScriptClass("witness".to_string())));
    }
}
