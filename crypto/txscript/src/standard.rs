use crate::{
    SIG_HASH_ALL,
    opcodes::codes::{OpCheckSig, OpDup, OpEqual, OpEqualVerify, OpFalse, OpHash160},
    script::{DataPush, Script, ScriptCommand},
    script_builder::{ScriptBuilder, ScriptBuilderResult},
    script_class::ScriptClass,
};
use kestrel_ecc::{PublicKey, Signature};
use kestrel_hashes::{Hash160, hash160};
use kestrel_txscript_errors::TxScriptError;

mod multisig;

pub use multisig::{Error as MultisigCreateError, multisig_redeem_script, multisig_redeem_script_sorted};

/// Wraps data of at most 75 bytes, such as keys and hashes, in a direct push.
fn short_push(data: &[u8]) -> ScriptCommand {
    ScriptCommand::Data(DataPush::new(data.to_vec()).expect("short data always has an encoding"))
}

/// Creates a new script to pay to a SEC encoded public key.
pub fn pay_to_pub_key(pub_key: &PublicKey, compressed: bool) -> Script {
    Script::new(vec![short_push(&pub_key.sec(compressed)), ScriptCommand::Op(OpCheckSig)])
}

/// Creates a new script to pay to the hash160 of a SEC encoded public key.
pub fn pay_to_pub_key_hash(pub_key_hash: &Hash160) -> Script {
    Script::new(vec![
        ScriptCommand::Op(OpDup),
        ScriptCommand::Op(OpHash160),
        short_push(pub_key_hash.as_ref()),
        ScriptCommand::Op(OpEqualVerify),
        ScriptCommand::Op(OpCheckSig),
    ])
}

/// Creates a new script to pay to a script hash.
pub fn pay_to_script_hash(script_hash: &Hash160) -> Script {
    Script::new(vec![ScriptCommand::Op(OpHash160), short_push(script_hash.as_ref()), ScriptCommand::Op(OpEqual)])
}

/// Takes a script and returns an equivalent pay-to-script-hash script
pub fn pay_to_script_hash_script(redeem_script: &Script) -> Script {
    pay_to_script_hash(&redeem_script.hash160())
}

/// The DER signature followed by the [`SIG_HASH_ALL`] type byte, as pushed by signature scripts.
pub fn encode_signature(signature: &Signature) -> Vec<u8> {
    let mut encoded = signature.to_der();
    encoded.push(SIG_HASH_ALL);
    encoded
}

/// Generates a signature script that fits a pay-to-pubkey script
pub fn pay_to_pub_key_signature_script(signature: &[u8]) -> ScriptBuilderResult<Script> {
    Ok(ScriptBuilder::new().add_data(signature)?.drain())
}

/// Generates a signature script that fits a pay-to-pubkey-hash script
pub fn pay_to_pub_key_hash_signature_script(signature: &[u8], pub_key: &[u8]) -> ScriptBuilderResult<Script> {
    Ok(ScriptBuilder::new().add_data(signature)?.add_data(pub_key)?.drain())
}

/// Generates a signature script for a multisig script. The leading `OP_0` is the
/// extra element consumed by CHECKMULTISIG. Signatures must follow the order of
/// their keys in the redeem script.
pub fn multisig_signature_script(signatures: &[Vec<u8>]) -> ScriptBuilderResult<Script> {
    let mut builder = ScriptBuilder::new();
    builder.add_op(OpFalse)?;
    for signature in signatures {
        builder.add_data(signature)?;
    }
    Ok(builder.drain())
}

/// Generates a signature script that fits a pay-to-script-hash script
pub fn pay_to_script_hash_signature_script(redeem_script: &Script, signature: &Script) -> ScriptBuilderResult<Script> {
    let redeem_script_as_data = ScriptBuilder::new().add_data(&redeem_script.raw_serialize())?.drain();
    Ok(signature + &redeem_script_as_data)
}

/// Returns the hash a standard script public key pays to.
///
/// Notes:
///  - Pay-to-pubkey scripts yield the hash160 of the key as it is encoded in the script.
///  - Bare multisig and non standard scripts have no single hash and return the
///    `TxScriptError::PubKeyFormat` error.
pub fn extract_script_pub_key_hash(script_pub_key: &Script) -> Result<(ScriptClass, Hash160), TxScriptError> {
    let class = ScriptClass::from_script(script_pub_key);
    let cmds = script_pub_key.cmds();
    let hash = match class {
        ScriptClass::PubKey => cmds.first().and_then(ScriptCommand::as_data).map(hash160),
        ScriptClass::PubKeyHash => cmds.get(2).and_then(ScriptCommand::as_data).and_then(|hash| Hash160::from_slice(hash).ok()),
        ScriptClass::ScriptHash => cmds.get(1).and_then(ScriptCommand::as_data).and_then(|hash| Hash160::from_slice(hash).ok()),
        ScriptClass::MultiSig | ScriptClass::NonStandard => None,
    };
    hash.map(|hash| (class, hash)).ok_or_else(|| TxScriptError::PubKeyFormat(format!("{class} script does not pay to a hash")))
}
