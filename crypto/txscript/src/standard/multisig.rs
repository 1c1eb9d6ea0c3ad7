use crate::MAX_PUB_KEYS_PER_MULTISIG;
use crate::opcodes::codes::OpCheckMultiSig;
use crate::script::Script;
use crate::script_builder::{ScriptBuilder, ScriptBuilderError};
use thiserror::Error;

#[derive(Error, PartialEq, Eq, Debug, Clone)]
pub enum Error {
    // ErrTooManyRequiredSigs is returned from multisig_script when the
    // specified number of required signatures is larger than the number of
    // provided public keys.
    #[error("too many required signatures")]
    ErrTooManyRequiredSigs,
    #[error("at least one signature must be required")]
    NoRequiredSigs,
    #[error(transparent)]
    ScriptBuilderError(#[from] ScriptBuilderError),
    #[error("provided public keys should not be empty")]
    EmptyKeys,
    #[error("{0} public keys exceed the maximum of {MAX_PUB_KEYS_PER_MULTISIG}")]
    TooManyKeys(usize),
}

/// Generates a multi-signature redeem script from sorted SEC public keys.
///
/// The script requires `required` out of the `pub_keys`, which are used in the
/// given order: signatures must be provided in that same order.
///
/// # Errors
///
/// This function will return an error if:
/// * There are no public keys provided.
/// * The number of provided keys is less than `required`, or `required` is zero.
/// * More than [`MAX_PUB_KEYS_PER_MULTISIG`] keys are provided.
pub fn multisig_redeem_script_sorted<'a>(pub_keys: impl Iterator<Item = &'a [u8]>, required: usize) -> Result<Script, Error> {
    if required == 0 {
        return Err(Error::NoRequiredSigs);
    }
    let mut builder = ScriptBuilder::new();
    builder.add_i64(required as i64)?;

    let mut count = 0usize;
    for pub_key in pub_keys {
        count += 1;
        builder.add_data(pub_key)?;
    }
    if count == 0 {
        return Err(Error::EmptyKeys);
    }
    if count < required {
        return Err(Error::ErrTooManyRequiredSigs);
    }
    if count > MAX_PUB_KEYS_PER_MULTISIG as usize {
        return Err(Error::TooManyKeys(count));
    }

    builder.add_i64(count as i64)?;
    builder.add_op(OpCheckMultiSig)?;
    Ok(builder.drain())
}

/// Sorts the provided public keys by their encoding and then constructs a
/// redeem script requiring `required` out of the sorted keys.
pub fn multisig_redeem_script(pub_keys: &mut [Vec<u8>], required: usize) -> Result<Script, Error> {
    pub_keys.sort();
    multisig_redeem_script_sorted(pub_keys.iter().map(Vec::as_slice), required)
}
