pub mod caches;
mod data_stack;
pub mod opcodes;
pub mod script;
pub mod script_builder;
pub mod script_class;
pub mod standard;
pub mod varint;
pub mod viewer;

use crate::caches::Cache;
use crate::data_stack::{DataStack, OpcodeData, Stack};
use crate::opcodes::{OpCond, codes, is_conditional, is_disabled, opcode_to_string};
use kestrel_ecc::{PublicKey, Signature};
use kestrel_hashes::HASH160_SIZE;
use log::{debug, trace};
use num_bigint::BigUint;
use serde::Deserialize;
use std::iter::once;

pub use kestrel_txscript_errors::TxScriptError;
pub use script::{DataPush, PushEncoding, Script, ScriptCommand};
pub use standard::*;

pub const MAX_STACK_SIZE: usize = 1000;
pub const MAX_SCRIPTS_SIZE: usize = 10_000;
pub const MAX_SCRIPT_ELEMENT_SIZE: usize = 520;
pub const MAX_OPS_PER_SCRIPT: i32 = 201;
pub const MAX_PUB_KEYS_PER_MULTISIG: i32 = 20;
pub const DEFAULT_SIG_CACHE_SIZE: u64 = 10_000;

/// Appended to every signature pushed by a signature script.
pub const SIG_HASH_ALL: u8 = 0x01;

// The last opcode that does not count toward operations.
// Note that this includes OP_RESERVED which counts as a push operation.
pub const NO_COST_OPCODE: u8 = 0x60;

/// Optional policy checks layered on top of consensus evaluation.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct EngineFlags {
    /// Malformed DER signatures or SEC keys fail the script instead of failing the check
    pub strict_encoding: bool,
    /// Data pushes must use the shortest encoding
    pub minimal_data: bool,
    /// IF and NOTIF arguments must be empty or exactly `0x01`
    pub minimal_if: bool,
    pub sig_cache_size: u64,
}

impl Default for EngineFlags {
    fn default() -> Self {
        Self { strict_encoding: false, minimal_data: false, minimal_if: false, sig_cache_size: DEFAULT_SIG_CACHE_SIZE }
    }
}

#[derive(Clone, Hash, PartialEq, Eq, Debug)]
pub struct SigCacheKey {
    signature: Vec<u8>,
    pub_key: Vec<u8>,
    message: BigUint,
}

pub struct TxScriptEngine<'a> {
    dstack: Stack,
    astack: Stack,

    cmds: Vec<ScriptCommand>,
    // Command indices where a concatenated script or a redeem script begins
    segment_starts: Vec<usize>,
    pc: usize,
    z: BigUint,

    // Outer cache for quicker verification
    sig_cache: &'a Cache<SigCacheKey, bool>,
    flags: EngineFlags,

    cond_stack: Vec<OpCond>, // Following if stacks, and whether it is running

    num_ops: i32,
}

impl<'a> TxScriptEngine<'a> {
    pub fn new(z: BigUint, sig_cache: &'a Cache<SigCacheKey, bool>, flags: EngineFlags) -> Self {
        Self {
            dstack: vec![],
            astack: vec![],
            cmds: vec![],
            segment_starts: vec![],
            pc: 0,
            z,
            sig_cache,
            flags,
            cond_stack: vec![],
            num_ops: 0,
        }
    }

    /// Creates an engine running the commands of `script` against digest `z`. To run a
    /// spend, pass the concatenation `script_sig + script_pubkey`. Operation and size
    /// limits apply to each concatenated part separately.
    pub fn from_script(script: &Script, z: BigUint, sig_cache: &'a Cache<SigCacheKey, bool>, flags: EngineFlags) -> Self {
        Self {
            cmds: script.cmds().to_vec(),
            segment_starts: script.segment_starts().to_vec(),
            ..Self::new(z, sig_cache, flags)
        }
    }

    /// The data stack, bottom first.
    pub fn stack(&self) -> &[Vec<u8>] {
        &self.dstack
    }

    #[inline]
    pub fn is_executing(&self) -> bool {
        self.cond_stack.last().is_none_or(|cond| *cond == OpCond::True)
    }

    fn execute_opcode(&mut self, opcode: u8) -> Result<(), TxScriptError> {
        if is_disabled(opcode) {
            return Err(TxScriptError::OpcodeDisabled(opcode_to_string(opcode)));
        }
        if opcode > NO_COST_OPCODE {
            self.num_ops += 1;
            if self.num_ops > MAX_OPS_PER_SCRIPT {
                return Err(TxScriptError::TooManyOperations(MAX_OPS_PER_SCRIPT));
            }
        }

        if self.is_executing() || is_conditional(opcode) {
            trace!("Executing {} with stack depth {}", opcode_to_string(opcode), self.dstack.len());
            opcodes::execute_opcode(opcode, self)
        } else {
            Ok(())
        }
    }

    fn execute_command(&mut self, cmd: ScriptCommand) -> Result<(), TxScriptError> {
        let push = match cmd {
            ScriptCommand::Op(opcode) => return self.execute_opcode(opcode),
            ScriptCommand::Data(push) => push,
        };
        if push.len() > MAX_SCRIPT_ELEMENT_SIZE {
            return Err(TxScriptError::ElementTooBig(push.len(), MAX_SCRIPT_ELEMENT_SIZE));
        }
        if !self.is_executing() {
            return Ok(());
        }
        if self.flags.minimal_data && !push.is_minimal() {
            return Err(TxScriptError::NotMinimalData(format!(
                "data push {:x?} is encoded with {:?}",
                push.data(),
                push.encoding()
            )));
        }
        let data = push.into_data();
        if self.redeem_script_follows() { self.execute_p2sh(data) } else {
            self.dstack.push(data);
            Ok(())
        }
    }

    /// Whether the remaining commands are exactly `OP_HASH160 <20 bytes> OP_EQUAL`.
    fn redeem_script_follows(&self) -> bool {
        matches!(
            &self.cmds[self.pc..],
            [ScriptCommand::Op(codes::OpHash160), ScriptCommand::Data(hash), ScriptCommand::Op(codes::OpEqual)]
                if hash.len() == HASH160_SIZE
        )
    }

    /// Advances to the next command. The operation count restarts with every script.
    fn next_command(&mut self) -> Option<ScriptCommand> {
        let cmd = self.cmds.get(self.pc).cloned()?;
        if self.segment_starts.contains(&self.pc) {
            self.num_ops = 0;
        }
        self.pc += 1;
        Some(cmd)
    }

    fn check_script_sizes(&self) -> Result<(), TxScriptError> {
        let mut bounds: Vec<usize> = once(0).chain(self.segment_starts.iter().copied()).chain(once(self.cmds.len())).collect();
        bounds.sort_unstable();
        bounds.dedup();
        for window in bounds.windows(2) {
            let script_size: usize = self.cmds[window[0]..window[1]].iter().map(ScriptCommand::serialized_len).sum();
            if script_size > MAX_SCRIPTS_SIZE {
                return Err(TxScriptError::ScriptSize(script_size, MAX_SCRIPTS_SIZE));
            }
        }
        Ok(())
    }

    fn execute_p2sh(&mut self, redeem_script: Vec<u8>) -> Result<(), TxScriptError> {
        self.dstack.push(redeem_script.clone());
        while let Some(cmd) = self.next_command() {
            self.execute_command(cmd)?;
        }
        let [matched]: [bool; 1] = self.dstack.pop_items()?;
        if !matched {
            return Err(TxScriptError::VerifyError);
        }
        let redeem_script = Script::from_raw_bytes(&redeem_script)?;
        debug!("Running redeem script {redeem_script}");
        self.segment_starts.push(self.cmds.len());
        self.cmds.extend(redeem_script.into_cmds());
        Ok(())
    }

    pub fn execute(&mut self) -> Result<(), TxScriptError> {
        // An empty script leaves an empty stack, which is equivalent to a false top element
        if self.cmds.is_empty() {
            return Err(TxScriptError::EvalFalse);
        }
        self.check_script_sizes()?;

        while let Some(cmd) = self.next_command() {
            self.execute_command(cmd)?;

            let combined_size = self.astack.len() + self.dstack.len();
            if combined_size > MAX_STACK_SIZE {
                return Err(TxScriptError::StackSizeExceeded(combined_size, MAX_STACK_SIZE));
            }
        }

        if !self.cond_stack.is_empty() {
            return Err(TxScriptError::ErrUnbalancedConditional);
        }
        self.check_error_condition()
    }

    // Returns Ok(()) if the script has ended leaving exactly one true element on the stack
    #[inline]
    fn check_error_condition(&mut self) -> Result<(), TxScriptError> {
        if self.dstack.len() > 1 {
            return Err(TxScriptError::CleanStack(self.dstack.len() - 1));
        } else if self.dstack.is_empty() {
            return Err(TxScriptError::EmptyStack);
        }

        let [v]: [bool; 1] = self.dstack.pop_items()?;
        match v {
            true => Ok(()),
            false => Err(TxScriptError::EvalFalse),
        }
    }

    fn pop_condition(&mut self) -> Result<bool, TxScriptError> {
        let cond = self.dstack.pop().ok_or(TxScriptError::EmptyStack)?;
        if self.flags.minimal_if && (cond.len() > 1 || cond.first().is_some_and(|&b| b != 1)) {
            return Err(TxScriptError::NotMinimalIf(cond));
        }
        <Vec<u8> as OpcodeData<bool>>::deserialize(&cond)
    }

    /// Pops an index for PICK and ROLL and resolves it to a position in the stack.
    fn stack_depth_index(&mut self) -> Result<usize, TxScriptError> {
        let [depth]: [i32; 1] = self.dstack.pop_items()?;
        let depth = usize::try_from(depth).map_err(|_| TxScriptError::InvalidState(format!("negative stack index {depth}")))?;
        self.dstack.len().checked_sub(depth + 1).ok_or(TxScriptError::InvalidStackOperation(depth + 1, self.dstack.len()))
    }

    // *** SIGNATURE SPECIFIC CODE **

    fn encoding_failure(&self, err: TxScriptError) -> Result<bool, TxScriptError> {
        if self.flags.strict_encoding {
            return Err(err);
        }
        debug!("Signature check failed: {err}");
        Ok(false)
    }

    fn check_signature(&self, sig: &[u8], key: &[u8]) -> Result<bool, TxScriptError> {
        // The trailing sighash type byte is not interpreted: the digest is given
        let Some((_, der)) = sig.split_last() else {
            return Ok(false);
        };
        let sig_cache_key = SigCacheKey { signature: der.to_vec(), pub_key: key.to_vec(), message: self.z.clone() };
        if let Some(valid) = self.sig_cache.get(&sig_cache_key) {
            return Ok(valid);
        }

        let signature = match Signature::from_der(der) {
            Ok(signature) => signature,
            Err(e) => return self.encoding_failure(TxScriptError::SignatureFormat(e.to_string())),
        };
        let pub_key = match PublicKey::from_sec(key) {
            Ok(pub_key) => pub_key,
            Err(e) => return self.encoding_failure(TxScriptError::PubKeyFormat(e.to_string())),
        };
        let valid = pub_key.verify(&self.z, &signature);
        self.sig_cache.insert(sig_cache_key, valid);
        Ok(valid)
    }

    fn op_check_multisig(&mut self) -> Result<bool, TxScriptError> {
        let [num_keys]: [i32; 1] = self.dstack.pop_items()?;
        if num_keys < 0 {
            return Err(TxScriptError::InvalidPubKeyCount(format!("number of pubkeys {num_keys} is negative")));
        } else if num_keys > MAX_PUB_KEYS_PER_MULTISIG {
            return Err(TxScriptError::InvalidPubKeyCount(format!("too many pubkeys {num_keys} > {MAX_PUB_KEYS_PER_MULTISIG}")));
        }
        let num_keys_usize = num_keys as usize;

        self.num_ops += num_keys;
        if self.num_ops > MAX_OPS_PER_SCRIPT {
            return Err(TxScriptError::TooManyOperations(MAX_OPS_PER_SCRIPT));
        }

        let pub_keys = match self.dstack.len() >= num_keys_usize {
            true => self.dstack.split_off(self.dstack.len() - num_keys_usize),
            false => return Err(TxScriptError::InvalidStackOperation(num_keys_usize, self.dstack.len())),
        };

        let [num_sigs]: [i32; 1] = self.dstack.pop_items()?;
        if num_sigs < 0 {
            return Err(TxScriptError::InvalidSignatureCount(format!("number of signatures {num_sigs} is negative")));
        } else if num_sigs > num_keys {
            return Err(TxScriptError::InvalidSignatureCount(format!("more signatures than pubkeys {num_sigs} > {num_keys}")));
        }
        let num_sigs = num_sigs as usize;

        let signatures = match self.dstack.len() >= num_sigs {
            true => self.dstack.split_off(self.dstack.len() - num_sigs),
            false => return Err(TxScriptError::InvalidStackOperation(num_sigs, self.dstack.len())),
        };

        // The extra element consumed by the original implementation of CHECKMULTISIG
        let [_dummy] = self.dstack.pop_raw::<1>()?;

        let mut failed = false;
        let mut pub_key_iter = pub_keys.iter();
        'outer: for (sig_idx, signature) in signatures.iter().enumerate() {
            if signature.is_empty() {
                failed = true;
                break;
            }

            // Advance through the pub_keys iterator.
            // Note every check consumes the public key
            loop {
                if pub_key_iter.len() < num_sigs - sig_idx {
                    // More signatures than public keys remain, so some must be invalid
                    failed = true;
                    break 'outer;
                }
                let pub_key = pub_key_iter.next().expect("checked the remaining length");
                if self.check_signature(signature, pub_key)? {
                    break;
                }
            }
        }

        Ok(!failed)
    }
}
