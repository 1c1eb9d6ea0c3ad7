#[macro_use]
mod macros;

use crate::data_stack::{DataStack, OpcodeData};
use crate::{TxScriptEngine, TxScriptError};
use core::cmp::{max, min};
use kestrel_hashes::{hash160, hash256, ripemd160, sha1, sha256};

/// First value in the range formed by the "small integer" Op# opcodes
pub const OP_SMALL_INT_MIN_VAL: u8 = 1;
/// Last value in the range formed by the "small integer" Op# opcodes
pub const OP_SMALL_INT_MAX_VAL: u8 = 16;
/// First value of the direct push range, where the opcode is the data length
pub const OP_DATA_MIN_VAL: u8 = 0x01;
/// Last value of the direct push range
pub const OP_DATA_MAX_VAL: u8 = 0x4b;
/// Minus 1 value
pub const OP_1_NEGATE_VAL: u8 = 0x81;

#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub(crate) enum OpCond {
    False,
    True,
    Skip,
}

impl OpCond {
    pub fn negate(&self) -> OpCond {
        match self {
            OpCond::True => OpCond::False,
            OpCond::False => OpCond::True,
            OpCond::Skip => OpCond::Skip,
        }
    }
}

type OpCodeResult = Result<(), TxScriptError>;

/// The `OP_` name of `opcode`, or `OP_UNKNOWN<n>` for values with no definition.
pub fn opcode_to_string(opcode: u8) -> String {
    match opcode_name(opcode) {
        Some(name) => name.to_string(),
        None => format!("OP_UNKNOWN{opcode}"),
    }
}

/// Disabled opcodes fail a script even inside a branch that is not executed.
pub fn is_disabled(opcode: u8) -> bool {
    matches!(
        opcode,
        codes::OpCat..=codes::OpRight
            | codes::OpInvert..=codes::OpXor
            | codes::Op2Mul
            | codes::Op2Div
            | codes::OpMul..=codes::OpRShift
    )
}

/// Flow control opcodes run in every branch so the condition stack stays balanced.
pub fn is_conditional(opcode: u8) -> bool {
    (codes::OpIf..=codes::OpEndIf).contains(&opcode)
}

/// The number pushed by `OP_0` and `OP_1`..`OP_16`.
pub fn to_small_int(opcode: u8) -> Option<u8> {
    match opcode {
        codes::OpFalse => Some(0),
        codes::OpTrue..=codes::Op16 => Some(opcode - (codes::OpTrue - 1)),
        _ => None,
    }
}

// Helpers for some opcodes with shared data
#[inline]
fn push_number(number: i64, vm: &mut TxScriptEngine<'_>) -> OpCodeResult {
    vm.dstack.push_item(number);
    Ok(())
}

#[inline]
fn push_hash(digest: &[u8], vm: &mut TxScriptEngine<'_>) -> OpCodeResult {
    vm.dstack.push(digest.to_vec());
    Ok(())
}

#[inline]
fn reserved(opcode: u8) -> OpCodeResult {
    Err(TxScriptError::OpcodeReserved(opcode_to_string(opcode)))
}

#[inline]
fn disabled(opcode: u8) -> OpCodeResult {
    Err(TxScriptError::OpcodeDisabled(opcode_to_string(opcode)))
}

#[inline]
fn invalid(opcode: u8) -> OpCodeResult {
    Err(TxScriptError::InvalidOpcode(opcode_to_string(opcode)))
}

fn push_condition(vm: &mut TxScriptEngine<'_>, negate: bool) -> OpCodeResult {
    let mut cond = OpCond::Skip;
    if vm.is_executing() {
        cond = match vm.pop_condition()? {
            true => OpCond::True,
            false => OpCond::False,
        };
        if negate {
            cond = cond.negate();
        }
    }
    vm.cond_stack.push(cond);
    Ok(())
}

/*
The opcode table. Each entry is

    opcode OpName<value, "OP_NAME">(vm) { body }

or, when the value has a second name,

    opcode |OpAlias| OpName<value, "OP_NAME">(vm) { body }

Data pushes (0x01-0x4b, PUSHDATA1, PUSHDATA2) are parsed into data commands and
never reach this table, except when a command list is assembled by hand.
*/
opcode_list! {
    // Constants.
    opcode |Op0| OpFalse<0x00, "OP_0">(vm) {
        vm.dstack.push(vec![]);
        Ok(())
    }

    opcode OpPushData1<0x4c, "OP_PUSHDATA1">(vm) { invalid(codes::OpPushData1) }
    opcode OpPushData2<0x4d, "OP_PUSHDATA2">(vm) { invalid(codes::OpPushData2) }
    opcode OpPushData4<0x4e, "OP_PUSHDATA4">(vm) { invalid(codes::OpPushData4) }

    opcode Op1Negate<0x4f, "OP_1NEGATE">(vm) { push_number(-1, vm) }

    opcode OpReserved<0x50, "OP_RESERVED">(vm) { reserved(codes::OpReserved) }

    opcode |Op1| OpTrue<0x51, "OP_1">(vm) { push_number(1, vm) }
    opcode Op2<0x52, "OP_2">(vm) { push_number(2, vm) }
    opcode Op3<0x53, "OP_3">(vm) { push_number(3, vm) }
    opcode Op4<0x54, "OP_4">(vm) { push_number(4, vm) }
    opcode Op5<0x55, "OP_5">(vm) { push_number(5, vm) }
    opcode Op6<0x56, "OP_6">(vm) { push_number(6, vm) }
    opcode Op7<0x57, "OP_7">(vm) { push_number(7, vm) }
    opcode Op8<0x58, "OP_8">(vm) { push_number(8, vm) }
    opcode Op9<0x59, "OP_9">(vm) { push_number(9, vm) }
    opcode Op10<0x5a, "OP_10">(vm) { push_number(10, vm) }
    opcode Op11<0x5b, "OP_11">(vm) { push_number(11, vm) }
    opcode Op12<0x5c, "OP_12">(vm) { push_number(12, vm) }
    opcode Op13<0x5d, "OP_13">(vm) { push_number(13, vm) }
    opcode Op14<0x5e, "OP_14">(vm) { push_number(14, vm) }
    opcode Op15<0x5f, "OP_15">(vm) { push_number(15, vm) }
    opcode Op16<0x60, "OP_16">(vm) { push_number(16, vm) }

    // Control opcodes.
    opcode OpNop<0x61, "OP_NOP">(vm) { Ok(()) }
    opcode OpVer<0x62, "OP_VER">(vm) { reserved(codes::OpVer) }

    opcode OpIf<0x63, "OP_IF">(vm) { push_condition(vm, false) }
    opcode OpNotIf<0x64, "OP_NOTIF">(vm) { push_condition(vm, true) }

    opcode OpVerIf<0x65, "OP_VERIF">(vm) { reserved(codes::OpVerIf) }
    opcode OpVerNotIf<0x66, "OP_VERNOTIF">(vm) { reserved(codes::OpVerNotIf) }

    opcode OpElse<0x67, "OP_ELSE">(vm) {
        if let Some(cond) = vm.cond_stack.last_mut() {
            *cond = cond.negate();
            Ok(())
        } else {
            Err(TxScriptError::InvalidState("condition stack empty".to_string()))
        }
    }

    opcode OpEndIf<0x68, "OP_ENDIF">(vm) {
        match vm.cond_stack.pop() {
            None => Err(TxScriptError::InvalidState("condition stack empty".to_string())),
            _ => Ok(())
        }
    }

    opcode OpVerify<0x69, "OP_VERIFY">(vm) {
        let [result]: [bool; 1] = vm.dstack.pop_items()?;
        match result {
            true => Ok(()),
            false => Err(TxScriptError::VerifyError)
        }
    }

    opcode OpReturn<0x6a, "OP_RETURN">(vm) { Err(TxScriptError::EarlyReturn) }

    // Stack opcodes.
    opcode OpToAltStack<0x6b, "OP_TOALTSTACK">(vm) {
        let [item] = vm.dstack.pop_raw()?;
        vm.astack.push(item);
        Ok(())
    }

    opcode OpFromAltStack<0x6c, "OP_FROMALTSTACK">(vm) {
        match vm.astack.pop() {
            Some(last) => {
                vm.dstack.push(last);
                Ok(())
            },
            None => Err(TxScriptError::EmptyStack)
        }
    }

    opcode Op2Drop<0x6d, "OP_2DROP">(vm) { vm.dstack.drop_items::<2>() }
    opcode Op2Dup<0x6e, "OP_2DUP">(vm) { vm.dstack.dup_items::<2>() }
    opcode Op3Dup<0x6f, "OP_3DUP">(vm) { vm.dstack.dup_items::<3>() }
    opcode Op2Over<0x70, "OP_2OVER">(vm) { vm.dstack.over_items::<2>() }
    opcode Op2Rot<0x71, "OP_2ROT">(vm) { vm.dstack.rot_items::<2>() }
    opcode Op2Swap<0x72, "OP_2SWAP">(vm) { vm.dstack.swap_items::<2>() }

    opcode OpIfDup<0x73, "OP_IFDUP">(vm) {
        let [result] = vm.dstack.pop_raw()?;
        if <Vec<u8> as OpcodeData<bool>>::deserialize(&result)? {
            vm.dstack.push(result.clone());
        }
        vm.dstack.push(result);
        Ok(())
    }

    opcode OpDepth<0x74, "OP_DEPTH">(vm) { push_number(vm.dstack.len() as i64, vm) }

    opcode OpDrop<0x75, "OP_DROP">(vm) { vm.dstack.drop_items::<1>() }
    opcode OpDup<0x76, "OP_DUP">(vm) { vm.dstack.dup_items::<1>() }

    opcode OpNip<0x77, "OP_NIP">(vm) {
        match vm.dstack.len() >= 2 {
            true => {
                vm.dstack.remove(vm.dstack.len() - 2);
                Ok(())
            }
            false => Err(TxScriptError::InvalidStackOperation(2, vm.dstack.len())),
        }
    }

    opcode OpOver<0x78, "OP_OVER">(vm) { vm.dstack.over_items::<1>() }

    opcode OpPick<0x79, "OP_PICK">(vm) {
        let at = vm.stack_depth_index()?;
        vm.dstack.push(vm.dstack[at].clone());
        Ok(())
    }

    opcode OpRoll<0x7a, "OP_ROLL">(vm) {
        let at = vm.stack_depth_index()?;
        let item = vm.dstack.remove(at);
        vm.dstack.push(item);
        Ok(())
    }

    opcode OpRot<0x7b, "OP_ROT">(vm) { vm.dstack.rot_items::<1>() }
    opcode OpSwap<0x7c, "OP_SWAP">(vm) { vm.dstack.swap_items::<1>() }

    opcode OpTuck<0x7d, "OP_TUCK">(vm) {
        match vm.dstack.split_last() {
            Some((last, rest)) if !rest.is_empty() => {
                let (item, at) = (last.clone(), rest.len() - 1);
                vm.dstack.insert(at, item);
                Ok(())
            }
            _ => Err(TxScriptError::InvalidStackOperation(2, vm.dstack.len())),
        }
    }

    // Splice opcodes.
    opcode OpCat<0x7e, "OP_CAT">(vm) { disabled(codes::OpCat) }
    opcode OpSubStr<0x7f, "OP_SUBSTR">(vm) { disabled(codes::OpSubStr) }
    opcode OpLeft<0x80, "OP_LEFT">(vm) { disabled(codes::OpLeft) }
    opcode OpRight<0x81, "OP_RIGHT">(vm) { disabled(codes::OpRight) }

    opcode OpSize<0x82, "OP_SIZE">(vm) {
        match vm.dstack.last() {
            Some(last) => {
                let size = last.len() as i64;
                vm.dstack.push_item(size);
                Ok(())
            },
            None => Err(TxScriptError::EmptyStack)
        }
    }

    // Bitwise logic opcodes.
    opcode OpInvert<0x83, "OP_INVERT">(vm) { disabled(codes::OpInvert) }
    opcode OpAnd<0x84, "OP_AND">(vm) { disabled(codes::OpAnd) }
    opcode OpOr<0x85, "OP_OR">(vm) { disabled(codes::OpOr) }
    opcode OpXor<0x86, "OP_XOR">(vm) { disabled(codes::OpXor) }

    opcode OpEqual<0x87, "OP_EQUAL">(vm) {
        let [a, b] = vm.dstack.pop_raw()?;
        vm.dstack.push_item(a == b);
        Ok(())
    }

    opcode OpEqualVerify<0x88, "OP_EQUALVERIFY">(vm) {
        let [a, b] = vm.dstack.pop_raw()?;
        match a == b {
            true => Ok(()),
            false => Err(TxScriptError::VerifyError),
        }
    }

    opcode OpReserved1<0x89, "OP_RESERVED1">(vm) { reserved(codes::OpReserved1) }
    opcode OpReserved2<0x8a, "OP_RESERVED2">(vm) { reserved(codes::OpReserved2) }

    // Numeric related opcodes.
    opcode Op1Add<0x8b, "OP_1ADD">(vm) {
        let [value]: [i64; 1] = vm.dstack.pop_items()?;
        vm.dstack.push_item(value + 1);
        Ok(())
    }

    opcode Op1Sub<0x8c, "OP_1SUB">(vm) {
        let [value]: [i64; 1] = vm.dstack.pop_items()?;
        vm.dstack.push_item(value - 1);
        Ok(())
    }

    opcode Op2Mul<0x8d, "OP_2MUL">(vm) { disabled(codes::Op2Mul) }
    opcode Op2Div<0x8e, "OP_2DIV">(vm) { disabled(codes::Op2Div) }

    opcode OpNegate<0x8f, "OP_NEGATE">(vm) {
        let [value]: [i64; 1] = vm.dstack.pop_items()?;
        vm.dstack.push_item(-value);
        Ok(())
    }

    opcode OpAbs<0x90, "OP_ABS">(vm) {
        let [m]: [i64; 1] = vm.dstack.pop_items()?;
        vm.dstack.push_item(m.abs());
        Ok(())
    }

    opcode OpNot<0x91, "OP_NOT">(vm) {
        let [m]: [i64; 1] = vm.dstack.pop_items()?;
        vm.dstack.push_item((m == 0) as i64);
        Ok(())
    }

    opcode Op0NotEqual<0x92, "OP_0NOTEQUAL">(vm) {
        let [m]: [i64; 1] = vm.dstack.pop_items()?;
        vm.dstack.push_item((m != 0) as i64);
        Ok(())
    }

    opcode OpAdd<0x93, "OP_ADD">(vm) {
        let [a, b]: [i64; 2] = vm.dstack.pop_items()?;
        vm.dstack.push_item(a + b);
        Ok(())
    }

    opcode OpSub<0x94, "OP_SUB">(vm) {
        let [a, b]: [i64; 2] = vm.dstack.pop_items()?;
        vm.dstack.push_item(a - b);
        Ok(())
    }

    opcode OpMul<0x95, "OP_MUL">(vm) { disabled(codes::OpMul) }
    opcode OpDiv<0x96, "OP_DIV">(vm) { disabled(codes::OpDiv) }
    opcode OpMod<0x97, "OP_MOD">(vm) { disabled(codes::OpMod) }
    opcode OpLShift<0x98, "OP_LSHIFT">(vm) { disabled(codes::OpLShift) }
    opcode OpRShift<0x99, "OP_RSHIFT">(vm) { disabled(codes::OpRShift) }

    opcode OpBoolAnd<0x9a, "OP_BOOLAND">(vm) {
        let [a, b]: [i64; 2] = vm.dstack.pop_items()?;
        vm.dstack.push_item(((a != 0) && (b != 0)) as i64);
        Ok(())
    }

    opcode OpBoolOr<0x9b, "OP_BOOLOR">(vm) {
        let [a, b]: [i64; 2] = vm.dstack.pop_items()?;
        vm.dstack.push_item(((a != 0) || (b != 0)) as i64);
        Ok(())
    }

    opcode OpNumEqual<0x9c, "OP_NUMEQUAL">(vm) {
        let [a, b]: [i64; 2] = vm.dstack.pop_items()?;
        vm.dstack.push_item((a == b) as i64);
        Ok(())
    }

    opcode OpNumEqualVerify<0x9d, "OP_NUMEQUALVERIFY">(vm) {
        let [a, b]: [i64; 2] = vm.dstack.pop_items()?;
        match a == b {
            true => Ok(()),
            false => Err(TxScriptError::VerifyError)
        }
    }

    opcode OpNumNotEqual<0x9e, "OP_NUMNOTEQUAL">(vm) {
        let [a, b]: [i64; 2] = vm.dstack.pop_items()?;
        vm.dstack.push_item((a != b) as i64);
        Ok(())
    }

    opcode OpLessThan<0x9f, "OP_LESSTHAN">(vm) {
        let [a, b]: [i64; 2] = vm.dstack.pop_items()?;
        vm.dstack.push_item((a < b) as i64);
        Ok(())
    }

    opcode OpGreaterThan<0xa0, "OP_GREATERTHAN">(vm) {
        let [a, b]: [i64; 2] = vm.dstack.pop_items()?;
        vm.dstack.push_item((a > b) as i64);
        Ok(())
    }

    opcode OpLessThanOrEqual<0xa1, "OP_LESSTHANOREQUAL">(vm) {
        let [a, b]: [i64; 2] = vm.dstack.pop_items()?;
        vm.dstack.push_item((a <= b) as i64);
        Ok(())
    }

    opcode OpGreaterThanOrEqual<0xa2, "OP_GREATERTHANOREQUAL">(vm) {
        let [a, b]: [i64; 2] = vm.dstack.pop_items()?;
        vm.dstack.push_item((a >= b) as i64);
        Ok(())
    }

    opcode OpMin<0xa3, "OP_MIN">(vm) {
        let [a, b]: [i64; 2] = vm.dstack.pop_items()?;
        vm.dstack.push_item(min(a, b));
        Ok(())
    }

    opcode OpMax<0xa4, "OP_MAX">(vm) {
        let [a, b]: [i64; 2] = vm.dstack.pop_items()?;
        vm.dstack.push_item(max(a, b));
        Ok(())
    }

    opcode OpWithin<0xa5, "OP_WITHIN">(vm) {
        let [x, l, u]: [i64; 3] = vm.dstack.pop_items()?;
        vm.dstack.push_item((x >= l && x < u) as i64);
        Ok(())
    }

    // Crypto opcodes.
    opcode OpRipeMd160<0xa6, "OP_RIPEMD160">(vm) {
        let [last] = vm.dstack.pop_raw()?;
        push_hash(ripemd160(&last).as_ref(), vm)
    }

    opcode OpSha1<0xa7, "OP_SHA1">(vm) {
        let [last] = vm.dstack.pop_raw()?;
        push_hash(&sha1(&last), vm)
    }

    opcode OpSha256<0xa8, "OP_SHA256">(vm) {
        let [last] = vm.dstack.pop_raw()?;
        push_hash(sha256(&last).as_ref(), vm)
    }

    opcode OpHash160<0xa9, "OP_HASH160">(vm) {
        let [last] = vm.dstack.pop_raw()?;
        push_hash(hash160(&last).as_ref(), vm)
    }

    opcode OpHash256<0xaa, "OP_HASH256">(vm) {
        let [last] = vm.dstack.pop_raw()?;
        push_hash(hash256(&last).as_ref(), vm)
    }

    // Signatures commit to the whole script, so there is nothing to separate.
    opcode OpCodeSeparator<0xab, "OP_CODESEPARATOR">(vm) { Ok(()) }

    opcode OpCheckSig<0xac, "OP_CHECKSIG">(vm) {
        let [sig, key] = vm.dstack.pop_raw()?;
        let valid = vm.check_signature(&sig, &key)?;
        vm.dstack.push_item(valid);
        Ok(())
    }

    opcode OpCheckSigVerify<0xad, "OP_CHECKSIGVERIFY">(vm) {
        let [sig, key] = vm.dstack.pop_raw()?;
        match vm.check_signature(&sig, &key)? {
            true => Ok(()),
            false => Err(TxScriptError::VerifyError),
        }
    }

    opcode OpCheckMultiSig<0xae, "OP_CHECKMULTISIG">(vm) {
        let valid = vm.op_check_multisig()?;
        vm.dstack.push_item(valid);
        Ok(())
    }

    opcode OpCheckMultiSigVerify<0xaf, "OP_CHECKMULTISIGVERIFY">(vm) {
        match vm.op_check_multisig()? {
            true => Ok(()),
            false => Err(TxScriptError::VerifyError),
        }
    }

    // Expansion opcodes. Lock times belong to transactions, which are out of reach
    // of a lone script, so CLTV and CSV keep their original NOP behavior.
    opcode OpNop1<0xb0, "OP_NOP1">(vm) { Ok(()) }
    opcode |OpNop2| OpCheckLockTimeVerify<0xb1, "OP_CHECKLOCKTIMEVERIFY">(vm) { Ok(()) }
    opcode |OpNop3| OpCheckSequenceVerify<0xb2, "OP_CHECKSEQUENCEVERIFY">(vm) { Ok(()) }
    opcode OpNop4<0xb3, "OP_NOP4">(vm) { Ok(()) }
    opcode OpNop5<0xb4, "OP_NOP5">(vm) { Ok(()) }
    opcode OpNop6<0xb5, "OP_NOP6">(vm) { Ok(()) }
    opcode OpNop7<0xb6, "OP_NOP7">(vm) { Ok(()) }
    opcode OpNop8<0xb7, "OP_NOP8">(vm) { Ok(()) }
    opcode OpNop9<0xb8, "OP_NOP9">(vm) { Ok(()) }
    opcode OpNop10<0xb9, "OP_NOP10">(vm) { Ok(()) }
}
