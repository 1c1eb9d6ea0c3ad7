use crate::{
    opcodes::{codes, opcode_to_string, to_small_int},
    script::{PushEncoding, Script, ScriptCommand},
    script_class::ScriptClass,
};
use std::fmt::{Display, Formatter, Write};

/// Multi-line disassembly of a script. Branches are indented, data pushes
/// holding a standard script are expanded as nested redeem scripts, and
/// multisig checks are annotated with their `m of n` parameters.
pub struct ScriptViewer<'a> {
    script: &'a Script,
}

impl<'a> ScriptViewer<'a> {
    pub fn new(script: &'a Script) -> Self {
        Self { script }
    }

    fn write_script(out: &mut String, script: &Script, margin: usize) {
        let cmds = script.cmds();
        let mut indent_level: usize = 0;

        for (i, cmd) in cmds.iter().enumerate() {
            if cmd.is_op(codes::OpEndIf) || cmd.is_op(codes::OpElse) {
                indent_level = indent_level.saturating_sub(1);
            }
            let indent = " ".repeat(margin) + &"  ".repeat(indent_level);
            out.push_str(&indent);

            match cmd {
                ScriptCommand::Data(push) => {
                    // Writing to a String never fails
                    let _ = match push.encoding() {
                        PushEncoding::Direct => write!(out, "OP_PUSHBYTES_{} {}", push.len(), hex::encode(push.data())),
                        PushEncoding::PushData1 => write!(out, "OP_PUSHDATA1 {} {}", push.len(), hex::encode(push.data())),
                        PushEncoding::PushData2 => write!(out, "OP_PUSHDATA2 {} {}", push.len(), hex::encode(push.data())),
                    };
                    if let Ok(nested) = Script::from_raw_bytes(push.data()) {
                        if !nested.is_empty() && ScriptClass::from_script(&nested) != ScriptClass::NonStandard {
                            let _ = write!(out, "\n{indent}    -- Begin Redeem Script --\n");
                            Self::write_script(out, &nested, indent.len() + 4);
                            let _ = write!(out, "{indent}    -- End Redeem Script --");
                        }
                    }
                }
                ScriptCommand::Op(opcode) => {
                    out.push_str(&opcode_to_string(*opcode));
                    if matches!(*opcode, codes::OpCheckMultiSig | codes::OpCheckMultiSigVerify) {
                        if let Some((required, count)) = multisig_params_before(&cmds[..i]) {
                            let _ = write!(out, " // {required} of {count}");
                        }
                    }
                }
            }
            out.push('\n');

            if cmd.is_op(codes::OpIf) || cmd.is_op(codes::OpNotIf) || cmd.is_op(codes::OpElse) {
                indent_level += 1;
            }
        }
    }
}

/// Reads `OP_m <key>... OP_n` at the end of `cmds`.
fn multisig_params_before(cmds: &[ScriptCommand]) -> Option<(usize, usize)> {
    let (count_cmd, rest) = cmds.split_last()?;
    let count = to_small_int(op_value(count_cmd)?)? as usize;
    let (head, keys) = rest.split_at(rest.len().checked_sub(count)?);
    let required = to_small_int(op_value(head.last()?)?)? as usize;
    keys.iter().all(|key| key.as_data().is_some()).then_some((required, count))
}

fn op_value(cmd: &ScriptCommand) -> Option<u8> {
    match cmd {
        ScriptCommand::Op(opcode) => Some(*opcode),
        ScriptCommand::Data(_) => None,
    }
}

impl Display for ScriptViewer<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut out = String::new();
        Self::write_script(&mut out, self.script, 0);
        f.write_str(&out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script_builder::ScriptBuilder;

    #[test]
    fn test_redeem_script_view() {
        let key = [0x02; 33];
        let redeem_script = ScriptBuilder::new()
            .add_i64(1)
            .unwrap()
            .add_data(&key)
            .unwrap()
            .add_i64(1)
            .unwrap()
            .add_op(codes::OpCheckMultiSig)
            .unwrap()
            .drain();
        let signature_script = ScriptBuilder::new()
            .add_op(codes::OpFalse)
            .unwrap()
            .add_data(&[0xaa; 3])
            .unwrap()
            .add_data(&redeem_script.raw_serialize())
            .unwrap()
            .drain();

        let key_hex = hex::encode(key);
        let expected = format!(
            "OP_0\n\
             OP_PUSHBYTES_3 aaaaaa\n\
             OP_PUSHBYTES_37 5121{key_hex}51ae\n    \
             -- Begin Redeem Script --\n    \
             OP_1\n    \
             OP_PUSHBYTES_33 {key_hex}\n    \
             OP_1\n    \
             OP_CHECKMULTISIG // 1 of 1\n    \
             -- End Redeem Script --\n"
        );
        assert_eq!(ScriptViewer::new(&signature_script).to_string(), expected);
    }

    #[test]
    fn test_branches_view() {
        struct Test {
            name: &'static str,
            raw: Vec<u8>,
            expected: &'static str,
        }

        let tests = vec![
            Test {
                name: "if else",
                raw: vec![codes::OpTrue, codes::OpIf, codes::Op2, codes::OpElse, codes::Op3, codes::OpEndIf],
                expected: "OP_1\nOP_IF\n  OP_2\nOP_ELSE\n  OP_3\nOP_ENDIF\n",
            },
            Test {
                name: "nested",
                raw: vec![codes::OpIf, codes::OpNotIf, codes::OpNop, codes::OpEndIf, codes::OpEndIf],
                expected: "OP_IF\n  OP_NOTIF\n    OP_NOP\n  OP_ENDIF\nOP_ENDIF\n",
            },
            Test { name: "unbalanced end", raw: vec![codes::OpEndIf, codes::OpDup], expected: "OP_ENDIF\nOP_DUP\n" },
            Test {
                name: "multisig without parameters",
                raw: vec![codes::OpCheckMultiSigVerify],
                expected: "OP_CHECKMULTISIGVERIFY\n",
            },
        ];

        for test in tests {
            let script = Script::from_raw_bytes(&test.raw).unwrap();
            assert_eq!(ScriptViewer::new(&script).to_string(), test.expected, "test '{}' failed", test.name);
        }

        let script = Script::from_raw_bytes(&[&[codes::OpPushData1, 76][..], &[0x49; 76]].concat()).unwrap();
        assert_eq!(ScriptViewer::new(&script).to_string(), format!("OP_PUSHDATA1 76 {}\n", "49".repeat(76)));
    }
}
