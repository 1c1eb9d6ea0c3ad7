use crate::{
    MAX_SCRIPT_ELEMENT_SIZE, MAX_SCRIPTS_SIZE,
    data_stack::OpcodeData,
    opcodes::{OP_1_NEGATE_VAL, OP_SMALL_INT_MAX_VAL, codes::*},
    script::{DataPush, Script, ScriptCommand},
};
use thiserror::Error;

#[derive(Error, PartialEq, Eq, Debug, Clone, Copy)]
pub enum ScriptBuilderError {
    #[error("adding opcode {0} would exceed the maximum allowed canonical script length of {MAX_SCRIPTS_SIZE}")]
    OpCodeRejected(u8),

    #[error("adding {0} opcodes would exceed the maximum allowed canonical script length of {MAX_SCRIPTS_SIZE}")]
    OpCodesRejected(usize),

    #[error("adding {0} bytes of data would exceed the maximum allowed canonical script length of {MAX_SCRIPTS_SIZE}")]
    DataRejected(usize),

    #[error("adding a data element of {0} bytes exceed the maximum allowed script element size of {MAX_SCRIPT_ELEMENT_SIZE}")]
    ElementExceedsMaxSize(usize),

    #[error("adding integer {0} would exceed the maximum allowed canonical script length of {MAX_SCRIPTS_SIZE}")]
    IntegerRejected(i64),
}
pub type ScriptBuilderResult<T> = std::result::Result<T, ScriptBuilderError>;

/// ScriptBuilder provides a facility for building custom scripts. It allows
/// you to push opcodes, ints, and data while respecting canonical encoding. In
/// general it does not ensure the script will execute correctly, however any
/// data pushes which would exceed the maximum allowed script engine limits and
/// are therefore guaranteed not to execute will not be pushed and will result in
/// an error.
///
/// For example, the following would build a 2-of-3 multisig script (although in
/// this situation [`multisig_redeem_script`](crate::multisig_redeem_script) would
/// be a better choice to generate the script):
///
/// ```
/// use kestrel_txscript::opcodes::codes::*;
/// use kestrel_txscript::script_builder::{ScriptBuilderResult, ScriptBuilder};
/// use kestrel_txscript::Script;
/// fn build_multisig_script(pub_key1: &[u8], pub_key2: &[u8], pub_key3: &[u8]) -> ScriptBuilderResult<Script> {
///     Ok(ScriptBuilder::new()
///         .add_op(Op2)?
///         .add_data(pub_key1)?.add_data(pub_key2)?.add_data(pub_key3)?
///         .add_op(Op3)?
///         .add_op(OpCheckMultiSig)?
///         .drain())
/// }
/// ```
#[derive(Default)]
pub struct ScriptBuilder {
    cmds: Vec<ScriptCommand>,
    // Serialized length of `cmds`
    raw_len: usize,
}

impl ScriptBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(&self) -> &[ScriptCommand] {
        &self.cmds
    }

    pub fn raw_len(&self) -> usize {
        self.raw_len
    }

    /// Takes the built script, leaving the builder empty.
    pub fn drain(&mut self) -> Script {
        self.raw_len = 0;
        Script::new(std::mem::take(&mut self.cmds))
    }

    /// Pushes the passed opcode to the end of the script. The script will not
    /// be modified if pushing the opcode would cause the script to exceed the
    /// maximum allowed script engine size.
    pub fn add_op(&mut self, opcode: u8) -> ScriptBuilderResult<&mut Self> {
        if self.raw_len >= MAX_SCRIPTS_SIZE {
            return Err(ScriptBuilderError::OpCodeRejected(opcode));
        }
        self.push_op(opcode);
        Ok(self)
    }

    pub fn add_ops(&mut self, opcodes: &[u8]) -> ScriptBuilderResult<&mut Self> {
        if self.raw_len + opcodes.len() > MAX_SCRIPTS_SIZE {
            return Err(ScriptBuilderError::OpCodesRejected(opcodes.len()));
        }
        opcodes.iter().for_each(|&opcode| self.push_op(opcode));
        Ok(self)
    }

    fn push_op(&mut self, opcode: u8) {
        self.cmds.push(ScriptCommand::Op(opcode));
        self.raw_len += 1;
    }

    /// The opcode pushing `data` on its own, if there is one.
    fn small_int_opcode(data: &[u8]) -> Option<u8> {
        match data {
            [] | [0] => Some(Op0),
            [n @ 1..=OP_SMALL_INT_MAX_VAL] => Some((Op1 - 1) + n),
            [OP_1_NEGATE_VAL] => Some(Op1Negate),
            _ => None,
        }
    }

    /// Returns the number of bytes the canonical encoding of the data will take.
    pub fn canonical_data_size(data: &[u8]) -> usize {
        let data_len = data.len();
        if Self::small_int_opcode(data).is_some() {
            return 1;
        }

        data_len
            + if data_len <= OP_DATA_MAX_LEN {
                1 // length encoded as the opcode
            } else if data_len <= u8::MAX as usize {
                2 // length encoded as OpPushData1 + 1 byte for value
            } else if data_len <= u16::MAX as usize {
                3 // length encoded as OpPushData2 + 2 bytes for value
            } else {
                5 // length encoded as OpPushData4 + 4 bytes for value
            }
    }

    /// Pushes data using the canonical opcodes, without checking any limit.
    fn add_raw_data(&mut self, data: &[u8]) -> ScriptBuilderResult<&mut Self> {
        if let Some(opcode) = Self::small_int_opcode(data) {
            self.push_op(opcode);
            return Ok(self);
        }
        let push = DataPush::new(data.to_vec()).map_err(|_| ScriptBuilderError::DataRejected(Self::canonical_data_size(data)))?;
        self.raw_len += push.serialized_len();
        self.cmds.push(ScriptCommand::Data(push));
        Ok(self)
    }

    /// Skips the size checks of [`Self::add_data`], for tests building scripts
    /// that are intentionally too large.
    #[cfg(test)]
    pub fn add_data_unchecked(&mut self, data: &[u8]) -> &mut Self {
        self.add_raw_data(data).expect("test pushes are below 64 KiB")
    }

    /// Pushes the passed data to the end of the script. It automatically
    /// chooses canonical opcodes depending on the length of the data.
    ///
    /// A zero length buffer will lead to a push of empty data onto the stack (Op0 = OpFalse)
    /// and any push of data greater than [`MAX_SCRIPT_ELEMENT_SIZE`] will not modify
    /// the script since that is not allowed by the script engine.
    ///
    /// Also, the script will not be modified if pushing the data would cause the script to
    /// exceed the maximum allowed script engine size [`MAX_SCRIPTS_SIZE`].
    pub fn add_data(&mut self, data: &[u8]) -> ScriptBuilderResult<&mut Self> {
        let data_size = Self::canonical_data_size(data);
        if self.raw_len + data_size > MAX_SCRIPTS_SIZE {
            return Err(ScriptBuilderError::DataRejected(data_size));
        }

        let data_len = data.len();
        if data_len > MAX_SCRIPT_ELEMENT_SIZE {
            return Err(ScriptBuilderError::ElementExceedsMaxSize(data_len));
        }

        self.add_raw_data(data)
    }

    pub fn add_i64(&mut self, val: i64) -> ScriptBuilderResult<&mut Self> {
        if self.raw_len + 1 > MAX_SCRIPTS_SIZE {
            return Err(ScriptBuilderError::IntegerRejected(val));
        }

        // Fast path for small integers and Op1Negate.
        if val == 0 {
            self.push_op(Op0);
            return Ok(self);
        }
        if val == -1 || (1..=16).contains(&val) {
            self.push_op(((Op1 as i64 - 1) + val) as u8);
            return Ok(self);
        }

        let bytes: Vec<_> = OpcodeData::serialize(&val);
        self.add_data(&bytes)
    }
}

const OP_DATA_MAX_LEN: usize = crate::opcodes::OP_DATA_MAX_VAL as usize;

#[cfg(test)]
mod tests {
    use super::*;
    use std::iter::{once, repeat_n};

    // Tests that pushing opcodes to a script via the ScriptBuilder API works as expected.
    #[test]
    fn test_add_op() {
        struct Test {
            name: &'static str,
            opcodes: Vec<u8>,
            expected: Vec<u8>,
        }

        let tests = vec![
            Test { name: "push OP_FALSE", opcodes: vec![OpFalse], expected: vec![OpFalse] },
            Test { name: "push OP_TRUE", opcodes: vec![OpTrue], expected: vec![OpTrue] },
            Test { name: "push OP_0", opcodes: vec![Op0], expected: vec![Op0] },
            Test { name: "push OP_1 OP_2", opcodes: vec![Op1, Op2], expected: vec![Op1, Op2] },
            Test { name: "push OP_HASH160 OP_EQUAL", opcodes: vec![OpHash160, OpEqual], expected: vec![0xa9, 0x87] },
        ];

        // Run tests and individually add each op via add_op.
        for test in tests.iter() {
            let mut builder = ScriptBuilder::new();
            test.opcodes.iter().for_each(|opcode| {
                builder.add_op(*opcode).expect("the script is canonical");
            });
            assert_eq!(builder.raw_len(), test.expected.len(), "{} wrong length using add_op", test.name);
            assert_eq!(builder.drain().raw_serialize(), test.expected, "{} wrong result using add_op", test.name);
        }

        // Run tests and bulk add ops via add_ops.
        for test in tests.iter() {
            let mut builder = ScriptBuilder::new();
            let result = builder.add_ops(&test.opcodes).expect("the script is canonical").drain();
            assert_eq!(result.raw_serialize(), test.expected, "{} wrong result using add_ops", test.name);
        }
    }

    /// Tests that pushing signed integers to a script via the ScriptBuilder API works as expected.
    #[test]
    fn test_add_i64() {
        struct Test {
            name: &'static str,
            val: i64,
            expected: Vec<u8>,
        }

        let mut tests = vec![
            Test { name: "push -1", val: -1, expected: vec![Op1Negate] },
            Test { name: "push small int 0", val: 0, expected: vec![Op0] },
            Test { name: "push 17", val: 17, expected: vec![0x01, 0x11] },
            Test { name: "push 65", val: 65, expected: vec![0x01, 0x41] },
            Test { name: "push 127", val: 127, expected: vec![0x01, 0x7f] },
            Test { name: "push 128", val: 128, expected: vec![0x02, 0x80, 0] },
            Test { name: "push 255", val: 255, expected: vec![0x02, 0xff, 0] },
            Test { name: "push 256", val: 256, expected: vec![0x02, 0, 0x01] },
            Test { name: "push 32767", val: 32767, expected: vec![0x02, 0xff, 0x7f] },
            Test { name: "push 32768", val: 32768, expected: vec![0x03, 0, 0x80, 0] },
            Test { name: "push -2", val: -2, expected: vec![0x01, 0x82] },
            Test { name: "push -17", val: -17, expected: vec![0x01, 0x91] },
            Test { name: "push -127", val: -127, expected: vec![0x01, 0xff] },
            Test { name: "push -128", val: -128, expected: vec![0x02, 0x80, 0x80] },
            Test { name: "push -256", val: -256, expected: vec![0x02, 0x00, 0x81] },
            Test { name: "push -32768", val: -32768, expected: vec![0x03, 0x00, 0x80, 0x80] },
        ];
        tests.extend((1..=16).map(|val| Test { name: "push small int", val, expected: vec![Op1 + val as u8 - 1] }));

        for test in tests {
            let result = ScriptBuilder::new().add_i64(test.val).expect("the script is canonical").drain();
            assert_eq!(result.raw_serialize(), test.expected, "{} ({}) wrong result", test.name, test.val);
        }
    }

    /// Tests that pushing data to a script via the ScriptBuilder API uses the
    /// shortest encoding.
    #[test]
    fn test_add_data() {
        struct Test {
            name: &'static str,
            data: Vec<u8>,
            expected: ScriptBuilderResult<Vec<u8>>,
            /// use add_data_unchecked instead of add_data
            unchecked: bool,
        }

        let mut tests = vec![
            // Pushing an empty byte sequence must use OP_0.
            Test { name: "push empty byte sequence", data: vec![], expected: Ok(vec![Op0]), unchecked: false },
            Test { name: "push 1 byte 0x00", data: vec![0x00], expected: Ok(vec![Op0]), unchecked: false },
            Test { name: "push 1 byte 0x81", data: vec![0x81], expected: Ok(vec![Op1Negate]), unchecked: false },
            // Any other byte sequence up to 75 bytes is prefixed by its length.
            Test { name: "push 1 byte 0x11", data: vec![0x11], expected: Ok(vec![0x01, 0x11]), unchecked: false },
            Test { name: "push 1 byte 0x80", data: vec![0x80], expected: Ok(vec![0x01, 0x80]), unchecked: false },
            Test { name: "push 1 byte 0x82", data: vec![0x82], expected: Ok(vec![0x01, 0x82]), unchecked: false },
            Test { name: "push 1 byte 0xff", data: vec![0xff], expected: Ok(vec![0x01, 0xff]), unchecked: false },
            Test {
                name: "push data len 17",
                data: vec![0x49; 17],
                expected: Ok(once(17).chain(repeat_n(0x49, 17)).collect()),
                unchecked: false,
            },
            Test {
                name: "push data len 75",
                data: vec![0x49; 75],
                expected: Ok(once(75).chain(repeat_n(0x49, 75)).collect()),
                unchecked: false,
            },
            // Pushing 76 to 255 bytes must use OP_PUSHDATA1.
            Test {
                name: "push data len 76",
                data: vec![0x49; 76],
                expected: Ok(once(OpPushData1).chain(once(76)).chain(repeat_n(0x49, 76)).collect()),
                unchecked: false,
            },
            Test {
                name: "push data len 255",
                data: vec![0x49; 255],
                expected: Ok(once(OpPushData1).chain(once(255)).chain(repeat_n(0x49, 255)).collect()),
                unchecked: false,
            },
            // Pushing 256 to 520 bytes must use OP_PUSHDATA2.
            Test {
                name: "push data len 256",
                data: vec![0x49; 256],
                expected: Ok(once(OpPushData2).chain([0, 1]).chain(repeat_n(0x49, 256)).collect()),
                unchecked: false,
            },
            Test {
                name: "push data len 520",
                data: vec![0x49; 520],
                expected: Ok(once(OpPushData2).chain([8, 2]).chain(repeat_n(0x49, 520)).collect()),
                unchecked: false,
            },
            Test {
                name: "push data len 521",
                data: vec![0x49; 521],
                expected: Err(ScriptBuilderError::ElementExceedsMaxSize(521)),
                unchecked: false,
            },
            Test {
                name: "push data len 32767 (canonical)",
                data: vec![0x49; 32767],
                expected: Err(ScriptBuilderError::DataRejected(32770)),
                unchecked: false,
            },
            Test {
                name: "push data len 65536 (canonical)",
                data: vec![0x49; 65536],
                expected: Err(ScriptBuilderError::DataRejected(65541)),
                unchecked: false,
            },
            // add_data_unchecked allows pushes above the element limit
            Test {
                name: "push data len 32767 (non-canonical)",
                data: vec![0x49; 32767],
                expected: Ok(once(OpPushData2).chain([255, 127]).chain(repeat_n(0x49, 32767)).collect()),
                unchecked: true,
            },
        ];
        // Pushing a 1-byte sequence of byte 0x01 through 0x10 must use OP_n.
        tests.extend((1..=16u8).map(|n| Test { name: "push small int byte", data: vec![n], expected: Ok(vec![Op1 + n - 1]), unchecked: false }));

        for test in tests {
            let mut builder = ScriptBuilder::new();
            let result = match test.unchecked {
                false => builder.add_data(&test.data).map(|x| x.drain().raw_serialize()),
                true => {
                    builder.add_data_unchecked(&test.data);
                    Ok(builder.drain().raw_serialize())
                }
            };
            assert_eq!(result, test.expected, "{} ({:02x?}) wrong result", test.name, &test.data[..test.data.len().min(2)]);
        }
    }

    /// Ensures that all of the functions that can be used to add data to a script don't allow
    /// the script to exceed the max allowed size.
    #[test]
    fn test_exceed_max_script_size() {
        // Start off by constructing a max size script.
        let mut builder = ScriptBuilder::new();
        builder.add_data_unchecked(&[0u8; MAX_SCRIPTS_SIZE - 3]);
        assert_eq!(builder.raw_len(), MAX_SCRIPTS_SIZE);
        let original_result = builder.script().to_vec();

        let result = builder.add_data(&[0u8]).map(|_| ());
        assert_eq!(
            result,
            Err(ScriptBuilderError::DataRejected(1)),
            "adding data that would exceed the maximum size of the script must fail"
        );
        assert_eq!(builder.script(), &original_result, "unexpected modified script");

        let result = builder.add_op(Op0).map(|_| ());
        assert_eq!(
            result,
            Err(ScriptBuilderError::OpCodeRejected(Op0)),
            "adding an opcode that would exceed the maximum size of the script must fail"
        );
        assert_eq!(builder.script(), &original_result, "unexpected modified script");

        let result = builder.add_ops(&[OpCheckSig]).map(|_| ());
        assert_eq!(
            result,
            Err(ScriptBuilderError::OpCodesRejected(1)),
            "adding an opcode array that would exceed the maximum size of the script must fail"
        );
        assert_eq!(builder.script(), &original_result, "unexpected modified script");

        let result = builder.add_i64(0).map(|_| ());
        assert_eq!(
            result,
            Err(ScriptBuilderError::IntegerRejected(0)),
            "adding an integer that would exceed the maximum size of the script must fail"
        );
        assert_eq!(builder.script(), &original_result, "unexpected modified script");

        let drained = builder.drain();
        assert_eq!(drained.raw_len(), MAX_SCRIPTS_SIZE);
        assert_eq!(builder.raw_len(), 0);
        assert!(builder.script().is_empty());
    }
}
