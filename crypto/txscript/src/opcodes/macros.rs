/*
Each entry of the opcode list is expanded into a constant of the `codes` module, an arm
of the `opcode_name` lookup and an arm of the `execute_opcode` dispatch. Opcode values
missing from the list are invalid: they have no name and fail on execution.
*/
macro_rules! opcode_list {
    ( $( opcode $(|$alias:ident|)? $name:ident<$num:literal, $str:literal>($vm:ident) $code:block )* ) => {
        pub mod codes {
            $(
                #[allow(non_upper_case_globals)]
                pub const $name: u8 = $num;
                $(
                    #[allow(non_upper_case_globals)]
                    pub const $alias: u8 = $num;
                )?
            )*
        }

        /// Returns the `OP_` name of a defined opcode.
        pub fn opcode_name(opcode: u8) -> Option<&'static str> {
            match opcode {
                $( $num => Some($str), )*
                _ => None,
            }
        }

        pub(crate) fn execute_opcode(opcode: u8, vm: &mut TxScriptEngine<'_>) -> OpCodeResult {
            match opcode {
                $(
                    $num => {
                        #[allow(unused_variables)]
                        let $vm = &mut *vm;
                        $code
                    }
                )*
                _ => Err(TxScriptError::InvalidOpcode(opcode_to_string(opcode))),
            }
        }
    };
}
