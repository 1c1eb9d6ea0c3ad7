use args::{Args, parse_args};
use kestrel_core::log::init_logger;
use kestrel_txscript::{Script, TxScriptError, caches::Cache, script_class::ScriptClass, viewer::ScriptViewer};
use log::{debug, info};
use num_bigint::BigUint;
use std::fmt::Write;
use thiserror::Error;

mod args;

#[derive(Error, Debug)]
pub enum Error {
    #[error("no script was given, pass --script-sig and/or --script-pubkey")]
    MissingScript,

    #[error("{0} is not valid hex: {1}")]
    Hex(&'static str, hex::FromHexError),

    #[error("{0} does not parse: {1}")]
    Parse(&'static str, TxScriptError),

    #[error("z must be at most 32 bytes, got {0}")]
    DigestTooLong(usize),
}

/// What a run prints, and whether the combined script evaluated to true.
#[derive(Debug)]
pub struct Report {
    pub output: String,
    pub valid: bool,
}

fn decode_script(name: &'static str, hex_script: Option<&str>) -> Result<Script, Error> {
    let Some(hex_script) = hex_script else {
        return Ok(Script::default());
    };
    let raw = hex::decode(hex_script.trim()).map_err(|err| Error::Hex(name, err))?;
    Script::from_raw_bytes(&raw).map_err(|err| Error::Parse(name, err))
}

fn decode_digest(z: Option<&str>) -> Result<BigUint, Error> {
    let Some(z) = z else {
        return Ok(BigUint::default());
    };
    let bytes = hex::decode(z.trim()).map_err(|err| Error::Hex("z", err))?;
    if bytes.len() > 32 {
        return Err(Error::DigestTooLong(bytes.len()));
    }
    Ok(BigUint::from_bytes_be(&bytes))
}

pub fn run(args: &Args) -> Result<Report, Error> {
    if args.script_sig.is_none() && args.script_pubkey.is_none() {
        return Err(Error::MissingScript);
    }
    let script_sig = decode_script("script-sig", args.script_sig.as_deref())?;
    let script_pubkey = decode_script("script-pubkey", args.script_pubkey.as_deref())?;
    let z = decode_digest(args.z.as_deref())?;

    let mut output = String::new();
    for (name, script, given) in
        [("script-sig", &script_sig, args.script_sig.is_some()), ("script-pubkey", &script_pubkey, args.script_pubkey.is_some())]
    {
        if !given {
            continue;
        }
        writeln!(output, "{name} ({}): {script}", ScriptClass::from_script(script)).expect("writing to a string");
        if args.disasm_only {
            write!(output, "{}", ScriptViewer::new(script)).expect("writing to a string");
        }
    }
    if args.disasm_only {
        return Ok(Report { output, valid: true });
    }

    let flags = args.engine_flags();
    let sig_cache = Cache::new(flags.sig_cache_size);
    let combined = &script_sig + &script_pubkey;
    debug!("Evaluating {} commands with flags {flags:?}", combined.len());
    let result = combined.evaluate_with(&z, &sig_cache, flags);
    match &result {
        Ok(()) => writeln!(output, "valid"),
        Err(err) => writeln!(output, "invalid: {err}"),
    }
    .expect("writing to a string");
    Ok(Report { output, valid: result.is_ok() })
}

fn main() {
    let args = parse_args();
    if let Err(err) = init_logger(args.log_dir(), &args.log_level) {
        eprintln!("{err}");
        std::process::exit(1);
    }
    info!("kestrel-script v{}", env!("CARGO_PKG_VERSION"));

    match run(&args) {
        Ok(report) => {
            print!("{}", report.output);
            if !report.valid {
                std::process::exit(1);
            }
        }
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(2);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kestrel_ecc::PrivateKey;
    use kestrel_txscript::{encode_signature, pay_to_pub_key_hash, pay_to_pub_key_hash_signature_script};

    fn args(script_sig: Option<&str>, script_pubkey: Option<&str>) -> Args {
        Args { script_sig: script_sig.map(Into::into), script_pubkey: script_pubkey.map(Into::into), ..Default::default() }
    }

    #[test]
    fn test_run_trivial_scripts() {
        struct Test {
            name: &'static str,
            args: Args,
            output: &'static str,
            valid: bool,
        }

        let tests = vec![
            Test {
                name: "true",
                args: args(None, Some("51")),
                output: "script-pubkey (nonstandard): OP_1\nvalid\n",
                valid: true,
            },
            Test {
                name: "equal",
                args: args(Some("51"), Some("5287")),
                output: "script-sig (nonstandard): OP_1\nscript-pubkey (nonstandard): OP_2 OP_EQUAL\ninvalid: false stack entry at end of script execution\n",
                valid: false,
            },
        ];

        for test in tests {
            let report = run(&test.args).unwrap();
            assert_eq!(report.valid, test.valid, "test '{}' failed", test.name);
            assert_eq!(report.output, test.output, "test '{}' failed", test.name);
        }
    }

    #[test]
    fn test_run_p2pkh() {
        let key = PrivateKey::new(BigUint::from(8675309u32)).unwrap();
        let z = BigUint::from_bytes_be(&[0x42; 32]);
        let signature = encode_signature(&key.sign(&z));
        let pub_key = key.public_key().sec(true);

        let script_pubkey = pay_to_pub_key_hash(&key.public_key().hash160(true));
        let script_sig = pay_to_pub_key_hash_signature_script(&signature, &pub_key).unwrap();
        let mut args = args(Some(&hex::encode(script_sig.raw_serialize())), Some(&hex::encode(script_pubkey.raw_serialize())));
        args.z = Some(hex::encode([0x42; 32]));

        let report = run(&args).unwrap();
        assert!(report.valid, "{}", report.output);
        assert!(report.output.contains("script-pubkey (pubkeyhash): OP_DUP OP_HASH160"), "{}", report.output);

        args.z = Some(hex::encode([0x43; 32]));
        assert!(!run(&args).unwrap().valid);
    }

    #[test]
    fn test_run_disasm_only() {
        let mut args = args(None, Some("4c0151"));
        args.disasm_only = true;
        let report = run(&args).unwrap();
        assert!(report.valid);
        assert_eq!(report.output, "script-pubkey (nonstandard): 51\nOP_PUSHDATA1 1 51\n");
    }

    #[test]
    fn test_run_errors() {
        assert!(matches!(run(&Args::default()), Err(Error::MissingScript)));
        assert!(matches!(run(&args(None, Some("zz"))), Err(Error::Hex("script-pubkey", _))));
        assert!(matches!(run(&args(Some("4c"), None)), Err(Error::Parse("script-sig", _))));
        let mut long_digest = args(None, Some("51"));
        long_digest.z = Some("00".repeat(33));
        assert!(matches!(run(&long_digest), Err(Error::DigestTooLong(33))));
    }
}
