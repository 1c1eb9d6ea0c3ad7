use clap::{Arg, ArgAction, Command, arg};
use kestrel_txscript::{DEFAULT_SIG_CACHE_SIZE, EngineFlags};
use serde::Deserialize;
use std::{ffi::OsString, fs};
use toml::from_str;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct Args {
    // NOTE: it is best if property names match config file fields
    pub logdir: Option<String>,
    #[serde(rename = "nologfiles")]
    pub no_log_files: bool,
    #[serde(rename = "loglevel")]
    pub log_level: String,
    pub strict_encoding: bool,
    pub minimal_data: bool,
    pub minimal_if: bool,
    pub sig_cache_size: u64,
    pub script_sig: Option<String>,
    pub script_pubkey: Option<String>,
    pub z: Option<String>,
    pub disasm_only: bool,
}

impl Default for Args {
    fn default() -> Self {
        Self {
            logdir: None,
            no_log_files: false,
            log_level: "info".into(),
            strict_encoding: false,
            minimal_data: false,
            minimal_if: false,
            sig_cache_size: DEFAULT_SIG_CACHE_SIZE,
            script_sig: None,
            script_pubkey: None,
            z: None,
            disasm_only: false,
        }
    }
}

impl Args {
    pub fn engine_flags(&self) -> EngineFlags {
        EngineFlags {
            strict_encoding: self.strict_encoding,
            minimal_data: self.minimal_data,
            minimal_if: self.minimal_if,
            sig_cache_size: self.sig_cache_size,
        }
    }

    /// The directory for log files, unless file logging is disabled.
    pub fn log_dir(&self) -> Option<&str> {
        self.logdir.as_deref().filter(|_| !self.no_log_files)
    }
}

pub fn cli() -> Command {
    let defaults: Args = Default::default();

    #[allow(clippy::let_and_return)]
    let cmd = Command::new("kestrel-script")
        .about(format!("{} v{}", env!("CARGO_PKG_DESCRIPTION"), env!("CARGO_PKG_VERSION")))
        .version(env!("CARGO_PKG_VERSION"))
        .arg(arg!(-C --configfile <CONFIG_FILE> "Path of config file."))
        .arg(arg!(--logdir <LOG_DIR> "Directory to log output."))
        .arg(arg!(--nologfiles "Disable logging to files."))
        .arg(
            Arg::new("log_level")
                .short('d')
                .long("loglevel")
                .value_name("LEVEL")
                .default_value("info")
                .require_equals(true)
                .help("Logging level for all subsystems {off, error, warn, info, debug, trace}\n-- You may also specify <subsystem>=<level>,<subsystem2>=<level>,... to set the log level for individual subsystems.".to_string()),
        )
        .arg(
            Arg::new("script-sig")
                .long("script-sig")
                .value_name("HEX")
                .require_equals(true)
                .help("Hex encoded signature script, without a length prefix."),
        )
        .arg(
            Arg::new("script-pubkey")
                .long("script-pubkey")
                .value_name("HEX")
                .require_equals(true)
                .help("Hex encoded script public key, without a length prefix."),
        )
        .arg(
            Arg::new("z")
                .long("z")
                .value_name("HEX")
                .require_equals(true)
                .help("Hex encoded big endian digest the signatures commit to (default: 0)."),
        )
        .arg(Arg::new("strict-encoding").long("strict-encoding").action(ArgAction::SetTrue).help("Fail scripts on malformed DER signatures or SEC public keys."))
        .arg(Arg::new("minimal-data").long("minimal-data").action(ArgAction::SetTrue).help("Require the shortest encoding for data pushes."))
        .arg(Arg::new("minimal-if").long("minimal-if").action(ArgAction::SetTrue).help("Require IF and NOTIF arguments to be empty or 0x01."))
        .arg(
            Arg::new("sig-cache-size")
                .long("sig-cache-size")
                .value_name("ENTRIES")
                .require_equals(true)
                .value_parser(clap::value_parser!(u64))
                .help(format!("Maximum number of cached signature checks (default: {}).", defaults.sig_cache_size)),
        )
        .arg(Arg::new("disasm-only").long("disasm-only").action(ArgAction::SetTrue).help("Print the disassembly of the scripts without evaluating them."));

    cmd
}

pub fn parse_args() -> Args {
    match Args::parse(std::env::args_os()) {
        Ok(args) => args,
        Err(err) => {
            println!("{err}");
            std::process::exit(1);
        }
    }
}

impl Args {
    pub fn parse<I, T>(itr: I) -> Result<Args, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let m: clap::ArgMatches = cli().try_get_matches_from(itr)?;
        let mut defaults: Args = Default::default();

        if let Some(config_file) = m.get_one::<String>("configfile") {
            let config_str = fs::read_to_string(config_file)?;
            defaults = from_str(&config_str).map_err(|toml_error| {
                clap::Error::raw(
                    clap::error::ErrorKind::ValueValidation,
                    format!("failed parsing config file, reason: {}", toml_error.message()),
                )
            })?;
        }

        let args = Args {
            logdir: m.get_one::<String>("logdir").cloned().or(defaults.logdir),
            no_log_files: arg_match_unwrap_or::<bool>(&m, "nologfiles", defaults.no_log_files),
            log_level: arg_match_unwrap_or::<String>(&m, "log_level", defaults.log_level),
            strict_encoding: arg_match_unwrap_or::<bool>(&m, "strict-encoding", defaults.strict_encoding),
            minimal_data: arg_match_unwrap_or::<bool>(&m, "minimal-data", defaults.minimal_data),
            minimal_if: arg_match_unwrap_or::<bool>(&m, "minimal-if", defaults.minimal_if),
            sig_cache_size: arg_match_unwrap_or::<u64>(&m, "sig-cache-size", defaults.sig_cache_size),
            script_sig: m.get_one::<String>("script-sig").cloned().or(defaults.script_sig),
            script_pubkey: m.get_one::<String>("script-pubkey").cloned().or(defaults.script_pubkey),
            z: m.get_one::<String>("z").cloned().or(defaults.z),
            disasm_only: arg_match_unwrap_or::<bool>(&m, "disasm-only", defaults.disasm_only),
        };

        Ok(args)
    }
}

use clap::parser::ValueSource::DefaultValue;
use std::marker::{Send, Sync};
fn arg_match_unwrap_or<T: Clone + Send + Sync + 'static>(m: &clap::ArgMatches, arg_id: &str, default: T) -> T {
    m.get_one::<T>(arg_id).cloned().filter(|_| m.value_source(arg_id) != Some(DefaultValue)).unwrap_or(default)
}
