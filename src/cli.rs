use std::env;

use log::LevelFilter;

use crate::error::{InflateError, InflateResult};

/// Environment variable holding default options, prepended to the command line
pub const ENV_OPTIONS: &str = "RINFLATE";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InflateArgs {
    pub files: Vec<String>,
    pub stdout: bool,
    pub keep: bool,
    pub force: bool,
    pub test: bool,
    pub list: bool,
    pub quiet: bool,
    pub verbose: bool,
    pub verbosity: u8,
    /// Input is a bare DEFLATE stream with no gzip framing
    pub raw: bool,
    pub suffix: String,
    pub help: bool,
    pub version: bool,
}

impl Default for InflateArgs {
    fn default() -> Self {
        InflateArgs {
            files: Vec::new(),
            stdout: false,
            keep: false,
            force: false,
            test: false,
            list: false,
            quiet: false,
            verbose: false,
            verbosity: 1,
            raw: false,
            suffix: ".gz".to_string(),
            help: false,
            version: false,
        }
    }
}

impl InflateArgs {
    pub fn parse() -> InflateResult<Self> {
        let env_options = env::var(ENV_OPTIONS).ok();
        Self::parse_from(env::args().skip(1), env_options.as_deref())
    }

    /// Parse `argv` (without the program name), with `env_options` in the
    /// format of the `RINFLATE` variable.
    pub fn parse_from<I>(argv: I, env_options: Option<&str>) -> InflateResult<Self>
    where
        I: IntoIterator<Item = String>,
    {
        let mut args = InflateArgs::default();
        let mut argv: Vec<String> = argv.into_iter().collect();

        if let Some(env_options) = env_options {
            argv.splice(0..0, parse_env_args(env_options));
        }

        let mut i = 0;
        let mut in_options = true;

        while i < argv.len() {
            let arg = &argv[i];

            if !in_options || !arg.starts_with('-') || arg == "-" {
                args.files.push(arg.clone());
                i += 1;
                continue;
            }

            if arg == "--" {
                in_options = false;
                i += 1;
                continue;
            }

            if let Some(long) = arg.strip_prefix("--") {
                match long {
                    "help" => args.help = true,
                    "version" => args.version = true,
                    "decompress" | "uncompress" => {}
                    "test" => args.test = true,
                    "list" => args.list = true,
                    "stdout" | "to-stdout" => args.stdout = true,
                    "keep" => args.keep = true,
                    "force" => args.force = true,
                    "quiet" | "silent" => {
                        args.quiet = true;
                        args.verbosity = 0;
                    }
                    "verbose" => {
                        args.verbose = true;
                        args.verbosity += 1;
                    }
                    "raw" => args.raw = true,
                    "suffix" => {
                        if i + 1 >= argv.len() {
                            return Err(InflateError::parse("--suffix requires an argument"));
                        }
                        i += 1;
                        args.suffix = argv[i].clone();
                    }
                    _ => {
                        if let Some(value) = long.strip_prefix("suffix=") {
                            args.suffix = value.to_string();
                        } else {
                            return Err(InflateError::parse(format!(
                                "Unknown option: {}",
                                arg
                            )));
                        }
                    }
                }
            } else {
                // Short options, possibly combined (-kv)
                let chars: Vec<char> = arg.chars().collect();
                let mut j = 1;

                while j < chars.len() {
                    match chars[j] {
                        'h' => args.help = true,
                        'V' => args.version = true,
                        'd' => {}
                        't' => args.test = true,
                        'l' => args.list = true,
                        'c' => args.stdout = true,
                        'k' => args.keep = true,
                        'f' => args.force = true,
                        'q' => {
                            args.quiet = true;
                            args.verbosity = 0;
                        }
                        'v' => {
                            args.verbose = true;
                            args.verbosity += 1;
                        }
                        'S' => {
                            args.suffix = if j + 1 < chars.len() {
                                let value: String = chars[j + 1..].iter().collect();
                                j = chars.len();
                                value
                            } else {
                                if i + 1 >= argv.len() {
                                    return Err(InflateError::parse("-S requires an argument"));
                                }
                                i += 1;
                                argv[i].clone()
                            };
                        }
                        other => {
                            return Err(InflateError::parse(format!(
                                "Unknown option: -{}",
                                other
                            )))
                        }
                    }
                    j += 1;
                }
            }

            i += 1;
        }

        if args.suffix.is_empty() {
            return Err(InflateError::invalid_argument("suffix must not be empty"));
        }
        if args.raw && args.list {
            return Err(InflateError::invalid_argument(
                "--list needs gzip headers and cannot be combined with --raw",
            ));
        }

        Ok(args)
    }

    /// Default log filter for the requested verbosity; `RUST_LOG` overrides it.
    pub fn log_level(&self) -> LevelFilter {
        match self.verbosity {
            0 => LevelFilter::Error,
            1 => LevelFilter::Warn,
            2 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }

    /// Whether output goes to stdout rather than to files
    pub fn to_stdout(&self) -> bool {
        self.stdout || self.files.is_empty()
    }
}

fn parse_env_args(env_str: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut current_arg = String::new();
    let mut in_quotes = false;

    for ch in env_str.chars() {
        match ch {
            '"' => in_quotes = !in_quotes,
            ' ' | '\t' if !in_quotes => {
                if !current_arg.is_empty() {
                    args.push(std::mem::take(&mut current_arg));
                }
            }
            _ => current_arg.push(ch),
        }
    }

    if !current_arg.is_empty() {
        args.push(current_arg);
    }

    args
}
