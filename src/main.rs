mod debug_report;

use colloquy::{ConfigError, Engine, LoadOptions, RuleModel};
use std::io::{self, BufRead, IsTerminal, Write};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const DEFAULT_USER: &str = "local";

fn main() {
    init_tracing();

    let config = match parse_args() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(2);
        }
    };

    let options = LoadOptions { strict_patterns: config.strict };
    let rules = match RuleModel::from_path_with(&config.rules, &options) {
        Ok(rules) => rules,
        Err(err) => {
            report_config_error(&err);
            std::process::exit(1);
        }
    };

    if config.check {
        debug_report::print_rules(&rules, config.color);
        return;
    }

    let engine = Engine::new(rules);
    match config.message.as_deref() {
        Some(message) => run_turn(&engine, &config, message),
        None => {
            if let Err(err) = run_stdin(&engine, &config) {
                eprintln!("error: failed to read stdin: {err}");
                std::process::exit(1);
            }
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(io::stderr).init();
}

fn report_config_error(err: &ConfigError) {
    eprintln!("error: {err}");
    if let ConfigError::Pattern(_) = err {
        eprintln!("hint: drop --strict to skip patterns that do not compile");
    }
}

fn run_turn(engine: &Engine, config: &CliConfig, message: &str) {
    if config.verbose {
        let res = engine.process_message_verbose(&config.user, message);
        debug_report::print_turn(message, &res, config.color);
    } else {
        println!("{}", engine.process_message(&config.user, message));
    }
}

/// One turn per non-empty stdin line, replies in order.
fn run_stdin(engine: &Engine, config: &CliConfig) -> io::Result<()> {
    let stdin = io::stdin();
    let interactive = stdin.is_terminal();

    prompt(interactive)?;
    for line in stdin.lock().lines() {
        let line = line?;
        let message = line.trim();
        if !message.is_empty() {
            run_turn(engine, config, message);
        }
        prompt(interactive)?;
    }
    Ok(())
}

fn prompt(interactive: bool) -> io::Result<()> {
    if interactive {
        let mut stdout = io::stdout();
        write!(stdout, "> ")?;
        stdout.flush()?;
    }
    Ok(())
}

struct CliConfig {
    rules: PathBuf,
    user: String,
    message: Option<String>,
    verbose: bool,
    check: bool,
    strict: bool,
    color: bool,
}

fn parse_args() -> Result<CliConfig, String> {
    let mut rules: Option<PathBuf> = None;
    let mut user = DEFAULT_USER.to_string();
    let mut message: Option<String> = None;
    let mut verbose = false;
    let mut check = false;
    let mut strict = false;
    let mut color = io::stdout().is_terminal();
    let mut args = std::env::args().skip(1);

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            "-V" | "--version" => {
                println!("colloquy {}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            "--color" => color = true,
            "--no-color" => color = false,
            "-v" | "--verbose" => verbose = true,
            "--check" => check = true,
            "--strict" => strict = true,
            "--rules" | "-r" => {
                let value = args.next().ok_or_else(|| "error: --rules expects a path".to_string())?;
                rules = Some(PathBuf::from(value));
            }
            "--user" | "-u" => {
                user = args.next().ok_or_else(|| "error: --user expects a value".to_string())?;
            }
            "--" => {
                let rest = args.collect::<Vec<_>>().join(" ");
                if !rest.trim().is_empty() {
                    message = Some(rest);
                }
                break;
            }
            _ if arg.starts_with("--rules=") => {
                rules = Some(PathBuf::from(arg.trim_start_matches("--rules=")));
            }
            _ if arg.starts_with("--user=") => {
                user = arg.trim_start_matches("--user=").to_string();
            }
            _ if arg.starts_with('-') => {
                return Err(format!("error: unknown option '{arg}'"));
            }
            _ => {
                let rest = std::iter::once(arg).chain(args).collect::<Vec<_>>().join(" ");
                message = Some(rest);
                break;
            }
        }
    }

    let rules = rules.ok_or_else(|| format!("error: --rules is required\n\n{}", help_text()))?;
    if user.trim().is_empty() {
        return Err("error: --user cannot be empty".to_string());
    }

    Ok(CliConfig { rules, user, message, verbose, check, strict, color })
}

fn print_help() {
    println!("{}", help_text());
}

fn help_text() -> String {
    format!(
        "colloquy {version}

Rule-driven dialogue engine CLI.

Usage:
  colloquy --rules <path> [OPTIONS] [--] <message...>
  colloquy --rules <path> [OPTIONS] < conversation.txt

Without a message argument, every non-empty stdin line is one turn for the
same user, and replies are printed in order.

Options:
  -r, --rules <path>         Rule file (.yaml/.yml, or .json).
  -u, --user <id>            User identifier for the conversation.
                             Default: {default_user}
  -v, --verbose              Print a trace report for every turn.
  --check                    Load and validate the rules, print a summary, exit.
  --strict                   Fail on intent patterns that do not compile.
  --color                    Force ANSI color output.
  --no-color                 Disable ANSI color output.
  -h, --help                 Show this help message.
  -V, --version              Print version information.

Logging is controlled with RUST_LOG (default: warn).

Exit codes:
  0  Success.
  1  Rule file could not be loaded, or stdin failed.
  2  Invalid arguments.
",
        version = env!("CARGO_PKG_VERSION"),
        default_user = DEFAULT_USER
    )
}
