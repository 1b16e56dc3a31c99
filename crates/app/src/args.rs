use std::fmt;
use std::path::PathBuf;

use prosody_core::analysis::ScenarioDomain;
use prosody_core::model::PhaseId;

#[derive(Debug)]
pub enum ArgsError {
    MissingValue { flag: &'static str },
    MissingArgument { what: &'static str },
    UnknownArg(String),
    UnknownCommand(String),
    InvalidDbUrl { raw: String },
    InvalidPhase { raw: String },
    InvalidDomain { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::MissingArgument { what } => write!(f, "missing {what}"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::UnknownCommand(cmd) => write!(f, "unknown subcommand: {cmd}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidPhase { raw } => write!(f, "invalid phase: {raw}"),
            ArgsError::InvalidDomain { raw } => write!(f, "invalid scenario domain: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

pub fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  prosody status");
    eprintln!("  prosody export     [--out <file> | --stdout]");
    eprintln!("  prosody import     <file>");
    eprintln!("  prosody clear      --yes");
    eprintln!("  prosody phase      [next | prev | <phase-id>]");
    eprintln!("  prosody sync       [--email <email>] [--password <password>] [--sign-up]");
    eprintln!("  prosody equivalence [<domain>]");
    eprintln!("  prosody balance    [--a <text> --b <text>]");
    eprintln!("  prosody checklist");
    eprintln!();
    eprintln!("Options for every command:");
    eprintln!("  --db <sqlite_url>   default sqlite://prosody.sqlite3");
    eprintln!("  --key <storage_key> default tts-prosody-builder-data");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  PROSODY_DB_URL, PROSODY_STORAGE_KEY, PROSODY_AUTOSAVE_MS,");
    eprintln!("  PROSODY_SUPABASE_URL, PROSODY_SUPABASE_ANON_KEY,");
    eprintln!("  PROSODY_EMAIL, PROSODY_PASSWORD, RUST_LOG");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseMove {
    Show,
    Next,
    Previous,
    Set(PhaseId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Status,
    Export { out: Option<PathBuf>, stdout: bool },
    Import { path: PathBuf },
    Clear { confirmed: bool },
    Phase(PhaseMove),
    Sync {
        email: Option<String>,
        password: Option<String>,
        sign_up: bool,
    },
    Equivalence { domain: Option<ScenarioDomain> },
    Balance { texts: Option<(String, String)> },
    Checklist,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Args {
    pub command: Command,
    pub db_url: Option<String>,
    pub storage_key: Option<String>,
}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

/// Options accepted by every command, plus whatever is left for the command.
#[derive(Default)]
struct Scan {
    db_url: Option<String>,
    storage_key: Option<String>,
    rest: Vec<String>,
}

fn scan_globals(args: impl Iterator<Item = String>) -> Result<Scan, ArgsError> {
    let mut scan = Scan::default();
    let mut args = args;
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--db" => {
                let value = require_value(&mut args, "--db")?;
                if value.trim().is_empty() {
                    return Err(ArgsError::InvalidDbUrl { raw: value });
                }
                scan.db_url = Some(normalize_sqlite_url(value));
            }
            "--key" => scan.storage_key = Some(require_value(&mut args, "--key")?),
            _ => scan.rest.push(arg),
        }
    }
    Ok(scan)
}

impl Args {
    /// Parses the arguments after the program name.
    ///
    /// Returns `Ok(None)` when help was requested.
    pub fn parse(argv: impl IntoIterator<Item = String>) -> Result<Option<Self>, ArgsError> {
        let mut argv = argv.into_iter();
        let Some(name) = argv.next() else {
            return Ok(Some(Self {
                command: Command::Status,
                db_url: None,
                storage_key: None,
            }));
        };
        if matches!(name.as_str(), "--help" | "-h" | "help") {
            return Ok(None);
        }

        let scan = scan_globals(argv)?;
        if scan.rest.iter().any(|arg| arg == "--help" || arg == "-h") {
            return Ok(None);
        }
        let mut rest = scan.rest.into_iter();
        let command = match name.as_str() {
            "status" => Command::Status,
            "export" => parse_export(&mut rest)?,
            "import" => Command::Import {
                path: rest
                    .next()
                    .map(PathBuf::from)
                    .ok_or(ArgsError::MissingArgument { what: "file to import" })?,
            },
            "clear" => match rest.next() {
                None => Command::Clear { confirmed: false },
                Some(arg) if arg == "--yes" => Command::Clear { confirmed: true },
                Some(arg) => return Err(ArgsError::UnknownArg(arg)),
            },
            "phase" => Command::Phase(parse_phase(rest.next())?),
            "sync" => parse_sync(&mut rest)?,
            "equivalence" => Command::Equivalence {
                domain: rest
                    .next()
                    .map(|raw| {
                        raw.parse::<ScenarioDomain>()
                            .map_err(|_| ArgsError::InvalidDomain { raw })
                    })
                    .transpose()?,
            },
            "balance" => parse_balance(&mut rest)?,
            "checklist" => Command::Checklist,
            other => return Err(ArgsError::UnknownCommand(other.to_owned())),
        };
        if let Some(extra) = rest.next() {
            return Err(ArgsError::UnknownArg(extra));
        }

        Ok(Some(Self {
            command,
            db_url: scan.db_url,
            storage_key: scan.storage_key,
        }))
    }
}

fn parse_export(args: &mut impl Iterator<Item = String>) -> Result<Command, ArgsError> {
    let mut out = None;
    let mut stdout = false;
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--out" => out = Some(PathBuf::from(require_value(args, "--out")?)),
            "--stdout" => stdout = true,
            _ => return Err(ArgsError::UnknownArg(arg)),
        }
    }
    Ok(Command::Export { out, stdout })
}

fn parse_phase(arg: Option<String>) -> Result<PhaseMove, ArgsError> {
    let Some(raw) = arg else {
        return Ok(PhaseMove::Show);
    };
    match raw.as_str() {
        "next" => Ok(PhaseMove::Next),
        "prev" | "previous" => Ok(PhaseMove::Previous),
        _ => raw
            .parse::<PhaseId>()
            .map(PhaseMove::Set)
            .map_err(|_| ArgsError::InvalidPhase { raw }),
    }
}

fn parse_sync(args: &mut impl Iterator<Item = String>) -> Result<Command, ArgsError> {
    let mut email = None;
    let mut password = None;
    let mut sign_up = false;
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--email" => email = Some(require_value(args, "--email")?),
            "--password" => password = Some(require_value(args, "--password")?),
            "--sign-up" => sign_up = true,
            _ => return Err(ArgsError::UnknownArg(arg)),
        }
    }
    Ok(Command::Sync {
        email,
        password,
        sign_up,
    })
}

fn parse_balance(args: &mut impl Iterator<Item = String>) -> Result<Command, ArgsError> {
    let mut option_a = None;
    let mut option_b = None;
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--a" => option_a = Some(require_value(args, "--a")?),
            "--b" => option_b = Some(require_value(args, "--b")?),
            _ => return Err(ArgsError::UnknownArg(arg)),
        }
    }
    match (option_a, option_b) {
        (Some(a), Some(b)) => Ok(Command::Balance { texts: Some((a, b)) }),
        (None, None) => Ok(Command::Balance { texts: None }),
        (None, Some(_)) => Err(ArgsError::MissingValue { flag: "--a" }),
        (Some(_), None) => Err(ArgsError::MissingValue { flag: "--b" }),
    }
}

pub fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = std::path::Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| std::path::PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Option<Args>, ArgsError> {
        Args::parse(args.iter().map(|arg| (*arg).to_owned()))
    }

    fn command(args: &[&str]) -> Command {
        parse(args).unwrap().unwrap().command
    }

    #[test]
    fn no_arguments_shows_status() {
        assert_eq!(command(&[]), Command::Status);
    }

    #[test]
    fn help_short_circuits() {
        assert!(parse(&["--help"]).unwrap().is_none());
        assert!(parse(&["export", "-h"]).unwrap().is_none());
    }

    #[test]
    fn global_options_anywhere() {
        let args = parse(&["status", "--db", "sqlite::memory:", "--key", "alt"])
            .unwrap()
            .unwrap();
        assert_eq!(args.db_url.as_deref(), Some("sqlite::memory:"));
        assert_eq!(args.storage_key.as_deref(), Some("alt"));
    }

    #[test]
    fn phase_moves() {
        assert_eq!(command(&["phase"]), Command::Phase(PhaseMove::Show));
        assert_eq!(command(&["phase", "next"]), Command::Phase(PhaseMove::Next));
        assert_eq!(
            command(&["phase", "text-review"]),
            Command::Phase(PhaseMove::Set(PhaseId::TextReview))
        );
        assert!(matches!(
            parse(&["phase", "bogus"]),
            Err(ArgsError::InvalidPhase { .. })
        ));
    }

    #[test]
    fn clear_requires_confirmation_flag() {
        assert_eq!(command(&["clear"]), Command::Clear { confirmed: false });
        assert_eq!(command(&["clear", "--yes"]), Command::Clear { confirmed: true });
    }

    #[test]
    fn import_needs_a_file() {
        assert!(matches!(
            parse(&["import"]),
            Err(ArgsError::MissingArgument { .. })
        ));
        assert_eq!(
            command(&["import", "data.json"]),
            Command::Import {
                path: PathBuf::from("data.json")
            }
        );
    }

    #[test]
    fn balance_needs_both_texts() {
        assert_eq!(command(&["balance"]), Command::Balance { texts: None });
        assert!(parse(&["balance", "--a", "x"]).is_err());
        assert_eq!(
            command(&["balance", "--a", "x", "--b", "y"]),
            Command::Balance {
                texts: Some(("x".into(), "y".into()))
            }
        );
    }

    #[test]
    fn equivalence_domain_is_validated() {
        assert_eq!(
            command(&["equivalence", "energy"]),
            Command::Equivalence {
                domain: Some(ScenarioDomain::Energy)
            }
        );
        assert!(matches!(
            parse(&["equivalence", "casino"]),
            Err(ArgsError::InvalidDomain { .. })
        ));
    }

    #[test]
    fn rejects_unknown_input() {
        assert!(matches!(parse(&["launch"]), Err(ArgsError::UnknownCommand(_))));
        assert!(matches!(parse(&["status", "extra"]), Err(ArgsError::UnknownArg(_))));
    }
}
