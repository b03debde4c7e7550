//! `.env` loading: `--env-file <path>` on the command line, else `./.env` when present.
//!
//! Variables already set in the process environment are never overwritten.

use std::ffi::OsString;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub struct LoadedEnvFile {
    pub path: PathBuf,
    pub explicit: bool,
}

pub fn load_from_args(args: impl IntoIterator<Item = OsString>) -> Result<Option<LoadedEnvFile>, String> {
    match env_file_arg(args)? {
        Some(path) => {
            if !path.is_file() {
                return Err(format!("env file not found: {}", path.display()));
            }
            apply(&path)?;
            Ok(Some(LoadedEnvFile { path, explicit: true }))
        }
        None => {
            let cwd = std::env::current_dir().map_err(|e| format!("unable to read current directory: {}", e))?;
            let path = cwd.join(".env");
            if !path.is_file() {
                return Ok(None);
            }
            apply(&path)?;
            Ok(Some(LoadedEnvFile { path, explicit: false }))
        }
    }
}

/// Extract the `--env-file` path from the arguments following the program name.
fn env_file_arg(args: impl IntoIterator<Item = OsString>) -> Result<Option<PathBuf>, String> {
    let mut args = args.into_iter();
    let mut env_file: Option<PathBuf> = None;

    while let Some(arg) = args.next() {
        let value = match arg.to_str() {
            Some("--") => break,
            Some("--env-file") => args
                .next()
                .map(PathBuf::from)
                .ok_or_else(|| "`--env-file` requires a path argument".to_string())?,
            Some(s) if s.starts_with("--env-file=") => match &s["--env-file=".len()..] {
                "" => return Err("`--env-file` requires a path argument".to_string()),
                p => PathBuf::from(p),
            },
            Some(other) => return Err(format!("unrecognised argument: {}", other)),
            None => return Err("argument contains invalid UTF-8".to_string()),
        };
        if env_file.replace(value).is_some() {
            return Err("`--env-file` provided more than once".to_string());
        }
    }

    Ok(env_file)
}

fn apply(path: &Path) -> Result<(), String> {
    let file = File::open(path).map_err(|e| format!("failed to open {}: {}", path.display(), e))?;

    for (index, line) in BufReader::new(file).lines().enumerate() {
        let lineno = index + 1;
        let line = line.map_err(|e| format!("failed to read {} at line {}: {}", path.display(), lineno, e))?;
        let parsed = parse_assignment(&line).map_err(|e| format!("{}:{}: {}", path.display(), lineno, e))?;
        let Some((key, value)) = parsed else {
            continue;
        };
        if std::env::var_os(&key).is_none() {
            // Called from main before any other thread exists.
            unsafe {
                std::env::set_var(key, value);
            }
        }
    }

    Ok(())
}

/// Parse one `.env` line. Blank lines and `#` comments yield `None`.
pub fn parse_assignment(line: &str) -> Result<Option<(String, String)>, String> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }

    let body = trimmed.strip_prefix("export ").map(str::trim_start).unwrap_or(trimmed);
    let (key, raw_value) = body.split_once('=').ok_or_else(|| "missing '=' in assignment".to_string())?;
    let key = key.trim();

    if key.is_empty() {
        return Err("environment variable name cannot be empty".to_string());
    }
    if key.chars().any(char::is_whitespace) {
        return Err(format!("environment variable name contains whitespace: {}", key));
    }

    Ok(Some((key.to_string(), parse_value(raw_value.trim())?)))
}

fn parse_value(raw: &str) -> Result<String, String> {
    if let Some(rest) = raw.strip_prefix('"') {
        parse_quoted(rest, '"')
    } else if let Some(rest) = raw.strip_prefix('\'') {
        parse_quoted(rest, '\'')
    } else {
        Ok(raw.split('#').next().unwrap_or_default().trim_end().to_string())
    }
}

/// Read up to the closing `quote`. Backslash escapes apply inside double quotes only.
fn parse_quoted(input: &str, quote: char) -> Result<String, String> {
    let kind = if quote == '"' { "double" } else { "single" };
    let mut result = String::new();
    let mut chars = input.chars();

    while let Some(ch) = chars.next() {
        if ch == quote {
            let remainder = chars.as_str().trim();
            return if remainder.is_empty() || remainder.starts_with('#') {
                Ok(result)
            } else {
                Err(format!("unexpected characters after closing {} quote", kind))
            };
        }
        if ch == '\\' && quote == '"' {
            let escaped = chars
                .next()
                .ok_or_else(|| "unterminated escape sequence in double-quoted value".to_string())?;
            result.push(match escaped {
                'n' => '\n',
                'r' => '\r',
                't' => '\t',
                other => other,
            });
        } else {
            result.push(ch);
        }
    }

    Err(format!("unterminated {}-quoted value", kind))
}
