//! tessera cli commands

use std::{
    fs,
    io::{self, Write as _},
    path::Path,
};

use tessera::{
    error::{BoxError, ErrorContext as _},
    jose::{JWA, JWK, Key},
};

pub mod jwks;
pub mod keygen;
pub mod sign;
pub mod verify;

/// Read a key file: a JWK document (as written by `keygen` for symmetric
/// algorithms) or any PEM encoding the key parser accepts.
///
/// Keys read from PEM are identified by `kid`, or by their thumbprint.
fn read_key(path: &Path, alg: JWA, kid: Option<&str>) -> Result<Key, BoxError> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("read key file '{}'", path.display()))?;

    let key = if content.trim_start().starts_with('{') {
        let jwk: JWK = serde_json::from_str(&content).context("parse JWK key file")?;
        let key = Key::from_jwk(jwk);
        if key.alg() != alg {
            return Err(format!("key file holds a {} key, not {alg}", key.alg()).into());
        }
        key
    } else {
        Key::from_pem("", alg, &content)?
    };

    let kid = match kid {
        Some(kid) => kid.to_owned(),
        None if key.kid().is_empty() => key.jwk().thumbprint()?,
        None => return Ok(key),
    };
    Ok(key.with_kid(kid))
}

/// Read the entire stdin, trimmed.
fn read_stdin() -> Result<String, BoxError> {
    let input = io::read_to_string(io::stdin().lock()).context("read stdin")?;
    Ok(input.trim().to_owned())
}

fn write_stdout(output: &str) -> Result<(), BoxError> {
    writeln!(io::stdout().lock(), "{output}").context("write to stdout")?;
    Ok(())
}
