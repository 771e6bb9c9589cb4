use std::{fs, path::PathBuf};

use clap::Args;
use jiff::SignedDuration;
use tessera::{
    error::{BoxError, ErrorContext as _},
    jose::{AlgorithmRegistry, KeySet, Validation, Verifier},
};

use super::{read_stdin, write_stdout};

#[derive(Args, Debug, Clone)]
/// verify a token and print its claims
pub struct CliCommandVerify {
    #[arg(long)]
    /// JWK Set document holding the verification keys
    jwks: PathBuf,

    #[arg(long)]
    /// Expected issuer of the token
    issuer: String,

    #[arg(long)]
    /// Tolerated clock skew (e.g. "30s")
    leeway: Option<SignedDuration>,

    #[arg(long = "client-scope")]
    /// Client scope of which at least one must be granted, can be repeated
    client_scopes: Vec<String>,

    #[arg(long = "user-scope")]
    /// User scope of which at least one must be granted, can be repeated
    user_scopes: Vec<String>,

    /// The token to verify, read from stdin if omitted
    token: Option<String>,
}

/// Run the verify command
pub fn run(cfg: CliCommandVerify) -> Result<(), BoxError> {
    let document = fs::read(&cfg.jwks)
        .with_context(|| format!("read JWK Set '{}'", cfg.jwks.display()))?;
    let keys: KeySet = serde_json::from_slice(&document).context("parse JWK Set")?;

    let mut validation = Validation::new(cfg.issuer);
    if let Some(leeway) = cfg.leeway {
        validation.set_leeway(leeway);
    }
    let verifier = Verifier::with_validation(&keys, validation, &AlgorithmRegistry::with_defaults())?;

    let token = match cfg.token {
        Some(token) => token,
        None => read_stdin()?,
    };
    let verified = verifier.verify(&token)?;

    if !Verifier::verify_scopes(verified.claims(), &cfg.client_scopes, &cfg.user_scopes) {
        return Err("token does not grant the required scopes".into());
    }

    let claims = serde_json::to_string_pretty(verified.claims()).context("encode claims")?;
    write_stdout(&claims)
}
