use std::path::PathBuf;

use clap::Args;
use tessera::{
    error::{BoxError, ErrorContext as _},
    jose::{JWA, KeyFamily, KeySet},
};

use super::{read_key, write_stdout};

#[derive(Args, Debug, Clone)]
/// publish keys as a JWK Set document
pub struct CliCommandJwks {
    #[arg(long = "key", required = true)]
    /// PEM (or JWK) key file, repeat for every key to publish
    keys: Vec<PathBuf>,

    #[arg(long)]
    /// Algorithm of the keys
    alg: JWA,

    #[arg(long = "kid")]
    /// Key identifier of the key at the same position, defaults to the JWK thumbprint
    kids: Vec<String>,
}

/// Run the jwks command
pub fn run(cfg: CliCommandJwks) -> Result<(), BoxError> {
    if matches!(cfg.alg.family(), KeyFamily::Symmetric) {
        return Err(format!("{} keys are secret and cannot be published", cfg.alg).into());
    }
    if cfg.kids.len() > cfg.keys.len() {
        return Err("more --kid than --key arguments".into());
    }

    let mut keys = KeySet::new();
    for (index, path) in cfg.keys.iter().enumerate() {
        let key = read_key(path, cfg.alg, cfg.kids.get(index).map(String::as_str))?;
        keys.push(key)?;
    }

    let document = serde_json::to_string_pretty(&keys).context("encode JWK Set")?;
    write_stdout(&document)
}
