use std::{fs, path::PathBuf};

use clap::Args;
use tessera::{
    error::{BoxError, ErrorContext as _},
    jose::{JWA, Key, KeyFamily},
};
use tracing::info;

use super::write_stdout;

#[derive(Args, Debug, Clone)]
/// generate a signing key
///
/// The private key is written as a PKCS#8 PEM document, the public key
/// is printed as a JWK. Symmetric secrets have no PEM form and are written
/// as a JWK instead.
pub struct CliCommandKeygen {
    #[arg(long)]
    /// Algorithm the key is generated for (e.g. ES256, RS256, HS256)
    alg: JWA,

    #[arg(long)]
    /// Size in bits of an RSA modulus or a symmetric secret
    size: Option<usize>,

    #[arg(long)]
    /// Key identifier, defaults to the JWK thumbprint
    kid: Option<String>,

    #[arg(long, short = 'o')]
    /// File to write the private key to, stdout if omitted
    output: Option<PathBuf>,
}

/// Run the keygen command
pub fn run(cfg: CliCommandKeygen) -> Result<(), BoxError> {
    let mut key = Key::generate(cfg.alg, cfg.size)?;
    if let Some(kid) = cfg.kid {
        key.set_kid(kid);
    }
    info!(kid = key.kid(), alg = %key.alg(), "key generated");

    let material = key.material()?;
    let private = match key.alg().family() {
        KeyFamily::Symmetric => {
            serde_json::to_string_pretty(key.jwk()).context("encode secret JWK")?
        }
        KeyFamily::Rsa | KeyFamily::Ec(_) => material.to_private_pem()?.trim_end().to_owned(),
    };

    match &cfg.output {
        Some(path) => {
            fs::write(path, format!("{private}\n"))
                .with_context(|| format!("write private key to '{}'", path.display()))?;
            info!(path = %path.display(), "private key written");
        }
        None => write_stdout(&private)?,
    }

    if !matches!(key.alg().family(), KeyFamily::Symmetric) {
        let public = serde_json::to_string_pretty(&key).context("encode public JWK")?;
        write_stdout(&public)?;
    }

    Ok(())
}
