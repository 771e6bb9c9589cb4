use std::{fs, path::PathBuf};

use clap::Args;
use jiff::SignedDuration;
use tessera::{
    error::{BoxError, ErrorContext as _},
    jose::{AlgorithmRegistry, Claims, JWA, KeySet, Signer, SignerConfig},
};

use super::{read_key, write_stdout};

#[derive(Args, Debug, Clone)]
/// sign a token
///
/// Claims are read from `--claims` and completed by the other flags.
/// The issuer, issuance and expiration claims are always set by the signer.
pub struct CliCommandSign {
    #[arg(long)]
    /// PEM (or JWK) file of the signing key
    key: PathBuf,

    #[arg(long)]
    /// Algorithm of the signing key
    alg: JWA,

    #[arg(long)]
    /// Key identifier advertised in the token header
    kid: Option<String>,

    #[arg(long)]
    /// Issuer of the token
    issuer: Option<String>,

    #[arg(long)]
    /// Time between issuance and expiration (e.g. "10m" or "PT10M")
    lifetime: Option<SignedDuration>,

    #[arg(long)]
    /// Audience of the token, unless the claims define one
    audience: Option<String>,

    #[arg(long)]
    /// Subject of the token
    subject: Option<String>,

    #[arg(long = "scope")]
    /// Scope granted to the client, can be repeated
    scopes: Vec<String>,

    #[arg(long)]
    /// Claims as a JSON object
    claims: Option<String>,

    #[arg(long)]
    /// Signer configuration as a JSON file, flags take precedence
    config: Option<PathBuf>,
}

/// Run the sign command
pub fn run(cfg: CliCommandSign) -> Result<(), BoxError> {
    let config = signer_config(&cfg)?;

    let key = read_key(&cfg.key, cfg.alg, Some(config.sign_key_id()))?;
    let keys = KeySet::new().with_key(key)?;
    let signer = Signer::new(&keys, config, &AlgorithmRegistry::with_defaults())?;

    let mut claims: Claims = match &cfg.claims {
        Some(json) => serde_json::from_str(json).context("parse --claims as JSON claims")?,
        None => Claims::new(),
    };
    if let Some(subject) = cfg.subject {
        claims.sub = Some(subject);
    }
    if !cfg.scopes.is_empty() {
        claims.scopes = Some(cfg.scopes);
    }

    let token = signer.create(claims)?;
    write_stdout(&token)
}

fn signer_config(cfg: &CliCommandSign) -> Result<SignerConfig, BoxError> {
    let mut config = match &cfg.config {
        Some(path) => {
            let raw = fs::read(path)
                .with_context(|| format!("read signer config '{}'", path.display()))?;
            serde_json::from_slice(&raw).context("parse signer config")?
        }
        None => {
            let issuer = cfg.issuer.clone().ok_or("--issuer is required without --config")?;
            let kid = cfg.kid.clone().ok_or("--kid is required without --config")?;
            SignerConfig::new(issuer, kid)
        }
    };

    if let Some(issuer) = &cfg.issuer {
        config.set_issuer(issuer.clone());
    }
    if let Some(kid) = &cfg.kid {
        config.set_sign_key_id(kid.clone());
    }
    if let Some(lifetime) = cfg.lifetime {
        config.set_lifetime(lifetime);
    }
    if let Some(audience) = &cfg.audience {
        config.set_audience(audience.clone());
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command(args: &[&str]) -> CliCommandSign {
        #[derive(clap::Parser)]
        struct Wrapper {
            #[command(flatten)]
            sign: CliCommandSign,
        }

        let args = std::iter::once("sign").chain(args.iter().copied());
        <Wrapper as clap::Parser>::parse_from(args).sign
    }

    #[test]
    fn flags_build_a_config() {
        let cfg = command(&[
            "--key", "key.pem", "--alg", "ES256", "--kid", "k1", "--issuer", "auth.example.com",
            "--lifetime", "10s", "--audience", "testing",
        ]);
        let config = signer_config(&cfg).unwrap();
        assert_eq!(config.issuer(), "auth.example.com");
        assert_eq!(config.sign_key_id(), "k1");
        assert_eq!(config.lifetime(), SignedDuration::from_secs(10));
        assert_eq!(config.audience(), Some("testing"));
    }

    #[test]
    fn issuer_is_required_without_config() {
        let cfg = command(&["--key", "key.pem", "--alg", "ES256", "--kid", "k1"]);
        assert!(signer_config(&cfg).is_err());
    }
}
