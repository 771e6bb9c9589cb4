use super::utils::TesseraCommand;

#[test]
#[ignore]
fn test_help() {
    let lines = TesseraCommand::new(["help"]).run();
    assert!(lines.contains("Usage:"));
    assert!(lines.contains("Commands:"));
    assert!(lines.contains("keygen"));
    assert!(lines.contains("jwks"));
    assert!(lines.contains("sign"));
    assert!(lines.contains("verify"));
    assert!(lines.contains("Options:"));
}

#[test]
#[ignore]
fn test_help_keygen() {
    let lines = TesseraCommand::new(["help", "keygen"]).run();
    assert!(lines.contains("generate a signing key"));
    assert!(lines.contains("--alg"));
    assert!(lines.contains("--output"));
}

#[test]
#[ignore]
fn test_help_verify() {
    let lines = TesseraCommand::new(["help", "verify"]).run();
    assert!(lines.contains("verify a token and print its claims"));
    assert!(lines.contains("--jwks"));
    assert!(lines.contains("--client-scope"));
    assert!(lines.contains("[TOKEN]"));
}
