use std::{env, fs};

use hmcp_server::config::loader::load_config;

#[test]
fn config_parsing_and_env_overrides_and_validation() {
    let dir = tempfile::tempdir().expect("tmp dir");
    let path = dir.path().join("hmcp.toml");

    let toml_content = r#"
[server]
host = "127.0.0.1"
port = 8081

[logging]
level = "debug"

[agent]
name = "Clinical Agent"
instructions = "Answers chart questions"

[auth]
issuer = "Test_Issuer"
audience = "https://agents.example.org"
token_expiry_hours = 2

[auth.signing]
algorithm = "HS512"
secret = "file-secret"

[auth.clients.scheduler]
secret = "scheduler-secret"
scopes = ["hmcp:access", "patient/hmcp:read"]

[auth.route_scopes]
"/messages" = ["hmcp:access"]
"#;
    fs::write(&path, toml_content).expect("write toml");

    // 1) Valid config parses
    let cfg = load_config(path.to_str()).expect("should parse config");
    assert_eq!(cfg.server.port, 8081);
    assert_eq!(cfg.logging.level, "debug");
    assert_eq!(cfg.agent.name, "Clinical Agent");
    assert_eq!(
        cfg.agent.instructions.as_deref(),
        Some("Answers chart questions")
    );
    assert_eq!(cfg.auth.issuer, "Test_Issuer");
    assert_eq!(cfg.auth.token_expiry_hours, 2);
    assert_eq!(cfg.auth.expires_in_seconds(), 7200);
    assert_eq!(cfg.auth.signing.algorithm, "HS512");
    assert_eq!(
        cfg.auth.clients["scheduler"].scopes,
        vec!["hmcp:access".to_string(), "patient/hmcp:read".to_string()]
    );
    assert_eq!(
        cfg.auth.required_scopes_for("/messages"),
        Some(&["hmcp:access".to_string()][..])
    );

    // 2) Env override should win over file
    unsafe {
        env::set_var("HMCP__SERVER__PORT", "9191");
    }
    let cfg_env = load_config(path.to_str()).expect("should parse config with env overrides");
    assert_eq!(cfg_env.server.port, 9191);
    unsafe {
        env::remove_var("HMCP__SERVER__PORT");
    }

    // 3) Invalid values are rejected
    let bad_path = dir.path().join("bad.toml");
    fs::write(
        &bad_path,
        r#"
[logging]
level = "verbose"

[auth.signing]
secret = "s"
"#,
    )
    .expect("write bad toml");
    let err = load_config(bad_path.to_str()).expect_err("invalid level must fail");
    assert!(err.contains("logging.level"));
}

#[test]
fn missing_signing_secret_is_rejected() {
    let dir = tempfile::tempdir().expect("tmp dir");
    let path = dir.path().join("hmcp.toml");
    fs::write(&path, "[auth]\ntoken_url = \"/oauth/token\"\n").expect("write toml");

    if env::var_os("HMCP_JWT_SECRET").is_some() {
        return;
    }
    let err = load_config(path.to_str()).expect_err("secret is required");
    assert!(err.contains("signing.secret"));
}

#[test]
fn unsupported_algorithm_is_rejected() {
    let dir = tempfile::tempdir().expect("tmp dir");
    let path = dir.path().join("hmcp.toml");
    fs::write(
        &path,
        "[auth.signing]\nalgorithm = \"RS256\"\nsecret = \"s\"\n",
    )
    .expect("write toml");

    let err = load_config(path.to_str()).expect_err("RS256 is not supported");
    assert!(err.contains("auth config error"));
}
