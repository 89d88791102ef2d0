use super::*;

fn base() -> StudioConfig {
    StudioConfig::new("http://127.0.0.1:8000").expect("valid base url")
}

#[test]
fn no_flags_keep_environment_config() {
    let config = apply_overrides(base(), ConnectionArgs::default()).expect("overrides apply");
    assert_eq!(config, base());
}

#[test]
fn base_url_flag_rederives_chat_url() {
    let args = ConnectionArgs {
        base_url: Some("https://studio.example.com/".to_owned()),
        ..ConnectionArgs::default()
    };
    let config = apply_overrides(base(), args).expect("overrides apply");
    assert_eq!(config.base_url, "https://studio.example.com");
    assert_eq!(config.chat_url, "wss://studio.example.com/ws/chat");
}

#[test]
fn explicit_ws_url_wins_over_derived_one() {
    let args = ConnectionArgs {
        base_url: Some("https://studio.example.com".to_owned()),
        ws_url: Some("ws://localhost:9000/ws/chat".to_owned()),
        ..ConnectionArgs::default()
    };
    let config = apply_overrides(base(), args).expect("overrides apply");
    assert_eq!(config.chat_url, "ws://localhost:9000/ws/chat");
}

#[test]
fn bad_base_url_flag_is_rejected() {
    let args = ConnectionArgs {
        base_url: Some("studio.example.com".to_owned()),
        ..ConnectionArgs::default()
    };
    let err = apply_overrides(base(), args).expect_err("must fail");
    assert!(matches!(err, ConfigError::InvalidBaseUrl(_)));
}

#[test]
fn auth_flags_fill_auth_config() {
    let args = ConnectionArgs {
        agent: Some("recon".to_owned()),
        auth_mode: Some(AuthMode::Keys),
        region: Some("eu-west-1".to_owned()),
        access_key_id: Some("AKIA".to_owned()),
        secret_access_key: Some("secret".to_owned()),
        ..ConnectionArgs::default()
    };
    let config = apply_overrides(base(), args).expect("overrides apply");
    assert_eq!(config.agent_id, "recon");
    assert_eq!(config.auth.auth_mode, AuthMode::Keys);
    assert_eq!(config.auth.region, "eu-west-1");
    assert_eq!(config.auth.access_key_id.as_deref(), Some("AKIA"));
    assert_eq!(config.auth.secret_access_key.as_deref(), Some("secret"));
    assert_eq!(config.auth.profile, None);
}

#[test]
fn cli_parses_nested_subcommands() {
    let cli = Cli::try_parse_from([
        "studio",
        "logs",
        "events",
        "/aws/lambda/api",
        "--keyword",
        "timeout",
        "--start",
        "100",
    ])
    .expect("valid arguments");
    let Command::Logs(LogsCommand {
        command: LogsSubcommand::Events(query),
    }) = cli.command
    else {
        panic!("expected logs events");
    };
    let filter = query.filter();
    assert_eq!(filter.log_group_name, "/aws/lambda/api");
    assert_eq!(filter.keyword, "timeout");
    assert_eq!(filter.start_time, Some(100));
    assert_eq!(filter.end_time, None);
}

#[test]
fn cli_rejects_unknown_auth_mode() {
    let result = Cli::try_parse_from(["studio", "--auth-mode", "password", "agents"]);
    assert!(result.is_err());
}
