use super::*;

#[test]
fn test_default_config_is_valid() {
    let config = BinderyConfig::default();
    assert_eq!(config.rpc.url, "http://localhost:8545");
    assert_eq!(config.rpc.confirmations, 1);
    assert_eq!(config.fees.mode, FeeMode::Estimate);
    assert_eq!(config.call.block, "latest");
    assert!(config.validate().is_ok());
}

#[test]
fn test_legacy_mode_requires_gas_price() {
    let mut config = BinderyConfig::default();
    config.fees.mode = FeeMode::Legacy;
    assert!(matches!(
        config.validate(),
        Err(ConfigError::MissingFeeField { field: "gas_price_gwei", .. })
    ));

    config.fees.gas_price_gwei = Some(-1.0);
    assert!(matches!(config.validate(), Err(ConfigError::InvalidFee { .. })));

    config.fees.gas_price_gwei = Some(20.0);
    assert!(config.validate().is_ok());
}

#[test]
fn test_eip1559_mode_requires_both_fees() {
    let mut config = BinderyConfig::default();
    config.fees.mode = FeeMode::Eip1559;
    config.fees.max_fee_gwei = Some(40.0);
    assert!(matches!(
        config.validate(),
        Err(ConfigError::MissingFeeField { field: "max_priority_fee_gwei", .. })
    ));

    config.fees.max_priority_fee_gwei = Some(2.0);
    assert!(config.validate().is_ok());
}

#[test]
fn test_websocket_url_scheme() {
    let mut config = BinderyConfig::default();
    config.rpc.use_websocket = true;
    assert!(matches!(config.validate(), Err(ConfigError::InvalidRpcUrl { .. })));

    config.rpc.url = "wss://node.example".to_string();
    assert!(config.validate().is_ok());
}

#[test]
fn test_block_tags() {
    let mut config = BinderyConfig::default();
    for tag in ["latest", "pending", "safe", "finalized", "earliest", "19000000", "0x10"] {
        config.call.block = tag.to_string();
        assert!(config.validate().is_ok(), "tag {} should be accepted", tag);
    }

    config.call.block = "yesterday".to_string();
    assert!(matches!(config.validate(), Err(ConfigError::InvalidBlockTag(_))));
}

#[test]
fn test_zero_gas_limit_rejected() {
    let mut config = BinderyConfig::default();
    config.fees.gas_limit = Some(0);
    assert!(matches!(config.validate(), Err(ConfigError::InvalidGasLimit)));
}

#[test]
fn test_load_partial_toml_uses_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bindery.toml");
    fs::write(
        &path,
        r#"
[rpc]
url = "https://rpc.example"
confirmations = 3

[fees]
mode = "legacy"
gas_price_gwei = 12.5
gas_limit = 100000
"#,
    )
    .unwrap();

    let config = BinderyConfig::load_from_file(&path).unwrap();
    assert_eq!(config.rpc.confirmations, 3);
    assert_eq!(config.rpc.request_timeout_secs, 30);
    assert_eq!(config.fees.mode, FeeMode::Legacy);
    assert_eq!(config.fees.gas_price_gwei, Some(12.5));
    assert_eq!(config.fees.gas_limit, Some(100_000));
    assert_eq!(config.logging.level, "info");
}

#[test]
fn test_save_and_reload_json() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bindery.json");

    let mut config = BinderyConfig::default();
    config.call.caller = Some("0x00000000000000000000000000000000000000aa".to_string());
    config.call.block = "finalized".to_string();
    config.save_to_file(&path).unwrap();

    let loaded = BinderyConfig::load_from_file(&path).unwrap();
    assert_eq!(loaded.call.caller, config.call.caller);
    assert_eq!(loaded.call.block, "finalized");
}

#[test]
fn test_unsupported_extension() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bindery.ini");
    fs::write(&path, "url=http://x").unwrap();

    assert!(matches!(BinderyConfig::load_from_file(&path), Err(Error::Config(_))));
}
