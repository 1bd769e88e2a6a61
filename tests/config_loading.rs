//! The configuration files shipped in `config/` load and validate.

use domain_probe::config::ConfigManager;
use std::path::PathBuf;

fn shipped() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("config")
}

#[test]
fn shipped_base_matches_compiled_defaults() {
    let manager = ConfigManager::load_from_directory_with_env(Some(shipped()), "development")
        .unwrap();
    let config = manager.config();

    assert_eq!(config.chunk_size, 10);
    assert_eq!(config.probe_timeout_ms, 10_000);
    assert_eq!(config.sink_url, "http://localhost:4242/api/put");
    assert_eq!(config.metrics.namespace, "domain");
    assert!(!config.page_load_active());
}

#[test]
fn shipped_test_overlay_tightens_timeouts() {
    let manager = ConfigManager::load_from_directory_with_env(Some(shipped()), "test").unwrap();
    let config = manager.config();

    assert_eq!(config.probe_timeout_ms, 2_000);
    assert_eq!(config.sink_timeout_ms, Some(2_000));
    assert!(!config.page_load.enabled);
}

#[test]
fn shipped_production_overlay_caps_fan_out() {
    let manager =
        ConfigManager::load_from_directory_with_env(Some(shipped()), "production").unwrap();
    let config = manager.config();

    assert_eq!(config.max_concurrent_chunks, Some(50));
    assert_eq!(config.page_load.max_concurrent_sessions, Some(4));
    assert!(config.page_load_active());
    // Fields the overlay leaves alone keep the base values.
    assert_eq!(config.chunk_size, 10);
}
