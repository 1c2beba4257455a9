use std::ffi::OsString;

use jbp_config::{
    discover_config_path, load_for_buildpack, with_config_env_lock, JbpConfig, JBP_CONFIG_ENV_VAR,
};
use tempfile::tempdir;

struct EnvVarGuard {
    key: &'static str,
    prev: Option<OsString>,
}

impl EnvVarGuard {
    fn set(key: &'static str, value: impl AsRef<std::ffi::OsStr>) -> Self {
        let prev = std::env::var_os(key);
        std::env::set_var(key, value);
        Self { key, prev }
    }

    fn unset(key: &'static str) -> Self {
        let prev = std::env::var_os(key);
        std::env::remove_var(key);
        Self { key, prev }
    }
}

impl Drop for EnvVarGuard {
    fn drop(&mut self) {
        match &self.prev {
            Some(v) => std::env::set_var(self.key, v),
            None => std::env::remove_var(self.key),
        }
    }
}

#[test]
fn discovers_jbp_toml_in_buildpack_root() {
    with_config_env_lock(|| {
        let _env = EnvVarGuard::unset(JBP_CONFIG_ENV_VAR);
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("jbp.toml");
        std::fs::write(&config_path, "[jre]\nversion = \"11.0.2\"\n").unwrap();

        assert_eq!(discover_config_path(dir.path()), Some(config_path));
    });
}

#[test]
fn falls_back_to_config_directory() {
    with_config_env_lock(|| {
        let _env = EnvVarGuard::unset(JBP_CONFIG_ENV_VAR);
        let dir = tempdir().unwrap();
        std::fs::create_dir(dir.path().join("config")).unwrap();
        let config_path = dir.path().join("config").join("jbp.toml");
        std::fs::write(&config_path, "").unwrap();

        assert_eq!(discover_config_path(dir.path()), Some(config_path));
    });
}

#[test]
fn env_var_wins_and_is_relative_to_the_root() {
    with_config_env_lock(|| {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("jbp.toml"), "").unwrap();
        std::fs::write(dir.path().join("custom.toml"), "").unwrap();
        let _env = EnvVarGuard::set(JBP_CONFIG_ENV_VAR, "custom.toml");

        assert_eq!(
            discover_config_path(dir.path()),
            Some(dir.path().join("custom.toml"))
        );
    });
}

#[test]
fn missing_config_yields_defaults() {
    with_config_env_lock(|| {
        let _env = EnvVarGuard::unset(JBP_CONFIG_ENV_VAR);
        let dir = tempdir().unwrap();

        let (config, path, diagnostics) = load_for_buildpack(dir.path()).unwrap();
        assert_eq!(config, JbpConfig::default());
        assert_eq!(path, None);
        assert!(diagnostics.is_empty());
    });
}

#[test]
fn relative_paths_resolve_against_the_config_file() {
    let dir = tempdir().unwrap();
    let repo = dir.path().join("repo");
    std::fs::create_dir(&repo).unwrap();
    let config_path = dir.path().join("jbp.toml");
    std::fs::write(
        &config_path,
        r#"
[jre]
repository = "repo"

[logging]
file = "logs/staging.log"
"#,
    )
    .unwrap();

    let (config, diagnostics) = JbpConfig::load_from_path_with_diagnostics(&config_path).unwrap();
    assert_eq!(config.jre.repository, Some(repo));
    assert_eq!(
        config.logging.file,
        Some(dir.path().join("logs").join("staging.log"))
    );
    assert!(diagnostics.is_empty(), "{diagnostics:?}");
}

#[test]
fn unreadable_config_is_an_io_error() {
    let dir = tempdir().unwrap();
    let err = JbpConfig::load_from_path(dir.path().join("absent.toml")).unwrap_err();
    assert!(err.to_string().contains("failed to read config file"), "{err}");
}
