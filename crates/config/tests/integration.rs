//! Integration tests for config

#[cfg(test)]
mod tests {
    use seatring_config::*;
    use seatring_errors::{ConfigError, Error};
    use seatring_types::{ColorChoice, OutputFormat};
    use std::io::Write;
    use std::sync::Mutex;
    use std::time::Duration;
    use tempfile::NamedTempFile;

    // Mutex to ensure env var tests don't run concurrently
    static ENV_TEST_MUTEX: Mutex<()> = Mutex::new(());

    fn clear_env() {
        for var in [
            constants::ENV_SIZE,
            constants::ENV_CYCLES,
            constants::ENV_WORK_MS,
            constants::ENV_OUTPUT,
            constants::ENV_COLOR,
        ] {
            std::env::remove_var(var);
        }
    }

    #[tokio::test]
    async fn test_load_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
[general]
default_output = "plain"
color = "never"

[table]
size = 7
cycles_per_worker = 100
work_duration_ms = 3
        "#
        )
        .unwrap();

        let config = Config::load_from_file(temp_file.path()).await.unwrap();
        assert_eq!(config.general.default_output, OutputFormat::Plain);
        assert_eq!(config.general.color, ColorChoice::Never);
        assert_eq!(config.table.size, 7);
        assert_eq!(config.table.cycles_per_worker, 100);
        assert_eq!(config.table.work_duration(), Duration::from_millis(3));
    }

    #[tokio::test]
    async fn test_missing_file() {
        let result =
            Config::load_from_file(std::path::Path::new("/nonexistent/seatring.toml")).await;
        assert!(matches!(
            result,
            Err(Error::Config(ConfigError::NotFound { .. }))
        ));
    }

    #[test]
    fn test_defaults_and_partial_file() {
        let config = Config::default();
        assert_eq!(config.table.size, 5);
        assert_eq!(config.table.cycles_per_worker, 5);
        assert_eq!(config.table.work_duration_ms, 0);

        let config = Config::from_toml_str("[table]\nsize = 3\n").unwrap();
        assert_eq!(config.table.size, 3);
        assert_eq!(config.table.cycles_per_worker, 5);
        assert_eq!(config.general.default_output, OutputFormat::Tty);
    }

    #[test]
    fn test_parse_error() {
        let result = Config::from_toml_str("[table]\nsize = \"many\"\n");
        assert!(matches!(
            result,
            Err(Error::Config(ConfigError::ParseError { .. }))
        ));
    }

    #[test]
    fn test_validate_rejects_small_table() {
        let mut config = Config::default();
        config.table.size = 1;
        assert!(matches!(
            config.validate(),
            Err(Error::Config(ConfigError::InvalidValue { .. }))
        ));

        config.table.size = 2;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_merge_env() {
        let _guard = ENV_TEST_MUTEX.lock().unwrap();
        clear_env();

        std::env::set_var(constants::ENV_SIZE, "9");
        std::env::set_var(constants::ENV_CYCLES, "42");
        std::env::set_var(constants::ENV_OUTPUT, "json");
        std::env::set_var(constants::ENV_COLOR, "always");

        let mut config = Config::default();
        config.merge_env().unwrap();

        assert_eq!(config.table.size, 9);
        assert_eq!(config.table.cycles_per_worker, 42);
        assert_eq!(config.general.default_output, OutputFormat::Json);
        assert_eq!(config.general.color, ColorChoice::Always);

        clear_env();
    }

    #[test]
    fn test_invalid_env_value() {
        let _guard = ENV_TEST_MUTEX.lock().unwrap();
        clear_env();

        std::env::set_var(constants::ENV_CYCLES, "lots");

        let mut config = Config::default();
        let result = config.merge_env();
        assert!(result.is_err());

        clear_env();
    }
}
