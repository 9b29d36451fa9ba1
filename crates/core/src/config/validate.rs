use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - At least one job may run
/// - The encoder path, codecs and output extensions are non-empty
/// - The backup directory name is a single path component
/// - A configured timeout is not zero
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.jobs.max_parallel == 0 {
        return Err(ConfigError::ValidationError(
            "jobs.max_parallel cannot be 0".to_string(),
        ));
    }

    let converter = &config.converter;
    if converter.ffmpeg_path.as_os_str().is_empty() {
        return Err(ConfigError::ValidationError(
            "converter.ffmpeg_path cannot be empty".to_string(),
        ));
    }

    for (name, value) in [
        ("converter.video_codec", &converter.video_codec),
        ("converter.video_container", &converter.video_container),
        ("converter.video_extension", &converter.video_extension),
        ("converter.audio_codec", &converter.audio_codec),
        ("converter.audio_container", &converter.audio_container),
        ("converter.audio_extension", &converter.audio_extension),
    ] {
        if value.trim().is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "{} cannot be empty",
                name
            )));
        }
    }

    if converter.timeout_secs == Some(0) {
        return Err(ConfigError::ValidationError(
            "converter.timeout_secs must be greater than 0 when set".to_string(),
        ));
    }

    let backup = &config.placer.backup_dir_name;
    if !config.placer.backup_dir_is_plain() || backup.contains('\\') {
        return Err(ConfigError::ValidationError(format!(
            "placer.backup_dir_name must be a plain directory name, got {:?}",
            backup
        )));
    }

    if config.placer.copy_buffer_bytes == 0 {
        return Err(ConfigError::ValidationError(
            "placer.copy_buffer_bytes cannot be 0".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_default_config() {
        assert!(validate_config(&Config::default()).is_ok());
    }

    #[test]
    fn test_validate_zero_parallel_fails() {
        let mut config = Config::default();
        config.jobs.max_parallel = 0;
        let result = validate_config(&config);
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_validate_empty_codec_fails() {
        let mut config = Config::default();
        config.converter.video_codec = " ".to_string();
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("converter.video_codec"));
    }

    #[test]
    fn test_validate_zero_timeout_fails() {
        let mut config = Config::default();
        config.converter.timeout_secs = Some(0);
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_backup_dir_name() {
        let mut config = Config::default();
        config.placer.backup_dir_name = "../elsewhere".to_string();
        assert!(validate_config(&config).is_err());

        config.placer.backup_dir_name = "previous".to_string();
        assert!(validate_config(&config).is_ok());
    }
}
