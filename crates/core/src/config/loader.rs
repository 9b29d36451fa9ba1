use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use std::path::Path;

use super::{types::Config, ConfigError};

const ENV_PREFIX: &str = "DROPCONV_";

/// Load configuration from file with environment variable overrides
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.display().to_string()));
    }

    Figment::from(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))
}

/// Load configuration from an optional file.
///
/// Without a path, only defaults and environment variables apply.
pub fn load_config_or_default(path: Option<&Path>) -> Result<Config, ConfigError> {
    match path {
        Some(path) => load_config(path),
        None => Figment::from(Serialized::defaults(Config::default()))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .map_err(|e| ConfigError::ParseError(e.to_string())),
    }
}

/// Load configuration from TOML string (useful for testing)
pub fn load_config_from_str(toml_str: &str) -> Result<Config, ConfigError> {
    toml::from_str(toml_str).map_err(|e| ConfigError::ParseError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_config_from_str_empty() {
        let config = load_config_from_str("").unwrap();
        assert_eq!(config.jobs.max_parallel, 4);
        assert_eq!(config.converter.ffmpeg_path.to_string_lossy(), "ffmpeg");
        assert_eq!(config.placer.backup_dir_name, "backup");
    }

    #[test]
    fn test_load_config_from_str_sections() {
        let toml = r#"
[converter]
ffmpeg_path = "/opt/ffmpeg/bin/ffmpeg"
video_preset = "veryfast"
timeout_secs = 600
audio_extensions = ["wav", "aiff"]

[placer]
backup_dir_name = "old"

[jobs]
max_parallel = 2
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.converter.video_preset, "veryfast");
        assert_eq!(config.converter.timeout_secs, Some(600));
        assert_eq!(config.converter.audio_extensions, vec!["wav", "aiff"]);
        assert_eq!(config.converter.video_codec, "libx264");
        assert_eq!(config.placer.backup_dir_name, "old");
        assert_eq!(config.jobs.max_parallel, 2);
    }

    #[test]
    fn test_load_config_from_str_bad_type() {
        let result = load_config_from_str("[jobs]\nmax_parallel = \"many\"\n");
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_load_config_file_not_found() {
        let result = load_config(Path::new("/nonexistent/dropconv.toml"));
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_load_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
[converter]
stream_ready_delay_ms = 250

[placer]
verify_checksums = true
"#
        )
        .unwrap();

        let config = load_config(temp_file.path()).unwrap();
        assert_eq!(config.converter.stream_ready_delay_ms, 250);
        assert!(config.placer.verify_checksums);
        assert_eq!(config.jobs.max_parallel, 4);
    }

    #[test]
    fn test_load_config_or_default_without_file() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("DROPCONV_JOBS__MAX_PARALLEL", "7");
            jail.set_env("DROPCONV_CONVERTER__FFMPEG_PATH", "/usr/local/bin/ffmpeg");

            let config = load_config_or_default(None).unwrap();
            assert_eq!(config.jobs.max_parallel, 7);
            assert_eq!(
                config.converter.ffmpeg_path.to_string_lossy(),
                "/usr/local/bin/ffmpeg"
            );
            Ok(())
        });
    }
}
