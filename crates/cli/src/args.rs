use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "dropconv")]
#[command(author, version, about = "Convert dropped media files with ffmpeg")]
pub struct Args {
    /// Path to config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Print events and logs as JSON lines
    #[arg(long)]
    pub json: bool,

    /// Print Prometheus metrics after all jobs finish
    #[arg(long)]
    pub metrics: bool,

    /// Skip the one-time ffmpeg check before submitting files
    #[arg(long)]
    pub no_preflight: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Files to convert
    #[arg(required = true)]
    pub files: Vec<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_files_and_flags() {
        let args = Args::parse_from(["dropconv", "--json", "-c", "conf.toml", "a.avi", "b.wav"]);
        assert!(args.json);
        assert!(!args.metrics);
        assert!(!args.no_preflight);
        assert_eq!(args.config, Some(PathBuf::from("conf.toml")));
        assert_eq!(args.files, vec![PathBuf::from("a.avi"), PathBuf::from("b.wav")]);
    }

    #[test]
    fn test_no_preflight_flag() {
        let args = Args::parse_from(["dropconv", "--no-preflight", "a.avi"]);
        assert!(args.no_preflight);
    }

    #[test]
    fn test_files_required() {
        assert!(Args::try_parse_from(["dropconv"]).is_err());
    }
}
