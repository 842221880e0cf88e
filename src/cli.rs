use clap::Parser;

use crate::io::DEFAULT_MAX_SIZE;

#[derive(Parser, Debug)]
#[command(name = "zipcheck")]
#[command(version)]
#[command(about = "Classify the entries of a ZIP archive by magic number", long_about = None)]
#[command(after_help = "Examples:\n  \
  zipcheck upload.zip                        list entries with detected types\n  \
  zipcheck --json upload.zip | jq .          emit results as a JSON array\n  \
  zipcheck https://example.com/archive.zip   check a remote ZIP")]
pub struct Cli {
    /// ZIP file path or HTTP URL
    #[arg(value_name = "FILE")]
    pub file: String,

    /// Print results as a JSON array
    #[arg(long)]
    pub json: bool,

    /// Pretty-print JSON output
    #[arg(long, requires = "json")]
    pub pretty: bool,

    /// Refuse archives larger than this many bytes
    #[arg(long, value_name = "BYTES", default_value_t = DEFAULT_MAX_SIZE)]
    pub max_size: u64,

    /// Quiet mode, no summary line
    #[arg(short = 'q')]
    pub quiet: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short = 'v', action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Emit log lines as JSON
    #[arg(long)]
    pub log_json: bool,
}

impl Cli {
    pub fn is_http_url(&self) -> bool {
        self.file.starts_with("http://") || self.file.starts_with("https://")
    }

    pub fn is_quiet(&self) -> bool {
        self.quiet || self.json
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["zipcheck", "upload.zip"]).unwrap();
        assert_eq!(cli.file, "upload.zip");
        assert_eq!(cli.max_size, DEFAULT_MAX_SIZE);
        assert!(!cli.json);
        assert!(!cli.is_http_url());
        assert!(!cli.is_quiet());
    }

    #[test]
    fn test_flags() {
        let cli = Cli::try_parse_from([
            "zipcheck",
            "--json",
            "--pretty",
            "--max-size",
            "1024",
            "-vv",
            "https://example.com/a.zip",
        ])
        .unwrap();
        assert!(cli.json && cli.pretty);
        assert_eq!(cli.max_size, 1024);
        assert_eq!(cli.verbose, 2);
        assert!(cli.is_http_url());
        assert!(cli.is_quiet());
    }

    #[test]
    fn test_pretty_requires_json() {
        assert!(Cli::try_parse_from(["zipcheck", "--pretty", "a.zip"]).is_err());
    }
}
