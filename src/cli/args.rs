use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about,
    long_about,
    help_template(
        "{before-help}{name} {version}\n{author-with-newline}{about-with-newline}\n{usage-heading} {usage}\n\n{all-args}{after-help}"
    )
)]
pub struct Args {
    /// Path to TOML configuration file.
    #[arg(short, long, default_value = "sramtb.toml")]
    pub config: PathBuf,

    /// Directory to which output files should be saved.
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Seed for the test sequence. Overrides the configuration file.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Check captured simulator outputs (JSON) against previously written expectations
    /// instead of generating a testbench.
    #[arg(long, value_name = "CAPTURED")]
    pub check: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_check_mode() {
        let args = Args::parse_from(["sramtb", "-c", "tb.toml", "--seed", "3", "--check", "out.json"]);
        assert_eq!(args.config, PathBuf::from("tb.toml"));
        assert_eq!(args.seed, Some(3));
        assert_eq!(args.check, Some(PathBuf::from("out.json")));
        assert_eq!(args.output_dir, None);
    }

    #[test]
    fn defaults() {
        let args = Args::parse_from(["sramtb"]);
        assert_eq!(args.config, PathBuf::from("sramtb.toml"));
        assert!(args.check.is_none());
    }
}
