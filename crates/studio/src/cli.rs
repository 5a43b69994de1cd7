use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "wizworks-studio", version, about = "Wiz Works document studio service")]
pub(crate) struct Args {
    /// TOML file overriding model and export settings; built-in defaults apply when omitted.
    #[arg(long)]
    pub(crate) config: Option<PathBuf>,
    #[arg(long, default_value = "127.0.0.1:3000")]
    pub(crate) listen_addr: String,
    #[arg(long, default_value_t = false)]
    pub(crate) log_to_stderr: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_without_flags() {
        let args = Args::try_parse_from(["wizworks-studio"]).expect("args");
        assert!(args.config.is_none());
        assert_eq!(args.listen_addr, "127.0.0.1:3000");
        assert!(!args.log_to_stderr);
    }

    #[test]
    fn accepts_config_path() {
        let args = Args::try_parse_from([
            "wizworks-studio",
            "--config",
            "config/studio.toml",
            "--listen-addr",
            "0.0.0.0:8080",
        ])
        .expect("args");
        assert_eq!(args.config, Some(PathBuf::from("config/studio.toml")));
        assert_eq!(args.listen_addr, "0.0.0.0:8080");
    }
}
