use std::time::Duration;

use anyhow::{bail, Result};
use clap_serde_derive::ClapSerde;
use url::Url;

// Defaults live in `#[default]`; a clap `default_value` would shadow the config file on merge.
#[derive(ClapSerde, Debug)]
pub struct Config {
    /// The address the listener binds to
    #[default("127.0.0.1".to_string())]
    #[arg(short, long, env)]
    pub(crate) address: String,

    /// The port the listener binds to
    #[default(8001)]
    #[arg(short, long, env)]
    pub(crate) port: u16,

    /// Base URL of the upstream inference server
    #[default("http://127.0.0.1:8000".to_string())]
    #[arg(short, long, env)]
    pub(crate) upstream_url: String,

    /// Timeout in seconds for the upstream health probe
    #[default(5)]
    #[arg(long, env)]
    pub(crate) health_timeout: u64,

    /// Timeout in seconds for establishing a connection to the upstream
    #[default(10)]
    #[arg(long, env)]
    pub(crate) connect_timeout: u64,

    /// Timeout in seconds for forwarded image requests
    #[default(60)]
    #[arg(long, env)]
    pub(crate) forward_timeout: u64,
}

impl Config {
    /// Reads a possibly partial TOML file; missing keys keep their defaults.
    pub fn from_toml(path: &str) -> Result<Self> {
        let str = std::fs::read_to_string(path)?;
        let opt: <Config as ClapSerde>::Opt = toml::from_str(&str)?;
        Ok(Config::from(opt))
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout)
    }

    pub fn health_timeout(&self) -> Duration {
        Duration::from_secs(self.health_timeout)
    }

    pub fn forward_timeout(&self) -> Duration {
        Duration::from_secs(self.forward_timeout)
    }
}

/// Validates the upstream base URL and strips trailing slashes so upstream paths can be appended.
pub fn normalize_base_url(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    let url = Url::parse(trimmed)?;
    if !matches!(url.scheme(), "http" | "https") {
        bail!(
            "Upstream URL {} must use the http or https scheme",
            trimmed
        );
    }
    if url.host_str().is_none() {
        bail!("Upstream URL {} has no host", trimmed);
    }

    Ok(trimmed.trim_end_matches('/').to_string())
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[derive(Parser)]
    struct TestArgs {
        #[command(flatten)]
        opt_config: <Config as ClapSerde>::Opt,
    }

    fn write_config(name: &str, contents: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!(
            "vision_relay_{}_{}.toml",
            name,
            std::process::id()
        ));
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn trailing_slashes_are_stripped() {
        assert_eq!(
            normalize_base_url("https://relay.example.dev/").unwrap(),
            "https://relay.example.dev"
        );
        assert_eq!(
            normalize_base_url(" http://10.0.0.2:8000/prefix// ").unwrap(),
            "http://10.0.0.2:8000/prefix"
        );
    }

    #[test]
    fn rejects_unusable_urls() {
        assert!(normalize_base_url("not a url").is_err());
        assert!(normalize_base_url("ftp://files.example.dev").is_err());
        assert!(normalize_base_url("").is_err());
    }

    #[test]
    fn reads_toml_file() {
        let path = write_config(
            "full",
            r#"
address = "0.0.0.0"
port = 9000
upstream_url = "https://gpu.example.dev"
health_timeout = 2
forward_timeout = 120
"#,
        );

        let config = Config::from_toml(path.to_str().unwrap()).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(config.address, "0.0.0.0");
        assert_eq!(config.port, 9000);
        assert_eq!(config.upstream_url, "https://gpu.example.dev");
        assert_eq!(config.health_timeout(), Duration::from_secs(2));
        assert_eq!(config.forward_timeout(), Duration::from_secs(120));
    }

    #[test]
    fn defaults_apply_without_a_file() {
        let config = Config::default();
        assert_eq!(config.address, "127.0.0.1");
        assert_eq!(config.port, 8001);
        assert_eq!(config.upstream_url, "http://127.0.0.1:8000");
        assert_eq!(config.health_timeout(), Duration::from_secs(5));
        assert_eq!(config.connect_timeout(), Duration::from_secs(10));
        assert_eq!(config.forward_timeout(), Duration::from_secs(60));
    }

    #[test]
    fn file_values_survive_merging_with_absent_flags() {
        let path = write_config(
            "partial",
            r#"
upstream_url = "https://gpu.example.dev"
port = 9000
"#,
        );
        let file = Config::from_toml(path.to_str().unwrap()).unwrap();
        std::fs::remove_file(&path).unwrap();

        let args = TestArgs::parse_from(["vision_relay"]);
        let config = file.merge(args.opt_config);

        assert_eq!(config.upstream_url, "https://gpu.example.dev");
        assert_eq!(config.port, 9000);
        assert_eq!(config.address, "127.0.0.1");
        assert_eq!(config.forward_timeout(), Duration::from_secs(60));
    }

    #[test]
    fn flags_override_file_values() {
        let path = write_config("override", "upstream_url = \"https://gpu.example.dev\"\n");
        let file = Config::from_toml(path.to_str().unwrap()).unwrap();
        std::fs::remove_file(&path).unwrap();

        let args = TestArgs::parse_from([
            "vision_relay",
            "--upstream-url",
            "http://10.0.0.7:8000",
            "--forward-timeout",
            "90",
        ]);
        let config = file.merge(args.opt_config);

        assert_eq!(config.upstream_url, "http://10.0.0.7:8000");
        assert_eq!(config.forward_timeout(), Duration::from_secs(90));
    }
}
