//! CLI configuration: `modemly_config` loading plus `GlobalOpts` overrides.

use modemly_config::Config;

use crate::cli::GlobalOpts;
use crate::error::CliError;

pub use modemly_config::config_path;

/// Config file in effect: `--config` if given, else the platform path.
pub fn active_path(global: &GlobalOpts) -> std::path::PathBuf {
    global.config.clone().unwrap_or_else(config_path)
}

/// Load config from file and environment, then apply flag overrides
/// (flags take priority over everything else).
pub fn load(global: &GlobalOpts) -> Result<Config, CliError> {
    let mut config = modemly_config::load_config(Some(&active_path(global)))?;
    apply_overrides(&mut config, global);
    Ok(config)
}

fn apply_overrides(config: &mut Config, global: &GlobalOpts) {
    if let Some(ref host) = global.host {
        config.modem.host.clone_from(host);
    }
    if let Some(ref username) = global.username {
        config.modem.username.clone_from(username);
    }
    if global.insecure {
        config.modem.tls = "device".into();
    }
    if let Some(timeout) = global.timeout {
        config.modem.timeout_secs = timeout;
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;
    use crate::cli::Cli;

    #[test]
    fn flags_override_config() {
        let cli = Cli::parse_from([
            "modemly",
            "--host",
            "10.1.1.1",
            "--username",
            "tech",
            "-k",
            "--timeout",
            "5",
            "levels",
        ]);
        let mut config = Config::default();
        config.modem.tls = "system".into();

        apply_overrides(&mut config, &cli.global);

        assert_eq!(config.modem.host, "10.1.1.1");
        assert_eq!(config.modem.username, "tech");
        assert_eq!(config.modem.tls, "device");
        assert_eq!(config.modem.timeout_secs, 5);
    }
}
