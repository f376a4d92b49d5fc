#![allow(clippy::expect_used, clippy::unwrap_used)]

use assert_cmd::Command;
use std::path::Path;
use std::time::Duration;

#[allow(dead_code)]
pub const CMD_TIMEOUT: Duration = Duration::from_secs(15);

/// Create a `mimesync` command isolated to the given directories.
///
/// Background refresh is disabled and colors are off.
#[allow(dead_code)]
pub fn mimesync_cmd(data_dir: &Path, config_dir: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("mimesync"));
    cmd.timeout(CMD_TIMEOUT);
    cmd.env("MIMESYNC_DATA_DIR", data_dir);
    cmd.env("MIMESYNC_CONFIG_DIR", config_dir);
    cmd.env("MIMESYNC_REFRESH_INTERVAL_MS", "-1");
    cmd.env("NO_COLOR", "1");
    cmd
}

/// Point every feed at `base_url` by writing a `[sources]` table.
///
/// Feeds not listed here fall back to the real upstream URLs, so tests that
/// run a refresh override all of them.
#[allow(dead_code)]
pub fn write_source_overrides(config_dir: &Path, base_url: &str) {
    let names = [
        "apache",
        "debian",
        "nginx",
        "application",
        "audio",
        "font",
        "image",
        "message",
        "model",
        "multipart",
        "text",
        "video",
    ];
    let mut toml = String::from("[fetch]\ntimeout_secs = 5\n\n[sources]\n");
    for name in names {
        toml.push_str(&format!("{name} = \"{base_url}/{name}\"\n"));
    }
    std::fs::write(config_dir.join("config.toml"), toml).expect("failed to write config");
}
