//! Emulator settings resolved from flags, environment, and config files.
//!
//! Flags win over environment variables, which win over built-in defaults:
//! 1. `--executable` / `MF3270_EXECUTABLE` / platform preset
//! 2. `--script-port` / `MF3270_SCRIPT_PORT` / 17938
//! 3. `--timeout` / `MF3270_TIMEOUT` / 30 seconds
//! 4. `--args-file` / `MF3270_ARGS_FILE` / default args file (if present)
//!
//! The default args file is `$XDG_CONFIG_HOME/mf3270/args`, falling back to
//! `~/.mf3270/args`.

use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;
use mf3270_core::{ConnectTarget, EmulatorConfig, ExtraArgs, Platform};

use crate::args::ConnectionArgs;

/// Read an env var, treating empty as unset.
fn env_nonempty(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.is_empty())
}

fn env_parsed<T>(name: &str) -> anyhow::Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    env_nonempty(name)
        .map(|value| {
            value
                .parse()
                .with_context(|| format!("invalid {} value {:?}", name, value))
        })
        .transpose()
}

/// Default args file location, if one exists on disk.
pub fn default_args_file() -> Option<PathBuf> {
    let candidates = [
        env_nonempty("XDG_CONFIG_HOME").map(|dir| PathBuf::from(dir).join("mf3270").join("args")),
        dirs::home_dir().map(|home| home.join(".mf3270").join("args")),
    ];
    candidates.into_iter().flatten().find(|path| path.is_file())
}

/// Build the emulator configuration for one CLI invocation.
pub fn emulator_config(args: &ConnectionArgs) -> anyhow::Result<EmulatorConfig> {
    let mut config = EmulatorConfig::for_platform(Platform::current(), args.visible);

    if let Some(executable) = args.executable.clone().or_else(|| env_nonempty("MF3270_EXECUTABLE")) {
        config = config.with_executable(executable);
    }

    let script_port = match args.script_port {
        Some(port) => Some(port),
        None => env_parsed::<u16>("MF3270_SCRIPT_PORT")?,
    };
    if let Some(port) = script_port {
        config = config.with_script_port(port);
    }

    let timeout = match args.timeout {
        Some(secs) => Some(secs),
        None => env_parsed::<u64>("MF3270_TIMEOUT")?,
    };
    if let Some(secs) = timeout {
        config = config.with_wait_timeout(Duration::from_secs(secs));
    }

    let args_file = args
        .args_file
        .clone()
        .or_else(|| env_nonempty("MF3270_ARGS_FILE").map(PathBuf::from))
        .or_else(default_args_file);
    if let Some(path) = args_file {
        tracing::debug!("Using args file {}", path.display());
        config = config.with_extra_args(ExtraArgs::File(path));
    }

    if !args.extra.is_empty() {
        config = config.with_extra_args(ExtraArgs::List(args.extra.clone()));
    }

    Ok(config)
}

/// The host to connect to.
pub fn connect_target(args: &ConnectionArgs) -> ConnectTarget {
    let target = ConnectTarget::new(args.host.clone()).with_port(args.port);
    match &args.lu {
        Some(lu) => target.with_lu(lu.clone()),
        None => target,
    }
}

/// Folder for screenshots: flag, then `MF3270_SCREENSHOT_DIR`, then the
/// current directory. A folder that does not exist falls back to the
/// current directory.
pub fn screenshot_dir(flag: Option<&Path>) -> PathBuf {
    let current = PathBuf::from(".");
    let Some(dir) = flag
        .map(Path::to_path_buf)
        .or_else(|| env_nonempty("MF3270_SCREENSHOT_DIR").map(PathBuf::from))
    else {
        return current;
    };

    if dir.is_dir() {
        dir
    } else {
        tracing::warn!(
            "Screenshot folder {} does not exist, using current directory",
            dir.display()
        );
        current
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::args::{Cli, Commands};
    use clap::Parser;

    // Env var manipulation is process-wide, so these tests run serially.
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    const VARS: &[&str] = &[
        "MF3270_EXECUTABLE",
        "MF3270_SCRIPT_PORT",
        "MF3270_TIMEOUT",
        "MF3270_ARGS_FILE",
        "MF3270_SCREENSHOT_DIR",
        "XDG_CONFIG_HOME",
        "HOME",
    ];

    struct EnvGuard {
        vars: Vec<(String, Option<String>)>,
        _lock: std::sync::MutexGuard<'static, ()>,
    }

    impl EnvGuard {
        /// Snapshot and clear every variable this module reads.
        fn new() -> Self {
            let lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
            let vars = VARS
                .iter()
                .map(|name| (name.to_string(), env::var(name).ok()))
                .collect();
            for name in VARS {
                // SAFETY: We hold ENV_MUTEX
                unsafe { env::remove_var(name) };
            }
            Self { vars, _lock: lock }
        }

        fn set(&self, name: &str, value: impl AsRef<std::ffi::OsStr>) {
            // SAFETY: We hold ENV_MUTEX
            unsafe { env::set_var(name, value) };
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            for (name, value) in &self.vars {
                // SAFETY: We hold ENV_MUTEX
                unsafe {
                    match value {
                        Some(v) => env::set_var(name, v),
                        None => env::remove_var(name),
                    }
                }
            }
        }
    }

    fn connection(extra: &[&str]) -> ConnectionArgs {
        let mut argv = vec!["mf3270", "screen", "-H", "host"];
        argv.extend_from_slice(extra);
        match Cli::parse_from(argv).command {
            Commands::Screen(args) => args.connection,
            _ => unreachable!(),
        }
    }

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = env::temp_dir().join(format!("mf3270-cli-{}-{}", name, std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_defaults_follow_platform_preset() {
        let guard = EnvGuard::new();
        guard.set("HOME", scratch_dir("empty-home"));

        let config = emulator_config(&connection(&[])).unwrap();
        let preset = EmulatorConfig::for_platform(Platform::current(), false);
        assert_eq!(config.executable, preset.executable);
        assert_eq!(config.script_port, preset.script_port);
        assert_eq!(config.wait_timeout, preset.wait_timeout);
        assert!(config.extra_args.is_empty());
    }

    #[test]
    fn test_env_overrides_defaults() {
        let guard = EnvGuard::new();
        guard.set("HOME", scratch_dir("env-home"));
        guard.set("MF3270_EXECUTABLE", "/opt/x3270/bin/s3270");
        guard.set("MF3270_SCRIPT_PORT", "20000");
        guard.set("MF3270_TIMEOUT", "5");

        let config = emulator_config(&connection(&[])).unwrap();
        assert_eq!(config.executable, "/opt/x3270/bin/s3270");
        assert_eq!(config.script_port, 20000);
        assert_eq!(config.wait_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_flags_override_env() {
        let guard = EnvGuard::new();
        guard.set("HOME", scratch_dir("flag-home"));
        guard.set("MF3270_EXECUTABLE", "from-env");
        guard.set("MF3270_SCRIPT_PORT", "20000");

        let config = emulator_config(&connection(&[
            "--executable",
            "from-flag",
            "--script-port",
            "30000",
        ]))
        .unwrap();
        assert_eq!(config.executable, "from-flag");
        assert_eq!(config.script_port, 30000);
    }

    #[test]
    fn test_invalid_env_number_is_an_error() {
        let guard = EnvGuard::new();
        guard.set("MF3270_SCRIPT_PORT", "not-a-port");

        let err = emulator_config(&connection(&[])).unwrap_err();
        assert!(err.to_string().contains("MF3270_SCRIPT_PORT"));
    }

    #[test]
    fn test_default_args_file_prefers_xdg() {
        let guard = EnvGuard::new();
        let xdg = scratch_dir("xdg");
        std::fs::create_dir_all(xdg.join("mf3270")).unwrap();
        std::fs::write(xdg.join("mf3270").join("args"), "-trace\n").unwrap();
        guard.set("XDG_CONFIG_HOME", &xdg);

        assert_eq!(default_args_file(), Some(xdg.join("mf3270").join("args")));

        let config = emulator_config(&connection(&[])).unwrap();
        assert_eq!(
            config.extra_args,
            vec![ExtraArgs::File(xdg.join("mf3270").join("args"))]
        );
    }

    #[test]
    fn test_default_args_file_home_fallback() {
        let guard = EnvGuard::new();
        let home = scratch_dir("home");
        std::fs::create_dir_all(home.join(".mf3270")).unwrap();
        std::fs::write(home.join(".mf3270").join("args"), "-trace\n").unwrap();
        guard.set("HOME", &home);

        assert_eq!(default_args_file(), Some(home.join(".mf3270").join("args")));
    }

    #[test]
    fn test_extra_args_after_file() {
        let guard = EnvGuard::new();
        guard.set("HOME", scratch_dir("extra-home"));

        let config = emulator_config(&connection(&[
            "--args-file",
            "/etc/mf3270.args",
            "--arg",
            "-trace",
        ]))
        .unwrap();
        assert_eq!(
            config.extra_args,
            vec![
                ExtraArgs::File(PathBuf::from("/etc/mf3270.args")),
                ExtraArgs::List(vec!["-trace".to_string()]),
            ]
        );
    }

    #[test]
    fn test_connect_target() {
        let target = connect_target(&connection(&["--lu", "LU01", "--port", "992"]));
        assert_eq!(target.to_string(), "LU01@host:992");
    }

    #[test]
    fn test_screenshot_dir_resolution() {
        let guard = EnvGuard::new();
        assert_eq!(screenshot_dir(None), PathBuf::from("."));

        let shots = scratch_dir("shots");
        guard.set("MF3270_SCREENSHOT_DIR", &shots);
        assert_eq!(screenshot_dir(None), shots);

        let missing = shots.join("does-not-exist");
        assert_eq!(screenshot_dir(Some(missing.as_path())), PathBuf::from("."));
    }
}
