//! Emulator launch configuration and connect targets.
//!
//! Which executable runs, how it is reached, and which flags it gets are all
//! decided here, up front, instead of by inspecting the host OS at runtime.
//! [`Platform::current`] is provided for front ends that want the usual
//! default, but nothing in the library calls it.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};

/// Default TCP port for socket-mode emulators.
pub const DEFAULT_SCRIPT_PORT: u16 = 17938;

/// Default timeout, in seconds, for `Wait(..., InputField)`.
pub const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default telnet port of the host.
pub const DEFAULT_HOST_PORT: u16 = 23;

/// How commands reach the emulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    /// Child process stdin/stdout (`s3270`, `x3270 -script`).
    Pipe,
    /// TCP to a script port on 127.0.0.1 (`ws3270`, `wc3270`).
    Socket,
}

/// Operating system family, used only to pick a preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Unix,
    Windows,
}

impl Platform {
    /// Platform this binary was compiled for.
    pub fn current() -> Self {
        if cfg!(windows) {
            Platform::Windows
        } else {
            Platform::Unix
        }
    }
}

/// Extra command-line tokens appended after the preset's base arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtraArgs {
    List(Vec<String>),
    /// A file of arguments; `#` lines are comments, the rest is split on
    /// whitespace.
    File(PathBuf),
}

/// Read an argument file into tokens.
pub fn load_args_file(path: &Path) -> Result<Vec<String>> {
    let contents = fs::read_to_string(path).map_err(|source| Error::ArgsFile {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(parse_args(&contents))
}

fn parse_args(contents: &str) -> Vec<String> {
    contents
        .lines()
        .filter(|line| !line.trim_start().starts_with('#'))
        .flat_map(str::split_whitespace)
        .map(String::from)
        .collect()
}

/// Everything needed to launch one emulator instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmulatorConfig {
    pub transport: TransportKind,
    pub executable: String,
    pub base_args: Vec<String>,
    pub extra_args: Vec<ExtraArgs>,
    /// Only used by [`TransportKind::Socket`].
    pub script_port: u16,
    /// Passed to `Wait(..., InputField)`.
    pub wait_timeout: Duration,
    /// Pause after AID keys (Enter, PF, PA) so the host can redraw.
    /// Zero disables it.
    pub post_command_wait: Duration,
    /// Pause after typing text. Zero disables it.
    pub post_write_wait: Duration,
}

fn xrm(resource: &str) -> [String; 2] {
    ["-xrm".to_string(), resource.to_string()]
}

impl EmulatorConfig {
    fn preset(transport: TransportKind, executable: &str, base_args: Vec<String>) -> Self {
        Self {
            transport,
            executable: executable.to_string(),
            base_args,
            extra_args: Vec::new(),
            script_port: DEFAULT_SCRIPT_PORT,
            wait_timeout: DEFAULT_WAIT_TIMEOUT,
            post_command_wait: Duration::ZERO,
            post_write_wait: Duration::ZERO,
        }
    }

    /// Headless Unix emulator driven over pipes.
    ///
    /// Early hosts unlocked the keyboard before processing a command, so the
    /// emulators delay 350ms after every AID key by default. `unlockDelay`
    /// turns that off.
    pub fn s3270() -> Self {
        Self::preset(
            TransportKind::Pipe,
            "s3270",
            xrm("s3270.unlockDelay: False").to_vec(),
        )
    }

    /// Visible X11 emulator driven over pipes.
    pub fn x3270() -> Self {
        let mut args = xrm("x3270.unlockDelay: False").to_vec();
        args.extend(xrm("x3270.model: 2"));
        args.push("-script".to_string());
        Self::preset(TransportKind::Pipe, "x3270", args)
    }

    /// Headless Windows emulator driven over a script port.
    pub fn ws3270() -> Self {
        Self::preset(
            TransportKind::Socket,
            "ws3270",
            xrm("ws3270.unlockDelay: False").to_vec(),
        )
    }

    /// Visible Windows console emulator driven over a script port.
    pub fn wc3270() -> Self {
        let mut args = xrm("wc3270.unlockDelay: False").to_vec();
        args.extend(xrm("wc3270.model: 2"));
        Self::preset(TransportKind::Socket, "wc3270", args)
    }

    /// Pick the usual preset for a platform and visibility.
    pub fn for_platform(platform: Platform, visible: bool) -> Self {
        match (platform, visible) {
            (Platform::Unix, false) => Self::s3270(),
            (Platform::Unix, true) => Self::x3270(),
            (Platform::Windows, false) => Self::ws3270(),
            (Platform::Windows, true) => Self::wc3270(),
        }
    }

    /// Append extra launch arguments.
    #[must_use]
    pub fn with_extra_args(mut self, extra: ExtraArgs) -> Self {
        self.extra_args.push(extra);
        self
    }

    #[must_use]
    pub fn with_script_port(mut self, port: u16) -> Self {
        self.script_port = port;
        self
    }

    #[must_use]
    pub fn with_wait_timeout(mut self, timeout: Duration) -> Self {
        self.wait_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_post_command_wait(mut self, wait: Duration) -> Self {
        self.post_command_wait = wait;
        self
    }

    #[must_use]
    pub fn with_post_write_wait(mut self, wait: Duration) -> Self {
        self.post_write_wait = wait;
        self
    }

    #[must_use]
    pub fn with_executable(mut self, executable: impl Into<String>) -> Self {
        self.executable = executable.into();
        self
    }

    /// Full argument list: base arguments, then every extra source in order.
    pub fn launch_args(&self) -> Result<Vec<String>> {
        let mut args = self.base_args.clone();
        for extra in &self.extra_args {
            match extra {
                ExtraArgs::List(list) => args.extend(list.iter().cloned()),
                ExtraArgs::File(path) => args.extend(load_args_file(path)?),
            }
        }
        Ok(args)
    }
}

/// Host to connect to, rendered as `lu@host:port` or `host:port`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectTarget {
    pub host: String,
    pub lu: Option<String>,
    pub port: u16,
}

impl ConnectTarget {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            lu: None,
            port: DEFAULT_HOST_PORT,
        }
    }

    #[must_use]
    pub fn with_lu(mut self, lu: impl Into<String>) -> Self {
        self.lu = Some(lu.into());
        self
    }

    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }
}

impl fmt::Display for ConnectTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.lu {
            Some(lu) => write!(f, "{}@{}:{}", lu, self.host, self.port),
            None => write!(f, "{}:{}", self.host, self.port),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_without_lu() {
        assert_eq!(ConnectTarget::new("host").to_string(), "host:23");
    }

    #[test]
    fn test_target_with_lu_and_port() {
        let target = ConnectTarget::new("mainframe.example.com")
            .with_lu("LU01")
            .with_port(992);
        assert_eq!(target.to_string(), "LU01@mainframe.example.com:992");
    }

    #[test]
    fn test_platform_presets() {
        let s = EmulatorConfig::for_platform(Platform::Unix, false);
        assert_eq!(s.executable, "s3270");
        assert_eq!(s.transport, TransportKind::Pipe);
        assert_eq!(s.base_args, vec!["-xrm", "s3270.unlockDelay: False"]);

        let x = EmulatorConfig::for_platform(Platform::Unix, true);
        assert_eq!(x.executable, "x3270");
        assert_eq!(x.base_args.last().map(String::as_str), Some("-script"));

        let ws = EmulatorConfig::for_platform(Platform::Windows, false);
        assert_eq!(ws.executable, "ws3270");
        assert_eq!(ws.transport, TransportKind::Socket);
        assert_eq!(ws.script_port, DEFAULT_SCRIPT_PORT);

        let wc = EmulatorConfig::for_platform(Platform::Windows, true);
        assert_eq!(wc.executable, "wc3270");
        assert!(wc.base_args.contains(&"wc3270.model: 2".to_string()));
    }

    #[test]
    fn test_parse_args_comments_and_lines() {
        let contents = "\
# example argfile
--accepthostname myhost.com
   # indented comment
--charset french

-trace
";
        assert_eq!(
            parse_args(contents),
            vec!["--accepthostname", "myhost.com", "--charset", "french", "-trace"]
        );
    }

    #[test]
    fn test_launch_args_order() {
        let path = std::env::temp_dir().join(format!("mf3270-args-{}.txt", std::process::id()));
        fs::write(&path, "# comment\n--cafile /tmp/ca.crt\n").unwrap();

        let config = EmulatorConfig::s3270()
            .with_extra_args(ExtraArgs::List(vec!["-trace".into()]))
            .with_extra_args(ExtraArgs::File(path.clone()));
        let args = config.launch_args().unwrap();
        assert_eq!(
            args,
            vec![
                "-xrm",
                "s3270.unlockDelay: False",
                "-trace",
                "--cafile",
                "/tmp/ca.crt"
            ]
        );

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_pacing_defaults_off() {
        let config = EmulatorConfig::s3270();
        assert!(config.post_command_wait.is_zero());
        assert!(config.post_write_wait.is_zero());

        let paced = config
            .with_post_command_wait(Duration::from_millis(500))
            .with_post_write_wait(Duration::from_millis(100));
        assert_eq!(paced.post_command_wait, Duration::from_millis(500));
        assert_eq!(paced.post_write_wait, Duration::from_millis(100));
    }

    #[test]
    fn test_missing_args_file() {
        let config = EmulatorConfig::s3270()
            .with_extra_args(ExtraArgs::File(PathBuf::from("/nonexistent/mf3270/args")));
        let err = config.launch_args().unwrap_err();
        assert!(matches!(err, Error::ArgsFile { .. }));
    }
}
