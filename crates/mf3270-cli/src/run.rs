//! Subcommand handlers. Each one owns a full emulator lifecycle.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use mf3270_core::screen::DEFAULT_POLL_INTERVAL;
use mf3270_core::{ApiError, ConnectTarget, Error, Outcome, Session, Status};
use regex::Regex;
use serde::Serialize;
use tracing::{debug, warn};

use crate::args::{
    Cli, Commands, ConnectionArgs, ExecArgs, FillArgs, ReadArgs, ScreenshotArgs, WaitForArgs,
    EXAMPLES_TEXT,
};
use crate::config;

/// One executed action, as printed by `exec`.
#[derive(Debug, Serialize)]
pub struct ExecEntry {
    pub command: String,
    pub data: Vec<String>,
    pub status: Status,
    pub outcome: Outcome,
}

#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub connected: bool,
    #[serde(flatten)]
    pub status: Status,
}

#[derive(Debug, Serialize)]
pub struct WaitForResult {
    pub found: bool,
    pub matched_text: Option<String>,
    pub elapsed_ms: u64,
}

#[derive(Debug, Serialize)]
pub struct ScreenshotResult {
    pub path: PathBuf,
}

/// Run the parsed command line. Returns the process exit code.
pub fn run(cli: Cli) -> anyhow::Result<i32> {
    match cli.command {
        Commands::Exec(args) => exec(&args),
        Commands::Read(args) => read(&args),
        Commands::Screen(args) => screen(&args.connection),
        Commands::Status(args) => status(&args.connection),
        Commands::WaitFor(args) => wait_for(&args),
        Commands::Screenshot(args) => screenshot(&args),
        Commands::Fill(args) => fill(&args),
        Commands::Examples => {
            println!("{}", EXAMPLES_TEXT);
            Ok(0)
        }
    }
}

/// Launch and connect an emulator, run `work`, and always quit it again.
fn with_session<T>(
    conn: &ConnectionArgs,
    work: impl FnOnce(&mut Session) -> mf3270_core::Result<T>,
) -> anyhow::Result<T> {
    let emulator = config::emulator_config(conn)?;
    let target = config::connect_target(conn);
    debug!("Launching {} for {}", emulator.executable, target);

    let mut session = Session::new(emulator);
    let result = drive(&mut session, &target, conn.wait_field, work);
    if let Err(e) = session.terminate() {
        warn!("Failed to quit emulator: {}", e);
    }
    Ok(result.map_err(ApiError::from)?)
}

fn drive<T>(
    session: &mut Session,
    target: &ConnectTarget,
    wait_field: bool,
    work: impl FnOnce(&mut Session) -> mf3270_core::Result<T>,
) -> mf3270_core::Result<T> {
    session.connect(target)?;
    if wait_field {
        session.wait_for_field()?;
    }
    work(session)
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn exec(args: &ExecArgs) -> anyhow::Result<i32> {
    let entries = with_session(&args.connection, |session| {
        let mut entries = Vec::with_capacity(args.commands.len());
        for command in &args.commands {
            let reply = session.exec_command(command.as_str())?;
            let failed = !reply.outcome.is_success();
            entries.push(ExecEntry {
                data: reply.data_text(),
                command: reply.command,
                status: reply.status,
                outcome: reply.outcome,
            });
            // Later actions assume the earlier ones worked
            if failed {
                break;
            }
        }
        Ok(entries)
    })?;

    print_json(&entries)?;
    let all_ok = entries.iter().all(|entry| entry.outcome.is_success());
    Ok(if all_ok { 0 } else { 1 })
}

fn read(args: &ReadArgs) -> anyhow::Result<i32> {
    let text = with_session(&args.connection, |session| {
        session.read(args.row, args.col, args.length)
    })?;
    println!("{}", text);
    Ok(0)
}

fn screen(conn: &ConnectionArgs) -> anyhow::Result<i32> {
    let rows = with_session(conn, Session::screen_rows)?;
    for row in rows {
        println!("{}", row);
    }
    Ok(0)
}

fn status(conn: &ConnectionArgs) -> anyhow::Result<i32> {
    let report = with_session(conn, |session| {
        let connected = session.is_connected()?;
        Ok(StatusReport {
            connected,
            status: session.status().clone(),
        })
    })?;
    print_json(&report)?;
    Ok(0)
}

/// Literal patterns are escaped so both modes share one matcher.
fn compile_pattern(pattern: &str, regex: bool) -> anyhow::Result<Regex> {
    let source = if regex {
        pattern.to_string()
    } else {
        regex::escape(pattern)
    };
    Regex::new(&source).map_err(|e| {
        let err = Error::InvalidInput(format!("invalid regex {:?}: {}", pattern, e));
        anyhow::Error::from(ApiError::from(err))
    })
}

fn wait_for(args: &WaitForArgs) -> anyhow::Result<i32> {
    let matcher = compile_pattern(&args.pattern, args.regex)?;
    let timeout = Duration::from_millis(args.wait_timeout);

    let result = with_session(&args.connection, |session| {
        let start = Instant::now();
        let mut matched = None;
        let waited = session.wait_until(&args.pattern, timeout, DEFAULT_POLL_INTERVAL, |rows| {
            matched = rows
                .iter()
                .find_map(|row| matcher.find(row).map(|m| m.as_str().to_string()));
            matched.is_some()
        });
        let elapsed_ms = start.elapsed().as_millis() as u64;
        match waited {
            Ok(_) => Ok(WaitForResult {
                found: true,
                matched_text: matched,
                elapsed_ms,
            }),
            Err(Error::WaitTimeout { .. }) => Ok(WaitForResult {
                found: false,
                matched_text: None,
                elapsed_ms,
            }),
            Err(e) => Err(e),
        }
    })?;

    print_json(&result)?;
    Ok(if result.found { 0 } else { 1 })
}

/// `screenshot_<unix millis>.html`
pub fn screenshot_file_name(now: DateTime<Utc>) -> String {
    format!("screenshot_{}.html", now.timestamp_millis())
}

fn screenshot(args: &ScreenshotArgs) -> anyhow::Result<i32> {
    let path = config::screenshot_dir(args.folder.as_deref()).join(screenshot_file_name(Utc::now()));
    with_session(&args.connection, |session| session.save_screen(&path))?;
    print_json(&ScreenshotResult { path })?;
    Ok(0)
}

fn fill(args: &FillArgs) -> anyhow::Result<i32> {
    with_session(&args.connection, |session| {
        session.fill_field(args.row, args.col, &args.text, args.length)
    })?;
    Ok(0)
}
