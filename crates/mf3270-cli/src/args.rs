//! CLI argument parsing with clap derive macros.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Script IBM 3270 sessions through an x3270-family emulator.
///
/// Every command launches its own emulator, connects to the host, does one
/// thing, and quits the emulator again. Results are printed as JSON unless
/// noted otherwise.
#[derive(Debug, Parser)]
#[command(name = "mf3270", version)]
pub struct Cli {
    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Execute raw emulator actions in order
    #[command(after_help = "\
Examples:
  mf3270 exec -H host Enter                     # Press Enter
  mf3270 exec -H host 'MoveCursor(4, 9)' 'String(\"USER01\")' Enter
  mf3270 exec -H host --wait-field 'PF(3)'      # Wait for an input field first")]
    Exec(ExecArgs),

    /// Read text at a 1-based row and column
    #[command(after_help = "\
Examples:
  mf3270 read -H host 8 10 15           # 15 characters at row 8, column 10")]
    Read(ReadArgs),

    /// Print the whole screen, one row per line
    Screen(ScreenArgs),

    /// Print the emulator status line as JSON
    Status(StatusArgs),

    /// Wait for text to appear on screen
    #[command(after_help = "\
Examples:
  mf3270 wait-for -H host 'READY'              # Wait for literal text
  mf3270 wait-for -H host -r 'IKJ\\d+I'         # Wait for regex pattern
  mf3270 wait-for -H host -t 10000 'LOGON'     # Wait up to 10 seconds
  mf3270 wait-for -H host --timeout 5 --wait-timeout 60000 READY")]
    WaitFor(WaitForArgs),

    /// Save the screen as an HTML file
    Screenshot(ScreenshotArgs),

    /// Clear a field and type text into it
    #[command(after_help = "\
Examples:
  mf3270 fill -H host 10 20 8 USER01    # Field at row 10, column 20, 8 wide")]
    Fill(FillArgs),

    /// Show an end-to-end usage example
    Examples,
}

/// How to launch the emulator and which host to reach.
#[derive(Debug, Clone, clap::Args)]
pub struct ConnectionArgs {
    /// Host name or address of the mainframe
    #[arg(short = 'H', long)]
    pub host: String,

    /// Logical unit name
    #[arg(long)]
    pub lu: Option<String>,

    /// Telnet port of the host
    #[arg(short, long, default_value_t = 23)]
    pub port: u16,

    /// Use the visible emulator (x3270 / wc3270) instead of the headless one
    #[arg(long)]
    pub visible: bool,

    /// Emulator executable to run instead of the platform default
    #[arg(long, value_name = "PATH")]
    pub executable: Option<String>,

    /// Script port for socket-mode emulators
    #[arg(long, value_name = "PORT")]
    pub script_port: Option<u16>,

    /// Timeout in seconds for waiting on an input field
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// File of extra emulator arguments ('#' starts a comment line)
    #[arg(long, value_name = "FILE")]
    pub args_file: Option<PathBuf>,

    /// Extra emulator argument (repeatable)
    #[arg(long = "arg", value_name = "ARG", allow_hyphen_values = true)]
    pub extra: Vec<String>,

    /// Wait for an unlocked input field after connecting
    #[arg(long)]
    pub wait_field: bool,
}

#[derive(Debug, clap::Args)]
pub struct ExecArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// Actions to execute, e.g. Enter, 'PF(3)', 'String("abc")'
    #[arg(required = true, num_args = 1..)]
    pub commands: Vec<String>,
}

#[derive(Debug, clap::Args)]
pub struct ReadArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// Row (1-based)
    pub row: u16,

    /// Column (1-based)
    pub col: u16,

    /// Number of characters
    pub length: usize,
}

#[derive(Debug, clap::Args)]
pub struct ScreenArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,
}

#[derive(Debug, clap::Args)]
pub struct StatusArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,
}

#[derive(Debug, clap::Args)]
pub struct WaitForArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// Text or regex pattern to wait for
    pub pattern: String,

    /// Timeout in milliseconds
    #[arg(short = 't', long = "wait-timeout", value_name = "MS", default_value_t = 5000)]
    pub wait_timeout: u64,

    /// Treat pattern as regex
    #[arg(short, long)]
    pub regex: bool,
}

#[derive(Debug, clap::Args)]
pub struct ScreenshotArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// Folder for the HTML file [default: $MF3270_SCREENSHOT_DIR or current dir]
    #[arg(long, value_name = "DIR")]
    pub folder: Option<PathBuf>,
}

#[derive(Debug, clap::Args)]
pub struct FillArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// Row (1-based)
    pub row: u16,

    /// Column (1-based)
    pub col: u16,

    /// Field length
    pub length: usize,

    /// Text to type
    pub text: String,
}

/// End-to-end example text for the `examples` command.
pub const EXAMPLES_TEXT: &str = r#"End-to-end example: log on to TSO

Each command below starts its own emulator and quits it when done, so every
step reconnects. Hosts keep the session state for a given LU; pass --lu to
land on the same terminal each time.

# 1. Check the host answers and see the screen geometry
mf3270 status -H mainframe.example.com --lu LU01

# 2. Wait for the logon screen
mf3270 wait-for -H mainframe.example.com --lu LU01 "ENTER USERID"

# 3. Type the user id into the field at row 10, column 20 and press Enter
mf3270 exec -H mainframe.example.com --lu LU01 --wait-field \
  'MoveCursor(9, 19)' 'DeleteField' 'String("USER01")' Enter

# 4. Read the message line
mf3270 read -H mainframe.example.com --lu LU01 24 1 80

# 5. Keep an HTML copy of the screen
mf3270 screenshot -H mainframe.example.com --lu LU01 --folder ./shots

Extra emulator flags can go in an argument file:

# ~/.mf3270/args
--accepthostname myhost.com
# this is a comment
--charset french
"#;
