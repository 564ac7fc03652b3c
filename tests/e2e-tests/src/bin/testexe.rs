use clap::{Args as ClapArgs, Parser, Subcommand};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, info};

/// Test executable for onionsweep E2E testing
///
/// Plays either the onion-routing daemon or the measurement binary.
#[derive(Parser, Debug)]
#[command(name = "testexe")]
#[command(about = "Fake daemon and measurement binary for sweep testing", long_about = None)]
struct Args {
    #[command(subcommand)]
    role: Role,
}

#[derive(Subcommand, Debug)]
enum Role {
    /// Fake onion-routing daemon
    Tor(TorArgs),
    /// Fake measurement binary
    Anonycast(AnonycastArgs),
}

#[derive(ClapArgs, Debug)]
struct TorArgs {
    /// Daemon configuration file
    #[arg(short = 'f', value_name = "TORRC")]
    torrc: PathBuf,

    /// Milliseconds between bootstrap progress lines
    #[arg(long, default_value = "0")]
    step_ms: u64,

    /// Exit with this code before reaching 100%
    #[arg(long)]
    exit_early: Option<i32>,

    /// Exit early on this many launches, then bootstrap (needs --state-file)
    #[arg(long, default_value = "0")]
    exit_early_first: u32,

    /// Counts daemon launches across invocations
    #[arg(long)]
    state_file: Option<PathBuf>,

    /// Stall at 5% forever
    #[arg(long)]
    never_ready: bool,

    /// Do not write hostname files
    #[arg(long)]
    skip_hostname: bool,

    /// Record `<pid>` files holding the data directory here
    #[arg(long)]
    pid_dir: Option<PathBuf>,
}

#[derive(ClapArgs, Debug)]
struct AnonycastArgs {
    /// Exit code of the benchmark role
    #[arg(long, default_value = "0")]
    exit_code: i32,

    /// Milliseconds the benchmark role runs before exiting
    #[arg(long, default_value = "0")]
    sleep_ms: u64,

    /// Fail this many benchmark runs before succeeding (needs --state-file)
    #[arg(long, default_value = "0")]
    fail_first: u32,

    /// Counts benchmark runs across invocations
    #[arg(long)]
    state_file: Option<PathBuf>,

    /// Role arguments: `deaddrop ...` or `benchmark <kind> ...`
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    args: Vec<String>,
}

#[tokio::main]
async fn main() {
    // Logs go to stderr; stdout carries the fake daemon's progress lines.
    tracing_subscriber::fmt()
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    info!("Starting testexe with args: {:?}", args);

    let code = match args.role {
        Role::Tor(tor) => run_tor(tor).await,
        Role::Anonycast(anonycast) => run_anonycast(anonycast).await,
    };
    std::process::exit(code);
}

async fn run_tor(args: TorArgs) -> i32 {
    let torrc = match fs::read_to_string(&args.torrc) {
        Ok(content) => content,
        Err(e) => {
            error!("Failed to read {}: {}", args.torrc.display(), e);
            return 1;
        }
    };

    if let Some(pid_dir) = &args.pid_dir {
        let data_dir = args.torrc.parent().unwrap_or(Path::new(""));
        let record = pid_dir.join(std::process::id().to_string());
        if let Err(e) = fs::write(&record, data_dir.to_string_lossy().as_bytes()) {
            error!("Failed to record pid in {}: {}", record.display(), e);
            return 1;
        }
    }

    let step = Duration::from_millis(args.step_ms);
    println!("Bootstrapped 0% (starting): Starting");

    if !args.skip_hostname {
        for dir in torrc.lines().filter_map(|l| l.strip_prefix("HiddenServiceDir ")) {
            if let Err(e) = write_hostname(Path::new(dir.trim())) {
                error!("Failed to publish {}: {}", dir, e);
                return 1;
            }
        }
    }

    let mut exit_early = args.exit_early;
    if let Some(state_file) = &args.state_file {
        match record_run(state_file) {
            Ok(runs) if runs <= u64::from(args.exit_early_first) => exit_early = Some(1),
            Ok(_) => {}
            Err(e) => {
                error!("Failed to update state file: {}", e);
                return 1;
            }
        }
    }

    if let Some(code) = exit_early {
        println!("Bootstrapped 10% (conn_done): Connected to a relay");
        println!("[err] Could not bind to 127.0.0.1: Address already in use");
        return code;
    }

    sleep(step).await;
    println!("Bootstrapped 5% (conn): Connecting to a relay");
    if args.never_ready {
        idle().await;
    }

    sleep(step).await;
    println!("Bootstrapped 50% (loading_descriptors): Loading relay descriptors");
    sleep(step).await;
    println!("Bootstrapped 100% (done): Done");
    idle().await
}

/// Publishes a fake onion address derived from the service directory name.
fn write_hostname(dir: &Path) -> std::io::Result<()> {
    fs::create_dir_all(dir)?;
    let name = dir
        .file_name()
        .map(|n| n.to_string_lossy().replace('_', ""))
        .unwrap_or_default();
    fs::write(dir.join("hostname"), format!("{}fake.onion\n", name))
}

async fn run_anonycast(args: AnonycastArgs) -> i32 {
    match args.args.first().map(String::as_str) {
        Some("deaddrop") => {
            info!("Deaddrop listening");
            idle().await
        }
        Some("benchmark") => run_benchmark(&args).await,
        other => {
            error!("Unknown role: {:?}", other);
            2
        }
    }
}

async fn run_benchmark(args: &AnonycastArgs) -> i32 {
    sleep(Duration::from_millis(args.sleep_ms)).await;

    if let Some(state_file) = &args.state_file {
        let runs = match record_run(state_file) {
            Ok(runs) => runs,
            Err(e) => {
                error!("Failed to update state file: {}", e);
                return 1;
            }
        };
        if runs <= u64::from(args.fail_first) {
            error!("Failing run {} of {}", runs, args.fail_first);
            return 1;
        }
    }

    if args.exit_code != 0 {
        return args.exit_code;
    }

    let Some(output) = flag_value(&args.args, "--output") else {
        error!("Missing --output");
        return 2;
    };
    let result = serde_json::json!({ "args": args.args });
    if let Err(e) = fs::write(output, result.to_string()) {
        error!("Failed to write {}: {}", output, e);
        return 1;
    }
    0
}

/// Append one byte per run; the file length is the run count. A kill
/// mid-update loses at most the current run, never earlier ones.
fn record_run(state_file: &Path) -> std::io::Result<u64> {
    let mut file = OpenOptions::new().create(true).append(true).open(state_file)?;
    file.write_all(b".")?;
    Ok(fs::metadata(state_file)?.len())
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}

async fn idle() -> ! {
    loop {
        sleep(Duration::from_secs(3600)).await;
    }
}
