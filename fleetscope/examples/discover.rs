//! Discover a fleet and print its topology
//!
//! Loads an inventory JSON file, collects LLDP/CDP neighbors from every
//! target over SSH and renders the resulting graph.
//!
//! # Prerequisites
//!
//! - An inventory file, either a list of hosts or `{"hosts": [...]}`:
//!   ```json
//!   [{"host": "leaf01.lab", "os": "arista_eos"}, {"host": "srv01", "os": "linux"}]
//!   ```
//! - SSH access to the targets (key or password)
//!
//! # Usage
//!
//! Using the system `ssh` binary and your ssh config:
//! ```bash
//! cargo run --example discover -- --inventory fleet.json --openssh
//! ```
//!
//! Using the built-in client with a key, edge-list view:
//! ```bash
//! cargo run --example discover -- --inventory fleet.json --user netops --key ~/.ssh/id_ed25519 --view edges
//! ```

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use fleetscope::{
    FleetEngine, Inventory, OpenSshExecutor, RenderMode, RenderOptions, SshExecutor,
    TopologySession,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging (set RUST_LOG=debug for per-attempt detail)
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let Some(path) = &args.inventory else {
        eprintln!("Error: --inventory is required");
        std::process::exit(1);
    };
    let inventory = Inventory::from_json(&std::fs::read_to_string(path)?)?;
    println!("Loaded {} hosts from {}", inventory.len(), path.display());

    let builder = FleetEngine::builder()
        .concurrency(args.concurrency)
        .default_timeout(Duration::from_secs(args.timeout));
    let engine = if args.openssh {
        builder.executor(OpenSshExecutor::new()).build()?
    } else {
        let mut ssh = SshExecutor::builder().username(&args.user);
        if let Some(password) = &args.password {
            ssh = ssh.password(password);
        } else if let Some(key) = &args.key {
            ssh = ssh.private_key(key);
        } else {
            eprintln!("Error: Must provide --password, --key or --openssh");
            std::process::exit(1);
        }
        builder.executor(ssh.build()?).build()?
    };

    let mut session = TopologySession::new(engine, Some(inventory));

    // Ctrl-C stops outstanding hosts but still renders what finished
    let cancel = session.cancel_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    });

    let snapshot = session.trigger_discovery(&args.targets).await?;

    let report = snapshot.outcome.failure_report();
    if !report.is_empty() {
        println!("{}", report);
        println!("{}", "-".repeat(50));
    }
    for warning in &snapshot.graph.warnings {
        println!("warning: {}", warning);
    }

    let opts = RenderOptions {
        focused: args.focus.clone(),
        width: args.width,
        rich_glyphs: args.unicode,
    };
    print!("{}", snapshot.render(args.view, &opts));

    Ok(())
}

/// Simple argument parser (avoiding external dependencies)
struct Args {
    inventory: Option<PathBuf>,
    targets: Vec<String>,
    user: String,
    password: Option<String>,
    key: Option<PathBuf>,
    openssh: bool,
    concurrency: usize,
    timeout: u64,
    view: RenderMode,
    focus: Option<String>,
    width: usize,
    unicode: bool,
}

impl Args {
    fn parse() -> Self {
        let args: Vec<String> = env::args().collect();
        let mut parsed = Self {
            inventory: None,
            targets: Vec::new(),
            user: env::var("USER").unwrap_or_else(|_| "root".to_string()),
            password: None,
            key: None,
            openssh: false,
            concurrency: fleetscope::discovery::DEFAULT_CONCURRENCY,
            timeout: 10,
            view: RenderMode::Layered,
            focus: None,
            width: 0,
            unicode: false,
        };

        let mut i = 1;
        while i < args.len() {
            let value = args.get(i + 1).cloned();
            match args[i].as_str() {
                "--inventory" | "-i" => {
                    parsed.inventory = value.map(PathBuf::from);
                    i += 1;
                }
                "--target" | "-t" => {
                    parsed.targets.extend(value);
                    i += 1;
                }
                "--user" | "-u" => {
                    if let Some(user) = value {
                        parsed.user = user;
                    }
                    i += 1;
                }
                "--password" | "-P" => {
                    parsed.password = value;
                    i += 1;
                }
                "--key" | "-k" => {
                    parsed.key = value.map(PathBuf::from);
                    i += 1;
                }
                "--openssh" => parsed.openssh = true,
                "--concurrency" | "-c" => {
                    parsed.concurrency = value.and_then(|v| v.parse().ok()).unwrap_or(6);
                    i += 1;
                }
                "--timeout" => {
                    parsed.timeout = value.and_then(|v| v.parse().ok()).unwrap_or(10);
                    i += 1;
                }
                "--view" => {
                    parsed.view = match value.as_deref() {
                        Some("edges") => RenderMode::Edges,
                        Some("flat") => RenderMode::Flat,
                        _ => RenderMode::Layered,
                    };
                    i += 1;
                }
                "--focus" => {
                    parsed.focus = value;
                    i += 1;
                }
                "--width" => {
                    parsed.width = value.and_then(|v| v.parse().ok()).unwrap_or(0);
                    i += 1;
                }
                "--unicode" => parsed.unicode = true,
                "--help" => {
                    Self::print_help();
                    std::process::exit(0);
                }
                other => {
                    eprintln!("Unknown argument: {}", other);
                }
            }
            i += 1;
        }
        parsed
    }

    fn print_help() {
        println!(
            r#"fleetscope discover example

USAGE:
    cargo run --example discover -- [OPTIONS]

OPTIONS:
    -i, --inventory <PATH>     Inventory JSON file (required)
    -t, --target <HOST>        Host to collect, repeatable [default: whole inventory]
    -u, --user <USER>          Username [default: $USER]
    -P, --password <PASS>      Password for authentication
    -k, --key <PATH>           Path to SSH private key
    --openssh                  Use the system ssh binary instead
    -c, --concurrency <N>      Hosts collected at once [default: 6]
    --timeout <SECS>           Per-command timeout [default: 10]
    --view <layered|edges|flat>
    --focus <HOST>             Highlight one node
    --width <COLS>             Truncate lines to this width
    --unicode                  Use Unicode glyphs
    --help                     Print this help message
"#
        );
    }
}
