//! Parse a captured discovery command output offline
//!
//! Handy for checking a device's output against a parser without SSH.
//!
//! # Usage
//!
//! ```bash
//! ssh leaf01 'show lldp neighbors detail | json' > leaf01.json
//! cargo run --example parse_capture -- eos_lldp_json leaf01 leaf01.json
//! ```

use std::env;

use fleetscope::ParserRegistry;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args: Vec<String> = env::args().skip(1).collect();
    let registry = ParserRegistry::with_builtin();
    let [parser_id, device, path] = args.as_slice() else {
        eprintln!("usage: parse_capture <parser-id> <device> <file>");
        eprintln!("parsers: {}", registry.ids().join(", "));
        std::process::exit(1);
    };

    let Some(parser) = registry.get(parser_id) else {
        eprintln!("Unknown parser '{}'", parser_id);
        std::process::exit(1);
    };

    let raw = std::fs::read_to_string(path)?;
    let result = parser.parse(device, &raw)?;

    println!("{} neighbors of {}:", result.entries.len(), result.local_device_key);
    for entry in &result.entries {
        println!(
            "  {:<16} -> {} {} {}",
            entry.local_port,
            entry.remote_name,
            entry.remote_port,
            entry.remote_mgmt_ips.join(",")
        );
    }
    if !result.identity_hint_ips.is_empty() {
        println!("identity hints: {}", result.identity_hint_ips.join(", "));
    }
    for warning in &result.warnings {
        println!("warning: {}", warning);
    }
    Ok(())
}
