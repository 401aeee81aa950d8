//! Configuration transaction example
//!
//! Stages a candidate file, loads it as a merge or replace, prints the
//! normalized diff and commits it (or discards it with `--dry-run`).
//!
//! # Usage
//!
//! ```bash
//! # Merge a snippet and commit it with a comment
//! cargo run --example transaction -- --host edge1 --user admin --password secret \
//!     --file ntp.conf --merge --comment "add ntp servers"
//!
//! # Show what a full replace would change, then discard
//! cargo run --example transaction -- --host edge1 --user admin --key ~/.ssh/id_ed25519 \
//!     --file edge1.conf --dry-run
//! ```

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use exaros::{CandidateSource, CommitOptions, Driver, DriverBuilder, HostKeyVerification};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    println!("=== Exaros Transaction Example ===\n");
    println!("Connecting to {}:{}...", args.host, args.port);

    let mut builder = DriverBuilder::new(&args.host)
        .port(args.port)
        .username(&args.user)
        .timeout(Duration::from_secs(args.timeout))
        .host_key_verification(HostKeyVerification::AcceptNew);

    if let Some(password) = &args.password {
        builder = builder.password(password);
    } else if let Some(key_path) = &args.key {
        builder = builder.private_key(key_path);
    } else {
        eprintln!("Error: Must provide either --password or --key");
        std::process::exit(1);
    }

    let Some(file) = args.file else {
        eprintln!("Error: Must provide --file");
        std::process::exit(1);
    };

    let mut driver = builder.build()?;
    driver.open().await?;
    println!("Connected!\n");

    let source = CandidateSource::file(&file);
    if args.merge {
        driver.load_merge(source).await?;
    } else {
        driver.load_replace(source).await?;
    }
    println!("Loaded {} ({})", file.display(), driver.transaction_state());

    let diff = driver.compare().await?;
    if diff.is_noop() {
        println!("No changes.");
        driver.discard().await?;
    } else {
        println!("--- diff ---\n{}\n------------", diff.canonical());
        if args.dry_run {
            driver.discard().await?;
            println!("Dry run: candidate discarded.");
        } else {
            let mut options = CommitOptions::new();
            if let Some(comment) = &args.comment {
                options = options.comment(comment);
            }
            let response = driver.commit(&options).await?;
            println!("{}", response.result);
        }
    }

    println!("\nClosing connection...");
    driver.close().await?;
    println!("Done!");

    Ok(())
}

struct Args {
    host: String,
    port: u16,
    user: String,
    password: Option<String>,
    key: Option<PathBuf>,
    timeout: u64,
    file: Option<PathBuf>,
    merge: bool,
    dry_run: bool,
    comment: Option<String>,
}

impl Args {
    fn parse() -> Self {
        let args: Vec<String> = env::args().collect();
        let mut parsed = Args {
            host: "localhost".to_string(),
            port: 22,
            user: env::var("USER").unwrap_or_else(|_| "admin".to_string()),
            password: None,
            key: None,
            timeout: 60,
            file: None,
            merge: false,
            dry_run: false,
            comment: None,
        };

        let mut i = 1;
        while i < args.len() {
            let value = args.get(i + 1).cloned();
            match args[i].as_str() {
                "--host" | "-h" => parsed.host = value.unwrap_or(parsed.host),
                "--port" | "-p" => {
                    parsed.port = value.and_then(|v| v.parse().ok()).unwrap_or(22)
                }
                "--user" | "-u" => parsed.user = value.unwrap_or(parsed.user),
                "--password" | "-P" => parsed.password = value,
                "--key" | "-k" => parsed.key = value.map(PathBuf::from),
                "--timeout" | "-t" => {
                    parsed.timeout = value.and_then(|v| v.parse().ok()).unwrap_or(60)
                }
                "--file" | "-f" => parsed.file = value.map(PathBuf::from),
                "--comment" | "-c" => parsed.comment = value,
                "--merge" => {
                    parsed.merge = true;
                    i += 1;
                    continue;
                }
                "--dry-run" => {
                    parsed.dry_run = true;
                    i += 1;
                    continue;
                }
                "--help" => {
                    print_help();
                    std::process::exit(0);
                }
                other => {
                    eprintln!("Unknown argument: {other}");
                    print_help();
                    std::process::exit(1);
                }
            }
            i += 2;
        }

        parsed
    }
}

fn print_help() {
    println!("Usage: transaction [OPTIONS]");
    println!();
    println!("Options:");
    println!("  -h, --host <HOST>          Target host (default: localhost)");
    println!("  -p, --port <PORT>          SSH port (default: 22)");
    println!("  -u, --user <USER>          Username (default: $USER)");
    println!("  -P, --password <PASSWORD>  Password for authentication");
    println!("  -k, --key <PATH>           Path to private key file");
    println!("  -t, --timeout <SECS>       Command timeout in seconds (default: 60)");
    println!("  -f, --file <PATH>          Candidate configuration file");
    println!("  -c, --comment <TEXT>       Commit comment");
    println!("      --merge                Merge instead of replace");
    println!("      --dry-run              Show the diff and discard");
    println!("      --help                 Show this help message");
}
