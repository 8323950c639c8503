//! `cold` — operator CLI for the cold-storage subsystem (spec §6).
//!
//! A thin client over the core's HTTP API: every subcommand here is a
//! `reqwest` call plus some formatting, mirroring the original CLI's
//! `click` commands (examples/original_source/cernopendata/cold_storage/cli.py).

mod client;
mod output;

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tabled::Table;

use client::Client;
use output::{FileRow, Location, LocationRow, OperationReport, RecordReport};

#[derive(Parser)]
#[command(name = "cold", about = "Manage the cold storage interface", version)]
struct Cli {
    /// Base URL of the cold-storage core's HTTP API.
    #[arg(long, env = "COLD_API_URL", default_value = "http://127.0.0.1:8080", global = true)]
    api_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Move one or more records to cold storage.
    Archive {
        #[arg(value_name = "RECID", required = true)]
        records: Vec<String>,
        /// Attach metadata for an existing destination copy without transferring.
        #[arg(long)]
        register: bool,
        /// Positive caps the number of transfers issued; negative leaves the last N files untouched.
        #[arg(long)]
        limit: Option<i64>,
        /// Skip the existence check before dispatching.
        #[arg(long)]
        force: bool,
        /// Do not issue transfers.
        #[arg(long)]
        dry: bool,
    },
    /// Move one or more records from cold storage back to hot.
    Stage {
        #[arg(value_name = "RECID", required = true)]
        records: Vec<String>,
        #[arg(long)]
        register: bool,
        #[arg(long)]
        limit: Option<i64>,
        #[arg(long)]
        force: bool,
        #[arg(long)]
        dry: bool,
    },
    /// Delete the hot copy of files that already have a cold copy.
    ClearHot {
        #[arg(value_name = "RECID", required = true)]
        records: Vec<String>,
        #[arg(long)]
        limit: Option<i64>,
        /// Force the deletion even if the hot_deleted tag is already set.
        #[arg(long)]
        force: bool,
        #[arg(long)]
        dry: bool,
    },
    /// Print the hot/cold copies of an entry.
    List {
        #[arg(value_name = "RECID", required = true)]
        records: Vec<String>,
        /// Check existence, size and checksum of every copy.
        #[arg(short, long)]
        verify: bool,
    },
    /// Run one cycle of the transfer poller.
    ProcessTransfers,
    /// Run one cycle of the request driver.
    ProcessRequests,
    /// Manage hot/cold storage locations.
    Location {
        #[command(subcommand)]
        command: LocationCommand,
    },
}

#[derive(Subcommand)]
enum LocationCommand {
    /// Register a new hot/cold location.
    Add {
        #[arg(long = "cold-path")]
        cold_path: String,
        #[arg(long = "hot-path")]
        hot_path: String,
        #[arg(long = "manager-class")]
        manager_class: String,
    },
    /// List known locations.
    List,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let client = Client::new(cli.api_url);

    let result = match cli.command {
        Command::Archive {
            records,
            register,
            limit,
            force,
            dry,
        } => run_operation(&client, "archive", &records, register, limit, force, dry).await,
        Command::Stage {
            records,
            register,
            limit,
            force,
            dry,
        } => run_operation(&client, "stage", &records, register, limit, force, dry).await,
        Command::ClearHot {
            records,
            limit,
            force,
            dry,
        } => run_operation(&client, "clear-hot", &records, false, limit, force, dry).await,
        Command::List { records, verify } => list(&client, &records, verify).await,
        Command::ProcessTransfers => client.post_no_body("/process-transfers").await.map(|()| true),
        Command::ProcessRequests => client.post_no_body("/process-requests").await.map(|()| true),
        Command::Location { command } => location(&client, command).await,
    };

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

/// Runs `archive`/`stage`/`clear-hot` over one or more records, printing a
/// per-record progress line (grounded on the original `_doOperation`'s
/// `click.secho` progress lines). Returns `Ok(false)` if any record failed
/// to resolve or any operation reported a failure, so the CLI exits non-zero.
async fn run_operation(
    client: &Client,
    action: &str,
    records: &[String],
    register: bool,
    limit: Option<i64>,
    force: bool,
    dry: bool,
) -> anyhow::Result<bool> {
    let body = Client::operation_body(register, limit, force, dry);
    let total = records.len();
    let mut transfers_so_far = 0usize;
    let mut all_ok = true;

    for (i, recid) in records.iter().enumerate() {
        let path = format!("/records/{}/{action}", urlencoding::encode(recid));
        match client.post::<_, OperationReport>(&path, &body).await {
            Ok(report) => {
                transfers_so_far += report.created + report.registered;
                if report.has_failures() {
                    all_ok = false;
                }
                println!(
                    "Record {recid} done. Entry {} out of {total} done. {transfers_so_far} issued so far ({})",
                    i + 1,
                    report.summary(),
                );
            }
            Err(e) => {
                eprintln!("The entry {recid} could not be processed: {e:#}");
                all_ok = false;
            }
        }
    }

    Ok(all_ok)
}

async fn list(client: &Client, records: &[String], verify: bool) -> anyhow::Result<bool> {
    let mut total_files = 0usize;
    let mut total_size = 0i64;
    let mut total_hot = 0usize;
    let mut total_hot_size = 0i64;
    let mut total_cold = 0usize;
    let mut total_cold_size = 0i64;
    let mut failed = Vec::new();

    for recid in records {
        let path = format!("/records/{}?verify={verify}", urlencoding::encode(recid));
        let report: RecordReport = match client.get(&path).await {
            Ok(report) => report,
            Err(e) => {
                eprintln!("The record '{recid}' does not exist: {e:#}");
                failed.push(recid.clone());
                continue;
            }
        };

        println!("The files referenced in '{recid}' are:");
        let rows: Vec<FileRow> = report.files.iter().map(FileRow::from).collect();
        println!("{}", Table::new(rows));
        println!(
            "availability: {}  hot copies: {}  cold copies: {}",
            report.availability, report.hot_copies, report.cold_copies
        );

        total_files += report.files.len();
        total_hot += report.hot_copies;
        total_cold += report.cold_copies;
        for file in &report.files {
            total_size += file.size;
            if !file.hot_deleted {
                total_hot_size += file.size;
            }
            if file.uri_cold.is_some() {
                total_cold_size += file.size;
            }
            if file.verify_error.is_some() {
                failed.push(recid.clone());
            }
        }
    }

    println!(
        "Summary: {total_files} files ({}), with {total_hot} hot copies ({}) and {total_cold} cold copies ({})",
        output::file_size(total_size),
        output::file_size(total_hot_size),
        output::file_size(total_cold_size),
    );

    if !failed.is_empty() {
        eprintln!("The following records have issues: {failed:?}");
        return Ok(false);
    }
    Ok(true)
}

async fn location(client: &Client, command: LocationCommand) -> anyhow::Result<bool> {
    match command {
        LocationCommand::Add {
            cold_path,
            hot_path,
            manager_class,
        } => {
            let body = serde_json::json!({
                "hot_path": hot_path,
                "cold_path": cold_path,
                "manager_class": manager_class,
            });
            let location: Location = client.post("/locations", &body).await?;
            println!("Location added with ID {}", location.id);
        }
        LocationCommand::List => {
            let locations: Vec<Location> = client.get("/locations").await?;
            if locations.is_empty() {
                println!("No locations found.");
            } else {
                let rows: Vec<LocationRow> = locations.iter().map(LocationRow::from).collect();
                println!("{}", Table::new(rows));
            }
        }
    }
    Ok(true)
}
