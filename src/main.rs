use clap::Parser;
use certwatch::cli::{Cli, Command, DevicesCommand};
use certwatch::config::Config;
use certwatch::error::{Error, Result};
use certwatch::ingest;
use certwatch::logging;
use certwatch::report;
use certwatch::store::diff::ChangeDetector;
use certwatch::store::Store;
use std::collections::BTreeSet;

fn run(cli: Cli, config: &Config) -> Result<()> {
    let mut store = Store::open(&config.db_path, config.busy_timeout)?;

    match cli.command {
        Command::Changes(args) => {
            let devices = match args.device {
                Some(devices) => devices.into_iter().collect::<BTreeSet<_>>(),
                None => store.watched_device_ids()?,
            };

            if devices.is_empty() {
                if args.json {
                    report::print(&[], true);
                } else {
                    println!("No devices to check. Add some with 'certwatch devices add' or pass --device.");
                }
                return Ok(());
            }

            let days = args.days.unwrap_or(config.window_days);
            let changed = ChangeDetector::new(&store).query(&devices, days)?;

            if !args.json {
                println!("Issuance history changes in the last {days} days:");
            }
            report::print(&changed, args.json);
        }
        Command::Import(args) => {
            let written = ingest::import_file(&mut store, &args.file)?;
            println!("Imported {written} snapshots from {}", args.file.display());
        }
        Command::History(args) => {
            let devices: BTreeSet<String> = args.device.into_iter().collect();
            let snapshots = store.history(&devices)?;
            if snapshots.is_empty() && !args.json {
                println!("No snapshots found for the given devices.");
            } else {
                report::print(&snapshots, args.json);
            }
        }
        Command::List(args) => {
            let snapshots = store.list_snapshots()?;
            if snapshots.is_empty() && !args.json {
                println!("No snapshots stored. Run 'certwatch import' to add some.");
            } else {
                report::print(&snapshots, args.json);
            }
        }
        Command::Devices(DevicesCommand::Add(args)) => {
            let metadata = args
                .metadata
                .as_deref()
                .map(serde_json::from_str::<serde_json::Value>)
                .transpose()
                .map_err(|e| Error::invalid(format!("metadata is not valid JSON: {e}")))?;

            let id = store.add_device(&args.device, &args.name, metadata.as_ref())?;
            println!("Watching {} (id {id})", args.device);
        }
        Command::Devices(DevicesCommand::List) => {
            print!("{}", report::table::render_devices(&store.list_devices()?));
        }
        Command::Devices(DevicesCommand::Remove(args)) => {
            store.remove_device(args.id)?;
            println!("Removed watchlist entry {}", args.id);
        }
    }

    Ok(())
}

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let config = match Config::load(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = run(cli, &config) {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
