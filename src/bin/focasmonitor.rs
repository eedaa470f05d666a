/// FOCAS Monitor - Multi-Machine FANUC CNC Monitoring
///
/// Polls a fleet of CNC controllers and renders periodic snapshots to the
/// console, JSON, or CSV. Runs against the simulated adapter until the
/// vendor FOCAS library is linked in as a `CncAdapter` implementation.
use std::process::ExitCode;

use focas_monitor::config::{usage, version};
use focas_monitor::{
    load_machines, render, CliRequest, Config, ConnectionPool, MachineSpec, Monitor,
    OutputFormat, SimProfile, SimulatedCnc,
};

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match Config::parse(std::env::args().skip(1)) {
        CliRequest::Help => {
            println!("{}", usage("focasmonitor"));
            return ExitCode::SUCCESS;
        }
        CliRequest::Version => {
            println!("{}", version());
            return ExitCode::SUCCESS;
        }
        CliRequest::Run(config) => config,
    };

    if config.verbose {
        println!("FOCAS Monitor starting...");
        println!("Configuration:");
        println!("  Info Type: {}", config.info_kind.as_str());
        println!("  Output Format: {}", config.output_format.as_str());
        println!(
            "  Monitor Mode: {}",
            if config.monitor_mode { "enabled" } else { "disabled" }
        );
        if config.monitor_mode {
            println!("  Monitor Interval: {}s", config.monitor_interval.as_secs());
        }
        println!("  Connection Timeout: {}s\n", config.connect_timeout.as_secs());
    }

    // Assemble the machine list: file first, then --add entries.
    let mut specs: Vec<MachineSpec> = Vec::new();
    if let Some(file) = &config.machine_file {
        match load_machines(file) {
            Ok(loaded) => {
                println!("Loaded {} machines from '{}'", loaded.len(), file);
                specs.extend(loaded);
            }
            Err(err) => {
                eprintln!("Error: {}", err);
                return ExitCode::FAILURE;
            }
        }
    }
    specs.extend(config.adds.iter().cloned());

    if specs.is_empty() {
        eprintln!("Error: No machines specified. Use --machines=<file> or --add=<name,ip,port>\n");
        println!("{}", usage("focasmonitor"));
        return ExitCode::FAILURE;
    }

    let adapter = SimulatedCnc::new();
    for (i, spec) in specs.iter().enumerate() {
        adapter
            .register(
                &spec.ip,
                spec.port,
                SimProfile {
                    program_number: 1000 + i as i32,
                    ..SimProfile::default()
                },
            )
            .await;
    }

    let mut pool = ConnectionPool::new(adapter, config.pool_config());
    for spec in &specs {
        if let Err(err) = pool.add_machine(&spec.name, &spec.ip, spec.port) {
            eprintln!(
                "Warning: Failed to add machine {} ({}:{}): {}",
                spec.name, spec.ip, spec.port, err
            );
        }
    }

    if config.verbose {
        println!("Total machines configured: {}\n", pool.machine_count());
    }
    if config.show_status {
        println!("{}", pool.status_report());
    }

    println!("Connecting to {} machines...", pool.machine_count());
    let summary = pool.connect_all().await;
    if summary.all_connected() {
        println!("All {} machines connected successfully", summary.successful);
    } else if summary.successful > 0 {
        println!(
            "WARNING: Partial success: {}/{} machines connected ({} failed)",
            summary.successful,
            pool.machine_count(),
            summary.failed
        );
        println!("  Monitoring will continue with available machines");
        println!("  Failed connections will be retried automatically");
    } else {
        println!(
            "All connection attempts failed ({} machines unreachable)",
            summary.failed
        );
        println!("  Check network connectivity and machine configurations");
        println!("  Monitoring will continue and retry connections automatically");
    }

    let mut monitor = Monitor::new(pool, config.monitor_options());
    let last_cycle_complete;

    if config.monitor_mode {
        println!(
            "Starting continuous monitoring (interval: {} seconds)",
            config.monitor_interval.as_secs()
        );
        println!("Press Ctrl+C to stop monitoring...\n");

        let token = monitor.cancel_token();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                println!("\nShutting down FOCAS Monitor...");
                token.cancel();
            }
        });

        let mut last_ok = true;
        let info_kind = config.info_kind;
        let format = config.output_format;
        monitor
            .run(|snapshot| {
                if format == OutputFormat::Console {
                    println!(
                        "FOCAS Monitor - {}",
                        snapshot.collection_time.format("%Y-%m-%d %H:%M:%S UTC")
                    );
                    println!(
                        "Machines: {} successful, {} failed\n",
                        snapshot.successful_reads, snapshot.failed_reads
                    );
                }
                println!("{}", render(snapshot, info_kind, format));
                last_ok = snapshot.all_succeeded();
            })
            .await;
        println!("{}", monitor.metrics().summary());
        last_cycle_complete = last_ok;
    } else {
        println!("Reading machine information...\n");
        let snapshot = monitor.poll_once().await;
        println!("{}", render(&snapshot, config.info_kind, config.output_format));
        if !snapshot.all_succeeded() {
            eprintln!(
                "Warning: {} machine(s) produced no data this cycle",
                snapshot.failed_reads
            );
        }
        last_cycle_complete = snapshot.all_succeeded();
    }

    monitor.shutdown().await;
    if config.verbose {
        println!("\nFOCAS Monitor finished.");
    }

    if last_cycle_complete {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
