/// FOCAS Monitor Fleet Demo
///
/// Walks the polling engine through a healthy fleet, a mid-run network
/// drop with cached fallback, and the recovery cycle, all against the
/// simulated adapter.
use std::sync::Arc;

use focas_monitor::{
    poll_cycle, render, CncAdapter, ConnectionPool, InfoKind, OutputFormat, PollMetrics,
    PoolConfig, SimProfile, SimulatedCnc,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    println!("🏭 FOCAS Monitor Fleet Demo");
    println!("===========================");

    let adapter = Arc::new(SimulatedCnc::new());
    adapter
        .register("10.0.1.100", 8193, SimProfile::default())
        .await;
    adapter
        .register(
            "10.0.1.101",
            8193,
            SimProfile {
                program_number: 2200,
                feed_rate: 600,
                spindle_speed: 3500,
                ..SimProfile::default()
            },
        )
        .await;
    // Drill1 is powered off: every connect attempt fails.
    adapter
        .register(
            "10.0.1.102",
            8193,
            SimProfile {
                reachable: false,
                ..SimProfile::default()
            },
        )
        .await;

    let mut pool = ConnectionPool::new(adapter.clone(), PoolConfig::default());
    pool.add_machine("Mill1", "10.0.1.100", 8193)?;
    pool.add_machine("Lathe1", "10.0.1.101", 8193)?;
    pool.add_machine("Drill1", "10.0.1.102", 8193)?;

    println!("\n🔌 Connecting to the fleet...");
    let summary = pool.connect_all().await;
    println!(
        "{} {} connected, {} failed",
        if summary.all_connected() { "✅" } else { "⚠️" },
        summary.successful,
        summary.failed
    );

    let mut metrics = PollMetrics::new();

    println!("\n📖 Cycle 1: Drill1 has never answered, so it is absent");
    let snapshot = poll_cycle(&mut pool).await;
    metrics.record(&snapshot);
    println!("{}", render(&snapshot, InfoKind::Basic, OutputFormat::Console));

    println!("📡 Simulating a network drop on Lathe1...");
    if let Some(handle) = pool.machine(1)?.handle {
        adapter.disconnect(handle).await;
    }
    adapter.set_reachable("10.0.1.101", 8193, false).await;

    println!("\n📖 Cycle 2: Lathe1 is served from cache");
    let snapshot = poll_cycle(&mut pool).await;
    metrics.record(&snapshot);
    println!("{}", render(&snapshot, InfoKind::Basic, OutputFormat::Console));

    println!("🔧 Lathe1 is back online...");
    adapter.set_reachable("10.0.1.101", 8193, true).await;

    println!("\n📖 Cycle 3: fresh data again");
    let snapshot = poll_cycle(&mut pool).await;
    metrics.record(&snapshot);
    println!("{}", render(&snapshot, InfoKind::Speed, OutputFormat::Console));

    println!("{}", pool.status_report());
    println!("{}", metrics.summary());

    pool.cleanup().await;
    println!("\n✅ Demo finished");
    Ok(())
}
