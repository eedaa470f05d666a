//! Snapshot renderers: console tables, JSON, and CSV.
//!
//! The polling core prescribes no format; these renderers turn a
//! [`MultiMachineSnapshot`] into the strings the CLI prints. All functions
//! return the rendered text, callers decide where it goes.

use crate::config::{InfoKind, OutputFormat};
use crate::machine::MachineInfo;
use crate::poller::{MachineReading, MultiMachineSnapshot};

/// Render a snapshot in the requested format
pub fn render(snapshot: &MultiMachineSnapshot, info: InfoKind, format: OutputFormat) -> String {
    match format {
        OutputFormat::Console => render_console(snapshot, info),
        OutputFormat::Json => render_json(snapshot),
        OutputFormat::Csv => render_csv(snapshot),
    }
}

/// JSON rendering of the whole snapshot
pub fn render_json(snapshot: &MultiMachineSnapshot) -> String {
    // The snapshot types are plain data; serialization cannot fail.
    serde_json::to_string_pretty(snapshot).unwrap_or_else(|e| format!("{{\"error\":\"{}\"}}", e))
}

/// CSV rendering: fixed header plus one row per machine
pub fn render_csv(snapshot: &MultiMachineSnapshot) -> String {
    let mut out = String::from(
        "machine_name,machine_id,program_name,program_number,status,sequence_number,\
         x_abs,y_abs,z_abs,x_rel,y_rel,z_rel,feed_rate,spindle_speed,has_alarm,\
         alarm_status,last_updated\n",
    );
    for reading in &snapshot.machines {
        let info = &reading.info;
        out.push_str(&format!(
            "{},{},{},{},{},{},{:.3},{:.3},{:.3},{:.3},{:.3},{:.3},{},{},{},{},{}\n",
            reading.name,
            info.machine_id,
            info.program_name,
            info.program_number,
            info.status,
            info.sequence_number,
            info.position.x_abs,
            info.position.y_abs,
            info.position.z_abs,
            info.position.x_rel,
            info.position.y_rel,
            info.position.z_rel,
            info.speed.feed_rate,
            info.speed.spindle_speed,
            info.alarm.has_alarm,
            info.alarm.alarm_status,
            info.last_updated.timestamp(),
        ));
    }
    out
}

/// Console rendering: full blocks for `all`, aligned columns otherwise
pub fn render_console(snapshot: &MultiMachineSnapshot, info: InfoKind) -> String {
    let mut out = String::new();

    match info {
        InfoKind::All => {
            for reading in &snapshot.machines {
                out.push_str(&render_machine_block(reading));
            }
        }
        InfoKind::Basic => {
            out.push_str(&format!(
                "{:<15} | {:<35} | {}\n{}\n",
                "Machine",
                "Machine ID",
                "Status",
                "-".repeat(64)
            ));
            for reading in &snapshot.machines {
                out.push_str(&format!(
                    "{:<15} | {:<35} | {}{}\n",
                    reading.name,
                    reading.info.machine_id,
                    reading.info.status,
                    cached_tag(reading)
                ));
            }
        }
        InfoKind::Program => {
            out.push_str(&format!(
                "{:<15} | {:<10} | {:<10} | {}\n{}\n",
                "Machine",
                "Program",
                "Sequence",
                "Status",
                "-".repeat(55)
            ));
            for reading in &snapshot.machines {
                out.push_str(&format!(
                    "{:<15} | {:<10} | N{:<9} | {}{}\n",
                    reading.name,
                    reading.info.program_name,
                    reading.info.sequence_number,
                    reading.info.status,
                    cached_tag(reading)
                ));
            }
        }
        InfoKind::Position => {
            out.push_str(&format!(
                "{:<15} | {:>10} | {:>10} | {:>10} | {}\n{}\n",
                "Machine",
                "X (mm)",
                "Y (mm)",
                "Z (mm)",
                "Status",
                "-".repeat(66)
            ));
            for reading in &snapshot.machines {
                out.push_str(&format!(
                    "{:<15} | {:>10.3} | {:>10.3} | {:>10.3} | {}{}\n",
                    reading.name,
                    reading.info.position.x_abs,
                    reading.info.position.y_abs,
                    reading.info.position.z_abs,
                    reading.info.status,
                    cached_tag(reading)
                ));
            }
        }
        InfoKind::Speed => {
            out.push_str(&format!(
                "{:<15} | {:<15} | {:<15} | {}\n{}\n",
                "Machine",
                "Feed (mm/min)",
                "Spindle (RPM)",
                "Status",
                "-".repeat(62)
            ));
            for reading in &snapshot.machines {
                out.push_str(&format!(
                    "{:<15} | {:<15} | {:<15} | {}{}\n",
                    reading.name,
                    reading.info.speed.feed_rate,
                    reading.info.speed.spindle_speed,
                    reading.info.status,
                    cached_tag(reading)
                ));
            }
        }
        InfoKind::Alarm => {
            out.push_str(&format!(
                "{:<15} | {:<12} | {}\n{}\n",
                "Machine",
                "Alarm Status",
                "Machine Status",
                "-".repeat(48)
            ));
            for reading in &snapshot.machines {
                let alarm = if reading.info.alarm.has_alarm {
                    format!("ACTIVE ({})", reading.info.alarm.alarm_status)
                } else {
                    "NONE".to_string()
                };
                out.push_str(&format!(
                    "{:<15} | {:<12} | {}{}\n",
                    reading.name,
                    alarm,
                    reading.info.status,
                    cached_tag(reading)
                ));
            }
        }
    }

    out.push_str(&format!(
        "\nSummary: {} machines, {} successful reads, {} failed reads\n",
        snapshot.machine_count(),
        snapshot.successful_reads,
        snapshot.failed_reads
    ));
    out.push_str(&format!(
        "Collection time: {}\n",
        snapshot.collection_time.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    out
}

fn cached_tag(reading: &MachineReading) -> &'static str {
    if reading.cached {
        " [cached]"
    } else {
        ""
    }
}

fn render_machine_block(reading: &MachineReading) -> String {
    let info: &MachineInfo = &reading.info;
    let mut out = String::new();

    out.push_str(&format!("=== {} ===\n", reading.name));
    out.push_str(&format!("Machine ID: {}\n", info.machine_id));
    out.push_str(&format!("Current Program: {}", info.program_name));
    if info.program_number > 0 {
        out.push_str(&format!(" (Number: {})", info.program_number));
    }
    out.push('\n');
    out.push_str(&format!("Machine Status: {}\n", info.status));
    if info.sequence_number > 0 {
        out.push_str(&format!("Current Sequence: N{}\n", info.sequence_number));
    }
    if reading.cached {
        out.push_str("Data source: cached (machine unreachable this cycle)\n");
    }

    out.push_str("\n--- Position Information ---\n");
    out.push_str("Absolute Position:\n");
    out.push_str(&format!("  X: {:8.3} mm\n", info.position.x_abs));
    out.push_str(&format!("  Y: {:8.3} mm\n", info.position.y_abs));
    out.push_str(&format!("  Z: {:8.3} mm\n", info.position.z_abs));
    out.push_str("Relative Position:\n");
    out.push_str(&format!("  X: {:8.3} mm\n", info.position.x_rel));
    out.push_str(&format!("  Y: {:8.3} mm\n", info.position.y_rel));
    out.push_str(&format!("  Z: {:8.3} mm\n", info.position.z_rel));

    out.push_str("\n--- Speed Information ---\n");
    out.push_str(&format!("Feed Rate: {} mm/min\n", info.speed.feed_rate));
    out.push_str(&format!("Spindle Speed: {} RPM\n", info.speed.spindle_speed));

    out.push_str("\n--- Alarm Information ---\n");
    out.push_str(&format!(
        "Alarm Status: {}\n",
        if info.alarm.has_alarm { "ACTIVE" } else { "NONE" }
    ));
    if info.alarm.has_alarm {
        out.push_str(&format!("Alarm Code: {}\n", info.alarm.alarm_status));
    }

    out.push_str(&format!(
        "Last Updated: {}\n\n",
        info.last_updated.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::machine::{AlarmInfo, ConnectionState, PositionInfo, SpeedInfo};
    use chrono::Utc;
    use std::time::Duration;

    fn sample_snapshot() -> MultiMachineSnapshot {
        let info = MachineInfo {
            machine_id: "0000cafe-00000001-00000002-00000003".to_string(),
            program_name: "O1234".to_string(),
            program_number: 1234,
            status: "RUNNING (MOVING)".to_string(),
            sequence_number: 120,
            position: PositionInfo {
                x_abs: 125.4,
                x_rel: 10.25,
                ..PositionInfo::default()
            },
            speed: SpeedInfo {
                feed_rate: 1200,
                spindle_speed: 8000,
            },
            alarm: AlarmInfo {
                alarm_status: 3,
                has_alarm: true,
            },
            last_updated: Utc::now(),
        };
        MultiMachineSnapshot {
            machines: vec![
                MachineReading {
                    name: "Mill1".to_string(),
                    state: ConnectionState::Connected,
                    cached: false,
                    info: info.clone(),
                },
                MachineReading {
                    name: "Lathe1".to_string(),
                    state: ConnectionState::Error,
                    cached: true,
                    info,
                },
            ],
            successful_reads: 2,
            failed_reads: 1,
            collection_time: Utc::now(),
            duration: Duration::from_millis(42),
        }
    }

    #[test]
    fn test_csv_shape() {
        let csv = render_csv(&sample_snapshot());
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 3);
        for line in &lines {
            assert_eq!(line.split(',').count(), 17);
        }
        assert!(lines[1].starts_with("Mill1,"));
        assert!(lines[2].starts_with("Lathe1,"));
    }

    #[test]
    fn test_json_parses_back() {
        let json = render_json(&sample_snapshot());
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["successful_reads"], 2);
        assert_eq!(value["failed_reads"], 1);
        assert_eq!(value["machines"][0]["name"], "Mill1");
        assert_eq!(value["machines"][1]["cached"], true);
        assert_eq!(value["machines"][0]["info"]["program_number"], 1234);
    }

    #[test]
    fn test_console_tables() {
        let snapshot = sample_snapshot();

        let basic = render_console(&snapshot, InfoKind::Basic);
        assert!(basic.contains("Machine ID"));
        assert!(basic.contains("Mill1"));
        assert!(basic.contains("[cached]"));
        assert!(basic.contains("Summary: 2 machines, 2 successful reads, 1 failed reads"));

        let alarm = render_console(&snapshot, InfoKind::Alarm);
        assert!(alarm.contains("ACTIVE (3)"));

        let all = render_console(&snapshot, InfoKind::All);
        assert!(all.contains("=== Mill1 ==="));
        assert!(all.contains("Current Sequence: N120"));
        assert!(all.contains("Data source: cached"));
    }

    #[test]
    fn test_dispatcher() {
        let snapshot = sample_snapshot();
        assert!(render(&snapshot, InfoKind::All, OutputFormat::Json).starts_with('{'));
        assert!(render(&snapshot, InfoKind::All, OutputFormat::Csv).starts_with("machine_name"));
        assert!(render(&snapshot, InfoKind::Basic, OutputFormat::Console).contains("Machine"));
    }
}
