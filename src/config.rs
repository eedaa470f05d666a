//! Configuration: command-line options and the machine list file format.
//!
//! The machine list is plain text, one machine per line as `name,ip,port`;
//! `#` comments and blank lines are skipped, malformed lines are logged and
//! skipped rather than failing the load.

use std::fs;
use std::path::Path;
use std::time::Duration;

use log::warn;

use crate::error::{FocasError, FocasResult};
use crate::monitor::MonitorOptions;
use crate::pool::PoolConfig;
use crate::{DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_MONITOR_INTERVAL_SECS};

/// Which slice of the telemetry to display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InfoKind {
    #[default]
    All,
    Basic,
    Program,
    Position,
    Speed,
    Alarm,
}

impl InfoKind {
    /// Forgiving parse: unknown values fall back to `All`
    pub fn parse(value: &str) -> Self {
        match value {
            "basic" => Self::Basic,
            "program" => Self::Program,
            "position" => Self::Position,
            "speed" => Self::Speed,
            "alarm" => Self::Alarm,
            _ => Self::All,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Basic => "basic",
            Self::Program => "program",
            Self::Position => "position",
            Self::Speed => "speed",
            Self::Alarm => "alarm",
        }
    }
}

/// Snapshot rendering format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Console,
    Json,
    Csv,
}

impl OutputFormat {
    /// Forgiving parse: unknown values fall back to `Console`
    pub fn parse(value: &str) -> Self {
        match value {
            "json" => Self::Json,
            "csv" => Self::Csv,
            _ => Self::Console,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Console => "console",
            Self::Json => "json",
            Self::Csv => "csv",
        }
    }
}

/// One machine registration: friendly name plus endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MachineSpec {
    pub name: String,
    pub ip: String,
    pub port: u16,
}

/// Parse a `name,ip,port` machine specification
pub fn parse_machine_spec(spec: &str) -> Option<MachineSpec> {
    let mut parts = spec.splitn(3, ',');
    let name = parts.next()?.trim();
    let ip = parts.next()?.trim();
    let port: u16 = parts.next()?.trim().parse().ok()?;
    if name.is_empty() || ip.is_empty() {
        return None;
    }
    Some(MachineSpec {
        name: name.to_string(),
        ip: ip.to_string(),
        port,
    })
}

/// Load a machine list file
///
/// Comment (`#`) and blank lines are skipped silently; malformed lines are
/// logged with their line number and skipped. A file that yields no valid
/// machines is an error.
pub fn load_machines<P: AsRef<Path>>(path: P) -> FocasResult<Vec<MachineSpec>> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|e| {
        FocasError::invalid_config(format!("cannot open machine file '{}': {}", path.display(), e))
    })?;

    let mut machines = Vec::new();
    for (line_num, line) in contents.lines().enumerate() {
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() || line.starts_with('#') {
            continue;
        }
        match parse_machine_spec(line) {
            Some(spec) => machines.push(spec),
            None => warn!(
                "Invalid machine specification on line {}: {}",
                line_num + 1,
                line
            ),
        }
    }

    if machines.is_empty() {
        return Err(FocasError::invalid_config(format!(
            "no valid machines found in file '{}'",
            path.display()
        )));
    }
    Ok(machines)
}

/// Write a machine list file in the format `load_machines` reads
pub fn save_machines<P: AsRef<Path>>(path: P, machines: &[MachineSpec]) -> FocasResult<()> {
    let mut out = String::from("# FOCAS machine list: name,ip,port\n");
    for spec in machines {
        out.push_str(&format!("{},{},{}\n", spec.name, spec.ip, spec.port));
    }
    fs::write(path.as_ref(), out)?;
    Ok(())
}

/// Runtime configuration assembled from the command line
#[derive(Debug, Clone)]
pub struct Config {
    /// Machine list file (`--machines=<file>`)
    pub machine_file: Option<String>,
    /// Machines added directly (`--add=<name,ip,port>`, repeatable)
    pub adds: Vec<MachineSpec>,
    pub info_kind: InfoKind,
    pub output_format: OutputFormat,
    pub monitor_mode: bool,
    pub monitor_interval: Duration,
    pub connect_timeout: Duration,
    pub verbose: bool,
    pub diagnose: bool,
    pub show_status: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            machine_file: None,
            adds: Vec::new(),
            info_kind: InfoKind::All,
            output_format: OutputFormat::Console,
            monitor_mode: false,
            monitor_interval: Duration::from_secs(DEFAULT_MONITOR_INTERVAL_SECS),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            verbose: false,
            diagnose: false,
            show_status: false,
        }
    }
}

/// What the command line asked for
#[derive(Debug, Clone)]
pub enum CliRequest {
    Run(Config),
    Help,
    Version,
}

impl Config {
    /// Parse command-line arguments (without the program name)
    ///
    /// `--help`/`--version` win over everything else. Out-of-range interval
    /// and timeout values fall back to their defaults; unparseable `--add`
    /// specifications are logged and skipped.
    pub fn parse<I>(args: I) -> CliRequest
    where
        I: IntoIterator<Item = String>,
    {
        let mut config = Config::default();

        for arg in args {
            if let Some(value) = arg.strip_prefix("--machines=") {
                config.machine_file = Some(value.to_string());
            } else if let Some(value) = arg.strip_prefix("--add=") {
                match parse_machine_spec(value) {
                    Some(spec) => config.adds.push(spec),
                    None => warn!("Invalid machine specification: {}", value),
                }
            } else if let Some(value) = arg.strip_prefix("--info=") {
                config.info_kind = InfoKind::parse(value);
            } else if let Some(value) = arg.strip_prefix("--output=") {
                config.output_format = OutputFormat::parse(value);
            } else if let Some(value) = arg.strip_prefix("--interval=") {
                config.monitor_interval = match value.parse::<u64>() {
                    Ok(secs) if secs >= 1 => Duration::from_secs(secs),
                    _ => Duration::from_secs(DEFAULT_MONITOR_INTERVAL_SECS),
                };
            } else if let Some(value) = arg.strip_prefix("--timeout=") {
                config.connect_timeout = match value.parse::<u64>() {
                    Ok(secs) if secs >= 1 => Duration::from_secs(secs),
                    _ => Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
                };
            } else if arg == "--monitor" {
                config.monitor_mode = true;
            } else if arg == "--verbose" {
                config.verbose = true;
            } else if arg == "--diagnose" {
                config.diagnose = true;
            } else if arg == "--status" {
                config.show_status = true;
            } else if arg == "--help" || arg == "-h" {
                return CliRequest::Help;
            } else if arg == "--version" || arg == "-v" {
                return CliRequest::Version;
            }
        }

        CliRequest::Run(config)
    }

    /// Pool configuration derived from the CLI options
    pub fn pool_config(&self) -> PoolConfig {
        PoolConfig {
            connect_timeout: self.connect_timeout,
            diagnostics: self.diagnose || self.verbose,
            ..PoolConfig::default()
        }
    }

    /// Monitor options derived from the CLI options
    pub fn monitor_options(&self) -> MonitorOptions {
        MonitorOptions {
            interval: self.monitor_interval,
        }
    }
}

/// Usage text for `--help`
pub fn usage(program_name: &str) -> String {
    format!(
        "FOCAS Monitor - Multi-Machine FANUC CNC Monitoring\n\
         Usage: {} [OPTIONS]\n\n\
         Options:\n\
         \x20 --machines=<file>      Load machine list from configuration file\n\
         \x20 --add=<name,ip,port>   Add a machine (can be used multiple times)\n\
         \x20 --info=<type>          Information to display: all, basic, program,\n\
         \x20                        position, speed, alarm (default: all)\n\
         \x20 --monitor              Continuous monitoring mode\n\
         \x20 --interval=<seconds>   Monitoring interval (default: {} seconds)\n\
         \x20 --output=<format>      Output format: console, json, csv\n\
         \x20 --verbose              Enable verbose logging\n\
         \x20 --diagnose             Log troubleshooting detail on connection failures\n\
         \x20 --status               Show connection pool status\n\
         \x20 --timeout=<seconds>    Connection timeout (default: {} seconds)\n\
         \x20 --help                 Show this help message\n\
         \x20 --version              Show version information\n\n\
         Examples:\n\
         \x20 {} --machines=factory.txt --info=basic\n\
         \x20 {} --add=Mill1,192.168.1.100,8193 --add=Lathe1,192.168.1.101,8193\n\
         \x20 {} --machines=machines.txt --monitor --interval=60\n\
         \x20 {} --machines=machines.txt --info=alarm --output=json",
        program_name,
        DEFAULT_MONITOR_INTERVAL_SECS,
        DEFAULT_CONNECT_TIMEOUT_SECS,
        program_name,
        program_name,
        program_name,
        program_name,
    )
}

/// Version string for `--version`
pub fn version() -> String {
    format!(
        "FOCAS Monitor v{}\nProtocol: FOCAS/Ethernet (via adapter)",
        env!("CARGO_PKG_VERSION")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_defaults() {
        let config = match Config::parse(args(&[])) {
            CliRequest::Run(config) => config,
            other => panic!("expected run request, got {:?}", other),
        };
        assert_eq!(config.info_kind, InfoKind::All);
        assert_eq!(config.output_format, OutputFormat::Console);
        assert!(!config.monitor_mode);
        assert_eq!(config.monitor_interval, Duration::from_secs(30));
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_flag_parsing() {
        let config = match Config::parse(args(&[
            "--machines=factory.txt",
            "--add=Mill1,192.168.1.100,8193",
            "--info=alarm",
            "--output=json",
            "--monitor",
            "--interval=60",
            "--timeout=5",
            "--verbose",
            "--status",
        ])) {
            CliRequest::Run(config) => config,
            other => panic!("expected run request, got {:?}", other),
        };

        assert_eq!(config.machine_file.as_deref(), Some("factory.txt"));
        assert_eq!(config.adds.len(), 1);
        assert_eq!(config.adds[0].name, "Mill1");
        assert_eq!(config.info_kind, InfoKind::Alarm);
        assert_eq!(config.output_format, OutputFormat::Json);
        assert!(config.monitor_mode);
        assert_eq!(config.monitor_interval, Duration::from_secs(60));
        assert_eq!(config.connect_timeout, Duration::from_secs(5));
        assert!(config.verbose);
        assert!(config.show_status);
        assert!(config.pool_config().diagnostics);
    }

    #[test]
    fn test_bad_interval_falls_back_to_default() {
        let config = match Config::parse(args(&["--interval=0", "--timeout=junk"])) {
            CliRequest::Run(config) => config,
            other => panic!("expected run request, got {:?}", other),
        };
        assert_eq!(config.monitor_interval, Duration::from_secs(30));
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_help_and_version_short_circuit() {
        assert!(matches!(
            Config::parse(args(&["--machines=x.txt", "--help"])),
            CliRequest::Help
        ));
        assert!(matches!(Config::parse(args(&["-v"])), CliRequest::Version));
    }

    #[test]
    fn test_parse_machine_spec() {
        let spec = parse_machine_spec("Mill1,192.168.1.100,8193").unwrap();
        assert_eq!(spec.name, "Mill1");
        assert_eq!(spec.ip, "192.168.1.100");
        assert_eq!(spec.port, 8193);

        assert!(parse_machine_spec("Mill1,192.168.1.100").is_none());
        assert!(parse_machine_spec("Mill1,192.168.1.100,notaport").is_none());
        assert!(parse_machine_spec(",192.168.1.100,8193").is_none());
    }

    #[test]
    fn test_machine_file_round_trip() {
        let machines = vec![
            MachineSpec {
                name: "Mill1".to_string(),
                ip: "192.168.1.100".to_string(),
                port: 8193,
            },
            MachineSpec {
                name: "Lathe1".to_string(),
                ip: "192.168.1.101".to_string(),
                port: 8194,
            },
            MachineSpec {
                name: "Drill1".to_string(),
                ip: "192.168.1.102".to_string(),
                port: 8193,
            },
        ];

        let path = std::env::temp_dir().join(format!("focas_machines_{}.txt", std::process::id()));
        save_machines(&path, &machines).unwrap();
        let loaded = load_machines(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(loaded, machines);
    }

    #[test]
    fn test_load_skips_comments_and_malformed_lines() {
        let path = std::env::temp_dir().join(format!("focas_mixed_{}.txt", std::process::id()));
        std::fs::write(
            &path,
            "# fleet\n\nMill1,192.168.1.100,8193\nbroken line\nLathe1,192.168.1.101,8193\n",
        )
        .unwrap();
        let loaded = load_machines(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].name, "Mill1");
        assert_eq!(loaded[1].name, "Lathe1");
    }

    #[test]
    fn test_load_with_no_valid_machines_is_error() {
        let path = std::env::temp_dir().join(format!("focas_empty_{}.txt", std::process::id()));
        std::fs::write(&path, "# nothing here\n\n").unwrap();
        let err = load_machines(&path).unwrap_err();
        std::fs::remove_file(&path).ok();
        assert!(err.is_caller_error());
    }

    #[test]
    fn test_forgiving_enum_parse() {
        assert_eq!(InfoKind::parse("speed"), InfoKind::Speed);
        assert_eq!(InfoKind::parse("bogus"), InfoKind::All);
        assert_eq!(OutputFormat::parse("csv"), OutputFormat::Csv);
        assert_eq!(OutputFormat::parse("bogus"), OutputFormat::Console);
    }
}
