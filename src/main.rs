use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::NaiveDateTime;
use clap::Parser;

use apogee_par::device::{Calibration, QuantumDriver};
use apogee_par::export;
use apogee_par::serial::SerialTransport;
use apogee_par::solar::{self, PanelSpec};

/// Command line interface for Apogee SQ-series quantum PAR sensors.
#[derive(Parser)]
#[command(name = "apogee-par", version, about)]
struct Cli {
    /// Serial port of the sensor; auto-discovered by USB id when omitted
    #[arg(long)]
    port: Option<String>,

    /// List serial ports that look like an Apogee sensor and exit
    #[arg(long)]
    list_ports: bool,

    /// Read the averaged voltage from the device
    #[arg(long)]
    read_voltage: bool,

    /// Read the averaged voltage converted to micromoles
    #[arg(long)]
    get_micromoles: bool,

    /// Read the device serial number
    #[arg(long)]
    get_serial_number: bool,

    /// Read the number of entries in the on-device log
    #[arg(long)]
    get_logging_count: bool,

    /// Retrieve all logged entries; pass the current datetime used as the
    /// timestamp reference
    #[arg(long, value_name = "YYYY-MM-DD HH:MM:SS")]
    get_all_logged_entries: Option<String>,

    /// Destination file for retrieved logged entries
    #[arg(long, default_value = "logged_entries.csv")]
    output: PathBuf,

    /// Erase all logged entries on the device
    #[arg(long)]
    erase_logged_data: bool,

    /// Write new calibration constants to the device
    #[arg(long, num_args = 2, value_names = ["MULTIPLIER", "OFFSET"])]
    set_calibration: Option<Vec<f32>>,

    /// Estimate incident energy and panel output from a previously
    /// retrieved logged-entries file
    #[arg(long, value_name = "FILE")]
    estimate_solar: Option<PathBuf>,

    /// Panel surface in m² for the solar projection
    #[arg(long, default_value_t = 1.6)]
    panel_area: f32,

    /// Panel conversion efficiency (0..1) for the solar projection
    #[arg(long, default_value_t = 0.20)]
    panel_efficiency: f32,

    /// System losses factor (0..1) for the solar projection
    #[arg(long, default_value_t = 0.75)]
    performance_ratio: f32,

    /// Print results as JSON instead of plain text
    #[arg(long)]
    json: bool,
}

impl Cli {
    fn wants_device(&self) -> bool {
        self.read_voltage
            || self.get_micromoles
            || self.get_serial_number
            || self.get_logging_count
            || self.get_all_logged_entries.is_some()
            || self.erase_logged_data
            || self.set_calibration.is_some()
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    if cli.list_ports {
        return list_ports(cli.json);
    }

    if let Some(path) = &cli.estimate_solar {
        return estimate_solar(path, &cli);
    }

    if !cli.wants_device() {
        bail!("No operation requested; see --help");
    }

    let port_name = resolve_port(&cli)?;
    let mut driver = QuantumDriver::open(&port_name)
        .with_context(|| format!("Could not connect to sensor on {}", port_name))?;

    if let Some(values) = &cli.set_calibration {
        let calibration = Calibration {
            multiplier: values[0],
            offset: values[1],
        };
        driver.set_calibration(calibration)?;
        println!("Calibration updated.");
    }

    if cli.read_voltage {
        match driver.read_voltage() {
            Ok(volts) => print_value(&cli, "voltage", volts),
            Err(e) => report_no_value("Voltage read", &e),
        }
    }

    if cli.get_micromoles {
        match driver.get_micromoles() {
            Ok(micromoles) => print_value(&cli, "micromoles", micromoles),
            Err(e) => report_no_value("Micromole read", &e),
        }
    }

    if cli.get_serial_number {
        match driver.get_serial_number() {
            Ok(serial) => print_value(&cli, "serial_number", serial),
            Err(e) => report_no_value("Serial number read", &e),
        }
    }

    if cli.get_logging_count {
        match driver.get_logging_count() {
            Ok(count) => print_value(&cli, "logging_count", count),
            Err(e) => report_no_value("Logging count read", &e),
        }
    }

    if let Some(reference) = &cli.get_all_logged_entries {
        let reference = NaiveDateTime::parse_from_str(reference, export::TIMESTAMP_FORMAT)
            .context("Reference datetime must be formatted as YYYY-MM-DD HH:MM:SS")?;
        match driver.get_all_logged_entries(reference) {
            Ok(entries) => {
                export::write_entries_to_file(&cli.output, &entries)?;
                println!(
                    "Wrote {} logged entries to {}.",
                    entries.len(),
                    cli.output.display()
                );
            }
            Err(e) => {
                log::error!("Logged entry retrieval failed: {}", e);
                println!("no entries retrieved");
            }
        }
    }

    if cli.erase_logged_data {
        match driver.erase_logged_data() {
            Ok(()) => println!("Successfully erased logged data."),
            Err(e) => {
                log::error!("Erase failed: {}", e);
                println!("Failed to erase logged data.");
            }
        }
    }

    Ok(())
}

fn resolve_port(cli: &Cli) -> Result<String> {
    if let Some(name) = &cli.port {
        return Ok(name.clone());
    }
    let ports = SerialTransport::discover_ports().context("Port discovery failed")?;
    let first = ports
        .first()
        .context("No sensor found; pass --port explicitly")?;
    log::info!("Auto-selected sensor on {}", first.port_name);
    Ok(first.port_name.clone())
}

fn list_ports(json: bool) -> Result<()> {
    let ports = SerialTransport::discover_ports().context("Port discovery failed")?;
    if json {
        println!("{}", serde_json::to_string_pretty(&ports)?);
        return Ok(());
    }
    if ports.is_empty() {
        println!("No sensors found.");
    }
    for port in ports {
        println!(
            "{}  serial={}",
            port.port_name,
            port.serial_number.as_deref().unwrap_or("unknown")
        );
    }
    Ok(())
}

fn estimate_solar(path: &std::path::Path, cli: &Cli) -> Result<()> {
    let values = export::read_values_from_file(path)
        .with_context(|| format!("Could not read {}", path.display()))?;
    let panel = PanelSpec {
        area_m2: cli.panel_area,
        efficiency: cli.panel_efficiency,
        performance_ratio: cli.performance_ratio,
    };
    let kwh_per_m2 = solar::estimate_kwh_per_m2(&values, solar::LOG_INTERVAL);
    let panel_kwh = solar::project_panel_output_kwh(kwh_per_m2, &panel);

    if cli.json {
        println!(
            "{}",
            serde_json::json!({
                "samples": values.len(),
                "kwh_per_m2": kwh_per_m2,
                "panel": panel,
                "panel_output_kwh": panel_kwh,
            })
        );
    } else {
        println!("Samples:            {}", values.len());
        println!("Incident energy:    {:.4} kWh/m2", kwh_per_m2);
        println!("Projected output:   {:.4} kWh", panel_kwh);
    }
    Ok(())
}

fn print_value<T: std::fmt::Display + serde::Serialize>(cli: &Cli, name: &str, value: T) {
    if cli.json {
        println!("{}", serde_json::json!({ name: value }));
    } else {
        println!("{}", value);
    }
}

fn report_no_value(operation: &str, error: &dyn std::error::Error) {
    log::error!("{} failed: {}", operation, error);
    println!("no value");
}
