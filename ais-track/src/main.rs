//! ais-track: CLI for AIS decoding and dead-reckoned track reconstruction.

use std::collections::HashMap;
use std::io::{self, BufRead};
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use comfy_table::{Cell, Table};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use ais_core::armor::Bitstream;
use ais_core::config::{self, Config, OutputFormat};
use ais_core::decode::{dispatch, Dispatch};
use ais_core::nmea::{self, FragmentAssembler};
use ais_core::tracker::Tracker;
use ais_core::types::*;

mod output;

#[derive(Parser)]
#[command(name = "ais", version, about = "AIS decoder and track reconstructor")]
struct Cli {
    /// Config file (defaults to ~/.ais-track/config.yaml)
    #[arg(long, global = true, env = "AIS_TRACK_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode a capture file and print a vessel table
    Decode {
        /// Capture file, one NMEA line per row ("-" for stdin)
        file: PathBuf,

        /// Print every decoded message as a JSON line instead of the table
        #[arg(short, long)]
        raw: bool,
    },

    /// Reconstruct vessel tracks, filling gaps by dead reckoning
    Track {
        /// Capture file, one NMEA line per row ("-" for stdin)
        file: PathBuf,

        /// Emit track points as JSON lines
        #[arg(long)]
        json: bool,

        /// Longest gap (seconds) bridged by dead reckoning
        #[arg(long)]
        max_gap: Option<i64>,

        /// Skip sentences with a bad NMEA checksum
        #[arg(long)]
        verify_checksum: bool,
    },

    /// Show the effective configuration
    Config {
        /// Write the current settings to the config file
        #[arg(long)]
        init: bool,
    },
}

/// Accumulated vessel state from decoded messages.
struct VesselSummary {
    mmsi: Mmsi,
    name: Option<String>,
    call_sign: Option<String>,
    ship_type: Option<u8>,
    destination: Option<String>,
    nav_status: Option<u8>,
    speed: Option<f64>,
    course: Option<f64>,
    lat: Option<f64>,
    lon: Option<f64>,
    messages: u32,
    last_seen: i64,
}

impl VesselSummary {
    fn new(mmsi: Mmsi) -> Self {
        VesselSummary {
            mmsi,
            name: None,
            call_sign: None,
            ship_type: None,
            destination: None,
            nav_status: None,
            speed: None,
            course: None,
            lat: None,
            lon: None,
            messages: 0,
            last_seen: 0,
        }
    }

    fn update(&mut self, timestamp: i64, msg: &DecodedMessage) {
        self.messages += 1;
        self.last_seen = self.last_seen.max(timestamp);
        match msg {
            DecodedMessage::PositionReport(m) => {
                self.nav_status = Some(m.nav_status);
                if let Some(s) = m.speed() {
                    self.speed = Some(s);
                }
                if let Some(c) = m.course() {
                    self.course = Some(c);
                }
                if let Some((lat, lon)) = m.position() {
                    self.lat = Some(lat);
                    self.lon = Some(lon);
                }
            }
            DecodedMessage::StaticVoyageData(m) => {
                self.name = Some(m.vessel_name.clone()).filter(|n| !n.is_empty());
                self.call_sign = Some(m.call_sign.clone()).filter(|c| !c.is_empty());
                self.ship_type = Some(m.ship_type);
                self.destination = Some(m.destination.clone()).filter(|d| !d.is_empty());
            }
        }
    }
}

fn main() {
    init_logging();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => config::load_config_from(path).unwrap_or_else(|e| {
            error!("Error loading {}: {e}", path.display());
            std::process::exit(1);
        }),
        None => config::load_config(),
    };

    match cli.command {
        Commands::Decode { file, raw } => cmd_decode(&file, raw, &config),
        Commands::Track {
            file,
            json,
            max_gap,
            verify_checksum,
        } => {
            let mut config = config;
            if let Some(secs) = max_gap {
                config.tracker.max_gap_secs = secs;
            }
            if verify_checksum {
                config.tracker.verify_checksum = true;
            }
            if json {
                config.output.format = OutputFormat::Json;
            }
            cmd_track(&file, &config)
        }
        Commands::Config { init } => cmd_config(cli.config.as_deref(), &config, init),
    }
}

/// Log to stderr so stdout stays clean for tables and JSON lines.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn open_input(file: &Path) -> Box<dyn BufRead> {
    if file.to_str() == Some("-") {
        return Box::new(io::stdin().lock());
    }
    let f = std::fs::File::open(file).unwrap_or_else(|e| {
        error!("Error opening {}: {e}", file.display());
        std::process::exit(1);
    });
    Box::new(io::BufReader::new(f))
}

fn cmd_decode(file: &Path, raw: bool, config: &Config) {
    let reader = open_input(file);

    let mut assembler = FragmentAssembler::new();
    let mut vessels: HashMap<Mmsi, VesselSummary> = HashMap::new();
    let mut total_lines = 0u64;
    let mut sentences = 0u64;
    let mut decoded = 0u64;
    let mut skipped = 0u64;

    for line in reader.lines() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                warn!("read error: {e}");
                continue;
            }
        };
        total_lines += 1;

        let Some(sentence) = nmea::parse_line(&line) else {
            continue;
        };
        if config.tracker.verify_checksum && !nmea::verify_checksum(&line) {
            skipped += 1;
            continue;
        }
        sentences += 1;

        let Some(sentence) = assembler.push(sentence) else {
            continue;
        };

        let msg = match dispatch(&Bitstream::from_payload(&sentence.payload)) {
            Dispatch::Decoded(msg) => msg,
            _ => {
                skipped += 1;
                continue;
            }
        };
        decoded += 1;

        if raw {
            println!("{}", output::message_json(sentence.timestamp, &msg));
        }

        vessels
            .entry(msg.mmsi())
            .or_insert_with(|| VesselSummary::new(msg.mmsi()))
            .update(sentence.timestamp, &msg);
    }

    info!(
        lines = total_lines,
        sentences, decoded, skipped, vessels = vessels.len(), "decode complete"
    );

    if !raw {
        print_summary(&vessels, total_lines, decoded);
    }
}

fn cmd_track(file: &Path, config: &Config) {
    let reader = open_input(file);
    let json = config.output.format == OutputFormat::Json;

    let mut tracker = Tracker::new(config.tracker.clone());

    for line in reader.lines() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                warn!("read error: {e}");
                continue;
            }
        };

        if let Some(point) = tracker.process_line(&line) {
            if json {
                println!("{}", output::point_json(point));
            }
        }
    }

    if tracker.pending_fragments() > 0 {
        warn!(
            pending = tracker.pending_fragments(),
            "incomplete multi-sentence messages at end of input"
        );
    }

    if json {
        let stats = output::run_stats(&tracker)
            .into_iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(" ");
        info!("track complete: {stats}");
        return;
    }

    println!();
    println!("Track complete: {}", file.display());
    for (label, value) in output::run_stats(&tracker) {
        println!("  {label:<18} {value}");
    }

    if !tracker.track().is_empty() {
        println!();
        println!("{}", output::points_table(tracker.track()));
        println!();
        println!("{}", output::vessels_table(&tracker));
    }
}

fn cmd_config(explicit: Option<&Path>, config: &Config, init: bool) {
    let path = explicit.map(Path::to_path_buf).unwrap_or_else(config::config_file);

    if init {
        let result = match explicit {
            Some(p) => config::save_config_to(p, config).map(|_| p.to_path_buf()),
            None => config::save_config(config),
        };
        match result {
            Ok(written) => println!("Wrote {}", written.display()),
            Err(e) => {
                error!("Error writing config: {e}");
                std::process::exit(1);
            }
        }
        return;
    }

    println!();
    println!(
        "Config: {}{}",
        path.display(),
        if path.exists() { "" } else { " (not found, using defaults)" }
    );
    println!();
    print!("{}", config::serialize_config(config));
}

fn print_summary(vessels: &HashMap<Mmsi, VesselSummary>, total_lines: u64, decoded: u64) {
    println!();
    println!(
        "Lines: {total_lines} read, {decoded} messages decoded, {} vessels",
        vessels.len()
    );
    println!();

    if vessels.is_empty() {
        return;
    }

    let mut table = Table::new();
    table.set_header(vec![
        "MMSI", "Name", "Call sign", "Type", "Status", "SOG", "COG", "Lat", "Lon",
        "Destination", "Last seen", "Msgs",
    ]);

    let mut sorted: Vec<_> = vessels.values().collect();
    sorted.sort_by_key(|v| (std::cmp::Reverse(v.messages), v.mmsi));

    for v in sorted {
        table.add_row(vec![
            Cell::new(v.mmsi),
            Cell::new(v.name.as_deref().unwrap_or("-")),
            Cell::new(v.call_sign.as_deref().unwrap_or("-")),
            Cell::new(v.ship_type.map(ship_type_name).unwrap_or("-".into())),
            Cell::new(v.nav_status.map(nav_status_name).unwrap_or("-")),
            Cell::new(v.speed.map(|s| format!("{s:.1}")).unwrap_or("-".into())),
            Cell::new(v.course.map(|c| format!("{c:.1}")).unwrap_or("-".into())),
            Cell::new(v.lat.map(|l| format!("{l:.5}")).unwrap_or("-".into())),
            Cell::new(v.lon.map(|l| format!("{l:.5}")).unwrap_or("-".into())),
            Cell::new(v.destination.as_deref().unwrap_or("-")),
            Cell::new(output::format_timestamp(v.last_seen)),
            Cell::new(v.messages),
        ]);
    }

    println!("{table}");
}
