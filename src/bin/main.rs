//! Tallylog command line.
//!
//! # Configuration
//!
//! Configuration can be provided through multiple sources, in order of precedence:
//!
//! 1. Command-line arguments (highest precedence)
//! 2. Environment variables (prefixed with `TALLYLOG_`, `.env` files are honoured)
//! 3. User-specified configuration file (via `--config`)
//! 4. `tallylog.toml` in the working directory
//! 5. Default configuration (embedded in binary)
//!
//! # Examples
//!
//! ```bash
//! # Record a measurement
//! tallylog add weight 81.4 morning "before breakfast"
//!
//! # Daily average pulse
//! tallylog filter pulse --bucket daily --aggregate average
//!
//! # Hours between sleep events, reading a comma-separated log
//! tallylog --file sleep.csv --delimiter , interval sleep --unit hours
//! ```

use std::fs::OpenOptions;
use std::path::Path;

use clap::{Parser, Subcommand};
use tallylog::{
    logging, AggregateMode, BucketMode, CliArgs, DelimitedWriter, Plotter, Record, RoundUnit,
    RowSink, Settings, Tracker,
};
use tracing::debug;

#[derive(Parser, Debug)]
#[command(author, version, about = "Command line personal measurement tracker")]
struct Cli {
    #[command(flatten)]
    args: CliArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Add a measurement value to the log
    #[command(alias = "a")]
    Add {
        measurement: String,
        #[arg(allow_negative_numbers = true)]
        value: f64,
        name: Option<String>,
        description: Option<String>,
    },
    /// Filter records for a single measurement, optionally grouped
    #[command(alias = "f")]
    Filter {
        measurement: String,
        /// none, hourly, daily, weekly or total
        #[arg(short, long, default_value = "none")]
        bucket: BucketMode,
        /// first, average, max, min or sum
        #[arg(short, long, default_value = "average")]
        aggregate: AggregateMode,
    },
    /// Show the interval between consecutive events of a measurement
    #[command(alias = "i")]
    Interval {
        measurement: String,
        /// seconds, minutes, hours or days
        #[arg(short, long, default_value = "seconds")]
        unit: RoundUnit,
    },
    /// Show the latest value of every measurement
    #[command(alias = "l")]
    Latest,
    /// List all measurements in the log
    #[command(alias = "m")]
    Measurements,
    /// Draw a sparkline of a measurement
    #[command(alias = "spark")]
    Sparkline { measurement: String },
    /// Draw a multi-line ASCII graph of a measurement
    #[command(alias = "graph")]
    Asciigraph { measurement: String },
}

/// Eight-level block sparkline.
struct Sparkline;

impl Plotter for Sparkline {
    fn render(&self, values: &[f64]) -> String {
        const TICKS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];
        let Some(&first) = values.first() else {
            return String::new();
        };
        let (min, max) = values
            .iter()
            .fold((first, first), |(lo, hi), &v| (lo.min(v), hi.max(v)));
        let span = max - min;

        values
            .iter()
            .map(|&v| {
                if span == 0.0 {
                    TICKS[TICKS.len() / 2]
                } else {
                    let level = ((v - min) / span * (TICKS.len() - 1) as f64).round() as usize;
                    TICKS[level.min(TICKS.len() - 1)]
                }
            })
            .collect()
    }
}

/// Multi-line ASCII chart, captioned with the measurement.
struct AsciiGraph {
    caption: String,
}

impl Plotter for AsciiGraph {
    fn render(&self, values: &[f64]) -> String {
        let config = rasciigraph::Config::default()
            .with_height(GRAPH_HEIGHT)
            .with_caption(self.caption.clone());
        rasciigraph::plot(values.to_vec(), config)
    }
}

const GRAPH_HEIGHT: u32 = 10;

async fn open_log(path: &Path) -> std::io::Result<tokio::fs::File> {
    debug!(path = %path.display(), "opening log for reading");
    tokio::fs::File::open(path).await
}

fn open_for_append(path: &Path) -> std::io::Result<std::fs::File> {
    let mut options = OpenOptions::new();
    options.append(true).create(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    options.open(path)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let settings = Settings::new(&cli.args)?;
    logging::init_logging(&settings.logging.level);

    let delimiter = settings.delimiter()?;
    let tracker = Tracker::from_settings(&settings)?;
    let path = settings.log.path.as_path();
    let mut out = DelimitedWriter::new(std::io::stdout().lock(), delimiter);

    match cli.command {
        Command::Add {
            measurement,
            value,
            name,
            description,
        } => {
            let record = Record::new(
                chrono::Local::now().naive_local(),
                measurement,
                value,
                name.unwrap_or_default(),
                description.unwrap_or_default(),
            )?;
            let mut log = DelimitedWriter::new(open_for_append(path)?, delimiter);
            tracker.append(&record, &mut log)?;
            log.flush()?;
        }
        Command::Filter {
            measurement,
            bucket,
            aggregate,
        } => {
            let file = open_log(path).await?;
            tracker
                .filter(file, &measurement, bucket, aggregate, &mut out)
                .await?;
        }
        Command::Interval { measurement, unit } => {
            let file = open_log(path).await?;
            tracker.interval(file, &measurement, unit, &mut out).await?;
        }
        Command::Latest => {
            let file = open_log(path).await?;
            tracker.latest(file, &mut out).await?;
        }
        Command::Measurements => {
            let file = open_log(path).await?;
            for name in tracker.measurements(file).await? {
                out.write_row(&[name])?;
            }
        }
        Command::Sparkline { measurement } => {
            let file = open_log(path).await?;
            if let Some(line) = tracker.plot(file, &measurement, &Sparkline).await? {
                out.write_row(&[line])?;
            }
        }
        Command::Asciigraph { measurement } => {
            let file = open_log(path).await?;
            let plotter = AsciiGraph {
                caption: measurement.clone(),
            };
            if let Some(graph) = tracker.plot(file, &measurement, &plotter).await? {
                out.write_row(&[graph])?;
            }
        }
    }

    out.flush()?;
    Ok(())
}
