//! moc: inspect, convert and combine HEALPix Multi-Order Coverage maps.
//!
//! Input files are ASCII (`3/1,3-4 4/30`), JSON (`{"3":[1,3,4]}`) or FITS;
//! the format is detected from the first bytes. `RUST_LOG` controls log
//! output (default: warn).

use anyhow::{bail, Context};
use celestial_moc::io::{self, MocFormat};
use celestial_moc::{Frame, Moc, MocConfig};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Ascii,
    Json,
    Fits,
    FitsCompressed,
}

impl From<OutputFormat> for MocFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Ascii => MocFormat::Ascii,
            OutputFormat::Json => MocFormat::Json,
            OutputFormat::Fits => MocFormat::Fits,
            OutputFormat::FitsCompressed => MocFormat::FitsCompressed,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum Operation {
    Union,
    Intersection,
    Subtraction,
    Difference,
}

#[derive(Parser)]
#[command(name = "moc")]
#[command(about = "Inspect, convert and combine HEALPix Multi-Order Coverage maps")]
#[command(version)]
struct Cli {
    /// JSON configuration (limit orders, frame) applied to every MOC read
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the minimum limit order
    #[arg(long, global = true)]
    min_order: Option<u8>,

    /// Override the maximum limit order
    #[arg(long, global = true)]
    max_order: Option<u8>,

    /// Override the frame tag (equatorial, galactic, ecliptic)
    #[arg(long, global = true)]
    frame: Option<Frame>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print a summary of a MOC file
    Info {
        input: PathBuf,
        /// Also list the stored cells per order
        #[arg(long)]
        cells: bool,
    },
    /// Rewrite a MOC in another format
    Convert {
        input: PathBuf,
        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Output format (from the output extension when omitted)
        #[arg(long, value_enum)]
        format: Option<OutputFormat>,
    },
    /// Combine two MOCs with a set operation
    Combine {
        #[arg(value_enum)]
        operation: Operation,
        left: PathBuf,
        right: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long, value_enum)]
        format: Option<OutputFormat>,
    },
    /// Test whether a sky position falls inside a MOC
    Contains {
        input: PathBuf,
        /// Right ascension in degrees
        #[arg(allow_negative_numbers = true)]
        ra: f64,
        /// Declination in degrees
        #[arg(allow_negative_numbers = true)]
        dec: f64,
    },
    /// Build the MOC of a cone
    Cone {
        #[arg(allow_negative_numbers = true)]
        ra: f64,
        #[arg(allow_negative_numbers = true)]
        dec: f64,
        /// Radius in degrees
        radius: f64,
        /// Deepest order of the result
        #[arg(long, default_value = "8")]
        order: u8,
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long, value_enum)]
        format: Option<OutputFormat>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = resolve_config(&cli)?;

    match cli.command {
        Commands::Info { input, cells } => {
            let moc = load(&input, config.as_ref())?;
            print_info(&moc, cells);
        }
        Commands::Convert {
            input,
            output,
            format,
        } => {
            let moc = load(&input, config.as_ref())?;
            emit(&moc, output.as_deref(), format)?;
        }
        Commands::Combine {
            operation,
            left,
            right,
            output,
            format,
        } => {
            let a = load(&left, config.as_ref())?;
            let b = load(&right, config.as_ref())?;
            let result = match operation {
                Operation::Union => a.union(&b)?,
                Operation::Intersection => a.intersection(&b)?,
                Operation::Subtraction => a.subtraction(&b)?,
                Operation::Difference => a.difference(&b)?,
            };
            info!(cells = result.n_cells(), "combined");
            emit(&result, output.as_deref(), format)?;
        }
        Commands::Contains { input, ra, dec } => {
            let moc = load(&input, config.as_ref())?;
            println!("{}", moc.contains(ra, dec)?);
        }
        Commands::Cone {
            ra,
            dec,
            radius,
            order,
            output,
            format,
        } => {
            let mut moc = Moc::from_cone(ra, dec, radius, order)?;
            if let Some(config) = &config {
                apply_config(&mut moc, config)?;
            }
            emit(&moc, output.as_deref(), format)?;
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

/// Config file, then flag overrides. `None` leaves every MOC as read.
fn resolve_config(cli: &Cli) -> anyhow::Result<Option<MocConfig>> {
    let mut config = match &cli.config {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            Some(MocConfig::from_json(&json)?)
        }
        None => None,
    };
    if cli.min_order.is_some() || cli.max_order.is_some() || cli.frame.is_some() {
        let config = config.get_or_insert_with(MocConfig::default);
        if let Some(min) = cli.min_order {
            config.min_limit_order = min;
        }
        if let Some(max) = cli.max_order {
            config.max_limit_order = max;
        }
        if let Some(frame) = cli.frame {
            config.frame = frame;
        }
        config.validate()?;
    }
    Ok(config)
}

fn load(path: &Path, config: Option<&MocConfig>) -> anyhow::Result<Moc> {
    let mut moc =
        io::read_file(path, None).with_context(|| format!("reading {}", path.display()))?;
    if let Some(config) = config {
        apply_config(&mut moc, config)?;
    }
    Ok(moc)
}

fn apply_config(moc: &mut Moc, config: &MocConfig) -> anyhow::Result<()> {
    moc.set_frame(config.frame);
    moc.set_limit_order(config.min_limit_order, config.max_limit_order)?;
    Ok(())
}

fn emit(moc: &Moc, output: Option<&Path>, format: Option<OutputFormat>) -> anyhow::Result<()> {
    match output {
        Some(path) => {
            let format = match format {
                Some(format) => format.into(),
                None => match MocFormat::from_path(path) {
                    Some(format) => format,
                    None => bail!(
                        "cannot infer a format from {}, use --format",
                        path.display()
                    ),
                },
            };
            io::write_file(moc, path, format)
                .with_context(|| format!("writing {}", path.display()))?;
            info!(path = %path.display(), "written");
        }
        None => {
            let format = format.map_or(MocFormat::Json, MocFormat::from);
            io::write(moc, std::io::stdout().lock(), format)?;
        }
    }
    Ok(())
}

fn print_info(moc: &Moc, cells: bool) {
    println!("Frame:        {}", moc.frame());
    println!(
        "Limit orders: [{}, {}]",
        moc.min_limit_order(),
        moc.max_limit_order()
    );
    match moc.max_order() {
        Some(order) => println!("Deepest:      {order}"),
        None => println!("Deepest:      - (empty)"),
    }
    println!("Cells:        {}", moc.n_cells());
    println!("Size:         {}", moc.size());
    println!(
        "Coverage:     {:.6}% ({:.4} deg²)",
        moc.coverage() * 100.0,
        moc.area_deg2()
    );
    if cells {
        print!("{}", moc.to_debug_string());
    }
}
