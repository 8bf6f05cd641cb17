//! ucm CLI

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

use ucm::codec::FrameReader;
use ucm::config::{ByteOrder, Config};
use ucm::{Frame, HeaderItem};

#[derive(Parser)]
#[command(name = "ucm", version, about = "Inspect and rewrite ULTRACAM ucm frames")]
struct Cli {
    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// More logging (repeat for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show byte order, CCD/window layout and binning
    Info {
        /// Frame file
        file: PathBuf,
    },
    /// List header items
    Header {
        /// Frame file
        file: PathBuf,
        /// Only items directly under this directory
        #[arg(long)]
        dir: Option<String>,
    },
    /// Per-CCD pixel range
    Stats {
        /// Frame file
        file: PathBuf,
    },
    /// Re-encode a frame
    Convert {
        /// Input frame
        input: PathBuf,
        /// Output frame
        output: PathBuf,
        /// Byte order of the output
        #[arg(long, value_enum)]
        byte_order: Option<OrderArg>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum OrderArg {
    Native,
    Little,
    Big,
}

impl From<OrderArg> for ByteOrder {
    fn from(arg: OrderArg) -> Self {
        match arg {
            OrderArg::Native => ByteOrder::Native,
            OrderArg::Little => ByteOrder::Little,
            OrderArg::Big => ByteOrder::Big,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => Config::default(),
    };

    match cli.command {
        Command::Info { file } => show_info(&file, &config),
        Command::Header { file, dir } => show_header(&file, &config, dir.as_deref()),
        Command::Stats { file } => show_stats(&file, &config),
        Command::Convert {
            input,
            output,
            byte_order,
        } => {
            if let Some(order) = byte_order {
                config.output.byte_order = order.into();
            }
            convert(&input, &output, &config)
        }
    }
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn open(path: &Path, config: &Config) -> Result<Frame> {
    Frame::open_with(path, config).with_context(|| format!("reading {}", path.display()))
}

fn show_info(path: &Path, config: &Config) -> Result<()> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let reader = FrameReader::new(BufReader::new(file), config.limits.clone())
        .with_context(|| format!("reading {}", path.display()))?;
    let endian = reader.endian();
    let frame = reader
        .read_frame()
        .with_context(|| format!("reading {}", path.display()))?;

    println!("File:        {}", path.display());
    println!("Byte order:  {endian:?}");
    println!("Header:      {} items", frame.header().len());
    println!(
        "Binning:     {}x{}, total {}x{}",
        frame.xbin(),
        frame.ybin(),
        frame.nxtot(),
        frame.nytot()
    );
    println!("CCDs:        {}", frame.ccd_count());
    for (nc, ccd) in frame.ccds().iter().enumerate() {
        println!("  CCD {}: {} windows", nc + 1, ccd.len());
        for (nw, win) in ccd.windows().iter().enumerate() {
            println!(
                "    window {}: llx={} lly={} nx={} ny={}",
                nw + 1,
                win.llx(),
                win.lly(),
                win.nx(),
                win.ny()
            );
        }
    }
    Ok(())
}

fn show_header(path: &Path, config: &Config, dir: Option<&str>) -> Result<()> {
    let frame = open(path, config)?;
    let items: Vec<&HeaderItem> = match dir {
        Some(dir) => frame.header().children(dir).collect(),
        None => frame.header().items().collect(),
    };

    for item in items {
        let indent = "  ".repeat(item.depth());
        if item.type_tag() == ucm::TypeTag::Directory {
            println!("{indent}{}/  {}", item.leaf_name(), item.comment);
        } else {
            println!(
                "{indent}{} = {} ({})  {}",
                item.leaf_name(),
                item.value,
                item.type_tag(),
                item.comment
            );
        }
    }
    Ok(())
}

fn show_stats(path: &Path, config: &Config) -> Result<()> {
    let frame = open(path, config)?;
    for nc in 0..frame.ccd_count() {
        let min = frame.min(nc).unwrap_or_default();
        let max = frame.max(nc).unwrap_or_default();
        println!("CCD {}: min = {min}, max = {max}", nc + 1);
    }
    Ok(())
}

fn convert(input: &Path, output: &Path, config: &Config) -> Result<()> {
    let frame = open(input, config)?;
    let written = frame
        .save_with(output, config)
        .with_context(|| format!("writing {}", output.display()))?;
    info!("Wrote {}", written.display());
    println!("{}", written.display());
    Ok(())
}
