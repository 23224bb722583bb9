use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mavgen::{contracts_to_json, decode_to_json, encode_payload, Payload};
use mavgen_compiler::error::MavgenError;
use mavgen_compiler::{compile, compile_dialect_to_rust, CompiledDialect, CompilerConfig};
use mavgen_schema::Dialect;

#[derive(Parser)]
#[command(name = "mavgen")]
#[command(about = "Compile MAVLink dialects into wire contracts, CRC tables and Rust constants", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Inputs shared by every subcommand.
#[derive(clap::Args)]
struct DialectArgs {
    /// Root dialect (JSON)
    #[arg(short, long)]
    root: PathBuf,

    /// Dialects the root may include, directly or transitively (JSON)
    #[arg(short, long)]
    include: Vec<PathBuf>,

    /// Compiler configuration (JSON); defaults apply when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a dialect tree and write its contracts as JSON
    Compile {
        #[command(flatten)]
        dialects: DialectArgs,

        /// Output `.json` file (if omitted, prints to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the `id name crc_extra base_length total_length` table
    Crc {
        #[command(flatten)]
        dialects: DialectArgs,
    },

    /// Generate a Rust constants module for the compiled dialect
    GenRust {
        #[command(flatten)]
        dialects: DialectArgs,

        /// Output `.rs` file (if omitted, prints to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Decode a hex payload of message `id` to JSON
    Decode {
        #[command(flatten)]
        dialects: DialectArgs,

        #[arg(long)]
        id: u32,

        /// Payload bytes as hex, e.g. `0403020102035104`
        #[arg(long)]
        hex: String,
    },

    /// Encode a JSON object of field values as a hex payload of message `id`
    Encode {
        #[command(flatten)]
        dialects: DialectArgs,

        #[arg(long)]
        id: u32,

        /// Field values, e.g. `{"type": 2, "custom_mode": 5}`
        #[arg(long)]
        json: String,
    },
}

fn read_dialect(path: &Path) -> Result<Dialect, MavgenError> {
    let text = fs::read_to_string(path)?;
    let dialect: Dialect = serde_json::from_str(&text)?;
    debug!(path = %path.display(), dialect = %dialect.name, "loaded dialect");
    Ok(dialect)
}

fn load(args: &DialectArgs) -> Result<(CompiledDialect, CompilerConfig), MavgenError> {
    let config = match &args.config {
        Some(path) => CompilerConfig::load(path)?,
        None => CompilerConfig::default(),
    };
    let root = read_dialect(&args.root)?;
    let included = args
        .include
        .iter()
        .map(|path| read_dialect(path))
        .collect::<Result<Vec<_>, _>>()?;
    let compiled = compile(&root, &included, &config)?;
    Ok((compiled, config))
}

fn parse_hex(text: &str) -> Result<Vec<u8>, MavgenError> {
    let digits: Vec<char> = text.chars().filter(|c| !c.is_whitespace()).collect();
    if digits.len() % 2 != 0 {
        return Err(MavgenError::DecodeError("hex payload has an odd number of digits".to_string()));
    }
    digits
        .chunks(2)
        .map(|pair| {
            let byte: String = pair.iter().collect();
            u8::from_str_radix(&byte, 16)
                .map_err(|_| MavgenError::DecodeError(format!("invalid hex byte {:?}", byte)))
        })
        .collect()
}

fn emit(output: &Option<PathBuf>, text: &str, what: &str) -> Result<(), MavgenError> {
    match output {
        Some(path) => {
            fs::write(path, text)?;
            info!(path = %path.display(), "{} written", what);
        }
        None => println!("{}", text),
    }
    Ok(())
}

fn main() -> Result<(), MavgenError> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Compile { dialects, output } => {
            let (compiled, _) = load(dialects)?;
            let json = contracts_to_json(&compiled)?;
            emit(output, &json, "contracts")
        }

        Commands::Crc { dialects } => {
            let (compiled, _) = load(dialects)?;
            for contract in compiled.contracts.values() {
                println!(
                    "{:>8} {:<40} {:>3} {:>3} {:>3}",
                    contract.id(),
                    contract.name(),
                    contract.crc_extra(),
                    contract.base_length(),
                    contract.total_length()
                );
            }
            Ok(())
        }

        Commands::GenRust { dialects, output } => {
            let (compiled, _) = load(dialects)?;
            let rust_code = compile_dialect_to_rust(&compiled)?;
            emit(output, &rust_code, "Rust constants")
        }

        Commands::Decode { dialects, id, hex } => {
            let (compiled, _) = load(dialects)?;
            let bytes = parse_hex(hex)?;
            println!("{}", decode_to_json(&compiled, *id, &bytes)?);
            Ok(())
        }

        Commands::Encode { dialects, id, json } => {
            let (compiled, config) = load(dialects)?;
            let contract = compiled
                .contract(*id)
                .ok_or_else(|| MavgenError::EncodeError(format!("unknown message id {}", id)))?;
            let payload: Payload = serde_json::from_str(json)?;
            let bytes = encode_payload(contract, &payload, config.truncate_extensions)?;
            let hex: String = bytes.iter().map(|b| format!("{:02x}", b)).collect();
            println!("{}", hex);
            Ok(())
        }
    }
}
