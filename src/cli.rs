// Idiomatic Rust CLI for Deltacol.
//
// Inspection-first tooling: disassemble and expand encoded columns, and
// pack simple value streams into columns for experimentation.

use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use clap::{ArgAction, Args, Parser, Subcommand};

use crate::column::{Column, ColumnBuilder, Scalar, disassemble};

const BYTES_PER_ROW: usize = 16;

// ---------------------------------------------------------------------------
// Clap CLI definition
// ---------------------------------------------------------------------------

/// Columnar delta codec inspector.
#[derive(Parser, Debug)]
#[command(
    name = "deltacol",
    version,
    about = "Columnar delta codec encoder/inspector",
    arg_required_else_help = true
)]
struct Cli {
    #[command(subcommand)]
    command: Cmd,

    /// Quiet mode (suppress non-error output).
    #[arg(short = 'q', long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Verbose mode (use multiple times for more detail).
    #[arg(short = 'v', long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Output stats as JSON to stderr.
    #[arg(long = "json", global = true)]
    json_output: bool,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Print framing details, instruction disassembly and a hex dump.
    Inspect(InspectArgs),
    /// Print the decoded (index, value) pairs.
    Expand(ExpandArgs),
    /// Pack a text stream of values into an encoded column.
    Pack(PackArgs),
}

#[derive(Args, Debug)]
struct InspectArgs {
    /// Encoded column file.
    input: PathBuf,
}

#[derive(Args, Debug)]
struct ExpandArgs {
    /// Encoded column file.
    input: PathBuf,
}

#[derive(Args, Debug)]
struct PackArgs {
    /// Text file with one entry per line: `value` or `index:value`.
    input: PathBuf,

    /// Output file for the encoded column.
    output: PathBuf,

    /// Column name stored in the framing.
    #[arg(long, default_value = "col")]
    name: String,
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Run the CLI. Exits the process on failure.
pub fn run() {
    let cli = Cli::parse();

    let default_filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();
    let result = match &cli.command {
        Cmd::Inspect(args) => cmd_inspect(&cli, args),
        Cmd::Expand(args) => cmd_expand(&cli, args),
        Cmd::Pack(args) => cmd_pack(&cli, args),
    };

    if let Err(msg) = result {
        eprintln!("deltacol: {msg}");
        process::exit(2);
    }
}

fn read_input(path: &Path) -> Result<Vec<u8>, String> {
    fs::read(path).map_err(|e| format!("{}: {e}", path.display()))
}

// ---------------------------------------------------------------------------
// inspect
// ---------------------------------------------------------------------------

fn cmd_inspect(cli: &Cli, args: &InspectArgs) -> Result<(), String> {
    let bytes = read_input(&args.input)?;
    let column = Column::parse(&bytes).map_err(|e| e.to_string())?;

    let num_values = column.num_values().map_err(|e| e.to_string())?;
    let expanded: u64 = {
        let mut total = 0u64;
        for item in column.iter() {
            let (_, value) = item.map_err(|e| e.to_string())?;
            total += value.size() as u64;
        }
        total
    };
    let compressed = column.body().len() as u64;
    let factor = if compressed > 0 {
        expanded as f64 / compressed as f64
    } else {
        0.0
    };

    if cli.json_output {
        let json = serde_json::json!({
            "name": column.name(),
            "num_values": num_values,
            "compressed_bytes": compressed,
            "expanded_bytes": expanded,
            "factor": factor,
        });
        eprintln!("{}", serde_json::to_string_pretty(&json).unwrap());
    }

    if !cli.quiet {
        println!("name:       {}", column.name());
        println!("values:     {num_values}");
        println!("compressed: {compressed} bytes");
        println!("expanded:   {expanded} bytes");
        println!("factor:     {factor:.2}");
        println!(
            "disassembly: {}",
            disassemble(column.body()).map_err(|e| e.to_string())?
        );
        println!("hex:");
        print!("{}", hexdump(column.body()));
    }
    log::info!("inspected {}", args.input.display());
    Ok(())
}

// ---------------------------------------------------------------------------
// expand
// ---------------------------------------------------------------------------

fn cmd_expand(cli: &Cli, args: &ExpandArgs) -> Result<(), String> {
    let bytes = read_input(&args.input)?;
    let column = Column::parse(&bytes).map_err(|e| e.to_string())?;
    let mut count = 0u64;
    for item in column.iter() {
        let (index, value) = item.map_err(|e| e.to_string())?;
        if !cli.quiet {
            println!("{index}: {value}");
        }
        count += 1;
    }
    if cli.json_output {
        let json = serde_json::json!({ "name": column.name(), "num_values": count });
        eprintln!("{}", serde_json::to_string_pretty(&json).unwrap());
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// pack
// ---------------------------------------------------------------------------

fn parse_line(line: &str, next_index: u64) -> Result<(u64, Scalar), String> {
    let (index, value) = match line.split_once(':') {
        Some((i, v)) => {
            let index = i
                .trim()
                .parse::<u64>()
                .map_err(|e| format!("bad index '{i}': {e}"))?;
            (index, v.trim())
        }
        None => (next_index, line),
    };
    let scalar = if let Ok(int) = value.parse::<i64>() {
        Scalar::int64(int)
    } else {
        let double = value
            .parse::<f64>()
            .map_err(|e| format!("bad value '{value}': {e}"))?;
        Scalar::double(double)
    };
    Ok((index, scalar))
}

fn cmd_pack(cli: &Cli, args: &PackArgs) -> Result<(), String> {
    let text = fs::read_to_string(&args.input)
        .map_err(|e| format!("{}: {e}", args.input.display()))?;

    let mut out = Vec::new();
    let mut builder = ColumnBuilder::new(&mut out, &args.name);
    let mut count = 0u64;
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let (index, scalar) = parse_line(line, builder.next_index())?;
        builder.append(index, &scalar).map_err(|e| e.to_string())?;
        count += 1;
    }
    let encoded = builder.finish().to_vec();
    fs::write(&args.output, &encoded).map_err(|e| format!("{}: {e}", args.output.display()))?;

    if cli.json_output {
        let json = serde_json::json!({
            "name": args.name,
            "num_values": count,
            "encoded_bytes": encoded.len(),
        });
        eprintln!("{}", serde_json::to_string_pretty(&json).unwrap());
    }
    if !cli.quiet {
        println!(
            "packed {count} values into {} ({} bytes)",
            args.output.display(),
            encoded.len()
        );
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Hex dump
// ---------------------------------------------------------------------------

fn hexdump(data: &[u8]) -> String {
    let mut out = String::new();
    for (row, chunk) in data.chunks(BYTES_PER_ROW).enumerate() {
        out.push_str(&format!("{:08x}  ", row * BYTES_PER_ROW));
        for byte in chunk {
            out.push_str(&format!("{byte:02x} "));
        }
        out.push('\n');
    }
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
