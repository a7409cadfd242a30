// Command line for tblcodec.
//
//   tblcodec -d <table> <input.bin> [output.txt]
//   tblcodec -e <table> <input.txt> [output.bin]
//
// Exactly one mode flag is required. Without an explicit output the result
// goes to `<input stem>_out.txt` / `<input stem>_out.bin` in the working
// directory. Encoding keeps a line cache between runs.

use std::path::{Path, PathBuf};
use std::process;

use clap::{ArgAction, ArgGroup, Parser, ValueHint};

use crate::engine::{DEFAULT_MAX_INPUT_LEN, DecodeOptions, OversizePolicy};
use crate::io::{self, DecodeStats, EncodeStats, IoError};

/// Cache file used when `--cache` is not given.
pub const DEFAULT_CACHE_FILE: &str = "tblcodec_cache.db";

// ---------------------------------------------------------------------------
// Byte size parsing (supports K, M, G suffixes)
// ---------------------------------------------------------------------------

fn parse_byte_size(s: &str) -> Result<u64, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty size string".into());
    }
    let (num_part, multiplier) = match s.as_bytes().last() {
        Some(b'k' | b'K') => (&s[..s.len() - 1], 1024u64),
        Some(b'm' | b'M') => (&s[..s.len() - 1], 1024 * 1024),
        Some(b'g' | b'G') => (&s[..s.len() - 1], 1024 * 1024 * 1024),
        _ => (s, 1u64),
    };
    let num: u64 = num_part
        .trim()
        .parse()
        .map_err(|e| format!("invalid size '{s}': {e}"))?;
    num.checked_mul(multiplier)
        .ok_or_else(|| format!("size overflow: '{s}'"))
}

// ---------------------------------------------------------------------------
// Clap CLI definition
// ---------------------------------------------------------------------------

/// Table-driven binary/text codec.
#[derive(Parser, Debug)]
#[command(
    name = "tblcodec",
    version,
    about = "Decode binary scripts to text and encode them back using a translation table",
    arg_required_else_help = true
)]
#[command(group(ArgGroup::new("mode").required(true).args(["decode", "encode"])))]
struct Cli {
    /// Decode a binary file into text.
    #[arg(short = 'd', long)]
    decode: bool,

    /// Encode a text file into binary.
    #[arg(short = 'e', long)]
    encode: bool,

    /// Translation table (`<hex>=<text>` per line).
    #[arg(value_hint = ValueHint::FilePath)]
    table: PathBuf,

    /// Input file.
    #[arg(value_hint = ValueHint::FilePath)]
    input: PathBuf,

    /// Output file (default: `<input stem>_out.txt` or `_out.bin`).
    #[arg(value_hint = ValueHint::FilePath)]
    output: Option<PathBuf>,

    /// Line cache file used when encoding.
    #[arg(long, value_hint = ValueHint::FilePath, default_value = DEFAULT_CACHE_FILE)]
    cache: PathBuf,

    /// Encode without reading or writing the line cache.
    #[arg(long = "no-cache")]
    no_cache: bool,

    /// Largest binary input decoded (supports K/M/G suffix).
    #[arg(long = "max-input-size", value_parser = parse_byte_size, default_value_t = DEFAULT_MAX_INPUT_LEN as u64)]
    max_input_size: u64,

    /// Fail instead of truncating inputs over the size limit.
    #[arg(long = "reject-oversize")]
    reject_oversize: bool,

    /// Quiet mode (suppress non-error output).
    #[arg(short = 'q', long, conflicts_with = "verbose")]
    quiet: bool,

    /// Verbose mode (use multiple times for more detail).
    #[arg(short = 'v', long, action = ArgAction::Count)]
    verbose: u8,

    /// Output stats as JSON to stderr.
    #[arg(long = "json")]
    json_output: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Decode,
    Encode,
}

#[derive(Debug)]
struct Options {
    command: Command,
    table_file: PathBuf,
    input_file: PathBuf,
    output_file: PathBuf,
    cache_file: Option<PathBuf>,
    decode: DecodeOptions,
    quiet: bool,
    verbose: u8,
    json_output: bool,
}

fn default_output_path(input: &Path, command: Command) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    let ext = match command {
        Command::Decode => "txt",
        Command::Encode => "bin",
    };
    PathBuf::from(format!("{stem}_out.{ext}"))
}

fn resolve_options(cli: Cli) -> Options {
    let command = if cli.decode {
        Command::Decode
    } else {
        Command::Encode
    };
    let output_file = cli
        .output
        .unwrap_or_else(|| default_output_path(&cli.input, command));

    Options {
        command,
        table_file: cli.table,
        input_file: cli.input,
        output_file,
        cache_file: (!cli.no_cache).then_some(cli.cache),
        decode: DecodeOptions {
            max_input_len: usize::try_from(cli.max_input_size).unwrap_or(usize::MAX),
            oversize: if cli.reject_oversize {
                OversizePolicy::Reject
            } else {
                OversizePolicy::Truncate
            },
        },
        quiet: cli.quiet,
        verbose: cli.verbose.min(2),
        json_output: cli.json_output,
    }
}

#[cfg(any(test, feature = "fuzzing"))]
pub fn fuzz_try_parse_args(args: &[String]) {
    let argv: Vec<String> = std::iter::once("tblcodec".to_string())
        .chain(args.iter().cloned())
        .collect();
    if let Ok(cli) = Cli::try_parse_from(argv) {
        let _ = resolve_options(cli);
    }
}

fn log_filter(quiet: bool, verbose: u8) -> &'static str {
    match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, _) => "debug",
    }
}

fn sha256_hex(digest: &[u8; 32]) -> String {
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

fn report_error(e: &IoError) {
    eprintln!("tblcodec: {e}");
    if let IoError::Encode(encode_err) = e {
        eprintln!("{}", encode_err.caret_diagnostic());
    }
}

// ---------------------------------------------------------------------------
// Decode command
// ---------------------------------------------------------------------------

fn cmd_decode(opts: &Options) -> i32 {
    let codec = match io::load_codec(&opts.table_file) {
        Ok(c) => c,
        Err(e) => {
            report_error(&e);
            return 1;
        }
    };

    let stats = match io::decode_file(&codec, &opts.input_file, &opts.output_file, &opts.decode) {
        Ok(stats) => stats,
        Err(e) => {
            report_error(&e);
            return 1;
        }
    };

    print_decode_report(opts, &stats);
    0
}

fn print_decode_report(opts: &Options, stats: &DecodeStats) {
    if opts.verbose > 0 && !opts.quiet {
        eprintln!(
            "tblcodec: decoder: input size: {}, decoded: {}, entries: {}, output size: {}",
            stats.input_size, stats.decoded_size, stats.entries_matched, stats.output_size
        );
    }
    if !opts.quiet {
        println!("Written as {}", opts.output_file.display());
    }
    if opts.json_output {
        let json = serde_json::json!({
            "command": "decode",
            "input_size": stats.input_size,
            "decoded_size": stats.decoded_size,
            "truncated_bytes": stats.truncated_bytes,
            "entries_matched": stats.entries_matched,
            "output_size": stats.output_size,
            "output_sha256": sha256_hex(&stats.output_sha256),
        });
        eprintln!("{json:#}");
    }
}

// ---------------------------------------------------------------------------
// Encode command
// ---------------------------------------------------------------------------

fn cmd_encode(opts: &Options) -> i32 {
    let codec = match io::load_codec(&opts.table_file) {
        Ok(c) => c,
        Err(e) => {
            report_error(&e);
            return 1;
        }
    };

    let mut cache = io::load_cache(opts.cache_file.as_deref());

    let stats = match io::encode_file(&codec, &opts.input_file, &opts.output_file, &mut cache) {
        Ok(stats) => stats,
        Err(e) => {
            report_error(&e);
            return 1;
        }
    };

    let cache_saved = opts
        .cache_file
        .as_deref()
        .map(|path| io::store_cache(&cache, path));

    print_encode_report(opts, &stats, cache_saved);
    0
}

fn print_encode_report(opts: &Options, stats: &EncodeStats, cache_saved: Option<bool>) {
    if opts.verbose > 0 && !opts.quiet {
        eprintln!(
            "tblcodec: encoder: lines: {}, fresh: {}, cached: {}, output size: {}",
            stats.lines, stats.fresh_lines, stats.cached_lines, stats.output_size
        );
    }
    if !opts.quiet {
        if stats.fresh_lines > 0 {
            println!("Found {} changed lines.", stats.fresh_lines);
        }
        println!("Written as {}", opts.output_file.display());
    }
    if opts.json_output {
        let json = serde_json::json!({
            "command": "encode",
            "lines": stats.lines,
            "fresh_lines": stats.fresh_lines,
            "cached_lines": stats.cached_lines,
            "output_size": stats.output_size,
            "output_sha256": sha256_hex(&stats.output_sha256),
            "cache": opts.cache_file.as_ref().map(|p| p.display().to_string()),
            "cache_saved": cache_saved,
        });
        eprintln!("{json:#}");
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Main CLI entry point. Parses arguments via clap, dispatches commands.
pub fn run() -> ! {
    let cli = Cli::parse();
    let opts = resolve_options(cli);

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(log_filter(opts.quiet, opts.verbose)),
    )
    .format_timestamp(None)
    .format_target(false)
    .init();

    let exit_code = match opts.command {
        Command::Decode => cmd_decode(&opts),
        Command::Encode => cmd_encode(&opts),
    };

    process::exit(exit_code);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
