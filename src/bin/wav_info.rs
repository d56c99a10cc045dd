//! Print the parsed WAV header of one or more files.

use std::env;
use std::path::Path;
use std::process;

use wavscan::{logging, read_header, Config, StreamInput, WavHeader};

fn format_duration(micros: u64) -> String {
    let seconds = micros as f64 / 1_000_000.0;
    let mins = (seconds / 60.0) as u64;
    let secs = seconds % 60.0;
    format!("{:02}:{:06.3}", mins, secs)
}

fn print_header(path: &str, header: &WavHeader, verbose: bool) {
    let format = header.format();
    println!("{}:", path);
    println!("  Format:             {:?}", format.format_type());
    println!("  Channels:           {}", header.num_channels());
    println!("  Sample rate:        {} Hz", header.sample_rate_hz());
    println!("  Byte rate:          {} bytes/s", header.average_bytes_per_second());
    println!("  Block alignment:    {} bytes", header.block_alignment());
    println!("  Bits per sample:    {}", header.bits_per_sample());
    println!("  Data start:         {}", header.data_start_position());
    println!("  Data size:          {} bytes", header.data_size());
    if verbose {
        println!("  Bitrate:            {} bit/s", format.bitrate());
        println!("  Frames:             {}", header.frame_count());
        println!("  Duration:           {}", format_duration(header.duration_us()));
    }
}

/// Returns false if the file could not be scanned.
fn scan_file(path: &str, config: &Config, verbose: bool) -> bool {
    let mut input = match StreamInput::open(path, config) {
        Ok(input) => input,
        Err(e) => {
            eprintln!("Error opening {}: {}", path, e);
            return false;
        }
    };

    match read_header(&mut input) {
        Ok(Some(header)) => {
            print_header(path, &header, verbose);
            true
        }
        Ok(None) => {
            println!("{}: not a supported 16-bit PCM WAV file", path);
            true
        }
        Err(e) => {
            eprintln!("Error reading WAV header of {}: {}", path, e);
            false
        }
    }
}

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        print_usage();
        process::exit(1);
    }

    let mut files: Vec<String> = Vec::new();
    let mut verbose = false;
    let mut overrides = Config::new();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--chunk-size" => {
                if i + 1 < args.len() {
                    overrides.read_chunk_size = args[i + 1].parse().ok();
                    i += 1;
                }
            }
            "--log-level" => {
                if i + 1 < args.len() {
                    overrides.log_level = Some(args[i + 1].clone());
                    i += 1;
                }
            }
            "--verbose" | "-v" => verbose = true,
            "--help" | "-h" => {
                print_usage();
                process::exit(0);
            }
            arg => {
                if arg.starts_with("--") {
                    eprintln!("Unknown option: {}", arg);
                    process::exit(1);
                }
                files.push(arg.to_string());
            }
        }
        i += 1;
    }

    if files.is_empty() {
        eprintln!("Error: No WAV file specified");
        print_usage();
        process::exit(1);
    }

    let mut config = Config::load().unwrap_or_else(|e| {
        eprintln!("Warning: ignoring saved defaults: {}", e);
        Config::new()
    });
    config.merge(&overrides);

    if let Err(e) = logging::init(&config) {
        eprintln!("Warning: logging disabled: {}", e);
    }

    let mut failures = 0;
    for file in &files {
        if !Path::new(file).exists() {
            eprintln!("Error: File not found: {}", file);
            failures += 1;
            continue;
        }
        if !scan_file(file, &config, verbose) {
            failures += 1;
        }
    }

    if failures > 0 {
        process::exit(1);
    }
}

fn print_usage() {
    println!("wav_info - Show the header of 16-bit PCM WAV files");
    println!();
    println!("USAGE:");
    println!("    wav_info [OPTIONS] FILE...");
    println!();
    println!("OPTIONS:");
    println!("    --chunk-size <BYTES>   Bytes read from the file per request (default: 8192)");
    println!("    --log-level <FILTER>   Log filter when RUST_LOG is unset (default: info)");
    println!("    -v, --verbose          Also show bitrate, frame count and duration");
    println!("    -h, --help             Show this help");
    println!();
    println!("Defaults are read from ~/.state/wavscan/defaults.toml");
}
