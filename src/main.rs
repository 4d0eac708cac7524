//! region-info: inspect Minecraft region files.
//!
//! Prints which chunks a region file contains and, with `--decode`,
//! checks that every chunk can be decoded.

use std::path::{Path, PathBuf};

use clap::Parser;
use rayon::prelude::*;
use serde::Serialize;

use anvil_region_reader::{ChunkPos, ChunkStatus, NbtChunk, PayloadMode, RegionFile};

#[derive(Parser)]
#[command(name = "region-info", about = "Inspect Minecraft Anvil region files")]
pub struct Args {
    /// Region files to inspect (r.<x>.<z>.mca)
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Load the full file and decode every chunk
    #[arg(short, long, env = "REGION_DECODE")]
    pub decode: bool,

    /// Pass stored payloads to the decoder without decompressing them
    #[arg(long, env = "REGION_RAW")]
    pub raw: bool,

    /// List every chunk with its timestamp
    #[arg(short, long)]
    pub timestamps: bool,

    /// Print a JSON report instead of text
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Default, Serialize)]
struct DecodeSummary {
    ok: usize,
    invalid: usize,
    decode_errors: usize,
}

#[derive(Debug, Serialize)]
struct ChunkEntry {
    x: i32,
    z: i32,
    timestamp: u32,
}

#[derive(Debug, Serialize)]
struct RegionReport {
    file: PathBuf,
    region_x: i32,
    region_z: i32,
    chunks: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    entries: Option<Vec<ChunkEntry>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    decode: Option<DecodeSummary>,
}

fn inspect(path: &Path, args: &Args) -> anyhow::Result<RegionReport> {
    let mode = if args.raw { PayloadMode::Raw } else { PayloadMode::Decompress };
    let mut region = RegionFile::open(path)?.with_payload_mode(mode);

    if args.decode {
        region.load_all()?;
    } else {
        region.load_headers()?;
    }

    let entries = args.timestamps.then(|| {
        region
            .present_chunks()
            .iter()
            .map(|pos| ChunkEntry { x: pos.x, z: pos.z, timestamp: region.chunk_timestamp(*pos) })
            .collect()
    });

    let decode = args.decode.then(|| decode_all(&region));

    Ok(RegionReport {
        file: path.to_path_buf(),
        region_x: region.position().x,
        region_z: region.position().z,
        chunks: region.chunk_count(),
        entries,
        decode,
    })
}

fn decode_all(region: &RegionFile) -> DecodeSummary {
    let positions: Vec<ChunkPos> = region.present_chunks().iter().copied().collect();
    let statuses: Vec<ChunkStatus> = positions
        .par_iter()
        .map(|pos| region.load_chunk(*pos, &mut NbtChunk::new()))
        .collect();

    let mut summary = DecodeSummary::default();
    for status in statuses {
        match status {
            ChunkStatus::Ok => summary.ok += 1,
            ChunkStatus::Invalid => summary.invalid += 1,
            ChunkStatus::DecodeError { .. } => summary.decode_errors += 1,
            // Positions come from the present set.
            ChunkStatus::DoesNotExist => {}
        }
    }
    summary
}

fn print_text(report: &RegionReport) {
    println!(
        "{} (region {}:{}): {} chunks",
        report.file.display(),
        report.region_x,
        report.region_z,
        report.chunks
    );
    if let Some(entries) = &report.entries {
        for entry in entries {
            println!("  chunk {}:{} timestamp {}", entry.x, entry.z, entry.timestamp);
        }
    }
    if let Some(decode) = &report.decode {
        println!(
            "  decoded: {} ok, {} invalid, {} nbt errors",
            decode.ok, decode.invalid, decode.decode_errors
        );
    }
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    let mut reports = Vec::new();
    let mut failed = 0;
    for path in &args.files {
        log::info!("Inspecting {}", path.display());
        match inspect(path, &args) {
            Ok(report) => {
                if !args.json {
                    print_text(&report);
                }
                reports.push(report);
            }
            Err(e) => {
                log::error!("Skipping {}: {:#}", path.display(), e);
                failed += 1;
            }
        }
    }

    if args.json {
        match serde_json::to_string_pretty(&reports) {
            Ok(json) => println!("{}", json),
            Err(e) => log::error!("Failed to serialize report: {}", e),
        }
    }

    if failed > 0 {
        std::process::exit(1);
    }
}
