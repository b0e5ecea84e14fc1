use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use concord_core::persist::{open_or_create, save_snapshot, SnapshotPaths};
use concord_core::{ConcordError, Library};
use tracing_subscriber::{fmt, EnvFilter};
use walkdir::WalkDir;

use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "concord-indexer")]
#[command(about = "Load book text files into a concordance snapshot", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse and index every .txt file under the input path; each file stem becomes a book name
    Build {
        /// Input path (file or directory)
        #[arg(long)]
        input: String,
        /// Snapshot directory to create or extend
        #[arg(long)]
        output: String,
        /// Division for every book loaded in this run (torah, neviim, ketuvim)
        #[arg(long)]
        division: String,
    },
    /// Print statistics for one book, or for the whole snapshot
    Stats {
        /// Snapshot directory
        #[arg(long)]
        data: String,
        /// Book name; omit for corpus-wide statistics
        #[arg(long)]
        book: Option<String>,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Build { input, output, division } => build_snapshot(&input, &output, &division),
        Commands::Stats { data, book } => print_stats(&data, book.as_deref()),
    }
}

fn collect_files(input_path: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = Vec::new();
    if input_path.is_dir() {
        for entry in WalkDir::new(input_path).sort_by_file_name().into_iter().filter_map(|e| e.ok()) {
            let p = entry.path();
            if p.is_file() && p.extension().and_then(|s| s.to_str()) == Some("txt") {
                files.push(p.to_path_buf());
            }
        }
    } else if input_path.is_file() {
        files.push(input_path.to_path_buf());
    }
    files
}

fn build_snapshot(input: &str, output: &str, division: &str) -> Result<()> {
    let paths = SnapshotPaths::new(output);
    let library = open_or_create(&paths)?;

    let mut added = 0usize;
    for file in collect_files(Path::new(input)) {
        if load_book(&library, &file, division)? {
            added += 1;
        }
    }

    save_snapshot(&paths, &library)?;
    tracing::info!(output, added, books = library.list_book_names().len(), "snapshot build complete");
    Ok(())
}

/// Returns false when the book already exists in the snapshot.
fn load_book(library: &Library, file: &Path, division: &str) -> Result<bool> {
    let name = file
        .file_stem()
        .and_then(|s| s.to_str())
        .with_context(|| format!("file name of {} is not valid UTF-8", file.display()))?;
    let text = fs::read_to_string(file).with_context(|| format!("reading {}", file.display()))?;
    match library.add_book(&text, name, division) {
        Ok(doc) => {
            tracing::info!(book = %doc.name, chapters = doc.chapters.len(), words = doc.num_words(), "ingested book");
            Ok(true)
        }
        Err(ConcordError::DuplicateBook(name)) => {
            tracing::warn!(book = %name, "book already in snapshot, skipping");
            Ok(false)
        }
        Err(e) => Err(e).with_context(|| format!("loading {}", file.display())),
    }
}

fn print_stats(data: &str, book: Option<&str>) -> Result<()> {
    let library = open_or_create(&SnapshotPaths::new(data))?;
    let stats = library.get_book_stats(book)?;
    let general = library.get_general_stats();
    let out = serde_json::json!({ "general": general, "stats": stats });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}
