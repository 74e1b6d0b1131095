use std::{
    io::{self, Write},
    path::PathBuf,
    process,
};

use clap::{Parser, Subcommand};
use sparse_lines::{freshness, BuilderConfig, IndexBuilder, LineService};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[clap(version, about = "Serve lines of huge text files using a sparse line index")]
struct Opts {
    #[clap(subcommand)]
    command: Command,
}

#[derive(clap::Args)]
struct Files {
    /// The text file to serve
    #[clap(env = "FILE_TO_SERVE")]
    source: PathBuf,
    /// The index artifact of the text file
    #[clap(env = "CACHE_FILE_PATH")]
    cache: PathBuf,
}

#[derive(Subcommand)]
enum Command {
    /// Build the index artifact, unless it is newer than the text file
    Build {
        #[clap(flatten)]
        files: Files,
        /// Rebuild even if the artifact is up to date
        #[clap(long)]
        force: bool,
        /// Use a fixed index interval instead of deriving one from the file size
        #[clap(long)]
        interval: Option<usize>,
    },
    /// Print lines of the text file
    Get {
        #[clap(flatten)]
        files: Files,
        /// Lines to print (0-indexed)
        #[clap(required = true, allow_hyphen_values = true)]
        lines: Vec<i64>,
    },
    /// Print information about the index
    Info {
        #[clap(flatten)]
        files: Files,
    },
}

fn build(files: Files, force: bool, interval: Option<usize>) -> sparse_lines::Result<()> {
    if !force && freshness::is_fresh(&files.source, &files.cache)? {
        println!("Cache is already up-to-date.");
        return Ok(());
    }

    let mut config = BuilderConfig::default();
    if let Some(interval) = interval {
        config = config.fixed_interval(interval);
    }

    let mut builder = IndexBuilder::new(config).on_progress(|done, total| {
        if total > 0 {
            let percent = done as f64 / total as f64 * 100.0;
            eprint!("Indexing... {:.1}% complete\r", percent);
            let _ = io::stderr().flush();
        }
    });

    let index = builder.build(&files.source, &files.cache)?;
    eprintln!();
    println!(
        "Indexed {} lines using {} checkpoints (interval {}).",
        index.total_lines(),
        index.checkpoints(),
        index.index_interval()
    );
    Ok(())
}

async fn load(files: &Files) -> LineService {
    let service = LineService::new();
    if let Err(err) = service.load(&files.source, &files.cache).await {
        eprintln!("FATAL: {}", err);
        process::exit(1);
    }
    service
}

async fn get(files: Files, lines: Vec<i64>) -> sparse_lines::Result<()> {
    let service = load(&files).await;
    let total_lines = service.total_lines()?;

    let stdout = io::stdout();
    let mut stdout = stdout.lock();

    for line in lines {
        match service.get_line(line).await? {
            Some(text) => writeln!(stdout, "{}", text)?,
            None => eprintln!(
                "Error: Line index {} is out of bounds. File has {} lines (0-indexed).",
                line, total_lines
            ),
        }
    }

    Ok(())
}

async fn info(files: Files) -> sparse_lines::Result<()> {
    let service = load(&files).await;
    let index = service.resolver()?.index();

    println!("file_being_served: {}", files.source.display());
    println!("total_lines: {}", index.total_lines());
    println!("index_interval: {}", index.index_interval());
    println!("checkpoints: {}", index.checkpoints());
    Ok(())
}

#[async_std::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let opts = Opts::parse();

    let result = match opts.command {
        Command::Build {
            files,
            force,
            interval,
        } => build(files, force, interval),
        Command::Get { files, lines } => get(files, lines).await,
        Command::Info { files } => info(files).await,
    };

    if let Err(err) = result {
        eprintln!("Error: {}", err);
        process::exit(1);
    }
}
