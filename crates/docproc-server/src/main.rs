//! HTTP service for the document processing pipeline.

mod api;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

use docproc_core::store::{DocumentStore, FsObjectStore, MemoryStore, SqliteStore};
use docproc_core::{
    LinkVerifier, PdfiumRasterizer, Processor, ProcessorContext, PureOcrBackend,
};

use api::AppState;

/// Document processor - extract and validate structured data from scanned invoices
#[derive(Parser)]
#[command(name = "docproc")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP service
    Serve(ServeArgs),
}

#[derive(Args)]
struct ServeArgs {
    /// Bind address
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Bind port
    #[arg(long, default_value_t = 8080)]
    port: u16,

    /// Root directory of the object store (buckets are subdirectories)
    #[arg(long)]
    objects_root: PathBuf,

    /// SQLite store path; an in-memory store is used if omitted
    #[arg(long)]
    store_path: Option<PathBuf>,

    /// Directory with OCR model files (det.onnx, latin_rec.onnx, latin_dict.txt)
    #[arg(long)]
    ocr_models: PathBuf,

    /// Timeout for each link-verification fetch, in seconds
    #[arg(long, default_value_t = 10)]
    link_timeout_secs: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Serve(args) => serve(args).await,
    }
}

async fn serve(args: ServeArgs) -> anyhow::Result<()> {
    let store: Arc<dyn DocumentStore> = match &args.store_path {
        Some(path) => Arc::new(SqliteStore::open(path)?),
        None => Arc::new(MemoryStore::new()),
    };

    let ctx = ProcessorContext {
        objects: Arc::new(FsObjectStore::new(&args.objects_root)),
        store: store.clone(),
        rasterizer: Arc::new(PdfiumRasterizer::new()?),
        ocr: Arc::new(PureOcrBackend::from_dir(&args.ocr_models)?),
        verifier: LinkVerifier::with_timeout(Duration::from_secs(args.link_timeout_secs)),
    };

    let state = AppState {
        processor: Arc::new(Processor::new(Arc::new(ctx))),
        store,
    };

    let addr = format!("{}:{}", args.host, args.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(addr = %addr, "docproc service listening");

    axum::serve(listener, api::router(state)).await?;
    Ok(())
}
