use std::io::Read;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use docsmith::config::Config;
use docsmith::models::ResolvedImage;
use docsmith::workspace::Workspace;
use docsmith::{api, codec, resolver};

#[derive(Parser)]
#[command(name = "docsmith")]
#[command(about = "Turn structured documents into polished articles")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Port for HTTP API (overrides DOCSMITH_PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Convert Markdown into document blocks and print them as JSON
    Blocks {
        /// Markdown file; reads stdin when omitted
        file: Option<PathBuf>,
    },
    /// Resolve image placeholders in an article against local image files
    Render {
        /// Article Markdown file
        #[arg(short, long)]
        article: PathBuf,

        /// Image files in placeholder order (image_1, image_2, ...)
        #[arg(short, long = "image")]
        images: Vec<PathBuf>,
    },
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "docsmith=debug,tower_http=debug".into()),
    );

    // stdout stays clean for the JSON/Markdown printed by the offline commands
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn serve(port: Option<u16>) -> anyhow::Result<()> {
    let mut config = Config::from_env()?;
    if let Some(port) = port {
        config = config.with_port(port);
    }

    let workspace = Workspace::from_config(&config);
    let app = api::create_router(workspace, config.security.clone());

    let addr = config.listen_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(
        provider = ?config.generator.provider,
        model = %config.generator.model,
        "docsmith server listening on http://{}",
        addr
    );

    axum::serve(listener, app).await?;
    Ok(())
}

fn read_input(file: Option<PathBuf>) -> anyhow::Result<String> {
    match file {
        Some(path) => std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display())),
        None => {
            let mut input = String::new();
            std::io::stdin()
                .read_to_string(&mut input)
                .context("Failed to read stdin")?;
            Ok(input)
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    match cli.command {
        Some(Commands::Serve { port }) => serve(port).await?,
        Some(Commands::Blocks { file }) => {
            let markdown = read_input(file)?;
            let blocks = codec::markdown_to_blocks(&markdown);
            println!("{}", serde_json::to_string_pretty(&blocks)?);
        }
        Some(Commands::Render { article, images }) => {
            let markdown = read_input(Some(article))?;
            let images = images
                .iter()
                .map(|path| {
                    ResolvedImage::from_file(path)
                        .with_context(|| format!("Failed to read image {}", path.display()))
                })
                .collect::<anyhow::Result<Vec<_>>>()?;
            println!("{}", resolver::resolve_placeholders(&markdown, &images));
        }
        None => serve(None).await?,
    }

    Ok(())
}
