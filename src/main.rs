use std::path::PathBuf;

use anyhow::{Result, bail};
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use imgcrop::{
    client::{CropSession, HttpImageApi, ImageApi, NotificationLevel, SelectedFile},
    config::{ServerConfig, client_base_url},
    server,
};

#[derive(Parser)]
#[command(name = "imgcrop", about = "Square image crop and upload service")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the upload service (default)
    Serve,
    /// Crop an image to a centred square and upload it
    Upload {
        /// Image file to upload
        file: PathBuf,
        /// Side of the square crop in pixels (defaults to 80% of the shorter side)
        #[arg(long)]
        side: Option<u32>,
        /// Base URL of the upload service
        #[arg(long, env = "IMGCROP_SERVER_URL")]
        server: Option<String>,
    },
    /// Print the URL of the most recently uploaded image
    Latest {
        /// Base URL of the upload service
        #[arg(long, env = "IMGCROP_SERVER_URL")]
        server: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => {
            let config = ServerConfig::from_env();
            let listener = TcpListener::bind(config.bind_address()?).await?;
            server::serve(listener, &config).await?;
        }
        Commands::Upload { file, side, server } => {
            let api = HttpImageApi::new(client_base_url(server.as_deref())?);
            let mut session = CropSession::new(api);
            session.load().await;

            let selected = SelectedFile::from_path(&file).await?;
            if !session.drop_files(vec![selected]) {
                bail!("{} is not an image", file.display());
            }
            if !session.cropper_ready() {
                report(&mut session);
                bail!("could not open {} for cropping", file.display());
            }
            if let (Some(side), Some(widget)) = (side, session.cropper_mut()) {
                widget.resize_to(side);
            }
            let uploaded = session.confirm_upload().await;
            report(&mut session);
            if !uploaded {
                bail!("upload failed");
            }
            print_last_image(&session)?;
        }
        Commands::Latest { server } => {
            let api = HttpImageApi::new(client_base_url(server.as_deref())?);
            let mut session = CropSession::new(api);
            session.load().await;
            report(&mut session);
            print_last_image(&session)?;
        }
    }
    Ok(())
}

fn report<A: ImageApi>(session: &mut CropSession<A>) {
    for note in session.take_notifications() {
        match note.level {
            NotificationLevel::Success => eprintln!("{}", note.message),
            NotificationLevel::Error => eprintln!("error: {}", note.message),
        }
    }
}

fn print_last_image(session: &CropSession<HttpImageApi>) -> Result<()> {
    match session.last_image() {
        Some(record) => println!("{}", session.api().image_url(record)?),
        None => eprintln!("No images uploaded yet."),
    }
    Ok(())
}
