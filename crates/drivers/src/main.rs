mod config;
mod logging;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use config::{AppConfig, GlobalArgs};
use photoflow_adapters::{
    present_bitmap, present_entry, present_metadata, present_payload, thumbnail_jpeg,
    ImageCrateDecoder, NewImage, SqliteImageStore,
};
use photoflow_application::{
    FetchDataCommand, FetchImageCommand, FetchMetadataCommand, ImageManager,
    ListImagesCommand,
};
use photoflow_domain::{ImageHash, ImageId, ImageVariant};
use thiserror::Error;
use tracing::{debug, error};

#[derive(Debug, Parser)]
#[command(
    name = "photoflow",
    version,
    about = "Browse a photo catalog with look-alike shots grouped together"
)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Create the catalog database if it does not exist yet.
    Init,
    /// Add an image file to the catalog.
    Import {
        file: PathBuf,
        /// Precomputed perceptual hash, 16 hex digits.
        #[arg(long)]
        hash: ImageHash,
        /// Store the image without a generated thumbnail.
        #[arg(long)]
        no_thumbnail: bool,
    },
    /// Print the catalog with look-alike neighbours grouped.
    List {
        #[arg(long)]
        json: bool,
    },
    /// Fetch the raw payload of an image.
    Data {
        image_id: i64,
        #[arg(long)]
        thumbnail: bool,
        /// Write the payload to this file instead of printing its size.
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Decode an image and print its metadata.
    Metadata { image_id: i64 },
    /// Decode an image into a bitmap.
    Image {
        image_id: i64,
        #[arg(long)]
        thumbnail: bool,
    },
}

#[derive(Debug, Error)]
enum CommandError {
    #[error("{0}")]
    Usage(String),
    #[error("{0}")]
    Runtime(String),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = AppConfig::from_args(&cli.global);

    if let Err(message) = logging::init_logging(&config.log_level) {
        eprintln!("{message}");
        return ExitCode::from(2);
    }

    let store = SqliteImageStore::new(config.catalog_path.clone());
    if let Err(error) = store.initialize() {
        error!(%error, "catalog bootstrap failed");
        eprintln!("failed to bootstrap photoflow: {error}");
        return ExitCode::from(1);
    }

    match run_command(cli.command, store, &config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(CommandError::Usage(msg)) => {
            eprintln!("{msg}");
            ExitCode::from(2)
        }
        Err(CommandError::Runtime(msg)) => {
            eprintln!("{msg}");
            ExitCode::from(1)
        }
    }
}

fn build_image_manager(
    store: SqliteImageStore,
    config: &AppConfig,
) -> Result<ImageManager, CommandError> {
    ImageManager::new(
        Arc::new(store),
        Arc::new(ImageCrateDecoder),
        config.manager_config(),
    )
    .map_err(|error| CommandError::Runtime(format!("failed to start image manager: {error}")))
}

fn parse_image_id(value: i64) -> Result<ImageId, CommandError> {
    ImageId::new(value).map_err(|error| CommandError::Usage(format!("invalid image id: {error}")))
}

async fn run_command(
    command: Command,
    store: SqliteImageStore,
    config: &AppConfig,
) -> Result<(), CommandError> {
    debug!(?command, catalog = %config.catalog_path.display(), "running command");
    match command {
        Command::Init => {
            println!("catalog ready at {}", store.path().display());
            Ok(())
        }
        Command::Import {
            file,
            hash,
            no_thumbnail,
        } => {
            let data = std::fs::read(&file).map_err(|error| {
                CommandError::Runtime(format!("failed to read {}: {error}", file.display()))
            })?;
            let thumbnail_data = if no_thumbnail {
                None
            } else {
                Some(thumbnail_jpeg(&data).map_err(|error| {
                    CommandError::Runtime(format!("import failed: {error}"))
                })?)
            };
            let file_name = file
                .file_name()
                .map(|name| name.to_string_lossy().to_string())
                .unwrap_or_else(|| file.display().to_string());

            let image_id = store
                .insert_image(&NewImage {
                    file_name,
                    hash,
                    data: Some(data),
                    thumbnail_data,
                })
                .map_err(|error| CommandError::Runtime(format!("import failed: {error}")))?;
            println!("imported {} as image {image_id}", file.display());
            Ok(())
        }
        Command::List { json } => {
            let manager = build_image_manager(store, config)?;
            let entries = manager
                .image_list(ListImagesCommand)
                .map_err(|error| CommandError::Runtime(format!("list failed: {error}")))?;
            if json {
                let rendered = serde_json::to_string_pretty(&entries)
                    .map_err(|error| CommandError::Runtime(format!("list failed: {error}")))?;
                println!("{rendered}");
                return Ok(());
            }
            if entries.is_empty() {
                println!("no images in catalog");
                return Ok(());
            }
            for entry in &entries {
                println!("{}", present_entry(entry));
            }
            Ok(())
        }
        Command::Data {
            image_id,
            thumbnail,
            out,
        } => {
            let image_id = parse_image_id(image_id)?;
            let variant = ImageVariant::from_thumbnail_flag(thumbnail);
            let manager = build_image_manager(store, config)?;
            let bytes = manager
                .fetch_data(FetchDataCommand { image_id, variant })
                .await
                .map_err(|error| CommandError::Runtime(format!("fetch failed: {error}")))?;
            match out {
                Some(path) => {
                    std::fs::write(&path, &bytes).map_err(|error| {
                        let target = path.display();
                        CommandError::Runtime(format!("failed to write {target}: {error}"))
                    })?;
                    println!("wrote {} bytes to {}", bytes.len(), path.display());
                }
                None => println!("{}", present_payload(image_id, variant, bytes.len())),
            }
            Ok(())
        }
        Command::Metadata { image_id } => {
            let image_id = parse_image_id(image_id)?;
            let manager = build_image_manager(store, config)?;
            let metadata = manager
                .fetch_metadata(FetchMetadataCommand { image_id })
                .await
                .map_err(|error| CommandError::Runtime(format!("fetch failed: {error}")))?;
            println!("{}", present_metadata(image_id, &metadata));
            Ok(())
        }
        Command::Image {
            image_id,
            thumbnail,
        } => {
            let image_id = parse_image_id(image_id)?;
            let variant = ImageVariant::from_thumbnail_flag(thumbnail);
            let manager = build_image_manager(store, config)?;
            let bitmap = manager
                .fetch_image(FetchImageCommand { image_id, variant })
                .await
                .map_err(|error| CommandError::Runtime(format!("fetch failed: {error}")))?;
            println!("{}", present_bitmap(image_id, variant, &bitmap));
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("photoflow").chain(args.iter().copied()))
    }

    #[test]
    fn parse_import_command() {
        let cli = parse(&["import", "photos/a.jpg", "--hash", "00ff00ff00ff00ff"])
            .expect("import should parse");
        match cli.command {
            Command::Import {
                file,
                hash,
                no_thumbnail,
            } => {
                assert_eq!(file, PathBuf::from("photos/a.jpg"));
                assert_eq!(hash, ImageHash::new(0x00ff_00ff_00ff_00ff));
                assert!(!no_thumbnail);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn parse_import_rejects_invalid_hash() {
        assert!(parse(&["import", "a.jpg", "--hash", "not-hex"]).is_err());
    }

    #[test]
    fn parse_data_with_global_flags_after_subcommand() {
        let cli = parse(&["data", "7", "--thumbnail", "--catalog", "/tmp/c.sqlite3"])
            .expect("data should parse");
        assert!(matches!(
            cli.command,
            Command::Data {
                image_id: 7,
                thumbnail: true,
                out: None
            }
        ));
        assert_eq!(cli.global.catalog, Some(PathBuf::from("/tmp/c.sqlite3")));
    }

    #[test]
    fn parse_image_id_rejects_non_positive_values() {
        assert!(matches!(parse_image_id(0), Err(CommandError::Usage(_))));
        assert_eq!(parse_image_id(3).expect("valid").get(), 3);
    }

    #[tokio::test]
    async fn list_on_empty_catalog_succeeds() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = AppConfig {
            catalog_path: dir.path().join("catalog.sqlite3"),
            ..AppConfig::default()
        };
        let store = SqliteImageStore::new(config.catalog_path.clone());
        store.initialize().expect("initialize");

        run_command(Command::List { json: true }, store, &config)
            .await
            .expect("list");
    }
}
