use anyhow::{Context, Result, bail};
use clap::{CommandFactory, Parser, Subcommand, ValueHint};
use iocraft::prelude::*;
use std::io::{self, Write};
use tracing::info;
use tracing_subscriber::EnvFilter;
use url::Url;

use crate::{
    client::{ClientOptions, DEFAULT_BASE_URL, GisCloudClient},
    layer::{BoundingExtent, FileInspector, LayerKind},
    ui::{
        ConfigHeader, ErrorMessage, InputPrompt, ProgressLine, SuccessMessage, UploadSummary,
        UploadSummaryProps,
    },
    workflow::{DEFAULT_MAP_NAME, PublishWorkflow, UploadRequest},
};

mod archive;
mod client;
mod config;
mod error;
mod filter;
mod layer;
mod rest_types;
mod serde_utils;
mod ui;
mod workflow;

#[derive(Parser)]
#[command(name = "gcup")]
#[command(version)]
#[command(about = "Upload GIS datasets to GIS Cloud")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure gcup interactively
    Config,
    /// Store your API key in the OS keyring
    SetApiKey { api_key: String },
    /// Zip and upload datasets, optionally publishing them on a new map
    Upload {
        /// Dataset paths; each value may be a comma separated list
        #[arg(required = true, value_hint = ValueHint::FilePath)]
        paths: Vec<String>,
        /// GIS Cloud file manager folder to upload into
        #[arg(short, long)]
        folder: Option<String>,
        /// Add the uploaded datasets to a new map
        #[arg(short = 'm', long)]
        create_map: bool,
        /// Name of the new map
        #[arg(long, default_value = DEFAULT_MAP_NAME)]
        map_name: String,
        /// Map extent as x_min,x_max,y_min,y_max in EPSG:4326
        #[arg(short, long, allow_hyphen_values = true)]
        extent: Option<BoundingExtent>,
        /// Layer type for vector formats whose geometry cannot be read
        #[arg(short, long, default_value = "polygon")]
        geometry: LayerKind,
    },
}

fn init_logging() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("gcup=info".parse()?))
        .with_writer(io::stderr)
        .init();
    Ok(())
}

fn main() -> Result<()> {
    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;
    let _rt_guard = rt.enter();
    clap_complete::CompleteEnv::with_factory(Cli::command).complete();
    let cli = Cli::parse();
    init_logging()?;

    rt.block_on(async {
        match cli.command {
            Commands::Config => interactive_config(),
            Commands::SetApiKey { api_key } => config::set_api_key_keyring(api_key),
            Commands::Upload {
                paths,
                folder,
                create_map,
                map_name,
                extent,
                geometry,
            } => {
                let config = config::read_config()?;
                let request = UploadRequest {
                    paths: filter::split_path_lists(paths),
                    destination_folder: folder.unwrap_or(config.default_folder),
                    api_key: config.api_key,
                    create_map,
                    map_name,
                    extent,
                };

                let mut options = ClientOptions::new(config.base_url, request.api_key.clone());
                options.accept_invalid_certs = config.accept_invalid_certs;
                let client = GisCloudClient::new(options)?;

                upload(&client, &FileInspector::new(geometry), &request).await
            }
        }
    })
}

async fn upload(
    client: &GisCloudClient,
    inspector: &FileInspector,
    request: &UploadRequest,
) -> Result<()> {
    let progress = |percent: u8| element!(ProgressLine(percent: percent)).print();
    let workflow = PublishWorkflow::new(client, inspector, &progress);

    let report = match workflow.run(request).await {
        Ok(report) => report,
        Err(err) => {
            element!(ErrorMessage(message: err.to_string())).print();
            return Err(err.into());
        }
    };

    if report.results.is_empty() {
        return Ok(());
    }

    let summary = UploadSummaryProps::from_report(&report);
    element!(UploadSummary(
        folder: summary.folder,
        map_id: summary.map_id,
        results: summary.results
    ))
    .print();

    if let Some(summary) = report.failure_summary() {
        bail!(summary);
    }

    element!(SuccessMessage(message: format!("Uploaded to {}", report.folder))).print();
    Ok(())
}

fn read_input(prompt: &str, default: Option<&str>, description: Option<&str>) -> Result<String> {
    element! {
        InputPrompt(
            prompt: prompt.to_string(),
            default: default.map(|s| s.to_string()),
            description: description.map(|s| s.to_string())
        )
    }
    .print();

    print!("> ");
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    let input = input.trim().to_string();

    match (input.is_empty(), default) {
        (true, Some(def)) => Ok(def.to_string()),
        _ => Ok(input),
    }
}

fn interactive_config() -> Result<()> {
    element!(ConfigHeader()).print();

    let existing = config::read_config_file().unwrap_or_default();
    let current_url = existing
        .base_url
        .as_ref()
        .map(Url::to_string)
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

    let base_url = loop {
        let base_url_str = read_input(
            "GIS Cloud API URL",
            Some(current_url.as_str()),
            Some("The base URL of the GIS Cloud REST API"),
        )?;

        match Url::parse(&base_url_str) {
            Ok(url) => break url,
            Err(e) => {
                element!(ErrorMessage(message: format!("Invalid URL: {}", e))).print();
                println!();
            }
        }
    };

    let api_key = loop {
        let api_key = read_input(
            "API Key",
            None,
            Some("Your GIS Cloud API key (stored securely in OS keyring)"),
        )?;

        if api_key.is_empty() {
            element!(ErrorMessage(message: "API key cannot be empty".to_string())).print();
            println!();
        } else {
            break api_key;
        }
    };

    let default_folder = read_input(
        "Default folder",
        Some(
            existing
                .default_folder
                .as_deref()
                .unwrap_or(workflow::DEFAULT_FOLDER),
        ),
        Some("File manager folder used when --folder is not given"),
    )?;

    config::set_api_key_keyring(api_key)?;

    config::write_config(config::ConfigFile {
        base_url: Some(base_url),
        default_folder: Some(default_folder),
        accept_invalid_certs: existing.accept_invalid_certs,
    })?;
    info!("Configuration written");

    element!(SuccessMessage(message: "Configuration complete!".to_string())).print();

    Ok(())
}
