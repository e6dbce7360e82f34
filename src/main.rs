mod cli;

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use fc_client::{UploadCoordinator, UploadOptions};
use fc_core::config::Config;

async fn start_server(
    host: Option<String>,
    port: Option<u16>,
    config_path: Option<&Path>,
) -> Result<()> {
    let mut config = Config::load_or_default(config_path);

    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    tracing::info!("Starting filecast");
    tracing::info!(
        "Server will listen on {}:{}",
        config.server.host,
        config.server.port
    );

    fc_server::start(config).await?;
    Ok(())
}

async fn upload_file(server: String, token: Option<String>, path: &Path, options: UploadOptions) -> Result<()> {
    let mut coordinator = UploadCoordinator::new(server);
    if let Some(token) = token {
        coordinator = coordinator.with_token(token);
    }

    let mut progress = coordinator.progress();
    let reporter = tokio::spawn(async move {
        let mut last = None;
        while progress.changed().await.is_ok() {
            let percent = progress.borrow_and_update().percent;
            if last != Some(percent) {
                eprint!("\rUploading... {percent:>3}%");
                let _ = std::io::stderr().flush();
                last = Some(percent);
            }
        }
    });

    let result = coordinator.upload(path, options).await;
    reporter.abort();
    eprintln!("\rUploading... {:>3}%", coordinator.progress().borrow().percent);

    let uploaded = result.with_context(|| format!("Upload of {} failed", path.display()))?;
    println!("Uploaded {} as file {}", uploaded.original_name, uploaded.id);
    println!("  Size: {} bytes", uploaded.size_bytes);
    if let Some(mime) = &uploaded.mime_type {
        println!("  Type: {mime}");
    }
    println!("  Streamable: {}", uploaded.is_streamable);
    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    let config = match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            Config::load(p).with_context(|| format!("Invalid config {}", p.display()))?
        }
        None => {
            println!("No config file specified, using defaults");
            Config::default()
        }
    };

    let warnings = config.validate();
    if warnings.is_empty() {
        println!("✓ Configuration is valid");
    } else {
        println!("Configuration loaded with {} warning(s):", warnings.len());
        for warning in &warnings {
            println!("  - {warning}");
        }
    }
    println!("  Server: {}:{}", config.server.host, config.server.port);
    println!("  Database: {}", config.server.db_path.display());
    println!("  Content root: {}", config.server.content_root.display());
    println!("  Auth enabled: {}", config.auth.enabled);
    println!("  API tokens: {}", config.auth.tokens.len());
    println!("  Max upload bytes: {}", config.upload.max_upload_bytes);

    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG if set, otherwise pick defaults from the verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "filecast=trace,fc_server=trace,fc_db=debug,fc_core=debug,fc_client=debug,tower_http=debug"
                .to_string()
        } else {
            "filecast=info,fc_server=debug,fc_db=info,fc_client=info,tower_http=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Start { host, port } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(start_server(host, port, cli.config.as_deref()))
        }
        Commands::Upload {
            path,
            server,
            token,
            title,
            streamable,
            mime_type,
        } => {
            let options = UploadOptions {
                title,
                is_streamable: streamable,
                mime_type,
            };
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(upload_file(server, token, &path, options))
        }
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("filecast {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
