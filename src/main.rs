mod cli;

use webpforge::{
    config,
    ingest::Candidate,
    notifications::Notification,
    preferences::PreferenceStore,
    session::Session,
};

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands, PrefsAction};
use std::path::{Path, PathBuf};
use tokio::sync::broadcast;
use webpforge_common::{ItemStatus, NamingMode};

struct ConvertArgs {
    files: Vec<PathBuf>,
    quality: Option<f32>,
    out_dir: Option<PathBuf>,
    zip: Option<PathBuf>,
    naming: Option<NamingMode>,
}

async fn convert(args: ConvertArgs, config_path: Option<&Path>) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let session = Session::from_config(config);
    let mut notifications = session.notifier().subscribe();

    let mut batch = Vec::with_capacity(args.files.len());
    for path in &args.files {
        match Candidate::from_path(path) {
            Ok(candidate) => batch.push(candidate),
            Err(e) => {
                tracing::error!("Failed to read {:?}: {}", path, e);
                eprintln!("Skipping {}: {}", path.display(), e);
            }
        }
    }

    let report = session.add_files(batch);
    if let Some(quality) = args.quality {
        session.set_quality_all(quality);
    }
    print_notifications(&mut notifications);

    if report.admitted.is_empty() {
        anyhow::bail!("No images were admitted");
    }

    let drained = session.convert_all().await;
    print_notifications(&mut notifications);

    // Per-file output unless only a bundle was asked for.
    let out_dir = match (&args.out_dir, &args.zip) {
        (Some(dir), _) => Some(dir.clone()),
        (None, Some(_)) => None,
        (None, None) => Some(PathBuf::from(".")),
    };

    if let Some(dir) = out_dir {
        for item in session.queue().done_items() {
            let path = session
                .save_download(item.id, &dir, args.naming)
                .with_context(|| format!("Failed to write output for {}", item.source_name))?;
            println!(
                "{} -> {} (saved {} bytes)",
                item.source_name,
                path.display(),
                item.saved_bytes().unwrap_or_default()
            );
        }
    }

    if let Some(zip_path) = &args.zip {
        let exported = session.export_zip(zip_path, args.naming);
        print_notifications(&mut notifications);
        if exported
            .with_context(|| format!("Failed to export {:?}", zip_path))?
            .is_some()
        {
            println!("Archive: {}", zip_path.display());
        }
    }

    let summary = session.queue().summary();
    println!(
        "Converted {} of {} files ({} failed)",
        drained.converted, summary.total, drained.failed
    );
    if summary.done > 0 {
        println!(
            "Saved {} bytes ({:.1}%)",
            summary.saved_bytes(),
            summary.saved_percent()
        );
    }

    for item in session.queue().items() {
        if item.status == ItemStatus::Failed {
            println!(
                "  failed: {} ({})",
                item.source_name,
                item.error.as_deref().unwrap_or("unknown error")
            );
        }
    }

    Ok(())
}

fn print_notifications(rx: &mut broadcast::Receiver<Notification>) {
    while let Ok(notification) = rx.try_recv() {
        println!("[{}] {}", notification.severity, notification.message);
    }
}

fn prefs(action: PrefsAction, config_path: Option<&Path>) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let store = PreferenceStore::open(config.preferences.resolved_path());

    match action {
        PrefsAction::Get => {
            println!("{:.2}", store.get().value());
        }
        PrefsAction::Set { value } => {
            let stored = store
                .set(value)
                .with_context(|| format!("Failed to save preferences to {:?}", store.path()))?;
            println!("Default quality set to {:.2}", stored.value());
        }
    }

    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    let config = match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            config::load_config(p)?
        }
        None => {
            println!("No config file specified, using defaults");
            config::Config::default()
        }
    };

    println!("✓ Configuration is valid");
    println!(
        "  Limits: {} files, {} MB each",
        config.limits.max_files, config.limits.max_file_size_mb
    );
    println!("  Format: {}", config.conversion.format);
    match config.conversion.encode_timeout_secs {
        Some(secs) => println!("  Encode timeout: {}s", secs),
        None => println!("  Encode timeout: none"),
    }
    println!("  Naming: {}", config.export.naming);
    println!("  Preferences: {}", config.preferences.resolved_path().display());

    Ok(())
}

fn init_config(path: &Path) -> Result<()> {
    config::persist::save_config(path, &config::Config::default())?;
    println!("Wrote default config to {}", path.display());
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "webpforge=trace,webpforge_common=debug".to_string()
        } else {
            "webpforge=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Convert {
            files,
            quality,
            out_dir,
            zip,
            naming,
        } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(convert(
                ConvertArgs {
                    files,
                    quality,
                    out_dir,
                    zip,
                    naming,
                },
                cli.config.as_deref(),
            ))
        }
        Commands::Prefs { action } => prefs(action, cli.config.as_deref()),
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::InitConfig { path } => init_config(&path),
        Commands::Version => {
            println!("webpforge {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
