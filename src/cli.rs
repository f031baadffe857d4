use clap::{Parser, Subcommand};
use std::path::PathBuf;
use webpforge_common::NamingMode;

#[derive(Parser)]
#[command(name = "webpforge")]
#[command(author, version, about = "Batch image to WebP converter")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Convert images and write the results
    Convert {
        /// Images to convert
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Quality between 0.10 and 0.90 (defaults to the saved preference)
        #[arg(short, long)]
        quality: Option<f32>,

        /// Directory for the converted files
        #[arg(short, long)]
        out_dir: Option<PathBuf>,

        /// Also bundle every converted file into this ZIP archive
        #[arg(long)]
        zip: Option<PathBuf>,

        /// How output files are named (original or suffix)
        #[arg(long)]
        naming: Option<NamingMode>,
    },

    /// Read or change the saved default quality
    Prefs {
        #[command(subcommand)]
        action: PrefsAction,
    },

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Write a config file with the default settings
    InitConfig {
        /// Where to write the config
        path: PathBuf,
    },

    /// Display version information
    Version,
}

#[derive(Subcommand)]
pub enum PrefsAction {
    /// Print the default quality
    Get,

    /// Save a new default quality (clamped to 0.10..=0.90)
    Set {
        value: f32,
    },
}
