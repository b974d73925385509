use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

use lsbvault::config::{self, DEFAULT_LSB_DEPTH};
use lsbvault::raster::io;
use lsbvault::{bitcodec, pipeline, BatchJob, ProgressHook, Stage, StegConfig};

/// lsbvault: hide files in the low bits of PNG/BMP images, optionally encrypted.
#[derive(Parser)]
#[command(name = "lsbvault", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Hide a file inside a cover image
    Encode {
        /// Cover image (PNG or BMP; JPEG needs --auto-convert)
        #[arg(short, long)]
        cover: PathBuf,

        /// File to hide
        #[arg(short = 'f', long)]
        payload: PathBuf,

        /// Output image path (always written as PNG)
        #[arg(short, long)]
        output: PathBuf,

        /// Bits per channel byte, 1-3 (default: 3)
        #[arg(long, default_value_t = DEFAULT_LSB_DEPTH, value_parser = clap::value_parser!(u8).range(1..=3))]
        lsb: u8,

        /// Encrypt the payload with a password
        #[arg(short, long)]
        password: Option<String>,

        /// Accept a JPEG cover by embedding into its decoded pixels
        #[arg(long)]
        auto_convert: bool,
    },

    /// Recover a hidden file from a stego image
    Decode {
        /// Stego image
        #[arg(short, long)]
        input: PathBuf,

        /// Directory to write the recovered file into
        #[arg(short, long, default_value = ".")]
        output_dir: PathBuf,

        /// Decryption password (required if the payload was encrypted)
        #[arg(short, long)]
        password: Option<String>,
    },

    /// Show how much an image can hold at each depth
    Capacity {
        /// Image to inspect
        #[arg(short, long)]
        image: PathBuf,
    },

    /// Hide the same file in many covers, writing <stem>_stego.png for each
    BatchEncode {
        /// File to hide
        #[arg(short = 'f', long)]
        payload: PathBuf,

        /// Directory for the stego images
        #[arg(short, long)]
        output_dir: PathBuf,

        /// Bits per channel byte, 1-3 (default: 3)
        #[arg(long, default_value_t = DEFAULT_LSB_DEPTH, value_parser = clap::value_parser!(u8).range(1..=3))]
        lsb: u8,

        /// Encrypt the payload with a password
        #[arg(short, long)]
        password: Option<String>,

        /// Accept JPEG covers by embedding into their decoded pixels
        #[arg(long)]
        auto_convert: bool,

        /// Cover images
        #[arg(required = true)]
        covers: Vec<PathBuf>,
    },

    /// Recover hidden files from many stego images
    BatchDecode {
        /// Directory to write recovered files into
        #[arg(short, long)]
        output_dir: PathBuf,

        /// Decryption password
        #[arg(short, long)]
        password: Option<String>,

        /// Stego images
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
    },
}

/// Drives a percentage bar from pipeline stages.
struct BarHook {
    bar: ProgressBar,
}

impl BarHook {
    fn new() -> Self {
        let bar = ProgressBar::new(100);
        if let Ok(style) = ProgressStyle::default_bar().template("{bar:40.cyan/blue} {pos:>3}% {msg}") {
            bar.set_style(style.progress_chars("##-"));
        }
        Self { bar }
    }
}

impl ProgressHook for BarHook {
    fn on_progress(&self, stage: Stage) {
        self.bar.set_position((stage.fraction() * 100.0).round() as u64);
        self.bar.set_message(format!("{:?}", stage));
    }

    fn on_finished(&self, success: bool, message: &str) {
        if success {
            self.bar.finish_with_message(message.to_string());
        } else {
            self.bar.abandon_with_message("failed");
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Encode {
            cover,
            payload,
            output,
            lsb,
            password,
            auto_convert,
        } => {
            let cfg = StegConfig {
                lsb_depth: lsb,
                auto_convert_jpeg: auto_convert,
                ..Default::default()
            };
            pipeline::encode::encode_file(
                &cover,
                &payload,
                &output,
                password.as_deref(),
                &cfg,
                &BarHook::new(),
            )?;
        }

        Commands::Decode {
            input,
            output_dir,
            password,
        } => {
            let cfg = StegConfig::default();
            let written = pipeline::decode::decode_file(
                &input,
                &output_dir,
                password.as_deref(),
                &cfg,
                &BarHook::new(),
            )?;
            println!("{}", written.display());
        }

        Commands::Capacity { image } => print_capacity(&image)?,

        Commands::BatchEncode {
            payload,
            output_dir,
            lsb,
            password,
            auto_convert,
            covers,
        } => {
            std::fs::create_dir_all(&output_dir)
                .with_context(|| format!("failed to create {}", output_dir.display()))?;
            let jobs: Vec<BatchJob> = covers
                .into_iter()
                .map(|cover| {
                    let stem = cover
                        .file_stem()
                        .map(|s| s.to_string_lossy().into_owned())
                        .unwrap_or_else(|| "cover".to_string());
                    let output = output_dir.join(format!("{}_stego.png", stem));
                    BatchJob::Encode {
                        cover,
                        payload: payload.clone(),
                        output,
                    }
                })
                .collect();
            let cfg = StegConfig {
                lsb_depth: lsb,
                auto_convert_jpeg: auto_convert,
                ..Default::default()
            };
            report_batch(&jobs, password.as_deref(), &cfg)?;
        }

        Commands::BatchDecode {
            output_dir,
            password,
            inputs,
        } => {
            let jobs: Vec<BatchJob> = inputs
                .into_iter()
                .map(|stego| BatchJob::Decode {
                    stego,
                    output_dir: output_dir.clone(),
                })
                .collect();
            report_batch(&jobs, password.as_deref(), &StegConfig::default())?;
        }
    }

    Ok(())
}

fn print_capacity(path: &Path) -> Result<()> {
    let image = io::load(path).with_context(|| format!("failed to load {}", path.display()))?;
    println!(
        "{}: {}x{}, {} channels",
        path.display(),
        image.width(),
        image.height(),
        image.channels()
    );
    for depth in config::MIN_LSB_DEPTH..=config::MAX_LSB_DEPTH {
        let capacity = bitcodec::capacity_bytes(&image, depth);
        println!(
            "  depth {}: {} bytes total, {} bytes max payload",
            depth,
            capacity,
            config::max_payload_len(capacity)
        );
    }
    Ok(())
}

fn report_batch(jobs: &[BatchJob], password: Option<&str>, cfg: &StegConfig) -> Result<()> {
    let outcomes = pipeline::batch::run_batch(jobs, password, cfg);
    let failed = outcomes.iter().filter(|o| !o.success).count();
    for outcome in &outcomes {
        let status = if outcome.success { "ok" } else { "FAILED" };
        println!("[{}] {}: {}", outcome.index, status, outcome.message);
    }
    if failed > 0 {
        anyhow::bail!("{} of {} jobs failed", failed, outcomes.len());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kdf_iterations_not_configurable() {
        let base = ["lsbvault", "encode", "-c", "c.png", "-f", "p.txt", "-o", "o.png"];
        assert!(Cli::try_parse_from(base).is_ok());

        let mut tuned = base.to_vec();
        tuned.extend(["--kdf-iterations", "10"]);
        assert!(Cli::try_parse_from(tuned).is_err());

        let decode = ["lsbvault", "decode", "-i", "s.png", "--kdf-iterations", "10"];
        assert!(Cli::try_parse_from(decode).is_err());
    }

    #[test]
    fn test_lsb_depth_range() {
        let args = |lsb: &'static str| {
            ["lsbvault", "encode", "-c", "c.png", "-f", "p.txt", "-o", "o.png", "--lsb", lsb]
        };
        assert!(Cli::try_parse_from(args("1")).is_ok());
        assert!(Cli::try_parse_from(args("4")).is_err());
        assert!(Cli::try_parse_from(args("0")).is_err());
    }
}
