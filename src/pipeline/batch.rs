use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info, warn};
use rayon::prelude::*;

use crate::config::StegConfig;

use super::decode::{load_and_decode, safe_filename, write_decoded};
use super::encode::encode_file;
use super::hook::{ProgressHook, Stage};
use super::Decoded;

/// One unit of work in a batch.
#[derive(Debug, Clone)]
pub enum BatchJob {
    Encode {
        cover: PathBuf,
        payload: PathBuf,
        output: PathBuf,
    },
    Decode {
        stego: PathBuf,
        output_dir: PathBuf,
    },
}

impl BatchJob {
    fn input(&self) -> &PathBuf {
        match self {
            BatchJob::Encode { cover, .. } => cover,
            BatchJob::Decode { stego, .. } => stego,
        }
    }
}

/// Result of one job, in job order.
#[derive(Debug, Clone)]
pub struct BatchOutcome {
    pub index: usize,
    pub success: bool,
    pub message: String,
}

/// A job after its parallel phase. Decoded payloads are written afterwards,
/// in job order, so that output names are claimed deterministically.
enum Finished {
    Written(String),
    Decoded { decoded: Decoded, output_dir: PathBuf },
}

struct JobHook {
    index: usize,
}

impl ProgressHook for JobHook {
    fn on_progress(&self, stage: Stage) {
        debug!(
            "job {}: {:?} ({:.0}%)",
            self.index,
            stage,
            stage.fraction() * 100.0
        );
    }
}

/// Run jobs in parallel. A failing job is reported in its outcome and does not
/// stop the others.
///
/// No two jobs write the same path: when outputs collide, the first job in
/// order keeps the name and later ones get `-<index>` before the extension.
pub fn run_batch(jobs: &[BatchJob], password: Option<&str>, cfg: &StegConfig) -> Vec<BatchOutcome> {
    info!("running batch of {} jobs", jobs.len());

    let mut claimed = HashSet::new();
    let encode_outputs: Vec<Option<PathBuf>> = jobs
        .iter()
        .enumerate()
        .map(|(index, job)| match job {
            BatchJob::Encode { output, .. } => Some(claim(&mut claimed, output.clone(), index)),
            BatchJob::Decode { .. } => None,
        })
        .collect();

    let progress = ProgressBar::new(jobs.len() as u64);
    match ProgressStyle::default_bar().template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} images ({eta})") {
        Ok(style) => progress.set_style(style.progress_chars("##-")),
        Err(e) => warn!("progress bar template rejected: {}", e),
    }

    let finished: Vec<Result<Finished>> = jobs
        .par_iter()
        .zip(encode_outputs.par_iter())
        .enumerate()
        .map(|(index, (job, encode_output))| {
            let hook = JobHook { index };
            let result = match job {
                BatchJob::Encode {
                    cover,
                    payload,
                    output,
                } => {
                    let output = encode_output.as_ref().unwrap_or(output);
                    encode_file(cover, payload, output, password, cfg, &hook)
                        .map(|()| Finished::Written(format!("wrote {}", output.display())))
                }
                BatchJob::Decode { stego, output_dir } => {
                    load_and_decode(stego, password, cfg, &hook).map(|decoded| Finished::Decoded {
                        decoded,
                        output_dir: output_dir.clone(),
                    })
                }
            };
            progress.inc(1);
            result
        })
        .collect();

    let outcomes: Vec<BatchOutcome> = finished
        .into_iter()
        .enumerate()
        .map(|(index, result)| {
            let result = result.and_then(|done| match done {
                Finished::Written(message) => Ok(message),
                Finished::Decoded {
                    decoded,
                    output_dir,
                } => {
                    let wanted = output_dir.join(safe_filename(&decoded.filename));
                    let out_path = claim(&mut claimed, wanted, index);
                    write_decoded(&decoded, &out_path, &JobHook { index })
                        .map(|()| format!("extracted {}", out_path.display()))
                }
            });

            match result {
                Ok(message) => BatchOutcome {
                    index,
                    success: true,
                    message,
                },
                Err(e) => {
                    warn!("{}: {:#}", jobs[index].input().display(), e);
                    BatchOutcome {
                        index,
                        success: false,
                        message: format!("{:#}", e),
                    }
                }
            }
        })
        .collect();

    let succeeded = outcomes.iter().filter(|o| o.success).count();
    progress.finish_with_message("batch complete");
    info!("batch complete: {}/{} succeeded", succeeded, outcomes.len());
    outcomes
}

/// Reserve `wanted`, or the first free `-<n>` variant of it from `index` up.
fn claim(claimed: &mut HashSet<PathBuf>, wanted: PathBuf, index: usize) -> PathBuf {
    if claimed.insert(wanted.clone()) {
        return wanted;
    }
    let mut n = index;
    loop {
        let candidate = with_suffix(&wanted, n);
        if claimed.insert(candidate.clone()) {
            warn!(
                "job {}: {} already used in this batch, writing {}",
                index,
                wanted.display(),
                candidate.display()
            );
            return candidate;
        }
        n += 1;
    }
}

/// `dir/name.ext` -> `dir/name-<n>.ext`.
fn with_suffix(path: &Path, n: usize) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!("{}-{}.{}", stem, n, ext.to_string_lossy()),
        None => format!("{}-{}", stem, n),
    };
    path.with_file_name(name)
}
