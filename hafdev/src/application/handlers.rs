use std::io::Write;
use std::path::PathBuf;

use haf_core::domain::FileRow;
use haf_core::repo::ArchiveRepo;
use haf_core::repo_fs::FsArchiveRepo;
use haf_core::{
    JobEvent, JobId, JobRunner, JobState, PackOptions, ProgressLog, RunnerOptions, verify,
};
use tracing::debug;
use walkdir::WalkDir;

use crate::error::{CliError, Result};

/// Files named by `inputs`, with directories expanded when `recursive`.
/// Directory contents are visited in file-name order.
pub fn expand_inputs(inputs: &[PathBuf], recursive: bool) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for input in inputs {
        if !input.is_dir() {
            files.push(input.clone());
            continue;
        }
        if !recursive {
            return Err(CliError::DirectoryInput(input.clone()));
        }
        for entry in WalkDir::new(input).sort_by_file_name() {
            let entry = entry.map_err(|source| CliError::Walk {
                path: input.clone(),
                source,
            })?;
            if entry.file_type().is_file() {
                files.push(entry.into_path());
            }
        }
    }
    debug!(files = files.len(), "expanded inputs");
    Ok(files)
}

/// Render a job's events until it reaches a terminal state. `events` must
/// come from a subscription taken before the job was submitted.
fn follow(
    runner: &JobRunner,
    events: impl IntoIterator<Item = JobEvent>,
    id: JobId,
) -> Result<()> {
    let mut log = ProgressLog::new();
    let mut err = std::io::stderr().lock();
    for ev in events {
        if ev.job != id {
            continue;
        }
        let idx = log.apply(&ev);
        writeln!(err, "{}", log.lines()[idx])?;
        if ev.is_terminal() {
            break;
        }
    }
    let state = runner.wait(id);
    runner.forget(id);
    match state {
        Some(JobState::Succeeded) => Ok(()),
        Some(JobState::Cancelled) => Err(CliError::JobCancelled(id)),
        _ => Err(CliError::JobFailed(id)),
    }
}

pub fn handle_pack(
    dest_dir: PathBuf,
    name: String,
    inputs: Vec<PathBuf>,
    recursive: bool,
    deterministic: bool,
    min_gain: f32,
) -> Result<()> {
    let sources = expand_inputs(&inputs, recursive)?;
    let runner = JobRunner::with_options(RunnerOptions {
        pack: PackOptions {
            deterministic,
            min_gain,
        },
    });
    let rx = runner.events();
    let id = runner.submit_archive(sources, dest_dir, name);
    follow(&runner, rx, id)
}

pub fn handle_extract(archive: PathBuf, dest: PathBuf) -> Result<()> {
    let runner = JobRunner::new();
    let rx = runner.events();
    let id = runner.submit_unarchive(archive, dest);
    follow(&runner, rx, id)
}

fn format_row(r: &FileRow) -> String {
    format!(
        "{:<32} {:<7} {:>12} {:>12} {:>6.1}%  {}",
        r.name,
        format!("{:?}", r.codec).to_lowercase(),
        r.original_size,
        r.compressed_size,
        r.ratio * 100.0,
        r.modified
    )
}

pub fn handle_list(archive: PathBuf) -> Result<()> {
    let repo = FsArchiveRepo::open(&archive)?;
    let mut out = std::io::stdout().lock();
    writeln!(
        out,
        "{:<32} {:<7} {:>12} {:>12} {:>7}  {}",
        "NAME", "CODEC", "SIZE", "PACKED", "RATIO", "MODIFIED"
    )?;
    for row in repo.list_files()? {
        writeln!(out, "{}", format_row(&row))?;
    }
    let s = repo.stats()?;
    writeln!(
        out,
        "{} files, {} -> {} bytes ({:.1}%)",
        s.files,
        s.original_bytes,
        s.compressed_bytes,
        s.compression_ratio * 100.0
    )?;
    Ok(())
}

pub fn handle_cat(archive: PathBuf, name: String) -> Result<()> {
    let repo = FsArchiveRepo::open(&archive)?;
    let data = repo.read_file(&name)?;
    let mut out = std::io::stdout().lock();
    out.write_all(&data)?;
    out.flush()?;
    Ok(())
}

pub fn handle_verify(archive: PathBuf) -> Result<()> {
    verify(&archive)?;
    let s = FsArchiveRepo::open(&archive)?.stats()?;
    eprintln!("verify: OK ({} files, {} bytes)", s.files, s.original_bytes);
    Ok(())
}
