use crate::container::manifest::FileRecord;
use crate::error::{HafError, Result};
use crate::progress::{Progress, Step, checkpoint};
use crate::read::opened::HafReader;
use crate::util::sanitize::safe_join;

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, UNIX_EPOCH};
use tempfile::TempPath;
use tracing::{debug, info, warn};

/// Write `data` to a hidden temp file inside `dest`, stamped with `modified`.
fn stage(dest: &Path, data: &[u8], modified: i64) -> Result<TempPath> {
    let werr = |e: std::io::Error| HafError::write_failed(dest, e);
    let mut tmp = tempfile::Builder::new()
        .prefix(".haf-")
        .suffix(".part")
        .tempfile_in(dest)
        .map_err(werr)?;
    tmp.write_all(data).map_err(werr)?;
    if modified > 0 {
        let mtime = UNIX_EPOCH + Duration::from_secs(modified as u64);
        if let Err(e) = tmp.as_file().set_modified(mtime) {
            debug!(error = %e, "could not restore mtime");
        }
    }
    tmp.as_file().sync_all().map_err(werr)?;
    Ok(tmp.into_temp_path())
}

/// A renamed-into-place file and, when it replaced one, the previous content
/// parked under a hidden name in the same directory.
struct Placed {
    out: PathBuf,
    backup: Option<TempPath>,
}

/// Put `backup` back at `out`; a backup that cannot be restored is kept on disk.
fn restore(backup: TempPath, out: &Path) {
    if let Err(e) = backup.persist(out) {
        match e.path.keep() {
            Ok(kept) => warn!(
                path = %out.display(),
                backup = %kept.display(),
                error = %e.error,
                "could not restore previous file; left in backup"
            ),
            Err(k) => warn!(path = %out.display(), error = %k, "could not restore previous file"),
        }
    }
}

/// Rename `tmp` onto `out`, parking an existing `out` first.
fn place(dest: &Path, tmp: TempPath, out: PathBuf) -> Result<Placed> {
    let backup = if out.symlink_metadata().is_ok() {
        let slot = tempfile::Builder::new()
            .prefix(".haf-")
            .suffix(".bak")
            .tempfile_in(dest)
            .map_err(|e| HafError::write_failed(dest, e))?
            .into_temp_path();
        fs::rename(&out, &slot).map_err(|e| HafError::write_failed(&out, e))?;
        Some(slot)
    } else {
        None
    };

    if let Err(e) = tmp.persist(&out) {
        if let Some(b) = backup {
            restore(b, &out);
        }
        return Err(HafError::write_failed(out, e.error));
    }
    Ok(Placed { out, backup })
}

/// Undo `placed` in reverse order: drop the new file, bring the old one back.
fn rollback(placed: Vec<Placed>) {
    for p in placed.into_iter().rev() {
        if let Err(rm) = fs::remove_file(&p.out) {
            warn!(path = %p.out.display(), error = %rm, "rollback failed");
        }
        if let Some(b) = p.backup {
            restore(b, &p.out);
        }
    }
}

/// Rename every staged file onto its final name. Either all of them land, or
/// `dest` is left as it was before the call.
fn commit(dest: &Path, staged: Vec<(TempPath, PathBuf)>) -> Result<()> {
    // a directory in the way would only fail after earlier files were renamed
    for (_, out) in &staged {
        if out.symlink_metadata().is_ok_and(|m| m.is_dir()) {
            return Err(HafError::write_failed(
                out,
                std::io::Error::new(
                    std::io::ErrorKind::IsADirectory,
                    "a directory has the name of an archived file",
                ),
            ));
        }
    }

    let mut placed: Vec<Placed> = Vec::with_capacity(staged.len());
    for (tmp, out) in staged {
        match place(dest, tmp, out) {
            Ok(p) => placed.push(p),
            Err(e) => {
                rollback(placed);
                return Err(e);
            }
        }
    }
    // dropping the backups deletes the replaced content
    drop(placed);
    Ok(())
}

/// Decode every file of `archive` into `dest`.
///
/// Each file is decoded and checked in full before anything is renamed into
/// `dest`; the first failure or cancellation aborts the whole extraction and
/// leaves no new file behind. Existing files with the same names are replaced;
/// if a rename fails the replaced files are put back. A directory holding the
/// name of an archived file fails the extraction before any rename.
pub fn extract_all(
    archive: &Path,
    dest: &Path,
    progress: &mut dyn Progress,
) -> Result<Vec<FileRecord>> {
    let mut reader = HafReader::open(archive)?;
    fs::create_dir_all(dest).map_err(|e| HafError::write_failed(dest, e))?;

    let records = reader.records().to_vec();
    let total = records.len();
    let mut staged = Vec::with_capacity(total);

    for (index, rec) in records.iter().enumerate() {
        checkpoint(progress)?;
        progress.step(Step::FileStarted {
            index,
            total,
            name: &rec.name,
        });

        let out = safe_join(dest, &rec.name)?;
        let data = reader.decode(rec)?;
        staged.push((stage(dest, &data, rec.modified)?, out));
        debug!(file = %rec.name, bytes = data.len(), "decoded");

        progress.step(Step::FileFinished {
            index,
            total,
            name: &rec.name,
            original_size: rec.original_size,
            compressed_size: rec.compressed_size,
        });
    }
    checkpoint(progress)?;

    progress.step(Step::Finalizing { path: dest });
    commit(dest, staged)?;

    info!(
        archive = %archive.display(),
        dest = %dest.display(),
        files = total,
        "archive extracted"
    );
    Ok(records)
}

/// Decode the single file `name` from `archive` into `dest`.
pub fn extract_file(archive: &Path, name: &str, dest: &Path) -> Result<PathBuf> {
    let mut reader = HafReader::open(archive)?;
    let rec = reader.find(name)?.clone();
    let out = safe_join(dest, &rec.name)?;
    let data = reader.decode(&rec)?;

    fs::create_dir_all(dest).map_err(|e| HafError::write_failed(dest, e))?;
    stage(dest, &data, rec.modified)?
        .persist(&out)
        .map_err(|e| HafError::write_failed(&out, e.error))?;
    Ok(out)
}

/// Decode every body in memory and check sizes and hashes. Writes nothing.
pub fn verify(archive: &Path) -> Result<()> {
    let mut reader = HafReader::open(archive)?;
    let records = reader.records().to_vec();

    // The data section must end exactly where the last body ends
    let expected_end = reader.sb.data_off + reader.manifest.data_len();
    let actual_end = fs::metadata(archive)?.len();
    if actual_end != expected_end {
        return Err(HafError::corrupt_stream(format!(
            "archive is {actual_end} bytes, manifest accounts for {expected_end}"
        )));
    }

    for rec in &records {
        reader.decode(rec)?;
    }
    Ok(())
}
