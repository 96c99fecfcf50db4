use crate::codec::huffman::HuffmanCompressor;
use crate::codec::store::Store;
use crate::codec::{CodecId, Compressor};
use crate::container::manifest::{FileRecord, Manifest, Meta};
use crate::container::superblock::Superblock;
use crate::error::{HafError, Result};
use crate::progress::{Progress, Step, checkpoint};
use crate::util::sanitize::{archive_file_name, entry_name};
use std::collections::HashSet;
use std::fs;
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use time::OffsetDateTime;
use tracing::{debug, info};

pub const TOOL: &str = concat!("haf-core/", env!("CARGO_PKG_VERSION"));

#[derive(Clone, Debug, Default)]
pub struct PackOptions {
    /// When true, zero timestamps in manifest for deterministic output.
    pub deterministic: bool,
    /// Only keep the Huffman body if it saves at least this fraction.
    /// e.g. 0.05 means "compress only if >=5% smaller than STORE".
    /// 0.0 stores a file only when Huffman would make it bigger.
    pub min_gain: f32,
}

fn mtime_from(md: &std::fs::Metadata) -> i64 {
    md.modified()
        .ok()
        .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

fn effective_min_gain(opts: Option<&PackOptions>) -> f32 {
    let val = opts.map(|o| o.min_gain).unwrap_or(0.0);
    if val.is_finite() { val.clamp(0.0, 1.0) } else { 0.0 }
}

fn should_compress(u: u64, c: u64, min_gain: f32) -> bool {
    // true if (u - c) >= u * min_gain  ⇔  c <= u * (1 - min_gain)
    (u as f64 - c as f64) >= (u as f64 * min_gain as f64)
}

/// Final location of `archive_name` inside `dest_dir`.
pub fn archive_path(dest_dir: &Path, archive_name: &str) -> Result<PathBuf> {
    Ok(dest_dir.join(archive_file_name(archive_name)?))
}

fn source_names<P: AsRef<Path>>(sources: &[P]) -> Result<Vec<String>> {
    if sources.is_empty() {
        return Err(HafError::InvalidInput("no files to archive".into()));
    }
    let mut seen = HashSet::with_capacity(sources.len());
    let mut names = Vec::with_capacity(sources.len());
    for src in sources {
        let name = entry_name(src.as_ref())?;
        if !seen.insert(name.clone()) {
            return Err(HafError::InvalidInput(format!(
                "two sources share the file name {name:?}"
            )));
        }
        names.push(name);
    }
    Ok(names)
}

/// Pack `sources` into `dest_dir/<archive_name>.haf`.
///
/// Bodies are spooled to an anonymous temp file, then the header, manifest and
/// bodies are assembled in a temp file next to the destination and renamed
/// into place. Nothing is left behind under `dest_dir` when this returns an
/// error, including [`HafError::Cancelled`].
pub fn create<P: AsRef<Path>>(
    sources: &[P],
    dest_dir: &Path,
    archive_name: &str,
    opts: Option<&PackOptions>,
    progress: &mut dyn Progress,
) -> Result<Vec<FileRecord>> {
    let names = source_names(sources)?;
    let out_path = archive_path(dest_dir, archive_name)?;
    let deterministic = opts.map(|o| o.deterministic).unwrap_or(false);
    let min_gain = effective_min_gain(opts);
    let total = sources.len();
    let werr = |e: std::io::Error| HafError::write_failed(&out_path, e);

    let spool_file = tempfile::tempfile_in(dest_dir).map_err(|e| HafError::write_failed(dest_dir, e))?;
    let mut spool = BufWriter::new(spool_file);
    let mut records: Vec<FileRecord> = Vec::with_capacity(total);
    let mut body_off = 0u64;
    let mut trial = Vec::new();

    for (index, (src, name)) in sources.iter().zip(&names).enumerate() {
        checkpoint(progress)?;
        let src = src.as_ref();
        progress.step(Step::FileStarted {
            index,
            total,
            name,
        });

        let unreadable = |e: std::io::Error| HafError::SourceUnreadable {
            path: src.to_path_buf(),
            source: e,
        };
        let meta = fs::metadata(src).map_err(unreadable)?;
        if !meta.is_file() {
            return Err(unreadable(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "not a regular file",
            )));
        }
        let data = fs::read(src).map_err(unreadable)?;
        let u_size = data.len() as u64;

        // Trial encode to measure the Huffman body
        trial.clear();
        let h_size = HuffmanCompressor.compress(&data, &mut trial)?;
        let (codec, c_size) = if should_compress(u_size, h_size, min_gain) {
            spool.write_all(&trial).map_err(werr)?;
            (CodecId::Huffman, h_size)
        } else {
            let n = Store.compress(&data, &mut spool).map_err(|e| match e {
                HafError::Io(e) => werr(e),
                other => other,
            })?;
            (CodecId::Store, n)
        };

        debug!(file = %name, u_size, c_size, ?codec, "packed");
        records.push(FileRecord {
            name: name.clone(),
            codec,
            original_size: u_size,
            compressed_size: c_size,
            modified: if deterministic { 0 } else { mtime_from(&meta) },
            body_off,
            blake3: *blake3::hash(&data).as_bytes(),
        });
        body_off += c_size;

        progress.step(Step::FileFinished {
            index,
            total,
            name,
            original_size: u_size,
            compressed_size: c_size,
        });
    }
    checkpoint(progress)?;

    let created = if deterministic {
        0
    } else {
        OffsetDateTime::now_utc().unix_timestamp()
    };
    let manifest = Manifest {
        files: records,
        meta: Meta {
            created,
            tool: TOOL.to_string(),
        },
    };
    let manifest_buf = manifest.to_cbor()?;
    let sb = Superblock::new(manifest.files.len() as u64, manifest_buf.len() as u64);

    progress.step(Step::Finalizing { path: &out_path });

    let mut spool = spool.into_inner().map_err(|e| werr(e.into_error()))?;
    spool.seek(SeekFrom::Start(0)).map_err(werr)?;

    let tmp = tempfile::Builder::new()
        .prefix(".haf-")
        .suffix(".tmp")
        .tempfile_in(dest_dir)
        .map_err(werr)?;
    {
        let mut out_f = BufWriter::new(tmp.as_file());
        sb.write_to(&mut out_f).map_err(werr)?;
        out_f.write_all(&manifest_buf).map_err(werr)?;
        let copied = std::io::copy(&mut spool, &mut out_f).map_err(werr)?;
        if copied != body_off {
            return Err(werr(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                format!("body spool holds {copied} bytes, expected {body_off}"),
            )));
        }
        out_f.flush().map_err(werr)?;
    }
    tmp.as_file().sync_all().map_err(werr)?;
    tmp.persist(&out_path).map_err(|e| werr(e.error))?;

    info!(
        archive = %out_path.display(),
        files = manifest.files.len(),
        bytes = sb.data_off + body_off,
        "archive written"
    );
    Ok(manifest.files)
}
