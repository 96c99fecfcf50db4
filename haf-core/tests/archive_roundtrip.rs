use haf_core::codec::CodecId;
use haf_core::container::superblock::HEADER_LEN;
use haf_core::progress::Silent;
use haf_core::{HafError, create, extract_all, list_contents, verify};
use std::fs;
use std::path::{Path, PathBuf};

fn write_sources(dir: &Path, files: &[(&str, Vec<u8>)]) -> Vec<PathBuf> {
    fs::create_dir_all(dir).unwrap();
    files
        .iter()
        .map(|(name, data)| {
            let p = dir.join(name);
            fs::write(&p, data).unwrap();
            p
        })
        .collect()
}

fn dir_names(dir: &Path) -> Vec<String> {
    let mut v: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    v.sort();
    v
}

fn abc_fixture() -> Vec<(&'static str, Vec<u8>)> {
    let a: Vec<u8> = (0u8..100).map(|i| i.wrapping_mul(37)).collect();
    let c = "It was the best of times, it was the worst of times. "
        .repeat(100)
        .into_bytes()[..5000]
        .to_vec();
    vec![("A", a), ("B", Vec::new()), ("C", c)]
}

#[test]
fn manifest_integrity_for_mixed_sizes() {
    let tmp = tempfile::tempdir().unwrap();
    let fixture = abc_fixture();
    let sources = write_sources(&tmp.path().join("src"), &fixture);
    let out = tmp.path().join("out");
    fs::create_dir_all(&out).unwrap();

    let written = create(&sources, &out, "abc", None, &mut Silent).unwrap();
    let archive = out.join("abc.haf");
    let listed = list_contents(&archive).unwrap();
    assert_eq!(listed, written);

    let names: Vec<&str> = listed.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, ["A", "B", "C"]);
    let sizes: Vec<u64> = listed.iter().map(|r| r.original_size).collect();
    assert_eq!(sizes, [100, 0, 5000]);

    assert_eq!(listed[1].compressed_size, 0);
    assert_eq!(listed[2].codec, CodecId::Huffman);
    assert!(listed[2].compressed_size < 5000);

    // bodies are contiguous and fill the file exactly
    let mut off = 0;
    for r in &listed {
        assert_eq!(r.body_off, off);
        off += r.compressed_size;
    }
    let header_and_manifest = fs::metadata(&archive).unwrap().len() - off;
    assert!(header_and_manifest > HEADER_LEN);

    let dest = tmp.path().join("dest");
    extract_all(&archive, &dest, &mut Silent).unwrap();
    for (name, data) in &fixture {
        assert_eq!(&fs::read(dest.join(name)).unwrap(), data, "{name}");
    }
    verify(&archive).unwrap();
}

#[test]
fn truncated_bodies_fail_extraction_but_not_listing() {
    let tmp = tempfile::tempdir().unwrap();
    let sources = write_sources(&tmp.path().join("src"), &abc_fixture());
    let out = tmp.path().join("out");
    fs::create_dir_all(&out).unwrap();
    create(&sources, &out, "abc", None, &mut Silent).unwrap();

    let archive = out.join("abc.haf");
    let bytes = fs::read(&archive).unwrap();
    fs::write(&archive, &bytes[..bytes.len() - 10]).unwrap();

    assert_eq!(list_contents(&archive).unwrap().len(), 3);

    let dest = tmp.path().join("dest");
    let err = extract_all(&archive, &dest, &mut Silent).unwrap_err();
    assert!(matches!(err, HafError::CorruptStream(_)), "{err}");
    assert!(dir_names(&dest).is_empty());
    assert!(matches!(verify(&archive), Err(HafError::CorruptStream(_))));
}

#[test]
fn foreign_missing_and_damaged_files_are_reported() {
    let tmp = tempfile::tempdir().unwrap();

    let text = tmp.path().join("notes.haf");
    fs::write(&text, "just some text that happens to be long enough").unwrap();
    let err = list_contents(&text).unwrap_err();
    assert!(matches!(err, HafError::NotAnArchive(_)));
    assert!(err.to_string().contains("not a .haf archive"));

    let err = list_contents(&tmp.path().join("nope.haf")).unwrap_err();
    assert!(matches!(&err, HafError::Io(e) if e.kind() == std::io::ErrorKind::NotFound));

    let sources = write_sources(&tmp.path().join("src"), &abc_fixture());
    create(&sources, tmp.path(), "good", None, &mut Silent).unwrap();
    let good = fs::read(tmp.path().join("good.haf")).unwrap();

    let mut damaged = good.clone();
    damaged[HEADER_LEN as usize] = 0xff;
    let bad = tmp.path().join("bad.haf");
    fs::write(&bad, &damaged).unwrap();
    assert!(matches!(
        list_contents(&bad),
        Err(HafError::CorruptManifest(_))
    ));

    let mut future = good;
    future[6] = 2;
    fs::write(&bad, &future).unwrap();
    assert!(matches!(
        list_contents(&bad),
        Err(HafError::UnsupportedVersion(2))
    ));
}

#[test]
fn extraction_replaces_existing_files() {
    let tmp = tempfile::tempdir().unwrap();
    let sources = write_sources(
        &tmp.path().join("src"),
        &[("same.txt", b"fresh content".to_vec())],
    );
    create(&sources, tmp.path(), "x", None, &mut Silent).unwrap();

    let dest = tmp.path().join("dest");
    fs::create_dir_all(&dest).unwrap();
    fs::write(dest.join("same.txt"), b"stale").unwrap();
    fs::write(dest.join("other.txt"), b"untouched").unwrap();

    extract_all(&tmp.path().join("x.haf"), &dest, &mut Silent).unwrap();
    assert_eq!(fs::read(dest.join("same.txt")).unwrap(), b"fresh content");
    assert_eq!(fs::read(dest.join("other.txt")).unwrap(), b"untouched");
    assert_eq!(dir_names(&dest), ["other.txt", "same.txt"]);
}
