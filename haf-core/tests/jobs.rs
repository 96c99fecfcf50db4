use haf_core::progress::Silent;
use haf_core::{EventKind, JobEvent, JobId, JobKind, JobRunner, JobState, ProgressLog, create};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

fn write_files(dir: &Path, prefix: &str, count: usize, size: usize) -> Vec<PathBuf> {
    fs::create_dir_all(dir).unwrap();
    (0..count)
        .map(|i| {
            let p = dir.join(format!("{prefix}{i:03}.txt"));
            let line = format!("{prefix} file number {i} with some repetitive text. ");
            let data: Vec<u8> = line.bytes().cycle().take(size).collect();
            fs::write(&p, data).unwrap();
            p
        })
        .collect()
}

fn by_job(events: Vec<JobEvent>) -> HashMap<JobId, Vec<JobEvent>> {
    let mut map: HashMap<JobId, Vec<JobEvent>> = HashMap::new();
    for ev in events {
        map.entry(ev.job).or_default().push(ev);
    }
    map
}

fn leftovers(dir: &Path) -> Vec<String> {
    fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|n| n.starts_with('.'))
        .collect()
}

/// Every line produced for a job names one of its own files, in order,
/// and the stream ends with exactly one terminal event.
fn assert_clean_stream(events: &[JobEvent], kind: JobKind, prefix: &str, files: usize) {
    assert!(events.iter().all(|e| e.job_kind == kind));
    let (last, body) = events.split_last().unwrap();
    assert_eq!(last.kind, EventKind::Finished);
    assert!(body.iter().all(|e| !e.is_terminal()));

    let (doing, done) = match kind {
        JobKind::Archive => ("compressing", "compressed"),
        JobKind::Unarchive => ("extracting", "extracted"),
    };
    let mut expected = 0;
    for pair in body[..files * 2].chunks(2) {
        let name = format!("{prefix}{expected:03}.txt");
        assert!(
            matches!(&pair[0].kind, EventKind::Progress(l) if l.starts_with(&format!("{doing} {name} "))),
            "{:?}",
            pair[0]
        );
        assert!(
            matches!(&pair[1].kind, EventKind::ProgressReplace(l) if l.starts_with(&format!("{done} {name} "))),
            "{:?}",
            pair[1]
        );
        expected += 1;
    }
    assert_eq!(expected, files);
    assert!(matches!(&body[files * 2].kind, EventKind::Progress(l) if l.starts_with("writing ")));
    assert_eq!(body.len(), files * 2 + 1);
}

#[test]
fn concurrent_archive_and_unarchive_streams_stay_separate() {
    let tmp = tempfile::tempdir().unwrap();

    // archive to unpack while another is being written
    let old = write_files(&tmp.path().join("old"), "old", 12, 4_000);
    create(&old, tmp.path(), "old", None, &mut Silent).unwrap();

    let new = write_files(&tmp.path().join("new"), "new", 15, 6_000);
    let runner = JobRunner::new();
    let rx = runner.events();

    let pack = runner.submit_archive(new, tmp.path().to_path_buf(), "new".into());
    let unpack = runner.submit_unarchive(tmp.path().join("old.haf"), tmp.path().join("restored"));
    assert_ne!(pack, unpack);

    assert_eq!(runner.wait(pack), Some(JobState::Succeeded));
    assert_eq!(runner.wait(unpack), Some(JobState::Succeeded));

    let events: Vec<JobEvent> = rx.try_iter().collect();
    let mut log = ProgressLog::new();
    for ev in &events {
        log.apply(ev);
    }

    let mut streams = by_job(events);
    assert_clean_stream(&streams.remove(&pack).unwrap(), JobKind::Archive, "new", 15);
    assert_clean_stream(&streams.remove(&unpack).unwrap(), JobKind::Unarchive, "old", 12);
    assert!(streams.is_empty());

    // each file collapses into one line, plus "writing" and the status line
    assert_eq!(log.lines().len(), 15 + 2 + 12 + 2);
    assert!(log.lines().contains(&format!("[{pack}] archiving completed")));
    assert!(log.lines().contains(&format!("[{unpack}] unarchiving completed")));

    for p in &old {
        let name = p.file_name().unwrap();
        assert_eq!(
            fs::read(tmp.path().join("restored").join(name)).unwrap(),
            fs::read(p).unwrap()
        );
    }
    assert!(leftovers(tmp.path()).is_empty());
}

#[test]
fn cancelled_archive_job_leaves_no_artifacts() {
    let tmp = tempfile::tempdir().unwrap();
    let sources = write_files(&tmp.path().join("src"), "big", 40, 256 * 1024);
    let out = tmp.path().join("out");
    fs::create_dir_all(&out).unwrap();

    let runner = JobRunner::new();
    let rx = runner.events();
    let id = runner.submit_archive(sources, out.clone(), "big".into());

    // cancel once the first file is done, with 39 still to go
    let mut events = Vec::new();
    for ev in rx.iter().filter(|e| e.job == id) {
        let first_done = matches!(ev.kind, EventKind::ProgressReplace(_));
        assert!(!ev.is_terminal(), "job ended before it could be cancelled: {ev:?}");
        events.push(ev);
        if first_done {
            break;
        }
    }
    assert!(runner.cancel(id));

    assert_eq!(runner.wait(id), Some(JobState::Cancelled));
    events.extend(rx.try_iter().filter(|e| e.job == id));
    let terminal: Vec<&JobEvent> = events.iter().filter(|e| e.is_terminal()).collect();
    assert_eq!(terminal.len(), 1);
    assert_eq!(events.last().unwrap().kind, EventKind::Cancelled);
    assert!(
        !events
            .iter()
            .any(|e| matches!(&e.kind, EventKind::Progress(l) if l.starts_with("writing ")))
    );

    assert!(!out.join("big.haf").exists());
    assert!(leftovers(&out).is_empty());
    assert!(!runner.cancel(id));
}

#[test]
fn subscriptions_start_when_taken_and_finished_jobs_can_be_forgotten() {
    let tmp = tempfile::tempdir().unwrap();
    let files = write_files(&tmp.path().join("src"), "sub", 4, 2_000);
    let runner = JobRunner::new();
    let early = runner.events();
    let id = runner.submit_archive(files, tmp.path().to_path_buf(), "sub".into());

    let mut seen = 0;
    for ev in early.iter().filter(|e| e.job == id) {
        seen += 1;
        if ev.is_terminal() {
            break;
        }
    }
    let late = runner.events();
    assert_eq!(runner.wait(id), Some(JobState::Succeeded));
    assert_eq!(seen, 4 * 2 + 2);
    assert_eq!(late.try_iter().count(), 0);

    assert!(runner.forget(id));
    assert_eq!(runner.state(id), None);
    assert!(runner.reap().is_empty());
}

#[test]
fn failed_job_does_not_disturb_its_neighbour() {
    let tmp = tempfile::tempdir().unwrap();
    let good = write_files(&tmp.path().join("src"), "ok", 3, 1_000);
    let runner = JobRunner::new();
    let rx = runner.events();

    let bad = runner.submit_archive(
        vec![tmp.path().join("does-not-exist")],
        tmp.path().to_path_buf(),
        "bad".into(),
    );
    let ok = runner.submit_archive(good, tmp.path().to_path_buf(), "ok".into());

    assert_eq!(runner.wait(bad), Some(JobState::Failed));
    assert_eq!(runner.wait(ok), Some(JobState::Succeeded));

    let streams = by_job(rx.try_iter().collect());
    let bad_events = &streams[&bad];
    assert!(
        matches!(&bad_events.last().unwrap().kind, EventKind::Error(m) if m.contains("does-not-exist"))
    );
    assert_clean_stream(&streams[&ok], JobKind::Archive, "ok", 3);
    assert!(!tmp.path().join("bad.haf").exists());
    assert!(tmp.path().join("ok.haf").exists());
}
