//! End-to-end ingestion: worker thread → events → applier → grid.

use crate::helpers::{WAIT, numbered_csv, pipe, write_file};
use gridplot::Workbench;
use gridplot::data::{
    DataError, GridStore, IngestOptions, IngestSource, IngestionApplier, IngestionEvent,
    IngestionJob, JobState,
};
use std::time::Duration;
use tempfile::tempdir;

fn options(chunk_size: usize) -> IngestOptions {
    IngestOptions::default().with_chunk_size(chunk_size)
}

#[test]
fn test_row_count_independent_of_chunk_size() {
    let dir = tempdir().unwrap();
    let path = write_file(dir.path(), "n.csv", numbered_csv(23));

    for chunk_size in [1, 2, 5, 22, 23, 24, 500] {
        let mut bench = Workbench::default();
        bench.load_with(IngestSource::Path(path.clone()), &options(chunk_size)).unwrap();

        assert_eq!(bench.finish_load(), JobState::Completed, "chunk {}", chunk_size);
        assert_eq!(bench.store().headers(), &["id", "value"]);
        assert_eq!(bench.store().row_count(), 23, "chunk {}", chunk_size);
        assert_eq!(bench.store().get_cell(22, 1).unwrap(), "220");
    }
}

#[test]
fn test_ragged_rows_widen_grid() {
    let dir = tempdir().unwrap();
    let path = write_file(dir.path(), "r.csv", "h1,h2\na,b,c\n1,2,3,4,5\nx,y\n");

    let mut bench = Workbench::default();
    bench
        .load_with(IngestSource::Path(path), &options(10).with_header(false))
        .unwrap();
    assert_eq!(bench.finish_load(), JobState::Completed);

    let store = bench.store();
    assert_eq!(store.column_count(), 5);
    assert_eq!(store.row_count(), 4);
    assert_eq!(store.headers(), &["Col 0", "Col 1", "Col 2", "Col 3", "Col 4"]);
    assert_eq!(store.snapshot().rows()[1], vec!["a", "b", "c", "", ""]);
    assert_eq!(store.snapshot().rows()[3], vec!["x", "y", "", "", ""]);
}

#[test]
fn test_ragged_widths_three_five_two() {
    let mut bench = Workbench::default();
    bench
        .load_with(
            IngestSource::reader(std::io::Cursor::new("a,b,c\n1,2,3,4,5\n1,2\n")),
            &options(1).with_header(false),
        )
        .unwrap();
    bench.finish_load();

    assert_eq!(bench.store().column_count(), 5);
    assert!(bench.snapshot().rows().iter().all(|r| r.len() == 5));
}

#[test]
fn test_no_header_replays_first_row() {
    let mut bench = Workbench::default();
    bench
        .load_with(
            IngestSource::reader(std::io::Cursor::new("1,2\n3,4\n")),
            &options(1).with_header(false),
        )
        .unwrap();
    bench.finish_load();

    assert_eq!(bench.store().headers(), &["Col 0", "Col 1"]);
    assert_eq!(bench.store().row_count(), 2);
    assert_eq!(bench.store().get_cell(0, 0).unwrap(), "1");
}

#[test]
fn test_event_sequence_from_worker() {
    let job = IngestionJob::start(
        IngestSource::reader(std::io::Cursor::new(numbered_csv(5))),
        &options(2),
    )
    .unwrap();

    let mut events = Vec::new();
    while let Some(event) = job.next_blocking() {
        events.push(event);
    }

    assert!(matches!(events[0], IngestionEvent::HeaderReady { .. }));
    let chunk_sizes: Vec<usize> = events
        .iter()
        .filter_map(|e| match e {
            IngestionEvent::ChunkReady(rows) => Some(rows.len()),
            _ => None,
        })
        .collect();
    assert_eq!(chunk_sizes, vec![2, 2, 1]);
    assert_eq!(events.last(), Some(&IngestionEvent::Completed { rows: 5 }));
    assert_eq!(events.iter().filter(|e| e.is_terminal()).count(), 1);
    assert_eq!(job.state(), JobState::Completed);
}

#[test]
fn test_cancel_mid_stream() {
    let (tx, reader) = pipe();
    let job = IngestionJob::start(IngestSource::reader(reader), &options(2)).unwrap();
    let mut store = GridStore::new();
    let mut applier = IngestionApplier::new();

    tx.send(b"id,value\n1,10\n2,20\n".to_vec()).unwrap();
    let header = job.next_timeout(WAIT).expect("header");
    assert!(matches!(header, IngestionEvent::HeaderReady { .. }));
    applier.apply(&mut store, header);

    let first = job.next_timeout(WAIT).expect("first chunk");
    assert!(matches!(&first, IngestionEvent::ChunkReady(rows) if rows.len() == 2));
    applier.apply(&mut store, first);

    tx.send(b"3,30\n4,40\n".to_vec()).unwrap();
    let second = job.next_timeout(WAIT).expect("second chunk");
    assert!(matches!(&second, IngestionEvent::ChunkReady(rows) if rows.len() == 2));
    applier.apply(&mut store, second);

    assert!(!job.is_cancel_requested());
    job.cancel();
    assert!(job.is_cancel_requested());
    let _ = tx.send(b"5,50\n6,60\n".to_vec());
    drop(tx);

    let terminal = job.next_timeout(WAIT).expect("terminal event");
    assert_eq!(terminal, IngestionEvent::Cancelled { rows: 4 });
    assert_eq!(applier.apply(&mut store, terminal), Some(JobState::Cancelled));

    assert!(job.next_timeout(Duration::from_millis(100)).is_none());
    assert_eq!(store.row_count(), 4);
    assert_eq!(job.state(), JobState::Cancelled);
}

#[test]
fn test_blocked_source_leaves_owner_responsive() {
    let (tx, reader) = pipe();
    let mut bench = Workbench::default();
    bench.load_with(IngestSource::reader(reader), &options(4)).unwrap();

    // Worker is blocked reading; the owner keeps editing
    assert!(bench.pump().is_none());
    bench.store_mut().set_cell(0, 0, "still here").unwrap();
    assert_eq!(bench.store().get_cell(0, 0).unwrap(), "still here");
    assert_eq!(bench.ingestion_state(), JobState::Running);

    tx.send(b"a,b\n1,2\n".to_vec()).unwrap();
    drop(tx);
    assert_eq!(bench.finish_load(), JobState::Completed);
    assert_eq!(bench.store().headers(), &["a", "b"]);
    assert_eq!(bench.store().row_count(), 1);
}

#[test]
fn test_pump_applies_until_terminal() {
    let mut bench = Workbench::default();
    bench
        .load_with(
            IngestSource::reader(std::io::Cursor::new(numbered_csv(10))),
            &options(3),
        )
        .unwrap();

    let deadline = std::time::Instant::now() + WAIT;
    let state = loop {
        if let Some(state) = bench.pump() {
            break state;
        }
        assert!(std::time::Instant::now() < deadline, "load did not finish");
        std::thread::sleep(Duration::from_millis(5));
    };

    assert_eq!(state, JobState::Completed);
    assert!(!bench.is_loading());
    assert_eq!(bench.store().row_count(), 10);
}

#[test]
fn test_missing_file_fails_job() {
    let dir = tempdir().unwrap();
    let mut bench = Workbench::default();
    bench.load_csv(dir.path().join("absent.csv")).unwrap();

    assert!(matches!(bench.finish_load(), JobState::Failed(_)));
    assert!(matches!(bench.ingestion_state(), JobState::Failed(_)));
}

#[test]
fn test_undecodable_source_fails_job() {
    let dir = tempdir().unwrap();
    let path = write_file(dir.path(), "bad.csv", b"a,b\n1,\xC3\x28\n".as_slice());

    let mut bench = Workbench::default();
    bench.load_csv(&path).unwrap();
    match bench.finish_load() {
        JobState::Failed(reason) => assert!(reason.contains("decode"), "{}", reason),
        other => panic!("expected failure, got {:?}", other),
    }
}

/// Loads `content`, recording every event as it is applied
fn load_events(content: Vec<u8>, chunk_size: usize) -> (Vec<IngestionEvent>, GridStore) {
    let job = IngestionJob::start(
        IngestSource::reader(std::io::Cursor::new(content)),
        &options(chunk_size),
    )
    .unwrap();
    let mut store = GridStore::new();
    let mut applier = IngestionApplier::new();
    let mut events = Vec::new();
    while let Some(event) = job.next_timeout(WAIT) {
        events.push(event.clone());
        if applier.apply(&mut store, event).is_some() {
            break;
        }
    }
    (events, store)
}

#[test]
fn test_rows_ahead_of_bad_byte_are_applied() {
    let (events, store) = load_events(b"a,b\n1,2\n3,4\n5,\xFF\n".to_vec(), 1);

    assert_eq!(events.len(), 4);
    assert!(matches!(&events[0], IngestionEvent::HeaderReady { headers, .. } if headers == &["a", "b"]));
    assert_eq!(events[1], IngestionEvent::ChunkReady(vec![vec!["1".into(), "2".into()]]));
    assert_eq!(events[2], IngestionEvent::ChunkReady(vec![vec!["3".into(), "4".into()]]));
    assert!(matches!(&events[3], IngestionEvent::Failed(reason) if reason.contains("decode")));

    assert_eq!(store.headers(), &["a", "b"]);
    assert_eq!(store.row_count(), 2);
    assert_eq!(store.get_cell(1, 1).unwrap(), "4");
}

#[test]
fn test_bad_byte_past_first_decode_block() {
    let mut content = numbered_csv(2000).into_bytes();
    assert!(content.len() > 8 * 1024);
    content.extend_from_slice(b"2000,\xFF\n");

    let (events, store) = load_events(content, 100);

    assert!(matches!(events[0], IngestionEvent::HeaderReady { .. }));
    let chunks = events
        .iter()
        .filter(|e| matches!(e, IngestionEvent::ChunkReady(rows) if rows.len() == 100))
        .count();
    assert_eq!(chunks, 20);
    assert!(matches!(events.last(), Some(IngestionEvent::Failed(_))));
    assert_eq!(events.iter().filter(|e| e.is_terminal()).count(), 1);
    assert_eq!(events.len(), 22);

    assert_eq!(store.row_count(), 2000);
    assert_eq!(store.get_cell(1999, 1).unwrap(), "19990");
}

#[test]
fn test_latin1_source() {
    let dir = tempdir().unwrap();
    let path = write_file(dir.path(), "l.csv", b"name,n\nJos\xE9,1\n".as_slice());

    let mut bench = Workbench::default();
    bench
        .load_with(IngestSource::Path(path), &options(10).with_encoding("latin1"))
        .unwrap();
    assert_eq!(bench.finish_load(), JobState::Completed);
    assert_eq!(bench.store().get_cell(0, 0).unwrap(), "José");
}

#[test]
fn test_empty_file() {
    let dir = tempdir().unwrap();
    let path = write_file(dir.path(), "empty.csv", "");

    let mut bench = Workbench::default();
    bench.load_csv(&path).unwrap();
    assert_eq!(bench.finish_load(), JobState::Completed);
    assert_eq!(bench.store().row_count(), 0);
    assert_eq!(bench.store().column_count(), 0);
}

#[test]
fn test_invalid_options_rejected_before_start() {
    let mut bench = Workbench::default();
    let result = bench.load_with(
        IngestSource::reader(std::io::empty()),
        &options(0),
    );
    assert!(matches!(result, Err(DataError::InvalidOptions(_))));
    assert!(!bench.is_loading());
    assert_eq!(bench.store().row_count(), 3);
}

#[test]
fn test_new_load_supersedes_running_one() {
    let (_tx, reader) = pipe();
    let mut bench = Workbench::default();
    let first = bench.load_with(IngestSource::reader(reader), &options(2)).unwrap();
    let second = bench
        .load_with(
            IngestSource::reader(std::io::Cursor::new(numbered_csv(3))),
            &options(2),
        )
        .unwrap();

    assert_ne!(first, second);
    assert_eq!(bench.load_id(), Some(second));
    assert_eq!(bench.finish_load(), JobState::Completed);
    assert_eq!(bench.store().row_count(), 3);
}
