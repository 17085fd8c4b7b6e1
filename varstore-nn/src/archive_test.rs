use super::*;
use std::io::Write;

fn record(name: &str, shape: Vec<usize>, fill: u8) -> Record {
    let nbytes = shape.iter().product::<usize>() * DType::F32.size_of();
    Record {
        name: name.to_string(),
        dtype: DType::F32,
        shape,
        data: vec![fill; nbytes],
    }
}

fn encode(records: &[Record]) -> Vec<u8> {
    let mut buf = Vec::new();
    write_records(&mut buf, records).unwrap();
    buf
}

#[test]
fn test_header_layout() {
    let buf = encode(&[]);
    assert_eq!(&buf[..4], MAGIC);
    assert_eq!(&buf[4..8], &VERSION.to_le_bytes());
    assert_eq!(&buf[8..12], &0u32.to_le_bytes());
    assert_eq!(buf.len(), 12);
}

#[test]
fn test_records_keep_their_order() {
    let records = vec![record("z", vec![2], 1), record("a.b", vec![1, 3], 2), record("m", vec![], 3)];
    let decoded = read_records(&encode(&records)).unwrap();
    assert_eq!(decoded, records);
}

#[test]
fn test_bad_magic_and_version() {
    let mut buf = encode(&[record("x", vec![1], 0)]);
    buf[0] = b'X';
    assert!(matches!(read_records(&buf), Err(VarStoreError::Serialization(_))));

    let mut buf = encode(&[record("x", vec![1], 0)]);
    buf[4..8].copy_from_slice(&2u32.to_le_bytes());
    match read_records(&buf) {
        Err(VarStoreError::Serialization(msg)) => assert!(msg.contains("version 2")),
        other => panic!("Expected Serialization error, got {:?}", other),
    }
}

#[test]
fn test_truncated_archive_is_rejected() {
    let buf = encode(&[record("x", vec![4], 7)]);
    for cut in [3, 11, 20, buf.len() - 1] {
        assert!(
            matches!(read_records(&buf[..cut]), Err(VarStoreError::Serialization(_))),
            "cut at {} should fail",
            cut
        );
    }
}

#[test]
fn test_trailing_bytes_are_rejected() {
    let mut buf = encode(&[record("x", vec![1], 7)]);
    buf.push(0);
    assert!(read_records(&buf).is_err());
}

#[test]
fn test_duplicate_names_are_rejected() {
    let buf = encode(&[record("x", vec![1], 1), record("x", vec![1], 2)]);
    match read_records(&buf) {
        Err(VarStoreError::Serialization(msg)) => assert!(msg.contains("duplicate")),
        other => panic!("Expected Serialization error, got {:?}", other),
    }
}

#[test]
fn test_writer_checks_payload_length_and_count() {
    let mut buf = Vec::new();
    let mut writer = ArchiveWriter::new(&mut buf, 1).unwrap();
    let err = writer.write_record("x", DType::F64, &[2], &[0u8; 8]).unwrap_err();
    assert!(matches!(err, VarStoreError::Serialization(_)));
    assert!(writer.finish().is_err());
}

#[test]
fn test_write_atomic_replaces_target() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("vars.vsar");
    fs::write(&path, b"old").unwrap();
    write_atomic(&path, true, |w| {
        w.write_all(b"new contents").map_err(|e| VarStoreError::io(Path::new("test"), e))
    })
    .unwrap();
    assert_eq!(fs::read(&path).unwrap(), b"new contents");
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
}

#[test]
fn test_failure_before_rename_leaves_target_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("vars.vsar");
    fs::write(&path, b"old").unwrap();
    let result = write_atomic(&path, false, |w| {
        w.write_all(b"half a rec").unwrap();
        Err(VarStoreError::Serialization("injected fault".to_string()))
    });
    assert_eq!(result, Err(VarStoreError::Serialization("injected fault".to_string())));
    assert_eq!(fs::read(&path).unwrap(), b"old");
    // The temporary file is gone as well.
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
}

#[test]
fn test_failed_rename_reports_io() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("occupied");
    fs::create_dir(&target).unwrap();
    fs::write(target.join("keep"), b"x").unwrap();
    let result = write_atomic(&target, false, |w| {
        w.write_all(b"data").map_err(|e| VarStoreError::io(Path::new("test"), e))
    });
    assert!(matches!(result, Err(VarStoreError::Io { .. })));
    assert!(target.is_dir());
    assert_eq!(fs::read(target.join("keep")).unwrap(), b"x");
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
}

#[test]
fn test_read_missing_file_is_io() {
    let dir = tempfile::tempdir().unwrap();
    let result = read_file(&dir.path().join("absent.vsar"));
    match result {
        Err(VarStoreError::Io { kind, .. }) => assert_eq!(kind, io::ErrorKind::NotFound),
        other => panic!("Expected Io error, got {:?}", other),
    }
}

#[test]
fn test_header_lengths_must_fit_in_u32() {
    assert_eq!(length_u32("name length", 7).unwrap(), 7);
    assert_eq!(length_u32("rank", u32::MAX as usize).unwrap(), u32::MAX);
    #[cfg(target_pointer_width = "64")]
    {
        let err = length_u32("name length", u32::MAX as usize + 1).unwrap_err();
        assert!(matches!(err, VarStoreError::Serialization(msg) if msg.contains("name length")));
    }
}
