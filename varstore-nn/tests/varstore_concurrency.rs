use std::sync::Barrier;
use std::thread;

use varstore_nn::{StorageDevice, Var, VarStore};

mod common;
use common::{archive_path, init_logger};

#[test]
fn test_concurrent_creation_of_distinct_names() {
    init_logger();
    let vs = VarStore::new(StorageDevice::CPU);
    let n = 100;
    let vars: Vec<Var> = thread::scope(|s| {
        let handles: Vec<_> = (0..n)
            .map(|i| {
                let root = vs.root();
                s.spawn(move || {
                    root.sub(format!("layer{}", i))
                        .unwrap()
                        .kaiming_uniform("weight", &[4, 4])
                        .unwrap()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });
    assert_eq!(vs.len(), n);
    assert_eq!(vars.len(), n);
    for i in 0..n {
        assert!(vs.get(&format!("layer{}.weight", i)).is_some());
    }
}

#[test]
fn test_racing_creators_share_one_storage() {
    let vs = VarStore::new(StorageDevice::CPU);
    let racers = 16;
    let barrier = Barrier::new(racers);
    let vars: Vec<Var> = thread::scope(|s| {
        let handles: Vec<_> = (0..racers)
            .map(|i| {
                let root = vs.root();
                let barrier = &barrier;
                s.spawn(move || {
                    barrier.wait();
                    // Every racer asks for a different shape; only the winner's counts.
                    root.zeros("shared", &[i + 1]).unwrap()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });
    assert_eq!(vs.len(), 1);
    let winner_shape = vars[0].shape().unwrap();
    for v in &vars {
        assert!(v.same_storage(&vars[0]).unwrap());
        assert_eq!(v.shape().unwrap(), winner_shape);
    }
}

#[test]
fn test_readers_never_observe_a_partial_archive() {
    let dir = tempfile::tempdir().unwrap();
    let path = archive_path(&dir, "live.vsar");
    let vs = VarStore::new(StorageDevice::CPU);
    let w = vs.root().zeros("w", &[256, 64]).unwrap();
    vs.save(&path).unwrap();

    thread::scope(|s| {
        let reader_path = path.clone();
        let reader = s.spawn(move || {
            for _ in 0..200 {
                let records = varstore_nn::archive::read_file(&reader_path)
                    .expect("reader saw an incomplete archive");
                assert_eq!(records.len(), 1);
            }
        });
        for step in 0..20 {
            w.tensor().unwrap().fill_(step as f64).unwrap();
            vs.save(&path).unwrap();
        }
        reader.join().unwrap();
    });
}

#[test]
fn test_saving_while_other_threads_create() {
    let dir = tempfile::tempdir().unwrap();
    let path = archive_path(&dir, "busy.vsar");
    let vs = VarStore::new(StorageDevice::CPU);
    thread::scope(|s| {
        for t in 0..4 {
            let root = vs.root();
            s.spawn(move || {
                for i in 0..25 {
                    root.sub(format!("t{}", t)).unwrap().ones(&format!("v{}", i), &[2]).unwrap();
                }
            });
        }
        for _ in 0..5 {
            vs.save(&path).unwrap();
        }
    });
    vs.save(&path).unwrap();
    let records = varstore_nn::archive::read_file(&path).unwrap();
    assert_eq!(records.len(), 100);
}
