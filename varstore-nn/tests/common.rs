use std::path::PathBuf;

use varstore_nn::{Path, Var, VarStoreError};

#[allow(dead_code)]
pub(crate) fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Declares the small model used across the save/load tests:
/// `a.b.t2` (ones, [3]), `t1` (zeros, [4]) and `a.b.ccc.t123` (ones, [3], declared twice).
#[allow(dead_code)]
pub(crate) fn declare_model(root: &Path) -> Result<(Var, Var), VarStoreError> {
    let v = root.sub("a")?.sub("b")?.entry("t2")?.or_ones(&[3])?;
    let u = root.entry("t1")?.or_zeros(&[4])?;
    let c = root.sub("a")?.sub("b")?.sub("ccc")?;
    c.ones("t123", &[3])?;
    c.ones("t123", &[3])?;
    Ok((u, v))
}

#[allow(dead_code)]
pub(crate) fn archive_path(dir: &tempfile::TempDir, name: &str) -> PathBuf {
    dir.path().join(name)
}
