// Archive format for variable store snapshots.
//
// All integers are little-endian.
//
//   Header:
//     magic:   [u8; 4]  = b"VSAR"
//     version: u32      = 1
//     count:   u32      = number of records
//
//   For each record, in registry insertion order:
//     name_len: u32
//     name:     [u8; name_len]  (UTF-8 fully qualified name)
//     dtype:    u8              (0=F32, 1=F64, 2=I64)
//     ndim:     u32
//     dims:     [u64; ndim]     (every dim > 0)
//     nbytes:   u64
//     data:     [u8; nbytes]    (nbytes = product(dims) * size_of(dtype))

use std::collections::HashSet;
use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use varstore_core::{DType, VarStoreError};

pub const MAGIC: &[u8; 4] = b"VSAR";
pub const VERSION: u32 = 1;

/// One persisted variable.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub name: String,
    pub dtype: DType,
    pub shape: Vec<usize>,
    pub data: Vec<u8>,
}

fn stream_err(e: io::Error) -> VarStoreError {
    VarStoreError::Io {
        kind: e.kind(),
        path: "<archive stream>".to_string(),
        message: e.to_string(),
    }
}

fn corrupt(msg: impl Into<String>) -> VarStoreError {
    VarStoreError::Serialization(format!("malformed archive: {}", msg.into()))
}

fn expected_nbytes(shape: &[usize], dtype: DType) -> Option<usize> {
    shape
        .iter()
        .try_fold(dtype.size_of(), |acc, &d| acc.checked_mul(d))
}

/// Narrows a length to the `u32` used in the header fields.
fn length_u32(what: &str, len: usize) -> Result<u32, VarStoreError> {
    u32::try_from(len)
        .map_err(|_| VarStoreError::Serialization(format!("{} {} does not fit in 32 bits", what, len)))
}

/// Streams records into `inner`, one at a time.
///
/// The record count is written up front, so exactly `count` records must be
/// written before [`ArchiveWriter::finish`].
pub struct ArchiveWriter<W: Write> {
    inner: W,
    remaining: u32,
}

impl<W: Write> ArchiveWriter<W> {
    pub fn new(mut inner: W, count: usize) -> Result<Self, VarStoreError> {
        let count = length_u32("record count", count)?;
        inner.write_all(MAGIC).map_err(stream_err)?;
        inner.write_all(&VERSION.to_le_bytes()).map_err(stream_err)?;
        inner.write_all(&count.to_le_bytes()).map_err(stream_err)?;
        Ok(Self {
            inner,
            remaining: count,
        })
    }

    pub fn write_record(
        &mut self,
        name: &str,
        dtype: DType,
        shape: &[usize],
        data: &[u8],
    ) -> Result<(), VarStoreError> {
        if self.remaining == 0 {
            return Err(VarStoreError::Serialization(
                "more records written than announced".to_string(),
            ));
        }
        if !dtype.is_storable() {
            return Err(VarStoreError::Serialization(format!(
                "dtype {:?} cannot be archived",
                dtype
            )));
        }
        if expected_nbytes(shape, dtype) != Some(data.len()) {
            return Err(VarStoreError::Serialization(format!(
                "'{}': {} bytes do not match shape {:?} of {:?}",
                name,
                data.len(),
                shape,
                dtype
            )));
        }
        let name_len = length_u32("name length", name.len())?;
        let rank = length_u32("rank", shape.len())?;
        let w = &mut self.inner;
        w.write_all(&name_len.to_le_bytes()).map_err(stream_err)?;
        w.write_all(name.as_bytes()).map_err(stream_err)?;
        w.write_all(&[dtype.tag()]).map_err(stream_err)?;
        w.write_all(&rank.to_le_bytes()).map_err(stream_err)?;
        for &d in shape {
            w.write_all(&(d as u64).to_le_bytes()).map_err(stream_err)?;
        }
        w.write_all(&(data.len() as u64).to_le_bytes()).map_err(stream_err)?;
        w.write_all(data).map_err(stream_err)?;
        self.remaining -= 1;
        Ok(())
    }

    pub fn finish(mut self) -> Result<W, VarStoreError> {
        if self.remaining != 0 {
            return Err(VarStoreError::Serialization(format!(
                "{} announced records were never written",
                self.remaining
            )));
        }
        self.inner.flush().map_err(stream_err)?;
        Ok(self.inner)
    }
}

/// Writes a complete archive of `records`.
pub fn write_records<W: Write>(inner: W, records: &[Record]) -> Result<(), VarStoreError> {
    let mut writer = ArchiveWriter::new(inner, records.len())?;
    for r in records {
        writer.write_record(&r.name, r.dtype, &r.shape, &r.data)?;
    }
    writer.finish()?;
    Ok(())
}

struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8], VarStoreError> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|&end| end <= self.bytes.len())
            .ok_or_else(|| corrupt(format!("truncated at byte {}", self.pos)))?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn u8(&mut self) -> Result<u8, VarStoreError> {
        Ok(self.take(1)?[0])
    }

    fn u32(&mut self) -> Result<u32, VarStoreError> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn u64(&mut self) -> Result<u64, VarStoreError> {
        let b = self.take(8)?;
        Ok(u64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]))
    }

    fn usize(&mut self) -> Result<usize, VarStoreError> {
        let v = self.u64()?;
        usize::try_from(v).map_err(|_| corrupt(format!("value {} does not fit in usize", v)))
    }
}

/// Parses a complete archive held in memory.
///
/// # Errors
/// `Serialization` for a bad magic, an unknown version or dtype tag, a zero
/// dimension, a payload whose length does not match its shape, a duplicate
/// name, truncation or trailing bytes.
pub fn read_records(bytes: &[u8]) -> Result<Vec<Record>, VarStoreError> {
    let mut cur = Cursor { bytes, pos: 0 };
    if cur.take(4).map_err(|_| corrupt("missing header"))? != MAGIC {
        return Err(corrupt("bad magic"));
    }
    let version = cur.u32()?;
    if version != VERSION {
        return Err(VarStoreError::Serialization(format!(
            "unsupported archive version {} (expected {})",
            version, VERSION
        )));
    }
    let count = cur.u32()? as usize;
    let mut records = Vec::new();
    let mut seen = HashSet::new();
    for _ in 0..count {
        let name_len = cur.u32()? as usize;
        let name = std::str::from_utf8(cur.take(name_len)?)
            .map_err(|_| corrupt("record name is not UTF-8"))?
            .to_string();
        let tag = cur.u8()?;
        let dtype = DType::from_tag(tag)
            .filter(DType::is_storable)
            .ok_or_else(|| corrupt(format!("'{}': unknown dtype tag {}", name, tag)))?;
        let ndim = cur.u32()? as usize;
        let mut shape = Vec::new();
        for _ in 0..ndim {
            let d = cur.usize()?;
            if d == 0 {
                return Err(corrupt(format!("'{}': zero dimension", name)));
            }
            shape.push(d);
        }
        let nbytes = cur.usize()?;
        if expected_nbytes(&shape, dtype) != Some(nbytes) {
            return Err(corrupt(format!(
                "'{}': {} bytes do not match shape {:?} of {:?}",
                name, nbytes, shape, dtype
            )));
        }
        let data = cur.take(nbytes)?.to_vec();
        if !seen.insert(name.clone()) {
            return Err(corrupt(format!("duplicate record '{}'", name)));
        }
        records.push(Record {
            name,
            dtype,
            shape,
            data,
        });
    }
    if cur.pos != bytes.len() {
        return Err(corrupt(format!("{} trailing bytes", bytes.len() - cur.pos)));
    }
    Ok(records)
}

/// Reads and parses the archive at `path`.
pub fn read_file(path: &Path) -> Result<Vec<Record>, VarStoreError> {
    let bytes = fs::read(path).map_err(|e| VarStoreError::io(path, e))?;
    read_records(&bytes)
}

/// Writes `path` atomically: `write` fills a temporary file created next to
/// `path`, which is renamed over `path` only once `write` succeeded.
///
/// On any failure the temporary file is removed and `path` is untouched.
pub fn write_atomic<F>(path: &Path, sync: bool, write: F) -> Result<(), VarStoreError>
where
    F: FnOnce(&mut dyn Write) -> Result<(), VarStoreError>,
{
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::Builder::new()
        .prefix(".vsar-")
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(|e| VarStoreError::io(dir, e))?;
    {
        let mut writer = BufWriter::new(tmp.as_file_mut());
        write(&mut writer)?;
        writer.flush().map_err(|e| VarStoreError::io(path, e))?;
    }
    if sync {
        tmp.as_file().sync_all().map_err(|e| VarStoreError::io(path, e))?;
    }
    tmp.persist(path).map_err(|e| VarStoreError::io(path, e.error))?;
    Ok(())
}

#[cfg(test)]
#[path = "archive_test.rs"]
mod tests;
