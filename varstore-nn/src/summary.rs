use std::fmt;

use varstore_core::DType;

/// One row of a [`VarSummary`].
#[derive(Debug, Clone, PartialEq)]
pub struct VarInfo {
    pub name: String,
    pub shape: Vec<usize>,
    pub dtype: DType,
    pub trainable: bool,
}

/// Snapshot of a store's variables in insertion order.
///
/// Taking the snapshot never mutates the store; iterating it can be
/// restarted any number of times.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VarSummary {
    rows: Vec<VarInfo>,
}

impl VarSummary {
    pub fn iter(&self) -> std::slice::Iter<'_, VarInfo> {
        self.rows.iter()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Total number of elements across all variables.
    pub fn numel(&self) -> usize {
        self.rows.iter().map(|r| r.shape.iter().product::<usize>()).sum()
    }
}

impl FromIterator<VarInfo> for VarSummary {
    fn from_iter<I: IntoIterator<Item = VarInfo>>(iter: I) -> Self {
        VarSummary {
            rows: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a VarSummary {
    type Item = &'a VarInfo;
    type IntoIter = std::slice::Iter<'a, VarInfo>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

impl IntoIterator for VarSummary {
    type Item = VarInfo;
    type IntoIter = std::vec::IntoIter<VarInfo>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.into_iter()
    }
}

impl fmt::Display for VarSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self.rows.iter().map(|r| r.name.len()).max().unwrap_or(0).max(4);
        writeln!(f, "{:<width$}  {:<16}  {:<5}  trainable", "name", "shape", "dtype", width = width)?;
        for row in &self.rows {
            writeln!(
                f,
                "{:<width$}  {:<16}  {:<5}  {}",
                row.name,
                format!("{:?}", row.shape),
                format!("{:?}", row.dtype),
                row.trainable,
                width = width
            )?;
        }
        write!(f, "{} variables, {} elements", self.rows.len(), self.numel())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> VarSummary {
        vec![
            VarInfo { name: "a.w".to_string(), shape: vec![2, 3], dtype: DType::F32, trainable: true },
            VarInfo { name: "a.b".to_string(), shape: vec![3], dtype: DType::F32, trainable: false },
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_iteration_is_restartable() {
        let summary = sample();
        let first: Vec<&str> = summary.iter().map(|r| r.name.as_str()).collect();
        let second: Vec<&str> = (&summary).into_iter().map(|r| r.name.as_str()).collect();
        assert_eq!(first, vec!["a.w", "a.b"]);
        assert_eq!(first, second);
        assert_eq!(summary.numel(), 9);
    }

    #[test]
    fn test_display_lists_every_row() {
        let text = sample().to_string();
        assert!(text.contains("a.w"));
        assert!(text.contains("[2, 3]"));
        assert!(text.ends_with("2 variables, 9 elements"));
    }
}
