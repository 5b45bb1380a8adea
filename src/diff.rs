//! Ordered structural diff between two status lists.
//!
//! Elements are aligned on their longest common subsequence, so a status
//! that moves position shows up as a removal plus an addition.

use std::fmt;

use crate::error::Error;

/// Upper bound on the alignment table (`prev.len() * curr.len()`).
const MAX_CELLS: usize = 1 << 20;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    /// `value` appears at `index` of the current list only.
    Added { index: usize, value: String },
    /// `value` appeared at `index` of the previous list only.
    Removed { index: usize, value: String },
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Change::Added { value, .. } => write!(f, "+ `{value}`"),
            Change::Removed { value, .. } => write!(f, "- `{value}`"),
        }
    }
}

/// Returns the changes that turn `prev` into `curr`, in list order.
///
/// # Errors
///
/// Returns [`Error::Diff`] when the lists are too large to align.
pub fn diff(prev: &[String], curr: &[String]) -> Result<Vec<Change>, Error> {
    let (n, m) = (prev.len(), curr.len());
    let cells = (n + 1)
        .checked_mul(m + 1)
        .filter(|&cells| cells <= MAX_CELLS)
        .ok_or_else(|| Error::Diff(format!("lists of {n} and {m} entries are too large")))?;

    // lcs[i * (m + 1) + j] = LCS length of prev[i..] and curr[j..]
    let mut lcs = vec![0usize; cells];
    let at = |i: usize, j: usize| i * (m + 1) + j;
    for i in (0..n).rev() {
        for j in (0..m).rev() {
            lcs[at(i, j)] = if prev[i] == curr[j] {
                lcs[at(i + 1, j + 1)] + 1
            } else {
                lcs[at(i + 1, j)].max(lcs[at(i, j + 1)])
            };
        }
    }

    let mut changes = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < n || j < m {
        if i < n && j < m && prev[i] == curr[j] {
            i += 1;
            j += 1;
        } else if j == m || (i < n && lcs[at(i + 1, j)] >= lcs[at(i, j + 1)]) {
            changes.push(Change::Removed {
                index: i,
                value: prev[i].clone(),
            });
            i += 1;
        } else {
            changes.push(Change::Added {
                index: j,
                value: curr[j].clone(),
            });
            j += 1;
        }
    }

    Ok(changes)
}
