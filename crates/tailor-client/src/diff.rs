//! Line-level diff of an original document against its revision.
//!
//! Lines keep their `\n` terminator, so a final line without one differs
//! from the same text with one. The alignment is a longest common
//! subsequence over lines. When several minimal alignments exist, matches
//! are taken greedily from the start, and inside a changed block removed
//! lines come before added ones. For `x y` against `y x` this gives
//! `-x`, ` y`, `+x`.

use std::collections::{HashMap, HashSet};

/// Classification of a diff run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffKind {
    Unchanged,
    Added,
    Removed,
}

/// Maximal span of consecutive lines sharing one [`DiffKind`].
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct DiffRun {
    pub kind: DiffKind,
    pub text: String,
}

impl DiffRun {
    fn new(kind: DiffKind, text: &str) -> Self {
        Self {
            kind,
            text: text.to_string(),
        }
    }

    /// Number of lines in this run (a final unterminated line counts).
    pub fn line_count(&self) -> usize {
        self.text.split_inclusive('\n').count()
    }
}

/// Line totals over a diff.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DiffStats {
    pub unchanged: usize,
    pub added: usize,
    pub removed: usize,
}

impl DiffStats {
    /// Counts lines per kind.
    pub fn from_runs(runs: &[DiffRun]) -> Self {
        runs.iter().fold(Self::default(), |mut stats, run| {
            let lines = run.line_count();
            match run.kind {
                DiffKind::Unchanged => stats.unchanged += lines,
                DiffKind::Added => stats.added += lines,
                DiffKind::Removed => stats.removed += lines,
            }
            stats
        })
    }

    /// True when the two inputs were identical.
    pub fn is_unchanged(&self) -> bool {
        self.added == 0 && self.removed == 0
    }
}

#[derive(Default)]
struct Runs(Vec<DiffRun>);

impl Runs {
    fn push(&mut self, kind: DiffKind, line: &str) {
        match self.0.last_mut() {
            Some(last) if last.kind == kind => last.text.push_str(line),
            _ => self.0.push(DiffRun::new(kind, line)),
        }
    }
}

/// Computes the ordered run sequence turning `original` into `revised`.
///
/// Both inputs empty gives an empty sequence.
pub fn diff_lines(original: &str, revised: &str) -> Vec<DiffRun> {
    let old: Vec<&str> = original.split_inclusive('\n').collect();
    let new: Vec<&str> = revised.split_inclusive('\n').collect();
    let mut runs = Runs::default();

    // A shared prefix is what the greedy walk would match anyway.
    let prefix = old.iter().zip(&new).take_while(|(a, b)| a == b).count();
    for line in &old[..prefix] {
        runs.push(DiffKind::Unchanged, line);
    }
    let (a, b) = (&old[prefix..], &new[prefix..]);
    let suffix = detached_suffix(a, b);
    let (a, b) = (&a[..a.len() - suffix], &b[..b.len() - suffix]);

    let prefer = AddPreference::new(a, b);
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        if a[i] == b[j] {
            runs.push(DiffKind::Unchanged, a[i]);
            i += 1;
            j += 1;
        } else if prefer.get(i, j) {
            runs.push(DiffKind::Added, b[j]);
            j += 1;
        } else {
            runs.push(DiffKind::Removed, a[i]);
            i += 1;
        }
    }
    for line in &a[i..] {
        runs.push(DiffKind::Removed, line);
    }
    for line in &b[j..] {
        runs.push(DiffKind::Added, line);
    }
    for line in &old[old.len() - suffix..] {
        runs.push(DiffKind::Unchanged, line);
    }
    runs.0
}

/// Length of the common tail that can be matched up front without moving
/// any other match.
///
/// The tail is safe when none of its lines occurs anywhere before it on
/// either side: the greedy walk can then only pair it with itself, after
/// both middles are exhausted.
fn detached_suffix(a: &[&str], b: &[&str]) -> usize {
    let common = a.iter().rev().zip(b.iter().rev()).take_while(|(x, y)| x == y).count();
    if common == 0 {
        return 0;
    }
    let tail = &a[a.len() - common..];
    let middle: HashSet<&str> = a[..a.len() - common]
        .iter()
        .chain(&b[..b.len() - common])
        .copied()
        .collect();
    let mut last_seen: HashMap<&str, usize> = HashMap::new();
    for (pos, line) in tail.iter().enumerate() {
        last_seen.insert(*line, pos);
    }

    // The cut follows every tail line that also occurs in a middle, and
    // never separates two copies of the same line.
    let mut cut = tail
        .iter()
        .rposition(|line| middle.contains(line))
        .map_or(0, |pos| pos + 1);
    let mut reach = tail[..cut]
        .iter()
        .map(|line| last_seen[line] + 1)
        .max()
        .unwrap_or(0);
    while cut < reach {
        reach = reach.max(last_seen[&tail[cut]] + 1);
        cut += 1;
    }
    common - cut
}

/// `get(i, j)` is true when the LCS of `a[i..]` and `b[j + 1..]` is longer
/// than that of `a[i + 1..]` and `b[j..]`, i.e. when skipping `b[j]` as an
/// addition keeps more matches than skipping `a[i]` as a removal.
///
/// One bit per cell; full LCS lengths are only kept for two rows.
struct AddPreference {
    cols: usize,
    bits: Vec<u64>,
}

impl AddPreference {
    fn new(a: &[&str], b: &[&str]) -> Self {
        let cols = b.len();
        let mut bits = vec![0_u64; (a.len() * cols).div_ceil(64)];
        let mut below = vec![0_u32; cols + 1];
        let mut row = vec![0_u32; cols + 1];
        for i in (0..a.len()).rev() {
            row[cols] = 0;
            for j in (0..cols).rev() {
                row[j] = if a[i] == b[j] {
                    below[j + 1] + 1
                } else {
                    below[j].max(row[j + 1])
                };
                if below[j] < row[j + 1] {
                    let cell = i * cols + j;
                    bits[cell / 64] |= 1 << (cell % 64);
                }
            }
            std::mem::swap(&mut row, &mut below);
        }
        Self { cols, bits }
    }

    fn get(&self, i: usize, j: usize) -> bool {
        let cell = i * self.cols + j;
        self.bits[cell / 64] & (1 << (cell % 64)) != 0
    }
}

/// Concatenates the runs visible on the original side (unchanged + removed).
pub fn original_text(runs: &[DiffRun]) -> String {
    side_text(runs, DiffKind::Removed)
}

/// Concatenates the runs visible on the revised side (unchanged + added).
pub fn revised_text(runs: &[DiffRun]) -> String {
    side_text(runs, DiffKind::Added)
}

fn side_text(runs: &[DiffRun], change: DiffKind) -> String {
    runs.iter()
        .filter(|run| run.kind == DiffKind::Unchanged || run.kind == change)
        .map(|run| run.text.as_str())
        .collect()
}
