//! The "lazy matrix march" best-path search (§4.5).

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

/// Default branch-pruning threshold, matching [`crate::config::DEFAULT_BRANCH_THRESHOLD`]. Kept
/// as a free function parameter rather than hardcoded so callers can thread the device's
/// configured value through.
pub const DEFAULT_BRANCH_THRESHOLD: f32 = crate::config::DEFAULT_BRANCH_THRESHOLD;

/// One correspondence the march found between an element of the left sequence and one of the
/// right sequence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchPair {
    pub left: usize,
    pub right: usize,
    pub score: f32,
}

/// The result of a full march: the best total score found, and the diagonal (matched-element)
/// steps making up the best path, in order.
#[derive(Debug, Clone, Default)]
pub struct MatchResult {
    pub total_score: f32,
    pub pairs: Vec<MatchPair>,
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    i: usize,
    j: usize,
    score: f32,
}

impl Candidate {
    fn max_possible(&self, n: usize, m: usize) -> f32 {
        self.score + (n - self.i).min(m - self.j) as f32
    }
}

/// Heap entries order by `(maxPossibleScore, score)` descending, so `BinaryHeap` (a max-heap)
/// pops the most promising candidate first (§4.5). Comparisons assume finite match values
/// (always in `[0, 1]` per element), so `partial_cmp` never returns `None` in practice.
struct HeapEntry {
    candidate: Candidate,
    max_possible: f32,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.max_possible == other.max_possible && self.candidate.score == other.candidate.score
    }
}
impl Eq for HeapEntry {}
impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.max_possible
            .partial_cmp(&other.max_possible)
            .unwrap_or(Ordering::Equal)
            .then(self.candidate.score.partial_cmp(&other.candidate.score).unwrap_or(Ordering::Equal))
    }
}

/// Run the lazy matrix march over a left sequence of length `n` and right sequence of length
/// `m`, evaluating pairwise similarity via `eval(i, j) -> [0, 1]`.
///
/// `branch_threshold`: at a cell whose diagonal eval is below this, both non-diagonal
/// successors are explored in addition to the diagonal one (§4.5). Lower values explore more of
/// the matrix (more thorough, slower); the default mirrors
/// [`crate::config::DEFAULT_BRANCH_THRESHOLD`].
pub fn lazy_matrix_march(n: usize, m: usize, branch_threshold: f32, eval: impl Fn(usize, usize) -> f32) -> MatchResult {
    if n == 0 || m == 0 {
        return MatchResult::default();
    }

    let mut heap = BinaryHeap::new();
    let mut best_for_cell: HashMap<(usize, usize), f32> = HashMap::new();
    let mut parent: HashMap<(usize, usize), (usize, usize)> = HashMap::new();
    let mut eval_cache: HashMap<(usize, usize), f32> = HashMap::new();
    let mut best_match = f32::MIN;
    let mut best_terminal: Option<(usize, usize)> = None;

    let push = |heap: &mut BinaryHeap<HeapEntry>,
                best_for_cell: &mut HashMap<(usize, usize), f32>,
                parent: &mut HashMap<(usize, usize), (usize, usize)>,
                from: (usize, usize),
                to: (usize, usize),
                score: f32| {
        let improves = match best_for_cell.get(&to) {
            Some(&existing) => score > existing,
            None => true,
        };
        if improves {
            best_for_cell.insert(to, score);
            parent.insert(to, from);
            let candidate = Candidate { i: to.0, j: to.1, score };
            heap.push(HeapEntry {
                max_possible: candidate.max_possible(n, m),
                candidate,
            });
        }
    };

    best_for_cell.insert((0, 0), 0.0);
    heap.push(HeapEntry {
        max_possible: Candidate { i: 0, j: 0, score: 0.0 }.max_possible(n, m),
        candidate: Candidate { i: 0, j: 0, score: 0.0 },
    });

    while let Some(entry) = heap.pop() {
        if entry.max_possible < best_match {
            continue;
        }
        let cand = entry.candidate;
        // Lazy deletion: this entry is stale if a better score for the same cell was pushed
        // after it.
        if best_for_cell.get(&(cand.i, cand.j)).copied().unwrap_or(f32::MIN) > cand.score {
            continue;
        }

        if cand.i == n || cand.j == m {
            if cand.score > best_match {
                best_match = cand.score;
                best_terminal = Some((cand.i, cand.j));
            }
            continue;
        }

        let eval_score = *eval_cache.entry((cand.i, cand.j)).or_insert_with(|| eval(cand.i, cand.j));
        push(&mut heap, &mut best_for_cell, &mut parent, (cand.i, cand.j), (cand.i + 1, cand.j + 1), cand.score + eval_score);
        if eval_score < branch_threshold {
            push(&mut heap, &mut best_for_cell, &mut parent, (cand.i, cand.j), (cand.i + 1, cand.j), cand.score);
            push(&mut heap, &mut best_for_cell, &mut parent, (cand.i, cand.j), (cand.i, cand.j + 1), cand.score);
        }
    }

    let Some(mut cursor) = best_terminal else {
        return MatchResult::default();
    };
    let mut pairs = Vec::new();
    while let Some(&from) = parent.get(&cursor) {
        if cursor.0 == from.0 + 1 && cursor.1 == from.1 + 1 {
            // Diagonal step: element `from.0` of the left sequence was matched against
            // `from.1` of the right, contributing whatever the diagonal eval added.
            let contributed = best_for_cell[&cursor] - best_for_cell[&from];
            pairs.push(MatchPair {
                left: from.0,
                right: from.1,
                score: contributed,
            });
        }
        cursor = from;
        if cursor == (0, 0) {
            break;
        }
    }
    pairs.reverse();

    MatchResult {
        total_score: best_match.max(0.0),
        pairs,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_sequence_yields_no_match() {
        let result = lazy_matrix_march(0, 5, 0.95, |_, _| 1.0);
        assert_eq!(result.total_score, 0.0);
        assert!(result.pairs.is_empty());
    }

    #[test]
    fn identical_sequences_match_perfectly() {
        let seq = [1, 2, 3, 4];
        let result = lazy_matrix_march(seq.len(), seq.len(), 0.95, |i, j| if seq[i] == seq[j] { 1.0 } else { 0.0 });
        assert_eq!(result.total_score, 4.0);
        assert_eq!(result.pairs.len(), 4);
        for (k, pair) in result.pairs.iter().enumerate() {
            assert_eq!(pair.left, k);
            assert_eq!(pair.right, k);
        }
    }

    #[test]
    fn completely_dissimilar_sequences_score_zero() {
        let result = lazy_matrix_march(3, 3, 0.95, |_, _| 0.0);
        assert_eq!(result.total_score, 0.0);
    }

    #[test]
    fn inserted_element_is_skipped_with_near_perfect_score() {
        // left:  [A, B, C]
        // right: [A, X, B, C]
        let left = ["A", "B", "C"];
        let right = ["A", "X", "B", "C"];
        let result = lazy_matrix_march(left.len(), right.len(), 0.95, |i, j| if left[i] == right[j] { 1.0 } else { 0.0 });
        assert_eq!(result.total_score, 3.0);
        assert_eq!(result.pairs.len(), 3);
    }
}
