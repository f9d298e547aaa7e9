use log::debug;

use crate::config::Config;
use crate::geometry::{Point, Trace};
use crate::{Error, Result};

/// Dense row-major matrix of pairwise distances
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceMatrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl DistanceMatrix {
    pub fn filled(rows: usize, cols: usize, value: f64) -> Self {
        Self {
            rows,
            cols,
            data: vec![value; rows * cols],
        }
    }

    /// Euclidean distance between every pair of points
    pub fn between(a: &[Point], b: &[Point]) -> Self {
        let mut m = Self::filled(a.len(), b.len(), 0.0);
        for (i, pa) in a.iter().enumerate() {
            for (j, pb) in b.iter().enumerate() {
                m.set(i, j, pa.distance(pb));
            }
        }
        m
    }

    pub fn between_scalars(a: &[f64], b: &[f64]) -> Self {
        let mut m = Self::filled(a.len(), b.len(), 0.0);
        for (i, va) in a.iter().enumerate() {
            for (j, vb) in b.iter().enumerate() {
                m.set(i, j, (va - vb).abs());
            }
        }
        m
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0 || self.cols == 0
    }

    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.data[i * self.cols + j]
    }

    pub fn set(&mut self, i: usize, j: usize, value: f64) {
        self.data[i * self.cols + j] = value;
    }
}

/// Monotone correspondence between two sequences, in forward order
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AlignmentPath(Vec<(usize, usize)>);

impl AlignmentPath {
    pub fn steps(&self) -> &[(usize, usize)] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Summed matrix cost along the path
    pub fn cost(&self, matrix: &DistanceMatrix) -> f64 {
        self.0.iter().map(|&(i, j)| matrix.get(i, j)).sum()
    }

    /// For every index of the first sequence, the matched indexes of the second
    pub fn partners_of_first(&self, len_a: usize) -> Vec<Vec<usize>> {
        let mut out = vec![Vec::new(); len_a];
        for &(i, j) in &self.0 {
            if let Some(slot) = out.get_mut(i) {
                slot.push(j);
            }
        }
        out
    }

    /// For every index of the second sequence, the matched indexes of the first
    pub fn partners_of_second(&self, len_b: usize) -> Vec<Vec<usize>> {
        let mut out = vec![Vec::new(); len_b];
        for &(i, j) in &self.0 {
            if let Some(slot) = out.get_mut(j) {
                slot.push(i);
            }
        }
        out
    }
}

/// Cumulative DTW cost table, padded with one leading row and column:
/// `cost[0][0] = 0`, the rest of row and column 0 are infinite, and
/// `cost[i][j] = matrix[i-1][j-1] + min(up, left, diagonal)`.
pub fn best_values(matrix: &DistanceMatrix) -> DistanceMatrix {
    cumulative(matrix, None)
}

pub fn best_path(matrix: &DistanceMatrix) -> Result<AlignmentPath> {
    if matrix.is_empty() {
        return Err(Error::EmptySequence);
    }
    Ok(backtrack(&best_values(matrix)))
}

/// Best path restricted to a band of `window` cells around the proportional
/// diagonal. The window is widened when needed so the last cell stays reachable.
pub fn best_path_windowed(matrix: &DistanceMatrix, window: usize) -> Result<AlignmentPath> {
    if matrix.is_empty() {
        return Err(Error::EmptySequence);
    }
    let window = effective_window(matrix.rows(), matrix.cols(), window);
    Ok(backtrack(&cumulative(matrix, Some(window))))
}

fn effective_window(rows: usize, cols: usize, window: usize) -> usize {
    let (short, long) = (rows.min(cols), rows.max(cols));
    window.max(long.div_ceil(short))
}

fn in_band(i: usize, j: usize, rows: usize, cols: usize, window: usize) -> bool {
    if rows == 1 {
        return true;
    }
    let center = i as f64 * (cols - 1) as f64 / (rows - 1) as f64;
    (j as f64 - center).abs() <= window as f64
}

fn cumulative(matrix: &DistanceMatrix, window: Option<usize>) -> DistanceMatrix {
    let (n, m) = (matrix.rows(), matrix.cols());
    let mut cost = DistanceMatrix::filled(n + 1, m + 1, f64::INFINITY);
    cost.set(0, 0, 0.0);
    for i in 1..=n {
        for j in 1..=m {
            if let Some(w) = window {
                if !in_band(i - 1, j - 1, n, m, w) {
                    continue;
                }
            }
            let best_prev = cost
                .get(i - 1, j)
                .min(cost.get(i, j - 1))
                .min(cost.get(i - 1, j - 1));
            cost.set(i, j, matrix.get(i - 1, j - 1) + best_prev);
        }
    }
    cost
}

// Walks the padded table from the last cell back to (1, 1). Ties go
// up, then left, then diagonal.
fn backtrack(cost: &DistanceMatrix) -> AlignmentPath {
    let mut i = cost.rows() - 1;
    let mut j = cost.cols() - 1;
    let mut steps = Vec::with_capacity(i + j);
    loop {
        steps.push((i - 1, j - 1));
        if i == 1 && j == 1 {
            break;
        }
        if i == 1 {
            j -= 1;
            continue;
        }
        if j == 1 {
            i -= 1;
            continue;
        }
        let up = cost.get(i - 1, j);
        let left = cost.get(i, j - 1);
        let diagonal = cost.get(i - 1, j - 1);
        if up <= left && up <= diagonal {
            i -= 1;
        } else if left <= diagonal {
            j -= 1;
        } else {
            i -= 1;
            j -= 1;
        }
    }
    steps.reverse();
    AlignmentPath(steps)
}

#[derive(Debug, Clone, PartialEq)]
pub struct Alignment {
    pub path: AlignmentPath,
    pub cost: f64,
}

/// DTW front end; optionally banded
#[derive(Debug, Clone, Copy, Default)]
pub struct Aligner {
    window: Option<usize>,
}

impl Aligner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_window(window: usize) -> Self {
        Self {
            window: Some(window),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self {
            window: config.dtw_window,
        }
    }

    pub fn window(&self) -> Option<usize> {
        self.window
    }

    pub fn align_points(&self, a: &[Point], b: &[Point]) -> Result<Alignment> {
        let matrix = DistanceMatrix::between(a, b);
        let path = match self.window {
            Some(w) => best_path_windowed(&matrix, w)?,
            None => best_path(&matrix)?,
        };
        let cost = path.cost(&matrix);
        debug!(
            "aligned {}x{} points, path length {}, cost {:.2}",
            a.len(),
            b.len(),
            path.len(),
            cost
        );
        Ok(Alignment { path, cost })
    }

    pub fn align(&self, a: &Trace, b: &Trace) -> Result<Alignment> {
        self.align_points(&a.coordinates(), &b.coordinates())
    }
}
