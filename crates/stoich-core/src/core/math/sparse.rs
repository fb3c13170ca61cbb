use std::fmt;

/// A matrix in compressed sparse row form.
///
/// Row `r` owns the entries `row_start[r]..row_start[r + 1]` of `values` and
/// `col_index`, with columns strictly increasing within a row. Zero (default) values
/// are never stored.
#[derive(Debug, Clone, PartialEq)]
pub struct SparseMatrix<T> {
    nrows: usize,
    ncols: usize,
    values: Vec<T>,
    col_index: Vec<usize>,
    row_start: Vec<usize>,
}

impl<T> Default for SparseMatrix<T> {
    fn default() -> Self {
        Self {
            nrows: 0,
            ncols: 0,
            values: Vec::new(),
            col_index: Vec::new(),
            row_start: vec![0],
        }
    }
}

impl<T: Copy + Default + PartialEq> SparseMatrix<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_size(nrows: usize, ncols: usize) -> Self {
        let mut matrix = Self::new();
        matrix.set_size(nrows, ncols);
        matrix
    }

    /// Resizes to `nrows x ncols`, discarding every stored entry.
    pub fn set_size(&mut self, nrows: usize, ncols: usize) {
        self.nrows = nrows;
        self.ncols = ncols;
        self.values.clear();
        self.col_index.clear();
        self.row_start = vec![0; nrows + 1];
    }

    pub fn nrows(&self) -> usize {
        self.nrows
    }

    pub fn ncols(&self) -> usize {
        self.ncols
    }

    /// Number of stored (non-zero) entries.
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// Returns the entry at `(row, col)`, or zero if none is stored or the position is
    /// out of range.
    pub fn get(&self, row: usize, col: usize) -> T {
        if row >= self.nrows || col >= self.ncols {
            return T::default();
        }
        let range = self.row_start[row]..self.row_start[row + 1];
        match self.col_index[range.clone()].binary_search(&col) {
            Ok(offset) => self.values[range.start + offset],
            Err(_) => T::default(),
        }
    }

    /// Stores `value` at `(row, col)`; storing zero removes the entry.
    ///
    /// Returns `false` and leaves the matrix untouched if the position is out of
    /// range.
    pub fn set(&mut self, row: usize, col: usize, value: T) -> bool {
        if row >= self.nrows || col >= self.ncols {
            return false;
        }
        let start = self.row_start[row];
        let end = self.row_start[row + 1];
        let zero = value == T::default();

        match self.col_index[start..end].binary_search(&col) {
            Ok(offset) => {
                let pos = start + offset;
                if zero {
                    self.values.remove(pos);
                    self.col_index.remove(pos);
                    self.row_start[row + 1..].iter_mut().for_each(|s| *s -= 1);
                } else {
                    self.values[pos] = value;
                }
            }
            Err(offset) => {
                if !zero {
                    let pos = start + offset;
                    self.values.insert(pos, value);
                    self.col_index.insert(pos, col);
                    self.row_start[row + 1..].iter_mut().for_each(|s| *s += 1);
                }
            }
        }
        true
    }

    /// The stored values in row-major order.
    pub fn matrix_entry(&self) -> &[T] {
        &self.values
    }

    /// The column of each stored value.
    pub fn col_index(&self) -> &[usize] {
        &self.col_index
    }

    /// Offsets into the stored values at which each row begins, plus the total.
    pub fn row_start(&self) -> &[usize] {
        &self.row_start
    }

    /// `(col, value)` pairs of one row.
    pub fn row(&self, row: usize) -> impl Iterator<Item = (usize, T)> + '_ {
        let range = if row < self.nrows {
            self.row_start[row]..self.row_start[row + 1]
        } else {
            0..0
        };
        self.col_index[range.clone()]
            .iter()
            .copied()
            .zip(self.values[range].iter().copied())
    }

    /// `(row, col, value)` for every stored entry.
    pub fn triplets(&self) -> impl Iterator<Item = (usize, usize, T)> + '_ {
        (0..self.nrows).flat_map(move |r| self.row(r).map(move |(c, v)| (r, c, v)))
    }

    pub fn transpose(&self) -> Self {
        let mut counts = vec![0usize; self.ncols + 1];
        for &c in &self.col_index {
            counts[c + 1] += 1;
        }
        for i in 0..self.ncols {
            counts[i + 1] += counts[i];
        }

        let row_start = counts.clone();
        let mut next = counts;
        let mut values = vec![T::default(); self.values.len()];
        let mut col_index = vec![0usize; self.values.len()];
        for (r, c, v) in self.triplets() {
            let pos = next[c];
            values[pos] = v;
            col_index[pos] = r;
            next[c] += 1;
        }

        Self {
            nrows: self.ncols,
            ncols: self.nrows,
            values,
            col_index,
            row_start,
        }
    }
}

impl SparseMatrix<i32> {
    /// Net rate of change of the pool in `row`: the dot product of its stoichiometry
    /// with `rates`.
    pub fn compute_row_rate(&self, row: usize, rates: &[f64]) -> f64 {
        self.row(row)
            .map(|(c, v)| f64::from(v) * rates.get(c).copied().unwrap_or(0.0))
            .sum()
    }

    /// Accumulates `N * rates` into `derivatives`, one slot per row.
    pub fn add_derivatives(&self, rates: &[f64], derivatives: &mut [f64]) {
        for (row, slot) in derivatives.iter_mut().enumerate().take(self.nrows) {
            *slot += self.compute_row_rate(row, rates);
        }
    }
}

impl<T: Copy + Default + PartialEq + fmt::Display> fmt::Display for SparseMatrix<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for r in 0..self.nrows {
            let row: Vec<String> = (0..self.ncols)
                .map(|c| format!("{:>3}", self.get(r, c)))
                .collect();
            writeln!(f, "{}", row.join(""))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SparseMatrix<i32> {
        // [ -1  0  1 ]
        // [  1 -1  0 ]
        let mut n = SparseMatrix::with_size(2, 3);
        n.set(0, 0, -1);
        n.set(0, 2, 1);
        n.set(1, 0, 1);
        n.set(1, 1, -1);
        n
    }

    #[test]
    fn get_returns_stored_values_and_zero_elsewhere() {
        let n = sample();
        assert_eq!(n.get(0, 0), -1);
        assert_eq!(n.get(0, 1), 0);
        assert_eq!(n.get(5, 5), 0);
        assert_eq!(n.nnz(), 4);
    }

    #[test]
    fn csr_arrays_are_row_major_and_column_sorted() {
        let mut n = SparseMatrix::with_size(2, 3);
        n.set(0, 2, 1);
        n.set(0, 0, -1);
        n.set(1, 1, -1);
        assert_eq!(n.matrix_entry(), &[-1, 1, -1]);
        assert_eq!(n.col_index(), &[0, 2, 1]);
        assert_eq!(n.row_start(), &[0, 2, 3]);
    }

    #[test]
    fn setting_zero_removes_the_entry() {
        let mut n = sample();
        n.set(0, 0, 0);
        assert_eq!(n.nnz(), 3);
        assert_eq!(n.row_start(), &[0, 1, 3]);
        n.set(1, 2, 0);
        assert_eq!(n.nnz(), 3);
    }

    #[test]
    fn out_of_range_set_is_rejected() {
        let mut n = sample();
        assert!(!n.set(2, 0, 1));
        assert!(!n.set(0, 3, 1));
        assert_eq!(n, sample());
    }

    #[test]
    fn set_size_clears_entries() {
        let mut n = sample();
        n.set_size(4, 1);
        assert_eq!((n.nrows(), n.ncols(), n.nnz()), (4, 1, 0));
        assert_eq!(n.row_start(), &[0, 0, 0, 0, 0]);
    }

    #[test]
    fn transpose_swaps_rows_and_columns() {
        let n = sample();
        let t = n.transpose();
        assert_eq!((t.nrows(), t.ncols()), (3, 2));
        for (r, c, v) in n.triplets() {
            assert_eq!(t.get(c, r), v);
        }
        assert_eq!(t.nnz(), n.nnz());
        assert_eq!(t.transpose(), n);
    }

    #[test]
    fn row_rates_and_derivatives() {
        let n = sample();
        let rates = [2.0, 3.0, 5.0];
        assert_eq!(n.compute_row_rate(0, &rates), 3.0);
        assert_eq!(n.compute_row_rate(1, &rates), -1.0);

        let mut dydt = [1.0, 1.0];
        n.add_derivatives(&rates, &mut dydt);
        assert_eq!(dydt, [4.0, 0.0]);
    }
}
