//! Compressed sparse row/column matrices.
//!
//! Both layouts share the same three arrays (`indptr`, `indices`, `data`); what
//! differs is which axis `indptr` walks. Every change of layout is an explicit
//! call: `transpose` reinterprets the arrays in O(1), while `to_csc`/`to_csr`
//! rebuild them in O(nnz + major dimension).

use std::ops::Range;

/// Scalar stored in a sparse matrix. Summation always happens in `f64`.
pub trait Entry: Copy + Default + PartialEq + Into<f64> {}

impl<T> Entry for T where T: Copy + Default + PartialEq + Into<f64> {}

#[derive(Debug, Clone, PartialEq)]
struct Compressed<T> {
    n_major: usize,
    n_minor: usize,
    indptr: Vec<usize>,
    indices: Vec<u32>,
    data: Vec<T>,
}

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum SparseError {
    #[error("indptr has length {got}, expected {expected}")]
    IndptrLength { expected: usize, got: usize },
    #[error("indptr is not monotone at position {0}")]
    IndptrNotMonotone(usize),
    #[error("indptr ends at {end} but there are {nnz} stored entries")]
    IndptrEnd { end: usize, nnz: usize },
    #[error("indices and data differ in length ({indices} vs {data})")]
    LengthMismatch { indices: usize, data: usize },
    #[error("index {index} out of bounds for dimension {dim}")]
    IndexOutOfBounds { index: usize, dim: usize },
    #[error("cannot stack a block with {got} columns onto {expected} columns")]
    ColumnMismatch { expected: usize, got: usize },
}

impl<T: Entry> Compressed<T> {
    fn new(
        n_major: usize,
        n_minor: usize,
        indptr: Vec<usize>,
        indices: Vec<u32>,
        data: Vec<T>,
    ) -> Result<Self, SparseError> {
        if indptr.len() != n_major + 1 {
            return Err(SparseError::IndptrLength {
                expected: n_major + 1,
                got: indptr.len(),
            });
        }
        if indices.len() != data.len() {
            return Err(SparseError::LengthMismatch {
                indices: indices.len(),
                data: data.len(),
            });
        }
        if indptr[0] != 0 {
            return Err(SparseError::IndptrNotMonotone(0));
        }
        for (pos, w) in indptr.windows(2).enumerate() {
            if w[1] < w[0] {
                return Err(SparseError::IndptrNotMonotone(pos + 1));
            }
        }
        let end = indptr[n_major];
        if end != indices.len() {
            return Err(SparseError::IndptrEnd {
                end,
                nnz: indices.len(),
            });
        }
        if let Some(&bad) = indices.iter().find(|&&i| i as usize >= n_minor) {
            return Err(SparseError::IndexOutOfBounds {
                index: bad as usize,
                dim: n_minor,
            });
        }
        Ok(Self {
            n_major,
            n_minor,
            indptr,
            indices,
            data,
        })
    }

    fn empty(n_major: usize, n_minor: usize) -> Self {
        Self {
            n_major,
            n_minor,
            indptr: vec![0; n_major + 1],
            indices: Vec::new(),
            data: Vec::new(),
        }
    }

    fn from_lanes(n_minor: usize, lanes: Vec<Vec<(u32, T)>>) -> Self {
        let n_major = lanes.len();
        let nnz = lanes.iter().map(Vec::len).sum();
        let mut indptr = Vec::with_capacity(n_major + 1);
        let mut indices = Vec::with_capacity(nnz);
        let mut data = Vec::with_capacity(nnz);
        indptr.push(0);
        for mut lane in lanes {
            lane.sort_by_key(|&(i, _)| i);
            for (i, v) in lane {
                if v == T::default() {
                    continue;
                }
                indices.push(i);
                data.push(v);
            }
            indptr.push(indices.len());
        }
        Self {
            n_major,
            n_minor,
            indptr,
            indices,
            data,
        }
    }

    fn lane_range(&self, major: usize) -> Range<usize> {
        self.indptr[major]..self.indptr[major + 1]
    }

    fn lane(&self, major: usize) -> impl Iterator<Item = (usize, T)> + '_ {
        let range = self.lane_range(major);
        self.indices[range.clone()]
            .iter()
            .zip(&self.data[range])
            .map(|(&i, &v)| (i as usize, v))
    }

    fn major_sums(&self) -> Vec<f64> {
        (0..self.n_major)
            .map(|m| self.data[self.lane_range(m)].iter().map(|&v| v.into()).sum())
            .collect()
    }

    fn minor_sums(&self) -> Vec<f64> {
        let mut out = vec![0.0; self.n_minor];
        for (&i, &v) in self.indices.iter().zip(&self.data) {
            out[i as usize] += v.into();
        }
        out
    }

    /// Rebuilds with the other axis as the major one.
    fn swap_axes(&self) -> Self {
        let mut counts = vec![0usize; self.n_minor + 1];
        for &i in &self.indices {
            counts[i as usize + 1] += 1;
        }
        for k in 0..self.n_minor {
            counts[k + 1] += counts[k];
        }
        let indptr = counts.clone();
        let mut next = counts;
        let nnz = self.indices.len();
        let mut indices = vec![0u32; nnz];
        let mut data = vec![T::default(); nnz];
        for major in 0..self.n_major {
            for pos in self.lane_range(major) {
                let minor = self.indices[pos] as usize;
                let dst = next[minor];
                indices[dst] = major as u32;
                data[dst] = self.data[pos];
                next[minor] += 1;
            }
        }
        Self {
            n_major: self.n_minor,
            n_minor: self.n_major,
            indptr,
            indices,
            data,
        }
    }

    fn select_major(&self, majors: &[usize]) -> Result<Self, SparseError> {
        let mut indptr = Vec::with_capacity(majors.len() + 1);
        let mut indices = Vec::new();
        let mut data = Vec::new();
        indptr.push(0);
        for &m in majors {
            if m >= self.n_major {
                return Err(SparseError::IndexOutOfBounds {
                    index: m,
                    dim: self.n_major,
                });
            }
            let range = self.lane_range(m);
            indices.extend_from_slice(&self.indices[range.clone()]);
            data.extend_from_slice(&self.data[range]);
            indptr.push(indices.len());
        }
        Ok(Self {
            n_major: majors.len(),
            n_minor: self.n_minor,
            indptr,
            indices,
            data,
        })
    }

    fn select_minor(&self, minors: &[usize]) -> Result<Self, SparseError> {
        let mut remap: Vec<Option<u32>> = vec![None; self.n_minor];
        for (new, &old) in minors.iter().enumerate() {
            let slot = remap.get_mut(old).ok_or(SparseError::IndexOutOfBounds {
                index: old,
                dim: self.n_minor,
            })?;
            *slot = Some(new as u32);
        }
        let mut lanes = Vec::with_capacity(self.n_major);
        for m in 0..self.n_major {
            let lane = self
                .lane(m)
                .filter_map(|(i, v)| remap[i].map(|new| (new, v)))
                .collect::<Vec<_>>();
            lanes.push(lane);
        }
        Ok(Self::from_lanes(minors.len(), lanes))
    }

    fn map_values<U: Entry>(&self, f: impl Fn(T) -> U) -> Compressed<U> {
        Compressed {
            n_major: self.n_major,
            n_minor: self.n_minor,
            indptr: self.indptr.clone(),
            indices: self.indices.clone(),
            data: self.data.iter().map(|&v| f(v)).collect(),
        }
    }
}

/// Row-major sparse matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct CsrMatrix<T> {
    inner: Compressed<T>,
}

/// Column-major sparse matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct CscMatrix<T> {
    inner: Compressed<T>,
}

impl<T: Entry> CsrMatrix<T> {
    pub fn new(
        n_rows: usize,
        n_cols: usize,
        indptr: Vec<usize>,
        indices: Vec<u32>,
        data: Vec<T>,
    ) -> Result<Self, SparseError> {
        Ok(Self {
            inner: Compressed::new(n_rows, n_cols, indptr, indices, data)?,
        })
    }

    pub fn zeros(n_rows: usize, n_cols: usize) -> Self {
        Self {
            inner: Compressed::empty(n_rows, n_cols),
        }
    }

    /// Builds from per-row `(col, value)` lists; zeros are dropped and columns sorted.
    pub fn from_rows(n_cols: usize, rows: Vec<Vec<(u32, T)>>) -> Self {
        Self {
            inner: Compressed::from_lanes(n_cols, rows),
        }
    }

    pub fn n_rows(&self) -> usize {
        self.inner.n_major
    }

    pub fn n_cols(&self) -> usize {
        self.inner.n_minor
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.n_rows(), self.n_cols())
    }

    pub fn nnz(&self) -> usize {
        self.inner.data.len()
    }

    pub fn indptr(&self) -> &[usize] {
        &self.inner.indptr
    }

    pub fn indices(&self) -> &[u32] {
        &self.inner.indices
    }

    pub fn data(&self) -> &[T] {
        &self.inner.data
    }

    pub fn row(&self, row: usize) -> impl Iterator<Item = (usize, T)> + '_ {
        self.inner.lane(row)
    }

    pub fn get(&self, row: usize, col: usize) -> T {
        self.row(row)
            .find(|&(c, _)| c == col)
            .map(|(_, v)| v)
            .unwrap_or_default()
    }

    pub fn row_sums(&self) -> Vec<f64> {
        self.inner.major_sums()
    }

    pub fn col_sums(&self) -> Vec<f64> {
        self.inner.minor_sums()
    }

    pub fn select_rows(&self, rows: &[usize]) -> Result<Self, SparseError> {
        Ok(Self {
            inner: self.inner.select_major(rows)?,
        })
    }

    pub fn select_cols(&self, cols: &[usize]) -> Result<Self, SparseError> {
        Ok(Self {
            inner: self.inner.select_minor(cols)?,
        })
    }

    pub fn map_values<U: Entry>(&self, f: impl Fn(T) -> U) -> CsrMatrix<U> {
        CsrMatrix {
            inner: self.inner.map_values(f),
        }
    }

    /// Same matrix, column-major storage.
    pub fn to_csc(&self) -> CscMatrix<T> {
        CscMatrix {
            inner: self.inner.swap_axes(),
        }
    }

    /// The transpose, sharing this matrix's arrays.
    pub fn transpose(self) -> CscMatrix<T> {
        CscMatrix { inner: self.inner }
    }
}

impl<T: Entry> CscMatrix<T> {
    pub fn new(
        n_rows: usize,
        n_cols: usize,
        indptr: Vec<usize>,
        indices: Vec<u32>,
        data: Vec<T>,
    ) -> Result<Self, SparseError> {
        Ok(Self {
            inner: Compressed::new(n_cols, n_rows, indptr, indices, data)?,
        })
    }

    pub fn zeros(n_rows: usize, n_cols: usize) -> Self {
        Self {
            inner: Compressed::empty(n_cols, n_rows),
        }
    }

    /// Builds from per-column `(row, value)` lists; zeros are dropped and rows sorted.
    pub fn from_cols(n_rows: usize, cols: Vec<Vec<(u32, T)>>) -> Self {
        Self {
            inner: Compressed::from_lanes(n_rows, cols),
        }
    }

    /// Stacks blocks on top of each other. All blocks must share a column count.
    pub fn vstack(blocks: &[CscMatrix<T>]) -> Result<Self, SparseError> {
        let Some(first) = blocks.first() else {
            return Ok(Self::zeros(0, 0));
        };
        let n_cols = first.n_cols();
        let mut n_rows = 0usize;
        let mut offsets = Vec::with_capacity(blocks.len());
        for block in blocks {
            if block.n_cols() != n_cols {
                return Err(SparseError::ColumnMismatch {
                    expected: n_cols,
                    got: block.n_cols(),
                });
            }
            offsets.push(n_rows as u32);
            n_rows += block.n_rows();
        }
        let nnz = blocks.iter().map(CscMatrix::nnz).sum();
        let mut indptr = Vec::with_capacity(n_cols + 1);
        let mut indices = Vec::with_capacity(nnz);
        let mut data = Vec::with_capacity(nnz);
        indptr.push(0);
        for col in 0..n_cols {
            for (block, &offset) in blocks.iter().zip(&offsets) {
                for (row, v) in block.col(col) {
                    indices.push(row as u32 + offset);
                    data.push(v);
                }
            }
            indptr.push(indices.len());
        }
        Ok(Self {
            inner: Compressed {
                n_major: n_cols,
                n_minor: n_rows,
                indptr,
                indices,
                data,
            },
        })
    }

    pub fn n_rows(&self) -> usize {
        self.inner.n_minor
    }

    pub fn n_cols(&self) -> usize {
        self.inner.n_major
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.n_rows(), self.n_cols())
    }

    pub fn nnz(&self) -> usize {
        self.inner.data.len()
    }

    pub fn indptr(&self) -> &[usize] {
        &self.inner.indptr
    }

    pub fn indices(&self) -> &[u32] {
        &self.inner.indices
    }

    pub fn data(&self) -> &[T] {
        &self.inner.data
    }

    pub fn col(&self, col: usize) -> impl Iterator<Item = (usize, T)> + '_ {
        self.inner.lane(col)
    }

    pub fn get(&self, row: usize, col: usize) -> T {
        self.col(col)
            .find(|&(r, _)| r == row)
            .map(|(_, v)| v)
            .unwrap_or_default()
    }

    pub fn row_sums(&self) -> Vec<f64> {
        self.inner.minor_sums()
    }

    pub fn col_sums(&self) -> Vec<f64> {
        self.inner.major_sums()
    }

    pub fn select_rows(&self, rows: &[usize]) -> Result<Self, SparseError> {
        Ok(Self {
            inner: self.inner.select_minor(rows)?,
        })
    }

    pub fn select_cols(&self, cols: &[usize]) -> Result<Self, SparseError> {
        Ok(Self {
            inner: self.inner.select_major(cols)?,
        })
    }

    pub fn map_values<U: Entry>(&self, f: impl Fn(T) -> U) -> CscMatrix<U> {
        CscMatrix {
            inner: self.inner.map_values(f),
        }
    }

    /// Same matrix, row-major storage.
    pub fn to_csr(&self) -> CsrMatrix<T> {
        CsrMatrix {
            inner: self.inner.swap_axes(),
        }
    }

    /// The transpose, sharing this matrix's arrays.
    pub fn transpose(self) -> CsrMatrix<T> {
        CsrMatrix { inner: self.inner }
    }
}

#[cfg(test)]
#[path = "../../tests/src_inline/model/sparse.rs"]
mod tests;
