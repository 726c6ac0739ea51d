//! Sliding window of per-frame feature vectors.
//!
//! Pure temporal ring: knows nothing about inference.

use ndarray::{Array2, Array3, ArrayView1, ArrayView2, Axis};
use std::collections::VecDeque;

use crate::error::{Error, Result};

/// One frame's features, F values
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector(Vec<f32>);

impl FeatureVector {
    pub fn new(values: Vec<f32>) -> Self {
        Self(values)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn into_inner(self) -> Vec<f32> {
        self.0
    }
}

impl From<Vec<f32>> for FeatureVector {
    fn from(values: Vec<f32>) -> Self {
        Self(values)
    }
}

/// N consecutive feature vectors, oldest first, stored row-major as `N × F`.
///
/// Owned and immutable; holding one never blocks the buffer it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Window {
    data: Array2<f32>,
}

impl Window {
    /// Rows must all have the same length
    pub fn from_rows(rows: &[FeatureVector]) -> Result<Self> {
        let width = rows.first().map(FeatureVector::len).unwrap_or(0);
        let mut flat = Vec::with_capacity(rows.len() * width);
        for row in rows {
            if row.len() != width {
                return Err(Error::DimensionMismatch {
                    expected: width,
                    actual: row.len(),
                });
            }
            flat.extend_from_slice(row.as_slice());
        }
        let actual = flat.len();
        let data = Array2::from_shape_vec((rows.len(), width), flat).map_err(|_| {
            Error::DimensionMismatch {
                expected: rows.len() * width,
                actual,
            }
        })?;
        Ok(Self { data })
    }

    /// Frames (N)
    pub fn frames(&self) -> usize {
        self.data.nrows()
    }

    /// Features per frame (F)
    pub fn features(&self) -> usize {
        self.data.ncols()
    }

    pub fn frame(&self, index: usize) -> Option<ArrayView1<'_, f32>> {
        (index < self.frames()).then(|| self.data.row(index))
    }

    pub fn view(&self) -> ArrayView2<'_, f32> {
        self.data.view()
    }

    /// Row-major `N × F`, oldest frame first
    pub fn as_flat(&self) -> Vec<f32> {
        self.data.iter().copied().collect()
    }

    /// `1 × N × F` model input
    pub fn to_batch(&self) -> Array3<f32> {
        self.data.clone().insert_axis(Axis(0))
    }
}

/// Most recent N feature vectors in arrival order
pub struct WindowBuffer {
    buffer: VecDeque<FeatureVector>,
    capacity: usize,
    feature_len: usize,
}

impl WindowBuffer {
    pub fn new(capacity: usize, feature_len: usize) -> Self {
        Self {
            buffer: VecDeque::with_capacity(capacity + 1),
            capacity,
            feature_len,
        }
    }

    /// Rejects vectors whose length is not F; the buffer is left untouched
    pub fn push(&mut self, vector: FeatureVector) -> Result<()> {
        if vector.len() != self.feature_len {
            return Err(Error::DimensionMismatch {
                expected: self.feature_len,
                actual: vector.len(),
            });
        }

        self.buffer.push_back(vector);
        if self.buffer.len() > self.capacity {
            self.buffer.pop_front();
        }
        Ok(())
    }

    pub fn is_complete(&self) -> bool {
        self.buffer.len() >= self.capacity
    }

    /// Current window, oldest first. None until N vectors have arrived.
    pub fn snapshot(&self) -> Option<Window> {
        if !self.is_complete() {
            return None;
        }
        let rows: Vec<FeatureVector> = self.buffer.iter().cloned().collect();
        Window::from_rows(&rows).ok()
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn feature_len(&self) -> usize {
        self.feature_len
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn fv(tag: f32, len: usize) -> FeatureVector {
        FeatureVector::new(vec![tag; len])
    }

    #[test]
    fn test_not_complete_initially() {
        let buffer = WindowBuffer::new(5, 4);
        assert!(!buffer.is_complete());
        assert!(buffer.snapshot().is_none());
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_complete_after_n_pushes() {
        let mut buffer = WindowBuffer::new(5, 4);
        for i in 0..4 {
            buffer.push(fv(i as f32, 4)).unwrap();
            assert!(!buffer.is_complete());
        }
        buffer.push(fv(4.0, 4)).unwrap();
        assert!(buffer.is_complete());

        let window = buffer.snapshot().unwrap();
        assert_eq!(window.frames(), 5);
        assert_eq!(window.features(), 4);
    }

    #[test]
    fn test_sliding_window() {
        let mut buffer = WindowBuffer::new(5, 2);
        for i in 0..12 {
            buffer.push(fv(i as f32, 2)).unwrap();
        }
        assert_eq!(buffer.len(), 5);

        // last five pushes: 7..=11
        let window = buffer.snapshot().unwrap();
        assert_eq!(window.frame(0).unwrap()[0], 7.0);
        assert_eq!(window.frame(4).unwrap()[0], 11.0);
        assert!(window.frame(5).is_none());
    }

    #[test]
    fn test_dimension_mismatch_leaves_buffer_unchanged() {
        let mut buffer = WindowBuffer::new(3, 66);
        buffer.push(fv(1.0, 66)).unwrap();
        buffer.push(fv(2.0, 66)).unwrap();

        let err = buffer.push(fv(3.0, 64)).unwrap_err();
        assert_eq!(err, Error::DimensionMismatch { expected: 66, actual: 64 });
        assert_eq!(buffer.len(), 2);
        assert!(!buffer.is_complete());

        buffer.push(fv(3.0, 66)).unwrap();
        let window = buffer.snapshot().unwrap();
        assert_eq!(window.frame(2).unwrap()[0], 3.0);
    }

    #[test]
    fn test_snapshot_is_detached() {
        let mut buffer = WindowBuffer::new(2, 1);
        buffer.push(fv(1.0, 1)).unwrap();
        buffer.push(fv(2.0, 1)).unwrap();
        let held = buffer.snapshot().unwrap();

        buffer.push(fv(3.0, 1)).unwrap();
        buffer.push(fv(4.0, 1)).unwrap();

        assert_eq!(held.as_flat(), vec![1.0, 2.0]);
        assert_eq!(buffer.snapshot().unwrap().as_flat(), vec![3.0, 4.0]);
    }

    #[test]
    fn test_flat_layout_is_row_major() {
        let rows = [
            FeatureVector::new(vec![1.0, 2.0, 3.0]),
            FeatureVector::new(vec![4.0, 5.0, 6.0]),
        ];
        let window = Window::from_rows(&rows).unwrap();
        assert_eq!(window.as_flat(), vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);

        let batch = window.to_batch();
        assert_eq!(batch.shape(), &[1, 2, 3]);
        assert_eq!(batch[[0, 1, 0]], 4.0);
    }

    #[test]
    fn test_from_rows_rejects_ragged() {
        let rows = [FeatureVector::new(vec![1.0, 2.0]), FeatureVector::new(vec![3.0])];
        assert!(matches!(
            Window::from_rows(&rows),
            Err(Error::DimensionMismatch { expected: 2, actual: 1 })
        ));
    }

    #[test]
    fn test_clear() {
        let mut buffer = WindowBuffer::new(2, 1);
        buffer.push(fv(1.0, 1)).unwrap();
        buffer.push(fv(2.0, 1)).unwrap();
        buffer.clear();
        assert!(!buffer.is_complete());
        assert_eq!(buffer.len(), 0);
    }

    proptest! {
        #[test]
        fn prop_snapshot_is_last_n(n in 1usize..8, m in 0usize..40) {
            let mut buffer = WindowBuffer::new(n, 1);
            for i in 0..m {
                buffer.push(fv(i as f32, 1)).unwrap();
            }
            prop_assert_eq!(buffer.is_complete(), m >= n);
            match buffer.snapshot() {
                Some(window) => {
                    let expected: Vec<f32> = (m - n..m).map(|i| i as f32).collect();
                    prop_assert_eq!(window.as_flat(), expected);
                }
                None => prop_assert!(m < n),
            }
        }
    }
}
