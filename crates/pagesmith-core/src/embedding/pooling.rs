//! Pooled vector derivation from a per-token embedding matrix.
//!
//! A page embedding lays its first `GRID_SIZE * GRID_SIZE` tokens out as
//! a square patch grid, followed by a handful of special tokens. Pooling
//! collapses one grid axis (max or mean per grid row) and re-appends the
//! special tokens, producing a much shorter multivector that trades
//! resolution for comparison speed.
//!
//! Short inputs (typically text queries) have no spatial structure, so
//! pooling degrades to a single reduction across the whole sequence.
//! The same fallback applies at indexing and query time.

use super::types::{EmbeddingMatrix, VectorData, VectorKind};
use crate::config::{GRID_SIZE, IMAGE_SEQ_LEN};
use crate::error::PoolingError;

/// Element-wise reduction applied along one grid axis.
#[derive(Clone, Copy)]
enum Reduce {
    Max,
    Mean,
}

/// Derives the named vector representation `kind` from `matrix`.
///
/// - [`VectorKind::Initial`] is the identity: the full matrix as a
///   multivector for MaxSim comparison.
/// - [`VectorKind::MaxPooling`] / [`VectorKind::MeanPooling`] reduce the
///   spatial grid per row and append the special tokens. Non-spatial
///   inputs (sequence length at most the spatial length) reduce
///   across the whole sequence to a single flat vector instead.
///
/// # Errors
///
/// Returns [`PoolingError::InvalidGrid`] if a spatial input's spatial
/// block does not form a `GRID_SIZE` x `GRID_SIZE` grid. Callers must
/// not truncate the matrix to force a fit.
pub fn derive_vector(kind: VectorKind, matrix: &EmbeddingMatrix) -> Result<VectorData, PoolingError> {
    if matrix.is_empty() {
        return Err(PoolingError::EmptyMatrix);
    }
    match kind {
        VectorKind::Initial => Ok(VectorData::Multi(matrix.rows().to_vec())),
        VectorKind::MaxPooling => pool(matrix, Reduce::Max),
        VectorKind::MeanPooling => pool(matrix, Reduce::Mean),
    }
}

/// Derives all three named vectors for one page embedding.
///
/// Used at indexing time so every point carries every representation.
pub fn derive_all(
    matrix: &EmbeddingMatrix,
) -> Result<Vec<(VectorKind, VectorData)>, PoolingError> {
    VectorKind::ALL
        .iter()
        .map(|kind| derive_vector(*kind, matrix).map(|v| (*kind, v)))
        .collect()
}

fn pool(matrix: &EmbeddingMatrix, reduce: Reduce) -> Result<VectorData, PoolingError> {
    let rows = matrix.rows();
    let special = matrix.special_tokens();

    if special > rows.len() {
        return Err(PoolingError::SpecialTokenOverflow {
            rows: rows.len(),
            special,
        });
    }

    // Short sequences have no grid: reduce across the whole sequence.
    if rows.len() <= IMAGE_SEQ_LEN {
        return Ok(VectorData::Flat(reduce_rows(rows, reduce)));
    }

    let spatial_len = rows.len() - special;
    if spatial_len != GRID_SIZE * GRID_SIZE {
        return Err(PoolingError::InvalidGrid {
            spatial_len,
            grid: GRID_SIZE,
        });
    }

    // Reduce each grid row (GRID_SIZE patches) to a single vector,
    // then carry the special tokens through untouched.
    let mut pooled = Vec::with_capacity(GRID_SIZE + special);
    for grid_row in rows[..spatial_len].chunks(GRID_SIZE) {
        pooled.push(reduce_rows(grid_row, reduce));
    }
    pooled.extend(rows[spatial_len..].iter().cloned());

    Ok(VectorData::Multi(pooled))
}

/// Element-wise max or mean over a non-empty set of equal-length rows.
fn reduce_rows(rows: &[Vec<f32>], reduce: Reduce) -> Vec<f32> {
    let dim = rows.first().map(|r| r.len()).unwrap_or(0);
    let mut out = match reduce {
        Reduce::Max => vec![f32::NEG_INFINITY; dim],
        Reduce::Mean => vec![0.0; dim],
    };

    for row in rows {
        for (acc, &x) in out.iter_mut().zip(row.iter()) {
            match reduce {
                Reduce::Max => *acc = acc.max(x),
                Reduce::Mean => *acc += x,
            }
        }
    }

    if let Reduce::Mean = reduce {
        let n = rows.len() as f32;
        for acc in &mut out {
            *acc /= n;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A page-shaped matrix: full spatial grid plus `special` trailing tokens.
    fn page_matrix(special: usize) -> EmbeddingMatrix {
        let mut rows = Vec::with_capacity(IMAGE_SEQ_LEN + special);
        for i in 0..IMAGE_SEQ_LEN + special {
            rows.push(vec![i as f32, -(i as f32)]);
        }
        EmbeddingMatrix::new(rows, special)
    }

    #[test]
    fn test_initial_is_identity_multivector() {
        let m = page_matrix(4);
        let v = derive_vector(VectorKind::Initial, &m).unwrap();
        match v {
            VectorData::Multi(rows) => assert_eq!(rows.len(), m.len()),
            VectorData::Flat(_) => panic!("initial must be a multivector"),
        }
    }

    #[test]
    fn test_max_pool_page_keeps_grid_rows_and_specials() {
        let m = page_matrix(4);
        let v = derive_vector(VectorKind::MaxPooling, &m).unwrap();
        match v {
            VectorData::Multi(rows) => {
                assert_eq!(rows.len(), GRID_SIZE + 4);
                // First pooled row is the max over patch rows 0..GRID_SIZE:
                // first component increases with index, so the max is the last.
                assert_eq!(rows[0][0], (GRID_SIZE - 1) as f32);
                // Second component decreases with index, so the max is the first.
                assert_eq!(rows[0][1], 0.0);
                // Special tokens pass through untouched.
                assert_eq!(rows[GRID_SIZE][0], IMAGE_SEQ_LEN as f32);
            }
            VectorData::Flat(_) => panic!("spatial pooling must keep a multivector"),
        }
    }

    #[test]
    fn test_mean_pool_page_averages_grid_rows() {
        let m = page_matrix(2);
        let v = derive_vector(VectorKind::MeanPooling, &m).unwrap();
        match v {
            VectorData::Multi(rows) => {
                assert_eq!(rows.len(), GRID_SIZE + 2);
                // Mean of 0..GRID_SIZE over the first component.
                let expected = (0..GRID_SIZE).map(|i| i as f32).sum::<f32>() / GRID_SIZE as f32;
                assert!((rows[0][0] - expected).abs() < 1e-5);
            }
            VectorData::Flat(_) => panic!("spatial pooling must keep a multivector"),
        }
    }

    #[test]
    fn test_short_query_falls_back_to_flat_reduction() {
        let m = EmbeddingMatrix::from_rows(vec![
            vec![1.0, -2.0],
            vec![3.0, 0.0],
            vec![-1.0, 4.0],
        ]);
        let max = derive_vector(VectorKind::MaxPooling, &m).unwrap();
        assert_eq!(max, VectorData::Flat(vec![3.0, 4.0]));

        let mean = derive_vector(VectorKind::MeanPooling, &m).unwrap();
        assert_eq!(mean, VectorData::Flat(vec![1.0, 2.0 / 3.0]));
    }

    #[test]
    fn test_invalid_grid_is_rejected_not_truncated() {
        // Longer than the spatial length but with a spatial block that
        // cannot form the grid (one patch row missing).
        let rows = vec![vec![0.0; 2]; IMAGE_SEQ_LEN + 3];
        let m = EmbeddingMatrix::new(rows, 4); // spatial block = IMAGE_SEQ_LEN - 1
        let err = derive_vector(VectorKind::MaxPooling, &m).unwrap_err();
        assert!(matches!(err, PoolingError::InvalidGrid { .. }));
    }

    #[test]
    fn test_empty_matrix_is_rejected() {
        let m = EmbeddingMatrix::from_rows(vec![]);
        assert_eq!(
            derive_vector(VectorKind::Initial, &m).unwrap_err(),
            PoolingError::EmptyMatrix
        );
    }

    #[test]
    fn test_derive_all_yields_every_kind() {
        let m = page_matrix(4);
        let all = derive_all(&m).unwrap();
        assert_eq!(all.len(), 3);
        let kinds: Vec<VectorKind> = all.iter().map(|(k, _)| *k).collect();
        assert_eq!(kinds, VectorKind::ALL.to_vec());
    }
}
