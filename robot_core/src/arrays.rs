//! Length-keeping helpers for the parallel per-segment arrays.

/// Resize `values` to exactly `target_len` elements.
///
/// Shorter input is padded at the end with `default`, longer input is
/// truncated from the end. The common prefix is always preserved.
///
/// ```rust
/// use robot_core::arrays::resize;
///
/// assert_eq!(resize(&[1.0, 2.0], 4, 0.0), vec![1.0, 2.0, 0.0, 0.0]);
/// assert_eq!(resize(&[1.0, 2.0, 3.0], 1, 0.0), vec![1.0]);
/// ```
pub fn resize<T: Clone>(values: &[T], target_len: usize, default: T) -> Vec<T> {
    if values.len() >= target_len {
        return values[..target_len].to_vec();
    }
    let mut out = Vec::with_capacity(target_len);
    out.extend_from_slice(values);
    out.resize(target_len, default);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resize_unchanged() {
        let values = vec![0.1, 0.2, 0.3];
        assert_eq!(resize(&values, 3, 9.0), values);
    }

    #[test]
    fn test_resize_grow_preserves_prefix() {
        let grown = resize(&[5.0, 6.0], 5, 0.07);
        assert_eq!(grown, vec![5.0, 6.0, 0.07, 0.07, 0.07]);
    }

    #[test]
    fn test_resize_shrink_truncates_tail() {
        let shrunk = resize(&[1.0, 2.0, 3.0, 4.0, 5.0], 2, 0.0);
        assert_eq!(shrunk, vec![1.0, 2.0]);
    }

    #[test]
    fn test_resize_empty_and_zero() {
        assert_eq!(resize::<f64>(&[], 2, 1.5), vec![1.5, 1.5]);
        assert!(resize(&[1.0, 2.0], 0, 0.0).is_empty());
    }

    #[test]
    fn test_resize_all_lengths() {
        let source: Vec<f64> = (0..6).map(f64::from).collect();
        for target in 0..12 {
            let out = resize(&source, target, -1.0);
            assert_eq!(out.len(), target);
            let kept = target.min(source.len());
            assert_eq!(&out[..kept], &source[..kept]);
            assert!(out[kept..].iter().all(|&v| v == -1.0));
        }
    }
}
