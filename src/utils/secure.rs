use subtle::ConstantTimeEq;

/// Constant-time equality for secrets.
///
/// Returns `false` when either side is missing or the lengths differ; never panics.
pub fn secure_compare(a: Option<&str>, b: Option<&str>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a.as_bytes().ct_eq(b.as_bytes()).into(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_secrets_match() {
        assert!(secure_compare(Some("s3cret-value"), Some("s3cret-value")));
        assert!(secure_compare(Some(""), Some("")));
    }

    #[test]
    fn differing_or_missing_secrets_do_not_match() {
        assert!(!secure_compare(Some("s3cret-value"), Some("s3cret-valuE")));
        assert!(!secure_compare(Some("short"), Some("much-longer")));
        assert!(!secure_compare(None, Some("x")));
        assert!(!secure_compare(Some("x"), None));
        assert!(!secure_compare(None, None));
    }

    /// Best batch time over several rounds, in nanoseconds.
    fn best_batch_nanos(a: &str, b: &str) -> u128 {
        (0..15)
            .map(|_| {
                let start = std::time::Instant::now();
                for _ in 0..2_000 {
                    std::hint::black_box(secure_compare(
                        Some(std::hint::black_box(a)),
                        Some(std::hint::black_box(b)),
                    ));
                }
                start.elapsed().as_nanos()
            })
            .min()
            .unwrap_or(0)
            .max(1)
    }

    #[test]
    fn mismatch_position_does_not_shorten_comparison() {
        let secret = "k".repeat(4096);
        let first_differs = format!("x{}", &secret[1..]);
        let last_differs = format!("{}x", &secret[..secret.len() - 1]);

        // Warm up caches before measuring.
        best_batch_nanos(&secret, &secret);

        let early = best_batch_nanos(&secret, &first_differs);
        let late = best_batch_nanos(&secret, &last_differs);
        let ratio = early.max(late) as f64 / early.min(late) as f64;
        assert!(
            ratio < 3.0,
            "early mismatch took {early}ns, late mismatch took {late}ns"
        );
    }
}
