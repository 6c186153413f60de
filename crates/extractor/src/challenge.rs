/// Classification of one fetched room page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChallengeVerdict {
    /// Real room content.
    Clean,
    /// The anti-bot interstitial.
    Challenged,
    /// Too little data to call either way. Treated as clean for a single
    /// pass, logged separately so the thresholds can be tuned.
    Indeterminate,
}

/// Pure classifier over one response body.
///
/// The marker token also occurs inside fully rendered rooms, so presence
/// alone is not enough; the size ceiling separates the near-empty challenge
/// shell from real content.
#[derive(Debug, Clone)]
pub struct ChallengeDetector {
    marker: String,
    challenge_max_bytes: usize,
    min_classifiable_bytes: usize,
}

impl ChallengeDetector {
    pub fn new(
        marker: impl Into<String>,
        challenge_max_bytes: usize,
        min_classifiable_bytes: usize,
    ) -> Self {
        Self {
            marker: marker.into(),
            challenge_max_bytes,
            min_classifiable_bytes,
        }
    }

    /// Deterministic, synchronous, no side effects.
    pub fn classify(&self, body: &str) -> ChallengeVerdict {
        if body.contains(&self.marker) && body.len() < self.challenge_max_bytes {
            return ChallengeVerdict::Challenged;
        }
        if body.len() < self.min_classifiable_bytes {
            return ChallengeVerdict::Indeterminate;
        }
        ChallengeVerdict::Clean
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const MARKER: &str = "TTGCaptcha";

    fn detector() -> ChallengeDetector {
        ChallengeDetector::new(MARKER, 10_000, 1_024)
    }

    fn padded(prefix: &str, len: usize) -> String {
        let mut body = prefix.to_string();
        while body.len() < len {
            body.push('x');
        }
        body
    }

    #[rstest]
    #[case::challenge_shell(padded("<html>TTGCaptcha shell</html>", 2_048), ChallengeVerdict::Challenged)]
    #[case::marker_in_full_page(padded("<html>TTGCaptcha</html>", 80_000), ChallengeVerdict::Clean)]
    #[case::tiny_marker_body("TTGCaptcha".to_string(), ChallengeVerdict::Challenged)]
    #[case::tiny_without_marker("<html></html>".to_string(), ChallengeVerdict::Indeterminate)]
    #[case::empty_body(String::new(), ChallengeVerdict::Indeterminate)]
    #[case::normal_page(padded("<html><div id=\"root\">room</div></html>", 120_000), ChallengeVerdict::Clean)]
    fn classification_cases(#[case] body: String, #[case] expected: ChallengeVerdict) {
        assert_eq!(detector().classify(&body), expected);
    }

    #[test]
    fn challenge_ceiling_is_exclusive() {
        // A marker body exactly at the ceiling is no longer a shell.
        let body = padded(MARKER, 10_000);
        assert_eq!(body.len(), 10_000);
        assert_eq!(detector().classify(&body), ChallengeVerdict::Clean);

        let below = padded(MARKER, 9_999);
        assert_eq!(detector().classify(&below), ChallengeVerdict::Challenged);
    }

    #[test]
    fn classification_is_deterministic() {
        let detector = detector();
        let body = padded("TTGCaptcha", 4_096);
        let first = detector.classify(&body);
        for _ in 0..10 {
            assert_eq!(detector.classify(&body), first);
        }
    }
}
