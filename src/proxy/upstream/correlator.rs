// Per-stream correlation between an outstanding get_current_place call and
// the function response that answers it. One instance per SSE stream; the
// rewriter drives it part by part in payload traversal order.

/// Tracks the identifier of the most recent unresolved `get_current_place`
/// call. Identifier-based matching is required here because several tool
/// calls may be in flight on one stream; a newer call supersedes an
/// unresolved earlier one.
#[derive(Debug, Default)]
pub struct CallCorrelator {
    expected_id: Option<String>,
    armed: bool,
}

impl CallCorrelator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a `get_current_place` function-call part's identifier and arm.
    pub fn arm(&mut self, id: Option<&str>) {
        self.expected_id = id.map(str::to_string);
        self.armed = true;
    }

    /// Check a function-response part's identifier against the outstanding
    /// call. On a match the correlator disarms — the pair is resolved and a
    /// later response with the same id must not match again.
    pub fn take_match(&mut self, id: Option<&str>) -> bool {
        if self.armed && self.expected_id.as_deref() == id {
            self.armed = false;
            return true;
        }
        false
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_disarmed() {
        let mut correlator = CallCorrelator::new();
        assert!(!correlator.is_armed());
        assert!(!correlator.take_match(Some("id-1")));
    }

    #[test]
    fn test_matches_by_identifier() {
        let mut correlator = CallCorrelator::new();
        correlator.arm(Some("id-1"));
        assert!(correlator.is_armed());
        assert!(correlator.take_match(Some("id-1")));
        assert!(!correlator.is_armed());
    }

    #[test]
    fn test_mismatched_identifier_stays_armed() {
        let mut correlator = CallCorrelator::new();
        correlator.arm(Some("id-1"));
        assert!(!correlator.take_match(Some("id-2")));
        assert!(correlator.is_armed());
        // The right response still matches afterwards.
        assert!(correlator.take_match(Some("id-1")));
    }

    #[test]
    fn test_match_consumed_once() {
        let mut correlator = CallCorrelator::new();
        correlator.arm(Some("id-1"));
        assert!(correlator.take_match(Some("id-1")));
        // Duplicate response with the same id does not match again.
        assert!(!correlator.take_match(Some("id-1")));
    }

    #[test]
    fn test_newer_call_supersedes() {
        let mut correlator = CallCorrelator::new();
        correlator.arm(Some("id-1"));
        correlator.arm(Some("id-2"));
        assert!(!correlator.take_match(Some("id-1")));
        assert!(correlator.take_match(Some("id-2")));
    }

    #[test]
    fn test_absent_identifiers_still_pair() {
        // Some runtimes omit ids entirely; an armed call without an id pairs
        // with the next id-less response.
        let mut correlator = CallCorrelator::new();
        correlator.arm(None);
        assert!(!correlator.take_match(Some("id-1")));
        assert!(correlator.take_match(None));
    }
}
