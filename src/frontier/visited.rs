use dashmap::DashSet;

/// Normalized URLs already dispatched to a fetch
///
/// `claim` is an atomic check-and-insert, so of several workers racing on the
/// same URL exactly one wins the right to fetch it.
#[derive(Debug, Default)]
pub struct VisitedSet {
    urls: DashSet<String>,
}

impl VisitedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `url`, returning `true` only for the first caller
    pub fn claim(&self, url: &str) -> bool {
        self.urls.insert(url.to_string())
    }

    pub fn contains(&self, url: &str) -> bool {
        self.urls.contains(url)
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_claim_once() {
        let visited = VisitedSet::new();
        assert!(!visited.contains("https://example.com/"));
        assert!(visited.claim("https://example.com/"));
        assert!(!visited.claim("https://example.com/"));
        assert!(visited.contains("https://example.com/"));
        assert_eq!(visited.len(), 1);
    }

    #[test]
    fn test_racing_claims_have_one_winner() {
        let visited = Arc::new(VisitedSet::new());
        let winners = Arc::new(AtomicUsize::new(0));

        let threads: Vec<_> = (0..8)
            .map(|_| {
                let visited = visited.clone();
                let winners = winners.clone();
                std::thread::spawn(move || {
                    for i in 0..100 {
                        if visited.claim(&format!("https://example.com/{}", i)) {
                            winners.fetch_add(1, Ordering::SeqCst);
                        }
                    }
                })
            })
            .collect();

        for thread in threads {
            thread.join().unwrap();
        }

        assert_eq!(winners.load(Ordering::SeqCst), 100);
    }
}
