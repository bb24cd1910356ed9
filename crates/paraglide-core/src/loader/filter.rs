use crate::geo::Bounds;

/// Suppresses reloads for sub-threshold camera jitter.
#[derive(Debug, Clone)]
pub struct BoundsFilter {
    threshold: f64,
    last: Option<Bounds>,
}

impl BoundsFilter {
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            last: None,
        }
    }

    pub fn last(&self) -> Option<&Bounds> {
        self.last.as_ref()
    }

    /// Accepts and remembers `bounds` unless every edge is within the threshold
    /// of the last accepted bounds.
    pub fn accept(&mut self, bounds: Bounds) -> bool {
        if let Some(last) = &self.last {
            if !bounds.differs_from(last, self.threshold) {
                return false;
            }
        }
        self.last = Some(bounds);
        true
    }
}
