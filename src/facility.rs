use serde::Serialize;

use crate::XactId;

/// A single-capacity shared resource with ownership, availability, and
/// holding-time statistics.
///
/// At most one transaction owns a facility at a time. Independently of
/// ownership, a facility may be marked unavailable by the out-of-service
/// block; new capture attempts are then refused until it is made available
/// again. Logic switches are realized as facilities created lazily on first
/// reference.
#[derive(Debug, Serialize)]
pub struct Facility {
    owning_xact: Option<XactId>,
    available: bool,
    capture_count: u32,
    capturing_xacts: u32,
    total_holding_time: f32,
    #[serde(skip)]
    capture_time: f32,
}

impl Default for Facility {
    fn default() -> Self {
        Self::new()
    }
}

impl Facility {
    /// Constructs an idle, available facility.
    #[must_use]
    pub fn new() -> Self {
        Self {
            owning_xact: None,
            available: true,
            capture_count: 0,
            capturing_xacts: 0,
            total_holding_time: 0.0,
            capture_time: 0.0,
        }
    }

    /// The current owner, if any.
    #[must_use]
    pub fn owner(&self) -> Option<XactId> {
        self.owning_xact
    }

    /// Whether the facility can be captured right now.
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.available
    }

    /// Whether a capture attempt would succeed.
    #[must_use]
    pub fn can_capture(&self) -> bool {
        self.available && self.owning_xact.is_none()
    }

    /// Lifetime number of captures.
    #[must_use]
    pub fn capture_count(&self) -> u32 {
        self.capture_count
    }

    /// Number of transactions currently holding the facility (0 or 1).
    #[must_use]
    pub fn capturing_xacts(&self) -> u32 {
        self.capturing_xacts
    }

    /// Total time the facility has been held, across all finished captures.
    #[must_use]
    pub fn total_holding_time(&self) -> f32 {
        self.total_holding_time
    }

    /// Average holding time per capture; zero before the first capture.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn average_holding_time(&self) -> f32 {
        if self.capture_count == 0 {
            0.0
        } else {
            self.total_holding_time / self.capture_count as f32
        }
    }

    /// Grants ownership to `xact` at time `now`. Availability is a separate
    /// axis; capturing does not put the facility out of service.
    pub(crate) fn capture(&mut self, xact: XactId, now: f32) {
        self.owning_xact = Some(xact);
        self.capture_count += 1;
        self.capturing_xacts = 1;
        self.capture_time = now;
    }

    /// Releases ownership at time `now`, accruing the holding time. An
    /// out-of-service facility stays out of service.
    pub(crate) fn release(&mut self, now: f32) {
        if self.owning_xact.take().is_some() {
            self.total_holding_time += now - self.capture_time;
        }
        self.capturing_xacts = 0;
    }

    /// Marks the facility out of service without touching ownership.
    pub(crate) fn make_unavailable(&mut self) {
        self.available = false;
    }

    /// Puts the facility back in service.
    pub(crate) fn make_available(&mut self) {
        self.available = true;
    }

    /// Clears the owning reference without accruing holding time; the owner
    /// was removed from contention, not released.
    pub(crate) fn detach_owner(&mut self) {
        self.owning_xact = None;
        self.capturing_xacts = 0;
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use float_cmp::approx_eq;

    #[test]
    fn test_new_facility_is_idle() {
        let facility = Facility::new();
        assert!(facility.is_available());
        assert!(facility.can_capture());
        assert_eq!(facility.owner(), None);
        assert_eq!(facility.capture_count(), 0);
        assert_eq!(facility.average_holding_time(), 0.0);
    }

    #[test]
    fn test_capture_and_release() {
        let mut facility = Facility::new();
        facility.capture(XactId::from(1), 2.0);
        assert!(!facility.can_capture());
        assert_eq!(facility.owner(), Some(XactId::from(1)));
        assert_eq!(facility.capturing_xacts(), 1);

        facility.release(5.0);
        assert!(facility.can_capture());
        assert_eq!(facility.owner(), None);
        assert!(approx_eq!(f32, facility.total_holding_time(), 3.0, ulps = 2));
    }

    #[test]
    fn test_average_holding_time() {
        let mut facility = Facility::new();
        facility.capture(XactId::from(1), 0.0);
        facility.release(4.0);
        facility.capture(XactId::from(2), 10.0);
        facility.release(12.0);
        assert_eq!(facility.capture_count(), 2);
        assert!(approx_eq!(f32, facility.average_holding_time(), 3.0, ulps = 2));
    }

    #[test]
    fn test_detach_owner_accrues_nothing() {
        let mut facility = Facility::new();
        facility.capture(XactId::from(1), 0.0);
        facility.make_unavailable();
        facility.detach_owner();
        assert_eq!(facility.owner(), None);
        assert!(!facility.is_available());
        assert_eq!(facility.total_holding_time(), 0.0);
    }
}
