use serde::Serialize;

use crate::Error;

/// A multi-capacity shared resource tracked by aggregate usage.
///
/// Unlike a [`Facility`](crate::Facility), a storage has no notion of a
/// single owner; transactions occupy and free units of its capacity.
/// Usage is additionally integrated over time so the average content can
/// be reported.
#[derive(Debug, Serialize)]
pub struct Storage {
    name: String,
    max_capacity: u32,
    current_usage: u32,
    entry_count: u32,
    #[serde(skip)]
    weighted_usage: f32,
    #[serde(skip)]
    last_change: f32,
}

impl Storage {
    /// Constructs a storage with the given capacity.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidStorageCapacity`] when `max_capacity` is zero;
    /// the storage is not created.
    pub fn new<S: Into<String>>(name: S, max_capacity: u32) -> Result<Self, Error> {
        let name = name.into();
        if max_capacity == 0 {
            return Err(Error::InvalidStorageCapacity(name));
        }
        Ok(Self {
            name,
            max_capacity,
            current_usage: 0,
            entry_count: 0,
            weighted_usage: 0.0,
            last_change: 0.0,
        })
    }

    /// The storage's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Total capacity.
    #[must_use]
    pub fn max_capacity(&self) -> u32 {
        self.max_capacity
    }

    /// Units currently in use.
    #[must_use]
    pub fn current_usage(&self) -> u32 {
        self.current_usage
    }

    /// Units still free.
    #[must_use]
    pub fn available_capacity(&self) -> u32 {
        self.max_capacity - self.current_usage
    }

    /// Lifetime number of units that entered the storage.
    #[must_use]
    pub fn entry_count(&self) -> u32 {
        self.entry_count
    }

    /// Whether no unit is in use.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.current_usage == 0
    }

    /// Whether every unit is in use.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.current_usage == self.max_capacity
    }

    /// Whether `units` more would fit.
    #[must_use]
    pub fn fits(&self, units: u32) -> bool {
        units <= self.available_capacity()
    }

    /// Time-averaged number of units in use up to `clock`.
    #[must_use]
    pub fn average_usage(&self, clock: f32) -> f32 {
        if clock <= 0.0 {
            0.0
        } else {
            #[allow(clippy::cast_precision_loss)]
            let tail = self.current_usage as f32 * (clock - self.last_change);
            (self.weighted_usage + tail) / clock
        }
    }

    /// Occupies `units` at time `now`. The caller checks [`Self::fits`]
    /// first; occupancy never exceeds capacity.
    pub(crate) fn enter(&mut self, units: u32, now: f32) {
        debug_assert!(self.fits(units));
        self.integrate(now);
        self.current_usage += units;
        self.entry_count += units;
    }

    /// Frees `units` at time `now`.
    pub(crate) fn leave(&mut self, units: u32, now: f32) {
        self.integrate(now);
        if units > self.current_usage {
            log::warn!(
                "storage {} asked to free {} units with only {} in use",
                self.name,
                units,
                self.current_usage
            );
        }
        self.current_usage = self.current_usage.saturating_sub(units);
    }

    fn integrate(&mut self, now: f32) {
        #[allow(clippy::cast_precision_loss)]
        {
            self.weighted_usage += self.current_usage as f32 * (now - self.last_change);
        }
        self.last_change = now;
    }
}
