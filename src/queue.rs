//! Time-weighted waiting-line statistics.

use serde::Serialize;

/// One stay in the waiting line. The exit time is set when the stay ends.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TimeRecord {
    entry: f32,
    exit: Option<f32>,
}

impl TimeRecord {
    fn open(now: f32) -> Self {
        Self {
            entry: now,
            exit: None,
        }
    }

    /// Duration of the stay; `None` while still open.
    #[must_use]
    pub fn duration(&self) -> Option<f32> {
        self.exit.map(|exit| exit - self.entry)
    }
}

/// Accumulated metrics of one waiting line.
///
/// Collected by the enqueue/depart blocks. All averages are defined for the
/// empty collector and never divide by zero.
#[derive(Debug, Default, Serialize)]
pub struct QueueStats {
    current_count: u32,
    max_count: u32,
    total_entries: u32,
    zero_entries: u32,
    records: Vec<TimeRecord>,
    #[serde(skip)]
    open: Vec<usize>,
}

impl QueueStats {
    /// Constructs an empty collector.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current length of the line.
    #[must_use]
    pub fn current_count(&self) -> u32 {
        self.current_count
    }

    /// Historical maximum of the current count.
    #[must_use]
    pub fn max_count(&self) -> u32 {
        self.max_count
    }

    /// Lifetime number of entries.
    #[must_use]
    pub fn total_entries(&self) -> u32 {
        self.total_entries
    }

    /// Number of entries that left with zero waiting time.
    #[must_use]
    pub fn zero_entries(&self) -> u32 {
        self.zero_entries
    }

    /// Records `units` entries at time `now`.
    pub fn enter(&mut self, units: u32, now: f32) {
        for _ in 0..units {
            self.open.push(self.records.len());
            self.records.push(TimeRecord::open(now));
        }
        self.current_count += units;
        self.total_entries += units;
        self.max_count = self.max_count.max(self.current_count);
    }

    /// Records `units` departures at time `now`, closing the most recently
    /// opened records.
    pub fn leave(&mut self, units: u32, now: f32) {
        for _ in 0..units {
            match self.open.pop() {
                Some(idx) => {
                    let record = &mut self.records[idx];
                    record.exit = Some(now);
                    if now - record.entry == 0.0 {
                        self.zero_entries += 1;
                    }
                }
                None => log::warn!("departure from an empty waiting line"),
            }
        }
        self.current_count = self.current_count.saturating_sub(units);
    }

    /// Mean waiting time over all closed records, optionally excluding
    /// zero-duration stays. Zero when no record qualifies.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn average_wait(&self, exclude_zero: bool) -> f32 {
        let mut sum = 0.0;
        let mut count = 0_u32;
        for duration in self.records.iter().filter_map(TimeRecord::duration) {
            if exclude_zero && duration == 0.0 {
                continue;
            }
            sum += duration;
            count += 1;
        }
        if count == 0 {
            0.0
        } else {
            sum / count as f32
        }
    }

    /// Time-averaged line content: the sum of stay durations divided by the
    /// current clock value. Zero at time zero.
    #[must_use]
    pub fn average_content(&self, clock: f32) -> f32 {
        if clock <= 0.0 {
            0.0
        } else {
            self.records
                .iter()
                .filter_map(TimeRecord::duration)
                .sum::<f32>()
                / clock
        }
    }

    /// Share of zero-wait entries, in percent. Zero before the first entry.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn percent_zero_entries(&self) -> f32 {
        if self.total_entries == 0 {
            0.0
        } else {
            self.zero_entries as f32 / self.total_entries as f32 * 100.0
        }
    }
}
