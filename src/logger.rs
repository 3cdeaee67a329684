//! A logger that buffers messages in a process-wide vector.
//!
//! Step-mode embedders retrieve everything logged since the previous call
//! with [`clear`], so each scheduler cycle's records can be shown next to
//! the resulting model state. Calling [`LoggerBuilder::init`] twice is a
//! no-op rather than an error.
//!
//! ```
//! # use gpsim::logger;
//! # fn main() -> anyhow::Result<()> {
//! logger::LoggerBuilder::default()
//!     .level(log::LevelFilter::Debug)
//!     .init()?;
//! log::info!("clock advanced");
//! assert_eq!(logger::clear()?, vec![String::from("[INFO] clock advanced")]);
//! # Ok(())
//! # }
//! ```

use anyhow::anyhow;
use log::LevelFilter;
use std::sync::{Arc, RwLock};

lazy_static::lazy_static! {
    static ref LOG_BUFFER: Arc<RwLock<Vec<String>>> = Arc::new(RwLock::new(Vec::new()));
    static ref INITIALIZED: Arc<RwLock<bool>> = Arc::new(RwLock::new(false));
}

/// Builds the buffering logger.
pub struct LoggerBuilder {
    level: LevelFilter,
    target: Option<String>,
}

impl Default for LoggerBuilder {
    fn default() -> Self {
        Self {
            level: LevelFilter::Warn,
            target: None,
        }
    }
}

impl LoggerBuilder {
    /// Sets the level filter.
    #[must_use]
    pub fn level(mut self, level: LevelFilter) -> Self {
        self.level = level;
        self
    }

    /// Restricts buffering to records whose target starts with the given
    /// prefix.
    #[must_use]
    pub fn target<S: Into<String>>(mut self, target: S) -> Self {
        self.target = Some(target.into());
        self
    }

    /// Installs the logger. A no-op if one was already installed through
    /// this builder.
    ///
    /// # Errors
    ///
    /// Returns an error when another logger implementation is already
    /// installed, or when the buffer lock is poisoned.
    pub fn init(self) -> anyhow::Result<()> {
        if !*INITIALIZED.read().map_err(|err| anyhow!("{:?}", err))? {
            let buffer = Arc::clone(&LOG_BUFFER);
            let mut dispatch = fern::Dispatch::new().level(self.level).chain(
                fern::Output::call(move |record| {
                    buffer
                        .write()
                        .expect("Poisoned lock")
                        .push(format!("[{}] {}", record.level(), record.args()));
                }),
            );
            if let Some(target) = self.target {
                dispatch = dispatch.filter(move |metadata| metadata.target().starts_with(&target));
            }
            dispatch.apply()?;
            *INITIALIZED.write().map_err(|err| anyhow!("{:?}", err))? = true;
        }
        Ok(())
    }
}

/// Clears the buffer and returns its contents.
///
/// # Errors
///
/// Returns an error when the buffer lock is poisoned.
pub fn clear() -> anyhow::Result<Vec<String>> {
    let mut handle = LOG_BUFFER.write().map_err(|err| anyhow!("{:?}", err))?;
    Ok(handle.drain(..).collect())
}
