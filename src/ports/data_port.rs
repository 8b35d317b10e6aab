//! Tick ingestion port trait.

use crate::domain::error::TicksimError;
use crate::domain::tick::Tick;

pub trait DataPort {
    /// Full tick history for one instrument, ascending by time.
    fn fetch_ticks(&self, instrument: &str) -> Result<Vec<Tick>, TicksimError>;

    fn list_instruments(&self) -> Result<Vec<String>, TicksimError>;
}
