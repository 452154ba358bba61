use super::{Diagnostics, Record};
use log::{Level, warn};

/// Logs every diagnostic record attached to `handle` at warning level. Messages which are not
/// valid text are logged with replacement characters.
pub fn log_diagnostics(handle: &(impl Diagnostics + ?Sized)) {
    if log::max_level() < Level::Warn {
        return;
    }
    let mut records = Records::new(handle);
    for record in &mut records {
        warn!("{record}");
    }
    if records.exhausted_numbering() {
        warn!("Too many diagnostic records were generated. Not all could be logged.");
    }
}

/// Walks the diagnostic records of a handle, starting with the first one. Record numbers are
/// `i16`, so at most `i16::MAX` records are visited.
struct Records<'h, H: ?Sized> {
    handle: &'h H,
    next: Option<i16>,
}

impl<'h, H: Diagnostics + ?Sized> Records<'h, H> {
    fn new(handle: &'h H) -> Self {
        Self {
            handle,
            next: Some(1),
        }
    }

    /// `true` if iteration stopped at `i16::MAX`, rather than because the driver ran out of
    /// records.
    fn exhausted_numbering(&self) -> bool {
        self.next.is_none()
    }
}

impl<H: Diagnostics + ?Sized> Iterator for Records<'_, H> {
    type Item = Record;

    fn next(&mut self) -> Option<Record> {
        let number = self.next?;
        let mut record = Record::with_capacity(512);
        if !record.fill_from(self.handle, number) {
            // Keep `next` so a later call does not report exhausted numbering.
            self.next = Some(number);
            return None;
        }
        self.next = number.checked_add(1);
        Some(record)
    }
}
