use std::sync::mpsc::{Receiver, RecvError, TryRecvError};

/// Runs at most one background load at a time. A request made while one is
/// in flight is remembered (latest wins) and started once the current load
/// finishes, so a reload asked for mid-flight is never lost.
pub(super) struct ReloadQueue<T> {
    in_flight: Option<Receiver<T>>,
    queued: Option<i32>,
}

impl<T> Default for ReloadQueue<T> {
    fn default() -> Self {
        Self {
            in_flight: None,
            queued: None,
        }
    }
}

impl<T> ReloadQueue<T> {
    pub(super) fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }

    pub(super) fn request(&mut self, year: i32, spawn: impl FnOnce(i32) -> Receiver<T>) {
        if self.in_flight.is_some() {
            self.queued = Some(year);
        } else {
            self.in_flight = Some(spawn(year));
        }
    }

    /// Returns the finished load, if any, after starting the queued request.
    /// `Err` means the worker went away without answering.
    pub(super) fn poll(
        &mut self,
        spawn: impl FnOnce(i32) -> Receiver<T>,
    ) -> Option<Result<T, RecvError>> {
        let rx = self.in_flight.take()?;
        let finished = match rx.try_recv() {
            Ok(result) => Ok(result),
            Err(TryRecvError::Empty) => {
                self.in_flight = Some(rx);
                return None;
            }
            Err(TryRecvError::Disconnected) => Err(RecvError),
        };

        if let Some(year) = self.queued.take() {
            self.in_flight = Some(spawn(year));
        }
        Some(finished)
    }
}
