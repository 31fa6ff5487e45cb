//! Blocking pause source used between ranging steps

use std::time::Duration;

/// Fixed-length blocking pause
pub trait Pause {
    fn pause(&mut self, duration: Duration);
}

/// Sleeps the calling thread
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadPause;

impl Pause for ThreadPause {
    fn pause(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Records requested pauses without sleeping
#[derive(Debug, Default, Clone)]
pub struct RecordingPause {
    pub pauses: Vec<Duration>,
}

impl RecordingPause {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total(&self) -> Duration {
        self.pauses.iter().sum()
    }

    pub fn count_of(&self, duration: Duration) -> usize {
        self.pauses.iter().filter(|d| **d == duration).count()
    }
}

impl Pause for RecordingPause {
    fn pause(&mut self, duration: Duration) {
        self.pauses.push(duration);
    }
}

impl<P: Pause + ?Sized> Pause for &mut P {
    fn pause(&mut self, duration: Duration) {
        (**self).pause(duration);
    }
}
