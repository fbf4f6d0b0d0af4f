use photopack_common::{ProgressEvent, ProgressSink, Stage};

// Percent schedule for one run.
pub const START: u8 = 0;
pub const PARSING: u8 = 10;
pub const ADDRESS_EXTRACTED: u8 = 20;
pub const EXTRACT_START: u8 = 30;
pub const EXTRACT_END: u8 = 50;
pub const FETCH_END: u8 = 90;
pub const PACKAGED: u8 = 95;
pub const DONE: u8 = 100;

/// `start..=end` scaled by `done / total`. `total == 0` yields `end`.
pub fn interpolate(start: u8, end: u8, done: usize, total: usize) -> u8 {
    if total == 0 {
        return end;
    }
    let span = usize::from(end.saturating_sub(start));
    start + (span * done.min(total) / total) as u8
}

/// Forwards events to a sink while keeping percents non-decreasing.
pub(crate) struct ProgressTracker<'a> {
    sink: &'a dyn ProgressSink,
    last: u8,
}

impl<'a> ProgressTracker<'a> {
    pub(crate) fn new(sink: &'a dyn ProgressSink) -> Self {
        Self { sink, last: START }
    }

    pub(crate) fn emit(&mut self, stage: Stage, percent: u8) {
        self.send(ProgressEvent::new(stage, percent));
    }

    pub(crate) fn tick(&mut self, stage: Stage, range: (u8, u8), done: usize, total: usize) {
        let percent = interpolate(range.0, range.1, done, total);
        self.send(ProgressEvent::new(stage, percent).with_detail(format!("{done}/{total}")));
    }

    fn send(&mut self, mut event: ProgressEvent) {
        event.percent = event.percent.max(self.last);
        self.last = event.percent;
        tracing::trace!(stage = %event.stage, percent = event.percent, "progress");
        self.sink.report(event);
    }
}
