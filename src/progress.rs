use indicatif::{ProgressBar, ProgressStyle};

use crate::reader::ByteOffset;

/// Objects processed between two progress updates.
pub const UPDATE_INTERVAL: u32 = 200;

/// Something that can show how far into the input file the run is.
pub trait ProgressDisplay {
    fn update(&mut self, offset: u64);
    fn finish(&mut self);
}

impl ProgressDisplay for ProgressBar {
    fn update(&mut self, offset: u64) {
        self.set_position(offset);
    }

    fn finish(&mut self) {
        if let Some(len) = self.length() {
            self.set_position(len);
        }
        ProgressBar::finish(self);
    }
}

/// A byte based bar for reading a file of `file_size` bytes.
pub fn file_progress_bar(file_size: u64) -> ProgressBar {
    let bar = ProgressBar::new(file_size);
    if let Ok(style) = ProgressStyle::with_template(
        "[{elapsed_precise}] {percent:>3}% done. eta {eta:>4} {bar:10.cyan/blue} {bytes:>7}/{total_bytes:7}",
    ) {
        bar.set_style(style);
    }
    bar
}

/// Throttled progress updates.
///
/// Querying the input offset and redrawing for every object would dominate small objects, so
/// the display is only refreshed every [`UPDATE_INTERVAL`] ticks. Progress is reported in bytes
/// of input consumed, so it is not linear in the number of ticks.
pub struct ProgressReporter<D> {
    display: Option<D>,
    offset: ByteOffset,
    ticks: u32,
    interval: u32,
}

impl<D: ProgressDisplay> ProgressReporter<D> {
    /// Shows the initial state right away.
    pub fn new(display: Option<D>, offset: ByteOffset) -> Self {
        Self::with_interval(display, offset, UPDATE_INTERVAL)
    }

    pub fn with_interval(display: Option<D>, offset: ByteOffset, interval: u32) -> Self {
        let mut reporter = Self {
            display,
            offset,
            ticks: 0,
            interval,
        };
        reporter.refresh();
        reporter
    }

    fn refresh(&mut self) {
        let offset = self.offset.get();
        if let Some(display) = self.display.as_mut() {
            display.update(offset);
        }
    }

    pub fn tick(&mut self) {
        if self.display.is_none() {
            return;
        }
        if self.ticks > self.interval {
            self.refresh();
            self.ticks = 0;
        }
        self.ticks += 1;
    }

    /// Force the display to 100%, whatever the tick count.
    pub fn finish(&mut self) {
        if let Some(display) = self.display.as_mut() {
            display.finish();
        }
    }
}

/// Reporter without a display, for runs where progress is not shown.
pub type NoProgress = ProgressReporter<ProgressBar>;

impl NoProgress {
    pub fn disabled() -> Self {
        Self::new(None, ByteOffset::default())
    }
}
