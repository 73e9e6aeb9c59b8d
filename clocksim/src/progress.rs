use indicatif::{ProgressBar, ProgressStyle};
use log::log_enabled;

use crate::time::Tick;

pub(crate) struct Bar {
    bar: ProgressBar,
}

impl Bar {
    pub(crate) fn new(total: Tick) -> Self {
        let bar = if log_enabled!(log::Level::Info) {
            let bar = ProgressBar::new(total.0 as u64);
            if let Ok(style) =
                ProgressStyle::default_bar().template("[{bar:60.green}] {pos}/{len} global ticks")
            {
                bar.set_style(style);
            }
            bar.set_position(0);
            bar
        } else {
            ProgressBar::hidden()
        };

        Self { bar }
    }

    pub(crate) fn make_progress(&mut self, now: Tick) {
        self.bar.set_position(now.0 as u64)
    }

    pub(crate) fn finish(&mut self) {
        self.bar.finish();
    }
}
