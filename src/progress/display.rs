//! Progress bar display management and coordination.
//!
//! [`ProgressDisplay`] owns a [`MultiProgress`] with one main bar over the
//! configured objects and short-lived child bars for each transfer or
//! extraction. It is cheap to clone and shared between the installer, the
//! downloader and the extraction callbacks.
//!
//! # Examples
//!
//! ```rust
//! use obsup::progress::{ProgressDisplay, StyleOptions};
//!
//! let display = ProgressDisplay::new(StyleOptions::hidden(), 3);
//! display.set_main_message("OBS");
//!
//! let bar = display.create_transfer_progress("obs.zip", 1024, 0);
//! bar.set_position(512);
//! display.finish_child(bar);
//! display.increment_main();
//! display.finish();
//! ```

use crate::progress::StyleOptions;
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget};
use std::sync::Arc;

/// Progress display manager that coordinates multiple progress bars.
#[derive(Clone)]
pub struct ProgressDisplay {
    multi: Arc<MultiProgress>,
    main: Arc<ProgressBar>,
    style_options: StyleOptions,
}

impl std::fmt::Debug for ProgressDisplay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressDisplay")
            .field("style_options", &self.style_options)
            .finish()
    }
}

impl ProgressDisplay {
    /// Create a new progress display whose main bar counts `total_objects`.
    pub fn new(style_options: StyleOptions, total_objects: usize) -> Self {
        let multi = match style_options.is_enabled() {
            true => Arc::new(MultiProgress::new()),
            false => Arc::new(MultiProgress::with_draw_target(ProgressDrawTarget::hidden())),
        };

        let main = Arc::new(
            multi.add(
                style_options
                    .main()
                    .to_progress_bar(total_objects as u64),
            ),
        );
        main.tick();

        Self {
            multi,
            main,
            style_options,
        }
    }

    /// A display that draws nothing.
    pub fn hidden() -> Self {
        Self::new(StyleOptions::hidden(), 0)
    }

    /// Print a line above the bars without tearing them.
    pub fn println(&self, msg: impl AsRef<str>) {
        if self.style_options.is_enabled() {
            let _ = self.multi.println(msg);
        }
    }

    pub fn main(&self) -> Arc<ProgressBar> {
        self.main.clone()
    }

    /// Name the object currently being processed.
    pub fn set_main_message(&self, msg: &str) {
        self.main.set_message(msg.to_string());
    }

    /// Create a child bar counting bytes for one transfer.
    ///
    /// `position` is where a resumed transfer starts.
    pub fn create_transfer_progress(&self, name: &str, size: u64, position: u64) -> ProgressBar {
        let pb = self.multi.add(
            self.style_options
                .child()
                .to_progress_bar(size)
                .with_position(position),
        );
        pb.set_message(name.to_string());
        pb
    }

    /// Create a child bar counting entries for one extraction.
    pub fn create_entries_progress(&self, name: &str, entries: u64) -> ProgressBar {
        let opts = self
            .style_options
            .child()
            .with_template(crate::progress::ProgressBarOpts::TEMPLATE_ENTRIES);
        let pb = self.multi.add(opts.to_progress_bar(entries));
        pb.set_message(name.to_string());
        pb
    }

    /// Increment the main progress bar by one.
    pub fn increment_main(&self) {
        self.main.inc(1);
    }

    /// Finish the main bar, clearing or keeping it based on configuration.
    pub fn finish(&self) {
        self.main.set_message("");
        if self.style_options.main().clear {
            self.main.finish_and_clear();
        } else {
            self.main.finish();
        }
    }

    /// Finish a child progress bar based on configuration.
    pub fn finish_child(&self, pb: ProgressBar) {
        if self.style_options.child().clear {
            pb.finish_and_clear();
        } else {
            pb.finish();
        }
    }
}
