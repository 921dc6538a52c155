//! Cubing progress tracking with per-job bars for small runs

use crate::io::configuration::{MAX_INDIVIDUAL_PROGRESS_BARS, PROGRESS_BAR_WIDTH};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::sync::LazyLock;

/// Coordinates progress display for a cubing run
///
/// Always shows one overall bar counting cubed z slices. Runs with few jobs
/// additionally get one bar per job; larger runs only get the overall bar to
/// avoid terminal spam. All methods take `&self` so worker threads can report.
pub struct ProgressManager {
    multi_progress: MultiProgress,
    total_bar: Option<ProgressBar>,
    job_bars: Vec<ProgressBar>,
}

impl Default for ProgressManager {
    fn default() -> Self {
        Self::new()
    }
}

static JOB_STYLE: LazyLock<ProgressStyle> = LazyLock::new(|| {
    ProgressStyle::default_bar()
        .template("{prefix:>12} [{bar:30.cyan/blue}] {pos}/{len} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏ ")
});

static TOTAL_STYLE: LazyLock<ProgressStyle> = LazyLock::new(|| {
    let template = format!(
        "[{{elapsed_precise}}] Slices: [{{bar:{PROGRESS_BAR_WIDTH}.cyan/blue}}] {{pos}}/{{len}} ({{eta}})"
    );
    ProgressStyle::default_bar()
        .template(&template)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
});

impl ProgressManager {
    /// Create a new progress manager
    pub fn new() -> Self {
        Self {
            multi_progress: MultiProgress::new(),
            total_bar: None,
            job_bars: Vec::new(),
        }
    }

    /// Create bars for `total_slices` z slices spread over jobs of the given sizes
    pub fn initialize(&mut self, total_slices: u64, job_slices: &[u64]) {
        let total_bar = ProgressBar::new(total_slices);
        total_bar.set_style(TOTAL_STYLE.clone());
        self.total_bar = Some(self.multi_progress.add(total_bar));

        self.job_bars.clear();
        if job_slices.len() <= MAX_INDIVIDUAL_PROGRESS_BARS {
            for (index, &slices) in job_slices.iter().enumerate() {
                let bar = ProgressBar::new(slices);
                bar.set_style(JOB_STYLE.clone());
                bar.set_prefix(format!("job {index}"));
                self.job_bars.push(self.multi_progress.add(bar));
            }
        }
    }

    /// Show which z range a job is working on
    pub fn start_batch(&self, job: usize, first_z: u64, last_z: u64) {
        if let Some(bar) = self.job_bars.get(job) {
            bar.set_message(format!("z={first_z}-{last_z}"));
        }
    }

    /// Report `slices` finished z slices for a job
    pub fn complete_batch(&self, job: usize, slices: u64) {
        if let Some(bar) = self.job_bars.get(job) {
            bar.inc(slices);
        }
        if let Some(ref total_bar) = self.total_bar {
            total_bar.inc(slices);
        }
    }

    /// Mark a job as finished
    pub fn complete_job(&self, job: usize) {
        if let Some(bar) = self.job_bars.get(job) {
            bar.finish_with_message("✓");
        }
    }

    /// Clean up all progress displays
    pub fn finish(&self) {
        if let Some(ref total_bar) = self.total_bar {
            total_bar.finish_with_message("All slices cubed");
        }
        let _ = self.multi_progress.clear();
    }
}
