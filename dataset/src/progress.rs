use indicatif::{ProgressBar, ProgressStyle};

pub struct CacheProgressBar {
    bar: ProgressBar,
}

impl CacheProgressBar {
    pub fn new(total_samples: usize) -> Self {
        let bar = ProgressBar::new(total_samples as u64);

        if let Ok(style) = ProgressStyle::default_bar()
            .template(" {spinner:.cyan} Caching samples {pos}/{len} [{wide_bar:.cyan/blue}] {eta_precise}")
        {
            bar.set_style(style);
        }

        Self { bar }
    }

    pub fn inc(&self) {
        self.bar.inc(1);
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}
