/// Events emitted while a bond build walks its element pairs.
#[derive(Debug, Clone, PartialEq)]
pub enum Progress {
    /// Scanning begins; `total` pairs will be visited.
    PairsStart { total: u64 },
    /// A pair was scanned and contributed `bonds` new bonds.
    PairDone { pair: String, bonds: usize },
    /// A pair had no atoms on at least one side.
    PairSkipped { pair: String },
    /// The build finished with `bonds` bonds in total.
    Finished { bonds: usize },

    Message(String),
}

impl Progress {
    /// Whether this event advances the per-pair counter.
    pub fn is_pair_step(&self) -> bool {
        matches!(self, Progress::PairDone { .. } | Progress::PairSkipped { .. })
    }
}

pub type ProgressCallback<'a> = Box<dyn Fn(Progress) + Send + Sync + 'a>;

#[derive(Default)]
pub struct ProgressReporter<'a> {
    callback: Option<ProgressCallback<'a>>,
}

impl<'a> ProgressReporter<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_callback(callback: ProgressCallback<'a>) -> Self {
        Self {
            callback: Some(callback),
        }
    }

    #[inline]
    pub fn report(&self, event: Progress) {
        if let Some(cb) = &self.callback {
            cb(event);
        }
    }

    pub fn message(&self, text: impl Into<String>) {
        if self.callback.is_some() {
            self.report(Progress::Message(text.into()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn reporter_without_callback_is_silent() {
        let reporter = ProgressReporter::new();
        reporter.report(Progress::Finished { bonds: 0 });
        reporter.message("nothing to see");
    }

    #[test]
    fn reporter_forwards_events_in_order() {
        let events = Mutex::new(Vec::new());
        let reporter = ProgressReporter::with_callback(Box::new(|event| {
            events.lock().unwrap().push(event);
        }));
        reporter.report(Progress::PairsStart { total: 1 });
        reporter.message("scanning");
        reporter.report(Progress::PairSkipped { pair: "H-H".into() });
        drop(reporter);

        let events = events.into_inner().unwrap();
        assert_eq!(
            events,
            vec![
                Progress::PairsStart { total: 1 },
                Progress::Message("scanning".into()),
                Progress::PairSkipped { pair: "H-H".into() },
            ]
        );
        assert!(events[2].is_pair_step());
        assert!(!events[0].is_pair_step());
    }
}
