use super::StatWindow;
use crate::StatRecord;
use crossbeam_channel::{Receiver, RecvTimeoutError};
use log::info;
use skein_core::record::{Record, RecordValue, Recorder};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Single consumer of the per-episode stat queue.
///
/// Drains [`StatRecord`]s into rolling windows and, every `stats_rate`
/// episodes, writes window snapshots to the presentation sink. A poll
/// timeout is routine idling that re-checks the stop flag, not an error.
pub struct StatsAggregator<R: Recorder> {
    receiver: Receiver<StatRecord>,
    recorder: R,
    stats_rate: usize,
    poll_timeout: Duration,
    stop: Arc<Mutex<bool>>,

    /// Episodes consumed so far; this thread is the only writer.
    episodes: usize,

    /// Episode count at which the next report is due.
    next_report: usize,

    reward: StatWindow,
    episode_len: StatWindow,
    value_max: StatWindow,
    value_min: StatWindow,
    loss: StatWindow,
}

impl<R: Recorder> StatsAggregator<R> {
    /// Creates an aggregator reporting every `stats_rate` episodes, with
    /// windows of the given capacity.
    pub fn new(
        receiver: Receiver<StatRecord>,
        recorder: R,
        window: usize,
        stats_rate: usize,
        poll_timeout: Duration,
        stop: Arc<Mutex<bool>>,
    ) -> Self {
        Self {
            receiver,
            recorder,
            stats_rate,
            poll_timeout,
            stop,
            episodes: 0,
            next_report: stats_rate,
            reward: StatWindow::new(window),
            episode_len: StatWindow::new(window),
            value_max: StatWindow::new(window),
            value_min: StatWindow::new(window),
            loss: StatWindow::new(window),
        }
    }

    /// Runs the polling loop until the stop flag is raised or every
    /// producer is gone, then returns the recorder.
    pub fn run(mut self) -> R {
        loop {
            match self.receiver.recv_timeout(self.poll_timeout) {
                Ok(record) => self.handle(record),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }
            if *self.stop.lock().unwrap() {
                break;
            }
        }
        info!("Stopped stats thread");
        self.recorder
    }

    fn handle(&mut self, record: StatRecord) {
        self.reward.push(record.reward);
        self.episode_len.push(record.steps as f32);
        self.value_max.push(record.value_max);
        self.value_min.push(record.value_min);
        self.loss.push(record.loss);
        self.episodes += 1;

        if self.episodes >= self.next_report {
            self.next_report += self.stats_rate;
            self.report();
        }
    }

    fn report(&mut self) {
        let mut record = Record::empty();
        record.insert("episodes", RecordValue::Scalar(self.episodes as f32));
        record.insert("reward", RecordValue::Array1(self.reward.snapshot()));
        record.insert(
            "episode_len",
            RecordValue::Array1(self.episode_len.snapshot()),
        );
        record.insert("value_max", RecordValue::Array1(self.value_max.snapshot()));
        record.insert("value_min", RecordValue::Array1(self.value_min.snapshot()));
        record.insert("loss", RecordValue::Array1(self.loss.snapshot()));
        self.recorder.write(record);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;
    use skein_core::record::BufferedRecorder;

    fn stat(reward: f32) -> StatRecord {
        StatRecord {
            worker_id: 0,
            episode: 0,
            reward,
            steps: 5,
            value_max: 1.0,
            value_min: -1.0,
            loss: 0.5,
        }
    }

    #[test]
    fn reports_at_the_configured_cadence() {
        let (tx, rx) = unbounded();
        let stop = Arc::new(Mutex::new(false));
        let aggregator = StatsAggregator::new(
            rx,
            BufferedRecorder::new(),
            3,
            2,
            Duration::from_millis(10),
            stop,
        );

        for i in 0..5 {
            tx.send(stat(i as f32)).unwrap();
        }
        // Dropping the sender lets the aggregator drain the queue and
        // exit on disconnect.
        drop(tx);
        let recorder = aggregator.run();

        // 5 episodes at a report cadence of 2 yield reports at 2 and 4.
        assert_eq!(recorder.len(), 2);
        let reports: Vec<_> = recorder.iter().collect();
        assert_eq!(reports[0].get_scalar("episodes").unwrap(), 2.0);
        assert_eq!(reports[0].get_array1("reward").unwrap(), vec![0.0, 1.0]);
        // The window keeps only the last 3 values.
        assert_eq!(reports[1].get_scalar("episodes").unwrap(), 4.0);
        assert_eq!(
            reports[1].get_array1("reward").unwrap(),
            vec![1.0, 2.0, 3.0]
        );
    }

    #[test]
    fn idle_poll_exits_on_stop_flag() {
        let (tx, rx) = unbounded::<StatRecord>();
        let stop = Arc::new(Mutex::new(false));
        let aggregator = StatsAggregator::new(
            rx,
            BufferedRecorder::new(),
            3,
            10,
            Duration::from_millis(5),
            stop.clone(),
        );

        let handle = std::thread::spawn(move || aggregator.run());
        *stop.lock().unwrap() = true;
        let recorder = handle.join().unwrap();
        assert!(recorder.is_empty());
        drop(tx);
    }
}
