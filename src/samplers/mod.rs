use crate::common::CounterSet;

#[cfg(target_os = "linux")]
pub mod linux;

/// A source of absolute drop-counter readings. Sampling never fails: any
/// counter whose backing data is unavailable or unparseable reads as zero.
pub trait CounterSource {
    fn sample(&mut self) -> CounterSet;
}

/// Replays a scripted sequence of counter readings, repeating the final one
/// once the script runs out.
#[cfg(test)]
pub(crate) struct StubSource {
    samples: std::collections::VecDeque<CounterSet>,
}

#[cfg(test)]
impl StubSource {
    pub fn new(samples: Vec<CounterSet>) -> Self {
        Self {
            samples: samples.into(),
        }
    }
}

#[cfg(test)]
impl CounterSource for StubSource {
    fn sample(&mut self) -> CounterSet {
        if self.samples.len() > 1 {
            self.samples.pop_front().unwrap()
        } else {
            *self.samples.front().expect("stub source is empty")
        }
    }
}
