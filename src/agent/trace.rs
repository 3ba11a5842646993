//! Step trace for a turn.
//!
//! Every step goes through [`TraceSink::emit`]. The sink always buffers, and may also forward
//! each step to a streaming subscriber the moment it is emitted.

use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info};

use crate::base::types::Step;

/// Called inline from the loop for every step, so it must return quickly.
pub type StepCallback = Box<dyn FnMut(&Step) + Send>;

enum Subscriber {
    Channel(UnboundedSender<Step>),
    Callback(StepCallback),
}

/// Append-only, ordered log of the steps of one turn.
#[derive(Default)]
pub struct TraceSink {
    steps: Vec<Step>,
    subscriber: Option<Subscriber>,
}

impl TraceSink {
    /// A sink that only buffers.
    pub fn buffered() -> Self {
        Self::default()
    }

    /// A sink that also sends each step down `tx`.
    pub fn streaming(tx: UnboundedSender<Step>) -> Self {
        Self {
            steps: Vec::new(),
            subscriber: Some(Subscriber::Channel(tx)),
        }
    }

    /// A sink that also hands each step to `callback`.
    pub fn with_callback(callback: impl FnMut(&Step) + Send + 'static) -> Self {
        Self {
            steps: Vec::new(),
            subscriber: Some(Subscriber::Callback(Box::new(callback))),
        }
    }

    pub fn emit(&mut self, step: Step) {
        info!("Step {}: {}", self.steps.len() + 1, step.action);
        debug!("Observation: {}", step.observation);

        match &mut self.subscriber {
            Some(Subscriber::Channel(tx)) => {
                // A gone receiver only stops streaming; the buffer still fills.
                if tx.send(step.clone()).is_err() {
                    debug!("Step receiver dropped");
                }
            }
            Some(Subscriber::Callback(callback)) => callback(&step),
            None => {}
        }

        self.steps.push(step);
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Take every buffered step, in emission order.
    pub fn drain(&mut self) -> Vec<Step> {
        std::mem::take(&mut self.steps)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use tokio::sync::mpsc;

    use super::*;

    fn step(action: &str) -> Step {
        Step {
            thought: "t".into(),
            action: action.into(),
            action_input: "i".into(),
            observation: "o".into(),
        }
    }

    #[test]
    fn test_buffered_drain_keeps_order() {
        let mut sink = TraceSink::buffered();
        sink.emit(step("a"));
        sink.emit(step("b"));

        assert_eq!(sink.drain(), vec![step("a"), step("b")]);
        assert!(sink.is_empty());
    }

    #[test]
    fn test_streaming_and_buffer_agree() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut sink = TraceSink::streaming(tx);

        sink.emit(step("a"));
        assert_eq!(rx.try_recv().unwrap(), step("a"));
        sink.emit(step("b"));
        assert_eq!(rx.try_recv().unwrap(), step("b"));

        assert_eq!(sink.steps(), &[step("a"), step("b")]);
    }

    #[test]
    fn test_dropped_receiver_does_not_stop_buffering() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let mut sink = TraceSink::streaming(tx);

        sink.emit(step("a"));

        assert_eq!(sink.len(), 1);
    }

    #[test]
    fn test_callback_sees_each_step() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink_seen = seen.clone();
        let mut sink = TraceSink::with_callback(move |s: &Step| sink_seen.lock().unwrap().push(s.action.clone()));

        sink.emit(step("a"));
        sink.emit(step("b"));

        assert_eq!(*seen.lock().unwrap(), vec!["a", "b"]);
    }
}
