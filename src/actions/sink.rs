use crate::actions::record::ActionRecord;
use crate::errors::{RecorderError, Result};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// Outbound destination for action records (`sendAction` on the host side).
pub trait ActionSink: Send + Sync {
    fn send_action(&self, record: ActionRecord) -> Result<()>;
}

/// Forwards records over an unbounded channel to an async consumer.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    sender: mpsc::UnboundedSender<ActionRecord>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ActionRecord>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl ActionSink for ChannelSink {
    fn send_action(&self, record: ActionRecord) -> Result<()> {
        self.sender
            .send(record)
            .map_err(|err| RecorderError::SinkClosed(format!("receiver dropped: {}", err.0.action_type)))
    }
}

/// Keeps every record in memory; clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    records: Arc<Mutex<Vec<ActionRecord>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<ActionRecord> {
        self.records
            .lock()
            .map(|records| records.clone())
            .unwrap_or_default()
    }

    pub fn take(&self) -> Vec<ActionRecord> {
        self.records
            .lock()
            .map(|mut records| std::mem::take(&mut *records))
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.records.lock().map(|records| records.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ActionSink for MemorySink {
    fn send_action(&self, record: ActionRecord) -> Result<()> {
        self.records
            .lock()
            .map_err(|_| RecorderError::SinkClosed("memory sink poisoned".to_string()))?
            .push(record);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::record::{ActionType, ActionValue};

    #[tokio::test]
    async fn channel_sink_delivers_in_order() {
        let (sink, mut receiver) = ChannelSink::new();
        sink.send_action(ActionRecord::new(ActionType::Click, ActionValue::at(1)))
            .unwrap();
        sink.send_action(ActionRecord::new(ActionType::Input, ActionValue::at(2)))
            .unwrap();
        assert_eq!(receiver.recv().await.unwrap().action_type, ActionType::Click);
        assert_eq!(receiver.recv().await.unwrap().action_type, ActionType::Input);
    }

    #[test]
    fn closed_channel_is_an_error() {
        let (sink, receiver) = ChannelSink::new();
        drop(receiver);
        let err = sink
            .send_action(ActionRecord::new(ActionType::Scroll, ActionValue::at(0)))
            .unwrap_err();
        assert!(matches!(err, RecorderError::SinkClosed(_)));
    }
}
