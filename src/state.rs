//! Observable reasoning state.
//!
//! Wraps a `tokio::sync::watch` channel: observers see the latest value when
//! they subscribe and every later publication in order. Only the most recent
//! value is retained, so a slow observer may skip intermediate states.

use crate::models::ReasoningState;
use std::sync::Arc;
use tokio::sync::watch;

/// Receiving side handed to presentation code.
pub type StateWatcher = watch::Receiver<ReasoningState>;

#[derive(Clone)]
pub struct StatePublisher {
    sender: Arc<watch::Sender<ReasoningState>>,
}

impl StatePublisher {
    pub fn new() -> Self {
        let (sender, _rx) = watch::channel(ReasoningState::Initial);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Replace the current state and notify observers.
    ///
    /// Succeeds even with no observers attached.
    pub fn publish(&self, state: ReasoningState) {
        tracing::trace!("Publishing state: {:?}", state);
        self.sender.send_replace(state);
    }

    pub fn current(&self) -> ReasoningState {
        self.sender.borrow().clone()
    }

    pub fn subscribe(&self) -> StateWatcher {
        self.sender.subscribe()
    }
}

impl Default for StatePublisher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_initial() {
        let publisher = StatePublisher::new();
        assert_eq!(publisher.current(), ReasoningState::Initial);
    }

    #[test]
    fn test_publish_without_observers() {
        let publisher = StatePublisher::new();
        publisher.publish(ReasoningState::Loading);
        assert_eq!(publisher.current(), ReasoningState::Loading);
    }

    #[tokio::test]
    async fn test_subscriber_sees_latest_then_updates() {
        let publisher = StatePublisher::new();
        publisher.publish(ReasoningState::Loading);

        let mut watcher = publisher.subscribe();
        assert_eq!(*watcher.borrow_and_update(), ReasoningState::Loading);

        publisher.publish(ReasoningState::Success("Hello".to_string()));
        watcher.changed().await.unwrap();
        assert_eq!(
            *watcher.borrow_and_update(),
            ReasoningState::Success("Hello".to_string())
        );
    }

    #[tokio::test]
    async fn test_many_observers_share_state() {
        let publisher = StatePublisher::new();
        let mut first = publisher.subscribe();
        let mut second = publisher.clone().subscribe();

        publisher.publish(ReasoningState::Error("offline".to_string()));

        first.changed().await.unwrap();
        second.changed().await.unwrap();
        assert_eq!(*first.borrow(), *second.borrow());
    }
}
