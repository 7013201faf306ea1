use std::collections::HashMap;
use std::sync::Mutex;

use tokio::sync::broadcast::{self, error::RecvError, Receiver, Sender};

use crate::core::models::vote::Vote;

const CHANNEL_CAPACITY: usize = 16;

// Per-poll fan-out of vote snapshots. Every published frame is the full
// current vote set for the poll, so receivers that fall behind can safely
// skip to the newest frame.
pub struct FeedHub {
    channels: Mutex<HashMap<String, Sender<Vec<Vote>>>>,
}

impl FeedHub {
    pub fn new() -> Self {
        Self {
            channels: Mutex::new(HashMap::new()),
        }
    }

    pub fn subscribe(&self, poll_id: &str) -> VoteSubscription {
        let mut channels = self.channels.lock().unwrap();
        let sender = channels
            .entry(poll_id.to_string())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0);
        VoteSubscription {
            receiver: sender.subscribe(),
        }
    }

    pub fn publish(&self, poll_id: &str, votes: Vec<Vote>) {
        let mut channels = self.channels.lock().unwrap();
        let orphaned = match channels.get(poll_id) {
            Some(sender) => sender.send(votes).is_err(),
            None => false,
        };
        if orphaned {
            // no receivers left for this poll
            channels.remove(poll_id);
        }
    }
}

impl Default for FeedHub {
    fn default() -> Self {
        Self::new()
    }
}

// Dropping the subscription unsubscribes from the feed.
pub struct VoteSubscription {
    receiver: Receiver<Vec<Vote>>,
}

impl VoteSubscription {
    // None once the hub side has gone away.
    pub async fn recv(&mut self) -> Option<Vec<Vote>> {
        loop {
            match self.receiver.recv().await {
                Ok(votes) => return Some(votes),
                Err(RecvError::Lagged(skipped)) => {
                    log::warn!("vote feed lagged, skipped {} frames", skipped);
                    continue;
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::core::models::vote::Vote;
    use chrono::Utc;

    fn vote(poll_id: &str, user_id: &str, option_index: i32) -> Vote {
        Vote {
            id: format!("{}-{}", poll_id, user_id),
            poll_id: poll_id.into(),
            user_id: user_id.into(),
            option_index,
            cast_at: Utc::now(),
            version: 1,
        }
    }

    #[tokio::test]
    async fn test_publish_reaches_subscriber() {
        let hub = FeedHub::new();
        let mut sub = hub.subscribe("p1");
        hub.publish("p1", vec![vote("p1", "u1", 0)]);
        let votes = sub.recv().await.unwrap();
        assert_eq!(votes.len(), 1);
        assert_eq!(votes[0].user_id, "u1");
    }

    #[tokio::test]
    async fn test_subscribers_are_per_poll() {
        let hub = FeedHub::new();
        let mut sub_a = hub.subscribe("a");
        let mut sub_b = hub.subscribe("b");
        hub.publish("a", vec![vote("a", "u1", 0)]);
        hub.publish("b", vec![vote("b", "u2", 1)]);
        assert_eq!(sub_a.recv().await.unwrap()[0].poll_id, "a");
        assert_eq!(sub_b.recv().await.unwrap()[0].poll_id, "b");
    }

    #[tokio::test]
    async fn test_dropped_subscriber_does_not_affect_others() {
        let hub = FeedHub::new();
        let sub_gone = hub.subscribe("p1");
        let mut sub_kept = hub.subscribe("p1");
        drop(sub_gone);
        hub.publish("p1", vec![vote("p1", "u1", 0)]);
        assert_eq!(sub_kept.recv().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_channel_is_pruned_once_all_subscribers_are_gone() {
        let hub = FeedHub::new();
        let sub = hub.subscribe("p1");
        drop(sub);
        hub.publish("p1", vec![vote("p1", "u1", 0)]);
        assert!(hub.channels.lock().unwrap().is_empty());
    }
}
