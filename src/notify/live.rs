use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

/// Best-effort real-time delivery path layered on top of the durable
/// notification record. Behind a trait so a multi-instance deployment can
/// swap in a shared pub/sub without touching callers.
#[async_trait]
pub trait LiveChannel: Send + Sync {
    /// Hand the payload to the user's open connection. Returns false when no
    /// connection exists or it has gone away; that is never an error.
    async fn push(&self, user_id: Uuid, payload: serde_json::Value) -> bool;
}

/// Process-local registry: user id to the sender side of their connection.
/// Only reaches users connected to this instance.
#[derive(Default)]
pub struct LocalLiveRegistry {
    senders: RwLock<HashMap<Uuid, mpsc::UnboundedSender<serde_json::Value>>>,
}

impl LocalLiveRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(
        &self,
        user_id: Uuid,
        sender: mpsc::UnboundedSender<serde_json::Value>,
    ) {
        self.senders.write().await.insert(user_id, sender);
    }

    pub async fn unregister(&self, user_id: Uuid) {
        self.senders.write().await.remove(&user_id);
    }
}

#[async_trait]
impl LiveChannel for LocalLiveRegistry {
    async fn push(&self, user_id: Uuid, payload: serde_json::Value) -> bool {
        let delivered = {
            let senders = self.senders.read().await;
            match senders.get(&user_id) {
                Some(sender) => sender.send(payload).is_ok(),
                None => return false,
            }
        };
        if !delivered {
            // Connection closed without unregistering; drop the dead sender.
            self.senders.write().await.remove(&user_id);
        }
        delivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn push_without_connection_is_silently_skipped() {
        let registry = LocalLiveRegistry::new();
        assert!(!registry.push(Uuid::new_v4(), serde_json::json!({})).await);
    }

    #[tokio::test]
    async fn push_reaches_registered_connection() {
        let registry = LocalLiveRegistry::new();
        let user = Uuid::new_v4();
        let (tx, mut rx) = mpsc::unbounded_channel();
        registry.register(user, tx).await;

        assert!(registry.push(user, serde_json::json!({"hello": true})).await);
        assert_eq!(rx.recv().await.unwrap()["hello"], true);
    }

    #[tokio::test]
    async fn push_to_closed_connection_drops_the_sender() {
        let registry = LocalLiveRegistry::new();
        let user = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();
        registry.register(user, tx).await;
        drop(rx);

        assert!(!registry.push(user, serde_json::json!({})).await);
        assert!(registry.senders.read().await.is_empty());
    }
}
