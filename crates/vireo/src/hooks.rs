use async_trait::async_trait;

use crate::models::message::Message;

/// Optional persistence hook, invoked once per message appended to the
/// conversation. Calls are spawned fire-and-forget: the loop never
/// blocks on, retries, or fails because of the hook's outcome.
#[async_trait]
pub trait MessageHook: Send + Sync {
    async fn on_message(&self, thread_id: Option<String>, message: Message);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    pub(crate) struct RecordingHook {
        pub(crate) seen: Arc<Mutex<Vec<(Option<String>, Message)>>>,
    }

    #[async_trait]
    impl MessageHook for RecordingHook {
        async fn on_message(&self, thread_id: Option<String>, message: Message) {
            self.seen.lock().unwrap().push((thread_id, message));
        }
    }

    #[tokio::test]
    async fn test_hook_receives_message() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let hook = RecordingHook { seen: seen.clone() };

        hook.on_message(
            Some("thread-1".to_string()),
            Message::user().with_text("hello"),
        )
        .await;

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0.as_deref(), Some("thread-1"));
        assert_eq!(seen[0].1.text(), "hello");
    }
}
