// Best-effort broadcast of address changes to every open context

use std::rc::Rc;

use crate::messaging::protocol::Notification;
use crate::services::tabs::ContextBroadcaster;
use crate::services::tasks::Spawner;

/// Fans a notification out to every open context.
///
/// Each delivery runs as its own detached task, so a context that never
/// answers holds up neither the other contexts nor the caller. Unreachable
/// contexts (tabs without a content script) are logged and otherwise ignored.
#[derive(Clone)]
pub struct Notifier {
    broadcaster: Rc<dyn ContextBroadcaster>,
    tasks: Rc<dyn Spawner>,
}

impl Notifier {
    pub fn new(broadcaster: Rc<dyn ContextBroadcaster>, tasks: Rc<dyn Spawner>) -> Self {
        Self { broadcaster, tasks }
    }

    /// Returns the number of contexts a delivery was dispatched to
    pub async fn broadcast(&self, notification: &Notification) -> usize {
        let contexts = match self.broadcaster.contexts().await {
            Ok(contexts) => contexts,
            Err(e) => {
                log::warn!("Could not enumerate contexts for broadcast: {}", e);
                return 0;
            }
        };

        let message = Rc::new(notification.to_message());
        for &context in &contexts {
            let broadcaster = self.broadcaster.clone();
            let message = message.clone();
            self.tasks.spawn(Box::pin(async move {
                if let Err(e) = broadcaster.deliver(context, &message).await {
                    log::debug!("Context {} not reachable: {}", context, e);
                }
            }));
        }
        contexts.len()
    }

    /// Broadcast `CASHBACK_WALLET_UPDATED` for `address` (`None` = cleared)
    pub async fn address_changed(&self, address: Option<&str>) -> usize {
        let dispatched = self.broadcast(&Notification::wallet_updated(address)).await;
        log::debug!(
            "Cashback address update {:?} dispatched to {} context(s)",
            address,
            dispatched
        );
        dispatched
    }
}
