// Background-side request/response handling for cashback messages

use std::rc::Rc;

use futures::future::LocalBoxFuture;
use futures::FutureExt;
use serde_json::Value;

use crate::cashback::{AddressStateManager, SelectionDispatcher};
use crate::messaging::protocol::{AddressReply, Request, RequestKind, Response, StatusReply};

/// Answers one request exactly once.
///
/// Dropping an unsent `Reply` sends the kind's failure response, so a handler
/// that bails out early still leaves no caller waiting.
pub struct Reply {
    sink: Option<Box<dyn FnOnce(Value)>>,
    kind: RequestKind,
}

impl Reply {
    pub fn new(kind: RequestKind, sink: impl FnOnce(Value) + 'static) -> Self {
        Self {
            sink: Some(Box::new(sink)),
            kind,
        }
    }

    pub fn send(mut self, response: Response) {
        if let Some(sink) = self.sink.take() {
            sink(response.to_message());
        }
    }
}

impl Drop for Reply {
    fn drop(&mut self) {
        if let Some(sink) = self.sink.take() {
            log::warn!("{:?} dropped without a reply, answering with failure", self.kind);
            sink(self.kind.failure(Some("request was not handled".into())).to_message());
        }
    }
}

pub struct MessageRouter {
    state: Rc<AddressStateManager>,
    dispatcher: Rc<SelectionDispatcher>,
}

impl MessageRouter {
    pub fn new(state: Rc<AddressStateManager>, dispatcher: Rc<SelectionDispatcher>) -> Self {
        Self { state, dispatcher }
    }

    /// Serve one request. Never fails: errors become the failure response.
    pub async fn handle(&self, request: Request) -> Response {
        match request {
            Request::GetCashbackAddress => {
                let address = self.state.get_cashback_address().await.unwrap_or_else(|e| {
                    log::warn!("GET_CASHBACK_ADDRESS failed: {}", e);
                    None
                });
                Response::Address(AddressReply { address })
            }
            Request::DeleteCashbackAddress => match self.state.delete_cashback_address().await {
                Ok(()) => Response::Status(StatusReply::ok()),
                Err(e) => {
                    log::warn!("DELETE_CASHBACK_ADDRESS failed: {}", e);
                    RequestKind::DeleteCashbackAddress.failure(None)
                }
            },
            Request::SetCashbackAddress { address } => {
                match self.state.set_cashback_address(address.as_deref()).await {
                    Ok(()) => Response::Status(StatusReply::ok()),
                    Err(e) => {
                        log::warn!("SET_CASHBACK_ADDRESS failed: {}", e);
                        RequestKind::SetCashbackAddress.failure(Some(e.to_string()))
                    }
                }
            }
            Request::OpenCashbackSelection => match self.dispatcher.open_selection().await {
                Ok(surface) => {
                    log::debug!("Opened {:?}", surface);
                    Response::Status(StatusReply::ok())
                }
                Err(e) => {
                    log::warn!("OPEN_CASHBACK_SELECTION failed: {}", e);
                    RequestKind::OpenCashbackSelection.failure(Some(e.to_string()))
                }
            },
        }
    }

    /// Take a raw runtime message.
    ///
    /// `None` means the message isn't a cashback request and `sink` was not
    /// used, leaving it to other listeners. Otherwise the returned future must
    /// be driven; it calls `sink` exactly once. The glue spawns it and tells
    /// the runtime the response is asynchronous.
    pub fn route(
        self: &Rc<Self>,
        message: &Value,
        sink: impl FnOnce(Value) + 'static,
    ) -> Option<LocalBoxFuture<'static, ()>> {
        let kind = RequestKind::of_message(message)?;
        let reply = Reply::new(kind, sink);

        let request = match serde_json::from_value::<Request>(message.clone()) {
            Ok(request) => request,
            Err(e) => {
                log::warn!("Malformed {:?} message: {}", kind, e);
                let response = kind.failure(Some(format!("malformed message: {}", e)));
                return Some(async move { reply.send(response) }.boxed_local());
            }
        };

        let router = Rc::clone(self);
        Some(
            async move {
                let response = router.handle(request).await;
                reply.send(response);
            }
            .boxed_local(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cashback::Notifier;
    use crate::config::StorageConfig;
    use crate::services::accounts::MemoryAccounts;
    use crate::services::storage::MemoryStore;
    use crate::services::surfaces::RecordingSurfaces;
    use crate::services::tabs::LocalContexts;
    use crate::services::tasks::LocalTasks;
    use serde_json::json;
    use std::cell::RefCell;

    fn router(accounts: Rc<MemoryAccounts>, surfaces: Rc<RecordingSurfaces>) -> Rc<MessageRouter> {
        let state = Rc::new(AddressStateManager::new(
            Rc::new(MemoryStore::new()),
            accounts.clone(),
            Notifier::new(Rc::new(LocalContexts::new()), Rc::new(LocalTasks::new())),
            StorageConfig::default(),
        ));
        let dispatcher = Rc::new(SelectionDispatcher::new(state.clone(), accounts, surfaces));
        Rc::new(MessageRouter::new(state, dispatcher))
    }

    async fn send(router: &Rc<MessageRouter>, message: Value) -> Vec<Value> {
        let replies = Rc::new(RefCell::new(Vec::new()));
        let sink = replies.clone();
        let task = router
            .route(&message, move |v| sink.borrow_mut().push(v))
            .expect("cashback message");
        task.await;
        let out = replies.borrow().clone();
        out
    }

    #[tokio::test]
    async fn test_unknown_message_left_alone() {
        let router = router(Rc::new(MemoryAccounts::new()), Rc::new(RecordingSurfaces::new()));
        let called = Rc::new(RefCell::new(false));
        let flag = called.clone();

        let task = router.route(&json!({"type": "FUEL_CONNECT"}), move |_| {
            *flag.borrow_mut() = true
        });

        assert!(task.is_none());
        assert!(!*called.borrow());
    }

    #[tokio::test]
    async fn test_set_without_address_fails_once() {
        let router = router(Rc::new(MemoryAccounts::new()), Rc::new(RecordingSurfaces::new()));

        let replies = send(&router, json!({"type": "SET_CASHBACK_ADDRESS"})).await;

        assert_eq!(
            replies,
            vec![json!({"success": false, "error": "No address provided"})]
        );
    }

    #[tokio::test]
    async fn test_malformed_set_gets_failure() {
        let router = router(Rc::new(MemoryAccounts::new()), Rc::new(RecordingSurfaces::new()));

        let replies = send(&router, json!({"type": "SET_CASHBACK_ADDRESS", "address": 42})).await;

        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0]["success"], false);
    }

    #[tokio::test]
    async fn test_get_downgrades_failure_to_null() {
        let accounts = Rc::new(MemoryAccounts::with_addresses(["0xAAA"]));
        accounts.set_unavailable(true);
        let router = router(accounts, Rc::new(RecordingSurfaces::new()));

        let replies = send(&router, json!({"type": "GET_CASHBACK_ADDRESS"})).await;

        assert_eq!(replies, vec![json!({"address": null})]);
    }

    #[tokio::test]
    async fn test_open_selection_failure_carries_error() {
        let surfaces = Rc::new(RecordingSurfaces::new());
        surfaces.fail_with("no window");
        let router = router(Rc::new(MemoryAccounts::with_addresses(["0xA", "0xB"])), surfaces);

        let replies = send(&router, json!({"type": "OPEN_CASHBACK_SELECTION"})).await;

        assert_eq!(
            replies,
            vec![json!({"success": false, "error": "failed to open selection popup: no window"})]
        );
    }

    #[tokio::test]
    async fn test_delete_replies_success() {
        let router = router(Rc::new(MemoryAccounts::new()), Rc::new(RecordingSurfaces::new()));
        let replies = send(&router, json!({"type": "DELETE_CASHBACK_ADDRESS"})).await;
        assert_eq!(replies, vec![json!({"success": true})]);
    }

    #[test]
    fn test_dropped_reply_answers_with_failure() {
        let replies = Rc::new(RefCell::new(Vec::new()));
        let sink = replies.clone();

        let reply = Reply::new(RequestKind::GetCashbackAddress, move |v| {
            sink.borrow_mut().push(v)
        });
        drop(reply);

        assert_eq!(*replies.borrow(), vec![json!({"address": null})]);
    }

    #[tokio::test]
    async fn test_dropped_task_still_replies() {
        let router = router(Rc::new(MemoryAccounts::new()), Rc::new(RecordingSurfaces::new()));
        let replies = Rc::new(RefCell::new(Vec::new()));
        let sink = replies.clone();

        let task = router
            .route(&json!({"type": "OPEN_CASHBACK_SELECTION"}), move |v| {
                sink.borrow_mut().push(v)
            })
            .unwrap();
        drop(task);

        assert_eq!(replies.borrow().len(), 1);
        assert_eq!(replies.borrow()[0]["success"], false);
    }
}
