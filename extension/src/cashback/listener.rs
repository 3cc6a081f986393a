// Reacts to account create/delete events from the wallet's account service

use std::rc::Rc;

use futures::{Stream, StreamExt};

use crate::cashback::state::AddressStateManager;
use crate::error::Result;
use crate::services::accounts::{Account, AccountEvent};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ListenerOutcome {
    /// A pending selection was fulfilled with the new account
    Assigned(String),
    /// The deleted account was the cashback address
    Cleared,
    Ignored,
}

pub struct AccountChangeListener {
    state: Rc<AddressStateManager>,
}

impl AccountChangeListener {
    pub fn new(state: Rc<AddressStateManager>) -> Self {
        Self { state }
    }

    pub async fn handle(&self, event: AccountEvent) -> Result<ListenerOutcome> {
        match event {
            AccountEvent::Created(account) => self.account_created(&account).await,
            AccountEvent::Deleted(account) => self.account_deleted(&account).await,
        }
    }

    /// Only place the create-wallet redirect resolves: a consumed pending flag
    /// assigns the new account immediately.
    async fn account_created(&self, account: &Account) -> Result<ListenerOutcome> {
        if !self.state.take_pending_selection().await? {
            return Ok(ListenerOutcome::Ignored);
        }

        log::info!(
            "Account {} created from cashback flow, assigning it",
            account.address
        );
        self.state
            .set_cashback_address(Some(account.address.as_str()))
            .await?;
        Ok(ListenerOutcome::Assigned(account.address.clone()))
    }

    async fn account_deleted(&self, account: &Account) -> Result<ListenerOutcome> {
        let saved = self.state.saved_address().await?;
        if saved.as_deref() != Some(account.address.as_str()) {
            return Ok(ListenerOutcome::Ignored);
        }

        log::info!("Cashback account {} deleted", account.address);
        self.state.delete_cashback_address().await?;
        Ok(ListenerOutcome::Cleared)
    }

    /// Drain an event stream in order. Failures are logged per event and never
    /// stop the loop.
    pub async fn run<S>(&self, events: S)
    where
        S: Stream<Item = AccountEvent>,
    {
        let mut events = std::pin::pin!(events);
        while let Some(event) = events.next().await {
            if let Err(e) = self.handle(event).await {
                log::warn!("Account event handling failed: {}", e);
            }
        }
        log::debug!("Account event stream ended");
    }
}
