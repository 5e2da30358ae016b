use std::collections::HashMap;
use std::sync::Mutex;

use log::info;

use crate::account::AccountsCatalog;
use crate::error::EngineError;
use crate::transaction::{Transaction, TransactionStatus};

/// The single authoritative balance holder and peer-address directory.
/// Everything that mutates state goes through one mutex, covering at
/// least the read-check-write of the two accounts a transfer touches.
pub struct Registry {
    server_addr: String,
    accounts: Mutex<AccountsCatalog>,
    client_addrs: Mutex<HashMap<u32, String>>,
}

/// What `register` hands back to a joining peer: its new id, the
/// addresses of every peer that registered before it, and this
/// Registry's own address.
pub struct Registration {
    pub client_id: u32,
    pub other_clients: HashMap<u32, String>,
    pub server_addr: String,
}

impl Registry {
    pub fn new(server_addr: impl Into<String>) -> Self {
        Self {
            server_addr: server_addr.into(),
            accounts: Mutex::new(AccountsCatalog::new()),
            client_addrs: Mutex::new(HashMap::new()),
        }
    }

    pub fn register(&self) -> Registration {
        let client_id = self.accounts.lock().unwrap().register();
        let other_clients = self.client_addrs.lock().unwrap().clone();

        info!("registered peer {client_id}");

        Registration {
            client_id,
            other_clients,
            server_addr: self.server_addr.clone(),
        }
    }

    pub fn register_confirm(&self, client_id: u32, client_addr: String) -> Result<(), EngineError> {
        if self.accounts.lock().unwrap().get(client_id).is_none() {
            return Err(EngineError::UnknownAccount(client_id));
        }
        self.client_addrs.lock().unwrap().insert(client_id, client_addr);
        Ok(())
    }

    pub fn balance(&self, client_id: u32) -> Result<f64, EngineError> {
        self.accounts.lock().unwrap().balance(client_id)
    }

    /// The only place balances change. The Registry trusts
    /// that the caller already cleared the mutual-exclusion protocol; it
    /// performs its own sufficiency check as a safety net, not as a
    /// re-derivation of order.
    pub fn transfer(&self, tx: &Transaction) -> Result<(), EngineError> {
        if !matches!(tx.status(), TransactionStatus::Pending) {
            // a peer only ever calls this at commit time, before setting
            // a final status; guard against a caller bug rather than the
            // network.
            panic!("transfer() called with a non-pending transaction");
        }

        self.accounts
            .lock()
            .unwrap()
            .transfer(tx.sender_id(), tx.recipient_id(), tx.amount())
    }

    pub fn exit(&self, client_id: u32) {
        self.client_addrs.lock().unwrap().remove(&client_id);
        info!("peer {client_id} exited");
    }

    pub fn client_addr(&self, client_id: u32) -> Option<String> {
        self.client_addrs.lock().unwrap().get(&client_id).cloned()
    }

    pub fn peer_count(&self) -> usize {
        self.client_addrs.lock().unwrap().len()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("server_addr", &self.server_addr)
            .finish_non_exhaustive()
    }
}
