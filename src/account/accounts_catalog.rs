use super::Account;
use crate::error::EngineError;

/// Owns every account the Registry has ever created and is the single
/// point through which balances change. Ids are allocated monotonically
/// starting at 1 and are never reused, even after a peer exits — exit
/// only removes reachability, never the account.
#[derive(Debug, Default)]
pub struct AccountsCatalog {
    accounts: Vec<Account>,
    next_id: u32,
}

impl AccountsCatalog {
    pub fn new() -> Self {
        Self {
            accounts: Vec::new(),
            next_id: 1,
        }
    }

    /// Allocates the next id and creates its account.
    pub fn register(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        self.accounts.push(Account::new(id));
        id
    }

    pub fn get(&self, id: u32) -> Option<&Account> {
        self.accounts.iter().find(|a| a.id() == id)
    }

    fn get_mut(&mut self, id: u32) -> Option<&mut Account> {
        self.accounts.iter_mut().find(|a| a.id() == id)
    }

    pub fn balance(&self, id: u32) -> Result<f64, EngineError> {
        self.get(id).map(Account::balance).ok_or(EngineError::UnknownAccount(id))
    }

    /// The read-check-write a caller must perform under a single lock.
    /// Returns `InsufficientBalance` without mutating anything if the
    /// sender can't cover `amount`.
    pub fn transfer(&mut self, sender_id: u32, recipient_id: u32, amount: f64) -> Result<(), EngineError> {
        if self.get(sender_id).is_none() {
            return Err(EngineError::UnknownAccount(sender_id));
        }
        if self.get(recipient_id).is_none() {
            return Err(EngineError::UnknownAccount(recipient_id));
        }

        if self.get(sender_id).unwrap().balance() < amount {
            return Err(EngineError::InsufficientBalance(sender_id));
        }

        self.get_mut(sender_id)
            .unwrap()
            .sub(amount)
            .map_err(|_| EngineError::InsufficientBalance(sender_id))?;
        self.get_mut(recipient_id).unwrap().add(amount);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_allocates_monotonically_starting_at_one() {
        let mut catalog = AccountsCatalog::new();
        assert_eq!(catalog.register(), 1);
        assert_eq!(catalog.register(), 2);
        assert_eq!(catalog.register(), 3);
    }

    #[test]
    fn transfer_moves_balance_between_known_accounts() {
        let mut catalog = AccountsCatalog::new();
        let a = catalog.register();
        let b = catalog.register();

        catalog.transfer(a, b, 4.0).unwrap();

        assert_eq!(catalog.balance(a).unwrap(), 6.0);
        assert_eq!(catalog.balance(b).unwrap(), 14.0);
    }

    #[test]
    fn transfer_rejects_unknown_accounts() {
        let mut catalog = AccountsCatalog::new();
        let a = catalog.register();

        assert!(matches!(
            catalog.transfer(a, 999, 1.0),
            Err(EngineError::UnknownAccount(999))
        ));
    }

    #[test]
    fn transfer_rejects_insufficient_balance_without_mutating_state() {
        let mut catalog = AccountsCatalog::new();
        let a = catalog.register();
        let b = catalog.register();

        let result = catalog.transfer(a, b, 1000.0);

        assert!(matches!(result, Err(EngineError::InsufficientBalance(_))));
        assert_eq!(catalog.balance(a).unwrap(), 10.0);
        assert_eq!(catalog.balance(b).unwrap(), 10.0);
    }
}
