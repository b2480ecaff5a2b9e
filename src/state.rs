/*
 * Copyright 2018 Intel Corporation
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 *     http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 * -----------------------------------------------------------------------------
 */

//! A thin wrapper over the validator context that loads, creates,
//! overwrites, and deletes the account entry stored at an EVM address.
//!
//! Reads are cached for the duration of one transaction so the EVM sees
//! a stable snapshot; writes go through to the context immediately, so
//! a read after a write observes the written value. The manager holds
//! no state across transactions.

use std::collections::HashMap;
use std::error::Error as StdError;
use std::fmt;

use crate::address::EvmAddr;
use crate::handler::{ApplyError, ContextError, TransactionContext};
use crate::protocol::account::AccountEntry;
use crate::protos::{FromBytes, IntoBytes, ProtoConversionError};

#[derive(Debug)]
pub enum StateError {
    /// No account entry exists at the address.
    NotFound(EvmAddr),
    /// An account entry already exists at the address.
    AlreadyExists(EvmAddr),
    /// The validator context failed.
    Context(ContextError),
    /// An entry could not be encoded or decoded.
    Serialization(ProtoConversionError),
}

impl StdError for StateError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            StateError::NotFound(_) => None,
            StateError::AlreadyExists(_) => None,
            StateError::Context(err) => Some(err),
            StateError::Serialization(err) => Some(err),
        }
    }
}

impl fmt::Display for StateError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            StateError::NotFound(ref addr) => write!(f, "no account entry at {}", addr),
            StateError::AlreadyExists(ref addr) => {
                write!(f, "account entry already exists at {}", addr)
            }
            StateError::Context(ref err) => write!(f, "state context error: {}", err),
            StateError::Serialization(ref err) => write!(f, "entry serialization error: {}", err),
        }
    }
}

impl From<StateError> for ApplyError {
    fn from(err: StateError) -> Self {
        match err {
            StateError::NotFound(..) | StateError::AlreadyExists(..) => {
                ApplyError::InvalidTransaction(format!("{}", err))
            }
            StateError::Context(..) | StateError::Serialization(..) => {
                ApplyError::InternalError(format!("{}", err))
            }
        }
    }
}

pub struct StateManager<'a> {
    context: &'a dyn TransactionContext,
    cache: HashMap<EvmAddr, Option<AccountEntry>>,
}

impl<'a> StateManager<'a> {
    pub fn new(context: &'a dyn TransactionContext) -> Self {
        StateManager {
            context,
            cache: HashMap::new(),
        }
    }

    pub fn context(&self) -> &'a dyn TransactionContext {
        self.context
    }

    /// Loads the entry at the given address, or `None` if the account
    /// does not exist.
    pub fn get(&mut self, addr: &EvmAddr) -> Result<Option<AccountEntry>, StateError> {
        if let Some(cached) = self.cache.get(addr) {
            return Ok(cached.clone());
        }
        let entry = self
            .context
            .get_state_entry(&addr.to_state_address())
            .map_err(StateError::Context)?
            .map(|bytes| AccountEntry::from_bytes(&bytes).map_err(StateError::Serialization))
            .transpose()?;
        self.cache.insert(*addr, entry.clone());
        Ok(entry)
    }

    /// Loads the entry at the given address, failing if the account
    /// does not exist.
    pub fn must_get(&mut self, addr: &EvmAddr) -> Result<AccountEntry, StateError> {
        self.get(addr)?.ok_or_else(|| StateError::NotFound(*addr))
    }

    /// Creates a fresh entry at the given address, failing if one is
    /// already present.
    pub fn new_entry(&mut self, addr: &EvmAddr) -> Result<AccountEntry, StateError> {
        if self.get(addr)?.is_some() {
            return Err(StateError::AlreadyExists(*addr));
        }
        let entry = AccountEntry::for_address(*addr);
        self.set(addr, entry.clone())?;
        Ok(entry)
    }

    /// Persists the entry at the given address. The last write within a
    /// transaction wins.
    pub fn set(&mut self, addr: &EvmAddr, entry: AccountEntry) -> Result<(), StateError> {
        let bytes = entry
            .clone()
            .into_bytes()
            .map_err(StateError::Serialization)?;
        self.context
            .set_state_entry(addr.to_state_address(), bytes)
            .map_err(StateError::Context)?;
        self.cache.insert(*addr, Some(entry));
        Ok(())
    }

    /// Removes the entry at the given address, failing if the account
    /// does not exist.
    pub fn del(&mut self, addr: &EvmAddr) -> Result<(), StateError> {
        if self.get(addr)?.is_none() {
            return Err(StateError::NotFound(*addr));
        }
        self.context
            .delete_state_entry(&addr.to_state_address())
            .map_err(StateError::Context)?;
        self.cache.insert(*addr, None);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::protocol::account::{AccountBuilder, AccountEntryBuilder};
    use crate::testing::TestContext;

    fn addr(fill: u8) -> EvmAddr {
        EvmAddr::from_bytes(&[fill; 20]).unwrap()
    }

    #[test]
    fn get_missing_entry_returns_none() {
        let context = TestContext::new();
        let mut mgr = StateManager::new(&context);
        assert_eq!(mgr.get(&addr(1)).unwrap(), None);
    }

    #[test]
    fn must_get_missing_entry_fails() {
        let context = TestContext::new();
        let mut mgr = StateManager::new(&context);
        match mgr.must_get(&addr(1)) {
            Err(StateError::NotFound(a)) => assert_eq!(a, addr(1)),
            other => panic!("Expected NotFound, got {:?}", other),
        }
    }

    #[test]
    fn new_entry_then_get() {
        let context = TestContext::new();
        let mut mgr = StateManager::new(&context);
        let entry = mgr.new_entry(&addr(2)).unwrap();
        assert_eq!(entry.account().address(), &addr(2));
        assert_eq!(entry.account().nonce(), 0);
        assert!(entry.storage().is_empty());
        assert_eq!(mgr.get(&addr(2)).unwrap(), Some(entry));
    }

    #[test]
    fn new_entry_twice_fails() {
        let context = TestContext::new();
        let mut mgr = StateManager::new(&context);
        mgr.new_entry(&addr(2)).unwrap();
        match mgr.new_entry(&addr(2)) {
            Err(StateError::AlreadyExists(a)) => assert_eq!(a, addr(2)),
            other => panic!("Expected AlreadyExists, got {:?}", other),
        }
    }

    /// A write becomes visible to the next read within the same
    /// transaction, and to a fresh manager over the same context.
    #[test]
    fn set_is_read_your_writes_and_write_through() {
        let context = TestContext::new();
        let mut mgr = StateManager::new(&context);
        let mut entry = mgr.new_entry(&addr(3)).unwrap();
        let mut account = entry.account().clone();
        account.bump_nonce();
        entry.set_account(account);
        mgr.set(&addr(3), entry.clone()).unwrap();
        assert_eq!(mgr.get(&addr(3)).unwrap(), Some(entry.clone()));

        let mut fresh = StateManager::new(&context);
        assert_eq!(fresh.get(&addr(3)).unwrap(), Some(entry));
    }

    #[test]
    fn last_write_wins() {
        let context = TestContext::new();
        let mut mgr = StateManager::new(&context);
        mgr.new_entry(&addr(4)).unwrap();

        let first = AccountEntryBuilder::new()
            .with_account(
                AccountBuilder::new()
                    .with_address(addr(4))
                    .with_nonce(1)
                    .build()
                    .unwrap(),
            )
            .build()
            .unwrap();
        let second = AccountEntryBuilder::new()
            .with_account(
                AccountBuilder::new()
                    .with_address(addr(4))
                    .with_nonce(2)
                    .build()
                    .unwrap(),
            )
            .build()
            .unwrap();

        mgr.set(&addr(4), first).unwrap();
        mgr.set(&addr(4), second.clone()).unwrap();
        assert_eq!(mgr.get(&addr(4)).unwrap(), Some(second));
    }

    #[test]
    fn del_removes_entry() {
        let context = TestContext::new();
        let mut mgr = StateManager::new(&context);
        mgr.new_entry(&addr(5)).unwrap();
        mgr.del(&addr(5)).unwrap();
        assert_eq!(mgr.get(&addr(5)).unwrap(), None);

        let mut fresh = StateManager::new(&context);
        assert_eq!(fresh.get(&addr(5)).unwrap(), None);
    }

    #[test]
    fn del_missing_entry_fails() {
        let context = TestContext::new();
        let mut mgr = StateManager::new(&context);
        assert!(mgr.del(&addr(6)).is_err());
    }

    /// A read outside the namespaces the transaction declared is a
    /// context failure, not a missing account.
    #[test]
    fn unauthorized_namespace_is_a_context_error() {
        let context = TestContext::restricted_to(&[crate::address::BLOCK_INFO_NAMESPACE]);
        let mut mgr = StateManager::new(&context);
        match mgr.get(&addr(7)) {
            Err(StateError::Context(ContextError::AuthorizationError(_))) => (),
            other => panic!("Expected AuthorizationError, got {:?}", other),
        }
    }

    /// Context standing in for a dropped validator connection.
    struct BrokenContext;

    impl TransactionContext for BrokenContext {
        fn get_state_entry(&self, _address: &str) -> Result<Option<Vec<u8>>, ContextError> {
            Err(ContextError::ConnectionError("validator hung up".into()))
        }

        fn set_state_entry(&self, _address: String, _data: Vec<u8>) -> Result<(), ContextError> {
            Err(ContextError::ConnectionError("validator hung up".into()))
        }

        fn delete_state_entry(&self, _address: &str) -> Result<Option<String>, ContextError> {
            Err(ContextError::ConnectionError("validator hung up".into()))
        }

        fn add_receipt_data(&self, _data: Vec<u8>) -> Result<(), ContextError> {
            Err(ContextError::ConnectionError("validator hung up".into()))
        }

        fn add_event(
            &self,
            _event_type: String,
            _attributes: Vec<(String, String)>,
            _data: Vec<u8>,
        ) -> Result<(), ContextError> {
            Err(ContextError::ConnectionError("validator hung up".into()))
        }
    }

    /// Connection failures surface as internal errors so the validator
    /// can retry, unlike the deterministic missing/duplicate rejections.
    #[test]
    fn connection_failures_are_internal() {
        let context = BrokenContext;
        let mut mgr = StateManager::new(&context);
        let err = match mgr.get(&addr(8)) {
            Err(err @ StateError::Context(_)) => err,
            other => panic!("Expected a context error, got {:?}", other),
        };
        match ApplyError::from(err) {
            ApplyError::InternalError(_) => (),
            other => panic!("Expected InternalError, got {:?}", other),
        }
    }
}
