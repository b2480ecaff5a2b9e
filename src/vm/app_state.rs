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

//! SawtoothAppState implements the state interface the EVM consumes,
//! backed by the per-transaction state manager.

use crate::address::EvmAddr;
use crate::handler::seth::get_block_info;
use crate::handler::TransactionContext;
use crate::protocol::account::{Account, StorageEntry};
use crate::state::{StateError, StateManager};
use crate::vm::{AppState, Word256};

pub struct SawtoothAppState<'a> {
    mgr: StateManager<'a>,
}

impl<'a> SawtoothAppState<'a> {
    pub fn new(context: &'a dyn TransactionContext) -> Self {
        SawtoothAppState {
            mgr: StateManager::new(context),
        }
    }

    pub fn context(&self) -> &'a dyn TransactionContext {
        self.mgr.context()
    }
}

impl<'a> AppState for SawtoothAppState<'a> {
    fn get_account(&mut self, addr: &EvmAddr) -> Result<Option<Account>, StateError> {
        debug!("GetAccount({})", addr);
        Ok(self.mgr.get(addr)?.map(|entry| entry.account().clone()))
    }

    fn update_account(&mut self, account: &Account) -> Result<(), StateError> {
        debug!("UpdateAccount({})", account.address());
        let addr = *account.address();
        let mut entry = match self.mgr.get(&addr)? {
            Some(entry) => entry,
            None => self.mgr.new_entry(&addr)?,
        };
        entry.set_account(account.clone());
        self.mgr.set(&addr, entry)
    }

    fn remove_account(&mut self, addr: &EvmAddr) -> Result<(), StateError> {
        debug!("RemoveAccount({})", addr);
        self.mgr.del(addr)
    }

    fn create_account(&mut self, creator: &mut Account) -> Result<Account, StateError> {
        let new_address = creator.address().derive(creator.nonce());
        debug!("CreateAccount({}) -> {}", creator.address(), new_address);

        creator.bump_nonce();

        // The derivation hash makes collisions with live accounts an
        // invariant violation, surfaced as AlreadyExists.
        let entry = self.mgr.new_entry(&new_address)?;
        Ok(entry.account().clone())
    }

    fn get_storage(&mut self, addr: &EvmAddr, key: &Word256) -> Result<Word256, StateError> {
        debug!("GetStorage({}, {})", addr, key);
        let entry = self.mgr.must_get(addr)?;

        for pair in entry.storage() {
            if Word256::left_pad(pair.key()) == *key {
                return Ok(Word256::left_pad(pair.value()));
            }
        }

        debug!("Key {} not set for account {}", key, addr);
        Ok(Word256::zero())
    }

    fn set_storage(
        &mut self,
        addr: &EvmAddr,
        key: &Word256,
        value: &Word256,
    ) -> Result<(), StateError> {
        debug!("SetStorage({}, {}, {})", addr, key, value);
        let mut entry = self.mgr.must_get(addr)?;

        let storage = entry.storage_mut();
        match storage
            .iter_mut()
            .find(|pair| Word256::left_pad(pair.key()) == *key)
        {
            Some(pair) => pair.set_value(value.to_vec()),
            None => storage.push(StorageEntry::new(key.to_vec(), value.to_vec())),
        }

        self.mgr.set(addr, entry)
    }

    fn get_block_hash(&mut self, block_num: u64) -> Result<Word256, StateError> {
        match get_block_info(self.mgr.context(), block_num)? {
            Some(info) => match hex::decode(info.header_signature()) {
                Ok(bytes) => Ok(Word256::right_pad(&bytes)),
                Err(err) => {
                    debug!(
                        "Block {} header signature is not valid hex: {}",
                        block_num, err
                    );
                    Ok(Word256::zero())
                }
            },
            None => {
                debug!("Block info for block {} not available", block_num);
                Ok(Word256::zero())
            }
        }
    }
}
