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

//! The boundary between the state store and the embedded EVM.
//!
//! The EVM interpreter itself is an external library; it consumes the
//! `AppState` and `EventSink` capability traits defined here and is
//! invoked through the `Evm` trait. `SawtoothAppState` implements
//! `AppState` against the validator context.

mod app_state;
mod events;

pub use crate::vm::app_state::SawtoothAppState;
pub use crate::vm::events::SawtoothEventSink;

use std::error::Error as StdError;
use std::fmt;

use crate::address::EvmAddr;
use crate::handler::ContextError;
use crate::protocol::account::Account;
use crate::state::StateError;

/// Number of bytes in an EVM word.
pub const WORD256_LENGTH: usize = 32;

/// A 256-bit EVM word, big-endian. Storage keys and values
/// canonicalize to this form before any comparison.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Word256([u8; WORD256_LENGTH]);

impl Word256 {
    pub fn new(bytes: [u8; WORD256_LENGTH]) -> Self {
        Word256(bytes)
    }

    pub fn zero() -> Self {
        Word256::default()
    }

    /// Canonicalizes a big-endian byte string into a word. Shorter
    /// input is padded on the left; longer input keeps its trailing 32
    /// bytes.
    pub fn left_pad(bytes: &[u8]) -> Word256 {
        let mut word = [0u8; WORD256_LENGTH];
        if bytes.len() >= WORD256_LENGTH {
            word.copy_from_slice(&bytes[bytes.len() - WORD256_LENGTH..]);
        } else {
            word[WORD256_LENGTH - bytes.len()..].copy_from_slice(bytes);
        }
        Word256(word)
    }

    /// Pads a byte string on the right. Longer input keeps its leading
    /// 32 bytes. Used for words built from hash strings.
    pub fn right_pad(bytes: &[u8]) -> Word256 {
        let mut word = [0u8; WORD256_LENGTH];
        if bytes.len() >= WORD256_LENGTH {
            word.copy_from_slice(&bytes[..WORD256_LENGTH]);
        } else {
            word[..bytes.len()].copy_from_slice(bytes);
        }
        Word256(word)
    }

    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|b| *b == 0)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn to_vec(&self) -> Vec<u8> {
        self.0.to_vec()
    }
}

impl From<[u8; WORD256_LENGTH]> for Word256 {
    fn from(bytes: [u8; WORD256_LENGTH]) -> Self {
        Word256(bytes)
    }
}

impl fmt::Display for Word256 {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", hex::encode(&self.0[..]))
    }
}

impl fmt::Debug for Word256 {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Word256({})", hex::encode(&self.0[..]))
    }
}

/// Execution parameters handed to the EVM on every call. Zero values
/// are used when block info is unavailable.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ExecParams {
    pub block_height: u64,
    pub block_hash: Word256,
    pub block_time: u64,
    pub gas_limit: u64,
}

/// A LOG instruction observed during execution.
#[derive(Debug, Clone, PartialEq)]
pub struct LogEvent {
    address: EvmAddr,
    topics: Vec<Word256>,
    data: Vec<u8>,
}

impl LogEvent {
    pub fn new(address: EvmAddr, topics: Vec<Word256>, data: Vec<u8>) -> Self {
        LogEvent {
            address,
            topics,
            data,
        }
    }

    pub fn address(&self) -> &EvmAddr {
        &self.address
    }

    pub fn topics(&self) -> &[Word256] {
        &self.topics
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

#[derive(Debug)]
pub enum VmError {
    /// The state store failed underneath the EVM.
    State(StateError),
    /// The EVM reported an execution failure.
    Execution(String),
}

impl StdError for VmError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            VmError::State(err) => Some(err),
            VmError::Execution(_) => None,
        }
    }
}

impl fmt::Display for VmError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            VmError::State(ref err) => write!(f, "state error: {}", err),
            VmError::Execution(ref s) => write!(f, "{}", s),
        }
    }
}

impl From<StateError> for VmError {
    fn from(err: StateError) -> Self {
        VmError::State(err)
    }
}

/// The callback surface the EVM consumes to read and write accounts
/// and storage. Errors cross this boundary as results, never panics.
pub trait AppState {
    /// Retrieves the account with the given address, or `None` if it
    /// does not exist.
    fn get_account(&mut self, addr: &EvmAddr) -> Result<Option<Account>, StateError>;

    /// Writes the account record to state, creating the account if it
    /// does not exist yet.
    fn update_account(&mut self, account: &Account) -> Result<(), StateError>;

    /// Removes the account and its storage from state. Fails if the
    /// account does not exist.
    fn remove_account(&mut self, addr: &EvmAddr) -> Result<(), StateError>;

    /// Creates a contract account at the address derived from the
    /// creator's address and nonce, incrementing the creator's nonce in
    /// memory. A collision with an existing account is an error.
    fn create_account(&mut self, creator: &mut Account) -> Result<Account, StateError>;

    /// Gets the word stored under the given key, or zero if the key is
    /// not set.
    fn get_storage(&mut self, addr: &EvmAddr, key: &Word256) -> Result<Word256, StateError>;

    /// Stores a word under the given key, overwriting in place if the
    /// key is already set.
    fn set_storage(
        &mut self,
        addr: &EvmAddr,
        key: &Word256,
        value: &Word256,
    ) -> Result<(), StateError>;

    /// Returns the hash of the given block, or zero if block info is
    /// unavailable.
    fn get_block_hash(&mut self, block_num: u64) -> Result<Word256, StateError>;
}

/// Receives the events the EVM fires during execution. Call traces are
/// not part of this surface; only LOG instructions are persisted.
pub trait EventSink {
    fn log(&mut self, log: LogEvent) -> Result<(), ContextError>;
}

/// The embedded EVM interpreter. Implementations execute `code` with
/// `input` against the supplied state, metering gas against `gas`,
/// which is decremented in place.
pub trait Evm: Send {
    #[allow(clippy::too_many_arguments)]
    fn call(
        &self,
        state: &mut dyn AppState,
        events: &mut dyn EventSink,
        params: &ExecParams,
        sender: &Account,
        receiver: &Account,
        code: &[u8],
        input: &[u8],
        gas: &mut u64,
    ) -> Result<Vec<u8>, VmError>;
}
