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

//! The boundary between the Seth handler and the validator.
//!
//! The handler is stateless and deterministic: everything it reads and
//! writes goes through the `TransactionContext` borrowed for the
//! duration of one `apply` call, and nothing may outlive that call.

mod error;
pub mod seth;

pub use crate::handler::error::{ApplyError, ContextError};
use crate::protocol::transaction::TransactionPair;

/// The slice of the validator context a Seth transaction runs against.
///
/// Each state address holds at most one encoded value: the Seth
/// namespace stores one account entry per EVM address, and the
/// block-info namespace stores the records this family reads but never
/// writes. Receipt data and events are appended to the transaction's
/// execution result and reach subscribers when the block commits.
pub trait TransactionContext {
    /// Reads the value set at a state address, if any.
    ///
    /// # Arguments
    ///
    /// * `address` - the address to fetch
    fn get_state_entry(&self, address: &str) -> Result<Option<Vec<u8>>, ContextError>;

    /// Sets a state address to the given value. Within one transaction
    /// the last write to an address wins.
    ///
    /// # Arguments
    ///
    /// * `address` - address of where to store the data
    /// * `data` - the encoded value to store at the address
    fn set_state_entry(&self, address: String, data: Vec<u8>) -> Result<(), ContextError>;

    /// Unsets a state address, returning the address if it was set.
    /// The Seth handler deletes entries only when the EVM
    /// self-destructs an account.
    ///
    /// # Arguments
    ///
    /// * `address` - the address to delete
    fn delete_state_entry(&self, address: &str) -> Result<Option<String>, ContextError>;

    /// Appends a blob to the execution result for this transaction.
    /// The Seth handler records exactly one encoded receipt per
    /// successful transaction.
    ///
    /// # Arguments
    ///
    /// * `data` - the data to add
    fn add_receipt_data(&self, data: Vec<u8>) -> Result<(), ContextError>;

    /// Appends an event to the execution result for this transaction.
    /// The Seth family emits `seth_log_event` events whose attributes
    /// carry the logging contract's address and topics, and whose data
    /// is the log payload.
    ///
    /// # Arguments
    ///
    /// * `event_type` - used by subscribers to filter events
    /// * `attributes` - key/value pairs transparent to the validator
    /// * `data` - opaque payload carried with the event
    fn add_event(
        &self,
        event_type: String,
        attributes: Vec<(String, String)>,
        data: Vec<u8>,
    ) -> Result<(), ContextError>;
}

pub trait TransactionHandler: Send {
    /// TransactionHandler that defines the business logic for a transaction
    /// family. The family_name, family_versions, and namespaces functions are
    /// used by the processor to route processing requests to the handler.

    /// family_name should return the name of the transaction family that this
    /// handler can process, e.g. "seth"
    fn family_name(&self) -> &str;

    /// family_versions should return a list of versions this transaction
    /// family handler can process, e.g. ["1.0"]
    fn family_versions(&self) -> &[String];

    /// namespaces should return a list of state-address prefixes this
    /// handler expects to read from and write to
    fn namespaces(&self) -> &[String];

    /// Apply is the single method where all the business logic for a
    /// transaction family is defined. The method will be called by the
    /// transaction processor upon receiving a transaction that the handler
    /// understands, along with an initialized context.
    fn apply(
        &self,
        transaction: &TransactionPair,
        context: &mut dyn TransactionContext,
    ) -> Result<(), ApplyError>;
}
