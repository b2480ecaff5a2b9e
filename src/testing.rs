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

//! A HashMap-backed TransactionContext used by the tests in this crate.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::handler::{ContextError, TransactionContext};

#[derive(Debug, Clone, PartialEq)]
pub struct TestEvent {
    pub event_type: String,
    pub attributes: Vec<(String, String)>,
    pub data: Vec<u8>,
}

/// Simple context backed by a HashMap, which also records the events
/// and receipt data added during a transaction. Optionally enforces
/// namespace authorization the way the validator enforces a
/// transaction's declared inputs and outputs.
pub struct TestContext {
    state: Mutex<HashMap<String, Vec<u8>>>,
    events: Mutex<Vec<TestEvent>>,
    receipt_data: Mutex<Vec<Vec<u8>>>,
    allowed_namespaces: Option<Vec<String>>,
}

impl TestContext {
    pub fn new() -> Self {
        TestContext {
            state: Mutex::new(HashMap::new()),
            events: Mutex::new(Vec::new()),
            receipt_data: Mutex::new(Vec::new()),
            allowed_namespaces: None,
        }
    }

    /// A context that authorizes state access only under the given
    /// namespace prefixes.
    pub fn restricted_to(namespaces: &[&str]) -> Self {
        TestContext {
            allowed_namespaces: Some(namespaces.iter().map(|ns| ns.to_string()).collect()),
            ..TestContext::new()
        }
    }

    /// Pre-populates an address, the way another transaction family
    /// would have.
    pub fn seed(&self, address: String, data: Vec<u8>) {
        self.state
            .lock()
            .expect("Test lock was poisoned in seed method")
            .insert(address, data);
    }

    /// Snapshot of all state entries, for before/after comparisons.
    pub fn entries(&self) -> HashMap<String, Vec<u8>> {
        self.state
            .lock()
            .expect("Test lock was poisoned in entries method")
            .clone()
    }

    pub fn events(&self) -> Vec<TestEvent> {
        self.events
            .lock()
            .expect("Test lock was poisoned in events method")
            .clone()
    }

    pub fn receipt_data(&self) -> Vec<Vec<u8>> {
        self.receipt_data
            .lock()
            .expect("Test lock was poisoned in receipt_data method")
            .clone()
    }

    fn check_authorized(&self, address: &str) -> Result<(), ContextError> {
        match &self.allowed_namespaces {
            Some(namespaces) if !namespaces.iter().any(|ns| address.starts_with(ns.as_str())) => {
                Err(ContextError::AuthorizationError(address.to_string()))
            }
            _ => Ok(()),
        }
    }
}

impl TransactionContext for TestContext {
    fn get_state_entry(&self, address: &str) -> Result<Option<Vec<u8>>, ContextError> {
        self.check_authorized(address)?;
        Ok(self
            .state
            .lock()
            .expect("Test lock was poisoned in get method")
            .get(address)
            .map(|value| value.to_vec()))
    }

    fn set_state_entry(&self, address: String, data: Vec<u8>) -> Result<(), ContextError> {
        self.check_authorized(&address)?;
        self.state
            .lock()
            .expect("Test lock was poisoned in set method")
            .insert(address, data);
        Ok(())
    }

    fn delete_state_entry(&self, address: &str) -> Result<Option<String>, ContextError> {
        self.check_authorized(address)?;
        Ok(self
            .state
            .lock()
            .expect("Test lock was poisoned in delete method")
            .remove(address)
            .map(|_| address.to_string()))
    }

    fn add_receipt_data(&self, data: Vec<u8>) -> Result<(), ContextError> {
        self.receipt_data
            .lock()
            .expect("Test lock was poisoned in add_receipt_data method")
            .push(data);
        Ok(())
    }

    fn add_event(
        &self,
        event_type: String,
        attributes: Vec<(String, String)>,
        data: Vec<u8>,
    ) -> Result<(), ContextError> {
        self.events
            .lock()
            .expect("Test lock was poisoned in add_event method")
            .push(TestEvent {
                event_type,
                attributes,
                data,
            });
        Ok(())
    }
}
