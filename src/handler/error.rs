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
use std::error::Error;

/// The two-way classification every Seth failure resolves to: a
/// deterministic rejection of the transaction, or a fault in the
/// processor's own machinery that the validator may retry.
#[derive(Debug)]
pub enum ApplyError {
    /// Returned for an Invalid Transaction.
    InvalidTransaction(String),
    /// Returned when an internal error occurs during transaction processing.
    InternalError(String),
}

impl Error for ApplyError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        None
    }
}

impl std::fmt::Display for ApplyError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match *self {
            ApplyError::InvalidTransaction(ref s) => write!(f, "InvalidTransaction: {}", s),
            ApplyError::InternalError(ref s) => write!(f, "InternalError: {}", s),
        }
    }
}

/// Failures the validator context surfaces while a Seth transaction is
/// being applied. Account state reads and writes hit the first two;
/// receipt and event recording hit the third.
#[derive(Debug)]
pub enum ContextError {
    /// The state address is outside the namespaces this transaction
    /// declared as inputs or outputs.
    AuthorizationError(String),
    /// The validator could not be reached, or dropped the request
    /// mid-transaction.
    ConnectionError(String),
    /// The receipt data or event could not be appended to the
    /// transaction's execution result.
    ReceiptError(String),
}

impl Error for ContextError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        None
    }
}

impl std::fmt::Display for ContextError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match *self {
            ContextError::AuthorizationError(ref s) => {
                write!(f, "address not authorized: {}", s)
            }
            ContextError::ConnectionError(ref s) => {
                write!(f, "validator connection error: {}", s)
            }
            ContextError::ReceiptError(ref s) => {
                write!(f, "unable to record execution result: {}", s)
            }
        }
    }
}
