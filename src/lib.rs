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

//! The transaction processor core for the Seth transaction family:
//! a deterministic state-transition function that applies
//! Ethereum-style transactions against a Sawtooth validator's state
//! store. The EVM interpreter itself is supplied by the embedder
//! through the `vm::Evm` trait.

pub mod address;
pub mod handler;
pub mod permissions;
pub mod protocol;
#[allow(renamed_and_removed_lints)]
pub mod protos;
pub mod state;
#[cfg(test)]
mod testing;
pub mod vm;

#[macro_use]
extern crate log;
