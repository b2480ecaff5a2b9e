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

//! Conversion between 20-byte EVM addresses and the 35-byte addresses
//! used by the validator's state store, along with the derivation rules
//! for contract addresses and the addresses of the block-info family.

use std::error::Error as StdError;
use std::fmt;

use rlp::RlpStream;
use sha2::{Digest as Sha2Digest, Sha512};
use sha3::{Digest, Keccak256};

pub const FAMILY_NAME: &str = "seth";
pub const FAMILY_VERSION: &str = "1.0";

/// Gas ceiling handed to the EVM as the block gas limit. Gas is metered
/// against this but never charged.
pub const GAS_LIMIT: u64 = 1 << 31;

/// Number of bytes in an EVM address.
pub const ADDRESS_LENGTH: usize = 20;

/// Number of hex characters in a state address.
pub const STATE_ADDRESS_LENGTH: usize = 70;

/// Namespace of the block-info transaction family, consumed read-only.
pub const BLOCK_INFO_NAMESPACE: &str = "00b10c";

/// The account whose permission bits answer any check that the queried
/// account does not govern locally.
pub const GLOBAL_PERMISSIONS_ADDRESS: EvmAddr = EvmAddr([0x00; ADDRESS_LENGTH]);

#[derive(Debug)]
pub enum AddressError {
    MalformedAddress(String),
}

impl StdError for AddressError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        None
    }
}

impl fmt::Display for AddressError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            AddressError::MalformedAddress(ref s) => write!(f, "malformed address: {}", s),
        }
    }
}

/// Returns the six-character namespace prefix of the Seth family.
pub fn prefix() -> String {
    let mut sha = Sha512::new();
    sha.input(FAMILY_NAME.as_bytes());
    hex::encode(sha.result().to_vec())[..6].to_string()
}

/// Address of the block-info config record.
pub fn block_info_config_address() -> String {
    format!("{}01{}", BLOCK_INFO_NAMESPACE, "0".repeat(62))
}

/// Address of the block-info record for the given block number.
pub fn block_info_address(block_num: u64) -> String {
    format!("{}00{:062x}", BLOCK_INFO_NAMESPACE, block_num)
}

/// A 20-byte EVM account address.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EvmAddr([u8; ADDRESS_LENGTH]);

impl EvmAddr {
    /// Constructs an address from raw bytes. Inputs shorter than 20
    /// bytes are left-padded with zeros; longer inputs are rejected.
    pub fn from_bytes(bytes: &[u8]) -> Result<EvmAddr, AddressError> {
        if bytes.len() > ADDRESS_LENGTH {
            return Err(AddressError::MalformedAddress(format!(
                "expected at most {} bytes, got {}",
                ADDRESS_LENGTH,
                bytes.len()
            )));
        }
        let mut addr = [0u8; ADDRESS_LENGTH];
        addr[ADDRESS_LENGTH - bytes.len()..].copy_from_slice(bytes);
        Ok(EvmAddr(addr))
    }

    /// Constructs an address from a 40-character hex string.
    pub fn from_hex(s: &str) -> Result<EvmAddr, AddressError> {
        let bytes = hex::decode(s)
            .map_err(|err| AddressError::MalformedAddress(format!("{}: {}", s, err)))?;
        EvmAddr::from_bytes(&bytes)
    }

    /// Computes the address controlled by the given public key: the last
    /// 20 bytes of the key's Keccak-256 digest.
    pub fn from_public_key(public_key: &[u8]) -> EvmAddr {
        let mut hasher = Keccak256::new();
        hasher.input(public_key);
        let hash = hasher.result();
        let mut addr = [0u8; ADDRESS_LENGTH];
        addr.copy_from_slice(&hash[hash.len() - ADDRESS_LENGTH..]);
        EvmAddr(addr)
    }

    /// Derives the address of a contract created by this account at the
    /// given nonce: the last 20 bytes of `KECCAK256(RLP([addr, nonce]))`.
    pub fn derive(&self, nonce: u64) -> EvmAddr {
        let mut stream = RlpStream::new_list(2);
        stream.append(&self.0.to_vec());
        stream.append(&nonce);
        let mut hasher = Keccak256::new();
        hasher.input(&stream.out());
        let hash = hasher.result();
        let mut addr = [0u8; ADDRESS_LENGTH];
        addr.copy_from_slice(&hash[hash.len() - ADDRESS_LENGTH..]);
        EvmAddr(addr)
    }

    /// Returns the 70-character state address this account is stored at.
    pub fn to_state_address(&self) -> String {
        format!("{}{}{}", prefix(), hex::encode(&self.0[..]), "0".repeat(24))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn to_vec(&self) -> Vec<u8> {
        self.0.to_vec()
    }
}

impl fmt::Display for EvmAddr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", hex::encode(&self.0[..]))
    }
}

impl fmt::Debug for EvmAddr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "EvmAddr({})", hex::encode(&self.0[..]))
    }
}
