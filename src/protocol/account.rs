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

//! Native types for the account entry stored at each account's state
//! address: the account record and its storage pairs.

use std::error::Error as StdError;

use protobuf::Message;
use protobuf::RepeatedField;

use crate::address::EvmAddr;
use crate::permissions::Permissions;
use crate::protos;
use crate::protos::{
    FromBytes, FromNative, FromProto, IntoBytes, IntoNative, IntoProto, ProtoConversionError,
};

/// Native implementation for EvmStateAccount
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Account {
    address: EvmAddr,
    balance: u64,
    code: Vec<u8>,
    nonce: u64,
    permissions: Permissions,
}

impl Account {
    pub fn address(&self) -> &EvmAddr {
        &self.address
    }

    pub fn balance(&self) -> u64 {
        self.balance
    }

    pub fn code(&self) -> &[u8] {
        &self.code
    }

    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    pub fn permissions(&self) -> &Permissions {
        &self.permissions
    }

    pub fn bump_nonce(&mut self) {
        self.nonce += 1;
    }

    pub fn set_balance(&mut self, balance: u64) {
        self.balance = balance;
    }

    /// Assigns the account's code. Contract code is assigned exactly
    /// once, when the contract is created.
    pub fn set_code(&mut self, code: Vec<u8>) {
        self.code = code;
    }

    pub fn set_permissions(&mut self, permissions: Permissions) {
        self.permissions = permissions;
    }
}

impl FromProto<protos::seth::EvmStateAccount> for Account {
    fn from_proto(mut proto: protos::seth::EvmStateAccount) -> Result<Self, ProtoConversionError> {
        let address = EvmAddr::from_bytes(proto.get_address())
            .map_err(|err| ProtoConversionError::InvalidTypeError(err.to_string()))?;
        let permissions = std::mem::take(&mut proto.permissions)
            .into_option()
            .map(Permissions::from_proto)
            .transpose()?
            .unwrap_or_default();
        Ok(Account {
            address,
            balance: proto.get_balance(),
            code: proto.take_code(),
            nonce: proto.get_nonce(),
            permissions,
        })
    }
}

impl FromNative<Account> for protos::seth::EvmStateAccount {
    fn from_native(native: Account) -> Result<Self, ProtoConversionError> {
        let mut proto = protos::seth::EvmStateAccount::new();
        proto.set_address(native.address().to_vec());
        proto.set_balance(native.balance());
        proto.set_code(native.code().to_vec());
        proto.set_nonce(native.nonce());
        proto.set_permissions((*native.permissions()).into_proto()?);
        Ok(proto)
    }
}

impl FromBytes<Account> for Account {
    fn from_bytes(bytes: &[u8]) -> Result<Account, ProtoConversionError> {
        let proto: protos::seth::EvmStateAccount =
            protobuf::parse_from_bytes(bytes).map_err(|_| {
                ProtoConversionError::SerializationError(
                    "Unable to get EvmStateAccount from bytes".to_string(),
                )
            })?;
        proto.into_native()
    }
}

impl IntoBytes for Account {
    fn into_bytes(self) -> Result<Vec<u8>, ProtoConversionError> {
        let proto: protos::seth::EvmStateAccount = self.into_proto()?;
        let bytes = proto.write_to_bytes().map_err(|_| {
            ProtoConversionError::SerializationError(
                "Unable to get bytes from EvmStateAccount".to_string(),
            )
        })?;
        Ok(bytes)
    }
}

impl IntoProto<protos::seth::EvmStateAccount> for Account {}
impl IntoNative<Account> for protos::seth::EvmStateAccount {}

#[derive(Debug)]
pub enum AccountBuildError {
    MissingField(String),
}

impl StdError for AccountBuildError {}

impl std::fmt::Display for AccountBuildError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match *self {
            AccountBuildError::MissingField(ref s) => write!(f, "'{}' field is required", s),
        }
    }
}

/// Builder used to create an Account
#[derive(Default, Clone)]
pub struct AccountBuilder {
    address: Option<EvmAddr>,
    balance: Option<u64>,
    code: Option<Vec<u8>>,
    nonce: Option<u64>,
    permissions: Option<Permissions>,
}

impl AccountBuilder {
    pub fn new() -> Self {
        AccountBuilder::default()
    }

    pub fn with_address(mut self, address: EvmAddr) -> AccountBuilder {
        self.address = Some(address);
        self
    }

    pub fn with_balance(mut self, balance: u64) -> AccountBuilder {
        self.balance = Some(balance);
        self
    }

    pub fn with_code(mut self, code: Vec<u8>) -> AccountBuilder {
        self.code = Some(code);
        self
    }

    pub fn with_nonce(mut self, nonce: u64) -> AccountBuilder {
        self.nonce = Some(nonce);
        self
    }

    pub fn with_permissions(mut self, permissions: Permissions) -> AccountBuilder {
        self.permissions = Some(permissions);
        self
    }

    pub fn build(self) -> Result<Account, AccountBuildError> {
        let address = self
            .address
            .ok_or_else(|| AccountBuildError::MissingField("address".to_string()))?;
        Ok(Account {
            address,
            balance: self.balance.unwrap_or(0),
            code: self.code.unwrap_or_default(),
            nonce: self.nonce.unwrap_or(0),
            permissions: self.permissions.unwrap_or_default(),
        })
    }
}

/// Native implementation for EvmStorage. Keys are at most 32 bytes and
/// compare equal after left-padding to 32 bytes.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct StorageEntry {
    key: Vec<u8>,
    value: Vec<u8>,
}

impl StorageEntry {
    pub fn new(key: Vec<u8>, value: Vec<u8>) -> Self {
        StorageEntry { key, value }
    }

    pub fn key(&self) -> &[u8] {
        &self.key
    }

    pub fn value(&self) -> &[u8] {
        &self.value
    }

    pub fn set_value(&mut self, value: Vec<u8>) {
        self.value = value;
    }
}

impl FromProto<protos::seth::EvmStorage> for StorageEntry {
    fn from_proto(mut proto: protos::seth::EvmStorage) -> Result<Self, ProtoConversionError> {
        Ok(StorageEntry {
            key: proto.take_key(),
            value: proto.take_value(),
        })
    }
}

impl FromNative<StorageEntry> for protos::seth::EvmStorage {
    fn from_native(native: StorageEntry) -> Result<Self, ProtoConversionError> {
        let mut proto = protos::seth::EvmStorage::new();
        proto.set_key(native.key);
        proto.set_value(native.value);
        Ok(proto)
    }
}

impl IntoProto<protos::seth::EvmStorage> for StorageEntry {}
impl IntoNative<StorageEntry> for protos::seth::EvmStorage {}

/// Native implementation for EvmEntry: the single value stored at an
/// account's state address.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct AccountEntry {
    account: Account,
    storage: Vec<StorageEntry>,
}

impl AccountEntry {
    /// A fresh entry for an account with no history: zero balance, no
    /// code, nonce zero, no governed permissions, empty storage.
    pub fn for_address(address: EvmAddr) -> AccountEntry {
        AccountEntry {
            account: Account {
                address,
                ..Account::default()
            },
            storage: Vec::new(),
        }
    }

    pub fn account(&self) -> &Account {
        &self.account
    }

    pub fn storage(&self) -> &[StorageEntry] {
        &self.storage
    }

    pub fn set_account(&mut self, account: Account) {
        self.account = account;
    }

    pub fn storage_mut(&mut self) -> &mut Vec<StorageEntry> {
        &mut self.storage
    }
}

impl FromProto<protos::seth::EvmEntry> for AccountEntry {
    fn from_proto(mut proto: protos::seth::EvmEntry) -> Result<Self, ProtoConversionError> {
        let account = std::mem::take(&mut proto.account)
            .into_option()
            .map(Account::from_proto)
            .transpose()?
            .ok_or_else(|| {
                ProtoConversionError::InvalidTypeError(
                    "account entry is missing its account record".to_string(),
                )
            })?;
        Ok(AccountEntry {
            account,
            storage: proto
                .take_storage()
                .into_vec()
                .into_iter()
                .map(StorageEntry::from_proto)
                .collect::<Result<Vec<StorageEntry>, ProtoConversionError>>()?,
        })
    }
}

impl FromNative<AccountEntry> for protos::seth::EvmEntry {
    fn from_native(native: AccountEntry) -> Result<Self, ProtoConversionError> {
        let mut proto = protos::seth::EvmEntry::new();
        proto.set_account(native.account.into_proto()?);
        proto.set_storage(RepeatedField::from_vec(
            native
                .storage
                .into_iter()
                .map(StorageEntry::into_proto)
                .collect::<Result<Vec<protos::seth::EvmStorage>, ProtoConversionError>>()?,
        ));
        Ok(proto)
    }
}

impl FromBytes<AccountEntry> for AccountEntry {
    fn from_bytes(bytes: &[u8]) -> Result<AccountEntry, ProtoConversionError> {
        let proto: protos::seth::EvmEntry = protobuf::parse_from_bytes(bytes).map_err(|_| {
            ProtoConversionError::SerializationError(
                "Unable to get EvmEntry from bytes".to_string(),
            )
        })?;
        proto.into_native()
    }
}

impl IntoBytes for AccountEntry {
    fn into_bytes(self) -> Result<Vec<u8>, ProtoConversionError> {
        let proto: protos::seth::EvmEntry = self.into_proto()?;
        let bytes = proto.write_to_bytes().map_err(|_| {
            ProtoConversionError::SerializationError(
                "Unable to get bytes from EvmEntry".to_string(),
            )
        })?;
        Ok(bytes)
    }
}

impl IntoProto<protos::seth::EvmEntry> for AccountEntry {}
impl IntoNative<AccountEntry> for protos::seth::EvmEntry {}

#[derive(Debug)]
pub enum AccountEntryBuildError {
    MissingField(String),
}

impl StdError for AccountEntryBuildError {}

impl std::fmt::Display for AccountEntryBuildError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match *self {
            AccountEntryBuildError::MissingField(ref s) => write!(f, "'{}' field is required", s),
        }
    }
}

/// Builder used to create an AccountEntry
#[derive(Default, Clone)]
pub struct AccountEntryBuilder {
    account: Option<Account>,
    storage: Option<Vec<StorageEntry>>,
}

impl AccountEntryBuilder {
    pub fn new() -> Self {
        AccountEntryBuilder::default()
    }

    pub fn with_account(mut self, account: Account) -> AccountEntryBuilder {
        self.account = Some(account);
        self
    }

    pub fn with_storage(mut self, storage: Vec<StorageEntry>) -> AccountEntryBuilder {
        self.storage = Some(storage);
        self
    }

    pub fn build(self) -> Result<AccountEntry, AccountEntryBuildError> {
        let account = self
            .account
            .ok_or_else(|| AccountEntryBuildError::MissingField("account".to_string()))?;
        Ok(AccountEntry {
            account,
            storage: self.storage.unwrap_or_default(),
        })
    }
}
