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

//! Native protocol for the Seth transaction payload: a tagged union
//! over the four transaction types.

use std::error::Error as StdError;

use protobuf::Message;

use crate::permissions::Permissions;
use crate::protos;
use crate::protos::{
    FromBytes, FromNative, FromProto, IntoBytes, IntoNative, IntoProto, ProtoConversionError,
};

/// Native implementation for SethTransaction
#[derive(Debug, Clone, PartialEq)]
pub enum SethTransaction {
    CreateExternalAccount(CreateExternalAccountTxn),
    MessageCall(MessageCallTxn),
    CreateContractAccount(CreateContractAccountTxn),
    SetPermissions(SetPermissionsTxn),
}

impl std::fmt::Display for SethTransaction {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match *self {
            SethTransaction::CreateExternalAccount(_) => write!(f, "CreateExternalAccount"),
            SethTransaction::MessageCall(_) => write!(f, "MessageCall"),
            SethTransaction::CreateContractAccount(_) => write!(f, "CreateContractAccount"),
            SethTransaction::SetPermissions(_) => write!(f, "SetPermissions"),
        }
    }
}

impl From<CreateExternalAccountTxn> for SethTransaction {
    fn from(txn: CreateExternalAccountTxn) -> Self {
        SethTransaction::CreateExternalAccount(txn)
    }
}

impl From<MessageCallTxn> for SethTransaction {
    fn from(txn: MessageCallTxn) -> Self {
        SethTransaction::MessageCall(txn)
    }
}

impl From<CreateContractAccountTxn> for SethTransaction {
    fn from(txn: CreateContractAccountTxn) -> Self {
        SethTransaction::CreateContractAccount(txn)
    }
}

impl From<SetPermissionsTxn> for SethTransaction {
    fn from(txn: SetPermissionsTxn) -> Self {
        SethTransaction::SetPermissions(txn)
    }
}

impl FromProto<protos::seth::SethTransaction> for SethTransaction {
    fn from_proto(mut proto: protos::seth::SethTransaction) -> Result<Self, ProtoConversionError> {
        match proto.get_transaction_type() {
            protos::seth::SethTransaction_TransactionType::CREATE_EXTERNAL_ACCOUNT => {
                Ok(SethTransaction::CreateExternalAccount(
                    CreateExternalAccountTxn::from_proto(proto.take_create_external_account())?,
                ))
            }
            protos::seth::SethTransaction_TransactionType::MESSAGE_CALL => Ok(
                SethTransaction::MessageCall(MessageCallTxn::from_proto(proto.take_message_call())?),
            ),
            protos::seth::SethTransaction_TransactionType::CREATE_CONTRACT_ACCOUNT => {
                Ok(SethTransaction::CreateContractAccount(
                    CreateContractAccountTxn::from_proto(proto.take_create_contract_account())?,
                ))
            }
            protos::seth::SethTransaction_TransactionType::SET_PERMISSIONS => {
                Ok(SethTransaction::SetPermissions(SetPermissionsTxn::from_proto(
                    proto.take_set_permissions(),
                )?))
            }
            protos::seth::SethTransaction_TransactionType::TRANSACTION_TYPE_UNSET => {
                Err(ProtoConversionError::InvalidTypeError(
                    "Cannot convert SethTransaction with type unset.".to_string(),
                ))
            }
        }
    }
}

impl FromNative<SethTransaction> for protos::seth::SethTransaction {
    fn from_native(native: SethTransaction) -> Result<Self, ProtoConversionError> {
        let mut proto = protos::seth::SethTransaction::new();
        match native {
            SethTransaction::CreateExternalAccount(txn) => {
                proto.set_transaction_type(
                    protos::seth::SethTransaction_TransactionType::CREATE_EXTERNAL_ACCOUNT,
                );
                proto.set_create_external_account(txn.into_proto()?);
            }
            SethTransaction::MessageCall(txn) => {
                proto.set_transaction_type(
                    protos::seth::SethTransaction_TransactionType::MESSAGE_CALL,
                );
                proto.set_message_call(txn.into_proto()?);
            }
            SethTransaction::CreateContractAccount(txn) => {
                proto.set_transaction_type(
                    protos::seth::SethTransaction_TransactionType::CREATE_CONTRACT_ACCOUNT,
                );
                proto.set_create_contract_account(txn.into_proto()?);
            }
            SethTransaction::SetPermissions(txn) => {
                proto.set_transaction_type(
                    protos::seth::SethTransaction_TransactionType::SET_PERMISSIONS,
                );
                proto.set_set_permissions(txn.into_proto()?);
            }
        }
        Ok(proto)
    }
}

impl FromBytes<SethTransaction> for SethTransaction {
    fn from_bytes(bytes: &[u8]) -> Result<SethTransaction, ProtoConversionError> {
        let proto: protos::seth::SethTransaction =
            protobuf::parse_from_bytes(bytes).map_err(|_| {
                ProtoConversionError::SerializationError(
                    "Unable to get SethTransaction from bytes".to_string(),
                )
            })?;
        proto.into_native()
    }
}

impl IntoBytes for SethTransaction {
    fn into_bytes(self) -> Result<Vec<u8>, ProtoConversionError> {
        let proto: protos::seth::SethTransaction = self.into_proto()?;
        let bytes = proto.write_to_bytes().map_err(|_| {
            ProtoConversionError::SerializationError(
                "Unable to get bytes from SethTransaction".to_string(),
            )
        })?;
        Ok(bytes)
    }
}

impl IntoProto<protos::seth::SethTransaction> for SethTransaction {}
impl IntoNative<SethTransaction> for protos::seth::SethTransaction {}

#[derive(Debug)]
pub enum PayloadBuildError {
    MissingField(String),
}

impl StdError for PayloadBuildError {}

impl std::fmt::Display for PayloadBuildError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match *self {
            PayloadBuildError::MissingField(ref s) => write!(f, "'{}' field is required", s),
        }
    }
}

/// Native implementation for CreateExternalAccountTxn. When `to` is
/// unset, the transaction bootstraps the sender's own account.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct CreateExternalAccountTxn {
    nonce: u64,
    to: Option<Vec<u8>>,
    permissions: Option<Permissions>,
}

impl CreateExternalAccountTxn {
    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    pub fn to(&self) -> Option<&[u8]> {
        self.to.as_deref()
    }

    pub fn permissions(&self) -> Option<&Permissions> {
        self.permissions.as_ref()
    }
}

impl FromProto<protos::seth::CreateExternalAccountTxn> for CreateExternalAccountTxn {
    fn from_proto(
        mut proto: protos::seth::CreateExternalAccountTxn,
    ) -> Result<Self, ProtoConversionError> {
        let to = proto.take_to();
        let to = if to.is_empty() { None } else { Some(to) };
        Ok(CreateExternalAccountTxn {
            nonce: proto.get_nonce(),
            to,
            permissions: proto
                .permissions
                .into_option()
                .map(Permissions::from_proto)
                .transpose()?,
        })
    }
}

impl FromNative<CreateExternalAccountTxn> for protos::seth::CreateExternalAccountTxn {
    fn from_native(native: CreateExternalAccountTxn) -> Result<Self, ProtoConversionError> {
        let mut proto = protos::seth::CreateExternalAccountTxn::new();
        proto.set_nonce(native.nonce);
        if let Some(to) = native.to {
            proto.set_to(to);
        }
        if let Some(permissions) = native.permissions {
            proto.set_permissions(permissions.into_proto()?);
        }
        Ok(proto)
    }
}

impl IntoProto<protos::seth::CreateExternalAccountTxn> for CreateExternalAccountTxn {}
impl IntoNative<CreateExternalAccountTxn> for protos::seth::CreateExternalAccountTxn {}

/// Builder used to create a CreateExternalAccountTxn
#[derive(Default, Clone)]
pub struct CreateExternalAccountTxnBuilder {
    nonce: Option<u64>,
    to: Option<Vec<u8>>,
    permissions: Option<Permissions>,
}

impl CreateExternalAccountTxnBuilder {
    pub fn new() -> Self {
        CreateExternalAccountTxnBuilder::default()
    }

    pub fn with_nonce(mut self, nonce: u64) -> CreateExternalAccountTxnBuilder {
        self.nonce = Some(nonce);
        self
    }

    pub fn with_to(mut self, to: Vec<u8>) -> CreateExternalAccountTxnBuilder {
        self.to = Some(to);
        self
    }

    pub fn with_permissions(mut self, permissions: Permissions) -> CreateExternalAccountTxnBuilder {
        self.permissions = Some(permissions);
        self
    }

    pub fn build(self) -> Result<CreateExternalAccountTxn, PayloadBuildError> {
        let nonce = self
            .nonce
            .ok_or_else(|| PayloadBuildError::MissingField("nonce".to_string()))?;
        Ok(CreateExternalAccountTxn {
            nonce,
            to: self.to,
            permissions: self.permissions,
        })
    }
}

/// Native implementation for MessageCallTxn
#[derive(Debug, Default, Clone, PartialEq)]
pub struct MessageCallTxn {
    nonce: u64,
    gas_limit: u64,
    to: Vec<u8>,
    data: Vec<u8>,
}

impl MessageCallTxn {
    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    pub fn gas_limit(&self) -> u64 {
        self.gas_limit
    }

    pub fn to(&self) -> &[u8] {
        &self.to
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

impl FromProto<protos::seth::MessageCallTxn> for MessageCallTxn {
    fn from_proto(mut proto: protos::seth::MessageCallTxn) -> Result<Self, ProtoConversionError> {
        Ok(MessageCallTxn {
            nonce: proto.get_nonce(),
            gas_limit: proto.get_gas_limit(),
            to: proto.take_to(),
            data: proto.take_data(),
        })
    }
}

impl FromNative<MessageCallTxn> for protos::seth::MessageCallTxn {
    fn from_native(native: MessageCallTxn) -> Result<Self, ProtoConversionError> {
        let mut proto = protos::seth::MessageCallTxn::new();
        proto.set_nonce(native.nonce);
        proto.set_gas_limit(native.gas_limit);
        proto.set_to(native.to);
        proto.set_data(native.data);
        Ok(proto)
    }
}

impl IntoProto<protos::seth::MessageCallTxn> for MessageCallTxn {}
impl IntoNative<MessageCallTxn> for protos::seth::MessageCallTxn {}

/// Builder used to create a MessageCallTxn
#[derive(Default, Clone)]
pub struct MessageCallTxnBuilder {
    nonce: Option<u64>,
    gas_limit: Option<u64>,
    to: Option<Vec<u8>>,
    data: Option<Vec<u8>>,
}

impl MessageCallTxnBuilder {
    pub fn new() -> Self {
        MessageCallTxnBuilder::default()
    }

    pub fn with_nonce(mut self, nonce: u64) -> MessageCallTxnBuilder {
        self.nonce = Some(nonce);
        self
    }

    pub fn with_gas_limit(mut self, gas_limit: u64) -> MessageCallTxnBuilder {
        self.gas_limit = Some(gas_limit);
        self
    }

    pub fn with_to(mut self, to: Vec<u8>) -> MessageCallTxnBuilder {
        self.to = Some(to);
        self
    }

    pub fn with_data(mut self, data: Vec<u8>) -> MessageCallTxnBuilder {
        self.data = Some(data);
        self
    }

    pub fn build(self) -> Result<MessageCallTxn, PayloadBuildError> {
        let nonce = self
            .nonce
            .ok_or_else(|| PayloadBuildError::MissingField("nonce".to_string()))?;
        let gas_limit = self
            .gas_limit
            .ok_or_else(|| PayloadBuildError::MissingField("gas_limit".to_string()))?;
        let to = self
            .to
            .ok_or_else(|| PayloadBuildError::MissingField("to".to_string()))?;
        Ok(MessageCallTxn {
            nonce,
            gas_limit,
            to,
            data: self.data.unwrap_or_default(),
        })
    }
}

/// Native implementation for CreateContractAccountTxn
#[derive(Debug, Default, Clone, PartialEq)]
pub struct CreateContractAccountTxn {
    nonce: u64,
    gas_limit: u64,
    init: Vec<u8>,
    permissions: Option<Permissions>,
}

impl CreateContractAccountTxn {
    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    pub fn gas_limit(&self) -> u64 {
        self.gas_limit
    }

    pub fn init(&self) -> &[u8] {
        &self.init
    }

    pub fn permissions(&self) -> Option<&Permissions> {
        self.permissions.as_ref()
    }
}

impl FromProto<protos::seth::CreateContractAccountTxn> for CreateContractAccountTxn {
    fn from_proto(
        mut proto: protos::seth::CreateContractAccountTxn,
    ) -> Result<Self, ProtoConversionError> {
        Ok(CreateContractAccountTxn {
            nonce: proto.get_nonce(),
            gas_limit: proto.get_gas_limit(),
            init: proto.take_init(),
            permissions: proto
                .permissions
                .into_option()
                .map(Permissions::from_proto)
                .transpose()?,
        })
    }
}

impl FromNative<CreateContractAccountTxn> for protos::seth::CreateContractAccountTxn {
    fn from_native(native: CreateContractAccountTxn) -> Result<Self, ProtoConversionError> {
        let mut proto = protos::seth::CreateContractAccountTxn::new();
        proto.set_nonce(native.nonce);
        proto.set_gas_limit(native.gas_limit);
        proto.set_init(native.init);
        if let Some(permissions) = native.permissions {
            proto.set_permissions(permissions.into_proto()?);
        }
        Ok(proto)
    }
}

impl IntoProto<protos::seth::CreateContractAccountTxn> for CreateContractAccountTxn {}
impl IntoNative<CreateContractAccountTxn> for protos::seth::CreateContractAccountTxn {}

/// Builder used to create a CreateContractAccountTxn
#[derive(Default, Clone)]
pub struct CreateContractAccountTxnBuilder {
    nonce: Option<u64>,
    gas_limit: Option<u64>,
    init: Option<Vec<u8>>,
    permissions: Option<Permissions>,
}

impl CreateContractAccountTxnBuilder {
    pub fn new() -> Self {
        CreateContractAccountTxnBuilder::default()
    }

    pub fn with_nonce(mut self, nonce: u64) -> CreateContractAccountTxnBuilder {
        self.nonce = Some(nonce);
        self
    }

    pub fn with_gas_limit(mut self, gas_limit: u64) -> CreateContractAccountTxnBuilder {
        self.gas_limit = Some(gas_limit);
        self
    }

    pub fn with_init(mut self, init: Vec<u8>) -> CreateContractAccountTxnBuilder {
        self.init = Some(init);
        self
    }

    pub fn with_permissions(
        mut self,
        permissions: Permissions,
    ) -> CreateContractAccountTxnBuilder {
        self.permissions = Some(permissions);
        self
    }

    pub fn build(self) -> Result<CreateContractAccountTxn, PayloadBuildError> {
        let nonce = self
            .nonce
            .ok_or_else(|| PayloadBuildError::MissingField("nonce".to_string()))?;
        let gas_limit = self
            .gas_limit
            .ok_or_else(|| PayloadBuildError::MissingField("gas_limit".to_string()))?;
        Ok(CreateContractAccountTxn {
            nonce,
            gas_limit,
            init: self.init.unwrap_or_default(),
            permissions: self.permissions,
        })
    }
}

/// Native implementation for SetPermissionsTxn
#[derive(Debug, Default, Clone, PartialEq)]
pub struct SetPermissionsTxn {
    nonce: u64,
    to: Vec<u8>,
    permissions: Option<Permissions>,
}

impl SetPermissionsTxn {
    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    pub fn to(&self) -> &[u8] {
        &self.to
    }

    pub fn permissions(&self) -> Option<&Permissions> {
        self.permissions.as_ref()
    }
}

impl FromProto<protos::seth::SetPermissionsTxn> for SetPermissionsTxn {
    fn from_proto(
        mut proto: protos::seth::SetPermissionsTxn,
    ) -> Result<Self, ProtoConversionError> {
        Ok(SetPermissionsTxn {
            nonce: proto.get_nonce(),
            to: proto.take_to(),
            permissions: proto
                .permissions
                .into_option()
                .map(Permissions::from_proto)
                .transpose()?,
        })
    }
}

impl FromNative<SetPermissionsTxn> for protos::seth::SetPermissionsTxn {
    fn from_native(native: SetPermissionsTxn) -> Result<Self, ProtoConversionError> {
        let mut proto = protos::seth::SetPermissionsTxn::new();
        proto.set_nonce(native.nonce);
        proto.set_to(native.to);
        if let Some(permissions) = native.permissions {
            proto.set_permissions(permissions.into_proto()?);
        }
        Ok(proto)
    }
}

impl IntoProto<protos::seth::SetPermissionsTxn> for SetPermissionsTxn {}
impl IntoNative<SetPermissionsTxn> for protos::seth::SetPermissionsTxn {}

/// Builder used to create a SetPermissionsTxn
#[derive(Default, Clone)]
pub struct SetPermissionsTxnBuilder {
    nonce: Option<u64>,
    to: Option<Vec<u8>>,
    permissions: Option<Permissions>,
}

impl SetPermissionsTxnBuilder {
    pub fn new() -> Self {
        SetPermissionsTxnBuilder::default()
    }

    pub fn with_nonce(mut self, nonce: u64) -> SetPermissionsTxnBuilder {
        self.nonce = Some(nonce);
        self
    }

    pub fn with_to(mut self, to: Vec<u8>) -> SetPermissionsTxnBuilder {
        self.to = Some(to);
        self
    }

    pub fn with_permissions(mut self, permissions: Permissions) -> SetPermissionsTxnBuilder {
        self.permissions = Some(permissions);
        self
    }

    pub fn build(self) -> Result<SetPermissionsTxn, PayloadBuildError> {
        let nonce = self
            .nonce
            .ok_or_else(|| PayloadBuildError::MissingField("nonce".to_string()))?;
        let to = self
            .to
            .ok_or_else(|| PayloadBuildError::MissingField("to".to_string()))?;
        let permissions = self
            .permissions
            .ok_or_else(|| PayloadBuildError::MissingField("permissions".to_string()))?;
        Ok(SetPermissionsTxn {
            nonce,
            to,
            permissions: Some(permissions),
        })
    }
}
