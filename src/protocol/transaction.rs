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

//! The validator's transaction envelope, in native form. The processor
//! receives transactions already signed and verified; only the header
//! fields are consumed here.

use std::error::Error as StdError;

use protobuf::Message;
use protobuf::RepeatedField;
use sha2::{Digest, Sha512};

use crate::protos;
use crate::protos::{
    FromBytes, FromNative, FromProto, IntoBytes, IntoNative, IntoProto, ProtoConversionError,
};

impl From<hex::FromHexError> for ProtoConversionError {
    fn from(e: hex::FromHexError) -> Self {
        ProtoConversionError::SerializationError(format!("{}", e))
    }
}

/// Native implementation for TransactionHeader
#[derive(Debug, Default, Clone, PartialEq)]
pub struct TransactionHeader {
    batcher_public_key: Vec<u8>,
    dependencies: Vec<String>,
    family_name: String,
    family_version: String,
    inputs: Vec<String>,
    nonce: String,
    outputs: Vec<String>,
    payload_sha512: String,
    signer_public_key: Vec<u8>,
}

impl TransactionHeader {
    pub fn batcher_public_key(&self) -> &[u8] {
        &self.batcher_public_key
    }

    pub fn dependencies(&self) -> &[String] {
        &self.dependencies
    }

    pub fn family_name(&self) -> &str {
        &self.family_name
    }

    pub fn family_version(&self) -> &str {
        &self.family_version
    }

    pub fn inputs(&self) -> &[String] {
        &self.inputs
    }

    pub fn nonce(&self) -> &str {
        &self.nonce
    }

    pub fn outputs(&self) -> &[String] {
        &self.outputs
    }

    pub fn payload_sha512(&self) -> &str {
        &self.payload_sha512
    }

    pub fn signer_public_key(&self) -> &[u8] {
        &self.signer_public_key
    }
}

impl FromProto<protos::transaction::TransactionHeader> for TransactionHeader {
    fn from_proto(
        mut proto: protos::transaction::TransactionHeader,
    ) -> Result<Self, ProtoConversionError> {
        Ok(TransactionHeader {
            batcher_public_key: hex::decode(proto.get_batcher_public_key())?,
            dependencies: proto.take_dependencies().into_vec(),
            family_name: proto.take_family_name(),
            family_version: proto.take_family_version(),
            inputs: proto.take_inputs().into_vec(),
            nonce: proto.take_nonce(),
            outputs: proto.take_outputs().into_vec(),
            payload_sha512: proto.take_payload_sha512(),
            signer_public_key: hex::decode(proto.get_signer_public_key())?,
        })
    }
}

impl FromNative<TransactionHeader> for protos::transaction::TransactionHeader {
    fn from_native(native: TransactionHeader) -> Result<Self, ProtoConversionError> {
        let mut proto = protos::transaction::TransactionHeader::new();
        proto.set_batcher_public_key(hex::encode(&native.batcher_public_key));
        proto.set_dependencies(RepeatedField::from_vec(native.dependencies));
        proto.set_family_name(native.family_name);
        proto.set_family_version(native.family_version);
        proto.set_inputs(RepeatedField::from_vec(native.inputs));
        proto.set_nonce(native.nonce);
        proto.set_outputs(RepeatedField::from_vec(native.outputs));
        proto.set_payload_sha512(native.payload_sha512);
        proto.set_signer_public_key(hex::encode(&native.signer_public_key));
        Ok(proto)
    }
}

impl FromBytes<TransactionHeader> for TransactionHeader {
    fn from_bytes(bytes: &[u8]) -> Result<TransactionHeader, ProtoConversionError> {
        let proto: protos::transaction::TransactionHeader = protobuf::parse_from_bytes(bytes)
            .map_err(|_| {
                ProtoConversionError::SerializationError(
                    "Unable to get TransactionHeader from bytes".to_string(),
                )
            })?;
        proto.into_native()
    }
}

impl IntoBytes for TransactionHeader {
    fn into_bytes(self) -> Result<Vec<u8>, ProtoConversionError> {
        let proto: protos::transaction::TransactionHeader = self.into_proto()?;
        let bytes = proto.write_to_bytes().map_err(|_| {
            ProtoConversionError::SerializationError(
                "Unable to get bytes from TransactionHeader".to_string(),
            )
        })?;
        Ok(bytes)
    }
}

impl IntoProto<protos::transaction::TransactionHeader> for TransactionHeader {}
impl IntoNative<TransactionHeader> for protos::transaction::TransactionHeader {}

/// Native implementation for Transaction
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Transaction {
    header: Vec<u8>,
    header_signature: String,
    payload: Vec<u8>,
}

impl Transaction {
    pub fn new(header: Vec<u8>, header_signature: String, payload: Vec<u8>) -> Self {
        Transaction {
            header,
            header_signature,
            payload,
        }
    }

    pub fn header(&self) -> &[u8] {
        &self.header
    }

    pub fn header_signature(&self) -> &str {
        &self.header_signature
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn into_pair(self) -> Result<TransactionPair, TransactionBuildError> {
        let header = TransactionHeader::from_bytes(&self.header)?;

        Ok(TransactionPair {
            transaction: self,
            header,
        })
    }
}

impl FromProto<protos::transaction::Transaction> for Transaction {
    fn from_proto(mut proto: protos::transaction::Transaction) -> Result<Self, ProtoConversionError> {
        Ok(Transaction {
            header: proto.take_header(),
            header_signature: proto.take_header_signature(),
            payload: proto.take_payload(),
        })
    }
}

impl FromNative<Transaction> for protos::transaction::Transaction {
    fn from_native(native: Transaction) -> Result<Self, ProtoConversionError> {
        let mut proto = protos::transaction::Transaction::new();
        proto.set_header(native.header);
        proto.set_header_signature(native.header_signature);
        proto.set_payload(native.payload);
        Ok(proto)
    }
}

impl FromBytes<Transaction> for Transaction {
    fn from_bytes(bytes: &[u8]) -> Result<Transaction, ProtoConversionError> {
        let proto: protos::transaction::Transaction =
            protobuf::parse_from_bytes(bytes).map_err(|_| {
                ProtoConversionError::SerializationError(
                    "Unable to get Transaction from bytes".to_string(),
                )
            })?;
        proto.into_native()
    }
}

impl IntoBytes for Transaction {
    fn into_bytes(self) -> Result<Vec<u8>, ProtoConversionError> {
        let proto: protos::transaction::Transaction = self.into_proto()?;
        let bytes = proto.write_to_bytes().map_err(|_| {
            ProtoConversionError::SerializationError(
                "Unable to get bytes from Transaction".to_string(),
            )
        })?;
        Ok(bytes)
    }
}

impl IntoProto<protos::transaction::Transaction> for Transaction {}
impl IntoNative<Transaction> for protos::transaction::Transaction {}

/// A transaction together with its deserialized header.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionPair {
    transaction: Transaction,
    header: TransactionHeader,
}

impl TransactionPair {
    pub fn transaction(&self) -> &Transaction {
        &self.transaction
    }

    pub fn header(&self) -> &TransactionHeader {
        &self.header
    }

    pub fn take(self) -> (Transaction, TransactionHeader) {
        (self.transaction, self.header)
    }
}

#[derive(Debug)]
pub enum TransactionBuildError {
    MissingField(String),
    SerializationError(String),
}

impl StdError for TransactionBuildError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        None
    }
}

impl std::fmt::Display for TransactionBuildError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match *self {
            TransactionBuildError::MissingField(ref s) => write!(f, "missing field: {}", s),
            TransactionBuildError::SerializationError(ref s) => {
                write!(f, "serialization error: {}", s)
            }
        }
    }
}

impl From<ProtoConversionError> for TransactionBuildError {
    fn from(e: ProtoConversionError) -> Self {
        TransactionBuildError::SerializationError(format!("{}", e))
    }
}

/// Builder used to create a Transaction. Signing happens upstream of
/// the processor, so the header signature is supplied, not computed.
#[derive(Default, Clone)]
pub struct TransactionBuilder {
    batcher_public_key: Option<Vec<u8>>,
    dependencies: Option<Vec<String>>,
    family_name: Option<String>,
    family_version: Option<String>,
    inputs: Option<Vec<String>>,
    nonce: Option<String>,
    outputs: Option<Vec<String>>,
    payload: Option<Vec<u8>>,
    header_signature: Option<String>,
    signer_public_key: Option<Vec<u8>>,
}

impl TransactionBuilder {
    pub fn new() -> Self {
        TransactionBuilder::default()
    }

    pub fn with_batcher_public_key(mut self, batcher_public_key: Vec<u8>) -> TransactionBuilder {
        self.batcher_public_key = Some(batcher_public_key);
        self
    }

    pub fn with_dependencies(mut self, dependencies: Vec<String>) -> TransactionBuilder {
        self.dependencies = Some(dependencies);
        self
    }

    pub fn with_family_name(mut self, family_name: String) -> TransactionBuilder {
        self.family_name = Some(family_name);
        self
    }

    pub fn with_family_version(mut self, family_version: String) -> TransactionBuilder {
        self.family_version = Some(family_version);
        self
    }

    pub fn with_inputs(mut self, inputs: Vec<String>) -> TransactionBuilder {
        self.inputs = Some(inputs);
        self
    }

    pub fn with_nonce(mut self, nonce: String) -> TransactionBuilder {
        self.nonce = Some(nonce);
        self
    }

    pub fn with_outputs(mut self, outputs: Vec<String>) -> TransactionBuilder {
        self.outputs = Some(outputs);
        self
    }

    pub fn with_payload(mut self, payload: Vec<u8>) -> TransactionBuilder {
        self.payload = Some(payload);
        self
    }

    pub fn with_header_signature(mut self, header_signature: String) -> TransactionBuilder {
        self.header_signature = Some(header_signature);
        self
    }

    pub fn with_signer_public_key(mut self, signer_public_key: Vec<u8>) -> TransactionBuilder {
        self.signer_public_key = Some(signer_public_key);
        self
    }

    pub fn build_pair(self) -> Result<TransactionPair, TransactionBuildError> {
        let family_name = self
            .family_name
            .ok_or_else(|| TransactionBuildError::MissingField("family_name".to_string()))?;
        let family_version = self
            .family_version
            .ok_or_else(|| TransactionBuildError::MissingField("family_version".to_string()))?;
        let signer_public_key = self
            .signer_public_key
            .ok_or_else(|| TransactionBuildError::MissingField("signer_public_key".to_string()))?;
        let payload = self
            .payload
            .ok_or_else(|| TransactionBuildError::MissingField("payload".to_string()))?;

        let mut sha = Sha512::new();
        sha.input(&payload);
        let payload_sha512 = hex::encode(sha.result().to_vec());

        let header = TransactionHeader {
            batcher_public_key: self.batcher_public_key.unwrap_or_default(),
            dependencies: self.dependencies.unwrap_or_default(),
            family_name,
            family_version,
            inputs: self.inputs.unwrap_or_default(),
            nonce: self.nonce.unwrap_or_default(),
            outputs: self.outputs.unwrap_or_default(),
            payload_sha512,
            signer_public_key,
        };

        let header_bytes = header.clone().into_bytes()?;

        Ok(TransactionPair {
            transaction: Transaction {
                header: header_bytes,
                header_signature: self.header_signature.unwrap_or_default(),
                payload,
            },
            header,
        })
    }
}
