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

//! Native protocol for the receipt attached to every successful Seth
//! transaction.

use protobuf::Message;

use crate::address::EvmAddr;
use crate::protos;
use crate::protos::{
    FromBytes, FromNative, FromProto, IntoBytes, IntoNative, IntoProto, ProtoConversionError,
};

/// Native implementation for SethTransactionReceipt
#[derive(Debug, Default, Clone, PartialEq)]
pub struct SethTransactionReceipt {
    contract_address: Option<EvmAddr>,
    gas_used: u64,
    return_value: Vec<u8>,
}

impl SethTransactionReceipt {
    pub fn contract_address(&self) -> Option<&EvmAddr> {
        self.contract_address.as_ref()
    }

    pub fn gas_used(&self) -> u64 {
        self.gas_used
    }

    pub fn return_value(&self) -> &[u8] {
        &self.return_value
    }
}

impl FromProto<protos::seth::SethTransactionReceipt> for SethTransactionReceipt {
    fn from_proto(
        mut proto: protos::seth::SethTransactionReceipt,
    ) -> Result<Self, ProtoConversionError> {
        let contract_address = if proto.get_contract_address().is_empty() {
            None
        } else {
            Some(
                EvmAddr::from_bytes(proto.get_contract_address())
                    .map_err(|err| ProtoConversionError::InvalidTypeError(err.to_string()))?,
            )
        };
        Ok(SethTransactionReceipt {
            contract_address,
            gas_used: proto.get_gas_used(),
            return_value: proto.take_return_value(),
        })
    }
}

impl FromNative<SethTransactionReceipt> for protos::seth::SethTransactionReceipt {
    fn from_native(native: SethTransactionReceipt) -> Result<Self, ProtoConversionError> {
        let mut proto = protos::seth::SethTransactionReceipt::new();
        if let Some(contract_address) = native.contract_address {
            proto.set_contract_address(contract_address.to_vec());
        }
        proto.set_gas_used(native.gas_used);
        proto.set_return_value(native.return_value);
        Ok(proto)
    }
}

impl FromBytes<SethTransactionReceipt> for SethTransactionReceipt {
    fn from_bytes(bytes: &[u8]) -> Result<SethTransactionReceipt, ProtoConversionError> {
        let proto: protos::seth::SethTransactionReceipt = protobuf::parse_from_bytes(bytes)
            .map_err(|_| {
                ProtoConversionError::SerializationError(
                    "Unable to get SethTransactionReceipt from bytes".to_string(),
                )
            })?;
        proto.into_native()
    }
}

impl IntoBytes for SethTransactionReceipt {
    fn into_bytes(self) -> Result<Vec<u8>, ProtoConversionError> {
        let proto: protos::seth::SethTransactionReceipt = self.into_proto()?;
        let bytes = proto.write_to_bytes().map_err(|_| {
            ProtoConversionError::SerializationError(
                "Unable to get bytes from SethTransactionReceipt".to_string(),
            )
        })?;
        Ok(bytes)
    }
}

impl IntoProto<protos::seth::SethTransactionReceipt> for SethTransactionReceipt {}
impl IntoNative<SethTransactionReceipt> for protos::seth::SethTransactionReceipt {}

/// Builder used to create a SethTransactionReceipt. Every field has a
/// meaningful default, so `build` cannot fail.
#[derive(Default, Clone)]
pub struct SethTransactionReceiptBuilder {
    contract_address: Option<EvmAddr>,
    gas_used: u64,
    return_value: Vec<u8>,
}

impl SethTransactionReceiptBuilder {
    pub fn new() -> Self {
        SethTransactionReceiptBuilder::default()
    }

    pub fn with_contract_address(mut self, address: EvmAddr) -> SethTransactionReceiptBuilder {
        self.contract_address = Some(address);
        self
    }

    pub fn with_gas_used(mut self, gas_used: u64) -> SethTransactionReceiptBuilder {
        self.gas_used = gas_used;
        self
    }

    pub fn with_return_value(mut self, return_value: Vec<u8>) -> SethTransactionReceiptBuilder {
        self.return_value = return_value;
        self
    }

    pub fn build(self) -> SethTransactionReceipt {
        SethTransactionReceipt {
            contract_address: self.contract_address,
            gas_used: self.gas_used,
            return_value: self.return_value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn receipt_round_trip() {
        let receipt = SethTransactionReceiptBuilder::new()
            .with_contract_address(EvmAddr::from_bytes(&[0x0d; 20]).unwrap())
            .with_gas_used(255)
            .with_return_value(vec![0x60])
            .build();

        let bytes = receipt.clone().into_bytes().unwrap();
        assert_eq!(SethTransactionReceipt::from_bytes(&bytes).unwrap(), receipt);
    }

    /// A receipt for a transaction that created nothing and returned
    /// nothing still round-trips, with the contract address staying
    /// unset.
    #[test]
    fn empty_receipt_round_trip() {
        let receipt = SethTransactionReceiptBuilder::new().build();
        let bytes = receipt.clone().into_bytes().unwrap();
        let restored = SethTransactionReceipt::from_bytes(&bytes).unwrap();
        assert_eq!(restored, receipt);
        assert_eq!(restored.contract_address(), None);
    }
}
