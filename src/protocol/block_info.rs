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

//! Native types for the records written by the block-info transaction
//! family. The Seth processor only ever reads these.

use protobuf::Message;

use crate::protos;
use crate::protos::{
    FromBytes, FromNative, FromProto, IntoBytes, IntoNative, IntoProto, ProtoConversionError,
};

/// Native implementation for BlockInfoConfig
#[derive(Debug, Default, Clone, PartialEq)]
pub struct BlockInfoConfig {
    latest_block: u64,
    oldest_block: u64,
    target_count: u64,
    sync_tolerance: u64,
}

impl BlockInfoConfig {
    pub fn latest_block(&self) -> u64 {
        self.latest_block
    }

    pub fn oldest_block(&self) -> u64 {
        self.oldest_block
    }

    pub fn target_count(&self) -> u64 {
        self.target_count
    }

    pub fn sync_tolerance(&self) -> u64 {
        self.sync_tolerance
    }
}

impl FromProto<protos::block_info::BlockInfoConfig> for BlockInfoConfig {
    fn from_proto(proto: protos::block_info::BlockInfoConfig) -> Result<Self, ProtoConversionError> {
        Ok(BlockInfoConfig {
            latest_block: proto.get_latest_block(),
            oldest_block: proto.get_oldest_block(),
            target_count: proto.get_target_count(),
            sync_tolerance: proto.get_sync_tolerance(),
        })
    }
}

impl FromNative<BlockInfoConfig> for protos::block_info::BlockInfoConfig {
    fn from_native(native: BlockInfoConfig) -> Result<Self, ProtoConversionError> {
        let mut proto = protos::block_info::BlockInfoConfig::new();
        proto.set_latest_block(native.latest_block);
        proto.set_oldest_block(native.oldest_block);
        proto.set_target_count(native.target_count);
        proto.set_sync_tolerance(native.sync_tolerance);
        Ok(proto)
    }
}

impl FromBytes<BlockInfoConfig> for BlockInfoConfig {
    fn from_bytes(bytes: &[u8]) -> Result<BlockInfoConfig, ProtoConversionError> {
        let proto: protos::block_info::BlockInfoConfig = protobuf::parse_from_bytes(bytes)
            .map_err(|_| {
                ProtoConversionError::SerializationError(
                    "Unable to get BlockInfoConfig from bytes".to_string(),
                )
            })?;
        proto.into_native()
    }
}

impl IntoBytes for BlockInfoConfig {
    fn into_bytes(self) -> Result<Vec<u8>, ProtoConversionError> {
        let proto: protos::block_info::BlockInfoConfig = self.into_proto()?;
        let bytes = proto.write_to_bytes().map_err(|_| {
            ProtoConversionError::SerializationError(
                "Unable to get bytes from BlockInfoConfig".to_string(),
            )
        })?;
        Ok(bytes)
    }
}

impl IntoProto<protos::block_info::BlockInfoConfig> for BlockInfoConfig {}
impl IntoNative<BlockInfoConfig> for protos::block_info::BlockInfoConfig {}

/// Builder used to create a BlockInfoConfig, primarily for seeding test
/// state the way the block-info family would.
#[derive(Default, Clone)]
pub struct BlockInfoConfigBuilder {
    latest_block: u64,
    oldest_block: u64,
    target_count: u64,
    sync_tolerance: u64,
}

impl BlockInfoConfigBuilder {
    pub fn new() -> Self {
        BlockInfoConfigBuilder::default()
    }

    pub fn with_latest_block(mut self, latest_block: u64) -> BlockInfoConfigBuilder {
        self.latest_block = latest_block;
        self
    }

    pub fn with_oldest_block(mut self, oldest_block: u64) -> BlockInfoConfigBuilder {
        self.oldest_block = oldest_block;
        self
    }

    pub fn build(self) -> BlockInfoConfig {
        BlockInfoConfig {
            latest_block: self.latest_block,
            oldest_block: self.oldest_block,
            target_count: self.target_count,
            sync_tolerance: self.sync_tolerance,
        }
    }
}

/// Native implementation for BlockInfo
#[derive(Debug, Default, Clone, PartialEq)]
pub struct BlockInfo {
    block_num: u64,
    previous_block_id: String,
    signer_public_key: String,
    header_signature: String,
    timestamp: u64,
}

impl BlockInfo {
    pub fn block_num(&self) -> u64 {
        self.block_num
    }

    pub fn previous_block_id(&self) -> &str {
        &self.previous_block_id
    }

    pub fn signer_public_key(&self) -> &str {
        &self.signer_public_key
    }

    pub fn header_signature(&self) -> &str {
        &self.header_signature
    }

    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }
}

impl FromProto<protos::block_info::BlockInfo> for BlockInfo {
    fn from_proto(mut proto: protos::block_info::BlockInfo) -> Result<Self, ProtoConversionError> {
        Ok(BlockInfo {
            block_num: proto.get_block_num(),
            previous_block_id: proto.take_previous_block_id(),
            signer_public_key: proto.take_signer_public_key(),
            header_signature: proto.take_header_signature(),
            timestamp: proto.get_timestamp(),
        })
    }
}

impl FromNative<BlockInfo> for protos::block_info::BlockInfo {
    fn from_native(native: BlockInfo) -> Result<Self, ProtoConversionError> {
        let mut proto = protos::block_info::BlockInfo::new();
        proto.set_block_num(native.block_num);
        proto.set_previous_block_id(native.previous_block_id);
        proto.set_signer_public_key(native.signer_public_key);
        proto.set_header_signature(native.header_signature);
        proto.set_timestamp(native.timestamp);
        Ok(proto)
    }
}

impl FromBytes<BlockInfo> for BlockInfo {
    fn from_bytes(bytes: &[u8]) -> Result<BlockInfo, ProtoConversionError> {
        let proto: protos::block_info::BlockInfo =
            protobuf::parse_from_bytes(bytes).map_err(|_| {
                ProtoConversionError::SerializationError(
                    "Unable to get BlockInfo from bytes".to_string(),
                )
            })?;
        proto.into_native()
    }
}

impl IntoBytes for BlockInfo {
    fn into_bytes(self) -> Result<Vec<u8>, ProtoConversionError> {
        let proto: protos::block_info::BlockInfo = self.into_proto()?;
        let bytes = proto.write_to_bytes().map_err(|_| {
            ProtoConversionError::SerializationError(
                "Unable to get bytes from BlockInfo".to_string(),
            )
        })?;
        Ok(bytes)
    }
}

impl IntoProto<protos::block_info::BlockInfo> for BlockInfo {}
impl IntoNative<BlockInfo> for protos::block_info::BlockInfo {}

/// Builder used to create a BlockInfo, primarily for seeding test state
/// the way the block-info family would.
#[derive(Default, Clone)]
pub struct BlockInfoBuilder {
    block_num: u64,
    previous_block_id: String,
    signer_public_key: String,
    header_signature: String,
    timestamp: u64,
}

impl BlockInfoBuilder {
    pub fn new() -> Self {
        BlockInfoBuilder::default()
    }

    pub fn with_block_num(mut self, block_num: u64) -> BlockInfoBuilder {
        self.block_num = block_num;
        self
    }

    pub fn with_header_signature(mut self, header_signature: String) -> BlockInfoBuilder {
        self.header_signature = header_signature;
        self
    }

    pub fn with_timestamp(mut self, timestamp: u64) -> BlockInfoBuilder {
        self.timestamp = timestamp;
        self
    }

    pub fn build(self) -> BlockInfo {
        BlockInfo {
            block_num: self.block_num,
            previous_block_id: self.previous_block_id,
            signer_public_key: self.signer_public_key,
            header_signature: self.header_signature,
            timestamp: self.timestamp,
        }
    }
}
