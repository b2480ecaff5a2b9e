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

//! Account permissions: a pair of bitmasks over a fixed flag set. The
//! `set_bit` mask records which flags an account governs itself; the
//! `perms` mask holds the on/off value for governed flags. Checks on
//! flags an account does not govern escalate to the global permissions
//! account.

use protobuf::Message;

use crate::address::EvmAddr;
use crate::protos;
use crate::protos::{
    FromBytes, FromNative, FromProto, IntoBytes, IntoNative, IntoProto, ProtoConversionError,
};
use crate::state::StateError;
use crate::vm::AppState;

pub type PermFlag = u64;

pub const ROOT: PermFlag = 1;
pub const SEND: PermFlag = 1 << 1;
pub const CALL: PermFlag = 1 << 2;
pub const CREATE_CONTRACT: PermFlag = 1 << 3;
pub const CREATE_ACCOUNT: PermFlag = 1 << 4;

pub const ALL_PERM_FLAGS: PermFlag = ROOT | SEND | CALL | CREATE_CONTRACT | CREATE_ACCOUNT;

/// Native implementation for EvmPermissions
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Permissions {
    perms: PermFlag,
    set_bit: PermFlag,
}

impl Permissions {
    pub fn new(perms: PermFlag, set_bit: PermFlag) -> Self {
        Permissions { perms, set_bit }
    }

    /// Permissions that govern every flag and grant every flag.
    pub fn all_set() -> Self {
        Permissions {
            perms: ALL_PERM_FLAGS,
            set_bit: ALL_PERM_FLAGS,
        }
    }

    pub fn perms(&self) -> PermFlag {
        self.perms
    }

    pub fn set_bit(&self) -> PermFlag {
        self.set_bit
    }

    /// Returns the governed value of the flag, or `None` if this
    /// account does not govern it.
    pub fn get(&self, flag: PermFlag) -> Option<bool> {
        if self.set_bit & flag == 0 {
            None
        } else {
            Some(self.perms & flag != 0)
        }
    }

    pub fn set(&mut self, flag: PermFlag, value: bool) {
        self.set_bit |= flag;
        if value {
            self.perms |= flag;
        } else {
            self.perms &= !flag;
        }
    }

    /// The mask a created account inherits from its creator: Root is
    /// removed from both masks, so the new account neither holds Root
    /// nor governs it. Root can only be granted explicitly.
    pub fn inherited(&self) -> Permissions {
        Permissions {
            perms: self.perms & !ROOT,
            set_bit: self.set_bit & !ROOT,
        }
    }
}

/// Checks whether the account at `addr` holds `flag`. An account that
/// governs the flag locally answers for itself; otherwise the global
/// permissions account answers; if neither governs the flag it is
/// denied.
pub fn has_permission(
    state: &mut dyn AppState,
    addr: &EvmAddr,
    flag: PermFlag,
) -> Result<bool, StateError> {
    let local = state
        .get_account(addr)?
        .and_then(|account| account.permissions().get(flag));
    match local {
        Some(value) => Ok(value),
        None => {
            let global = state.get_account(&crate::address::GLOBAL_PERMISSIONS_ADDRESS)?;
            Ok(global
                .and_then(|account| account.permissions().get(flag))
                .unwrap_or(false))
        }
    }
}

impl FromProto<protos::seth::EvmPermissions> for Permissions {
    fn from_proto(proto: protos::seth::EvmPermissions) -> Result<Self, ProtoConversionError> {
        Ok(Permissions {
            perms: proto.get_perms(),
            set_bit: proto.get_set_bit(),
        })
    }
}

impl FromNative<Permissions> for protos::seth::EvmPermissions {
    fn from_native(native: Permissions) -> Result<Self, ProtoConversionError> {
        let mut proto = protos::seth::EvmPermissions::new();
        proto.set_perms(native.perms());
        proto.set_set_bit(native.set_bit());
        Ok(proto)
    }
}

impl FromBytes<Permissions> for Permissions {
    fn from_bytes(bytes: &[u8]) -> Result<Permissions, ProtoConversionError> {
        let proto: protos::seth::EvmPermissions =
            protobuf::parse_from_bytes(bytes).map_err(|_| {
                ProtoConversionError::SerializationError(
                    "Unable to get EvmPermissions from bytes".to_string(),
                )
            })?;
        proto.into_native()
    }
}

impl IntoBytes for Permissions {
    fn into_bytes(self) -> Result<Vec<u8>, ProtoConversionError> {
        let proto: protos::seth::EvmPermissions = self.into_proto()?;
        let bytes = proto.write_to_bytes().map_err(|_| {
            ProtoConversionError::SerializationError(
                "Unable to get bytes from EvmPermissions".to_string(),
            )
        })?;
        Ok(bytes)
    }
}

impl IntoProto<protos::seth::EvmPermissions> for Permissions {}
impl IntoNative<Permissions> for protos::seth::EvmPermissions {}
