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

//! The Seth transaction handler: unpacks the payload, enforces the
//! per-transaction preconditions, routes to one of the four transaction
//! types, and attaches a receipt.

use crate::address::{
    self, block_info_address, block_info_config_address, EvmAddr, FAMILY_NAME, FAMILY_VERSION,
    GAS_LIMIT, GLOBAL_PERMISSIONS_ADDRESS,
};
use crate::handler::{ApplyError, TransactionContext, TransactionHandler};
use crate::permissions::{self, has_permission, Permissions};
use crate::protocol::account::{Account, AccountBuilder};
use crate::protocol::block_info::{BlockInfo, BlockInfoConfig};
use crate::protocol::payload::{
    CreateContractAccountTxn, CreateExternalAccountTxn, MessageCallTxn, SethTransaction,
    SetPermissionsTxn,
};
use crate::protocol::receipt::SethTransactionReceiptBuilder;
use crate::protocol::transaction::TransactionPair;
use crate::protos::{FromBytes, IntoBytes};
use crate::state::StateError;
use crate::vm::{
    AppState, Evm, ExecParams, SawtoothAppState, SawtoothEventSink, VmError, Word256,
};

#[derive(Debug, Default)]
struct HandlerResult {
    gas_used: u64,
    return_value: Vec<u8>,
    new_account: Option<Account>,
}

pub struct SethTransactionHandler {
    family_name: String,
    family_versions: Vec<String>,
    namespaces: Vec<String>,
    vm: Box<dyn Evm>,
}

impl SethTransactionHandler {
    /// Constructs a handler driving the given EVM implementation.
    pub fn new(vm: Box<dyn Evm>) -> SethTransactionHandler {
        SethTransactionHandler {
            family_name: FAMILY_NAME.to_string(),
            family_versions: vec![FAMILY_VERSION.to_string()],
            namespaces: vec![address::prefix()],
            vm,
        }
    }
}

impl TransactionHandler for SethTransactionHandler {
    fn family_name(&self) -> &str {
        &self.family_name
    }

    fn family_versions(&self) -> &[String] {
        &self.family_versions
    }

    fn namespaces(&self) -> &[String] {
        &self.namespaces
    }

    fn apply(
        &self,
        transaction: &TransactionPair,
        context: &mut dyn TransactionContext,
    ) -> Result<(), ApplyError> {
        let wrapper = unpack_payload(transaction.transaction().payload())?;

        let header = transaction.header();
        if header.signer_public_key().is_empty() {
            return Err(ApplyError::InvalidTransaction("Public key not set".into()));
        }

        // The address the EVM uses to access the sender's account
        let sender = EvmAddr::from_public_key(header.signer_public_key());

        let context: &dyn TransactionContext = &*context;
        let mut state = SawtoothAppState::new(context);

        ensure_global_permissions(&mut state)?;

        let result = match wrapper {
            SethTransaction::CreateExternalAccount(txn) => {
                create_external_account(&txn, &sender, &mut state)?
            }
            SethTransaction::MessageCall(txn) => {
                message_call(&txn, &sender, &mut state, &*self.vm)?
            }
            SethTransaction::CreateContractAccount(txn) => {
                create_contract_account(&txn, &sender, &mut state, &*self.vm)?
            }
            SethTransaction::SetPermissions(txn) => set_permissions(&txn, &sender, &mut state)?,
        };

        let mut receipt = SethTransactionReceiptBuilder::new()
            .with_gas_used(result.gas_used)
            .with_return_value(result.return_value);
        if let Some(account) = result.new_account {
            receipt = receipt.with_contract_address(*account.address());
        }

        let bytes = receipt
            .build()
            .into_bytes()
            .map_err(|err| ApplyError::InternalError(format!("Couldn't marshal receipt: {}", err)))?;

        context
            .add_receipt_data(bytes)
            .map_err(|err| ApplyError::InternalError(format!("Couldn't set receipt data: {}", err)))
    }
}

fn unpack_payload(payload: &[u8]) -> Result<SethTransaction, ApplyError> {
    if payload.is_empty() {
        return Err(ApplyError::InvalidTransaction(
            "Request must contain payload".into(),
        ));
    }
    SethTransaction::from_bytes(payload)
        .map_err(|_| ApplyError::InvalidTransaction("Malformed request payload".into()))
}

/// Initializes the global permissions account, which governs and grants
/// every flag until an administrator changes it. This is the only write
/// the dispatcher performs on its own.
fn ensure_global_permissions(state: &mut SawtoothAppState) -> Result<(), ApplyError> {
    if state.get_account(&GLOBAL_PERMISSIONS_ADDRESS)?.is_some() {
        return Ok(());
    }
    let account = AccountBuilder::new()
        .with_address(GLOBAL_PERMISSIONS_ADDRESS)
        .with_permissions(Permissions::all_set())
        .build()
        .map_err(|err| ApplyError::InternalError(format!("{}", err)))?;
    state.update_account(&account)?;
    Ok(())
}

fn check_nonce(txn_nonce: u64, account: &Account) -> Result<(), ApplyError> {
    if txn_nonce != account.nonce() {
        return Err(ApplyError::InvalidTransaction(format!(
            "Nonces do not match: Transaction ({}), State ({})",
            txn_nonce,
            account.nonce()
        )));
    }
    Ok(())
}

/// Resolves the permissions of an account about to be created: inherit
/// from the creator when the transaction carries none, otherwise take
/// the explicit mask, which requires the creator to hold Root.
fn new_account_permissions(
    txn_permissions: Option<&Permissions>,
    creator: &Account,
    state: &mut SawtoothAppState,
) -> Result<Permissions, ApplyError> {
    match txn_permissions {
        None => Ok(creator.permissions().inherited()),
        Some(perms) => {
            if !has_permission(state, creator.address(), permissions::ROOT)? {
                return Err(ApplyError::InvalidTransaction(format!(
                    "Creating account does not have permission to set permissions: {}",
                    creator.address()
                )));
            }
            Ok(*perms)
        }
    }
}

fn create_external_account(
    txn: &CreateExternalAccountTxn,
    sender: &EvmAddr,
    state: &mut SawtoothAppState,
) -> Result<HandlerResult, ApplyError> {
    match txn.to() {
        // Sender is creating a separate external account, which requires
        // permission to create accounts
        Some(to) => {
            let mut sender_account = state.get_account(sender)?.ok_or_else(|| {
                ApplyError::InvalidTransaction(format!(
                    "Creating account must already exist for it to be able to create other accounts: {}",
                    sender
                ))
            })?;
            if !has_permission(state, sender, permissions::CREATE_ACCOUNT)? {
                return Err(ApplyError::InvalidTransaction(format!(
                    "Sender account does not have permission to create external accounts: {}",
                    sender
                )));
            }
            check_nonce(txn.nonce(), &sender_account)?;

            let new_address = EvmAddr::from_bytes(to).map_err(|_| {
                ApplyError::InvalidTransaction(format!(
                    "Failed to construct address for new external account: {}",
                    hex::encode(to)
                ))
            })?;

            debug!("Creating new external account on behalf of {}", new_address);

            if state.get_account(&new_address)?.is_some() {
                return Err(ApplyError::InvalidTransaction(format!(
                    "Account already exists at address {}",
                    new_address
                )));
            }

            let new_permissions =
                new_account_permissions(txn.permissions(), &sender_account, state)?;
            let new_account = AccountBuilder::new()
                .with_address(new_address)
                .with_nonce(1)
                .with_permissions(new_permissions)
                .build()
                .map_err(|err| ApplyError::InternalError(format!("{}", err)))?;

            sender_account.bump_nonce();

            state.update_account(&sender_account)?;
            state.update_account(&new_account)?;

            Ok(HandlerResult::default())
        }

        // Sender is new and is creating its own account for the first time
        None => {
            debug!("Creating new external account at sender address: {}", sender);

            if state.get_account(sender)?.is_some() {
                return Err(ApplyError::InvalidTransaction(format!(
                    "Account already exists at address {}",
                    sender
                )));
            }

            // A nonexistent sender's nonce is zero
            if txn.nonce() != 0 {
                return Err(ApplyError::InvalidTransaction(format!(
                    "Nonces do not match: Transaction ({}), State (0)",
                    txn.nonce()
                )));
            }

            let global = state
                .get_account(&GLOBAL_PERMISSIONS_ADDRESS)?
                .ok_or_else(|| {
                    ApplyError::InternalError(
                        "Global permissions account is not initialized".into(),
                    )
                })?;
            if !has_permission(state, &GLOBAL_PERMISSIONS_ADDRESS, permissions::CREATE_ACCOUNT)? {
                return Err(ApplyError::InvalidTransaction(format!(
                    "New account creation is disabled, couldn't create account: {}",
                    sender
                )));
            }

            let new_account = AccountBuilder::new()
                .with_address(*sender)
                .with_nonce(1)
                .with_permissions(global.permissions().inherited())
                .build()
                .map_err(|err| ApplyError::InternalError(format!("{}", err)))?;

            state.update_account(&new_account)?;

            Ok(HandlerResult::default())
        }
    }
}

fn create_contract_account(
    txn: &CreateContractAccountTxn,
    sender: &EvmAddr,
    state: &mut SawtoothAppState,
    vm: &dyn Evm,
) -> Result<HandlerResult, ApplyError> {
    let mut sender_account = state.get_account(sender)?.ok_or_else(|| {
        ApplyError::InvalidTransaction(format!(
            "Creating account must already exist to create a contract account: {}",
            sender
        ))
    })?;

    if !has_permission(state, sender, permissions::CREATE_CONTRACT)? {
        return Err(ApplyError::InvalidTransaction(format!(
            "Sender account does not have permission to create contracts: {}",
            sender
        )));
    }

    check_nonce(txn.nonce(), &sender_account)?;

    let new_permissions = new_account_permissions(txn.permissions(), &sender_account, state)?;

    // Derives the contract address from the sender's pre-increment
    // nonce, bumps the sender's nonce in memory, and writes an empty
    // entry at the derived address
    let created = state.create_account(&mut sender_account)?;
    let contract_address = *created.address();

    let (output, gas_used) = call_vm(vm, state, &created, None, txn.init(), &[], txn.gas_limit())?;

    // Re-read at the derived address; the init code may have run
    // against the new account
    let mut new_account = state.get_account(&contract_address)?.ok_or_else(|| {
        ApplyError::InvalidTransaction(format!(
            "Contract account self-destructed during creation: {}",
            contract_address
        ))
    })?;

    new_account.bump_nonce();
    new_account.set_code(output.clone());
    new_account.set_permissions(new_permissions);

    state.update_account(&sender_account)?;
    state.update_account(&new_account)?;

    Ok(HandlerResult {
        gas_used,
        return_value: output,
        new_account: Some(new_account),
    })
}

fn message_call(
    txn: &MessageCallTxn,
    sender: &EvmAddr,
    state: &mut SawtoothAppState,
    vm: &dyn Evm,
) -> Result<HandlerResult, ApplyError> {
    let mut sender_account = state.get_account(sender)?.ok_or_else(|| {
        ApplyError::InvalidTransaction(format!(
            "Sender account must already exist to message call: {}",
            sender
        ))
    })?;

    if !has_permission(state, sender, permissions::CALL)? {
        return Err(ApplyError::InvalidTransaction(format!(
            "Sender account does not have permission to make message calls: {}",
            sender
        )));
    }

    check_nonce(txn.nonce(), &sender_account)?;

    let receiver_address = EvmAddr::from_bytes(txn.to()).map_err(|_| {
        ApplyError::InvalidTransaction(format!(
            "Failed to construct receiver address for message call: {}",
            hex::encode(txn.to())
        ))
    })?;

    let receiver_account = state.get_account(&receiver_address)?.ok_or_else(|| {
        ApplyError::InvalidTransaction(format!(
            "Receiver account must already exist to call it: {}",
            receiver_address
        ))
    })?;

    let (output, gas_used) = call_vm(
        vm,
        state,
        &sender_account,
        Some(&receiver_account),
        receiver_account.code(),
        txn.data(),
        txn.gas_limit(),
    )?;

    debug!("Gas Used: {}", gas_used);
    debug!("EVM Output: {}", hex::encode(&output));

    sender_account.bump_nonce();
    state.update_account(&sender_account)?;

    Ok(HandlerResult {
        gas_used,
        return_value: output,
        new_account: None,
    })
}

fn set_permissions(
    txn: &SetPermissionsTxn,
    sender: &EvmAddr,
    state: &mut SawtoothAppState,
) -> Result<HandlerResult, ApplyError> {
    let new_permissions = *txn.permissions().ok_or_else(|| {
        ApplyError::InvalidTransaction(
            "Permissions field cannot be blank in SetPermissions transaction".into(),
        )
    })?;

    let mut sender_account = state.get_account(sender)?.ok_or_else(|| {
        ApplyError::InvalidTransaction(format!(
            "Sender account must already exist for updating permissions: {}",
            sender
        ))
    })?;

    if !has_permission(state, sender, permissions::ROOT)? {
        return Err(ApplyError::InvalidTransaction(format!(
            "Sender account does not have permission to change permissions: {}",
            sender
        )));
    }

    check_nonce(txn.nonce(), &sender_account)?;

    let receiver_address = EvmAddr::from_bytes(txn.to()).map_err(|_| {
        ApplyError::InvalidTransaction(format!(
            "Failed to construct receiver address for permission change: {}",
            hex::encode(txn.to())
        ))
    })?;

    debug!(
        "SetPermissions({}): Perms({}), SetBit({})",
        receiver_address,
        new_permissions.perms(),
        new_permissions.set_bit()
    );

    sender_account.bump_nonce();

    // Changing the sender's own permissions is a single-account update
    if receiver_address == *sender {
        sender_account.set_permissions(new_permissions);
        state.update_account(&sender_account)?;
        return Ok(HandlerResult::default());
    }

    let mut receiver_account = match state.get_account(&receiver_address)? {
        Some(account) => account,
        // The global permissions account is the one target that may be
        // created by this transaction, so permissions can be
        // administered before any other account exists
        None if receiver_address == GLOBAL_PERMISSIONS_ADDRESS => AccountBuilder::new()
            .with_address(GLOBAL_PERMISSIONS_ADDRESS)
            .with_nonce(1)
            .build()
            .map_err(|err| ApplyError::InternalError(format!("{}", err)))?,
        None => {
            return Err(ApplyError::InvalidTransaction(format!(
                "Receiver account must already exist to change its permissions: {}",
                receiver_address
            )))
        }
    };

    receiver_account.set_permissions(new_permissions);

    state.update_account(&sender_account)?;
    state.update_account(&receiver_account)?;

    Ok(HandlerResult::default())
}

/// Runs the EVM over the given code, seeding it with the transaction's
/// gas limit and reporting back how much was consumed.
fn call_vm(
    vm: &dyn Evm,
    state: &mut SawtoothAppState,
    sender: &Account,
    receiver: Option<&Account>,
    code: &[u8],
    input: &[u8],
    gas_limit: u64,
) -> Result<(Vec<u8>, u64), ApplyError> {
    let context = state.context();
    let params = exec_params(context)?;
    let mut events = SawtoothEventSink::new(context);

    let receiver = receiver.unwrap_or(sender);

    let mut gas = gas_limit;
    let output = vm
        .call(
            state, &mut events, &params, sender, receiver, code, input, &mut gas,
        )
        .map_err(|err| match err {
            VmError::State(state_err) => ApplyError::from(state_err),
            VmError::Execution(msg) => {
                ApplyError::InvalidTransaction(format!("EVM error: {}", msg))
            }
        })?;

    Ok((output, gas_limit - gas))
}

/// Builds the EVM's execution parameters from the block-info family's
/// records. When the config record has not been written, the block
/// parameters degrade to zero values instead of failing the
/// transaction.
fn exec_params(context: &dyn TransactionContext) -> Result<ExecParams, ApplyError> {
    let config = match get_block_info_config(context)? {
        Some(config) => config,
        None => {
            debug!("Block info not available. BLOCKHASH, TIMESTAMP, and BLOCKHEIGHT instructions will see zero values");
            return Ok(ExecParams {
                block_height: 0,
                block_hash: Word256::zero(),
                block_time: 0,
                gas_limit: GAS_LIMIT,
            });
        }
    };

    let info = get_block_info(context, config.latest_block())?.ok_or_else(|| {
        ApplyError::InvalidTransaction(format!(
            "Failed to get block info for block {}",
            config.latest_block()
        ))
    })?;

    let hash_bytes = hex::decode(info.header_signature()).map_err(|_| {
        ApplyError::InvalidTransaction(format!(
            "Block {} header signature is not valid hex",
            info.block_num()
        ))
    })?;

    Ok(ExecParams {
        block_height: info.block_num(),
        block_hash: Word256::right_pad(&hash_bytes),
        block_time: info.timestamp(),
        gas_limit: GAS_LIMIT,
    })
}

pub(crate) fn get_block_info_config(
    context: &dyn TransactionContext,
) -> Result<Option<BlockInfoConfig>, StateError> {
    context
        .get_state_entry(&block_info_config_address())
        .map_err(StateError::Context)?
        .map(|bytes| BlockInfoConfig::from_bytes(&bytes).map_err(StateError::Serialization))
        .transpose()
}

pub(crate) fn get_block_info(
    context: &dyn TransactionContext,
    block_num: u64,
) -> Result<Option<BlockInfo>, StateError> {
    context
        .get_state_entry(&block_info_address(block_num))
        .map_err(StateError::Context)?
        .map(|bytes| BlockInfo::from_bytes(&bytes).map_err(StateError::Serialization))
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::{Arc, Mutex};

    use crate::handler::ContextError;
    use crate::permissions::{ALL_PERM_FLAGS, CALL, CREATE_ACCOUNT, CREATE_CONTRACT, ROOT};
    use crate::protocol::block_info::{BlockInfoBuilder, BlockInfoConfigBuilder};
    use crate::protocol::payload::{
        CreateContractAccountTxnBuilder, CreateExternalAccountTxnBuilder, MessageCallTxnBuilder,
        SetPermissionsTxnBuilder,
    };
    use crate::protocol::receipt::SethTransactionReceipt;
    use crate::protocol::transaction::TransactionBuilder;
    use crate::testing::TestContext;
    use crate::vm::{AppState, EventSink, LogEvent};

    const ALICE_PK: &[u8] = &[0x02; 33];
    const BOB_PK: &[u8] = &[0x03; 33];

    /// Scripted stand-in for the EVM: echoes the code it was given as
    /// its output, burns a fixed amount of gas, optionally fires one
    /// log, and records the parameters of the last call in a handle the
    /// test keeps.
    struct TestVm {
        gas_cost: u64,
        log: Option<(Vec<u8>, Vec<u8>)>,
        params_seen: Arc<Mutex<Option<ExecParams>>>,
    }

    impl TestVm {
        fn new(gas_cost: u64) -> Self {
            TestVm {
                gas_cost,
                log: None,
                params_seen: Arc::new(Mutex::new(None)),
            }
        }

        fn with_log(topic: Vec<u8>, data: Vec<u8>) -> Self {
            TestVm {
                gas_cost: 100,
                log: Some((topic, data)),
                params_seen: Arc::new(Mutex::new(None)),
            }
        }
    }

    impl Evm for TestVm {
        fn call(
            &self,
            _state: &mut dyn AppState,
            events: &mut dyn EventSink,
            params: &ExecParams,
            _sender: &Account,
            receiver: &Account,
            code: &[u8],
            _input: &[u8],
            gas: &mut u64,
        ) -> Result<Vec<u8>, VmError> {
            *self.params_seen.lock().unwrap() = Some(params.clone());
            if *gas < self.gas_cost {
                return Err(VmError::Execution("out of gas".into()));
            }
            *gas -= self.gas_cost;
            if let Some((topic, data)) = &self.log {
                events
                    .log(LogEvent::new(
                        *receiver.address(),
                        vec![Word256::left_pad(topic)],
                        data.clone(),
                    ))
                    .map_err(|err| VmError::Execution(format!("{}", err)))?;
            }
            Ok(code.to_vec())
        }
    }

    /// An EVM that always reports an execution failure.
    struct FailVm;

    impl Evm for FailVm {
        fn call(
            &self,
            _state: &mut dyn AppState,
            _events: &mut dyn EventSink,
            _params: &ExecParams,
            _sender: &Account,
            _receiver: &Account,
            _code: &[u8],
            _input: &[u8],
            _gas: &mut u64,
        ) -> Result<Vec<u8>, VmError> {
            Err(VmError::Execution("invalid opcode".into()))
        }
    }

    fn handler() -> SethTransactionHandler {
        SethTransactionHandler::new(Box::new(TestVm::new(100)))
    }

    fn txn_pair(payload: SethTransaction, signer: &[u8]) -> TransactionPair {
        TransactionBuilder::new()
            .with_family_name(FAMILY_NAME.to_string())
            .with_family_version(FAMILY_VERSION.to_string())
            .with_signer_public_key(signer.to_vec())
            .with_payload(payload.into_bytes().expect("Unable to serialize payload"))
            .build_pair()
            .expect("Unable to build transaction pair")
    }

    fn apply(
        handler: &SethTransactionHandler,
        context: &mut TestContext,
        payload: SethTransaction,
        signer: &[u8],
    ) -> Result<(), ApplyError> {
        handler.apply(&txn_pair(payload, signer), context)
    }

    fn bootstrap(handler: &SethTransactionHandler, context: &mut TestContext, signer: &[u8]) {
        apply(
            handler,
            context,
            CreateExternalAccountTxnBuilder::new()
                .with_nonce(0)
                .build()
                .unwrap()
                .into(),
            signer,
        )
        .expect("Bootstrap transaction failed");
    }

    fn get_account(context: &TestContext, addr: &EvmAddr) -> Option<Account> {
        SawtoothAppState::new(context).get_account(addr).unwrap()
    }

    fn last_receipt(context: &TestContext) -> SethTransactionReceipt {
        let data = context.receipt_data();
        SethTransactionReceipt::from_bytes(data.last().expect("No receipt data"))
            .expect("Unable to decode receipt")
    }

    fn assert_invalid(result: Result<(), ApplyError>) {
        match result {
            Err(ApplyError::InvalidTransaction(_)) => (),
            other => panic!("Expected InvalidTransaction, got {:?}", other),
        }
    }

    /// A first transaction from an unknown signer creates the signer's
    /// own account with the global permissions, minus Root, and an
    /// empty receipt.
    #[test]
    fn self_bootstrap() {
        let handler = handler();
        let mut context = TestContext::new();
        let alice = EvmAddr::from_public_key(ALICE_PK);

        bootstrap(&handler, &mut context, ALICE_PK);

        let account = get_account(&context, &alice).expect("Account was not created");
        assert_eq!(account.nonce(), 1);
        assert_eq!(
            *account.permissions(),
            Permissions::new(ALL_PERM_FLAGS & !ROOT, ALL_PERM_FLAGS & !ROOT)
        );
        assert!(account.code().is_empty());

        let receipt = last_receipt(&context);
        assert_eq!(receipt.contract_address(), None);
        assert_eq!(receipt.gas_used(), 0);
        assert!(receipt.return_value().is_empty());

        // The global permissions account was initialized on first use
        let global = get_account(&context, &GLOBAL_PERMISSIONS_ADDRESS).unwrap();
        assert_eq!(*global.permissions(), Permissions::all_set());
    }

    #[test]
    fn self_bootstrap_rejects_existing_account() {
        let handler = handler();
        let mut context = TestContext::new();
        bootstrap(&handler, &mut context, ALICE_PK);

        let result = apply(
            &handler,
            &mut context,
            CreateExternalAccountTxnBuilder::new()
                .with_nonce(0)
                .build()
                .unwrap()
                .into(),
            ALICE_PK,
        );
        assert_invalid(result);
    }

    #[test]
    fn self_bootstrap_rejects_nonzero_nonce() {
        let handler = handler();
        let mut context = TestContext::new();
        let result = apply(
            &handler,
            &mut context,
            CreateExternalAccountTxnBuilder::new()
                .with_nonce(3)
                .build()
                .unwrap()
                .into(),
            ALICE_PK,
        );
        assert_invalid(result);
    }

    /// Creating a contract stores the EVM's return value as the new
    /// account's code at the derived address, bumps the sender's nonce,
    /// and reports the contract address in the receipt.
    #[test]
    fn create_contract() {
        let handler = handler();
        let mut context = TestContext::new();
        let alice = EvmAddr::from_public_key(ALICE_PK);
        bootstrap(&handler, &mut context, ALICE_PK);

        apply(
            &handler,
            &mut context,
            CreateContractAccountTxnBuilder::new()
                .with_nonce(1)
                .with_gas_limit(100_000)
                .with_init(vec![0x60])
                .build()
                .unwrap()
                .into(),
            ALICE_PK,
        )
        .expect("Contract creation failed");

        let sender = get_account(&context, &alice).unwrap();
        assert_eq!(sender.nonce(), 2);

        let contract_address = alice.derive(1);
        let contract = get_account(&context, &contract_address).expect("No contract account");
        assert_eq!(contract.code(), &[0x60]);
        assert_eq!(contract.nonce(), 1);
        // Inherited permissions never include Root
        assert_eq!(contract.permissions().get(ROOT), None);

        let receipt = last_receipt(&context);
        assert_eq!(receipt.contract_address(), Some(&contract_address));
        assert_eq!(receipt.gas_used(), 100);
        assert_eq!(receipt.return_value(), &[0x60]);
    }

    /// Calling the contract created above returns its code as output
    /// and meters gas, leaving storage untouched.
    #[test]
    fn message_call_runs_contract() {
        let handler = handler();
        let mut context = TestContext::new();
        let alice = EvmAddr::from_public_key(ALICE_PK);
        bootstrap(&handler, &mut context, ALICE_PK);

        apply(
            &handler,
            &mut context,
            CreateContractAccountTxnBuilder::new()
                .with_nonce(1)
                .with_gas_limit(100_000)
                .with_init(vec![0x60])
                .build()
                .unwrap()
                .into(),
            ALICE_PK,
        )
        .unwrap();

        let contract_address = alice.derive(1);
        apply(
            &handler,
            &mut context,
            MessageCallTxnBuilder::new()
                .with_nonce(2)
                .with_gas_limit(100_000)
                .with_to(contract_address.to_vec())
                .build()
                .unwrap()
                .into(),
            ALICE_PK,
        )
        .expect("Message call failed");

        let receipt = last_receipt(&context);
        assert_eq!(receipt.return_value(), &[0x60]);
        assert!(receipt.gas_used() > 0);
        assert_eq!(receipt.contract_address(), None);

        assert_eq!(get_account(&context, &alice).unwrap().nonce(), 3);

        // The stub performed no SSTORE, so the contract's storage list
        // stays empty
        let mut mgr = crate::state::StateManager::new(&context);
        assert!(mgr.must_get(&contract_address).unwrap().storage().is_empty());
    }

    /// A nonce that does not match the sender's account is rejected and
    /// leaves state untouched.
    #[test]
    fn nonce_mismatch_leaves_state_unchanged() {
        let handler = handler();
        let mut context = TestContext::new();
        bootstrap(&handler, &mut context, ALICE_PK);

        let before = context.entries();
        let result = apply(
            &handler,
            &mut context,
            CreateContractAccountTxnBuilder::new()
                .with_nonce(5)
                .with_gas_limit(100_000)
                .with_init(vec![0x60])
                .build()
                .unwrap()
                .into(),
            ALICE_PK,
        );
        assert_invalid(result);
        assert_eq!(context.entries(), before);
    }

    /// An account created with an explicit mask carries exactly that
    /// mask; once the global Root grant is revoked, that account cannot
    /// administer permissions.
    #[test]
    fn permission_inheritance_and_revocation() {
        let handler = handler();
        let mut context = TestContext::new();
        let alice = EvmAddr::from_public_key(ALICE_PK);
        let bob = EvmAddr::from_public_key(BOB_PK);
        bootstrap(&handler, &mut context, ALICE_PK);

        // Alice does not govern Root locally, so the check escalates to
        // the global account, which still grants it
        apply(
            &handler,
            &mut context,
            CreateExternalAccountTxnBuilder::new()
                .with_nonce(1)
                .with_to(bob.to_vec())
                .with_permissions(Permissions::new(CALL, CALL))
                .build()
                .unwrap()
                .into(),
            ALICE_PK,
        )
        .expect("Create on behalf failed");

        let bob_account = get_account(&context, &bob).expect("No account for bob");
        assert_eq!(*bob_account.permissions(), Permissions::new(CALL, CALL));
        assert_eq!(bob_account.nonce(), 1);
        assert_eq!(get_account(&context, &alice).unwrap().nonce(), 2);

        // Revoke Root in the global account
        apply(
            &handler,
            &mut context,
            SetPermissionsTxnBuilder::new()
                .with_nonce(2)
                .with_to(GLOBAL_PERMISSIONS_ADDRESS.to_vec())
                .with_permissions(Permissions::new(ALL_PERM_FLAGS & !ROOT, ALL_PERM_FLAGS))
                .build()
                .unwrap()
                .into(),
            ALICE_PK,
        )
        .expect("Global permission change failed");

        // Bob does not govern Root and the global account now denies it
        let result = apply(
            &handler,
            &mut context,
            SetPermissionsTxnBuilder::new()
                .with_nonce(1)
                .with_to(bob.to_vec())
                .with_permissions(Permissions::new(CALL, CALL))
                .build()
                .unwrap()
                .into(),
            BOB_PK,
        );
        assert_invalid(result);
    }

    /// Explicit permissions on account creation require the creator to
    /// hold Root.
    #[test]
    fn explicit_permissions_require_root() {
        let handler = handler();
        let mut context = TestContext::new();
        let bob = EvmAddr::from_public_key(BOB_PK);
        bootstrap(&handler, &mut context, ALICE_PK);

        // Turn the global Root grant off so escalation denies it
        apply(
            &handler,
            &mut context,
            SetPermissionsTxnBuilder::new()
                .with_nonce(1)
                .with_to(GLOBAL_PERMISSIONS_ADDRESS.to_vec())
                .with_permissions(Permissions::new(ALL_PERM_FLAGS & !ROOT, ALL_PERM_FLAGS))
                .build()
                .unwrap()
                .into(),
            ALICE_PK,
        )
        .unwrap();

        let result = apply(
            &handler,
            &mut context,
            CreateExternalAccountTxnBuilder::new()
                .with_nonce(2)
                .with_to(bob.to_vec())
                .with_permissions(Permissions::new(CALL, CALL))
                .build()
                .unwrap()
                .into(),
            ALICE_PK,
        );
        assert_invalid(result);
        assert_eq!(get_account(&context, &bob), None);
    }

    /// Operations whose flag is denied both locally and globally are
    /// rejected.
    #[test]
    fn permission_escalation_denies() {
        let handler = handler();
        let mut context = TestContext::new();
        bootstrap(&handler, &mut context, ALICE_PK);

        // Globally turn off contract creation
        apply(
            &handler,
            &mut context,
            SetPermissionsTxnBuilder::new()
                .with_nonce(1)
                .with_to(GLOBAL_PERMISSIONS_ADDRESS.to_vec())
                .with_permissions(Permissions::new(
                    ALL_PERM_FLAGS & !CREATE_CONTRACT,
                    ALL_PERM_FLAGS,
                ))
                .build()
                .unwrap()
                .into(),
            ALICE_PK,
        )
        .unwrap();

        // Take away Alice's local grant so the check escalates
        let mut state = SawtoothAppState::new(&context);
        let alice = EvmAddr::from_public_key(ALICE_PK);
        let mut account = state.get_account(&alice).unwrap().unwrap();
        account.set_permissions(Permissions::new(0, 0));
        state.update_account(&account).unwrap();

        let result = apply(
            &handler,
            &mut context,
            CreateContractAccountTxnBuilder::new()
                .with_nonce(2)
                .with_gas_limit(100_000)
                .with_init(vec![0x60])
                .build()
                .unwrap()
                .into(),
            ALICE_PK,
        );
        assert_invalid(result);
    }

    /// A contract that emits a log during a message call produces a
    /// seth_log_event carrying the topic and data.
    #[test]
    fn message_call_emits_log_event() {
        let handler =
            SethTransactionHandler::new(Box::new(TestVm::with_log(vec![0xde, 0xad], vec![0xbe, 0xef])));
        let mut context = TestContext::new();
        let alice = EvmAddr::from_public_key(ALICE_PK);
        bootstrap(&handler, &mut context, ALICE_PK);

        // Install the contract account directly so only the call below
        // runs the EVM
        let contract_address = alice.derive(1);
        let mut state = SawtoothAppState::new(&context);
        let contract = AccountBuilder::new()
            .with_address(contract_address)
            .with_code(vec![0x60])
            .with_nonce(1)
            .build()
            .unwrap();
        state.update_account(&contract).unwrap();

        apply(
            &handler,
            &mut context,
            MessageCallTxnBuilder::new()
                .with_nonce(1)
                .with_gas_limit(100_000)
                .with_to(contract_address.to_vec())
                .build()
                .unwrap()
                .into(),
            ALICE_PK,
        )
        .expect("Message call failed");

        let events = context.events();
        assert_eq!(events.len(), 1);
        let event = &events[0];
        assert_eq!(event.event_type, "seth_log_event");
        assert_eq!(event.data, vec![0xbe, 0xef]);
        assert!(event
            .attributes
            .iter()
            .any(|(k, v)| k == "topic1" && v.ends_with("dead")));
        assert!(event
            .attributes
            .iter()
            .any(|(k, v)| k == "address" && *v == hex::encode(contract_address.as_bytes())));
    }

    #[test]
    fn message_call_to_missing_receiver_is_rejected() {
        let handler = handler();
        let mut context = TestContext::new();
        bootstrap(&handler, &mut context, ALICE_PK);

        let result = apply(
            &handler,
            &mut context,
            MessageCallTxnBuilder::new()
                .with_nonce(1)
                .with_gas_limit(100_000)
                .with_to(vec![0x07; 20])
                .build()
                .unwrap()
                .into(),
            ALICE_PK,
        );
        assert_invalid(result);
    }

    #[test]
    fn create_on_behalf_of_existing_account_is_rejected() {
        let handler = handler();
        let mut context = TestContext::new();
        let alice = EvmAddr::from_public_key(ALICE_PK);
        bootstrap(&handler, &mut context, ALICE_PK);

        let result = apply(
            &handler,
            &mut context,
            CreateExternalAccountTxnBuilder::new()
                .with_nonce(1)
                .with_to(alice.to_vec())
                .build()
                .unwrap()
                .into(),
            ALICE_PK,
        );
        assert_invalid(result);
    }

    /// SetPermissions aimed at the sender itself performs a single
    /// update that keeps the nonce bump.
    #[test]
    fn set_permissions_on_self() {
        let handler = handler();
        let mut context = TestContext::new();
        let alice = EvmAddr::from_public_key(ALICE_PK);
        bootstrap(&handler, &mut context, ALICE_PK);

        apply(
            &handler,
            &mut context,
            SetPermissionsTxnBuilder::new()
                .with_nonce(1)
                .with_to(alice.to_vec())
                .with_permissions(Permissions::new(CALL | CREATE_ACCOUNT, ALL_PERM_FLAGS))
                .build()
                .unwrap()
                .into(),
            ALICE_PK,
        )
        .expect("Self permission change failed");

        let account = get_account(&context, &alice).unwrap();
        assert_eq!(account.nonce(), 2);
        assert_eq!(
            *account.permissions(),
            Permissions::new(CALL | CREATE_ACCOUNT, ALL_PERM_FLAGS)
        );
    }

    #[test]
    fn set_permissions_requires_permissions_field() {
        let handler = handler();
        let mut context = TestContext::new();
        bootstrap(&handler, &mut context, ALICE_PK);

        let result = apply(
            &handler,
            &mut context,
            SethTransaction::SetPermissions(Default::default()),
            ALICE_PK,
        );
        assert_invalid(result);
    }

    #[test]
    fn evm_failure_is_an_invalid_transaction() {
        let handler = SethTransactionHandler::new(Box::new(FailVm));
        let mut context = TestContext::new();
        bootstrap(&handler, &mut context, ALICE_PK);

        let result = apply(
            &handler,
            &mut context,
            CreateContractAccountTxnBuilder::new()
                .with_nonce(1)
                .with_gas_limit(100_000)
                .with_init(vec![0x60])
                .build()
                .unwrap()
                .into(),
            ALICE_PK,
        );
        assert_invalid(result);
    }

    #[test]
    fn empty_payload_is_rejected() {
        let handler = handler();
        let mut context = TestContext::new();
        let pair = TransactionBuilder::new()
            .with_family_name(FAMILY_NAME.to_string())
            .with_family_version(FAMILY_VERSION.to_string())
            .with_signer_public_key(ALICE_PK.to_vec())
            .with_payload(vec![])
            .build_pair()
            .unwrap();
        assert_invalid(handler.apply(&pair, &mut context));
    }

    #[test]
    fn garbage_payload_is_rejected() {
        let handler = handler();
        let mut context = TestContext::new();
        let pair = TransactionBuilder::new()
            .with_family_name(FAMILY_NAME.to_string())
            .with_family_version(FAMILY_VERSION.to_string())
            .with_signer_public_key(ALICE_PK.to_vec())
            .with_payload(vec![0xff, 0xff, 0xff, 0xff])
            .build_pair()
            .unwrap();
        assert_invalid(handler.apply(&pair, &mut context));
    }

    #[test]
    fn missing_signer_is_rejected() {
        let handler = handler();
        let mut context = TestContext::new();
        let pair = TransactionBuilder::new()
            .with_family_name(FAMILY_NAME.to_string())
            .with_family_version(FAMILY_VERSION.to_string())
            .with_signer_public_key(vec![])
            .with_payload(
                SethTransaction::from(
                    CreateExternalAccountTxnBuilder::new()
                        .with_nonce(0)
                        .build()
                        .unwrap(),
                )
                .into_bytes()
                .unwrap(),
            )
            .build_pair()
            .unwrap();
        assert_invalid(handler.apply(&pair, &mut context));
    }

    /// Context whose execution-result sink is broken, for driving the
    /// receipt failure path.
    struct NoReceiptContext {
        inner: TestContext,
    }

    impl TransactionContext for NoReceiptContext {
        fn get_state_entry(&self, address: &str) -> Result<Option<Vec<u8>>, ContextError> {
            self.inner.get_state_entry(address)
        }

        fn set_state_entry(&self, address: String, data: Vec<u8>) -> Result<(), ContextError> {
            self.inner.set_state_entry(address, data)
        }

        fn delete_state_entry(&self, address: &str) -> Result<Option<String>, ContextError> {
            self.inner.delete_state_entry(address)
        }

        fn add_receipt_data(&self, _data: Vec<u8>) -> Result<(), ContextError> {
            Err(ContextError::ReceiptError("receipt sink closed".into()))
        }

        fn add_event(
            &self,
            event_type: String,
            attributes: Vec<(String, String)>,
            data: Vec<u8>,
        ) -> Result<(), ContextError> {
            self.inner.add_event(event_type, attributes, data)
        }
    }

    /// A transaction that applies cleanly but whose receipt cannot be
    /// recorded fails with an internal error, not a rejection.
    #[test]
    fn receipt_failure_is_internal() {
        let handler = handler();
        let mut context = NoReceiptContext {
            inner: TestContext::new(),
        };
        let pair = txn_pair(
            CreateExternalAccountTxnBuilder::new()
                .with_nonce(0)
                .build()
                .unwrap()
                .into(),
            ALICE_PK,
        );
        match handler.apply(&pair, &mut context) {
            Err(ApplyError::InternalError(_)) => (),
            other => panic!("Expected InternalError, got {:?}", other),
        }
    }

    /// The EVM's execution parameters come from the block-info family
    /// when its records are present, and zero-initialize otherwise.
    #[test]
    fn exec_params_follow_block_info() {
        let vm = TestVm::new(100);
        let params_seen = vm.params_seen.clone();
        let handler = SethTransactionHandler::new(Box::new(vm));
        let mut context = TestContext::new();
        bootstrap(&handler, &mut context, ALICE_PK);

        context.seed(
            block_info_config_address(),
            BlockInfoConfigBuilder::new()
                .with_latest_block(7)
                .build()
                .into_bytes()
                .unwrap(),
        );
        context.seed(
            block_info_address(7),
            BlockInfoBuilder::new()
                .with_block_num(7)
                .with_header_signature("cd".repeat(64))
                .with_timestamp(1_234_567)
                .build()
                .into_bytes()
                .unwrap(),
        );

        apply(
            &handler,
            &mut context,
            CreateContractAccountTxnBuilder::new()
                .with_nonce(1)
                .with_gas_limit(100_000)
                .with_init(vec![0x60])
                .build()
                .unwrap()
                .into(),
            ALICE_PK,
        )
        .unwrap();

        let params = params_seen.lock().unwrap().clone().unwrap();
        assert_eq!(params.block_height, 7);
        assert_eq!(params.block_time, 1_234_567);
        assert_eq!(params.block_hash, Word256::right_pad(&[0xcd; 64]));
        assert_eq!(params.gas_limit, GAS_LIMIT);
    }

    #[test]
    fn exec_params_zero_without_block_info() {
        let vm = TestVm::new(100);
        let params_seen = vm.params_seen.clone();
        let handler = SethTransactionHandler::new(Box::new(vm));
        let mut context = TestContext::new();
        bootstrap(&handler, &mut context, ALICE_PK);

        apply(
            &handler,
            &mut context,
            CreateContractAccountTxnBuilder::new()
                .with_nonce(1)
                .with_gas_limit(100_000)
                .with_init(vec![0x60])
                .build()
                .unwrap()
                .into(),
            ALICE_PK,
        )
        .unwrap();

        let params = params_seen.lock().unwrap().clone().unwrap();
        assert_eq!(params.block_height, 0);
        assert_eq!(params.block_time, 0);
        assert!(params.block_hash.is_zero());
        assert_eq!(params.gas_limit, GAS_LIMIT);
    }
}
