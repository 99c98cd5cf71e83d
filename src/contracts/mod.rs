//! Contract registry and typed call dispatch.
//!
//! Each contract owns its state behind its own lock. A mutating call runs
//! against a staged copy and is committed only after the ledger accepted the
//! `contract_call` transaction it emits.

pub mod abi;
pub mod nft;
pub mod staking;
pub mod token;

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::chain::LedgerSink;
use crate::clock::Clock;
use crate::config::ContractsConfig;
use crate::error::{ChainError, Result};
use crate::pow::sha256_hex;
use crate::transaction::Transaction;

pub use abi::{ContractFunction, FunctionSignature, Mutability};
use nft::NftState;
use staking::StakingState;
use token::TokenState;

pub const TOKEN_ADDRESS: &str = "0x1000000000000000000000000000000000000001";
pub const NFT_ADDRESS: &str = "0x1000000000000000000000000000000000000002";
pub const STAKING_ADDRESS: &str = "0x1000000000000000000000000000000000000003";

/// Deployer recorded for the built-in contracts.
pub const SYSTEM_DEPLOYER: &str = "system";

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum ContractKind {
    Token,
    Nft,
    Staking,
    Generic,
}

impl fmt::Display for ContractKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ContractKind::Token => "TOKEN",
            ContractKind::Nft => "NFT",
            ContractKind::Staking => "STAKING",
            ContractKind::Generic => "GENERIC",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenericState {
    storage: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ContractState {
    Token(TokenState),
    Nft(NftState),
    Staking(StakingState),
    Generic(GenericState),
}

impl ContractState {
    pub fn kind(&self) -> ContractKind {
        match self {
            ContractState::Token(_) => ContractKind::Token,
            ContractState::Nft(_) => ContractKind::Nft,
            ContractState::Staking(_) => ContractKind::Staking,
            ContractState::Generic(_) => ContractKind::Generic,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Contract {
    pub address: String,
    pub name: String,
    pub code: String,
    pub abi: Vec<FunctionSignature>,
    pub deployer: String,
    pub deployed_at: i64,
    pub is_active: bool,
    state: ContractState,
}

impl Contract {
    pub fn kind(&self) -> ContractKind {
        self.state.kind()
    }
}

/// Public view of a registered contract, without its state.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ContractSummary {
    pub address: String,
    pub kind: ContractKind,
    pub name: String,
    pub deployer: String,
    pub deployed_at: i64,
    pub is_active: bool,
    pub abi: Vec<FunctionSignature>,
}

#[derive(Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct ContractStats {
    pub total_contracts: usize,
    pub active_contracts: usize,
    pub token_contracts: usize,
    pub nft_contracts: usize,
    pub staking_contracts: usize,
    pub generic_contracts: usize,
}

/// Raw call as it arrives from outside: function name plus JSON parameters.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CallRequest {
    pub address: String,
    pub function: String,
    #[serde(default)]
    pub params: Vec<Value>,
    /// Ledger amount carried by the emitted `contract_call` transaction.
    #[serde(default)]
    pub value: i64,
}

fn token_abi() -> Vec<FunctionSignature> {
    vec![
        FunctionSignature::view("balanceOf", &["owner"]),
        FunctionSignature::mutating("transfer", &["to", "amount"]),
        FunctionSignature::mutating("mint", &["to", "amount"]),
        FunctionSignature::mutating("approve", &["spender", "amount"]),
        FunctionSignature::view("allowance", &["owner", "spender"]),
        FunctionSignature::mutating("transferFrom", &["from", "to", "amount"]),
        FunctionSignature::mutating("burn", &["amount"]),
        FunctionSignature::view("tokenInfo", &[]),
    ]
}

fn nft_abi() -> Vec<FunctionSignature> {
    vec![
        FunctionSignature::mutating("mint", &["to", "name", "description", "image"]),
        FunctionSignature::view("ownerOf", &["tokenId"]),
        FunctionSignature::view("tokenMetadata", &["tokenId"]),
        FunctionSignature::mutating("transfer", &["to", "tokenId"]),
        FunctionSignature::mutating("approve", &["approved", "tokenId"]),
        FunctionSignature::view("tokensOf", &["owner"]),
        FunctionSignature::view("collectionStats", &[]),
    ]
}

fn staking_abi() -> Vec<FunctionSignature> {
    vec![
        FunctionSignature::mutating("stake", &["amount"]),
        FunctionSignature::view("getStake", &[]),
        FunctionSignature::mutating("unstake", &["amount"]),
        FunctionSignature::mutating("claimRewards", &[]),
        FunctionSignature::view("poolStats", &[]),
    ]
}

fn to_value<T: Serialize>(value: &T) -> Result<Value> {
    serde_json::to_value(value).map_err(|e| ChainError::execution(format!("failed to encode result: {}", e)))
}

fn read(state: &ContractState, function: &ContractFunction, caller: &str, now: i64) -> Result<Value> {
    match (state, function) {
        (ContractState::Token(t), ContractFunction::BalanceOf { owner }) => Ok(json!(t.balance_of(owner))),
        (ContractState::Token(t), ContractFunction::Allowance { owner, spender }) => Ok(json!(t.allowance(owner, spender))),
        (ContractState::Token(t), ContractFunction::TokenInfo) => to_value(&t.info),
        (ContractState::Nft(n), ContractFunction::OwnerOf { token_id }) => Ok(json!(n.owner_of(*token_id)?)),
        (ContractState::Nft(n), ContractFunction::TokenMetadata { token_id }) => to_value(n.token_metadata(*token_id)?),
        (ContractState::Nft(n), ContractFunction::TokensOf { owner }) => Ok(json!(n.tokens_by_owner(owner))),
        (ContractState::Nft(n), ContractFunction::CollectionStats) => to_value(&n.stats()),
        (ContractState::Staking(s), ContractFunction::GetStake { staker }) => {
            to_value(&s.get_stake(staker.as_deref().unwrap_or(caller), now)?)
        }
        (ContractState::Staking(s), ContractFunction::PoolStats) => to_value(&s.stats()),
        (ContractState::Generic(g), ContractFunction::GetStorage { key }) => {
            Ok(g.storage.get(key).map(|v| json!(v)).unwrap_or(Value::Null))
        }
        _ => Err(ChainError::execution(format!(
            "{} is not a view on {} contracts",
            function.abi_name(),
            state.kind()
        ))),
    }
}

fn apply(state: &mut ContractState, function: &ContractFunction, caller: &str, deployer: &str, now: i64) -> Result<Value> {
    match (state, function) {
        (ContractState::Token(t), ContractFunction::Transfer { to, amount }) => {
            t.transfer(caller, to, *amount)?;
            Ok(json!(true))
        }
        (ContractState::Token(t), ContractFunction::Mint { to, amount }) => {
            t.mint(to, *amount)?;
            Ok(json!(true))
        }
        (ContractState::Token(t), ContractFunction::Approve { spender, amount }) => {
            t.approve(caller, spender, *amount)?;
            Ok(json!(true))
        }
        (ContractState::Token(t), ContractFunction::TransferFrom { from, to, amount }) => {
            t.transfer_from(caller, from, to, *amount)?;
            Ok(json!(true))
        }
        (ContractState::Token(t), ContractFunction::Burn { amount }) => {
            t.burn(caller, *amount)?;
            Ok(json!(true))
        }
        (ContractState::Nft(n), ContractFunction::MintNft { to, name, description, image }) => {
            Ok(json!(n.mint(to, name, description, image, now)))
        }
        (ContractState::Nft(n), ContractFunction::TransferNft { to, token_id }) => {
            n.transfer(caller, to, *token_id)?;
            Ok(json!(true))
        }
        (ContractState::Nft(n), ContractFunction::ApproveNft { approved, token_id }) => {
            n.approve(caller, approved, *token_id)?;
            Ok(json!(true))
        }
        (ContractState::Staking(s), ContractFunction::Stake { amount }) => {
            s.stake(caller, *amount, now)?;
            Ok(json!(true))
        }
        (ContractState::Staking(s), ContractFunction::Unstake { amount }) => {
            s.unstake(caller, *amount, now)?;
            Ok(json!(true))
        }
        (ContractState::Staking(s), ContractFunction::ClaimRewards) => Ok(json!(s.claim_rewards(caller, now)?)),
        (ContractState::Generic(g), ContractFunction::SetStorage { key, value }) => {
            if caller != deployer {
                return Err(ChainError::validation(format!("only {} may write storage", deployer)));
            }
            g.storage.insert(key.clone(), value.clone());
            Ok(json!(true))
        }
        (state, _) => Err(ChainError::execution(format!(
            "{} is not callable on {} contracts",
            function.abi_name(),
            state.kind()
        ))),
    }
}

pub struct ContractRuntime {
    contracts: RwLock<HashMap<String, Arc<Mutex<Contract>>>>,
    ledger: Arc<dyn LedgerSink>,
    clock: Arc<dyn Clock>,
    deploy_counter: AtomicU64,
}

impl ContractRuntime {
    /// Registers the token, NFT and staking contracts at their fixed addresses.
    pub fn new(config: &ContractsConfig, clock: Arc<dyn Clock>, ledger: Arc<dyn LedgerSink>) -> Self {
        let now = clock.now_millis();
        let system = [
            (TOKEN_ADDRESS, "Bitnun Token", token_abi(), ContractState::Token(TokenState::new("Bitnun Token", "BTN", 2, config.token_supply))),
            (NFT_ADDRESS, "Bitnun NFT", nft_abi(), ContractState::Nft(NftState::default())),
            (STAKING_ADDRESS, "Bitnun Staking", staking_abi(), ContractState::Staking(StakingState::new(config))),
        ];

        let mut contracts = HashMap::new();
        for (address, name, abi, state) in system {
            let contract = Contract {
                address: address.to_string(),
                name: name.to_string(),
                code: String::from("builtin"),
                abi,
                deployer: SYSTEM_DEPLOYER.to_string(),
                deployed_at: now,
                is_active: true,
                state,
            };
            contracts.insert(address.to_string(), Arc::new(Mutex::new(contract)));
        }
        info!(count = contracts.len(), "system contracts registered");

        ContractRuntime {
            contracts: RwLock::new(contracts),
            ledger,
            clock,
            deploy_counter: AtomicU64::new(0),
        }
    }

    fn get(&self, address: &str) -> Result<Arc<Mutex<Contract>>> {
        self.contracts
            .read()
            .get(address)
            .cloned()
            .ok_or_else(|| ChainError::not_found(format!("contract {}", address)))
    }

    /// Registers a generic contract with empty storage and emits a `contract_deployment` transaction.
    pub fn deploy(&self, code: &str, abi: Vec<FunctionSignature>, deployer: &str) -> Result<String> {
        let now = self.clock.now_millis();
        let counter = self.deploy_counter.fetch_add(1, Ordering::SeqCst);
        let digest = sha256_hex(format!("{}{}{}{}", deployer, counter, now, code).as_bytes());
        let address = format!("0x{}", &digest[..40]);

        if !self.ledger.submit_transaction(Transaction::new_contract_deployment(deployer, &address, now)) {
            return Err(ChainError::validation(format!("ledger rejected deployment by {}", deployer)));
        }

        let contract = Contract {
            address: address.clone(),
            name: format!("contract-{}", counter),
            code: code.to_string(),
            abi,
            deployer: deployer.to_string(),
            deployed_at: now,
            is_active: true,
            state: ContractState::Generic(GenericState::default()),
        };
        self.contracts.write().insert(address.clone(), Arc::new(Mutex::new(contract)));
        info!(address = %address, deployer, "contract deployed");
        Ok(address)
    }

    /// Only the deployer may deactivate; built-in contracts stay active.
    pub fn deactivate(&self, address: &str, caller: &str) -> Result<()> {
        let contract = self.get(address)?;
        let mut contract = contract.lock();
        if contract.deployer != caller {
            return Err(ChainError::validation(format!("{} did not deploy {}", caller, address)));
        }
        contract.is_active = false;
        info!(address, "contract deactivated");
        Ok(())
    }

    /// Decodes a raw request against the target's kind, then executes it.
    pub fn call(&self, request: &CallRequest, caller: &str) -> Result<Value> {
        let kind = self.get(&request.address)?.lock().kind();
        let function = ContractFunction::decode(kind, &request.function, &request.params)?;
        self.execute(&request.address, &function, caller, request.value)
    }

    /// Runs a typed call. Views return directly; anything else emits exactly one
    /// `contract_call` transaction and commits only if the ledger accepts it.
    pub fn execute(&self, address: &str, function: &ContractFunction, caller: &str, value: i64) -> Result<Value> {
        let contract = self.get(address)?;
        let mut contract = contract.lock();

        if !contract.is_active {
            return Err(ChainError::execution(format!("contract {} is inactive", address)));
        }
        let name = function.abi_name();
        if !contract.abi.iter().any(|sig| sig.name == name) {
            return Err(ChainError::execution(format!("{} is not in the ABI of {}", name, address)));
        }

        let now = self.clock.now_millis();
        if function.is_view() {
            debug!(address, function = name, caller, "view call");
            return read(&contract.state, function, caller, now);
        }

        if value < 0 {
            return Err(ChainError::validation(format!("call value {} is negative", value)));
        }
        let mut staged = contract.state.clone();
        let result = apply(&mut staged, function, caller, &contract.deployer, now)?;

        let payload = serde_json::to_string(function).unwrap_or_default();
        let tx = Transaction::new_contract_call(caller, address, value, payload, now);
        if !self.ledger.submit_transaction(tx) {
            warn!(address, function = name, caller, value, "contract call rejected by ledger");
            return Err(ChainError::validation(format!("{} cannot cover call value {}", caller, value)));
        }

        contract.state = staged;
        info!(address, function = name, caller, "contract call executed");
        Ok(result)
    }

    pub fn summary(&self, address: &str) -> Result<ContractSummary> {
        let contract = self.get(address)?;
        let contract = contract.lock();
        Ok(ContractSummary {
            address: contract.address.clone(),
            kind: contract.kind(),
            name: contract.name.clone(),
            deployer: contract.deployer.clone(),
            deployed_at: contract.deployed_at,
            is_active: contract.is_active,
            abi: contract.abi.clone(),
        })
    }

    pub fn stats(&self) -> ContractStats {
        let contracts = self.contracts.read();
        let mut stats = ContractStats { total_contracts: contracts.len(), ..ContractStats::default() };
        for contract in contracts.values() {
            let contract = contract.lock();
            if contract.is_active {
                stats.active_contracts += 1;
            }
            match contract.kind() {
                ContractKind::Token => stats.token_contracts += 1,
                ContractKind::Nft => stats.nft_contracts += 1,
                ContractKind::Staking => stats.staking_contracts += 1,
                ContractKind::Generic => stats.generic_contracts += 1,
            }
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::Ledger;
    use crate::clock::ManualClock;
    use crate::config::LedgerConfig;
    use crate::transaction::TxType;
    use super::staking::YEAR_MS;

    struct Fixture {
        ledger: Arc<parking_lot::Mutex<Ledger>>,
        clock: Arc<ManualClock>,
        runtime: ContractRuntime,
    }

    fn fixture() -> Fixture {
        let clock = Arc::new(ManualClock::new(1_800_000_000_000));
        let ledger = Arc::new(parking_lot::Mutex::new(Ledger::new(LedgerConfig::default(), clock.clone())));
        let runtime = ContractRuntime::new(&ContractsConfig::default(), clock.clone(), ledger.clone());
        Fixture { ledger, clock, runtime }
    }

    fn req(address: &str, function: &str, params: Vec<Value>) -> CallRequest {
        CallRequest { address: address.into(), function: function.into(), params, value: 0 }
    }

    fn pending_calls(f: &Fixture) -> usize {
        f.ledger
            .lock()
            .pending_transactions()
            .iter()
            .filter(|tx| tx.tx_type == TxType::ContractCall)
            .count()
    }

    #[test]
    fn system_contracts_are_seeded() {
        let f = fixture();
        let supply = f.runtime.call(&req(TOKEN_ADDRESS, "balanceOf", vec![json!("genesis")]), "anyone").unwrap();
        assert_eq!(supply, json!(1_000_000_000));
        let info = f.runtime.call(&req(TOKEN_ADDRESS, "tokenInfo", vec![]), "anyone").unwrap();
        assert_eq!(info["symbol"], "BTN");
        assert_eq!(info["decimals"], 2);
        let pool = f.runtime.call(&req(STAKING_ADDRESS, "poolStats", vec![]), "anyone").unwrap();
        assert_eq!(pool["min_stake"], 10_000);
        assert_eq!(f.runtime.stats().total_contracts, 3);
    }

    #[test]
    fn views_never_emit_transactions() {
        let f = fixture();
        f.runtime.call(&req(TOKEN_ADDRESS, "balanceOf", vec![json!("x")]), "x").unwrap();
        f.runtime.call(&req(NFT_ADDRESS, "collectionStats", vec![]), "x").unwrap();
        assert_eq!(pending_calls(&f), 0);
    }

    #[test]
    fn mutating_call_emits_one_transaction() {
        let f = fixture();
        f.runtime.call(&req(TOKEN_ADDRESS, "transfer", vec![json!("alice"), json!(500)]), "genesis").unwrap();
        assert_eq!(pending_calls(&f), 1);
        let tx = f.ledger.lock().pending_transactions()[0].clone();
        assert_eq!(tx.from_address, "genesis");
        assert_eq!(tx.to_address, TOKEN_ADDRESS);
        assert_eq!(tx.carbon_offset, 5);
        assert!(tx.proof.unwrap().contains("transfer"));

        let bal = f.runtime.call(&req(TOKEN_ADDRESS, "balanceOf", vec![json!("alice")]), "x").unwrap();
        assert_eq!(bal, json!(500));
    }

    #[test]
    fn overdrawn_transfer_changes_nothing() {
        let f = fixture();
        let err = f
            .runtime
            .call(&req(TOKEN_ADDRESS, "transfer", vec![json!("bob"), json!(1)]), "alice")
            .unwrap_err();
        assert!(matches!(err, ChainError::Validation(_)));
        assert_eq!(pending_calls(&f), 0);
        let bal = f.runtime.call(&req(TOKEN_ADDRESS, "balanceOf", vec![json!("bob")]), "x").unwrap();
        assert_eq!(bal, json!(0));
    }

    #[test]
    fn ledger_rejection_rolls_back_state() {
        let f = fixture();
        let mut request = req(TOKEN_ADDRESS, "mint", vec![json!("alice"), json!(10)]);
        request.value = 5;
        let err = f.runtime.call(&request, "pauper").unwrap_err();
        assert!(matches!(err, ChainError::Validation(_)));
        let bal = f.runtime.call(&req(TOKEN_ADDRESS, "balanceOf", vec![json!("alice")]), "x").unwrap();
        assert_eq!(bal, json!(0));
    }

    #[test]
    fn negative_call_value_is_refused() {
        let f = fixture();
        let mut request = req(TOKEN_ADDRESS, "approve", vec![json!("spender"), json!(5)]);
        request.value = -777;
        let err = f.runtime.call(&request, "pauper").unwrap_err();
        assert!(matches!(err, ChainError::Validation(_)));
        assert_eq!(pending_calls(&f), 0);

        let allowance = f.runtime.call(&req(TOKEN_ADDRESS, "allowance", vec![json!("pauper"), json!("spender")]), "x").unwrap();
        assert_eq!(allowance, json!(0));
        f.ledger.lock().mine_pending_transactions("miner", &crate::pow::CancelFlag::new()).unwrap();
        assert_eq!(f.ledger.lock().get_balance("pauper"), 0);
    }

    #[test]
    fn missing_and_unknown() {
        let f = fixture();
        let err = f.runtime.call(&req("0xdead", "balanceOf", vec![json!("a")]), "x").unwrap_err();
        assert!(matches!(err, ChainError::NotFound(_)));
        let err = f.runtime.call(&req(TOKEN_ADDRESS, "selfDestruct", vec![]), "x").unwrap_err();
        assert!(matches!(err, ChainError::Execution(_)));
        let err = f.runtime.call(&req(NFT_ADDRESS, "ownerOf", vec![json!(42)]), "x").unwrap_err();
        assert!(matches!(err, ChainError::NotFound(_)));
    }

    #[test]
    fn typed_call_on_wrong_contract_is_refused() {
        let f = fixture();
        let err = f
            .runtime
            .execute(STAKING_ADDRESS, &ContractFunction::Burn { amount: 1 }, "x", 0)
            .unwrap_err();
        assert!(matches!(err, ChainError::Execution(_)));
    }

    #[test]
    fn nft_mint_then_lookup() {
        let f = fixture();
        let id = f
            .runtime
            .call(&req(NFT_ADDRESS, "mint", vec![json!("alice"), json!("Leaf"), json!("green"), json!("ipfs://leaf")]), "alice")
            .unwrap();
        assert_eq!(id, json!(1));
        let owner = f.runtime.call(&req(NFT_ADDRESS, "ownerOf", vec![json!(1)]), "x").unwrap();
        assert_eq!(owner, json!("alice"));
        let meta = f.runtime.call(&req(NFT_ADDRESS, "tokenMetadata", vec![json!(1)]), "x").unwrap();
        assert_eq!(meta["carbon_offset"], 100);
        assert_eq!(meta["minted_at"], 1_800_000_000_000i64);
    }

    #[test]
    fn tokens_of_lists_owned_ids() {
        let f = fixture();
        for owner in ["alice", "bob", "alice"] {
            f.runtime
                .call(&req(NFT_ADDRESS, "mint", vec![json!(owner), json!("n"), json!("d"), json!("i")]), owner)
                .unwrap();
        }
        f.runtime.call(&req(NFT_ADDRESS, "transfer", vec![json!("carol"), json!(1)]), "alice").unwrap();
        let before = pending_calls(&f);

        let alice = f.runtime.call(&req(NFT_ADDRESS, "tokensOf", vec![json!("alice")]), "x").unwrap();
        let carol = f.runtime.call(&req(NFT_ADDRESS, "tokensOf", vec![json!("carol")]), "x").unwrap();
        let nobody = f.runtime.call(&req(NFT_ADDRESS, "tokensOf", vec![json!("dave")]), "x").unwrap();
        assert_eq!((alice, carol, nobody), (json!([3]), json!([1]), json!([])));
        assert_eq!(pending_calls(&f), before);
    }

    #[test]
    fn stake_accrues_over_a_year() {
        let f = fixture();
        f.runtime.call(&req(STAKING_ADDRESS, "stake", vec![json!(10_000)]), "alice").unwrap();
        f.clock.advance(YEAR_MS as i64);
        let view = f.runtime.call(&req(STAKING_ADDRESS, "getStake", vec![]), "alice").unwrap();
        assert_eq!(view["pending_rewards"], 1250);

        let err = f.runtime.call(&req(STAKING_ADDRESS, "stake", vec![json!(9_999)]), "bob").unwrap_err();
        assert!(matches!(err, ChainError::Validation(_)));
    }

    #[test]
    fn generic_contract_storage_and_deactivation() {
        let f = fixture();
        let abi = vec![
            FunctionSignature::view("getStorage", &["key"]),
            FunctionSignature::mutating("setStorage", &["key", "value"]),
        ];
        let address = f.runtime.deploy("store()", abi, "dev").unwrap();
        assert!(address.starts_with("0x") && address.len() == 42);
        assert_eq!(f.ledger.lock().pending_transactions().last().unwrap().tx_type, TxType::ContractDeployment);

        f.runtime.call(&req(&address, "setStorage", vec![json!("k"), json!("v")]), "dev").unwrap();
        assert!(f.runtime.call(&req(&address, "setStorage", vec![json!("k"), json!("x")]), "other").is_err());
        assert_eq!(f.runtime.call(&req(&address, "getStorage", vec![json!("k")]), "x").unwrap(), json!("v"));
        assert_eq!(f.runtime.call(&req(&address, "getStorage", vec![json!("none")]), "x").unwrap(), Value::Null);

        assert!(f.runtime.deactivate(&address, "other").is_err());
        f.runtime.deactivate(&address, "dev").unwrap();
        let err = f.runtime.call(&req(&address, "getStorage", vec![json!("k")]), "x").unwrap_err();
        assert!(matches!(err, ChainError::Execution(_)));

        let stats = f.runtime.stats();
        assert_eq!(stats.total_contracts, 4);
        assert_eq!(stats.active_contracts, 3);
        assert_eq!(stats.generic_contracts, 1);
        assert!(!f.runtime.summary(&address).unwrap().is_active);
    }

    #[test]
    fn function_missing_from_abi_is_refused() {
        let f = fixture();
        let address = f.runtime.deploy("ro()", vec![FunctionSignature::view("getStorage", &["key"])], "dev").unwrap();
        let err = f.runtime.call(&req(&address, "setStorage", vec![json!("k"), json!("v")]), "dev").unwrap_err();
        assert!(matches!(err, ChainError::Execution(_)));
    }
}
