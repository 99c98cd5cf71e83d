use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// `from_address` of system-minted transactions (genesis, rewards, bonuses).
pub const SYSTEM_ADDRESS: &str = "";
pub const GENESIS_ADDRESS: &str = "genesis";

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TxType {
    Genesis,
    Transfer,
    MiningReward,
    ActionMining,
    MilestoneBonus,
    ContractCall,
    ContractDeployment,
}

// Field order is part of the block hash preimage (serde_json keeps declaration order).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Transaction {
    pub id: String,
    pub from_address: String,
    pub to_address: String,
    pub amount: i64,
    pub timestamp: i64,
    pub tx_type: TxType,
    /// Serialized action proof or contract call payload.
    pub proof: Option<String>,
    pub carbon_offset: i64,
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

impl Transaction {
    pub fn new(from_address: &str, to_address: &str, amount: i64, timestamp: i64) -> Self {
        Transaction {
            id: new_id(),
            from_address: from_address.to_string(),
            to_address: to_address.to_string(),
            amount,
            timestamp,
            tx_type: TxType::Transfer,
            proof: None,
            carbon_offset: 10,
        }
    }

    pub fn new_genesis(total_supply: i64, timestamp: i64) -> Self {
        Transaction {
            id: String::from("genesis"),
            from_address: SYSTEM_ADDRESS.to_string(),
            to_address: GENESIS_ADDRESS.to_string(),
            amount: total_supply,
            timestamp,
            tx_type: TxType::Genesis,
            proof: None,
            carbon_offset: 0,
        }
    }

    pub fn new_mining_reward(miner_address: &str, reward: i64, timestamp: i64) -> Self {
        Transaction {
            id: new_id(),
            from_address: SYSTEM_ADDRESS.to_string(),
            to_address: miner_address.to_string(),
            amount: reward,
            timestamp,
            tx_type: TxType::MiningReward,
            proof: None,
            carbon_offset: 15,
        }
    }

    /// System-minted reward for a scored user action. Shares weigh double in carbon offset.
    pub fn new_action_reward(user_address: &str, action_type: &str, reward: i64, proof_json: String, timestamp: i64) -> Self {
        Transaction {
            id: new_id(),
            from_address: SYSTEM_ADDRESS.to_string(),
            to_address: user_address.to_string(),
            amount: reward,
            timestamp,
            tx_type: TxType::ActionMining,
            proof: Some(proof_json),
            carbon_offset: if action_type == "share" { 10 } else { 5 },
        }
    }

    pub fn new_milestone_bonus(user_address: &str, bonus: i64, timestamp: i64) -> Self {
        Transaction {
            id: new_id(),
            from_address: SYSTEM_ADDRESS.to_string(),
            to_address: user_address.to_string(),
            amount: bonus,
            timestamp,
            tx_type: TxType::MilestoneBonus,
            proof: None,
            carbon_offset: 25,
        }
    }

    pub fn new_contract_call(caller: &str, contract_address: &str, value: i64, payload: String, timestamp: i64) -> Self {
        Transaction {
            id: new_id(),
            from_address: caller.to_string(),
            to_address: contract_address.to_string(),
            amount: value,
            timestamp,
            tx_type: TxType::ContractCall,
            proof: Some(payload),
            carbon_offset: 5,
        }
    }

    pub fn new_contract_deployment(deployer: &str, contract_address: &str, timestamp: i64) -> Self {
        Transaction {
            id: new_id(),
            from_address: deployer.to_string(),
            to_address: contract_address.to_string(),
            amount: 0,
            timestamp,
            tx_type: TxType::ContractDeployment,
            proof: None,
            carbon_offset: 50,
        }
    }

    /// System mints skip the balance check.
    pub fn is_system(&self) -> bool {
        self.from_address == SYSTEM_ADDRESS
    }
}
