use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::ContractKind;
use crate::error::{ChainError, Result};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Mutability {
    View,
    Mutating,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct FunctionSignature {
    pub name: String,
    pub inputs: Vec<String>,
    pub mutability: Mutability,
}

impl FunctionSignature {
    pub fn view(name: &str, inputs: &[&str]) -> Self {
        FunctionSignature {
            name: name.to_string(),
            inputs: inputs.iter().map(|s| s.to_string()).collect(),
            mutability: Mutability::View,
        }
    }

    pub fn mutating(name: &str, inputs: &[&str]) -> Self {
        FunctionSignature {
            name: name.to_string(),
            inputs: inputs.iter().map(|s| s.to_string()).collect(),
            mutability: Mutability::Mutating,
        }
    }
}

/// One variant per callable function. Decoded and checked before any state is touched.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "function", rename_all = "snake_case")]
pub enum ContractFunction {
    // token
    BalanceOf { owner: String },
    Transfer { to: String, amount: i64 },
    Mint { to: String, amount: i64 },
    Approve { spender: String, amount: i64 },
    Allowance { owner: String, spender: String },
    TransferFrom { from: String, to: String, amount: i64 },
    Burn { amount: i64 },
    TokenInfo,
    // nft
    MintNft { to: String, name: String, description: String, image: String },
    OwnerOf { token_id: u64 },
    TokenMetadata { token_id: u64 },
    TransferNft { to: String, token_id: u64 },
    ApproveNft { approved: String, token_id: u64 },
    TokensOf { owner: String },
    CollectionStats,
    // staking
    Stake { amount: i64 },
    /// `None` means the caller's own stake.
    GetStake { staker: Option<String> },
    Unstake { amount: i64 },
    ClaimRewards,
    PoolStats,
    // generic
    GetStorage { key: String },
    SetStorage { key: String, value: String },
}

impl ContractFunction {
    /// Name as it appears in the contract ABI.
    pub fn abi_name(&self) -> &'static str {
        use ContractFunction::*;
        match self {
            BalanceOf { .. } => "balanceOf",
            Transfer { .. } | TransferNft { .. } => "transfer",
            Mint { .. } | MintNft { .. } => "mint",
            Approve { .. } | ApproveNft { .. } => "approve",
            Allowance { .. } => "allowance",
            TransferFrom { .. } => "transferFrom",
            Burn { .. } => "burn",
            TokenInfo => "tokenInfo",
            OwnerOf { .. } => "ownerOf",
            TokenMetadata { .. } => "tokenMetadata",
            TokensOf { .. } => "tokensOf",
            CollectionStats => "collectionStats",
            Stake { .. } => "stake",
            GetStake { .. } => "getStake",
            Unstake { .. } => "unstake",
            ClaimRewards => "claimRewards",
            PoolStats => "poolStats",
            GetStorage { .. } => "getStorage",
            SetStorage { .. } => "setStorage",
        }
    }

    /// Read-only calls never emit a ledger transaction.
    pub fn is_view(&self) -> bool {
        matches!(
            self,
            ContractFunction::BalanceOf { .. }
                | ContractFunction::Allowance { .. }
                | ContractFunction::TokenInfo
                | ContractFunction::OwnerOf { .. }
                | ContractFunction::TokenMetadata { .. }
                | ContractFunction::TokensOf { .. }
                | ContractFunction::CollectionStats
                | ContractFunction::GetStake { .. }
                | ContractFunction::PoolStats
                | ContractFunction::GetStorage { .. }
        )
    }

    /// Kind of contract the function belongs to.
    pub fn kind(&self) -> ContractKind {
        use ContractFunction::*;
        match self {
            BalanceOf { .. } | Transfer { .. } | Mint { .. } | Approve { .. } | Allowance { .. } | TransferFrom { .. }
            | Burn { .. } | TokenInfo => ContractKind::Token,
            MintNft { .. } | OwnerOf { .. } | TokenMetadata { .. } | TransferNft { .. } | ApproveNft { .. }
            | TokensOf { .. } | CollectionStats => ContractKind::Nft,
            Stake { .. } | GetStake { .. } | Unstake { .. } | ClaimRewards | PoolStats => ContractKind::Staking,
            GetStorage { .. } | SetStorage { .. } => ContractKind::Generic,
        }
    }

    /// Turns a raw `(name, params)` pair into a typed call for a contract of `kind`.
    ///
    /// Unknown names are execution errors; wrong arity or types are validation errors.
    pub fn decode(kind: ContractKind, name: &str, params: &[Value]) -> Result<Self> {
        let p = Params { function: name, values: params };
        let function = match (kind, name) {
            (ContractKind::Token, "balanceOf") => {
                p.arity(1)?;
                ContractFunction::BalanceOf { owner: p.string(0)? }
            }
            (ContractKind::Token, "transfer") => {
                p.arity(2)?;
                ContractFunction::Transfer { to: p.string(0)?, amount: p.amount(1)? }
            }
            (ContractKind::Token, "mint") => {
                p.arity(2)?;
                ContractFunction::Mint { to: p.string(0)?, amount: p.amount(1)? }
            }
            (ContractKind::Token, "approve") => {
                p.arity(2)?;
                ContractFunction::Approve { spender: p.string(0)?, amount: p.amount(1)? }
            }
            (ContractKind::Token, "allowance") => {
                p.arity(2)?;
                ContractFunction::Allowance { owner: p.string(0)?, spender: p.string(1)? }
            }
            (ContractKind::Token, "transferFrom") => {
                p.arity(3)?;
                ContractFunction::TransferFrom { from: p.string(0)?, to: p.string(1)?, amount: p.amount(2)? }
            }
            (ContractKind::Token, "burn") => {
                p.arity(1)?;
                ContractFunction::Burn { amount: p.amount(0)? }
            }
            (ContractKind::Token, "tokenInfo") => {
                p.arity(0)?;
                ContractFunction::TokenInfo
            }
            (ContractKind::Nft, "mint") => {
                p.arity(4)?;
                ContractFunction::MintNft {
                    to: p.string(0)?,
                    name: p.string(1)?,
                    description: p.string(2)?,
                    image: p.string(3)?,
                }
            }
            (ContractKind::Nft, "ownerOf") => {
                p.arity(1)?;
                ContractFunction::OwnerOf { token_id: p.token_id(0)? }
            }
            (ContractKind::Nft, "tokenMetadata") => {
                p.arity(1)?;
                ContractFunction::TokenMetadata { token_id: p.token_id(0)? }
            }
            (ContractKind::Nft, "transfer") => {
                p.arity(2)?;
                ContractFunction::TransferNft { to: p.string(0)?, token_id: p.token_id(1)? }
            }
            (ContractKind::Nft, "approve") => {
                p.arity(2)?;
                ContractFunction::ApproveNft { approved: p.string(0)?, token_id: p.token_id(1)? }
            }
            (ContractKind::Nft, "tokensOf") => {
                p.arity(1)?;
                ContractFunction::TokensOf { owner: p.string(0)? }
            }
            (ContractKind::Nft, "collectionStats") => {
                p.arity(0)?;
                ContractFunction::CollectionStats
            }
            (ContractKind::Staking, "stake") => {
                p.arity(1)?;
                ContractFunction::Stake { amount: p.amount(0)? }
            }
            (ContractKind::Staking, "getStake") => match params.len() {
                0 => ContractFunction::GetStake { staker: None },
                _ => {
                    p.arity(1)?;
                    ContractFunction::GetStake { staker: Some(p.string(0)?) }
                }
            },
            (ContractKind::Staking, "unstake") => {
                p.arity(1)?;
                ContractFunction::Unstake { amount: p.amount(0)? }
            }
            (ContractKind::Staking, "claimRewards") => {
                p.arity(0)?;
                ContractFunction::ClaimRewards
            }
            (ContractKind::Staking, "poolStats") => {
                p.arity(0)?;
                ContractFunction::PoolStats
            }
            (ContractKind::Generic, "getStorage") => {
                p.arity(1)?;
                ContractFunction::GetStorage { key: p.string(0)? }
            }
            (ContractKind::Generic, "setStorage") => {
                p.arity(2)?;
                ContractFunction::SetStorage { key: p.string(0)?, value: p.string(1)? }
            }
            _ => return Err(ChainError::execution(format!("unknown function '{}' on {} contract", name, kind))),
        };
        Ok(function)
    }
}

struct Params<'a> {
    function: &'a str,
    values: &'a [Value],
}

impl Params<'_> {
    fn arity(&self, expected: usize) -> Result<()> {
        if self.values.len() != expected {
            return Err(ChainError::validation(format!(
                "{} expects {} parameter(s), got {}",
                self.function,
                expected,
                self.values.len()
            )));
        }
        Ok(())
    }

    fn invalid(&self, index: usize, what: &str) -> ChainError {
        ChainError::validation(format!("{}: parameter {} must be {}", self.function, index, what))
    }

    fn string(&self, index: usize) -> Result<String> {
        match self.values.get(index) {
            Some(Value::String(s)) => Ok(s.clone()),
            _ => Err(self.invalid(index, "a string")),
        }
    }

    // Numbers may arrive as JSON numbers or numeric strings
    fn amount(&self, index: usize) -> Result<i64> {
        match self.values.get(index) {
            Some(Value::Number(n)) => n.as_i64().ok_or_else(|| self.invalid(index, "an integer")),
            Some(Value::String(s)) => s.trim().parse().map_err(|_| self.invalid(index, "an integer")),
            _ => Err(self.invalid(index, "an integer")),
        }
    }

    fn token_id(&self, index: usize) -> Result<u64> {
        match self.values.get(index) {
            Some(Value::Number(n)) => n.as_u64().ok_or_else(|| self.invalid(index, "a token id")),
            Some(Value::String(s)) => s.trim().parse().map_err(|_| self.invalid(index, "a token id")),
            _ => Err(self.invalid(index, "a token id")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_by_contract_kind() {
        let f = ContractFunction::decode(ContractKind::Token, "transfer", &[json!("bob"), json!(50)]).unwrap();
        assert_eq!(f, ContractFunction::Transfer { to: "bob".into(), amount: 50 });
        assert!(!f.is_view());

        let f = ContractFunction::decode(ContractKind::Nft, "transfer", &[json!("bob"), json!("3")]).unwrap();
        assert_eq!(f, ContractFunction::TransferNft { to: "bob".into(), token_id: 3 });
        assert_eq!(f.abi_name(), "transfer");
        assert_eq!(f.kind(), ContractKind::Nft);
    }

    #[test]
    fn view_allowlist() {
        let views = [
            ContractFunction::decode(ContractKind::Token, "balanceOf", &[json!("a")]).unwrap(),
            ContractFunction::decode(ContractKind::Nft, "ownerOf", &[json!(1)]).unwrap(),
            ContractFunction::decode(ContractKind::Nft, "tokenMetadata", &[json!(1)]).unwrap(),
            ContractFunction::decode(ContractKind::Nft, "tokensOf", &[json!("a")]).unwrap(),
            ContractFunction::decode(ContractKind::Staking, "getStake", &[]).unwrap(),
        ];
        assert!(views.iter().all(ContractFunction::is_view));
        assert!(!ContractFunction::Stake { amount: 1 }.is_view());
        assert!(!ContractFunction::MintNft { to: "a".into(), name: "n".into(), description: "d".into(), image: "i".into() }.is_view());
    }

    #[test]
    fn unknown_function_is_execution_error() {
        let err = ContractFunction::decode(ContractKind::Staking, "transfer", &[]).unwrap_err();
        assert!(matches!(err, ChainError::Execution(_)));
    }

    #[test]
    fn malformed_parameters_are_validation_errors() {
        let err = ContractFunction::decode(ContractKind::Token, "transfer", &[json!("bob")]).unwrap_err();
        assert!(matches!(err, ChainError::Validation(_)));

        let err = ContractFunction::decode(ContractKind::Token, "transfer", &[json!("bob"), json!("lots")]).unwrap_err();
        assert!(matches!(err, ChainError::Validation(_)));

        let err = ContractFunction::decode(ContractKind::Nft, "ownerOf", &[json!(-1)]).unwrap_err();
        assert!(matches!(err, ChainError::Validation(_)));
    }

    #[test]
    fn get_stake_takes_optional_staker() {
        let own = ContractFunction::decode(ContractKind::Staking, "getStake", &[]).unwrap();
        assert_eq!(own, ContractFunction::GetStake { staker: None });
        let other = ContractFunction::decode(ContractKind::Staking, "getStake", &[json!("bob")]).unwrap();
        assert_eq!(other, ContractFunction::GetStake { staker: Some("bob".into()) });
    }
}
