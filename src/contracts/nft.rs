use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};

use crate::error::{ChainError, Result};

/// Carbon-offset credit attached to every minted token.
pub const CARBON_OFFSET_PER_NFT: i64 = 100;

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct NftMetadata {
    pub token_id: u64,
    pub name: String,
    pub description: String,
    pub image: String,
    pub attributes: BTreeMap<String, String>,
    pub carbon_offset: i64,
    pub minted_at: i64,
    pub creator: String,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct CollectionStats {
    pub total_nfts: usize,
    pub total_carbon_offset: i64,
    pub unique_owners: usize,
    pub next_token_id: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NftState {
    next_token_id: u64,
    total_carbon_offset: i64,
    tokens: BTreeMap<u64, NftMetadata>,
    owners: HashMap<u64, String>,
    approvals: HashMap<u64, String>,
}

impl Default for NftState {
    fn default() -> Self {
        NftState {
            next_token_id: 1,
            total_carbon_offset: 0,
            tokens: BTreeMap::new(),
            owners: HashMap::new(),
            approvals: HashMap::new(),
        }
    }
}

fn default_attributes() -> BTreeMap<String, String> {
    [
        ("sustainability", "carbon-negative"),
        ("blockchain", "bitnun"),
        ("token_standard", "BNFT-721"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

impl NftState {
    pub fn mint(&mut self, to: &str, name: &str, description: &str, image: &str, now: i64) -> u64 {
        let token_id = self.next_token_id;
        self.next_token_id += 1;

        self.tokens.insert(
            token_id,
            NftMetadata {
                token_id,
                name: name.to_string(),
                description: description.to_string(),
                image: image.to_string(),
                attributes: default_attributes(),
                carbon_offset: CARBON_OFFSET_PER_NFT,
                minted_at: now,
                creator: to.to_string(),
            },
        );
        self.owners.insert(token_id, to.to_string());
        self.total_carbon_offset += CARBON_OFFSET_PER_NFT;
        token_id
    }

    pub fn owner_of(&self, token_id: u64) -> Result<&str> {
        self.owners
            .get(&token_id)
            .map(String::as_str)
            .ok_or_else(|| ChainError::not_found(format!("token #{}", token_id)))
    }

    pub fn token_metadata(&self, token_id: u64) -> Result<&NftMetadata> {
        self.tokens
            .get(&token_id)
            .ok_or_else(|| ChainError::not_found(format!("token #{}", token_id)))
    }

    /// Owner or the approved address may move a token; approval is cleared on transfer.
    pub fn transfer(&mut self, caller: &str, to: &str, token_id: u64) -> Result<()> {
        let owner = self.owner_of(token_id)?;
        let approved = self.approvals.get(&token_id).map(String::as_str);
        if caller != owner && approved != Some(caller) {
            return Err(ChainError::validation(format!("{} may not transfer token #{}", caller, token_id)));
        }
        self.owners.insert(token_id, to.to_string());
        self.approvals.remove(&token_id);
        Ok(())
    }

    pub fn approve(&mut self, caller: &str, approved: &str, token_id: u64) -> Result<()> {
        if self.owner_of(token_id)? != caller {
            return Err(ChainError::validation(format!("{} does not own token #{}", caller, token_id)));
        }
        self.approvals.insert(token_id, approved.to_string());
        Ok(())
    }

    pub fn tokens_by_owner(&self, owner: &str) -> Vec<u64> {
        let mut ids: Vec<u64> = self
            .owners
            .iter()
            .filter(|(_, o)| o.as_str() == owner)
            .map(|(id, _)| *id)
            .collect();
        ids.sort_unstable();
        ids
    }

    pub fn stats(&self) -> CollectionStats {
        CollectionStats {
            total_nfts: self.tokens.len(),
            total_carbon_offset: self.total_carbon_offset,
            unique_owners: self.owners.values().collect::<HashSet<_>>().len(),
            next_token_id: self.next_token_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mint_allocates_sequential_ids_and_offsets() {
        let mut nft = NftState::default();
        assert_eq!(nft.mint("alice", "Leaf", "a leaf", "ipfs://leaf", 10), 1);
        assert_eq!(nft.mint("bob", "Tree", "a tree", "ipfs://tree", 11), 2);

        let meta = nft.token_metadata(1).unwrap();
        assert_eq!(meta.carbon_offset, 100);
        assert_eq!(meta.attributes["token_standard"], "BNFT-721");
        assert_eq!(nft.owner_of(2).unwrap(), "bob");

        let stats = nft.stats();
        assert_eq!(stats.total_nfts, 2);
        assert_eq!(stats.total_carbon_offset, 200);
        assert_eq!(stats.next_token_id, 3);
        assert_eq!(stats.unique_owners, 2);
    }

    #[test]
    fn unknown_token_is_not_found() {
        let nft = NftState::default();
        assert!(matches!(nft.owner_of(9), Err(ChainError::NotFound(_))));
        assert!(matches!(nft.token_metadata(9), Err(ChainError::NotFound(_))));
    }

    #[test]
    fn approved_address_can_transfer_once() {
        let mut nft = NftState::default();
        let id = nft.mint("alice", "n", "d", "i", 0);
        assert!(nft.transfer("mallory", "mallory", id).is_err());
        assert!(nft.approve("mallory", "mallory", id).is_err());

        nft.approve("alice", "carol", id).unwrap();
        nft.transfer("carol", "dave", id).unwrap();
        assert_eq!(nft.owner_of(id).unwrap(), "dave");
        assert!(nft.transfer("carol", "carol", id).is_err());
        assert_eq!(nft.tokens_by_owner("dave"), vec![id]);
    }
}
