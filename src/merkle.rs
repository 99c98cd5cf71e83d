//! Merkle aggregation over transaction ids.
//!
//! Leaves are `sha256(id)` in list order, levels combine `sha256(left + right)`
//! over the hex strings, and an odd level pairs its last hash with itself.

use serde::{Deserialize, Serialize};

use crate::pow::sha256_hex;

/// Root of an empty list.
pub const EMPTY_ROOT: &str = "0";

fn combine(left: &str, right: &str) -> String {
    sha256_hex(format!("{}{}", left, right).as_bytes())
}

fn leaves<S: AsRef<str>>(ids: &[S]) -> Vec<String> {
    ids.iter().map(|id| sha256_hex(id.as_ref().as_bytes())).collect()
}

fn next_level(level: &[String]) -> Vec<String> {
    level
        .chunks(2)
        .map(|pair| match pair {
            [left, right] => combine(left, right),
            [single] => combine(single, single),
            _ => unreachable!("chunks(2) yields one or two items"),
        })
        .collect()
}

pub fn root<S: AsRef<str>>(ids: &[S]) -> String {
    if ids.is_empty() {
        return EMPTY_ROOT.to_string();
    }
    let mut level = leaves(ids);
    while level.len() > 1 {
        level = next_level(&level);
    }
    level.swap_remove(0)
}

/// Which side the sibling sits on when folding a proof step.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ProofStep {
    pub sibling: String,
    pub side: Side,
}

/// Audit path for the leaf at `index`, or `None` when out of range.
pub fn proof<S: AsRef<str>>(ids: &[S], index: usize) -> Option<Vec<ProofStep>> {
    if index >= ids.len() {
        return None;
    }
    let mut steps = Vec::new();
    let mut level = leaves(ids);
    let mut pos = index;
    while level.len() > 1 {
        let (sibling, side) = if pos % 2 == 0 {
            // Odd tail pairs with itself
            let sib = level.get(pos + 1).unwrap_or(&level[pos]).clone();
            (sib, Side::Right)
        } else {
            (level[pos - 1].clone(), Side::Left)
        };
        steps.push(ProofStep { sibling, side });
        level = next_level(&level);
        pos /= 2;
    }
    Some(steps)
}

pub fn verify(leaf_id: &str, steps: &[ProofStep], expected_root: &str) -> bool {
    let folded = steps.iter().fold(sha256_hex(leaf_id.as_bytes()), |acc, step| match step.side {
        Side::Left => combine(&step.sibling, &acc),
        Side::Right => combine(&acc, &step.sibling),
    });
    folded == expected_root
}
