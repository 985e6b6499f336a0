//! Per-seller money within one purchase: subtotals at creation and
//! attribution of proof-of-payment files at confirmation.
//!
//! Both sides iterate sellers in ascending id order. The creation response
//! lists `paymentDetails` in that order and positional proof lists are paired
//! against the same order.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::errors::ServiceError;
use crate::services::cart_validator::parse_identity;
use crate::services::pricing::checked_sum;

/// Rounded line totals accumulated per seller, ascending by seller id
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SellerSubtotals {
    by_seller: BTreeMap<i32, i64>,
}

impl SellerSubtotals {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, seller_id: i32, amount: i64) -> Result<(), ServiceError> {
        let entry = self.by_seller.entry(seller_id).or_insert(0);
        *entry = checked_sum(*entry, amount)?;
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = (i32, i64)> + '_ {
        self.by_seller.iter().map(|(seller, amount)| (*seller, *amount))
    }

    pub fn seller_ids(&self) -> Vec<i32> {
        self.by_seller.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.by_seller.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_seller.is_empty()
    }

    pub fn total(&self) -> Result<i64, ServiceError> {
        self.by_seller
            .values()
            .try_fold(0i64, |acc, amount| checked_sum(acc, *amount))
    }
}

/// Explicit attribution of one proof file to one seller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SellerProof {
    #[schema(example = "12")]
    pub seller_id: String,
    #[schema(example = "101")]
    pub file_id: String,
}

/// Proof references submitted by the buyer, with every id already parsed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProofSubmission {
    /// One file per seller, in ascending seller order
    Positional(Vec<i32>),
    /// Each file names the seller it pays
    PerSeller(Vec<AttributedProof>),
}

impl ProofSubmission {
    /// Parses `fileIds` as sent on the wire.
    pub fn positional(file_ids: &[String]) -> Result<Self, ServiceError> {
        file_ids
            .iter()
            .map(|raw| parse_wire_id("file", raw))
            .collect::<Result<Vec<_>, _>>()
            .map(ProofSubmission::Positional)
    }

    /// Parses explicit `{sellerId, fileId}` pairs as sent on the wire.
    pub fn per_seller(proofs: &[SellerProof]) -> Result<Self, ServiceError> {
        proofs
            .iter()
            .map(|proof| {
                Ok(AttributedProof {
                    seller_id: parse_wire_id("seller", &proof.seller_id)?,
                    file_id: parse_wire_id("file", &proof.file_id)?,
                })
            })
            .collect::<Result<Vec<_>, ServiceError>>()
            .map(ProofSubmission::PerSeller)
    }

    pub fn len(&self) -> usize {
        match self {
            ProofSubmission::Positional(files) => files.len(),
            ProofSubmission::PerSeller(proofs) => proofs.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A proof file attributed to a seller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributedProof {
    pub seller_id: i32,
    pub file_id: i32,
}

fn parse_wire_id(kind: &str, raw: &str) -> Result<i32, ServiceError> {
    parse_identity(raw.trim())
        .ok_or_else(|| ServiceError::ValidationError(format!("invalid {} id '{}'", kind, raw)))
}

fn count_mismatch(files: usize, sellers: usize) -> ServiceError {
    ServiceError::Conflict(format!(
        "number of file IDs ({}) must match number of sellers ({})",
        files, sellers
    ))
}

/// Pairs submitted proofs with the purchase's sellers. `sellers` must be
/// ascending and distinct. The result follows seller order.
pub fn attribute_proofs(
    sellers: &[i32],
    submission: &ProofSubmission,
) -> Result<Vec<AttributedProof>, ServiceError> {
    if submission.len() != sellers.len() {
        return Err(count_mismatch(submission.len(), sellers.len()));
    }

    match submission {
        ProofSubmission::Positional(files) => Ok(sellers
            .iter()
            .zip(files)
            .map(|(seller_id, file_id)| AttributedProof {
                seller_id: *seller_id,
                file_id: *file_id,
            })
            .collect()),
        ProofSubmission::PerSeller(proofs) => {
            let known: BTreeSet<i32> = sellers.iter().copied().collect();
            let mut by_seller = BTreeMap::new();
            for proof in proofs {
                if !known.contains(&proof.seller_id) {
                    return Err(ServiceError::Conflict(format!(
                        "seller {} is not part of this purchase",
                        proof.seller_id
                    )));
                }
                if by_seller.insert(proof.seller_id, proof.file_id).is_some() {
                    return Err(ServiceError::Conflict(format!(
                        "seller {} has more than one proof",
                        proof.seller_id
                    )));
                }
            }
            Ok(by_seller
                .into_iter()
                .map(|(seller_id, file_id)| AttributedProof { seller_id, file_id })
                .collect())
        }
    }
}
