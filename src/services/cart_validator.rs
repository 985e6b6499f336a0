//! Input checks for a purchase request. Pure: no I/O, runs before any
//! transaction is opened.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use utoipa::ToSchema;

use crate::errors::ServiceError;

pub const SENDER_NAME_MIN: usize = 4;
pub const SENDER_NAME_MAX: usize = 55;

static PHONE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\+[1-9]\d{1,14}$").expect("phone pattern compiles"));
static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9\-]+(\.[A-Za-z0-9\-]+)*\.[A-Za-z]{2,}$")
        .expect("email pattern compiles")
});

/// How the buyer can be reached about the purchase
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize, ToSchema,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ContactType {
    Email,
    Phone,
}

impl ContactType {
    pub fn accepts(&self, detail: &str) -> bool {
        match self {
            ContactType::Email => EMAIL_RE.is_match(detail),
            ContactType::Phone => PHONE_RE.is_match(detail),
        }
    }
}

/// One requested line as it arrives on the wire
#[derive(Debug, Clone)]
pub struct CartLineInput {
    pub product_id: String,
    pub qty: i64,
}

/// A purchase request before validation
#[derive(Debug, Clone)]
pub struct CartInput {
    pub lines: Vec<CartLineInput>,
    pub sender_name: String,
    pub sender_contact_type: String,
    pub sender_contact_detail: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CartLine {
    pub product_id: i32,
    pub qty: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sender {
    pub name: String,
    pub contact_type: ContactType,
    pub contact_detail: String,
}

/// A cart whose identities are parsed and whose quantities are positive.
/// Lines keep their submission order; the same product may appear twice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedCart {
    pub lines: Vec<CartLine>,
    pub sender: Sender,
}

impl ValidatedCart {
    /// Total requested quantity per product, ascending by product id.
    pub fn requested_per_product(&self) -> BTreeMap<i32, i64> {
        let mut requested = BTreeMap::new();
        for line in &self.lines {
            *requested.entry(line.product_id).or_insert(0) += i64::from(line.qty);
        }
        requested
    }
}

/// Parses a wire identity: decimal digits only, strictly positive, fits i32.
pub fn parse_identity(raw: &str) -> Option<i32> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse::<i32>().ok().filter(|id| *id > 0)
}

pub fn validate_cart(input: CartInput) -> Result<ValidatedCart, ServiceError> {
    if input.lines.is_empty() {
        return Err(ServiceError::ValidationError(
            "purchasedItems must contain at least one item".into(),
        ));
    }

    let mut lines = Vec::with_capacity(input.lines.len());
    for (index, line) in input.lines.iter().enumerate() {
        let product_id = parse_identity(line.product_id.trim()).ok_or_else(|| {
            ServiceError::ValidationError(format!(
                "purchasedItems[{}]: invalid product id '{}'",
                index, line.product_id
            ))
        })?;
        if line.qty <= 0 {
            return Err(ServiceError::ValidationError(format!(
                "purchasedItems[{}]: qty must be greater than 0, got {}",
                index, line.qty
            )));
        }
        let qty = i32::try_from(line.qty).map_err(|_| {
            ServiceError::ValidationError(format!(
                "purchasedItems[{}]: qty {} is too large",
                index, line.qty
            ))
        })?;
        lines.push(CartLine { product_id, qty });
    }

    let name_len = input.sender_name.chars().count();
    if !(SENDER_NAME_MIN..=SENDER_NAME_MAX).contains(&name_len) {
        return Err(ServiceError::ValidationError(format!(
            "senderName must be between {} and {} characters",
            SENDER_NAME_MIN, SENDER_NAME_MAX
        )));
    }

    let contact_type: ContactType = input.sender_contact_type.parse().map_err(|_| {
        ServiceError::ValidationError(format!(
            "senderContactType must be 'email' or 'phone', got '{}'",
            input.sender_contact_type
        ))
    })?;

    if !contact_type.accepts(&input.sender_contact_detail) {
        return Err(ServiceError::ValidationError(format!(
            "senderContactDetail is not a valid {}",
            contact_type
        )));
    }

    Ok(ValidatedCart {
        lines,
        sender: Sender {
            name: input.sender_name,
            contact_type,
            contact_detail: input.sender_contact_detail,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use rstest::rstest;

    fn cart(lines: Vec<(&str, i64)>, name: &str, kind: &str, detail: &str) -> CartInput {
        CartInput {
            lines: lines
                .into_iter()
                .map(|(product_id, qty)| CartLineInput {
                    product_id: product_id.to_string(),
                    qty,
                })
                .collect(),
            sender_name: name.to_string(),
            sender_contact_type: kind.to_string(),
            sender_contact_detail: detail.to_string(),
        }
    }

    #[test]
    fn accepts_well_formed_cart() {
        let validated =
            validate_cart(cart(vec![("7", 2), ("3", 1)], "Budi Santoso", "email", "budi@mail.id"))
                .unwrap();

        assert_eq!(
            validated.lines,
            vec![
                CartLine { product_id: 7, qty: 2 },
                CartLine { product_id: 3, qty: 1 }
            ]
        );
        assert_eq!(validated.sender.contact_type, ContactType::Email);
    }

    #[test]
    fn duplicate_lines_are_aggregated_per_product() {
        let validated =
            validate_cart(cart(vec![("7", 2), ("3", 1), ("7", 4)], "Budi", "phone", "+628123"))
                .unwrap();

        let requested = validated.requested_per_product();
        assert_eq!(requested.get(&7), Some(&6));
        assert_eq!(requested.get(&3), Some(&1));
        assert_eq!(requested.keys().copied().collect::<Vec<_>>(), vec![3, 7]);
    }

    #[rstest]
    #[case::empty_cart(vec![], "Budi", "email", "b@x.io")]
    #[case::zero_qty(vec![("7", 0)], "Budi", "email", "b@x.io")]
    #[case::negative_qty(vec![("7", -1)], "Budi", "email", "b@x.io")]
    #[case::huge_qty(vec![("7", i64::from(i32::MAX) + 1)], "Budi", "email", "b@x.io")]
    #[case::non_numeric_id(vec![("abc", 1)], "Budi", "email", "b@x.io")]
    #[case::zero_id(vec![("0", 1)], "Budi", "email", "b@x.io")]
    #[case::signed_id(vec![("+7", 1)], "Budi", "email", "b@x.io")]
    #[case::short_name(vec![("7", 1)], "Bud", "email", "b@x.io")]
    #[case::long_name(vec![("7", 1)], &"x".repeat(56), "email", "b@x.io")]
    #[case::unknown_contact_type(vec![("7", 1)], "Budi", "fax", "b@x.io")]
    #[case::bad_email(vec![("7", 1)], "Budi", "email", "not-an-email")]
    #[case::phone_without_plus(vec![("7", 1)], "Budi", "phone", "628123456")]
    #[case::phone_leading_zero(vec![("7", 1)], "Budi", "phone", "+0812345")]
    #[case::phone_too_long(vec![("7", 1)], "Budi", "phone", "+1234567890123456")]
    fn rejects_invalid_input(
        #[case] lines: Vec<(&str, i64)>,
        #[case] name: &str,
        #[case] kind: &str,
        #[case] detail: &str,
    ) {
        assert_matches!(
            validate_cart(cart(lines, name, kind, detail)),
            Err(ServiceError::ValidationError(_))
        );
    }

    #[rstest]
    #[case("+62", true)]
    #[case("+628123456789012", true)]
    #[case("+6", false)]
    #[case("+62812345678901234", false)]
    #[case("+62-812", false)]
    fn phone_rule(#[case] detail: &str, #[case] ok: bool) {
        assert_eq!(ContactType::Phone.accepts(detail), ok);
    }

    #[test]
    fn name_length_counts_characters_not_bytes() {
        // four multi-byte characters
        assert!(validate_cart(cart(vec![("1", 1)], "Ñañá", "email", "n@x.co")).is_ok());
    }

    #[test]
    fn contact_type_round_trips_through_strum() {
        assert_eq!("phone".parse::<ContactType>().unwrap(), ContactType::Phone);
        assert_eq!(ContactType::Email.to_string(), "email");
    }
}
