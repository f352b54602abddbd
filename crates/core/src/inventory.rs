//! Inventory ledger rules (stock transactions, locations, variants).
//!
//! Stock quantities are never edited directly. Every change is expressed as a
//! transaction whose type determines which locations are debited and
//! credited; [`plan_stock_effects`] turns a validated transaction into the
//! per-location deltas the repository applies atomically.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::CoreError;
use crate::types::DbId;

/// Default unit for new items.
pub const DEFAULT_BASE_UNIT: &str = "Stück";

/// Separator used when rendering a location path.
pub const PATH_SEPARATOR: &str = " > ";

// ---------------------------------------------------------------------------
// Transaction types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionType {
    /// Goods received into a location.
    In,
    /// Goods issued out of a location.
    Out,
    /// Transfer between two locations.
    Move,
    /// Hand-out to a member location.
    Loan,
    /// Goods returned into a location.
    Return,
    /// Goods written off.
    Discard,
}

pub const ALL_TRANSACTION_TYPES: &[TransactionType] = &[
    TransactionType::In,
    TransactionType::Out,
    TransactionType::Move,
    TransactionType::Loan,
    TransactionType::Return,
    TransactionType::Discard,
];

impl TransactionType {
    pub fn as_str(self) -> &'static str {
        match self {
            TransactionType::In => "IN",
            TransactionType::Out => "OUT",
            TransactionType::Move => "MOVE",
            TransactionType::Loan => "LOAN",
            TransactionType::Return => "RETURN",
            TransactionType::Discard => "DISCARD",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TransactionType::In => "Eingang",
            TransactionType::Out => "Ausgang",
            TransactionType::Move => "Umlagerung",
            TransactionType::Loan => "Ausleihe",
            TransactionType::Return => "Rückgabe",
            TransactionType::Discard => "Aussonderung",
        }
    }

    pub fn requires_source(self) -> bool {
        matches!(
            self,
            TransactionType::Out
                | TransactionType::Discard
                | TransactionType::Move
                | TransactionType::Loan
        )
    }

    pub fn requires_target(self) -> bool {
        matches!(
            self,
            TransactionType::In
                | TransactionType::Return
                | TransactionType::Move
                | TransactionType::Loan
        )
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ALL_TRANSACTION_TYPES
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| CoreError::Validation(format!("Unknown transaction type '{s}'")))
    }
}

// ---------------------------------------------------------------------------
// Item references
// ---------------------------------------------------------------------------

/// A stock or transaction row references exactly one of item / variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemRef {
    Item(DbId),
    Variant(DbId),
}

impl ItemRef {
    pub fn from_ids(item_id: Option<DbId>, variant_id: Option<DbId>) -> Result<Self, CoreError> {
        match (item_id, variant_id) {
            (Some(item), None) => Ok(ItemRef::Item(item)),
            (None, Some(variant)) => Ok(ItemRef::Variant(variant)),
            (Some(_), Some(_)) => Err(CoreError::Validation(
                "Only one of item or item variant may be set".into(),
            )),
            (None, None) => Err(CoreError::Validation(
                "Either an item or an item variant must be set".into(),
            )),
        }
    }

    pub fn item_id(&self) -> Option<DbId> {
        match self {
            ItemRef::Item(id) => Some(*id),
            ItemRef::Variant(_) => None,
        }
    }

    pub fn variant_id(&self) -> Option<DbId> {
        match self {
            ItemRef::Variant(id) => Some(*id),
            ItemRef::Item(_) => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Stock effects
// ---------------------------------------------------------------------------

/// A signed quantity change at one location.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockEffect {
    pub location_id: DbId,
    pub delta: i32,
}

/// Validate a transaction's locations and quantity and return the stock
/// effects to apply, debits first.
pub fn plan_stock_effects(
    kind: TransactionType,
    source: Option<DbId>,
    target: Option<DbId>,
    quantity: i32,
) -> Result<Vec<StockEffect>, CoreError> {
    if quantity <= 0 {
        return Err(CoreError::Validation(
            "Quantity must be greater than zero".into(),
        ));
    }
    if kind.requires_source() && source.is_none() {
        return Err(CoreError::Validation(format!(
            "Transaction type {kind} requires a source location"
        )));
    }
    if kind.requires_target() && target.is_none() {
        return Err(CoreError::Validation(format!(
            "Transaction type {kind} requires a target location"
        )));
    }
    if let (Some(s), Some(t)) = (source, target) {
        if s == t {
            return Err(CoreError::Validation(
                "Source and target location must differ".into(),
            ));
        }
    }

    let mut effects = Vec::with_capacity(2);
    if kind.requires_source() {
        if let Some(location_id) = source {
            effects.push(StockEffect {
                location_id,
                delta: -quantity,
            });
        }
    }
    if kind.requires_target() {
        if let Some(location_id) = target {
            effects.push(StockEffect {
                location_id,
                delta: quantity,
            });
        }
    }
    Ok(effects)
}

/// Error for a debit that exceeds what is on hand.
pub fn insufficient_stock(available: i32) -> CoreError {
    CoreError::Validation(format!("Insufficient stock. Available: {available}"))
}

/// Error for a debit at a location that holds no stock row for the item.
pub fn missing_source_stock() -> CoreError {
    CoreError::Validation("No stock available at the source location".into())
}

// ---------------------------------------------------------------------------
// Storage locations
// ---------------------------------------------------------------------------

/// A member location must reference its member and vice versa.
pub fn validate_member_location(is_member: bool, member_id: Option<DbId>) -> Result<(), CoreError> {
    match (is_member, member_id) {
        (true, None) => Err(CoreError::Validation(
            "A member location must be assigned to a member".into(),
        )),
        (false, Some(_)) => Err(CoreError::Validation(
            "Only member locations can be assigned to a member".into(),
        )),
        _ => Ok(()),
    }
}

/// Reject a parent assignment that would make `location_id` its own ancestor.
///
/// `parents` maps every existing location to its current parent.
pub fn validate_parent(
    location_id: Option<DbId>,
    new_parent: Option<DbId>,
    parents: &HashMap<DbId, Option<DbId>>,
) -> Result<(), CoreError> {
    let (Some(id), Some(mut cursor)) = (location_id, new_parent) else {
        return Ok(());
    };
    let mut seen = HashSet::new();
    loop {
        if cursor == id {
            return Err(CoreError::Validation(
                "A location cannot be its own parent or ancestor".into(),
            ));
        }
        if !seen.insert(cursor) {
            return Err(CoreError::Validation(
                "Location hierarchy contains a cycle".into(),
            ));
        }
        match parents.get(&cursor).copied().flatten() {
            Some(next) => cursor = next,
            None => return Ok(()),
        }
    }
}

/// Ancestor chain of a location, root first, ending with the location itself.
pub fn ancestor_chain(location_id: DbId, parents: &HashMap<DbId, Option<DbId>>) -> Vec<DbId> {
    let mut chain = vec![location_id];
    let mut seen: HashSet<DbId> = HashSet::from([location_id]);
    let mut cursor = parents.get(&location_id).copied().flatten();
    while let Some(id) = cursor {
        if !seen.insert(id) {
            break;
        }
        chain.push(id);
        cursor = parents.get(&id).copied().flatten();
    }
    chain.reverse();
    chain
}

/// Render a location path such as `Lager > Regal A > Fach 3`.
pub fn location_path<'a>(names: impl IntoIterator<Item = &'a str>) -> String {
    names.into_iter().collect::<Vec<_>>().join(PATH_SEPARATOR)
}

// ---------------------------------------------------------------------------
// Variants
// ---------------------------------------------------------------------------

/// Display name of a variant, e.g. `Jacke (Größe: L)`.
pub fn variant_display_name(parent_name: &str, variant_id: DbId, attributes: &Value) -> String {
    let pairs: Vec<String> = attributes
        .as_object()
        .map(|map| {
            map.iter()
                .map(|(k, v)| format!("{k}: {}", display_value(v)))
                .collect()
        })
        .unwrap_or_default();
    if pairs.is_empty() {
        format!("{parent_name} (Variante #{variant_id})")
    } else {
        format!("{parent_name} ({})", pairs.join(", "))
    }
}

/// Parent attributes overlaid with the variant's own attributes.
pub fn combined_attributes(parent: &Value, variant: &Value) -> Value {
    let mut merged: Map<String, Value> = parent.as_object().cloned().unwrap_or_default();
    if let Some(own) = variant.as_object() {
        for (k, v) in own {
            merged.insert(k.clone(), v.clone());
        }
    }
    Value::Object(merged)
}

/// Attribute payloads must be JSON objects.
pub fn validate_attributes(attributes: &Value) -> Result<(), CoreError> {
    if attributes.is_object() {
        Ok(())
    } else {
        Err(CoreError::Validation(
            "Attributes must be a JSON object".into(),
        ))
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn transaction_type_parses_wire_names() {
        assert_eq!("LOAN".parse::<TransactionType>().unwrap(), TransactionType::Loan);
        assert!("loan".parse::<TransactionType>().is_err());
        assert_eq!(
            serde_json::to_value(TransactionType::Discard).unwrap(),
            json!("DISCARD")
        );
    }

    #[test]
    fn incoming_credits_target() {
        let effects = plan_stock_effects(TransactionType::In, None, Some(3), 5).unwrap();
        assert_eq!(effects, vec![StockEffect { location_id: 3, delta: 5 }]);
    }

    #[test]
    fn return_credits_target_and_ignores_source() {
        let effects = plan_stock_effects(TransactionType::Return, Some(1), Some(2), 1).unwrap();
        assert_eq!(effects, vec![StockEffect { location_id: 2, delta: 1 }]);
    }

    #[test]
    fn outgoing_and_discard_debit_source() {
        for kind in [TransactionType::Out, TransactionType::Discard] {
            let effects = plan_stock_effects(kind, Some(4), None, 2).unwrap();
            assert_eq!(effects, vec![StockEffect { location_id: 4, delta: -2 }]);
        }
    }

    #[test]
    fn move_and_loan_debit_then_credit() {
        for kind in [TransactionType::Move, TransactionType::Loan] {
            let effects = plan_stock_effects(kind, Some(1), Some(2), 3).unwrap();
            assert_eq!(
                effects,
                vec![
                    StockEffect { location_id: 1, delta: -3 },
                    StockEffect { location_id: 2, delta: 3 },
                ]
            );
        }
    }

    #[test]
    fn missing_locations_are_rejected() {
        assert!(plan_stock_effects(TransactionType::In, Some(1), None, 1).is_err());
        assert!(plan_stock_effects(TransactionType::Out, None, Some(1), 1).is_err());
        assert!(plan_stock_effects(TransactionType::Move, Some(1), None, 1).is_err());
        assert!(plan_stock_effects(TransactionType::Loan, None, Some(1), 1).is_err());
    }

    #[test]
    fn same_source_and_target_is_rejected() {
        let err = plan_stock_effects(TransactionType::Move, Some(7), Some(7), 1).unwrap_err();
        assert!(matches!(err, CoreError::Validation(msg) if msg.contains("must differ")));
    }

    #[test]
    fn non_positive_quantity_is_rejected() {
        assert!(plan_stock_effects(TransactionType::In, None, Some(1), 0).is_err());
        assert!(plan_stock_effects(TransactionType::In, None, Some(1), -4).is_err());
    }

    #[test]
    fn item_ref_exclusivity() {
        assert_eq!(ItemRef::from_ids(Some(1), None).unwrap(), ItemRef::Item(1));
        assert_eq!(ItemRef::from_ids(None, Some(2)).unwrap().variant_id(), Some(2));
        assert!(ItemRef::from_ids(Some(1), Some(2)).is_err());
        assert!(ItemRef::from_ids(None, None).is_err());
    }

    #[test]
    fn member_location_rules() {
        assert!(validate_member_location(true, Some(1)).is_ok());
        assert!(validate_member_location(false, None).is_ok());
        assert!(validate_member_location(true, None).is_err());
        assert!(validate_member_location(false, Some(1)).is_err());
    }

    #[test]
    fn parent_cycle_detection() {
        // 1 <- 2 <- 3
        let parents = HashMap::from([(1, None), (2, Some(1)), (3, Some(2))]);
        assert!(validate_parent(Some(1), Some(3), &parents).is_err());
        assert!(validate_parent(Some(2), Some(2), &parents).is_err());
        assert!(validate_parent(Some(3), Some(1), &parents).is_ok());
        assert!(validate_parent(None, Some(3), &parents).is_ok());
    }

    #[test]
    fn ancestor_chain_is_root_first() {
        let parents = HashMap::from([(1, None), (2, Some(1)), (3, Some(2))]);
        assert_eq!(ancestor_chain(3, &parents), vec![1, 2, 3]);
        assert_eq!(ancestor_chain(1, &parents), vec![1]);
        assert_eq!(location_path(["Lager", "Regal A"]), "Lager > Regal A");
    }

    #[test]
    fn variant_names_and_attributes() {
        let attrs = json!({"Größe": "L", "Farbe": "rot"});
        assert_eq!(
            variant_display_name("Jacke", 5, &attrs),
            "Jacke (Farbe: rot, Größe: L)"
        );
        assert_eq!(variant_display_name("Jacke", 5, &json!({})), "Jacke (Variante #5)");

        let merged = combined_attributes(&json!({"Material": "Nomex", "Farbe": "blau"}), &attrs);
        assert_eq!(merged["Farbe"], "rot");
        assert_eq!(merged["Material"], "Nomex");
    }
}
