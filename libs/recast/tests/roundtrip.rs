//! Converting A → B → A between structurally compatible records reproduces
//! the original value.

use proptest::prelude::*;
use recast::{convert, Reflect};

#[derive(Reflect, Clone, Default, Debug, PartialEq)]
pub struct Address {
    pub city: String,
    pub zip: u32,
}

#[derive(Reflect, Clone, Default, Debug, PartialEq)]
pub struct Account {
    pub id: i64,
    pub name: String,
    pub score: i32,
    pub balance: f64,
    pub active: bool,
    pub tags: Vec<String>,
    pub parent: Option<i64>,
    pub address: Address,
    pub history: Vec<Option<Address>>,
}

#[derive(Reflect, Clone, Default, Debug, PartialEq)]
pub struct AddressRow {
    pub city: String,
    pub zip: u64,
}

#[derive(Reflect, Clone, Default, Debug, PartialEq)]
pub struct AccountRow {
    pub id: i128,
    pub name: String,
    pub score: i64,
    pub balance: f64,
    pub active: bool,
    pub tags: Vec<String>,
    pub parent: Option<Box<i64>>,
    pub address: Box<AddressRow>,
    pub history: Vec<Option<AddressRow>>,
}

fn address() -> impl Strategy<Value = Address> {
    ("[a-z]{0,12}", any::<u32>()).prop_map(|(city, zip)| Address { city, zip })
}

fn account() -> impl Strategy<Value = Account> {
    (
        any::<i64>(),
        ".{0,24}",
        any::<i32>(),
        -1e12f64..1e12,
        any::<bool>(),
        prop::collection::vec("[a-z]{1,8}", 0..6),
        any::<Option<i64>>(),
        address(),
        prop::collection::vec(prop::option::of(address()), 0..4),
    )
        .prop_map(
            |(id, name, score, balance, active, tags, parent, address, history)| Account {
                id,
                name,
                score,
                balance,
                active,
                tags,
                parent,
                address,
                history,
            },
        )
}

proptest! {
    #[test]
    fn account_round_trips_through_row(original in account()) {
        let mut row = AccountRow::default();
        convert(&original, &mut row).unwrap();
        prop_assert_eq!(row.id, i128::from(original.id));
        prop_assert_eq!(row.parent.as_deref().copied(), original.parent);
        prop_assert_eq!(row.history.len(), original.history.len());

        let mut back = Account::default();
        convert(&row, &mut back).unwrap();
        prop_assert_eq!(back, original);
    }

    #[test]
    fn conversion_is_deterministic(original in account()) {
        let mut first = AccountRow::default();
        let mut second = AccountRow::default();
        convert(&original, &mut first).unwrap();
        convert(&original, &mut second).unwrap();
        prop_assert_eq!(first, second);
    }
}
