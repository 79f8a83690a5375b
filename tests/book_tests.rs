use ob_aggregator::book::{Side, SortedBook};
use rust_decimal_macros::dec;

#[test]
fn invariant1_iteration_is_price_sorted_best_first() {
    let mut bids = SortedBook::new(Side::Bids);
    bids.upsert(dec!(100), dec!(1));
    bids.upsert(dec!(102), dec!(1));
    bids.upsert(dec!(101), dec!(1));

    let mut asks = SortedBook::new(Side::Asks);
    asks.upsert(dec!(105), dec!(1));
    asks.upsert(dec!(103), dec!(1));
    asks.upsert(dec!(104), dec!(1));

    assert_eq!(
        bids.iter().map(|(p, _)| p).collect::<Vec<_>>(),
        vec![dec!(102), dec!(101), dec!(100)]
    );
    assert_eq!(
        asks.iter().map(|(p, _)| p).collect::<Vec<_>>(),
        vec![dec!(103), dec!(104), dec!(105)]
    );
}

#[test]
fn invariant2_zero_size_update_removes_the_level() {
    let mut book = SortedBook::new(Side::Bids);
    book.upsert(dec!(50), dec!(2));
    assert_eq!(book.len(), 1);

    book.upsert(dec!(50), dec!(0));
    assert!(book.is_empty());
}

#[test]
fn invariant3_price_is_unique_within_a_side() {
    let mut book = SortedBook::new(Side::Asks);
    book.upsert(dec!(10), dec!(1));
    book.upsert(dec!(10), dec!(5));
    assert_eq!(book.len(), 1);
    assert_eq!(book.index(0).unwrap(), (dec!(10), dec!(5)));
}

#[test]
fn s1_bootstrap_snapshot_is_immediately_ordered() {
    let mut book = SortedBook::new(Side::Bids);
    book.replace_all(vec![(dec!(19442), dec!(0.0534)), (dec!(19666), dec!(0.2)), (dec!(19555), dec!(1))]);
    assert_eq!(
        book.iter().collect::<Vec<_>>(),
        vec![(dec!(19666), dec!(0.2)), (dec!(19555), dec!(1)), (dec!(19442), dec!(0.0534))]
    );
}

#[test]
fn s2_live_updates_insert_update_and_remove_levels() {
    let mut book = SortedBook::new(Side::Asks);
    book.upsert(dec!(100), dec!(1));
    book.upsert(dec!(101), dec!(1));
    book.upsert(dec!(100), dec!(2));
    book.upsert(dec!(101), dec!(0));

    assert_eq!(book.iter().collect::<Vec<_>>(), vec![(dec!(100), dec!(2))]);
}
