//! Property tests for page ranges and pricing

use proptest::prelude::*;
use quire_pricing::page_range::{PageSet, auto_correct, parse, serialize, validate_against_page_count};
use quire_pricing::price_file;
use shared::{Binding, BindingType, FileSpec, PricingTable, PrintMode, SpecialPaper};

fn page_set() -> impl Strategy<Value = PageSet> {
    prop::collection::btree_set(1u32..500, 0..40)
}

fn print_mode() -> impl Strategy<Value = PrintMode> {
    prop_oneof![
        Just(PrintMode::BlackAndWhite),
        Just(PrintMode::Color),
        Just(PrintMode::Mixed),
    ]
}

fn special_paper() -> impl Strategy<Value = SpecialPaper> {
    prop_oneof![
        Just(SpecialPaper::None),
        Just(SpecialPaper::Glossy),
        Just(SpecialPaper::Matte),
        Just(SpecialPaper::Transparent),
    ]
}

fn binding() -> impl Strategy<Value = Binding> {
    prop_oneof![
        Just(BindingType::None),
        Just(BindingType::Spiral),
        Just(BindingType::Staple),
        Just(BindingType::Hardcover),
    ]
    .prop_map(Binding::new)
}

fn file_spec() -> impl Strategy<Value = FileSpec> {
    (
        1u32..20,
        print_mode(),
        "[0-9, \\-]{0,20}",
        1u32..200,
        any::<bool>(),
        special_paper(),
        binding(),
    )
        .prop_map(
            |(copies, print_mode, color_page_spec, pages, duplex, special_paper, binding)| FileSpec {
                copies,
                print_mode,
                color_page_spec,
                page_count: Some(pages),
                duplex,
                special_paper,
                binding,
                ..Default::default()
            },
        )
}

proptest! {
    #[test]
    fn serialize_round_trips(pages in page_set()) {
        prop_assert_eq!(parse(&serialize(&pages)), pages);
    }

    #[test]
    fn serialize_is_canonical(raw in "[0-9, \\-]{0,30}") {
        let canonical = serialize(&parse(&raw));
        prop_assert_eq!(serialize(&parse(&canonical)), canonical);
    }

    #[test]
    fn correction_is_idempotent(raw in "[0-9, \\-a-z]{0,30}", page_count in 0u32..50) {
        let first = auto_correct(&raw, page_count);
        let second = auto_correct(&first.spec, page_count);
        prop_assert_eq!(&second.spec, &first.spec);
        prop_assert!(!second.has_removed());
    }

    #[test]
    fn validation_partitions(pages in page_set(), page_count in 0u32..600) {
        let result = validate_against_page_count(&pages, page_count);
        prop_assert!(result.valid.iter().all(|&p| p <= page_count));
        prop_assert!(result.invalid.iter().all(|&p| p > page_count));
        prop_assert_eq!(result.valid.len() + result.invalid.len(), pages.len());
    }

    #[test]
    fn more_copies_never_cheaper(spec in file_spec()) {
        let table = PricingTable::DEFAULT;
        let more = FileSpec { copies: spec.copies + 1, ..spec.clone() };
        prop_assert!(price_file(&more, &table).total >= price_file(&spec, &table).total);
    }

    #[test]
    fn more_pages_never_cheaper(spec in file_spec()) {
        let table = PricingTable::DEFAULT;
        let more = FileSpec { page_count: spec.page_count.map(|p| p + 1), ..spec.clone() };
        prop_assert!(price_file(&more, &table).total >= price_file(&spec, &table).total);
    }

    #[test]
    fn color_never_cheaper_than_black_and_white(spec in file_spec()) {
        let table = PricingTable::DEFAULT;
        let bw = FileSpec { print_mode: PrintMode::BlackAndWhite, ..spec.clone() };
        let color = FileSpec { print_mode: PrintMode::Color, ..spec };
        prop_assert!(price_file(&color, &table).total >= price_file(&bw, &table).total);
    }

    #[test]
    fn binding_charged_once_per_file(spec in file_spec()) {
        let table = PricingTable::DEFAULT;
        let price = price_file(&spec, &table);
        prop_assert_eq!(price.binding_surcharge, table.binding_price(spec.binding.effective()));

        let more = FileSpec { copies: spec.copies * 3, ..spec };
        prop_assert_eq!(price_file(&more, &table).binding_surcharge, price.binding_surcharge);
    }

    #[test]
    fn mixed_pages_add_up(spec in file_spec()) {
        let price = price_file(&spec, &PricingTable::DEFAULT);
        prop_assert_eq!(price.color_pages + price.bw_pages, price.pages);
    }
}

#[test]
fn mixed_order_scenario_prices_to_48() {
    let spec = FileSpec {
        copies: 2,
        print_mode: PrintMode::Mixed,
        color_page_spec: "1,3,5-6".into(),
        page_count: Some(6),
        duplex: false,
        ..Default::default()
    };
    assert_eq!(price_file(&spec, &PricingTable::DEFAULT).total, 48.0);
}

#[test]
fn out_of_range_scenario() {
    let pages = parse("1,3,50");
    let result = validate_against_page_count(&pages, 10);
    assert_eq!(result.valid.into_iter().collect::<Vec<_>>(), vec![1, 3]);
    assert_eq!(result.invalid.into_iter().collect::<Vec<_>>(), vec![50]);
    assert_eq!(auto_correct("1,3,50", 10).spec, "1,3");
}
