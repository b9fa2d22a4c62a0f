mod common;

use common::{reference_date, two_person_sheet};
use split_ledger::{
    currency::{parse_currency, parse_percentage, CurrencyFormat},
    errors::LedgerError,
    ledger::{
        split, Allocation, EditOutcome, EngineSettings, RecalcEngine, RemainderRule, SplitMethod,
    },
    sheet::{CellValue, Table},
};

const EPS: f64 = 1e-6;

fn allocations(values: &[(&str, CellValue)]) -> Vec<Allocation> {
    values
        .iter()
        .map(|(name, value)| Allocation::new(*name, value.clone()))
        .collect()
}

#[test]
fn rent_split_equally_between_two() {
    let mut table = two_person_sheet(&[["Rent", "Alice", "$2,000.00", "Equally", "TRUE", "TRUE"]]);
    let report = RecalcEngine::default()
        .recalculate(&mut table, reference_date())
        .unwrap();

    assert_eq!(table.text(1, 6), "Bob Pays: $1,000.00");
    let alice = report.balance("Alice").unwrap();
    assert!((alice.paid - 2000.0).abs() < EPS);
    assert!((alice.owed - 1000.0).abs() < EPS);
    let bob = report.balance("Bob").unwrap();
    assert!((bob.owed - 1000.0).abs() < EPS);
    assert_eq!(report.summary, "Bob owes $1,000.00");
    assert_eq!(table.text(2, 0), "Due: Apr 01, 2025");
    assert_eq!(table.text(2, 2), "$2,000.00");
}

#[test]
fn groceries_percentage_share_for_bob() {
    let mut table = two_person_sheet(&[["Groceries", "Alice", "150", "Variably", "40%", "60%"]]);
    let report = RecalcEngine::default()
        .recalculate(&mut table, reference_date())
        .unwrap();

    assert_eq!(table.text(1, 6), "Bob Pays: $90.00");
    assert!((report.balance("Alice").unwrap().balance - 90.0).abs() < EPS);
    assert!((report.balance("Bob").unwrap().balance + 90.0).abs() < EPS);
}

#[test]
fn fixed_dinner_fills_bob_and_recomputes() {
    let mut table = two_person_sheet(&[["Dinner", "Alice", "75", "Fixed", "", ""]]);
    table.set(1, 4, CellValue::Number(25.0));

    let outcome = RecalcEngine::default()
        .handle_edit(&mut table, 1, 4, reference_date())
        .unwrap();

    let EditOutcome::Recalculated { fill, report } = outcome else {
        panic!("allocation edit should recalculate");
    };
    let fill = fill.expect("the only empty cell should be filled");
    assert_eq!(fill.participant, "Bob");
    assert_eq!(fill.rule, RemainderRule::SingleEmptySlot);
    assert_eq!(table.text(1, 5), "$50.00");
    assert_eq!(table.text(1, 6), "Bob Pays: $50.00");
    assert_eq!(report.summary, "Bob owes $50.00");
}

#[test]
fn zero_valid_rows_writes_empty_summary_below_header() {
    let mut table = two_person_sheet(&[]);
    let report = RecalcEngine::default()
        .recalculate(&mut table, reference_date())
        .unwrap();

    assert_eq!(report.summary_row, 1);
    assert_eq!(table.text(1, 1), "Summary");
    assert_eq!(table.text(1, 2), "$0.00");
    assert_eq!(table.text(1, 6), "");
    assert!(report.summary.is_empty());
}

#[test]
fn sheet_without_participants_is_untouched() {
    let mut table = Table::from_strings(vec![
        vec!["Description", "Paid By", "Amount", "Split", "Breakdown"],
        vec!["Rent", "Alice", "100", "Equally", ""],
    ]);
    let before = table.clone();
    let err = RecalcEngine::default()
        .recalculate(&mut table, reference_date())
        .unwrap_err();
    assert!(matches!(err, LedgerError::NoParticipants));
    assert_eq!(table, before);
}

#[test]
fn equal_shares_sum_to_amount() {
    for (amount, checked) in [(100.0, 3usize), (10.0, 3), (0.01, 2), (2000.0, 1)] {
        let names = ["A", "B", "C", "D"];
        let inputs: Vec<(&str, CellValue)> = names
            .iter()
            .enumerate()
            .map(|(index, name)| (*name, CellValue::Bool(index < checked)))
            .collect();
        let outcome = split(SplitMethod::Equal, amount, "A", &allocations(&inputs));
        assert_eq!(outcome.shares.len(), checked);
        for share in &outcome.shares {
            assert!((share.owed - amount / checked as f64).abs() < EPS);
        }
        assert!((outcome.total_owed() - amount).abs() < EPS);
    }
}

#[test]
fn percentages_summing_to_hundred_cover_amount() {
    let inputs = allocations(&[
        ("A", CellValue::text("33.5%")),
        ("B", CellValue::Number(0.5)),
        ("C", CellValue::Number(16.5)),
    ]);
    let outcome = split(SplitMethod::Percentage, 240.0, "A", &inputs);
    assert!((outcome.total_owed() - 240.0).abs() < EPS);
}

#[test]
fn fixed_totals_may_differ_from_amount() {
    let inputs = allocations(&[("A", CellValue::Number(30.0)), ("B", CellValue::text("$45"))]);
    let outcome = split(SplitMethod::Fixed, 100.0, "A", &inputs);
    assert!((outcome.total_owed() - 75.0).abs() < EPS);
}

#[test]
fn value_parsers_match_documented_examples() {
    assert_eq!(parse_percentage(&CellValue::text("50%")), 50.0);
    assert_eq!(parse_percentage(&CellValue::Number(0.5)), 50.0);
    assert_eq!(parse_percentage(&CellValue::Number(50.0)), 50.0);
    assert_eq!(parse_percentage(&CellValue::Empty), 0.0);
    assert!((parse_currency(&CellValue::text("$1,234.56")) - 1234.56).abs() < EPS);
    assert_eq!(parse_currency(&CellValue::Number(75.0)), 75.0);
}

#[test]
fn bare_one_reads_as_whole_share() {
    // Ambiguous boundary: 1 is treated as a fraction, so it means 100%.
    assert_eq!(parse_percentage(&CellValue::Number(1.0)), 100.0);
    assert_eq!(parse_percentage(&CellValue::text("1%")), 1.0);
}

#[test]
fn recalculating_twice_leaves_sheet_unchanged() {
    let mut table = two_person_sheet(&[
        ["Rent", "Alice", "2000", "Equally", "x", "x"],
        ["Groceries", "Bob", "150", "Variably", "60%", "40%"],
        ["Dinner", "Alice", "75", "Fixed", "25", "50"],
    ]);
    let engine = RecalcEngine::default();
    let first = engine.recalculate(&mut table, reference_date()).unwrap();
    let snapshot = table.clone();
    let second = engine.recalculate(&mut table, reference_date()).unwrap();

    assert_eq!(table, snapshot);
    assert_eq!(first.summary, second.summary);
    assert_eq!(first.summary_row, 4);
    assert_eq!(second.summary_row, 4);
}

#[test]
fn euro_sheet_round_trips_its_own_amounts() {
    let engine = RecalcEngine::new(EngineSettings {
        currency: CurrencyFormat {
            symbol: "€".into(),
            decimal_separator: ',',
            grouping_separator: '.',
            precision: 2,
        },
        ..EngineSettings::default()
    });
    let mut table = two_person_sheet(&[
        ["Rent", "Alice", "€2.000,00", "Equally", "TRUE", "TRUE"],
        ["Dinner", "Bob", "75,50", "Fixed", "", ""],
    ]);
    table.set(2, 5, CellValue::text("€25,50"));

    let outcome = engine
        .handle_edit(&mut table, 2, 5, reference_date())
        .unwrap();
    let EditOutcome::Recalculated { fill, report } = outcome else {
        panic!("allocation edit should recalculate");
    };
    assert_eq!(fill.unwrap().participant, "Alice");
    assert_eq!(table.text(2, 4), "€50,00");
    assert_eq!(table.text(1, 6), "Bob Pays: €1.000,00");
    assert_eq!(table.text(2, 6), "Alice Pays: €50,00");
    assert_eq!(report.total_label, "€2.075,50");
    assert_eq!(report.summary, "Bob owes €950,00");
    assert_eq!(table.text(3, 2), "€2.075,50");

    let snapshot = table.clone();
    let again = engine.recalculate(&mut table, reference_date()).unwrap();
    assert_eq!(again.summary, report.summary);
    assert_eq!(table, snapshot);
}
