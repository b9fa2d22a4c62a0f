mod common;

use assert_fs::prelude::*;
use common::{reference_date, setup_test_env, two_person_sheet};
use predicates::prelude::*;
use split_ledger::{
    config::Config,
    ledger::RecalcEngine,
    sheet::{CellValue, CsvSheetStore, SheetStore},
};

#[test]
fn recalculated_sheet_survives_csv_round_trip() {
    let dir = assert_fs::TempDir::new().unwrap();
    let file = dir.child("house.csv");
    let store = CsvSheetStore::default();

    let mut table = two_person_sheet(&[
        ["Rent", "Alice", "$2,000.00", "Equally", "TRUE", "TRUE"],
        ["Dinner, downtown", "Bob", "75", "Fixed", "25", "50"],
    ]);
    RecalcEngine::default()
        .recalculate(&mut table, reference_date())
        .unwrap();
    store.save(&table, file.path()).unwrap();

    file.assert(predicate::str::contains("\"Dinner, downtown\""));
    file.assert(predicate::str::contains("Bob Pays: $1,000.00"));
    dir.child("house.csv.tmp").assert(predicate::path::missing());

    let loaded = store.load(file.path()).unwrap();
    assert_eq!(loaded.text(2, 0), "Dinner, downtown");
    assert_eq!(loaded.get(1, 4), &CellValue::Bool(true));
    assert_eq!(loaded.text(3, 1), "Summary");
    assert_eq!(loaded.text(2, 6), "Alice Pays: $25.00");
}

#[test]
fn reloaded_sheet_recalculates_to_same_summary() {
    let dir = assert_fs::TempDir::new().unwrap();
    let file = dir.child("trip.csv");
    let store = CsvSheetStore::default();
    let engine = RecalcEngine::default();

    let mut table = two_person_sheet(&[["Hotel", "Alice", "300", "Variably", "50%", "50%"]]);
    let first = engine.recalculate(&mut table, reference_date()).unwrap();
    store.save(&table, file.path()).unwrap();

    let mut loaded = store.load(file.path()).unwrap();
    let second = engine.recalculate(&mut loaded, reference_date()).unwrap();
    assert_eq!(first.summary, second.summary);
    assert_eq!(second.summary, "Bob owes $150.00");
}

#[test]
fn semicolon_delimited_sheets_are_supported() {
    let dir = assert_fs::TempDir::new().unwrap();
    let file = dir.child("euro.csv");
    file.write_str("Description;Paid By;Amount;Split;Ana;Ben;Breakdown\nTaxi;Ana;40;Equally;x;x;\n")
        .unwrap();

    let store = CsvSheetStore::new(b';');
    let mut table = store.load(file.path()).unwrap();
    RecalcEngine::default()
        .recalculate(&mut table, reference_date())
        .unwrap();
    assert_eq!(table.text(1, 6), "Ben Pays: $20.00");
}

#[test]
fn config_round_trips_through_manager() {
    let (_base, manager) = setup_test_env();
    let mut config = Config::default();
    config.set("summary_separator", "\\n").unwrap();
    config.set("due_day", "5").unwrap();
    manager.save(&config).unwrap();

    let loaded = manager.load().unwrap();
    assert_eq!(loaded.engine.summary_separator, "\n");
    assert_eq!(loaded.engine.due.day_of_month, 5);
}
