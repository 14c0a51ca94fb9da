use polars::prelude::*;
use qp_forecast::data;
use qp_forecast::{InMemoryStore, RowFilter, TelemetrySchema, TimeSeriesStore};

fn telemetry() -> DataFrame {
    DataFrame::new(vec![
        Series::new("ue-id", &["ue1", "ue2", "ue1", "ue1"]),
        Series::new("nrCellIdentity", &["c1", "c2", "c1", "c2"]),
        Series::new("pdcpBytesDl", &[1.0, 2.0, 3.0, 4.0]),
        Series::new("pdcpBytesUl", &[0.1, 0.2, 0.3, 0.4]),
    ])
    .unwrap()
}

#[test]
fn test_read_by_terminal_keeps_insertion_order() {
    let store = InMemoryStore::from_frame(TelemetrySchema::default(), telemetry()).unwrap();

    let rows = store.read(&RowFilter::terminal("ue1"), None).unwrap().unwrap();
    assert_eq!(data::observed_values(&rows, "pdcpBytesDl").unwrap(), vec![1.0, 3.0, 4.0]);

    let latest = store.read(&RowFilter::terminal("ue1"), Some(1)).unwrap().unwrap();
    assert_eq!(latest.height(), 1);
    assert_eq!(
        data::string_values(&latest, "nrCellIdentity").unwrap(),
        vec![Some("c2".to_string())]
    );
}

#[test]
fn test_read_by_cell_window() {
    let store = InMemoryStore::from_frame(TelemetrySchema::default(), telemetry()).unwrap();

    let window = store.read(&RowFilter::cell("c1"), Some(101)).unwrap().unwrap();
    assert_eq!(window.height(), 2);

    let both = RowFilter {
        terminal_id: Some("ue1".to_string()),
        cell_id: Some("c2".to_string()),
    };
    assert_eq!(store.read(&both, None).unwrap().unwrap().height(), 1);
}

#[test]
fn test_read_misses_are_none() {
    let store = InMemoryStore::from_frame(TelemetrySchema::default(), telemetry()).unwrap();
    assert!(store.read(&RowFilter::terminal("ueX"), Some(1)).unwrap().is_none());
    assert!(store.read(&RowFilter::cell("c9"), None).unwrap().is_none());

    let empty = InMemoryStore::new(TelemetrySchema::default());
    assert!(empty.read(&RowFilter::terminal("ue1"), None).unwrap().is_none());
}

#[test]
fn test_append_grows_table() {
    let store = InMemoryStore::from_frame(TelemetrySchema::default(), telemetry()).unwrap();
    let height = store.append(telemetry()).unwrap();
    assert_eq!(height, 8);
    assert_eq!(store.read(&RowFilter::cell("c1"), None).unwrap().unwrap().height(), 4);
}

#[test]
fn test_write_records_tagged_predictions() {
    let store = InMemoryStore::new(TelemetrySchema::default());
    let columns = TelemetrySchema::default().throughput_columns;
    let rows = data::frame_from_rows(&columns, &[vec![9.0, 0.9]]).unwrap();

    store.write(rows.clone(), "c1").unwrap();
    store.write(rows, "c2").unwrap();

    assert_eq!(store.predictions().unwrap().len(), 2);
    let for_c1 = store.predictions_for("c1").unwrap();
    assert_eq!(for_c1.len(), 1);
    assert_eq!(
        data::string_values(&for_c1[0].rows, "nrCellIdentity").unwrap(),
        vec![Some("c1".to_string())]
    );
}
