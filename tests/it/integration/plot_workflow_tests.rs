//! Load a grid, then extract series the way a plot panel would.

use crate::helpers::grid;
use gridplot::data::{
    Axis, DataError, EmptyReason, Extraction, GridStore, IngestOptions, IngestSource, JobState,
    SeriesSet, extract_series,
};
use gridplot::{AxisMode, AxisSpec, PlotKind, PlotSelection, PlotSource, Selection, Settings, Workbench};

fn loaded(content: &'static str) -> Workbench {
    let mut bench = Workbench::default();
    bench
        .load_with(
            IngestSource::reader(std::io::Cursor::new(content)),
            &IngestOptions::default().with_chunk_size(2),
        )
        .unwrap();
    assert_eq!(bench.finish_load(), JobState::Completed);
    bench
}

fn series(extraction: Extraction) -> SeriesSet {
    match extraction {
        Extraction::Series(set) => set,
        Extraction::Empty(reason) => panic!("expected series, got {:?}", reason),
    }
}

const SALES: &str = "Month,North,South,Notes\nJan,10,7,ok\nFeb,12,n/a,late\nMar,9,11,\n";

#[test]
fn test_column_skip_and_compact() {
    let g = grid(&["Label", "V"], &[&["a", "1"], &["b", ""], &["c", "abc"], &["d", "4"]]);
    let set = series(
        extract_series(
            &g,
            PlotSource::Axis(AxisSpec::Column { x_column: 0, y_column: 1 }),
            PlotKind::Line,
        )
        .unwrap(),
    );

    assert_eq!(set.series.len(), 1);
    assert_eq!(set.series[0].values(), vec![1.0, 4.0]);
    assert_eq!(set.series[0].positions(), vec![0.0, 1.0]);
}

#[test]
fn test_rectangular_two_by_three() {
    let bench = loaded(SALES);
    let set = series(
        bench
            .plot(PlotKind::Bar, PlotSource::Selection(Some(Selection::new(0, 2, 1, 2))))
            .unwrap(),
    );

    assert_eq!(set.series.len(), 2);
    assert_eq!(set.series[0].label, "North");
    assert_eq!(set.series[0].len(), 3);
    assert_eq!(set.series[1].label, "South");
    assert_eq!(set.series[1].len(), 2);
    assert_eq!(set.tick_labels(), vec!["Jan", "Feb", "Mar"]);
    assert_eq!(set.title, "Bar of selection");

    // South skips Feb, so its Mar bar still lands on the Mar slot
    assert_eq!(set.series[1].positions(), vec![0.0, 2.0]);
    let layout = bench.bar_layout(&set);
    assert_eq!(layout.len(), 2);
    assert!((layout[1].offsets[1] - 2.2).abs() < 1e-9);
}

#[test]
fn test_configured_bar_width() {
    let mut settings = Settings::default();
    settings.plot.bar_group_width = 0.6;
    let mut bench = Workbench::new(settings);
    bench
        .load_with(
            IngestSource::reader(std::io::Cursor::new(SALES)),
            &IngestOptions::default(),
        )
        .unwrap();
    bench.finish_load();

    let set = series(
        bench
            .plot(PlotKind::Bar, PlotSource::Selection(Some(Selection::new(0, 2, 1, 2))))
            .unwrap(),
    );
    let layout = bench.bar_layout(&set);
    assert!((layout[0].width - 0.3).abs() < 1e-9);
    assert!((layout[0].offsets[0] - -0.15).abs() < 1e-9);
}

#[test]
fn test_y_column_equal_to_column_count_is_invalid() {
    let bench = loaded(SALES);
    let columns = bench.store().column_count();
    let result = bench.plot(
        PlotKind::Line,
        PlotSource::Axis(AxisSpec::Column { x_column: 0, y_column: columns }),
    );

    assert!(matches!(
        result,
        Err(DataError::InvalidIndex { axis: Axis::Column, index, len }) if index == columns && len == columns
    ));
}

#[test]
fn test_row_index_out_of_range_is_invalid() {
    let bench = loaded(SALES);
    let result = bench.plot(PlotKind::Line, PlotSource::Axis(AxisSpec::Row { row: 3 }));
    assert!(matches!(result, Err(DataError::InvalidIndex { axis: Axis::Row, .. })));
}

#[test]
fn test_non_numeric_selection_is_empty() {
    let bench = loaded(SALES);
    let extraction = bench
        .plot(PlotKind::Scatter, PlotSource::Selection(Some(Selection::new(0, 2, 3, 3))))
        .unwrap();
    assert_eq!(extraction, Extraction::Empty(EmptyReason::NoNumericData));

    let none = bench.plot(PlotKind::Scatter, PlotSource::Selection(None)).unwrap();
    assert_eq!(none, Extraction::Empty(EmptyReason::NoSelection));
}

#[test]
fn test_row_mode_over_loaded_grid() {
    let bench = loaded(SALES);
    let set = series(
        bench
            .plot(PlotKind::Line, PlotSource::Axis(AxisSpec::Row { row: 1 }))
            .unwrap(),
    );

    assert_eq!(set.series[0].label, "Row 1");
    assert_eq!(set.series[0].values(), vec![12.0]);
    assert_eq!(set.tick_labels(), vec!["North"]);
    assert_eq!(set.y_title, "Row 1 values");
}

#[test]
fn test_snapshot_unaffected_by_later_edits() {
    let mut store = GridStore::from_grid(grid(&["A"], &[&["1"], &["2"]]));
    let snapshot = store.snapshot();

    store.set_cell(0, 0, "100").unwrap();
    store.remove_row(1).unwrap();

    let source = PlotSource::Selection(Some(Selection::new(0, 1, 0, 0)));
    let set = series(extract_series(&snapshot, source, PlotKind::Line).unwrap());
    assert_eq!(set.series[0].values(), vec![1.0, 2.0]);

    // The live grid no longer has row 1
    assert!(extract_series(&store.snapshot(), source, PlotKind::Line).is_err());
}

#[test]
fn test_replot_after_edit() {
    let mut bench = loaded(SALES);
    let source = PlotSource::Selection(Some(Selection::new(0, 2, 2, 2)));
    bench.take_changed();

    bench.store_mut().set_cell(1, 2, "8").unwrap();
    assert!(bench.take_changed());

    let set = series(bench.plot(PlotKind::Line, source).unwrap());
    assert_eq!(set.series[0].values(), vec![7.0, 8.0, 11.0]);
}

#[test]
fn test_index_choices_after_load() {
    let bench = loaded(SALES);
    assert_eq!(
        bench.index_choices(AxisMode::Column, None),
        vec!["Month", "North", "South", "Notes"]
    );
    assert_eq!(
        bench.index_choices(AxisMode::Row, None),
        vec!["Jan", "Feb", "Mar"]
    );
    assert_eq!(
        bench.index_choices(AxisMode::Row, Some(PlotSelection(Some(Selection::new(2, 0, 3, 1))))),
        vec!["Selection r0-r2 c1-c3"]
    );
}
