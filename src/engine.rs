//! Search, filter and sort state of the university table, and the view derived from it.
//!
//! Everything here is independent of the terminal: the model feeds user actions in and
//! asks for the visible row order and the highlighted segments of a cell.

use std::collections::{HashMap, HashSet};
use std::ops::Range;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::matching::{Collation, Segment, contains_any, contains_folded, highlight_segments};
use crate::table::{ColumnId, ColumnSpec, FilterKind, Row};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortState {
    pub column: ColumnId,
    pub direction: SortDirection,
}

/// Lifecycle of a column's search box or filter menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColumnPhase {
    #[default]
    Closed,
    Editing,
    Committed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterOption {
    pub text: String,
    pub value: String,
}

#[derive(Debug, Default, Clone)]
pub struct InteractionState {
    pub active_search_text: String,
    pub active_search_column: Option<ColumnId>,
    /// Committed filter values per column. Search columns hold at most one value.
    pub filters: HashMap<ColumnId, Vec<String>>,
    pub sort: Option<SortState>,
}

#[derive(Debug, Default)]
struct ColumnControl {
    phase: ColumnPhase,
    draft: Vec<String>,
    option_query: String,
}

/// Filter options of one column, valid for the row collection they were derived from.
struct OptionMemo {
    rows: Arc<[Row]>,
    options: Arc<[FilterOption]>,
}

pub struct TableEngine {
    columns: Vec<ColumnSpec>,
    state: InteractionState,
    controls: HashMap<ColumnId, ColumnControl>,
    memo: HashMap<ColumnId, OptionMemo>,
}

impl TableEngine {
    pub fn new(columns: Vec<ColumnSpec>) -> Self {
        Self {
            columns,
            state: InteractionState::default(),
            controls: HashMap::new(),
            memo: HashMap::new(),
        }
    }

    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    #[cfg(test)]
    pub fn state(&self) -> &InteractionState {
        &self.state
    }

    pub fn spec(&self, column: ColumnId) -> Option<&ColumnSpec> {
        self.columns.iter().find(|c| c.id == column)
    }

    fn filter_kind(&self, column: ColumnId) -> Option<FilterKind> {
        self.spec(column).and_then(|c| c.filter)
    }

    #[cfg(test)]
    pub fn phase(&self, column: ColumnId) -> ColumnPhase {
        self.controls
            .get(&column)
            .map(|c| c.phase)
            .unwrap_or_default()
    }

    pub fn committed(&self, column: ColumnId) -> &[String] {
        self.state
            .filters
            .get(&column)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn is_filtered(&self, column: ColumnId) -> bool {
        !self.committed(column).is_empty()
    }

    pub fn draft(&self, column: ColumnId) -> &[String] {
        self.controls
            .get(&column)
            .map(|c| c.draft.as_slice())
            .unwrap_or_default()
    }

    pub fn option_query(&self, column: ColumnId) -> &str {
        self.controls
            .get(&column)
            .map(|c| c.option_query.as_str())
            .unwrap_or_default()
    }

    /// Open the search box or filter menu of `column`, seeded with its committed values.
    pub fn open(&mut self, column: ColumnId) -> bool {
        if self.filter_kind(column).is_none() {
            return false;
        }
        let committed = self.committed(column).to_vec();
        let control = self.controls.entry(column).or_default();
        control.phase = ColumnPhase::Editing;
        control.draft = committed;
        control.option_query.clear();
        trace!("Opened {column:?} with draft {:?}", control.draft);
        true
    }

    fn editing(&mut self, column: ColumnId) -> Option<&mut ColumnControl> {
        self.controls
            .get_mut(&column)
            .filter(|c| c.phase == ColumnPhase::Editing)
    }

    pub fn edit_search(&mut self, column: ColumnId, text: &str) {
        if let Some(control) = self.editing(column) {
            control.draft = if text.is_empty() {
                Vec::new()
            } else {
                vec![text.to_string()]
            };
        }
    }

    fn commit(&mut self, column: ColumnId) {
        let Some(control) = self.editing(column) else {
            return;
        };
        let values = control.draft.clone();
        debug!("Commit {column:?} filter {values:?}");
        if values.is_empty() {
            self.state.filters.remove(&column);
        } else {
            self.state.filters.insert(column, values);
        }
    }

    fn commit_search(&mut self, column: ColumnId) -> bool {
        if self.filter_kind(column) != Some(FilterKind::Search) || self.editing(column).is_none() {
            return false;
        }
        self.commit(column);
        self.state.active_search_text = self.committed(column).first().cloned().unwrap_or_default();
        self.state.active_search_column = Some(column);
        true
    }

    /// Enter / "Search": commit the text, highlight it and close the box.
    pub fn confirm_search(&mut self, column: ColumnId) {
        if self.commit_search(column) {
            self.set_closed(column);
        }
    }

    /// "Filter": commit and highlight, but keep the box open for refinement.
    pub fn filter_search(&mut self, column: ColumnId) {
        self.commit_search(column);
    }

    /// Clear the column's filter. Resetting a search column also clears the highlighted
    /// text; the highlighted column stays as it was.
    pub fn reset(&mut self, column: ColumnId) {
        if let Some(control) = self.controls.get_mut(&column) {
            control.draft.clear();
            control.option_query.clear();
        }
        self.state.filters.remove(&column);
        if self.filter_kind(column) == Some(FilterKind::Search) {
            self.state.active_search_text.clear();
        }
        debug!("Reset filter of {column:?}");
    }

    /// Close without committing the draft.
    pub fn close(&mut self, column: ColumnId) {
        if let Some(control) = self.controls.get_mut(&column) {
            control.draft.clear();
            control.option_query.clear();
        }
        self.set_closed(column);
    }

    fn set_closed(&mut self, column: ColumnId) {
        let phase = if self.is_filtered(column) {
            ColumnPhase::Committed
        } else {
            ColumnPhase::Closed
        };
        self.controls.entry(column).or_default().phase = phase;
    }

    pub fn set_option_query(&mut self, column: ColumnId, query: &str) {
        if let Some(control) = self.editing(column) {
            control.option_query = query.to_string();
        }
    }

    pub fn toggle_option(&mut self, column: ColumnId, value: &str) {
        if let Some(control) = self.editing(column) {
            if let Some(pos) = control.draft.iter().position(|v| v == value) {
                control.draft.remove(pos);
            } else {
                control.draft.push(value.to_string());
            }
        }
    }

    /// Tree root toggle: select every given option, or deselect them all if they
    /// already are selected.
    pub fn toggle_all_options(&mut self, column: ColumnId, options: &[FilterOption]) {
        if let Some(control) = self.editing(column) {
            let all = options.iter().all(|o| control.draft.contains(&o.value));
            if all {
                control.draft.retain(|v| !options.iter().any(|o| &o.value == v));
            } else {
                for option in options {
                    if !control.draft.contains(&option.value) {
                        control.draft.push(option.value.clone());
                    }
                }
            }
        }
    }

    /// "OK" in the filter menu.
    pub fn confirm_options(&mut self, column: ColumnId) {
        if self.filter_kind(column) != Some(FilterKind::Categorical) || self.editing(column).is_none() {
            return;
        }
        self.commit(column);
        self.set_closed(column);
    }

    /// Filter options for `column`, recomputed only when `rows` is a different collection.
    pub fn filter_options(&mut self, rows: &Arc<[Row]>, column: ColumnId) -> Arc<[FilterOption]> {
        if let Some(memo) = self.memo.get(&column)
            && Arc::ptr_eq(&memo.rows, rows)
        {
            return Arc::clone(&memo.options);
        }
        let options: Arc<[FilterOption]> = derive_filter_options(rows, column).into();
        trace!("Derived {} filter options for {column:?}", options.len());
        self.memo.insert(
            column,
            OptionMemo {
                rows: Arc::clone(rows),
                options: Arc::clone(&options),
            },
        );
        options
    }

    /// Options of the open filter menu narrowed by its option query.
    pub fn visible_options(&mut self, rows: &Arc<[Row]>, column: ColumnId) -> Vec<FilterOption> {
        let options = self.filter_options(rows, column);
        let query = self.option_query(column);
        options
            .iter()
            .filter(|o| contains_folded(&o.text, query))
            .cloned()
            .collect()
    }

    /// Unsorted → ascending → descending → unsorted. Another column starts ascending.
    pub fn cycle_sort(&mut self, column: ColumnId) -> Option<SortState> {
        if !self.spec(column).is_some_and(|c| c.sortable) {
            return self.state.sort;
        }
        self.state.sort = match self.state.sort {
            Some(SortState {
                column: current,
                direction,
            }) if current == column => match direction {
                SortDirection::Ascending => Some(SortState {
                    column,
                    direction: SortDirection::Descending,
                }),
                SortDirection::Descending => None,
            },
            _ => Some(SortState {
                column,
                direction: SortDirection::Ascending,
            }),
        };
        debug!("Sort is now {:?}", self.state.sort);
        self.state.sort
    }

    pub fn sort_of(&self, column: ColumnId) -> Option<SortDirection> {
        self.state
            .sort
            .filter(|s| s.column == column)
            .map(|s| s.direction)
    }

    fn row_matches(&self, row: &Row) -> bool {
        self.state.filters.iter().all(|(column, values)| {
            let value = column.value(row);
            match self.filter_kind(*column) {
                Some(FilterKind::Search) => values.iter().any(|q| contains_folded(value, q)),
                Some(FilterKind::Categorical) => contains_any(value, values),
                None => true,
            }
        })
    }

    /// Positions in `rows` of the visible rows, in display order.
    pub fn view(&self, rows: &[Row]) -> Vec<usize> {
        let mut visible: Vec<usize> = rows
            .iter()
            .enumerate()
            .filter(|(_, row)| self.row_matches(row))
            .map(|(idx, _)| idx)
            .collect();

        if let Some(SortState { column, direction }) = self.state.sort {
            let mut collation = Collation::new();
            // `sort_by` is stable, equal keys keep load order.
            match direction {
                SortDirection::Ascending => visible.sort_by(|&a, &b| {
                    collation.compare(column.value(&rows[a]), column.value(&rows[b]))
                }),
                SortDirection::Descending => visible.sort_by(|&a, &b| {
                    collation.compare(column.value(&rows[b]), column.value(&rows[a]))
                }),
            }
        }
        visible
    }

    /// Cell text split for rendering; only the highlighted column gets emphasis.
    pub fn highlight<'a>(&self, column: ColumnId, text: &'a str) -> Vec<Segment<'a>> {
        if self.state.active_search_column == Some(column) {
            highlight_segments(text, &self.state.active_search_text)
        } else {
            highlight_segments(text, "")
        }
    }
}

/// Distinct values of `column` in order of first appearance, each labeled with itself.
pub fn derive_filter_options(rows: &[Row], column: ColumnId) -> Vec<FilterOption> {
    let mut seen = HashSet::new();
    rows.iter()
        .map(|row| column.value(row))
        .filter(|value| seen.insert(*value))
        .map(|value| FilterOption {
            text: value.to_string(),
            value: value.to_string(),
        })
        .collect()
}

pub fn page_count(total: usize, page_size: usize) -> usize {
    if page_size == 0 {
        return 1;
    }
    total.div_ceil(page_size).max(1)
}

/// Range of view positions on `page` (zero based), clamped to the last page.
pub fn page_bounds(total: usize, page: usize, page_size: usize) -> Range<usize> {
    if page_size == 0 {
        return 0..total;
    }
    let page = page.min(page_count(total, page_size) - 1);
    let begin = page * page_size;
    begin.min(total)..(begin + page_size).min(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{row, university_columns};

    fn rows() -> Arc<[Row]> {
        vec![
            row(0, "Oxford", "United Kingdom", "GB"),
            row(1, "Cambridge", "United Kingdom", "GB"),
            row(2, "Sorbonne", "France", "FR"),
            row(3, "Heidelberg", "Germany", "DE"),
            row(4, "oxford brookes", "United Kingdom", "GB"),
        ]
        .into()
    }

    fn names(rows: &[Row], view: &[usize]) -> Vec<String> {
        view.iter().map(|&i| rows[i].name.clone()).collect()
    }

    fn engine() -> TableEngine {
        TableEngine::new(university_columns())
    }

    fn search(engine: &mut TableEngine, query: &str) {
        engine.open(ColumnId::Name);
        engine.edit_search(ColumnId::Name, query);
        engine.confirm_search(ColumnId::Name);
    }

    #[test]
    fn search_narrows_and_highlights() {
        let rows: Arc<[Row]> = vec![
            row(0, "Oxford", "United Kingdom", "GB"),
            row(1, "Cambridge", "United Kingdom", "GB"),
        ]
        .into();
        let mut engine = engine();
        search(&mut engine, "ox");

        let view = engine.view(&rows);
        assert_eq!(names(&rows, &view), vec!["Oxford"]);
        assert_eq!(engine.phase(ColumnId::Name), ColumnPhase::Committed);
        assert_eq!(engine.state().active_search_text, "ox");
        assert_eq!(engine.state().active_search_column, Some(ColumnId::Name));

        let segments = engine.highlight(ColumnId::Name, "Oxford");
        assert_eq!(segments[0].text, "Ox");
        assert!(segments[0].emphasized);
        assert!(!engine.highlight(ColumnId::Country, "Oxbridge")[0].emphasized);
    }

    #[test]
    fn search_predicate_holds_for_every_row() {
        let rows = rows();
        let mut engine = engine();
        for query in ["", "ox", "OX", "or", "e", "zzz"] {
            search(&mut engine, query);
            let view = engine.view(&rows);
            for (idx, r) in rows.iter().enumerate() {
                let expected = r.name.to_lowercase().contains(&query.to_lowercase());
                assert_eq!(view.contains(&idx), expected, "{query} vs {}", r.name);
            }
        }
    }

    #[test]
    fn empty_confirmed_search_closes_without_filter() {
        let rows = rows();
        let mut engine = engine();
        search(&mut engine, "");
        assert_eq!(engine.view(&rows).len(), rows.len());
        assert_eq!(engine.phase(ColumnId::Name), ColumnPhase::Closed);
        assert!(engine.highlight(ColumnId::Name, "Oxford").iter().all(|s| !s.emphasized));
    }

    #[test]
    fn filter_action_keeps_box_open() {
        let rows = rows();
        let mut engine = engine();
        engine.open(ColumnId::Name);
        engine.edit_search(ColumnId::Name, "ox");
        engine.filter_search(ColumnId::Name);
        assert_eq!(engine.phase(ColumnId::Name), ColumnPhase::Editing);
        assert_eq!(engine.view(&rows).len(), 2);

        engine.edit_search(ColumnId::Name, "oxford b");
        engine.filter_search(ColumnId::Name);
        assert_eq!(names(&rows, &engine.view(&rows)), vec!["oxford brookes"]);
        assert_eq!(engine.state().active_search_text, "oxford b");
    }

    #[test]
    fn reset_keeps_highlight_column_and_round_trips() {
        let rows = rows();
        let mut engine = engine();
        search(&mut engine, "ox");
        let before = engine.view(&rows);

        engine.open(ColumnId::Name);
        engine.reset(ColumnId::Name);
        assert_eq!(engine.view(&rows).len(), rows.len());
        assert_eq!(engine.state().active_search_text, "");
        assert_eq!(engine.state().active_search_column, Some(ColumnId::Name));
        assert!(engine.draft(ColumnId::Name).is_empty());
        // Highlighting against the empty text renders plain.
        let segments = engine.highlight(ColumnId::Name, "Oxford");
        assert_eq!(segments.len(), 1);
        assert!(!segments[0].emphasized);

        engine.edit_search(ColumnId::Name, "ox");
        engine.confirm_search(ColumnId::Name);
        assert_eq!(engine.view(&rows), before);
    }

    #[test]
    fn country_reset_keeps_name_highlight() {
        let rows = rows();
        let mut engine = engine();
        search(&mut engine, "ox");
        engine.open(ColumnId::Country);
        engine.toggle_option(ColumnId::Country, "United Kingdom");
        engine.confirm_options(ColumnId::Country);
        assert_eq!(names(&rows, &engine.view(&rows)), vec!["Oxford", "oxford brookes"]);

        engine.open(ColumnId::Country);
        engine.reset(ColumnId::Country);
        assert!(!engine.is_filtered(ColumnId::Country));
        assert_eq!(engine.state().active_search_text, "ox");
        assert_eq!(names(&rows, &engine.view(&rows)), vec!["Oxford", "oxford brookes"]);
        let segments = engine.highlight(ColumnId::Name, "Oxford");
        assert_eq!(segments[0].text, "Ox");
        assert!(segments[0].emphasized);
    }

    #[test]
    fn close_discards_draft() {
        let rows = rows();
        let mut engine = engine();
        search(&mut engine, "ox");
        engine.open(ColumnId::Name);
        assert_eq!(engine.draft(ColumnId::Name), ["ox".to_string()]);
        engine.edit_search(ColumnId::Name, "cam");
        engine.close(ColumnId::Name);
        assert_eq!(engine.phase(ColumnId::Name), ColumnPhase::Committed);
        assert_eq!(engine.view(&rows).len(), 2);
    }

    #[test]
    fn edits_outside_editing_are_ignored() {
        let rows = rows();
        let mut engine = engine();
        engine.edit_search(ColumnId::Name, "ox");
        engine.confirm_search(ColumnId::Name);
        assert_eq!(engine.view(&rows).len(), rows.len());
        assert!(!engine.open(ColumnId::Code));
        assert_eq!(engine.phase(ColumnId::Code), ColumnPhase::Closed);
    }

    #[test]
    fn categorical_filter_selects_matching_rows() {
        let rows: Arc<[Row]> = vec![
            row(0, "Sorbonne", "France", "FR"),
            row(1, "Heidelberg", "Germany", "DE"),
        ]
        .into();
        let mut engine = engine();
        engine.open(ColumnId::Country);
        engine.toggle_option(ColumnId::Country, "France");
        // Pending selections do not filter yet.
        assert_eq!(engine.view(&rows).len(), 2);
        engine.confirm_options(ColumnId::Country);
        assert_eq!(names(&rows, &engine.view(&rows)), vec!["Sorbonne"]);
        assert_eq!(engine.phase(ColumnId::Country), ColumnPhase::Committed);
    }

    #[test]
    fn categorical_values_are_or_combined_and_anded_with_search() {
        let rows = rows();
        let mut engine = engine();
        engine.open(ColumnId::Country);
        engine.toggle_option(ColumnId::Country, "France");
        engine.toggle_option(ColumnId::Country, "United Kingdom");
        engine.confirm_options(ColumnId::Country);
        assert_eq!(engine.view(&rows).len(), 4);

        search(&mut engine, "ox");
        assert_eq!(
            names(&rows, &engine.view(&rows)),
            vec!["Oxford", "oxford brookes"]
        );

        engine.open(ColumnId::Country);
        engine.toggle_option(ColumnId::Country, "United Kingdom");
        engine.confirm_options(ColumnId::Country);
        assert!(engine.view(&rows).is_empty());
    }

    #[test]
    fn toggling_all_narrowed_options() {
        let rows = rows();
        let mut engine = engine();
        engine.open(ColumnId::Country);
        engine.set_option_query(ColumnId::Country, "an");
        let options = engine.visible_options(&rows, ColumnId::Country);
        let labels: Vec<&str> = options.iter().map(|o| o.text.as_str()).collect();
        assert_eq!(labels, vec!["France", "Germany"]);

        engine.toggle_all_options(ColumnId::Country, &options);
        assert_eq!(engine.draft(ColumnId::Country).len(), 2);
        engine.toggle_all_options(ColumnId::Country, &options);
        assert!(engine.draft(ColumnId::Country).is_empty());
    }

    #[test]
    fn reset_clears_selected_options() {
        let rows = rows();
        let mut engine = engine();
        engine.open(ColumnId::Country);
        engine.toggle_option(ColumnId::Country, "France");
        engine.confirm_options(ColumnId::Country);
        engine.open(ColumnId::Country);
        engine.reset(ColumnId::Country);
        assert_eq!(engine.view(&rows).len(), rows.len());
        engine.close(ColumnId::Country);
        assert_eq!(engine.phase(ColumnId::Country), ColumnPhase::Closed);
    }

    #[test]
    fn filter_options_are_distinct_and_memoized() {
        let rows = rows();
        let mut engine = engine();
        let first = engine.filter_options(&rows, ColumnId::Country);
        let labels: Vec<&str> = first.iter().map(|o| o.value.as_str()).collect();
        assert_eq!(labels, vec!["United Kingdom", "France", "Germany"]);
        assert!(first.iter().all(|o| o.text == o.value));

        let again = engine.filter_options(&rows, ColumnId::Country);
        assert!(Arc::ptr_eq(&first, &again));

        let reloaded: Arc<[Row]> = rows.to_vec().into();
        let fresh = engine.filter_options(&reloaded, ColumnId::Country);
        assert!(!Arc::ptr_eq(&first, &fresh));
        assert_eq!(first, fresh);
    }

    #[test]
    fn sort_cycles_through_three_states() {
        let rows = rows();
        let mut engine = engine();
        let load_order = engine.view(&rows);

        engine.cycle_sort(ColumnId::Name);
        assert_eq!(
            names(&rows, &engine.view(&rows)),
            vec!["Cambridge", "Heidelberg", "Oxford", "oxford brookes", "Sorbonne"]
        );
        engine.cycle_sort(ColumnId::Name);
        assert_eq!(
            names(&rows, &engine.view(&rows)),
            vec!["Sorbonne", "oxford brookes", "Oxford", "Heidelberg", "Cambridge"]
        );
        assert_eq!(engine.cycle_sort(ColumnId::Name), None);
        assert_eq!(engine.view(&rows), load_order);
    }

    #[test]
    fn switching_sort_column_starts_ascending() {
        let mut engine = engine();
        engine.cycle_sort(ColumnId::Name);
        let sort = engine.cycle_sort(ColumnId::Code);
        assert_eq!(
            sort,
            Some(SortState {
                column: ColumnId::Code,
                direction: SortDirection::Ascending
            })
        );
        assert_eq!(engine.sort_of(ColumnId::Name), None);
    }

    #[test]
    fn sort_is_stable_for_equal_keys() {
        let rows = rows();
        let mut engine = engine();
        engine.cycle_sort(ColumnId::Code);
        let view = engine.view(&rows);
        let ids: Vec<usize> = view.iter().map(|&i| rows[i].id).collect();
        // DE, FR, then the three GB rows in load order.
        assert_eq!(ids, vec![3, 2, 0, 1, 4]);

        engine.cycle_sort(ColumnId::Code);
        let ids: Vec<usize> = engine.view(&rows).iter().map(|&i| rows[i].id).collect();
        assert_eq!(ids, vec![0, 1, 4, 2, 3]);
    }

    #[test]
    fn sort_applies_after_filtering() {
        let rows = rows();
        let mut engine = engine();
        engine.open(ColumnId::Country);
        engine.toggle_option(ColumnId::Country, "United Kingdom");
        engine.confirm_options(ColumnId::Country);
        engine.cycle_sort(ColumnId::Name);
        assert_eq!(
            names(&rows, &engine.view(&rows)),
            vec!["Cambridge", "Oxford", "oxford brookes"]
        );
    }

    #[test]
    fn paging() {
        assert_eq!(page_count(0, 10), 1);
        assert_eq!(page_count(10, 10), 1);
        assert_eq!(page_count(11, 10), 2);
        assert_eq!(page_bounds(25, 0, 10), 0..10);
        assert_eq!(page_bounds(25, 2, 10), 20..25);
        assert_eq!(page_bounds(25, 9, 10), 20..25);
        assert_eq!(page_bounds(0, 0, 10), 0..0);
        assert_eq!(page_bounds(7, 0, 0), 0..7);
    }
}
