use std::{cmp::Ordering, fmt};

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use handlebars::html_escape;
use serde::{Deserialize, Serialize};

use crate::amount::two_places;

pub type Url = String;

pub const DEFAULT_ENTRIES_PER_PAGE: u32 = 10;
const MAX_ENTRIES_PER_PAGE: u32 = 1000;
pub const SKELETON_ROWS: usize = 5;
const PAGE_WINDOW: i64 = 3;

/// Comparable cell value. Mixed variants order by kind, `Empty` first.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Empty,
    Text(String),
    Number(BigDecimal),
    Time(DateTime<Utc>),
}

impl Value {
    fn rank(&self) -> u8 {
        match self {
            Value::Empty => 0,
            Value::Text(_) => 1,
            Value::Number(_) => 2,
            Value::Time(_) => 3,
        }
    }

    pub fn compare(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Value::Text(a), Value::Text(b)) => a.cmp(b),
            (Value::Number(a), Value::Number(b)) => a.cmp(b),
            (Value::Time(a), Value::Time(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Empty => Ok(()),
            Value::Text(s) => f.write_str(s),
            Value::Number(n) => f.write_str(&two_places(n)),
            Value::Time(t) => write!(f, "{}", t.format("%d %b %Y %H:%M")),
        }
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&BigDecimal> for Value {
    fn from(v: &BigDecimal) -> Self {
        Value::Number(v.clone())
    }
}

impl From<usize> for Value {
    fn from(v: usize) -> Self {
        Value::Number(BigDecimal::from(v as u64))
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::Time(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Empty, Into::into)
    }
}

pub type Accessor<T> = Box<dyn Fn(&T) -> Value + Send + Sync>;
pub type Renderer<T> = Box<dyn Fn(&T) -> String + Send + Sync>;

/// Accessor output is escaped before display; renderers return trusted HTML.
pub enum Cell<T> {
    Accessor(Accessor<T>),
    Renderer(Renderer<T>),
}

pub struct Column<T> {
    key: String,
    header: String,
    cell: Cell<T>,
    sortable: bool,
    sort_key: Option<Accessor<T>>,
}

impl<T> Column<T> {
    pub fn accessor(
        key: impl Into<String>,
        header: impl Into<String>,
        f: impl Fn(&T) -> Value + Send + Sync + 'static,
    ) -> Self {
        Self {
            key: key.into(),
            header: header.into(),
            cell: Cell::Accessor(Box::new(f)),
            sortable: false,
            sort_key: None,
        }
    }

    pub fn renderer(
        key: impl Into<String>,
        header: impl Into<String>,
        f: impl Fn(&T) -> String + Send + Sync + 'static,
    ) -> Self {
        Self {
            key: key.into(),
            header: header.into(),
            cell: Cell::Renderer(Box::new(f)),
            sortable: false,
            sort_key: None,
        }
    }

    pub fn sortable(mut self) -> Self {
        self.sortable = true;
        self
    }

    /// Sorts by `f` instead of the displayed value. Implies `sortable`.
    pub fn sort_by(mut self, f: impl Fn(&T) -> Value + Send + Sync + 'static) -> Self {
        self.sort_key = Some(Box::new(f));
        self.sortable = true;
        self
    }

    pub fn is_sortable(&self) -> bool {
        self.sortable && (self.sort_key.is_some() || matches!(self.cell, Cell::Accessor(_)))
    }

    fn comparable(&self, row: &T) -> Value {
        match (&self.sort_key, &self.cell) {
            (Some(k), _) => k(row),
            (None, Cell::Accessor(a)) => a(row),
            (None, Cell::Renderer(_)) => Value::Empty,
        }
    }

    fn render(&self, row: &T) -> String {
        match &self.cell {
            Cell::Accessor(a) => html_escape(&a(row).to_string()),
            Cell::Renderer(r) => r(row),
        }
    }
}

pub struct Search<T> {
    field: Accessor<T>,
    placeholder: String,
}

impl<T> Search<T> {
    pub fn new(
        placeholder: impl Into<String>,
        field: impl Fn(&T) -> Value + Send + Sync + 'static,
    ) -> Self {
        Self {
            field: Box::new(field),
            placeholder: placeholder.into(),
        }
    }

    fn matches(&self, row: &T, term_lowercase: &str) -> bool {
        (self.field)(row)
            .to_string()
            .to_lowercase()
            .contains(term_lowercase)
    }
}

pub struct Filter<T> {
    field: Accessor<T>,
    label: String,
    options: Vec<String>,
}

impl<T> Filter<T> {
    pub fn new(
        label: impl Into<String>,
        options: Vec<String>,
        field: impl Fn(&T) -> Value + Send + Sync + 'static,
    ) -> Self {
        Self {
            field: Box::new(field),
            label: label.into(),
            options,
        }
    }

    fn matches(&self, row: &T, value: &str) -> bool {
        (self.field)(row).to_string() == value
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn toggle(self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Sort {
    pub key: String,
    pub direction: SortDirection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// All rows are in memory; filter, search, sort and paging happen here.
    ClientSide,
    /// Rows are one page fetched by the caller, who is told about changes via `TableEvents`.
    ServerDelegated { total_rows: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableState {
    pub page: u32,
    pub sort: Option<Sort>,
    pub search: String,
    pub filter: Option<String>,
}

impl Default for TableState {
    fn default() -> Self {
        Self {
            page: 1,
            sort: None,
            search: String::new(),
            filter: None,
        }
    }
}

pub trait TableEvents {
    fn on_search_change(&mut self, _term: &str) {}
    fn on_filter_change(&mut self, _value: Option<&str>) {}
    fn on_sort_change(&mut self, _key: &str, _direction: SortDirection) {}
    fn on_page_change(&mut self, _page: u32) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoEvents;

impl TableEvents for NoEvents {}

#[derive(Debug, Clone, Serialize)]
pub struct Action {
    pub label: String,
    pub link: Url,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmptyState {
    pub message: String,
    pub action: Option<Action>,
}

impl Default for EmptyState {
    fn default() -> Self {
        Self {
            message: "Nothing to show yet.".to_string(),
            action: None,
        }
    }
}

#[derive(Serialize, Default, Debug)]
pub struct Page {
    pub page_number: u32,
    pub is_current_page: bool,
    pub link: Url,
}

#[derive(Serialize, Debug)]
pub struct HeaderCell {
    pub key: String,
    pub header: String,
    pub sortable: bool,
    pub direction: Option<SortDirection>,
    pub link: Option<Url>,
}

#[derive(Serialize, Debug)]
pub struct Row {
    pub cells: Vec<String>,
}

#[derive(Serialize, Debug)]
pub struct SearchControl {
    pub placeholder: String,
    pub term: String,
}

#[derive(Serialize, Debug)]
pub struct FilterOption {
    pub value: String,
    pub selected: bool,
}

#[derive(Serialize, Debug)]
pub struct FilterControl {
    pub label: String,
    pub options: Vec<FilterOption>,
}

#[derive(Serialize, Debug)]
pub struct Param {
    pub name: String,
    pub value: String,
}

#[derive(Serialize, Default, Debug)]
pub struct TableComponent {
    pub columns: Vec<HeaderCell>,
    pub rows: Vec<Row>,
    pub is_loading: bool,
    pub skeleton: Vec<Row>,
    pub empty: Option<EmptyState>,
    pub search: Option<SearchControl>,
    pub filter: Option<FilterControl>,
    pub action: Url,
    pub hidden: Vec<Param>,
    pub sort: Option<Sort>,
    pub reload: Url,
    pub pages: Vec<Page>,
    pub first_page: Option<Url>,
    pub last_page: Option<Page>,
    pub previous_page: Option<Url>,
    pub next_page: Option<Url>,
    pub total_rows: usize,
    pub total_pages: u32,
    pub current_page: u32,
    pub max_entries_per_page: u32,
}

#[derive(Deserialize, Default, Debug)]
pub struct Query {
    page: Option<u32>,
    entries_per_page: Option<u32>,
    search: Option<String>,
    filter: Option<String>,
    sort: Option<String>,
    dir: Option<SortDirection>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueryNormalized {
    pub page: u32,
    pub entries_per_page: u32,
    pub search: String,
    pub filter: Option<String>,
    pub sort: Option<Sort>,
}

impl QueryNormalized {
    pub fn limit(&self) -> usize {
        self.entries_per_page as usize
    }

    pub fn offset(&self) -> usize {
        self.page.saturating_sub(1) as usize * self.limit()
    }
}

impl Query {
    pub fn normalize(&self, default_entries_per_page: u32) -> QueryNormalized {
        let non_empty = |v: &Option<String>| {
            v.as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        QueryNormalized {
            page: self.page.unwrap_or(1).max(1),
            entries_per_page: self
                .entries_per_page
                .unwrap_or(default_entries_per_page)
                .clamp(1, MAX_ENTRIES_PER_PAGE),
            search: non_empty(&self.search).unwrap_or_default(),
            filter: non_empty(&self.filter),
            sort: non_empty(&self.sort).map(|key| Sort {
                key,
                direction: self.dir.unwrap_or(SortDirection::Asc),
            }),
        }
    }
}

pub fn total_pages(total_rows: usize, entries_per_page: u32) -> u32 {
    total_rows.div_ceil(entries_per_page.max(1) as usize) as u32
}

pub fn clamp_page(page: u32, total_pages: u32) -> u32 {
    page.clamp(1, total_pages.max(1))
}

/// A processed slice of rows, ready to render.
pub struct Processed<'r, T> {
    pub rows: Vec<&'r T>,
    pub total_rows: usize,
    pub total_pages: u32,
    pub page: u32,
}

pub struct TableView<T, E = NoEvents> {
    columns: Vec<Column<T>>,
    mode: Mode,
    entries_per_page: u32,
    search: Option<Search<T>>,
    filter: Option<Filter<T>>,
    empty: EmptyState,
    api_path: String,
    params: Vec<(String, String)>,
    state: TableState,
    events: E,
}

impl<T> TableView<T, NoEvents> {
    pub fn client_side(columns: Vec<Column<T>>) -> Self {
        Self::new(columns, Mode::ClientSide)
    }

    pub fn server_delegated(columns: Vec<Column<T>>, total_rows: usize) -> Self {
        Self::new(columns, Mode::ServerDelegated { total_rows })
    }

    fn new(columns: Vec<Column<T>>, mode: Mode) -> Self {
        Self {
            columns,
            mode,
            entries_per_page: DEFAULT_ENTRIES_PER_PAGE,
            search: None,
            filter: None,
            empty: EmptyState::default(),
            api_path: String::new(),
            params: Vec::new(),
            state: TableState::default(),
            events: NoEvents,
        }
    }
}

impl<T, E: TableEvents> TableView<T, E> {
    pub fn with_events<E2: TableEvents>(self, events: E2) -> TableView<T, E2> {
        TableView {
            columns: self.columns,
            mode: self.mode,
            entries_per_page: self.entries_per_page,
            search: self.search,
            filter: self.filter,
            empty: self.empty,
            api_path: self.api_path,
            params: self.params,
            state: self.state,
            events,
        }
    }

    pub fn entries_per_page(mut self, n: u32) -> Self {
        self.entries_per_page = n.clamp(1, MAX_ENTRIES_PER_PAGE);
        self
    }

    pub fn searchable(mut self, search: Search<T>) -> Self {
        self.search = Some(search);
        self
    }

    pub fn filterable(mut self, filter: Filter<T>) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn empty_state(mut self, empty: EmptyState) -> Self {
        self.empty = empty;
        self
    }

    pub fn api_path(mut self, path: impl Into<String>) -> Self {
        self.api_path = path.into();
        self
    }

    /// Extra query parameter carried by every generated link.
    pub fn param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((name.into(), value.into()));
        self
    }

    pub fn state(&self) -> &TableState {
        &self.state
    }

    pub fn events(&self) -> &E {
        &self.events
    }

    /// Updates the row count once the caller has fetched a page. Server-delegated only.
    pub fn set_total_rows(&mut self, total: usize) {
        if let Mode::ServerDelegated { total_rows } = &mut self.mode {
            *total_rows = total;
        }
    }

    pub fn set_search(&mut self, term: impl Into<String>) {
        let term = term.into();
        if term == self.state.search {
            return;
        }
        self.state.search = term;
        if self.mode == Mode::ClientSide {
            self.state.page = 1;
        }
        self.events.on_search_change(&self.state.search);
    }

    pub fn set_filter(&mut self, value: Option<String>) {
        let value = value.filter(|v| !v.is_empty());
        if value == self.state.filter {
            return;
        }
        self.state.filter = value;
        if self.mode == Mode::ClientSide {
            self.state.page = 1;
        }
        self.events.on_filter_change(self.state.filter.as_deref());
    }

    /// Header click: ascending on a new column, otherwise flips direction.
    /// Returns false when the column does not exist or cannot be sorted.
    pub fn toggle_sort(&mut self, key: &str) -> bool {
        let direction = match &self.state.sort {
            Some(s) if s.key == key => s.direction.toggle(),
            _ => SortDirection::Asc,
        };
        self.set_sort(key, direction)
    }

    pub fn set_sort(&mut self, key: &str, direction: SortDirection) -> bool {
        if !self.columns.iter().any(|c| c.key == key && c.is_sortable()) {
            log::debug!("ignoring sort on unknown or unsortable column '{}'", key);
            return false;
        }
        let sort = Sort {
            key: key.to_string(),
            direction,
        };
        if self.state.sort.as_ref() == Some(&sort) {
            return true;
        }
        self.state.sort = Some(sort);
        self.events.on_sort_change(key, direction);
        true
    }

    pub fn set_page(&mut self, page: u32) {
        let page = page.max(1);
        if page == self.state.page {
            return;
        }
        self.state.page = page;
        self.events.on_page_change(page);
    }

    /// Replays a request's query onto the view. Page goes last so it survives
    /// the page reset a search or filter change causes in client-side mode.
    pub fn apply(&mut self, query: &QueryNormalized) {
        self.entries_per_page = query.entries_per_page;
        self.set_filter(query.filter.clone());
        self.set_search(query.search.clone());
        if let Some(sort) = &query.sort {
            self.set_sort(&sort.key, sort.direction);
        }
        self.set_page(query.page);
    }

    /// Rows left after filter and search, in input order.
    pub fn visible<'r>(&self, rows: &'r [T]) -> Vec<&'r T> {
        if let Mode::ServerDelegated { .. } = self.mode {
            return rows.iter().collect();
        }

        let term = self.state.search.to_lowercase();
        rows.iter()
            .filter(|r| match (&self.filter, &self.state.filter) {
                (Some(f), Some(value)) => f.matches(r, value),
                _ => true,
            })
            .filter(|r| match &self.search {
                Some(s) if !term.is_empty() => s.matches(r, &term),
                _ => true,
            })
            .collect()
    }

    pub fn process<'r>(&self, rows: &'r [T]) -> Processed<'r, T> {
        match self.mode {
            Mode::ServerDelegated { total_rows } => {
                let total_pages = total_pages(total_rows, self.entries_per_page);
                Processed {
                    rows: rows.iter().collect(),
                    total_rows,
                    total_pages,
                    page: clamp_page(self.state.page, total_pages),
                }
            }
            Mode::ClientSide => {
                let mut visible = self.visible(rows);

                if let Some(sort) = &self.state.sort {
                    if let Some(column) = self.columns.iter().find(|c| c.key == sort.key) {
                        visible.sort_by(|a, b| {
                            let ord = column.comparable(a).compare(&column.comparable(b));
                            match sort.direction {
                                SortDirection::Asc => ord,
                                SortDirection::Desc => ord.reverse(),
                            }
                        });
                    }
                }

                let total_rows = visible.len();
                let total_pages = total_pages(total_rows, self.entries_per_page);
                let page = clamp_page(self.state.page, total_pages);
                let size = self.entries_per_page as usize;
                let rows = visible
                    .into_iter()
                    .skip((page as usize - 1) * size)
                    .take(size)
                    .collect();

                Processed {
                    rows,
                    total_rows,
                    total_pages,
                    page,
                }
            }
        }
    }

    pub fn render(&self, rows: &[T]) -> TableComponent {
        let processed = self.process(rows);

        let mut component = self.frame(processed.page);
        component.rows = processed
            .rows
            .iter()
            .map(|r| Row {
                cells: self.columns.iter().map(|c| c.render(r)).collect(),
            })
            .collect();
        component.total_rows = processed.total_rows;
        component.total_pages = processed.total_pages;
        if processed.total_rows == 0 {
            component.empty = Some(self.empty.clone());
        }
        self.paginate(&mut component);
        component
    }

    /// Placeholder shown while rows are being fetched.
    pub fn render_loading(&self) -> TableComponent {
        let mut component = self.frame(self.state.page);
        component.is_loading = true;
        component.skeleton = (0..SKELETON_ROWS)
            .map(|_| Row {
                cells: vec![String::new(); self.columns.len()],
            })
            .collect();
        component
    }

    fn frame(&self, page: u32) -> TableComponent {
        let mut component = TableComponent::default();
        component.current_page = page;
        component.max_entries_per_page = self.entries_per_page;
        component.action = self.api_path.clone();
        component.sort = self.state.sort.clone();
        component.reload = self.link(page, self.state.sort.as_ref());
        component.hidden = self
            .params
            .iter()
            .map(|(name, value)| Param {
                name: name.clone(),
                value: value.clone(),
            })
            .collect();
        component.columns = self
            .columns
            .iter()
            .map(|c| {
                let sortable = c.is_sortable();
                let direction = self
                    .state
                    .sort
                    .as_ref()
                    .filter(|s| s.key == c.key)
                    .map(|s| s.direction);
                let link = sortable.then(|| {
                    let next = Sort {
                        key: c.key.clone(),
                        direction: direction.map_or(SortDirection::Asc, SortDirection::toggle),
                    };
                    self.link(1, Some(&next))
                });
                HeaderCell {
                    key: c.key.clone(),
                    header: c.header.clone(),
                    sortable,
                    direction,
                    link,
                }
            })
            .collect();
        component.search = self.search.as_ref().map(|s| SearchControl {
            placeholder: s.placeholder.clone(),
            term: self.state.search.clone(),
        });
        component.filter = self.filter.as_ref().map(|f| FilterControl {
            label: f.label.clone(),
            options: f
                .options
                .iter()
                .map(|o| FilterOption {
                    value: o.clone(),
                    selected: self.state.filter.as_deref() == Some(o.as_str()),
                })
                .collect(),
        });
        component
    }

    fn paginate(&self, component: &mut TableComponent) {
        let number_of_pages = component.total_pages;
        let current_page = component.current_page;
        let sort = self.state.sort.as_ref();

        component.pages = (current_page as i64 - PAGE_WINDOW..=current_page as i64 + PAGE_WINDOW)
            .filter(|p| *p >= 1)
            .filter(|p| *p <= number_of_pages as i64)
            .map(|p| Page {
                page_number: p as u32,
                is_current_page: p == current_page as i64,
                link: self.link(p as u32, sort),
            })
            .collect();

        let (first, last) = match (component.pages.first(), component.pages.last()) {
            (Some(first), Some(last)) => (first.page_number, last.page_number),
            _ => return,
        };

        if last != number_of_pages {
            component.last_page = Some(Page {
                page_number: number_of_pages,
                is_current_page: false,
                link: self.link(number_of_pages, sort),
            });
        }

        if first != 1 {
            component.first_page = Some(self.link(1, sort));
        }

        if current_page != number_of_pages {
            component.next_page = Some(self.link(current_page + 1, sort));
        }

        if current_page != 1 {
            component.previous_page = Some(self.link(current_page - 1, sort));
        }
    }

    fn link(&self, page: u32, sort: Option<&Sort>) -> Url {
        let mut query = url::form_urlencoded::Serializer::new(String::new());
        for (name, value) in &self.params {
            query.append_pair(name, value);
        }
        if !self.state.search.is_empty() {
            query.append_pair("search", &self.state.search);
        }
        if let Some(filter) = &self.state.filter {
            query.append_pair("filter", filter);
        }
        if let Some(sort) = sort {
            query.append_pair("sort", &sort.key);
            query.append_pair("dir", sort.direction.as_str());
        }
        query.append_pair("page", &page.to_string());
        query.append_pair("entries_per_page", &self.entries_per_page.to_string());
        format!("{}?{}", self.api_path, query.finish())
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Item {
        name: &'static str,
        kind: &'static str,
        v: i32,
    }

    fn item(name: &'static str, kind: &'static str, v: i32) -> Item {
        Item { name, kind, v }
    }

    fn columns() -> Vec<Column<Item>> {
        vec![
            Column::accessor("name", "Name", |i: &Item| Value::from(i.name)).sortable(),
            Column::accessor("kind", "Type", |i: &Item| Value::from(i.kind)),
            Column::accessor("v", "Value", |i: &Item| {
                Value::Number(BigDecimal::from(i.v))
            })
            .sortable(),
            Column::renderer("badge", "Badge", |i: &Item| format!("<b>{}</b>", i.name)),
        ]
    }

    fn client_view() -> TableView<Item> {
        TableView::client_side(columns())
            .searchable(Search::new("Name", |i: &Item| Value::from(i.name)))
            .filterable(Filter::new(
                "Type",
                vec!["X".into(), "Y".into()],
                |i: &Item| Value::from(i.kind),
            ))
            .api_path("/api/items")
    }

    fn many(n: i32) -> Vec<Item> {
        (0..n).map(|v| item("row", "X", v)).collect()
    }

    #[derive(Default, Debug)]
    struct Recorder {
        calls: Vec<String>,
    }

    impl TableEvents for Recorder {
        fn on_search_change(&mut self, term: &str) {
            self.calls.push(format!("search:{}", term));
        }
        fn on_filter_change(&mut self, value: Option<&str>) {
            self.calls.push(format!("filter:{}", value.unwrap_or("")));
        }
        fn on_sort_change(&mut self, key: &str, direction: SortDirection) {
            self.calls.push(format!("sort:{}:{}", key, direction.as_str()));
        }
        fn on_page_change(&mut self, page: u32) {
            self.calls.push(format!("page:{}", page));
        }
    }

    #[test]
    fn filter_search_sort_pipeline() {
        let rows = vec![item("A", "X", 3), item("B", "Y", 1), item("AB", "X", 2)];
        let mut view = client_view();
        view.set_filter(Some("X".into()));
        view.set_search("a");
        view.toggle_sort("v");

        let processed = view.process(&rows);

        let got: Vec<(&str, i32)> = processed.rows.iter().map(|i| (i.name, i.v)).collect();
        assert_eq!(got, vec![("AB", 2), ("A", 3)]);
        assert_eq!(processed.total_rows, 2);
    }

    #[test]
    fn search_is_case_insensitive_substring() {
        let rows = vec![item("Ramesh", "X", 1), item("suresh", "X", 2), item("Anil", "X", 3)];
        let mut view = client_view();
        view.set_search("ESH");
        let names: Vec<&str> = view.visible(&rows).iter().map(|i| i.name).collect();
        assert_eq!(names, vec!["Ramesh", "suresh"]);
    }

    #[test]
    fn pages_clamp_to_last() {
        let rows = many(25);
        let mut view = client_view();
        view.set_page(4);

        let processed = view.process(&rows);

        assert_eq!(processed.total_pages, 3);
        assert_eq!(processed.page, 3);
        assert_eq!(processed.rows.len(), 5);
        assert_eq!(processed.rows[0].v, 20);
    }

    #[test]
    fn page_zero_clamps_to_first() {
        let mut view = client_view();
        view.set_page(0);
        assert_eq!(view.state().page, 1);
        assert_eq!(clamp_page(0, 3), 1);
        assert_eq!(clamp_page(7, 0), 1);
    }

    #[test]
    fn sort_cycles_between_two_directions() {
        let mut view = client_view();
        assert!(view.toggle_sort("name"));
        assert_eq!(view.state().sort.as_ref().unwrap().direction, SortDirection::Asc);
        view.toggle_sort("name");
        assert_eq!(view.state().sort.as_ref().unwrap().direction, SortDirection::Desc);
        view.toggle_sort("name");
        assert_eq!(view.state().sort.as_ref().unwrap().direction, SortDirection::Asc);

        view.toggle_sort("v");
        let sort = view.state().sort.clone().unwrap();
        assert_eq!(sort.key, "v");
        assert_eq!(sort.direction, SortDirection::Asc);
    }

    #[test]
    fn unsortable_columns_are_ignored() {
        let mut view = client_view();
        assert!(!view.toggle_sort("kind"));
        assert!(!view.toggle_sort("badge"));
        assert!(!view.toggle_sort("missing"));
        assert_eq!(view.state().sort, None);
    }

    #[test]
    fn descending_sort_is_stable() {
        let rows = vec![item("a", "X", 1), item("b", "X", 2), item("c", "X", 1)];
        let mut view = client_view();
        view.set_sort("v", SortDirection::Desc);
        let names: Vec<&str> = view.process(&rows).rows.iter().map(|i| i.name).collect();
        assert_eq!(names, vec!["b", "a", "c"]);
    }

    #[test]
    fn client_side_search_resets_page() {
        let mut view = client_view().with_events(Recorder::default());
        view.set_page(3);
        view.set_search("row");
        assert_eq!(view.state().page, 1);
        view.set_page(2);
        view.set_filter(Some("X".into()));
        assert_eq!(view.state().page, 1);
        assert_eq!(
            view.events().calls,
            vec!["page:3", "search:row", "page:2", "filter:X"]
        );
    }

    #[test]
    fn server_delegated_keeps_page_and_reports_changes() {
        let mut view = TableView::server_delegated(columns(), 0)
            .searchable(Search::new("Name", |i: &Item| Value::from(i.name)))
            .with_events(Recorder::default());

        view.set_page(2);
        view.set_search("ab");
        view.toggle_sort("name");
        view.toggle_sort("name");

        assert_eq!(view.state().page, 2);
        assert_eq!(
            view.events().calls,
            vec!["page:2", "search:ab", "sort:name:asc", "sort:name:desc"]
        );
    }

    #[test]
    fn server_delegated_renders_rows_as_given() {
        let page = vec![item("Z", "Y", 9), item("A", "X", 1)];
        let mut view = TableView::server_delegated(columns(), 0).entries_per_page(2);
        view.set_search("nothing matches");
        view.set_page(2);
        view.set_total_rows(5);

        let component = view.render(&page);

        assert_eq!(component.rows.len(), 2);
        assert_eq!(component.rows[0].cells[0], "Z");
        assert_eq!(component.total_rows, 5);
        assert_eq!(component.total_pages, 3);
        assert_eq!(component.current_page, 2);
        assert!(component.empty.is_none());
    }

    #[test]
    fn loading_renders_skeleton_only() {
        let view = client_view();
        let component = view.render_loading();
        assert!(component.is_loading);
        assert!(component.rows.is_empty());
        assert_eq!(component.skeleton.len(), SKELETON_ROWS);
        assert!(component.skeleton.iter().all(|r| r.cells.len() == 4));
        assert!(component.empty.is_none());
    }

    #[test]
    fn empty_state_after_filtering() {
        let rows = vec![item("A", "X", 1)];
        let mut view = client_view().empty_state(EmptyState {
            message: "No items".into(),
            action: Some(Action {
                label: "Import".into(),
                link: "/import".into(),
            }),
        });
        view.set_filter(Some("Y".into()));

        let component = view.render(&rows);

        let empty = component.empty.expect("empty state");
        assert_eq!(empty.message, "No items");
        assert_eq!(empty.action.unwrap().link, "/import");
        assert!(component.pages.is_empty());
        assert_eq!(component.current_page, 1);
    }

    #[test]
    fn render_builds_cells_and_page_links() {
        let rows = many(95);
        let mut view = client_view().param("customer", "Ramesh Kumar");
        view.set_search("row");
        view.set_sort("v", SortDirection::Desc);
        view.set_page(5);

        let component = view.render(&rows);

        assert_eq!(component.rows.len(), 10);
        assert_eq!(component.rows[0].cells, vec!["row", "X", "54.00", "<b>row</b>"]);
        let numbers: Vec<u32> = component.pages.iter().map(|p| p.page_number).collect();
        assert_eq!(numbers, vec![2, 3, 4, 5, 6, 7, 8]);
        assert!(component.pages[3].is_current_page);
        assert_eq!(component.last_page.as_ref().unwrap().page_number, 10);
        assert_eq!(
            component.next_page.as_deref(),
            Some("/api/items?customer=Ramesh+Kumar&search=row&sort=v&dir=desc&page=6&entries_per_page=10")
        );
        assert!(component.first_page.is_some());
        assert!(component.previous_page.is_some());

        let v = component.columns.iter().find(|c| c.key == "v").unwrap();
        assert_eq!(v.direction, Some(SortDirection::Desc));
        assert!(v.link.as_ref().unwrap().contains("dir=asc"));
        assert!(component.columns.iter().find(|c| c.key == "kind").unwrap().link.is_none());
    }

    #[test]
    fn query_normalization() {
        let q: Query = serde_json::from_value(serde_json::json!({
            "page": 0,
            "entries_per_page": 5000,
            "search": "  ",
            "filter": "CASH",
            "sort": "amount",
            "dir": "desc",
        }))
        .unwrap();

        let n = q.normalize(10);

        assert_eq!(n.page, 1);
        assert_eq!(n.entries_per_page, 1000);
        assert_eq!(n.search, "");
        assert_eq!(n.filter.as_deref(), Some("CASH"));
        assert_eq!(
            n.sort,
            Some(Sort {
                key: "amount".into(),
                direction: SortDirection::Desc
            })
        );

        assert_eq!(n.offset(), 0);
        assert_eq!(n.limit(), 1000);

        let n = Query::default().normalize(10);
        assert_eq!(n.entries_per_page, 10);
        assert_eq!(QueryNormalized { page: 3, ..n.clone() }.offset(), 20);
        assert_eq!(n.sort, None);
    }

    #[test]
    fn apply_keeps_requested_page_after_search() {
        let rows = many(30);
        let mut view = client_view();
        let q: Query = serde_json::from_value(serde_json::json!({
            "page": 2,
            "search": "row",
            "sort": "v",
            "dir": "desc",
        }))
        .unwrap();

        view.apply(&q.normalize(10));
        let processed = view.process(&rows);

        assert_eq!(processed.page, 2);
        assert_eq!(processed.rows[0].v, 19);
    }

    #[test]
    fn values_compare_and_display() {
        let n = |s: &str| Value::Number(BigDecimal::from_str(s).unwrap());
        assert_eq!(n("2").compare(&n("10")), Ordering::Less);
        assert_eq!(Value::from("b").compare(&Value::from("a")), Ordering::Greater);
        assert_eq!(Value::Empty.compare(&n("-1")), Ordering::Less);
        assert_eq!(n("80").to_string(), "80.00");
        assert_eq!(n("1.004").to_string(), "1.00");
        assert_eq!(n("0").to_string(), "0.00");
        assert_eq!(Value::from(None::<String>).to_string(), "");
    }
}
