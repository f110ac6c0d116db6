use serde::Deserialize;

/// One university as delivered by the endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UniversityRecord {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub alpha_two_code: String,
    #[serde(default)]
    pub domains: Vec<String>,
    #[serde(default)]
    pub web_pages: Vec<String>,
    #[serde(default, rename = "state-province", alias = "state_province")]
    pub state_province: Option<String>,
}

/// A normalized record. `id` is the position in the response it was loaded from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub id: usize,
    pub name: String,
    pub country: String,
    pub country_code: String,
    pub web_pages: Vec<String>,
    pub domains: Vec<String>,
    pub state_province: Option<String>,
}

impl Row {
    pub fn from_record(id: usize, record: UniversityRecord) -> Self {
        Self {
            id,
            name: record.name,
            country: record.country,
            country_code: record.alpha_two_code,
            web_pages: record.web_pages,
            domains: record.domains,
            state_province: record.state_province,
        }
    }

    /// Target of the outbound link. `None` when the record lists no web page.
    pub fn link(&self) -> Option<&str> {
        self.web_pages
            .first()
            .map(String::as_str)
            .filter(|url| !url.is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ColumnId {
    Name,
    Country,
    Code,
}

impl ColumnId {
    pub fn value<'a>(&self, row: &'a Row) -> &'a str {
        match self {
            ColumnId::Name => &row.name,
            ColumnId::Country => &row.country,
            ColumnId::Code => &row.country_code,
        }
    }

    /// Field name used in prompts, e.g. "Search name".
    pub fn key(&self) -> &'static str {
        match self {
            ColumnId::Name => "name",
            ColumnId::Country => "country",
            ColumnId::Code => "alpha_two_code",
        }
    }
}

/// How a column narrows the visible rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
    /// Free text, matched case-insensitively. At most one committed value.
    Search,
    /// Values picked from the distinct values of the column, matched as substrings.
    Categorical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pin {
    None,
    Left,
    Right,
}

#[derive(Debug, Clone)]
pub struct ColumnSpec {
    pub id: ColumnId,
    pub title: &'static str,
    pub filter: Option<FilterKind>,
    pub sortable: bool,
    pub pin: Pin,
    /// Fixed render width, otherwise derived from the content.
    pub fixed_width: Option<usize>,
    pub badge: bool,
    pub link: bool,
}

/// The columns of the university dashboard, in display order.
pub fn university_columns() -> Vec<ColumnSpec> {
    vec![
        ColumnSpec {
            id: ColumnId::Name,
            title: "Name",
            filter: Some(FilterKind::Search),
            sortable: true,
            pin: Pin::Left,
            fixed_width: None,
            badge: false,
            link: true,
        },
        ColumnSpec {
            id: ColumnId::Country,
            title: "Country",
            filter: Some(FilterKind::Categorical),
            sortable: true,
            pin: Pin::None,
            fixed_width: None,
            badge: false,
            link: false,
        },
        ColumnSpec {
            id: ColumnId::Code,
            title: "Code",
            filter: None,
            sortable: true,
            pin: Pin::Right,
            fixed_width: Some(6),
            badge: true,
            link: false,
        },
    ]
}

#[cfg(test)]
pub(crate) fn row(id: usize, name: &str, country: &str, code: &str) -> Row {
    Row {
        id,
        name: name.to_string(),
        country: country.to_string(),
        country_code: code.to_string(),
        web_pages: vec![format!("https://{}.example", name.to_lowercase())],
        domains: Vec::new(),
        state_province: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_accepts_dashed_state_province() {
        let record: UniversityRecord = serde_json::from_str(
            r#"{"name":"Oxford","country":"United Kingdom","alpha_two_code":"GB",
                "domains":["ox.ac.uk"],"web_pages":["https://ox.ac.uk"],"state-province":"Oxon"}"#,
        )
        .unwrap();
        assert_eq!(record.state_province.as_deref(), Some("Oxon"));

        let record: UniversityRecord =
            serde_json::from_str(r#"{"name":"X","state_province":null}"#).unwrap();
        assert_eq!(record.state_province, None);
        assert!(record.web_pages.is_empty());
    }

    #[test]
    fn link_falls_back_to_none() {
        let mut r = row(0, "Oxford", "United Kingdom", "GB");
        assert_eq!(r.link(), Some("https://oxford.example"));
        r.web_pages.clear();
        assert_eq!(r.link(), None);
        r.web_pages.push(String::new());
        assert_eq!(r.link(), None);
    }

    #[test]
    fn column_values() {
        let r = row(0, "Oxford", "United Kingdom", "GB");
        assert_eq!(ColumnId::Name.value(&r), "Oxford");
        assert_eq!(ColumnId::Country.value(&r), "United Kingdom");
        assert_eq!(ColumnId::Code.value(&r), "GB");
    }

    #[test]
    fn pinned_columns_are_first_and_last() {
        let columns = university_columns();
        assert_eq!(columns.first().map(|c| c.pin), Some(Pin::Left));
        assert_eq!(columns.last().map(|c| c.pin), Some(Pin::Right));
    }
}
