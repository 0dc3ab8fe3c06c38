use serde::Serialize;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SortError {
    #[error("invalid sort: {0}")]
    InvalidSort(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortColumn {
    #[default]
    Date,
    Name,
}

impl SortColumn {
    pub const ALL: [SortColumn; 2] = [SortColumn::Date, SortColumn::Name];

    pub fn as_str(&self) -> &'static str {
        match self {
            SortColumn::Date => "date",
            SortColumn::Name => "name",
        }
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            SortColumn::Date => "created_at",
            SortColumn::Name => "name",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BookingSort {
    pub column: SortColumn,
    pub direction: SortDirection,
}

impl BookingSort {
    pub fn parse(raw_column: Option<&str>, raw_direction: Option<&str>) -> Result<Self, SortError> {
        let column = match raw_column.map(str::trim).filter(|s| !s.is_empty()) {
            None => SortColumn::Date,
            Some(c) => match c.to_lowercase().as_str() {
                "date" => SortColumn::Date,
                "name" => SortColumn::Name,
                other => return Err(SortError::InvalidSort(format!("unknown column: {other}"))),
            },
        };

        let direction = match raw_direction.map(str::trim).filter(|s| !s.is_empty()) {
            None => SortDirection::Asc,
            Some(d) => match d.to_lowercase().as_str() {
                "asc" => SortDirection::Asc,
                "desc" => SortDirection::Desc,
                other => {
                    return Err(SortError::InvalidSort(format!("unknown direction: {other}")))
                }
            },
        };

        Ok(Self { column, direction })
    }

    pub fn parse_or_default(
        raw_column: Option<&str>,
        raw_direction: Option<&str>,
    ) -> (Self, Option<SortError>) {
        match Self::parse(raw_column, raw_direction) {
            Ok(sort) => (sort, None),
            Err(e) => {
                tracing::warn!(error = %e, "discarding unknown sort order");
                (Self::default(), Some(e))
            }
        }
    }

    // `ORDER BY` body. Ties fall back to booking time, then id.
    pub fn order_by_sql(&self) -> String {
        match self.column {
            SortColumn::Date => format!("created_at {}, id ASC", self.direction.as_sql()),
            SortColumn::Name => format!(
                "name {}, created_at ASC, id ASC",
                self.direction.as_sql()
            ),
        }
    }
}
