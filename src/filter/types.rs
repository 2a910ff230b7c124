use crate::record::FieldValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "asc" => Some(SortDirection::Asc),
            "desc" => Some(SortDirection::Desc),
            _ => None,
        }
    }

    pub fn to_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilterOrderInfo {
    pub column: &'static str,
    pub sort: SortDirection,
}

/// `column = value`
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub column: &'static str,
    pub value: FieldValue,
}

/// Equality conditions (ANDed) plus ordering for a listing query.
/// Column names always come from a descriptor, never from the request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListFilter {
    pub conditions: Vec<Condition>,
    pub order: Vec<FilterOrderInfo>,
}

impl ListFilter {
    pub fn eq(mut self, column: &'static str, value: FieldValue) -> Self {
        self.conditions.push(Condition { column, value });
        self
    }

    pub fn order_by(mut self, column: &'static str, sort: SortDirection) -> Self {
        self.order.push(FilterOrderInfo { column, sort });
        self
    }
}

#[derive(Debug, Clone)]
pub struct SqlResult {
    pub query: String,
    pub params: Vec<FieldValue>,
}
