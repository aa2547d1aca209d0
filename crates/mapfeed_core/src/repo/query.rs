//! Logical query description and the executor contract.
//!
//! # Responsibility
//! - Describe remote queries without binding to a storage engine.
//! - Define the async executor seam the feed layer depends on.
//!
//! # Invariants
//! - `start_at`/`end_at` are inclusive and apply to the `order_by` field.
//! - `start_after` resumes strictly after the cursor in query order.

use crate::db::DbError;
use crate::model::endorsement::EndorsementEvent;
use crate::model::record::Record;
use async_trait::async_trait;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type QueryResult<T> = Result<T, QueryError>;

/// Errors raised by a record source while executing a query.
#[derive(Debug)]
pub enum QueryError {
    Db(DbError),
    /// Field is not queryable on the target collection.
    UnsupportedField {
        collection: Collection,
        field: Field,
    },
    /// Query shape is inconsistent, e.g. a range bound without ordering.
    InvalidQuery(String),
    /// Persisted row cannot be converted into a domain value.
    InvalidData(String),
    /// Connection guard was poisoned by a panicking holder.
    ConnectionPoisoned,
    /// Remote backend could not be reached.
    Unavailable(String),
}

impl Display for QueryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::UnsupportedField { collection, field } => write!(
                f,
                "field `{}` is not queryable on `{}`",
                field.as_str(),
                collection.as_str()
            ),
            Self::InvalidQuery(message) => write!(f, "invalid query: {message}"),
            Self::InvalidData(message) => write!(f, "invalid source data: {message}"),
            Self::ConnectionPoisoned => write!(f, "source connection lock is poisoned"),
            Self::Unavailable(message) => write!(f, "source unavailable: {message}"),
        }
    }
}

impl Error for QueryError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for QueryError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for QueryError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Queryable collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    Records,
    Endorsements,
}

impl Collection {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Records => "records",
            Self::Endorsements => "endorsements",
        }
    }
}

/// Filterable and sortable fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    IsPrivate,
    EndorsementCount,
    LocalityKey,
    Score,
    TimeBlock,
    LastUpdated,
    /// Endorsement event time.
    Timestamp,
    /// Endorsing user.
    UserId,
    /// Endorsement parent record.
    RecordId,
}

impl Field {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::IsPrivate => "is_private",
            Self::EndorsementCount => "endorsement_count",
            Self::LocalityKey => "locality_key",
            Self::Score => "score",
            Self::TimeBlock => "time_block",
            Self::LastUpdated => "last_updated",
            Self::Timestamp => "timestamp",
            Self::UserId => "user_id",
            Self::RecordId => "record_id",
        }
    }

    /// Whether this field exists on `collection`.
    pub fn belongs_to(self, collection: Collection) -> bool {
        match collection {
            Collection::Records => matches!(
                self,
                Self::IsPrivate
                    | Self::EndorsementCount
                    | Self::LocalityKey
                    | Self::Score
                    | Self::TimeBlock
                    | Self::LastUpdated
            ),
            Collection::Endorsements => {
                matches!(self, Self::Timestamp | Self::UserId | Self::RecordId)
            }
        }
    }
}

/// Scalar value used in predicates, range bounds and cursors.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Integer(i64),
    Real(f64),
    Text(String),
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<u32> for FieldValue {
    fn from(value: u32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self::Real(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// Filter predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Eq(Field, FieldValue),
    Gte(Field, FieldValue),
    In(Field, Vec<FieldValue>),
}

impl Predicate {
    pub fn field(&self) -> Field {
        match self {
            Self::Eq(field, _) | Self::Gte(field, _) | Self::In(field, _) => *field,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// Continuation point: the order-field value and id of the last item seen.
#[derive(Debug, Clone, PartialEq)]
pub struct PageCursor {
    pub value: FieldValue,
    pub id: String,
}

/// Logical query over one collection.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub collection: Collection,
    pub predicates: Vec<Predicate>,
    pub order_by: Option<(Field, SortDirection)>,
    pub limit: Option<u32>,
    pub start_at: Option<FieldValue>,
    pub end_at: Option<FieldValue>,
    pub start_after: Option<PageCursor>,
}

impl Query {
    pub fn new(collection: Collection) -> Self {
        Self {
            collection,
            predicates: Vec::new(),
            order_by: None,
            limit: None,
            start_at: None,
            end_at: None,
            start_after: None,
        }
    }

    pub fn records() -> Self {
        Self::new(Collection::Records)
    }

    pub fn endorsements() -> Self {
        Self::new(Collection::Endorsements)
    }

    /// Restricts the query to public records.
    pub fn public_only(self) -> Self {
        self.where_eq(Field::IsPrivate, false)
    }

    pub fn where_eq(mut self, field: Field, value: impl Into<FieldValue>) -> Self {
        self.predicates.push(Predicate::Eq(field, value.into()));
        self
    }

    pub fn where_gte(mut self, field: Field, value: impl Into<FieldValue>) -> Self {
        self.predicates.push(Predicate::Gte(field, value.into()));
        self
    }

    pub fn where_in<V: Into<FieldValue>>(
        mut self,
        field: Field,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        let values = values.into_iter().map(Into::into).collect();
        self.predicates.push(Predicate::In(field, values));
        self
    }

    pub fn order_by(mut self, field: Field, direction: SortDirection) -> Self {
        self.order_by = Some((field, direction));
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn start_at(mut self, value: impl Into<FieldValue>) -> Self {
        self.start_at = Some(value.into());
        self
    }

    pub fn end_at(mut self, value: impl Into<FieldValue>) -> Self {
        self.end_at = Some(value.into());
        self
    }

    pub fn start_after(mut self, cursor: Option<PageCursor>) -> Self {
        self.start_after = cursor;
        self
    }

    /// Checks field/collection compatibility and range-bound preconditions.
    pub fn validate(&self) -> QueryResult<()> {
        let order_field = self.order_by.map(|(field, _)| field);
        let fields = self
            .predicates
            .iter()
            .map(Predicate::field)
            .chain(order_field);
        for field in fields {
            if !field.belongs_to(self.collection) {
                return Err(QueryError::UnsupportedField {
                    collection: self.collection,
                    field,
                });
            }
        }

        let has_range = self.start_at.is_some() || self.end_at.is_some();
        if (has_range || self.start_after.is_some()) && order_field.is_none() {
            return Err(QueryError::InvalidQuery(
                "range bounds and cursors require an order field".to_string(),
            ));
        }

        Ok(())
    }
}

/// Executes logical queries against a record source.
///
/// Implementations may be remote; every call is a side-effect-free read.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    /// Runs a `Collection::Records` query.
    async fn query_records(&self, query: &Query) -> QueryResult<Vec<Record>>;

    /// Runs a `Collection::Endorsements` query.
    async fn query_endorsements(&self, query: &Query) -> QueryResult<Vec<EndorsementEvent>>;

    /// Resolves one record by id, regardless of visibility.
    async fn get_record(&self, id: &str) -> QueryResult<Option<Record>>;
}
