use std::time::Duration;

use tokio::time::Instant;

use crate::config::config;
use crate::database::{SharedStore, StoreTx};
use crate::database::models::{Student, Teacher};
use crate::filter::{ListFilter, SortDirection};
use crate::record::{FieldValue, Record};

use super::record_service::{fetch, select};
use super::{begin_within, settle, ServiceError};

/// Teacher → student relation: a teacher's students are those in the same class
pub struct TeacherService {
    store: SharedStore,
    timeout: Duration,
}

impl TeacherService {
    pub fn new(store: SharedStore) -> Self {
        Self::with_timeout(store, config().database.transaction_timeout())
    }

    pub fn with_timeout(store: SharedStore, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    pub async fn students_for_teacher(&self, teacher_id: i64) -> Result<Vec<Student>, ServiceError> {
        let expires = Instant::now() + self.timeout;
        let mut tx = begin_within(self.store.as_ref(), expires, self.timeout, ServiceError::Timeout).await?;
        let outcome = tokio::time::timeout_at(expires, class_students(tx.as_mut(), teacher_id)).await;
        settle(tx, outcome, self.timeout, ServiceError::Timeout).await
    }

    pub async fn student_count(&self, teacher_id: i64) -> Result<i64, ServiceError> {
        let expires = Instant::now() + self.timeout;
        let mut tx = begin_within(self.store.as_ref(), expires, self.timeout, ServiceError::Timeout).await?;
        let outcome = tokio::time::timeout_at(expires, class_size(tx.as_mut(), teacher_id)).await;
        settle(tx, outcome, self.timeout, ServiceError::Timeout).await
    }
}

async fn class_filter(tx: &mut dyn StoreTx, teacher_id: i64) -> Result<ListFilter, ServiceError> {
    let teacher = fetch::<Teacher>(tx, teacher_id).await?;
    Ok(ListFilter::default()
        .eq("class", FieldValue::Text(teacher.class))
        .order_by("id", SortDirection::Asc))
}

async fn class_students(tx: &mut dyn StoreTx, teacher_id: i64) -> Result<Vec<Student>, ServiceError> {
    let filter = class_filter(tx, teacher_id).await?;
    select::<Student>(tx, &filter).await
}

async fn class_size(tx: &mut dyn StoreTx, teacher_id: i64) -> Result<i64, ServiceError> {
    let filter = class_filter(tx, teacher_id).await?;
    Ok(tx.count(Student::descriptor().schema(), &filter).await?)
}
