use axum::extract::Path;
use axum::Extension;
use serde::Serialize;

use crate::database::models::{Student, Teacher};
use crate::database::SharedStore;
use crate::middleware::{ApiResponse, ApiResult, Listing};
use crate::services::TeacherService;

use super::records::parse_id;

#[derive(Debug, Serialize)]
pub struct StudentCount {
    pub status: &'static str,
    pub count: i64,
}

/// GET /teachers/:id/students
pub async fn students(
    Extension(store): Extension<SharedStore>,
    Path(id): Path<String>,
) -> ApiResult<Listing<Student>> {
    let id = parse_id::<Teacher>(&id)?;
    let students = TeacherService::new(store).students_for_teacher(id).await?;
    Ok(ApiResponse::success(Listing::success(students)))
}

/// GET /teachers/:id/studentcount
pub async fn student_count(
    Extension(store): Extension<SharedStore>,
    Path(id): Path<String>,
) -> ApiResult<StudentCount> {
    let id = parse_id::<Teacher>(&id)?;
    let count = TeacherService::new(store).student_count(id).await?;
    Ok(ApiResponse::success(StudentCount { status: "success", count }))
}
