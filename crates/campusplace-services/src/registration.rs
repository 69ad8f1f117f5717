//! Student registration and profiles.

use std::sync::Arc;

use tracing::debug;

use campusplace_client::{DataClient, Error};
use campusplace_proto::{EqFilter, OrderSpec, Row, SelectQuery};

use crate::models::{NewStudent, Student};
use crate::tables;

/// Registration flows: creating student records and maintaining profiles.
pub struct RegistrationService {
    client: Arc<DataClient>,
}

impl RegistrationService {
    /// Create the service over a data client.
    pub fn new(client: Arc<DataClient>) -> Self {
        Self { client }
    }

    /// Register a new student. The record starts pending verification.
    pub async fn register(&self, new: NewStudent) -> Result<Student, Error> {
        let student: Student = self.client.insert(tables::STUDENTS, &new).await?;
        debug!(student_id = student.id, college_id = student.college_id, "student registered");
        Ok(student)
    }

    /// Fetch one student by id.
    pub async fn student(&self, id: i64) -> Result<Student, Error> {
        self.client
            .fetch_one(SelectQuery::new(tables::STUDENTS).with_filter(EqFilter::new("id", id)))
            .await
    }

    /// All students registered under a college, newest first.
    pub async fn students_for_college(&self, college_id: i64) -> Result<Vec<Student>, Error> {
        self.client
            .fetch(
                SelectQuery::new(tables::STUDENTS)
                    .with_filter(EqFilter::new("college_id", college_id))
                    .with_order(OrderSpec::desc("created_at")),
            )
            .await
    }

    /// Apply profile changes to a student and return the updated record.
    pub async fn update_profile(&self, id: i64, changes: Row) -> Result<Student, Error> {
        let mut updated: Vec<Student> = self
            .client
            .update_returning(tables::STUDENTS, vec![EqFilter::new("id", id)], changes)
            .await?;
        updated
            .pop()
            .ok_or_else(|| Error::NotFound(tables::STUDENTS.to_string()))
    }
}
