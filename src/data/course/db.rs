use bson::{doc, Bson};
use mongodb::options::FindOptions;
use mongodb::Database;
use rocket::futures::TryStreamExt;
use uuid::Uuid;

use crate::data::assignment::db::AssignmentDbExt;
use crate::data::filter;
use crate::data::ids::to_bson;
use crate::data::user::db::{require_role, UserDbExt};
use crate::error::{DataResult, Entity, RuleError};
use crate::role::Role;

use super::{
    Course, CourseCreateData, CourseResponse, CourseUpdateData, EnrollData,
    COURSE_COLLECTION_NAME,
};

pub trait CourseDbExt {
    async fn create_course(&self, data: CourseCreateData) -> DataResult<Course>;

    async fn get_course(&self, id: Uuid) -> DataResult<Option<Course>>;

    async fn require_course(&self, id: Uuid) -> DataResult<Course>;

    async fn list_courses(&self) -> DataResult<Vec<Course>>;

    /// Courses owned by a professor, newest first.
    async fn professor_courses(&self, professor: Uuid) -> DataResult<Vec<Course>>;

    async fn enroll_student(&self, data: EnrollData) -> DataResult<Course>;

    /// Updates course details. Any attached assignment is deleted and unlinked.
    async fn update_course(&self, data: CourseUpdateData) -> DataResult<Course>;

    async fn set_course_assignment(&self, course: Uuid, assignment: Option<Uuid>)
        -> DataResult<()>;

    /// Expands owners, assignments and rosters of courses for API responses.
    async fn expand_courses(&self, courses: Vec<Course>) -> DataResult<Vec<CourseResponse>>;
}

impl CourseDbExt for Database {
    async fn create_course(&self, data: CourseCreateData) -> DataResult<Course> {
        data.validate()?;

        let instructor = self.get_user(data.instructor_id).await?;
        let instructor = require_role(instructor, data.instructor_id, Role::Professor)?;

        let course = Course::new(
            data.course_name.trim(),
            data.course_description.trim(),
            instructor.id,
        );

        self.collection::<Course>(COURSE_COLLECTION_NAME)
            .insert_one(&course, None)
            .await?;
        self.add_user_course(instructor.id, course.id).await?;

        tracing::info!("Course {} created by {}", course.id, instructor.id);
        Ok(course)
    }

    async fn get_course(&self, id: Uuid) -> DataResult<Option<Course>> {
        Ok(self
            .collection::<Course>(COURSE_COLLECTION_NAME)
            .find_one(filter::by_id(id), None)
            .await?)
    }

    async fn require_course(&self, id: Uuid) -> DataResult<Course> {
        self.get_course(id)
            .await?
            .ok_or_else(|| RuleError::NotFound(Entity::Course, id).into())
    }

    async fn list_courses(&self) -> DataResult<Vec<Course>> {
        Ok(self
            .collection::<Course>(COURSE_COLLECTION_NAME)
            .find(None, None)
            .await?
            .try_collect()
            .await?)
    }

    async fn professor_courses(&self, professor: Uuid) -> DataResult<Vec<Course>> {
        let user = self.get_user(professor).await?;
        require_role(user, professor, Role::Professor)?;

        let options = FindOptions::builder()
            .sort(doc! { "created_at": -1 })
            .build();

        Ok(self
            .collection::<Course>(COURSE_COLLECTION_NAME)
            .find(filter::by_field("professor_id", professor), options)
            .await?
            .try_collect()
            .await?)
    }

    async fn enroll_student(&self, data: EnrollData) -> DataResult<Course> {
        let mut course = self.require_course(data.course_id).await?;
        let student = self.get_user(data.student_id).await?;
        let student = require_role(student, data.student_id, Role::Student)?;

        course.ensure_can_enroll(student.id)?;

        self.collection::<Course>(COURSE_COLLECTION_NAME)
            .update_one(
                filter::by_id(course.id),
                doc! { "$addToSet": { "students_enrolled": to_bson(student.id) } },
                None,
            )
            .await?;
        self.add_user_course(student.id, course.id).await?;

        tracing::info!("Student {} enrolled in course {}", student.id, course.id);
        course.students_enrolled.push(student.id);
        Ok(course)
    }

    async fn update_course(&self, data: CourseUpdateData) -> DataResult<Course> {
        let mut course = self.require_course(data.course_id).await?;
        let instructor = self.get_user(data.instructor_id).await?;
        require_role(instructor, data.instructor_id, Role::Professor)?;
        course.ensure_owner(data.instructor_id)?;

        if let Some(detached) = course.apply_update(&data) {
            tracing::warn!(
                "Course {} updated, deleting its assignment {}",
                course.id,
                detached
            );
            self.delete_assignment(detached).await?;
        }

        self.collection::<Course>(COURSE_COLLECTION_NAME)
            .update_one(
                filter::by_id(course.id),
                doc! {
                    "$set": {
                        "name": course.name.clone(),
                        "description": course.description.clone(),
                        "assignment_id": Bson::Null,
                    }
                },
                None,
            )
            .await?;

        Ok(course)
    }

    async fn set_course_assignment(
        &self,
        course: Uuid,
        assignment: Option<Uuid>,
    ) -> DataResult<()> {
        let value = assignment.map(to_bson).map(Bson::from).unwrap_or(Bson::Null);

        self.collection::<Course>(COURSE_COLLECTION_NAME)
            .update_one(
                filter::by_id(course),
                doc! { "$set": { "assignment_id": value } },
                None,
            )
            .await?;
        Ok(())
    }

    async fn expand_courses(&self, courses: Vec<Course>) -> DataResult<Vec<CourseResponse>> {
        let mut user_ids: Vec<Uuid> = Vec::new();
        for course in &courses {
            user_ids.push(course.professor_id);
            user_ids.extend(course.students_enrolled.iter().copied());
        }
        user_ids.sort();
        user_ids.dedup();

        let users = self.get_users(&user_ids).await?;

        let mut responses = Vec::with_capacity(courses.len());
        for course in courses {
            let assignment = match course.assignment_id {
                Some(id) => self.get_assignment(id).await?,
                None => None,
            };
            responses.push(CourseResponse::build(course, &users, assignment));
        }

        Ok(responses)
    }
}
