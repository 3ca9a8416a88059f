use crate::db::{CourseStore, StoreError};
use crate::models::{Course, NewCourseRequest, UpdateCourseRequest};

pub async fn fetch_courses(db: &CourseStore) -> Result<Vec<Course>, StoreError> {
    Ok(db.read().await?.courses)
}

pub async fn fetch_featured_courses(db: &CourseStore) -> Result<Vec<Course>, StoreError> {
    let courses = db.read().await?.courses;
    Ok(courses.into_iter().filter(|c| c.featured).collect())
}

pub async fn find_course_by_id(db: &CourseStore, id: u64) -> Result<Option<Course>, StoreError> {
    let doc = db.read().await?;
    Ok(doc.courses.into_iter().find(|c| c.id == id))
}

pub async fn insert_course(db: &CourseStore, req: NewCourseRequest) -> Result<Course, StoreError> {
    db.mutate(|doc| {
        let course = Course::from_request(doc.next_id, req);
        doc.next_id += 1;
        doc.courses.push(course.clone());
        course
    })
    .await
}

pub async fn update_course(
    db: &CourseStore,
    id: u64,
    req: UpdateCourseRequest,
) -> Result<Option<Course>, StoreError> {
    db.try_mutate(|doc| {
        let index = doc.position(id)?;
        let current = doc.courses.get_mut(index)?;
        current.apply(req);
        Some(current.clone())
    })
    .await
}

pub async fn delete_course(db: &CourseStore, id: u64) -> Result<Option<Course>, StoreError> {
    db.try_mutate(|doc| {
        let index = doc.position(id)?;
        Some(doc.courses.remove(index))
    })
    .await
}
