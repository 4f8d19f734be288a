use bson::{doc, Document};
use uuid::Uuid;

use super::ids::{list_to_bson, to_bson};

#[inline]
pub fn by_id(id: Uuid) -> Document {
    doc! { "_id": to_bson(id) }
}

#[inline]
pub fn by_ids(ids: &[Uuid]) -> Document {
    doc! { "_id": { "$in": list_to_bson(ids) } }
}

#[inline]
pub fn by_email(email: impl AsRef<str>) -> Document {
    doc! { "email": email.as_ref() }
}

#[inline]
pub fn by_field(field: &str, id: Uuid) -> Document {
    doc! { field: to_bson(id) }
}

/// Groups of an assignment which `user` leads or belongs to.
#[inline]
pub fn group_of(assignment: Uuid, user: Uuid) -> Document {
    doc! {
        "assignment_id": to_bson(assignment),
        "$or": [
            { "member_ids": to_bson(user) },
            { "leader_id": to_bson(user) },
        ],
    }
}

/// Acknowledgment of `student` for `assignment` marked as submitted.
#[inline]
pub fn acknowledged(assignment: Uuid, student: Uuid) -> Document {
    doc! {
        "assignment_id": to_bson(assignment),
        "student_id": to_bson(student),
        "acknowledged": true,
    }
}
