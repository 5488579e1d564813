/// Documents stored by Tasklist
///
/// Each model owns its PostgreSQL queries; the `store` module exposes them
/// behind the backend-neutral `Store` trait.
///
/// # Models
///
/// - `user`: Accounts used for authentication
/// - `person`: People that tasks can be assigned to
/// - `profile`: Contact details attached to a person
/// - `project`: Projects holding an ordered list of task ids
/// - `task`: Tasks holding the set of projects they belong to
///
/// References between documents are plain ids. The `populate` module resolves
/// them for read endpoints, and the `relations` module keeps both sides of the
/// project/task link in step.

pub mod person;
pub mod profile;
pub mod project;
pub mod task;
pub mod user;

use uuid::Uuid;

/// Removes duplicate ids while keeping first-seen order
///
/// Reference arrays behave as ordered sets; request bodies may repeat ids.
pub fn dedup_ids(ids: &[Uuid]) -> Vec<Uuid> {
    let mut out: Vec<Uuid> = Vec::with_capacity(ids.len());
    for id in ids {
        if !out.contains(id) {
            out.push(*id);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dedup_ids_keeps_first_occurrence_order() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let c = Uuid::new_v4();

        assert_eq!(dedup_ids(&[b, a, b, c, a]), vec![b, a, c]);
        assert!(dedup_ids(&[]).is_empty());
    }
}
