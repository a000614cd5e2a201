use anyhow::Context;
use mongodb::bson::{doc, oid::ObjectId, Document};
use mongodb::Database;
use std::collections::{HashMap, HashSet};

use super::error::{ServiceError, ServiceResult};

/// Next `order` within a parent scope: max + 1, or 1 for an empty scope.
///
/// Read-then-write: two concurrent creates can compute the same value, the
/// unique (parent, order) index rejects the second with a Conflict.
pub async fn next_order(
    mongo: &Database,
    collection: &str,
    parent_field: &str,
    parent_id: ObjectId,
) -> ServiceResult<i32> {
    let mut filter = Document::new();
    filter.insert(parent_field, parent_id);

    let last = mongo
        .collection::<Document>(collection)
        .find_one(filter)
        .sort(doc! { "order": -1 })
        .projection(doc! { "order": 1 })
        .await
        .with_context(|| format!("Failed to read max order in {}", collection))?;

    let max = last.and_then(|d| d.get_i32("order").ok());
    Ok(order_after(max))
}

pub fn order_after(max: Option<i32>) -> i32 {
    max.map(|m| m + 1).unwrap_or(1)
}

/// Checks a slide reorder request against the lesson's slides and their
/// current orders. A target order still held by a slide left out of the
/// request is rejected before anything is written.
pub fn check_reorder(
    requested: &[(ObjectId, i32)],
    lesson_slides: &HashMap<ObjectId, i32>,
) -> ServiceResult<()> {
    if requested.is_empty() {
        return Err(ServiceError::validation(
            "slide_orders",
            "slide_orders must not be empty",
        ));
    }

    let mut seen_ids = HashSet::new();
    let mut seen_orders = HashSet::new();
    for (slide_id, order) in requested {
        if !lesson_slides.contains_key(slide_id) {
            return Err(ServiceError::validation(
                "slide_orders",
                format!("Slide {} does not belong to this lesson", slide_id.to_hex()),
            ));
        }
        if *order < 0 {
            return Err(ServiceError::validation(
                "slide_orders",
                "Order must not be negative",
            ));
        }
        if !seen_ids.insert(*slide_id) {
            return Err(ServiceError::validation(
                "slide_orders",
                format!("Slide {} is listed twice", slide_id.to_hex()),
            ));
        }
        if !seen_orders.insert(*order) {
            return Err(ServiceError::validation(
                "slide_orders",
                format!("Order {} is assigned twice", order),
            ));
        }
    }

    for (slide_id, order) in lesson_slides {
        if !seen_ids.contains(slide_id) && seen_orders.contains(order) {
            return Err(ServiceError::validation(
                "slide_orders",
                format!(
                    "Order {} is already used by slide {}",
                    order,
                    slide_id.to_hex()
                ),
            ));
        }
    }

    Ok(())
}

/// Placeholder order used in the first reorder pass, unique per position and
/// never colliding with a real (non-negative) order.
pub fn parking_order(position: usize) -> i32 {
    -(position as i32) - 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequential_orders_start_at_one() {
        assert_eq!(order_after(None), 1);
        assert_eq!(order_after(Some(1)), 2);
        assert_eq!(order_after(Some(41)), 42);
    }

    #[test]
    fn reorder_rejects_foreign_slides() {
        let own = ObjectId::new();
        let foreign = ObjectId::new();
        let lesson: HashMap<ObjectId, i32> = [(own, 1)].into_iter().collect();

        assert!(check_reorder(&[(own, 1)], &lesson).is_ok());
        assert!(check_reorder(&[(foreign, 1)], &lesson).is_err());
        assert!(check_reorder(&[], &lesson).is_err());
    }

    #[test]
    fn reorder_rejects_duplicates() {
        let a = ObjectId::new();
        let b = ObjectId::new();
        let lesson: HashMap<ObjectId, i32> = [(a, 1), (b, 2)].into_iter().collect();

        assert!(check_reorder(&[(a, 1), (b, 1)], &lesson).is_err());
        assert!(check_reorder(&[(a, 1), (a, 2)], &lesson).is_err());
        assert!(check_reorder(&[(a, 2), (b, 1)], &lesson).is_ok());
    }

    #[test]
    fn reorder_rejects_order_held_by_unlisted_slide() {
        let s1 = ObjectId::new();
        let s2 = ObjectId::new();
        let s3 = ObjectId::new();
        let lesson: HashMap<ObjectId, i32> = [(s1, 1), (s2, 2), (s3, 3)].into_iter().collect();

        let err = check_reorder(&[(s1, 2)], &lesson).unwrap_err();
        assert!(matches!(err, ServiceError::Validation { .. }));

        // moving into a free slot, or swapping with a listed slide, is fine
        assert!(check_reorder(&[(s1, 4)], &lesson).is_ok());
        assert!(check_reorder(&[(s1, 3), (s3, 1)], &lesson).is_ok());
    }

    #[test]
    fn parking_orders_are_negative_and_distinct() {
        let parked: HashSet<i32> = (0..10).map(parking_order).collect();
        assert_eq!(parked.len(), 10);
        assert!(parked.iter().all(|o| *o < 0));
    }
}
