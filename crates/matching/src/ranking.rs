//! Executor ranking.

use std::cmp::Ordering;

use database::User;

/// Order two executors by (priority, average rating, review count), best first.
///
/// Equal keys compare as equal; callers rely on a stable sort to keep the
/// incoming order for ties.
pub fn compare(a: &User, b: &User) -> Ordering {
    b.priority
        .cmp(&a.priority)
        .then_with(|| b.average_rating.total_cmp(&a.average_rating))
        .then_with(|| b.review_count.cmp(&a.review_count))
}

/// Sort executors best first, in place.
pub fn rank_executors(executors: &mut [User]) {
    executors.sort_by(compare);
}

#[cfg(test)]
mod tests {
    use super::*;
    use database::UserRole;

    fn executor(id: i64, priority: i64, rating: f64, reviews: i64) -> User {
        let mut user = User::new(id, format!("exec-{id}"), UserRole::Executor);
        user.priority = priority;
        user.average_rating = rating;
        user.review_count = reviews;
        user
    }

    fn ids(users: &[User]) -> Vec<i64> {
        users.iter().map(|u| u.id).collect()
    }

    #[test]
    fn test_priority_then_rating_then_reviews() {
        let mut pool = vec![
            executor(1, 1, 5.0, 100),
            executor(2, 3, 3.0, 1),
            executor(3, 3, 4.5, 2),
            executor(4, 3, 4.5, 10),
        ];
        rank_executors(&mut pool);
        assert_eq!(ids(&pool), vec![4, 3, 2, 1]);
    }

    #[test]
    fn test_ranking_is_deterministic() {
        let base = vec![
            executor(10, 0, 4.9, 3),
            executor(11, 2, 1.0, 0),
            executor(12, 0, 4.9, 7),
            executor(13, 1, 2.5, 9),
        ];
        let mut first = base.clone();
        rank_executors(&mut first);

        let mut reversed: Vec<User> = base.into_iter().rev().collect();
        rank_executors(&mut reversed);

        assert_eq!(ids(&first), ids(&reversed));
        assert_eq!(ids(&first), vec![11, 13, 12, 10]);
    }

    #[test]
    fn test_ties_keep_input_order() {
        let mut pool = vec![executor(7, 1, 4.0, 2), executor(5, 1, 4.0, 2)];
        rank_executors(&mut pool);
        assert_eq!(ids(&pool), vec![7, 5]);
    }
}
