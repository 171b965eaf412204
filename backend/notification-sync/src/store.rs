/// Ordered, id-unique collection of notifications
///
/// Newest-first. The unread count is never stored; it is always computed from
/// the records, so it cannot drift from them.
use crate::models::{Notification, NotificationId};
use std::collections::HashSet;

#[derive(Debug, Clone, Default)]
pub struct NotificationStore {
    items: Vec<Notification>,
}

impl NotificationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole store with a fetched page, keeping its order
    ///
    /// Repeated ids in the page keep their first occurrence.
    pub fn replace_all(&mut self, page: Vec<Notification>) {
        let mut seen = HashSet::with_capacity(page.len());
        self.items = page.into_iter().filter(|n| seen.insert(n.id)).collect();
    }

    /// Prepend the fetched records whose ids are not yet present
    ///
    /// Existing records keep their position and content. Returns how many
    /// records were added.
    pub fn merge_snapshot(&mut self, page: Vec<Notification>) -> usize {
        let mut seen: HashSet<NotificationId> = self.items.iter().map(|n| n.id).collect();
        let fresh: Vec<Notification> = page.into_iter().filter(|n| seen.insert(n.id)).collect();
        let added = fresh.len();

        if added > 0 {
            let existing = std::mem::take(&mut self.items);
            self.items = fresh;
            self.items.extend(existing);
        }
        added
    }

    /// Prepend a pushed record unless its id is already present
    pub fn insert_pushed(&mut self, notification: Notification) -> bool {
        if self.contains(notification.id) {
            return false;
        }
        self.items.insert(0, notification);
        true
    }

    pub fn contains(&self, id: NotificationId) -> bool {
        self.items.iter().any(|n| n.id == id)
    }

    pub fn get(&self, id: NotificationId) -> Option<&Notification> {
        self.items.iter().find(|n| n.id == id)
    }

    /// Returns false if the id is unknown
    pub fn mark_read(&mut self, id: NotificationId) -> bool {
        match self.items.iter_mut().find(|n| n.id == id) {
            Some(notification) => {
                notification.mark_read();
                true
            }
            None => false,
        }
    }

    /// Mark every record read, returning how many changed
    pub fn mark_all_read(&mut self) -> usize {
        let mut changed = 0;
        for notification in self.items.iter_mut().filter(|n| !n.is_read) {
            notification.mark_read();
            changed += 1;
        }
        changed
    }

    pub fn remove(&mut self, id: NotificationId) -> Option<Notification> {
        let index = self.items.iter().position(|n| n.id == id)?;
        Some(self.items.remove(index))
    }

    pub fn unread_count(&self) -> usize {
        self.items.iter().filter(|n| n.is_unread()).count()
    }

    pub fn ids(&self) -> Vec<NotificationId> {
        self.items.iter().map(|n| n.id).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Notification> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn note(id: i64) -> Notification {
        Notification::new(id, "system_alert", format!("n{}", id), "body")
    }

    fn ids(raw: &[i64]) -> Vec<NotificationId> {
        raw.iter().copied().map(NotificationId).collect()
    }

    #[test]
    fn test_full_refresh_keeps_fetched_order() {
        let mut store = NotificationStore::new();
        store.replace_all(vec![note(1), note(2)]);
        assert_eq!(store.ids(), ids(&[1, 2]));
    }

    #[test]
    fn test_replace_all_drops_repeated_ids() {
        let mut store = NotificationStore::new();
        store.replace_all(vec![note(4), note(2), note(4)]);
        assert_eq!(store.ids(), ids(&[4, 2]));
    }

    #[test]
    fn test_background_merge_prepends_only_new_ids() {
        let mut store = NotificationStore::new();
        store.replace_all(vec![note(1), note(2)]);

        let added = store.merge_snapshot(vec![note(2), note(3)]);

        assert_eq!(added, 1);
        assert_eq!(store.ids(), ids(&[3, 1, 2]));
    }

    #[test]
    fn test_background_merge_keeps_local_state() {
        let mut store = NotificationStore::new();
        store.replace_all(vec![note(1)]);
        store.mark_read(NotificationId(1));

        // Server still reports it unread; the local record wins
        store.merge_snapshot(vec![note(1)]);

        assert!(store.get(NotificationId(1)).unwrap().is_read);
    }

    #[test]
    fn test_push_is_idempotent() {
        let mut store = NotificationStore::new();
        assert!(store.insert_pushed(note(5)));
        assert!(!store.insert_pushed(note(5)));
        assert_eq!(store.ids(), ids(&[5]));

        assert!(store.insert_pushed(note(6)));
        assert_eq!(store.ids(), ids(&[6, 5]));
    }

    #[test]
    fn test_mark_read_updates_unread_count() {
        let mut store = NotificationStore::new();
        let mut read = note(1);
        read.is_read = true;
        store.replace_all(vec![read, note(2)]);
        assert_eq!(store.unread_count(), 1);

        assert!(store.mark_read(NotificationId(2)));

        let two = store.get(NotificationId(2)).unwrap();
        assert!(two.is_read);
        assert!(two.read_at.is_some());
        assert_eq!(store.unread_count(), 0);
        assert!(!store.mark_read(NotificationId(99)));
    }

    #[test]
    fn test_dismissed_records_do_not_count() {
        let mut store = NotificationStore::new();
        let mut dismissed = note(1);
        dismissed.is_dismissed = true;
        store.replace_all(vec![dismissed, note(2)]);
        assert_eq!(store.unread_count(), 1);
    }

    #[test]
    fn test_mark_all_and_remove() {
        let mut store = NotificationStore::new();
        store.replace_all(vec![note(1), note(2), note(3)]);

        assert_eq!(store.mark_all_read(), 3);
        assert_eq!(store.unread_count(), 0);
        assert_eq!(store.mark_all_read(), 0);

        assert!(store.remove(NotificationId(2)).is_some());
        assert!(store.remove(NotificationId(2)).is_none());
        assert_eq!(store.ids(), ids(&[1, 3]));
    }

    #[test]
    fn test_invariants_hold_under_random_operations() {
        let mut rng = StdRng::seed_from_u64(0x5eed);

        for _ in 0..50 {
            let mut store = NotificationStore::new();

            for _ in 0..200 {
                let id = rng.gen_range(1..20);
                match rng.gen_range(0..6) {
                    0 => {
                        store.insert_pushed(note(id));
                    }
                    1 => {
                        store.mark_read(NotificationId(id));
                    }
                    2 => {
                        store.remove(NotificationId(id));
                    }
                    3 => {
                        let page = (0..rng.gen_range(0..5))
                            .map(|_| note(rng.gen_range(1..20)))
                            .collect();
                        store.merge_snapshot(page);
                    }
                    4 => {
                        let page = (0..rng.gen_range(0..5))
                            .map(|_| note(rng.gen_range(1..20)))
                            .collect();
                        store.replace_all(page);
                    }
                    _ => {
                        store.mark_all_read();
                        assert_eq!(store.unread_count(), 0);
                    }
                }

                let all = store.ids();
                let unique: HashSet<_> = all.iter().collect();
                assert_eq!(unique.len(), all.len(), "duplicate id in {:?}", all);

                let expected = store
                    .iter()
                    .filter(|n| !n.is_read && !n.is_dismissed)
                    .count();
                assert_eq!(store.unread_count(), expected);
            }
        }
    }
}
