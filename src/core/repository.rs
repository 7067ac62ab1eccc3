use std::cmp::Ordering;
use std::collections::HashMap;

use crate::core::models::BaseEntity;
use crate::errors::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sort {
    Unordered,
    IdAsc,
    IdDesc,
}

struct FilterSorter<'a, T: BaseEntity> {
    filters: Vec<Box<dyn Fn(&T) -> bool + 'a>>,
    cmp: Option<Box<dyn Fn(&T, &T) -> Ordering + 'a>>,
}

impl<'a, T: BaseEntity> FilterSorter<'a, T> {
    fn new() -> Self {
        Self {
            filters: Vec::new(),
            cmp: None,
        }
    }

    fn matches(&self, entity: &T) -> bool {
        self.filters.iter().all(|f| f(entity))
    }

    fn sorted_ids(&self, items: &HashMap<i32, T>) -> Vec<i32> {
        let mut ids: Vec<i32> = items
            .iter()
            .filter(|(_, e)| self.matches(e))
            .map(|(id, _)| *id)
            .collect();

        // Id order first so custom comparators tie-break deterministically.
        ids.sort();
        if let Some(cmp) = &self.cmp {
            ids.sort_by(|a, b| match (items.get(a), items.get(b)) {
                (Some(ea), Some(eb)) => cmp(ea, eb),
                _ => Ordering::Equal,
            });
        }
        ids
    }
}

/// In-memory table keyed by positive integer ids.
#[derive(Debug, Clone)]
pub struct Repository<T: BaseEntity> {
    items: HashMap<i32, T>,
    next_id: i32,
}

impl<T: BaseEntity> Default for Repository<T> {
    fn default() -> Self {
        Self {
            items: HashMap::new(),
            next_id: 1,
        }
    }
}

impl<T: BaseEntity> Repository<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Inserts with the next free id and returns the stored entity.
    pub fn insert(&mut self, mut entity: T) -> &T {
        let id = self.next_id;
        self.next_id += 1;
        entity.set_id(id);
        self.items.entry(id).or_insert(entity)
    }

    /// Inserts keeping the entity's own id, as when loading a snapshot.
    pub fn insert_with_id(&mut self, entity: T) -> Result<()> {
        let id = entity.id();
        if id <= 0 {
            return Err(Error::Parse(format!("{} id must be positive.", T::KIND)));
        }
        if self.items.contains_key(&id) {
            return Err(Error::Duplicate(format!("{} with id {}", T::KIND, id)));
        }
        self.next_id = self.next_id.max(id + 1);
        self.items.insert(id, entity);
        Ok(())
    }

    pub fn find(&self, id: i32) -> Option<&T> {
        self.items.get(&id)
    }

    pub fn get(&self, id: i32) -> Result<&T> {
        self.items.get(&id).ok_or(Error::NotFound {
            entity: T::KIND,
            id,
        })
    }

    pub fn get_mut(&mut self, id: i32) -> Result<&mut T> {
        self.items.get_mut(&id).ok_or(Error::NotFound {
            entity: T::KIND,
            id,
        })
    }

    pub fn delete(&mut self, id: i32) -> Result<T> {
        self.items.remove(&id).ok_or(Error::NotFound {
            entity: T::KIND,
            id,
        })
    }

    pub fn values(&self, sort: Sort) -> Vec<&T> {
        let mut v: Vec<&T> = self.items.values().collect();
        match sort {
            Sort::Unordered => {}
            Sort::IdAsc => v.sort_by_key(|e| e.id()),
            Sort::IdDesc => v.sort_by_key(|e| std::cmp::Reverse(e.id())),
        }
        v
    }

    pub fn query(&self) -> Query<'_, T> {
        Query::new(self)
    }

    pub fn query_mut(&mut self) -> QueryMut<'_, T> {
        QueryMut::new(self)
    }
}

pub struct Query<'a, T: BaseEntity> {
    store: &'a Repository<T>,
    fs: FilterSorter<'a, T>,
}

impl<'a, T: BaseEntity> Query<'a, T> {
    fn new(store: &'a Repository<T>) -> Self {
        Self {
            store,
            fs: FilterSorter::new(),
        }
    }

    pub fn r#where(mut self, pred: impl Fn(&T) -> bool + 'a) -> Self {
        self.fs.filters.push(Box::new(pred));
        self
    }

    pub fn order_with(mut self, cmp: impl Fn(&T, &T) -> Ordering + 'a) -> Self {
        self.fs.cmp = Some(Box::new(cmp));
        self
    }

    pub fn collect(self) -> Vec<&'a T> {
        let store = self.store;
        let ids = self.fs.sorted_ids(&store.items);
        ids.into_iter()
            .filter_map(move |id| store.items.get(&id))
            .collect()
    }

    pub fn first(self) -> Option<&'a T> {
        self.collect().into_iter().next()
    }

    pub fn count(self) -> usize {
        self.store
            .items
            .values()
            .filter(|e| self.fs.matches(e))
            .count()
    }

    pub fn exists(self) -> bool {
        self.store.items.values().any(|e| self.fs.matches(e))
    }
}

pub struct QueryMut<'a, T: BaseEntity> {
    store: &'a mut Repository<T>,
    fs: FilterSorter<'a, T>,
}

impl<'a, T: BaseEntity> QueryMut<'a, T> {
    fn new(store: &'a mut Repository<T>) -> Self {
        Self {
            store,
            fs: FilterSorter::new(),
        }
    }

    pub fn r#where(mut self, pred: impl Fn(&T) -> bool + 'a) -> Self {
        self.fs.filters.push(Box::new(pred));
        self
    }

    pub fn order_with(mut self, cmp: impl Fn(&T, &T) -> Ordering + 'a) -> Self {
        self.fs.cmp = Some(Box::new(cmp));
        self
    }

    pub fn for_each_mut<F>(self, mut f: F)
    where
        F: FnMut(&mut T),
    {
        let ids = self.fs.sorted_ids(&self.store.items);

        for id in ids {
            if let Some(item) = self.store.items.get_mut(&id) {
                f(item);
            }
        }
    }
}
