use std::ops::Index;
use std::sync::Arc;

use crate::address::Address;
use crate::model::Model;
use crate::proxy::Proxy;

/// Outcome of saving several objects into one collection.
///
/// Holds one proxy per saved object, in input order, so `result[i]`
/// addresses the `i`-th object that was written.
#[derive(Debug, Clone, Default)]
pub struct BatchResult {
    proxies: Vec<Proxy>,
}

impl BatchResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.proxies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.proxies.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Proxy> {
        self.proxies.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Proxy> {
        self.proxies.iter()
    }

    /// The addresses assigned to the saved objects.
    pub fn addresses(&self) -> impl Iterator<Item = &Address> {
        self.proxies.iter().map(Proxy::address)
    }

    pub(crate) fn push(&mut self, proxy: Proxy) {
        self.proxies.push(proxy);
    }

    /// Resolves each proxy to the in-memory object it was saved from.
    ///
    /// Objects are matched by position. Proxies without a counterpart stay
    /// as they are.
    pub fn attach(self, objects: Vec<Box<dyn Model>>) -> BatchResult {
        let mut objects = objects.into_iter();
        let proxies = self
            .proxies
            .into_iter()
            .map(|proxy| match objects.next() {
                Some(object) => Proxy::resolved(proxy.address().clone(), Arc::from(object)),
                None => proxy,
            })
            .collect();
        BatchResult { proxies }
    }
}

impl Index<usize> for BatchResult {
    type Output = Proxy;

    fn index(&self, index: usize) -> &Proxy {
        &self.proxies[index]
    }
}

impl IntoIterator for BatchResult {
    type Item = Proxy;
    type IntoIter = std::vec::IntoIter<Proxy>;

    fn into_iter(self) -> Self::IntoIter {
        self.proxies.into_iter()
    }
}

impl<'a> IntoIterator for &'a BatchResult {
    type Item = &'a Proxy;
    type IntoIter = std::slice::Iter<'a, Proxy>;

    fn into_iter(self) -> Self::IntoIter {
        self.proxies.iter()
    }
}

impl FromIterator<Proxy> for BatchResult {
    fn from_iter<I: IntoIterator<Item = Proxy>>(iter: I) -> Self {
        BatchResult {
            proxies: iter.into_iter().collect(),
        }
    }
}
