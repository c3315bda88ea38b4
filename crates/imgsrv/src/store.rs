//! The growable image store (`spec.md` §4.2).
//!
//! `RwLock<Vec<Arc<Image>>>` rather than a raw `Vec<Image>` behind one lock:
//! a reader only needs the read lock long enough to clone the `Arc`, so a
//! concurrent `register` growing the vector never blocks an in-flight
//! `get` of an already-published image, and no `unsafe` stable-addressing
//! trick (as a lock-free structure might use) is needed.

use crate::image::Image;
use crate::invariants::debug_assert_store_monotonic;
use std::sync::{Arc, RwLock};

/// Append-only (except for explicit overwrite) store of registered images.
pub struct ImageStore {
    images: RwLock<Vec<Arc<Image>>>,
}

impl ImageStore {
    pub fn new() -> Self {
        Self {
            images: RwLock::new(Vec::new()),
        }
    }

    /// Registers a brand-new image, returning its freshly assigned ID.
    pub fn register(&self, image: Image) -> u64 {
        let mut images = self.images.write().unwrap();
        let pre_len = images.len();
        images.push(Arc::new(image));
        let new_id = pre_len as u64;
        debug_assert_store_monotonic!(new_id, pre_len);
        new_id
    }

    /// Fetches a handle to the image at `id`, if it exists.
    pub fn get(&self, id: u64) -> Option<Arc<Image>> {
        let images = self.images.read().unwrap();
        images.get(id as usize).cloned()
    }

    /// Publishes a transformed image: overwrites slot `id` in place if
    /// `overwrite` is set, otherwise appends a new image and returns its ID.
    pub fn publish(&self, id: u64, overwrite: bool, image: Image) -> u64 {
        if overwrite {
            let mut images = self.images.write().unwrap();
            images[id as usize] = Arc::new(image);
            id
        } else {
            self.register(image)
        }
    }

    pub fn len(&self) -> usize {
        self.images.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ImageStore {
    fn default() -> Self {
        Self::new()
    }
}
