//
// Copyright 2020 bparchive Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.
//

//! # The process-wide class registry.
//!
//! Keyed archives identify classes by name, so decoding dispatches through a
//! single map from Cocoa class names to [`ClassAdapter`]s shared by every
//! archive and unarchive call in the process. The map is seeded with the
//! built-in `NS*` adapters and guarded by a reader-writer lock: encode and
//! decode paths take the shared lock, registration takes the exclusive lock
//! and is expected to happen during program startup.

use log::debug;
use once_cell::sync::Lazy;

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::archive::adapter::ClassAdapter;
use crate::archive::builtins;
use crate::archive::value::Instance;

static REGISTRY: Lazy<RwLock<HashMap<String, Arc<dyn ClassAdapter>>>> =
    Lazy::new(|| RwLock::new(builtins::class_map()));

/// Registers an adapter under the given class name.
///
/// Re-registering a name replaces the previous adapter silently; this is how
/// a built-in handler is overridden as well.
pub fn register(class_name: impl Into<String>, adapter: Arc<dyn ClassAdapter>) {
    let class_name = class_name.into();
    debug!("registering archive adapter for class {}", class_name);
    REGISTRY
        .write()
        .expect("class registry lock poisoned")
        .insert(class_name, adapter);
}

/// Merges a set of class-name to adapter entries into the registry.
pub fn update_class_map(mapping: HashMap<String, Arc<dyn ClassAdapter>>) {
    let mut registry = REGISTRY.write().expect("class registry lock poisoned");
    for (class_name, adapter) in mapping {
        debug!("registering archive adapter for class {}", class_name);
        registry.insert(class_name, adapter);
    }
}

/// Returns the adapter registered under the given class name, if any.
pub fn lookup_by_name(class_name: &str) -> Option<Arc<dyn ClassAdapter>> {
    REGISTRY
        .read()
        .expect("class registry lock poisoned")
        .get(class_name)
        .cloned()
}

/// Returns the adapter responsible for an instance's class, if any.
pub fn lookup_for_instance(instance: &Instance) -> Option<Arc<dyn ClassAdapter>> {
    lookup_by_name(instance.class_name())
}
