//! Name interning for joints, states and condition flags
//!
//! Joint names, state names and condition flags are compared by handle at
//! runtime. The [`NameTable`] that hands out those handles belongs to whoever
//! loads the assets and is passed to the builders that need it.

use std::collections::HashMap;

/// Interned name handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize, serde::Deserialize))]
pub struct NameHandle(pub u32);

impl NameHandle {
    /// Raw handle value
    pub fn raw(self) -> u32 {
        self.0
    }
}

/// String to handle table
#[derive(Debug, Clone, Default)]
pub struct NameTable {
    names: Vec<String>,
    lookup: HashMap<String, NameHandle>,
}

impl NameTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the handle for `name`, allocating one on first use
    pub fn intern(&mut self, name: &str) -> NameHandle {
        if let Some(&handle) = self.lookup.get(name) {
            return handle;
        }

        let handle = NameHandle(self.names.len() as u32);
        self.names.push(name.to_owned());
        self.lookup.insert(name.to_owned(), handle);
        handle
    }

    /// Look up an existing handle without allocating
    pub fn get(&self, name: &str) -> Option<NameHandle> {
        self.lookup.get(name).copied()
    }

    /// Get the string behind a handle
    pub fn resolve(&self, handle: NameHandle) -> Option<&str> {
        self.names.get(handle.0 as usize).map(String::as_str)
    }

    /// Number of interned names
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Check if no names have been interned
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
