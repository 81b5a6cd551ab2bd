//! Word-addressed storage abstraction for data memory. [`CompositeMemory`]
//! lets independent fragments (plain arrays, memory-mapped devices) be
//! mounted at disjoint address ranges and addressed uniformly.

use std::collections::HashMap;
use std::ops::{Deref, DerefMut};

/// Failure of a storage access: the address fell outside every mounted
/// fragment.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct OutOfRange {
    pub address: u32,
}

pub trait Storage {
    /// Number of addressable words.
    fn length(&self) -> u32;

    fn read(&self, address: u32) -> Result<i32, OutOfRange>;
}

pub trait StorageMut: Storage {
    fn write(&mut self, address: u32, value: i32) -> Result<(), OutOfRange>;
}

impl Storage for Vec<i32> {
    fn length(&self) -> u32 {
        self.len() as u32
    }

    fn read(&self, address: u32) -> Result<i32, OutOfRange> {
        self.get(address as usize).copied().ok_or(OutOfRange { address })
    }
}

impl StorageMut for Vec<i32> {
    fn write(&mut self, address: u32, value: i32) -> Result<(), OutOfRange> {
        let slot = self.get_mut(address as usize).ok_or(OutOfRange { address })?;
        *slot = value;
        Ok(())
    }
}

/// Error type for [`CompositeMemory::mount`].
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum MountError {
    FragmentIntersection,
    KeyAlreadyExists,
}

type AddressedFragment = (u32, Box<dyn StorageMut>);

/// A [`StorageMut`] assembled from independently owned fragments mounted
/// at fixed addresses, so hardware-like devices (the I/O ports) and
/// plain backing arrays can share one address space without allocating
/// the full span between them.
#[derive(Default)]
pub struct CompositeMemory {
    fragments: Vec<AddressedFragment>,
    registry: HashMap<String, u32>,
}

impl CompositeMemory {
    pub fn new() -> CompositeMemory {
        Default::default()
    }

    /// Mounts `fragment` at `address`, registered under `key` for later
    /// [`unmount`](Self::unmount). Fragments are kept sorted by address
    /// so lookups can binary-search.
    pub fn mount<S: StorageMut + 'static>(
        &mut self,
        address: u32,
        key: &str,
        fragment: S,
    ) -> Result<(), MountError> {
        if self.registry.contains_key(key) {
            return Err(MountError::KeyAlreadyExists);
        }

        let upper_bound = address
            .checked_add(fragment.length())
            .expect("Fragment upper bound exceeds valid address range.");
        let index = self.find_mount_index(address, upper_bound)?;

        self.fragments.insert(index, (address, Box::new(fragment)));
        self.registry.insert(key.to_string(), address);

        Ok(())
    }

    pub fn unmount(&mut self, key: &str) -> Option<Box<dyn StorageMut>> {
        let address = self.registry.remove(key)?;
        let index = self.fragments.iter().position(|(a, _)| *a == address)?;
        Some(self.fragments.remove(index).1)
    }

    fn find_mount_index(&self, address: u32, upper_bound: u32) -> Result<usize, MountError> {
        for (i, (frag_addr, frag)) in self.fragments.iter().enumerate() {
            let frag_upper = frag_addr + frag.length();
            if *frag_addr >= address {
                return if upper_bound > *frag_addr {
                    Err(MountError::FragmentIntersection)
                } else {
                    Ok(i)
                };
            } else if frag_upper > address {
                return Err(MountError::FragmentIntersection);
            }
        }
        Ok(self.fragments.len())
    }

    fn get_index(&self, address: u32) -> Option<usize> {
        match self.fragments.binary_search_by_key(&address, |e| e.0) {
            Ok(i) => Some(i),
            Err(i) if i > 0 => Some(i - 1),
            Err(_) => None,
        }
    }

    fn get_fragment(&self, address: u32) -> Option<(&dyn StorageMut, u32)> {
        let index = self.get_index(address)?;
        let (frag_addr, fragment) = self.fragments.get(index)?;
        Some((fragment.deref(), address - frag_addr))
    }

    fn get_fragment_mut(&mut self, address: u32) -> Option<(&mut dyn StorageMut, u32)> {
        let index = self.get_index(address)?;
        let (frag_addr, fragment) = self.fragments.get_mut(index)?;
        let local = address - *frag_addr;
        Some((fragment.deref_mut(), local))
    }
}

impl Storage for CompositeMemory {
    fn length(&self) -> u32 {
        self.fragments
            .last()
            .map(|(address, fragment)| address + fragment.length())
            .unwrap_or(0)
    }

    fn read(&self, address: u32) -> Result<i32, OutOfRange> {
        let (fragment, local) = self.get_fragment(address).ok_or(OutOfRange { address })?;
        fragment.read(local).map_err(|_| OutOfRange { address })
    }
}

impl StorageMut for CompositeMemory {
    fn write(&mut self, address: u32, value: i32) -> Result<(), OutOfRange> {
        let (fragment, local) = self.get_fragment_mut(address).ok_or(OutOfRange { address })?;
        fragment.write(local, value).map_err(|_| OutOfRange { address })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mount_and_read_through() {
        let mut memory = CompositeMemory::new();
        assert_eq!(memory.mount(4, "vars", vec![0i32; 8]), Ok(()));
        assert_eq!(memory.write(4, 42), Ok(()));
        assert_eq!(memory.read(4), Ok(42));
        assert_eq!(memory.read(3), Err(OutOfRange { address: 3 }));
    }

    #[test]
    fn intersecting_mount_rejected() {
        let mut memory = CompositeMemory::new();
        assert_eq!(memory.mount(0, "a", vec![0i32; 8]), Ok(()));
        assert_eq!(
            memory.mount(4, "b", vec![0i32; 8]),
            Err(MountError::FragmentIntersection)
        );
    }

    #[test]
    fn consecutive_fragments_allowed() {
        let mut memory = CompositeMemory::new();
        assert_eq!(memory.mount(0, "a", vec![0i32; 4]), Ok(()));
        assert_eq!(memory.mount(4, "b", vec![0i32; 4]), Ok(()));
        assert_eq!(memory.length(), 8);
    }

    #[test]
    fn unmount_returns_fragment() {
        let mut memory = CompositeMemory::new();
        memory.mount(0, "a", vec![1i32; 2]).unwrap();
        let fragment = memory.unmount("a").unwrap();
        assert_eq!(fragment.read(0), Ok(1));
        assert!(memory.unmount("a").is_none());
    }
}
