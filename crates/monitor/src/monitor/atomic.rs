//! Lock-free `f64` cell
//!
//! Stores the value's bit pattern in an `AtomicU64`; read-modify-write
//! operations are compare-and-swap loops.

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug)]
pub(crate) struct AtomicF64 {
    bits: AtomicU64,
}

impl AtomicF64 {
    pub(crate) fn new(value: f64) -> Self {
        Self { bits: AtomicU64::new(value.to_bits()) }
    }

    pub(crate) fn load(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::Acquire))
    }

    /// Replace the value, returning the previous one
    pub(crate) fn swap(&self, value: f64) -> f64 {
        f64::from_bits(self.bits.swap(value.to_bits(), Ordering::AcqRel))
    }

    pub(crate) fn fetch_add(&self, delta: f64) -> f64 {
        self.update(|current| Some(current + delta))
    }

    /// Store `value` only if it is smaller than the current value
    pub(crate) fn fetch_min(&self, value: f64) -> f64 {
        self.update(|current| (value < current).then_some(value))
    }

    /// Store `value` only if it is larger than the current value
    pub(crate) fn fetch_max(&self, value: f64) -> f64 {
        self.update(|current| (value > current).then_some(value))
    }

    fn update<F>(&self, mut f: F) -> f64
    where
        F: FnMut(f64) -> Option<f64>,
    {
        let previous = self
            .bits
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |bits| {
                f(f64::from_bits(bits)).map(f64::to_bits)
            })
            .unwrap_or_else(|unchanged| unchanged);
        f64::from_bits(previous)
    }
}
