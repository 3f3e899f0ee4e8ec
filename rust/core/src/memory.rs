// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Fallible allocation helpers.
//!
//! Payload arrays and attribute values grow through these functions so that
//! an allocation failure surfaces as [`EgadsError::MallocError`] instead of
//! aborting the process.

use smallvec::{Array, SmallVec};

use crate::error::{EgadsError, Result};

/// Empty vector with room for `n` elements.
pub fn try_vec<T>(n: usize) -> Result<Vec<T>> {
    let mut v = Vec::new();
    v.try_reserve_exact(n).map_err(|_| EgadsError::MallocError)?;
    Ok(v)
}

/// Copies a slice into a freshly reserved vector.
pub fn try_to_vec<T: Clone>(items: &[T]) -> Result<Vec<T>> {
    let mut v = try_vec(items.len())?;
    v.extend_from_slice(items);
    Ok(v)
}

pub fn try_push<T>(v: &mut Vec<T>, item: T) -> Result<()> {
    v.try_reserve(1).map_err(|_| EgadsError::MallocError)?;
    v.push(item);
    Ok(())
}

/// Copies a slice into a [`SmallVec`], spilling to the heap fallibly.
pub fn try_small<A>(items: &[A::Item]) -> Result<SmallVec<A>>
where
    A: Array,
    A::Item: Clone,
{
    let mut v = SmallVec::new();
    v.try_reserve(items.len()).map_err(|_| EgadsError::MallocError)?;
    v.extend(items.iter().cloned());
    Ok(v)
}

/// Owned copy of a string.
pub fn try_string(s: &str) -> Result<String> {
    let mut out = String::new();
    out.try_reserve_exact(s.len()).map_err(|_| EgadsError::MallocError)?;
    out.push_str(s);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn copies_are_equal() {
        assert_eq!(try_to_vec(&[1, 2, 3]).unwrap(), vec![1, 2, 3]);
        assert_eq!(try_string("abc").unwrap(), "abc");
        let small: SmallVec<[f64; 1]> = try_small(&[1.5]).unwrap();
        assert!(!small.spilled());
        let big: SmallVec<[f64; 1]> = try_small(&[1.0, 2.0]).unwrap();
        assert!(big.spilled());
    }

    #[test]
    fn push_grows() {
        let mut v = try_vec::<u8>(0).unwrap();
        try_push(&mut v, 7).unwrap();
        assert_eq!(v, [7]);
    }
}
