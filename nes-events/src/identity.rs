//! Listener identity
//!
//! A listener is identified by the compile-time type of its handler, never by
//! the instance it is bound to. Registering the same method for two different
//! instances yields the same [`ListenerId`], and a single `deafen` removes both.
//!
//! The identity is a 32-bit FNV-1a hash of a name derived from the handler
//! type. Two unrelated handlers could collide; a collision makes `deafen`
//! remove the other handler as well. This is not mitigated.

use std::any::{TypeId, type_name};
use std::fmt;

const FNV_OFFSET_BASIS: u32 = 2_166_136_261;
const FNV_PRIME: u32 = 16_777_619;

/// 32-bit FNV-1a hash
pub const fn fnv1a_32(bytes: &[u8]) -> u32 {
    let mut hash = FNV_OFFSET_BASIS;
    let mut i = 0;
    while i < bytes.len() {
        hash ^= bytes[i] as u32;
        hash = hash.wrapping_mul(FNV_PRIME);
        i += 1;
    }
    hash
}

/// Identity of a registered handler
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ListenerId(u32);

impl ListenerId {
    /// Identity of the handler type `H`.
    ///
    /// `type_name` alone is not unique for closures declared in the same
    /// function, so the `TypeId` is folded into the name as well.
    pub fn of<H: ?Sized + 'static>() -> Self {
        let name = format!("{}#{:?}", type_name::<H>(), TypeId::of::<H>());
        Self(fnv1a_32(name.as_bytes()))
    }

    /// Identity of the type of `handler`
    pub fn of_val<H: 'static>(_handler: &H) -> Self {
        Self::of::<H>()
    }

    /// Wrap a raw hash
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Raw hash value
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}
