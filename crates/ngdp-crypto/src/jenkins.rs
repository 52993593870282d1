//! Jenkins96 hash implementation used for install-path lookup keys.
//!
//! This is a port of Bob Jenkins' lookup3.c hash function. It is the only
//! hash function this crate exposes to call sites outside of content
//! addressing: it is never used for integrity checking, only for turning an
//! install path into a 64-bit lookup key.

use std::fmt;

/// Jenkins96 hash result containing both the 64-bit and 32-bit components.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Jenkins96 {
    /// Primary 64-bit hash value (`c << 32 | b`).
    pub hash64: u64,
    /// Secondary 32-bit hash value (`c`).
    pub hash32: u32,
}

impl Jenkins96 {
    /// Compute the Jenkins96 hash of raw data.
    pub fn hash(data: &[u8]) -> Self {
        let mut pc = 0u32;
        let mut pb = 0u32;
        hashlittle2_impl(data, &mut pc, &mut pb);
        let hash64 = (u64::from(pc) << 32) | u64::from(pb);
        Self { hash64, hash32: pc }
    }

    /// Compute the Jenkins96 hash of a filesystem path after CASC's install-path
    /// normalization: `/` becomes `\` and ASCII letters are upper-cased.
    pub fn hash_path(path: &str) -> u64 {
        let normalized: String = path
            .chars()
            .map(|c| if c == '/' { '\\' } else { c })
            .flat_map(char::to_uppercase)
            .collect();
        Self::hash(normalized.as_bytes()).hash64
    }

    /// Build a `Jenkins96` from its raw components.
    pub fn from_parts(hash64: u64, hash32: u32) -> Self {
        Self { hash64, hash32 }
    }
}

impl fmt::Display for Jenkins96 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}:{:08x}", self.hash64, self.hash32)
    }
}

/// `hashlittle()` from lookup3.c: a single 32-bit hash.
pub fn hashlittle(data: &[u8], initval: u32) -> u32 {
    let mut pc = initval;
    let mut pb = 0u32;
    hashlittle2_impl(data, &mut pc, &mut pb);
    pc
}

/// `hashlittle2()` from lookup3.c: two 32-bit hashes from one pass.
pub fn hashlittle2(key: &[u8], pc: &mut u32, pb: &mut u32) {
    hashlittle2_impl(key, pc, pb);
}

fn mix(a: &mut u32, b: &mut u32, c: &mut u32) {
    *a = a.wrapping_sub(*c);
    *a ^= c.rotate_left(4);
    *c = c.wrapping_add(*b);

    *b = b.wrapping_sub(*a);
    *b ^= a.rotate_left(6);
    *a = a.wrapping_add(*c);

    *c = c.wrapping_sub(*b);
    *c ^= b.rotate_left(8);
    *b = b.wrapping_add(*a);

    *a = a.wrapping_sub(*c);
    *a ^= c.rotate_left(16);
    *c = c.wrapping_add(*b);

    *b = b.wrapping_sub(*a);
    *b ^= a.rotate_left(19);
    *a = a.wrapping_add(*c);

    *c = c.wrapping_sub(*b);
    *c ^= b.rotate_left(4);
    *b = b.wrapping_add(*a);
}

fn final_mix(a: &mut u32, b: &mut u32, c: &mut u32) {
    *c ^= *b;
    *c = c.wrapping_sub(b.rotate_left(14));

    *a ^= *c;
    *a = a.wrapping_sub(c.rotate_left(11));

    *b ^= *a;
    *b = b.wrapping_sub(a.rotate_left(25));

    *c ^= *b;
    *c = c.wrapping_sub(b.rotate_left(16));

    *a ^= *c;
    *a = a.wrapping_sub(c.rotate_left(4));

    *b ^= *a;
    *b = b.wrapping_sub(a.rotate_left(14));

    *c ^= *b;
    *c = c.wrapping_sub(b.rotate_left(24));
}

/// Shared implementation. `pc`/`pb` are initial values on entry, final `c`/`b` on exit.
///
/// The input length is padded up to the next multiple of 12 with implicit
/// zero bytes before the final mix, per the lookup3 algorithm: a remainder
/// of 1-11 bytes is folded into `a`/`b`/`c` byte by byte and any bytes past
/// the actual slice length simply contribute nothing (shifted-in zero).
fn hashlittle2_impl(key: &[u8], pc: &mut u32, pb: &mut u32) {
    let mut a = 0xdead_beef_u32
        .wrapping_add(u32::try_from(key.len()).unwrap_or(u32::MAX))
        .wrapping_add(*pc);
    let mut b = a;
    let mut c = a.wrapping_add(*pb);
    let mut k = key;

    if k.is_empty() {
        *pc = c;
        *pb = b;
        return;
    }

    while k.len() > 12 {
        a = a.wrapping_add(u32::from_le_bytes([k[0], k[1], k[2], k[3]]));
        b = b.wrapping_add(u32::from_le_bytes([k[4], k[5], k[6], k[7]]));
        c = c.wrapping_add(u32::from_le_bytes([k[8], k[9], k[10], k[11]]));
        mix(&mut a, &mut b, &mut c);
        k = &k[12..];
    }

    match k.len() {
        12 => {
            c = c.wrapping_add(u32::from(k[11]) << 24);
            c = c.wrapping_add(u32::from(k[10]) << 16);
            c = c.wrapping_add(u32::from(k[9]) << 8);
            c = c.wrapping_add(u32::from(k[8]));
            b = b.wrapping_add(u32::from(k[7]) << 24);
            b = b.wrapping_add(u32::from(k[6]) << 16);
            b = b.wrapping_add(u32::from(k[5]) << 8);
            b = b.wrapping_add(u32::from(k[4]));
            a = a.wrapping_add(u32::from(k[3]) << 24);
            a = a.wrapping_add(u32::from(k[2]) << 16);
            a = a.wrapping_add(u32::from(k[1]) << 8);
            a = a.wrapping_add(u32::from(k[0]));
        }
        11 => {
            c = c.wrapping_add(u32::from(k[10]) << 16);
            c = c.wrapping_add(u32::from(k[9]) << 8);
            c = c.wrapping_add(u32::from(k[8]));
            b = b.wrapping_add(u32::from(k[7]) << 24);
            b = b.wrapping_add(u32::from(k[6]) << 16);
            b = b.wrapping_add(u32::from(k[5]) << 8);
            b = b.wrapping_add(u32::from(k[4]));
            a = a.wrapping_add(u32::from(k[3]) << 24);
            a = a.wrapping_add(u32::from(k[2]) << 16);
            a = a.wrapping_add(u32::from(k[1]) << 8);
            a = a.wrapping_add(u32::from(k[0]));
        }
        10 => {
            c = c.wrapping_add(u32::from(k[9]) << 8);
            c = c.wrapping_add(u32::from(k[8]));
            b = b.wrapping_add(u32::from(k[7]) << 24);
            b = b.wrapping_add(u32::from(k[6]) << 16);
            b = b.wrapping_add(u32::from(k[5]) << 8);
            b = b.wrapping_add(u32::from(k[4]));
            a = a.wrapping_add(u32::from(k[3]) << 24);
            a = a.wrapping_add(u32::from(k[2]) << 16);
            a = a.wrapping_add(u32::from(k[1]) << 8);
            a = a.wrapping_add(u32::from(k[0]));
        }
        9 => {
            c = c.wrapping_add(u32::from(k[8]));
            b = b.wrapping_add(u32::from(k[7]) << 24);
            b = b.wrapping_add(u32::from(k[6]) << 16);
            b = b.wrapping_add(u32::from(k[5]) << 8);
            b = b.wrapping_add(u32::from(k[4]));
            a = a.wrapping_add(u32::from(k[3]) << 24);
            a = a.wrapping_add(u32::from(k[2]) << 16);
            a = a.wrapping_add(u32::from(k[1]) << 8);
            a = a.wrapping_add(u32::from(k[0]));
        }
        8 => {
            b = b.wrapping_add(u32::from(k[7]) << 24);
            b = b.wrapping_add(u32::from(k[6]) << 16);
            b = b.wrapping_add(u32::from(k[5]) << 8);
            b = b.wrapping_add(u32::from(k[4]));
            a = a.wrapping_add(u32::from(k[3]) << 24);
            a = a.wrapping_add(u32::from(k[2]) << 16);
            a = a.wrapping_add(u32::from(k[1]) << 8);
            a = a.wrapping_add(u32::from(k[0]));
        }
        7 => {
            b = b.wrapping_add(u32::from(k[6]) << 16);
            b = b.wrapping_add(u32::from(k[5]) << 8);
            b = b.wrapping_add(u32::from(k[4]));
            a = a.wrapping_add(u32::from(k[3]) << 24);
            a = a.wrapping_add(u32::from(k[2]) << 16);
            a = a.wrapping_add(u32::from(k[1]) << 8);
            a = a.wrapping_add(u32::from(k[0]));
        }
        6 => {
            b = b.wrapping_add(u32::from(k[5]) << 8);
            b = b.wrapping_add(u32::from(k[4]));
            a = a.wrapping_add(u32::from(k[3]) << 24);
            a = a.wrapping_add(u32::from(k[2]) << 16);
            a = a.wrapping_add(u32::from(k[1]) << 8);
            a = a.wrapping_add(u32::from(k[0]));
        }
        5 => {
            b = b.wrapping_add(u32::from(k[4]));
            a = a.wrapping_add(u32::from(k[3]) << 24);
            a = a.wrapping_add(u32::from(k[2]) << 16);
            a = a.wrapping_add(u32::from(k[1]) << 8);
            a = a.wrapping_add(u32::from(k[0]));
        }
        4 => {
            a = a.wrapping_add(u32::from(k[3]) << 24);
            a = a.wrapping_add(u32::from(k[2]) << 16);
            a = a.wrapping_add(u32::from(k[1]) << 8);
            a = a.wrapping_add(u32::from(k[0]));
        }
        3 => {
            a = a.wrapping_add(u32::from(k[2]) << 16);
            a = a.wrapping_add(u32::from(k[1]) << 8);
            a = a.wrapping_add(u32::from(k[0]));
        }
        2 => {
            a = a.wrapping_add(u32::from(k[1]) << 8);
            a = a.wrapping_add(u32::from(k[0]));
        }
        1 => {
            a = a.wrapping_add(u32::from(k[0]));
        }
        0 => {
            *pc = c;
            *pb = b;
            return;
        }
        _ => unreachable!("k.len() should be <= 12"),
    }

    final_mix(&mut a, &mut b, &mut c);

    *pc = c;
    *pb = b;
}
