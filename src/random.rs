//! OS-backed randomness for table rolls and the admin password.

use rand_core::{OsRng, RngCore};

/// Uniform integer in `0..bound`. `bound` must be non-zero.
pub fn below(bound: u32) -> u32 {
    debug_assert!(bound > 0);
    // Reject the tail so every residue is equally likely.
    let zone = u32::MAX - (u32::MAX % bound);
    loop {
        let value = OsRng.next_u32();
        if value < zone {
            return value % bound;
        }
    }
}

/// `len` characters drawn from printable ASCII without space (`!`..=`~`).
pub fn printable_ascii(len: usize) -> String {
    const FIRST: u8 = b'!';
    const SPAN: u32 = (b'~' - b'!' + 1) as u32;
    (0..len)
        .map(|_| char::from(FIRST + below(SPAN) as u8))
        .collect()
}
