//! Fixed pool of transport packets.
//!
//! The USB receive path and the frame buffers exchange packets without
//! copying them. Every packet lives in a statically sized arena and is handed
//! out as a move-only [`Packet`] handle. Dropping the handle returns the slot
//! to the pool, so a packet is always either owned by exactly one holder or
//! free, never both.
//!
//! The free list is a bitmap indexed by slot: a set bit means the slot is
//! available. Allocation takes the lowest available slot.

use core::cell::{RefCell, UnsafeCell};

use critical_section::Mutex;

use crate::config::NUM_PACKET_BUFFERS;
use crate::debug::fatal;
use crate::protocol::PACKET_SIZE;

const MASK_WORDS: usize = NUM_PACKET_BUFFERS.div_ceil(32);

/// Bitmap with one set bit per slot, MSB first.
const fn initial_mask() -> [u32; MASK_WORDS] {
    let mut mask = [0; MASK_WORDS];
    let mut slot = 0;
    while slot < NUM_PACKET_BUFFERS {
        mask[slot >> 5] |= 0x8000_0000 >> (slot & 31);
        slot += 1;
    }
    mask
}

/// Arena of transport packets shared by interrupt and main loop.
pub struct PacketPool {
    buffers: [UnsafeCell<[u8; PACKET_SIZE]>; NUM_PACKET_BUFFERS],
    available: Mutex<RefCell<[u32; MASK_WORDS]>>,
}

// SAFETY: a buffer is only reachable through the single `Packet` that owns its
// slot, and the bitmap is only touched inside a critical section.
unsafe impl Sync for PacketPool {}

impl PacketPool {
    pub const fn new() -> Self {
        Self {
            buffers: [const { UnsafeCell::new([0; PACKET_SIZE]) }; NUM_PACKET_BUFFERS],
            available: Mutex::new(RefCell::new(initial_mask())),
        }
    }

    /// Total number of packets in the pool.
    pub const fn capacity(&self) -> usize {
        NUM_PACKET_BUFFERS
    }

    /// Number of packets currently free.
    pub fn available(&self) -> usize {
        critical_section::with(|cs| {
            let mask = self.available.borrow_ref(cs);
            mask.iter().map(|word| word.count_ones() as usize).sum()
        })
    }

    /// Takes a packet from the pool, or `None` if every packet is in use.
    ///
    /// The contents are whatever the previous owner left behind.
    pub fn try_alloc(&self) -> Option<Packet<'_>> {
        let slot = critical_section::with(|cs| {
            let mut mask = self.available.borrow_ref_mut(cs);
            let index = mask.iter().position(|word| *word != 0)?;
            let bit = mask[index].leading_zeros() as usize;
            mask[index] &= !(0x8000_0000 >> bit);
            Some(index * 32 + bit)
        })?;

        #[allow(clippy::cast_possible_truncation)]
        Some(Packet {
            pool: self,
            slot: slot as u16,
        })
    }

    /// Takes a packet from the pool.
    ///
    /// Running out of packets means the buffer budget in `config.rs` is
    /// wrong, which is fatal.
    pub fn alloc(&self) -> Packet<'_> {
        match self.try_alloc() {
            Some(packet) => packet,
            None => fatal("packet pool exhausted"),
        }
    }

    /// Takes a packet from the pool and zeroes it.
    pub fn alloc_zeroed(&self) -> Packet<'_> {
        let mut packet = self.alloc();
        packet.clear();
        packet
    }

    fn release(&self, slot: usize) {
        if slot >= NUM_PACKET_BUFFERS {
            fatal("packet bad free");
        }
        let bit = 0x8000_0000 >> (slot & 31);
        critical_section::with(|cs| {
            let mut mask = self.available.borrow_ref_mut(cs);
            if mask[slot >> 5] & bit != 0 {
                fatal("packet double free");
            }
            mask[slot >> 5] |= bit;
        });
    }
}

impl Default for PacketPool {
    fn default() -> Self {
        Self::new()
    }
}

/// Exclusive handle to one packet of a [`PacketPool`].
///
/// Functions that take a `Packet` by value take ownership of it; dropping the
/// handle frees the packet.
#[must_use = "dropping a packet returns it to the pool"]
pub struct Packet<'a> {
    pool: &'a PacketPool,
    slot: u16,
}

impl Packet<'_> {
    /// Position of the packet in the pool.
    pub const fn slot(&self) -> usize {
        self.slot as usize
    }

    pub fn bytes(&self) -> &[u8; PACKET_SIZE] {
        // SAFETY: the slot was marked in use when this handle was created and
        // stays so until it is dropped; no other reference to it exists.
        unsafe { &*self.pool.buffers[self.slot()].get() }
    }

    pub fn bytes_mut(&mut self) -> &mut [u8; PACKET_SIZE] {
        // SAFETY: as in `bytes`, and `&mut self` makes the borrow unique.
        unsafe { &mut *self.pool.buffers[self.slot()].get() }
    }

    /// Header byte of the packet.
    pub fn header(&self) -> u8 {
        self.bytes()[0]
    }

    /// Zeroes the whole packet.
    pub fn clear(&mut self) {
        self.bytes_mut().fill(0);
    }

    /// Zeroes everything past the first `len` bytes.
    pub fn zero_pad(&mut self, len: usize) {
        if len < PACKET_SIZE {
            self.bytes_mut()[len..].fill(0);
        }
    }
}

impl Drop for Packet<'_> {
    fn drop(&mut self) {
        self.pool.release(self.slot());
    }
}

impl core::fmt::Debug for Packet<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Packet")
            .field("slot", &self.slot)
            .field("header", &self.header())
            .finish()
    }
}
