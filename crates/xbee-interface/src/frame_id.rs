use std::sync::atomic::{AtomicU8, Ordering};

/// Hands out frame ids 1..=255, wrapping.
///
/// Id 0 tells the radio not to answer, so it is never issued.
#[derive(Debug)]
pub struct FrameIdAllocator {
    next: AtomicU8,
}

impl Default for FrameIdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameIdAllocator {
    pub fn new() -> Self {
        Self {
            next: AtomicU8::new(1),
        }
    }

    pub fn next_id(&self) -> u8 {
        loop {
            let id = self.next.fetch_add(1, Ordering::Relaxed);
            if id != 0 {
                return id;
            }
        }
    }
}
