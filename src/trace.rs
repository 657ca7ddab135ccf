//! Samples and memory fingerprints the watchdog judges.

use core::fmt;
use core::ptr;

pub const TRACE_CAPACITY: usize = 64;

/// Bytes past the start of `kmain` in which the idle jump may sit.
pub const IDLE_WINDOW: u64 = 64;

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Sampled instruction pointers. Only the first `TRACE_CAPACITY` are kept,
/// the count keeps going.
#[derive(Debug)]
pub struct Trace {
    samples: [u64; TRACE_CAPACITY],
    count: usize,
}

impl Trace {
    pub const fn new() -> Self {
        Trace {
            samples: [0; TRACE_CAPACITY],
            count: 0,
        }
    }

    pub fn record(&mut self, ip: u64) -> usize {
        if self.count < TRACE_CAPACITY {
            self.samples[self.count] = ip;
        }
        self.count = self.count.saturating_add(1);
        self.count
    }

    pub fn samples(&self) -> &[u64] {
        &self.samples[..self.count.min(TRACE_CAPACITY)]
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn first(&self) -> Option<u64> {
        self.samples().first().copied()
    }

    /// True when every sample landed on the same instruction.
    pub fn is_self_loop(&self) -> bool {
        match self.first() {
            Some(first) => self.samples().iter().all(|&ip| ip == first),
            None => false,
        }
    }
}

impl Default for Trace {
    fn default() -> Self {
        Self::new()
    }
}

/// FNV-1a over `bytes`.
pub fn digest(bytes: impl IntoIterator<Item = u8>) -> u64 {
    bytes.into_iter().fold(FNV_OFFSET, |hash, byte| {
        (hash ^ byte as u64).wrapping_mul(FNV_PRIME)
    })
}

/// Fingerprint of a memory window taken before the handoff.
#[derive(Debug, Clone, Copy)]
pub struct Snapshot {
    base: *const u8,
    len: usize,
    digest: u64,
}

// The window is only read, through volatile loads.
unsafe impl Send for Snapshot {}
unsafe impl Sync for Snapshot {}

impl Snapshot {
    /// # Safety
    ///
    /// `base..base + len` must stay mapped and readable for as long as the
    /// snapshot is used.
    pub unsafe fn capture(base: *const u8, len: usize) -> Self {
        let mut snapshot = Snapshot {
            base,
            len,
            digest: 0,
        };
        snapshot.digest = snapshot.digest_now();
        snapshot
    }

    pub fn digest(&self) -> u64 {
        self.digest
    }

    pub fn digest_now(&self) -> u64 {
        digest((0..self.len).map(|i| unsafe { ptr::read_volatile(self.base.add(i)) }))
    }

    pub fn unchanged(&self) -> bool {
        self.digest_now() == self.digest
    }
}

/// What the watchdog expects to see while the entry point idles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Expectation {
    pub entry: u64,
    pub window: u64,
    pub samples: usize,
}

impl Expectation {
    pub const DEFAULT_SAMPLES: usize = 32;

    pub fn new(entry: u64) -> Self {
        Expectation {
            entry,
            window: IDLE_WINDOW,
            samples: Self::DEFAULT_SAMPLES,
        }
    }

    pub fn contains(&self, ip: u64) -> bool {
        ip >= self.entry && ip - self.entry < self.window
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Idle,
    Empty,
    Escaped { ip: u64 },
    Drifted { first: u64, ip: u64 },
    Dirty { digest: u64 },
    Fault { what: &'static str },
}

impl Verdict {
    pub fn is_idle(&self) -> bool {
        matches!(self, Verdict::Idle)
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Idle => write!(f, "idle"),
            Verdict::Empty => write!(f, "no samples recorded"),
            Verdict::Escaped { ip } => write!(f, "execution escaped the idle loop at {:#x}", ip),
            Verdict::Drifted { first, ip } => {
                write!(f, "idle loop moved from {:#x} to {:#x}", first, ip)
            }
            Verdict::Dirty { digest } => {
                write!(f, "memory changed while idle (digest now {:#018x})", digest)
            }
            Verdict::Fault { what } => write!(f, "{} while idle", what),
        }
    }
}

/// Decides whether a run looked like a side-effect-free jump to self.
pub fn judge(trace: &Trace, expectation: &Expectation, before: u64, after: u64) -> Verdict {
    let Some(first) = trace.first() else {
        return Verdict::Empty;
    };

    if let Some(&ip) = trace.samples().iter().find(|&&ip| !expectation.contains(ip)) {
        return Verdict::Escaped { ip };
    }

    if let Some(&ip) = trace.samples().iter().find(|&&ip| ip != first) {
        return Verdict::Drifted { first, ip };
    }

    if before != after {
        return Verdict::Dirty { digest: after };
    }

    Verdict::Idle
}
