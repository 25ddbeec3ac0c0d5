//! # Encoder counter
//! The lock-free position counter shared between the encoder edge handler and the control loop.
//!
//! The edge handler only calls [`EncoderCounter::step`] and [`EncoderCounter::press`]. The
//! control loop reads the position, takes the change and click flags, and re-centers the
//! counter. Each operation is a single atomic access, so neither side ever blocks the other.
use portable_atomic::{AtomicBool, AtomicI32, Ordering};

/// Raw quadrature transition table, indexed by `(previous_state << 2) | current_state` where a
/// state is `(a << 1) | b`. Invalid double transitions count as zero.
pub const QUADRATURE_TRANSITIONS: [i8; 16] = [0, -1, 1, 0, 1, 0, 0, -1, -1, 0, 0, 1, 0, 1, -1, 0];

/// Bounded encoder position with change and click flags.
pub struct EncoderCounter {
    /// Current position, always inside `min..=max`.
    position: AtomicI32,
    /// Lowest position.
    min: i32,
    /// Highest position.
    max: i32,
    /// Set by a step that moved the position.
    changed: AtomicBool,
    /// Set by a debounced button press.
    clicked: AtomicBool,
}

impl EncoderCounter {
    /// A counter bounded to `min..=max`, starting at `min`.
    #[must_use]
    pub const fn new(min: i32, max: i32) -> Self {
        Self {
            position: AtomicI32::new(min),
            min,
            max,
            changed: AtomicBool::new(false),
            clicked: AtomicBool::new(false),
        }
    }

    /// Moves the position by `delta` detents, clamped to the bounds. Non-circular: a step past
    /// a bound leaves the position at that bound and raises no change.
    pub fn step(&self, delta: i32) {
        let result = self
            .position
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                let next = current.saturating_add(delta).clamp(self.min, self.max);
                (next != current).then_some(next)
            });
        if result.is_ok() {
            self.changed.store(true, Ordering::Release);
        }
    }

    /// Records a debounced button press.
    pub fn press(&self) {
        self.clicked.store(true, Ordering::Release);
    }

    /// Current position.
    #[must_use]
    pub fn position(&self) -> i32 {
        self.position.load(Ordering::Acquire)
    }

    /// Moves the position without raising a change, clamped to the bounds.
    pub fn set_position(&self, position: i32) {
        self.position
            .store(position.clamp(self.min, self.max), Ordering::Release);
    }

    /// Reads the position and re-centers it in one atomic swap.
    pub fn recenter(&self, center: i32) -> i32 {
        self.position
            .swap(center.clamp(self.min, self.max), Ordering::AcqRel)
    }

    /// Takes the change flag.
    pub fn take_changed(&self) -> bool {
        self.changed.swap(false, Ordering::AcqRel)
    }

    /// Takes the click flag.
    pub fn take_clicked(&self) -> bool {
        self.clicked.swap(false, Ordering::AcqRel)
    }
}

/// Turns raw quadrature edges into detent steps.
pub struct QuadratureDecoder {
    /// Last `(a << 1) | b` state.
    state: u8,
    /// Transitions accumulated towards the next detent.
    partial: i8,
    /// Transitions per detent.
    transitions_per_step: i8,
}

impl QuadratureDecoder {
    /// A decoder starting from the given pin levels.
    #[must_use]
    pub const fn new(a: bool, b: bool, transitions_per_step: i8) -> Self {
        Self {
            state: ((a as u8) << 1) | b as u8,
            partial: 0,
            transitions_per_step,
        }
    }

    /// Feeds the current pin levels. Returns `-1`, `0` or `1` detents.
    pub fn update(&mut self, a: bool, b: bool) -> i32 {
        let current = ((a as u8) << 1) | b as u8;
        let index = usize::from((self.state << 2) | current);
        self.state = current;
        self.partial += QUADRATURE_TRANSITIONS[index];
        if self.partial >= self.transitions_per_step {
            self.partial = 0;
            1
        } else if self.partial <= -self.transitions_per_step {
            self.partial = 0;
            -1
        } else {
            0
        }
    }
}
