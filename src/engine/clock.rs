/// Loop traversal direction at the playhead.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoopMode {
    /// Progress wraps from 1 back to 0.
    Loop,
    /// Progress rises 0..1 then falls 1..0; one full cycle takes twice the
    /// loop duration.
    PingPong,
}

/// Instantaneous playhead: normalized progress plus travel direction.
/// Direction is always `1.0` in loop mode; in ping-pong it is `-1.0` on the
/// falling half of the cycle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Playhead {
    pub progress: f64,
    pub direction: f64,
}

impl Playhead {
    pub const START: Self = Self {
        progress: 0.0,
        direction: 1.0,
    };
}

/// The loop clock. It never reads wall time itself; every query and mutation
/// takes the host timestamp `now_ms`, so the same call sequence always
/// produces the same playheads.
///
/// Internally the clock is just an epoch: `progress` is derived from
/// `now - epoch` on every query, so an unpaused clock costs nothing per
/// frame. Pausing pins the playhead; resuming moves the epoch so the pinned
/// playhead is re-derived at the resume instant, which makes playback continue
/// without a visible jump.
#[derive(Clone, Debug)]
pub struct LoopClock {
    duration_ms: f64,
    mode: LoopMode,
    epoch_ms: f64,
    pinned: Option<Playhead>,
}

impl LoopClock {
    pub fn new(now_ms: f64, duration_ms: f64) -> Self {
        Self {
            duration_ms: duration_ms.max(1.0),
            mode: LoopMode::Loop,
            epoch_ms: now_ms,
            pinned: None,
        }
    }

    pub fn duration_ms(&self) -> f64 {
        self.duration_ms
    }

    pub fn mode(&self) -> LoopMode {
        self.mode
    }

    pub fn is_paused(&self) -> bool {
        self.pinned.is_some()
    }

    /// Playhead at `now_ms`. While paused this is the pinned value regardless
    /// of the timestamp.
    pub fn playhead(&self, now_ms: f64) -> Playhead {
        if let Some(pinned) = self.pinned {
            return pinned;
        }
        self.derive(now_ms)
    }

    pub fn progress(&self, now_ms: f64) -> f64 {
        self.playhead(now_ms).progress
    }

    fn derive(&self, now_ms: f64) -> Playhead {
        let elapsed = now_ms - self.epoch_ms;
        match self.mode {
            LoopMode::Loop => Playhead {
                progress: elapsed.rem_euclid(self.duration_ms) / self.duration_ms,
                direction: 1.0,
            },
            LoopMode::PingPong => {
                let phase = elapsed.rem_euclid(2.0 * self.duration_ms) / self.duration_ms;
                if phase < 1.0 {
                    Playhead {
                        progress: phase,
                        direction: 1.0,
                    }
                } else {
                    Playhead {
                        progress: 2.0 - phase,
                        direction: -1.0,
                    }
                }
            }
        }
    }

    /// Epoch such that deriving at `now_ms` reproduces `playhead`.
    fn epoch_for(&self, now_ms: f64, playhead: Playhead) -> f64 {
        let offset = match self.mode {
            LoopMode::Loop => playhead.progress,
            LoopMode::PingPong => {
                if playhead.direction >= 0.0 {
                    playhead.progress
                } else {
                    2.0 - playhead.progress
                }
            }
        };
        now_ms - offset * self.duration_ms
    }

    /// Freeze the playhead. Pausing an already-paused clock is a no-op.
    pub fn pause(&mut self, now_ms: f64) {
        if self.pinned.is_none() {
            self.pinned = Some(self.derive(now_ms));
        }
    }

    /// Unfreeze, resynchronizing the epoch so progress continues from the
    /// pinned playhead. No-op when not paused.
    pub fn resume(&mut self, now_ms: f64) {
        if let Some(pinned) = self.pinned.take() {
            self.epoch_ms = self.epoch_for(now_ms, pinned);
        }
    }

    /// Jump to `progress` (clamped to `[0,1]`), preserving the current travel
    /// direction and pause state.
    pub fn seek(&mut self, now_ms: f64, progress: f64) {
        let progress = if progress.is_finite() {
            progress.clamp(0.0, 1.0)
        } else {
            0.0
        };
        let direction = self.playhead(now_ms).direction;
        let target = Playhead {
            progress,
            direction,
        };
        match self.pinned.as_mut() {
            Some(pinned) => *pinned = target,
            None => self.epoch_ms = self.epoch_for(now_ms, target),
        }
    }

    /// Switch loop mode without moving the playhead.
    pub fn set_mode(&mut self, now_ms: f64, mode: LoopMode) {
        if mode == self.mode {
            return;
        }
        let mut playhead = self.playhead(now_ms);
        self.mode = mode;
        if mode == LoopMode::Loop {
            playhead.direction = 1.0;
            // Loop progress lives in [0,1); fold the ping-pong endpoint back.
            if playhead.progress >= 1.0 {
                playhead.progress = 0.0;
            }
        }
        match self.pinned.as_mut() {
            Some(pinned) => *pinned = playhead,
            None => self.epoch_ms = self.epoch_for(now_ms, playhead),
        }
    }

    /// Reset to progress 0 travelling forward, keeping the pause state.
    pub fn restart(&mut self, now_ms: f64) {
        self.epoch_ms = now_ms;
        if self.pinned.is_some() {
            self.pinned = Some(Playhead::START);
        }
    }
}
