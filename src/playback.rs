//! Frame stepping for a host-driven player loop.
//!
//! [`Player`] decides which frame to draw on each tick and how long to wait before the next
//! one; it never renders. Hosts call [`Player::tick`] from their timer and draw the returned
//! frame with [`crate::Animation::render`].

use std::time::Duration;

use crate::animation::LoadedInfo;

/// Interval used when the range is empty or has no duration.
const FALLBACK_INTERVAL: Duration = Duration::from_millis(16);

/// What happens when playback reaches the end of the range.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum RepeatMode {
    /// Jump back to the first frame.
    #[default]
    Restart,
    /// Change direction.
    Reverse,
}

/// Playback configuration.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Playback {
    /// First frame played.
    pub first: u32,
    /// Last frame played. `None` plays to the end.
    pub last: Option<u32>,
    /// Passes over the range before playback stops. `None` repeats forever.
    pub repeat_count: Option<u32>,
    /// Behavior at either end of the range.
    pub repeat_mode: RepeatMode,
    /// Playback rate multiplier. Non-positive values play at normal speed.
    pub speed: f32,
}

impl Default for Playback {
    fn default() -> Self {
        Self {
            first: 0,
            last: None,
            repeat_count: Some(1),
            repeat_mode: RepeatMode::Restart,
            speed: 1.0,
        }
    }
}

/// One step of a [`Player`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Tick {
    /// Frame to draw now.
    pub frame: u32,
    /// `true` on the first tick after start or [`Player::rewind`].
    pub started: bool,
    /// `true` when this tick wrapped around an end of the range.
    pub repeated: bool,
    /// `true` once every pass is done; `frame` then stays where the last pass ended.
    pub ended: bool,
}

/// Steps through a frame range with repeat handling.
#[derive(Clone, Debug)]
pub struct Player {
    opts: Playback,
    total_frames: u32,
    duration_ms: u64,
    frame: u32,
    /// Frame returned by the previous tick.
    shown: u32,
    forward: bool,
    passes: u32,
    started: bool,
    ended: bool,
}

impl Player {
    /// Player over an animation described by `info`.
    pub fn new(opts: Playback, info: &LoadedInfo) -> Self {
        let total_frames = info.total_frames.max(0.0) as u32;
        let mut player = Self {
            opts,
            total_frames,
            duration_ms: info.duration_ms,
            frame: 0,
            shown: 0,
            forward: true,
            passes: 0,
            started: false,
            ended: false,
        };
        player.opts.first = player.opts.first.min(player.last_frame());
        player.frame = player.opts.first;
        player.shown = player.opts.first;
        player
    }

    /// Current options.
    pub fn playback(&self) -> &Playback {
        &self.opts
    }

    /// First frame of the range.
    pub fn first_frame(&self) -> u32 {
        self.opts.first
    }

    /// Last frame of the range.
    pub fn last_frame(&self) -> u32 {
        match self.opts.last {
            Some(last) => last.min(self.total_frames),
            None => self.total_frames,
        }
    }

    /// Delay between ticks: the range's share of the duration, divided by the speed.
    pub fn interval(&self) -> Duration {
        let frames = self.last_frame().saturating_sub(self.opts.first);
        if frames == 0 || self.duration_ms == 0 {
            return FALLBACK_INTERVAL;
        }
        let ms = self.duration_ms as f64 / f64::from(frames);
        let speed = if self.opts.speed > 0.0 {
            f64::from(self.opts.speed)
        } else {
            1.0
        };
        Duration::from_secs_f64(ms / speed / 1000.0)
    }

    /// Passes completed so far.
    pub fn passes(&self) -> u32 {
        self.passes
    }

    /// `true` once every pass is done.
    pub fn is_ended(&self) -> bool {
        self.ended
    }

    /// Start over from the first frame, going forward.
    pub fn rewind(&mut self) {
        self.frame = self.opts.first;
        self.shown = self.opts.first;
        self.forward = true;
        self.passes = 0;
        self.started = false;
        self.ended = false;
    }

    /// Frame to draw now, then advance.
    pub fn tick(&mut self) -> Tick {
        let started = !self.started;
        self.started = true;

        if self.ended || self.opts.repeat_count.is_some_and(|n| self.passes >= n) {
            self.ended = true;
            return Tick {
                frame: self.shown,
                started,
                repeated: false,
                ended: true,
            };
        }

        let frame = self.frame;
        self.shown = frame;
        let (first, last) = (self.opts.first, self.last_frame());
        let mut repeated = false;
        if self.forward {
            if self.frame >= last {
                repeated = true;
                match self.opts.repeat_mode {
                    RepeatMode::Reverse => {
                        self.forward = false;
                        self.frame = last.saturating_sub(1).max(first);
                    }
                    RepeatMode::Restart => self.frame = first,
                }
            } else {
                self.frame += 1;
            }
        } else if self.frame <= first {
            repeated = true;
            match self.opts.repeat_mode {
                RepeatMode::Reverse => {
                    self.forward = true;
                    self.frame = (first + 1).min(last);
                }
                RepeatMode::Restart => self.frame = last,
            }
        } else {
            self.frame -= 1;
        }
        if repeated {
            self.passes += 1;
            tracing::trace!(passes = self.passes, "playback wrapped");
        }

        Tick {
            frame,
            started,
            repeated,
            ended: false,
        }
    }
}

#[cfg(test)]
#[path = "../tests/unit/playback.rs"]
mod tests;
