//! Ad-driven boost tracks: idle -> watching -> boosted -> idle.
//!
//! One component serves both tracks; a `BoostConfig` names the track and its
//! durations. The persisted `BoostTrack` holds absolute end timestamps and is
//! the only source of truth. Transitions take effect at the timestamp the
//! phase ended, not when the engine next looked, so a suspended tab resumes
//! with the right remaining time and income splits at the right moment.

use super::state::{BoostStatus, BoostTrack, Track};
use crate::time::{IntervalTimer, Millis, SECOND_MS};

pub const DEFAULT_WATCH_SECS: u64 = 30;
pub const DEFAULT_BOOST_SECS: u64 = 60;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoostConfig {
    pub track: Track,
    pub watch_secs: u64,
    pub boost_secs: u64,
}

impl BoostConfig {
    pub fn new(track: Track, watch_secs: u64, boost_secs: u64) -> Self {
        Self {
            track,
            watch_secs,
            boost_secs,
        }
    }

    fn watch_ms(&self) -> Millis {
        self.watch_secs * SECOND_MS
    }

    fn boost_ms(&self) -> Millis {
        self.boost_secs * SECOND_MS
    }
}

/// What a countdown tick did to the track.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transition {
    None,
    /// The ad finished; the boost is now running.
    Boosted,
    /// The boost ran out.
    Expired,
}

pub fn is_active(track: &BoostTrack) -> bool {
    track.status == BoostStatus::Boosted
}

/// Whole seconds left in the current phase, rounded up. Zero when idle.
pub fn remaining_seconds(track: &BoostTrack, now: Millis) -> u64 {
    let end = match track.status {
        BoostStatus::Idle => None,
        BoostStatus::Watching => track.ad_watching_end_time,
        BoostStatus::Boosted => track.boost_end_time,
    };
    match end {
        Some(end) if end > now => (end - now).div_ceil(SECOND_MS),
        _ => 0,
    }
}

/// When the current phase ended, if it has by `now`. A phase missing its
/// end timestamp is due immediately.
pub fn due_at(track: &BoostTrack, now: Millis) -> Option<Millis> {
    let end = match track.status {
        BoostStatus::Idle => return None,
        BoostStatus::Watching => track.ad_watching_end_time,
        BoostStatus::Boosted => track.boost_end_time,
    };
    match end {
        Some(end) if end > now => None,
        Some(end) => Some(end),
        None => Some(now),
    }
}

/// Begin watching an ad. Only an idle track can start.
pub fn start_ad(track: &mut BoostTrack, cfg: &BoostConfig, now: Millis) -> bool {
    if track.status != BoostStatus::Idle {
        return false;
    }
    track.status = BoostStatus::Watching;
    track.ad_watching_end_time = Some(now + cfg.watch_ms());
    track.boost_end_time = None;
    true
}

/// Re-read the clock and apply at most one transition.
pub fn advance(track: &mut BoostTrack, cfg: &BoostConfig, now: Millis) -> Transition {
    if remaining_seconds(track, now) > 0 {
        return Transition::None;
    }
    match track.status {
        BoostStatus::Idle => {
            track.boost_end_time = None;
            track.ad_watching_end_time = None;
            Transition::None
        }
        BoostStatus::Watching => {
            track.status = BoostStatus::Boosted;
            track.boost_end_time = Some(now + cfg.boost_ms());
            track.ad_watching_end_time = None;
            Transition::Boosted
        }
        BoostStatus::Boosted => {
            track.status = BoostStatus::Idle;
            track.boost_end_time = None;
            track.ad_watching_end_time = None;
            Transition::Expired
        }
    }
}

/// Bring a freshly loaded track in line with the current time. The stored
/// status is not trusted; the timestamps decide.
///
/// An ad that finished while the app was closed starts a fresh full boost
/// instead of leaving the track stuck in `watching`.
pub fn settle(track: &mut BoostTrack, cfg: &BoostConfig, now: Millis) {
    match (track.ad_watching_end_time, track.boost_end_time) {
        (Some(ad_end), _) if ad_end <= now => {
            track.status = BoostStatus::Boosted;
            track.boost_end_time = Some(now + cfg.boost_ms());
            track.ad_watching_end_time = None;
        }
        (Some(_), _) => {
            track.status = BoostStatus::Watching;
            track.boost_end_time = None;
        }
        (None, Some(boost_end)) if boost_end > now => {
            track.status = BoostStatus::Boosted;
        }
        _ => {
            track.status = BoostStatus::Idle;
            track.boost_end_time = None;
        }
    }
}

/// The engine-side half of a track: its config plus the 1 s countdown,
/// which only runs while the track is not idle.
///
/// The engine drains transitions one at a time with `due` and `apply` so it
/// can settle income between them.
#[derive(Clone, Debug)]
pub struct BoostTimer {
    pub cfg: BoostConfig,
    countdown: IntervalTimer,
}

impl BoostTimer {
    pub fn new(cfg: BoostConfig) -> Self {
        Self {
            cfg,
            countdown: IntervalTimer::new(SECOND_MS),
        }
    }

    pub fn is_counting(&self) -> bool {
        self.countdown.is_running()
    }

    pub fn start_ad(&mut self, track: &mut BoostTrack, now: Millis) -> bool {
        if !start_ad(track, &self.cfg, now) {
            return false;
        }
        self.countdown.start(now);
        true
    }

    /// Resume counting after a load or reset.
    pub fn resume(&mut self, track: &BoostTrack, now: Millis) {
        if track.status == BoostStatus::Idle {
            self.countdown.stop();
        } else {
            self.countdown.start(now);
        }
    }

    /// Timestamp of the next transition due by `now`.
    pub fn due(&self, track: &BoostTrack, now: Millis) -> Option<Millis> {
        if !self.countdown.is_running() {
            return None;
        }
        due_at(track, now)
    }

    /// Apply the transition that fell due at `at`.
    pub fn apply(&mut self, track: &mut BoostTrack, at: Millis) -> Transition {
        let transition = advance(track, &self.cfg, at);
        if track.status == BoostStatus::Idle {
            self.countdown.stop();
        }
        transition
    }

    /// Apply every transition due by `now`, oldest first.
    pub fn catch_up(&mut self, track: &mut BoostTrack, now: Millis) -> Vec<(Millis, Transition)> {
        let mut applied = Vec::new();
        while let Some(at) = self.due(track, now) {
            match self.apply(track, at) {
                Transition::None => break,
                transition => applied.push((at, transition)),
            }
        }
        applied
    }
}
