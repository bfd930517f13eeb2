//! Pose playback
//!
//! The engine only ever asks "which pose is displayed right now". [`PoseAnimator`] answers
//! that from the clip timelines in the boss config: animation cues start a clip, the clip's
//! frames play in order, and the boss falls back to its idle pose when the clip ends.

use bevy::prelude::*;

use crate::config::{ClipTimeline, EncounterSettings};
use crate::encounter::services::{Clip, Pose, PoseSource};

#[derive(Debug, Clone, Copy, PartialEq)]
struct Playing {
    timeline: usize,
    frame: usize,
    in_frame: f32,
}

/// Plays clip timelines and exposes the displayed pose.
#[derive(Component, Debug, Clone, Default)]
pub struct PoseAnimator {
    timelines: Vec<ClipTimeline>,
    idle: Pose,
    playing: Option<Playing>,
}

impl PoseAnimator {
    pub fn new(settings: &EncounterSettings) -> Self {
        Self {
            timelines: settings.animations.clone(),
            idle: settings.idle_pose,
            playing: None,
        }
    }

    /// Start `clip` from its first frame. Returns false when the boss has no such clip.
    pub fn play(&mut self, clip: Clip) -> bool {
        let Some(index) = self.timelines.iter().position(|t| t.clip == clip) else {
            debug!("No timeline for {:?}; pose stays put", clip);
            return false;
        };
        if self.timelines[index].frames.is_empty() {
            self.playing = None;
            return false;
        }
        self.playing = Some(Playing {
            timeline: index,
            frame: 0,
            in_frame: 0.0,
        });
        true
    }

    pub fn stop(&mut self) {
        self.playing = None;
    }

    pub fn playing(&self) -> Option<Clip> {
        self.playing.map(|p| self.timelines[p.timeline].clip)
    }

    pub fn advance(&mut self, dt: f32) {
        let Some(mut playing) = self.playing else {
            return;
        };
        let frames = &self.timelines[playing.timeline].frames;
        playing.in_frame += dt;
        while let Some(&(_, secs)) = frames.get(playing.frame) {
            if playing.in_frame < secs {
                break;
            }
            playing.in_frame -= secs;
            playing.frame += 1;
        }
        self.playing = if playing.frame < frames.len() {
            Some(playing)
        } else {
            None
        };
    }

    pub fn current_pose(&self) -> Pose {
        match self.playing {
            Some(p) => self.timelines[p.timeline].frames[p.frame].0,
            None => self.idle,
        }
    }
}

impl PoseSource for PoseAnimator {
    fn current_pose(&self) -> Option<Pose> {
        Some(PoseAnimator::current_pose(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BossRoster;

    #[test]
    fn test_clip_plays_frames_then_idles() {
        let roster = BossRoster::default();
        let mut animator = PoseAnimator::new(&roster.swordsman.encounter);
        assert_eq!(animator.current_pose(), Pose(0));

        assert!(animator.play(Clip::Swing));
        assert_eq!(animator.current_pose(), Pose(1));
        animator.advance(0.45);
        assert_eq!(animator.current_pose(), Pose(3));
        animator.advance(0.6);
        assert_eq!(animator.current_pose(), Pose(0));
        assert!(animator.playing().is_none());
    }

    #[test]
    fn test_unknown_clip_is_ignored() {
        let roster = BossRoster::default();
        let mut animator = PoseAnimator::new(&roster.wolf.encounter);
        assert!(!animator.play(Clip::Slam));
        assert_eq!(animator.current_pose(), Pose(0));
    }
}
