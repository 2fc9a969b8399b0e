//! Per-frame follow loop body.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::detect::FrameDetections;
use crate::ptz::{compute_command, CropRect, GimbalCommand, GimbalFov, SharedPtz};
use crate::select::TargetSelector;

/// Which actuation the controller drives.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FollowMode {
    /// Digital crop of the full frame.
    #[default]
    Virtual,
    /// Angular commands for a physical pan/tilt head.
    Gimbal,
}

impl FromStr for FollowMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "virtual" | "crop" => Ok(Self::Virtual),
            "gimbal" | "physical" => Ok(Self::Gimbal),
            other => Err(anyhow!(
                "unknown follow mode '{}': expected 'virtual' or 'gimbal'",
                other
            )),
        }
    }
}

impl fmt::Display for FollowMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Virtual => write!(f, "virtual"),
            Self::Gimbal => write!(f, "gimbal"),
        }
    }
}

/// One actuation request, produced once per frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FollowCommand {
    Crop {
        rect: CropRect,
        zoom: f64,
        target_id: Option<i64>,
    },
    Gimbal(GimbalCommand),
}

/// Glues target selection and the response engines to the shared PTZ state.
///
/// `process` is the whole per-frame computation. It runs under one lock of
/// `SharedPtz`, so an operator event is applied either entirely before or
/// entirely after a frame.
pub struct FollowController {
    mode: FollowMode,
    shared: SharedPtz,
    selector: TargetSelector,
    fov: GimbalFov,
    frames: u64,
}

impl FollowController {
    pub fn new(mode: FollowMode, shared: SharedPtz, fov: GimbalFov) -> Self {
        Self {
            mode,
            shared,
            selector: TargetSelector::new(),
            fov,
            frames: 0,
        }
    }

    pub fn mode(&self) -> FollowMode {
        self.mode
    }

    pub fn shared(&self) -> &SharedPtz {
        &self.shared
    }

    pub fn frames_processed(&self) -> u64 {
        self.frames
    }

    pub fn process(&mut self, frame: &FrameDetections) -> FollowCommand {
        self.frames += 1;
        let mode = self.mode;
        let fov = self.fov;
        let selector = &mut self.selector;

        self.shared.with(|ptz| {
            let target = selector.select(ptz.state_mut(), frame);
            match mode {
                FollowMode::Virtual => {
                    let rect = ptz.follow(frame, target);
                    FollowCommand::Crop {
                        rect,
                        zoom: ptz.state().zoom(),
                        target_id: ptz.state().target_id(),
                    }
                }
                FollowMode::Gimbal => {
                    // keep the detection cache current for operator cycling
                    ptz.follow(frame, target);
                    FollowCommand::Gimbal(compute_command(
                        target,
                        frame.width,
                        frame.height,
                        &fov,
                    ))
                }
            }
        })
    }
}
