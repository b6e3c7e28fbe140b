use measurements::AngularVelocity;

/// Nameplate data for one cooling fan.
#[derive(Debug, Clone)]
pub struct FanInfo {
    /// The fastest speed the fan can spin at
    pub max_speed: AngularVelocity,
}

impl Default for FanInfo {
    fn default() -> Self {
        FanInfo {
            max_speed: AngularVelocity::from_rpm(6000.0),
        }
    }
}

/// Runtime state of one fan. The configured speed is written by the backend
/// fan policy; a fan that is not working always reads as stopped.
#[derive(Debug, Clone)]
pub struct FanSimulator {
    pub info: FanInfo,
    speed: AngularVelocity,
    /// Whether the fan hardware is functional at all
    pub working: bool,
}

impl FanSimulator {
    pub fn new(info: FanInfo) -> Self {
        FanSimulator {
            info,
            speed: AngularVelocity::from_rpm(0.0),
            working: true,
        }
    }

    /// Effective speed: zero when the fan is not working, otherwise whatever
    /// the policy last configured.
    pub fn rpm(&self) -> AngularVelocity {
        if self.working {
            self.speed
        } else {
            AngularVelocity::from_rpm(0.0)
        }
    }

    pub fn set_rpm(&mut self, speed: AngularVelocity) {
        self.speed = speed;
    }
}
