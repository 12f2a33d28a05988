//! Operating modes and the failure modes bound to them.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{SetupError, SetupResult};
use crate::random::{Distribution, Well512};

/// Plant operating mode for one timestep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum OperatingMode {
    Off,
    /// Entering standby this step.
    StandbyStart,
    /// Within the first hour of standby.
    StandbyFirst,
    StandbyOngoing,
    /// Starting power production this step.
    OnlineStart,
    /// Within the first hour of power production.
    OnlineFirst,
    OnlineOngoing,
}

impl OperatingMode {
    pub const ALL: [OperatingMode; 7] = [
        Self::Off,
        Self::StandbyStart,
        Self::StandbyFirst,
        Self::StandbyOngoing,
        Self::OnlineStart,
        Self::OnlineFirst,
        Self::OnlineOngoing,
    ];

    /// Short code used in logs, exports and configuration.
    pub fn code(self) -> &'static str {
        match self {
            Self::Off => "OFF",
            Self::StandbyStart => "SS",
            Self::StandbyFirst => "SF",
            Self::StandbyOngoing => "SO",
            Self::OnlineStart => "OS",
            Self::OnlineFirst => "OF",
            Self::OnlineOngoing => "OO",
        }
    }

    pub fn is_online(self) -> bool {
        matches!(
            self,
            Self::OnlineStart | Self::OnlineFirst | Self::OnlineOngoing
        )
    }

    pub fn is_standby(self) -> bool {
        matches!(
            self,
            Self::StandbyStart | Self::StandbyFirst | Self::StandbyOngoing
        )
    }

    /// `true` for the two start modes, OS and SS.
    pub fn is_start(self) -> bool {
        matches!(self, Self::OnlineStart | Self::StandbyStart)
    }

    /// Mode whose continuous failures apply during this step: start modes
    /// map to their first-hour submode, all others to themselves.
    pub fn running_submode(self) -> Self {
        match self {
            Self::OnlineStart => Self::OnlineFirst,
            Self::StandbyStart => Self::StandbyFirst,
            other => other,
        }
    }
}

impl fmt::Display for OperatingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for OperatingMode {
    type Err = SetupError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|m| m.code().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| SetupError::UnknownMode(s.to_string()))
    }
}

impl TryFrom<String> for OperatingMode {
    type Error = SetupError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<OperatingMode> for String {
    fn from(m: OperatingMode) -> Self {
        m.code().to_string()
    }
}

/// Mode selector of a failure type: one exact mode or a wildcard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum FailureMode {
    Exact(OperatingMode),
    /// `ALL`: any mode except OFF.
    All,
    /// `O`: first-hour or ongoing online operation.
    Online,
}

impl FailureMode {
    /// Whether a failure type with this selector is exposed in `mode`.
    pub fn applies_to(self, mode: OperatingMode) -> bool {
        match self {
            Self::Exact(m) => m == mode,
            Self::All => mode != OperatingMode::Off,
            Self::Online => matches!(
                mode,
                OperatingMode::OnlineFirst | OperatingMode::OnlineOngoing
            ),
        }
    }
}

impl fmt::Display for FailureMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(m) => f.write_str(m.code()),
            Self::All => f.write_str("ALL"),
            Self::Online => f.write_str("O"),
        }
    }
}

impl FromStr for FailureMode {
    type Err = SetupError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ALL" => Ok(Self::All),
            "O" => Ok(Self::Online),
            other => other.parse().map(Self::Exact),
        }
    }
}

impl TryFrom<String> for FailureMode {
    type Error = SetupError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<FailureMode> for String {
    fn from(m: FailureMode) -> Self {
        m.to_string()
    }
}

/// A named way a component can fail, in a given mode, with its own
/// distribution.
///
/// The currently drawn life (or probability) lives in the owning
/// component's status so that a status snapshot captures it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureType {
    pub component: String,
    pub id: String,
    pub mode: FailureMode,
    pub distribution: Distribution,
}

impl FailureType {
    /// Creates a failure type after checking that its mode and distribution
    /// agree.
    ///
    /// Binary (probability) failures are checked on entry to a start mode, so
    /// they must select OS, OF, SS or SF. Continuous failures are never
    /// evaluated in a bare start mode, so OS and SS are rejected for them.
    ///
    /// # Errors
    ///
    /// Returns [`SetupError::ModeMismatch`] or
    /// [`SetupError::InvalidDistribution`].
    pub fn new(
        component: &str,
        id: &str,
        mode: FailureMode,
        distribution: Distribution,
    ) -> SetupResult<Self> {
        distribution.validate()?;
        let mismatch = |reason: &str| SetupError::ModeMismatch {
            component: component.to_string(),
            failure: id.to_string(),
            reason: reason.to_string(),
        };
        match (distribution.is_binary(), mode) {
            (true, FailureMode::Exact(m)) if m.is_start() || is_first_hour(m) => {}
            (true, _) => return Err(mismatch("binary failures need mode OS, OF, SS or SF")),
            (false, FailureMode::Exact(m)) if m.is_start() => {
                return Err(mismatch("continuous failures cannot use a start mode"));
            }
            (false, FailureMode::Exact(OperatingMode::Off)) => {
                return Err(mismatch("no life is consumed while OFF"));
            }
            _ => {}
        }
        Ok(Self {
            component: component.to_string(),
            id: id.to_string(),
            mode,
            distribution,
        })
    }

    /// `true` for probability-valued failure types.
    pub fn is_binary(&self) -> bool {
        self.distribution.is_binary()
    }

    /// Draws a fresh life (h) or failure probability.
    pub fn draw(&self, rng: &mut Well512) -> f64 {
        if self.is_binary() {
            self.distribution.sample_probability(rng)
        } else {
            self.distribution.sample_duration(rng)
        }
    }

    /// Whether this type takes part in the binary check on entering `start`.
    pub fn checked_on_start(&self, start: OperatingMode) -> bool {
        self.is_binary()
            && (self.mode.applies_to(start) || self.mode.applies_to(start.running_submode()))
    }

    /// Whether this type consumes life while running in `mode`.
    pub fn consumes_in(&self, mode: OperatingMode) -> bool {
        !self.is_binary() && self.mode.applies_to(mode)
    }
}

fn is_first_hour(m: OperatingMode) -> bool {
    matches!(m, OperatingMode::OnlineFirst | OperatingMode::StandbyFirst)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gamma() -> Distribution {
        Distribution::Gamma {
            shape: 1.0,
            scale: 100.0,
        }
    }

    fn beta() -> Distribution {
        Distribution::Beta {
            shape1: 0.9,
            shape2: 599.0,
        }
    }

    #[test]
    fn mode_codes_round_trip_through_parse() {
        for m in OperatingMode::ALL {
            assert_eq!(m.code().parse::<OperatingMode>().ok(), Some(m));
        }
        assert!("XX".parse::<OperatingMode>().is_err());
    }

    #[test]
    fn wildcards_match_expected_modes() {
        use OperatingMode::*;
        for m in OperatingMode::ALL {
            assert_eq!(FailureMode::All.applies_to(m), m != Off);
            assert_eq!(
                FailureMode::Online.applies_to(m),
                m == OnlineFirst || m == OnlineOngoing
            );
        }
        assert!(FailureMode::Exact(OnlineStart).applies_to(OnlineStart));
        assert!(!FailureMode::Exact(OnlineStart).applies_to(OnlineFirst));
    }

    #[test]
    fn failure_mode_parses_wildcards() {
        assert_eq!("ALL".parse::<FailureMode>().ok(), Some(FailureMode::All));
        assert_eq!("o".parse::<FailureMode>().ok(), Some(FailureMode::Online));
        assert_eq!(
            "OF".parse::<FailureMode>().ok(),
            Some(FailureMode::Exact(OperatingMode::OnlineFirst))
        );
        assert!("Q".parse::<FailureMode>().is_err());
    }

    #[test]
    fn start_modes_map_to_first_hour() {
        assert_eq!(
            OperatingMode::OnlineStart.running_submode(),
            OperatingMode::OnlineFirst
        );
        assert_eq!(
            OperatingMode::StandbyStart.running_submode(),
            OperatingMode::StandbyFirst
        );
        assert_eq!(
            OperatingMode::OnlineOngoing.running_submode(),
            OperatingMode::OnlineOngoing
        );
    }

    #[test]
    fn binary_failure_must_select_a_start_mode() {
        let os = FailureType::new(
            "SP1",
            "Fail to start",
            FailureMode::Exact(OperatingMode::OnlineStart),
            beta(),
        );
        assert!(os.is_ok());
        let all = FailureType::new("SP1", "bad", FailureMode::All, beta());
        assert!(matches!(all, Err(SetupError::ModeMismatch { .. })));
        let oo = FailureType::new(
            "SP1",
            "bad",
            FailureMode::Exact(OperatingMode::OnlineOngoing),
            beta(),
        );
        assert!(oo.is_err());
    }

    #[test]
    fn continuous_failure_rejects_start_and_off_modes() {
        for m in [OperatingMode::OnlineStart, OperatingMode::StandbyStart, OperatingMode::Off] {
            let r = FailureType::new("T1", "x", FailureMode::Exact(m), gamma());
            assert!(r.is_err(), "{m} should be rejected");
        }
        assert!(FailureType::new("T1", "x", FailureMode::Online, gamma()).is_ok());
    }

    #[test]
    fn binary_type_checked_on_start_not_on_run() {
        let ft = FailureType::new(
            "SP1",
            "Fail to start",
            FailureMode::Exact(OperatingMode::OnlineStart),
            beta(),
        )
        .ok();
        let ft = ft.as_ref();
        assert_eq!(ft.map(|f| f.checked_on_start(OperatingMode::OnlineStart)), Some(true));
        assert_eq!(ft.map(|f| f.checked_on_start(OperatingMode::StandbyStart)), Some(false));
        assert_eq!(ft.map(|f| f.consumes_in(OperatingMode::OnlineStart)), Some(false));
    }

    #[test]
    fn draws_are_non_negative() {
        let mut rng = Well512::new(1);
        let life = FailureType::new("T1", "MBTF", FailureMode::Online, gamma());
        let start = FailureType::new(
            "SP1",
            "Fail to start",
            FailureMode::Exact(OperatingMode::OnlineStart),
            beta(),
        );
        for _ in 0..500 {
            assert!(life.as_ref().map(|f| f.draw(&mut rng)).unwrap_or(-1.0) >= 0.0);
            let p = start.as_ref().map(|f| f.draw(&mut rng)).unwrap_or(-1.0);
            assert!((0.0..=1.0).contains(&p));
        }
    }
}
