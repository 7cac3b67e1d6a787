use crate::{
    Result,
    constants::{MIN_BOX_ID, PIN_CODE_LENGTH},
    error::Error,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of the device process (for example `ESP32_LOCKER_01`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceId(String);

impl DeviceId {
    /// Create a device ID, trimming surrounding whitespace.
    ///
    /// # Errors
    /// Returns `Error::InvalidDeviceId` if the ID is empty or contains
    /// whitespace or `/` (it is embedded in bus topics).
    pub fn new(id: &str) -> Result<Self> {
        let id = id.trim();
        if id.is_empty() || id.contains(char::is_whitespace) || id.contains('/') {
            return Err(Error::InvalidDeviceId(id.to_string()));
        }
        Ok(DeviceId(id.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for DeviceId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        DeviceId::new(s)
    }
}

/// Identity of the single box this device controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BoxId(i64);

impl BoxId {
    /// Create a box ID with validation.
    ///
    /// # Errors
    /// Returns `Error::InvalidBoxId` if the ID is below 1.
    pub fn new(id: i64) -> Result<Self> {
        if id < MIN_BOX_ID {
            return Err(Error::InvalidBoxId(id));
        }
        Ok(BoxId(id))
    }

    #[must_use]
    pub fn as_i64(&self) -> i64 {
        self.0
    }

    /// Returns `true` if a claimed identity names this box.
    #[inline]
    #[must_use]
    pub fn matches(&self, claimed: i64) -> bool {
        self.0 == claimed
    }
}

impl fmt::Display for BoxId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for BoxId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let id: i64 = s
            .trim()
            .parse()
            .map_err(|_| Error::InvalidConfigValue {
                key: "box_id".to_string(),
                value: s.to_string(),
            })?;
        BoxId::new(id)
    }
}

/// Six-digit kiosk PIN.
///
/// The code is forwarded to the verification authority and never compared
/// locally. `Debug` redacts it so it does not end up in logs.
#[derive(Clone, PartialEq, Eq)]
pub struct PinCode(String);

impl PinCode {
    /// Validate a raw PIN string.
    ///
    /// # Errors
    /// Returns `Error::InvalidPinCode` unless the input is exactly
    /// [`PIN_CODE_LENGTH`] ASCII digits. No trimming is applied.
    pub fn parse(raw: &str) -> Result<Self> {
        if raw.len() != PIN_CODE_LENGTH {
            return Err(Error::InvalidPinCode {
                reason: format!("expected {PIN_CODE_LENGTH} digits, got {} chars", raw.len()),
            });
        }
        if !raw.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::InvalidPinCode {
                reason: "only ASCII digits are allowed".to_string(),
            });
        }
        Ok(PinCode(raw.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for PinCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("PinCode(******)")
    }
}

/// Action requested by a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LockAction {
    Open,
    Close,
}

impl LockAction {
    /// Parse the action vocabulary of the direct HTTP command (`UNLOCK` / `LOCK`).
    ///
    /// # Errors
    /// Returns `Error::UnknownAction` for anything else. Matching is exact.
    pub fn from_direct(raw: &str) -> Result<Self> {
        match raw {
            "UNLOCK" => Ok(LockAction::Open),
            "LOCK" => Ok(LockAction::Close),
            other => Err(Error::UnknownAction(other.to_string())),
        }
    }

    /// Parse the action vocabulary of the bus command (`OPEN` / `LOCK`).
    ///
    /// # Errors
    /// Returns `Error::UnknownAction` for anything else. Matching is exact.
    pub fn from_bus(raw: &str) -> Result<Self> {
        match raw {
            "OPEN" => Ok(LockAction::Open),
            "LOCK" => Ok(LockAction::Close),
            other => Err(Error::UnknownAction(other.to_string())),
        }
    }
}

impl fmt::Display for LockAction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            LockAction::Open => write!(f, "OPEN"),
            LockAction::Close => write!(f, "CLOSE"),
        }
    }
}

/// Where a command came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommandSource {
    /// Direct HTTP request to the device.
    Direct,
    /// Remote command received on the message bus.
    Bus,
    /// Local physical push button.
    Button,
    /// Kiosk PIN flow after a positive remote verdict.
    PinFlow,
}

impl fmt::Display for CommandSource {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CommandSource::Direct => write!(f, "DIRECT"),
            CommandSource::Bus => write!(f, "BUS"),
            CommandSource::Button => write!(f, "BUTTON"),
            CommandSource::PinFlow => write!(f, "PIN_FLOW"),
        }
    }
}

/// A single attempted lock transition.
///
/// Built by an entry point, consumed by the arbitrator and then dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Command {
    pub source: CommandSource,
    pub action: LockAction,
    /// Box identity claimed by a remote sender. Local sources carry none.
    pub claimed_identity: Option<i64>,
}

impl Command {
    pub fn direct(claimed_identity: i64, action: LockAction) -> Self {
        Self {
            source: CommandSource::Direct,
            action,
            claimed_identity: Some(claimed_identity),
        }
    }

    pub fn bus(claimed_identity: i64, action: LockAction) -> Self {
        Self {
            source: CommandSource::Bus,
            action,
            claimed_identity: Some(claimed_identity),
        }
    }

    /// Toggle command for a button press, derived from the lock state at
    /// the moment of the press.
    pub fn button_toggle(current: PhysicalState) -> Self {
        Self {
            source: CommandSource::Button,
            action: current.toggled_action(),
            claimed_identity: None,
        }
    }

    pub fn pin_flow_unlock() -> Self {
        Self {
            source: CommandSource::PinFlow,
            action: LockAction::Open,
            claimed_identity: None,
        }
    }
}

/// Physical state of the electromechanical lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PhysicalState {
    #[default]
    Closed,
    Open,
}

impl PhysicalState {
    #[inline]
    #[must_use]
    pub fn is_open(self) -> bool {
        matches!(self, PhysicalState::Open)
    }

    /// Action that flips this state.
    #[must_use]
    pub fn toggled_action(self) -> LockAction {
        match self {
            PhysicalState::Open => LockAction::Close,
            PhysicalState::Closed => LockAction::Open,
        }
    }

    /// Wire label used by the on-device HTTP API (`UNLOCKED` / `LOCKED`).
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            PhysicalState::Open => "UNLOCKED",
            PhysicalState::Closed => "LOCKED",
        }
    }

    /// Status pushed to the backend right after entering this state.
    #[must_use]
    pub fn transition_report(self) -> StatusReport {
        match self {
            PhysicalState::Open => StatusReport::new(ReportedStatus::Available, true),
            PhysicalState::Closed => StatusReport::new(ReportedStatus::Locked, false),
        }
    }

    /// Status pushed to the backend by the periodic heartbeat.
    #[must_use]
    pub fn heartbeat_report(self) -> StatusReport {
        match self {
            PhysicalState::Open => StatusReport::new(ReportedStatus::Occupied, true),
            PhysicalState::Closed => StatusReport::new(ReportedStatus::Available, false),
        }
    }

    /// Status published on the bus after entering this state.
    #[must_use]
    pub fn bus_status(self) -> BusStatus {
        match self {
            PhysicalState::Open => BusStatus::Unlocked,
            PhysicalState::Closed => BusStatus::Locked,
        }
    }
}

impl fmt::Display for PhysicalState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PhysicalState::Open => write!(f, "OPEN"),
            PhysicalState::Closed => write!(f, "CLOSED"),
        }
    }
}

/// Semantic box status understood by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReportedStatus {
    Available,
    Occupied,
    Locked,
    Error,
}

impl ReportedStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ReportedStatus::Available => "AVAILABLE",
            ReportedStatus::Occupied => "OCCUPIED",
            ReportedStatus::Locked => "LOCKED",
            ReportedStatus::Error => "ERROR",
        }
    }
}

impl fmt::Display for ReportedStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A status value together with the door-open flag, recomputed per report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusReport {
    pub status: ReportedStatus,
    pub door_open: bool,
}

impl StatusReport {
    pub fn new(status: ReportedStatus, door_open: bool) -> Self {
        Self { status, door_open }
    }

    /// Report sent once at boot.
    pub fn boot() -> Self {
        Self::new(ReportedStatus::Available, false)
    }
}

/// Status vocabulary of the message bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BusStatus {
    Unlocked,
    Locked,
    Online,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("ESP32_LOCKER_01", "ESP32_LOCKER_01")]
    #[case("  locker-7 ", "locker-7")]
    fn test_device_id_valid(#[case] input: &str, #[case] expected: &str) {
        let id: DeviceId = input.parse().unwrap();
        assert_eq!(id.as_str(), expected);
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    #[case("locker 1")]
    #[case("lockers/1")]
    fn test_device_id_invalid(#[case] input: &str) {
        assert!(DeviceId::new(input).is_err());
    }

    #[rstest]
    #[case(1)]
    #[case(42)]
    fn test_box_id_valid(#[case] id: i64) {
        let box_id = BoxId::new(id).unwrap();
        assert_eq!(box_id.as_i64(), id);
        assert!(box_id.matches(id));
        assert!(!box_id.matches(id + 1));
    }

    #[rstest]
    #[case(0)]
    #[case(-1)]
    fn test_box_id_invalid(#[case] id: i64) {
        assert!(matches!(BoxId::new(id), Err(Error::InvalidBoxId(_))));
    }

    #[test]
    fn test_box_id_from_str() {
        assert_eq!("7".parse::<BoxId>().unwrap().as_i64(), 7);
        assert!("seven".parse::<BoxId>().is_err());
    }

    #[rstest]
    #[case("123456")]
    #[case("000000")]
    fn test_pin_code_valid(#[case] input: &str) {
        assert_eq!(PinCode::parse(input).unwrap().as_str(), input);
    }

    #[rstest]
    #[case("12345")] // too short
    #[case("1234567")] // too long
    #[case("12a456")] // non-digit
    #[case(" 12345")] // whitespace is not trimmed
    #[case("١٢٣٤٥٦")] // non-ASCII digits
    #[case("")]
    fn test_pin_code_invalid(#[case] input: &str) {
        assert!(matches!(
            PinCode::parse(input),
            Err(Error::InvalidPinCode { .. })
        ));
    }

    #[test]
    fn test_pin_code_debug_is_redacted() {
        let pin = PinCode::parse("987654").unwrap();
        assert!(!format!("{pin:?}").contains("987654"));
    }

    #[rstest]
    #[case("UNLOCK", Some(LockAction::Open))]
    #[case("LOCK", Some(LockAction::Close))]
    #[case("OPEN", None)]
    #[case("unlock", None)]
    #[case("", None)]
    fn test_direct_action_vocabulary(#[case] raw: &str, #[case] expected: Option<LockAction>) {
        assert_eq!(LockAction::from_direct(raw).ok(), expected);
    }

    #[rstest]
    #[case("OPEN", Some(LockAction::Open))]
    #[case("LOCK", Some(LockAction::Close))]
    #[case("UNLOCK", None)]
    #[case("open", None)]
    fn test_bus_action_vocabulary(#[case] raw: &str, #[case] expected: Option<LockAction>) {
        assert_eq!(LockAction::from_bus(raw).ok(), expected);
    }

    #[test]
    fn test_button_toggle_follows_state() {
        let cmd = Command::button_toggle(PhysicalState::Closed);
        assert_eq!(cmd.action, LockAction::Open);
        assert_eq!(cmd.claimed_identity, None);

        let cmd = Command::button_toggle(PhysicalState::Open);
        assert_eq!(cmd.action, LockAction::Close);
    }

    #[test]
    fn test_remote_sources_carry_identity() {
        assert_eq!(Command::direct(3, LockAction::Open).claimed_identity, Some(3));
        assert_eq!(Command::bus(4, LockAction::Close).claimed_identity, Some(4));
        assert_eq!(Command::pin_flow_unlock().claimed_identity, None);
    }

    #[test]
    fn test_report_mapping() {
        assert_eq!(
            PhysicalState::Open.transition_report(),
            StatusReport::new(ReportedStatus::Available, true)
        );
        assert_eq!(
            PhysicalState::Closed.transition_report(),
            StatusReport::new(ReportedStatus::Locked, false)
        );
        assert_eq!(
            PhysicalState::Open.heartbeat_report(),
            StatusReport::new(ReportedStatus::Occupied, true)
        );
        assert_eq!(
            PhysicalState::Closed.heartbeat_report(),
            StatusReport::new(ReportedStatus::Available, false)
        );
        assert_eq!(PhysicalState::Open.bus_status(), BusStatus::Unlocked);
    }

    #[test]
    fn test_status_serialization() {
        assert_eq!(
            serde_json::to_string(&ReportedStatus::Occupied).unwrap(),
            "\"OCCUPIED\""
        );
        assert_eq!(
            serde_json::to_string(&BusStatus::Online).unwrap(),
            "\"ONLINE\""
        );
    }
}
