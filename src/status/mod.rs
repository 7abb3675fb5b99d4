//! Status indicator: what the LED means at a glance.
//!
//! ```text
//! ┌──────────────────┬────────────────────┬─────────────────────────────┐
//! │ State            │ RGB LED            │ Single LED                  │
//! ├──────────────────┼────────────────────┼─────────────────────────────┤
//! │ BOOT             │ Breathing blue     │ On (no dimming)             │
//! │ SETUP            │ Pulsing cyan       │ On (no dimming)             │
//! │ WIFI_CONNECTING  │ Fast blue blink    │ Very fast blink (2.5 Hz)    │
//! │ UNCLAIMED        │ Orange heartbeat   │ Blink-blink-pause           │
//! │ DISARMED         │ Yellow, brief gap  │ Mostly on, brief off / 5 s  │
//! │ ARMED            │ Solid green        │ Solid on                    │
//! │ OFFLINE          │ Orange flash / 4 s │ Base pattern + flash        │
//! │ AUTH_FAILED      │ Red/orange 2 Hz    │ Solid on                    │
//! │ DETECTION        │ White flash 200 ms │ Flash 200 ms                │
//! │ CAMERA_FAIL      │ Double red blink   │ Double blink, 1 s cycle     │
//! │ SERVO_FAIL       │ Triple red blink   │ Triple blink, 1.25 s cycle  │
//! │ LASER_FAIL       │ Quad red blink     │ Quad blink, 1.5 s cycle     │
//! │ ERROR            │ Red blink 1 Hz     │ Blink 1 Hz                  │
//! └──────────────────┴────────────────────┴─────────────────────────────┘
//! ```
//!
//! Several states can be asserted at once (e.g. ARMED and OFFLINE). The
//! LED always shows exactly one of them, chosen by the fixed priority
//! table [`PRIORITY`]; the declaration order of [`StatusId`] is only the
//! bit position in the [`StatusSet`].

use core::fmt;

pub mod engine;
pub mod patterns;

pub use engine::{StatusEngine, Summary};
pub use patterns::Rgb;

// ── Identifiers ───────────────────────────────────────────────

/// A status condition the device can be in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum StatusId {
    Off = 0,
    Boot,
    Setup,
    WifiConnecting,
    Unclaimed,
    Disarmed,
    Armed,
    Offline,
    AuthFailed,
    Detection,
    CameraFail,
    ServoFail,
    LaserFail,
    Error,
}

impl StatusId {
    /// Number of identifiers (bit positions used in a [`StatusSet`]).
    pub const COUNT: usize = 14;

    /// Every identifier in bit-position order.
    pub const ALL: [StatusId; Self::COUNT] = [
        Self::Off,
        Self::Boot,
        Self::Setup,
        Self::WifiConnecting,
        Self::Unclaimed,
        Self::Disarmed,
        Self::Armed,
        Self::Offline,
        Self::AuthFailed,
        Self::Detection,
        Self::CameraFail,
        Self::ServoFail,
        Self::LaserFail,
        Self::Error,
    ];

    /// Bit position in a [`StatusSet`].
    pub const fn index(self) -> u8 {
        self as u8
    }

    /// Upper-case name used in logs and the active-state summary.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Off => "OFF",
            Self::Boot => "BOOT",
            Self::Setup => "SETUP",
            Self::WifiConnecting => "WIFI_CONNECTING",
            Self::Unclaimed => "UNCLAIMED",
            Self::Disarmed => "DISARMED",
            Self::Armed => "ARMED",
            Self::Offline => "OFFLINE",
            Self::AuthFailed => "AUTH_FAILED",
            Self::Detection => "DETECTION",
            Self::CameraFail => "CAMERA_FAIL",
            Self::ServoFail => "SERVO_FAIL",
            Self::LaserFail => "LASER_FAIL",
            Self::Error => "ERROR",
        }
    }
}

impl fmt::Display for StatusId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A raw identifier outside `0..StatusId::COUNT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnknownStatus(pub u8);

impl fmt::Display for UnknownStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown status id {}", self.0)
    }
}

impl TryFrom<u8> for StatusId {
    type Error = UnknownStatus;

    fn try_from(raw: u8) -> Result<Self, UnknownStatus> {
        Self::ALL
            .get(raw as usize)
            .copied()
            .ok_or(UnknownStatus(raw))
    }
}

// ── Priority ──────────────────────────────────────────────────

/// Render priority, highest first. OFF is the fallback when nothing in
/// this table is asserted. The detection flash is checked before this
/// table by the engine and is not part of it.
pub const PRIORITY: [StatusId; StatusId::COUNT - 1] = [
    StatusId::Error,
    StatusId::LaserFail,
    StatusId::ServoFail,
    StatusId::CameraFail,
    StatusId::Detection,
    StatusId::AuthFailed,
    StatusId::Offline,
    StatusId::Armed,
    StatusId::Disarmed,
    StatusId::Unclaimed,
    StatusId::WifiConnecting,
    StatusId::Setup,
    StatusId::Boot,
];

// ── Active-state set ──────────────────────────────────────────

type Bits = u32;

// The set is a single machine word; growing the enum past its width must
// fail the build rather than silently alias bits.
const _: () = assert!(StatusId::COUNT <= Bits::BITS as usize);

/// Set of currently asserted identifiers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusSet(Bits);

impl StatusSet {
    pub const EMPTY: Self = Self(0);

    const fn bit(id: StatusId) -> Bits {
        1 << id.index()
    }

    /// Add `id`. Returns `true` if the set changed.
    pub fn insert(&mut self, id: StatusId) -> bool {
        let before = self.0;
        self.0 |= Self::bit(id);
        self.0 != before
    }

    /// Remove `id`. Returns `true` if the set changed.
    pub fn remove(&mut self, id: StatusId) -> bool {
        let before = self.0;
        self.0 &= !Self::bit(id);
        self.0 != before
    }

    pub const fn contains(self, id: StatusId) -> bool {
        self.0 & Self::bit(id) != 0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn bits(self) -> Bits {
        self.0
    }

    /// Members in bit-position order.
    pub fn iter(self) -> impl Iterator<Item = StatusId> {
        StatusId::ALL.into_iter().filter(move |id| self.contains(*id))
    }

    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    /// Highest-priority member, or OFF when nothing renderable is asserted.
    pub fn highest(self) -> StatusId {
        PRIORITY
            .iter()
            .copied()
            .find(|id| self.contains(*id))
            .unwrap_or(StatusId::Off)
    }
}

impl FromIterator<StatusId> for StatusSet {
    fn from_iter<I: IntoIterator<Item = StatusId>>(iter: I) -> Self {
        let mut set = Self::EMPTY;
        for id in iter {
            set.insert(id);
        }
        set
    }
}
