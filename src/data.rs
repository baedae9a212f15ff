use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

// Type alias for clarity: all times are integer clock hours (e.g. 8 = 08:00).
pub type Hour = u32;

/// Global shift structure of the college.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CollegeSettings {
    pub days_active: Vec<String>,
    pub time_slots: Vec<Hour>,
    #[serde(default = "default_lunch_slot")]
    pub lunch_slot: Hour,
    /// Soft-penalty knob; not enforced by any hard constraint.
    #[serde(default = "default_max_continuous")]
    pub max_continuous_lectures: u32,
    #[serde(default)]
    pub custom_rules: Vec<CustomRule>,
}

fn default_lunch_slot() -> Hour {
    13
}

fn default_max_continuous() -> u32 {
    2
}

/// A physical room with its capability tags.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Room {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub capacity: u32,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RoomsConfig {
    pub rooms: Vec<Room>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum SubjectKind {
    Theory,
    Practical,
    Tutorial,
}

impl fmt::Display for SubjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubjectKind::Theory => write!(f, "Theory"),
            SubjectKind::Practical => write!(f, "Practical"),
            SubjectKind::Tutorial => write!(f, "Tutorial"),
        }
    }
}

/// One weekly teaching obligation of a faculty member.
///
/// `target_groups` with more than one entry models a merged class: a single
/// session attended by all listed groups at once.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WorkloadItem {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: SubjectKind,
    pub subject: String,
    pub target_groups: Vec<String>,
    pub hours: u32,
    pub consecutive_hours: u32,
    pub required_tags: Vec<String>,
}

impl WorkloadItem {
    /// Contiguous block length per event; a zero in the payload means 1.
    pub fn block_len(&self) -> u32 {
        self.consecutive_hours.max(1)
    }

    /// Number of start events needed to fulfil the weekly hours.
    pub fn event_count(&self) -> u32 {
        self.hours / self.block_len()
    }
}

/// A (day, hour) pair during which a faculty member is unavailable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct BlockedSlot {
    pub day: String,
    pub time: Hour,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Faculty {
    pub id: String,
    pub name: String,
    /// Hours during which this faculty may be scheduled at all.
    pub shift: Vec<Hour>,
    #[serde(default)]
    pub blocked_slots: Vec<BlockedSlot>,
    pub max_load_hrs: u32,
    #[serde(default)]
    pub class_teacher_for: Option<String>,
    #[serde(default)]
    pub workload: Vec<WorkloadItem>,
}

impl Faculty {
    pub fn total_target_load(&self) -> u32 {
        self.workload.iter().map(|w| w.hours).sum()
    }
}

/// A dynamic IF-THEN rule as it arrives on the wire. `action_value` is
/// polymorphic; `compile` turns it into a typed rule exactly once.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CustomRule {
    pub id: String,
    pub condition_field: String,
    /// Carried for forward compatibility; only equality semantics exist.
    pub condition_operator: String,
    pub condition_value: String,
    pub action_type: String,
    pub action_value: Value,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleTarget {
    /// Matches every workload with this subject code.
    Subject(String),
    /// Matches the single workload with this id.
    Workload(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleAction {
    /// Allowed start hours; starts outside the list are locked to zero.
    RestrictTime(Vec<Hour>),
    /// Starts in any other room are locked to zero.
    ForceRoom(String),
    /// The event must cover (room, day, start).
    ForcePin {
        room: String,
        day: String,
        start: Hour,
    },
}

/// A custom rule after one-time parsing of its polymorphic payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledRule {
    pub target: RuleTarget,
    pub action: RuleAction,
}

impl CustomRule {
    /// Parses the duck-typed `action_value` into a typed rule. Malformed or
    /// unrecognized rules yield `None` and are skipped by the compiler.
    pub fn compile(&self) -> Option<CompiledRule> {
        match self.action_type.as_str() {
            "RESTRICT_TIME" => {
                if self.condition_field != "subject" {
                    return None;
                }
                let hours = self
                    .action_value
                    .as_array()?
                    .iter()
                    .map(hour_value)
                    .collect::<Option<Vec<Hour>>>()?;
                Some(CompiledRule {
                    target: RuleTarget::Subject(self.condition_value.clone()),
                    action: RuleAction::RestrictTime(hours),
                })
            }
            "FORCE_ROOM" => {
                let room = self.action_value.as_str()?.to_string();
                let target = match self.condition_field.as_str() {
                    "subject" => RuleTarget::Subject(self.condition_value.clone()),
                    "workload_id" => RuleTarget::Workload(self.condition_value.clone()),
                    _ => return None,
                };
                Some(CompiledRule {
                    target,
                    action: RuleAction::ForceRoom(room),
                })
            }
            "FORCE_PIN" => {
                // action_value is pipe-delimited: "room|day|start_hour"
                let raw = self.action_value.as_str()?;
                let mut parts = raw.split('|');
                let room = parts.next()?.trim();
                let day = parts.next()?.trim();
                let start: Hour = parts.next()?.trim().parse().ok()?;
                if room.is_empty() || day.is_empty() || parts.next().is_some() {
                    return None;
                }
                Some(CompiledRule {
                    target: RuleTarget::Workload(self.condition_value.clone()),
                    action: RuleAction::ForcePin {
                        room: room.to_string(),
                        day: day.to_string(),
                        start,
                    },
                })
            }
            _ => None,
        }
    }
}

/// Accepts "09:00"-style clock strings or bare integer hours.
fn hour_value(v: &Value) -> Option<Hour> {
    match v {
        Value::String(s) => s.split(':').next()?.trim().parse().ok(),
        Value::Number(n) => n.as_u64().map(|n| n as Hour),
        _ => None,
    }
}

/// The complete input for one generate call. Immutable for its duration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GenerationPayload {
    pub college_settings: CollegeSettings,
    pub rooms_config: RoomsConfig,
    pub faculty: Vec<Faculty>,
}

/// One occupied hour in the final timetable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScheduleEntry {
    pub workload_id: String,
    pub faculty_id: String,
    pub faculty_name: String,
    pub subject: String,
    pub targets: Vec<String>,
    #[serde(rename = "type")]
    pub kind: SubjectKind,
    pub room: String,
    pub day: String,
    pub time_slot: Hour,
}
