use crate::data::{GenerationPayload, ScheduleEntry};
use crate::solver::variables::{StartKey, VariablePool};

/// Expands every selected start variable into one schedule record per
/// covered hour. The result is sorted by (day, hour, room, workload) so a
/// fixed solver seed yields an identical schedule on every run.
pub fn expand(
    selected: &[StartKey],
    pool: &VariablePool,
    payload: &GenerationPayload,
) -> Vec<ScheduleEntry> {
    let mut entries = Vec::new();
    for key in selected {
        let ctx = &pool.workloads[key.workload];
        let room = &payload.rooms_config.rooms[key.room];
        let day = &payload.college_settings.days_active[key.day];
        for t in pool.block(key) {
            entries.push(ScheduleEntry {
                workload_id: ctx.item.id.clone(),
                faculty_id: ctx.faculty.id.clone(),
                faculty_name: ctx.faculty.name.clone(),
                subject: ctx.item.subject.clone(),
                targets: ctx.item.target_groups.clone(),
                kind: ctx.item.kind,
                room: room.id.clone(),
                day: day.clone(),
                time_slot: t,
            });
        }
    }

    let day_rank = |label: &str| {
        payload
            .college_settings
            .days_active
            .iter()
            .position(|d| d == label)
            .unwrap_or(usize::MAX)
    };
    entries.sort_by(|a, b| {
        (day_rank(&a.day), a.time_slot, &a.room, &a.workload_id).cmp(&(
            day_rank(&b.day),
            b.time_slot,
            &b.room,
            &b.workload_id,
        ))
    });
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{
        CollegeSettings, Faculty, GenerationPayload, Room, RoomsConfig, SubjectKind, WorkloadItem,
    };
    use crate::solver::variables;
    use good_lp::ProblemVariables;

    fn payload() -> GenerationPayload {
        GenerationPayload {
            college_settings: CollegeSettings {
                days_active: vec!["Monday".to_string(), "Tuesday".to_string()],
                time_slots: vec![8, 9, 10],
                lunch_slot: 13,
                max_continuous_lectures: 2,
                custom_rules: vec![],
            },
            rooms_config: RoomsConfig {
                rooms: vec![Room {
                    id: "D205".to_string(),
                    kind: "Laboratory".to_string(),
                    capacity: 30,
                    tags: vec!["Computer_Lab".to_string()],
                }],
            },
            faculty: vec![Faculty {
                id: "F1".to_string(),
                name: "RNB".to_string(),
                shift: vec![8, 9, 10],
                blocked_slots: vec![],
                max_load_hrs: 4,
                class_teacher_for: None,
                workload: vec![WorkloadItem {
                    id: "W1".to_string(),
                    kind: SubjectKind::Practical,
                    subject: "DMS_LAB".to_string(),
                    target_groups: vec!["SY-A-B1".to_string(), "SY-A-B2".to_string()],
                    hours: 2,
                    consecutive_hours: 2,
                    required_tags: vec!["Computer_Lab".to_string()],
                }],
            }],
        }
    }

    #[test]
    fn a_two_hour_block_yields_two_records() {
        let payload = payload();
        let mut problem = ProblemVariables::new();
        let pool = variables::build(&mut problem, &payload).unwrap();
        let key = StartKey {
            workload: 0,
            room: 0,
            day: 1,
            start: 9,
        };
        let entries = expand(&[key], &pool, &payload);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].time_slot, 9);
        assert_eq!(entries[1].time_slot, 10);
        for e in &entries {
            assert_eq!(e.workload_id, "W1");
            assert_eq!(e.faculty_id, "F1");
            assert_eq!(e.faculty_name, "RNB");
            assert_eq!(e.subject, "DMS_LAB");
            assert_eq!(e.targets, vec!["SY-A-B1".to_string(), "SY-A-B2".to_string()]);
            assert_eq!(e.kind, SubjectKind::Practical);
            assert_eq!(e.room, "D205");
            assert_eq!(e.day, "Tuesday");
        }
    }

    #[test]
    fn records_sort_by_day_then_hour() {
        let payload = payload();
        let mut problem = ProblemVariables::new();
        let pool = variables::build(&mut problem, &payload).unwrap();
        let tuesday = StartKey {
            workload: 0,
            room: 0,
            day: 1,
            start: 8,
        };
        let monday = StartKey {
            workload: 0,
            room: 0,
            day: 0,
            start: 9,
        };
        let entries = expand(&[tuesday, monday], &pool, &payload);
        let order: Vec<(String, u32)> = entries
            .iter()
            .map(|e| (e.day.clone(), e.time_slot))
            .collect();
        assert_eq!(
            order,
            vec![
                ("Monday".to_string(), 9),
                ("Monday".to_string(), 10),
                ("Tuesday".to_string(), 8),
                ("Tuesday".to_string(), 9),
            ]
        );
    }
}
