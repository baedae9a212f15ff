use crate::data::{Faculty, GenerationPayload, Hour, SubjectKind, WorkloadItem};
use good_lp::{ProblemVariables, Variable, variable};
use log::trace;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::ops::Range;

/// One workload flattened out of the faculty list, with everything the
/// constraint compiler needs to know about its owner.
#[derive(Debug)]
pub struct WorkloadCtx<'a> {
    pub faculty_idx: usize,
    pub faculty: &'a Faculty,
    pub item: &'a WorkloadItem,
    /// Indices into the pool's group universe.
    pub group_idxs: Vec<usize>,
}

/// Identity of one start variable: workload `w` begins a block of
/// `block_len` hours in this room, on this day, at this hour. The owning
/// faculty is recoverable through the workload table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StartKey {
    pub workload: usize,
    pub room: usize,
    pub day: usize,
    pub start: Hour,
}

/// The sparse decision-variable set plus the lookup indices the constraint
/// compiler iterates. All maps are ordered so emission order is stable
/// across runs.
#[derive(Debug)]
pub struct VariablePool<'a> {
    pub vars: BTreeMap<StartKey, Variable>,
    pub by_workload: Vec<Vec<StartKey>>,
    /// (room, day, hour) -> every start variable whose block covers the hour.
    pub room_cover: BTreeMap<(usize, usize, Hour), Vec<Variable>>,
    /// (faculty, day, hour) -> covering start variables.
    pub faculty_cover: BTreeMap<(usize, usize, Hour), Vec<Variable>>,
    /// (group, day, hour) -> covering start variables with their subject kind.
    pub group_cover: BTreeMap<(usize, usize, Hour), Vec<(Variable, SubjectKind)>>,
    /// Sorted universe of student groups across all target_groups.
    pub groups: Vec<String>,
    pub workloads: Vec<WorkloadCtx<'a>>,
}

impl<'a> VariablePool<'a> {
    pub fn var(&self, key: &StartKey) -> Variable {
        self.vars[key]
    }

    /// The contiguous hour block occupied by an event starting at `key`.
    pub fn block(&self, key: &StartKey) -> Range<Hour> {
        key.start..key.start + self.workloads[key.workload].item.block_len()
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

/// Builds the sparse start-variable set. A variable exists for
/// (workload, room, day, start) iff the room carries every required tag and
/// the whole block lies inside the listed time slots. Shift, lunch, and
/// blocked-slot masks stay out of creation; they are emitted as lock
/// constraints so the model remains uniform.
pub fn build<'a>(
    problem: &mut ProblemVariables,
    payload: &'a GenerationPayload,
) -> Result<VariablePool<'a>, String> {
    let settings = &payload.college_settings;
    let rooms = &payload.rooms_config.rooms;
    let slot_set: HashSet<Hour> = settings.time_slots.iter().copied().collect();

    let group_universe: BTreeSet<&str> = payload
        .faculty
        .iter()
        .flat_map(|f| f.workload.iter())
        .flat_map(|w| w.target_groups.iter().map(String::as_str))
        .collect();
    let groups: Vec<String> = group_universe.into_iter().map(str::to_string).collect();
    let group_idx = |name: &str| groups.iter().position(|g| g == name);

    let mut workloads = Vec::new();
    for (faculty_idx, faculty) in payload.faculty.iter().enumerate() {
        for item in &faculty.workload {
            let group_idxs = item
                .target_groups
                .iter()
                .filter_map(|g| group_idx(g))
                .collect();
            workloads.push(WorkloadCtx {
                faculty_idx,
                faculty,
                item,
                group_idxs,
            });
        }
    }

    let mut pool = VariablePool {
        vars: BTreeMap::new(),
        by_workload: vec![Vec::new(); workloads.len()],
        room_cover: BTreeMap::new(),
        faculty_cover: BTreeMap::new(),
        group_cover: BTreeMap::new(),
        groups,
        workloads,
    };

    for (w_idx, ctx) in pool.workloads.iter().enumerate() {
        let k = ctx.item.block_len();

        // early tag prune: the room must carry every required tag
        let candidate_rooms: Vec<usize> = rooms
            .iter()
            .enumerate()
            .filter(|(_, r)| ctx.item.required_tags.iter().all(|t| r.tags.contains(t)))
            .map(|(i, _)| i)
            .collect();

        for &r_idx in &candidate_rooms {
            for d_idx in 0..settings.days_active.len() {
                for &s in &settings.time_slots {
                    // the whole block must land on listed slots
                    if !(s..s + k).all(|t| slot_set.contains(&t)) {
                        continue;
                    }
                    let key = StartKey {
                        workload: w_idx,
                        room: r_idx,
                        day: d_idx,
                        start: s,
                    };
                    let var = problem.add(variable().binary());
                    pool.vars.insert(key, var);
                    pool.by_workload[w_idx].push(key);
                    for t in s..s + k {
                        pool.room_cover.entry((r_idx, d_idx, t)).or_default().push(var);
                        pool.faculty_cover
                            .entry((ctx.faculty_idx, d_idx, t))
                            .or_default()
                            .push(var);
                        for &g_idx in &ctx.group_idxs {
                            pool.group_cover
                                .entry((g_idx, d_idx, t))
                                .or_default()
                                .push((var, ctx.item.kind));
                        }
                    }
                }
            }
        }

        if ctx.item.event_count() > 0 && pool.by_workload[w_idx].is_empty() {
            return Err(format!(
                "Workload {} ({}) has no possible (room, day, start) placement after \
                 tag filtering. The problem is over-constrained.",
                ctx.item.id, ctx.item.subject
            ));
        }
    }

    trace!(
        "Generated {} start variables for {} workloads across {} rooms and {} days.",
        pool.len(),
        pool.workloads.len(),
        rooms.len(),
        settings.days_active.len()
    );
    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{CollegeSettings, Faculty, GenerationPayload, Room, RoomsConfig, SubjectKind, WorkloadItem};

    fn lab_payload() -> GenerationPayload {
        GenerationPayload {
            college_settings: CollegeSettings {
                days_active: vec!["Monday".to_string()],
                time_slots: vec![8, 9, 10],
                lunch_slot: 13,
                max_continuous_lectures: 2,
                custom_rules: vec![],
            },
            rooms_config: RoomsConfig {
                rooms: vec![
                    Room {
                        id: "D201".to_string(),
                        kind: "Classroom".to_string(),
                        capacity: 80,
                        tags: vec!["Theory_Room".to_string()],
                    },
                    Room {
                        id: "D205".to_string(),
                        kind: "Laboratory".to_string(),
                        capacity: 30,
                        tags: vec!["Computer_Lab".to_string()],
                    },
                ],
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
                    target_groups: vec!["SY-A-B1".to_string()],
                    hours: 2,
                    consecutive_hours: 2,
                    required_tags: vec!["Computer_Lab".to_string()],
                }],
            }],
        }
    }

    #[test]
    fn tag_filtering_prunes_rooms() {
        let payload = lab_payload();
        let mut problem = ProblemVariables::new();
        let pool = build(&mut problem, &payload).expect("pool builds");
        // only the lab (room index 1) qualifies
        assert!(pool.vars.keys().all(|k| k.room == 1));
    }

    #[test]
    fn blocks_do_not_spill_past_the_day() {
        let payload = lab_payload();
        let mut problem = ProblemVariables::new();
        let pool = build(&mut problem, &payload).expect("pool builds");
        // with slots {8,9,10} and a 2-hour block, valid starts are 8 and 9
        let starts: Vec<Hour> = pool.by_workload[0].iter().map(|k| k.start).collect();
        assert_eq!(starts, vec![8, 9]);
    }

    #[test]
    fn cover_index_spans_the_whole_block() {
        let payload = lab_payload();
        let mut problem = ProblemVariables::new();
        let pool = build(&mut problem, &payload).expect("pool builds");
        // hour 9 is covered by both the start at 8 and the start at 9
        assert_eq!(pool.room_cover[&(1, 0, 9)].len(), 2);
        assert_eq!(pool.room_cover[&(1, 0, 8)].len(), 1);
        assert_eq!(pool.room_cover[&(1, 0, 10)].len(), 1);
        assert_eq!(pool.faculty_cover[&(0, 0, 9)].len(), 2);
        let g = pool.groups.iter().position(|g| g == "SY-A-B1").unwrap();
        assert_eq!(pool.group_cover[&(g, 0, 9)].len(), 2);
    }

    #[test]
    fn gap_in_slots_forbids_bridging_blocks() {
        let mut payload = lab_payload();
        payload.college_settings.time_slots = vec![8, 9, 11, 12];
        let mut problem = ProblemVariables::new();
        let pool = build(&mut problem, &payload).expect("pool builds");
        // a 2-hour block cannot bridge the missing hour 10
        let starts: Vec<Hour> = pool.by_workload[0].iter().map(|k| k.start).collect();
        assert_eq!(starts, vec![8, 11]);
    }

    #[test]
    fn unplaceable_workload_is_rejected_early() {
        let mut payload = lab_payload();
        payload.faculty[0].workload[0].required_tags = vec!["Chemistry_Lab".to_string()];
        let mut problem = ProblemVariables::new();
        let err = build(&mut problem, &payload).expect_err("no placement exists");
        assert!(err.contains("W1"), "message was: {err}");
    }

    #[test]
    fn group_universe_is_sorted_and_deduplicated() {
        let mut payload = lab_payload();
        payload.faculty[0].workload.push(WorkloadItem {
            id: "W2".to_string(),
            kind: SubjectKind::Theory,
            subject: "DMS".to_string(),
            target_groups: vec!["SY-A".to_string(), "SY-A-B1".to_string()],
            hours: 1,
            consecutive_hours: 1,
            required_tags: vec!["Theory_Room".to_string()],
        });
        let mut problem = ProblemVariables::new();
        let pool = build(&mut problem, &payload).expect("pool builds");
        assert_eq!(pool.groups, vec!["SY-A".to_string(), "SY-A-B1".to_string()]);
    }
}
