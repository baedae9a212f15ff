use crate::data::{
    CompiledRule, GenerationPayload, Hour, RuleAction, RuleTarget, SubjectKind, WorkloadItem,
};
use crate::solver::variables::VariablePool;
use good_lp::{Constraint, Expression, constraint};
use itertools::Itertools;
use log::{info, warn};
use std::collections::{HashMap, HashSet};

/// Emits every hard constraint family against the variable pool. The caller
/// feeds the result into the solver model unchanged.
pub fn compile(
    pool: &VariablePool,
    payload: &GenerationPayload,
    rules: &[CompiledRule],
) -> Vec<Constraint> {
    let mut out = Vec::new();

    let locks = lock_boundaries(pool, payload);
    info!("Locked {} start variables outside shift/lunch/blocked bounds.", locks.len());
    out.extend(locks);

    out.extend(require_workload_totals(pool));

    let rooms = forbid_room_overlap(pool);
    let faculties = forbid_faculty_overlap(pool);
    let groups = forbid_group_overlap(pool);
    let hierarchy = forbid_parent_child_overlap(pool, payload);
    info!(
        "Clash prevention: {} room, {} faculty, {} group, {} parent/child windows.",
        rooms.len(),
        faculties.len(),
        groups.len(),
        hierarchy.len()
    );
    out.extend(rooms);
    out.extend(faculties);
    out.extend(groups);
    out.extend(hierarchy);

    out.extend(apply_custom_rules(pool, payload, rules));
    out
}

/// C1. A start whose block touches the lunch hour, leaves the owning
/// faculty's shift, or lands on a blocked (day, hour) is forced to zero.
fn lock_boundaries(pool: &VariablePool, payload: &GenerationPayload) -> Vec<Constraint> {
    let settings = &payload.college_settings;
    let lunch = settings.lunch_slot;
    let day_index: HashMap<&str, usize> = settings
        .days_active
        .iter()
        .enumerate()
        .map(|(i, d)| (d.as_str(), i))
        .collect();

    let masks: Vec<(HashSet<Hour>, HashSet<(usize, Hour)>)> = payload
        .faculty
        .iter()
        .map(|f| {
            let shift: HashSet<Hour> = f.shift.iter().copied().collect();
            let blocked: HashSet<(usize, Hour)> = f
                .blocked_slots
                .iter()
                .filter_map(|b| day_index.get(b.day.as_str()).map(|&d| (d, b.time)))
                .collect();
            (shift, blocked)
        })
        .collect();

    let mut out = Vec::new();
    for (key, var) in &pool.vars {
        let (shift, blocked) = &masks[pool.workloads[key.workload].faculty_idx];
        let violates = pool
            .block(key)
            .any(|t| t == lunch || !shift.contains(&t) || blocked.contains(&(key.day, t)));
        if violates {
            let locked = *var;
            out.push(constraint!(locked == 0));
        }
    }
    out
}

/// C2. Every workload is realized by exactly hours / block_len start events.
fn require_workload_totals(pool: &VariablePool) -> Vec<Constraint> {
    pool.by_workload
        .iter()
        .enumerate()
        .map(|(w_idx, keys)| {
            let total: Expression = keys.iter().map(|k| pool.var(k)).sum();
            let events = pool.workloads[w_idx].item.event_count() as f64;
            constraint!(total == events)
        })
        .collect()
}

/// C3. At most one event occupies a room at any (day, hour), counting every
/// start whose block slides over that hour.
fn forbid_room_overlap(pool: &VariablePool) -> Vec<Constraint> {
    pool.room_cover
        .values()
        .filter(|cover| cover.len() > 1)
        .map(|cover| {
            let occupied: Expression = cover.iter().copied().sum();
            constraint!(occupied <= 1)
        })
        .collect()
}

/// C4. A faculty member teaches at most one event at any (day, hour).
fn forbid_faculty_overlap(pool: &VariablePool) -> Vec<Constraint> {
    pool.faculty_cover
        .values()
        .filter(|cover| cover.len() > 1)
        .map(|cover| {
            let busy: Expression = cover.iter().copied().sum();
            constraint!(busy <= 1)
        })
        .collect()
}

/// C5. A student group attends at most one event at any (day, hour). Merged
/// classes clash through every group they list.
fn forbid_group_overlap(pool: &VariablePool) -> Vec<Constraint> {
    pool.group_cover
        .values()
        .filter(|cover| cover.len() > 1)
        .map(|cover| {
            let busy: Expression = cover.iter().map(|(v, _)| *v).sum();
            constraint!(busy <= 1)
        })
        .collect()
}

/// Parent/child pairs over the group universe: `p` parents `c` iff `p` is a
/// proper substring of `c` (naming heuristic, e.g. SY-A ⊂ SY-A-B1).
pub fn parent_pairs(groups: &[String]) -> Vec<(usize, usize)> {
    groups
        .iter()
        .enumerate()
        .cartesian_product(groups.iter().enumerate())
        .filter(|((p, parent), (c, child))| p != c && child.contains(parent.as_str()))
        .map(|((p, _), (c, _))| (p, c))
        .collect()
}

/// C6. A parent group's Theory hour excludes Practical/Tutorial hours of any
/// of its child groups at the same (day, hour), and vice versa.
fn forbid_parent_child_overlap(pool: &VariablePool, payload: &GenerationPayload) -> Vec<Constraint> {
    let settings = &payload.college_settings;
    let mut out = Vec::new();
    for (p, c) in parent_pairs(&pool.groups) {
        for d in 0..settings.days_active.len() {
            for &t in &settings.time_slots {
                let parent_theory: Vec<_> = pool
                    .group_cover
                    .get(&(p, d, t))
                    .map(|cover| {
                        cover
                            .iter()
                            .filter(|(_, kind)| *kind == SubjectKind::Theory)
                            .map(|(v, _)| *v)
                            .collect()
                    })
                    .unwrap_or_default();
                let child_batches: Vec<_> = pool
                    .group_cover
                    .get(&(c, d, t))
                    .map(|cover| {
                        cover
                            .iter()
                            .filter(|(_, kind)| *kind != SubjectKind::Theory)
                            .map(|(v, _)| *v)
                            .collect()
                    })
                    .unwrap_or_default();
                if parent_theory.is_empty() || child_batches.is_empty() {
                    continue;
                }
                let busy: Expression = parent_theory
                    .into_iter()
                    .chain(child_batches)
                    .sum();
                out.push(constraint!(busy <= 1));
            }
        }
    }
    out
}

fn rule_applies(target: &RuleTarget, item: &WorkloadItem) -> bool {
    match target {
        RuleTarget::Subject(subject) => item.subject == *subject,
        RuleTarget::Workload(id) => item.id == *id,
    }
}

/// C7. Typed custom rules, compiled once at ingestion.
fn apply_custom_rules(
    pool: &VariablePool,
    payload: &GenerationPayload,
    rules: &[CompiledRule],
) -> Vec<Constraint> {
    let settings = &payload.college_settings;
    let mut out = Vec::new();

    for rule in rules {
        match &rule.action {
            RuleAction::RestrictTime(allowed) => {
                for (w_idx, ctx) in pool.workloads.iter().enumerate() {
                    if !rule_applies(&rule.target, ctx.item) {
                        continue;
                    }
                    for key in &pool.by_workload[w_idx] {
                        if !allowed.contains(&key.start) {
                            let var = pool.var(key);
                            out.push(constraint!(var == 0));
                        }
                    }
                }
            }
            RuleAction::ForceRoom(room_id) => {
                let Some(r_idx) = payload.rooms_config.rooms.iter().position(|r| r.id == *room_id)
                else {
                    warn!("FORCE_ROOM rule names unknown room '{room_id}'; skipping.");
                    continue;
                };
                for (w_idx, ctx) in pool.workloads.iter().enumerate() {
                    if !rule_applies(&rule.target, ctx.item) {
                        continue;
                    }
                    for key in &pool.by_workload[w_idx] {
                        if key.room != r_idx {
                            let var = pool.var(key);
                            out.push(constraint!(var == 0));
                        }
                    }
                }
            }
            RuleAction::ForcePin { room, day, start } => {
                let RuleTarget::Workload(workload_id) = &rule.target else {
                    continue;
                };
                let Some(w_idx) = pool
                    .workloads
                    .iter()
                    .position(|ctx| ctx.item.id == *workload_id)
                else {
                    warn!("FORCE_PIN rule names unknown workload '{workload_id}'; skipping.");
                    continue;
                };
                let Some(r_idx) = payload.rooms_config.rooms.iter().position(|r| r.id == *room)
                else {
                    warn!("FORCE_PIN rule names unknown room '{room}'; skipping.");
                    continue;
                };
                let Some(d_idx) = settings.days_active.iter().position(|d| d == day) else {
                    warn!("FORCE_PIN rule names unknown day '{day}'; skipping.");
                    continue;
                };
                // exactly one start of this workload must cover the pinned hour
                let pinned: Expression = pool.by_workload[w_idx]
                    .iter()
                    .filter(|k| {
                        k.room == r_idx && k.day == d_idx && pool.block(k).contains(start)
                    })
                    .map(|k| pool.var(k))
                    .sum();
                out.push(constraint!(pinned == 1));
            }
        }
    }
    out
}
