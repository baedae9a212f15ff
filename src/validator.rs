use crate::data::GenerationPayload;
use log::info;
use std::collections::HashSet;

/// Runs the pre-solve arithmetic checks. Returns a list of human-readable
/// reasons when the input is obviously infeasible; an empty list means the
/// payload may proceed to model construction.
///
/// These checks are necessary conditions only: passing them does not
/// guarantee the solver will find a schedule.
pub fn validate(payload: &GenerationPayload) -> Vec<String> {
    let mut errors = Vec::new();
    let settings = &payload.college_settings;
    let days = settings.days_active.len() as u32;
    let lunch_in_slots = settings.time_slots.contains(&settings.lunch_slot);

    let room_tag_union: HashSet<&str> = payload
        .rooms_config
        .rooms
        .iter()
        .flat_map(|r| r.tags.iter().map(String::as_str))
        .collect();

    let mut total_requested_hours: u32 = 0;

    for faculty in &payload.faculty {
        let load = faculty.total_target_load();
        total_requested_hours += load;

        // 1. Contracted maximum
        if load > faculty.max_load_hrs {
            errors.push(format!(
                "Validation Failed: {} ({}) has a target workload of {} hours, \
                 exceeding their contracted maximum of {} hours.",
                faculty.name, faculty.id, load, faculty.max_load_hrs
            ));
        }

        // 2. Temporal presence: the contract must fit inside the shift grid
        let mut shift_size_per_day = faculty.shift.len() as u32;
        if faculty.shift.contains(&settings.lunch_slot) {
            shift_size_per_day = shift_size_per_day.saturating_sub(1);
        }
        let presence = (shift_size_per_day * days).saturating_sub(faculty.blocked_slots.len() as u32);
        if faculty.max_load_hrs > presence {
            errors.push(format!(
                "Validation Failed: {} ({}) is contracted for {} hours, but their shift \
                 and blocked slots leave only {} teachable hours per week.",
                faculty.name, faculty.id, faculty.max_load_hrs, presence
            ));
        }

        for w in &faculty.workload {
            // 3. Tag coverage across the room inventory
            for tag in &w.required_tags {
                if !room_tag_union.contains(tag.as_str()) {
                    errors.push(format!(
                        "Validation Failed: workload {} ({}) requires a room tagged '{}', \
                         but no room in the inventory carries that tag.",
                        w.id, w.subject, tag
                    ));
                }
            }

            // 5. Weekly hours must split into whole blocks
            if w.hours % w.block_len() != 0 {
                errors.push(format!(
                    "Validation Failed: workload {} ({}) asks for {} weekly hours in \
                     blocks of {}, which does not divide evenly.",
                    w.id,
                    w.subject,
                    w.hours,
                    w.block_len()
                ));
            }
        }
    }

    // 4. Global pigeonhole over the whole room inventory
    let rooms = payload.rooms_config.rooms.len() as u32;
    let mut grid_hours = settings.time_slots.len() as u32 * days;
    if lunch_in_slots {
        grid_hours = grid_hours.saturating_sub(days);
    }
    let capacity = rooms * grid_hours;
    if total_requested_hours > capacity {
        errors.push(format!(
            "Validation Failed: {} total teaching hours are requested, but {} rooms \
             provide only {} teachable room-hours per week.",
            total_requested_hours, rooms, capacity
        ));
    }

    info!(
        "Pre-solve validation finished with {} issue(s) across {} faculty.",
        errors.len(),
        payload.faculty.len()
    );
    errors
}
