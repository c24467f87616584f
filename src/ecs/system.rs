//! System phases and scheduling (§4.F): single-threaded, cooperative,
//! one explicit call per phase in a fixed order. Within a phase,
//! registration order is execution order.
//!
//! Unlike the dependency-graph scheduler this crate's DOP registry
//! modules are grounded on elsewhere (topological sort over declared
//! read/write sets), system order here is not inferred — §4.F fixes it
//! by construction, so the scheduler only needs to bucket systems by
//! phase and run the buckets in a constant sequence.

/// Fixed execution order; any user system is inserted into its declared
/// phase and runs after every other system already registered there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SystemPhase {
    Script,
    Animation,
    Physics,
    Transform,
    Hierarchy,
    Light,
    Camera,
    Ik,
    Skin,
    Object,
    EnvironmentProbe,
}

impl SystemPhase {
    /// The fixed order observed by existing applications (§4.F).
    pub const ORDER: [SystemPhase; 11] = [
        SystemPhase::Script,
        SystemPhase::Animation,
        SystemPhase::Physics,
        SystemPhase::Transform,
        SystemPhase::Hierarchy,
        SystemPhase::Light,
        SystemPhase::Camera,
        SystemPhase::Ik,
        SystemPhase::Skin,
        SystemPhase::Object,
        SystemPhase::EnvironmentProbe,
    ];

    fn slot(self) -> usize {
        Self::ORDER.iter().position(|&p| p == self).expect("SystemPhase::ORDER is exhaustive")
    }
}

pub struct SystemDescriptor {
    pub name: String,
    pub phase: SystemPhase,
    pub function: Box<dyn FnMut() + Send>,
}

/// One bucket of registered systems per phase, indexed by
/// `SystemPhase::slot`. NO extra indirection: `run_frame` just walks
/// `SystemPhase::ORDER` and, for each phase, runs its bucket in
/// registration order.
pub struct SystemSchedulerData {
    buckets: [Vec<SystemDescriptor>; 11],
}

pub fn create_scheduler() -> SystemSchedulerData {
    SystemSchedulerData::default()
}

impl Default for SystemSchedulerData {
    fn default() -> Self {
        SystemSchedulerData {
            buckets: [
                Vec::new(),
                Vec::new(),
                Vec::new(),
                Vec::new(),
                Vec::new(),
                Vec::new(),
                Vec::new(),
                Vec::new(),
                Vec::new(),
                Vec::new(),
                Vec::new(),
            ],
        }
    }
}

/// Appends `system` to the end of its phase's bucket: it runs after
/// every system already registered in that phase.
pub fn register_system(data: &mut SystemSchedulerData, system: SystemDescriptor) {
    let slot = system.phase.slot();
    log::debug!(
        "[ecs::system] registering '{}' in phase {:?} (position {})",
        system.name,
        system.phase,
        data.buckets[slot].len()
    );
    data.buckets[slot].push(system);
}

/// Runs every phase in the fixed order, and within each phase every
/// system in registration order.
pub fn run_frame(data: &mut SystemSchedulerData) {
    for &phase in SystemPhase::ORDER.iter() {
        for system in data.buckets[phase.slot()].iter_mut() {
            (system.function)();
        }
    }
}

/// Runs a single named phase, for callers that drive phases individually
/// rather than through `run_frame` (e.g. interleaving engine-owned work
/// between ECS phases).
pub fn run_phase(data: &mut SystemSchedulerData, phase: SystemPhase) {
    for system in data.buckets[phase.slot()].iter_mut() {
        (system.function)();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_phases_execute_in_fixed_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut scheduler = create_scheduler();

        for (name, phase) in [
            ("object", SystemPhase::Object),
            ("script", SystemPhase::Script),
            ("transform", SystemPhase::Transform),
        ] {
            let log = log.clone();
            register_system(
                &mut scheduler,
                SystemDescriptor {
                    name: name.to_string(),
                    phase,
                    function: Box::new(move || log.lock().unwrap().push(name)),
                },
            );
        }

        run_frame(&mut scheduler);
        assert_eq!(*log.lock().unwrap(), vec!["script", "transform", "object"]);
    }

    #[test]
    fn test_registration_order_within_phase() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut scheduler = create_scheduler();

        for name in ["first", "second", "third"] {
            let log = log.clone();
            register_system(
                &mut scheduler,
                SystemDescriptor {
                    name: name.to_string(),
                    phase: SystemPhase::Animation,
                    function: Box::new(move || log.lock().unwrap().push(name)),
                },
            );
        }

        run_frame(&mut scheduler);
        assert_eq!(*log.lock().unwrap(), vec!["first", "second", "third"]);
    }
}
