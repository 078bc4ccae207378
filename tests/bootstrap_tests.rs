//! Bootstrap tests against a scripted RTOS

use dcmotor_bringup::bootstrap::{launch, LaunchError, TaskPlan, VERSION};
use dcmotor_bringup::config::CONFIG;
use dcmotor_bringup::task::{HeapMonitor, Rtos, TaskEntry, TaskSpec, TaskState, TaskStatus};

fn heartbeat_entry() -> ! {
    panic!("task entries are never called by the fake")
}

fn console_entry() -> ! {
    panic!("task entries are never called by the fake")
}

#[derive(Default)]
struct FakeRtos {
    spawned: Vec<TaskSpec>,
    fail_spawn: Option<&'static str>,
    fail_start: bool,
    started: bool,
}

impl HeapMonitor for FakeRtos {
    fn free_heap(&self) -> u32 {
        300_000 - 8192 * self.spawned.len() as u32
    }
}

impl Rtos for FakeRtos {
    type Error = &'static str;

    fn spawn(&mut self, spec: &TaskSpec, _entry: TaskEntry) -> Result<(), Self::Error> {
        if self.fail_spawn == Some(spec.name) {
            return Err("no memory");
        }
        self.spawned.push(*spec);
        Ok(())
    }

    fn start_scheduler(&mut self) -> Result<(), Self::Error> {
        self.started = true;
        if self.fail_start {
            Err("refused")
        } else {
            Ok(())
        }
    }
}

fn plans<'a>(hb: &'a TaskStatus, console: &'a TaskStatus) -> [TaskPlan<'a>; 2] {
    [
        TaskPlan { spec: CONFIG.heartbeat_task, entry: heartbeat_entry, status: hb },
        TaskPlan { spec: CONFIG.console_task, entry: console_entry, status: console },
    ]
}

#[test]
fn test_banner_tasks_and_heap() {
    let (hb, console) = (TaskStatus::new(), TaskStatus::new());
    let mut rtos = FakeRtos::default();
    let mut out = String::new();

    let err = launch(&mut rtos, &mut out, &plans(&hb, &console));

    assert_eq!(err, LaunchError::SchedulerReturned);
    assert_eq!(out, format!("\n{} - started\nheap-free: {}\n", VERSION, 300_000 - 2 * 8192));
    assert!(VERSION.starts_with("dcmotor_bringup v"));

    let names: Vec<&str> = rtos.spawned.iter().map(|s| s.name).collect();
    assert_eq!(names, ["LED", "TEST"]);
    assert!(rtos.started);
    assert_eq!(hb.get(), TaskState::Ready);
    assert_eq!(console.get(), TaskState::Ready);
}

#[test]
fn test_task_priorities_and_pinning() {
    let (hb, console) = (TaskStatus::new(), TaskStatus::new());
    let mut rtos = FakeRtos::default();

    launch(&mut rtos, &mut String::new(), &plans(&hb, &console));

    assert_eq!(rtos.spawned[0].priority, 2);
    assert_eq!(rtos.spawned[1].priority, 1);
    assert!(rtos.spawned.iter().all(|s| s.core == Some(0)));
}

#[test]
fn test_spawn_failure_stops_before_scheduler() {
    let (hb, console) = (TaskStatus::new(), TaskStatus::new());
    let mut rtos = FakeRtos { fail_spawn: Some("TEST"), ..Default::default() };
    let mut out = String::new();

    let err = launch(&mut rtos, &mut out, &plans(&hb, &console));

    assert_eq!(err, LaunchError::TaskCreate { task: "TEST" });
    assert!(!rtos.started);
    assert!(!out.contains("heap-free"));
}

#[test]
fn test_scheduler_start_failure() {
    let (hb, console) = (TaskStatus::new(), TaskStatus::new());
    let mut rtos = FakeRtos { fail_start: true, ..Default::default() };

    let err = launch(&mut rtos, &mut String::new(), &plans(&hb, &console));

    assert_eq!(err, LaunchError::SchedulerStart);
    assert_eq!(err.to_string(), "scheduler start failed");
}

