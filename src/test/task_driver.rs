use crate::flow::{FlowDistributor, FlowSource, NodeId, ResourceType};
use crate::sim::{FlowEngine, SimTime};
use crate::workload::{
    CheckpointConfig, NoDelayScaling, SimTraceWorkload, TaskDriver, TaskOutcome, TraceFragment,
    TraceWorkload,
};
use std::sync::{Arc, Mutex};

struct Run {
    engine: FlowEngine,
    driver: NodeId,
    outcome: Arc<Mutex<TaskOutcome>>,
}

fn run_task(checkpoint: CheckpointConfig, submit_at: u64, fragments: Vec<TraceFragment>) -> Run {
    let mut engine = FlowEngine::new();
    let source = engine.add_node(|id| FlowSource::new(id, "cpu", ResourceType::Cpu, 10.0));
    let mux = engine.add_node(|id| FlowDistributor::new(id, "mux", ResourceType::Cpu));
    engine.connect(mux, source).expect("connect mux");

    let trace = TraceWorkload::new(9, fragments, checkpoint, Arc::new(NoDelayScaling));
    let outcome = Arc::new(Mutex::new(TaskOutcome {
        task_id: 9,
        ..TaskOutcome::default()
    }));
    let shared = Arc::clone(&outcome);
    let driver = engine.add_node(|id| TaskDriver::new(id, trace, vec![mux], SimTime(submit_at), shared));
    engine.invalidate(driver);
    engine.run();
    Run {
        engine,
        driver,
        outcome,
    }
}

fn single_fragment() -> Vec<TraceFragment> {
    vec![TraceFragment::cpu_only(SimTime(1000), 10.0)]
}

#[test]
fn task_starts_at_its_submit_time() {
    let run = run_task(CheckpointConfig::default(), 200, single_fragment());

    let outcome = run.outcome.lock().expect("outcome lock").clone();
    assert_eq!(outcome.started_ms, Some(200));
    assert_eq!(outcome.finished_ms, Some(1200));
    assert_eq!(outcome.checkpoints, 0);
    assert!(outcome.error.is_none());

    let driver = run.engine.node::<TaskDriver>(run.driver).expect("driver");
    assert!(driver.is_done());
    let w = driver.workload().expect("workload");
    assert!(run.engine.is_closed(w));
    assert!(run.engine.node::<SimTraceWorkload>(w).is_none());
}

#[test]
fn periodic_checkpoints_extend_the_run() {
    let checkpoint = CheckpointConfig {
        interval: SimTime(500),
        duration: SimTime(100),
        interval_scaling: 1.0,
    };
    let run = run_task(checkpoint, 0, single_fragment());

    // 500 与 1000 各做一次检查点，每次耗时 100
    let outcome = run.outcome.lock().expect("outcome lock").clone();
    assert_eq!(outcome.checkpoints, 2);
    assert_eq!(outcome.finished_ms, Some(1200));
    assert_eq!(run.engine.now(), SimTime(1200));

    let driver = run.engine.node::<TaskDriver>(run.driver).expect("driver");
    let durations: Vec<SimTime> = driver.trace().fragments().iter().map(|f| f.duration()).collect();
    assert_eq!(durations, vec![SimTime(100)]);
}

#[test]
fn checkpoint_interval_scales_after_each_checkpoint() {
    let checkpoint = CheckpointConfig {
        interval: SimTime(500),
        duration: SimTime(100),
        interval_scaling: 2.0,
    };
    let run = run_task(checkpoint, 0, single_fragment());

    // 第二次检查点推迟到 1500，此时任务已在 1100 完成
    let outcome = run.outcome.lock().expect("outcome lock").clone();
    assert_eq!(outcome.checkpoints, 1);
    assert_eq!(outcome.finished_ms, Some(1100));
}

#[test]
fn checkpoint_due_when_the_fragment_ends_is_skipped() {
    let checkpoint = CheckpointConfig {
        interval: SimTime(1000),
        duration: SimTime(100),
        interval_scaling: 1.0,
    };
    let run = run_task(checkpoint, 0, single_fragment());

    let outcome = run.outcome.lock().expect("outcome lock").clone();
    assert_eq!(outcome.checkpoints, 0);
    assert_eq!(outcome.finished_ms, Some(1000));
    assert_eq!(run.engine.now(), SimTime(1000));

    let driver = run.engine.node::<TaskDriver>(run.driver).expect("driver");
    let durations: Vec<SimTime> = driver.trace().fragments().iter().map(|f| f.duration()).collect();
    assert_eq!(durations, vec![SimTime(1000)]);
}

#[test]
fn task_without_matching_host_records_an_error() {
    let gpu_only = vec![TraceFragment::new(SimTime(100), 0.0, 1.0, 0)];
    let run = run_task(CheckpointConfig::default(), 0, gpu_only);

    let outcome = run.outcome.lock().expect("outcome lock").clone();
    assert_eq!(outcome.started_ms, None);
    assert_eq!(outcome.finished_ms, None);
    assert!(outcome.error.is_some());
    assert!(run.engine.node::<TaskDriver>(run.driver).expect("driver").is_done());
}
