//! Script Scheduler Tests

use crate::exec::{ScriptExecutor, ScriptStatus};
use crate::graph::{
    ops, Lifecycle, MethodDefinition, Node, NodeType, ScriptDataType, ScriptGraph, NONE,
};
use crate::host::HostSurface;

#[derive(Debug, Default)]
struct TestHost {
    prints: Vec<String>,
}

impl HostSurface for TestHost {
    fn emit_text(
        &mut self,
        text: &str,
    ) {
        self.prints.push(text.to_string());
    }
}

fn bare(
    node_type: NodeType,
    data_type: ScriptDataType,
    operation_id: u16,
    payload: u32,
) -> Node {
    Node {
        checkval: 0,
        node_type,
        data_type,
        operation_id,
        next_index: NONE,
        next_checkval: 0,
        string_index: 0,
        payload,
    }
}

fn invocation(
    data_type: ScriptDataType,
    op: u16,
    head: u16,
) -> Node {
    bare(NodeType::BuiltinInvocation, data_type, op, u32::from(head))
}

fn head(
    op: u16,
    next: u16,
) -> Node {
    let mut node = bare(NodeType::Expression, ScriptDataType::MethodOrOperator, op, 0);
    node.next_index = next;
    node
}

fn chain(
    mut node: Node,
    next: u16,
) -> Node {
    node.next_index = next;
    node
}

fn short(v: i16) -> Node {
    bare(NodeType::Expression, ScriptDataType::Short, 7, u32::from(v as u16))
}

fn string_lit(offset: u16) -> Node {
    let mut node = bare(NodeType::Expression, ScriptDataType::String, 9, 0);
    node.string_index = offset;
    node
}

fn assemble(
    mut nodes: Vec<Node>,
    strings: &[u8],
    methods: Vec<MethodDefinition>,
) -> ScriptGraph {
    for (index, node) in nodes.iter_mut().enumerate() {
        node.checkval = index as u16;
        if node.next_index != NONE {
            node.next_checkval = node.next_index;
        }
        if matches!(
            node.node_type,
            NodeType::Scope | NodeType::BuiltinInvocation | NodeType::ScriptInvocation
        ) {
            let target = node.payload as u16;
            if target != NONE {
                node.payload = u32::from(target) | (u32::from(target) << 16);
            }
        }
    }
    ScriptGraph::new(nodes, strings.to_vec(), vec![], methods)
}

fn method(
    name: &str,
    lifecycle: Lifecycle,
    entry: u16,
) -> MethodDefinition {
    MethodDefinition {
        name: name.into(),
        lifecycle,
        return_type: ScriptDataType::Void,
        entry,
    }
}

/// One print invocation per method: boot (startup), pulse (continuous),
/// lazy (dormant).
fn lifecycle_graph() -> ScriptGraph {
    let nodes = vec![
        invocation(ScriptDataType::Void, ops::PRINT, 1),
        head(ops::PRINT, 2),
        string_lit(0),
        invocation(ScriptDataType::Void, ops::PRINT, 4),
        head(ops::PRINT, 5),
        string_lit(5),
        invocation(ScriptDataType::Void, ops::PRINT, 7),
        head(ops::PRINT, 8),
        string_lit(11),
    ];
    let methods = vec![
        method("boot", Lifecycle::Startup, 0),
        method("pulse", Lifecycle::Continuous, 3),
        method("lazy", Lifecycle::Dormant, 6),
    ];
    assemble(nodes, b"boot\0pulse\0lazy\0", methods)
}

fn count(
    prints: &[String],
    text: &str,
) -> usize {
    prints.iter().filter(|p| p.as_str() == text).count()
}

/// Test startup scripts run once and continuous scripts run every tick
#[test]
fn test_lifecycle_scheduling() {
    let graph = lifecycle_graph();
    let mut executor = ScriptExecutor::new(&graph, TestHost::default()).unwrap();

    assert_eq!(executor.status("boot"), Some(ScriptStatus::Ready));
    assert_eq!(executor.status("pulse"), Some(ScriptStatus::Ready));
    assert_eq!(executor.status("lazy"), Some(ScriptStatus::Parked));

    executor.run_tick();
    executor.run_tick();
    executor.run_tick();

    assert_eq!(executor.tick(), 3);
    assert_eq!(executor.status("boot"), Some(ScriptStatus::Terminated));
    assert_eq!(executor.status("pulse"), Some(ScriptStatus::Ready));

    let prints = &executor.interpreter().host().prints;
    assert_eq!(count(prints, "boot"), 1);
    assert_eq!(count(prints, "pulse"), 3);
    assert_eq!(count(prints, "lazy"), 0);
}

/// Test a dormant script runs only once woken
#[test]
fn test_wake_dormant_script() {
    let graph = lifecycle_graph();
    let mut executor = ScriptExecutor::new(&graph, TestHost::default()).unwrap();

    executor.run_tick();
    assert_eq!(count(&executor.interpreter().host().prints, "lazy"), 0);

    executor.wake("lazy");
    assert_eq!(executor.status("lazy"), Some(ScriptStatus::Ready));

    executor.run_tick();
    assert_eq!(count(&executor.interpreter().host().prints, "lazy"), 1);
    assert_eq!(executor.status("lazy"), Some(ScriptStatus::Terminated));

    // A terminated dormant script stays down
    executor.wake("lazy");
    executor.run_tick();
    assert_eq!(count(&executor.interpreter().host().prints, "lazy"), 1);
}

/// Test a sleeping script stays suspended across ticks and then finishes
#[test]
fn test_suspension_survives_ticks() {
    let nodes = vec![
        invocation(ScriptDataType::Void, ops::BEGIN, 1),
        head(ops::BEGIN, 2),
        chain(invocation(ScriptDataType::Void, ops::PRINT, 7), 3),
        chain(invocation(ScriptDataType::Void, ops::SLEEP, 5), 4),
        invocation(ScriptDataType::Void, ops::PRINT, 9),
        head(ops::SLEEP, 6),
        short(2),
        head(ops::PRINT, 8),
        string_lit(0),
        head(ops::PRINT, 10),
        string_lit(7),
    ];
    let methods = vec![method("mission", Lifecycle::Startup, 0)];
    let graph = assemble(nodes, b"before\0after\0", methods);

    let mut executor = ScriptExecutor::new(&graph, TestHost::default()).unwrap();

    executor.run_tick();
    assert_eq!(executor.status("mission"), Some(ScriptStatus::Suspended));
    assert_eq!(executor.interpreter().host().prints, vec!["before"]);

    executor.run_tick();
    assert_eq!(executor.status("mission"), Some(ScriptStatus::Suspended));

    executor.run_tick();
    assert_eq!(executor.status("mission"), Some(ScriptStatus::Terminated));
    assert_eq!(executor.interpreter().host().prints, vec!["before", "after"]);
}

/// Test one failing script does not take the schedule down with it
#[test]
fn test_failure_is_contained() {
    let nodes = vec![
        // (/ 1 0)
        invocation(ScriptDataType::Short, ops::DIVIDE, 1),
        head(ops::DIVIDE, 2),
        chain(short(1), 3),
        short(0),
        // (print "ok")
        invocation(ScriptDataType::Void, ops::PRINT, 5),
        head(ops::PRINT, 6),
        string_lit(0),
    ];
    let methods = vec![
        method("bad", Lifecycle::Startup, 0),
        method("good", Lifecycle::Startup, 4),
    ];
    let graph = assemble(nodes, b"ok\0", methods);

    let mut executor = ScriptExecutor::new(&graph, TestHost::default()).unwrap();
    executor.run_tick();

    assert_eq!(executor.status("bad"), Some(ScriptStatus::Failed));
    assert_eq!(executor.status("good"), Some(ScriptStatus::Terminated));
    assert_eq!(executor.interpreter().host().prints, vec!["ok"]);

    // Failed scripts are not rescheduled
    executor.run_tick();
    assert_eq!(executor.status("bad"), Some(ScriptStatus::Failed));
}

/// Test set_status can re-arm a terminated script from the top
#[test]
fn test_set_status_rearms() {
    let graph = lifecycle_graph();
    let mut executor = ScriptExecutor::new(&graph, TestHost::default()).unwrap();

    executor.run_tick();
    assert_eq!(executor.status("boot"), Some(ScriptStatus::Terminated));

    executor.set_status("boot", ScriptStatus::Ready);
    executor.run_tick();
    assert_eq!(executor.status("boot"), Some(ScriptStatus::Terminated));
    assert_eq!(count(&executor.interpreter().host().prints, "boot"), 2);
}
