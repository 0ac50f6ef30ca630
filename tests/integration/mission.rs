//! End-to-end mission run: a hand-assembled graph with globals and three
//! scripts of different lifecycles, driven tick by tick through the
//! executor the way an engine loop would.

use scenscript::exec::{ScriptExecutor, ScriptStatus};
use scenscript::graph::{
    ops, Lifecycle, MethodDefinition, Node, NodeType, ScriptDataType, ScriptGraph,
    VariableDefinition, NONE,
};
use scenscript::host::HostSurface;
use scenscript::value::Value;

#[derive(Debug, Default)]
struct EngineHost {
    prints: Vec<String>,
}

impl HostSurface for EngineHost {
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

fn int(v: i32) -> Node {
    bare(NodeType::Expression, ScriptDataType::Int, 8, v as u32)
}

fn boolean(v: bool) -> Node {
    bare(NodeType::Expression, ScriptDataType::Boolean, 5, u32::from(v))
}

fn string_lit(offset: u16) -> Node {
    let mut node = bare(NodeType::Expression, ScriptDataType::String, 9, 0);
    node.string_index = offset;
    node
}

fn variable(
    data_type: ScriptDataType,
    slot: u16,
) -> Node {
    bare(NodeType::VariableAccess, data_type, 0, u32::from(slot))
}

fn assemble(
    mut nodes: Vec<Node>,
    strings: &[u8],
    variables: Vec<VariableDefinition>,
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
    ScriptGraph::new(nodes, strings.to_vec(), variables, methods)
}

const DOOR_OPEN: u16 = 0;
const TICKS: u16 = 1;

/// Globals: `door_open` (Boolean, false) and `ticks` (Int, 0).
///
/// ```text
/// (script startup intro
///   (print "objective")
///   (sleep_until door_open)
///   (print "complete"))
/// (script continuous clock (set ticks (+ ticks 1)))
/// (script dormant open_door (set door_open true))
/// ```
fn mission_graph() -> ScriptGraph {
    let nodes = vec![
        // intro body
        invocation(ScriptDataType::Void, ops::BEGIN, 1),
        head(ops::BEGIN, 2),
        chain(invocation(ScriptDataType::Void, ops::PRINT, 12), 3),
        chain(invocation(ScriptDataType::Void, ops::SLEEP_UNTIL, 14), 4),
        invocation(ScriptDataType::Void, ops::PRINT, 16),
        // clock body: (set ticks (+ ticks 1))
        invocation(ScriptDataType::Void, ops::SET, 6),
        head(ops::SET, 7),
        chain(variable(ScriptDataType::Int, TICKS), 8),
        invocation(ScriptDataType::Int, ops::ADD, 9),
        head(ops::ADD, 10),
        chain(variable(ScriptDataType::Int, TICKS), 11),
        int(1),
        // argument chains for intro
        head(ops::PRINT, 13),
        string_lit(0),
        head(ops::SLEEP_UNTIL, 15),
        variable(ScriptDataType::Boolean, DOOR_OPEN),
        head(ops::PRINT, 17),
        string_lit(10),
        // open_door body: (set door_open true)
        invocation(ScriptDataType::Void, ops::SET, 19),
        head(ops::SET, 20),
        chain(variable(ScriptDataType::Boolean, DOOR_OPEN), 21),
        boolean(true),
        // initializers
        boolean(false),
        int(0),
    ];

    let variables = vec![
        VariableDefinition {
            name: "door_open".into(),
            data_type: ScriptDataType::Boolean,
            init_node: 22,
        },
        VariableDefinition {
            name: "ticks".into(),
            data_type: ScriptDataType::Int,
            init_node: 23,
        },
    ];

    let methods = vec![
        MethodDefinition {
            name: "intro".into(),
            lifecycle: Lifecycle::Startup,
            return_type: ScriptDataType::Void,
            entry: 0,
        },
        MethodDefinition {
            name: "clock".into(),
            lifecycle: Lifecycle::Continuous,
            return_type: ScriptDataType::Void,
            entry: 5,
        },
        MethodDefinition {
            name: "open_door".into(),
            lifecycle: Lifecycle::Dormant,
            return_type: ScriptDataType::Void,
            entry: 18,
        },
    ];

    assemble(nodes, b"objective\0complete\0", variables, methods)
}

#[test]
fn test_mission_runs_to_completion() {
    scenscript::util::logger::init();

    let graph = mission_graph();
    let mut executor = ScriptExecutor::new(&graph, EngineHost::default()).unwrap();

    assert_eq!(
        executor.interpreter().get_variable(DOOR_OPEN),
        &Value::Boolean(false)
    );

    // The intro parks at its sleep_until while the clock keeps counting
    for _ in 0..3 {
        executor.run_tick();
    }
    assert_eq!(executor.status("intro"), Some(ScriptStatus::Suspended));
    assert_eq!(executor.interpreter().get_variable(TICKS), &Value::Int(3));
    assert_eq!(executor.interpreter().host().prints, vec!["objective"]);

    // Waking open_door flips the global; intro already ran this tick, so
    // it notices one tick later
    executor.wake("open_door");
    executor.run_tick();
    assert_eq!(
        executor.interpreter().get_variable(DOOR_OPEN),
        &Value::Boolean(true)
    );
    assert_eq!(executor.status("intro"), Some(ScriptStatus::Suspended));

    executor.run_tick();
    assert_eq!(executor.status("intro"), Some(ScriptStatus::Terminated));
    assert_eq!(executor.status("open_door"), Some(ScriptStatus::Terminated));
    assert_eq!(executor.status("clock"), Some(ScriptStatus::Ready));
    assert_eq!(executor.interpreter().get_variable(TICKS), &Value::Int(5));
    assert_eq!(
        executor.interpreter().host().prints,
        vec!["objective", "complete"]
    );
}
