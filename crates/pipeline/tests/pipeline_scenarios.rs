use flow_types::{ModuleType, RunContext, RunId};
use pipeline::{
    Adder, GeneralConfig, MemoryTagLog, Node, PipelineError, PipelineGraph, ProcType,
    ProcessorConfig, SystemConfig, VecSink, VecSource,
};
use std::sync::{Arc, Mutex};

fn general(paket_len: u32, num_of_paket: u32) -> GeneralConfig {
    GeneralConfig {
        paket_len,
        num_of_paket,
        data_file_name: "data.bin".to_string(),
    }
}

fn scenario_a() -> SystemConfig {
    SystemConfig::from_json(
        r#"{
            "__sim_model_info__": { "__name__": "scenario a" },
            "__general__": { "__paket_len__": 4, "__num_of_paket__": 2, "__data_file_name__": "data.bin" },
            "__processors__": {
                "src": {
                    "__proc_type__": "SRC_VEC_PROC",
                    "__out_data_type__": "UINT8",
                    "__out_vector_size__": 4,
                    "__trig_start__": true,
                    "__repeat__": false,
                    "__adjacency_connection_to__": [["adder", "NewData", "Proc"], ["logger", "NewData", "Proc"]]
                },
                "adder": {
                    "__proc_type__": "ADDER_PROC",
                    "__in_data_type__": "UINT8",
                    "__out_data_type__": "UINT8",
                    "__out_vector_size__": 4,
                    "__adjacency_connection_to__": [["sink", "NewData", "In1"], ["logger", "NewData", "Proc"]]
                },
                "sink": {
                    "__proc_type__": "SINK_VEC_PROC",
                    "__in_data_type__": "UINT8"
                },
                "logger": { "__proc_type__": "LOGGER" }
            }
        }"#,
    )
    .unwrap()
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("pipeline=debug")
        .with_test_writer()
        .try_init();
}

fn build(config: &SystemConfig, data: &[u8]) -> PipelineGraph {
    init_tracing();
    PipelineGraph::build_with_data(config, RunContext::new().shared(), data).unwrap()
}

#[test]
fn scenario_a_logs_two_source_tags_and_one_adder_tag_before_sink_data() {
    let mut graph = build(&scenario_a(), &[1, 2, 3, 4, 5, 6, 7, 8]);
    graph.connect_processors().unwrap();
    let log = Arc::new(MemoryTagLog::new());
    graph.connect_logger(log.clone()).unwrap();

    let sink = graph.node_as::<VecSink<u8>>("sink").unwrap();
    let seen_by_sink = Arc::new(Mutex::new(None));
    {
        let seen = seen_by_sink.clone();
        let log = log.clone();
        sink.core().on_first_input_set.connect(move |_| {
            let kinds: Vec<_> = log.records().iter().map(|t| t.key.module_type()).collect();
            *seen.lock().unwrap() = Some(kinds);
            Ok(())
        });
    }

    graph.run().unwrap();

    assert_eq!(
        seen_by_sink.lock().unwrap().clone().unwrap(),
        vec![
            Some(ModuleType::SrcVec),
            Some(ModuleType::SrcVec),
            Some(ModuleType::Adder)
        ]
    );
    assert_eq!(sink.data(), vec![6, 8, 10, 12]);

    let records = log.records();
    assert_eq!(records.len(), 3);
    assert_eq!(records[0].key.paket_index(), 0);
    assert_eq!(records[1].key.paket_index(), 1);
    assert_eq!(records[2].key.module_index(), 2);
    assert!(graph.node("src").unwrap().is_done());
}

#[test]
fn scenario_b_repeat_source_wraps_backing_data() {
    let mut config = SystemConfig::new(general(7, 1));
    config.processors.push(
        "src",
        ProcessorConfig::new(ProcType::SrcVec, "UINT8", 7)
            .with_trig_start(true)
            .with_repeat(true)
            .connect_to("sink", "NewData", "Proc"),
    );
    config
        .processors
        .push("sink", ProcessorConfig::new(ProcType::SinkVec, "UINT8", 7));

    let mut graph = build(&config, &[10, 20, 30]);
    graph.connect_processors().unwrap();
    graph.run().unwrap();

    let sink = graph.node_as::<VecSink<u8>>("sink").unwrap();
    assert_eq!(sink.data(), vec![10, 20, 30, 10, 20, 30, 10]);
    assert!(!graph.node("src").unwrap().is_done());
}

#[test]
fn unknown_proc_type_is_skipped() {
    let mut config = SystemConfig::new(general(2, 1));
    config
        .processors
        .push("first", ProcessorConfig::new(ProcType::SinkVec, "UINT8", 2));
    let mut mystery = ProcessorConfig::new(ProcType::Adder, "UINT8", 2);
    mystery.proc_type = "FFT_PROC".to_string();
    config.processors.push("mystery", mystery);
    config
        .processors
        .push("last", ProcessorConfig::new(ProcType::Adder, "INT32", 2));

    let graph = build(&config, &[]);
    assert_eq!(graph.size(), 2);
    assert_eq!(graph.number_of_nodes(), 3);
    assert!(graph.node("mystery").is_none());
    assert_eq!(graph.node_as::<Adder<i32>>("last").unwrap().index(), 3);
}

#[test]
fn fan_out_follows_edge_order_and_tags_precede_data() {
    let mut config = SystemConfig::new(general(2, 1));
    config.processors.push(
        "src",
        ProcessorConfig::new(ProcType::SrcVec, "INT16", 2)
            .with_trig_start(true)
            .connect_to("logger", "NewData", "Proc")
            .connect_to("adder", "NewData", "In1")
            .connect_to("sink", "NewData", "Proc"),
    );
    config.processors.push(
        "adder",
        ProcessorConfig::new(ProcType::Adder, "INT16", 2).connect_to("late", "SetIn1", "Strt"),
    );
    config.processors.push(
        "late",
        ProcessorConfig::new(ProcType::SrcVec, "INT16", 2).connect_to("late_sink", "NewData", "Proc"),
    );
    config
        .processors
        .push("sink", ProcessorConfig::new(ProcType::SinkVec, "INT16", 2));
    config
        .processors
        .push("late_sink", ProcessorConfig::new(ProcType::SinkVec, "INT16", 2));

    let mut graph = build(&config, &[3, 4]);
    let sink = graph.node_as::<VecSink<i16>>("sink").unwrap();
    let late_sink = graph.node_as::<VecSink<i16>>("late_sink").unwrap();
    let order = Arc::new(Mutex::new(Vec::new()));

    {
        let order = order.clone();
        let sink = sink.clone();
        let src = graph.node("src").unwrap();
        src.core().on_new_tag.connect(move |_| {
            order.lock().unwrap().push(format!("tag, sink has {}", sink.data().len()));
            Ok(())
        });
    }
    {
        let order = order.clone();
        let sink = sink.clone();
        let late_sink = late_sink.clone();
        let adder = graph.node("adder").unwrap();
        adder.core().on_first_input_set.connect(move |_| {
            order.lock().unwrap().push(format!(
                "adder latched, sink has {}, late sink has {}",
                sink.data().len(),
                late_sink.data().len()
            ));
            Ok(())
        });
    }

    graph.connect_processors().unwrap();
    graph.run().unwrap();

    assert_eq!(
        *order.lock().unwrap(),
        vec![
            "tag, sink has 0".to_string(),
            "adder latched, sink has 0, late sink has 0".to_string()
        ]
    );
    assert_eq!(late_sink.data(), vec![3, 4]);
    assert_eq!(sink.data(), vec![3, 4]);
    assert!(graph.node_as::<Adder<i16>>("adder").unwrap().has_first_input());
}

#[test]
fn same_config_and_data_give_same_wiring_and_event_log() {
    let config = scenario_a();
    let data = [9, 8, 7, 6, 5, 4, 3, 2];

    let run = || {
        let context = RunContext::with_run_id(RunId::from_int(0x4242)).shared();
        let mut graph = PipelineGraph::build_with_data(&config, context, &data).unwrap();
        graph.connect_processors().unwrap();
        let log = Arc::new(MemoryTagLog::new());
        graph.connect_logger(log.clone()).unwrap();
        graph.run().unwrap();

        let lines: Vec<String> = log
            .lines()
            .iter()
            .map(|line| line.splitn(3, ", ").nth(2).unwrap_or_default().to_string())
            .collect();
        (graph.subscriptions().to_vec(), lines)
    };

    let (first_wiring, first_log) = run();
    let (second_wiring, second_log) = run();
    assert_eq!(first_wiring, second_wiring);
    assert_eq!(first_log, second_log);
    assert_eq!(first_log.len(), 3);
    assert!(first_log[2].starts_with("16962, ADDER, 2, 0, GVEC_UINT8, 14, 12, 10, 8, "));
}

#[test]
fn illegal_event_port_pair_aborts_wiring() {
    let mut config = SystemConfig::new(general(2, 1));
    config.processors.push(
        "src",
        ProcessorConfig::new(ProcType::SrcVec, "UINT8", 2).connect_to("sink", "SetIn1", "Proc"),
    );
    config
        .processors
        .push("sink", ProcessorConfig::new(ProcType::SinkVec, "UINT8", 2));

    let mut graph = build(&config, &[1, 2]);
    match graph.connect_processors() {
        Err(PipelineError::InvalidConnection { from, to, .. }) => {
            assert_eq!(from, "src");
            assert_eq!(to, "sink");
        }
        other => panic!("expected an invalid connection, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn unknown_edge_target_is_skipped() {
    let mut config = SystemConfig::new(general(2, 1));
    config.processors.push(
        "src",
        ProcessorConfig::new(ProcType::SrcVec, "UINT8", 2)
            .with_trig_start(true)
            .connect_to("ghost", "NewData", "Proc")
            .connect_to("sink", "NewData", "Proc"),
    );
    config
        .processors
        .push("sink", ProcessorConfig::new(ProcType::SinkVec, "UINT8", 2));

    let mut graph = build(&config, &[1, 2]);
    graph.connect_processors().unwrap();
    assert_eq!(graph.subscriptions().len(), 1);
    assert_eq!(graph.subscriptions()[0].to, "sink");

    graph.run().unwrap();
    assert_eq!(graph.node_as::<VecSink<u8>>("sink").unwrap().data(), vec![1, 2]);
}

#[test]
fn unknown_value_kind_is_fatal() {
    let mut config = SystemConfig::new(general(2, 1));
    config
        .processors
        .push("adder", ProcessorConfig::new(ProcType::Adder, "UINT128", 2));

    let result = PipelineGraph::build_with_data(&config, RunContext::new().shared(), &[]);
    assert!(matches!(result, Err(PipelineError::UnknownDataType { .. })));
}

#[test]
fn missing_data_file_is_generated_and_persisted() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bits.bin");

    let mut config = SystemConfig::new(GeneralConfig {
        paket_len: 3,
        num_of_paket: 2,
        data_file_name: path.to_string_lossy().into_owned(),
    });
    config.processors.push(
        "src",
        ProcessorConfig::new(ProcType::SrcVec, "FLOAT", 3)
            .with_trig_start(true)
            .connect_to("sink", "NewData", "Proc"),
    );
    config
        .processors
        .push("sink", ProcessorConfig::new(ProcType::SinkVec, "FLOAT", 3));

    init_tracing();
    let mut graph = PipelineGraph::build(&config, RunContext::new().shared()).unwrap();
    let persisted = std::fs::read(&path).unwrap();
    assert_eq!(persisted.len(), 6);

    graph.connect_processors().unwrap();
    graph.run().unwrap();

    let expected: Vec<f32> = persisted.iter().map(|b| *b as f32).collect();
    assert_eq!(graph.node_as::<VecSink<f32>>("sink").unwrap().data(), expected);
    assert!(graph.node_as::<VecSource<f32>>("src").unwrap().is_done());
}

#[test]
fn random_generator_pulses_once_per_packet() {
    let mut config = SystemConfig::new(general(4, 3));
    config.processors.push(
        "noise",
        ProcessorConfig::new(ProcType::RandVecGen, "COMPLEX_DOUBLE", 4)
            .with_trig_start(true)
            .connect_to("sink", "NewData", "Proc")
            .connect_to("logger", "NewData", "Proc"),
    );
    config
        .processors
        .push("sink", ProcessorConfig::new(ProcType::SinkVec, "COMPLEX_DOUBLE", 4));

    let mut graph = build(&config, &[]);
    graph.connect_processors().unwrap();
    let log = Arc::new(MemoryTagLog::new());
    graph.connect_logger(log.clone()).unwrap();
    graph.run().unwrap();

    assert_eq!(log.len(), 3);
    assert!(log
        .records()
        .iter()
        .all(|t| t.key.module_type() == Some(ModuleType::SrcNoise)));
    let sink = graph.node_as::<VecSink<num_complex::Complex64>>("sink").unwrap();
    assert_eq!(sink.chunks().len(), 3);
    assert_eq!(sink.data().len(), 12);
}
