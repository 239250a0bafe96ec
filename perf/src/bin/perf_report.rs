//! Latency report for the state publication primitives.
//!
//! Batched-measurement counterpart to the criterion benches: prints a
//! percentile table for each operation on both primitives.
//!
//! ```bash
//! cargo run -p aulos-perf --bin perf_report --release
//! ```

use aulos_control::{ClientId, ConnectionGraph, EngineControl, PORT_INPUT, PORT_OUTPUT};
use aulos_perf::{measure_batched, print_result_row, print_table_header, section_header};
use aulos_state::{StateBank, StatePair};

const BATCHES: usize = 2_000;
const BATCH_SIZE: usize = 1_000;
const WARMUP_BATCHES: usize = 50;

fn main() {
    section_header("state_pair (EngineControl payload)");
    print_table_header();

    let pair = StatePair::new(EngineControl::with_rates(48_000, 256));

    let r = measure_batched("read_current", BATCHES, BATCH_SIZE, WARMUP_BATCHES, || {
        std::hint::black_box(pair.read_current().frame_base);
    });
    print_result_row(&r);

    let r = measure_batched("try_switch (idle)", BATCHES, BATCH_SIZE, WARMUP_BATCHES, || {
        std::hint::black_box(pair.try_switch().frame_base);
    });
    print_result_row(&r);

    let r = measure_batched("begin_write..end_write", BATCHES, BATCH_SIZE, WARMUP_BATCHES, || {
        let ctl = pair.begin_write();
        ctl.frame_base = ctl.frame_base.wrapping_add(1);
        pair.end_write();
    });
    print_result_row(&r);

    let r = measure_batched("publish + switch", BATCHES, BATCH_SIZE, WARMUP_BATCHES, || {
        {
            let mut w = pair.write();
            w.frame_base = w.frame_base.wrapping_add(256);
        }
        std::hint::black_box(pair.try_switch().frame_base);
    });
    print_result_row(&r);

    section_header("state_bank (ConnectionGraph payload)");
    print_table_header();

    let mut graph = ConnectionGraph::empty();
    let out = graph.register_port(ClientId(0), PORT_OUTPUT, 0).unwrap();
    let inp = graph.register_port(ClientId(1), PORT_INPUT, 0).unwrap();
    graph.connect(out, inp);
    let bank = StateBank::new(graph);

    let r = measure_batched("read_current", BATCHES, BATCH_SIZE, WARMUP_BATCHES, || {
        std::hint::black_box(bank.read_current().version);
    });
    print_result_row(&r);

    let r = measure_batched("ticket", BATCHES, BATCH_SIZE, WARMUP_BATCHES, || {
        std::hint::black_box(bank.ticket());
    });
    print_result_row(&r);

    let r = measure_batched("begin_write..end_write", BATCHES, BATCH_SIZE, WARMUP_BATCHES, || {
        let g = bank.begin_write(1);
        g.version = g.version.wrapping_add(1);
        bank.end_write(1);
    });
    print_result_row(&r);

    let r = measure_batched("publish + switch", BATCHES, BATCH_SIZE, WARMUP_BATCHES, || {
        {
            let mut w = bank.write(1);
            w.version = w.version.wrapping_add(1);
        }
        std::hint::black_box(bank.try_switch(1).version);
    });
    print_result_row(&r);

    println!();
}
