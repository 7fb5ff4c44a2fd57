use poseidon_mtp_bn254::{
    CircuitApi, GateRecorder, MAX_WIDTH, MIN_WIDTH, MerkleProofCircuit, MerkleVerifier,
    MimcCompressor, Op, OpCounts, PoseidonCircuit, PoseidonCompressor, TwoToOne,
};
use std::collections::HashMap;
use tracing_subscriber::EnvFilter;

const DEFAULT_DEPTH: usize = 20;

/// Rank-1 constraints per gate. Linear gates are free. `ToBinary` is priced
/// per call as one boolean check per bit plus the recomposition.
fn costs() -> HashMap<Op, u64> {
    [
        (Op::Constant, 0),
        (Op::Add, 0),
        (Op::Sub, 0),
        (Op::Mul, 1),
        (Op::Select, 1),
        (Op::IsZero, 2),
        (Op::AssertIsEqual, 1),
    ]
    .into_iter()
    .collect()
}

fn print_breakdown(title: &str, counts: &OpCounts, bits: u64) -> u64 {
    let costs = costs();
    let mut total = 0;
    println!("--- {title} ---");
    for (op, count) in counts.iter() {
        let unit = match op {
            Op::ToBinary => bits + 1,
            _ => costs.get(&op).copied().unwrap_or(0),
        };
        let op_total = count * unit;
        total += op_total;
        println!("{op:?}: {count} * {unit} = {op_total} constraints");
    }
    println!("Total gates: {}", counts.total());
    println!("Estimated R1CS constraints: {total}\n");
    total
}

fn merkle_counts<C: TwoToOne>(
    depth: usize,
    compressor: C,
) -> Result<OpCounts, Box<dyn std::error::Error>> {
    let verifier = MerkleVerifier::new(depth, compressor)?;
    let mut rec = GateRecorder::new();
    let circuit = MerkleProofCircuit::allocate(&mut rec, depth);
    circuit.define(&mut rec, &verifier)?;
    Ok(rec.op_counts().clone())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let depth = match std::env::args().nth(1) {
        Some(arg) => arg.parse::<usize>()?,
        None => DEFAULT_DEPTH,
    };

    println!("=== Poseidon, per width ===");
    println!("{:>5} {:>8} {:>8} {:>12}", "t", "mul", "add", "constraints");
    for width in MIN_WIDTH..=MAX_WIDTH {
        let mut rec = GateRecorder::new();
        let circuit = PoseidonCircuit::allocate(&mut rec, width - 1);
        circuit.define(&mut rec)?;
        let counts = rec.op_counts();
        let constraints = counts.get(Op::Mul) + counts.get(Op::AssertIsEqual);
        println!(
            "{:>5} {:>8} {:>8} {:>12}",
            width,
            counts.get(Op::Mul),
            counts.get(Op::Add),
            constraints
        );
    }
    println!();

    let bits = depth as u64;
    let poseidon = merkle_counts(depth, PoseidonCompressor)?;
    let mimc = merkle_counts(depth, MimcCompressor)?;
    let p = print_breakdown(&format!("Merkle path, depth {depth}, Poseidon"), &poseidon, bits);
    let m = print_breakdown(&format!("Merkle path, depth {depth}, MiMC"), &mimc, bits);
    println!("MiMC / Poseidon constraint ratio: {:.2}", m as f64 / p as f64);

    Ok(())
}
