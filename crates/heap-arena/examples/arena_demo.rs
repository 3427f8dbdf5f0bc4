use std::process;

use argh::FromArgs;
use heap_arena::{Arena, ArenaConfig, CoalescePolicy, FitStrategy, InitError, error::Report};
use tracing_subscriber::EnvFilter;

/// Run a scripted workload against an arena and print its statistics.
#[derive(Debug, FromArgs)]
struct Args {
    /// arena capacity in bytes (rounded up to 64)
    #[argh(option, default = "1024")]
    capacity: usize,
    /// placement strategy: first-fit, best-fit or worst-fit
    #[argh(option, default = "FitStrategy::FirstFit")]
    strategy: FitStrategy,
    /// merge freed blocks with both neighbours
    #[argh(switch)]
    bidirectional: bool,
    /// allocation size; may be repeated
    #[argh(option)]
    size: Vec<usize>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args: Args = argh::from_env();

    if let Err(err) = run(&args) {
        let report = Report::new(err);
        eprintln!("{report}");
        process::exit(1);
    }
}

fn run(args: &Args) -> Result<(), InitError> {
    let coalesce = if args.bidirectional {
        CoalescePolicy::Bidirectional
    } else {
        CoalescePolicy::SingleNeighbor
    };
    let config = ArenaConfig::new(args.capacity)
        .with_strategy(args.strategy)
        .with_coalesce(coalesce);
    let mut arena = Arena::new(config)?;

    let sizes = if args.size.is_empty() {
        vec![100, 200, 50, 300, 80, 120]
    } else {
        args.size.clone()
    };

    println!(
        "Arena: {} bytes, {}, {}",
        arena.capacity(),
        arena.strategy(),
        arena.coalesce_policy()
    );

    let mut live = Vec::new();
    for size in sizes {
        match arena.try_allocate(size) {
            Ok(addr) => {
                println!("allocate({size}) -> {addr}");
                live.push(addr);
            }
            Err(err) => println!("allocate({size}) rejected: {err}"),
        }
    }

    // free every other block to leave holes behind
    let mut kept = Vec::new();
    for (i, addr) in live.into_iter().enumerate() {
        if i % 2 == 0 {
            arena.deallocate(addr);
            println!("deallocate({addr})");
        } else {
            kept.push(addr);
        }
    }

    println!();
    println!("Before compaction:");
    print_statistics(&arena);

    let compaction = arena.compact();
    for relocation in compaction.relocations() {
        println!("moved {} -> {}", relocation.from, relocation.to);
    }
    let kept: Vec<_> = kept
        .into_iter()
        .map(|addr| compaction.translate(addr))
        .collect();

    println!();
    println!("After compaction:");
    print_statistics(&arena);

    for addr in kept {
        arena.deallocate(addr);
    }
    arena.shutdown();
    Ok(())
}

fn print_statistics(arena: &Arena) {
    let stats = arena.statistics();
    print!("{stats}");
    println!("Fragmentation = {:.3}", stats.fragmentation());
}
